//! Security-focused authentication tests.
//!
//! These tests verify the signing pipeline against fixed vectors and its
//! resistance to common attacks on HMAC request authentication: tampered
//! requests, stale and replayed requests, forged tenants, and malformed
//! signatures.
#![allow(clippy::expect_used, clippy::panic)]

use std::{sync::Arc, time::Duration};

use chrono::{TimeZone, Utc};
use paygate_authn::{
    AuthError, CredentialManager, InMemoryReplayDetector, RequestHeaders, RequestSigner,
    SignatureVerifier, canonical_message, compute_signature, generate_key,
};
use paygate_storage::{TenantId, Zeroizing};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

const FIXED_TIMESTAMP: i64 = 1_700_000_000;

fn tenant() -> TenantId {
    TenantId::from("ak_1")
}

async fn pipeline_with_key(key: &str) -> (RequestSigner, SignatureVerifier) {
    let manager = Arc::new(CredentialManager::in_memory());
    manager.rotate(&tenant(), Some(Zeroizing::new(key.to_owned()))).await.expect("install key");
    (RequestSigner::new(Arc::clone(&manager)), SignatureVerifier::new(manager))
}

fn fixed_now() -> chrono::DateTime<Utc> {
    Utc.timestamp_opt(FIXED_TIMESTAMP, 0).single().expect("valid timestamp")
}

// ---------------------------------------------------------------------------
// Fixed vectors
// ---------------------------------------------------------------------------

#[test]
fn test_signing_vector_with_body() {
    let message =
        canonical_message("POST", "/v1/payments", "abcd1234", FIXED_TIMESTAMP, "ak_1", br#"{"amount":100}"#);
    assert_eq!(message, br#"POST/v1/paymentsabcd12341700000000ak_1{"amount":100}"#);

    let signature = compute_signature("sk_1", &message).expect("sign");
    assert_eq!(signature, "9f07d8781e9cca7335e3089f52792ada6a9b7e7162de6cab38189eda38a3be60");
}

#[test]
fn test_signing_vector_without_body() {
    let message = canonical_message("get", "/v1/balance", "00ff00ff", FIXED_TIMESTAMP, "ak_1", b"");
    let signature = compute_signature("sk_1", &message).expect("sign");
    assert_eq!(signature, "8cbcac4ad29f4a1377bbf3f3dede3a118edec670d93efeb8c74783d8b977aff9");
}

#[tokio::test]
async fn test_signer_reproduces_vector() {
    let (signer, verifier) = pipeline_with_key("sk_1").await;

    let signed = signer
        .sign_with(&tenant(), "POST", "/v1/payments", br#"{"amount":100}"#, FIXED_TIMESTAMP, "abcd1234")
        .await
        .expect("sign");
    assert_eq!(signed.signature, "9f07d8781e9cca7335e3089f52792ada6a9b7e7162de6cab38189eda38a3be60");

    verifier
        .verify_request(
            &RequestHeaders::from(&signed),
            "POST",
            "/v1/payments",
            br#"{"amount":100}"#,
            fixed_now(),
        )
        .await
        .expect("vector verifies");
}

// ---------------------------------------------------------------------------
// Tampering
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_each_tampered_component_is_rejected() {
    let (signer, verifier) = pipeline_with_key("sk_1").await;
    let body = br#"{"amount":100}"#;
    let signed = signer
        .sign_with(&tenant(), "POST", "/v1/payments", body, FIXED_TIMESTAMP, "abcd1234")
        .await
        .expect("sign");
    let original = RequestHeaders::from(&signed);

    let mut wrong_salt = original.clone();
    wrong_salt.salt = "abcd1235".into();
    let mut wrong_timestamp = original.clone();
    wrong_timestamp.timestamp += 1;
    let mut flipped_signature = original.clone();
    flipped_signature.signature.replace_range(0..1, "0");
    if flipped_signature.signature == original.signature {
        flipped_signature.signature.replace_range(0..1, "1");
    }

    let cases: [(&str, &RequestHeaders, &str, &str, &[u8]); 6] = [
        ("method", &original, "PUT", "/v1/payments", body),
        ("path", &original, "POST", "/v1/refunds", body),
        ("body", &original, "POST", "/v1/payments", br#"{"amount":999}"#),
        ("salt", &wrong_salt, "POST", "/v1/payments", body),
        ("timestamp", &wrong_timestamp, "POST", "/v1/payments", body),
        ("signature", &flipped_signature, "POST", "/v1/payments", body),
    ];

    for (component, headers, method, path, body) in cases {
        let result = verifier.verify_request(headers, method, path, body, fixed_now()).await;
        assert!(
            matches!(result, Err(AuthError::InvalidSignature)),
            "Security: tampered {component} must be rejected, got: {result:?}"
        );
    }
}

#[tokio::test]
async fn test_signature_with_wrong_key_rejected() {
    let (_, verifier) = pipeline_with_key("sk_1").await;
    let message = canonical_message("POST", "/v1/payments", "abcd1234", FIXED_TIMESTAMP, "ak_1", b"");
    let forged = RequestHeaders {
        access_key_id: tenant(),
        salt: "abcd1234".into(),
        timestamp: FIXED_TIMESTAMP,
        signature: compute_signature("sk_guess", &message).expect("sign"),
    };

    let result = verifier.verify_request(&forged, "POST", "/v1/payments", b"", fixed_now()).await;
    assert!(matches!(result, Err(AuthError::InvalidSignature)));
}

#[tokio::test]
async fn test_unknown_tenant_rejected_without_creating_credentials() {
    let manager = Arc::new(CredentialManager::in_memory());
    let verifier = SignatureVerifier::new(Arc::clone(&manager));
    let key = generate_key(32).expect("key");
    let message = canonical_message("GET", "/", "abcd1234", FIXED_TIMESTAMP, "ak_ghost", b"");
    let headers = RequestHeaders {
        access_key_id: TenantId::from("ak_ghost"),
        salt: "abcd1234".into(),
        timestamp: FIXED_TIMESTAMP,
        signature: compute_signature(&key, &message).expect("sign"),
    };

    let result = verifier.verify_request(&headers, "GET", "/", b"", fixed_now()).await;
    assert!(matches!(result, Err(AuthError::InvalidSignature)));
    assert_eq!(manager.cached_tenant_count(), 0, "verification must never create a tenant");
}

#[tokio::test]
async fn test_malformed_signature_strings_rejected() {
    let (_, verifier) = pipeline_with_key("sk_1").await;
    let zeroes = "0".repeat(64);
    let oversized = "f".repeat(128);
    for provided in ["", "not-hex", "abc", zeroes.as_str(), oversized.as_str()] {
        assert!(
            !verifier.verify(&tenant(), b"payload", provided).await.expect("verify"),
            "Security: {provided:?} must not verify"
        );
    }
}

// ---------------------------------------------------------------------------
// Freshness and replay
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_request_one_second_past_tolerance_rejected() {
    let (signer, verifier) = pipeline_with_key("sk_1").await;
    let signed = signer
        .sign_with(&tenant(), "GET", "/", b"", FIXED_TIMESTAMP, "abcd1234")
        .await
        .expect("sign");

    let late = fixed_now() + chrono::Duration::seconds(301);
    let result = verifier.verify_request(&RequestHeaders::from(&signed), "GET", "/", b"", late).await;
    assert!(matches!(result, Err(AuthError::StaleRequest { skew_secs: 301, .. })), "got: {result:?}");
}

#[tokio::test]
async fn test_custom_tolerance_applies() {
    let (signer, verifier) = pipeline_with_key("sk_1").await;
    let verifier = verifier.with_tolerance(Duration::from_secs(10));
    let signed = signer
        .sign_with(&tenant(), "GET", "/", b"", FIXED_TIMESTAMP, "abcd1234")
        .await
        .expect("sign");
    let headers = RequestHeaders::from(&signed);

    let late = fixed_now() + chrono::Duration::seconds(11);
    let result = verifier.verify_request(&headers, "GET", "/", b"", late).await;
    assert!(matches!(result, Err(AuthError::StaleRequest { .. })));

    let on_time = fixed_now() + chrono::Duration::seconds(10);
    verifier.verify_request(&headers, "GET", "/", b"", on_time).await.expect("within tolerance");
}

#[tokio::test]
async fn test_extreme_timestamps_do_not_overflow() {
    let (_, verifier) = pipeline_with_key("sk_1").await;
    for timestamp in [i64::MIN, i64::MAX] {
        let headers = RequestHeaders {
            access_key_id: tenant(),
            salt: "abcd1234".into(),
            timestamp,
            signature: "00".into(),
        };
        let result = verifier.verify_request(&headers, "GET", "/", b"", fixed_now()).await;
        assert!(matches!(result, Err(AuthError::StaleRequest { .. })), "got: {result:?}");
    }
}

#[tokio::test]
async fn test_replayed_request_rejected() {
    let (signer, verifier) = pipeline_with_key("sk_1").await;
    let signed = signer
        .sign_with(&tenant(), "POST", "/v1/payments", b"{}", FIXED_TIMESTAMP, "abcd1234")
        .await
        .expect("sign");
    let headers = RequestHeaders::from(&signed);

    verifier.verify_request(&headers, "POST", "/v1/payments", b"{}", fixed_now()).await.expect("first");
    let replay = verifier.verify_request(&headers, "POST", "/v1/payments", b"{}", fixed_now()).await;
    assert!(
        matches!(&replay, Err(AuthError::ReplayedRequest { salt, .. }) if salt == "abcd1234"),
        "Security: replay must be rejected, got: {replay:?}"
    );
}

#[tokio::test]
async fn test_rejected_signature_does_not_consume_salt() {
    let (signer, verifier) = pipeline_with_key("sk_1").await;
    let signed = signer
        .sign_with(&tenant(), "POST", "/v1/payments", b"{}", FIXED_TIMESTAMP, "abcd1234")
        .await
        .expect("sign");
    let genuine = RequestHeaders::from(&signed);
    let mut forged = genuine.clone();
    forged.signature = "00".repeat(32);

    let result = verifier.verify_request(&forged, "POST", "/v1/payments", b"{}", fixed_now()).await;
    assert!(matches!(result, Err(AuthError::InvalidSignature)));

    verifier
        .verify_request(&genuine, "POST", "/v1/payments", b"{}", fixed_now())
        .await
        .expect("forged attempt must not block the genuine request");
}

#[tokio::test]
async fn test_shared_replay_detector_spans_verifiers() {
    let manager = Arc::new(CredentialManager::in_memory());
    manager.rotate(&tenant(), Some(Zeroizing::new("sk_1".to_owned()))).await.expect("install");
    let replay = Arc::new(InMemoryReplayDetector::new(1_000));
    let a = SignatureVerifier::new(Arc::clone(&manager)).with_replay_detector(replay.clone());
    let b = SignatureVerifier::new(Arc::clone(&manager)).with_replay_detector(replay);

    let signed = RequestSigner::new(manager)
        .sign_with(&tenant(), "GET", "/", b"", FIXED_TIMESTAMP, "abcd1234")
        .await
        .expect("sign");
    let headers = RequestHeaders::from(&signed);

    a.verify_request(&headers, "GET", "/", b"", fixed_now()).await.expect("first");
    let result = b.verify_request(&headers, "GET", "/", b"", fixed_now()).await;
    assert!(matches!(result, Err(AuthError::ReplayedRequest { .. })));
}
