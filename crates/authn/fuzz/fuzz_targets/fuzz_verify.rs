//! Fuzz target for signature verification.
//!
//! Feeds arbitrary signature strings and signed data to
//! `SignatureVerifier::verify`. Every input must produce `Ok(true)` or
//! `Ok(false)`; malformed hex, wrong lengths and non-ASCII input are plain
//! mismatches, never panics or errors.

#![no_main]

use std::sync::{Arc, OnceLock};

use libfuzzer_sys::fuzz_target;
use paygate_authn::{CredentialManager, SignatureVerifier};
use paygate_storage::{TenantId, Zeroizing};
use tokio::runtime::Runtime;

struct Harness {
    rt: Runtime,
    verifier: SignatureVerifier,
}

fn harness() -> &'static Harness {
    static HARNESS: OnceLock<Harness> = OnceLock::new();
    HARNESS.get_or_init(|| {
        let rt = tokio::runtime::Builder::new_current_thread()
            .build()
            .expect("failed to create tokio runtime");
        let manager = Arc::new(CredentialManager::in_memory());
        rt.block_on(manager.rotate(&TenantId::from("ak_1"), Some(Zeroizing::new("sk_1".to_owned()))))
            .expect("failed to install key");
        Harness { rt, verifier: SignatureVerifier::new(manager) }
    })
}

fuzz_target!(|data: &[u8]| {
    let harness = harness();

    // Split the input into a signature string and the signed payload
    let split = data.first().map_or(0, |&n| usize::from(n)).min(data.len());
    let (head, payload) = data.split_at(split);
    let signature = String::from_utf8_lossy(head);

    for tenant in ["ak_1", "ak_unknown"] {
        let result = harness.rt.block_on(harness.verifier.verify(
            &TenantId::from(tenant),
            payload,
            &signature,
        ));
        assert!(result.is_ok(), "verify must not fail against an in-memory store: {result:?}");
    }
});
