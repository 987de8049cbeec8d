//! Fuzz target for inbound header parsing.
//!
//! Interprets the input as newline-separated `name: value` lines and feeds
//! them to `RequestHeaders::from_pairs`. Every result must be either
//! `Ok(...)` or `Err(AuthError::MalformedHeaders)`.

#![no_main]

use libfuzzer_sys::fuzz_target;
use paygate_authn::{AuthError, RequestHeaders};

fuzz_target!(|data: &[u8]| {
    // Only process valid UTF-8 — header values reach us as strings
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };

    let pairs = text.lines().filter_map(|line| line.split_once(':'));
    match RequestHeaders::from_pairs(pairs) {
        Ok(_) | Err(AuthError::MalformedHeaders(_)) => {},
        Err(other) => panic!("unexpected error variant: {other:?}"),
    }
});
