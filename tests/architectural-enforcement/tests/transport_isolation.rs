//! Integration Test: Transport Isolation
//!
//! **Policy**: Only the HTTP transport talks to `reqwest`. Adapters build
//! `PreparedRequest`s and read `RawResponse`s so they can be tested against
//! a scripted transport.

use architectural_enforcement::{assert_no_violations, find_violations};

#[test]
fn test_reqwest_only_in_transport() {
    let violations = find_violations("reqwest::", &["provider/http.rs"]);
    assert_no_violations("reqwest used outside provider/http.rs", &violations);
}

#[test]
fn test_no_blocking_http_client() {
    let violations = find_violations("reqwest::blocking", &[]);
    assert_no_violations("blocking reqwest client in production code", &violations);
}
