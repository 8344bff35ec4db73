//! Integration Test: Unwrap Prohibition
//!
//! **Policy**: Production code propagates errors with `?` or maps them to a
//! typed error. `.unwrap()` and `.expect(` are for tests only.

use architectural_enforcement::{assert_no_violations, find_violations};

#[test]
fn test_no_unwrap_in_production_code() {
    let violations = find_violations(".unwrap()", &[]);
    assert_no_violations(".unwrap() in production code", &violations);
}

#[test]
fn test_no_expect_in_production_code() {
    let violations = find_violations(".expect(", &[]);
    assert_no_violations(".expect() in production code", &violations);
}
