//! Integration Test: Sleep Prohibition
//!
//! **Policy**: Production code in the geocoding core MUST NOT sleep.
//! Waiting happens on permits, I/O and channels, never on a timer.

use architectural_enforcement::{assert_no_violations, find_violations};

#[test]
fn test_no_thread_sleep_in_production_code() {
    let violations = find_violations("thread::sleep", &[]);
    assert_no_violations("std::thread::sleep in production code", &violations);
}

#[test]
fn test_no_timer_sleep_in_production_code() {
    let violations = find_violations("time::sleep", &[]);
    assert_no_violations("tokio::time::sleep in production code", &violations);
}
