//! Integration Test: Runtime Bridging
//!
//! **Policy**: Blocking on async work (`block_on`, `blocking_recv`) happens
//! only in the sync-over-async bridge. Everything else stays async.

use architectural_enforcement::{assert_no_violations, find_violations};

#[test]
fn test_block_on_only_in_bridge() {
    let violations = find_violations("block_on(", &["bridge.rs"]);
    assert_no_violations("block_on outside bridge.rs", &violations);
}

#[test]
fn test_blocking_recv_only_in_bridge() {
    let violations = find_violations("blocking_recv", &["bridge.rs"]);
    assert_no_violations("blocking_recv outside bridge.rs", &violations);
}
