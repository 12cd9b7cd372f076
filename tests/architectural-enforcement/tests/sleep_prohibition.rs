//! Integration Test: Sleep Prohibition
//!
//! **Policy**: Production code MUST NOT block a thread with `std::thread::sleep`.
//! Timed work goes through `tokio::time` so it stays cancellable and runs
//! under paused time in tests.

use architectural_enforcement::{assert_clean, find_violations, PRODUCTION_DIRS};

#[test]
fn test_no_thread_sleep_in_production_code() {
    let violations = find_violations(&PRODUCTION_DIRS, |code| code.contains("thread::sleep("));
    assert_clean("blocking sleep", &violations);
}

#[test]
fn test_no_unwrap_or_expect_in_production_code() {
    let violations = find_violations(&PRODUCTION_DIRS, |code| {
        code.contains(".unwrap()") || code.contains(".expect(")
    });
    assert_clean("unwrap/expect", &violations);
}
