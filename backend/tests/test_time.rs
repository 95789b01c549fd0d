//! Tests for TimeManager

use ran_emulator_core::{TimeManager, TTI_SECONDS};

#[test]
fn test_time_manager_new() {
    let time = TimeManager::new(TTI_SECONDS);
    assert_eq!(time.current_tti(), 0);
    assert_eq!(time.now(), 0.0);
}

#[test]
fn test_advance_tti() {
    let mut time = TimeManager::new(TTI_SECONDS);

    time.advance_tti();
    assert_eq!(time.current_tti(), 1);

    time.advance_tti();
    assert_eq!(time.current_tti(), 2);
    assert!((time.now() - 0.002).abs() < 1e-12);
}

#[test]
fn test_now_does_not_drift() {
    let mut time = TimeManager::new(TTI_SECONDS);
    for _ in 0..100_000 {
        time.advance_tti();
    }
    // Multiplication, not repeated addition
    assert_eq!(time.now(), 100_000.0 * TTI_SECONDS);
}

#[test]
fn test_custom_tti_length() {
    let mut time = TimeManager::new(0.0005);
    time.advance_tti();
    assert_eq!(time.tti_seconds(), 0.0005);
    assert_eq!(time.now(), 0.0005);
}

#[test]
#[should_panic(expected = "tti_seconds must be positive")]
fn test_zero_tti_panics() {
    TimeManager::new(0.0);
}
