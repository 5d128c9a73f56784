//! Priority tests for rtk-core

use rtk_core::{priority, Priority, RtkError};

#[test]
fn test_priority_raw() {
    assert_eq!(Priority::new(10).raw(), 10);
    assert_eq!(priority!(3), Priority::new(3));
}

#[test]
fn test_lower_level_is_more_urgent() {
    let urgent = Priority::new(1);
    let relaxed = Priority::new(5);
    assert!(urgent.is_higher_than(relaxed));
    assert!(!relaxed.is_higher_than(urgent));
    assert!(urgent < relaxed);
}

#[test]
fn test_priority_from_wide_level() {
    assert_eq!(Priority::from_level(255), Ok(Priority::LOWEST));
    assert_eq!(Priority::from_level(256), Err(RtkError::InvalidPriority));
    assert_eq!(Priority::try_from(0u32), Ok(Priority::HIGHEST));
}

#[test]
fn test_priority_display() {
    assert_eq!(format!("{}", Priority::new(7)), "Priority(7)");
}
