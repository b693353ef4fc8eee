#![cfg(test)]

use std::str::FromStr;

use crate::plugin_system::version::{api_version, parse_version, VersionError, VersionRange};

#[test]
fn test_api_version_matches_constants() {
    assert_eq!(api_version().to_string(), "0.1.0");
}

#[test]
fn test_range_includes() {
    let range = VersionRange::from_str("^0.1").unwrap();
    assert!(range.includes(&parse_version("0.1.0").unwrap()));
    assert!(range.includes(&parse_version("0.1.7").unwrap()));
    assert!(!range.includes(&parse_version("0.2.0").unwrap()));
    assert_eq!(range.to_string(), "^0.1");
    assert_eq!(range.constraint_string(), "^0.1");
}

#[test]
fn test_invalid_inputs() {
    assert!(matches!(VersionRange::from_constraint("not a version"), Err(VersionError::InvalidConstraint(..))));
    assert!(matches!(parse_version("1.x"), Err(VersionError::InvalidVersion(..))));
}
