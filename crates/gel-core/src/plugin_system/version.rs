use std::fmt;
use std::str::FromStr;
use semver::{Version, VersionReq};
use thiserror::Error;

/// Error type for version parsing
#[derive(Debug, Error)]
pub enum VersionError {
    #[error("Invalid version '{0}': {1}")]
    InvalidVersion(String, String),
    #[error("Invalid version constraint '{0}': {1}")]
    InvalidConstraint(String, String),
}

/// The engine API version plugins are checked against
pub fn api_version() -> Version {
    use crate::kernel::constants::{API_VERSION_MAJOR, API_VERSION_MINOR, API_VERSION_PATCH};
    Version::new(API_VERSION_MAJOR, API_VERSION_MINOR, API_VERSION_PATCH)
}

/// Parses a plugin version string
pub fn parse_version(version: &str) -> Result<Version, VersionError> {
    Version::parse(version).map_err(|e| VersionError::InvalidVersion(version.to_string(), e.to_string()))
}

/// Represents a version requirement range using semver constraints.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionRange {
    /// The original constraint string (e.g., "^1.2.3", ">=2.0")
    constraint: String,
    /// The parsed semver requirement
    req: VersionReq,
}

impl VersionRange {
    /// Creates a new version range from a constraint string.
    pub fn from_constraint(constraint: &str) -> Result<Self, VersionError> {
        let req = VersionReq::parse(constraint)
            .map_err(|e| VersionError::InvalidConstraint(constraint.to_string(), e.to_string()))?;
        Ok(Self {
            constraint: constraint.to_string(),
            req,
        })
    }

    /// Checks if a specific `semver::Version` satisfies this range.
    pub fn includes(&self, version: &Version) -> bool {
        self.req.matches(version)
    }

    /// Returns the original constraint string.
    pub fn constraint_string(&self) -> &str {
        &self.constraint
    }
}

/// Display shows the original constraint string.
impl fmt::Display for VersionRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.constraint)
    }
}

impl FromStr for VersionRange {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        VersionRange::from_constraint(s)
    }
}
