use crate::error::ShortlinkError;
use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// A short code identifying a stored link.
///
/// Custom codes must be 3-20 characters long and contain only ASCII
/// letters and digits. Comparison is case-sensitive.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ShortCode(String);

pub const MIN_LENGTH: usize = 3;
pub const MAX_LENGTH: usize = 20;

impl ShortCode {
    /// Creates a new `ShortCode` after validating a user-provided value.
    ///
    /// Valid codes are 3-20 characters of `[A-Za-z0-9]`.
    pub fn new(code: impl Into<String>) -> Result<Self, ShortlinkError> {
        let code = code.into();
        Self::validate(&code)?;
        Ok(Self(code))
    }

    /// Creates a `ShortCode` without validation.
    ///
    /// Use this only for codes produced by trusted internal sources
    /// (generators, rows read back from storage, path segments used purely
    /// as lookup keys).
    pub fn new_unchecked(code: impl Into<String>) -> Self {
        Self(code.into())
    }

    /// Generates the full shortened URL based on the provided base URL.
    pub fn to_url(&self, base_url: &str) -> String {
        format!("{}/{}", base_url.trim_end_matches('/'), self.0)
    }

    /// Returns the short code as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn validate(code: &str) -> Result<(), ShortlinkError> {
        if code.len() < MIN_LENGTH || code.len() > MAX_LENGTH {
            return Err(ShortlinkError::InvalidShortCode {
                code: code.to_owned(),
                reason: format!(
                    "length must be between {} and {}, got {}",
                    MIN_LENGTH,
                    MAX_LENGTH,
                    code.len()
                ),
            });
        }

        if !code.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(ShortlinkError::InvalidShortCode {
                code: code.to_owned(),
                reason: "must contain only alphanumeric characters".to_owned(),
            });
        }

        Ok(())
    }
}

impl Display for ShortCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ShortCode {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
