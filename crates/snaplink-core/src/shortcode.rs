use crate::base62;
use crate::error::CoreError;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;
use snaplink_snowflake::SnowflakeId;
use std::fmt::Display;

/// The public key of a short link: the base62 encoding of its identifier.
///
/// Codes are 1-11 characters drawn from `[0-9a-zA-Z]`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ShortCode(SmolStr);

impl ShortCode {
    /// Encodes an identifier into its short code.
    ///
    /// # Examples
    ///
    /// ```
    /// use snaplink_core::ShortCode;
    ///
    /// assert_eq!(ShortCode::generated(0_u64).as_str(), "0");
    /// assert_eq!(ShortCode::generated(62_u64).as_str(), "10");
    /// ```
    pub fn generated(id: impl Into<u64>) -> Self {
        Self(SmolStr::new(base62::encode(id.into())))
    }

    /// Creates a new `ShortCode` after validating the input.
    pub fn new(code: impl AsRef<str>) -> std::result::Result<Self, CoreError> {
        let code = code.as_ref();
        Self::validate(code)?;
        Ok(Self(SmolStr::new(code)))
    }

    /// Creates a `ShortCode` without validation.
    ///
    /// Use this only for codes read back from trusted storage.
    pub fn new_unchecked(code: impl AsRef<str>) -> Self {
        Self(SmolStr::new(code.as_ref()))
    }

    /// Decodes the identifier this code was generated from.
    pub fn decode(&self) -> Option<u64> {
        base62::decode(&self.0)
    }

    /// Returns the short code as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn validate(code: &str) -> std::result::Result<(), CoreError> {
        if code.is_empty() || code.len() > base62::MAX_ENCODED_LEN {
            return Err(CoreError::InvalidShortCode(format!(
                "length must be between 1 and {}, got {}",
                base62::MAX_ENCODED_LEN,
                code.len()
            )));
        }

        if !code.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(CoreError::InvalidShortCode(format!(
                "must contain only alphanumeric characters: '{}'",
                code
            )));
        }

        Ok(())
    }
}

impl From<SnowflakeId> for ShortCode {
    fn from(id: SnowflakeId) -> Self {
        ShortCode::generated(id)
    }
}

impl Display for ShortCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
