//! Fixed-length binary identities rendered as hex
//!
//! Both bundle identifiers and subscriber (author) identifiers are 32 raw
//! bytes. They are parsed case-insensitively and always rendered as upper
//! case hex, which is the canonical text form used in URIs and file names.

use crate::errors::{GwError, GwErrorKind};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Number of raw bytes in a bundle or subscriber identifier
pub const ID_BYTES: usize = 32;

/// Number of hex characters in the text form of an identifier
pub const ID_HEX_LEN: usize = ID_BYTES * 2;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IdParseError {
    #[error("{what} must be {expected} hex characters, got {actual}")]
    WrongLength {
        what: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("{what} is not valid hex: {reason}")]
    NotHex { what: &'static str, reason: String },
}

impl From<IdParseError> for GwError {
    fn from(err: IdParseError) -> Self {
        GwError::new(GwErrorKind::InvalidInput).with_message(err.to_string())
    }
}

fn parse_hex_id(what: &'static str, text: &str) -> Result<[u8; ID_BYTES], IdParseError> {
    let text = text.trim();
    if text.len() != ID_HEX_LEN {
        return Err(IdParseError::WrongLength {
            what,
            expected: ID_HEX_LEN,
            actual: text.len(),
        });
    }
    let mut out = [0u8; ID_BYTES];
    hex::decode_to_slice(text, &mut out).map_err(|e| IdParseError::NotHex {
        what,
        reason: e.to_string(),
    })?;
    Ok(out)
}

/// Identity of a bundle, derived by the store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BundleId([u8; ID_BYTES]);

impl BundleId {
    pub fn from_bytes(bytes: [u8; ID_BYTES]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; ID_BYTES] {
        &self.0
    }

    /// Canonical upper case hex form
    pub fn to_hex(&self) -> String {
        hex::encode_upper(self.0)
    }
}

impl FromStr for BundleId {
    type Err = IdParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_hex_id("bundle id", s).map(Self)
    }
}

impl fmt::Display for BundleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// Identity reference of an author (a subscriber known to the store)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriberId([u8; ID_BYTES]);

impl SubscriberId {
    pub fn from_bytes(bytes: [u8; ID_BYTES]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; ID_BYTES] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode_upper(self.0)
    }
}

impl FromStr for SubscriberId {
    type Err = IdParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_hex_id("subscriber id", s).map(Self)
    }
}

impl fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_is_case_insensitive_and_renders_upper() {
        let lower = "ab".repeat(ID_BYTES);
        let id: BundleId = lower.parse().unwrap();
        assert_eq!(id.to_hex(), "AB".repeat(ID_BYTES));
        assert_eq!(id.to_string(), id.to_hex());
    }

    #[test]
    fn test_parse_rejects_wrong_length() {
        let err = "ABCD".parse::<BundleId>().unwrap_err();
        assert!(matches!(err, IdParseError::WrongLength { actual: 4, .. }));
    }

    #[test]
    fn test_parse_rejects_non_hex() {
        let text = "zz".repeat(ID_BYTES);
        let err = text.parse::<SubscriberId>().unwrap_err();
        assert!(matches!(err, IdParseError::NotHex { .. }));
        assert!(err.to_string().contains("subscriber id"));
    }

    #[test]
    fn test_parse_error_maps_to_invalid_input() {
        let err: GwError = "".parse::<SubscriberId>().unwrap_err().into();
        assert_eq!(err.kind(), GwErrorKind::InvalidInput);
    }
}
