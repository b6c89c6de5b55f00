//! `content://` URIs handed to and received from callers

use crate::errors::{GwError, GwErrorKind};
use crate::model::ids::BundleId;
use std::fmt;
use std::str::FromStr;

pub const CONTENT_SCHEME: &str = "content";

/// Parsed `content://<authority><path>` URI
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentUri {
    authority: String,
    path: String,
}

impl ContentUri {
    pub fn new(authority: impl Into<String>, path: impl Into<String>) -> Self {
        let path = path.into();
        let path = if path.is_empty() || path.starts_with('/') {
            path
        } else {
            format!("/{}", path)
        };
        Self {
            authority: authority.into(),
            path,
        }
    }

    /// URI naming a single bundle
    pub fn for_bundle(authority: &str, id: &BundleId) -> Self {
        Self::new(authority, format!("/{}", id.to_hex()))
    }

    /// URI of the listing root
    pub fn root(authority: &str) -> Self {
        Self::new(authority, "/")
    }

    pub fn authority(&self) -> &str {
        &self.authority
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Non-empty path segments
    pub fn path_segments(&self) -> Vec<&str> {
        self.path.split('/').filter(|s| !s.is_empty()).collect()
    }
}

impl FromStr for ContentUri {
    type Err = GwError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: &str| {
            GwError::new(GwErrorKind::InvalidInput)
                .with_op("parse_content_uri")
                .with_message(format!("invalid content URI '{}': {}", s, reason))
        };
        let rest = s
            .strip_prefix(CONTENT_SCHEME)
            .and_then(|r| r.strip_prefix("://"))
            .ok_or_else(|| invalid("expected content:// scheme"))?;
        let rest = rest.split(['?', '#']).next().unwrap_or("");
        let (authority, path) = match rest.find('/') {
            Some(idx) => (&rest[..idx], &rest[idx..]),
            None => (rest, ""),
        };
        if authority.is_empty() {
            return Err(invalid("missing authority"));
        }
        Ok(Self::new(authority, path))
    }
}

impl fmt::Display for ContentUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}{}", CONTENT_SCHEME, self.authority, self.path)
    }
}
