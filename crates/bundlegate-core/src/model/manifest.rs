//! Bundle manifests
//!
//! A manifest is a sparse set of `key=value` lines describing one bundle.
//! Well-known fields are lifted into typed slots; anything else is kept
//! verbatim in `extra` so a manifest can be loaded, adjusted and written
//! back without losing fields this crate does not understand.
//!
//! ## Text format
//!
//! - UTF-8, at most [`MAX_MANIFEST_BYTES`] bytes
//! - one `name=value` pair per line, `\n` terminated
//! - field names are ASCII alphanumerics or `_`, each at most once
//! - an optional signature block follows a single NUL byte; it is dropped
//!   on load because any edit invalidates it and the store re-signs
//!
//! ## Variants
//!
//! The `service` field selects the variant. `service=file` is a
//! [`ManifestKind::File`] and carries a `name`; every other service is a
//! [`ManifestKind::Plain`]. File-only setters refuse plain manifests with
//! [`ManifestError::VariantMismatch`].

use crate::errors::{GwError, GwErrorKind};
use crate::model::ids::{BundleId, SubscriberId};
use std::collections::BTreeMap;
use std::path::Path;
use thiserror::Error;

/// Upper bound on the encoded size of a manifest
pub const MAX_MANIFEST_BYTES: usize = 8192;

/// Service name of the file variant
pub const SERVICE_FILE: &str = "file";

const FIELD_ID: &str = "id";
const FIELD_VERSION: &str = "version";
const FIELD_DATE: &str = "date";
const FIELD_SERVICE: &str = "service";
const FIELD_NAME: &str = "name";
const FIELD_FILESIZE: &str = "filesize";
const FIELD_FILEHASH: &str = "filehash";
const FIELD_AUTHOR: &str = "author";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ManifestError {
    #[error("manifest is {size} bytes, limit is {max}")]
    TooLarge { size: usize, max: usize },

    #[error("manifest is not valid UTF-8")]
    NotUtf8,

    #[error("manifest line {line} has no '=' separator")]
    MissingSeparator { line: usize },

    #[error("manifest line {line} has invalid field name '{name}'")]
    InvalidFieldName { line: usize, name: String },

    #[error("manifest field '{name}' appears more than once")]
    DuplicateField { name: String },

    #[error("manifest field '{field}' has invalid value '{value}': {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },

    #[error("field '{field}' does not apply to a manifest of service '{service}'")]
    VariantMismatch { field: &'static str, service: String },

    #[error("cannot read manifest {path}: {message}")]
    Io { path: String, message: String },
}

impl From<ManifestError> for GwError {
    fn from(err: ManifestError) -> Self {
        let kind = match &err {
            ManifestError::VariantMismatch { .. } => GwErrorKind::UnsupportedOperation,
            ManifestError::Io { .. } => GwErrorKind::Io,
            _ => GwErrorKind::InvalidInput,
        };
        GwError::new(kind).with_message(err.to_string())
    }
}

/// Fields specific to the file variant
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileFields {
    name: Option<String>,
}

impl FileFields {
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = Some(name.into());
    }

    pub fn unset_name(&mut self) {
        self.name = None;
    }
}

/// Manifest variant
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ManifestKind {
    /// Any service other than `file`; `None` when the field is absent
    Plain { service: Option<String> },
    File(FileFields),
}

/// A mutable, field-sparse bundle manifest
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Manifest {
    id: Option<BundleId>,
    version: Option<u64>,
    date_millis: Option<i64>,
    author: Option<SubscriberId>,
    filesize: Option<u64>,
    filehash: Option<String>,
    kind: ManifestKind,
    extra: BTreeMap<String, String>,
}

impl Default for Manifest {
    fn default() -> Self {
        Self::file()
    }
}

impl Manifest {
    fn with_kind(kind: ManifestKind) -> Self {
        Self {
            id: None,
            version: None,
            date_millis: None,
            author: None,
            filesize: None,
            filehash: None,
            kind,
            extra: BTreeMap::new(),
        }
    }

    /// Empty manifest of the file variant
    pub fn file() -> Self {
        Self::with_kind(ManifestKind::File(FileFields::default()))
    }

    /// Empty manifest of the plain variant for `service`
    ///
    /// Passing `"file"` still yields the file variant.
    pub fn plain(service: impl Into<String>) -> Self {
        let service = service.into();
        if service == SERVICE_FILE {
            return Self::file();
        }
        Self::with_kind(ManifestKind::Plain {
            service: Some(service),
        })
    }

    pub fn kind(&self) -> &ManifestKind {
        &self.kind
    }

    pub fn is_file(&self) -> bool {
        matches!(self.kind, ManifestKind::File(_))
    }

    pub fn as_file(&self) -> Option<&FileFields> {
        match &self.kind {
            ManifestKind::File(fields) => Some(fields),
            ManifestKind::Plain { .. } => None,
        }
    }

    pub fn as_file_mut(&mut self) -> Option<&mut FileFields> {
        match &mut self.kind {
            ManifestKind::File(fields) => Some(fields),
            ManifestKind::Plain { .. } => None,
        }
    }

    /// Service name; empty when a plain manifest has none
    pub fn service(&self) -> &str {
        match &self.kind {
            ManifestKind::File(_) => SERVICE_FILE,
            ManifestKind::Plain { service } => service.as_deref().unwrap_or(""),
        }
    }

    /// Set the file name; fails on any non-file variant
    pub fn set_name(&mut self, name: impl Into<String>) -> Result<(), ManifestError> {
        let service = self.service().to_string();
        match self.as_file_mut() {
            Some(fields) => {
                fields.set_name(name);
                Ok(())
            }
            None => Err(ManifestError::VariantMismatch {
                field: FIELD_NAME,
                service,
            }),
        }
    }

    pub fn id(&self) -> Option<&BundleId> {
        self.id.as_ref()
    }

    pub fn set_id(&mut self, id: BundleId) {
        self.id = Some(id);
    }

    pub fn version(&self) -> Option<u64> {
        self.version
    }

    pub fn set_version(&mut self, version: u64) {
        self.version = Some(version);
    }

    pub fn date_millis(&self) -> Option<i64> {
        self.date_millis
    }

    pub fn set_date_millis(&mut self, date: i64) {
        self.date_millis = Some(date);
    }

    pub fn unset_date_millis(&mut self) {
        self.date_millis = None;
    }

    pub fn author(&self) -> Option<&SubscriberId> {
        self.author.as_ref()
    }

    pub fn set_author(&mut self, author: Option<SubscriberId>) {
        self.author = author;
    }

    pub fn filesize(&self) -> Option<u64> {
        self.filesize
    }

    pub fn set_filesize(&mut self, size: u64) {
        self.filesize = Some(size);
    }

    pub fn unset_filesize(&mut self) {
        self.filesize = None;
    }

    pub fn filehash(&self) -> Option<&str> {
        self.filehash.as_deref()
    }

    pub fn set_filehash(&mut self, hash: impl Into<String>) {
        self.filehash = Some(hash.into());
    }

    pub fn unset_filehash(&mut self) {
        self.filehash = None;
    }

    /// Clear every field derived from the payload or the submission time
    ///
    /// Called whenever the payload may change, so the store recomputes
    /// `filehash` and `filesize` and stamps a fresh `date`.
    pub fn clear_derived(&mut self) {
        self.unset_filehash();
        self.unset_filesize();
        self.unset_date_millis();
    }

    /// Fields this crate does not interpret
    pub fn extra(&self) -> &BTreeMap<String, String> {
        &self.extra
    }

    pub fn set_extra(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.extra.insert(name.into(), value.into());
    }

    /// Parse a manifest from its encoded form
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ManifestError> {
        let body = match bytes.iter().position(|b| *b == 0) {
            Some(nul) => &bytes[..nul],
            None => bytes,
        };
        if body.len() > MAX_MANIFEST_BYTES {
            return Err(ManifestError::TooLarge {
                size: body.len(),
                max: MAX_MANIFEST_BYTES,
            });
        }
        let text = std::str::from_utf8(body).map_err(|_| ManifestError::NotUtf8)?;

        let mut fields: BTreeMap<String, String> = BTreeMap::new();
        let trimmed = text.strip_suffix('\n').unwrap_or(text);
        if !trimmed.is_empty() {
            for (idx, line) in trimmed.split('\n').enumerate() {
                let line_no = idx + 1;
                let (name, value) = line
                    .split_once('=')
                    .ok_or(ManifestError::MissingSeparator { line: line_no })?;
                if !is_valid_field_name(name) {
                    return Err(ManifestError::InvalidFieldName {
                        line: line_no,
                        name: name.to_string(),
                    });
                }
                if fields.insert(name.to_string(), value.to_string()).is_some() {
                    return Err(ManifestError::DuplicateField {
                        name: name.to_string(),
                    });
                }
            }
        }

        Self::from_fields(fields)
    }

    fn from_fields(mut fields: BTreeMap<String, String>) -> Result<Self, ManifestError> {
        let kind = match fields.remove(FIELD_SERVICE) {
            Some(service) if service == SERVICE_FILE => ManifestKind::File(FileFields {
                name: fields.remove(FIELD_NAME),
            }),
            service => ManifestKind::Plain { service },
        };

        let mut manifest = Self::with_kind(kind);
        manifest.id = take_parsed(&mut fields, FIELD_ID, |v| {
            v.parse::<BundleId>().map_err(|e| e.to_string())
        })?;
        manifest.author = take_parsed(&mut fields, FIELD_AUTHOR, |v| {
            v.parse::<SubscriberId>().map_err(|e| e.to_string())
        })?;
        manifest.version = take_parsed(&mut fields, FIELD_VERSION, |v| {
            v.parse::<u64>().map_err(|e| e.to_string())
        })?;
        manifest.date_millis = take_parsed(&mut fields, FIELD_DATE, |v| {
            v.parse::<i64>().map_err(|e| e.to_string())
        })?;
        manifest.filesize = take_parsed(&mut fields, FIELD_FILESIZE, |v| {
            v.parse::<u64>().map_err(|e| e.to_string())
        })?;
        manifest.filehash = take_parsed(&mut fields, FIELD_FILEHASH, |v| {
            if !v.is_empty() && v.chars().all(|c| c.is_ascii_hexdigit()) {
                Ok(v.to_ascii_uppercase())
            } else {
                Err("expected hex digest".to_string())
            }
        })?;
        manifest.extra = fields;
        Ok(manifest)
    }

    /// Load and parse a manifest file
    pub fn read_from_path(path: &Path) -> Result<Self, ManifestError> {
        let bytes = std::fs::read(path).map_err(|e| ManifestError::Io {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        Self::from_bytes(&bytes)
    }

    /// Encode in deterministic field order
    pub fn to_bytes(&self) -> Result<Vec<u8>, ManifestError> {
        let mut lines: Vec<(&str, String)> = Vec::new();
        if let Some(id) = &self.id {
            lines.push((FIELD_ID, id.to_hex()));
        }
        if let Some(version) = self.version {
            lines.push((FIELD_VERSION, version.to_string()));
        }
        if let Some(date) = self.date_millis {
            lines.push((FIELD_DATE, date.to_string()));
        }
        match &self.kind {
            ManifestKind::File(fields) => {
                lines.push((FIELD_SERVICE, SERVICE_FILE.to_string()));
                if let Some(name) = &fields.name {
                    lines.push((FIELD_NAME, name.clone()));
                }
            }
            ManifestKind::Plain {
                service: Some(service),
            } => lines.push((FIELD_SERVICE, service.clone())),
            ManifestKind::Plain { service: None } => {}
        }
        if let Some(size) = self.filesize {
            lines.push((FIELD_FILESIZE, size.to_string()));
        }
        if let Some(hash) = &self.filehash {
            lines.push((FIELD_FILEHASH, hash.clone()));
        }
        if let Some(author) = &self.author {
            lines.push((FIELD_AUTHOR, author.to_hex()));
        }
        for (name, value) in &self.extra {
            if !is_valid_field_name(name) {
                return Err(ManifestError::InvalidFieldName {
                    line: 0,
                    name: name.clone(),
                });
            }
            lines.push((name.as_str(), value.clone()));
        }

        let mut out = String::new();
        for (name, value) in lines {
            if value.contains('\n') || value.contains('\0') {
                return Err(ManifestError::InvalidValue {
                    field: name.to_string(),
                    value: value.escape_debug().to_string(),
                    reason: "values cannot contain newlines or NUL".to_string(),
                });
            }
            out.push_str(name);
            out.push('=');
            out.push_str(&value);
            out.push('\n');
        }
        if out.len() > MAX_MANIFEST_BYTES {
            return Err(ManifestError::TooLarge {
                size: out.len(),
                max: MAX_MANIFEST_BYTES,
            });
        }
        Ok(out.into_bytes())
    }
}

fn is_valid_field_name(name: &str) -> bool {
    !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn take_parsed<T>(
    fields: &mut BTreeMap<String, String>,
    name: &str,
    parse: impl FnOnce(&str) -> Result<T, String>,
) -> Result<Option<T>, ManifestError> {
    match fields.remove(name) {
        None => Ok(None),
        Some(value) => parse(&value)
            .map(Some)
            .map_err(|reason| ManifestError::InvalidValue {
                field: name.to_string(),
                value,
                reason,
            }),
    }
}
