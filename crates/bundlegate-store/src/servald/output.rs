//! Parsers for the store process's stdout
//!
//! Two shapes exist:
//!
//! - **fields**: one `key:value` pair per line (`rhizome add`)
//! - **table**: a column count line, a header row, then data rows, cells
//!   separated by `:` (`rhizome list`, `keyring list`)
//!
//! Inside a cell, `\:` is a literal colon, `\\` a backslash and `\n` a
//! newline.

use crate::client::AddBundleResult;
use crate::errors::{malformed_output, Result};
use bundlegate_core::{BundleId, BundleTable, SubscriberId};
use std::collections::BTreeMap;

/// Refuse to interpret more than this much stdout
pub const MAX_OUTPUT_BYTES: usize = 4 * 1024 * 1024;

/// Refuse tables wider than this
pub const MAX_COLUMNS: usize = 64;

fn as_text<'a>(op: &str, stdout: &'a [u8]) -> Result<&'a str> {
    if stdout.len() > MAX_OUTPUT_BYTES {
        return Err(malformed_output(
            op,
            format!("{} bytes exceeds limit of {}", stdout.len(), MAX_OUTPUT_BYTES),
        ));
    }
    std::str::from_utf8(stdout).map_err(|_| malformed_output(op, "not valid UTF-8"))
}

/// Split one line into cells on unescaped colons
pub fn split_cells(line: &str) -> Vec<String> {
    let mut cells = Vec::new();
    let mut current = String::new();
    let mut chars = line.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => match chars.next() {
                Some('n') => current.push('\n'),
                Some(other) => current.push(other),
                None => current.push('\\'),
            },
            ':' => cells.push(std::mem::take(&mut current)),
            other => current.push(other),
        }
    }
    cells.push(current);
    cells
}

fn lines(text: &str) -> impl Iterator<Item = &str> {
    text.lines().filter(|l| !l.trim().is_empty())
}

/// Parse `key:value` lines
pub fn parse_fields(op: &str, stdout: &[u8]) -> Result<BTreeMap<String, String>> {
    let text = as_text(op, stdout)?;
    let mut fields = BTreeMap::new();
    for line in lines(text) {
        let (key, value) = line
            .split_once(':')
            .ok_or_else(|| malformed_output(op, format!("line without ':' ({:?})", line)))?;
        let key = key.trim();
        if key.is_empty() || !key.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return Err(malformed_output(op, format!("invalid key {:?}", key)));
        }
        let value = split_cells(value).join(":");
        fields.insert(key.to_string(), value);
    }
    Ok(fields)
}

/// Parse a column-count prefixed table
pub fn parse_table(op: &str, stdout: &[u8]) -> Result<BundleTable> {
    let text = as_text(op, stdout)?;
    let mut rows = lines(text);

    let count_line = rows
        .next()
        .ok_or_else(|| malformed_output(op, "empty output"))?;
    let columns: usize = count_line
        .trim()
        .parse()
        .map_err(|_| malformed_output(op, format!("bad column count {:?}", count_line)))?;
    if columns == 0 || columns > MAX_COLUMNS {
        return Err(malformed_output(
            op,
            format!("column count {} out of range", columns),
        ));
    }

    let header = rows
        .next()
        .ok_or_else(|| malformed_output(op, "missing header row"))?;
    let header = split_cells(header);
    if header.len() != columns {
        return Err(malformed_output(
            op,
            format!("header has {} cells, expected {}", header.len(), columns),
        ));
    }

    let mut table = BundleTable::new(header);
    for (idx, line) in rows.enumerate() {
        table
            .push_row(split_cells(line))
            .map_err(|e| malformed_output(op, format!("row {}: {}", idx + 1, e.message())))?;
    }
    Ok(table)
}

/// Interpret the fields printed by `rhizome add file`
pub fn parse_add_result(op: &str, fields: &BTreeMap<String, String>) -> Result<AddBundleResult> {
    let id_text = fields
        .get("manifestid")
        .ok_or_else(|| malformed_output(op, "missing manifestid"))?;
    let bundle_id: BundleId = id_text
        .parse()
        .map_err(|e| malformed_output(op, format!("manifestid: {}", e)))?;

    let number = |key: &str| -> Result<Option<u64>> {
        fields
            .get(key)
            .map(|v| {
                v.trim()
                    .parse::<u64>()
                    .map_err(|_| malformed_output(op, format!("{} is not a number: {:?}", key, v)))
            })
            .transpose()
    };

    let mut result = AddBundleResult::new(bundle_id);
    result.version = number("version")?;
    result.filesize = number("filesize")?;
    result.service = fields.get("service").cloned();
    result.name = fields.get("name").cloned();
    result.filehash = fields.get("filehash").cloned();
    Ok(result)
}

/// First subscriber id printed by `keyring list`
///
/// Accepts both the table shape (with a `sid` column) and bare
/// `sid:did:name` lines.
pub fn parse_first_identity(op: &str, stdout: &[u8]) -> Result<Option<SubscriberId>> {
    let text = as_text(op, stdout)?;
    let first = match lines(text).next() {
        Some(line) => line,
        None => return Ok(None),
    };

    let sid_text = if first.trim().parse::<usize>().is_ok() {
        let table = parse_table(op, stdout)?;
        if table.is_empty() {
            return Ok(None);
        }
        match table.get(0, "sid") {
            Some(sid) => sid.to_string(),
            None => return Err(malformed_output(op, "keyring table has no sid column")),
        }
    } else {
        split_cells(first).swap_remove(0)
    };

    sid_text
        .parse::<SubscriberId>()
        .map(Some)
        .map_err(|e| malformed_output(op, e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use bundlegate_core::GwErrorKind;

    #[test]
    fn test_split_cells_handles_escapes() {
        assert_eq!(split_cells(r"a:b\:c:d\\e"), vec!["a", "b:c", r"d\e"]);
        assert_eq!(split_cells(""), vec![""]);
        assert_eq!(split_cells(r"x\ny"), vec!["x\ny"]);
    }

    #[test]
    fn test_parse_add_result() {
        let stdout = format!(
            "service:file\nmanifestid:{}\nversion:1700000000000\nfilesize:5\nfilehash:AB\nname:a\\:b.txt\n",
            "cd".repeat(32)
        );
        let fields = parse_fields("rhizome_add", stdout.as_bytes()).unwrap();
        let result = parse_add_result("rhizome_add", &fields).unwrap();

        assert_eq!(result.bundle_id.to_hex(), "CD".repeat(32));
        assert_eq!(result.version, Some(1_700_000_000_000));
        assert_eq!(result.filesize, Some(5));
        assert_eq!(result.name.as_deref(), Some("a:b.txt"));
    }

    #[test]
    fn test_parse_add_result_requires_valid_manifestid() {
        let fields = parse_fields("rhizome_add", b"manifestid:nothex\n").unwrap();
        let err = parse_add_result("rhizome_add", &fields).unwrap_err();
        assert_eq!(err.kind(), GwErrorKind::ExternalService);

        let fields = parse_fields("rhizome_add", b"service:file\n").unwrap();
        assert!(parse_add_result("rhizome_add", &fields).is_err());
    }

    #[test]
    fn test_parse_fields_rejects_garbage() {
        assert!(parse_fields("x", b"no separator here\n").is_err());
        assert!(parse_fields("x", b"bad key:1\n").is_err());
        assert!(parse_fields("x", &[0xff, 0xfe]).is_err());
    }

    #[test]
    fn test_parse_table() {
        let stdout = b"3\nid:version:name\nAA:1:one\nBB:2:two\\:x\n";
        let table = parse_table("rhizome_list", stdout).unwrap();

        assert_eq!(table.columns(), &["id", "version", "name"]);
        assert_eq!(table.len(), 2);
        assert_eq!(table.get(1, "name"), Some("two:x"));
    }

    #[test]
    fn test_parse_table_rejects_ragged_rows() {
        let err = parse_table("rhizome_list", b"2\na:b\n1:2:3\n").unwrap_err();
        assert!(err.message().contains("row 1"));
    }

    #[test]
    fn test_parse_table_rejects_bad_header() {
        assert!(parse_table("rhizome_list", b"").is_err());
        assert!(parse_table("rhizome_list", b"x\n").is_err());
        assert!(parse_table("rhizome_list", b"0\n\n").is_err());
        assert!(parse_table("rhizome_list", b"2\nonly_one\n").is_err());
    }

    #[test]
    fn test_parse_first_identity_both_shapes() {
        let sid = "ef".repeat(32);
        let bare = format!("{}:5551234:alice\n", sid);
        let found = parse_first_identity("keyring_list", bare.as_bytes()).unwrap();
        assert_eq!(found.map(|s| s.to_hex()), Some("EF".repeat(32)));

        let table = format!("3\nsid:did:name\n{}:555:bob\n", sid);
        let found = parse_first_identity("keyring_list", table.as_bytes()).unwrap();
        assert!(found.is_some());

        assert_eq!(parse_first_identity("keyring_list", b"").unwrap(), None);
        assert_eq!(
            parse_first_identity("keyring_list", b"3\nsid:did:name\n").unwrap(),
            None
        );
    }
}
