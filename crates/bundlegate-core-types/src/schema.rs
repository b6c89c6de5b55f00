//! Canonical schema constants for structured logging and events
//!
//! These constants keep gateway log events and error reports consistent.

// Canonical field keys for structured logging
pub const FIELD_COMPONENT: &str = "component";
pub const FIELD_OP: &str = "op";
pub const FIELD_EVENT: &str = "event";
pub const FIELD_DURATION_MS: &str = "duration_ms";
pub const FIELD_REQUEST_ID: &str = "request_id";

// Entity identifiers
pub const FIELD_BUNDLE_ID: &str = "bundle_id";
pub const FIELD_URI: &str = "uri";
pub const FIELD_MODE: &str = "mode";

// Staging
pub const FIELD_STAGING_PATH: &str = "staging_path";

// Error fields
pub const FIELD_ERR_KIND: &str = "err.kind";
pub const FIELD_ERR_CODE: &str = "err.code";

// Canonical event names
pub const EVENT_START: &str = "start";
pub const EVENT_END: &str = "end";
pub const EVENT_END_ERROR: &str = "end_error";

// Canonical operation names exposed by the gateway
pub const OP_INSERT: &str = "insert";
pub const OP_QUERY: &str = "query";
pub const OP_OPEN: &str = "open";
pub const OP_DELETE: &str = "delete";
pub const OP_UPDATE: &str = "update";
pub const OP_GET_TYPE: &str = "get_type";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constants_accessibility() {
        assert!(!FIELD_COMPONENT.is_empty());
        assert!(!FIELD_OP.is_empty());
        assert!(!FIELD_BUNDLE_ID.is_empty());
        assert!(!EVENT_START.is_empty());
        assert!(!EVENT_END.is_empty());
        assert!(!EVENT_END_ERROR.is_empty());
    }

    #[test]
    fn test_event_names_are_distinct() {
        assert_ne!(EVENT_START, EVENT_END);
        assert_ne!(EVENT_START, EVENT_END_ERROR);
        assert_ne!(EVENT_END, EVENT_END_ERROR);
    }

    #[test]
    fn test_op_names_are_distinct() {
        let ops = [OP_INSERT, OP_QUERY, OP_OPEN, OP_DELETE, OP_UPDATE, OP_GET_TYPE];
        for (i, a) in ops.iter().enumerate() {
            for b in &ops[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }
}
