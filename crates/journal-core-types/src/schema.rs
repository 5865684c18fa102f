//! Canonical schema constants for structured logging
//!
//! Every log event emitted by the journal crates uses these keys so that
//! captured events can be asserted on without string drift.

// Envelope fields
pub const FIELD_COMPONENT: &str = "component";
pub const FIELD_OP: &str = "op";
pub const FIELD_EVENT: &str = "event";
pub const FIELD_DURATION_MS: &str = "duration_ms";
pub const FIELD_REQUEST_ID: &str = "request_id";
pub const FIELD_TRACE_ID: &str = "trace_id";

// Journal identity
pub const FIELD_JOURNABLE_TYPE: &str = "journable_type";
pub const FIELD_JOURNABLE_ID: &str = "journable_id";
pub const FIELD_VERSION: &str = "version";

// Diff results
pub const FIELD_CHANGE_COUNT: &str = "change_count";
pub const FIELD_CHANGE_KEY: &str = "change_key";
pub const FIELD_NOOP: &str = "noop";

// Error fields
pub const FIELD_ERR_KIND: &str = "err.kind";
pub const FIELD_ERR_CODE: &str = "err.code";

// Event names
pub const EVENT_START: &str = "start";
pub const EVENT_END: &str = "end";
pub const EVENT_END_ERROR: &str = "end_error";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_names_are_distinct() {
        assert_ne!(EVENT_START, EVENT_END);
        assert_ne!(EVENT_START, EVENT_END_ERROR);
        assert_ne!(EVENT_END, EVENT_END_ERROR);
    }

    #[test]
    fn test_identity_fields_are_distinct() {
        let fields = [FIELD_JOURNABLE_TYPE, FIELD_JOURNABLE_ID, FIELD_VERSION];
        for (i, a) in fields.iter().enumerate() {
            for b in &fields[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }
}
