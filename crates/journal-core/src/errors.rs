use journal_core_types::{RequestId, TraceId};
use thiserror::Error;

/// Result type alias for diffing and history operations
pub type Result<T> = std::result::Result<T, DiffError>;

// ========== Error Facility ==========

/// Canonical error kind taxonomy
///
/// Each kind maps to a stable code that callers (store, CLI, tests) can
/// match on without depending on message text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JournalErrorKind {
    // Caller input
    InvalidInput,
    /// A diff spec names an attribute neither snapshot defines
    UnknownAttribute,
    /// A diff spec names an association neither snapshot defines
    UnknownAssociation,
    /// Two specs produced the same change key
    DuplicateKey,
    /// Snapshots belonging to different journables were compared or appended
    JournableMismatch,

    // History
    /// The version about to be written is already taken or out of order
    VersionConflict,
    NotFound,

    // Configuration
    Config,

    // Integration/IO
    Serialization,
    Persistence,
    Io,

    // Internal
    Internal,
}

impl JournalErrorKind {
    /// Get the stable error code for this kind
    pub fn code(&self) -> &'static str {
        match self {
            JournalErrorKind::InvalidInput => "ERR_INVALID_INPUT",
            JournalErrorKind::UnknownAttribute => "ERR_UNKNOWN_ATTRIBUTE",
            JournalErrorKind::UnknownAssociation => "ERR_UNKNOWN_ASSOCIATION",
            JournalErrorKind::DuplicateKey => "ERR_DUPLICATE_KEY",
            JournalErrorKind::JournableMismatch => "ERR_JOURNABLE_MISMATCH",
            JournalErrorKind::VersionConflict => "ERR_VERSION_CONFLICT",
            JournalErrorKind::NotFound => "ERR_NOT_FOUND",
            JournalErrorKind::Config => "ERR_CONFIG",
            JournalErrorKind::Serialization => "ERR_SERIALIZATION",
            JournalErrorKind::Persistence => "ERR_PERSISTENCE",
            JournalErrorKind::Io => "ERR_IO",
            JournalErrorKind::Internal => "ERR_INTERNAL",
        }
    }
}

/// Canonical structured error type
///
/// Carries a classification plus the journal coordinates (journable, version,
/// change key) of the failing operation.
#[derive(Debug, Clone)]
pub struct JournalError {
    kind: JournalErrorKind,
    op: Option<String>,
    journable: Option<String>,
    version: Option<u32>,
    key: Option<String>,
    request_id: Option<RequestId>,
    trace_id: Option<TraceId>,
    message: String,
    source: Option<Box<JournalError>>,
}

impl JournalError {
    pub fn new(kind: JournalErrorKind) -> Self {
        Self {
            kind,
            op: None,
            journable: None,
            version: None,
            key: None,
            request_id: None,
            trace_id: None,
            message: String::new(),
            source: None,
        }
    }

    /// Add operation context
    pub fn with_op(mut self, op: impl Into<String>) -> Self {
        self.op = Some(op.into());
        self
    }

    /// Add the journable (`Type#id`) the operation was working on
    pub fn with_journable(mut self, journable: impl Into<String>) -> Self {
        self.journable = Some(journable.into());
        self
    }

    pub fn with_version(mut self, version: u32) -> Self {
        self.version = Some(version);
        self
    }

    /// Add the change key or attribute name involved
    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    pub fn with_request_id(mut self, request_id: RequestId) -> Self {
        self.request_id = Some(request_id);
        self
    }

    pub fn with_trace_id(mut self, trace_id: TraceId) -> Self {
        self.trace_id = Some(trace_id);
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    pub fn with_source(mut self, source: JournalError) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    pub fn kind(&self) -> JournalErrorKind {
        self.kind
    }

    pub fn code(&self) -> &'static str {
        self.kind.code()
    }

    pub fn op(&self) -> Option<&str> {
        self.op.as_deref()
    }

    pub fn journable(&self) -> Option<&str> {
        self.journable.as_deref()
    }

    pub fn version(&self) -> Option<u32> {
        self.version
    }

    pub fn key(&self) -> Option<&str> {
        self.key.as_deref()
    }

    pub fn request_id(&self) -> Option<&RequestId> {
        self.request_id.as_ref()
    }

    pub fn trace_id(&self) -> Option<&TraceId> {
        self.trace_id.as_ref()
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn source_error(&self) -> Option<&JournalError> {
        self.source.as_deref()
    }
}

impl std::fmt::Display for JournalError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}]", self.code())?;
        if let Some(op) = &self.op {
            write!(f, " in operation '{}'", op)?;
        }
        if !self.message.is_empty() {
            write!(f, ": {}", self.message)?;
        }
        if let Some(journable) = &self.journable {
            write!(f, " (journable: {})", journable)?;
        }
        if let Some(version) = self.version {
            write!(f, " (version: {})", version)?;
        }
        if let Some(key) = &self.key {
            write!(f, " (key: {})", key)?;
        }
        Ok(())
    }
}

impl std::error::Error for JournalError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_deref()
            .map(|e| e as &(dyn std::error::Error + 'static))
    }
}

// ========== End Error Facility ==========

/// Domain errors raised by the differs and the history lifecycle
///
/// Only configuration-level mismatches surface here. Malformed sub-records
/// and unresolvable references degrade locally and never produce an error.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DiffError {
    /// The diff spec names an attribute that neither snapshot defines
    #[error("Unknown attribute '{attribute}' for journable type {journable_type}")]
    UnknownAttribute {
        journable_type: String,
        attribute: String,
    },

    /// The diff spec names an association that neither snapshot defines
    #[error("Unknown association '{association}' for journable type {journable_type}")]
    UnknownAssociation {
        journable_type: String,
        association: String,
    },

    /// Two specs emitted the same change key
    #[error("Duplicate change key '{key}'")]
    DuplicateKey { key: String },

    /// The two snapshots belong to different journables
    #[error("Snapshot belongs to {actual}, expected {expected}")]
    JournableMismatch { expected: String, actual: String },

    /// A new snapshot's version does not directly follow its predecessor
    #[error("Version {next} does not follow version {previous} for {journable}")]
    NonMonotonicVersion {
        journable: String,
        previous: u32,
        next: u32,
    },

    /// A diff specification is malformed
    #[error("Invalid diff spec: {reason}")]
    InvalidSpec { reason: String },

    /// A configuration file could not be read or parsed
    #[error("Configuration error: {reason}")]
    Config { reason: String },

    #[error("Serialization error: {message}")]
    Serialization { message: String },
}

impl From<DiffError> for JournalError {
    fn from(err: DiffError) -> Self {
        match err {
            DiffError::UnknownAttribute {
                journable_type,
                attribute,
            } => JournalError::new(JournalErrorKind::UnknownAttribute)
                .with_journable(journable_type)
                .with_key(attribute)
                .with_message("attribute is not defined by either snapshot"),

            DiffError::UnknownAssociation {
                journable_type,
                association,
            } => JournalError::new(JournalErrorKind::UnknownAssociation)
                .with_journable(journable_type)
                .with_key(association)
                .with_message("association is not defined by either snapshot"),

            DiffError::DuplicateKey { key } => JournalError::new(JournalErrorKind::DuplicateKey)
                .with_key(key)
                .with_message("change key emitted twice"),

            DiffError::JournableMismatch { expected, actual } => {
                JournalError::new(JournalErrorKind::JournableMismatch)
                    .with_journable(actual.clone())
                    .with_message(format!("expected snapshot of {}, got {}", expected, actual))
            }

            DiffError::NonMonotonicVersion {
                journable,
                previous,
                next,
            } => JournalError::new(JournalErrorKind::VersionConflict)
                .with_journable(journable)
                .with_version(next)
                .with_message(format!("version must follow {}", previous)),

            DiffError::InvalidSpec { reason } | DiffError::Config { reason } => {
                JournalError::new(JournalErrorKind::Config).with_message(reason)
            }

            DiffError::Serialization { message } => {
                JournalError::new(JournalErrorKind::Serialization).with_message(message)
            }
        }
    }
}

impl From<serde_json::Error> for DiffError {
    fn from(err: serde_json::Error) -> Self {
        DiffError::Serialization {
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kind_codes() {
        let cases = [
            (JournalErrorKind::UnknownAttribute, "ERR_UNKNOWN_ATTRIBUTE"),
            (
                JournalErrorKind::UnknownAssociation,
                "ERR_UNKNOWN_ASSOCIATION",
            ),
            (JournalErrorKind::DuplicateKey, "ERR_DUPLICATE_KEY"),
            (JournalErrorKind::VersionConflict, "ERR_VERSION_CONFLICT"),
            (JournalErrorKind::Config, "ERR_CONFIG"),
        ];
        for (kind, expected) in cases {
            assert_eq!(kind.code(), expected, "Wrong code for {:?}", kind);
        }
    }

    #[test]
    fn test_unknown_attribute_converts_with_context() {
        let err: JournalError = DiffError::UnknownAttribute {
            journable_type: "WorkPackage".to_string(),
            attribute: "colour".to_string(),
        }
        .into();

        assert_eq!(err.kind(), JournalErrorKind::UnknownAttribute);
        assert_eq!(err.journable(), Some("WorkPackage"));
        assert_eq!(err.key(), Some("colour"));
    }

    #[test]
    fn test_non_monotonic_version_is_a_version_conflict() {
        let err: JournalError = DiffError::NonMonotonicVersion {
            journable: "Project#1".to_string(),
            previous: 3,
            next: 3,
        }
        .into();

        assert_eq!(err.kind(), JournalErrorKind::VersionConflict);
        assert_eq!(err.version(), Some(3));
    }

    #[test]
    fn test_display_includes_code_op_and_key() {
        let err = JournalError::new(JournalErrorKind::DuplicateKey)
            .with_op("compute_change_set")
            .with_key("custom_field_3")
            .with_message("change key emitted twice");
        let text = err.to_string();

        assert!(text.starts_with("[ERR_DUPLICATE_KEY]"));
        assert!(text.contains("compute_change_set"));
        assert!(text.contains("custom_field_3"));
    }

    #[test]
    fn test_source_chain_is_exposed() {
        let inner = JournalError::new(JournalErrorKind::Io).with_message("disk full");
        let outer = JournalError::new(JournalErrorKind::Persistence).with_source(inner);

        let source = std::error::Error::source(&outer).map(|e| e.to_string());
        assert_eq!(source.as_deref(), Some("[ERR_IO]: disk full"));
        assert_eq!(
            outer.source_error().map(|e| e.kind()),
            Some(JournalErrorKind::Io)
        );
    }
}
