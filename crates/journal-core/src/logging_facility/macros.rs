//! Operation boundary logging macros

/// Log the start of an operation
///
/// ```
/// # use journal_core::log_op_start;
/// log_op_start!("compute_change_set");
/// log_op_start!("compute_change_set", journable_type = "WorkPackage");
/// ```
#[macro_export]
macro_rules! log_op_start {
    ($op:expr) => {
        tracing::info!(
            component = module_path!(),
            op = $op,
            event = $crate::journal_core_types::schema::EVENT_START,
        );
    };
    ($op:expr, $($field:tt)*) => {
        tracing::info!(
            component = module_path!(),
            op = $op,
            event = $crate::journal_core_types::schema::EVENT_START,
            $($field)*
        );
    };
}

/// Log the successful end of an operation
///
/// ```
/// # use journal_core::log_op_end;
/// log_op_end!("compute_change_set", duration_ms = 3);
/// ```
#[macro_export]
macro_rules! log_op_end {
    ($op:expr, duration_ms = $duration:expr) => {
        tracing::info!(
            component = module_path!(),
            op = $op,
            event = $crate::journal_core_types::schema::EVENT_END,
            duration_ms = $duration,
        );
    };
    ($op:expr, duration_ms = $duration:expr, $($field:tt)*) => {
        tracing::info!(
            component = module_path!(),
            op = $op,
            event = $crate::journal_core_types::schema::EVENT_END,
            duration_ms = $duration,
            $($field)*
        );
    };
}

/// Log an operation failure
///
/// The error is converted into a `JournalError` so the event always carries
/// a stable `err.code`.
///
/// ```
/// # use journal_core::{log_op_error, errors::DiffError};
/// let err = DiffError::DuplicateKey { key: "status_id".to_string() };
/// log_op_error!("compute_change_set", err, duration_ms = 1);
/// ```
#[macro_export]
macro_rules! log_op_error {
    ($op:expr, $err:expr, duration_ms = $duration:expr) => {{
        let journal_err: $crate::errors::JournalError = $err.into();
        tracing::error!(
            component = module_path!(),
            op = $op,
            event = $crate::journal_core_types::schema::EVENT_END_ERROR,
            duration_ms = $duration,
            err.kind = ?journal_err.kind(),
            err.code = journal_err.code(),
        );
    }};
    ($op:expr, $err:expr, duration_ms = $duration:expr, $($field:tt)*) => {{
        let journal_err: $crate::errors::JournalError = $err.into();
        tracing::error!(
            component = module_path!(),
            op = $op,
            event = $crate::journal_core_types::schema::EVENT_END_ERROR,
            duration_ms = $duration,
            err.kind = ?journal_err.kind(),
            err.code = journal_err.code(),
            $($field)*
        );
    }};
}
