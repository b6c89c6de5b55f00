//! Canonical logging macros
//!
//! Callers must depend on `tracing` directly; the schema constants are
//! reached through `bundlegate_core::core_types`.

/// Log the start of an operation
///
/// # Example
///
/// ```
/// # use bundlegate_core::log_op_start;
/// log_op_start!("insert");
/// log_op_start!("open", bundle_id = "ABCD");
/// ```
#[macro_export]
macro_rules! log_op_start {
    ($op:expr) => {
        tracing::info!(
            component = module_path!(),
            op = $op,
            event = $crate::core_types::schema::EVENT_START,
        );
    };
    ($op:expr, $($field:tt)*) => {
        tracing::info!(
            component = module_path!(),
            op = $op,
            event = $crate::core_types::schema::EVENT_START,
            $($field)*
        );
    };
}

/// Log the successful end of an operation
///
/// # Example
///
/// ```
/// # use bundlegate_core::log_op_end;
/// log_op_end!("insert", duration_ms = 42);
/// ```
#[macro_export]
macro_rules! log_op_end {
    ($op:expr, duration_ms = $duration:expr) => {
        tracing::info!(
            component = module_path!(),
            op = $op,
            event = $crate::core_types::schema::EVENT_END,
            duration_ms = $duration,
        );
    };
    ($op:expr, duration_ms = $duration:expr, $($field:tt)*) => {
        tracing::info!(
            component = module_path!(),
            op = $op,
            event = $crate::core_types::schema::EVENT_END,
            duration_ms = $duration,
            $($field)*
        );
    };
}

/// Log an operation error
///
/// Takes the error by reference so the caller can still return it.
///
/// # Example
///
/// ```
/// # use bundlegate_core::log_op_error;
/// # use bundlegate_core::errors::{GwError, GwErrorKind};
/// let err = GwError::new(GwErrorKind::NotFound).with_message("no such bundle");
/// log_op_error!("open", &err, duration_ms = 10);
/// ```
#[macro_export]
macro_rules! log_op_error {
    ($op:expr, $err:expr, duration_ms = $duration:expr) => {{
        let gw_err: &$crate::errors::GwError = $err;
        tracing::error!(
            component = module_path!(),
            op = $op,
            event = $crate::core_types::schema::EVENT_END_ERROR,
            duration_ms = $duration,
            err.kind = ?gw_err.kind(),
            err.code = gw_err.code(),
            err.message = gw_err.message(),
        );
    }};
    ($op:expr, $err:expr, duration_ms = $duration:expr, $($field:tt)*) => {{
        let gw_err: &$crate::errors::GwError = $err;
        tracing::error!(
            component = module_path!(),
            op = $op,
            event = $crate::core_types::schema::EVENT_END_ERROR,
            duration_ms = $duration,
            err.kind = ?gw_err.kind(),
            err.code = gw_err.code(),
            err.message = gw_err.message(),
            $($field)*
        );
    }};
}
