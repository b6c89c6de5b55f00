//! Structured logging facility for the gateway
//!
//! This module provides:
//! - Single initialization point via `init(profile)`
//! - Structured logging macros (`log_op_start!`, `log_op_end!`, `log_op_error!`)
//! - Test capture mode for deterministic assertions
//!
//! # Usage
//!
//! ```rust
//! use bundlegate_core::logging_facility::{init, Profile};
//!
//! init(Profile::Development);
//! ```
//!
//! Every gateway operation emits exactly one `start` event and exactly one
//! of `end` / `end_error`.

pub mod init;
pub mod macros;
pub mod test_capture;

pub use init::{init, Profile};
pub use test_capture::{init_test_capture, CapturedEvent, TestCapture};
