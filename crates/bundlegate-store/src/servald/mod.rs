//! Out-of-process store client
//!
//! Drives a `servald`-style control binary. Its stdout is treated as
//! untrusted input: sizes are bounded, ids are re-parsed, and tables must be
//! rectangular before anything reaches the gateway.

mod client;
pub mod output;

pub use client::ServaldClient;
