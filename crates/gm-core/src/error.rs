//! Crate-wide base error type.
//!
//! Sub-crates define their own enums and wrap `GmError` with `#[from]` where
//! they surface configuration or parse failures.

use thiserror::Error;

/// The top-level error type for `gm-core` and a common base for sub-crates.
#[derive(Debug, Error)]
pub enum GmError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("parse error: {0}")]
    Parse(String),
}

/// Shorthand result type for all `gm-*` crates.
pub type GmResult<T> = Result<T, GmError>;
