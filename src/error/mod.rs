//! Error Handling Module
//!
//! One closed taxonomy (`LlmError`) that every provider failure is mapped onto
//! before it reaches the caller, plus the status-code fallback classifier
//! adapters share.
//!
//! # Example
//!
//! ```rust
//! use llm_dispatch::error::{ErrorKind, LlmError};
//!
//! let error = LlmError::rate_limit("openai", "slow down").with_status(429);
//! assert_eq!(error.kind(), ErrorKind::RateLimit);
//! assert!(error.is_retryable());
//! ```

mod classify;
pub mod types;

pub use classify::{classify_http_status, error_details, retry_after};
pub use types::*;

/// Result type used throughout the crate
pub type Result<T> = std::result::Result<T, LlmError>;
