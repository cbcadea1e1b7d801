//! Error types for the feedback client.
//!
//! # Design
//! `NotConfigured` gets a dedicated variant because every façade operation
//! checks it before any I/O, and hosts show a setup hint rather than a network
//! error. Non-2xx responses with a readable body become `ServerError` so the
//! message can be shown verbatim; anything the client cannot make sense of is
//! `InvalidResponse`.

use thiserror::Error;

/// Errors surfaced by `FeedbackClient`, `ConfigHolder` and `FeedbackKit`.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FeedbackError {
    /// An operation was attempted before `configure`.
    #[error("feedback kit is not configured")]
    NotConfigured,

    /// The response was missing, unparseable, or non-2xx without a body.
    #[error("invalid response from feedback service")]
    InvalidResponse,

    /// The server returned a non-2xx status with a readable body.
    #[error("{0}")]
    ServerError(String),

    /// The host transport failed before a response was received.
    #[error("transport error: {0}")]
    Transport(String),

    /// A 2xx body could not be decoded into the expected shape.
    #[error("decode failed: {0}")]
    Decode(String),

    /// The request payload could not be serialized to JSON.
    #[error("serialization failed: {0}")]
    Serialization(String),

    /// The local key-value store could not be read or written.
    #[error("storage error: {0}")]
    Storage(String),
}

/// Result alias used throughout `feedback-core`.
pub type Result<T> = std::result::Result<T, FeedbackError>;
