//! Error types for flow-adapters
//!
//! One enum covering the full failure taxonomy of the adapter operations.
//! Uses thiserror for ergonomic error handling; every variant renders to a
//! human-readable string, since that is all the flow engine surfaces to the
//! conversation author.

use thiserror::Error;

/// Result type alias for adapter operations
pub type Result<T> = std::result::Result<T, AdapterError>;

/// Error type for adapter operations
///
/// Only `Upstream` is subject to the caller's stop-on-error policy (see
/// [`crate::flow::apply_error_policy`]). Every other variant always aborts
/// the operation.
#[derive(Error, Debug)]
pub enum AdapterError {
    /// Missing or invalid secret/argument; raised before any network call
    #[error("{0}")]
    Config(String),

    /// The upstream API reported a recognized, structured error
    #[error("{0}")]
    Upstream(String),

    /// The upstream API failed with an unrecognized shape (contract break)
    #[error("{0}")]
    UpstreamContract(String),

    /// No record exists behind the given identifier
    #[error("{0}")]
    NotFound(String),

    /// Unexpected payload shape while building a local projection
    #[error("{0}")]
    Extraction(String),

    /// HTTP transport errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// XML parsing errors (Salesforce SOAP login)
    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),
}
