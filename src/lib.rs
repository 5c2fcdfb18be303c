//! flow-adapters - Jira and Salesforce operations for conversational flow engines
//!
//! Each exported operation is a single request/response adapter: validate the
//! caller-supplied secret and arguments, issue one authenticated call against
//! the upstream API, normalize the response into a flat result object, and
//! write that object into the caller-chosen slot of the flow input
//! (conversation context or turn input).
//!
//! # Architecture
//!
//! - **flow**: caller contract (FlowInput, Slot, Outcome, stop-on-error policy)
//! - **secret**: per-integration credential bundles
//! - **jira**: issue lookups (status, assignee, priority, ..., summary, full payload)
//! - **salesforce**: SOQL query and generic-object create/retrieve/delete
//!
//! Operations are stateless: every invocation builds its own client, uses it
//! once, and discards it. Nothing survives past the returned future.

// Shared runtime
pub mod error;
pub mod flow;
pub mod logging;
pub mod secret;

// Integration adapters
pub mod jira;
pub mod salesforce;

// Re-exports
pub use error::{AdapterError, Result};
pub use flow::{FlowInput, Outcome, Slot, Target};
pub use secret::{JiraSecret, SalesforceSecret};
