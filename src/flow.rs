//! Caller contract shared by both adapters
//!
//! A flow engine hands every operation a [`FlowInput`] (the record carried
//! through one conversation turn) plus a [`Slot`] naming where the result
//! must be written. Operations never read a slot's prior contents; they
//! overwrite the named key and nothing else.

use crate::error::{AdapterError, Result};
use serde_json::{json, Map, Value};

/// Which caller-owned map an operation writes its result into
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    /// The conversation context, persisted across turns by the engine
    Context,
    /// The input object for the current turn only
    Input,
}

/// A named, write-only slot in caller-owned state
///
/// Replaces the per-operation "write to context?" boolean: the caller picks
/// the destination once when building the slot, and operations just store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Slot {
    pub key: String,
    pub target: Target,
}

impl Slot {
    /// Slot in the conversation context map
    pub fn context(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            target: Target::Context,
        }
    }

    /// Slot in the current turn's input map
    pub fn input(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            target: Target::Input,
        }
    }
}

/// The caller-owned record carried through one flow turn
///
/// The adapter mutates it in place; ownership stays with the flow engine.
#[derive(Debug, Clone, Default)]
pub struct FlowInput {
    /// The current utterance text
    pub text: String,
    /// Conversation context map
    pub context: Map<String, Value>,
    /// Input map for the current turn
    pub input: Map<String, Value>,
}

impl FlowInput {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Default::default()
        }
    }

    /// Overwrite the slot's key with a value. Prior contents are never read.
    pub fn store(&mut self, slot: &Slot, value: Value) {
        let map = match slot.target {
            Target::Context => &mut self.context,
            Target::Input => &mut self.input,
        };
        map.insert(slot.key.clone(), value);
    }

    pub(crate) fn store_outcome(&mut self, slot: &Slot, outcome: Outcome) {
        self.store(slot, outcome.into_value());
    }
}

/// Resolution of one adapter call
///
/// Distinct from the hard-failure channel (`Err`): a `Degraded` outcome means
/// the upstream reported a recognized error and the caller opted to continue,
/// so the error payload is stored as if it were a result.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// Normalized success payload
    Ok(Value),
    /// Captured upstream error message, stored as `{"error": message}`
    Degraded(String),
}

impl Outcome {
    /// The value that gets written to the slot
    pub fn into_value(self) -> Value {
        match self {
            Outcome::Ok(value) => value,
            Outcome::Degraded(message) => json!({ "error": message }),
        }
    }
}

/// Apply the caller's stop-on-error policy to an upstream failure
///
/// Only [`AdapterError::Upstream`] is policy-covered: with
/// `stop_on_error=false` it degrades into a storable payload. Every other
/// variant propagates regardless of the flag - a transport failure or an
/// unrecognized response shape is not an upstream-reported error, so there
/// is no message worth handing to the conversation.
pub fn apply_error_policy(err: AdapterError, stop_on_error: bool) -> Result<Outcome> {
    match err {
        AdapterError::Upstream(message) if !stop_on_error => Ok(Outcome::Degraded(message)),
        other => Err(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_routes_by_target() {
        let mut input = FlowInput::new("hello");

        input.store(&Slot::context("result"), json!(1));
        input.store(&Slot::input("result"), json!(2));

        assert_eq!(input.context.get("result"), Some(&json!(1)));
        assert_eq!(input.input.get("result"), Some(&json!(2)));
    }

    #[test]
    fn store_overwrites_without_reading() {
        let mut input = FlowInput::new("");
        let slot = Slot::context("ticket");

        input.store(&slot, json!({ "old": true }));
        input.store(&slot, json!("SB-2"));

        assert_eq!(input.context.get("ticket"), Some(&json!("SB-2")));
    }

    #[test]
    fn degraded_outcome_becomes_error_object() {
        let value = Outcome::Degraded("boom".to_string()).into_value();
        assert_eq!(value, json!({ "error": "boom" }));
    }

    #[test]
    fn policy_degrades_upstream_errors_when_continuing() {
        let outcome =
            apply_error_policy(AdapterError::Upstream("bad".to_string()), false).unwrap();
        assert_eq!(outcome, Outcome::Degraded("bad".to_string()));
    }

    #[test]
    fn policy_propagates_upstream_errors_when_stopping() {
        let err = apply_error_policy(AdapterError::Upstream("bad".to_string()), true).unwrap_err();
        assert!(matches!(err, AdapterError::Upstream(msg) if msg == "bad"));
    }

    #[test]
    fn policy_never_degrades_contract_breaks() {
        // The unrecognized-shape branch is always fatal, even when continuing.
        let err = apply_error_policy(
            AdapterError::UpstreamContract("API changed".to_string()),
            false,
        )
        .unwrap_err();
        assert!(matches!(err, AdapterError::UpstreamContract(_)));
    }
}
