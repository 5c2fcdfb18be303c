//! Per-integration credential bundles
//!
//! Secrets are owned and supplied by the caller on every invocation; the
//! adapters never persist them or reuse sessions across calls. Validation
//! happens before any network I/O.

use crate::error::{AdapterError, Result};
use serde::{Deserialize, Serialize};

const INVALID_SECRET: &str = "Secret not defined or invalid.";

/// Basic-auth credentials for a Jira site
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JiraSecret {
    /// Site domain, with or without scheme (e.g. `mycompany.atlassian.net`)
    pub domain: String,
    pub username: String,
    pub password: String,
}

impl JiraSecret {
    /// Reject the operation if any field is empty
    pub fn validate(&self) -> Result<()> {
        if self.domain.is_empty() || self.username.is_empty() || self.password.is_empty() {
            return Err(AdapterError::Config(INVALID_SECRET.to_string()));
        }
        Ok(())
    }
}

/// Username/password credentials for a Salesforce org
///
/// The security token is appended to the password during login, per the
/// Salesforce username-password flow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SalesforceSecret {
    pub username: String,
    pub password: String,
    pub token: String,
}

impl SalesforceSecret {
    /// Reject the operation if any field is empty
    pub fn validate(&self) -> Result<()> {
        if self.username.is_empty() || self.password.is_empty() || self.token.is_empty() {
            return Err(AdapterError::Config(INVALID_SECRET.to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn jira_secret() -> JiraSecret {
        JiraSecret {
            domain: "jira.example.com".to_string(),
            username: "bob".to_string(),
            password: "hunter2".to_string(),
        }
    }

    #[test]
    fn complete_jira_secret_validates() {
        assert!(jira_secret().validate().is_ok());
    }

    #[test]
    fn jira_secret_rejects_any_empty_field() {
        for field in ["domain", "username", "password"] {
            let mut secret = jira_secret();
            match field {
                "domain" => secret.domain.clear(),
                "username" => secret.username.clear(),
                _ => secret.password.clear(),
            }
            let err = secret.validate().unwrap_err();
            assert_eq!(err.to_string(), "Secret not defined or invalid.");
        }
    }

    #[test]
    fn salesforce_secret_rejects_missing_token() {
        let secret = SalesforceSecret {
            username: "bob@example.com".to_string(),
            password: "hunter2".to_string(),
            token: String::new(),
        };
        assert!(secret.validate().is_err());
    }
}
