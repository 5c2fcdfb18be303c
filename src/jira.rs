//! Jira integration adapter
//!
//! Issue-lookup operations for conversational flows using the Jira REST API.
//!
//! Every gated operation follows the same path: validate the secret and the
//! ticket key, build a transient basic-auth client, fetch the issue once,
//! classify the outcome, and write a flat result object into the caller's
//! slot. The single-field lookups all funnel through one shared helper that
//! projects one named field out of the issue's `fields` map.

use crate::error::{AdapterError, Result};
use crate::flow::{apply_error_policy, FlowInput, Outcome, Slot};
use crate::secret::JiraSecret;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::time::Duration;
use tracing::{debug, error, warn};

/// Per-request timeout for single issue fetches
const GET_TIMEOUT: Duration = Duration::from_secs(10);

const NO_TICKET: &str = "No ticket defined. Please define a ticket like AB-1234";
const GET_ISSUE_FAILED: &str = "Error while getting Jira issue.";
const NO_ISSUE_FOUND: &str = "Error while getting Jira issue. No issue was found";
const SUMMARY_FAILED: &str = "Error while getting ticket summary";

/// Ticket keys look like SB-2 or TIF-1234
static TICKET_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[A-Za-z]+-\d+").expect("ticket pattern is valid"));

/// Arguments shared by every gated Jira operation
#[derive(Debug, Clone)]
pub struct JiraArgs {
    pub secret: JiraSecret,
    /// The ticket key, e.g. ABC-1234
    pub ticket: String,
    /// Where to store the result
    pub slot: Slot,
    /// Whether an upstream error aborts the operation or is captured
    pub stop_on_error: bool,
}

/// Error body Jira returns for issue-level failures
#[derive(Debug, Deserialize)]
struct JiraErrorBody {
    #[serde(rename = "errorMessages", default)]
    error_messages: Vec<String>,
}

/// Transient Jira client; built fresh for every operation and discarded
pub struct JiraClient {
    http: Client,
    base_url: String,
    username: String,
    password: String,
}

impl JiraClient {
    /// Build a client from a secret
    ///
    /// Returns an error if the HTTP client cannot be created. A domain
    /// without a scheme is assumed to be https.
    pub fn new(secret: &JiraSecret) -> Result<Self> {
        let http = Client::builder().timeout(Duration::from_secs(30)).build()?;

        let domain = secret.domain.trim_end_matches('/');
        let base_url = if domain.starts_with("http://") || domain.starts_with("https://") {
            format!("{}/rest/api/2", domain)
        } else {
            format!("https://{}/rest/api/2", domain)
        };

        Ok(Self {
            http,
            base_url,
            username: secret.username.clone(),
            password: secret.password.clone(),
        })
    }

    /// Fetch a single issue by key as the raw JSON payload
    ///
    /// Failure classification follows the upstream contract: a body carrying
    /// an `errorMessages` list is a structured (policy-covered) error; any
    /// other failure shape is treated as a contract break and is always
    /// fatal. A 2xx response without an issue key counts as not-found.
    pub async fn get_issue(&self, key: &str) -> Result<Value> {
        let url = format!("{}/issue/{}", self.base_url, key);

        debug!(key = %key, "Fetching Jira issue");

        let response = self
            .http
            .get(&url)
            .basic_auth(&self.username, Some(&self.password))
            .timeout(GET_TIMEOUT)
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::OK {
            let issue: Value = response.json().await?;
            if issue_key(&issue).is_none() {
                return Err(AdapterError::NotFound(NO_ISSUE_FOUND.to_string()));
            }
            return Ok(issue);
        }

        let body = response.text().await.unwrap_or_default();
        if let Ok(parsed) = serde_json::from_str::<JiraErrorBody>(&body) {
            if let Some(first) = parsed.error_messages.into_iter().next() {
                return Err(AdapterError::Upstream(first));
            }
        }

        warn!(%status, "Jira error response carried no errorMessages; API contract may have changed");
        Err(AdapterError::UpstreamContract(GET_ISSUE_FAILED.to_string()))
    }
}

fn issue_key(issue: &Value) -> Option<&str> {
    issue.get("key").and_then(Value::as_str).filter(|k| !k.is_empty())
}

fn gate(args: &JiraArgs) -> Result<()> {
    args.secret.validate()?;
    if args.ticket.is_empty() {
        return Err(AdapterError::Config(NO_TICKET.to_string()));
    }
    Ok(())
}

/// Project one field out of the issue; a missing field is null, not an error
fn project_field(issue: &Value, field: &str) -> Value {
    let mut result = Map::new();
    result.insert(
        "ticket".to_string(),
        issue_key(issue).map(|k| json!(k)).unwrap_or(Value::Null),
    );
    result.insert(
        field.to_string(),
        issue
            .pointer(&format!("/fields/{}", field))
            .cloned()
            .unwrap_or(Value::Null),
    );
    Value::Object(result)
}

/// Shared fetch-and-project step behind every single-field lookup
async fn process_issue(input: &mut FlowInput, args: &JiraArgs, field: &str) -> Result<()> {
    let client = JiraClient::new(&args.secret)?;
    let outcome = match client.get_issue(&args.ticket).await {
        Ok(issue) => Outcome::Ok(project_field(&issue, field)),
        Err(err) => apply_error_policy(err, args.stop_on_error)?,
    };
    input.store_outcome(&args.slot, outcome);
    Ok(())
}

/// Extract a ticket key (e.g. SB-2 or TIF-1234) from the utterance text
///
/// Pure local operation, no network call: the first match wins; when nothing
/// matches, the literal `"No Ticket Found"` is stored instead of failing.
pub fn extract_ticket(input: &mut FlowInput, slot: &Slot) {
    let value = match TICKET_PATTERN.find(&input.text) {
        Some(m) => m.as_str().to_string(),
        None => "No Ticket Found".to_string(),
    };
    input.store(slot, Value::String(value));
}

/// Store the status of a ticket (e.g. "In Progress")
pub async fn ticket_status(input: &mut FlowInput, args: &JiraArgs) -> Result<()> {
    gate(args)?;
    process_issue(input, args, "status").await
}

/// Store the assignee of a ticket
pub async fn ticket_assignee(input: &mut FlowInput, args: &JiraArgs) -> Result<()> {
    gate(args)?;
    process_issue(input, args, "assignee").await
}

/// Store the priority of a ticket (e.g. "Normal")
pub async fn ticket_priority(input: &mut FlowInput, args: &JiraArgs) -> Result<()> {
    gate(args)?;
    process_issue(input, args, "priority").await
}

/// Store the resolution of a ticket, if it has one
pub async fn ticket_resolution(input: &mut FlowInput, args: &JiraArgs) -> Result<()> {
    gate(args)?;
    process_issue(input, args, "resolution").await
}

/// Store the reporter of a ticket
pub async fn ticket_reporter(input: &mut FlowInput, args: &JiraArgs) -> Result<()> {
    gate(args)?;
    process_issue(input, args, "reporter").await
}

/// Store the comments on a ticket, if it has any
pub async fn ticket_comments(input: &mut FlowInput, args: &JiraArgs) -> Result<()> {
    gate(args)?;
    process_issue(input, args, "comment").await
}

/// Store the list of people watching a ticket
pub async fn ticket_watchers(input: &mut FlowInput, args: &JiraArgs) -> Result<()> {
    gate(args)?;
    process_issue(input, args, "watches").await
}

/// Store a basic summary of a ticket: type, project, status, assignedTo,
/// reportedBy, resolution and comments; every missing nested field is null
pub async fn ticket_summary(input: &mut FlowInput, args: &JiraArgs) -> Result<()> {
    gate(args)?;
    let client = JiraClient::new(&args.secret)?;
    let outcome = match client.get_issue(&args.ticket).await {
        Ok(issue) => Outcome::Ok(build_summary(&issue)?),
        Err(err) => apply_error_policy(err, args.stop_on_error)?,
    };
    input.store_outcome(&args.slot, outcome);
    Ok(())
}

/// Store the entire raw issue payload, including all metadata
pub async fn all_ticket_info(input: &mut FlowInput, args: &JiraArgs) -> Result<()> {
    gate(args)?;
    let client = JiraClient::new(&args.secret)?;
    let outcome = match client.get_issue(&args.ticket).await {
        Ok(issue) => Outcome::Ok(issue),
        Err(err) => apply_error_policy(err, args.stop_on_error)?,
    };
    input.store_outcome(&args.slot, outcome);
    Ok(())
}

/// Hand-built projection of the fixed summary fields
fn build_summary(issue: &Value) -> Result<Value> {
    // `fields` present but not an object means the payload shape moved
    // under us; surface that instead of producing an all-null summary.
    if let Some(fields) = issue.get("fields") {
        if !fields.is_object() {
            error!("Jira issue payload had a non-object fields entry");
            return Err(AdapterError::Extraction(SUMMARY_FAILED.to_string()));
        }
    }

    let field = |path: &str| issue.pointer(path).cloned().unwrap_or(Value::Null);

    Ok(json!({
        "ticket": field("/key"),
        "type": field("/fields/issuetype/name"),
        "project": field("/fields/project/name"),
        "status": field("/fields/status/name"),
        "assignedTo": field("/fields/assignee/emailAddress"),
        "reportedBy": field("/fields/reporter/emailAddress"),
        "resolution": field("/fields/resolution/name"),
        "comments": field("/fields/comment/comments"),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_secret() -> JiraSecret {
        JiraSecret {
            domain: "jira.example.com".to_string(),
            username: "bob".to_string(),
            password: "hunter2".to_string(),
        }
    }

    #[test]
    fn client_assumes_https_for_bare_domains() {
        let client = JiraClient::new(&test_secret()).expect("client");
        assert_eq!(client.base_url, "https://jira.example.com/rest/api/2");
    }

    #[test]
    fn client_keeps_an_explicit_scheme() {
        let mut secret = test_secret();
        secret.domain = "http://127.0.0.1:8080/".to_string();
        let client = JiraClient::new(&secret).expect("client");
        assert_eq!(client.base_url, "http://127.0.0.1:8080/rest/api/2");
    }

    #[test]
    fn extract_ticket_takes_the_first_match() {
        let mut input = FlowInput::new("Please check SB-2 today, then TIF-1234");
        extract_ticket(&mut input, &Slot::context("ticket"));
        assert_eq!(input.context.get("ticket"), Some(&json!("SB-2")));
    }

    #[test]
    fn extract_ticket_stores_sentinel_when_nothing_matches() {
        let mut input = FlowInput::new("no ticket mentioned");
        extract_ticket(&mut input, &Slot::context("ticket"));
        assert_eq!(input.context.get("ticket"), Some(&json!("No Ticket Found")));
    }

    #[test]
    fn extract_ticket_matches_lowercase_keys() {
        let mut input = FlowInput::new("see ab-12 for details");
        extract_ticket(&mut input, &Slot::input("ticket"));
        assert_eq!(input.input.get("ticket"), Some(&json!("ab-12")));
    }

    #[test]
    fn project_field_keeps_the_raw_field_value() {
        let issue = json!({
            "key": "TEST-1",
            "fields": { "status": { "name": "In Progress" } }
        });
        let projected = project_field(&issue, "status");
        assert_eq!(
            projected,
            json!({ "ticket": "TEST-1", "status": { "name": "In Progress" } })
        );
    }

    #[test]
    fn project_field_defaults_missing_fields_to_null() {
        let issue = json!({ "key": "TEST-1", "fields": {} });
        let projected = project_field(&issue, "resolution");
        assert_eq!(projected, json!({ "ticket": "TEST-1", "resolution": null }));
    }

    #[test]
    fn summary_defaults_every_missing_nested_field() {
        let issue = json!({
            "key": "TEST-1",
            "fields": {
                "issuetype": { "name": "Bug" },
                "status": { "name": "Open" },
                "reporter": { "emailAddress": "bob@bob.com" }
            }
        });
        let summary = build_summary(&issue).expect("summary");
        assert_eq!(summary["ticket"], json!("TEST-1"));
        assert_eq!(summary["type"], json!("Bug"));
        assert_eq!(summary["status"], json!("Open"));
        assert_eq!(summary["reportedBy"], json!("bob@bob.com"));
        assert_eq!(summary["assignedTo"], Value::Null);
        assert_eq!(summary["project"], Value::Null);
        assert_eq!(summary["resolution"], Value::Null);
        assert_eq!(summary["comments"], Value::Null);
    }

    #[test]
    fn summary_rejects_a_malformed_fields_entry() {
        let issue = json!({ "key": "TEST-1", "fields": "oops" });
        let err = build_summary(&issue).unwrap_err();
        assert!(matches!(err, AdapterError::Extraction(_)));
    }

    #[test]
    fn gate_rejects_an_empty_ticket() {
        let args = JiraArgs {
            secret: test_secret(),
            ticket: String::new(),
            slot: Slot::context("result"),
            stop_on_error: false,
        };
        let err = gate(&args).unwrap_err();
        assert_eq!(
            err.to_string(),
            "No ticket defined. Please define a ticket like AB-1234"
        );
    }
}
