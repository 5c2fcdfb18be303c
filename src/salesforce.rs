//! Salesforce integration adapter
//!
//! SOQL query and generic-object CRUD operations for conversational flows.
//!
//! Every operation performs a fresh login (SOAP username-password flow, with
//! the security token appended to the password) and then exactly one REST
//! call against the org the login handed back. Sessions are never cached or
//! reused across calls; a failed login skips the operation call entirely.
//! Both failure points are governed by the same stop-on-error policy.

use crate::error::{AdapterError, Result};
use crate::flow::{apply_error_policy, FlowInput, Outcome, Slot};
use crate::secret::SalesforceSecret;
use quick_xml::escape::escape;
use quick_xml::events::Event;
use quick_xml::Reader;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::{json, Value};
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

/// REST API version used for data calls
const API_VERSION: &str = "59.0";
/// Production login host; sandbox orgs use test.salesforce.com
const DEFAULT_LOGIN_URL: &str = "https://login.salesforce.com";

/// Per-request timeout for the SOAP login call
const LOGIN_TIMEOUT: Duration = Duration::from_secs(15);
/// Per-request timeout for data operations
const OP_TIMEOUT: Duration = Duration::from_secs(15);

const NO_SOQL: &str = "No SOQL Query defined.";
const NO_INFO: &str = "No Info defined.";
const NO_ID: &str = "No ID defined.";
const LOGIN_FAILED: &str = "Error while logging in to Salesforce.";
const CALL_FAILED: &str = "Error while calling Salesforce.";

/// Arguments shared by every Salesforce operation
#[derive(Debug, Clone)]
pub struct SalesforceArgs {
    pub secret: SalesforceSecret,
    /// Where to store the result
    pub slot: Slot,
    /// Whether an upstream error aborts the operation or is captured
    pub stop_on_error: bool,
    /// Override the SOAP login host (sandbox orgs); defaults to production
    pub login_url: Option<String>,
}

/// One REST error entry; Salesforce returns these as a JSON array
#[derive(Debug, Deserialize)]
struct RestError {
    message: String,
}

/// Authenticated session from one SOAP login; lives for a single operation
#[derive(Debug, Clone)]
pub struct Session {
    pub session_id: String,
    pub instance_url: String,
}

/// Transient Salesforce client; built fresh for every operation and discarded
pub struct SalesforceClient {
    http: Client,
    login_url: String,
}

impl SalesforceClient {
    /// Client against the production login host
    pub fn new() -> Result<Self> {
        Self::with_login_url(DEFAULT_LOGIN_URL)
    }

    /// Client against a specific login host
    pub fn with_login_url(login_url: impl Into<String>) -> Result<Self> {
        let http = Client::builder().timeout(Duration::from_secs(30)).build()?;
        let login_url = login_url.into().trim_end_matches('/').to_string();
        Ok(Self { http, login_url })
    }

    /// SOAP username-password login
    ///
    /// A SOAP fault (e.g. INVALID_LOGIN) is a structured, policy-covered
    /// failure; a failed login without a fault, or a response missing the
    /// session fields, is a contract break and always fatal.
    pub async fn login(&self, secret: &SalesforceSecret) -> Result<Session> {
        let url = format!("{}/services/Soap/u/{}", self.login_url, API_VERSION);
        let envelope = login_envelope(
            &secret.username,
            &format!("{}{}", secret.password, secret.token),
        );

        debug!(username = %secret.username, "Logging in to Salesforce");

        let response = self
            .http
            .post(&url)
            .header("Content-Type", "text/xml; charset=UTF-8")
            .header("SOAPAction", "login")
            .body(envelope)
            .timeout(LOGIN_TIMEOUT)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if let Some(fault) = xml_text(&body, "faultstring") {
            return Err(AdapterError::Upstream(fault));
        }
        if !status.is_success() {
            warn!(%status, "Salesforce login failed without a SOAP fault");
            return Err(AdapterError::UpstreamContract(LOGIN_FAILED.to_string()));
        }

        match (xml_text(&body, "sessionId"), xml_text(&body, "serverUrl")) {
            (Some(session_id), Some(server_url)) => Ok(Session {
                instance_url: instance_url(&server_url),
                session_id,
            }),
            _ => {
                warn!("Salesforce login response was missing sessionId/serverUrl");
                Err(AdapterError::UpstreamContract(LOGIN_FAILED.to_string()))
            }
        }
    }

    /// Run a SOQL query; the raw result set (records plus metadata) is
    /// returned as-is
    pub async fn query(&self, session: &Session, soql: &str) -> Result<Value> {
        let url = format!(
            "{}/services/data/v{}/query",
            session.instance_url, API_VERSION
        );

        debug!(soql = %soql, "Running SOQL query");

        let response = self
            .http
            .get(&url)
            .query(&[("q", soql)])
            .bearer_auth(&session.session_id)
            .timeout(OP_TIMEOUT)
            .send()
            .await?;

        classify(response).await
    }

    /// Create a record of the named object type; returns the created-record
    /// echo (`{id, success, errors}`)
    pub async fn create(&self, session: &Session, object: &str, info: &Value) -> Result<Value> {
        let url = format!(
            "{}/services/data/v{}/sobjects/{}",
            session.instance_url, API_VERSION, object
        );

        debug!(object = %object, "Creating Salesforce record");

        let response = self
            .http
            .post(&url)
            .json(info)
            .bearer_auth(&session.session_id)
            .timeout(OP_TIMEOUT)
            .send()
            .await?;

        classify(response).await
    }

    /// Retrieve a record of the named object type by id
    pub async fn retrieve(&self, session: &Session, object: &str, id: &str) -> Result<Value> {
        let url = format!(
            "{}/services/data/v{}/sobjects/{}/{}",
            session.instance_url, API_VERSION, object, id
        );

        debug!(object = %object, id = %id, "Retrieving Salesforce record");

        let response = self
            .http
            .get(&url)
            .bearer_auth(&session.session_id)
            .timeout(OP_TIMEOUT)
            .send()
            .await?;

        classify(response).await
    }

    /// Delete a record of the named object type by id
    ///
    /// Salesforce answers 204 with no body; the acknowledgment handed to the
    /// flow is `{"id": id, "success": true}`.
    pub async fn delete(&self, session: &Session, object: &str, id: &str) -> Result<Value> {
        let url = format!(
            "{}/services/data/v{}/sobjects/{}/{}",
            session.instance_url, API_VERSION, object, id
        );

        debug!(object = %object, id = %id, "Deleting Salesforce record");

        let response = self
            .http
            .delete(&url)
            .bearer_auth(&session.session_id)
            .timeout(OP_TIMEOUT)
            .send()
            .await?;

        if response.status() == StatusCode::NO_CONTENT {
            return Ok(json!({ "id": id, "success": true }));
        }
        classify(response).await
    }
}

/// Classify a REST response: success body passes through as raw JSON; an
/// error array yields its first message (policy-covered); anything else is a
/// contract break
async fn classify(response: reqwest::Response) -> Result<Value> {
    let status = response.status();
    let body = response.text().await?;

    if status.is_success() {
        if body.is_empty() {
            return Ok(Value::Null);
        }
        return Ok(serde_json::from_str(&body)?);
    }

    if let Ok(errors) = serde_json::from_str::<Vec<RestError>>(&body) {
        if let Some(first) = errors.into_iter().next() {
            return Err(AdapterError::Upstream(first.message));
        }
    }

    warn!(%status, "Salesforce error response had an unrecognized shape");
    Err(AdapterError::UpstreamContract(CALL_FAILED.to_string()))
}

fn login_envelope(username: &str, password: &str) -> String {
    format!(
        concat!(
            r#"<?xml version="1.0" encoding="utf-8"?>"#,
            r#"<env:Envelope xmlns:env="http://schemas.xmlsoap.org/soap/envelope/""#,
            r#" xmlns:urn="urn:partner.soap.sforce.com">"#,
            "<env:Body><urn:login>",
            "<urn:username>{}</urn:username>",
            "<urn:password>{}</urn:password>",
            "</urn:login></env:Body></env:Envelope>"
        ),
        escape(username),
        escape(password)
    )
}

/// First text content of the named element, matched by local name so SOAP
/// namespace prefixes don't matter; any parse trouble reads as absent
fn xml_text(body: &str, element: &str) -> Option<String> {
    let mut reader = Reader::from_str(body);
    reader.config_mut().trim_text(true);

    let mut inside = false;
    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) if e.local_name().as_ref() == element.as_bytes() => {
                inside = true;
            }
            Ok(Event::Text(ref t)) if inside => {
                return t.xml_content().ok().map(|text| text.into_owned());
            }
            Ok(Event::End(_)) if inside => return None,
            Ok(Event::Eof) => return None,
            Err(_) => return None,
            _ => {}
        }
    }
}

/// Strip the SOAP path off the serverUrl the login returns, leaving the
/// org's instance base (scheme + host)
fn instance_url(server_url: &str) -> String {
    let Some(scheme_end) = server_url.find("://") else {
        return server_url.trim_end_matches('/').to_string();
    };
    let host_start = scheme_end + 3;
    match server_url[host_start..].find('/') {
        Some(path_start) => server_url[..host_start + path_start].to_string(),
        None => server_url.to_string(),
    }
}

fn build_client(args: &SalesforceArgs) -> Result<SalesforceClient> {
    match &args.login_url {
        Some(url) => SalesforceClient::with_login_url(url.clone()),
        None => SalesforceClient::new(),
    }
}

/// Login-then-operate step shared by all four operations; a degraded login
/// stores the error payload and never reaches the operation call
async fn execute<F, Fut>(input: &mut FlowInput, args: &SalesforceArgs, op: F) -> Result<()>
where
    F: FnOnce(SalesforceClient, Session) -> Fut,
    Fut: Future<Output = Result<Value>>,
{
    let client = build_client(args)?;
    let outcome = match client.login(&args.secret).await {
        Ok(session) => match op(client, session).await {
            Ok(value) => Outcome::Ok(value),
            Err(err) => apply_error_policy(err, args.stop_on_error)?,
        },
        Err(err) => apply_error_policy(err, args.stop_on_error)?,
    };
    input.store_outcome(&args.slot, outcome);
    Ok(())
}

/// Run a SOQL query against the connected org and store the raw result set
pub async fn soql_query(input: &mut FlowInput, args: &SalesforceArgs, soql: &str) -> Result<()> {
    args.secret.validate()?;
    if soql.is_empty() {
        return Err(AdapterError::Config(NO_SOQL.to_string()));
    }
    execute(input, args, |client, session| async move {
        client.query(&session, soql).await
    })
    .await
}

/// Create a record of the named entity type from a JSON info payload and
/// store the created-record echo
pub async fn create_entity(
    input: &mut FlowInput,
    args: &SalesforceArgs,
    object: &str,
    info: &Value,
) -> Result<()> {
    args.secret.validate()?;
    if info.is_null() {
        return Err(AdapterError::Config(NO_INFO.to_string()));
    }
    execute(input, args, |client, session| async move {
        client.create(&session, object, info).await
    })
    .await
}

/// Retrieve a record of the named entity type by id and store it
pub async fn retrieve_entity(
    input: &mut FlowInput,
    args: &SalesforceArgs,
    object: &str,
    id: &str,
) -> Result<()> {
    args.secret.validate()?;
    if id.is_empty() {
        return Err(AdapterError::Config(NO_ID.to_string()));
    }
    execute(input, args, |client, session| async move {
        client.retrieve(&session, object, id).await
    })
    .await
}

/// Delete a record of the named entity type by id and store the
/// acknowledgment
pub async fn delete_entity(
    input: &mut FlowInput,
    args: &SalesforceArgs,
    object: &str,
    id: &str,
) -> Result<()> {
    args.secret.validate()?;
    if id.is_empty() {
        return Err(AdapterError::Config(NO_ID.to_string()));
    }
    execute(input, args, |client, session| async move {
        client.delete(&session, object, id).await
    })
    .await
}
