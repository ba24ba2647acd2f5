use crate::error::TrackerError;
use crate::models::JiraCredentials;
use log::debug;
use reqwest::Method;
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::time::Duration;

/// Labels attached to every ticket opened for expired debt
const TICKET_LABELS: [&str; 2] = ["debtbomb", "expired"];

/// Transition names accepted as "close", compared case-insensitively
const CLOSE_TRANSITIONS: [&str; 4] = ["done", "closed", "resolve", "resolved"];

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Fields of a ticket to create
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTicket<'a> {
    pub project: &'a str,
    pub summary: String,
    pub description: String,
    pub issue_type: &'a str,
    pub priority: Option<String>,
}

/// Narrow interface to an issue tracker
pub trait TicketTracker {
    /// Create a ticket and return its key
    fn create_ticket(&self, ticket: &NewTicket<'_>) -> Result<String, TrackerError>;

    fn update_priority(&self, key: &str, priority: &str) -> Result<(), TrackerError>;

    /// Move the ticket through its close transition
    fn close_ticket(&self, key: &str) -> Result<(), TrackerError>;
}

/// Jira Cloud REST v3 client
#[derive(Clone)]
pub struct JiraClient {
    base_url: String,
    email: String,
    api_token: String,
    client: Client,
}

impl JiraClient {
    pub fn new(credentials: &JiraCredentials) -> Result<Self, TrackerError> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|source| TrackerError::Http {
                url: credentials.base_url.clone(),
                source,
            })?;

        Ok(Self {
            base_url: credentials.base_url.trim_end_matches('/').to_string(),
            email: credentials.email.clone(),
            api_token: credentials.api_token.clone(),
            client,
        })
    }

    fn request(&self, method: Method, path: &str, body: Option<&Value>) -> Result<String, TrackerError> {
        let url = format!("{}{}", self.base_url, path);
        debug!("{} {}", method, url);

        let mut request = self
            .client
            .request(method, &url)
            .basic_auth(&self.email, Some(&self.api_token))
            .header(reqwest::header::ACCEPT, "application/json");
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().map_err(|source| TrackerError::Http {
            url: url.clone(),
            source,
        })?;
        let status = response.status();
        let text = response
            .text()
            .map_err(|source| TrackerError::Http { url, source })?;

        if !status.is_success() {
            return Err(TrackerError::Status { status, body: text });
        }
        Ok(text)
    }
}

impl TicketTracker for JiraClient {
    fn create_ticket(&self, ticket: &NewTicket<'_>) -> Result<String, TrackerError> {
        let body = create_issue_body(ticket);
        let response = self.request(Method::POST, "/rest/api/3/issue", Some(&body))?;

        #[derive(Deserialize)]
        struct Created {
            key: String,
        }
        let created: Created = serde_json::from_str(&response)?;
        Ok(created.key)
    }

    fn update_priority(&self, key: &str, priority: &str) -> Result<(), TrackerError> {
        let body = json!({ "fields": { "priority": { "name": priority } } });
        self.request(Method::PUT, &format!("/rest/api/3/issue/{}", key), Some(&body))?;
        Ok(())
    }

    fn close_ticket(&self, key: &str) -> Result<(), TrackerError> {
        let path = format!("/rest/api/3/issue/{}/transitions", key);
        let response = self.request(Method::GET, &path, None)?;

        let available: Transitions = serde_json::from_str(&response)?;
        let transition_id = find_close_transition(&available.transitions)
            .ok_or_else(|| TrackerError::NoCloseTransition(key.to_string()))?;

        let body = json!({ "transition": { "id": transition_id } });
        self.request(Method::POST, &path, Some(&body))?;
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
struct Transitions {
    #[serde(default)]
    transitions: Vec<Transition>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Transition {
    pub id: String,
    pub name: String,
}

/// First transition whose name means "close"
pub fn find_close_transition(transitions: &[Transition]) -> Option<&str> {
    transitions
        .iter()
        .find(|t| {
            let name = t.name.to_lowercase();
            CLOSE_TRANSITIONS.contains(&name.as_str())
        })
        .map(|t| t.id.as_str())
}

fn create_issue_body(ticket: &NewTicket<'_>) -> Value {
    let mut fields = json!({
        "project": { "key": ticket.project },
        "summary": ticket.summary,
        "description": text_to_adf(&ticket.description),
        "issuetype": { "name": ticket.issue_type },
        "labels": TICKET_LABELS,
    });
    if let Some(priority) = &ticket.priority {
        fields["priority"] = json!({ "name": priority });
    }
    json!({ "fields": fields })
}

/// Minimal Atlassian Document Format document
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AdfDocument {
    pub version: u32,
    #[serde(rename = "type")]
    pub kind: String,
    pub content: Vec<AdfNode>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AdfNode {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub content: Vec<AdfNode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

/// One paragraph per line; empty lines become empty paragraphs
pub fn text_to_adf(text: &str) -> AdfDocument {
    let content = text
        .split('\n')
        .map(|line| AdfNode {
            kind: "paragraph".to_string(),
            content: if line.is_empty() {
                Vec::new()
            } else {
                vec![AdfNode {
                    kind: "text".to_string(),
                    content: Vec::new(),
                    text: Some(line.to_string()),
                }]
            },
            text: None,
        })
        .collect();

    AdfDocument {
        version: 1,
        kind: "doc".to_string(),
        content,
    }
}
