use crate::error::NotifyError;
use crate::models::{Channel, DATE_FORMAT, DebtItem, EventKind, NotificationEvent, Webhooks};
use anyhow::{Context, Result};
use log::debug;
use reqwest::blocking::Client;
use serde_json::{Value, json};
use std::time::Duration;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Delivers a preformatted message to a channel
pub trait NotificationSink {
    fn send(&self, channel: Channel, message: &str) -> Result<(), NotifyError>;
}

/// Sends messages to chat webhooks (Slack, Discord, Teams)
pub struct WebhookNotifier {
    webhooks: Webhooks,
    client: Client,
}

impl WebhookNotifier {
    pub fn new(webhooks: Webhooks) -> Result<Self> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("Failed to build webhook client")?;
        Ok(Self { webhooks, client })
    }
}

impl NotificationSink for WebhookNotifier {
    fn send(&self, channel: Channel, message: &str) -> Result<(), NotifyError> {
        if channel == Channel::Jira {
            return Err(NotifyError::Unsupported(channel));
        }
        let url = self
            .webhooks
            .url_for(channel)
            .ok_or(NotifyError::NoDestination(channel))?;

        debug!("Sending {} notification", channel);
        let response = self
            .client
            .post(url)
            .json(&webhook_payload(channel, message))
            .send()
            .map_err(|source| NotifyError::Http { channel, source })?;

        let status = response.status();
        if !status.is_success() {
            return Err(NotifyError::Status { channel, status });
        }
        Ok(())
    }
}

/// JSON body expected by each chat service
pub fn webhook_payload(channel: Channel, message: &str) -> Value {
    match channel {
        Channel::Discord => json!({ "content": message }),
        _ => json!({ "text": message }),
    }
}

/// Render the message for an event
pub fn format_event(event: &NotificationEvent<'_>, contact: Option<&str>) -> String {
    match event.kind {
        EventKind::Expired => format_expired_message(event.item, event.ticket_key, contact),
        EventKind::ExpiringSoon => format_warning_message(event.item, event.days_left, contact),
    }
}

pub fn format_expired_message(item: &DebtItem, ticket_key: Option<&str>, contact: Option<&str>) -> String {
    let mut message = format!(
        "🚨 DebtBomb exploded\n{}\n{}\nOwner: {}\nExpires: {}",
        item.file_path.display(),
        item.reason.as_deref().unwrap_or(""),
        owner_line(item, contact),
        item.expire.format(DATE_FORMAT)
    );
    if let Some(severity) = &item.severity {
        message.push_str(&format!("\nSeverity: {}", severity));
    }
    if let Some(key) = ticket_key {
        message.push_str(&format!("\nJira: {}", key));
    }
    message
}

pub fn format_warning_message(item: &DebtItem, days_left: i64, contact: Option<&str>) -> String {
    format!(
        "⏳ DebtBomb warning ({} days left)\n{}\n{}\nOwner: {}\nExpires: {}",
        days_left,
        item.file_path.display(),
        item.reason.as_deref().unwrap_or(""),
        owner_line(item, contact),
        item.expire.format(DATE_FORMAT)
    )
}

fn owner_line(item: &DebtItem, contact: Option<&str>) -> String {
    let owner = item.owner.as_deref().unwrap_or("");
    match contact {
        Some(contact) => format!("{} ({})", owner, contact),
        None => owner.to_string(),
    }
}
