//! Errors reported by the external collaborators.
//!
//! The reconciler treats every one of these as non-fatal: it logs them and
//! moves on to the next item or channel.

use crate::models::Channel;
use reqwest::StatusCode;
use thiserror::Error;

/// Failure of a ticket tracker operation
#[derive(Error, Debug)]
pub enum TrackerError {
    /// Transport-level failure talking to the tracker.
    #[error("request to {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// The tracker answered with a non-success status.
    #[error("jira api error: {status} {body}")]
    Status { status: StatusCode, body: String },

    /// No transition named like done/closed/resolved is available.
    #[error("could not find close transition for issue {0}")]
    NoCloseTransition(String),

    /// The response body did not have the expected shape.
    #[error("unexpected response from jira: {0}")]
    Response(#[from] serde_json::Error),
}

/// Failure delivering a notification to one channel
#[derive(Error, Debug)]
pub enum NotifyError {
    /// The channel has no configured destination.
    #[error("no destination configured for {0}")]
    NoDestination(Channel),

    /// The channel is not delivered through webhooks.
    #[error("{0} is not a message channel")]
    Unsupported(Channel),

    #[error("webhook request for {channel} failed: {source}")]
    Http {
        channel: Channel,
        #[source]
        source: reqwest::Error,
    },

    #[error("webhook for {channel} failed with status {status}")]
    Status { channel: Channel, status: StatusCode },
}
