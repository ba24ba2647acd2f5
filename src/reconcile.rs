//! Level-triggered reconciliation of scan results against ticket state.
//!
//! Every run recomputes, from scratch, which items are expired and which
//! identities the store already tracks, then applies one transition per item:
//!
//! | item            | tracked | transition |
//! |-----------------|---------|------------|
//! | expired         | no      | open       |
//! | expired         | yes     | keep       |
//! | in warning window | -     | warn       |
//! | anything else   | yes     | close      |
//!
//! Expired items are processed first, then warnings, then stale entries.
//! The store is saved once at the end, whatever the external calls did.

use crate::error::NotifyError;
use crate::jira::{NewTicket, TicketTracker};
use crate::models::{Channel, Config, DATE_FORMAT, DebtItem, EventKind, NotificationEvent};
use crate::notify::{NotificationSink, format_event};
use crate::state::TicketStateStore;
use anyhow::Result;
use chrono::NaiveDate;
use log::{debug, info, warn};
use std::collections::HashSet;

/// Per-run knobs, usually from the command line
#[derive(Debug, Clone, Default)]
pub struct ReconcileOptions {
    /// Skip warnings for items that have not expired yet
    pub expired_only: bool,

    /// Largest days-left that still warns; `None` warns for any future date
    pub warn_within_days: Option<i64>,
}

/// Counts of what a run did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileSummary {
    pub opened: usize,
    pub kept: usize,
    pub warned: usize,
    pub closed: usize,
    pub tickets_created: usize,
    pub notifications_sent: usize,
    pub failures: usize,
}

/// Drives ticket and notification collaborators from one scan result
pub struct Reconciler<'a> {
    config: &'a Config,
    tracker: Option<&'a dyn TicketTracker>,
    sink: &'a dyn NotificationSink,
    today: NaiveDate,
}

impl<'a> Reconciler<'a> {
    pub fn new(
        config: &'a Config,
        tracker: Option<&'a dyn TicketTracker>,
        sink: &'a dyn NotificationSink,
        today: NaiveDate,
    ) -> Self {
        Self {
            config,
            tracker,
            sink,
            today,
        }
    }

    /// Apply all transitions for `items` and persist the store.
    ///
    /// Only a failure to save the store is returned as an error.
    pub fn sync_and_notify(
        &self,
        items: &[DebtItem],
        store: &mut TicketStateStore,
        options: &ReconcileOptions,
    ) -> Result<ReconcileSummary> {
        let mut summary = ReconcileSummary::default();

        let expired: Vec<&DebtItem> = items.iter().filter(|item| item.is_expired).collect();
        let expiring: Vec<(&DebtItem, i64)> = if options.expired_only {
            Vec::new()
        } else {
            items
                .iter()
                .filter(|item| !item.is_expired)
                .map(|item| (item, item.days_left(self.today)))
                .filter(|(_, days_left)| in_warning_window(*days_left, options.warn_within_days))
                .collect()
        };
        let expired_ids: HashSet<&str> = items
            .iter()
            .filter(|item| item.is_expired)
            .map(|item| item.id.as_str())
            .collect();

        for item in expired {
            match store.get(&item.id).map(str::to_string) {
                None => self.open(item, store, &mut summary),
                Some(ticket_key) => self.keep(item, &ticket_key, &mut summary),
            }
        }

        for (item, days_left) in expiring {
            summary.warned += 1;
            self.notify(
                NotificationEvent {
                    kind: EventKind::ExpiringSoon,
                    item,
                    days_left,
                    ticket_key: None,
                },
                &mut summary,
            );
        }

        for (id, ticket_key) in store.snapshot() {
            if !expired_ids.contains(id.as_str()) {
                self.close(&id, &ticket_key, store, &mut summary);
            }
        }

        store.save()?;
        Ok(summary)
    }

    fn open(&self, item: &DebtItem, store: &mut TicketStateStore, summary: &mut ReconcileSummary) {
        summary.opened += 1;

        let ticket_key = match self.tracker {
            Some(tracker) if self.config.wants_tickets_for_expired() => {
                match tracker.create_ticket(&self.new_ticket(item)) {
                    Ok(key) => {
                        info!("Created Jira ticket {} for {}", key, item.id);
                        store.set(&item.id, &key);
                        summary.tickets_created += 1;
                        Some(key)
                    }
                    Err(err) => {
                        warn!("Failed to create Jira ticket for {}: {}", item.id, err);
                        summary.failures += 1;
                        None
                    }
                }
            }
            _ => None,
        };

        self.notify(
            NotificationEvent {
                kind: EventKind::Expired,
                item,
                days_left: item.days_left(self.today),
                ticket_key: ticket_key.as_deref(),
            },
            summary,
        );
    }

    fn keep(&self, item: &DebtItem, ticket_key: &str, summary: &mut ReconcileSummary) {
        summary.kept += 1;
        debug!("{} already tracked by {}", item.id, ticket_key);

        let (Some(tracker), Some(severity)) = (self.tracker, item.severity.as_deref()) else {
            return;
        };
        if let Err(err) = tracker.update_priority(ticket_key, severity) {
            warn!("Failed to update priority of {}: {}", ticket_key, err);
            summary.failures += 1;
        }
    }

    fn close(&self, id: &str, ticket_key: &str, store: &mut TicketStateStore, summary: &mut ReconcileSummary) {
        summary.closed += 1;

        if let Some(tracker) = self.tracker {
            match tracker.close_ticket(ticket_key) {
                Ok(()) => info!("Closed ticket {} for {}", ticket_key, id),
                Err(err) => {
                    warn!("Failed to close ticket {}: {}", ticket_key, err);
                    summary.failures += 1;
                }
            }
        }
        store.remove(id);
    }

    fn new_ticket(&self, item: &DebtItem) -> NewTicket<'a> {
        let config: &'a Config = self.config;
        let jira = &config.jira;
        NewTicket {
            project: &jira.default_project,
            summary: format!("Expired tech debt: {}", item.reason.as_deref().unwrap_or("")),
            description: format!(
                "File: {}\nExpires: {}\nOwner: {}\nSeverity: {}\n\nSnippet:\n{}",
                item.file_path.display(),
                item.expire.format(DATE_FORMAT),
                item.owner.as_deref().unwrap_or(""),
                item.severity.as_deref().unwrap_or(""),
                item.snippet
            ),
            issue_type: &jira.issue_type,
            priority: item.severity.clone(),
        }
    }

    /// Send the event to every matching message rule
    fn notify(&self, event: NotificationEvent<'_>, summary: &mut ReconcileSummary) {
        let contact = self.config.contact_for(event.item.owner.as_deref());
        let mut message: Option<String> = None;

        for rule in &self.config.notify {
            if rule.via == Channel::Jira || !rule.matches(event.kind, event.days_left) {
                continue;
            }
            let text = message.get_or_insert_with(|| format_event(&event, contact));
            match self.sink.send(rule.via, text) {
                Ok(()) => summary.notifications_sent += 1,
                Err(NotifyError::NoDestination(channel)) => {
                    debug!("No destination configured for {}, skipping", channel);
                }
                Err(err) => {
                    warn!("Failed to send notification via {}: {}", rule.via, err);
                    summary.failures += 1;
                }
            }
        }
    }
}

/// Warn for today onwards, up to the horizon when one is set
fn in_warning_window(days_left: i64, horizon: Option<i64>) -> bool {
    days_left >= 0 && horizon.is_none_or(|max| days_left <= max)
}
