use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Date format used by markers, reports and messages.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// A single time-bounded debt marker found in code
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DebtItem {
    /// Fingerprint of path, reason and snippet (stable across runs)
    pub id: String,

    /// Path to the file containing the marker, relative to the scan root
    pub file_path: PathBuf,

    /// Line number where the marker was found (1-indexed)
    pub line_number: usize,

    /// Date after which the debt is considered expired
    pub expire: NaiveDate,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ticket: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub severity: Option<String>,

    /// The trimmed line containing the marker
    pub raw_text: String,

    /// Code guarded by the marker
    pub snippet: String,

    /// True once today is strictly after `expire`
    pub is_expired: bool,

    /// Git blame information if requested and available
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blame: Option<BlameInfo>,
}

impl DebtItem {
    /// Whole days from `today` until the expiry date (negative once past it)
    pub fn days_left(&self, today: NaiveDate) -> i64 {
        (self.expire - today).num_days()
    }

    pub fn mark_expired(&mut self, today: NaiveDate) {
        self.is_expired = today > self.expire;
    }

    pub fn owner_or_default(&self) -> &str {
        self.owner.as_deref().unwrap_or("(no owner)")
    }

    pub fn reason_or_default(&self) -> &str {
        self.reason.as_deref().unwrap_or("(no reason)")
    }
}

/// Git blame information for a marker line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlameInfo {
    pub author: String,
    pub author_email: String,

    /// Commit hash (abbreviated)
    pub commit_hash: String,

    pub commit_time: DateTime<Utc>,

    /// Age in days since commit
    pub age_days: i64,
}

impl BlameInfo {
    /// Format age as human-readable string (e.g., "347d", "2m", "1y")
    pub fn age_display(&self) -> String {
        if self.age_days < 30 {
            format!("{}d", self.age_days)
        } else if self.age_days < 365 {
            format!("{}m", self.age_days / 30)
        } else {
            format!("{}y", self.age_days / 365)
        }
    }
}

/// Kind of event a notification rule reacts to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Expired,
    ExpiringSoon,
}

/// Destination of a notification rule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    Jira,
    Slack,
    Discord,
    Teams,
}

impl std::fmt::Display for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Channel::Jira => "jira",
            Channel::Slack => "slack",
            Channel::Discord => "discord",
            Channel::Teams => "teams",
        };
        f.write_str(name)
    }
}

/// Ephemeral event produced by a reconciliation run
#[derive(Debug, Clone, Copy)]
pub struct NotificationEvent<'a> {
    pub kind: EventKind,
    pub item: &'a DebtItem,
    pub days_left: i64,
    pub ticket_key: Option<&'a str>,
}

/// Configuration consumed by the reconciler
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub jira: JiraConfig,

    /// Owner name to contact handle
    #[serde(default)]
    pub owners: HashMap<String, String>,

    #[serde(default)]
    pub notify: Vec<NotifyRule>,

    /// Webhook destinations, populated from the environment
    #[serde(skip)]
    pub webhooks: Webhooks,
}

impl Config {
    /// Whether an expired item without a ticket should get one
    pub fn wants_tickets_for_expired(&self) -> bool {
        self.notify
            .iter()
            .any(|rule| rule.on == EventKind::Expired && rule.via == Channel::Jira)
    }

    pub fn contact_for(&self, owner: Option<&str>) -> Option<&str> {
        owner.and_then(|o| self.owners.get(o)).map(String::as_str)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct JiraConfig {
    #[serde(default)]
    pub default_project: String,

    #[serde(default = "default_issue_type")]
    pub issue_type: String,

    #[serde(skip)]
    pub credentials: Option<JiraCredentials>,
}

impl Default for JiraConfig {
    fn default() -> Self {
        Self {
            default_project: String::new(),
            issue_type: default_issue_type(),
            credentials: None,
        }
    }
}

fn default_issue_type() -> String {
    "Task".to_string()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JiraCredentials {
    pub base_url: String,
    pub email: String,
    pub api_token: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Webhooks {
    pub slack: Option<String>,
    pub discord: Option<String>,
    pub teams: Option<String>,
}

impl Webhooks {
    pub fn url_for(&self, channel: Channel) -> Option<&str> {
        match channel {
            Channel::Slack => self.slack.as_deref(),
            Channel::Discord => self.discord.as_deref(),
            Channel::Teams => self.teams.as_deref(),
            Channel::Jira => None,
        }
    }
}

/// A single `[[notify]]` entry
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct NotifyRule {
    pub on: EventKind,
    pub via: Channel,

    /// For `expiring_soon`, fire only when exactly this many days are left
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub days: Option<i64>,
}

impl NotifyRule {
    pub fn matches(&self, kind: EventKind, days_left: i64) -> bool {
        if self.on != kind {
            return false;
        }
        match (kind, self.days) {
            (EventKind::ExpiringSoon, Some(days)) => days == days_left,
            _ => true,
        }
    }
}

/// Key/count pair in an aggregate breakdown
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountItem {
    pub key: String,
    pub count: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UrgencyStats {
    pub expired: usize,
    pub within_30_days: usize,
    pub within_90_days: usize,
    pub more_than_90_days: usize,
}

/// Aggregate statistics over a scan
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DebtReport {
    pub total_count: usize,
    pub by_owner: Vec<CountItem>,
    pub by_folder: Vec<CountItem>,
    pub by_reason: Vec<CountItem>,
    pub by_urgency: UrgencyStats,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub oldest: Option<DebtItem>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub newest: Option<DebtItem>,

    /// Path that was scanned
    pub scan_path: PathBuf,

    /// When the scan was performed
    pub scan_time: DateTime<Utc>,
}

impl DebtReport {
    /// Create a new report from a collection of items
    pub fn new(items: &[DebtItem], scan_path: PathBuf, today: NaiveDate) -> Self {
        let mut by_owner: HashMap<String, usize> = HashMap::new();
        let mut by_folder: HashMap<String, usize> = HashMap::new();
        let mut by_reason: HashMap<String, usize> = HashMap::new();
        let mut urgency = UrgencyStats::default();

        let day30 = today + Duration::days(30);
        let day90 = today + Duration::days(90);

        for item in items {
            *by_owner.entry(item.owner_or_default().to_string()).or_insert(0) += 1;
            *by_folder.entry(folder_of(&item.file_path)).or_insert(0) += 1;
            *by_reason.entry(item.reason_or_default().to_string()).or_insert(0) += 1;

            if item.is_expired {
                urgency.expired += 1;
            } else {
                if item.expire < day30 {
                    urgency.within_30_days += 1;
                }
                if item.expire < day90 {
                    urgency.within_90_days += 1;
                } else {
                    urgency.more_than_90_days += 1;
                }
            }
        }

        // First minimum / first maximum, so ties resolve to scan order
        let oldest = items
            .iter()
            .reduce(|best, item| if item.expire < best.expire { item } else { best })
            .cloned();
        let newest = items
            .iter()
            .reduce(|best, item| if item.expire > best.expire { item } else { best })
            .cloned();

        Self {
            total_count: items.len(),
            by_owner: sorted_counts(by_owner),
            by_folder: sorted_counts(by_folder),
            by_reason: sorted_counts(by_reason),
            by_urgency: urgency,
            oldest,
            newest,
            scan_path,
            scan_time: Utc::now(),
        }
    }
}

fn folder_of(path: &Path) -> String {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() && parent != Path::new(".") => {
            parent.display().to_string()
        }
        _ => "(root)".to_string(),
    }
}

/// Count descending, then key ascending
fn sorted_counts(counts: HashMap<String, usize>) -> Vec<CountItem> {
    let mut items: Vec<CountItem> = counts
        .into_iter()
        .map(|(key, count)| CountItem { key, count })
        .collect();
    items.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.key.cmp(&b.key)));
    items
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, DATE_FORMAT).unwrap()
    }

    pub(crate) fn item(path: &str, line: usize, expire: &str) -> DebtItem {
        DebtItem {
            id: format!("{}:{}", path, line),
            file_path: PathBuf::from(path),
            line_number: line,
            expire: date(expire),
            owner: None,
            ticket: None,
            reason: None,
            severity: None,
            raw_text: "// @debtbomb".to_string(),
            snippet: "code()".to_string(),
            is_expired: false,
            blame: None,
        }
    }

    #[test]
    fn test_expiration_boundaries() {
        let today = date("2025-06-01");

        let mut past = item("a.rs", 1, "2025-05-31");
        let mut same_day = item("a.rs", 2, "2025-06-01");
        let mut future = item("a.rs", 3, "2025-06-02");
        past.mark_expired(today);
        same_day.mark_expired(today);
        future.mark_expired(today);

        assert!(past.is_expired);
        assert!(!same_day.is_expired);
        assert!(!future.is_expired);
        assert_eq!(same_day.days_left(today), 0);
        assert_eq!(future.days_left(today), 1);
        assert_eq!(past.days_left(today), -1);
    }

    #[test]
    fn test_age_display() {
        let info = BlameInfo {
            author: "Test".to_string(),
            author_email: "test@example.com".to_string(),
            commit_hash: "abc1234".to_string(),
            commit_time: Utc::now(),
            age_days: 15,
        };
        assert_eq!(info.age_display(), "15d");
        assert_eq!(BlameInfo { age_days: 60, ..info.clone() }.age_display(), "2m");
        assert_eq!(BlameInfo { age_days: 400, ..info }.age_display(), "1y");
    }

    #[test]
    fn test_notify_rule_matching() {
        let any_day = NotifyRule {
            on: EventKind::ExpiringSoon,
            via: Channel::Slack,
            days: None,
        };
        let exact = NotifyRule {
            days: Some(7),
            ..any_day.clone()
        };

        assert!(any_day.matches(EventKind::ExpiringSoon, 3));
        assert!(!any_day.matches(EventKind::Expired, 0));
        assert!(exact.matches(EventKind::ExpiringSoon, 7));
        assert!(!exact.matches(EventKind::ExpiringSoon, 6));
    }

    #[test]
    fn test_wants_tickets_for_expired() {
        let mut config = Config::default();
        assert!(!config.wants_tickets_for_expired());

        config.notify.push(NotifyRule {
            on: EventKind::Expired,
            via: Channel::Slack,
            days: None,
        });
        assert!(!config.wants_tickets_for_expired());

        config.notify.push(NotifyRule {
            on: EventKind::Expired,
            via: Channel::Jira,
            days: None,
        });
        assert!(config.wants_tickets_for_expired());
    }

    #[test]
    fn test_debt_report_creation() {
        let today = date("2025-01-01");
        let mut items = vec![
            item("src/a.rs", 1, "2024-12-01"),
            item("src/b.rs", 2, "2025-01-15"),
            item("main.rs", 3, "2025-03-01"),
            item("src/c.rs", 4, "2026-01-01"),
        ];
        items[0].owner = Some("alice".to_string());
        items[1].owner = Some("alice".to_string());
        items[2].reason = Some("hack".to_string());
        for item in &mut items {
            item.mark_expired(today);
        }

        let report = DebtReport::new(&items, PathBuf::from("."), today);
        assert_eq!(report.total_count, 4);
        assert_eq!(
            report.by_owner[0],
            CountItem {
                key: "(no owner)".to_string(),
                count: 2
            }
        );
        assert_eq!(report.by_owner[1].key, "alice");
        assert_eq!(report.by_folder[0].key, "src");
        assert_eq!(report.by_folder[0].count, 3);
        assert_eq!(report.by_folder[1].key, "(root)");
        assert_eq!(report.by_urgency.expired, 1);
        assert_eq!(report.by_urgency.within_30_days, 1);
        assert_eq!(report.by_urgency.within_90_days, 2);
        assert_eq!(report.by_urgency.more_than_90_days, 1);
        assert_eq!(report.oldest.unwrap().line_number, 1);
        assert_eq!(report.newest.unwrap().line_number, 4);
    }

    #[test]
    fn test_empty_report() {
        let report = DebtReport::new(&[], PathBuf::from("."), date("2025-01-01"));
        assert_eq!(report.total_count, 0);
        assert!(report.by_owner.is_empty());
        assert!(report.oldest.is_none());
    }
}
