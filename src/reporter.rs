use crate::cli::OutputFormat;
use crate::models::{CountItem, DATE_FORMAT, DebtItem, DebtReport};
use anyhow::{Context, Result};
use chrono::NaiveDate;
use comfy_table::{Cell, Color, ContentArrangement, Table, presets::UTF8_FULL};
use serde::Serialize;
use std::fs;
use std::path::Path;

/// Write rendered output to a file, or stdout when no path is given
pub fn write_output(output: &str, output_path: Option<&Path>) -> Result<()> {
    if let Some(path) = output_path {
        fs::write(path, output)
            .with_context(|| format!("Failed to write output to {}", path.display()))?;
        println!("Output written to {}", path.display());
    } else {
        println!("{}", output);
    }

    Ok(())
}

/// Render the item list for `debtbomb list`
pub fn render_items(items: &[DebtItem], format: OutputFormat, today: NaiveDate) -> Result<String> {
    Ok(match format {
        OutputFormat::Terminal => items_terminal(items, today),
        OutputFormat::Markdown => items_markdown(items, today),
        OutputFormat::Json => serde_json::to_string_pretty(items).context("Failed to serialize items to JSON")?,
    })
}

/// Outcome of `debtbomb check`
#[derive(Debug, Serialize)]
pub struct CheckResult<'a> {
    pub expired: Vec<&'a DebtItem>,
    pub expiring: Vec<&'a DebtItem>,
}

impl<'a> CheckResult<'a> {
    /// Split items into expired ones and those due within `warn_in_days`.
    ///
    /// A window of zero or less disables the warning list.
    pub fn new(items: &'a [DebtItem], warn_in_days: Option<i64>, today: NaiveDate) -> Self {
        let expired = items.iter().filter(|item| item.is_expired).collect();
        let expiring = match warn_in_days {
            Some(days) if days > 0 => items
                .iter()
                .filter(|item| !item.is_expired && item.days_left(today) <= days)
                .collect(),
            _ => Vec::new(),
        };
        Self { expired, expiring }
    }

    pub fn has_expired(&self) -> bool {
        !self.expired.is_empty()
    }
}

pub fn render_check(result: &CheckResult<'_>, json: bool, today: NaiveDate) -> Result<String> {
    if json {
        return serde_json::to_string_pretty(result).context("Failed to serialize check result to JSON");
    }

    let mut output = String::new();
    if result.expired.is_empty() {
        output.push_str("✅ No expired debt bombs\n");
    } else {
        output.push_str(&format!("💥 {} expired debt bomb(s):\n", result.expired.len()));
        for item in &result.expired {
            output.push_str(&format!("  {}\n", describe(item, today)));
        }
    }

    if !result.expiring.is_empty() {
        output.push_str(&format!("\n⏳ {} expiring soon:\n", result.expiring.len()));
        for item in &result.expiring {
            output.push_str(&format!("  {}\n", describe(item, today)));
        }
    }

    Ok(output)
}

/// Render the aggregate report for `debtbomb report`
pub fn render_report(report: &DebtReport, format: OutputFormat) -> Result<String> {
    Ok(match format {
        OutputFormat::Terminal => report_terminal(report),
        OutputFormat::Markdown => report_markdown(report),
        OutputFormat::Json => serde_json::to_string_pretty(report).context("Failed to serialize report to JSON")?,
    })
}

fn describe(item: &DebtItem, today: NaiveDate) -> String {
    format!(
        "{}:{} expires {} ({}) owner: {} reason: {}",
        item.file_path.display(),
        item.line_number,
        item.expire.format(DATE_FORMAT),
        status(item, today),
        item.owner_or_default(),
        item.reason_or_default()
    )
}

fn status(item: &DebtItem, today: NaiveDate) -> String {
    let days = item.days_left(today);
    if item.is_expired {
        format!("expired {} days ago", -days)
    } else {
        format!("{} days left", days)
    }
}

fn new_table(headers: &[&str]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(headers.iter().map(|h| Cell::new(h).fg(Color::Cyan)));
    table
}

fn items_terminal(items: &[DebtItem], today: NaiveDate) -> String {
    if items.is_empty() {
        return "No debt bombs found".to_string();
    }

    let with_blame = items.iter().any(|item| item.blame.is_some());
    let mut headers = vec!["Expires", "Status", "File", "Line", "Owner", "Reason"];
    if with_blame {
        headers.extend(["Author", "Age"]);
    }

    let mut table = new_table(&headers);
    for item in items {
        let color = if item.is_expired { Color::Red } else { Color::Green };
        let mut row = vec![
            Cell::new(item.expire.format(DATE_FORMAT)),
            Cell::new(status(item, today)).fg(color),
            Cell::new(item.file_path.display()),
            Cell::new(item.line_number),
            Cell::new(item.owner_or_default()),
            Cell::new(item.reason_or_default()),
        ];
        if with_blame {
            match &item.blame {
                Some(blame) => row.extend([Cell::new(&blame.author), Cell::new(blame.age_display())]),
                None => row.extend([Cell::new("-"), Cell::new("-")]),
            }
        }
        table.add_row(row);
    }

    format!("{}\nTotal: {}", table, items.len())
}

fn items_markdown(items: &[DebtItem], today: NaiveDate) -> String {
    let mut output = String::from("# DebtBomb Items\n\n");
    if items.is_empty() {
        output.push_str("No debt bombs found.\n");
        return output;
    }

    output.push_str("| Expires | Status | Location | Owner | Reason |\n");
    output.push_str("|---|---|---|---|---|\n");
    for item in items {
        output.push_str(&format!(
            "| {} | {} | `{}:{}` | {} | {} |\n",
            item.expire.format(DATE_FORMAT),
            status(item, today),
            item.file_path.display(),
            item.line_number,
            item.owner_or_default(),
            item.reason_or_default()
        ));
    }
    output
}

fn counts_table(title: &str, counts: &[CountItem]) -> String {
    let mut table = new_table(&[title, "Count"]);
    for entry in counts {
        table.add_row(vec![entry.key.clone(), entry.count.to_string()]);
    }
    format!("Summary by {}:\n{}\n\n", title, table)
}

fn report_terminal(report: &DebtReport) -> String {
    let mut output = String::new();

    let line = "─".repeat(58);
    output.push_str(&format!("╭{}╮\n", line));
    output.push_str(&format!("│ {:^56} │\n", "DebtBomb - Technical Debt Report"));
    output.push_str(&format!("│ Scanned: {:<47} │\n", report.scan_path.display()));
    output.push_str(&format!("│ Total Debt Bombs: {:<38} │\n", report.total_count));
    output.push_str(&format!("╰{}╯\n\n", line));

    let urgency = &report.by_urgency;
    let mut urgency_table = new_table(&["Urgency", "Count"]);
    urgency_table.add_row(vec![Cell::new("Expired").fg(Color::Red), Cell::new(urgency.expired)]);
    urgency_table.add_row(vec![Cell::new("Within 30 days"), Cell::new(urgency.within_30_days)]);
    urgency_table.add_row(vec![Cell::new("Within 90 days"), Cell::new(urgency.within_90_days)]);
    urgency_table.add_row(vec![Cell::new("Later"), Cell::new(urgency.more_than_90_days)]);
    output.push_str(&format!("{}\n\n", urgency_table));

    if !report.by_owner.is_empty() {
        output.push_str(&counts_table("Owner", &report.by_owner));
    }
    if !report.by_folder.is_empty() {
        output.push_str(&counts_table("Folder", &report.by_folder));
    }
    if !report.by_reason.is_empty() {
        output.push_str(&counts_table("Reason", &report.by_reason));
    }

    if let (Some(oldest), Some(newest)) = (&report.oldest, &report.newest) {
        output.push_str(&format!(
            "Oldest: {} ({}:{})\nNewest: {} ({}:{})\n",
            oldest.expire.format(DATE_FORMAT),
            oldest.file_path.display(),
            oldest.line_number,
            newest.expire.format(DATE_FORMAT),
            newest.file_path.display(),
            newest.line_number
        ));
    }

    output
}

fn report_markdown(report: &DebtReport) -> String {
    let mut output = String::new();

    output.push_str("# DebtBomb - Technical Debt Report\n\n");
    output.push_str(&format!("**Scanned**: `{}`\n", report.scan_path.display()));
    output.push_str(&format!("**Total Debt Bombs**: {}\n", report.total_count));
    output.push_str(&format!("**Generated**: {}\n\n", report.scan_time.format("%Y-%m-%d %H:%M:%S UTC")));

    let urgency = &report.by_urgency;
    output.push_str("## Urgency\n\n");
    output.push_str(&format!("- **Expired**: {}\n", urgency.expired));
    output.push_str(&format!("- **Within 30 days**: {}\n", urgency.within_30_days));
    output.push_str(&format!("- **Within 90 days**: {}\n", urgency.within_90_days));
    output.push_str(&format!("- **Later**: {}\n\n", urgency.more_than_90_days));

    for (title, counts) in [
        ("Owner", &report.by_owner),
        ("Folder", &report.by_folder),
        ("Reason", &report.by_reason),
    ] {
        if counts.is_empty() {
            continue;
        }
        output.push_str(&format!("## Summary by {}\n\n", title));
        for entry in counts {
            output.push_str(&format!("- **{}**: {}\n", entry.key, entry.count));
        }
        output.push('\n');
    }

    if let Some(oldest) = &report.oldest {
        output.push_str(&format!(
            "**Oldest**: {} in `{}:{}`\n",
            oldest.expire.format(DATE_FORMAT),
            oldest.file_path.display(),
            oldest.line_number
        ));
    }
    if let Some(newest) = &report.newest {
        output.push_str(&format!(
            "**Newest**: {} in `{}:{}`\n",
            newest.expire.format(DATE_FORMAT),
            newest.file_path.display(),
            newest.line_number
        ));
    }

    output
}
