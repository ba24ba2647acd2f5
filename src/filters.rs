use crate::models::DebtItem;
use anyhow::{Context, Result, anyhow};
use chrono::NaiveDate;

/// Keep only items that have exploded
pub fn filter_expired(items: Vec<DebtItem>) -> Vec<DebtItem> {
    items.into_iter().filter(|item| item.is_expired).collect()
}

/// Keep expired items and those expiring within `window` (e.g. "14d", "2w")
pub fn filter_expiring_within(items: Vec<DebtItem>, window: &str, today: NaiveDate) -> Result<Vec<DebtItem>> {
    let days = parse_duration_days(window)
        .with_context(|| format!("Invalid window format: {}", window))?;

    Ok(filter_due_within(items, days, today))
}

/// Keep expired items and those with at most `days` left
pub fn filter_due_within(items: Vec<DebtItem>, days: i64, today: NaiveDate) -> Vec<DebtItem> {
    items
        .into_iter()
        .filter(|item| item.is_expired || item.days_left(today) <= days)
        .collect()
}

/// Filter items by owner (case-insensitive partial match)
pub fn filter_by_owner(items: Vec<DebtItem>, owner: &str) -> Vec<DebtItem> {
    let owner_lower = owner.to_lowercase();

    items
        .into_iter()
        .filter(|item| {
            item.owner
                .as_deref()
                .is_some_and(|o| o.to_lowercase().contains(&owner_lower))
        })
        .collect()
}

/// Parse a window like "30d", "2w", "6m", "1y" into days
fn parse_duration_days(s: &str) -> Result<i64> {
    let s = s.trim();
    let Some((unit_start, _)) = s.char_indices().last() else {
        return Err(anyhow!("Empty duration string"));
    };
    let (num_str, unit) = s.split_at(unit_start);

    let num: i64 = num_str
        .parse()
        .with_context(|| format!("Invalid number in duration: {}", num_str))?;

    let factor = match unit {
        "d" => 1,
        "w" => 7,
        "m" => 30,
        "y" => 365,
        _ => return Err(anyhow!("Invalid duration unit: {}. Use d, w, m, or y", unit)),
    };

    num.checked_mul(factor)
        .ok_or_else(|| anyhow!("Duration too large: {}", s))
}
