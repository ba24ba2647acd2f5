use crate::models::DebtItem;
use crate::parser::MarkerParser;
use crate::scanner::Traverser;
use anyhow::{Context, Result};
use chrono::NaiveDate;
use log::debug;
use rayon::ThreadPoolBuilder;
use std::fs;
use std::path::Path;
use std::sync::mpsc;

/// Upper bound on workers, which also bounds simultaneously open files
const MAX_WORKERS: usize = 64;

/// Tuning for an extraction run
#[derive(Debug, Clone)]
pub struct EngineOptions {
    /// Number of parallel extraction workers
    pub workers: usize,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            workers: default_worker_count(),
        }
    }
}

fn default_worker_count() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get() * 4)
        .unwrap_or(8)
        .min(MAX_WORKERS)
}

/// Scan `root` and return every debt item, ordered by expiry date.
///
/// Fails only if the root cannot be read. Items are ordered by expiry date,
/// then path, then line, independent of worker scheduling.
pub fn run(root: &Path, today: NaiveDate) -> Result<Vec<DebtItem>> {
    run_with(root, today, &EngineOptions::default())
}

pub fn run_with(root: &Path, today: NaiveDate, options: &EngineOptions) -> Result<Vec<DebtItem>> {
    let traverser = Traverser::new(root)?;
    let parser = MarkerParser::new()?;

    let pool = ThreadPoolBuilder::new()
        .num_threads(options.workers.clamp(1, MAX_WORKERS))
        .thread_name(|idx| format!("debtbomb-extract-{}", idx))
        .build()
        .context("Failed to start extraction workers")?;

    let (tx, rx) = mpsc::channel::<Vec<DebtItem>>();

    pool.scope(|scope| {
        for path in traverser.paths() {
            let tx = tx.clone();
            let parser = &parser;
            let root = traverser.root();
            scope.spawn(move |_| {
                let items = extract_file(parser, root, &path);
                if !items.is_empty() {
                    // The receiver outlives the scope
                    let _ = tx.send(items);
                }
            });
        }
    });
    drop(tx);

    let mut items: Vec<DebtItem> = rx.into_iter().flatten().collect();
    for item in &mut items {
        item.mark_expired(today);
    }
    sort_items(&mut items);

    debug!("Found {} debt items under {}", items.len(), root.display());
    Ok(items)
}

/// Read one file and extract its items; unreadable files yield nothing
fn extract_file(parser: &MarkerParser, root: &Path, path: &Path) -> Vec<DebtItem> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(err) => {
            debug!("Skipping {}: {}", path.display(), err);
            return Vec::new();
        }
    };
    let content = String::from_utf8_lossy(&bytes);
    let relative = path.strip_prefix(root).unwrap_or(path);

    parser.extract(relative, &content)
}

/// Expiry date ascending, then path and line for equal dates
pub fn sort_items(items: &mut [DebtItem]) {
    items.sort_by(|a, b| {
        a.expire
            .cmp(&b.expire)
            .then_with(|| a.file_path.cmp(&b.file_path))
            .then_with(|| a.line_number.cmp(&b.line_number))
    });
}
