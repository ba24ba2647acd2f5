use crate::models::{DATE_FORMAT, DebtItem};
use anyhow::{Context, Result};
use chrono::NaiveDate;
use regex::Regex;
use sha1::{Digest, Sha1};
use std::path::{Path, PathBuf};

/// Marker token recognised in comments
pub const MARKER_TOKEN: &str = "@debtbomb";

/// Snippet used when a marker is the last content in a file
pub const EOF_SNIPPET: &str = "EOF";

const COMMENT_MARKERS: [&str; 4] = ["//", "#", "--", "/*"];

/// Snippet characters that take part in the fingerprint
const FINGERPRINT_SNIPPET_LEN: usize = 80;

/// Surface syntax of a marker, tried in [`MarkerSyntax::PRIORITY`] order.
///
/// Once a syntax recognises the token on a line, later syntaxes are not
/// consulted, even if the attributes turn out to be invalid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkerSyntax {
    /// `// @debtbomb(expire=2026-02-10, owner=pricing)`
    Parenthetical,
    /// `// @debtbomb expire: 2026-02-10 // owner: pricing`
    FreeForm,
}

impl MarkerSyntax {
    pub const PRIORITY: [MarkerSyntax; 2] = [MarkerSyntax::Parenthetical, MarkerSyntax::FreeForm];
}

/// Outcome of trying one syntax against one line
enum Recognition {
    Absent,
    /// Token present but `expire` missing or unparsable
    Discarded,
    Marker(Marker),
}

struct Marker {
    expire: NaiveDate,
    attributes: Attributes,
    /// Code preceding the comment on the same line
    code_before: Option<String>,
}

#[derive(Debug, Default)]
struct Attributes {
    expire: Option<NaiveDate>,
    owner: Option<String>,
    ticket: Option<String>,
    reason: Option<String>,
    severity: Option<String>,
}

impl Attributes {
    fn apply(&mut self, key: &str, value: &str) {
        let value = value.trim();
        let text = || (!value.is_empty()).then(|| value.to_string());
        match key {
            "expire" => {
                if let Some(date) = parse_expire(value) {
                    self.expire = Some(date);
                }
            }
            "owner" => self.owner = text(),
            "ticket" => self.ticket = text(),
            "reason" => self.reason = text(),
            "severity" => self.severity = text(),
            _ => {}
        }
    }

    fn into_recognition(self, code_before: Option<String>) -> Recognition {
        let Some(expire) = self.expire else {
            return Recognition::Discarded;
        };
        Recognition::Marker(Marker {
            expire,
            attributes: self,
            code_before,
        })
    }
}

/// Extracts debt items from file contents, one line at a time
#[derive(Debug, Clone)]
pub struct MarkerParser {
    parenthetical: Regex,
    key_value: Regex,
}

impl MarkerParser {
    pub fn new() -> Result<Self> {
        let parenthetical = Regex::new(r"(?://|#|--|/\*)\s*@debtbomb\((.*?)\)")
            .context("Failed to compile parenthetical marker regex")?;
        let key_value = Regex::new(r"(expire|owner|ticket|reason|severity)\s*:\s*([^/#*]+)")
            .context("Failed to compile key-value marker regex")?;

        Ok(Self {
            parenthetical,
            key_value,
        })
    }

    /// Extract every valid marker in `content`.
    ///
    /// Markers with code before them on the same line take that code as
    /// their snippet. Markers on their own line wait for the next non-blank,
    /// non-marker line; all markers waiting at that point share it.
    pub fn extract(&self, path: &Path, content: &str) -> Vec<DebtItem> {
        let mut items = Vec::new();
        let mut pending: Vec<DebtItem> = Vec::new();

        for (idx, line) in content.lines().enumerate() {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }

            match self.recognize(line) {
                Some(marker) => {
                    let draft = draft_item(path, idx + 1, trimmed, marker.expire, marker.attributes);
                    match marker.code_before {
                        Some(code) => items.push(finalize(draft, &code)),
                        None => pending.push(draft),
                    }
                }
                None => {
                    items.extend(pending.drain(..).map(|draft| finalize(draft, trimmed)));
                }
            }
        }

        items.extend(pending.into_iter().map(|draft| finalize(draft, EOF_SNIPPET)));
        items
    }

    fn recognize(&self, line: &str) -> Option<Marker> {
        for syntax in MarkerSyntax::PRIORITY {
            match self.recognize_with(syntax, line) {
                Recognition::Absent => continue,
                Recognition::Discarded => return None,
                Recognition::Marker(marker) => return Some(marker),
            }
        }
        None
    }

    fn recognize_with(&self, syntax: MarkerSyntax, line: &str) -> Recognition {
        match syntax {
            MarkerSyntax::Parenthetical => self.recognize_parenthetical(line),
            MarkerSyntax::FreeForm => self.recognize_free_form(line),
        }
    }

    fn recognize_parenthetical(&self, line: &str) -> Recognition {
        let Some(captures) = self.parenthetical.captures(line) else {
            return Recognition::Absent;
        };
        let comment_start = captures.get(0).map_or(0, |m| m.start());
        let attr_list = captures.get(1).map_or("", |m| m.as_str());

        let mut attributes = Attributes::default();
        for part in attr_list.split(',') {
            let part = part.trim();
            let pair = if part.contains('=') {
                part.split_once('=')
            } else {
                part.split_once(':')
            };
            if let Some((key, value)) = pair {
                attributes.apply(key.trim(), value);
            }
        }

        attributes.into_recognition(code_before(line, comment_start))
    }

    fn recognize_free_form(&self, line: &str) -> Recognition {
        let Some(token_idx) = line.find(MARKER_TOKEN) else {
            return Recognition::Absent;
        };
        let rest = &line[token_idx + MARKER_TOKEN.len()..];
        if rest.starts_with('(') {
            return Recognition::Absent;
        }
        let Some(comment_start) = last_comment_marker(&line[..token_idx]) else {
            return Recognition::Absent;
        };

        let mut attributes = Attributes::default();
        for captures in self.key_value.captures_iter(rest) {
            if let (Some(key), Some(value)) = (captures.get(1), captures.get(2)) {
                attributes.apply(key.as_str(), value.as_str());
            }
        }

        attributes.into_recognition(code_before(line, comment_start))
    }
}

/// Strict `YYYY-MM-DD`; chrono alone would accept `2020-1-1`
fn parse_expire(value: &str) -> Option<NaiveDate> {
    let bytes = value.as_bytes();
    let shaped = bytes.len() == 10
        && bytes.iter().enumerate().all(|(idx, b)| match idx {
            4 | 7 => *b == b'-',
            _ => b.is_ascii_digit(),
        });
    if !shaped {
        return None;
    }
    NaiveDate::parse_from_str(value, DATE_FORMAT).ok()
}

/// Code preceding the comment that carries the marker, if any
fn code_before(line: &str, comment_start: usize) -> Option<String> {
    let leading = line.trim_start();
    if COMMENT_MARKERS.iter().any(|marker| leading.starts_with(marker)) {
        return None;
    }
    let code = line[..comment_start].trim();
    (!code.is_empty()).then(|| code.to_string())
}

fn last_comment_marker(prefix: &str) -> Option<usize> {
    COMMENT_MARKERS
        .iter()
        .filter_map(|marker| prefix.rfind(marker))
        .max()
}

fn draft_item(
    path: &Path,
    line_number: usize,
    raw_text: &str,
    expire: NaiveDate,
    attributes: Attributes,
) -> DebtItem {
    DebtItem {
        id: String::new(),
        file_path: PathBuf::from(path),
        line_number,
        expire,
        owner: attributes.owner,
        ticket: attributes.ticket,
        reason: attributes.reason,
        severity: attributes.severity,
        raw_text: raw_text.to_string(),
        snippet: String::new(),
        is_expired: false,
        blame: None,
    }
}

fn finalize(mut item: DebtItem, snippet: &str) -> DebtItem {
    let snippet = snippet.trim();
    item.id = generate_id(&item.file_path, item.reason.as_deref().unwrap_or(""), snippet);
    item.snippet = snippet.to_string();
    item
}

/// Fingerprint of path, reason and the first 80 bytes of the trimmed snippet
pub fn generate_id(path: &Path, reason: &str, snippet: &str) -> String {
    let snippet = snippet.trim();
    let mut end = snippet.len().min(FINGERPRINT_SNIPPET_LEN);
    while !snippet.is_char_boundary(end) {
        end -= 1;
    }

    let mut hasher = Sha1::new();
    hasher.update(path.to_string_lossy().as_bytes());
    hasher.update(reason.as_bytes());
    hasher.update(snippet[..end].as_bytes());
    format!("{:x}", hasher.finalize())
}
