//! Output formatting and input helpers shared by the commands.

use std::{
    fs,
    io::{self, BufRead, Write},
    path::Path,
};

use anyhow::{Context, Result};
use blogdesk_client::{dashboard::Confirm, store::DRAFT_KEY_PREFIX};
use blogdesk_shared::{
    category::resolve_slug,
    document::{decode_body, parse_editor_document, EditorBlock, StoredBlock},
    CategoryRef, Timestamp,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

const TITLE_WIDTH: usize = 48;

/// Pretty-prints `value` as JSON on stdout.
pub fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Reads a y/N answer from stdin.
pub struct StdinConfirm;

impl Confirm for StdinConfirm {
    fn confirm(&self, prompt: &str) -> bool {
        eprint!("{prompt} [y/N] ");
        if io::stderr().flush().is_err() {
            return false;
        }
        let mut answer = String::new();
        match io::stdin().lock().read_line(&mut answer) {
            Ok(_) => is_yes(&answer),
            Err(err) => {
                tracing::warn!("failed to read confirmation: {err}");
                false
            },
        }
    }
}

/// Whether a prompt answer means yes.
pub fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

/// Storage key for a user-supplied draft reference: a full `draft_<id>`
/// key, an article id, or `new`.
pub fn normalize_draft_key(raw: &str) -> String {
    let raw = raw.trim();
    if raw.starts_with(DRAFT_KEY_PREFIX) {
        raw.to_string()
    } else {
        format!("{DRAFT_KEY_PREFIX}{raw}")
    }
}

/// Category reference for a slug-or-name typed on the command line.
pub fn category_arg(raw: &str, canonical: &[CategoryRef]) -> CategoryRef {
    let slug = resolve_slug(Some(raw), canonical);
    canonical
        .iter()
        .find(|category| category.slug == slug)
        .cloned()
        .unwrap_or_else(|| CategoryRef::new(raw.trim(), slug))
}

/// Reads an editor document file.
pub fn read_editor_document(path: &Path) -> Result<Vec<EditorBlock>> {
    let raw = fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    parse_editor_document(&raw).with_context(|| format!("{} is not an editor document", path.display()))
}

/// Reads a stored API body. A whole article is accepted too; its
/// `currentPageBody` is used.
pub fn read_api_body(path: &Path) -> Result<Vec<StoredBlock>> {
    let raw = fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    let value: Value = serde_json::from_str(&raw).with_context(|| format!("{} is not JSON", path.display()))?;
    let body = match value {
        Value::Object(mut article) if article.contains_key("currentPageBody") => {
            article.remove("currentPageBody").unwrap_or(Value::Null)
        },
        other => other,
    };
    Ok(decode_body(&body))
}

/// Date column text for a list row; `-` when unknown.
pub fn format_timestamp(timestamp: Option<Timestamp>) -> String {
    timestamp
        .map(|ts| ts.to_string())
        .unwrap_or_else(|| "-".to_string())
}

/// Formats epoch milliseconds (local draft `lastSaved`).
pub fn format_millis(millis: i64) -> String {
    DateTime::<Utc>::from_timestamp_millis(millis)
        .map(|at| at.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| "-".to_string())
}

/// Shortens `text` to `TITLE_WIDTH` characters for table cells.
pub fn clip(text: &str) -> String {
    if text.chars().count() <= TITLE_WIDTH {
        return text.to_string();
    }
    let mut clipped: String = text.chars().take(TITLE_WIDTH - 1).collect();
    clipped.push('…');
    clipped
}

/// Renders rows as aligned columns with a header line.
pub fn format_table(headers: &[&str], rows: &[Vec<String>]) -> String {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in rows {
        for (idx, cell) in row.iter().enumerate() {
            if let Some(width) = widths.get_mut(idx) {
                *width = (*width).max(cell.chars().count());
            }
        }
    }

    let render = |cells: Vec<String>| -> String {
        cells
            .iter()
            .zip(&widths)
            .map(|(cell, &width)| format!("{cell:<width$}"))
            .collect::<Vec<_>>()
            .join("  ")
            .trim_end()
            .to_string()
    };

    let mut output = render(headers.iter().map(|h| h.to_string()).collect());
    output.push('\n');
    output.push_str(&render(widths.iter().map(|w| "-".repeat(*w)).collect()));
    for row in rows {
        output.push('\n');
        output.push_str(&render(row.clone()));
    }
    if rows.is_empty() {
        output.push_str("\n(no rows)");
    }
    output
}
