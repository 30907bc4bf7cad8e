//! Table fragment rendering.
//!
//! # Responsibility
//! - Render one `<tr>` per reason and the surrounding table fragment.
//! - Derive a single-line, length-capped preview for the text cell.
//!
//! # Invariants
//! - Entities without a store id render a `pending` marker in the id cell.
//! - The full text lives in the model and the store; only the cell is
//!   previewed.

use crate::collection::reason_collection::ReasonCollection;
use crate::model::reason::Reason;
use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt::Write as _;

static WHITESPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid ws regex"));

const PREVIEW_MAX_CHARS: usize = 120;

/// Renders the full reasons table fragment in collection order.
pub fn reasons_table(collection: &ReasonCollection) -> String {
    let mut markup = String::from(
        "<table id=\"reasons\">\
         <thead><tr><th>#</th><th>Reason</th><th>Added</th></tr></thead>\
         <tbody>",
    );
    for reason in collection.iter() {
        markup.push_str(&reason_row(reason));
    }
    markup.push_str("</tbody></table>");
    markup
}

/// Renders one reason as a table row.
pub fn reason_row(reason: &Reason) -> String {
    let id_cell = match reason.id() {
        Some(id) => id.to_string(),
        None => "pending".to_string(),
    };

    let mut row = String::new();
    let _ = write!(
        row,
        "<tr data-key=\"{}\">\
         <td class=\"reason-id\">{}</td>\
         <td class=\"reason-text\">{}</td>\
         <td class=\"reason-date\">{}</td>\
         </tr>",
        reason.key(),
        id_cell,
        escape_html(&derive_preview(reason.text())),
        reason.created_at(),
    );
    row
}

/// Collapses whitespace runs and caps the preview length.
fn derive_preview(text: &str) -> String {
    let collapsed = WHITESPACE_RE.replace_all(text.trim(), " ");
    let mut preview: String = collapsed.chars().take(PREVIEW_MAX_CHARS).collect();
    if collapsed.chars().count() > PREVIEW_MAX_CHARS {
        preview.push_str("...");
    }
    preview
}

fn escape_html(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            other => escaped.push(other),
        }
    }
    escaped
}
