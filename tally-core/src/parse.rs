//! Best-effort extraction of suggestions from free-form model output.
//!
//! Backends are instructed to return a bare JSON object, but in practice the
//! text arrives wrapped in a fenced code block or padded with prose. Two
//! parse attempts run in order: the candidate text as-is, then the substring
//! between the first `{` and the last `}`. Nothing here is fatal; when both
//! attempts fail the result is simply an empty list.

use serde_json::Value;

use crate::suggestion::{MAX_SUGGESTIONS, Suggestion};

/// Parse a raw backend response into at most [`MAX_SUGGESTIONS`] suggestions.
pub fn parse_suggestions(raw: &str) -> Vec<Suggestion> {
    let candidate = extract_fenced(raw).unwrap_or_else(|| raw.trim());

    let parsed: Option<Value> = serde_json::from_str(candidate)
        .ok()
        .or_else(|| brace_bounded(candidate).and_then(|s| serde_json::from_str(s).ok()));

    match parsed {
        Some(value) => collect_suggestions(&value),
        None => Vec::new(),
    }
}

/// Interior of the first triple-backtick fence, when one exists.
/// An optional `json` tag right after the opening fence is skipped.
fn extract_fenced(text: &str) -> Option<&str> {
    let start = text.find("```")?;
    let body = &text[start + 3..];
    let body = body.strip_prefix("json").unwrap_or(body);
    let end = body.find("```")?;
    Some(body[..end].trim())
}

/// Substring from the first `{` through the last `}`, inclusive.
fn brace_bounded(text: &str) -> Option<&str> {
    let open = text.find('{')?;
    let close = text.rfind('}')?;
    if close < open {
        return None;
    }
    Some(&text[open..=close])
}

fn collect_suggestions(value: &Value) -> Vec<Suggestion> {
    let Some(entries) = value.get("suggestions").and_then(Value::as_array) else {
        return Vec::new();
    };
    entries
        .iter()
        .filter_map(coerce_entry)
        .take(MAX_SUGGESTIONS)
        .collect()
}

fn coerce_entry(entry: &Value) -> Option<Suggestion> {
    let name = entry.get("name")?.as_str()?.trim();
    if name.is_empty() {
        return None;
    }
    let justification = entry
        .get("justification")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string);
    let confidence = entry.get("confidence").and_then(Value::as_f64);
    Some(Suggestion {
        name: name.to_string(),
        justification,
        confidence,
    })
}
