//! Pulling structured data out of free-form model output.

use regex::Regex;
use serde_json::Value;

use squad_core::{IssueStage, RaisedIssue};

/// Find the JSON object in a response.
///
/// Tries, in order: a fenced ```json block, the whole text, and the span
/// between the first `{` and the last `}`.
pub fn extract_json(text: &str) -> Option<Value> {
    if let Some(block) = fenced_block(text) {
        if let Ok(value) = serde_json::from_str::<Value>(&block) {
            return Some(value).filter(Value::is_object);
        }
    }

    let trimmed = text.trim();
    if let Ok(value) = serde_json::from_str::<Value>(trimmed) {
        if value.is_object() {
            return Some(value);
        }
    }

    let start = trimmed.find('{')?;
    let end = trimmed.rfind('}')?;
    if end <= start {
        return None;
    }
    serde_json::from_str::<Value>(&trimmed[start..=end])
        .ok()
        .filter(Value::is_object)
}

fn fenced_block(text: &str) -> Option<String> {
    let re = Regex::new(r"(?s)```(?:json|JSON)?\s*\n(.*?)\n?\s*```").ok()?;
    re.captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim().to_string())
}

/// Boolean field, accepting `true`/`false` and their string spellings.
pub fn bool_field(value: &Value, key: &str) -> Option<bool> {
    match value.get(key)? {
        Value::Bool(b) => Some(*b),
        Value::String(s) => match s.trim().to_lowercase().as_str() {
            "true" | "yes" | "approved" | "passed" => Some(true),
            "false" | "no" | "rejected" | "failed" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

/// Strings from a list field.
///
/// Objects contribute their `name`, `title`, `description` or `feature`
/// member, whichever comes first; anything else is rendered as JSON.
pub fn string_list(value: &Value, key: &str) -> Vec<String> {
    let Some(Value::Array(items)) = value.get(key) else {
        return Vec::new();
    };
    items
        .iter()
        .filter_map(|item| match item {
            Value::String(s) => Some(s.trim().to_string()),
            Value::Object(map) => ["name", "title", "description", "feature"]
                .iter()
                .find_map(|k| map.get(*k).and_then(Value::as_str))
                .map(|s| s.trim().to_string())
                .or_else(|| Some(item.to_string())),
            Value::Null => None,
            other => Some(other.to_string()),
        })
        .filter(|s| !s.is_empty())
        .collect()
}

/// Issues from a list field; objects may carry a `stage` label.
pub fn issue_list(value: &Value, key: &str) -> Vec<RaisedIssue> {
    let Some(Value::Array(items)) = value.get(key) else {
        return Vec::new();
    };
    items
        .iter()
        .filter_map(|item| match item {
            Value::String(s) if !s.trim().is_empty() => Some(RaisedIssue::new(s.trim())),
            Value::Object(map) => {
                let description = ["description", "issue", "title", "name"]
                    .iter()
                    .find_map(|k| map.get(*k).and_then(Value::as_str))
                    .map(str::to_string)
                    .unwrap_or_else(|| item.to_string());
                let issue = RaisedIssue::new(description);
                match map
                    .get("stage")
                    .and_then(Value::as_str)
                    .and_then(IssueStage::parse_label)
                {
                    Some(stage) => Some(issue.at(stage)),
                    None => Some(issue),
                }
            }
            _ => None,
        })
        .collect()
}

/// `(path, contents)` pairs from a file map field.
///
/// The map may sit directly under `key` or one level down under `files`.
/// Entries whose contents are not a string are skipped.
pub fn file_map(value: &Value, key: &str) -> Vec<(String, String)> {
    let Some(Value::Object(map)) = value.get(key) else {
        return Vec::new();
    };
    let map = match map.get("files") {
        Some(Value::Object(inner)) => inner,
        _ => map,
    };
    map.iter()
        .filter_map(|(path, content)| {
            let path = path.trim();
            match content {
                Value::String(content) if !path.is_empty() => {
                    Some((path.to_string(), content.clone()))
                }
                _ => None,
            }
        })
        .collect()
}

/// Content to store: pretty JSON when parsed, the raw text otherwise.
pub fn artifact_content(parsed: Option<&Value>, raw: &str) -> String {
    parsed
        .and_then(|v| serde_json::to_string_pretty(v).ok())
        .unwrap_or_else(|| raw.to_string())
}
