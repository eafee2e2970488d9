//! Structured project spec files.
//!
//! YAML files are read as-is. Markdown files follow a small convention:
//!
//! ```markdown
//! # Title (ignored)
//!
//! ## Section Name
//! - plain item
//! - **Key** value
//! - **List** heading
//!   - nested one
//!   - nested two
//! ```
//!
//! becomes `{"section_name": ["plain item", {"key": "value"}, {"list": ["nested one", "nested two"]}]}`.

use std::path::Path;

use regex::Regex;
use serde_json::{Map, Value};

/// How a spec file is written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpecFormat {
    Yaml,
    Markdown,
}

impl SpecFormat {
    /// `.yaml`/`.yml` are YAML; anything else is treated as Markdown.
    pub fn from_path(path: &Path) -> Self {
        match path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .as_deref()
        {
            Some("yaml") | Some("yml") => SpecFormat::Yaml,
            _ => SpecFormat::Markdown,
        }
    }
}

/// Parse spec content in the given format.
pub fn parse_spec(content: &str, format: SpecFormat) -> Result<Value, serde_yaml::Error> {
    match format {
        SpecFormat::Yaml => {
            if content.trim().is_empty() {
                return Ok(Value::Object(Map::new()));
            }
            let value: Value = serde_yaml::from_str(content)?;
            Ok(if value.is_null() {
                Value::Object(Map::new())
            } else {
                value
            })
        }
        SpecFormat::Markdown => Ok(parse_markdown_spec(content)),
    }
}

/// Parse a Markdown spec into one list per `##` section.
pub fn parse_markdown_spec(content: &str) -> Value {
    let mut spec = Map::new();
    let mut section: Option<String> = None;
    let mut lines: Vec<&str> = Vec::new();

    for line in content.lines() {
        if line.starts_with("# ") {
            continue;
        }
        if let Some(title) = line.strip_prefix("## ") {
            if let Some(previous) = section.take() {
                insert_section(&mut spec, &previous, &lines);
            }
            section = Some(title.trim().to_string());
            lines.clear();
        } else if section.is_some() {
            lines.push(line);
        }
    }
    if let Some(last) = section {
        insert_section(&mut spec, &last, &lines);
    }

    Value::Object(spec)
}

fn insert_section(spec: &mut Map<String, Value>, title: &str, lines: &[&str]) {
    if lines.is_empty() {
        return;
    }
    spec.insert(section_key(title), Value::Array(parse_markdown_list(lines)));
}

fn section_key(title: &str) -> String {
    title
        .split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join("_")
}

/// Parse Markdown list lines; indented items attach to the item above.
pub fn parse_markdown_list(lines: &[&str]) -> Vec<Value> {
    let mut items = Vec::new();
    let mut current: Option<Value> = None;

    for line in lines {
        let stripped = line.trim();
        let Some(content) = list_item(stripped) else {
            continue;
        };

        let indented = line.starts_with(' ') || line.starts_with('\t');
        if indented {
            if let Some(parent) = current.as_mut() {
                attach(parent, content);
                continue;
            }
        }
        items.extend(current.take());
        current = Some(parse_item(content));
    }
    items.extend(current);
    items
}

fn list_item(line: &str) -> Option<&str> {
    ["- ", "* ", "+ "]
        .iter()
        .find_map(|marker| line.strip_prefix(marker))
        .map(str::trim)
        .filter(|content| !content.is_empty())
}

fn parse_item(content: &str) -> Value {
    let Some(emphasis) = bold_text(content) else {
        return Value::String(content.to_string());
    };

    let key = emphasis.to_lowercase().replace(' ', "_");
    let value = content
        .replacen(&format!("**{}**", emphasis), "", 1)
        .trim()
        .to_string();

    if value.is_empty() {
        Value::String(key)
    } else {
        let mut map = Map::new();
        map.insert(key, Value::String(value));
        Value::Object(map)
    }
}

fn bold_text(content: &str) -> Option<String> {
    let re = Regex::new(r"\*\*(.*?)\*\*").ok()?;
    re.captures(content)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

fn attach(parent: &mut Value, nested: &str) {
    let nested = Value::String(nested.to_string());
    match parent {
        Value::Object(map) => {
            if let Some(slot) = map.values_mut().next() {
                match slot {
                    Value::Array(list) => list.push(nested),
                    other => *other = Value::Array(vec![nested]),
                }
            }
        }
        Value::String(key) => {
            let mut map = Map::new();
            map.insert(std::mem::take(key), Value::Array(vec![nested]));
            *parent = Value::Object(map);
        }
        _ => {}
    }
}
