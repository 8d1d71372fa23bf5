//! Per-line record schema and content resolution
//!
//! Every line of a session file decodes into a [`RawRecord`]. Known fields are
//! explicit and optional; anything else lands in `extra` untouched. Scalar
//! fields of the wrong JSON type are read as `None` instead of failing the line.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Tool input strings at or above this size are left out of block text
pub const MAX_TOOL_INPUT_BYTES: usize = 500;
/// Tool results are cut to this many bytes
pub const MAX_TOOL_RESULT_BYTES: usize = 1000;

/// One decoded line of a session file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawRecord {
    #[serde(default, deserialize_with = "lenient_string")]
    pub session_id: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub cwd: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub timestamp: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub role: Option<String>,
    #[serde(default, rename = "type", deserialize_with = "lenient_string")]
    pub record_type: Option<String>,
    #[serde(default)]
    pub content: Option<Value>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub text: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub summary: Option<String>,
    #[serde(default, deserialize_with = "lenient_message")]
    pub message: Option<RawMessage>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub uuid: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub parent_uuid: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub slug: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub git_branch: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// The nested `message` object of a record
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawMessage {
    #[serde(default, deserialize_with = "lenient_string")]
    pub role: Option<String>,
    #[serde(default)]
    pub content: Option<Value>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub model: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(s)) => Some(s),
        _ => None,
    })
}

fn lenient_message<'de, D>(deserializer: D) -> Result<Option<RawMessage>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(v @ Value::Object(_)) => serde_json::from_value(v).ok(),
        _ => None,
    })
}

/// Text and tool usage resolved from one record
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordText {
    pub text: String,
    pub tools: Vec<String>,
    /// True when the content carried tool_use or tool_result parts
    pub has_tool_parts: bool,
}

impl RecordText {
    pub fn is_empty(&self) -> bool {
        self.text.trim().is_empty()
    }
}

impl RawRecord {
    /// Role label: `message.role`, then `role`, then `type`
    pub fn role_label(&self) -> Option<&str> {
        self.message
            .as_ref()
            .and_then(|m| m.role.as_deref())
            .or(self.role.as_deref())
            .or(self.record_type.as_deref())
    }

    /// Explicit role, ignoring the record `type`
    pub fn explicit_role(&self) -> Option<&str> {
        self.message
            .as_ref()
            .and_then(|m| m.role.as_deref())
            .or(self.role.as_deref())
    }

    pub fn model(&self) -> Option<&str> {
        self.message.as_ref().and_then(|m| m.model.as_deref())
    }

    /// Resolve text from `message.content`, then `content`, then `text`, then `summary`
    pub fn resolve_text(&self) -> RecordText {
        let candidates = [
            self.message.as_ref().and_then(|m| m.content.as_ref()),
            self.content.as_ref(),
        ];
        for value in candidates.into_iter().flatten() {
            let resolved = text_from_content(value);
            if !resolved.is_empty() || !resolved.tools.is_empty() {
                return resolved;
            }
        }
        for s in [self.text.as_deref(), self.summary.as_deref()].into_iter().flatten() {
            if !s.trim().is_empty() {
                return RecordText {
                    text: s.to_string(),
                    ..Default::default()
                };
            }
        }
        RecordText::default()
    }
}

/// Flatten a content value (string or array of parts) into text
pub fn text_from_content(content: &Value) -> RecordText {
    let mut out = RecordText::default();
    let mut parts: Vec<String> = Vec::new();

    match content {
        Value::String(s) => parts.push(s.clone()),
        Value::Array(items) => {
            for item in items {
                let Some(obj) = item.as_object() else {
                    if let Some(s) = item.as_str() {
                        parts.push(s.to_string());
                    }
                    continue;
                };
                match obj.get("type").and_then(|t| t.as_str()) {
                    Some("text") => {
                        if let Some(text) = obj.get("text").and_then(|t| t.as_str()) {
                            parts.push(text.to_string());
                        }
                    }
                    Some("tool_use") => {
                        out.has_tool_parts = true;
                        if let Some(name) = obj.get("name").and_then(|n| n.as_str()) {
                            parts.push(format!("[Tool: {}]", name));
                            out.tools.push(name.to_string());
                        }
                        if let Some(input) = obj.get("input").and_then(|i| i.as_object()) {
                            for (key, value) in input {
                                if let Some(s) = value.as_str() {
                                    if s.len() < MAX_TOOL_INPUT_BYTES {
                                        parts.push(format!("{}: {}", key, s));
                                    }
                                }
                            }
                        }
                    }
                    Some("tool_result") => {
                        out.has_tool_parts = true;
                        let result = match obj.get("content") {
                            Some(Value::String(s)) => Some(s.clone()),
                            Some(Value::Array(inner)) => Some(
                                inner
                                    .iter()
                                    .filter_map(|p| p.get("text").and_then(|t| t.as_str()))
                                    .collect::<Vec<_>>()
                                    .join("\n"),
                            ),
                            _ => None,
                        };
                        if let Some(result) = result {
                            let truncated = truncate_at_char_boundary(&result, MAX_TOOL_RESULT_BYTES);
                            if !truncated.is_empty() {
                                parts.push(truncated.to_string());
                            }
                        }
                    }
                    _ => {}
                }
            }
        }
        _ => {}
    }

    out.text = parts.join("\n");
    out
}

/// Truncate a string at the nearest char boundary at or before `max_bytes`
pub fn truncate_at_char_boundary(s: &str, max_bytes: usize) -> &str {
    if s.len() <= max_bytes {
        return s;
    }
    let mut end = max_bytes;
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}
