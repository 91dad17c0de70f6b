use serde_json::{Map, Value};

/// Best-effort structured decode of free-form model output.
///
/// Takes the span from the first `{` to the last `}` and parses it as a JSON
/// object, so prose or markdown fences around the object are tolerated.
/// Returns `None` when there is no span or the span is not a valid object.
///
/// The span is greedy: text holding several JSON-like spans, or stray braces
/// outside the intended object, decodes to `None` or to the wrong object.
/// Callers ask the model for exactly one object, which keeps this workable.
pub fn extract_json_object(text: &str) -> Option<Map<String, Value>> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end <= start {
        return None;
    }
    match serde_json::from_str::<Value>(&text[start..=end]) {
        Ok(Value::Object(object)) => Some(object),
        _ => None,
    }
}

/// Short, single-line excerpt of a model reply for diagnostics.
pub fn excerpt(text: &str, max_chars: usize) -> String {
    let flattened = text.split_whitespace().collect::<Vec<&str>>().join(" ");
    if flattened.chars().count() <= max_chars {
        return flattened;
    }
    flattened.chars().take(max_chars).collect::<String>() + "…"
}
