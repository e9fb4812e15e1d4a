//! Content extraction from provider payloads.
//!
//! Acquisition payloads arrive in several possible nesting shapes; this
//! module searches a fixed, ordered list of candidate paths and content
//! fields and flattens the first match into a single text blob. When no
//! known shape matches, the whole payload is serialized as the content so
//! a job never fails for shape-mismatch reasons alone.

use serde_json::Value;
use tracing::{debug, warn};

/// Candidate nested paths to a results sequence, in search order.
pub const CONTENT_PATHS: [&[&str]; 6] = [
    &["data", "results"],
    &["results"],
    &["content"],
    &["data", "content"],
    &["pages"],
    &["data", "pages"],
];

/// Candidate per-item content fields, in search order.
pub const CONTENT_FIELDS: [&str; 5] = ["content", "text", "body", "html", "markdown"];

/// Flattens an acquisition payload into one text blob.
///
/// Returns `None` only for genuinely empty payloads (null, empty object,
/// blank string); every other payload yields some non-empty string.
pub fn extract_text(payload: &Value) -> Option<String> {
    if payload_is_empty(payload) {
        return None;
    }

    for path in CONTENT_PATHS {
        let Some(node) = lookup_path(payload, path) else {
            continue;
        };
        let Some(items) = node.as_array() else {
            continue;
        };
        if items.is_empty() {
            continue;
        }

        debug!(path = path.join("."), items = items.len(), "found content sequence");
        let fragments: Vec<String> = items.iter().map(item_text).collect();
        return Some(fragments.join("\n\n"));
    }

    // No structured shape matched — serialize the raw payload.
    warn!("no known content path matched, serializing raw payload");
    serde_json::to_string_pretty(payload).ok()
}

fn payload_is_empty(payload: &Value) -> bool {
    match payload {
        Value::Null => true,
        Value::Object(map) => map.is_empty(),
        Value::String(s) => s.trim().is_empty(),
        Value::Array(items) => items.is_empty(),
        _ => false,
    }
}

fn lookup_path<'a>(payload: &'a Value, path: &[&str]) -> Option<&'a Value> {
    let mut current = payload;
    for key in path {
        current = current.get(key)?;
    }
    Some(current)
}

/// Pulls text from one sequence element: the first present non-empty
/// content field wins; elements with no such field are stringified whole.
fn item_text(item: &Value) -> String {
    if let Some(obj) = item.as_object() {
        for field in CONTENT_FIELDS {
            if let Some(text) = obj.get(field).and_then(Value::as_str) {
                if !text.is_empty() {
                    return text.to_string();
                }
            }
        }
        return item.to_string();
    }
    match item.as_str() {
        Some(s) => s.to_string(),
        None => item.to_string(),
    }
}

/// Best-effort title: the URL's last path segment (hyphens and underscores
/// become spaces, words capitalized), then the first result's `title`
/// field, then a generic default.
pub fn derive_title(url: &str, payload: &Value) -> String {
    let slug = url
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or("")
        .split('?')
        .next()
        .unwrap_or("");

    // A slug containing a dot is a hostname or a filename, not a usable
    // page name.
    if !slug.is_empty() && !slug.contains('.') {
        let from_url = title_case(&slug.replace(['-', '_'], " "));
        if !from_url.is_empty() {
            return from_url;
        }
    }

    for path in [&["data", "results"][..], &["results"][..]] {
        if let Some(title) = lookup_path(payload, path)
            .and_then(Value::as_array)
            .and_then(|items| items.first())
            .and_then(|item| item.get("title"))
            .and_then(Value::as_str)
            .filter(|t| !t.trim().is_empty())
        {
            return title.trim().to_string();
        }
    }

    "Documentation Summary".to_string()
}

fn title_case(text: &str) -> String {
    text.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_data_results_with_mixed_fields() {
        let payload = json!({"data": {"results": [{"text": "A"}, {"content": "B"}]}});
        assert_eq!(extract_text(&payload), Some("A\n\nB".to_string()));
    }

    #[test]
    fn test_first_matching_path_wins() {
        // `data.results` is searched before `results`.
        let payload = json!({
            "data": {"results": [{"content": "nested"}]},
            "results": [{"content": "flat"}]
        });
        assert_eq!(extract_text(&payload), Some("nested".to_string()));
    }

    #[test]
    fn test_content_field_priority_within_item() {
        let payload = json!({"results": [{"markdown": "last", "content": "first"}]});
        assert_eq!(extract_text(&payload), Some("first".to_string()));
    }

    #[test]
    fn test_empty_content_field_skipped() {
        let payload = json!({"results": [{"content": "", "text": "fallback field"}]});
        assert_eq!(extract_text(&payload), Some("fallback field".to_string()));
    }

    #[test]
    fn test_item_without_content_fields_is_stringified() {
        let payload = json!({"results": [{"kind": "stub"}]});
        let text = extract_text(&payload).unwrap();
        assert!(text.contains("stub"));
    }

    #[test]
    fn test_string_items() {
        let payload = json!({"pages": ["one", "two"]});
        assert_eq!(extract_text(&payload), Some("one\n\ntwo".to_string()));
    }

    #[test]
    fn test_unknown_shape_serializes_payload() {
        let payload = json!({"weird": {"nested": "thing"}});
        let text = extract_text(&payload).unwrap();
        assert!(text.contains("weird"));
        assert!(text.contains("thing"));
    }

    #[test]
    fn test_empty_payloads_yield_none() {
        assert_eq!(extract_text(&json!(null)), None);
        assert_eq!(extract_text(&json!({})), None);
        assert_eq!(extract_text(&json!("")), None);
        assert_eq!(extract_text(&json!([])), None);
    }

    #[test]
    fn test_non_list_content_falls_through_to_raw() {
        // `content` as a bare string is not a sequence; the raw payload is
        // serialized instead.
        let payload = json!({"content": "not a list"});
        let text = extract_text(&payload).unwrap();
        assert!(text.contains("not a list"));
    }

    #[test]
    fn test_title_from_url_slug() {
        let payload = json!({});
        assert_eq!(
            derive_title("https://example.org/docs/getting-started", &payload),
            "Getting Started"
        );
        assert_eq!(
            derive_title("https://example.org/docs/masa_subnet/", &payload),
            "Masa Subnet"
        );
    }

    #[test]
    fn test_title_from_payload_when_url_is_bare() {
        let payload = json!({"data": {"results": [{"title": "Payload Title"}]}});
        assert_eq!(derive_title("https://example.org", &payload), "Payload Title");
    }

    #[test]
    fn test_title_default() {
        assert_eq!(
            derive_title("https://example.org", &json!({})),
            "Documentation Summary"
        );
    }
}
