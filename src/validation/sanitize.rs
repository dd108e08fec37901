//! Payload normalization applied before evaluation.

use serde_json::Value;

/// Remove NUL characters from every string in `payload`, keys included.
///
/// Returns the number of strings that changed.
pub fn strip_null_bytes(payload: &mut Value) -> usize {
    match payload {
        Value::String(s) => strip(s),
        Value::Array(items) => items.iter_mut().map(strip_null_bytes).sum(),
        Value::Object(map) => {
            let mut changed = 0;
            if map.keys().any(|k| k.contains('\0')) {
                let entries = std::mem::take(map);
                for (mut key, value) in entries {
                    changed += strip(&mut key);
                    map.insert(key, value);
                }
            }
            changed + map.values_mut().map(strip_null_bytes).sum::<usize>()
        }
        Value::Null | Value::Bool(_) | Value::Number(_) => 0,
    }
}

fn strip(s: &mut String) -> usize {
    if s.contains('\0') {
        s.retain(|c| c != '\0');
        1
    } else {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_strips_nested_strings() {
        let mut payload = json!({
            "title": "Lightning\u{0}Talks",
            "tags": ["a\u{0}", "b"],
            "venue": { "name\u{0}": "Hall\u{0}\u{0}" },
            "capacity": 10
        });
        assert_eq!(strip_null_bytes(&mut payload), 4);
        assert_eq!(
            payload,
            json!({
                "title": "LightningTalks",
                "tags": ["a", "b"],
                "venue": { "name": "Hall" },
                "capacity": 10
            })
        );
    }

    #[test]
    fn test_clean_payload_untouched() {
        let mut payload = json!({ "title": "clean", "list": [1, 2, null] });
        let before = payload.clone();
        assert_eq!(strip_null_bytes(&mut payload), 0);
        assert_eq!(payload, before);
    }
}
