//! Field path parsing and resolution.
//!
//! # Responsibilities
//! - Parse dotted / bracketed paths (`venue.capacity`, `tags.*`,
//!   `materials[*].url`, `surveys[0].answer`)
//! - Resolve a path against a JSON payload into concrete targets
//!
//! # Design Decisions
//! - Missing intermediate objects resolve to "absent", never an error
//! - A wildcard fans out over array elements (or object values); each
//!   target carries its concrete path, e.g. `tags[1]`
//! - An absent or non-container value under a wildcard yields one absent
//!   target labelled with the declared path

use std::fmt;

use serde_json::Value;

use crate::validation::error::ConfigurationError;

/// One step of a field path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Key(String),
    Index(usize),
    Wildcard,
}

/// A parsed field path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldPath {
    raw: String,
    segments: Vec<Segment>,
}

/// A concrete location produced by resolving a [`FieldPath`].
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedField<'a> {
    /// Concrete path of this target (`tags[1]`, `venue.name`).
    pub path: String,
    /// The value found there, `None` when absent.
    pub value: Option<&'a Value>,
}

impl FieldPath {
    /// Parse a path string.
    pub fn parse(raw: &str) -> Result<Self, ConfigurationError> {
        let invalid = |reason: &str| ConfigurationError::InvalidFieldPath {
            path: raw.to_string(),
            reason: reason.to_string(),
        };

        if raw.trim().is_empty() {
            return Err(invalid("path is empty"));
        }

        let mut segments = Vec::new();
        for part in raw.split('.') {
            if part.is_empty() {
                return Err(invalid("empty segment"));
            }
            if part == "*" {
                segments.push(Segment::Wildcard);
                continue;
            }

            let (name, mut rest) = match part.find('[') {
                Some(pos) => (&part[..pos], &part[pos..]),
                None => (part, ""),
            };
            if name.is_empty() {
                return Err(invalid("bracket without a field name"));
            }
            if name.contains(']') || name.contains('*') {
                return Err(invalid("unexpected character in field name"));
            }
            segments.push(Segment::Key(name.to_string()));

            while !rest.is_empty() {
                let close = rest
                    .find(']')
                    .ok_or_else(|| invalid("unclosed bracket"))?;
                if !rest.starts_with('[') {
                    return Err(invalid("unexpected text after bracket"));
                }
                let inner = &rest[1..close];
                if inner == "*" {
                    segments.push(Segment::Wildcard);
                } else {
                    let index = inner
                        .parse::<usize>()
                        .map_err(|_| invalid("bracket must hold an index or `*`"))?;
                    segments.push(Segment::Index(index));
                }
                rest = &rest[close + 1..];
            }
        }

        Ok(Self {
            raw: raw.to_string(),
            segments,
        })
    }

    /// The path as declared.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn has_wildcard(&self) -> bool {
        self.segments.contains(&Segment::Wildcard)
    }

    /// Resolve the path against `payload`.
    ///
    /// Always returns at least one target unless a wildcard addresses an
    /// empty container.
    pub fn resolve<'a>(&self, payload: &'a Value) -> Vec<ResolvedField<'a>> {
        let mut frontier: Vec<(String, Option<&'a Value>)> = vec![(String::new(), Some(payload))];

        for segment in &self.segments {
            let mut next = Vec::with_capacity(frontier.len());
            for (path, value) in frontier {
                match segment {
                    Segment::Key(key) => {
                        next.push((join_key(&path, key), value.and_then(|v| v.get(key.as_str()))));
                    }
                    Segment::Index(index) => {
                        next.push((join_index(&path, *index), value.and_then(|v| v.get(*index))));
                    }
                    Segment::Wildcard => match value {
                        Some(Value::Array(items)) => {
                            for (i, item) in items.iter().enumerate() {
                                next.push((join_index(&path, i), Some(item)));
                            }
                        }
                        Some(Value::Object(map)) => {
                            for (key, item) in map {
                                next.push((join_key(&path, key), Some(item)));
                            }
                        }
                        _ => next.push((join_key(&path, "*"), None)),
                    },
                }
            }
            frontier = next;
        }

        frontier
            .into_iter()
            .map(|(path, value)| ResolvedField { path, value })
            .collect()
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

fn join_key(prefix: &str, key: &str) -> String {
    if prefix.is_empty() {
        key.to_string()
    } else {
        format!("{}.{}", prefix, key)
    }
}

fn join_index(prefix: &str, index: usize) -> String {
    format!("{}[{}]", prefix, index)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_dotted_and_bracketed() {
        let path = FieldPath::parse("materials[*].url").unwrap();
        assert_eq!(
            path.segments(),
            &[
                Segment::Key("materials".into()),
                Segment::Wildcard,
                Segment::Key("url".into()),
            ]
        );

        let path = FieldPath::parse("surveys[2].answer").unwrap();
        assert_eq!(path.segments()[1], Segment::Index(2));
        assert!(!path.has_wildcard());

        assert_eq!(
            FieldPath::parse("tags.*").unwrap().segments(),
            FieldPath::parse("tags[*]").unwrap().segments()
        );
    }

    #[test]
    fn test_parse_rejects_malformed_paths() {
        for raw in ["", "a..b", "[0]", "a[", "a[x]", "a[0]b", "."] {
            assert!(FieldPath::parse(raw).is_err(), "{raw} should be rejected");
        }
    }

    #[test]
    fn test_resolve_missing_intermediate_is_absent() {
        let path = FieldPath::parse("venue.capacity").unwrap();
        let doc = json!({ "title": "x" });
        let targets = path.resolve(&doc);
        assert_eq!(targets.len(), 1);
        assert_eq!(targets[0].path, "venue.capacity");
        assert!(targets[0].value.is_none());

        // Intermediate is a scalar
        let doc = json!({ "venue": "hall" });
        let targets = path.resolve(&doc);
        assert!(targets[0].value.is_none());
    }

    #[test]
    fn test_resolve_wildcard_names_each_element() {
        let payload = json!({
            "materials": [
                { "url": "https://a.example" },
                { "name": "notes" }
            ]
        });
        let targets = FieldPath::parse("materials.*.url").unwrap().resolve(&payload);
        assert_eq!(targets.len(), 2);
        assert_eq!(targets[0].path, "materials[0].url");
        assert_eq!(targets[0].value, Some(&json!("https://a.example")));
        assert_eq!(targets[1].path, "materials[1].url");
        assert!(targets[1].value.is_none());
    }

    #[test]
    fn test_resolve_wildcard_over_absent_and_empty() {
        let path = FieldPath::parse("tags.*").unwrap();

        let empty = json!({});
        let absent = path.resolve(&empty);
        assert_eq!(absent.len(), 1);
        assert_eq!(absent[0].path, "tags.*");
        assert!(absent[0].value.is_none());

        assert!(path.resolve(&json!({ "tags": [] })).is_empty());
    }
}
