//! Detected issues as reported by the detector under evaluation.
//!
//! Detector output is loosely typed: fields may be missing, `null`, numbers
//! where strings are expected, or wrapped in prose from a model response.
//! Everything here is tolerant; only a payload with no usable JSON is an error.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// One issue reported by the detector.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetectedIssue {
  #[serde(default, deserialize_with = "lenient_string")]
  pub title: String,
  #[serde(default, deserialize_with = "lenient_string")]
  pub description: String,
  /// Path as reported, in whatever casing and separator style the detector used
  #[serde(default, deserialize_with = "lenient_string")]
  pub file: String,
  /// Single line, `start-end` range, or comma list. Not guaranteed well-formed.
  #[serde(default, deserialize_with = "lenient_string")]
  pub line: String,
  #[serde(default, deserialize_with = "lenient_string")]
  pub severity: String,
  #[serde(default, deserialize_with = "lenient_string")]
  pub category: String,
  #[serde(default, deserialize_with = "lenient_string")]
  pub recommendation: String,
}

#[derive(Debug, thiserror::Error)]
pub enum DetectionParseError {
  #[error("No JSON object or array found in detector output")]
  NoJson,
  #[error("Detector output has no issue list (expected an array or an object with a `bugs` array)")]
  MissingIssueList,
  #[error("Invalid issue at index {index}: {source}")]
  Entry {
    index: usize,
    #[source]
    source: serde_json::Error,
  },
}

/// Parse detector output into issues.
///
/// Accepts a bare JSON array, an object with a `bugs` array, or a model
/// response where prose precedes the JSON payload. In the last case the
/// first JSON value that carries an issue list wins and trailing text is ignored.
pub fn parse_detections(raw: &str) -> Result<Vec<DetectedIssue>, DetectionParseError> {
  let mut saw_json = false;

  for (start, _) in raw.match_indices(['{', '[']) {
    let mut stream = serde_json::Deserializer::from_str(&raw[start..]).into_iter::<Value>();
    let Some(Ok(value)) = stream.next() else {
      continue;
    };
    saw_json = true;

    if let Some(items) = issue_list(value) {
      return items
        .into_iter()
        .enumerate()
        .map(|(index, item)| serde_json::from_value(item).map_err(|source| DetectionParseError::Entry { index, source }))
        .collect();
    }
  }

  if saw_json {
    Err(DetectionParseError::MissingIssueList)
  } else {
    Err(DetectionParseError::NoJson)
  }
}

fn issue_list(value: Value) -> Option<Vec<Value>> {
  match value {
    Value::Array(items) if items.iter().all(Value::is_object) => Some(items),
    Value::Object(mut map) => match map.remove("bugs") {
      Some(Value::Array(items)) => Some(items),
      _ => None,
    },
    _ => None,
  }
}

fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
  D: Deserializer<'de>,
{
  let value = Value::deserialize(deserializer)?;
  Ok(value_to_string(&value))
}

fn value_to_string(value: &Value) -> String {
  match value {
    Value::Null => String::new(),
    Value::String(s) => s.clone(),
    Value::Number(n) => n.to_string(),
    Value::Bool(b) => b.to_string(),
    Value::Array(items) => items.iter().map(value_to_string).collect::<Vec<_>>().join(","),
    Value::Object(_) => value.to_string(),
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_parse_bugs_object() {
    let raw = r#"{"bugs": [{"title": "SQLi", "file": "app/db.py", "line": "42", "severity": "critical", "category": "security"}]}"#;
    let issues = parse_detections(raw).unwrap();

    assert_eq!(issues.len(), 1);
    assert_eq!(issues[0].title, "SQLi");
    assert_eq!(issues[0].line, "42");
    assert_eq!(issues[0].description, "");
  }

  #[test]
  fn test_parse_bare_array() {
    let raw = r#"[{"title": "a"}, {"title": "b"}]"#;
    let issues = parse_detections(raw).unwrap();
    assert_eq!(issues.len(), 2);
    assert_eq!(issues[1].title, "b");
  }

  #[test]
  fn test_parse_with_leading_prose_and_trailing_text() {
    let raw = "I analyzed the repository [3 files] and found:\n\
               {\"bugs\": [{\"title\": \"Leak\", \"line\": 10}]}\nLet me know if you need more.";
    let issues = parse_detections(raw).unwrap();

    assert_eq!(issues.len(), 1);
    assert_eq!(issues[0].title, "Leak");
    assert_eq!(issues[0].line, "10");
  }

  #[test]
  fn test_lenient_field_types() {
    let raw = r#"{"bugs": [{"title": null, "line": [7, 9, 11], "severity": "major", "category": 3}]}"#;
    let issues = parse_detections(raw).unwrap();

    assert_eq!(issues[0].title, "");
    assert_eq!(issues[0].line, "7,9,11");
    assert_eq!(issues[0].category, "3");
  }

  #[test]
  fn test_empty_bug_list() {
    assert!(parse_detections(r#"{"bugs": []}"#).unwrap().is_empty());
  }

  #[test]
  fn test_no_json() {
    assert!(matches!(parse_detections("no issues found"), Err(DetectionParseError::NoJson)));
  }

  #[test]
  fn test_json_without_issue_list() {
    assert!(matches!(
      parse_detections(r#"{"summary": "clean"}"#),
      Err(DetectionParseError::MissingIssueList)
    ));
  }

  #[test]
  fn test_non_object_entry_is_an_error() {
    let err = parse_detections(r#"{"bugs": [{"title": "ok"}, 5]}"#).unwrap_err();
    assert!(matches!(err, DetectionParseError::Entry { index: 1, .. }));
  }
}
