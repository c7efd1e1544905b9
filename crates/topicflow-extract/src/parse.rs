//! Parsing of collaborator responses into topic triples.
//!
//! Accepts `{"topics": [...]}`, a bare array, or a single entry object,
//! optionally wrapped in markdown fences or surrounded by prose.

use serde_json::Value;
use topicflow_types::TopicTriple;
use tracing::debug;

use crate::error::BatchError;

/// Confidence used when an entry omits it.
pub const DEFAULT_CONFIDENCE: f64 = 0.5;

/// Extract the JSON payload from text (handles markdown code blocks).
pub fn extract_json(text: &str) -> String {
    if let Some(start) = text.find("```json") {
        if let Some(end) = text[start + 7..].find("```") {
            return text[start + 7..start + 7 + end].trim().to_string();
        }
    }

    if let Some(start) = text.find("```") {
        if let Some(end) = text[start + 3..].find("```") {
            return text[start + 3..start + 3 + end].trim().to_string();
        }
    }

    let object = text.find('{').zip(text.rfind('}'));
    let array = text.find('[').zip(text.rfind(']'));
    let span = match (object, array) {
        (Some(o), Some(a)) => Some(if a.0 < o.0 { a } else { o }),
        (o, a) => o.or(a),
    };
    if let Some((start, end)) = span {
        if start < end {
            return text[start..=end].to_string();
        }
    }

    text.trim().to_string()
}

/// Parse a raw completion into triples.
///
/// Entries missing a label field are skipped; missing confidence defaults
/// to [`DEFAULT_CONFIDENCE`], missing keywords to none. Anything that is not
/// a triple list yields [`BatchError::Parse`].
pub fn parse_triples(response: &str) -> Result<Vec<TopicTriple>, BatchError> {
    let payload = extract_json(response);
    let value: Value = serde_json::from_str(&payload)
        .map_err(|e| BatchError::Parse(format!("invalid JSON: {}", e)))?;

    let entries = match value {
        Value::Array(entries) => entries,
        Value::Object(mut map) => match map.remove("topics") {
            Some(Value::Array(entries)) => entries,
            Some(other) => {
                return Err(BatchError::Parse(format!(
                    "\"topics\" is not an array: {}",
                    type_name(&other)
                )))
            }
            None if map.contains_key("topic_label") => vec![Value::Object(map)],
            None => return Err(BatchError::Parse("no topics in response".to_string())),
        },
        other => {
            return Err(BatchError::Parse(format!(
                "unexpected JSON {}",
                type_name(&other)
            )))
        }
    };

    let total = entries.len();
    let triples: Vec<TopicTriple> = entries.iter().filter_map(parse_entry).collect();
    if triples.len() < total {
        debug!(skipped = total - triples.len(), "Skipped incomplete entries");
    }
    Ok(triples)
}

fn parse_entry(entry: &Value) -> Option<TopicTriple> {
    let obj = entry.as_object()?;
    let label = |key: &str| obj.get(key).and_then(Value::as_str).map(str::to_string);

    let topic = label("topic_label")?;
    let subtopic = label("subtopic_label")?;
    let subsubtopic = label("subsubtopic_label")?;

    let confidence = match obj.get("confidence") {
        None | Some(Value::Null) => DEFAULT_CONFIDENCE,
        Some(Value::Number(n)) => n.as_f64().unwrap_or(f64::NAN),
        Some(Value::String(s)) => s.trim().parse().unwrap_or(f64::NAN),
        Some(_) => f64::NAN,
    };

    let keywords = match obj.get("keywords") {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect(),
        Some(Value::String(s)) => s.split(',').map(|k| k.trim().to_string()).collect(),
        _ => Vec::new(),
    };

    Some(TopicTriple::new(topic, subtopic, subsubtopic, confidence).with_keywords(keywords))
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ENTRY: &str = r#"{"topic_label": "D3 Visualization", "subtopic_label": "Force Layout", "subsubtopic_label": "Link Springs", "confidence": 0.9, "keywords": ["d3", "force"]}"#;

    #[test]
    fn test_extract_json_plain() {
        assert_eq!(extract_json(ENTRY), ENTRY);
    }

    #[test]
    fn test_extract_json_code_block() {
        let text = format!("Here you go:\n```json\n{}\n```", ENTRY);
        assert_eq!(extract_json(&text), ENTRY);
    }

    #[test]
    fn test_extract_json_bare_array_with_prefix() {
        let text = format!("Sure! [{}] hope that helps", ENTRY);
        let json = extract_json(&text);
        assert!(json.starts_with('['));
        assert!(json.ends_with(']'));
    }

    #[test]
    fn test_parse_topics_object() {
        let text = format!(r#"{{"topics": [{}]}}"#, ENTRY);
        let triples = parse_triples(&text).unwrap();
        assert_eq!(triples.len(), 1);
        assert_eq!(triples[0].topic_label, "D3 Visualization");
        assert_eq!(triples[0].keywords, vec!["d3".to_string(), "force".to_string()]);
    }

    #[test]
    fn test_parse_bare_array_and_single_object() {
        assert_eq!(parse_triples(&format!("[{}]", ENTRY)).unwrap().len(), 1);
        assert_eq!(parse_triples(ENTRY).unwrap().len(), 1);
    }

    #[test]
    fn test_parse_defaults_and_skips() {
        let text = r#"[
            {"topic_label": "A", "subtopic_label": "B", "subsubtopic_label": "C"},
            {"topic_label": "A", "subtopic_label": "B"},
            "not an object",
            {"topic_label": "X", "subtopic_label": "Y", "subsubtopic_label": "Z", "confidence": "0.8", "keywords": "a, b"}
        ]"#;
        let triples = parse_triples(text).unwrap();
        assert_eq!(triples.len(), 2);
        assert_eq!(triples[0].confidence, DEFAULT_CONFIDENCE);
        assert!(triples[0].keywords.is_empty());
        assert_eq!(triples[1].confidence, 0.8);
        assert_eq!(triples[1].keywords, vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(matches!(parse_triples("I could not find topics."), Err(BatchError::Parse(_))));
        assert!(matches!(parse_triples(r#"{"topics": 3}"#), Err(BatchError::Parse(_))));
        assert!(matches!(parse_triples(r#"{"answer": []}"#), Err(BatchError::Parse(_))));
        assert!(matches!(parse_triples("42"), Err(BatchError::Parse(_))));
    }
}
