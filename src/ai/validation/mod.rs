//! Model Response Validation
//!
//! JSON extraction and repair for raw completions, then typed decoding.
//! Any failure here surfaces as `StructuredOutputRejected`.

mod json_repair;

pub use json_repair::{JsonRepairer, extract_json_from_response};

use serde::de::DeserializeOwned;

use crate::types::{ReportError, Result};

/// Decode a raw completion into `T`, repairing JSON formatting where possible
pub fn decode_structured<T: DeserializeOwned>(raw: &str, schema_name: &str) -> Result<T> {
    let value = extract_json_from_response(raw).map_err(|e| match e {
        ReportError::StructuredOutputRejected { message, .. } => {
            ReportError::structured(schema_name, message)
        }
        other => other,
    })?;

    serde_json::from_value(value)
        .map_err(|e| ReportError::structured(schema_name, format!("schema mismatch: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    struct Queries {
        queries: Vec<String>,
    }

    #[test]
    fn test_decode_structured_ok() {
        let decoded: Queries = decode_structured(r#"{"queries": ["x"]}"#, "queries").unwrap();
        assert_eq!(decoded.queries, vec!["x"]);
    }

    #[test]
    fn test_decode_structured_schema_mismatch() {
        let err = decode_structured::<Queries>(r#"{"items": []}"#, "queries").unwrap_err();
        match err {
            ReportError::StructuredOutputRejected { schema, message } => {
                assert_eq!(schema, "queries");
                assert!(message.contains("schema mismatch"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_decode_structured_unparseable_keeps_schema_name() {
        let err = decode_structured::<Queries>("no json here", "queries").unwrap_err();
        assert!(err.to_string().contains("queries"));
    }
}
