//! Filter helpers for Qdrant queries and fingerprint-scoped operations.

use serde_json::{Value, json};

use super::types::SearchFilterArgs;

/// Filter matching every record that belongs to one document fingerprint.
pub fn fingerprint_filter(file_hash: &str) -> Value {
    json!({
        "must": [
            {
                "key": "file_hash",
                "match": { "value": file_hash }
            }
        ]
    })
}

/// Compose the Qdrant filter payload from optional search arguments.
pub fn build_search_filter(args: &SearchFilterArgs) -> Option<Value> {
    let mut must: Vec<Value> = Vec::new();

    if let Some(file_hash) = args.file_hash.as_ref().and_then(|value| non_empty(value)) {
        must.push(json!({
            "key": "file_hash",
            "match": { "value": file_hash }
        }));
    }

    if let Some(content_type) = args
        .content_type
        .as_ref()
        .and_then(|value| non_empty(value))
    {
        must.push(json!({
            "key": "content_type",
            "match": { "value": content_type }
        }));
    }

    if must.is_empty() {
        None
    } else {
        Some(json!({ "must": must }))
    }
}

fn non_empty(input: &str) -> Option<&str> {
    let trimmed = input.trim();
    if trimmed.is_empty() { None } else { Some(trimmed) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fingerprint_filter_matches_on_file_hash() {
        let filter = fingerprint_filter("abc123");
        assert_eq!(
            filter,
            json!({
                "must": [
                    {
                        "key": "file_hash",
                        "match": { "value": "abc123" }
                    }
                ]
            })
        );
    }

    #[test]
    fn build_search_filter_handles_file_hash() {
        let filter = build_search_filter(&SearchFilterArgs {
            file_hash: Some("abc123".into()),
            ..Default::default()
        })
        .expect("filter");

        assert_eq!(filter, fingerprint_filter("abc123"));
    }

    #[test]
    fn build_search_filter_combines_constraints() {
        let filter = build_search_filter(&SearchFilterArgs {
            file_hash: Some("abc123".into()),
            content_type: Some("table".into()),
        })
        .expect("filter");

        let must = filter["must"].as_array().expect("must clause");
        assert_eq!(must.len(), 2);
        assert_eq!(must[1]["key"], "content_type");
    }

    #[test]
    fn build_search_filter_returns_none_when_empty() {
        assert!(build_search_filter(&SearchFilterArgs::default()).is_none());
        assert!(
            build_search_filter(&SearchFilterArgs {
                file_hash: Some("   ".into()),
                ..Default::default()
            })
            .is_none()
        );
    }
}
