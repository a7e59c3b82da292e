//! Helpers for constructing vector payloads.

use serde_json::{Map, Value};
use time::OffsetDateTime;

use crate::structure::ContentUnit;

/// Build the flattened payload stored alongside each vector.
///
/// All metadata fields are flattened to the top level so that `file_hash`,
/// `content_type`, `section`, and `page` stay directly filterable.
pub fn build_payload(unit: &ContentUnit, ingested_at: &str) -> Value {
    let mut payload = Map::new();
    payload.insert(
        "content_type".into(),
        Value::String(unit.content_type.as_str().to_string()),
    );
    payload.insert("text".into(), Value::String(unit.text_content.clone()));
    payload.insert("page".into(), Value::from(unit.metadata.page));
    payload.insert(
        "section".into(),
        Value::String(unit.metadata.section.clone()),
    );
    payload.insert(
        "related_images".into(),
        Value::Array(
            unit.metadata
                .related_images
                .iter()
                .map(|id| Value::String(id.clone()))
                .collect(),
        ),
    );
    payload.insert(
        "file_hash".into(),
        Value::String(unit.metadata.file_hash.clone()),
    );
    payload.insert("ingested_at".into(), Value::String(ingested_at.to_string()));

    Value::Object(payload)
}

/// Current timestamp formatted for payload storage.
pub(crate) fn current_timestamp_rfc3339() -> String {
    OffsetDateTime::now_utc()
        .format(&time::format_description::well_known::Rfc3339)
        .unwrap_or_else(|_| "1970-01-01T00:00:00Z".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::structure::types::{ContentType, UnitMetadata};
    use uuid::Uuid;

    fn sample_unit() -> ContentUnit {
        ContentUnit {
            id: Uuid::new_v4(),
            content_type: ContentType::Table,
            text_content: "| a | b |".into(),
            metadata: UnitMetadata {
                page: 4,
                section: "Results".into(),
                related_images: vec!["img_4_0".into()],
                file_hash: "feedface".into(),
            },
        }
    }

    #[test]
    fn payload_flattens_all_metadata_fields() {
        let now = "2025-06-01T00:00:00Z";
        let payload = build_payload(&sample_unit(), now);

        assert_eq!(payload["content_type"], "table");
        assert_eq!(payload["text"], "| a | b |");
        assert_eq!(payload["page"], 4);
        assert_eq!(payload["section"], "Results");
        assert_eq!(payload["related_images"][0], "img_4_0");
        assert_eq!(payload["file_hash"], "feedface");
        assert_eq!(payload["ingested_at"], now);
    }

    #[test]
    fn timestamp_is_rfc3339_like() {
        let ts = current_timestamp_rfc3339();
        assert!(ts.contains('T') && ts.ends_with('Z'));
    }
}
