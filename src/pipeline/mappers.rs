//! Mapping helpers between Qdrant payloads and API-facing types.

use serde_json::{Map, Value};

use crate::pipeline::types::SearchHit;
use crate::qdrant::ScoredPoint;

/// Map a Qdrant scored point into a user-facing search hit.
///
/// Well-known payload fields are lifted into dedicated fields; the complete
/// payload rides along untouched.
pub(crate) fn map_scored_point(point: ScoredPoint) -> SearchHit {
    let ScoredPoint { id, score, payload } = point;

    let text = payload.as_ref().and_then(|map| string_field(map, "text"));
    let page = payload
        .as_ref()
        .and_then(|map| map.get("page"))
        .and_then(Value::as_u64)
        .map(|number| number as u32);
    let section = payload.as_ref().and_then(|map| string_field(map, "section"));
    let content_type = payload
        .as_ref()
        .and_then(|map| string_field(map, "content_type"));
    let related_images = payload.as_ref().and_then(|map| {
        let Value::Array(values) = map.get("related_images")? else {
            return None;
        };
        let ids: Vec<String> = values
            .iter()
            .filter_map(|value| value.as_str())
            .filter(|id| !id.is_empty())
            .map(str::to_string)
            .collect();
        if ids.is_empty() { None } else { Some(ids) }
    });
    let file_hash = payload
        .as_ref()
        .and_then(|map| string_field(map, "file_hash"));

    SearchHit {
        id,
        score,
        text,
        page,
        section,
        content_type,
        related_images,
        file_hash,
        payload,
    }
}

fn string_field(map: &Map<String, Value>, key: &str) -> Option<String> {
    let value = map.get(key)?.as_str()?.trim();
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn map_scored_point_extracts_payload_fields() {
        let mut payload = Map::new();
        payload.insert("text".into(), Value::String("Example passage".into()));
        payload.insert("page".into(), Value::from(7));
        payload.insert("section".into(), Value::String("Results".into()));
        payload.insert("content_type".into(), Value::String("text".into()));
        payload.insert(
            "related_images".into(),
            Value::Array(vec![
                Value::String("img_7_0".into()),
                Value::String("img_7_1".into()),
            ]),
        );
        payload.insert("file_hash".into(), Value::String("abc123".into()));

        let point = ScoredPoint {
            id: "unit-1".into(),
            score: 0.42,
            payload: Some(payload),
        };

        let hit = map_scored_point(point);
        assert_eq!(hit.id, "unit-1");
        assert!((hit.score - 0.42).abs() < f32::EPSILON);
        assert_eq!(hit.text.as_deref(), Some("Example passage"));
        assert_eq!(hit.page, Some(7));
        assert_eq!(hit.section.as_deref(), Some("Results"));
        assert_eq!(hit.content_type.as_deref(), Some("text"));
        assert_eq!(
            hit.related_images,
            Some(vec!["img_7_0".to_string(), "img_7_1".to_string()])
        );
        assert_eq!(hit.file_hash.as_deref(), Some("abc123"));
        let full = hit.payload.expect("full payload retained");
        assert_eq!(full["text"], "Example passage");
        assert_eq!(full.len(), 6);
    }

    #[test]
    fn map_scored_point_tolerates_missing_payload() {
        let point = ScoredPoint {
            id: "unit-2".into(),
            score: 0.1,
            payload: None,
        };

        let hit = map_scored_point(point);
        assert_eq!(hit.id, "unit-2");
        assert!(hit.text.is_none());
        assert!(hit.page.is_none());
        assert!(hit.related_images.is_none());
        assert!(hit.payload.is_none());
    }
}
