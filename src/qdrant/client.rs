//! HTTP client wrapper for interacting with Qdrant.

use reqwest::{Client, Method, StatusCode};
use serde_json::{Value, json};

use crate::config::Config;
use crate::qdrant::types::{
    CollectionInfoResponse, QdrantError, QueryResponse, QueryResponseResult, ScoredPoint,
    ScrollResponse, VectorRecord,
};

/// Upper bound on the ids returned by an existence lookup. Enough to prove a
/// fingerprint is present and to echo its unit ids back to the caller; never
/// an exhaustive scan.
const EXISTENCE_LOOKUP_LIMIT: usize = 1000;

/// Lightweight HTTP client for Qdrant operations.
///
/// Constructed once at process start and shared across requests; the inner
/// reqwest client pools its connections.
pub struct QdrantService {
    pub(crate) client: Client,
    pub(crate) base_url: String,
    pub(crate) api_key: Option<String>,
}

impl QdrantService {
    /// Construct a new client from explicit configuration.
    pub fn new(config: &Config) -> Result<Self, QdrantError> {
        let client = Client::builder().user_agent("pdfvector/0.2").build()?;

        let base_url = normalize_base_url(&config.qdrant_url).map_err(QdrantError::InvalidUrl)?;
        tracing::debug!(
            url = %base_url,
            has_api_key = %config
                .qdrant_api_key
                .as_deref()
                .map(|value| !value.is_empty())
                .unwrap_or(false),
            "Initialized Qdrant HTTP client"
        );

        Ok(Self {
            client,
            base_url,
            api_key: config.qdrant_api_key.clone(),
        })
    }

    /// Ensure the collection exists with the expected vector dimension.
    ///
    /// Creates the collection when it is missing. When it already exists with
    /// a different dimension this fails with
    /// [`QdrantError::DimensionMismatch`]; an existing, possibly populated
    /// collection is never dropped or recreated here.
    pub async fn ensure_collection(
        &self,
        collection_name: &str,
        dimension: u64,
    ) -> Result<(), QdrantError> {
        match self.collection_dimension(collection_name).await? {
            Some(actual) if actual == dimension => {
                tracing::debug!(collection = collection_name, dimension, "Collection ready");
                Ok(())
            }
            Some(actual) => Err(QdrantError::DimensionMismatch {
                collection: collection_name.to_string(),
                expected: dimension,
                actual,
            }),
            None => {
                tracing::debug!(collection = collection_name, dimension, "Creating collection");
                self.create_collection(collection_name, dimension).await
            }
        }
    }

    /// Fetch the declared vector dimension of a collection, `None` when the
    /// collection does not exist.
    pub async fn collection_dimension(
        &self,
        collection_name: &str,
    ) -> Result<Option<u64>, QdrantError> {
        let response = self
            .request(Method::GET, &format!("collections/{collection_name}"))?
            .send()
            .await?;

        match response.status() {
            StatusCode::OK => {
                let payload: CollectionInfoResponse = response.json().await?;
                Ok(payload.result.config.params.vector_size())
            }
            StatusCode::NOT_FOUND => Ok(None),
            status => {
                let body = response.text().await.unwrap_or_default();
                let error = QdrantError::UnexpectedStatus { status, body };
                tracing::error!(collection = collection_name, error = %error, "Collection lookup failed");
                Err(error)
            }
        }
    }

    /// Create a collection with the given vector size and cosine distance.
    pub async fn create_collection(
        &self,
        collection_name: &str,
        vector_size: u64,
    ) -> Result<(), QdrantError> {
        let body = json!({
            "vectors": {
                "size": vector_size,
                "distance": "Cosine"
            }
        });

        let response = self
            .request(Method::PUT, &format!("collections/{collection_name}"))?
            .json(&body)
            .send()
            .await?;

        self.ensure_success(response, || {
            tracing::debug!(collection = collection_name, vector_size, "Collection created");
        })
        .await
    }

    /// Ensure standard payload indexes exist for the filterable fields.
    pub async fn ensure_payload_indexes(&self, collection_name: &str) -> Result<(), QdrantError> {
        let fields: [(&str, &str); 4] = [
            ("file_hash", "keyword"),
            ("content_type", "keyword"),
            ("section", "keyword"),
            ("page", "integer"),
        ];

        for (field, schema) in fields {
            let body = json!({
                "field_name": field,
                "field_schema": schema,
            });

            let response = self
                .request(Method::PUT, &format!("collections/{collection_name}/index"))?
                .json(&body)
                .send()
                .await?;

            if response.status().is_success() {
                tracing::debug!(
                    collection = collection_name,
                    field,
                    schema,
                    "Payload index ensured"
                );
            } else if response.status() == StatusCode::CONFLICT {
                tracing::debug!(
                    collection = collection_name,
                    field,
                    schema,
                    "Payload index already exists"
                );
            } else {
                let status = response.status();
                let body = response.text().await.unwrap_or_default();
                let error = QdrantError::UnexpectedStatus { status, body };
                tracing::warn!(collection = collection_name, field, schema, error = %error, "Failed to ensure payload index");
            }
        }

        Ok(())
    }

    /// Look up ids stored for a document fingerprint.
    ///
    /// A single bounded scroll page with existence-proof semantics; a
    /// non-empty result means the fingerprint has already been processed.
    pub async fn exists_by_fingerprint(
        &self,
        collection_name: &str,
        file_hash: &str,
    ) -> Result<Vec<String>, QdrantError> {
        let body = json!({
            "filter": super::filters::fingerprint_filter(file_hash),
            "limit": EXISTENCE_LOOKUP_LIMIT,
            "with_payload": false,
            "with_vector": false,
        });

        let response = self
            .request(
                Method::POST,
                &format!("collections/{collection_name}/points/scroll"),
            )?
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let error = QdrantError::UnexpectedStatus { status, body };
            tracing::error!(collection = collection_name, file_hash, error = %error, "Fingerprint lookup failed");
            return Err(error);
        }

        let ScrollResponse { result } = response.json().await?;
        Ok(result
            .points
            .into_iter()
            .filter_map(|point| point.id.map(stringify_point_id))
            .collect())
    }

    /// Delete every record belonging to a document fingerprint.
    pub async fn delete_by_fingerprint(
        &self,
        collection_name: &str,
        file_hash: &str,
    ) -> Result<(), QdrantError> {
        let body = json!({
            "filter": super::filters::fingerprint_filter(file_hash),
        });

        let response = self
            .request(
                Method::POST,
                &format!("collections/{collection_name}/points/delete"),
            )?
            .query(&[("wait", true)])
            .json(&body)
            .send()
            .await?;

        self.ensure_success(response, || {
            tracing::debug!(
                collection = collection_name,
                file_hash,
                "Deleted prior fingerprint records"
            );
        })
        .await
    }

    /// Upsert a batch of vector records, waiting for write acknowledgment.
    pub async fn upsert_points(
        &self,
        collection_name: &str,
        records: &[VectorRecord],
    ) -> Result<(), QdrantError> {
        if records.is_empty() {
            return Ok(());
        }

        let serialized: Vec<Value> = records
            .iter()
            .map(|record| {
                json!({
                    "id": record.id,
                    "vector": record.vector,
                    "payload": record.payload,
                })
            })
            .collect();

        let point_count = serialized.len();
        let response = self
            .request(
                Method::PUT,
                &format!("collections/{collection_name}/points"),
            )?
            .query(&[("wait", true)])
            .json(&json!({ "points": serialized }))
            .send()
            .await?;

        self.ensure_success(response, || {
            tracing::debug!(
                collection = collection_name,
                points = point_count,
                "Points upserted"
            );
        })
        .await
    }

    /// Perform a similarity search against a collection, returning scored payloads.
    pub async fn search_points(
        &self,
        collection_name: &str,
        vector: Vec<f32>,
        filter: Option<Value>,
        limit: usize,
    ) -> Result<Vec<ScoredPoint>, QdrantError> {
        let mut body = json!({
            "query": vector,
            "limit": limit,
            "with_payload": true,
        });
        let obj = body
            .as_object_mut()
            .expect("query body should remain an object");

        if let Some(filter_value) = filter {
            obj.insert("filter".into(), filter_value);
        }

        let response = self
            .request(
                Method::POST,
                &format!("collections/{collection_name}/points/query"),
            )?
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let error = QdrantError::UnexpectedStatus { status, body };
            tracing::error!(collection = collection_name, error = %error, "Qdrant search failed");
            return Err(error);
        }

        let payload: QueryResponse = response.json().await?;
        let points = match payload.result {
            QueryResponseResult::Points(points) => points,
            QueryResponseResult::Object { points, .. } => points,
        };
        let results = points
            .into_iter()
            .map(|point| ScoredPoint {
                id: stringify_point_id(point.id),
                score: point.score,
                payload: point.payload,
            })
            .collect();

        Ok(results)
    }

    fn request(&self, method: Method, path: &str) -> Result<reqwest::RequestBuilder, QdrantError> {
        let url = format_endpoint(&self.base_url, path);
        let mut req = self.client.request(method, url);
        if let Some(api_key) = &self.api_key
            && !api_key.is_empty()
        {
            req = req.header("api-key", api_key);
        }
        Ok(req)
    }

    async fn ensure_success<F>(
        &self,
        response: reqwest::Response,
        on_success: F,
    ) -> Result<(), QdrantError>
    where
        F: FnOnce(),
    {
        if response.status().is_success() {
            on_success();
            Ok(())
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let error = QdrantError::UnexpectedStatus { status, body };
            tracing::error!(error = %error, "Qdrant request failed");
            Err(error)
        }
    }
}

fn normalize_base_url(url: &str) -> Result<String, String> {
    let mut parsed = reqwest::Url::parse(url).map_err(|err| err.to_string())?;
    let path = parsed.path().trim_end_matches('/').to_string();
    parsed.set_path(&path);
    Ok(parsed.to_string())
}

fn format_endpoint(base: &str, path: &str) -> String {
    let base = base.trim_end_matches('/');
    let path = path.trim_start_matches('/');
    format!("{base}/{path}")
}

pub(crate) fn stringify_point_id(id: Value) -> String {
    match id {
        Value::String(text) => text,
        Value::Number(number) => number.to_string(),
        Value::Object(map) => map
            .get("uuid")
            .map(|value| match value {
                Value::String(uuid) => uuid.clone(),
                other => other.to_string(),
            })
            .unwrap_or_else(|| Value::Object(map).to_string()),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::qdrant::SearchFilterArgs;
    use httpmock::{Method::GET, Method::POST, Method::PUT, MockServer};
    use reqwest::Client;

    fn service_for(server: &MockServer) -> QdrantService {
        QdrantService {
            client: Client::builder()
                .user_agent("pdfvector-test")
                .build()
                .expect("client"),
            base_url: server.base_url(),
            api_key: None,
        }
    }

    #[tokio::test]
    async fn search_points_emits_expected_request() {
        let server = MockServer::start_async().await;

        let filter = crate::qdrant::build_search_filter(&SearchFilterArgs {
            file_hash: Some("abc123".into()),
            ..Default::default()
        })
        .expect("filter value");

        let mock = server
            .mock_async(|when, then| {
                when.method(POST).path("/collections/demo/points/query");
                then.status(200).json_body(serde_json::json!({
                    "status": "ok",
                    "time": 0.0,
                    "result": [
                        {
                            "id": "unit-1",
                            "score": 0.42,
                            "payload": {
                                "text": "Example",
                                "file_hash": "abc123"
                            }
                        }
                    ]
                }));
            })
            .await;

        let service = service_for(&server);
        let results = service
            .search_points("demo", vec![0.1, 0.2], Some(filter), 3)
            .await
            .expect("search request");

        mock.assert();

        assert_eq!(results.len(), 1);
        let hit = &results[0];
        assert_eq!(hit.id, "unit-1");
        assert!((hit.score - 0.42).abs() < f32::EPSILON);
        let payload = hit.payload.as_ref().expect("payload");
        assert_eq!(payload["file_hash"], Value::String("abc123".into()));
    }

    #[tokio::test]
    async fn exists_by_fingerprint_returns_stored_ids() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/collections/demo/points/scroll")
                    .json_body_partial(
                        r#"{"filter": {"must": [{"key": "file_hash", "match": {"value": "abc123"}}]}}"#,
                    );
                then.status(200).json_body(serde_json::json!({
                    "result": {
                        "points": [
                            { "id": "id-1" },
                            { "id": "id-2" }
                        ],
                        "next_page_offset": null
                    }
                }));
            })
            .await;

        let service = service_for(&server);
        let ids = service
            .exists_by_fingerprint("demo", "abc123")
            .await
            .expect("lookup");

        mock.assert();
        assert_eq!(ids, vec!["id-1".to_string(), "id-2".to_string()]);
    }

    #[tokio::test]
    async fn ensure_collection_rejects_dimension_mismatch() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/collections/demo");
                then.status(200).json_body(serde_json::json!({
                    "result": {
                        "config": {
                            "params": {
                                "vectors": { "size": 768, "distance": "Cosine" }
                            }
                        }
                    }
                }));
            })
            .await;

        let service = service_for(&server);
        let error = service
            .ensure_collection("demo", 1536)
            .await
            .expect_err("mismatch");

        assert!(matches!(
            error,
            QdrantError::DimensionMismatch {
                expected: 1536,
                actual: 768,
                ..
            }
        ));
        assert!(!error.is_transient());
    }

    #[tokio::test]
    async fn ensure_collection_creates_missing_collection() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/collections/demo");
                then.status(404).body("not found");
            })
            .await;
        let create = server
            .mock_async(|when, then| {
                when.method(PUT)
                    .path("/collections/demo")
                    .json_body_partial(r#"{"vectors": {"size": 1536, "distance": "Cosine"}}"#);
                then.status(200).json_body(serde_json::json!({ "result": true }));
            })
            .await;

        let service = service_for(&server);
        service
            .ensure_collection("demo", 1536)
            .await
            .expect("created");
        create.assert();
    }

    #[tokio::test]
    async fn delete_by_fingerprint_waits_for_acknowledgment() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/collections/demo/points/delete")
                    .query_param("wait", "true");
                then.status(200).json_body(serde_json::json!({ "result": {} }));
            })
            .await;

        let service = service_for(&server);
        service
            .delete_by_fingerprint("demo", "abc123")
            .await
            .expect("delete");
        mock.assert();
    }

    #[tokio::test]
    async fn upsert_points_skips_empty_batches() {
        let server = MockServer::start_async().await;
        let service = service_for(&server);
        // No mock registered: an HTTP call would fail the test.
        service.upsert_points("demo", &[]).await.expect("no-op");
    }
}
