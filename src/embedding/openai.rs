//! OpenAI-compatible embeddings backend.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::{EmbeddingClient, EmbeddingClientError};

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// HTTP client for `POST {base}/embeddings` endpoints.
#[derive(Debug)]
pub struct OpenAiEmbeddingClient {
    client: Client,
    endpoint: String,
    api_key: String,
    model: String,
}

#[derive(Serialize)]
struct EmbeddingsRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Deserialize)]
struct EmbeddingsResponse {
    data: Vec<EmbeddingEntry>,
}

#[derive(Deserialize)]
struct EmbeddingEntry {
    index: usize,
    embedding: Vec<f32>,
}

impl OpenAiEmbeddingClient {
    /// Construct a client for an OpenAI-compatible endpoint.
    pub fn new(
        base_url: Option<&str>,
        api_key: Option<&str>,
        model: &str,
    ) -> Result<Self, EmbeddingClientError> {
        let api_key = api_key
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .ok_or_else(|| {
                EmbeddingClientError::Misconfigured("OPENAI_API_KEY is required".to_string())
            })?;
        let base = base_url.unwrap_or(DEFAULT_BASE_URL).trim_end_matches('/');
        let client = Client::builder().user_agent("pdfvector/0.2").build()?;

        Ok(Self {
            client,
            endpoint: format!("{base}/embeddings"),
            api_key: api_key.to_string(),
            model: model.to_string(),
        })
    }
}

#[async_trait]
impl EmbeddingClient for OpenAiEmbeddingClient {
    async fn generate_embeddings(
        &self,
        texts: Vec<String>,
    ) -> Result<Vec<Vec<f32>>, EmbeddingClientError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let request = EmbeddingsRequest {
            model: &self.model,
            input: &texts,
        };
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(EmbeddingClientError::UnexpectedStatus { status, body });
        }

        let mut payload: EmbeddingsResponse = response.json().await?;
        if payload.data.len() != texts.len() {
            return Err(EmbeddingClientError::InvalidResponse(format!(
                "provider returned {} embeddings for {} inputs",
                payload.data.len(),
                texts.len()
            )));
        }

        payload.data.sort_by_key(|entry| entry.index);
        Ok(payload
            .data
            .into_iter()
            .map(|entry| entry.embedding)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::{Method::POST, MockServer};
    use serde_json::json;

    #[tokio::test]
    async fn embeddings_are_returned_in_input_order() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/v1/embeddings")
                    .header("authorization", "Bearer test-key")
                    .json_body_partial(r#"{"model": "text-embedding-3-small"}"#);
                then.status(200).json_body(json!({
                    "data": [
                        { "index": 1, "embedding": [0.3, 0.4] },
                        { "index": 0, "embedding": [0.1, 0.2] }
                    ]
                }));
            })
            .await;

        let client = OpenAiEmbeddingClient::new(
            Some(&format!("{}/v1", server.base_url())),
            Some("test-key"),
            "text-embedding-3-small",
        )
        .expect("client");

        let vectors = client
            .generate_embeddings(vec!["first".into(), "second".into()])
            .await
            .expect("embeddings");

        mock.assert();
        assert_eq!(vectors, vec![vec![0.1, 0.2], vec![0.3, 0.4]]);
    }

    #[tokio::test]
    async fn rate_limit_responses_are_transient() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/v1/embeddings");
                then.status(429).body("slow down");
            })
            .await;

        let client = OpenAiEmbeddingClient::new(
            Some(&format!("{}/v1", server.base_url())),
            Some("test-key"),
            "text-embedding-3-small",
        )
        .expect("client");

        let error = client
            .generate_embeddings(vec!["text".into()])
            .await
            .expect_err("rate limited");
        assert!(error.is_transient());
    }

    #[tokio::test]
    async fn mismatched_count_is_a_permanent_error() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/v1/embeddings");
                then.status(200).json_body(json!({
                    "data": [{ "index": 0, "embedding": [0.1] }]
                }));
            })
            .await;

        let client = OpenAiEmbeddingClient::new(
            Some(&format!("{}/v1", server.base_url())),
            Some("test-key"),
            "text-embedding-3-small",
        )
        .expect("client");

        let error = client
            .generate_embeddings(vec!["one".into(), "two".into()])
            .await
            .expect_err("count mismatch");
        assert!(matches!(error, EmbeddingClientError::InvalidResponse(_)));
        assert!(!error.is_transient());
    }

    #[test]
    fn missing_api_key_is_rejected_at_construction() {
        let error = OpenAiEmbeddingClient::new(None, None, "model").expect_err("no key");
        assert!(matches!(error, EmbeddingClientError::Misconfigured(_)));
    }
}
