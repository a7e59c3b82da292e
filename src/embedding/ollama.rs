//! Ollama embeddings backend.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::{EmbeddingClient, EmbeddingClientError};

const DEFAULT_BASE_URL: &str = "http://127.0.0.1:11434";

/// HTTP client for the Ollama `/api/embed` endpoint.
pub struct OllamaEmbeddingClient {
    client: Client,
    endpoint: String,
    model: String,
}

#[derive(Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Deserialize)]
struct EmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

impl OllamaEmbeddingClient {
    /// Construct a client for a local or remote Ollama runtime.
    pub fn new(base_url: Option<&str>, model: &str) -> Result<Self, EmbeddingClientError> {
        let base = base_url.unwrap_or(DEFAULT_BASE_URL).trim_end_matches('/');
        let client = Client::builder().user_agent("pdfvector/0.2").build()?;

        Ok(Self {
            client,
            endpoint: format!("{base}/api/embed"),
            model: model.to_string(),
        })
    }
}

#[async_trait]
impl EmbeddingClient for OllamaEmbeddingClient {
    async fn generate_embeddings(
        &self,
        texts: Vec<String>,
    ) -> Result<Vec<Vec<f32>>, EmbeddingClientError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let request = EmbedRequest {
            model: &self.model,
            input: &texts,
        };
        let response = self.client.post(&self.endpoint).json(&request).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(EmbeddingClientError::UnexpectedStatus { status, body });
        }

        let payload: EmbedResponse = response.json().await?;
        if payload.embeddings.len() != texts.len() {
            return Err(EmbeddingClientError::InvalidResponse(format!(
                "provider returned {} embeddings for {} inputs",
                payload.embeddings.len(),
                texts.len()
            )));
        }

        Ok(payload.embeddings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::{Method::POST, MockServer};
    use serde_json::json;

    #[tokio::test]
    async fn embed_call_round_trips() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/api/embed")
                    .json_body_partial(r#"{"model": "nomic-embed-text"}"#);
                then.status(200).json_body(json!({
                    "embeddings": [[0.5, 0.5], [0.1, 0.9]]
                }));
            })
            .await;

        let client =
            OllamaEmbeddingClient::new(Some(&server.base_url()), "nomic-embed-text").expect("client");
        let vectors = client
            .generate_embeddings(vec!["a".into(), "b".into()])
            .await
            .expect("embeddings");

        mock.assert();
        assert_eq!(vectors.len(), 2);
        assert_eq!(vectors[1], vec![0.1, 0.9]);
    }

    #[tokio::test]
    async fn server_errors_are_transient() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/api/embed");
                then.status(500).body("model load failed");
            })
            .await;

        let client =
            OllamaEmbeddingClient::new(Some(&server.base_url()), "nomic-embed-text").expect("client");
        let error = client
            .generate_embeddings(vec!["a".into()])
            .await
            .expect_err("server error");
        assert!(error.is_transient());
    }
}
