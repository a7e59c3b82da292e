//! Document partitioning gateway.
//!
//! PDF parsing and OCR live in an external partitioning service consumed as a
//! black box: bytes in, a sequence of typed elements with page numbers out.
//! The HTTP implementation targets an unstructured-style partition endpoint
//! and supports a degraded `fast` strategy as a fallback when the `hi_res`
//! pass fails.

use async_trait::async_trait;
use base64::Engine;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use thiserror::Error;

use crate::config::Config;
use crate::structure::RawElement;

/// Errors raised by the partitioning service.
#[derive(Debug, Error)]
pub enum PartitionError {
    /// HTTP layer failed before receiving a response.
    #[error("partitioner request failed: {0}")]
    Http(#[from] reqwest::Error),
    /// Partitioner responded with an unexpected status code.
    #[error("unexpected partitioner response ({status}): {body}")]
    UnexpectedStatus {
        /// HTTP status returned by the partitioner.
        status: StatusCode,
        /// Body payload associated with the failing response.
        body: String,
    },
    /// The document could not be parsed by any strategy.
    #[error("document could not be partitioned: {0}")]
    Unparseable(String),
}

/// Partitioning strategy requested from the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PartitionStrategy {
    /// Full-fidelity pass with table inference and image extraction.
    HiRes,
    /// Degraded text-only pass used as a fallback.
    Fast,
}

impl PartitionStrategy {
    /// Wire value sent to the partitioning service.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::HiRes => "hi_res",
            Self::Fast => "fast",
        }
    }
}

/// Interface implemented by document partitioning engines.
#[async_trait]
pub trait Partitioner: Send + Sync {
    /// Partition a document into typed elements.
    async fn partition(
        &self,
        document: &[u8],
        strategy: PartitionStrategy,
    ) -> Result<Vec<RawElement>, PartitionError>;
}

/// Partition with the full-fidelity strategy, falling back to the degraded
/// `fast` strategy when the primary pass fails.
pub async fn partition_with_fallback(
    partitioner: &dyn Partitioner,
    document: &[u8],
) -> Result<Vec<RawElement>, PartitionError> {
    match partitioner.partition(document, PartitionStrategy::HiRes).await {
        Ok(elements) => Ok(elements),
        Err(error) => {
            tracing::warn!(error = %error, "hi_res partitioning failed; retrying with fast strategy");
            partitioner
                .partition(document, PartitionStrategy::Fast)
                .await
                .map_err(|fallback_error| {
                    PartitionError::Unparseable(format!(
                        "hi_res failed ({error}); fast failed ({fallback_error})"
                    ))
                })
        }
    }
}

/// HTTP client for an unstructured-style partitioning service.
pub struct HttpPartitioner {
    client: Client,
    endpoint: String,
}

/// One element as serialized by the partitioning service.
#[derive(Debug, Deserialize)]
struct WireElement {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: String,
    #[serde(default)]
    metadata: WireMetadata,
}

#[derive(Debug, Default, Deserialize)]
struct WireMetadata {
    #[serde(default = "default_page")]
    page_number: u32,
    #[serde(default)]
    text_as_html: Option<String>,
    #[serde(default)]
    image_base64: Option<String>,
}

fn default_page() -> u32 {
    1
}

impl HttpPartitioner {
    /// Construct a client for the configured partitioning service.
    pub fn new(config: &Config) -> Result<Self, PartitionError> {
        let client = Client::builder().user_agent("pdfvector/0.2").build()?;
        Ok(Self {
            client,
            endpoint: format!(
                "{}/partition",
                config.partitioner_url.trim_end_matches('/')
            ),
        })
    }

    fn convert(element: WireElement) -> Option<RawElement> {
        let page = element.metadata.page_number.max(1);
        match element.kind.as_str() {
            "Title" => Some(RawElement::Title {
                text: element.text,
                page,
            }),
            "ListItem" => Some(RawElement::ListItem {
                text: element.text,
                page,
            }),
            "Table" => Some(RawElement::Table {
                text: element.text,
                html: element.metadata.text_as_html,
                page,
            }),
            "Image" | "Figure" => {
                let data = element.metadata.image_base64.and_then(|encoded| {
                    base64::engine::general_purpose::STANDARD
                        .decode(encoded.as_bytes())
                        .ok()
                });
                Some(RawElement::Image { data, page })
            }
            "PageBreak" | "Header" | "Footer" => None,
            // NarrativeText plus any other text-bearing kind.
            _ => Some(RawElement::NarrativeText {
                text: element.text,
                page,
            }),
        }
    }
}

#[async_trait]
impl Partitioner for HttpPartitioner {
    async fn partition(
        &self,
        document: &[u8],
        strategy: PartitionStrategy,
    ) -> Result<Vec<RawElement>, PartitionError> {
        let response = self
            .client
            .post(&self.endpoint)
            .query(&[("strategy", strategy.as_str())])
            .header("content-type", "application/pdf")
            .body(document.to_vec())
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(PartitionError::UnexpectedStatus { status, body });
        }

        let elements: Vec<WireElement> = response.json().await?;
        tracing::debug!(
            strategy = strategy.as_str(),
            elements = elements.len(),
            "Partitioner returned elements"
        );
        Ok(elements
            .into_iter()
            .filter_map(Self::convert)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::{Method::POST, MockServer};
    use serde_json::json;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn partitioner_for(server: &MockServer) -> HttpPartitioner {
        HttpPartitioner {
            client: Client::builder()
                .user_agent("pdfvector-test")
                .build()
                .expect("client"),
            endpoint: format!("{}/partition", server.base_url()),
        }
    }

    #[tokio::test]
    async fn wire_elements_map_to_typed_variants() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/partition")
                    .query_param("strategy", "hi_res");
                then.status(200).json_body(json!([
                    { "type": "Title", "text": "Results", "metadata": { "page_number": 1 } },
                    {
                        "type": "Table",
                        "text": "a b",
                        "metadata": { "page_number": 1, "text_as_html": "<table></table>" }
                    },
                    { "type": "Image", "metadata": { "page_number": 2, "image_base64": "aGk=" } },
                    { "type": "PageBreak", "metadata": { "page_number": 2 } },
                    { "type": "NarrativeText", "text": "body", "metadata": { "page_number": 2 } }
                ]));
            })
            .await;

        let elements = partitioner_for(&server)
            .partition(b"%PDF", PartitionStrategy::HiRes)
            .await
            .expect("elements");

        assert_eq!(elements.len(), 4);
        assert!(matches!(&elements[0], RawElement::Title { text, page: 1 } if text == "Results"));
        assert!(
            matches!(&elements[1], RawElement::Table { html: Some(_), .. })
        );
        assert!(
            matches!(&elements[2], RawElement::Image { data: Some(data), page: 2 } if data == b"hi")
        );
        assert!(matches!(&elements[3], RawElement::NarrativeText { page: 2, .. }));
    }

    #[tokio::test]
    async fn fallback_downgrades_to_fast_strategy() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/partition")
                    .query_param("strategy", "hi_res");
                then.status(500).body("ocr crashed");
            })
            .await;
        let fast = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/partition")
                    .query_param("strategy", "fast");
                then.status(200).json_body(json!([
                    { "type": "NarrativeText", "text": "degraded text", "metadata": { "page_number": 1 } }
                ]));
            })
            .await;

        let partitioner = partitioner_for(&server);
        let elements = partition_with_fallback(&partitioner, b"%PDF")
            .await
            .expect("fallback elements");

        fast.assert();
        assert_eq!(elements.len(), 1);
    }

    #[tokio::test]
    async fn both_strategies_failing_is_unparseable() {
        struct FailingPartitioner(AtomicU32);

        #[async_trait]
        impl Partitioner for FailingPartitioner {
            async fn partition(
                &self,
                _document: &[u8],
                _strategy: PartitionStrategy,
            ) -> Result<Vec<RawElement>, PartitionError> {
                self.0.fetch_add(1, Ordering::SeqCst);
                Err(PartitionError::Unparseable("corrupt xref table".into()))
            }
        }

        let partitioner = FailingPartitioner(AtomicU32::new(0));
        let error = partition_with_fallback(&partitioner, b"%PDF")
            .await
            .expect_err("unparseable");

        assert!(matches!(error, PartitionError::Unparseable(_)));
        assert_eq!(partitioner.0.load(Ordering::SeqCst), 2);
    }
}
