//! Core data types for the structuring stage.

use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

/// Errors produced while structuring partitioned elements.
#[derive(Debug, Error)]
pub enum StructureError {
    /// The partitioning engine yielded no elements at all.
    #[error("partitioning produced no elements; the document may be empty or corrupt")]
    NoElements,
}

/// One atomic element produced by the external document partitioning engine.
///
/// Every variant carries its originating page number (1-based). The
/// structuring stage matches exhaustively on the kind; there is no runtime
/// type inspection.
#[derive(Debug, Clone)]
pub enum RawElement {
    /// A heading-like element as classified by the partitioner.
    Title {
        /// Extracted text.
        text: String,
        /// Originating page number.
        page: u32,
    },
    /// A paragraph of body text.
    NarrativeText {
        /// Extracted text.
        text: String,
        /// Originating page number.
        page: u32,
    },
    /// A single list entry.
    ListItem {
        /// Extracted text.
        text: String,
        /// Originating page number.
        page: u32,
    },
    /// A detected table, with an optional HTML rendering.
    Table {
        /// Plain-text fallback rendering of the table.
        text: String,
        /// HTML rendering when the partitioner inferred table structure.
        html: Option<String>,
        /// Originating page number.
        page: u32,
    },
    /// An embedded image with an optional binary payload.
    Image {
        /// Raw image bytes when extraction was requested and succeeded.
        data: Option<Vec<u8>>,
        /// Originating page number.
        page: u32,
    },
}

impl RawElement {
    /// Page number the element originated from.
    pub fn page(&self) -> u32 {
        match self {
            Self::Title { page, .. }
            | Self::NarrativeText { page, .. }
            | Self::ListItem { page, .. }
            | Self::Table { page, .. }
            | Self::Image { page, .. } => *page,
        }
    }
}

/// Kind of content a unit carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    /// A text passage.
    Text,
    /// A flattened table.
    Table,
    /// An image placeholder caption.
    Image,
}

impl ContentType {
    /// Stable string form stored in vector payloads.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Table => "table",
            Self::Image => "image",
        }
    }
}

/// Metadata attached to every content unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitMetadata {
    /// Originating page number (1-based).
    pub page: u32,
    /// Best-effort section heading; defaults to `"General"`.
    pub section: String,
    /// Identifiers of images co-located on the same page.
    pub related_images: Vec<String>,
    /// Fingerprint of the source document.
    pub file_hash: String,
}

/// One embeddable piece of extracted document content.
#[derive(Debug, Clone)]
pub struct ContentUnit {
    /// Globally unique identifier, stable for the unit's lifetime.
    pub id: Uuid,
    /// Kind of content the unit carries.
    pub content_type: ContentType,
    /// Text sent to the embedding provider.
    pub text_content: String,
    /// Page, section, image, and fingerprint metadata.
    pub metadata: UnitMetadata,
}

impl ContentUnit {
    pub(crate) fn new(
        content_type: ContentType,
        text_content: String,
        metadata: UnitMetadata,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            content_type,
            text_content,
            metadata,
        }
    }
}
