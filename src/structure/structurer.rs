//! Grouping raw elements into content units.

use std::collections::BTreeMap;

use super::sections::detect_heading;
use super::tables::flatten_table;
use super::types::{ContentType, ContentUnit, RawElement, StructureError, UnitMetadata};

const DEFAULT_SECTION: &str = "General";

/// Turn a partitioned element stream into embeddable content units.
///
/// Pages are processed in ascending order. Within a page, image elements are
/// assigned deterministic identifiers (`img_<page>_<index>`) during a
/// pre-scan and emitted as placeholder-caption units; every surviving
/// text/table unit on that page references exactly those identifiers.
/// Headings only update the rolling section state and are never emitted as
/// units of their own. Units shorter than `min_chars` are discarded.
///
/// An empty input stream is a document-processing failure
/// ([`StructureError::NoElements`]); elements that all get filtered as noise
/// produce an `Ok` empty result, which callers treat as a valid outcome.
pub fn structure(
    elements: Vec<RawElement>,
    file_hash: &str,
    min_chars: usize,
) -> Result<Vec<ContentUnit>, StructureError> {
    if elements.is_empty() {
        return Err(StructureError::NoElements);
    }

    let mut pages: BTreeMap<u32, Vec<RawElement>> = BTreeMap::new();
    for element in elements {
        pages.entry(element.page()).or_default().push(element);
    }

    let mut units = Vec::new();
    let mut section = DEFAULT_SECTION.to_string();

    for (page, elements) in pages {
        let image_ids: Vec<String> = elements
            .iter()
            .filter(|element| matches!(element, RawElement::Image { .. }))
            .enumerate()
            .map(|(index, _)| format!("img_{page}_{index}"))
            .collect();

        for image_id in &image_ids {
            let caption = format!("Image {image_id} detected on page {page}");
            units.push(ContentUnit::new(
                ContentType::Image,
                caption,
                UnitMetadata {
                    page,
                    section: section.clone(),
                    related_images: Vec::new(),
                    file_hash: file_hash.to_string(),
                },
            ));
        }

        for element in &elements {
            let (content_type, text) = match element {
                RawElement::Image { .. } => continue,
                RawElement::Title { text, .. }
                | RawElement::NarrativeText { text, .. }
                | RawElement::ListItem { text, .. } => {
                    if let Some(heading) = detect_heading(text) {
                        section = heading;
                        continue;
                    }
                    (ContentType::Text, text.trim().to_string())
                }
                RawElement::Table { text, html, .. } => {
                    (ContentType::Table, flatten_table(html.as_deref(), text))
                }
            };

            if text.chars().count() < min_chars {
                tracing::trace!(page, length = text.chars().count(), "Discarding noise unit");
                continue;
            }

            units.push(ContentUnit::new(
                content_type,
                text,
                UnitMetadata {
                    page,
                    section: section.clone(),
                    related_images: image_ids.clone(),
                    file_hash: file_hash.to_string(),
                },
            ));
        }
    }

    Ok(units)
}

#[cfg(test)]
mod tests {
    use super::*;

    const HASH: &str = "deadbeef";

    fn narrative(text: &str, page: u32) -> RawElement {
        RawElement::NarrativeText {
            text: text.to_string(),
            page,
        }
    }

    #[test]
    fn empty_element_stream_is_a_processing_failure() {
        assert!(matches!(
            structure(Vec::new(), HASH, 10),
            Err(StructureError::NoElements)
        ));
    }

    #[test]
    fn all_noise_is_a_valid_empty_result() {
        let units = structure(vec![narrative("tiny", 1)], HASH, 10).unwrap();
        assert!(units.is_empty());
    }

    #[test]
    fn pages_are_ordered_ascending_even_for_unordered_input() {
        let units = structure(
            vec![
                narrative("content from the second page", 2),
                narrative("content from the first page", 1),
            ],
            HASH,
            10,
        )
        .unwrap();

        let pages: Vec<u32> = units.iter().map(|unit| unit.metadata.page).collect();
        assert_eq!(pages, vec![1, 2]);
    }

    #[test]
    fn related_images_cover_exactly_the_same_page() {
        let units = structure(
            vec![
                RawElement::Image { data: None, page: 1 },
                narrative("text sharing page one with the image", 1),
                narrative("text alone on page two of the file", 2),
                RawElement::Image { data: None, page: 2 },
                RawElement::Image { data: None, page: 2 },
            ],
            HASH,
            10,
        )
        .unwrap();

        let page_one_text = units
            .iter()
            .find(|unit| unit.content_type == ContentType::Text && unit.metadata.page == 1)
            .unwrap();
        assert_eq!(page_one_text.metadata.related_images, vec!["img_1_0"]);

        let page_two_text = units
            .iter()
            .find(|unit| unit.content_type == ContentType::Text && unit.metadata.page == 2)
            .unwrap();
        assert_eq!(
            page_two_text.metadata.related_images,
            vec!["img_2_0", "img_2_1"]
        );
    }

    #[test]
    fn image_units_carry_placeholder_captions() {
        let units = structure(vec![RawElement::Image { data: None, page: 3 }], HASH, 10).unwrap();
        assert_eq!(units.len(), 1);
        assert_eq!(units[0].content_type, ContentType::Image);
        assert_eq!(units[0].text_content, "Image img_3_0 detected on page 3");
        assert!(units[0].metadata.related_images.is_empty());
    }

    #[test]
    fn headings_update_state_without_being_emitted() {
        let units = structure(
            vec![
                RawElement::Title {
                    text: "RESULTS".to_string(),
                    page: 1,
                },
                narrative("accuracy improved across every benchmark", 1),
            ],
            HASH,
            10,
        )
        .unwrap();

        assert_eq!(units.len(), 1);
        assert_eq!(units[0].metadata.section, "RESULTS");
        assert_eq!(
            units[0].text_content,
            "accuracy improved across every benchmark"
        );
    }

    #[test]
    fn section_rolls_forward_until_the_next_heading() {
        let units = structure(
            vec![
                narrative("body text before any heading appears here", 1),
                RawElement::Title {
                    text: "Methodology".to_string(),
                    page: 1,
                },
                narrative("first methodology paragraph for the test", 1),
                narrative("second methodology paragraph on a later page", 2),
            ],
            HASH,
            10,
        )
        .unwrap();

        assert_eq!(units[0].metadata.section, "General");
        assert_eq!(units[1].metadata.section, "Methodology");
        assert_eq!(units[2].metadata.section, "Methodology");
    }

    #[test]
    fn tables_prefer_the_html_rendering() {
        let units = structure(
            vec![RawElement::Table {
                text: "plain fallback rendering".to_string(),
                html: Some("<table><tr><td>alpha</td><td>beta</td></tr></table>".to_string()),
                page: 1,
            }],
            HASH,
            10,
        )
        .unwrap();

        assert_eq!(units[0].content_type, ContentType::Table);
        assert_eq!(units[0].text_content, "| alpha | beta |");
    }

    #[test]
    fn every_unit_shares_the_document_fingerprint() {
        let units = structure(
            vec![
                narrative("first unit with enough characters", 1),
                RawElement::Image { data: None, page: 1 },
            ],
            HASH,
            10,
        )
        .unwrap();

        assert!(units.iter().all(|unit| unit.metadata.file_hash == HASH));
        assert_eq!(units.len(), 2);
    }
}
