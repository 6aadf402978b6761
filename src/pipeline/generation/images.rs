use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use super::types::GeneratedSection;

static IMAGE_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[이미지\s*추천\s*:\s*([^\]]+)\]").unwrap());

/// An image the model suggested placing in a section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageSuggestion {
    pub section_number: String,
    pub description: String,
    pub placement: String,
}

/// Split "설명 - 위치 맥락" at the last " - ", falling back to the first '-'.
fn split_marker(body: &str) -> (String, String) {
    let body = body.trim();
    let split = body.rsplit_once(" - ").or_else(|| body.split_once('-'));
    match split {
        Some((description, placement)) => {
            (description.trim().to_string(), placement.trim().to_string())
        }
        None => (body.to_string(), String::new()),
    }
}

/// Collect every image marker in the generated sections, in report order.
pub fn extract_image_suggestions(sections: &[GeneratedSection]) -> Vec<ImageSuggestion> {
    sections
        .iter()
        .flat_map(|section| {
            IMAGE_MARKER.captures_iter(&section.content).map(move |caps| {
                let (description, placement) = split_marker(&caps[1]);
                ImageSuggestion {
                    section_number: section.number.clone(),
                    description,
                    placement,
                }
            })
        })
        .collect()
}
