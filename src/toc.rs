//! Table-of-contents builder.
//!
//! Section numbers are dash-separated paths: "2", "2-1", "2-1-3".
//! Entries keep insertion order for editing; [`TableOfContents::ordered`]
//! gives document order for generation.

use std::cmp::Ordering;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::pipeline::extraction::SectionHeading;

pub const MAX_LEVEL: u8 = 3;

#[derive(Error, Debug, PartialEq)]
pub enum TocError {
    #[error("Section level must be 1..=3, got {0}")]
    InvalidLevel(u8),

    #[error("Level {level} sections need a parent section number")]
    MissingParent { level: u8 },

    #[error("Parent section {parent} cannot hold a level {level} section")]
    InvalidParent { parent: String, level: u8 },

    #[error("Parent section not found: {0}")]
    ParentNotFound(String),

    #[error("Section index {index} out of range (len {len})")]
    IndexOutOfRange { index: usize, len: usize },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Emphasis {
    #[default]
    Standard,
    Brief,
    Detailed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TocSection {
    pub number: String,
    pub title: String,
    pub level: u8,
    pub word_count: Option<u32>,
    #[serde(default)]
    pub emphasis: Emphasis,
}

impl TocSection {
    fn new(number: String, level: u8) -> Self {
        Self {
            number,
            title: String::new(),
            level,
            word_count: None,
            emphasis: Emphasis::Standard,
        }
    }

    /// Report header line, e.g. "1-2. 추진 실적".
    pub fn header(&self) -> String {
        format!("{}. {}", self.number, self.title)
    }

    fn path(&self) -> Vec<u32> {
        number_path(&self.number)
    }
}

/// Partial update applied by [`TableOfContents::update_section`].
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SectionUpdate {
    pub title: Option<String>,
    /// `Some(None)` clears the word count.
    #[serde(default, deserialize_with = "double_option")]
    pub word_count: Option<Option<u32>>,
    pub emphasis: Option<Emphasis>,
}

fn double_option<'de, D>(deserializer: D) -> Result<Option<Option<u32>>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Option::<u32>::deserialize(deserializer).map(Some)
}

#[derive(Debug, Clone, Serialize)]
pub struct TocValidation {
    pub section_count: usize,
    pub empty_titles: usize,
    pub is_valid: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TableOfContents {
    sections: Vec<TocSection>,
}

fn number_path(number: &str) -> Vec<u32> {
    number
        .split('-')
        .map(|part| part.trim().parse().unwrap_or(0))
        .collect()
}

fn max_child(sections: &[TocSection], level: u8, prefix: &str) -> u32 {
    let position = usize::from(level) - 1;
    sections
        .iter()
        .filter(|s| s.level == level)
        .filter(|s| prefix.is_empty() || s.number.starts_with(&format!("{prefix}-")))
        .filter_map(|s| s.path().get(position).copied())
        .max()
        .unwrap_or(0)
}

impl TableOfContents {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sections(&self) -> &[TocSection] {
        &self.sections
    }

    pub fn len(&self) -> usize {
        self.sections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    pub fn clear(&mut self) {
        self.sections.clear();
    }

    pub fn find(&self, number: &str) -> Option<&TocSection> {
        self.sections.iter().find(|s| s.number == number)
    }

    /// Append a new untitled section and return it.
    ///
    /// Level 1 takes the next top number. Level 2 numbers under the top of
    /// `parent`. Level 3 needs a level-2 parent.
    pub fn add_section(&mut self, level: u8, parent: Option<&str>) -> Result<&TocSection, TocError> {
        let number = match level {
            1 => (max_child(&self.sections, 1, "") + 1).to_string(),
            2 => {
                let parent = parent.ok_or(TocError::MissingParent { level })?;
                let top = parent.split('-').next().unwrap_or(parent).to_string();
                if self.find(&top).is_none() {
                    return Err(TocError::ParentNotFound(top));
                }
                format!("{top}-{}", max_child(&self.sections, 2, &top) + 1)
            }
            3 => {
                let parent = parent.ok_or(TocError::MissingParent { level })?;
                if number_path(parent).len() != 2 {
                    return Err(TocError::InvalidParent {
                        parent: parent.to_string(),
                        level,
                    });
                }
                if self.find(parent).is_none() {
                    return Err(TocError::ParentNotFound(parent.to_string()));
                }
                format!("{parent}-{}", max_child(&self.sections, 3, parent) + 1)
            }
            other => return Err(TocError::InvalidLevel(other)),
        };

        tracing::debug!(number = %number, level, "TOC section added");
        self.sections.push(TocSection::new(number, level));
        let last = self.sections.len() - 1;
        Ok(&self.sections[last])
    }

    /// Remove the entry at `index` and every descendant. Returns the removed sections.
    pub fn delete_section(&mut self, index: usize) -> Result<Vec<TocSection>, TocError> {
        if index >= self.sections.len() {
            return Err(TocError::IndexOutOfRange {
                index,
                len: self.sections.len(),
            });
        }

        let deleted = self.sections.remove(index);
        let prefix = format!("{}-", deleted.number);
        let (descendants, kept): (Vec<_>, Vec<_>) = std::mem::take(&mut self.sections)
            .into_iter()
            .partition(|s| s.number.starts_with(&prefix));
        self.sections = kept;

        let mut removed = vec![deleted];
        removed.extend(descendants);
        Ok(removed)
    }

    pub fn update_section(
        &mut self,
        index: usize,
        update: SectionUpdate,
    ) -> Result<&TocSection, TocError> {
        let len = self.sections.len();
        let section = self
            .sections
            .get_mut(index)
            .ok_or(TocError::IndexOutOfRange { index, len })?;

        if let Some(title) = update.title {
            section.title = title.trim().to_string();
        }
        if let Some(word_count) = update.word_count {
            section.word_count = word_count;
        }
        if let Some(emphasis) = update.emphasis {
            section.emphasis = emphasis;
        }
        Ok(section)
    }

    pub fn validate(&self) -> TocValidation {
        let empty_titles = self
            .sections
            .iter()
            .filter(|s| s.title.trim().is_empty())
            .count();
        TocValidation {
            section_count: self.sections.len(),
            empty_titles,
            is_valid: !self.sections.is_empty() && empty_titles == 0,
        }
    }

    /// Sections in document order ("1" < "1-1" < "1-2" < "2" < "10").
    pub fn ordered(&self) -> Vec<TocSection> {
        let mut ordered = self.sections.clone();
        ordered.sort_by(|a, b| compare_numbers(&a.number, &b.number));
        ordered
    }

    /// Seed a TOC from a reference document's heading structure.
    ///
    /// Headings whose level skips a missing parent are dropped, as are
    /// repeated numbers.
    pub fn from_headings(headings: &[SectionHeading]) -> Self {
        let mut toc = Self::new();
        for heading in headings {
            if heading.level == 0 || heading.level > MAX_LEVEL || toc.find(&heading.number).is_some() {
                continue;
            }
            let path = number_path(&heading.number);
            if path.len() != usize::from(heading.level) {
                continue;
            }
            if path.len() > 1 {
                let parent = heading.number.rsplit_once('-').map(|(p, _)| p).unwrap_or("");
                if toc.find(parent).is_none() {
                    continue;
                }
            }
            toc.sections.push(TocSection {
                number: heading.number.clone(),
                title: heading.title.clone(),
                level: heading.level,
                word_count: None,
                emphasis: Emphasis::Standard,
            });
        }
        toc
    }
}

pub fn compare_numbers(a: &str, b: &str) -> Ordering {
    number_path(a).cmp(&number_path(b))
}

static NEXT_YEAR_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"다음\s*년도\s*(?:수행\s*)?계획",
        r"차년도\s*(?:수행\s*)?계획",
        r"내년\s*(?:수행\s*)?계획",
        r"익년도\s*(?:수행\s*)?계획",
        r"향후\s*계획",
        r"\d+\s*차\s*년도\s*(?:수행\s*)?계획",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

/// Whether a title names a next-year plan section.
pub fn is_next_year_title(title: &str) -> bool {
    let title = title.trim();
    !title.is_empty() && NEXT_YEAR_PATTERNS.iter().any(|p| p.is_match(title))
}

/// Titles of sections that hold next-year plans.
pub fn detect_next_year_sections(sections: &[TocSection]) -> (bool, Vec<String>) {
    let matching: Vec<String> = sections
        .iter()
        .map(|s| s.title.trim())
        .filter(|t| is_next_year_title(t))
        .map(str::to_string)
        .collect();
    (!matching.is_empty(), matching)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::extraction::identify_section_structure;

    fn numbers(toc: &TableOfContents) -> Vec<&str> {
        toc.sections().iter().map(|s| s.number.as_str()).collect()
    }

    #[test]
    fn top_level_numbers_increment() {
        let mut toc = TableOfContents::new();
        toc.add_section(1, None).unwrap();
        toc.add_section(1, None).unwrap();
        let third = toc.add_section(1, None).unwrap();
        assert_eq!(third.number, "3");
        assert_eq!(third.level, 1);
        assert!(third.title.is_empty());
        assert_eq!(third.emphasis, Emphasis::Standard);
    }

    #[test]
    fn nested_numbers_follow_parent() {
        let mut toc = TableOfContents::new();
        toc.add_section(1, None).unwrap();
        toc.add_section(1, None).unwrap();
        toc.add_section(2, Some("1")).unwrap();
        toc.add_section(2, Some("2")).unwrap();
        toc.add_section(2, Some("1")).unwrap();
        toc.add_section(3, Some("1-2")).unwrap();
        toc.add_section(3, Some("1-2")).unwrap();

        assert_eq!(numbers(&toc), vec!["1", "2", "1-1", "2-1", "1-2", "1-2-1", "1-2-2"]);
    }

    #[test]
    fn level_two_uses_top_of_deeper_parent() {
        let mut toc = TableOfContents::new();
        toc.add_section(1, None).unwrap();
        toc.add_section(2, Some("1")).unwrap();
        let added = toc.add_section(2, Some("1-1")).unwrap();
        assert_eq!(added.number, "1-2");
    }

    #[test]
    fn top_numbers_skip_past_gaps() {
        let mut toc = TableOfContents::new();
        for _ in 0..3 {
            toc.add_section(1, None).unwrap();
        }
        toc.delete_section(1).unwrap();
        assert_eq!(toc.add_section(1, None).unwrap().number, "4");
    }

    #[test]
    fn level_three_needs_level_two_parent() {
        let mut toc = TableOfContents::new();
        toc.add_section(1, None).unwrap();
        assert_eq!(
            toc.add_section(3, Some("1")).unwrap_err(),
            TocError::InvalidParent {
                parent: "1".into(),
                level: 3
            }
        );
        assert_eq!(
            toc.add_section(3, None).unwrap_err(),
            TocError::MissingParent { level: 3 }
        );
    }

    #[test]
    fn rejects_unknown_parent_and_level() {
        let mut toc = TableOfContents::new();
        assert_eq!(
            toc.add_section(2, Some("4")).unwrap_err(),
            TocError::ParentNotFound("4".into())
        );
        assert_eq!(toc.add_section(4, None).unwrap_err(), TocError::InvalidLevel(4));
        assert_eq!(toc.add_section(0, None).unwrap_err(), TocError::InvalidLevel(0));
        assert!(toc.is_empty());
    }

    #[test]
    fn delete_removes_descendants() {
        let mut toc = TableOfContents::new();
        toc.add_section(1, None).unwrap();
        toc.add_section(2, Some("1")).unwrap();
        toc.add_section(3, Some("1-1")).unwrap();
        toc.add_section(1, None).unwrap();
        toc.add_section(2, Some("2")).unwrap();

        let removed = toc.delete_section(0).unwrap();
        assert_eq!(removed.len(), 3);
        assert_eq!(numbers(&toc), vec!["2", "2-1"]);
    }

    #[test]
    fn delete_does_not_touch_similar_prefixes() {
        let mut toc = TableOfContents::new();
        for _ in 0..11 {
            toc.add_section(1, None).unwrap();
        }
        toc.add_section(2, Some("10")).unwrap();
        toc.add_section(2, Some("1")).unwrap();

        toc.delete_section(0).unwrap();
        assert!(toc.find("10-1").is_some());
        assert!(toc.find("1-1").is_none());
    }

    #[test]
    fn delete_out_of_range_errors() {
        let mut toc = TableOfContents::new();
        assert_eq!(
            toc.delete_section(0).unwrap_err(),
            TocError::IndexOutOfRange { index: 0, len: 0 }
        );
    }

    #[test]
    fn update_sets_fields() {
        let mut toc = TableOfContents::new();
        toc.add_section(1, None).unwrap();
        let updated = toc
            .update_section(
                0,
                SectionUpdate {
                    title: Some("  사업 개요 ".into()),
                    word_count: Some(Some(300)),
                    emphasis: Some(Emphasis::Detailed),
                },
            )
            .unwrap();
        assert_eq!(updated.title, "사업 개요");
        assert_eq!(updated.word_count, Some(300));
        assert_eq!(updated.emphasis, Emphasis::Detailed);

        let cleared = toc
            .update_section(
                0,
                SectionUpdate {
                    word_count: Some(None),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(cleared.word_count, None);
        assert_eq!(cleared.title, "사업 개요");
    }

    #[test]
    fn update_deserializes_null_word_count_as_clear() {
        let update: SectionUpdate = serde_json::from_str(r#"{"word_count": null}"#).unwrap();
        assert_eq!(update.word_count, Some(None));
        let update: SectionUpdate = serde_json::from_str(r#"{"title": "x"}"#).unwrap();
        assert_eq!(update.word_count, None);
    }

    #[test]
    fn validation_counts_blank_titles() {
        let mut toc = TableOfContents::new();
        assert!(!toc.validate().is_valid);

        toc.add_section(1, None).unwrap();
        toc.add_section(1, None).unwrap();
        toc.update_section(0, SectionUpdate { title: Some("개요".into()), ..Default::default() })
            .unwrap();

        let validation = toc.validate();
        assert_eq!(validation.section_count, 2);
        assert_eq!(validation.empty_titles, 1);
        assert!(!validation.is_valid);
    }

    #[test]
    fn ordered_is_document_order() {
        let mut toc = TableOfContents::new();
        for _ in 0..10 {
            toc.add_section(1, None).unwrap();
        }
        toc.add_section(2, Some("2")).unwrap();
        toc.add_section(2, Some("1")).unwrap();
        toc.add_section(3, Some("1-1")).unwrap();

        let order: Vec<String> = toc.ordered().into_iter().map(|s| s.number).take(5).collect();
        assert_eq!(order, vec!["1", "1-1", "1-1-1", "2", "2-1"]);
        assert_eq!(toc.ordered().last().unwrap().number, "10");
    }

    #[test]
    fn seeds_from_reference_headings() {
        let text = "1. 사업 개요\n1-1. 추진 배경\n1-1-1. 국내 동향\n2-3-1. 고아 항목\n2. 추진 실적\n2-1. 주요 성과";
        let toc = TableOfContents::from_headings(&identify_section_structure(text));
        assert_eq!(numbers(&toc), vec!["1", "1-1", "1-1-1", "2", "2-1"]);
        assert_eq!(toc.find("2-1").unwrap().title, "주요 성과");
    }

    #[test]
    fn detects_next_year_plan_titles() {
        let sections: Vec<TocSection> = ["사업 개요", "다음년도 수행계획", "3차년도 계획", "향후 계획", "차년도 계획", "성과"]
            .iter()
            .enumerate()
            .map(|(i, title)| TocSection {
                number: (i + 1).to_string(),
                title: title.to_string(),
                level: 1,
                word_count: None,
                emphasis: Emphasis::Standard,
            })
            .collect();

        let (found, titles) = detect_next_year_sections(&sections);
        assert!(found);
        assert_eq!(titles, vec!["다음년도 수행계획", "3차년도 계획", "향후 계획", "차년도 계획"]);
    }

    #[test]
    fn no_next_year_sections() {
        let (found, titles) = detect_next_year_sections(&[]);
        assert!(!found);
        assert!(titles.is_empty());
        assert!(!is_next_year_title("   "));
    }
}
