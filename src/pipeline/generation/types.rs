use serde::{Deserialize, Serialize};

use crate::toc::{detect_next_year_sections, TocSection};

/// Report-wide knobs the user sets before generating.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationSettings {
    /// Project year this report covers ("2차년도" → 2).
    pub current_year: u8,
    pub total_years: u8,
    /// Keep output to this organization's work only.
    pub organization: Option<String>,
    /// Drop source sentences that belong to other project years.
    pub year_filter: bool,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            current_year: 2,
            total_years: 5,
            organization: None,
            year_filter: true,
        }
    }
}

impl GenerationSettings {
    pub fn validate(&self) -> Result<(), String> {
        if self.current_year == 0 || self.total_years == 0 {
            return Err("years start at 1".into());
        }
        if self.current_year > self.total_years {
            return Err(format!(
                "current year {} exceeds total years {}",
                self.current_year, self.total_years
            ));
        }
        Ok(())
    }
}

/// Year rules for one report run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct YearContext {
    pub current_year: u8,
    pub total_years: u8,
    pub has_next_year_section: bool,
    pub matching_sections: Vec<String>,
}

impl YearContext {
    pub fn new(settings: &GenerationSettings, toc: &[TocSection]) -> Self {
        let (has_next_year_section, matching_sections) = detect_next_year_sections(toc);
        Self {
            current_year: settings.current_year,
            total_years: settings.total_years,
            has_next_year_section,
            matching_sections,
        }
    }

    /// Whether `title` is one of the next-year plan sections.
    pub fn is_next_year_section(&self, title: &str) -> bool {
        let title = title.trim();
        !title.is_empty()
            && self
                .matching_sections
                .iter()
                .any(|m| m.contains(title) || title.contains(m.as_str()))
    }

    /// The same context narrowed to what one section may see: next-year
    /// titles are only listed while generating one of them.
    pub fn for_section(&self, title: &str) -> Self {
        let mut scoped = self.clone();
        if !self.is_next_year_section(title) {
            scoped.matching_sections.clear();
        }
        scoped
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedSection {
    pub number: String,
    pub title: String,
    pub level: u8,
    pub content: String,
}

impl GeneratedSection {
    pub fn header(&self) -> String {
        format!("{}. {}", self.number, self.title)
    }

    /// Header and body, used as context for later sections.
    pub fn as_context(&self) -> String {
        format!("{}\n{}", self.header(), self.content)
    }
}

/// Render sections as report text: header, `=` underline of the same
/// character length, blank line, body, two blank lines.
pub fn render_report(sections: &[GeneratedSection]) -> String {
    let mut lines: Vec<String> = Vec::with_capacity(sections.len() * 6);
    for section in sections {
        let header = section.header();
        let underline = "=".repeat(header.chars().count());
        lines.push(header);
        lines.push(underline);
        lines.push(String::new());
        lines.push(section.content.clone());
        lines.push(String::new());
        lines.push(String::new());
    }
    lines.join("\n")
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GenerationProgress {
    pub current_section_index: usize,
    pub completed_sections: Vec<String>,
    pub total_sections: usize,
    pub is_generating: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StopReason {
    /// Accumulated output passed 90% of the token ceiling.
    TokenLimit { tokens: usize, limit: usize },
    SectionFailed { number: String, message: String },
}

/// Result of one (possibly partial) report run.
#[derive(Debug, Clone, Serialize)]
pub struct GenerationOutcome {
    pub sections: Vec<GeneratedSection>,
    /// TOC sections that have content.
    pub completed: usize,
    pub total: usize,
    pub is_complete: bool,
    pub stop_reason: Option<StopReason>,
    pub total_tokens: usize,
}
