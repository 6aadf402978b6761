use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// A numbered heading found in a document ("1. 개요", "2-1. 추진 내용").
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionHeading {
    pub level: u8,
    pub number: String,
    pub title: String,
    pub full_text: String,
}

/// Heading patterns, most specific first so "1-1-1." is not read as level 2.
static HEADING_PATTERNS: LazyLock<[(u8, Regex); 3]> = LazyLock::new(|| {
    [
        (3, Regex::new(r"^(\d+-\d+-\d+)\.\s+(.+)$").unwrap()),
        (2, Regex::new(r"^(\d+-\d+)\.\s+(.+)$").unwrap()),
        (1, Regex::new(r"^(\d+)\.\s+(.+)$").unwrap()),
    ]
});

/// Identify the numbered section structure of a document.
pub fn identify_section_structure(text: &str) -> Vec<SectionHeading> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter_map(parse_heading_line)
        .collect()
}

/// Parse a single line as a numbered heading.
pub fn parse_heading_line(line: &str) -> Option<SectionHeading> {
    HEADING_PATTERNS.iter().find_map(|(level, pattern)| {
        pattern.captures(line).map(|caps| SectionHeading {
            level: *level,
            number: caps[1].to_string(),
            title: caps[2].trim().to_string(),
            full_text: line.to_string(),
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_three_levels() {
        let text = "1. 사업 개요\n본문\n1-1. 추진 배경\n1-1-1. 국내 동향\n2. 추진 실적";
        let headings = identify_section_structure(text);

        assert_eq!(headings.len(), 4);
        assert_eq!(headings[0].level, 1);
        assert_eq!(headings[0].title, "사업 개요");
        assert_eq!(headings[1].level, 2);
        assert_eq!(headings[1].number, "1-1");
        assert_eq!(headings[2].level, 3);
        assert_eq!(headings[2].number, "1-1-1");
        assert_eq!(headings[3].number, "2");
    }

    #[test]
    fn requires_space_after_period() {
        assert!(parse_heading_line("3.5% 증가함").is_none());
        assert!(parse_heading_line("2024.01.15 회의").is_none());
    }

    #[test]
    fn keeps_full_line() {
        let heading = parse_heading_line("2-3. S-100 시험 운영").unwrap();
        assert_eq!(heading.full_text, "2-3. S-100 시험 운영");
        assert_eq!(heading.title, "S-100 시험 운영");
    }

    #[test]
    fn ignores_indented_whitespace() {
        let headings = identify_section_structure("   1. 개요   \n\n");
        assert_eq!(headings.len(), 1);
        assert_eq!(headings[0].title, "개요");
    }
}
