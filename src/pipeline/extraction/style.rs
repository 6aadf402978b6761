//! Reference-document style analysis.
//!
//! Korean government reports are usually written in itemized form (개조식):
//! bullet lines that end in a nominal ending such as ~임, ~함, ~됨 or a
//! compound like ~예정임. The profile built here tells the prompt builder
//! which endings and bullets the reference actually uses.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use super::structure::{identify_section_structure, SectionHeading};
use super::terms::extract_technical_terms;

/// Compound itemized endings, matched before the bare 임/함/됨.
const COMPOUND_ENDINGS: &[&str] = &[
    "예정임", "계획임", "목적임", "필요함", "중요함", "완료됨", "진행됨", "제공함",
    "적용함", "개발함", "구현함", "완성함", "수행함", "실시함", "추진함", "강화함",
    "개선함", "확대함", "보완함", "확인함", "검토함", "분석함", "평가함", "활용함",
    "운영함", "관리함", "지원함", "협력함", "공유함", "연계함", "연결함", "통합함",
    "연결됨", "통합됨", "구축됨", "설치됨", "적용됨", "개선됨", "제공됨", "개발됨",
    "구현됨", "완성됨", "수행됨", "실시됨", "추진됨", "강화됨", "확대됨", "보완됨",
    "확인됨", "검토됨", "분석됨", "평가됨", "활용됨", "운영됨", "관리됨", "지원됨",
    "협력됨", "공유됨", "연계됨",
];

const BARE_ENDINGS: &[&str] = &["임", "함", "됨"];

/// Bullet markers recognised at the start of an itemized line.
pub const BULLET_MARKERS: &[char] = &['*', '-', '•', '·', '○', '□', '▪', '◦', '※'];

/// More than this many itemized bullet lines marks the reference as itemized.
const ITEMIZED_LINE_THRESHOLD: usize = 5;

/// A word ending in an itemized ending, followed by punctuation, space or EOL.
static ITEMIZED_WORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\p{Hangul}+)(?:[.。,]|\s|$)").unwrap());

static ITEMIZED_BULLET_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^\s*([*\-•·○□▪◦※])\s+.+[임함됨][.。]?\s*$").unwrap()
});

static DECLARATIVE_END: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:습니다|니다|한다|했다|이다|있다|된다|였다)[.。]").unwrap());

/// How often a given ending occurs in the reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndingCount {
    pub ending: String,
    pub count: usize,
}

/// Dominant sentence form of a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SentenceStyle {
    Itemized,
    Declarative,
    Mixed,
}

/// Formatting patterns extracted from a reference document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StyleProfile {
    /// Endings ordered by frequency, most common first.
    pub itemized_endings: Vec<EndingCount>,
    pub is_itemized_format: bool,
    pub sentence_style: SentenceStyle,
    /// Bullet markers seen on itemized lines, most common first.
    pub bullet_markers: Vec<char>,
    pub technical_terms: Vec<String>,
    pub headings: Vec<SectionHeading>,
}

impl Default for StyleProfile {
    /// Without a reference the generator still writes itemized text.
    fn default() -> Self {
        Self {
            itemized_endings: Vec::new(),
            is_itemized_format: true,
            sentence_style: SentenceStyle::Itemized,
            bullet_markers: vec!['*'],
            technical_terms: Vec::new(),
            headings: Vec::new(),
        }
    }
}

impl StyleProfile {
    /// The `limit` most frequent endings.
    pub fn top_endings(&self, limit: usize) -> Vec<&str> {
        self.itemized_endings
            .iter()
            .take(limit)
            .map(|e| e.ending.as_str())
            .collect()
    }
}

/// Extract formatting patterns from reference text.
pub fn extract_formatting_patterns(text: &str) -> StyleProfile {
    let itemized_endings = count_itemized_endings(text);

    let mut bullet_counts: BTreeMap<char, usize> = BTreeMap::new();
    let mut bullet_lines = 0;
    for caps in ITEMIZED_BULLET_LINE.captures_iter(text) {
        bullet_lines += 1;
        if let Some(marker) = caps[1].chars().next() {
            *bullet_counts.entry(marker).or_default() += 1;
        }
    }
    let mut bullet_markers: Vec<(char, usize)> = bullet_counts.into_iter().collect();
    bullet_markers.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));

    let itemized_total: usize = itemized_endings.iter().map(|e| e.count).sum();
    let declarative_total = DECLARATIVE_END.find_iter(text).count();

    let profile = StyleProfile {
        is_itemized_format: bullet_lines > ITEMIZED_LINE_THRESHOLD,
        sentence_style: classify_style(itemized_total, declarative_total),
        bullet_markers: bullet_markers.into_iter().map(|(c, _)| c).collect(),
        technical_terms: extract_technical_terms(text),
        headings: identify_section_structure(text),
        itemized_endings,
    };

    tracing::debug!(
        endings = profile.itemized_endings.len(),
        itemized = profile.is_itemized_format,
        style = ?profile.sentence_style,
        terms = profile.technical_terms.len(),
        headings = profile.headings.len(),
        "Reference style profile built"
    );

    profile
}

fn count_itemized_endings(text: &str) -> Vec<EndingCount> {
    let mut counts: BTreeMap<&'static str, usize> = BTreeMap::new();

    for caps in ITEMIZED_WORD.captures_iter(text) {
        let word = &caps[1];
        if let Some(ending) = match_ending(word) {
            *counts.entry(ending).or_default() += 1;
        }
    }

    let mut endings: Vec<EndingCount> = counts
        .into_iter()
        .map(|(ending, count)| EndingCount {
            ending: ending.to_string(),
            count,
        })
        .collect();
    endings.sort_by(|a, b| b.count.cmp(&a.count).then(a.ending.cmp(&b.ending)));
    endings
}

/// Longest known ending the word ends with.
fn match_ending(word: &str) -> Option<&'static str> {
    COMPOUND_ENDINGS
        .iter()
        .chain(BARE_ENDINGS.iter())
        .copied()
        .filter(|ending| word.ends_with(ending))
        .max_by_key(|ending| ending.chars().count())
}

fn classify_style(itemized: usize, declarative: usize) -> SentenceStyle {
    match (itemized, declarative) {
        (0, 0) => SentenceStyle::Mixed,
        (i, d) if i >= d * 3 => SentenceStyle::Itemized,
        (i, d) if d >= i * 3 => SentenceStyle::Declarative,
        _ => SentenceStyle::Mixed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ITEMIZED_REFERENCE: &str = "\
1. 사업 개요
* 해양 데이터 플랫폼 구축을 완료함.
* S-100 기반 전자해도 시험 운영을 추진함.
* 국제수로기구(IHO) 표준 적용을 검토함.
* 차년도 확대 적용 예정임.
* 관계 기관과 협력함.
* VTS 연계 시험을 완료됨.
2. 추진 실적
- 데이터 품질 개선을 실시함.
";

    #[test]
    fn compound_endings_win_over_bare_endings() {
        assert_eq!(match_ending("예정임"), Some("예정임"));
        assert_eq!(match_ending("추진함"), Some("추진함"));
        assert_eq!(match_ending("구축됨"), Some("구축됨"));
        assert_eq!(match_ending("마무리함"), Some("함"));
        assert_eq!(match_ending("보고서"), None);
    }

    #[test]
    fn detects_itemized_format() {
        let profile = extract_formatting_patterns(ITEMIZED_REFERENCE);
        assert!(profile.is_itemized_format);
        assert_eq!(profile.sentence_style, SentenceStyle::Itemized);
        assert_eq!(profile.bullet_markers.first(), Some(&'*'));
    }

    #[test]
    fn counts_endings_by_frequency() {
        let profile = extract_formatting_patterns(ITEMIZED_REFERENCE);
        let endings = profile.top_endings(20);
        assert!(endings.contains(&"추진함"));
        assert!(endings.contains(&"예정임"));
        assert!(endings.contains(&"완료됨"));
        // "완료함" is not a compound ending; it counts as bare 함
        assert!(endings.contains(&"함"));
    }

    #[test]
    fn most_frequent_ending_first() {
        let text = "* 자료를 정리함.\n* 결과를 마무리함.\n* 사업을 추진함.";
        let profile = extract_formatting_patterns(text);
        assert_eq!(profile.itemized_endings[0].ending, "함");
        assert_eq!(profile.itemized_endings[0].count, 2);
        assert_eq!(profile.itemized_endings[1].ending, "추진함");
    }

    #[test]
    fn few_bullets_is_not_itemized_format() {
        let text = "* 시스템을 구축함.\n* 시험을 완료함.\n본 사업은 성공적으로 수행되었습니다.";
        let profile = extract_formatting_patterns(text);
        assert!(!profile.is_itemized_format);
    }

    #[test]
    fn declarative_reference_is_classified() {
        let text = "본 사업은 2024년에 시작되었습니다. 시스템을 구축하였습니다. \
                    성과가 있었다. 향후 확대할 계획이다.";
        let profile = extract_formatting_patterns(text);
        assert_eq!(profile.sentence_style, SentenceStyle::Declarative);
    }

    #[test]
    fn profile_collects_terms_and_headings() {
        let profile = extract_formatting_patterns(ITEMIZED_REFERENCE);
        assert!(profile.technical_terms.contains(&"IHO".to_string()));
        assert!(profile.technical_terms.contains(&"S-100".to_string()));
        assert_eq!(profile.headings.len(), 2);
        assert_eq!(profile.headings[1].title, "추진 실적");
    }

    #[test]
    fn empty_text_yields_mixed_style() {
        let profile = extract_formatting_patterns("");
        assert!(profile.itemized_endings.is_empty());
        assert!(!profile.is_itemized_format);
        assert_eq!(profile.sentence_style, SentenceStyle::Mixed);
    }

    #[test]
    fn default_profile_is_itemized() {
        let profile = StyleProfile::default();
        assert!(profile.is_itemized_format);
        assert_eq!(profile.bullet_markers, vec!['*']);
    }
}
