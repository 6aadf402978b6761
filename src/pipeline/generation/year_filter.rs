use std::collections::BTreeSet;
use std::sync::LazyLock;

use regex::Regex;

use super::types::YearContext;

/// "2차년도", "2차 년도", "2년차", "2차". Group 2 is the character after the
/// match, used to skip "3차원" (three-dimensional).
static YEAR_MENTION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\d+)\s*(?:차\s*년도|년차|차)(.?)").unwrap()
});

static SENTENCE_SPLIT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[.!?。！？]\s*").unwrap());

const MAX_PROJECT_YEAR: u32 = 10;

/// Project years mentioned in `text`, ascending and deduplicated.
pub fn extract_year_from_text(text: &str) -> Vec<u8> {
    let years: BTreeSet<u8> = YEAR_MENTION
        .captures_iter(text)
        .filter(|caps| caps.get(2).map(|m| m.as_str()) != Some("원"))
        .filter_map(|caps| caps[1].parse::<u32>().ok())
        .filter(|year| (1..=MAX_PROJECT_YEAR).contains(year))
        .map(|year| year as u8)
        .collect();
    years.into_iter().collect()
}

/// Decide whether a piece of source text belongs in `section_title`.
///
/// Text without a year is kept. Otherwise the earliest year decides:
/// past years are dropped, the current year is kept, next year is kept only
/// inside a next-year plan section, later years are dropped.
pub fn should_include_content(text: &str, section_title: &str, years: &YearContext) -> bool {
    let Some(&year) = extract_year_from_text(text).first() else {
        return true;
    };

    let current = years.current_year;
    if year < current {
        false
    } else if year == current {
        true
    } else if year == current.saturating_add(1) {
        years.has_next_year_section && years.is_next_year_section(section_title)
    } else {
        false
    }
}

/// Keep only the sentences of `text` that belong in `section_title`.
pub fn filter_content_by_year(text: &str, section_title: &str, years: &YearContext) -> String {
    let kept: Vec<&str> = SENTENCE_SPLIT
        .split(text)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .filter(|s| should_include_content(s, section_title, years))
        .collect();

    if kept.is_empty() {
        String::new()
    } else {
        format!("{}.", kept.join(". "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx(current_year: u8, matching: &[&str]) -> YearContext {
        YearContext {
            current_year,
            total_years: 5,
            has_next_year_section: !matching.is_empty(),
            matching_sections: matching.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn extracts_all_year_forms() {
        assert_eq!(extract_year_from_text("1차년도 성과와 2차 년도 목표"), vec![1, 2]);
        assert_eq!(extract_year_from_text("사업 3년차에 착수"), vec![3]);
        assert_eq!(extract_year_from_text("4차 회의"), vec![4]);
        assert!(extract_year_from_text("연도 표기 없음").is_empty());
    }

    #[test]
    fn ignores_out_of_range_and_dimensions() {
        assert!(extract_year_from_text("11차년도 계획").is_empty());
        assert!(extract_year_from_text("0차").is_empty());
        assert!(extract_year_from_text("3차원 모델링").is_empty());
        assert_eq!(extract_year_from_text("10차년도"), vec![10]);
    }

    #[test]
    fn current_year_included_past_excluded() {
        let years = ctx(2, &[]);
        assert!(should_include_content("2차년도 목표 달성", "성과", &years));
        assert!(!should_include_content("1차년도 결과", "성과", &years));
        assert!(should_include_content("연도 언급 없음", "성과", &years));
    }

    #[test]
    fn next_year_only_inside_plan_section() {
        let years = ctx(2, &["다음년도 수행계획"]);
        assert!(should_include_content("3차년도 확산 추진", "다음년도 수행계획", &years));
        assert!(!should_include_content("3차년도 확산 추진", "추진 실적", &years));

        let no_plan = ctx(2, &[]);
        assert!(!should_include_content("3차년도 확산 추진", "다음년도 수행계획", &no_plan));
    }

    #[test]
    fn far_future_always_excluded() {
        let years = ctx(2, &["향후 계획"]);
        assert!(!should_include_content("5차년도 완료 예정", "향후 계획", &years));
    }

    #[test]
    fn earliest_year_decides_mixed_sentences() {
        let years = ctx(2, &[]);
        assert!(!should_include_content("1차년도에 이어 2차년도에도 수행", "성과", &years));
    }

    #[test]
    fn filters_sentences() {
        let years = ctx(2, &[]);
        let text = "1차년도에는 설계를 마침. 2차년도에는 구현을 완료함! 3차년도에는 확산 예정임. 공통 사항임";
        let filtered = filter_content_by_year(text, "추진 실적", &years);
        assert_eq!(filtered, "2차년도에는 구현을 완료함. 공통 사항임.");
    }

    #[test]
    fn filter_of_all_excluded_is_empty() {
        let years = ctx(3, &[]);
        assert_eq!(filter_content_by_year("1차년도 내용. 2차년도 내용.", "개요", &years), "");
    }
}
