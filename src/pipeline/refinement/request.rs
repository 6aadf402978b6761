use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

/// What a free-form modification request asks for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "section", rename_all = "snake_case")]
pub enum ModificationRequest {
    RegenerateAll,
    SpecificSection(String),
    AddContent,
    General,
}

/// "3번", "1-1번", "2-1-1번째"
static NUMBERED_TARGET: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+(?:-\d+){0,2})\s*번").unwrap());

/// "섹션 2-1"
static SECTION_TARGET: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"섹션\s*(\d+(?:-\d+){0,2})").unwrap());

const REGENERATE_KEYWORDS: &[&str] = &["전체", "모두", "다시"];
const ADD_KEYWORDS: &[&str] = &["추가", "더", "보완"];

/// Section number named in the request, if any.
pub fn target_section(request: &str) -> Option<String> {
    NUMBERED_TARGET
        .captures(request)
        .or_else(|| SECTION_TARGET.captures(request))
        .map(|caps| caps[1].to_string())
}

/// Classify a modification request.
///
/// Regeneration keywords win over a named section, which wins over
/// add-content keywords.
pub fn analyze_modification_request(request: &str) -> ModificationRequest {
    let lowered = request.to_lowercase();

    if REGENERATE_KEYWORDS.iter().any(|k| lowered.contains(k)) {
        return ModificationRequest::RegenerateAll;
    }
    if let Some(number) = target_section(request) {
        return ModificationRequest::SpecificSection(number);
    }
    if ADD_KEYWORDS.iter().any(|k| lowered.contains(k)) {
        return ModificationRequest::AddContent;
    }
    ModificationRequest::General
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn regenerate_keywords() {
        assert_eq!(analyze_modification_request("전체를 더 격식 있게"), ModificationRequest::RegenerateAll);
        assert_eq!(analyze_modification_request("3번을 다시 써줘"), ModificationRequest::RegenerateAll);
        assert_eq!(analyze_modification_request("모두 간결하게"), ModificationRequest::RegenerateAll);
    }

    #[test]
    fn specific_section_forms() {
        assert_eq!(
            analyze_modification_request("3번 섹션의 수치를 고쳐줘"),
            ModificationRequest::SpecificSection("3".into())
        );
        assert_eq!(
            analyze_modification_request("2-1-1번째 항목 수정"),
            ModificationRequest::SpecificSection("2-1-1".into())
        );
        assert_eq!(
            analyze_modification_request("섹션 1-2 표현 수정"),
            ModificationRequest::SpecificSection("1-2".into())
        );
    }

    #[test]
    fn named_section_beats_add_keywords() {
        assert_eq!(
            analyze_modification_request("2-1번에 내용 추가"),
            ModificationRequest::SpecificSection("2-1".into())
        );
    }

    #[test]
    fn add_content_and_general() {
        assert_eq!(analyze_modification_request("성과 수치를 보완"), ModificationRequest::AddContent);
        assert_eq!(analyze_modification_request("어조를 공손하게"), ModificationRequest::General);
    }

    #[test]
    fn serializes_with_kind_tag() {
        let json = serde_json::to_value(ModificationRequest::SpecificSection("2".into())).unwrap();
        assert_eq!(json["kind"], "specific_section");
        assert_eq!(json["section"], "2");
    }
}
