use crate::pipeline::extraction::StyleProfile;
use crate::toc::{Emphasis, TocSection};

use super::types::YearContext;

/// Protected terms listed in the system prompt.
pub const MAX_PROMPT_TERMS: usize = 50;
/// Reference endings listed in the system prompt.
pub const MAX_SYSTEM_ENDINGS: usize = 15;
/// Reference endings repeated in each section prompt.
pub const MAX_SECTION_ENDINGS: usize = 10;
/// Source content passed per section, in characters.
pub const MAX_SOURCE_CHARS: usize = 5000;
/// Earlier sections passed as context.
pub const MAX_PREVIOUS_SECTIONS: usize = 3;
/// Existing section text passed when refining, in characters.
pub const MAX_EXISTING_CHARS: usize = 1000;

pub const IMAGE_MARKER_FORMAT: &str = "[이미지 추천: 설명 - 위치 맥락]";

const ROLE_PROMPT: &str = r#"당신은 한국어 공공·비즈니스 보고서 작성을 돕는 자동화 어시스턴트입니다.

작업 범위:
- 참고 문서의 작성 방식(어조, 용어, 문장 구조)을 분석하여 그대로 따릅니다
- 소스 문서에서 목차 항목에 해당하는 내용을 찾아 사용합니다
- 소스 문서의 사실 정보를 빠짐없이, 덧붙임 없이 옮깁니다
- 내용 흐름상 그림이 필요한 위치에 이미지를 추천합니다 (설명은 한국어)

문체 규칙:
- 출력은 모두 한국어로 작성합니다
- 개조식 문체만 사용합니다. 모든 항목은 불릿(*)으로 시작하고 개조식 종결어미로 끝냅니다
- 개조식 종결어미 예: ~임, ~함, ~됨, ~예정임, ~계획임, ~필요함, ~완료됨, ~추진함, ~개선함, ~구축됨
- 서술형 종결(~다, ~습니다, ~합니다)은 사용하지 않습니다
- 공문서에 맞는 격식 있는 표현을 사용합니다"#;

const TERM_RULES: &str = r#"기술 용어 보존 규칙:
- 약어와 표준 식별자(S-100, S-57, ISO 19115, ENC, ECDIS, VTS, AIS 등)는 번역하지 않습니다
- 기관명은 원문 또는 참고 문서의 표기를 그대로 사용합니다
- 참고 문서가 "국제수로기구(IHO)"처럼 병기하면 같은 형식을 따릅니다
- 대문자·영숫자 용어는 철자를 바꾸지 않습니다
- 번역이 확실하지 않으면 원어를 유지합니다"#;

const FACT_RULES: &str = r#"사실성 제약:
- 제공된 자료에 없는 수치, 일정, 주장을 만들지 않습니다
- 자료의 내용을 임의로 생략하거나 바꾸지 않습니다
- 기술적 정확성을 유지하고, 분량보다 완전성과 품질을 우선합니다"#;

/// Build the system prompt shared by every section of one report run.
pub fn build_system_prompt(
    style: &StyleProfile,
    technical_terms: &[String],
    years: &YearContext,
    organization: Option<&str>,
) -> String {
    let mut prompt = String::from(ROLE_PROMPT);

    let endings = style.top_endings(MAX_SYSTEM_ENDINGS);
    if !endings.is_empty() {
        prompt.push_str(&format!(
            "\n- 참고 문서에서 확인된 개조식 종결어미: {}",
            endings.join(", ")
        ));
    }
    if let Some(&marker) = style.bullet_markers.first() {
        if marker != '*' && style.is_itemized_format {
            prompt.push_str(&format!(
                "\n- 참고 문서의 불릿 기호는 '{marker}'이나, 출력은 '*'로 통일합니다"
            ));
        }
    }

    prompt.push_str("\n\n");
    prompt.push_str(TERM_RULES);

    let terms: Vec<&str> = technical_terms
        .iter()
        .take(MAX_PROMPT_TERMS)
        .map(String::as_str)
        .collect();
    if !terms.is_empty() {
        prompt.push_str(&format!("\n\n보호 대상 기술 용어: {}", terms.join(", ")));
    }

    prompt.push_str("\n\n");
    prompt.push_str(FACT_RULES);
    if let Some(org) = organization.map(str::trim).filter(|o| !o.is_empty()) {
        prompt.push_str(&format!(
            "\n- {org}의 수행 내용과 관련 없는 내용은 결과에 포함하지 않습니다"
        ));
    }

    prompt.push_str("\n\n");
    prompt.push_str(&year_rules(years));
    prompt
}

fn year_rules(years: &YearContext) -> String {
    let cur = u32::from(years.current_year);
    let next = cur + 1;
    let far = cur + 2;

    let mut rules = format!(
        "연도별 내용 선별 규칙:

보고 대상 연도: {cur}차년도 (전체 사업 기간 {total}차년도)

1. {cur}차년도 내용은 포함합니다
2. {cur}차년도 이전(과거) 내용은 포함하지 않습니다
3. {next}차년도 내용은 목차에 다음 연도 계획 섹션(다음년도 수행계획, 차년도 계획, 내년 계획, {next}차년도 계획 등)이 있을 때 그 섹션에서만 사용하고, 그런 섹션이 없으면 사용하지 않습니다
4. {far}차년도 이후 내용은 포함하지 않습니다

판단 순서:
- 연도 Y < {cur} → 제외
- 연도 Y = {cur} → 포함
- 연도 Y = {next} → 현재 섹션이 다음 연도 계획 섹션일 때만 포함
- 연도 Y > {next} → 제외

현재 목차 상태:
- 다음 연도 계획 섹션: {has}",
        total = years.total_years,
        has = if years.has_next_year_section { "있음" } else { "없음" },
    );

    if !years.matching_sections.is_empty() {
        rules.push_str(&format!(
            "\n- 해당 섹션: {}",
            years.matching_sections.join(", ")
        ));
    }
    rules
}

/// Inputs for one section prompt.
pub struct SectionPrompt<'a> {
    pub section: &'a TocSection,
    pub source_content: &'a str,
    pub previous_sections: &'a [String],
    pub style: &'a StyleProfile,
    pub modification_request: Option<&'a str>,
    pub existing_content: Option<&'a str>,
}

fn truncate_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Build the user prompt for one section.
pub fn build_section_prompt(input: &SectionPrompt<'_>) -> String {
    let section = input.section;
    let mut prompt = format!(
        "다음 섹션을 작성하세요.\n\n섹션 번호: {}\n섹션 제목: {}\n섹션 레벨: {}\n",
        section.number, section.title, section.level
    );

    if let Some(words) = section.word_count {
        prompt.push_str(&format!("목표 분량: 약 {words} 단어\n"));
    }
    match section.emphasis {
        Emphasis::Brief => prompt.push_str("작성 방향: 핵심 사항만 간결하게 정리\n"),
        Emphasis::Detailed => prompt.push_str("작성 방향: 세부 내용과 근거를 충분히 상세하게 기술\n"),
        Emphasis::Standard => {}
    }

    prompt.push_str("\n소스 문서 내용:\n");
    let content = truncate_chars(input.source_content, MAX_SOURCE_CHARS);
    if content.trim().is_empty() {
        prompt.push_str("(이 섹션에 사용할 수 있는 소스 내용이 없음)\n");
    } else {
        prompt.push_str(content);
        prompt.push('\n');
    }

    let skip = input.previous_sections.len().saturating_sub(MAX_PREVIOUS_SECTIONS);
    let previous = &input.previous_sections[skip..];
    if !previous.is_empty() {
        prompt.push_str("\n앞 섹션 내용:\n");
        prompt.push_str(&previous.join("\n\n"));
        prompt.push('\n');
    }

    if let Some(existing) = input.existing_content.filter(|c| !c.trim().is_empty()) {
        prompt.push_str("\n기존 작성 내용 (참고):\n");
        prompt.push_str(truncate_chars(existing, MAX_EXISTING_CHARS));
        prompt.push('\n');
    }

    if let Some(request) = input.modification_request.filter(|r| !r.trim().is_empty()) {
        prompt.push_str(&format!("\n수정 요청: {}\n", request.trim()));
    }

    let endings = input.style.top_endings(MAX_SECTION_ENDINGS);
    let endings_note = if endings.is_empty() {
        String::new()
    } else {
        format!(" (참고 문서 예시: {})", endings.join(", "))
    };

    prompt.push_str(&format!(
        "
요구사항:
1. 개조식 문체로 작성하고, 각 항목은 불릿(*)으로 시작합니다
2. 각 항목은 개조식 종결어미(~임, ~함, ~됨, ~예정임, ~계획임 등)로 끝냅니다{endings_note}
3. 서술형 종결(~다, ~습니다, ~합니다)은 쓰지 않습니다
4. 소스 문서의 정보만 사용하고 새로운 사실을 만들지 않습니다
5. 기술 용어는 원문 그대로 유지합니다
6. 그림이 도움이 되는 위치에 이미지 추천을 넣습니다 (형식: {IMAGE_MARKER_FORMAT})
7. 섹션 제목은 다시 쓰지 말고 본문만 출력합니다

출력 예시:
* 첫 번째 항목을 개조식으로 작성함.
* 두 번째 항목의 추진 결과를 정리함.
* 다음 단계는 하반기에 착수할 예정임."
    ));

    prompt
}
