use std::sync::LazyLock;

use regex::Regex;

use crate::pipeline::generation::{render_report, GeneratedSection};

static SECTION_HEADER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d+(?:-\d+){0,2})\.(?:\s+(.*))?$").unwrap());

fn is_underline(line: &str) -> bool {
    let line = line.trim();
    !line.is_empty() && line.chars().all(|c| c == '=')
}

/// Split report text back into sections.
///
/// A header is a numbered line ("2-1. 제목") directly followed by an `=`
/// underline, so numbered lines inside a body stay in the body.
pub fn parse_report_sections(report: &str) -> Vec<GeneratedSection> {
    let lines: Vec<&str> = report.lines().collect();
    let mut sections: Vec<GeneratedSection> = Vec::new();
    let mut body: Vec<&str> = Vec::new();
    let mut i = 0;

    let flush = |sections: &mut Vec<GeneratedSection>, body: &mut Vec<&str>| {
        if let Some(last) = sections.last_mut() {
            last.content = body.join("\n").trim().to_string();
        }
        body.clear();
    };

    while i < lines.len() {
        let line = lines[i].trim();
        let underlined = lines.get(i + 1).is_some_and(|next| is_underline(next));

        if let (true, Some(caps)) = (underlined, SECTION_HEADER.captures(line)) {
            flush(&mut sections, &mut body);
            let number = caps[1].to_string();
            sections.push(GeneratedSection {
                level: number.split('-').count() as u8,
                number,
                title: caps
                    .get(2)
                    .map(|m| m.as_str().trim().to_string())
                    .unwrap_or_default(),
                content: String::new(),
            });
            i += 2;
            continue;
        }

        if !sections.is_empty() {
            body.push(lines[i].trim_end());
        }
        i += 1;
    }
    flush(&mut sections, &mut body);

    sections
}

/// Join sections back into report text.
pub fn combine_sections(sections: &[GeneratedSection]) -> String {
    render_report(sections)
}
