use serde::Serialize;

use crate::pipeline::generation::{
    GeneratedSection, GenerationOutcome, ReportGenerator, SectionRefinement,
    MAX_PREVIOUS_SECTIONS,
};
use crate::toc::{Emphasis, TocSection};

use super::request::{analyze_modification_request, ModificationRequest};
use super::RefinementError;

#[derive(Debug, Clone, Serialize)]
pub struct RefinementOutcome {
    pub request: ModificationRequest,
    pub sections: Vec<GeneratedSection>,
    /// Numbers of the sections that were rewritten.
    pub refined: Vec<String>,
    /// Set when the whole report was regenerated.
    pub regeneration: Option<GenerationOutcome>,
}

/// TOC entry for a report section, falling back to the section itself.
fn toc_entry(toc: &[TocSection], section: &GeneratedSection) -> TocSection {
    toc.iter()
        .find(|s| s.number == section.number)
        .cloned()
        .unwrap_or_else(|| TocSection {
            number: section.number.clone(),
            title: section.title.clone(),
            level: section.level,
            word_count: None,
            emphasis: Emphasis::Standard,
        })
}

/// Sections whose titles the request mentions; every section when none are named.
fn mentioned_sections(sections: &[GeneratedSection], request: &str) -> Vec<usize> {
    let named: Vec<usize> = sections
        .iter()
        .enumerate()
        .filter(|(_, s)| {
            let title = s.title.trim();
            !title.is_empty() && request.contains(title)
        })
        .map(|(i, _)| i)
        .collect();

    if named.is_empty() {
        (0..sections.len()).collect()
    } else {
        named
    }
}

fn rewrite_section(
    generator: &ReportGenerator<'_>,
    toc: &[TocSection],
    sections: &[GeneratedSection],
    index: usize,
    request: &str,
) -> Result<GeneratedSection, RefinementError> {
    let current = &sections[index];
    let entry = toc_entry(toc, current);
    let previous: Vec<String> = sections[index.saturating_sub(MAX_PREVIOUS_SECTIONS)..index]
        .iter()
        .map(GeneratedSection::as_context)
        .collect();

    let refined = generator.generate_section(
        &entry,
        &previous,
        Some(SectionRefinement {
            request,
            existing_content: Some(&current.content),
        }),
    )?;
    Ok(refined)
}

/// Apply a free-form modification request to a generated report.
///
/// A named section is rewritten alone. Add-content and general requests
/// rewrite the sections whose titles they mention, or all of them. A
/// regenerate request runs the whole report again with the request in
/// every section prompt.
pub fn refine_report_with_request(
    generator: &ReportGenerator<'_>,
    toc: &[TocSection],
    sections: &[GeneratedSection],
    request: &str,
) -> Result<RefinementOutcome, RefinementError> {
    let request = request.trim();
    if request.is_empty() {
        return Err(RefinementError::EmptyRequest);
    }

    let kind = analyze_modification_request(request);
    tracing::info!(kind = ?kind, sections = sections.len(), "Refining report");

    if kind == ModificationRequest::RegenerateAll {
        let outcome = generator.generate_full_report(toc, 0, Vec::new(), Some(request))?;
        return Ok(RefinementOutcome {
            request: kind,
            sections: outcome.sections.clone(),
            refined: outcome.sections.iter().map(|s| s.number.clone()).collect(),
            regeneration: Some(outcome),
        });
    }

    if sections.is_empty() {
        return Err(RefinementError::EmptyReport);
    }

    let targets = match &kind {
        ModificationRequest::SpecificSection(number) => {
            let index = sections
                .iter()
                .position(|s| &s.number == number)
                .ok_or_else(|| RefinementError::SectionNotFound(number.clone()))?;
            vec![index]
        }
        _ => mentioned_sections(sections, request),
    };

    let mut updated = sections.to_vec();
    let mut refined = Vec::with_capacity(targets.len());
    for index in targets {
        let rewritten = rewrite_section(generator, toc, &updated, index, request)?;
        refined.push(rewritten.number.clone());
        updated[index] = rewritten;
    }

    Ok(RefinementOutcome {
        request: kind,
        sections: updated,
        refined,
        regeneration: None,
    })
}
