use std::collections::HashMap;

use crate::pipeline::extraction::StyleProfile;
use crate::pipeline::llm::{LlmClient, LlmRequest};
use crate::pipeline::storage::{EmbeddingModel, VectorSearch};
use crate::toc::TocSection;

use super::prompt::{build_section_prompt, build_system_prompt, SectionPrompt, MAX_PREVIOUS_SECTIONS};
use super::tokens::{count_tokens, token_budget};
use super::types::{
    render_report, GeneratedSection, GenerationOutcome, GenerationSettings, StopReason,
    YearContext,
};
use super::year_filter::filter_content_by_year;
use super::GenerationError;

/// Chunks retrieved per section.
pub const SECTION_TOP_K: usize = 3;
/// Chunks retrieved when refining a section against a request.
pub const REFINE_TOP_K: usize = 5;

/// Everything a report run reads from the workspace.
pub struct ReportInputs<'a> {
    pub style: &'a StyleProfile,
    pub technical_terms: &'a [String],
    pub source_text: &'a str,
    pub settings: &'a GenerationSettings,
    pub max_token_limit: usize,
}

/// A modification request applied while (re)generating a section.
#[derive(Debug, Clone, Copy)]
pub struct SectionRefinement<'a> {
    pub request: &'a str,
    /// Current section body. When present the section is rewritten against
    /// it and retrieval widens to the request text.
    pub existing_content: Option<&'a str>,
}

/// Report generation orchestrator.
///
/// Per section: retrieve → year filter → build prompts → generate.
pub struct ReportGenerator<'a> {
    llm: &'a dyn LlmClient,
    embedder: &'a dyn EmbeddingModel,
    index: &'a dyn VectorSearch,
    inputs: ReportInputs<'a>,
    years: YearContext,
}

impl<'a> ReportGenerator<'a> {
    /// `toc` is the full table of contents; it decides the next-year rules.
    pub fn new(
        llm: &'a dyn LlmClient,
        embedder: &'a dyn EmbeddingModel,
        index: &'a dyn VectorSearch,
        inputs: ReportInputs<'a>,
        toc: &[TocSection],
    ) -> Self {
        let years = YearContext::new(inputs.settings, toc);
        Self {
            llm,
            embedder,
            index,
            inputs,
            years,
        }
    }

    pub fn years(&self) -> &YearContext {
        &self.years
    }

    /// Source text relevant to `query`: the best `top_k` chunks joined by
    /// blank lines, or the whole source when nothing is retrieved.
    pub fn retrieve(&self, query: &str, top_k: usize) -> Result<String, GenerationError> {
        let query_embedding = self.embedder.embed(query)?;
        let chunks = self.index.search(&query_embedding, top_k)?;

        if chunks.is_empty() {
            tracing::debug!(query, "No chunks retrieved, using full source text");
            return Ok(self.inputs.source_text.to_string());
        }

        Ok(chunks
            .iter()
            .map(|c| c.content.as_str())
            .collect::<Vec<_>>()
            .join("\n\n"))
    }

    /// Generate one section.
    pub fn generate_section(
        &self,
        section: &TocSection,
        previous_sections: &[String],
        refinement: Option<SectionRefinement<'_>>,
    ) -> Result<GeneratedSection, GenerationError> {
        // Step 1: Retrieve
        let existing_content = refinement.and_then(|r| r.existing_content);
        let (query, top_k) = match (refinement, existing_content) {
            (Some(r), Some(_)) => (
                format!("{} {} {}", section.number, section.title, r.request),
                REFINE_TOP_K,
            ),
            _ => (format!("{} {}", section.number, section.title), SECTION_TOP_K),
        };
        let retrieved = self.retrieve(&query, top_k)?;

        // Step 2: Year filter
        let content = if self.inputs.settings.year_filter {
            filter_content_by_year(&retrieved, &section.title, &self.years)
        } else {
            retrieved
        };

        // Step 3: Prompts, with next-year titles scoped to this section
        let section_years = self.years.for_section(&section.title);
        let system = build_system_prompt(
            self.inputs.style,
            self.inputs.technical_terms,
            &section_years,
            self.inputs.settings.organization.as_deref(),
        );
        let prompt = build_section_prompt(&SectionPrompt {
            section,
            source_content: &content,
            previous_sections,
            style: self.inputs.style,
            modification_request: refinement.map(|r| r.request),
            existing_content,
        });

        // Step 4: Generate
        let output = self.llm.generate(&LlmRequest::new(system, prompt))?;

        tracing::info!(
            section = %section.number,
            retrieved_chars = content.chars().count(),
            output_chars = output.chars().count(),
            "Section generated"
        );

        Ok(GeneratedSection {
            number: section.number.clone(),
            title: section.title.clone(),
            level: section.level,
            content: output.trim().to_string(),
        })
    }

    /// Generate the sections of `toc` that `existing` does not cover yet,
    /// scanning from `start_index`.
    ///
    /// Sections are matched by number: entries of `existing` whose number is
    /// no longer in `toc` are dropped, and the result is kept in `toc` order.
    /// Stops early, incomplete, when the accumulated output passes 90% of
    /// the token ceiling or a section fails. Call again with the returned
    /// sections and [`resume_index`] to resume.
    pub fn generate_full_report(
        &self,
        toc: &[TocSection],
        start_index: usize,
        existing: Vec<GeneratedSection>,
        request: Option<&str>,
    ) -> Result<GenerationOutcome, GenerationError> {
        if toc.is_empty() {
            return Err(GenerationError::EmptyToc);
        }
        if start_index > toc.len() {
            return Err(GenerationError::InvalidStartIndex {
                start: start_index,
                total: toc.len(),
            });
        }

        let position: HashMap<&str, usize> = toc
            .iter()
            .enumerate()
            .map(|(i, s)| (s.number.as_str(), i))
            .collect();
        let pos = |number: &str| position.get(number).copied().unwrap_or(usize::MAX);

        let given = existing.len();
        let mut sections: Vec<GeneratedSection> = existing
            .into_iter()
            .filter(|s| position.contains_key(s.number.as_str()))
            .collect();
        sections.sort_by_key(|s| pos(&s.number));
        sections.dedup_by(|a, b| a.number == b.number);
        if sections.len() < given {
            tracing::info!(
                dropped = given - sections.len(),
                "Dropped sections missing from the table of contents"
            );
        }

        let budget = token_budget(self.inputs.max_token_limit);
        let mut total_tokens = if sections.is_empty() {
            0
        } else {
            count_tokens(&render_report(&sections))
        };
        let mut stop_reason = None;

        tracing::info!(
            total = toc.len(),
            start = start_index,
            done = sections.len(),
            tokens = total_tokens,
            "Report generation started"
        );

        for (index, section) in toc.iter().enumerate().skip(start_index) {
            if sections.iter().any(|s| s.number == section.number) {
                continue;
            }
            if total_tokens > budget {
                tracing::warn!(tokens = total_tokens, budget, "Token budget reached, pausing");
                stop_reason = Some(StopReason::TokenLimit {
                    tokens: total_tokens,
                    limit: self.inputs.max_token_limit,
                });
                break;
            }

            let insert_at = sections.partition_point(|s| pos(&s.number) < index);
            let previous: Vec<String> = sections[insert_at.saturating_sub(MAX_PREVIOUS_SECTIONS)..insert_at]
                .iter()
                .map(GeneratedSection::as_context)
                .collect();

            let refinement = request.map(|r| SectionRefinement {
                request: r,
                existing_content: None,
            });
            let generated = match self.generate_section(section, &previous, refinement) {
                Ok(generated) => generated,
                Err(e) => {
                    tracing::warn!(section = %section.number, error = %e, "Section failed, pausing");
                    stop_reason = Some(StopReason::SectionFailed {
                        number: section.number.clone(),
                        message: e.to_string(),
                    });
                    break;
                }
            };

            total_tokens += count_tokens(&generated.as_context());
            sections.insert(insert_at, generated);
        }

        let completed = sections.len();
        let is_complete = completed >= toc.len();
        tracing::info!(completed, total = toc.len(), is_complete, "Report generation finished");

        Ok(GenerationOutcome {
            sections,
            completed,
            total: toc.len(),
            is_complete,
            stop_reason,
            total_tokens,
        })
    }
}

/// Position of the first `toc` entry without a generated section.
pub fn resume_index(toc: &[TocSection], sections: &[GeneratedSection]) -> usize {
    toc.iter()
        .position(|entry| !sections.iter().any(|s| s.number == entry.number))
        .unwrap_or(toc.len())
}
