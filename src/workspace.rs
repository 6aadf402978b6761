//! Per-client workspace state.
//!
//! A workspace carries one report job: the analysed reference and source
//! documents, the table of contents, generation settings and the report
//! produced so far. Workspaces are held by [`WorkspaceManager`] behind
//! `Arc<Mutex<_>>`; long-running work copies what it needs out with a
//! [`GenerationSnapshot`] and writes results back afterwards.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, RwLock};

use chrono::{DateTime, Utc};
use serde::Serialize;
use sha2::{Digest, Sha256};
use thiserror::Error;
use uuid::Uuid;

use crate::pipeline::extraction::{
    extract_formatting_patterns, extract_technical_terms, merge_terms, ExtractedDocument,
    StyleProfile,
};
use crate::pipeline::generation::{
    render_report, resume_index, GeneratedSection, GenerationOutcome, GenerationProgress,
    GenerationSettings, StopReason,
};
use crate::toc::{TableOfContents, TocSection};

#[derive(Error, Debug)]
pub enum WorkspaceError {
    #[error("Workspace not found: {0}")]
    NotFound(Uuid),

    #[error("A report generation is already running in this workspace")]
    GenerationInProgress,

    #[error("A document is being indexed in this workspace")]
    IndexingInProgress,

    #[error("Workspace is not ready: {}", .0.join(", "))]
    NotReady(Vec<String>),

    #[error("No report has been generated yet")]
    NoReport,

    #[error("Internal lock error")]
    LockPoisoned,
}

// ═══════════════════════════════════════════════════════════
// Document analyses
// ═══════════════════════════════════════════════════════════

/// The reference document: whose style the report imitates.
#[derive(Debug, Clone, Serialize)]
pub struct ReferenceAnalysis {
    #[serde(skip)]
    pub text: String,
    pub page_count: usize,
    pub char_count: usize,
    pub style: StyleProfile,
    pub analyzed_at: DateTime<Utc>,
}

impl ReferenceAnalysis {
    pub fn from_document(doc: &ExtractedDocument) -> Self {
        Self {
            style: extract_formatting_patterns(&doc.full_text),
            text: doc.full_text.clone(),
            page_count: doc.page_count,
            char_count: doc.char_count(),
            analyzed_at: Utc::now(),
        }
    }

    pub fn technical_terms(&self) -> &[String] {
        &self.style.technical_terms
    }
}

/// The source document: where the report's facts come from.
#[derive(Debug, Clone, Serialize)]
pub struct SourceAnalysis {
    #[serde(skip)]
    pub text: String,
    /// SHA-256 of the extracted text, hex.
    pub fingerprint: String,
    pub page_count: usize,
    pub char_count: usize,
    pub technical_terms: Vec<String>,
    /// Chunks stored in the workspace's vector collection.
    pub chunk_count: usize,
    pub analyzed_at: DateTime<Utc>,
}

impl SourceAnalysis {
    pub fn from_document(doc: &ExtractedDocument, chunk_count: usize) -> Self {
        Self {
            fingerprint: fingerprint(&doc.full_text),
            technical_terms: extract_technical_terms(&doc.full_text),
            text: doc.full_text.clone(),
            page_count: doc.page_count,
            char_count: doc.char_count(),
            chunk_count,
            analyzed_at: Utc::now(),
        }
    }
}

pub fn fingerprint(text: &str) -> String {
    Sha256::digest(text.as_bytes())
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect()
}

// ═══════════════════════════════════════════════════════════
// Readiness
// ═══════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Readiness {
    pub reference_analyzed: bool,
    pub source_analyzed: bool,
    pub toc_ready: bool,
    pub vector_ready: bool,
    pub llm_configured: bool,
    pub is_ready: bool,
    /// Human-readable list of what is still missing.
    pub missing: Vec<String>,
}

impl Readiness {
    fn new(
        reference_analyzed: bool,
        source_analyzed: bool,
        toc_ready: bool,
        vector_ready: bool,
        llm_configured: bool,
    ) -> Self {
        let missing: Vec<String> = [
            (reference_analyzed, "reference document"),
            (source_analyzed, "source document"),
            (toc_ready, "table of contents"),
            (vector_ready, "vector index"),
            (llm_configured, "LLM client"),
        ]
        .iter()
        .filter(|(ok, _)| !ok)
        .map(|(_, what)| what.to_string())
        .collect();

        Self {
            reference_analyzed,
            source_analyzed,
            toc_ready,
            vector_ready,
            llm_configured,
            is_ready: missing.is_empty(),
            missing,
        }
    }
}

// ═══════════════════════════════════════════════════════════
// Workspace
// ═══════════════════════════════════════════════════════════

/// Owned copy of everything a generation run reads.
#[derive(Debug, Clone)]
pub struct GenerationSnapshot {
    pub collection: String,
    pub style: StyleProfile,
    pub technical_terms: Vec<String>,
    pub source_text: String,
    pub settings: GenerationSettings,
    /// TOC in document order.
    pub toc: Vec<TocSection>,
    pub sections: Vec<GeneratedSection>,
    pub start_index: usize,
}

#[derive(Debug, Clone)]
pub struct Workspace {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub reference: Option<ReferenceAnalysis>,
    pub source: Option<SourceAnalysis>,
    pub toc: TableOfContents,
    pub settings: GenerationSettings,
    pub sections: Vec<GeneratedSection>,
    pub progress: GenerationProgress,
    pub last_stop: Option<StopReason>,
    /// Set while an uploaded document is parsed and indexed.
    pub is_indexing: bool,
}

/// Serializable overview returned by the API.
#[derive(Debug, Clone, Serialize)]
pub struct WorkspaceSummary {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub reference: Option<ReferenceAnalysis>,
    pub source: Option<SourceAnalysis>,
    pub toc_sections: usize,
    pub settings: GenerationSettings,
    pub progress: GenerationProgress,
    pub last_stop: Option<StopReason>,
    pub is_indexing: bool,
}

impl Workspace {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            reference: None,
            source: None,
            toc: TableOfContents::new(),
            settings: GenerationSettings::default(),
            sections: Vec::new(),
            progress: GenerationProgress::default(),
            last_stop: None,
            is_indexing: false,
        }
    }

    /// Name of this workspace's vector collection.
    pub fn collection_name(&self) -> String {
        format!("ws_{}", self.id.simple())
    }

    pub fn summary(&self) -> WorkspaceSummary {
        WorkspaceSummary {
            id: self.id,
            created_at: self.created_at,
            reference: self.reference.clone(),
            source: self.source.clone(),
            toc_sections: self.toc.len(),
            settings: self.settings.clone(),
            progress: self.progress.clone(),
            last_stop: self.last_stop.clone(),
            is_indexing: self.is_indexing,
        }
    }

    /// Conflict while generating or indexing: documents, TOC and settings
    /// must not change then.
    pub fn ensure_idle(&self) -> Result<(), WorkspaceError> {
        if self.progress.is_generating {
            return Err(WorkspaceError::GenerationInProgress);
        }
        if self.is_indexing {
            return Err(WorkspaceError::IndexingInProgress);
        }
        Ok(())
    }

    /// Mark the workspace busy for a document upload.
    pub fn begin_indexing(&mut self) -> Result<(), WorkspaceError> {
        self.ensure_idle()?;
        self.is_indexing = true;
        Ok(())
    }

    pub fn end_indexing(&mut self) {
        self.is_indexing = false;
    }

    /// Every TOC section has generated content.
    pub fn is_report_complete(&self) -> bool {
        let toc = self.toc.ordered();
        !toc.is_empty() && resume_index(&toc, &self.sections) == toc.len()
    }

    pub fn readiness(&self, llm_configured: bool) -> Readiness {
        Readiness::new(
            self.reference.is_some(),
            self.source.is_some(),
            !self.toc.is_empty(),
            self.source.as_ref().is_some_and(|s| s.chunk_count > 0),
            llm_configured,
        )
    }

    /// Reference terms first, then source-only terms.
    pub fn technical_terms(&self) -> Vec<String> {
        let reference = self
            .reference
            .as_ref()
            .map(|r| r.technical_terms().to_vec())
            .unwrap_or_default();
        let source = self
            .source
            .as_ref()
            .map(|s| s.technical_terms.clone())
            .unwrap_or_default();
        merge_terms(&reference, &source)
    }

    /// Drop documents, TOC, report and progress. Settings are kept.
    pub fn reset(&mut self) {
        self.reference = None;
        self.source = None;
        self.toc.clear();
        self.clear_report();
    }

    pub fn clear_report(&mut self) {
        self.sections.clear();
        self.progress = GenerationProgress::default();
        self.last_stop = None;
    }

    /// Combined report text; `NoReport` when nothing has been generated.
    pub fn report_text(&self) -> Result<String, WorkspaceError> {
        if self.sections.is_empty() {
            return Err(WorkspaceError::NoReport);
        }
        Ok(render_report(&self.sections))
    }

    /// Snapshot inputs and mark the workspace busy.
    ///
    /// `restart` discards the current report and starts from the first
    /// section; otherwise the run resumes at the first TOC section without
    /// content. The TOC may have been edited since the last run.
    pub fn begin_generation(
        &mut self,
        restart: bool,
        llm_configured: bool,
    ) -> Result<GenerationSnapshot, WorkspaceError> {
        self.ensure_idle()?;
        let readiness = self.readiness(llm_configured);
        if !readiness.is_ready {
            return Err(WorkspaceError::NotReady(readiness.missing));
        }

        if restart {
            self.clear_report();
        }
        let toc = self.toc.ordered();
        self.progress.current_section_index = resume_index(&toc, &self.sections);
        self.progress.total_sections = toc.len();
        self.progress.is_generating = true;

        tracing::info!(
            workspace = %self.id,
            restart,
            start = self.progress.current_section_index,
            total = toc.len(),
            "Generation snapshot taken"
        );

        Ok(self.snapshot(toc))
    }

    /// Snapshot for refining an existing report. Marks the workspace busy.
    pub fn begin_refinement(
        &mut self,
        llm_configured: bool,
    ) -> Result<GenerationSnapshot, WorkspaceError> {
        self.ensure_idle()?;
        let readiness = self.readiness(llm_configured);
        if !readiness.is_ready {
            return Err(WorkspaceError::NotReady(readiness.missing));
        }
        self.progress.is_generating = true;
        Ok(self.snapshot(self.toc.ordered()))
    }

    fn snapshot(&self, toc: Vec<TocSection>) -> GenerationSnapshot {
        GenerationSnapshot {
            collection: self.collection_name(),
            style: self
                .reference
                .as_ref()
                .map(|r| r.style.clone())
                .unwrap_or_default(),
            technical_terms: self.technical_terms(),
            source_text: self
                .source
                .as_ref()
                .map(|s| s.text.clone())
                .unwrap_or_default(),
            settings: self.settings.clone(),
            toc,
            sections: self.sections.clone(),
            start_index: self.progress.current_section_index,
        }
    }

    /// Record a finished or paused run.
    pub fn apply_outcome(&mut self, outcome: &GenerationOutcome) {
        self.sections = outcome.sections.clone();
        self.sync_progress();
        self.progress.is_generating = false;
        self.last_stop = outcome.stop_reason.clone();
    }

    /// Replace the report after a refinement.
    pub fn apply_sections(&mut self, sections: Vec<GeneratedSection>) {
        self.sections = sections;
        self.sync_progress();
        self.progress.is_generating = false;
    }

    fn sync_progress(&mut self) {
        let toc = self.toc.ordered();
        self.progress.current_section_index = resume_index(&toc, &self.sections);
        self.progress.completed_sections = self.sections.iter().map(|s| s.number.clone()).collect();
        self.progress.total_sections = toc.len();
    }

    /// Clear the busy flag after a failed run.
    pub fn end_generation(&mut self) {
        self.progress.is_generating = false;
    }
}

impl Default for Workspace {
    fn default() -> Self {
        Self::new()
    }
}

// ═══════════════════════════════════════════════════════════
// WorkspaceManager
// ═══════════════════════════════════════════════════════════

pub type SharedWorkspace = Arc<Mutex<Workspace>>;

#[derive(Default)]
pub struct WorkspaceManager {
    workspaces: RwLock<HashMap<Uuid, SharedWorkspace>>,
}

impl WorkspaceManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create(&self) -> Result<SharedWorkspace, WorkspaceError> {
        let workspace = Workspace::new();
        let id = workspace.id;
        let shared = Arc::new(Mutex::new(workspace));
        self.workspaces
            .write()
            .map_err(|_| WorkspaceError::LockPoisoned)?
            .insert(id, shared.clone());
        tracing::info!(workspace = %id, "Workspace created");
        Ok(shared)
    }

    pub fn get(&self, id: Uuid) -> Result<SharedWorkspace, WorkspaceError> {
        self.workspaces
            .read()
            .map_err(|_| WorkspaceError::LockPoisoned)?
            .get(&id)
            .cloned()
            .ok_or(WorkspaceError::NotFound(id))
    }

    /// Remove a workspace, returning it so the caller can drop its collection.
    pub fn delete(&self, id: Uuid) -> Result<SharedWorkspace, WorkspaceError> {
        let removed = self
            .workspaces
            .write()
            .map_err(|_| WorkspaceError::LockPoisoned)?
            .remove(&id)
            .ok_or(WorkspaceError::NotFound(id))?;
        tracing::info!(workspace = %id, "Workspace deleted");
        Ok(removed)
    }

    pub fn len(&self) -> usize {
        self.workspaces.read().map(|w| w.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Lock a shared workspace.
pub fn lock(workspace: &SharedWorkspace) -> Result<MutexGuard<'_, Workspace>, WorkspaceError> {
    workspace.lock().map_err(|_| WorkspaceError::LockPoisoned)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::extraction::PageExtraction;

    fn document(text: &str) -> ExtractedDocument {
        ExtractedDocument::from_pages(vec![PageExtraction {
            page_number: 1,
            text: text.to_string(),
        }])
    }

    fn ready_workspace() -> Workspace {
        let mut ws = Workspace::new();
        ws.reference = Some(ReferenceAnalysis::from_document(&document(
            "1. 개요\n* IHO 표준을 검토함.",
        )));
        ws.source = Some(SourceAnalysis::from_document(
            &document("S-100 기반 데이터 모델을 구현함."),
            3,
        ));
        ws.toc.add_section(1, None).unwrap();
        ws
    }

    fn outcome(numbers: &[&str], total: usize, stop: Option<StopReason>) -> GenerationOutcome {
        let sections: Vec<GeneratedSection> = numbers
            .iter()
            .map(|n| GeneratedSection {
                number: n.to_string(),
                title: format!("제목 {n}"),
                level: 1,
                content: "* 내용임.".into(),
            })
            .collect();
        GenerationOutcome {
            completed: sections.len(),
            is_complete: sections.len() == total,
            sections,
            total,
            stop_reason: stop,
            total_tokens: 10,
        }
    }

    #[test]
    fn fingerprint_is_sha256_hex() {
        assert_eq!(
            fingerprint("abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn new_workspace_is_not_ready() {
        let ws = Workspace::new();
        let readiness = ws.readiness(true);
        assert!(!readiness.is_ready);
        assert_eq!(
            readiness.missing,
            vec!["reference document", "source document", "table of contents", "vector index"]
        );
    }

    #[test]
    fn ready_workspace_needs_llm() {
        let ws = ready_workspace();
        assert!(ws.readiness(true).is_ready);
        assert_eq!(ws.readiness(false).missing, vec!["LLM client"]);
    }

    #[test]
    fn terms_merge_reference_and_source() {
        let ws = ready_workspace();
        let terms = ws.technical_terms();
        assert!(terms.contains(&"IHO".to_string()));
        assert!(terms.contains(&"S-100".to_string()));
    }

    #[test]
    fn begin_generation_marks_busy() {
        let mut ws = ready_workspace();
        let snapshot = ws.begin_generation(true, true).unwrap();
        assert_eq!(snapshot.toc.len(), 1);
        assert_eq!(snapshot.start_index, 0);
        assert!(ws.progress.is_generating);
        assert!(matches!(
            ws.begin_generation(false, true),
            Err(WorkspaceError::GenerationInProgress)
        ));
        ws.end_generation();
        assert!(!ws.progress.is_generating);
    }

    #[test]
    fn not_ready_lists_missing_parts() {
        let mut ws = Workspace::new();
        match ws.begin_generation(true, false) {
            Err(WorkspaceError::NotReady(missing)) => assert_eq!(missing.len(), 5),
            other => panic!("expected NotReady, got {other:?}"),
        }
        assert!(!ws.progress.is_generating);
    }

    #[test]
    fn paused_outcome_resumes_from_completed() {
        let mut ws = ready_workspace();
        ws.toc.add_section(1, None).unwrap();
        ws.toc.add_section(1, None).unwrap();
        ws.begin_generation(true, true).unwrap();
        ws.apply_outcome(&outcome(
            &["1"],
            3,
            Some(StopReason::TokenLimit { tokens: 10, limit: 5 }),
        ));

        assert!(!ws.progress.is_generating);
        assert_eq!(ws.progress.current_section_index, 1);
        assert_eq!(ws.progress.completed_sections, vec!["1"]);
        assert!(ws.last_stop.is_some());

        let snapshot = ws.begin_generation(false, true).unwrap();
        assert_eq!(snapshot.start_index, 1);
        assert_eq!(snapshot.sections.len(), 1);
    }

    #[test]
    fn resume_after_toc_edit_restarts_at_first_gap() {
        let mut ws = ready_workspace();
        ws.toc.add_section(1, None).unwrap();
        ws.toc.add_section(1, None).unwrap();
        ws.begin_generation(true, true).unwrap();
        ws.apply_outcome(&outcome(
            &["1"],
            3,
            Some(StopReason::SectionFailed {
                number: "2".into(),
                message: "rate limited".into(),
            }),
        ));
        assert_eq!(ws.progress.current_section_index, 1);

        ws.toc.delete_section(0).unwrap();
        let snapshot = ws.begin_generation(false, true).unwrap();
        assert_eq!(snapshot.start_index, 0);
        assert_eq!(snapshot.toc.len(), 2);
        assert_eq!(ws.progress.total_sections, 2);
        assert!(!ws.is_report_complete());
    }

    #[test]
    fn indexing_blocks_generation_and_edits() {
        let mut ws = ready_workspace();
        ws.begin_indexing().unwrap();

        assert!(matches!(
            ws.begin_generation(true, true),
            Err(WorkspaceError::IndexingInProgress)
        ));
        assert!(matches!(
            ws.begin_refinement(true),
            Err(WorkspaceError::IndexingInProgress)
        ));
        assert!(matches!(ws.begin_indexing(), Err(WorkspaceError::IndexingInProgress)));
        assert!(ws.summary().is_indexing);

        ws.end_indexing();
        assert!(ws.ensure_idle().is_ok());
        ws.begin_generation(true, true).unwrap();
        assert!(matches!(ws.begin_indexing(), Err(WorkspaceError::GenerationInProgress)));
    }

    #[test]
    fn applied_sections_update_progress() {
        let mut ws = ready_workspace();
        ws.toc.add_section(1, None).unwrap();
        ws.apply_outcome(&outcome(&["1", "2"], 2, None));
        assert!(ws.is_report_complete());

        ws.begin_refinement(true).unwrap();
        ws.apply_sections(vec![GeneratedSection {
            number: "1".into(),
            title: "제목 1".into(),
            level: 1,
            content: "* 편집된 내용임.".into(),
        }]);
        assert!(!ws.progress.is_generating);
        assert_eq!(ws.progress.current_section_index, 1);
        assert_eq!(ws.progress.completed_sections, vec!["1"]);
        assert_eq!(ws.progress.total_sections, 2);
        assert!(!ws.is_report_complete());
    }

    #[test]
    fn restart_discards_report() {
        let mut ws = ready_workspace();
        ws.apply_outcome(&outcome(&["1"], 1, None));
        let snapshot = ws.begin_generation(true, true).unwrap();
        assert!(snapshot.sections.is_empty());
        assert_eq!(snapshot.start_index, 0);
    }

    #[test]
    fn reset_keeps_settings() {
        let mut ws = ready_workspace();
        ws.settings.current_year = 3;
        ws.apply_outcome(&outcome(&["1"], 1, None));
        ws.reset();

        assert!(ws.reference.is_none());
        assert!(ws.source.is_none());
        assert!(ws.toc.is_empty());
        assert!(ws.sections.is_empty());
        assert_eq!(ws.settings.current_year, 3);
        assert!(matches!(ws.report_text(), Err(WorkspaceError::NoReport)));
    }

    #[test]
    fn report_text_renders_sections() {
        let mut ws = ready_workspace();
        ws.apply_outcome(&outcome(&["1"], 1, None));
        let text = ws.report_text().unwrap();
        assert!(text.starts_with("1. 제목 1\n"));
    }

    #[test]
    fn collection_name_is_stable() {
        let ws = Workspace::new();
        assert_eq!(ws.collection_name(), ws.collection_name());
        assert!(ws.collection_name().starts_with("ws_"));
    }

    #[test]
    fn manager_create_get_delete() {
        let manager = WorkspaceManager::new();
        let shared = manager.create().unwrap();
        let id = lock(&shared).unwrap().id;

        assert_eq!(manager.len(), 1);
        assert!(manager.get(id).is_ok());
        manager.delete(id).unwrap();
        assert!(matches!(manager.get(id), Err(WorkspaceError::NotFound(_))));
        assert!(matches!(manager.delete(id), Err(WorkspaceError::NotFound(_))));
        assert!(manager.is_empty());
    }
}
