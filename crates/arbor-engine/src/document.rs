//! Per-document delta computation
//!
//! The builder never touches the cache: it compares a fresh extraction with
//! the state it is given and hands back both the delta and the state to
//! remember next time. Committing that state is the caller's job.

use std::collections::HashSet;

use arbor_core::{
    ArtifactDelta, ArtifactId, Category, DocumentState, EventType, SemanticInfo, SourceDocument,
    UpdatePolicy, WorkingSet,
};
use arbor_indexer::{ArtifactExtractor, ExtractError, Extraction};

/// Delta for one document plus the state that replaces its cache entry.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DocumentDelta {
    pub delta: ArtifactDelta,
    pub state: DocumentState,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DocumentOutcome {
    /// Nothing extractable. Callers keep the previous state untouched.
    EmptyInput,
    Delta(DocumentDelta),
}

/// Extract `document` and classify every artifact against `previous`.
///
/// Previously seen ids that are not extracted again come back as deletion
/// tombstones. If an id is extracted twice, its first occurrence decides the
/// reported event.
pub fn build_document_delta(
    extractor: &dyn ArtifactExtractor,
    document: &SourceDocument,
    semantic: Option<&SemanticInfo>,
    previous: &DocumentState,
    policy: UpdatePolicy,
) -> Result<DocumentOutcome, ExtractError> {
    let semantic = semantic.ok_or(ExtractError::MissingSemanticInfo)?;
    let artifacts = match extractor.extract(document, semantic)? {
        Extraction::Empty => {
            tracing::debug!("No top-level content in {}", document.id);
            return Ok(DocumentOutcome::EmptyInput);
        }
        Extraction::Artifacts(artifacts) => artifacts,
    };

    let mut working = WorkingSet::from_previous(&previous.ids);
    let mut delta = ArtifactDelta::new();
    let mut state = DocumentState::new();
    let mut seen: HashSet<(Category, ArtifactId)> = HashSet::new();

    for artifact in artifacts {
        // extractors only hand out artifacts with a payload
        let Some(category) = artifact.category() else {
            continue;
        };
        let event = working.classify(category, &artifact.id);
        state.record(category, &artifact);

        if !seen.insert((category, artifact.id.clone())) {
            continue;
        }
        let unchanged = event == EventType::Updates
            && policy == UpdatePolicy::Changed
            && previous.fingerprint(category, &artifact.id) == Some(artifact.fingerprint());
        if !unchanged {
            delta.insert(category, event, artifact);
        }
    }

    for (category, tombstone) in working.into_deletions() {
        if !seen.contains(&(category, tombstone.id.clone())) {
            delta.insert(category, EventType::Deletions, tombstone);
        }
    }

    tracing::debug!(
        "{}: {} additions, {} updates, {} deletions",
        document.id,
        delta.count(EventType::Additions),
        delta.count(EventType::Updates),
        delta.count(EventType::Deletions)
    );

    Ok(DocumentOutcome::Delta(DocumentDelta { delta, state }))
}
