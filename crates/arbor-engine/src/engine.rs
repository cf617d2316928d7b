//! Project-level recompute and full rescan

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;

use arbor_core::{
    Artifact, ArtifactDelta, ArtifactIndex, ArtifactsCache, DocumentId, DocumentState, EventType,
    Project, ProjectDocument, ProjectId, ProjectSnapshot, SemanticInfo, SourceDocument,
    UpdatePolicy,
};
use arbor_indexer::{ArtifactExtractor, ExtractError, Extraction, ParserPool, RustExtractor};
use dashmap::DashMap;
use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::config::EngineConfig;
use crate::document::{build_document_delta, DocumentDelta, DocumentOutcome};
use crate::error::{EngineError, Result};

/// A document whose extraction failed during a project pass.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentFailure {
    pub document: DocumentId,
    pub error: ExtractError,
}

/// Combined delta of a project pass.
///
/// Failed documents contribute nothing and keep their cached state.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProjectDelta {
    pub delta: ArtifactDelta,
    pub failures: Vec<DocumentFailure>,
}

impl ProjectDelta {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Result of a full rescan.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProjectIndex {
    pub index: ArtifactIndex,
    pub failures: Vec<DocumentFailure>,
}

/// Shared flag to abandon a running project pass.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

enum Pass<T> {
    Done(T),
    Failed(ExtractError),
    Skipped,
}

/// Computes artifact deltas and keeps the cache they are based on.
pub struct DesignEngine {
    extractor: Arc<dyn ArtifactExtractor>,
    cache: Arc<ArtifactsCache>,
    pool: rayon::ThreadPool,
    project_locks: DashMap<ProjectId, Arc<Mutex<()>>>,
    policy: UpdatePolicy,
}

impl DesignEngine {
    pub fn new(
        extractor: Arc<dyn ArtifactExtractor>,
        cache: Arc<ArtifactsCache>,
        config: &EngineConfig,
    ) -> Result<Self> {
        let workers = config.worker_count();
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("arbor-worker-{}", i))
            .build()?;
        debug!(
            "Engine started with {} workers, update policy {:?}",
            workers, config.update_policy
        );

        Ok(Self {
            extractor,
            cache,
            pool,
            project_locks: DashMap::new(),
            policy: config.update_policy,
        })
    }

    /// Engine backed by the tree-sitter Rust extractor and a fresh cache.
    pub fn with_rust_extractor(config: &EngineConfig) -> Result<Self> {
        let parsers = ParserPool::new(config.parser_worker_count());
        let extractor = RustExtractor::new(parsers, config.rules.clone());
        Self::new(Arc::new(extractor), Arc::new(ArtifactsCache::new()), config)
    }

    pub fn cache(&self) -> &Arc<ArtifactsCache> {
        &self.cache
    }

    fn project_lock(&self, project: &ProjectId) -> Arc<Mutex<()>> {
        Arc::clone(self.project_locks.entry(project.clone()).or_default().value())
    }

    /// Drop the cached state and lock of a project.
    ///
    /// Waits for a running pass on the project to finish. The next pass
    /// starts from an empty cache and reports everything as additions.
    pub fn forget_project(&self, project: &ProjectId) -> bool {
        let lock = self.project_lock(project);
        let removed = {
            let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);
            self.cache.remove_project(project)
        };
        drop(lock);

        // a pass that queued up meanwhile still holds a clone
        self.project_locks
            .remove_if(project, |_, lock| Arc::strong_count(lock) == 1);
        debug!("Forgot project {} (cached: {})", project, removed);
        removed
    }

    /// Recompute a single document against its cached state.
    ///
    /// Empty input yields an empty delta and leaves the cache as it was.
    pub fn artifact_changes(
        &self,
        project: &ProjectId,
        document: &SourceDocument,
        semantic: Option<&SemanticInfo>,
    ) -> Result<ArtifactDelta> {
        let lock = self.project_lock(project);
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);

        let previous = self.cache.get(project, &document.id);
        let outcome = build_document_delta(
            self.extractor.as_ref(),
            document,
            semantic,
            &previous,
            self.policy,
        )
        .map_err(|source| EngineError::Extraction {
            document: document.id.clone(),
            source,
        })?;

        match outcome {
            DocumentOutcome::EmptyInput => Ok(ArtifactDelta::new()),
            DocumentOutcome::Delta(DocumentDelta { delta, state }) => {
                self.cache.put(project, document.id.clone(), state);
                Ok(delta)
            }
        }
    }

    /// Recompute every document of `project` and publish the new state.
    pub fn project_artifact_changes(&self, project: &Project) -> ProjectDelta {
        // a fresh token is never cancelled
        self.recompute(project, &CancelToken::new())
            .unwrap_or_default()
    }

    /// Like [`project_artifact_changes`](Self::project_artifact_changes), but
    /// gives up without touching the cache once `cancel` is set.
    pub fn project_artifact_changes_with(
        &self,
        project: &Project,
        cancel: &CancelToken,
    ) -> Result<ProjectDelta> {
        self.recompute(project, cancel)
            .ok_or_else(|| EngineError::Cancelled {
                project: project.id.clone(),
            })
    }

    fn recompute(&self, project: &Project, cancel: &CancelToken) -> Option<ProjectDelta> {
        let started = Instant::now();
        let lock = self.project_lock(&project.id);
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);

        let snapshot = self.cache.get_project(&project.id);
        let results: Vec<(DocumentId, Pass<DocumentOutcome>)> = self.pool.install(|| {
            project
                .documents
                .par_iter()
                .map(|document| {
                    if cancel.is_cancelled() {
                        return (document.id().clone(), Pass::Skipped);
                    }
                    let previous = snapshot.get(document.id()).cloned().unwrap_or_default();
                    let pass = match build_document_delta(
                        self.extractor.as_ref(),
                        &document.source,
                        document.semantic.as_ref(),
                        &previous,
                        self.policy,
                    ) {
                        Ok(outcome) => Pass::Done(outcome),
                        Err(error) => Pass::Failed(error),
                    };
                    (document.id().clone(), pass)
                })
                .collect()
        });
        if cancel.is_cancelled() {
            info!("Recompute of project {} cancelled", project.id);
            return None;
        }

        let mut result = ProjectDelta::default();
        let mut next = ProjectSnapshot::new();
        for (document, pass) in results {
            match pass {
                Pass::Done(DocumentOutcome::Delta(DocumentDelta { delta, state })) => {
                    result.delta.merge(delta);
                    next.insert(document, state);
                }
                Pass::Done(DocumentOutcome::EmptyInput) | Pass::Skipped => {
                    carry_forward(&snapshot, &mut next, document);
                }
                Pass::Failed(error) => {
                    warn!("Skipping {}: {}", document, error);
                    carry_forward(&snapshot, &mut next, document.clone());
                    result.failures.push(DocumentFailure { document, error });
                }
            }
        }

        let present: HashSet<&DocumentId> =
            project.documents.iter().map(ProjectDocument::id).collect();
        for (document, state) in snapshot.iter() {
            if present.contains(document) {
                continue;
            }
            debug!("{} left project {}, deleting {} artifacts", document, project.id, state.len());
            for (category, ids) in &state.ids {
                for id in ids {
                    result
                        .delta
                        .insert(*category, EventType::Deletions, Artifact::tombstone(id.clone()));
                }
            }
        }

        self.cache.initialize_project(&project.id, next);
        debug!(
            "Changed categories of {}: {:?}",
            project.id,
            result.delta.categories().collect::<Vec<_>>()
        );
        info!(
            "Recomputed {} documents of {} in {:?}: {} additions, {} updates, {} deletions, {} failures",
            project.documents.len(),
            project.id,
            started.elapsed(),
            result.delta.count(EventType::Additions),
            result.delta.count(EventType::Updates),
            result.delta.count(EventType::Deletions),
            result.failures.len()
        );
        Some(result)
    }

    /// Extract every document from scratch and reseed the cache.
    ///
    /// Cached state is ignored, except that documents which fail or have no
    /// extractable content keep their previous entry.
    pub fn index_project(&self, project: &Project) -> ProjectIndex {
        let started = Instant::now();
        let lock = self.project_lock(&project.id);
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);

        let snapshot = self.cache.get_project(&project.id);
        let results: Vec<(DocumentId, Pass<Extraction>)> = self.pool.install(|| {
            project
                .documents
                .par_iter()
                .map(|document| (document.id().clone(), self.extract(document)))
                .collect()
        });

        let mut result = ProjectIndex::default();
        let mut next = ProjectSnapshot::new();
        for (document, pass) in results {
            match pass {
                Pass::Done(Extraction::Artifacts(artifacts)) => {
                    let mut state = DocumentState::new();
                    for artifact in artifacts {
                        let Some(category) = artifact.category() else {
                            continue;
                        };
                        state.record(category, &artifact);
                        if result.index.get(category, &artifact.id).is_none() {
                            result.index.insert(category, artifact);
                        }
                    }
                    next.insert(document, state);
                }
                Pass::Done(Extraction::Empty) | Pass::Skipped => {
                    carry_forward(&snapshot, &mut next, document);
                }
                Pass::Failed(error) => {
                    warn!("Skipping {}: {}", document, error);
                    carry_forward(&snapshot, &mut next, document.clone());
                    result.failures.push(DocumentFailure { document, error });
                }
            }
        }

        self.cache.initialize_project(&project.id, next);
        info!(
            "Indexed {} documents of {} in {:?}: {} artifacts, {} failures",
            project.documents.len(),
            project.id,
            started.elapsed(),
            result.index.len(),
            result.failures.len()
        );
        result
    }

    fn extract(&self, document: &ProjectDocument) -> Pass<Extraction> {
        let Some(semantic) = document.semantic.as_ref() else {
            return Pass::Failed(ExtractError::MissingSemanticInfo);
        };
        match self.extractor.extract(&document.source, semantic) {
            Ok(extraction) => Pass::Done(extraction),
            Err(error) => Pass::Failed(error),
        }
    }
}

fn carry_forward(snapshot: &ProjectSnapshot, next: &mut ProjectSnapshot, document: DocumentId) {
    if let Some(state) = snapshot.get(&document) {
        next.insert(document, state.clone());
    }
}
