//! In-memory cache of previously seen artifact ids

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use dashmap::DashMap;

use crate::category::Category;
use crate::model::{Artifact, ArtifactId, DocumentId, ProjectId};

/// Ids seen for one document, per category, in extraction order.
pub type CategoryIds = BTreeMap<Category, Vec<ArtifactId>>;

/// Everything remembered about one document between two passes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocumentState {
    pub ids: CategoryIds,
    /// Payload hashes keyed by category and id.
    pub fingerprints: HashMap<(Category, ArtifactId), u64>,
}

impl DocumentState {
    pub fn new() -> Self {
        Self::default()
    }

    /// State made of bare ids, without fingerprints.
    pub fn from_ids(ids: CategoryIds) -> Self {
        DocumentState {
            ids,
            fingerprints: HashMap::new(),
        }
    }

    /// Append an extracted artifact to the state.
    pub fn record(&mut self, category: Category, artifact: &Artifact) {
        self.ids
            .entry(category)
            .or_default()
            .push(artifact.id.clone());
        self.fingerprints
            .insert((category, artifact.id.clone()), artifact.fingerprint());
    }

    pub fn fingerprint(&self, category: Category, id: &ArtifactId) -> Option<u64> {
        self.fingerprints.get(&(category, id.clone())).copied()
    }

    pub fn contains(&self, category: Category, id: &ArtifactId) -> bool {
        self.ids
            .get(&category)
            .is_some_and(|ids| ids.contains(id))
    }

    /// Total number of ids across categories.
    pub fn len(&self) -> usize {
        self.ids.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// `document -> state` for every document of a project.
pub type ProjectSnapshot = HashMap<DocumentId, DocumentState>;

/// Process-lifetime store of the ids each document produced last time.
///
/// Each project is held behind an `Arc` that writers swap (or copy on write)
/// while holding the map shard, so readers always see either the old or the
/// new project state, never a mix of both.
#[derive(Debug, Default)]
pub struct ArtifactsCache {
    projects: DashMap<ProjectId, Arc<ProjectSnapshot>>,
}

impl ArtifactsCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// State last recorded for a document. Empty when never seen.
    pub fn get(&self, project: &ProjectId, document: &DocumentId) -> DocumentState {
        self.projects
            .get(project)
            .and_then(|snapshot| snapshot.get(document).cloned())
            .unwrap_or_default()
    }

    /// Replace the state of a single document.
    pub fn put(&self, project: &ProjectId, document: DocumentId, state: DocumentState) {
        tracing::debug!(
            "Caching {} ids for {}/{}",
            state.len(),
            project,
            document
        );
        let mut entry = self.projects.entry(project.clone()).or_default();
        Arc::make_mut(entry.value_mut()).insert(document, state);
    }

    /// Replace every document entry of a project in one step.
    pub fn initialize_project(&self, project: &ProjectId, snapshot: ProjectSnapshot) {
        tracing::debug!(
            "Publishing {} documents for project {}",
            snapshot.len(),
            project
        );
        self.projects.insert(project.clone(), Arc::new(snapshot));
    }

    /// Immutable view of a project's state. Empty when never seen.
    pub fn get_project(&self, project: &ProjectId) -> Arc<ProjectSnapshot> {
        self.projects
            .get(project)
            .map(|snapshot| Arc::clone(snapshot.value()))
            .unwrap_or_default()
    }

    /// Forget a project entirely.
    pub fn remove_project(&self, project: &ProjectId) -> bool {
        self.projects.remove(project).is_some()
    }

    pub fn project_count(&self) -> usize {
        self.projects.len()
    }

    /// Get cache statistics
    pub fn stats(&self) -> CacheStats {
        let mut stats = CacheStats::default();
        for entry in self.projects.iter() {
            stats.projects += 1;
            stats.documents += entry.value().len();
            stats.artifact_ids += entry.value().values().map(DocumentState::len).sum::<usize>();
        }
        stats
    }
}

/// Cache statistics
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub projects: usize,
    pub documents: usize,
    pub artifact_ids: usize,
}
