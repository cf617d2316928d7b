//! Core data structures for design artifacts

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::hash::{DefaultHasher, Hash, Hasher};

use serde::{Deserialize, Serialize};

use crate::category::Category;

/// Identifies a project (one design view) in the cache.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ProjectId(pub String);

impl ProjectId {
    pub fn new(id: impl Into<String>) -> Self {
        ProjectId(id.into())
    }
}

impl fmt::Display for ProjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifies a document inside a project. Project-relative, `/` separated.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DocumentId(pub String);

impl DocumentId {
    pub fn new(id: impl Into<String>) -> Self {
        DocumentId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Unique, stable identifier for an artifact.
///
/// Derived from the owning document, the artifact kind and its qualified
/// name, never from its position, so moving code around inside a file keeps
/// the same id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ArtifactId(pub String);

impl ArtifactId {
    pub fn new(document: &DocumentId, kind: ArtifactKind, qualified_name: &str) -> Self {
        let mut hasher = DefaultHasher::new();
        document.hash(&mut hasher);
        kind.hash(&mut hasher);
        qualified_name.hash(&mut hasher);
        ArtifactId(format!("{:016x}", hasher.finish()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ArtifactId {
    fn from(id: &str) -> Self {
        ArtifactId(id.to_string())
    }
}

impl fmt::Display for ArtifactId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Discriminates what kind of construct an artifact was extracted from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ArtifactKind {
    // ── Components ──────────────────────────────────────────
    ServiceImpl,
    Listener,
    Client,
    EntryPoint,
    Function,

    // ── Types ───────────────────────────────────────────────
    Struct,
    Enum,
    Trait,
    TypeAlias,

    // ── Configuration ───────────────────────────────────────
    Constant,
    Static,
}

impl ArtifactKind {
    /// Category this kind is reported under.
    pub fn category(self) -> Category {
        Category::of(self)
    }
}

/// Everything an artifact carries besides its id. Opaque to the diff engine.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtifactPayload {
    pub kind: ArtifactKind,
    pub name: String,
    pub qualified_name: String,
    pub line_start: u32,
    pub line_end: u32,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, String>,
}

/// A single extracted unit of design information.
///
/// Artifacts are built fresh on every extraction pass. The only artifact
/// without a payload is the tombstone reported for a deletion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artifact {
    pub id: ArtifactId,
    #[serde(flatten)]
    pub payload: Option<ArtifactPayload>,
}

impl Artifact {
    pub fn new(id: ArtifactId, payload: ArtifactPayload) -> Self {
        Artifact {
            id,
            payload: Some(payload),
        }
    }

    /// Id-only placeholder used to report a deletion.
    pub fn tombstone(id: ArtifactId) -> Self {
        Artifact { id, payload: None }
    }

    pub fn is_tombstone(&self) -> bool {
        self.payload.is_none()
    }

    pub fn kind(&self) -> Option<ArtifactKind> {
        self.payload.as_ref().map(|p| p.kind)
    }

    /// Grouping key. `None` for tombstones, whose category is implied by
    /// the bucket they are reported in.
    pub fn category(&self) -> Option<Category> {
        self.kind().map(ArtifactKind::category)
    }

    /// Content hash of the payload, used to tell unchanged artifacts apart
    /// from replaced ones.
    pub fn fingerprint(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.payload.hash(&mut hasher);
        hasher.finish()
    }
}

/// Resolved type information for a document, produced by semantic analysis.
///
/// Maps a symbol as written in source to its fully resolved type path.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SemanticInfo {
    resolved_types: HashMap<String, String>,
}

impl SemanticInfo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_type(mut self, symbol: impl Into<String>, resolved: impl Into<String>) -> Self {
        self.insert(symbol, resolved);
        self
    }

    pub fn insert(&mut self, symbol: impl Into<String>, resolved: impl Into<String>) {
        self.resolved_types.insert(symbol.into(), resolved.into());
    }

    pub fn resolve(&self, symbol: &str) -> Option<&str> {
        self.resolved_types.get(symbol).map(String::as_str)
    }
}

/// A source document as handed over by the editor or the filesystem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceDocument {
    pub id: DocumentId,
    pub content: String,
}

impl SourceDocument {
    pub fn new(id: impl Into<String>, content: impl Into<String>) -> Self {
        SourceDocument {
            id: DocumentId::new(id),
            content: content.into(),
        }
    }
}

/// A document together with its semantic information, if any was produced.
#[derive(Debug, Clone)]
pub struct ProjectDocument {
    pub source: SourceDocument,
    pub semantic: Option<SemanticInfo>,
}

impl ProjectDocument {
    pub fn new(source: SourceDocument, semantic: SemanticInfo) -> Self {
        ProjectDocument {
            source,
            semantic: Some(semantic),
        }
    }

    /// A document semantic analysis has not produced anything for yet.
    pub fn without_semantics(source: SourceDocument) -> Self {
        ProjectDocument {
            source,
            semantic: None,
        }
    }

    pub fn id(&self) -> &DocumentId {
        &self.source.id
    }
}

/// All documents making up one design view.
#[derive(Debug, Clone)]
pub struct Project {
    pub id: ProjectId,
    pub documents: Vec<ProjectDocument>,
}

impl Project {
    pub fn new(id: impl Into<String>) -> Self {
        Project {
            id: ProjectId::new(id),
            documents: Vec::new(),
        }
    }

    pub fn with_document(mut self, document: ProjectDocument) -> Self {
        self.documents.push(document);
        self
    }
}
