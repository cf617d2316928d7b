//! Arbor Core — artifact model, category classifier, delta engine and id cache

pub mod cache;
pub mod category;
pub mod diff;
pub mod model;


pub use cache::{ArtifactsCache, CacheStats, CategoryIds, DocumentState, ProjectSnapshot};
pub use category::Category;
pub use diff::{classify_event, ArtifactDelta, ArtifactIndex, EventType, UpdatePolicy, WorkingSet};
pub use model::{
    Artifact, ArtifactId, ArtifactKind, ArtifactPayload, DocumentId, Project, ProjectDocument,
    ProjectId, SemanticInfo, SourceDocument,
};
