//! Artifact extractor trait definition

use arbor_core::{Artifact, SemanticInfo, SourceDocument};
use thiserror::Error;

/// What an extractor found in a document.
#[derive(Debug, Clone, PartialEq)]
pub enum Extraction {
    /// The document has no parseable top-level content.
    Empty,
    /// Artifacts in source order. May be empty when the document has content
    /// but declares nothing of interest.
    Artifacts(Vec<Artifact>),
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ExtractError {
    #[error("syntax error at line {line}")]
    Malformed { line: u32 },

    #[error("no semantic information available")]
    MissingSemanticInfo,

    #[error("parser error: {0}")]
    Parser(String),
}

/// Turns one document into its artifacts.
pub trait ArtifactExtractor: Send + Sync {
    fn extract(
        &self,
        document: &SourceDocument,
        semantic: &SemanticInfo,
    ) -> Result<Extraction, ExtractError>;
}
