use std::path::PathBuf;

use arbor_core::{DocumentId, ProjectId};
use arbor_indexer::ExtractError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, EngineError>;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Extraction failed for {document}: {source}")]
    Extraction {
        document: DocumentId,
        #[source]
        source: ExtractError,
    },

    #[error("Recompute of project {project} was cancelled")]
    Cancelled { project: ProjectId },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to read {path}: {source}")]
    ConfigIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to build worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

impl EngineError {
    pub fn config<E: std::fmt::Display>(e: E) -> Self {
        Self::Config(e.to_string())
    }
}
