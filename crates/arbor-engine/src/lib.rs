//! Arbor Engine — per-document deltas, project recompute and full rescan

pub mod config;
pub mod document;
pub mod engine;
pub mod error;


#[cfg(test)]
pub mod test_utils;

pub use config::{EngineConfig, CONFIG_FILE};
pub use document::{build_document_delta, DocumentDelta, DocumentOutcome};
pub use engine::{CancelToken, DesignEngine, DocumentFailure, ProjectDelta, ProjectIndex};
pub use error::{EngineError, Result};
