//! Language extractors

pub mod rust;

use std::path::Path;

/// Whether a path is a source file some extractor understands.
pub fn is_supported(path: &Path) -> bool {
    matches!(path.extension().and_then(|e| e.to_str()), Some("rs"))
}
