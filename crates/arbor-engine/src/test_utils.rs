//! Test utilities for the engine
//!
//! `ScriptedExtractor` reads one artifact per line instead of parsing code:
//!
//! ```text
//! service A        -> ServiceImpl artifact with id "A"
//! type B v2        -> Struct artifact "B" with a `version` of "v2"
//! noop             -> content that declares nothing
//! fail             -> ExtractError::Malformed at that line
//! ```
//!
//! Blank lines and `//` comments are ignored; a document made only of those
//! is empty input.

use std::collections::BTreeMap;

use arbor_core::{
    Artifact, ArtifactId, ArtifactKind, ArtifactPayload, Category, CategoryIds, DocumentState,
    Project, ProjectDocument, SemanticInfo, SourceDocument,
};
use arbor_indexer::{ArtifactExtractor, ExtractError, Extraction};

pub struct ScriptedExtractor;

impl ArtifactExtractor for ScriptedExtractor {
    fn extract(
        &self,
        document: &SourceDocument,
        _semantic: &SemanticInfo,
    ) -> Result<Extraction, ExtractError> {
        let mut artifacts = Vec::new();
        let mut has_content = false;

        for (index, line) in document.content.lines().enumerate() {
            let line_no = index as u32 + 1;
            let line = line.trim();
            if line.is_empty() || line.starts_with("//") {
                continue;
            }
            has_content = true;

            let mut words = line.split_whitespace();
            let keyword = words.next().unwrap_or_default();
            match keyword {
                "noop" => continue,
                "fail" => return Err(ExtractError::Malformed { line: line_no }),
                _ => {}
            }
            let kind = kind_for(keyword)
                .ok_or_else(|| ExtractError::Parser(format!("unknown keyword `{}`", keyword)))?;
            let id = words
                .next()
                .ok_or(ExtractError::Malformed { line: line_no })?;

            let mut metadata = BTreeMap::new();
            if let Some(version) = words.next() {
                metadata.insert("version".to_string(), version.to_string());
            }
            artifacts.push(Artifact::new(
                ArtifactId::from(id),
                ArtifactPayload {
                    kind,
                    name: id.to_string(),
                    qualified_name: id.to_string(),
                    line_start: line_no,
                    line_end: line_no,
                    metadata,
                },
            ));
        }

        if has_content {
            Ok(Extraction::Artifacts(artifacts))
        } else {
            Ok(Extraction::Empty)
        }
    }
}

fn kind_for(keyword: &str) -> Option<ArtifactKind> {
    let kind = match keyword {
        "service" => ArtifactKind::ServiceImpl,
        "listener" => ArtifactKind::Listener,
        "connection" => ArtifactKind::Client,
        "entryPoint" => ArtifactKind::EntryPoint,
        "function" => ArtifactKind::Function,
        "type" => ArtifactKind::Struct,
        "configurable" => ArtifactKind::Constant,
        _ => return None,
    };
    Some(kind)
}

/// Cached state holding bare ids under one category.
pub fn state_of(category: Category, ids: &[&str]) -> DocumentState {
    let mut map = CategoryIds::new();
    map.insert(category, ids.iter().map(|id| ArtifactId::from(*id)).collect());
    DocumentState::from_ids(map)
}

/// Project whose documents all carry (empty) semantic information.
pub fn scripted_project(id: &str, documents: &[(&str, &str)]) -> Project {
    documents
        .iter()
        .fold(Project::new(id), |project, (name, content)| {
            project.with_document(ProjectDocument::new(
                SourceDocument::new(*name, *content),
                SemanticInfo::new(),
            ))
        })
}
