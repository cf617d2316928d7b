//! CLI command implementations

use anyhow::Context;
use arbor_core::{Project, ProjectDocument, SemanticInfo, SourceDocument};
use arbor_engine::{DesignEngine, DocumentFailure, EngineConfig};
use arbor_indexer::languages::is_supported;
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub async fn index(root: PathBuf) -> anyhow::Result<()> {
    tracing::info!("Indexing project: {}", root.display());

    let engine = Arc::new(build_engine(&root)?);
    let project = load_project(&root, &project_name(&root))?;

    let result = tokio::task::spawn_blocking(move || engine.index_project(&project))
        .await
        .context("Indexing task panicked")?;

    report_failures(&result.failures);
    println!("{}", serde_json::to_string_pretty(&result.index)?);
    Ok(())
}

pub async fn diff(root: PathBuf, baseline: PathBuf) -> anyhow::Result<()> {
    tracing::info!("Comparing {} against {}", root.display(), baseline.display());

    let engine = Arc::new(build_engine(&root)?);
    let name = project_name(&root);
    let before = load_project(&baseline, &name)?;
    let after = load_project(&root, &name)?;

    let result = tokio::task::spawn_blocking(move || {
        let seeded = engine.index_project(&before);
        report_failures(&seeded.failures);
        engine.project_artifact_changes(&after)
    })
    .await
    .context("Diff task panicked")?;

    report_failures(&result.failures);
    for (category, event, artifact) in result.delta.iter() {
        tracing::debug!("{:?} {:?}: {}", category, event, artifact.id);
    }
    println!("{}", serde_json::to_string_pretty(&result.delta)?);
    Ok(())
}

fn build_engine(root: &Path) -> anyhow::Result<DesignEngine> {
    let config = EngineConfig::load(root)
        .with_context(|| format!("Failed to load configuration from {}", root.display()))?;
    DesignEngine::with_rust_extractor(&config).context("Failed to start engine")
}

fn report_failures(failures: &[DocumentFailure]) {
    for failure in failures {
        tracing::error!("{}: {}", failure.document, failure.error);
    }
}

/// Project id derived from the root directory name.
fn project_name(root: &Path) -> String {
    root.canonicalize()
        .ok()
        .and_then(|path| path.file_name().map(|n| n.to_string_lossy().into_owned()))
        .unwrap_or_else(|| "root".to_string())
}

/// Collect every supported source file under `root`, honouring `.gitignore`.
///
/// Document ids are paths relative to `root`, so two trees of the same
/// project produce matching ids.
fn load_project(root: &Path, name: &str) -> anyhow::Result<Project> {
    if !root.is_dir() {
        anyhow::bail!("{} is not a directory", root.display());
    }

    let mut project = Project::new(name);
    let walker = ignore::WalkBuilder::new(root)
        .hidden(false)
        .git_ignore(true)
        .build();

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!("Cannot read entry: {}", e);
                continue;
            }
        };
        if !entry.file_type().is_some_and(|ft| ft.is_file()) || !is_supported(entry.path()) {
            continue;
        }

        let path = entry.path();
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) => {
                tracing::warn!("Cannot read {}: {}", path.display(), e);
                continue;
            }
        };
        let relative = path.strip_prefix(root).unwrap_or(path);
        let id = relative.to_string_lossy().replace('\\', "/");
        tracing::debug!("Loaded {}", id);

        project = project.with_document(ProjectDocument::new(
            SourceDocument::new(id, content),
            SemanticInfo::new(),
        ));
    }

    // walk order is not stable across platforms
    project.documents.sort_by(|a, b| a.id().cmp(b.id()));
    tracing::info!("Found {} source files under {}", project.documents.len(), root.display());
    Ok(project)
}
