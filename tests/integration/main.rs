//! Integration tests for Arbor
//!
//! These tests drive the real tree-sitter extractor through the engine and
//! the CLI binary.

use arbor_core::{
    ArtifactKind, Category, EventType, Project, ProjectDocument, SemanticInfo, SourceDocument,
    UpdatePolicy,
};
use arbor_engine::{DesignEngine, EngineConfig};
use arbor_indexer::ExtractError;
use std::process::Command;
use std::sync::Arc;
use tempfile::TempDir;

const SERVICE: &str = r#"
use std::net::TcpListener;

pub struct Api;

pub trait Handler {
    fn handle(&self);
}

impl Handler for Api {
    fn handle(&self) {}
}

static LISTENER: TcpListener = todo!();

fn main() {}
"#;

fn project(documents: &[(&str, &str)]) -> Project {
    documents.iter().fold(Project::new("service"), |project, (id, content)| {
        project.with_document(ProjectDocument::new(
            SourceDocument::new(*id, *content),
            SemanticInfo::new(),
        ))
    })
}

fn engine(policy: UpdatePolicy) -> DesignEngine {
    let config = EngineConfig {
        workers: Some(2),
        parser_workers: Some(2),
        update_policy: policy,
        ..Default::default()
    };
    DesignEngine::with_rust_extractor(&config).unwrap()
}

/// Full rescan classifies real Rust declarations into categories
#[test]
fn test_index_real_sources() {
    let engine = engine(UpdatePolicy::Always);
    let result = engine.index_project(&project(&[("src/main.rs", SERVICE)]));

    assert!(result.failures.is_empty());
    let kinds: Vec<ArtifactKind> = result
        .index
        .artifacts()
        .filter_map(|(_, artifact)| artifact.kind())
        .collect();
    assert!(kinds.contains(&ArtifactKind::ServiceImpl));
    assert!(kinds.contains(&ArtifactKind::Listener));
    assert!(kinds.contains(&ArtifactKind::EntryPoint));
    assert_eq!(result.index.category(Category::Type).map(|c| c.len()), Some(2));

    let service = result
        .index
        .category(Category::Service)
        .and_then(|c| c.values().next())
        .and_then(|a| a.payload.as_ref())
        .unwrap();
    assert_eq!(service.name, "Handler for Api");
}

/// Editing a file reports exactly what changed
#[test]
fn test_edit_produces_delta() {
    let engine = engine(UpdatePolicy::Changed);
    engine.index_project(&project(&[("src/main.rs", SERVICE)]));

    let edited = SERVICE
        .replace("pub struct Api;", "pub struct Api;\npub struct Metrics;")
        .replace("fn main() {}", "");
    let result = engine.project_artifact_changes(&project(&[("src/main.rs", &edited)]));

    assert!(result.is_complete());
    let added: Vec<&str> = result
        .delta
        .bucket(Category::Type, EventType::Additions)
        .into_iter()
        .flat_map(|bucket| bucket.values())
        .filter_map(|a| a.payload.as_ref().map(|p| p.name.as_str()))
        .collect();
    assert_eq!(added, vec!["Metrics"]);
    assert_eq!(result.delta.count(EventType::Deletions), 1);
    assert!(result.delta.bucket(Category::EntryPoint, EventType::Deletions).is_some());
    // line shifts of the impl are real changes
    assert!(result.delta.bucket(Category::Service, EventType::Updates).is_some());
}

/// A broken file is reported and leaves the rest of the project alone
#[test]
fn test_syntax_error_is_isolated() {
    let engine = engine(UpdatePolicy::Changed);
    let sources = [("src/main.rs", SERVICE), ("src/lib.rs", "pub fn helper() {}\n")];
    engine.index_project(&project(&sources));

    let result = engine.project_artifact_changes(&project(&[
        ("src/main.rs", SERVICE),
        ("src/lib.rs", "pub fn helper( {\n"),
    ]));
    assert_eq!(result.failures.len(), 1);
    assert!(matches!(result.failures[0].error, ExtractError::Malformed { .. }));
    assert!(result.delta.is_empty());

    // cache still holds the helper, so restoring it changes nothing
    assert!(engine.project_artifact_changes(&project(&sources)).delta.is_empty());
}

/// The engine runs behind tokio's blocking pool like the CLI does
#[tokio::test]
async fn test_engine_from_async_context() {
    let engine = Arc::new(engine(UpdatePolicy::Always));

    let tasks: Vec<_> = ["a", "b"]
        .into_iter()
        .map(|name| {
            let engine = Arc::clone(&engine);
            tokio::task::spawn_blocking(move || {
                let project = Project::new(name).with_document(ProjectDocument::new(
                    SourceDocument::new("src/main.rs", SERVICE),
                    SemanticInfo::new(),
                ));
                engine.project_artifact_changes(&project)
            })
        })
        .collect();

    for task in tasks {
        let result = task.await.unwrap();
        assert_eq!(result.delta.count(EventType::Additions), 5);
    }
    assert_eq!(engine.cache().project_count(), 2);
}

fn write_tree(files: &[(&str, &str)]) -> TempDir {
    let dir = TempDir::new().unwrap();
    for (path, content) in files {
        let path = dir.path().join(path);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, content).unwrap();
    }
    dir
}

fn arbor(args: &[&str]) -> std::process::Output {
    Command::new(env!("CARGO_BIN_EXE_arbor"))
        .args(args)
        .env_remove("RUST_LOG")
        .output()
        .expect("Failed to execute arbor")
}

/// Test that the CLI can be invoked
#[test]
fn test_cli_invocation() {
    let output = arbor(&["--help"]);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Incremental design artifact extraction"));

    let output = arbor(&["version"]);
    assert!(String::from_utf8_lossy(&output.stdout).starts_with("Arbor v"));
}

#[test]
fn test_cli_index_prints_json() {
    let tree = write_tree(&[
        ("src/main.rs", SERVICE),
        ("README.md", "# not rust"),
        ("target/gen.rs", "pub struct Generated;"),
        (".gitignore", "target/\n"),
    ]);
    // ignore only honours .gitignore inside a repository
    std::fs::create_dir_all(tree.path().join(".git")).unwrap();

    let output = arbor(&["index", "--root", tree.path().to_str().unwrap()]);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["entryPoint"].as_object().map(|o| o.len()), Some(1));
    assert_eq!(json["listener"].as_object().map(|o| o.len()), Some(1));
    let types: Vec<&str> = json["type"]
        .as_object()
        .unwrap()
        .values()
        .filter_map(|a| a["name"].as_str())
        .collect();
    assert!(!types.contains(&"Generated"));
}

#[test]
fn test_cli_diff_against_baseline() {
    let baseline = write_tree(&[("src/main.rs", SERVICE), ("src/old.rs", "pub enum Legacy { A }\n")]);
    let current = write_tree(&[("src/main.rs", SERVICE), ("src/new.rs", "pub fn added() {}\n")]);

    let output = arbor(&[
        "diff",
        "--root",
        current.path().to_str().unwrap(),
        "--baseline",
        baseline.path().to_str().unwrap(),
    ]);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let additions = json["function"]["additions"].as_object().unwrap();
    assert_eq!(additions.len(), 1);
    assert_eq!(additions.values().next().unwrap()["name"], "added");
    assert_eq!(json["type"]["deletions"].as_object().map(|o| o.len()), Some(1));
}
