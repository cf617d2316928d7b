//! Rust design extractor using tree-sitter

use std::collections::BTreeMap;

use arbor_core::{
    Artifact, ArtifactId, ArtifactKind, ArtifactPayload, DocumentId, SemanticInfo, SourceDocument,
};
use tree_sitter::{Node, Point};

use crate::config::ExtractorRules;
use crate::extractor::{ArtifactExtractor, ExtractError, Extraction};
use crate::parser_pool::{ParseRequest, ParserPool};

/// Extracts module-level declarations of a Rust source file.
///
/// Inline `mod` blocks are walked and their items qualified with the module
/// path. Function bodies and `impl` members are not descended into.
pub struct RustExtractor {
    parser_pool: ParserPool,
    rules: ExtractorRules,
}

impl RustExtractor {
    pub fn new(parser_pool: ParserPool, rules: ExtractorRules) -> Self {
        Self { parser_pool, rules }
    }

    fn point_to_u32(point: Point) -> u32 {
        (point.row as u32) + 1
    }
}

impl ArtifactExtractor for RustExtractor {
    fn extract(
        &self,
        document: &SourceDocument,
        semantic: &SemanticInfo,
    ) -> Result<Extraction, ExtractError> {
        let parsed = self.parser_pool.parse_blocking(ParseRequest {
            document: document.id.clone(),
            content: document.content.clone(),
        })?;
        let root = parsed.tree.root_node();

        if !has_top_level_content(root) {
            return Ok(Extraction::Empty);
        }
        if root.has_error() {
            let line = first_error(root)
                .map(|node| Self::point_to_u32(node.start_position()))
                .unwrap_or(1);
            return Err(ExtractError::Malformed { line });
        }

        let mut visitor = ItemVisitor {
            document: &document.id,
            source: parsed.content.as_bytes(),
            semantic,
            rules: &self.rules,
            artifacts: Vec::new(),
        };
        visitor.visit_items(root);

        tracing::trace!(
            "Extracted {} artifacts from {}",
            visitor.artifacts.len(),
            document.id
        );
        Ok(Extraction::Artifacts(visitor.artifacts))
    }
}

/// Anything other than comments counts as content.
fn has_top_level_content(root: Node) -> bool {
    let mut cursor = root.walk();
    let found = root
        .named_children(&mut cursor)
        .any(|child| !matches!(child.kind(), "line_comment" | "block_comment"));
    found
}

/// First error or missing node in document order.
///
/// Walks with an explicit stack; nesting depth is bounded only by the input.
fn first_error(root: Node) -> Option<Node> {
    let mut stack = vec![root];
    while let Some(node) = stack.pop() {
        if node.is_error() || node.is_missing() {
            return Some(node);
        }
        if !node.has_error() {
            continue;
        }
        let mut cursor = node.walk();
        let children: Vec<Node> = node.children(&mut cursor).collect();
        stack.extend(children.into_iter().rev());
    }
    None
}

struct ItemVisitor<'a> {
    document: &'a DocumentId,
    source: &'a [u8],
    semantic: &'a SemanticInfo,
    rules: &'a ExtractorRules,
    artifacts: Vec<Artifact>,
}

impl<'a> ItemVisitor<'a> {
    /// Visit items in source order, descending into inline modules.
    ///
    /// Pending items sit on an explicit stack so deeply nested modules cannot
    /// exhaust the thread stack. Module paths live in `scopes` as
    /// parent-linked entries and are only materialized for emitted items.
    fn visit_items(&mut self, root: Node) {
        let mut scopes: Vec<(Option<usize>, String)> = Vec::new();
        let mut stack: Vec<(Node, Option<usize>)> = Vec::new();
        push_children(&mut stack, root, None);

        while let Some((item, scope)) = stack.pop() {
            if item.kind() == "mod_item" {
                let (Some(name), Some(body)) = (
                    self.field_text(item, "name"),
                    item.child_by_field_name("body"),
                ) else {
                    // `mod foo;` lives in another document
                    continue;
                };
                scopes.push((scope, name));
                push_children(&mut stack, body, Some(scopes.len() - 1));
                continue;
            }

            let module_path = module_path(&scopes, scope);
            match item.kind() {
                "function_item" => self.extract_function(item, &module_path),
                "struct_item" => self.extract_named(item, &module_path, ArtifactKind::Struct),
                "enum_item" => self.extract_named(item, &module_path, ArtifactKind::Enum),
                "trait_item" => self.extract_named(item, &module_path, ArtifactKind::Trait),
                "type_item" => self.extract_named(item, &module_path, ArtifactKind::TypeAlias),
                "impl_item" => self.extract_impl(item, &module_path),
                "const_item" => self.extract_binding(item, &module_path, ArtifactKind::Constant),
                "static_item" => self.extract_binding(item, &module_path, ArtifactKind::Static),
                _ => {}
            }
        }
    }

    fn extract_function(&mut self, node: Node, module_path: &[String]) {
        let Some(name) = self.field_text(node, "name") else {
            return;
        };
        let kind = if name == "main" && module_path.is_empty() {
            ArtifactKind::EntryPoint
        } else {
            ArtifactKind::Function
        };

        let mut metadata = self.base_metadata(node);
        let is_async = child_of_kind(node, "function_modifiers")
            .and_then(|m| m.utf8_text(self.source).ok())
            .is_some_and(|text| text.split_whitespace().any(|w| w == "async"));
        if is_async {
            metadata.insert("async".to_string(), "true".to_string());
        }

        self.push(node, module_path, kind, name, metadata);
    }

    fn extract_named(&mut self, node: Node, module_path: &[String], kind: ArtifactKind) {
        if let Some(name) = self.field_text(node, "name") {
            let metadata = self.base_metadata(node);
            self.push(node, module_path, kind, name, metadata);
        }
    }

    /// `impl Trait for Type` becomes a service; inherent impls are skipped.
    fn extract_impl(&mut self, node: Node, module_path: &[String]) {
        let (Some(trait_name), Some(target)) =
            (self.field_text(node, "trait"), self.field_text(node, "type"))
        else {
            return;
        };

        let mut metadata = BTreeMap::new();
        metadata.insert("trait".to_string(), trait_name.clone());
        metadata.insert("target".to_string(), target.clone());

        let name = format!("{} for {}", trait_name, target);
        self.push(node, module_path, ArtifactKind::ServiceImpl, name, metadata);
    }

    /// `const`/`static` items, promoted to listeners or clients by type.
    fn extract_binding(&mut self, node: Node, module_path: &[String], fallback: ArtifactKind) {
        let (Some(name), Some(declared)) =
            (self.field_text(node, "name"), self.field_text(node, "type"))
        else {
            return;
        };
        let resolved = self
            .semantic
            .resolve(&declared)
            .map(str::to_string)
            .unwrap_or_else(|| declared.clone());

        let kind = if self.rules.is_listener(&resolved) {
            ArtifactKind::Listener
        } else if self.rules.is_connection(&resolved) {
            ArtifactKind::Client
        } else {
            fallback
        };

        let mut metadata = self.base_metadata(node);
        if resolved != declared {
            metadata.insert("resolved_type".to_string(), resolved);
        }
        metadata.insert("declared_type".to_string(), declared);

        self.push(node, module_path, kind, name, metadata);
    }

    fn push(
        &mut self,
        node: Node,
        module_path: &[String],
        kind: ArtifactKind,
        name: String,
        mut metadata: BTreeMap<String, String>,
    ) {
        let qualified_name = if module_path.is_empty() {
            name.clone()
        } else {
            format!("{}::{}", module_path.join("::"), name)
        };
        if !module_path.is_empty() {
            metadata.insert("module".to_string(), module_path.join("::"));
        }

        let id = ArtifactId::new(self.document, kind, &qualified_name);
        self.artifacts.push(Artifact::new(
            id,
            ArtifactPayload {
                kind,
                name,
                qualified_name,
                line_start: RustExtractor::point_to_u32(node.start_position()),
                line_end: RustExtractor::point_to_u32(node.end_position()),
                metadata,
            },
        ));
    }

    fn base_metadata(&self, node: Node) -> BTreeMap<String, String> {
        let visibility = child_of_kind(node, "visibility_modifier")
            .and_then(|v| v.utf8_text(self.source).ok())
            .unwrap_or("private");
        let mut metadata = BTreeMap::new();
        metadata.insert("visibility".to_string(), visibility.to_string());
        metadata
    }

    fn field_text(&self, node: Node, field: &str) -> Option<String> {
        node.child_by_field_name(field)?
            .utf8_text(self.source)
            .ok()
            .map(str::to_string)
    }
}

/// Push the named children of `container` so they pop in source order.
fn push_children<'tree>(
    stack: &mut Vec<(Node<'tree>, Option<usize>)>,
    container: Node<'tree>,
    scope: Option<usize>,
) {
    let mut cursor = container.walk();
    let children: Vec<Node> = container.named_children(&mut cursor).collect();
    stack.extend(children.into_iter().rev().map(|child| (child, scope)));
}

/// Module names from the outermost inline `mod` down to `scope`.
fn module_path(scopes: &[(Option<usize>, String)], mut scope: Option<usize>) -> Vec<String> {
    let mut path = Vec::new();
    while let Some(index) = scope {
        let (parent, name) = &scopes[index];
        path.push(name.clone());
        scope = *parent;
    }
    path.reverse();
    path
}

fn child_of_kind<'tree>(node: Node<'tree>, kind: &str) -> Option<Node<'tree>> {
    let mut cursor = node.walk();
    let found = node.children(&mut cursor).find(|child| child.kind() == kind);
    found
}
