//! Dependency visitor (spec.md §4.1): walks a tree-sitter parse of each Go
//! source file and emits the typed [`crate::events::Event`] stream the
//! builder consumes. Selector expressions are filtered down at emission
//! time to the ones whose left-hand identifier names a currently-known
//! import binding, following the original tool's `referenceSelector`
//! (`internal/ast/visitor.go`).
//!
//! A local declaration (parameter, `:=`, local `var`/`const`) that reuses
//! an import's local name shadows it for the rest of the enclosing block,
//! per spec.md §4.1. [`ScopeStack`] tracks this with a stack of per-block
//! shadow sets layered on top of the file's import bindings, rather than
//! the flat file-wide set a simpler visitor would use.

use std::collections::HashSet;
use std::path::Path;
use std::sync::mpsc::Sender;

use tree_sitter::{Node, Parser};

use crate::error::{Error, Result};
use crate::events::{DeclKind, Event};

/// Tracks which of the file's import bindings are currently shadowed by a
/// local declaration, one `HashSet` layer per lexical block still open.
#[derive(Default)]
struct ScopeStack {
    layers: Vec<HashSet<String>>,
}

impl ScopeStack {
    fn push(&mut self) {
        self.layers.push(HashSet::new());
    }

    fn pop(&mut self) {
        self.layers.pop();
    }

    /// Shadow `name` for the remainder of the innermost open block, if it
    /// names an import at all — non-import locals need no tracking.
    fn declare(&mut self, known_imports: &HashSet<String>, name: &str) {
        if known_imports.contains(name) {
            if let Some(top) = self.layers.last_mut() {
                top.insert(name.to_string());
            }
        }
    }

    fn is_visible_import(&self, known_imports: &HashSet<String>, name: &str) -> bool {
        known_imports.contains(name) && !self.layers.iter().any(|layer| layer.contains(name))
    }
}

pub struct DependencyVisitor {
    out: Sender<Event>,
    parser: Parser,
}

impl DependencyVisitor {
    pub fn new(out: Sender<Event>) -> Result<Self> {
        let mut parser = Parser::new();
        parser
            .set_language(&tree_sitter_go::LANGUAGE.into())
            .map_err(|e| Error::Parse(format!("failed to load Go grammar: {e}")))?;
        Ok(DependencyVisitor { out, parser })
    }

    /// Visit one `.go` file, emitting its `Package`, `File`, `Import`,
    /// declaration, and filtered `Selector` events in document order.
    /// Repeated `Package` events across files in the same directory are
    /// harmless — the builder treats identical re-declarations as a no-op.
    pub fn visit_file(&mut self, dir_path: &Path, abs_path: &Path) -> Result<()> {
        let source = std::fs::read_to_string(abs_path)?;
        let tree = self.parser.parse(&source, None).ok_or_else(|| {
            Error::Parse(format!("tree-sitter failed to parse {}", abs_path.display()))
        })?;
        let root = tree.root_node();

        let package_name = root
            .named_child(0)
            .filter(|n| n.kind() == "package_clause")
            .and_then(|n| n.named_child(0))
            .map(|n| text(&source, n))
            .unwrap_or_else(|| "main".to_string());

        self.send(Event::Package {
            name: package_name,
            dir_path: dir_path.to_path_buf(),
        })?;
        self.send(Event::File {
            abs_path: abs_path.to_string_lossy().to_string(),
            dir_path: dir_path.to_path_buf(),
        })?;

        let mut known_imports: HashSet<String> = HashSet::new();
        let mut cursor = root.walk();
        for child in root.children(&mut cursor) {
            self.visit_top_level(&source, child, &mut known_imports)?;
        }
        Ok(())
    }

    fn send(&self, event: Event) -> Result<()> {
        self.out
            .send(event)
            .map_err(|_| Error::Parse("event channel closed".to_string()))
    }

    fn visit_top_level(
        &mut self,
        source: &str,
        node: Node,
        known_imports: &mut HashSet<String>,
    ) -> Result<()> {
        match node.kind() {
            "import_declaration" => self.visit_import_decl(source, node, known_imports),
            "function_declaration" => self.visit_function_decl(source, node, known_imports),
            "method_declaration" => self.visit_method_decl(source, node, known_imports),
            "const_declaration" => {
                self.visit_gen_decl(source, node, DeclKind::Const, "const_spec", known_imports)
            }
            "var_declaration" => {
                self.visit_gen_decl(source, node, DeclKind::Var, "var_spec", known_imports)
            }
            "type_declaration" => {
                self.visit_gen_decl(source, node, DeclKind::Type, "type_spec", known_imports)
            }
            _ => Ok(()),
        }
    }

    fn visit_import_decl(
        &mut self,
        source: &str,
        node: Node,
        known_imports: &mut HashSet<String>,
    ) -> Result<()> {
        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            match child.kind() {
                "import_spec" => self.emit_import_spec(source, child, known_imports)?,
                "import_spec_list" => {
                    let mut inner = child.walk();
                    for spec in child.children(&mut inner) {
                        if spec.kind() == "import_spec" {
                            self.emit_import_spec(source, spec, known_imports)?;
                        }
                    }
                }
                _ => {}
            }
        }
        Ok(())
    }

    fn emit_import_spec(
        &mut self,
        source: &str,
        node: Node,
        known_imports: &mut HashSet<String>,
    ) -> Result<()> {
        let Some(path_node) = node.child_by_field_name("path") else {
            return Ok(());
        };
        let raw_path = text(source, path_node);
        let import_path = raw_path.trim_matches('"').to_string();

        let (local_name, aliased) = match node.child_by_field_name("name") {
            Some(n) if n.kind() == "dot" => (".".to_string(), true),
            Some(n) if n.kind() == "blank_identifier" => ("_".to_string(), true),
            Some(n) => (text(source, n), true),
            None => (default_local_name(&import_path), false),
        };

        if local_name != "_" && local_name != "." {
            known_imports.insert(local_name.clone());
        }
        self.send(Event::Import {
            import_path,
            aliased,
            local_name,
        })
    }

    fn visit_function_decl(
        &mut self,
        source: &str,
        node: Node,
        known_imports: &mut HashSet<String>,
    ) -> Result<()> {
        let name = node
            .child_by_field_name("name")
            .map(|n| text(source, n))
            .unwrap_or_default();
        self.send(Event::FuncDecl {
            name,
            receiver_type: None,
        })?;

        let mut scope = ScopeStack::default();
        scope.push();
        if let Some(params) = node.child_by_field_name("parameters") {
            self.declare_params(source, params, known_imports, &mut scope);
        }
        if let Some(body) = node.child_by_field_name("body") {
            self.walk_scope(source, body, known_imports, &mut scope)?;
        }
        scope.pop();
        Ok(())
    }

    fn visit_method_decl(
        &mut self,
        source: &str,
        node: Node,
        known_imports: &mut HashSet<String>,
    ) -> Result<()> {
        let name = node
            .child_by_field_name("name")
            .map(|n| text(source, n))
            .unwrap_or_default();
        let receiver_type = node
            .child_by_field_name("receiver")
            .and_then(|recv| receiver_type_name(source, recv));
        self.send(Event::FuncDecl { name, receiver_type })?;

        let mut scope = ScopeStack::default();
        scope.push();
        if let Some(receiver) = node.child_by_field_name("receiver") {
            self.declare_params(source, receiver, known_imports, &mut scope);
        }
        if let Some(params) = node.child_by_field_name("parameters") {
            self.declare_params(source, params, known_imports, &mut scope);
        }
        if let Some(body) = node.child_by_field_name("body") {
            self.walk_scope(source, body, known_imports, &mut scope)?;
        }
        scope.pop();
        Ok(())
    }

    /// Declares every identifier directly named by a `parameter_list`
    /// (ordinary or variadic parameters, or a method receiver) into the
    /// scope's innermost layer.
    fn declare_params(
        &mut self,
        source: &str,
        node: Node,
        known_imports: &HashSet<String>,
        scope: &mut ScopeStack,
    ) {
        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            if matches!(
                child.kind(),
                "parameter_declaration" | "variadic_parameter_declaration"
            ) {
                let mut inner = child.walk();
                for param in child.children(&mut inner) {
                    if param.kind() == "identifier" {
                        scope.declare(known_imports, &text(source, param));
                    }
                }
            }
        }
    }

    /// `const_spec`/`var_spec` repeat a bare `identifier` child per
    /// declared name; `type_spec` carries exactly one name under its
    /// `name` field. The grammar's field names for comma-separated
    /// declaration lists aren't consistent enough across spec kinds to
    /// lean on here, so const/var names are picked up by a plain
    /// kind-based sweep instead.
    fn visit_gen_decl(
        &mut self,
        source: &str,
        node: Node,
        kind: DeclKind,
        spec_kind: &str,
        known_imports: &mut HashSet<String>,
    ) -> Result<()> {
        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            if child.kind() == spec_kind {
                self.emit_gen_decl_spec(source, child, kind)?;
            } else if child.kind().ends_with("_spec_list") {
                let mut inner = child.walk();
                for spec in child.children(&mut inner) {
                    if spec.kind() == spec_kind {
                        self.emit_gen_decl_spec(source, spec, kind)?;
                    }
                }
            }
        }
        let mut scope = ScopeStack::default();
        scope.push();
        self.walk_scope(source, node, known_imports, &mut scope)?;
        scope.pop();
        Ok(())
    }

    fn emit_gen_decl_spec(&mut self, source: &str, node: Node, kind: DeclKind) -> Result<()> {
        if node.kind() == "type_spec" {
            if let Some(name_node) = node.child_by_field_name("name") {
                self.send(Event::GenDecl {
                    kind,
                    name: text(source, name_node),
                })?;
            }
            return Ok(());
        }
        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            if child.kind() == "identifier" {
                self.send(Event::GenDecl {
                    kind,
                    name: text(source, child),
                })?;
            }
        }
        Ok(())
    }

    /// Recursively walks a subtree, tracking lexical scope so that a local
    /// declaration shadowing an import name suppresses `Selector` events
    /// for that name within its block (spec.md §4.1).
    fn walk_scope(
        &mut self,
        source: &str,
        node: Node,
        known_imports: &HashSet<String>,
        scope: &mut ScopeStack,
    ) -> Result<()> {
        match node.kind() {
            "block" => {
                scope.push();
                let mut cursor = node.walk();
                for child in node.children(&mut cursor) {
                    self.walk_scope(source, child, known_imports, scope)?;
                }
                scope.pop();
                return Ok(());
            }
            "func_literal" => {
                scope.push();
                if let Some(params) = node.child_by_field_name("parameters") {
                    self.declare_params(source, params, known_imports, scope);
                }
                if let Some(body) = node.child_by_field_name("body") {
                    self.walk_scope(source, body, known_imports, scope)?;
                }
                scope.pop();
                return Ok(());
            }
            "short_var_declaration" => {
                if let Some(right) = node.child_by_field_name("right") {
                    self.walk_scope(source, right, known_imports, scope)?;
                }
                if let Some(left) = node.child_by_field_name("left") {
                    let mut cursor = left.walk();
                    for ident in left.children(&mut cursor) {
                        if ident.kind() == "identifier" {
                            scope.declare(known_imports, &text(source, ident));
                        }
                    }
                }
                return Ok(());
            }
            "var_declaration" | "const_declaration" => {
                let spec_kind = if node.kind() == "var_declaration" {
                    "var_spec"
                } else {
                    "const_spec"
                };
                let mut cursor = node.walk();
                for child in node.children(&mut cursor) {
                    if child.kind() == spec_kind {
                        self.walk_local_spec(source, child, known_imports, scope)?;
                    } else if child.kind().ends_with("_spec_list") {
                        let mut inner = child.walk();
                        for spec in child.children(&mut inner) {
                            if spec.kind() == spec_kind {
                                self.walk_local_spec(source, spec, known_imports, scope)?;
                            }
                        }
                    }
                }
                return Ok(());
            }
            "selector_expression" => {
                if let (Some(operand), Some(field)) = (
                    node.child_by_field_name("operand"),
                    node.child_by_field_name("field"),
                ) {
                    if operand.kind() == "identifier" {
                        let import_name = text(source, operand);
                        if scope.is_visible_import(known_imports, &import_name) {
                            self.send(Event::Selector {
                                import_name,
                                member: text(source, field),
                            })?;
                        }
                    }
                }
            }
            _ => {}
        }

        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            self.walk_scope(source, child, known_imports, scope)?;
        }
        Ok(())
    }

    /// A local `var_spec`/`const_spec`: its initializer is walked (and may
    /// reference the still-visible outer binding) before its declared
    /// names take effect, mirroring `short_var_declaration`'s handling.
    fn walk_local_spec(
        &mut self,
        source: &str,
        node: Node,
        known_imports: &HashSet<String>,
        scope: &mut ScopeStack,
    ) -> Result<()> {
        let mut cursor = node.walk();
        let mut names = Vec::new();
        for child in node.children(&mut cursor) {
            if child.kind() == "identifier" {
                names.push(text(source, child));
            } else {
                self.walk_scope(source, child, known_imports, scope)?;
            }
        }
        for name in &names {
            scope.declare(known_imports, name);
        }
        Ok(())
    }
}

fn text(source: &str, node: Node) -> String {
    source[node.byte_range()].to_string()
}

fn default_local_name(import_path: &str) -> String {
    import_path
        .rsplit('/')
        .next()
        .unwrap_or(import_path)
        .to_string()
}

/// A method receiver is a `parameter_list` with one `parameter_declaration`
/// whose `type` field is a `type_identifier`, possibly wrapped in a
/// `pointer_type`.
fn receiver_type_name(source: &str, receiver: Node) -> Option<String> {
    let mut cursor = receiver.walk();
    for child in receiver.children(&mut cursor) {
        if child.kind() == "parameter_declaration" {
            if let Some(ty) = child.child_by_field_name("type") {
                return Some(strip_pointer(source, ty));
            }
        }
    }
    None
}

fn strip_pointer(source: &str, node: Node) -> String {
    if node.kind() == "pointer_type" {
        if let Some(inner) = node.named_child(0) {
            return text(source, inner);
        }
    }
    text(source, node)
}
