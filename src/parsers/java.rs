//! Java parser using tree-sitter
//!
//! Lowers the tree-sitter-java concrete syntax tree into the language-neutral
//! model: type declarations, methods, statements and expressions. Shapes the
//! model does not describe become `Statement::Other` / `ExprKind::Unknown`.

use super::ParseError;
use crate::ast::{
    Block, Expr, ExprKind, FunctionDecl, Language, Literal, LoopKind, Parameter, SourceUnit, Span,
    Statement, TypeClass, TypeDecl, TypeKind, TypeRef,
};
use regex::Regex;
use std::cell::{Cell, RefCell};
use std::path::Path;
use std::sync::OnceLock;
use tree_sitter::{Node, Parser};

/// Deepest statement/expression nesting lowered before the file is rejected
pub const MAX_NESTING: usize = 1000;

/// Annotations that declare a method may return null
const NULLABLE_ANNOTATIONS: &[&str] = &["Nullable", "CheckForNull", "NullableDecl", "MaybeNull"];

/// Phrases that admit null as a result
fn nullable_doc_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?i)\bor\s+null\b|\bnull\s+if\b|\bnull\s+(when|otherwise|is\s+returned)\b|\b(may|might|can|could)\s+(be|return)\s+null\b|\breturns?\s+null\b|\bpossibly\s+null\b|\bnullable\b",
        )
        .expect("valid regex")
    })
}

/// Words that turn a following null phrase into a non-null promise
fn negation_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)\b(never|not|non|cannot|can't|won't|doesn't|don't|isn't|mustn't)\b")
            .expect("valid regex")
    })
}

/// Parse Java source code into a [`SourceUnit`]
pub fn parse_source(source: &str, path: &Path) -> Result<SourceUnit, ParseError> {
    let mut parser = Parser::new();
    parser
        .set_language(&tree_sitter_java::LANGUAGE.into())
        .map_err(|e| ParseError::new(path, 1, 1, format!("failed to load Java grammar: {}", e)))?;

    let tree = parser
        .parse(source, None)
        .ok_or_else(|| ParseError::new(path, 1, 1, "parser produced no syntax tree"))?;

    let root = tree.root_node();
    if root.has_error() {
        return Err(syntax_error(root, source.as_bytes(), path));
    }

    let lowering = Lowering::new(source.as_bytes());
    let types = lowering.types_in(root, None);
    if let Some(at) = lowering.too_deep.get() {
        return Err(ParseError::new(
            path,
            at.line_start,
            at.column_start,
            format!("nesting deeper than {} levels", MAX_NESTING),
        ));
    }

    Ok(SourceUnit {
        path: path.to_path_buf(),
        language: Language::Java,
        types,
    })
}

fn syntax_error(root: Node, src: &[u8], path: &Path) -> ParseError {
    let Some(node) = first_error(root) else {
        return ParseError::new(path, 1, 1, "syntax error");
    };
    let pos = node.start_position();
    let message = if node.is_missing() {
        format!("missing `{}`", node.kind())
    } else {
        let text = node.utf8_text(src).unwrap_or("");
        let snippet: String = text.split_whitespace().next().unwrap_or("").chars().take(24).collect();
        if snippet.is_empty() {
            "syntax error".to_string()
        } else {
            format!("syntax error near `{}`", snippet)
        }
    };
    ParseError::new(path, pos.row as u32 + 1, pos.column as u32 + 1, message)
}

/// Depth-first search for the first ERROR or MISSING node
fn first_error(node: Node<'_>) -> Option<Node<'_>> {
    if node.is_error() || node.is_missing() {
        return Some(node);
    }
    if !node.has_error() {
        return None;
    }
    let mut cursor = node.walk();
    let children: Vec<Node> = node.children(&mut cursor).collect();
    children.into_iter().find_map(first_error)
}

fn is_comment(node: &Node) -> bool {
    matches!(node.kind(), "line_comment" | "block_comment")
}

/// Named, non-comment children
fn named(node: Node<'_>) -> Vec<Node<'_>> {
    let mut cursor = node.walk();
    let children: Vec<Node> = node
        .named_children(&mut cursor)
        .filter(|c| !is_comment(c))
        .collect();
    children
}

fn field_all<'t>(node: Node<'t>, field: &str) -> Vec<Node<'t>> {
    let mut cursor = node.walk();
    let children: Vec<Node> = node.children_by_field_name(field, &mut cursor).collect();
    children
}

fn span(node: Node) -> Span {
    let start = node.start_position();
    let end = node.end_position();
    Span::new(
        start.row as u32 + 1,
        start.column as u32 + 1,
        end.row as u32 + 1,
        (end.column as u32).max(1),
    )
}

/// A class body being lowered. Local and anonymous classes found inside its
/// methods are parked here and become nested types of it.
struct Scope {
    name: String,
    anonymous: usize,
    locals: Vec<TypeDecl>,
}

struct Lowering<'s> {
    src: &'s [u8],
    depth: Cell<usize>,
    /// Where nesting first exceeded [`MAX_NESTING`]
    too_deep: Cell<Option<Span>>,
    scopes: RefCell<Vec<Scope>>,
}

impl<'s> Lowering<'s> {
    fn new(src: &'s [u8]) -> Self {
        Self {
            src,
            depth: Cell::new(0),
            too_deep: Cell::new(None),
            scopes: RefCell::new(Vec::new()),
        }
    }

    /// Enter one nesting level; false once the limit is hit
    fn descend(&self, node: Node) -> bool {
        if self.depth.get() >= MAX_NESTING {
            if self.too_deep.get().is_none() {
                self.too_deep.set(Some(span(node)));
            }
            return false;
        }
        self.depth.set(self.depth.get() + 1);
        true
    }

    fn ascend(&self) {
        self.depth.set(self.depth.get().saturating_sub(1));
    }

    fn text(&self, node: Node) -> &str {
        node.utf8_text(self.src).unwrap_or("")
    }

    /// Source text with whitespace runs collapsed
    fn normalized(&self, node: Node) -> String {
        self.text(node).split_whitespace().collect::<Vec<_>>().join(" ")
    }

    fn type_ref(&self, node: Option<Node>) -> TypeRef {
        match node {
            Some(n) => TypeRef::parse(self.text(n)),
            None => TypeRef::parse("var"),
        }
    }

    // ---- declarations ----

    fn types_in(&self, node: Node, outer: Option<&str>) -> Vec<TypeDecl> {
        named(node)
            .into_iter()
            .filter_map(|child| self.lower_type(child, outer))
            .collect()
    }

    fn lower_type(&self, node: Node, outer: Option<&str>) -> Option<TypeDecl> {
        let kind = match node.kind() {
            "class_declaration" => TypeKind::Class,
            "interface_declaration" => TypeKind::Interface,
            "enum_declaration" => TypeKind::Enum,
            "record_declaration" => TypeKind::Record,
            _ => return None,
        };
        let name = self.text(node.child_by_field_name("name")?);
        let name = match outer {
            Some(outer) => format!("{}.{}", outer, name),
            None => name.to_string(),
        };
        Some(self.lower_class(node, name, kind, node.child_by_field_name("body")))
    }

    /// Lower a class body into a [`TypeDecl`] named `name`
    fn lower_class(&self, node: Node, name: String, kind: TypeKind, body: Option<Node>) -> TypeDecl {
        let mut functions = Vec::new();
        let mut nested = Vec::new();
        if let Some(body) = body {
            if self.descend(body) {
                self.scopes.borrow_mut().push(Scope {
                    name: name.clone(),
                    anonymous: 0,
                    locals: Vec::new(),
                });
                self.lower_members(body, &name, &mut functions, &mut nested);
                if let Some(scope) = self.scopes.borrow_mut().pop() {
                    nested.extend(scope.locals);
                }
                self.ascend();
            }
        }

        TypeDecl {
            name,
            kind,
            span: span(node),
            functions,
            nested,
        }
    }

    /// Lower a class declared inside a method body and park it on the
    /// enclosing scope
    fn lower_local_type(&self, node: Node) {
        let owner = self.scopes.borrow().last().map(|s| s.name.clone());
        if let Some(decl) = self.lower_type(node, owner.as_deref()) {
            self.park(decl);
        }
    }

    /// Lower the body of `new T() { ... }`; named `Outer$N` in source order
    fn lower_anonymous(&self, node: Node, body: Node) {
        let name = {
            let mut scopes = self.scopes.borrow_mut();
            let Some(scope) = scopes.last_mut() else {
                return;
            };
            scope.anonymous += 1;
            format!("{}${}", scope.name, scope.anonymous)
        };
        let decl = self.lower_class(node, name, TypeKind::Anonymous, Some(body));
        self.park(decl);
    }

    fn park(&self, decl: TypeDecl) {
        if let Some(scope) = self.scopes.borrow_mut().last_mut() {
            scope.locals.push(decl);
        }
    }

    fn lower_members(
        &self,
        body: Node,
        owner: &str,
        functions: &mut Vec<FunctionDecl>,
        nested: &mut Vec<TypeDecl>,
    ) {
        for member in named(body) {
            match member.kind() {
                "method_declaration"
                | "constructor_declaration"
                | "compact_constructor_declaration" => {
                    if let Some(function) = self.lower_function(member, owner) {
                        functions.push(function);
                    }
                }
                // enum constants are followed by an ordinary member list
                "enum_body_declarations" => self.lower_members(member, owner, functions, nested),
                "enum_constant" => {
                    let (Some(name), Some(body)) = (
                        member.child_by_field_name("name"),
                        member.child_by_field_name("body"),
                    ) else {
                        continue;
                    };
                    let name = format!("{}.{}", owner, self.text(name));
                    nested.push(self.lower_class(member, name, TypeKind::Anonymous, Some(body)));
                }
                // only anonymous classes in initializers are of interest
                "field_declaration" => {
                    for declarator in field_all(member, "declarator") {
                        if let Some(value) = declarator.child_by_field_name("value") {
                            self.lower_expr(value);
                        }
                    }
                }
                "static_initializer" => {
                    for block in named(member).into_iter().filter(|c| c.kind() == "block") {
                        self.lower_block(block);
                    }
                }
                "block" => {
                    self.lower_block(member);
                }
                _ => {
                    if let Some(decl) = self.lower_type(member, Some(owner)) {
                        nested.push(decl);
                    }
                }
            }
        }
    }

    fn lower_function(&self, node: Node, owner: &str) -> Option<FunctionDecl> {
        let name_node = node.child_by_field_name("name")?;
        let return_type = if node.kind() == "method_declaration" {
            Some(self.type_ref(node.child_by_field_name("type")))
        } else {
            None
        };

        let parameters = node
            .child_by_field_name("parameters")
            .map(|p| self.lower_parameters(p))
            .unwrap_or_default();
        let body = node.child_by_field_name("body").map(|b| self.lower_block(b));

        let doc_comment = extract_doc_comment(&node, self.src);
        let annotations = self.annotations(node);
        let documented_nullable =
            documents_nullable(&annotations, doc_comment.as_deref(), return_type.as_ref());

        Some(FunctionDecl {
            name: self.text(name_node).to_string(),
            owner: owner.to_string(),
            return_type,
            parameters,
            body,
            documented_nullable,
            doc_comment,
            annotations,
            span: span(node),
            name_span: span(name_node),
        })
    }

    fn lower_parameters(&self, node: Node) -> Vec<Parameter> {
        let mut params = Vec::new();
        for child in named(node) {
            let (name, ty) = match child.kind() {
                "formal_parameter" => {
                    let Some(name) = child.child_by_field_name("name") else {
                        continue;
                    };
                    let mut ty = child
                        .child_by_field_name("type")
                        .map(|t| self.text(t).to_string())
                        .unwrap_or_default();
                    if let Some(dims) = child.child_by_field_name("dimensions") {
                        ty.push_str(self.text(dims));
                    }
                    (self.text(name).to_string(), TypeRef::parse(&ty))
                }
                "spread_parameter" => {
                    let parts = named(child);
                    let Some(name) = parts
                        .iter()
                        .find(|p| p.kind() == "variable_declarator")
                        .and_then(|d| d.child_by_field_name("name"))
                    else {
                        continue;
                    };
                    let ty = parts
                        .iter()
                        .find(|p| !matches!(p.kind(), "modifiers" | "variable_declarator"))
                        .map(|t| self.text(*t))
                        .unwrap_or("Object");
                    (self.text(name).to_string(), TypeRef::parse(&format!("{}...", ty)))
                }
                _ => continue,
            };
            params.push(Parameter {
                name,
                ty,
                position: params.len(),
                span: span(child),
            });
        }
        params
    }

    fn annotations(&self, node: Node) -> Vec<String> {
        let mut annotations = Vec::new();
        for child in named(node) {
            if child.kind() != "modifiers" {
                continue;
            }
            for modifier in named(child) {
                if matches!(modifier.kind(), "marker_annotation" | "annotation") {
                    annotations.push(self.normalized(modifier));
                }
            }
        }
        annotations
    }

    // ---- statements ----

    fn lower_block(&self, node: Node) -> Block {
        let mut statements = Vec::new();
        for child in named(node) {
            self.lower_statement_into(child, &mut statements);
        }
        Block {
            statements,
            span: span(node),
        }
    }

    /// Lower a statement position that may or may not be a braced block
    fn as_block(&self, node: Node) -> Block {
        if node.kind() == "block" {
            return self.lower_block(node);
        }
        let mut statements = Vec::new();
        self.lower_statement_into(node, &mut statements);
        Block {
            statements,
            span: span(node),
        }
    }

    fn first_expr(&self, node: Node) -> Option<Expr> {
        named(node).into_iter().next().map(|n| self.lower_expr(n))
    }

    fn lower_statement_into(&self, node: Node, out: &mut Vec<Statement>) {
        if !self.descend(node) {
            return;
        }
        self.lower_statement(node, out);
        self.ascend();
    }

    fn lower_statement(&self, node: Node, out: &mut Vec<Statement>) {
        let sp = span(node);
        match node.kind() {
            "line_comment" | "block_comment" => {}
            "local_variable_declaration" => self.lower_local_vars(node, out),
            "expression_statement" => match self.first_expr(node) {
                Some(expr) => out.push(Statement::Expr(expr)),
                None => out.push(Statement::Other {
                    text: self.normalized(node),
                    span: sp,
                }),
            },
            "explicit_constructor_invocation" => {
                let selector = node
                    .child_by_field_name("constructor")
                    .map(|c| self.text(c).to_string())
                    .unwrap_or_else(|| "this".to_string());
                let args = node
                    .child_by_field_name("arguments")
                    .map(|a| self.lower_args(a))
                    .unwrap_or_default();
                out.push(Statement::Expr(Expr::new(
                    ExprKind::MethodCall {
                        receiver: None,
                        selector,
                        args,
                    },
                    sp,
                )));
            }
            "return_statement" => out.push(Statement::Return {
                value: self.first_expr(node),
                span: sp,
            }),
            "throw_statement" => match self.first_expr(node) {
                Some(value) => out.push(Statement::Throw { value, span: sp }),
                None => out.push(Statement::Other {
                    text: self.normalized(node),
                    span: sp,
                }),
            },
            "assert_statement" => match self.first_expr(node) {
                Some(condition) => out.push(Statement::Assert {
                    condition,
                    span: sp,
                }),
                None => out.push(Statement::Other {
                    text: self.normalized(node),
                    span: sp,
                }),
            },
            "if_statement" => {
                let condition = self.required_expr(node, "condition");
                let then_block = node
                    .child_by_field_name("consequence")
                    .map(|c| self.as_block(c))
                    .unwrap_or_default();
                let else_block = node
                    .child_by_field_name("alternative")
                    .map(|a| self.as_block(a));
                out.push(Statement::If {
                    condition,
                    then_block,
                    else_block,
                    span: sp,
                });
            }
            "enhanced_for_statement" => {
                let variable = node
                    .child_by_field_name("name")
                    .map(|n| self.text(n).to_string())
                    .unwrap_or_default();
                let iterable = self.required_expr(node, "value");
                self.push_loop(node, LoopKind::ForEach { variable, iterable }, out);
            }
            "for_statement" => {
                let mut init = Vec::new();
                for child in field_all(node, "init") {
                    if child.kind() == "local_variable_declaration" {
                        self.lower_local_vars(child, &mut init);
                    } else {
                        init.push(Statement::Expr(self.lower_expr(child)));
                    }
                }
                let condition = node
                    .child_by_field_name("condition")
                    .map(|c| self.lower_expr(c));
                let update = field_all(node, "update")
                    .into_iter()
                    .map(|u| self.lower_expr(u))
                    .collect();
                self.push_loop(
                    node,
                    LoopKind::For {
                        init,
                        condition,
                        update,
                    },
                    out,
                );
            }
            "while_statement" => {
                let condition = self.required_expr(node, "condition");
                self.push_loop(node, LoopKind::While { condition }, out);
            }
            "do_statement" => {
                let condition = self.required_expr(node, "condition");
                self.push_loop(node, LoopKind::DoWhile { condition }, out);
            }
            "block" => out.push(Statement::Block(self.lower_block(node))),
            "synchronized_statement" => {
                if let Some(body) = node.child_by_field_name("body") {
                    out.push(Statement::Block(self.lower_block(body)));
                }
            }
            "labeled_statement" => {
                if let Some(inner) = named(node).into_iter().last() {
                    self.lower_statement_into(inner, out);
                }
            }
            "try_statement" | "try_with_resources_statement" => {
                out.push(self.lower_try(node));
            }
            "switch_expression" | "switch_statement" => {
                let subject = self.required_expr(node, "condition");
                let arms = node
                    .child_by_field_name("body")
                    .map(|b| self.lower_switch_arms(b))
                    .unwrap_or_default();
                out.push(Statement::Switch {
                    subject,
                    arms,
                    span: sp,
                });
            }
            "break_statement" | "continue_statement" | "yield_statement" => {
                out.push(Statement::Jump {
                    text: self.normalized(node),
                    span: sp,
                });
            }
            kind if kind.ends_with("_declaration") => {
                self.lower_local_type(node);
                out.push(Statement::Other {
                    text: format!("<{}>", kind),
                    span: sp,
                });
            }
            _ => out.push(Statement::Other {
                text: self.normalized(node),
                span: sp,
            }),
        }
    }

    fn lower_local_vars(&self, node: Node, out: &mut Vec<Statement>) {
        let base_ty = node
            .child_by_field_name("type")
            .map(|t| self.text(t).to_string())
            .unwrap_or_else(|| "var".to_string());
        for declarator in field_all(node, "declarator") {
            let Some(name) = declarator.child_by_field_name("name") else {
                continue;
            };
            let mut ty = base_ty.clone();
            if let Some(dims) = declarator.child_by_field_name("dimensions") {
                ty.push_str(self.text(dims));
            }
            out.push(Statement::LocalVar {
                name: self.text(name).to_string(),
                ty: TypeRef::parse(&ty),
                init: declarator
                    .child_by_field_name("value")
                    .map(|v| self.lower_expr(v)),
                span: span(node),
            });
        }
    }

    fn push_loop(&self, node: Node, kind: LoopKind, out: &mut Vec<Statement>) {
        let body = node
            .child_by_field_name("body")
            .map(|b| self.as_block(b))
            .unwrap_or_default();
        out.push(Statement::Loop {
            kind: Box::new(kind),
            body,
            span: span(node),
        });
    }

    fn lower_try(&self, node: Node) -> Statement {
        let mut body = Block {
            statements: Vec::new(),
            span: span(node),
        };
        if let Some(resources) = node.child_by_field_name("resources") {
            for resource in named(resources) {
                match resource.child_by_field_name("name") {
                    Some(name) => body.statements.push(Statement::LocalVar {
                        name: self.text(name).to_string(),
                        ty: self.type_ref(resource.child_by_field_name("type")),
                        init: resource
                            .child_by_field_name("value")
                            .map(|v| self.lower_expr(v)),
                        span: span(resource),
                    }),
                    None => body
                        .statements
                        .push(Statement::Expr(self.lower_expr(resource))),
                }
            }
        }
        if let Some(block) = node.child_by_field_name("body") {
            let inner = self.lower_block(block);
            body.statements.extend(inner.statements);
            body.span = inner.span;
        }

        let mut handlers = Vec::new();
        let mut finally = None;
        for child in named(node) {
            match child.kind() {
                "catch_clause" => {
                    if let Some(b) = child.child_by_field_name("body") {
                        handlers.push(self.lower_block(b));
                    }
                }
                "finally_clause" => {
                    finally = named(child)
                        .into_iter()
                        .find(|c| c.kind() == "block")
                        .map(|b| self.lower_block(b));
                }
                _ => {}
            }
        }

        Statement::Try {
            body,
            handlers,
            finally,
            span: span(node),
        }
    }

    fn lower_switch_arms(&self, body: Node) -> Vec<Block> {
        let mut arms = Vec::new();
        for group in named(body) {
            if !matches!(group.kind(), "switch_block_statement_group" | "switch_rule") {
                continue;
            }
            let mut statements = Vec::new();
            for child in named(group) {
                match child.kind() {
                    "switch_label" => {}
                    "expression_statement" | "block" | "throw_statement" => {
                        self.lower_statement_into(child, &mut statements)
                    }
                    _ if group.kind() == "switch_rule" => {
                        statements.push(Statement::Expr(self.lower_expr(child)))
                    }
                    _ => self.lower_statement_into(child, &mut statements),
                }
            }
            arms.push(Block {
                statements,
                span: span(group),
            });
        }
        arms
    }

    // ---- expressions ----

    fn required_expr(&self, node: Node, field: &str) -> Expr {
        match node.child_by_field_name(field) {
            Some(child) => self.lower_expr(child),
            None => Expr::new(
                ExprKind::Unknown {
                    text: String::new(),
                    children: Vec::new(),
                },
                span(node),
            ),
        }
    }

    fn boxed(&self, node: Node, field: &str) -> Box<Expr> {
        Box::new(self.required_expr(node, field))
    }

    fn lower_args(&self, node: Node) -> Vec<Expr> {
        named(node).into_iter().map(|a| self.lower_expr(a)).collect()
    }

    fn operator(&self, node: Node) -> String {
        node.child_by_field_name("operator")
            .map(|o| self.text(o).to_string())
            .unwrap_or_default()
    }

    fn lower_expr(&self, node: Node) -> Expr {
        if !self.descend(node) {
            return Expr::new(
                ExprKind::Unknown {
                    text: String::new(),
                    children: Vec::new(),
                },
                span(node),
            );
        }
        let expr = self.lower_expr_kind(node);
        self.ascend();
        expr
    }

    fn lower_expr_kind(&self, node: Node) -> Expr {
        let sp = span(node);
        let kind = match node.kind() {
            "parenthesized_expression" => {
                return match named(node).into_iter().next() {
                    Some(inner) => self.lower_expr(inner),
                    None => self.unknown(node),
                };
            }
            "null_literal" => ExprKind::Literal(Literal::Null),
            "true" => ExprKind::Literal(Literal::Bool(true)),
            "false" => ExprKind::Literal(Literal::Bool(false)),
            "decimal_integer_literal"
            | "hex_integer_literal"
            | "octal_integer_literal"
            | "binary_integer_literal"
            | "decimal_floating_point_literal"
            | "hex_floating_point_literal" => {
                ExprKind::Literal(Literal::Number(self.text(node).to_string()))
            }
            "string_literal" | "text_block" => {
                ExprKind::Literal(Literal::Str(self.text(node).to_string()))
            }
            "character_literal" => ExprKind::Literal(Literal::Char(self.text(node).to_string())),
            "identifier" | "this" | "super" => ExprKind::VariableRef(self.text(node).to_string()),
            "field_access" => ExprKind::FieldAccess {
                receiver: self.boxed(node, "object"),
                field: node
                    .child_by_field_name("field")
                    .map(|f| self.text(f).to_string())
                    .unwrap_or_default(),
            },
            "method_invocation" => ExprKind::MethodCall {
                receiver: node
                    .child_by_field_name("object")
                    .map(|o| Box::new(self.lower_expr(o))),
                selector: node
                    .child_by_field_name("name")
                    .map(|n| self.text(n).to_string())
                    .unwrap_or_default(),
                args: node
                    .child_by_field_name("arguments")
                    .map(|a| self.lower_args(a))
                    .unwrap_or_default(),
            },
            "object_creation_expression" => {
                let body = named(node).into_iter().find(|c| c.kind() == "class_body");
                if let Some(body) = body {
                    self.lower_anonymous(node, body);
                }
                ExprKind::ObjectCreation {
                    ty: self.type_ref(node.child_by_field_name("type")),
                    args: node
                        .child_by_field_name("arguments")
                        .map(|a| self.lower_args(a))
                        .unwrap_or_default(),
                    has_body: body.is_some(),
                }
            }
            "binary_expression" => ExprKind::BinaryOp {
                op: self.operator(node),
                lhs: self.boxed(node, "left"),
                rhs: self.boxed(node, "right"),
            },
            "ternary_expression" => ExprKind::Conditional {
                condition: self.boxed(node, "condition"),
                then_expr: self.boxed(node, "consequence"),
                else_expr: self.boxed(node, "alternative"),
            },
            "unary_expression" => ExprKind::Unary {
                op: self.operator(node),
                operand: self.boxed(node, "operand"),
            },
            "update_expression" => {
                let mut cursor = node.walk();
                let parts: Vec<Node> = node.children(&mut cursor).collect();
                let op = parts
                    .iter()
                    .find(|p| !p.is_named())
                    .map(|p| self.text(*p).to_string())
                    .unwrap_or_default();
                match parts.iter().find(|p| p.is_named() && !is_comment(p)) {
                    Some(operand) => ExprKind::Unary {
                        op,
                        operand: Box::new(self.lower_expr(*operand)),
                    },
                    None => return self.unknown(node),
                }
            }
            "assignment_expression" => ExprKind::Assignment {
                target: self.boxed(node, "left"),
                op: self.operator(node),
                value: self.boxed(node, "right"),
            },
            "cast_expression" => ExprKind::Cast {
                ty: self.type_ref(node.child_by_field_name("type")),
                value: self.boxed(node, "value"),
            },
            "array_access" => ExprKind::ArrayAccess {
                array: self.boxed(node, "array"),
                index: self.boxed(node, "index"),
            },
            "lambda_expression" | "method_reference" => ExprKind::Opaque(self.normalized(node)),
            "switch_expression" => ExprKind::Unknown {
                text: self.normalized(node),
                children: vec![self.required_expr(node, "condition")],
            },
            _ => return self.unknown(node),
        };
        Expr::new(kind, sp)
    }

    fn unknown(&self, node: Node) -> Expr {
        let children = named(node)
            .into_iter()
            .filter(|c| !matches!(c.kind(), "class_body" | "block" | "switch_block"))
            .map(|c| self.lower_expr(c))
            .collect();
        Expr::new(
            ExprKind::Unknown {
                text: self.normalized(node),
                children,
            },
            span(node),
        )
    }
}

/// Extract the Javadoc comment (`/** ... */`) immediately before a declaration.
///
/// tree-sitter keeps comments as siblings, so the doc comment is either the
/// previous sibling or sits inside the leading `modifiers` node after an
/// annotation.
fn extract_doc_comment(node: &Node, source: &[u8]) -> Option<String> {
    let mut candidates = Vec::new();
    if let Some(prev) = node.prev_named_sibling() {
        candidates.push(prev);
    }
    if let Some(modifiers) = named(*node).into_iter().find(|c| c.kind() == "modifiers") {
        let mut cursor = modifiers.walk();
        candidates.extend(
            modifiers
                .named_children(&mut cursor)
                .filter(|c| c.kind() == "block_comment"),
        );
    }

    candidates.into_iter().find_map(|candidate| {
        if candidate.kind() != "block_comment" {
            return None;
        }
        let text = candidate.utf8_text(source).ok()?;
        if !text.starts_with("/**") {
            return None;
        }
        let doc = text
            .trim_start_matches("/**")
            .trim_end_matches("*/")
            .lines()
            .map(|line| {
                let trimmed = line.trim();
                trimmed
                    .strip_prefix("* ")
                    .unwrap_or(trimmed.strip_prefix('*').unwrap_or(trimmed))
            })
            .collect::<Vec<_>>()
            .join("\n")
            .trim()
            .to_string();
        (!doc.is_empty()).then_some(doc)
    })
}

/// Simple name of an annotation (`@javax.annotation.Nullable` -> `Nullable`)
fn annotation_name(text: &str) -> &str {
    let head = text.trim_start_matches('@');
    let head = head.split('(').next().unwrap_or(head).trim();
    head.rsplit('.').next().unwrap_or(head)
}

/// Whether the declaration states that null is an intentional result
fn documents_nullable(
    annotations: &[String],
    doc: Option<&str>,
    return_type: Option<&TypeRef>,
) -> bool {
    if return_type.is_some_and(|t| t.class == TypeClass::OptionalLike) {
        return true;
    }
    if annotations
        .iter()
        .any(|a| NULLABLE_ANNOTATIONS.contains(&annotation_name(a)))
    {
        return true;
    }
    doc.is_some_and(doc_admits_null)
}

/// Whether the main description or the `@return` clause says null is a
/// valid result. `@param`, `@throws` and other block tags are ignored.
fn doc_admits_null(doc: &str) -> bool {
    let mut contract = String::new();
    let mut keep = true;
    for line in doc.lines() {
        let line = line.trim();
        if line.starts_with('@') {
            keep = line.starts_with("@return");
        }
        if keep {
            contract.push_str(line);
            contract.push('\n');
        }
    }

    contract
        .split(['.', ';', ','])
        .any(|clause| {
            nullable_doc_regex()
                .find_iter(clause)
                .any(|m| !negation_regex().is_match(&clause[..m.start()]))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn parse(source: &str) -> SourceUnit {
        parse_source(source, &PathBuf::from("Test.java")).expect("should parse Java source")
    }

    fn function<'a>(unit: &'a SourceUnit, name: &str) -> &'a FunctionDecl {
        unit.functions()
            .into_iter()
            .find(|f| f.name == name)
            .unwrap_or_else(|| panic!("function {} not found", name))
    }

    #[test]
    fn test_parse_simple_class() {
        let unit = parse(
            r#"
public class HelloWorld {
    public static void main(String[] args) {
        System.out.println("Hello, World!");
    }
}
"#,
        );
        assert_eq!(unit.types.len(), 1);
        assert_eq!(unit.types[0].name, "HelloWorld");
        assert_eq!(unit.types[0].kind, TypeKind::Class);

        let main = function(&unit, "main");
        assert_eq!(main.owner, "HelloWorld");
        assert_eq!(main.return_type.as_ref().map(|t| t.class), Some(TypeClass::Void));
        assert_eq!(main.parameters.len(), 1);
        assert_eq!(main.parameters[0].ty.class, TypeClass::Container);
        assert_eq!(main.span.line_start, 3);
        assert_eq!(main.name_span.line_start, 3);

        let body = main.body.as_ref().expect("main has a body");
        assert_eq!(body.statements.len(), 1);
        match &body.statements[0] {
            Statement::Expr(expr) => {
                assert_eq!(expr.canonical(), "System.out.println(\"Hello, World!\")")
            }
            other => panic!("expected expression statement, got {:?}", other),
        }
    }

    #[test]
    fn test_parameters_and_constructors() {
        let unit = parse(
            r#"
class Report {
    Report(String title, boolean draft) {
        super();
    }
    void render(boolean verbose, int depth, Object... extra) {}
    abstract static class Inner {
        abstract Boolean ready();
    }
}
"#,
        );
        let ctor = function(&unit, "Report");
        assert!(ctor.is_constructor());
        assert!(ctor.parameters[1].is_boolean());

        let render = function(&unit, "render");
        let names: Vec<&str> = render.parameters.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["verbose", "depth", "extra"]);
        assert_eq!(render.parameters[2].position, 2);
        assert_eq!(render.parameters[2].ty.class, TypeClass::Container);

        let types = unit.all_types();
        assert_eq!(types.len(), 2);
        assert_eq!(types[1].name, "Report.Inner");
        assert_eq!(types[1].simple_name(), "Inner");
        let ready = function(&unit, "ready");
        assert!(ready.body.is_none());
        assert_eq!(ready.owner, "Report.Inner");
    }

    #[test]
    fn test_enum_and_interface_members() {
        let unit = parse(
            r#"
enum Direction {
    NORTH, SOUTH;
    Direction opposite() { return this == NORTH ? SOUTH : NORTH; }
}
interface Shape {
    double area();
}
"#,
        );
        assert_eq!(unit.types[0].kind, TypeKind::Enum);
        assert_eq!(unit.types[0].functions.len(), 1);
        assert_eq!(unit.types[1].kind, TypeKind::Interface);
        assert!(function(&unit, "area").body.is_none());
    }

    #[test]
    fn test_local_anonymous_and_enum_constant_bodies_become_types() {
        let unit = parse(
            r#"
class Outer {
    private final Runnable hook = new Runnable() {
        public void run() {}
    };
    Supplier<String> make() {
        class Local {
            String name() { return "local"; }
        }
        return new Supplier<String>() {
            public String get() { return null; }
        };
    }
}
enum Op {
    PLUS {
        int apply(int a, int b) { return a + b; }
    },
    MINUS;
}
"#,
        );
        let names: Vec<(&str, TypeKind)> = unit
            .all_types()
            .into_iter()
            .map(|t| (t.name.as_str(), t.kind))
            .collect();
        assert_eq!(
            names,
            vec![
                ("Outer", TypeKind::Class),
                ("Outer$1", TypeKind::Anonymous),
                ("Outer.Local", TypeKind::Class),
                ("Outer$2", TypeKind::Anonymous),
                ("Op", TypeKind::Enum),
                ("Op.PLUS", TypeKind::Anonymous),
            ]
        );
        assert_eq!(function(&unit, "run").owner, "Outer$1");
        assert_eq!(function(&unit, "name").owner, "Outer.Local");
        assert_eq!(function(&unit, "get").owner, "Outer$2");
        assert_eq!(function(&unit, "apply").owner, "Op.PLUS");

        // the anonymous body is not part of the enclosing method
        let make = function(&unit, "make").body.as_ref().expect("body");
        let mut returns = 0;
        make.walk(&mut |stmt| returns += usize::from(matches!(stmt, Statement::Return { .. })));
        assert_eq!(returns, 1);
    }

    #[test]
    fn test_documented_nullable_sources() {
        let unit = parse(
            r#"
class Lookup {
    /**
     * Find a user.
     * @return the user, or null if none matches
     */
    User byName(String name) { return null; }

    @Nullable
    User byId(long id) { return null; }

    Optional<User> first() { return null; }

    /** Find a user by email. */
    User byEmail(String email) { return null; }
}
"#,
        );
        assert!(function(&unit, "byName").documented_nullable);
        assert!(function(&unit, "byName")
            .doc_comment
            .as_deref()
            .is_some_and(|d| d.contains("Find a user.")));
        assert!(function(&unit, "byId").documented_nullable);
        assert!(function(&unit, "byId").annotations.iter().any(|a| a == "@Nullable"));
        assert!(function(&unit, "first").documented_nullable);
        assert!(!function(&unit, "byEmail").documented_nullable);
    }

    #[test]
    fn test_non_null_promises_are_not_nullable_docs() {
        let unit = parse(
            r#"
class Lookup {
    /**
     * Find a user.
     * @return the user, never null
     */
    User byName(String name) { return null; }

    /** Never returns null. */
    User current() { return null; }

    /**
     * @param hint a lookup hint, or null for none
     * @return the user
     */
    User byHint(String hint) { return null; }

    /** Returns a non-nullable view; must not return null. */
    User view() { return null; }

    /** Returns null if not found. */
    User byId(long id) { return null; }
}
"#,
        );
        assert!(!function(&unit, "byName").documented_nullable);
        assert!(!function(&unit, "current").documented_nullable);
        assert!(!function(&unit, "byHint").documented_nullable);
        assert!(!function(&unit, "view").documented_nullable);
        assert!(function(&unit, "byId").documented_nullable);
    }

    #[test]
    fn test_statements_are_lowered() {
        let unit = parse(
            r#"
class Loops {
    int run(List<Item> items, boolean flag) {
        int total = 0, count;
        for (Item item : items) {
            total += item.size();
        }
        for (int i = 0; i < 10; i++) { total++; }
        while (total > 0) total--;
        do { total = flag ? 1 : 2; } while (false);
        try (Reader r = open()) { r.read(); } catch (IOException e) { throw new IllegalStateException(e); } finally { close(); }
        switch (total) { case 1: return 1; default: break; }
        Runnable task = () -> { return; };
        return total;
    }
}
"#,
        );
        let body = function(&unit, "run").body.as_ref().expect("body");
        let kinds: Vec<&str> = body
            .statements
            .iter()
            .map(|s| match s {
                Statement::LocalVar { .. } => "local",
                Statement::Loop { kind, .. } => match kind.as_ref() {
                    LoopKind::ForEach { .. } => "foreach",
                    LoopKind::For { .. } => "for",
                    LoopKind::While { .. } => "while",
                    LoopKind::DoWhile { .. } => "do",
                },
                Statement::Try { .. } => "try",
                Statement::Switch { .. } => "switch",
                Statement::Return { .. } => "return",
                _ => "other",
            })
            .collect();
        assert_eq!(
            kinds,
            vec!["local", "local", "foreach", "for", "while", "do", "try", "switch", "local", "return"]
        );

        match &body.statements[2] {
            Statement::Loop { kind, body, .. } => {
                match kind.as_ref() {
                    LoopKind::ForEach { variable, .. } => assert_eq!(variable, "item"),
                    other => panic!("unexpected loop {:?}", other),
                }
                assert_eq!(body.statements.len(), 1);
            }
            other => panic!("expected loop, got {:?}", other),
        }

        match &body.statements[8] {
            Statement::LocalVar { init: Some(init), .. } => {
                assert!(matches!(init.kind, ExprKind::Opaque(_)));
            }
            other => panic!("expected lambda local, got {:?}", other),
        }

        match &body.statements[6] {
            Statement::Try {
                body,
                handlers,
                finally,
                ..
            } => {
                assert_eq!(body.statements.len(), 2);
                assert_eq!(handlers.len(), 1);
                assert!(finally.is_some());
            }
            other => panic!("expected try, got {:?}", other),
        }
    }

    #[test]
    fn test_expressions_are_lowered() {
        let unit = parse(
            r#"
class Exprs {
    Object build(Config config) {
        Feedback fb = new Feedback();
        fb.setPhase((String) config.phase);
        return (null);
    }
}
"#,
        );
        let body = function(&unit, "build").body.as_ref().expect("body");
        match &body.statements[0] {
            Statement::LocalVar { name, ty, init: Some(init), .. } => {
                assert_eq!(name, "fb");
                assert_eq!(ty.base_name(), "Feedback");
                match &init.kind {
                    ExprKind::ObjectCreation { ty, args, has_body } => {
                        assert_eq!(ty.text, "Feedback");
                        assert!(args.is_empty());
                        assert!(!has_body);
                    }
                    other => panic!("expected object creation, got {:?}", other),
                }
            }
            other => panic!("expected local, got {:?}", other),
        }
        match &body.statements[1] {
            Statement::Expr(expr) => {
                assert_eq!(expr.canonical(), "fb.setPhase(((String) config.phase))");
                assert_eq!(expr.chain_root(), Some("fb"));
            }
            other => panic!("expected call, got {:?}", other),
        }
        match &body.statements[2] {
            Statement::Return { value: Some(v), .. } => assert!(v.is_null_literal()),
            other => panic!("expected return null, got {:?}", other),
        }
    }

    #[test]
    fn test_syntax_error_is_reported_with_position() {
        let err = parse_source(
            "class Broken {\n    void f( {\n}\n",
            &PathBuf::from("Broken.java"),
        )
        .expect_err("malformed source must fail");
        assert_eq!(err.file, PathBuf::from("Broken.java"));
        assert!(err.line >= 1);
        assert!(!err.message.is_empty());
    }
}
