//! Language-neutral structural tree
//!
//! Parsers lower their concrete syntax trees into these types; detectors
//! only ever see this model. The tree is fully owned (`Box`/`Vec`), so every
//! node has exactly one parent and the structure is finite and acyclic.

mod types;
mod visit;

pub use types::{TypeClass, TypeRef};

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Source range of a node (1-based lines and columns, end inclusive line)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct Span {
    pub line_start: u32,
    pub line_end: u32,
    pub column_start: u32,
    pub column_end: u32,
}

impl Span {
    pub fn new(line_start: u32, column_start: u32, line_end: u32, column_end: u32) -> Self {
        Self {
            line_start,
            line_end,
            column_start,
            column_end,
        }
    }

    pub fn point(line: u32, column: u32) -> Self {
        Self::new(line, column, line, column)
    }
}

/// Source languages the model builder understands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Java,
}

impl Language {
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext {
            "java" => Some(Language::Java),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Language::Java => "java",
        }
    }
}

/// One parsed source file. Immutable after construction.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceUnit {
    pub path: PathBuf,
    pub language: Language,
    pub types: Vec<TypeDecl>,
}

impl SourceUnit {
    /// All type declarations, nested ones included, in source order
    pub fn all_types(&self) -> Vec<&TypeDecl> {
        let mut out = Vec::new();
        for decl in &self.types {
            decl.collect_into(&mut out);
        }
        out
    }

    /// All functions (methods and constructors) in source order
    pub fn functions(&self) -> Vec<&FunctionDecl> {
        self.all_types()
            .into_iter()
            .flat_map(|t| t.functions.iter())
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeKind {
    Class,
    Interface,
    Enum,
    Record,
    /// Anonymous class body or enum constant body
    Anonymous,
}

/// Class-like declaration
#[derive(Debug, Clone, PartialEq)]
pub struct TypeDecl {
    /// Simple name, dotted with the enclosing type for nested declarations.
    /// Anonymous classes are named `Outer$N`, enum constant bodies
    /// `Enum.CONSTANT`.
    pub name: String,
    pub kind: TypeKind,
    pub span: Span,
    pub functions: Vec<FunctionDecl>,
    pub nested: Vec<TypeDecl>,
}

impl TypeDecl {
    fn collect_into<'a>(&'a self, out: &mut Vec<&'a TypeDecl>) {
        out.push(self);
        for nested in &self.nested {
            nested.collect_into(out);
        }
    }

    /// The last segment of a dotted nested name
    pub fn simple_name(&self) -> &str {
        self.name.rsplit('.').next().unwrap_or(&self.name)
    }
}

/// Method or constructor
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDecl {
    pub name: String,
    /// Name of the enclosing type
    pub owner: String,
    /// `None` for constructors
    pub return_type: Option<TypeRef>,
    pub parameters: Vec<Parameter>,
    /// `None` for abstract and interface methods
    pub body: Option<Block>,
    /// True when the declared contract says null is an intentional result
    pub documented_nullable: bool,
    pub doc_comment: Option<String>,
    pub annotations: Vec<String>,
    pub span: Span,
    pub name_span: Span,
}

impl FunctionDecl {
    pub fn is_constructor(&self) -> bool {
        self.return_type.is_none()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    pub name: String,
    pub ty: TypeRef,
    /// Zero-based ordinal position
    pub position: usize,
    pub span: Span,
}

impl Parameter {
    pub fn is_boolean(&self) -> bool {
        self.ty.class == TypeClass::Boolean
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Block {
    pub statements: Vec<Statement>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum LoopKind {
    /// `for (T item : items)`
    ForEach { variable: String, iterable: Expr },
    /// `for (init; condition; update)`
    For {
        init: Vec<Statement>,
        condition: Option<Expr>,
        update: Vec<Expr>,
    },
    While { condition: Expr },
    DoWhile { condition: Expr },
}

#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    LocalVar {
        name: String,
        ty: TypeRef,
        init: Option<Expr>,
        span: Span,
    },
    Expr(Expr),
    Return {
        value: Option<Expr>,
        span: Span,
    },
    If {
        condition: Expr,
        then_block: Block,
        else_block: Option<Block>,
        span: Span,
    },
    Loop {
        kind: Box<LoopKind>,
        body: Block,
        span: Span,
    },
    Block(Block),
    Switch {
        subject: Expr,
        arms: Vec<Block>,
        span: Span,
    },
    Try {
        body: Block,
        handlers: Vec<Block>,
        finally: Option<Block>,
        span: Span,
    },
    Throw {
        value: Expr,
        span: Span,
    },
    Assert {
        condition: Expr,
        span: Span,
    },
    /// `break` / `continue` / `yield`; `text` is the normalized source
    Jump {
        text: String,
        span: Span,
    },
    /// Anything the model does not describe (local classes, labels, ...)
    Other {
        text: String,
        span: Span,
    },
}

impl Statement {
    pub fn span(&self) -> Span {
        match self {
            Statement::Expr(expr) => expr.span,
            Statement::Block(block) => block.span,
            Statement::LocalVar { span, .. }
            | Statement::Return { span, .. }
            | Statement::If { span, .. }
            | Statement::Loop { span, .. }
            | Statement::Switch { span, .. }
            | Statement::Try { span, .. }
            | Statement::Throw { span, .. }
            | Statement::Assert { span, .. }
            | Statement::Jump { span, .. }
            | Statement::Other { span, .. } => *span,
        }
    }

    /// Whether control never falls through to the next statement
    pub fn terminates(&self) -> bool {
        matches!(
            self,
            Statement::Return { .. } | Statement::Throw { .. } | Statement::Jump { .. }
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Null,
    Bool(bool),
    Number(String),
    Str(String),
    Char(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub kind: ExprKind,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    Literal(Literal),
    /// Plain identifier; `this` and `super` are modelled as variables too
    VariableRef(String),
    FieldAccess {
        receiver: Box<Expr>,
        field: String,
    },
    MethodCall {
        receiver: Option<Box<Expr>>,
        selector: String,
        args: Vec<Expr>,
    },
    BinaryOp {
        op: String,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Conditional {
        condition: Box<Expr>,
        then_expr: Box<Expr>,
        else_expr: Box<Expr>,
    },
    /// `new T(args)`; `has_body` marks an anonymous class
    ObjectCreation {
        ty: TypeRef,
        args: Vec<Expr>,
        has_body: bool,
    },
    Assignment {
        target: Box<Expr>,
        op: String,
        value: Box<Expr>,
    },
    /// Prefix/postfix operators, `++` and `--` included
    Unary {
        op: String,
        operand: Box<Expr>,
    },
    Cast {
        ty: TypeRef,
        value: Box<Expr>,
    },
    ArrayAccess {
        array: Box<Expr>,
        index: Box<Expr>,
    },
    /// Lambda, method reference or anonymous class body; holds the
    /// normalized source text. Walks never descend into it.
    Opaque(String),
    /// Unmodelled expression; children are kept so walks still see them
    Unknown { text: String, children: Vec<Expr> },
}

impl Expr {
    pub fn new(kind: ExprKind, span: Span) -> Self {
        Self { kind, span }
    }

    pub fn is_null_literal(&self) -> bool {
        matches!(self.kind, ExprKind::Literal(Literal::Null))
    }

    pub fn as_variable(&self) -> Option<&str> {
        match &self.kind {
            ExprKind::VariableRef(name) => Some(name),
            _ => None,
        }
    }
}
