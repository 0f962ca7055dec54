//! Traversal helpers and span-insensitive structural rendering
//!
//! Structural equality between two subtrees is defined as equality of their
//! `canonical()` renderings, which ignore spans and formatting.

use super::{Block, Expr, ExprKind, Literal, LoopKind, Statement};

impl Expr {
    /// Direct subexpressions in evaluation order
    pub fn children(&self) -> Vec<&Expr> {
        match &self.kind {
            ExprKind::Literal(_) | ExprKind::VariableRef(_) | ExprKind::Opaque(_) => Vec::new(),
            ExprKind::FieldAccess { receiver, .. } => vec![receiver.as_ref()],
            ExprKind::MethodCall { receiver, args, .. } => {
                let mut out: Vec<&Expr> = receiver.iter().map(|r| r.as_ref()).collect();
                out.extend(args.iter());
                out
            }
            ExprKind::BinaryOp { lhs, rhs, .. } => vec![lhs.as_ref(), rhs.as_ref()],
            ExprKind::Conditional {
                condition,
                then_expr,
                else_expr,
            } => vec![condition.as_ref(), then_expr.as_ref(), else_expr.as_ref()],
            ExprKind::ObjectCreation { args, .. } => args.iter().collect(),
            ExprKind::Assignment { target, value, .. } => vec![target.as_ref(), value.as_ref()],
            ExprKind::Unary { operand, .. } => vec![operand.as_ref()],
            ExprKind::Cast { value, .. } => vec![value.as_ref()],
            ExprKind::ArrayAccess { array, index } => vec![array.as_ref(), index.as_ref()],
            ExprKind::Unknown { children, .. } => children.iter().collect(),
        }
    }

    /// Pre-order walk over this expression and all its descendants
    pub fn walk<'a>(&'a self, f: &mut dyn FnMut(&'a Expr)) {
        f(self);
        for child in self.children() {
            child.walk(f);
        }
    }

    /// Whether the variable `name` is read or written anywhere in this subtree
    pub fn references(&self, name: &str) -> bool {
        let mut found = false;
        self.walk(&mut |e| {
            if e.as_variable() == Some(name) {
                found = true;
            }
        });
        found
    }

    /// Like [`Expr::references`], but also finds the name as a token inside
    /// lambda and method reference text, whose captures are not modelled
    pub fn mentions(&self, name: &str) -> bool {
        let mut found = false;
        self.walk(&mut |e| match &e.kind {
            ExprKind::VariableRef(v) if v == name => found = true,
            ExprKind::Opaque(text) => found |= has_token(text, name),
            _ => {}
        });
        found
    }

    /// Strip casts around the value (`(Foo) null` -> `null`)
    pub fn without_casts(&self) -> &Expr {
        match &self.kind {
            ExprKind::Cast { value, .. } => value.without_casts(),
            _ => self,
        }
    }

    /// Name of the variable at the bottom of a call/field chain.
    ///
    /// `config.getEntities().getX()` is rooted at `config`; a call without a
    /// receiver has no root.
    pub fn chain_root(&self) -> Option<&str> {
        match &self.kind {
            ExprKind::VariableRef(name) => Some(name),
            ExprKind::FieldAccess { receiver, .. } => receiver.chain_root(),
            ExprKind::MethodCall {
                receiver: Some(receiver),
                ..
            } => receiver.chain_root(),
            _ => None,
        }
    }

    /// Number of call/field links between this expression and its root
    pub fn chain_depth(&self) -> usize {
        match &self.kind {
            ExprKind::FieldAccess { receiver, .. } => 1 + receiver.chain_depth(),
            ExprKind::MethodCall {
                receiver: Some(receiver),
                ..
            } => 1 + receiver.chain_depth(),
            ExprKind::MethodCall { receiver: None, .. } => 1,
            _ => 0,
        }
    }

    /// Receiver of a call or field access
    pub fn receiver(&self) -> Option<&Expr> {
        match &self.kind {
            ExprKind::FieldAccess { receiver, .. } => Some(receiver),
            ExprKind::MethodCall {
                receiver: Some(receiver),
                ..
            } => Some(receiver),
            _ => None,
        }
    }

    /// Span-insensitive rendering used for structural comparison
    pub fn canonical(&self) -> String {
        let mut out = String::new();
        self.render(&mut out);
        out
    }

    pub fn structurally_eq(&self, other: &Expr) -> bool {
        self.canonical() == other.canonical()
    }

    fn render(&self, out: &mut String) {
        match &self.kind {
            ExprKind::Literal(lit) => match lit {
                Literal::Null => out.push_str("null"),
                Literal::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
                Literal::Number(n) | Literal::Str(n) | Literal::Char(n) => out.push_str(n),
            },
            ExprKind::VariableRef(name) => out.push_str(name),
            ExprKind::FieldAccess { receiver, field } => {
                receiver.render(out);
                out.push('.');
                out.push_str(field);
            }
            ExprKind::MethodCall {
                receiver,
                selector,
                args,
            } => {
                if let Some(receiver) = receiver {
                    receiver.render(out);
                    out.push('.');
                }
                out.push_str(selector);
                render_args(args, out);
            }
            ExprKind::BinaryOp { op, lhs, rhs } => {
                out.push('(');
                lhs.render(out);
                out.push_str(&format!(" {} ", op));
                rhs.render(out);
                out.push(')');
            }
            ExprKind::Conditional {
                condition,
                then_expr,
                else_expr,
            } => {
                out.push('(');
                condition.render(out);
                out.push_str(" ? ");
                then_expr.render(out);
                out.push_str(" : ");
                else_expr.render(out);
                out.push(')');
            }
            ExprKind::ObjectCreation { ty, args, has_body } => {
                out.push_str("new ");
                out.push_str(&ty.text);
                render_args(args, out);
                if *has_body {
                    out.push_str("{...}");
                }
            }
            ExprKind::Assignment { target, op, value } => {
                target.render(out);
                out.push_str(&format!(" {} ", op));
                value.render(out);
            }
            ExprKind::Unary { op, operand } => {
                out.push('(');
                out.push_str(op);
                operand.render(out);
                out.push(')');
            }
            ExprKind::Cast { ty, value } => {
                out.push_str(&format!("(({}) ", ty.text));
                value.render(out);
                out.push(')');
            }
            ExprKind::ArrayAccess { array, index } => {
                array.render(out);
                out.push('[');
                index.render(out);
                out.push(']');
            }
            ExprKind::Opaque(text) | ExprKind::Unknown { text, .. } => out.push_str(text),
        }
    }
}

/// Whether `name` occurs in `text` as a whole identifier
fn has_token(text: &str, name: &str) -> bool {
    text.split(|c: char| !(c.is_alphanumeric() || c == '_' || c == '$'))
        .any(|token| token == name)
}

fn render_args(args: &[Expr], out: &mut String) {
    out.push('(');
    for (i, arg) in args.iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        arg.render(out);
    }
    out.push(')');
}

impl Statement {
    /// Expressions owned directly by this statement (not by nested blocks)
    pub fn expressions(&self) -> Vec<&Expr> {
        match self {
            Statement::LocalVar { init, .. } => init.iter().collect(),
            Statement::Expr(expr) => vec![expr],
            Statement::Return { value, .. } => value.iter().collect(),
            Statement::If { condition, .. } => vec![condition],
            Statement::Loop { kind, .. } => match kind.as_ref() {
                LoopKind::ForEach { iterable, .. } => vec![iterable],
                LoopKind::For {
                    condition, update, ..
                } => condition.iter().chain(update.iter()).collect(),
                LoopKind::While { condition } | LoopKind::DoWhile { condition } => {
                    vec![condition]
                }
            },
            Statement::Switch { subject, .. } => vec![subject],
            Statement::Throw { value, .. } => vec![value],
            Statement::Assert { condition, .. } => vec![condition],
            Statement::Block(_)
            | Statement::Try { .. }
            | Statement::Jump { .. }
            | Statement::Other { .. } => Vec::new(),
        }
    }

    /// Blocks nested directly below this statement, in source order
    pub fn child_blocks(&self) -> Vec<&Block> {
        let mut out = Vec::new();
        match self {
            Statement::If {
                then_block,
                else_block,
                ..
            } => {
                out.push(then_block);
                out.extend(else_block.iter());
            }
            Statement::Loop { body, .. } => out.push(body),
            Statement::Block(block) => out.push(block),
            Statement::Switch { arms, .. } => out.extend(arms.iter()),
            Statement::Try {
                body,
                handlers,
                finally,
                ..
            } => {
                out.push(body);
                out.extend(handlers.iter());
                out.extend(finally.iter());
            }
            _ => {}
        }
        out
    }

    /// Statements nested directly below this one, in source order
    pub fn child_statements(&self) -> Vec<&Statement> {
        let mut out = Vec::new();
        if let Statement::Loop { kind, .. } = self {
            if let LoopKind::For { init, .. } = kind.as_ref() {
                out.extend(init.iter());
            }
        }
        for block in self.child_blocks() {
            out.extend(block.statements.iter());
        }
        out
    }

    /// Pre-order walk over this statement and every nested statement
    pub fn walk<'a>(&'a self, f: &mut dyn FnMut(&'a Statement)) {
        f(self);
        for child in self.child_statements() {
            child.walk(f);
        }
    }

    /// Walk every expression in this statement's subtree
    pub fn walk_exprs<'a>(&'a self, f: &mut dyn FnMut(&'a Expr)) {
        self.walk(&mut |stmt| {
            for expr in stmt.expressions() {
                expr.walk(f);
            }
        });
    }

    pub fn references(&self, name: &str) -> bool {
        let mut found = self.declares(name);
        self.walk_exprs(&mut |e| {
            if e.as_variable() == Some(name) {
                found = true;
            }
        });
        found
    }

    /// [`Statement::references`] plus lambda captures and unmodelled
    /// statement text
    pub fn mentions(&self, name: &str) -> bool {
        let mut found = self.declares(name);
        self.walk(&mut |stmt| {
            if let Statement::Other { text, .. } = stmt {
                found |= has_token(text, name);
            }
            for expr in stmt.expressions() {
                found |= expr.mentions(name);
            }
        });
        found
    }

    fn declares(&self, name: &str) -> bool {
        matches!(self, Statement::LocalVar { name: declared, .. } if declared == name)
    }

    pub fn canonical(&self) -> String {
        match self {
            Statement::LocalVar { name, ty, init, .. } => match init {
                Some(init) => format!("{} {} = {};", ty.text, name, init.canonical()),
                None => format!("{} {};", ty.text, name),
            },
            Statement::Expr(expr) => format!("{};", expr.canonical()),
            Statement::Return { value, .. } => match value {
                Some(value) => format!("return {};", value.canonical()),
                None => "return;".to_string(),
            },
            Statement::If {
                condition,
                then_block,
                else_block,
                ..
            } => {
                let mut s = format!("if ({}) {}", condition.canonical(), then_block.canonical());
                if let Some(else_block) = else_block {
                    s.push_str(" else ");
                    s.push_str(&else_block.canonical());
                }
                s
            }
            Statement::Loop { kind, body, .. } => match kind.as_ref() {
                LoopKind::ForEach { variable, iterable } => format!(
                    "for ({} : {}) {}",
                    variable,
                    iterable.canonical(),
                    body.canonical()
                ),
                LoopKind::For {
                    init,
                    condition,
                    update,
                } => format!(
                    "for ({} {}; {}) {}",
                    init.iter().map(|s| s.canonical()).collect::<String>(),
                    condition.as_ref().map(|c| c.canonical()).unwrap_or_default(),
                    update
                        .iter()
                        .map(|u| u.canonical())
                        .collect::<Vec<_>>()
                        .join(", "),
                    body.canonical()
                ),
                LoopKind::While { condition } => {
                    format!("while ({}) {}", condition.canonical(), body.canonical())
                }
                LoopKind::DoWhile { condition } => {
                    format!("do {} while ({});", body.canonical(), condition.canonical())
                }
            },
            Statement::Block(block) => block.canonical(),
            Statement::Switch { subject, arms, .. } => format!(
                "switch ({}) {{{}}}",
                subject.canonical(),
                arms.iter().map(|a| a.canonical()).collect::<String>()
            ),
            Statement::Try {
                body,
                handlers,
                finally,
                ..
            } => {
                let mut s = format!("try {}", body.canonical());
                for handler in handlers {
                    s.push_str(" catch ");
                    s.push_str(&handler.canonical());
                }
                if let Some(finally) = finally {
                    s.push_str(" finally ");
                    s.push_str(&finally.canonical());
                }
                s
            }
            Statement::Throw { value, .. } => format!("throw {};", value.canonical()),
            Statement::Assert { condition, .. } => format!("assert {};", condition.canonical()),
            Statement::Jump { text, .. } | Statement::Other { text, .. } => text.clone(),
        }
    }
}

impl Block {
    pub fn canonical(&self) -> String {
        let inner: Vec<String> = self.statements.iter().map(|s| s.canonical()).collect();
        format!("{{{}}}", inner.join(" "))
    }

    /// Statements that can run, i.e. up to and including the first
    /// unconditional `return`/`throw`/jump
    pub fn reachable(&self) -> &[Statement] {
        match self.statements.iter().position(|s| s.terminates()) {
            Some(idx) => &self.statements[..=idx],
            None => &self.statements,
        }
    }

    /// Pre-order walk over every statement in this block
    pub fn walk<'a>(&'a self, f: &mut dyn FnMut(&'a Statement)) {
        for stmt in &self.statements {
            stmt.walk(f);
        }
    }
}
