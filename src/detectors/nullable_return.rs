//! Nullable Return Detector
//!
//! Flags `return null` from methods whose declared type gives callers no hint
//! that null is a possible result:
//! - object return types without `@Nullable`, a Javadoc note or `Optional`
//!   (`nullable-return`)
//! - collection and array return types, where an empty value is always
//!   available (`null-collection-return`, reported even when documented)

use crate::ast::{Block, Expr, ExprKind, FunctionDecl, SourceUnit, Span, Statement, TypeClass};
use crate::detectors::base::{Detector, DetectorConfig};
use crate::models::{Finding, Location, RuleId};

pub struct NullableReturnDetector {
    config: DetectorConfig,
}

impl NullableReturnDetector {
    pub fn new() -> Self {
        Self {
            config: DetectorConfig::default(),
        }
    }

    pub fn with_config(config: DetectorConfig) -> Self {
        Self { config }
    }

    fn check_function(&self, unit: &SourceUnit, function: &FunctionDecl) -> Vec<Finding> {
        let (Some(return_type), Some(body)) = (&function.return_type, &function.body) else {
            return Vec::new();
        };
        let rule = match return_type.class {
            TypeClass::Reference if !function.documented_nullable => RuleId::NullableReturn,
            TypeClass::Container => RuleId::NullCollectionReturn,
            _ => return Vec::new(),
        };

        let mut spans = Vec::new();
        collect_null_returns(body, &mut spans);

        spans
            .into_iter()
            .map(|span| {
                let (message, fix) = match rule {
                    RuleId::NullCollectionReturn => (
                        format!(
                            "`{}` returns null for collection type `{}`",
                            function.name, return_type.text
                        ),
                        "Return an empty collection or array instead of null".to_string(),
                    ),
                    _ => (
                        format!(
                            "`{}` returns null but its return type `{}` does not say so",
                            function.name, return_type.text
                        ),
                        format!(
                            "Return Optional<{}> or a null object, or document the null result",
                            return_type.text
                        ),
                    ),
                };
                Finding::new(rule, Location::new(&unit.path, span), message)
                    .with_fix(fix)
                    .with_related(
                        Location::new(&unit.path, function.name_span),
                        format!("`{}` declared here", function.name),
                    )
            })
            .collect()
    }
}

impl Default for NullableReturnDetector {
    fn default() -> Self {
        Self::new()
    }
}

/// Walk reachable statements and record every `return` that can yield null
fn collect_null_returns(block: &Block, out: &mut Vec<Span>) {
    for stmt in block.reachable() {
        if let Statement::Return {
            value: Some(value),
            span,
        } = stmt
        {
            if yields_null(value) {
                out.push(*span);
            }
        }
        for child in stmt.child_blocks() {
            collect_null_returns(child, out);
        }
    }
}

/// `null`, `(T) null` or a conditional with a null branch
fn yields_null(expr: &Expr) -> bool {
    let expr = expr.without_casts();
    match &expr.kind {
        ExprKind::Conditional {
            then_expr,
            else_expr,
            ..
        } => yields_null(then_expr) || yields_null(else_expr),
        _ => expr.is_null_literal(),
    }
}

impl Detector for NullableReturnDetector {
    fn name(&self) -> &'static str {
        "nullable-return"
    }

    fn description(&self) -> &'static str {
        "Detects undocumented null returns and null returned for collections"
    }

    fn rules(&self) -> &'static [RuleId] {
        &[RuleId::NullableReturn, RuleId::NullCollectionReturn]
    }

    fn detect(&self, unit: &SourceUnit) -> Vec<Finding> {
        unit.functions()
            .into_iter()
            .flat_map(|f| self.check_function(unit, f))
            .collect()
    }

    fn config(&self) -> Option<&DetectorConfig> {
        Some(&self.config)
    }
}
