//! Flag Parameter Detector
//!
//! A boolean parameter is a *flag* when the method uses it to pick between two
//! structurally different behaviours: some `if` or ternary tests it and the
//! two branches do different work once logging and other side-effect-only
//! calls are ignored. Such methods usually want to be two methods.

use crate::ast::{
    Block, Expr, ExprKind, FunctionDecl, LoopKind, Parameter, SourceUnit, Span, Statement,
};
use crate::detectors::base::{Detector, DetectorConfig};
use crate::models::{Finding, Location, RuleId};

/// Selectors whose calls are ignored when comparing branches
pub const DEFAULT_SIDE_EFFECT_SELECTORS: &[&str] = &[
    "log", "trace", "debug", "info", "warn", "warning", "error", "fine", "finer", "finest",
    "print", "println", "printf", "assert",
];

/// Where a flag parameter forks control flow
#[derive(Debug, Clone, PartialEq)]
pub struct FlagEvidence {
    /// The conditional testing the parameter
    pub conditional: Span,
    /// First differing statement/expression of the then-branch
    pub then_span: Span,
    /// First differing statement/expression of the else-branch
    pub else_span: Span,
}

pub struct FlagParameterDetector {
    config: DetectorConfig,
    side_effect_selectors: Vec<String>,
}

impl FlagParameterDetector {
    pub fn new() -> Self {
        Self::with_config(DetectorConfig::default())
    }

    pub fn with_config(config: DetectorConfig) -> Self {
        let side_effect_selectors =
            config.get_list_or("side_effect_selectors", DEFAULT_SIDE_EFFECT_SELECTORS);
        Self {
            config,
            side_effect_selectors,
        }
    }

    fn finding_for(
        &self,
        unit: &SourceUnit,
        function: &FunctionDecl,
        param: &Parameter,
        evidence: FlagEvidence,
    ) -> Finding {
        let message = format!(
            "Boolean parameter `{}` of `{}` selects between two different behaviours",
            param.name, function.name
        );
        Finding::new(RuleId::FlagParameter, Location::new(&unit.path, param.span), message)
            .with_fix(format!(
                "Split `{}` into one method per behaviour, or replace `{}` with an enum",
                function.name, param.name
            ))
            .with_related(
                Location::new(&unit.path, evidence.then_span),
                format!("branch taken when `{}` holds", param.name),
            )
            .with_related(
                Location::new(&unit.path, evidence.else_span),
                "alternative branch",
            )
    }
}

impl Default for FlagParameterDetector {
    fn default() -> Self {
        Self::new()
    }
}

/// First conditional in `function` that forks on `param`, if any.
///
/// This is the derived "is boolean flag" property of a parameter: it is
/// `Some` exactly when the parameter should be reported.
pub fn flag_evidence(
    function: &FunctionDecl,
    param: &Parameter,
    side_effect_selectors: &[String],
) -> Option<FlagEvidence> {
    if !param.is_boolean() {
        return None;
    }
    let body = function.body.as_ref()?;
    let search = FlagSearch {
        name: &param.name,
        selectors: side_effect_selectors,
    };
    search.in_block(body)
}

struct FlagSearch<'a> {
    name: &'a str,
    selectors: &'a [String],
}

impl FlagSearch<'_> {
    fn in_block(&self, block: &Block) -> Option<FlagEvidence> {
        block.statements.iter().find_map(|s| self.in_statement(s))
    }

    fn in_statement(&self, stmt: &Statement) -> Option<FlagEvidence> {
        if let Statement::If {
            condition,
            then_block,
            else_block,
            span,
        } = stmt
        {
            if condition.references(self.name) {
                if let Some(evidence) = self.compare_blocks(*span, then_block, else_block.as_ref())
                {
                    return Some(evidence);
                }
            }
        }
        for expr in stmt.expressions() {
            if let Some(evidence) = self.in_expr(expr) {
                return Some(evidence);
            }
        }
        if let Statement::Loop { kind, .. } = stmt {
            if let LoopKind::For { init, .. } = kind.as_ref() {
                if let Some(evidence) = init.iter().find_map(|s| self.in_statement(s)) {
                    return Some(evidence);
                }
            }
        }
        stmt.child_blocks()
            .into_iter()
            .find_map(|block| self.in_block(block))
    }

    fn in_expr(&self, expr: &Expr) -> Option<FlagEvidence> {
        let mut found = None;
        expr.walk(&mut |e| {
            if found.is_some() {
                return;
            }
            if let ExprKind::Conditional {
                condition,
                then_expr,
                else_expr,
            } = &e.kind
            {
                if condition.references(self.name) && !then_expr.structurally_eq(else_expr) {
                    found = Some(FlagEvidence {
                        conditional: e.span,
                        then_span: then_expr.span,
                        else_span: else_expr.span,
                    });
                }
            }
        });
        found
    }

    fn compare_blocks(
        &self,
        if_span: Span,
        then_block: &Block,
        else_block: Option<&Block>,
    ) -> Option<FlagEvidence> {
        let then_stmts = self.significant(&then_block.statements);
        let else_stmts = else_block
            .map(|b| self.significant(&b.statements))
            .unwrap_or_default();

        let then_canon: Vec<String> = then_stmts.iter().map(|s| s.canonical()).collect();
        let else_canon: Vec<String> = else_stmts.iter().map(|s| s.canonical()).collect();
        if then_canon == else_canon {
            return None;
        }

        let idx = then_canon
            .iter()
            .zip(else_canon.iter())
            .position(|(a, b)| a != b)
            .unwrap_or_else(|| then_canon.len().min(else_canon.len()));

        let then_span = then_stmts
            .get(idx)
            .map(|s| s.span())
            .unwrap_or(then_block.span);
        let else_span = else_stmts
            .get(idx)
            .map(|s| s.span())
            .or_else(|| else_block.map(|b| b.span))
            .unwrap_or(if_span);

        Some(FlagEvidence {
            conditional: if_span,
            then_span,
            else_span,
        })
    }

    /// Statements that are not calls to side-effect-only selectors
    fn significant<'s>(&self, statements: &'s [Statement]) -> Vec<&'s Statement> {
        statements
            .iter()
            .filter(|s| !self.is_side_effect_only(s))
            .collect()
    }

    fn is_side_effect_only(&self, stmt: &Statement) -> bool {
        match stmt {
            Statement::Expr(Expr {
                kind: ExprKind::MethodCall { selector, .. },
                ..
            }) => self.selectors.iter().any(|s| s == selector),
            Statement::Assert { .. } => self.selectors.iter().any(|s| s == "assert"),
            _ => false,
        }
    }
}

impl Detector for FlagParameterDetector {
    fn name(&self) -> &'static str {
        "flag-parameter"
    }

    fn description(&self) -> &'static str {
        "Detects boolean parameters that select between different behaviours"
    }

    fn rules(&self) -> &'static [RuleId] {
        &[RuleId::FlagParameter]
    }

    fn detect(&self, unit: &SourceUnit) -> Vec<Finding> {
        let mut findings = Vec::new();
        for function in unit.functions() {
            for param in &function.parameters {
                if let Some(evidence) = flag_evidence(function, param, &self.side_effect_selectors)
                {
                    findings.push(self.finding_for(unit, function, param, evidence));
                }
            }
        }
        findings
    }

    fn config(&self) -> Option<&DetectorConfig> {
        Some(&self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Language;
    use crate::parsers::parse_source;
    use std::path::Path;

    fn detect_with(source: &str, detector: FlagParameterDetector) -> Vec<Finding> {
        let unit = parse_source(source, Language::Java, Path::new("Test.java"))
            .expect("should parse Java source");
        detector.detect(&unit)
    }

    fn detect(source: &str) -> Vec<Finding> {
        detect_with(source, FlagParameterDetector::new())
    }

    #[test]
    fn test_unreferenced_boolean_is_not_a_flag() {
        let findings = detect(
            r#"
class Printer {
    void print(String text, boolean unused) {
        System.out.println(text);
    }
    void store(boolean enabled) {
        this.enabled = enabled;
    }
}
"#,
        );
        assert!(findings.is_empty(), "got {:?}", findings);
    }

    #[test]
    fn test_if_with_different_branches_is_flagged() {
        let findings = detect(
            r#"
class Exporter {
    void export(Report report, boolean asPdf) {
        prepare(report);
        if (asPdf) {
            writePdf(report);
        } else {
            writeHtml(report);
        }
        if (asPdf) {
            compress(report);
        }
    }
}
"#,
        );
        assert_eq!(findings.len(), 1);
        let f = &findings[0];
        assert_eq!(f.rule, RuleId::FlagParameter);
        assert_eq!(f.location.line_start, 3);
        assert!(f.message.contains("asPdf"));
        assert_eq!(f.related.len(), 2);
        assert_eq!(f.related[0].location.line_start, 6);
        assert_eq!(f.related[1].location.line_start, 8);
    }

    #[test]
    fn test_branches_differing_only_by_logging_are_not_flagged() {
        let findings = detect(
            r#"
class Sync {
    void sync(boolean verbose) {
        if (verbose) {
            log.debug("syncing");
            push();
        } else {
            push();
        }
        if (verbose) System.out.println("done");
    }
}
"#,
        );
        assert!(findings.is_empty(), "got {:?}", findings);
    }

    #[test]
    fn test_missing_else_counts_as_empty_branch() {
        let findings = detect(
            r#"
class Cache {
    void clear(boolean force) {
        if (!force && busy()) {
            return;
        }
        entries.clear();
    }
}
"#,
        );
        assert_eq!(findings.len(), 1);
    }

    #[test]
    fn test_ternary_fork_is_flagged() {
        let findings = detect(
            r#"
class Fmt {
    String format(double v, boolean percent) {
        String s = percent ? String.format("%.1f%%", v * 100) : Double.toString(v);
        return s;
    }
}
"#,
        );
        assert_eq!(findings.len(), 1);
        assert!(findings[0].message.contains("percent"));
    }

    #[test]
    fn test_non_boolean_parameters_are_ignored() {
        let findings = detect(
            r#"
class Mode {
    void run(int mode) {
        if (mode > 1) { a(); } else { b(); }
    }
}
"#,
        );
        assert!(findings.is_empty());
    }

    #[test]
    fn test_side_effect_selectors_are_configurable() {
        let source = r#"
class Audit {
    void save(boolean audited) {
        if (audited) {
            audit("save");
        }
        persist();
    }
}
"#;
        assert_eq!(detect(source).len(), 1);

        let config = DetectorConfig::new()
            .with_option("side_effect_selectors", serde_json::json!(["audit"]));
        let findings = detect_with(source, FlagParameterDetector::with_config(config));
        assert!(findings.is_empty());
    }

    #[test]
    fn test_flag_evidence_is_exposed_per_parameter() {
        let unit = parse_source(
            "class A { void f(boolean a, boolean b) { if (b) { x(); } } }",
            Language::Java,
            Path::new("A.java"),
        )
        .expect("should parse");
        let function = unit.functions()[0];
        let selectors: Vec<String> = DEFAULT_SIDE_EFFECT_SELECTORS
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert!(flag_evidence(function, &function.parameters[0], &selectors).is_none());
        assert!(flag_evidence(function, &function.parameters[1], &selectors).is_some());
    }
}
