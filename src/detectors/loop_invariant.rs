//! Loop-Invariant Re-evaluation Detector
//!
//! Finds call chains inside a loop body that are evaluated more than once
//! although nothing they depend on changes between iterations, e.g.
//!
//! ```java
//! for (Item item : items) {
//!     send(config.getEntities().getDownload().getUrl(), item);
//!     retry(config.getEntities().getDownload().getRetries());
//! }
//! ```
//!
//! Only maximal repeated chains are reported: a repeated prefix whose every
//! occurrence is the receiver of a longer repeated chain is subsumed by it.
//!
//! A chain that is the whole of an expression statement (`metrics.flush();`)
//! runs for its effect and is never counted, however often it repeats.

use crate::ast::{Block, Expr, ExprKind, FunctionDecl, LoopKind, SourceUnit, Span, Statement};
use crate::detectors::base::{Detector, DetectorConfig};
use crate::models::{Finding, Location, RuleId};
use std::collections::{HashMap, HashSet};

/// Selectors whose result changes on every call even with the same receiver
pub const DEFAULT_IMPURE_SELECTORS: &[&str] = &[
    "next",
    "nextInt",
    "nextLong",
    "nextDouble",
    "nextLine",
    "hasNext",
    "read",
    "readLine",
    "poll",
    "pop",
    "push",
    "remove",
    "take",
    "offer",
    "add",
    "put",
    "incrementAndGet",
    "getAndIncrement",
    "currentTimeMillis",
    "nanoTime",
    "random",
];

pub struct LoopInvariantDetector {
    config: DetectorConfig,
    min_chain_depth: usize,
    impure_selectors: HashSet<String>,
}

impl LoopInvariantDetector {
    pub fn new() -> Self {
        Self::with_config(DetectorConfig::default())
    }

    pub fn with_config(config: DetectorConfig) -> Self {
        let min_chain_depth = config.get_option_or("min_chain_depth", 1usize).max(1);
        let impure_selectors = config
            .get_list_or("impure_selectors", DEFAULT_IMPURE_SELECTORS)
            .into_iter()
            .collect();
        Self {
            config,
            min_chain_depth,
            impure_selectors,
        }
    }

    fn check_function(&self, unit: &SourceUnit, function: &FunctionDecl) -> Vec<Finding> {
        let Some(body) = &function.body else {
            return Vec::new();
        };
        let mut pass = FunctionPass {
            detector: self,
            unit,
            reported: HashSet::new(),
            findings: Vec::new(),
        };
        pass.visit_block(body);
        pass.findings
    }

    /// A call/field chain rooted at a non-variant variable whose arguments
    /// depend on no variant name
    fn is_candidate(&self, expr: &Expr, variant: &Variant) -> bool {
        if !matches!(
            expr.kind,
            ExprKind::FieldAccess { .. }
                | ExprKind::MethodCall {
                    receiver: Some(_),
                    ..
                }
        ) {
            return false;
        }
        let Some(root) = expr.chain_root() else {
            return false;
        };
        if variant.names.contains(root) || expr.chain_depth() < self.min_chain_depth {
            return false;
        }

        let mut has_call = false;
        let mut link = Some(expr);
        while let Some(current) = link {
            if let ExprKind::MethodCall { selector, args, .. } = &current.kind {
                has_call = true;
                if self.impure_selectors.contains(selector)
                    || args.iter().any(|a| variant.touches(a))
                {
                    return false;
                }
            }
            link = current.receiver();
        }
        if !has_call {
            return false;
        }

        let canon = expr.canonical();
        !variant
            .chains
            .iter()
            .any(|v| canon == *v || canon.starts_with(&format!("{}.", v)))
    }
}

impl Default for LoopInvariantDetector {
    fn default() -> Self {
        Self::new()
    }
}

/// Names (and field chains) that may change between iterations of one loop
#[derive(Debug, Default)]
struct Variant {
    names: HashSet<String>,
    chains: Vec<String>,
}

impl Variant {
    fn for_loop(kind: &LoopKind, body: &Block) -> Self {
        let mut variant = Variant::default();
        match kind {
            LoopKind::ForEach { variable, .. } => {
                variant.names.insert(variable.clone());
            }
            LoopKind::For { init, update, .. } => {
                for stmt in init {
                    variant.record_statement(stmt);
                }
                for expr in update {
                    variant.record_writes(expr);
                }
            }
            LoopKind::While { .. } | LoopKind::DoWhile { .. } => {}
        }
        body.walk(&mut |stmt| variant.record_statement(stmt));
        variant
    }

    fn record_statement(&mut self, stmt: &Statement) {
        match stmt {
            Statement::LocalVar { name, .. } => {
                self.names.insert(name.clone());
            }
            Statement::Loop { kind, .. } => {
                if let LoopKind::ForEach { variable, .. } = kind.as_ref() {
                    self.names.insert(variable.clone());
                }
            }
            _ => {}
        }
        for expr in stmt.expressions() {
            self.record_writes(expr);
        }
    }

    fn record_writes(&mut self, expr: &Expr) {
        expr.walk(&mut |e| {
            let target = match &e.kind {
                ExprKind::Assignment { target, .. } => target,
                ExprKind::Unary { op, operand } if op == "++" || op == "--" => operand,
                _ => return,
            };
            match target.as_variable() {
                Some(name) => {
                    self.names.insert(name.to_string());
                }
                None => self.chains.push(target.canonical()),
            }
        });
    }

    fn touches(&self, expr: &Expr) -> bool {
        let mut found = false;
        expr.walk(&mut |e| {
            if let Some(name) = e.as_variable() {
                if self.names.contains(name) {
                    found = true;
                }
            }
        });
        found
    }
}

#[derive(Debug)]
struct Occurrence {
    span: Span,
    /// Canonical form of the longer chain this occurrence is the receiver of
    parent: Option<String>,
}

/// Repeated chains of one loop body, in first-occurrence order
#[derive(Debug, Default)]
struct ChainTable {
    order: Vec<String>,
    occurrences: HashMap<String, Vec<Occurrence>>,
}

impl ChainTable {
    fn push(&mut self, canon: String, occurrence: Occurrence) {
        if !self.occurrences.contains_key(&canon) {
            self.order.push(canon.clone());
        }
        self.occurrences.entry(canon).or_default().push(occurrence);
    }

    /// Repeated chains that are not subsumed by a longer repeated chain
    fn maximal_repeats(&self) -> Vec<(&str, &[Occurrence])> {
        let repeated: HashSet<&str> = self
            .order
            .iter()
            .filter(|c| self.occurrences.get(*c).is_some_and(|o| o.len() > 1))
            .map(|c| c.as_str())
            .collect();

        self.order
            .iter()
            .filter(|c| repeated.contains(c.as_str()))
            .filter_map(|c| {
                let occs = self.occurrences.get(c)?;
                let subsumed = occs.iter().all(|o| {
                    o.parent
                        .as_deref()
                        .is_some_and(|p| repeated.contains(p))
                });
                (!subsumed).then_some((c.as_str(), occs.as_slice()))
            })
            .collect()
    }
}

struct FunctionPass<'a> {
    detector: &'a LoopInvariantDetector,
    unit: &'a SourceUnit,
    /// Occurrence sets already reported for an inner loop
    reported: HashSet<Vec<Span>>,
    findings: Vec<Finding>,
}

impl FunctionPass<'_> {
    fn visit_block(&mut self, block: &Block) {
        for stmt in &block.statements {
            self.visit_statement(stmt);
        }
    }

    /// Post-order: inner loops are analysed before the loops around them
    fn visit_statement(&mut self, stmt: &Statement) {
        for block in stmt.child_blocks() {
            self.visit_block(block);
        }
        if let Statement::Loop { kind, body, span } = stmt {
            self.analyse_loop(kind, body, *span);
        }
    }

    fn analyse_loop(&mut self, kind: &LoopKind, body: &Block, loop_span: Span) {
        let variant = Variant::for_loop(kind, body);
        let mut table = ChainTable::default();
        body.walk(&mut |stmt| {
            // the value of an expression statement is thrown away; it runs for effect
            let discarded = matches!(stmt, Statement::Expr(_));
            for expr in stmt.expressions() {
                self.collect(expr, None, discarded, &variant, &mut table);
            }
        });

        for (chain, occurrences) in table.maximal_repeats() {
            let spans: Vec<Span> = occurrences.iter().map(|o| o.span).collect();
            if !self.reported.insert(spans.clone()) {
                continue;
            }
            let lines: Vec<String> = spans.iter().map(|s| s.line_start.to_string()).collect();
            let message = format!(
                "`{}` is evaluated {} times in the loop at line {} (lines {}) but does not change between iterations",
                chain,
                spans.len(),
                loop_span.line_start,
                lines.join(", ")
            );
            let mut finding = Finding::new(
                RuleId::LoopInvariantReevaluation,
                Location::new(&self.unit.path, spans[0]),
                message,
            )
            .with_fix(format!(
                "Evaluate `{}` once before the loop and reuse the local variable",
                chain
            ));
            for (i, span) in spans.iter().enumerate() {
                finding = finding.with_related(
                    Location::new(&self.unit.path, *span),
                    format!("occurrence {}", i + 1),
                );
            }
            self.findings.push(finding);
        }
    }

    fn collect(
        &self,
        expr: &Expr,
        parent: Option<&str>,
        discarded: bool,
        variant: &Variant,
        table: &mut ChainTable,
    ) {
        let canon = if !discarded && self.detector.is_candidate(expr, variant) {
            let canon = expr.canonical();
            table.push(
                canon.clone(),
                Occurrence {
                    span: expr.span,
                    parent: parent.map(str::to_string),
                },
            );
            Some(canon)
        } else {
            None
        };

        let receiver = expr.receiver();
        for child in expr.children() {
            let is_receiver = receiver.is_some_and(|r| std::ptr::eq(r, child));
            let child_parent = if is_receiver { canon.as_deref() } else { None };
            self.collect(child, child_parent, false, variant, table);
        }
    }
}

impl Detector for LoopInvariantDetector {
    fn name(&self) -> &'static str {
        "loop-invariant-reevaluation"
    }

    fn description(&self) -> &'static str {
        "Detects loop-invariant call chains evaluated repeatedly inside a loop"
    }

    fn rules(&self) -> &'static [RuleId] {
        &[RuleId::LoopInvariantReevaluation]
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
