//! Incomplete Construction Detector
//!
//! Objects built "builder style" through setters (`new T()` followed by
//! `setX(..)` calls) are only as complete as the caller remembers to make
//! them. This detector compares every construction site of a type against all
//! other sites in the corpus and reports sites that skip setters the others
//! consider mandatory.
//!
//! It is a whole-corpus analysis and runs in two phases:
//! 1. [`IncompleteConstructionDetector::collect`] runs per file on the worker
//!    pool and returns lightweight [`ConstructionFacts`].
//! 2. After every file task has joined, [`ConstructionTable::build`] merges the
//!    facts and [`ConstructionTable::check`] emits the findings.

use crate::ast::{Block, Expr, ExprKind, SourceUnit, Statement};
use crate::detectors::base::DetectorConfig;
use crate::models::{Finding, Location, RuleId};
use std::collections::{BTreeMap, BTreeSet, HashMap};

pub const DEFAULT_MUTATOR_PREFIXES: &[&str] = &["set"];

/// One `new T(..)` bound to a local, plus the mutators called on it right after
#[derive(Debug, Clone, PartialEq)]
pub struct ConstructorCallSite {
    /// Simple type name without type arguments
    pub type_name: String,
    pub arg_count: usize,
    pub binding: String,
    pub mutators: BTreeSet<String>,
    pub location: Location,
}

/// Pass-1 output for one file
#[derive(Debug, Clone, Default)]
pub struct ConstructionFacts {
    pub sites: Vec<ConstructorCallSite>,
    /// Number of distinct mutator methods declared per type in this file
    pub declared_mutators: HashMap<String, usize>,
}

pub struct IncompleteConstructionDetector {
    config: DetectorConfig,
    mutator_prefixes: Vec<String>,
}

impl IncompleteConstructionDetector {
    pub fn new() -> Self {
        Self::with_config(DetectorConfig::default())
    }

    pub fn with_config(config: DetectorConfig) -> Self {
        let mutator_prefixes = config.get_list_or("mutator_prefixes", DEFAULT_MUTATOR_PREFIXES);
        Self {
            config,
            mutator_prefixes,
        }
    }

    pub fn name(&self) -> &'static str {
        "incomplete-construction"
    }

    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    /// `setX` style selector: a configured prefix followed by an uppercase letter
    pub fn is_mutator(&self, selector: &str) -> bool {
        self.mutator_prefixes.iter().any(|prefix| {
            selector
                .strip_prefix(prefix.as_str())
                .and_then(|rest| rest.chars().next())
                .is_some_and(|c| c.is_uppercase())
        })
    }

    /// Pass 1: gather construction sites and declared mutators of one file
    pub fn collect(&self, unit: &SourceUnit) -> ConstructionFacts {
        let mut facts = ConstructionFacts::default();

        for decl in unit.all_types() {
            let mutators: BTreeSet<&str> = decl
                .functions
                .iter()
                .filter(|f| !f.is_constructor() && !f.parameters.is_empty())
                .map(|f| f.name.as_str())
                .filter(|name| self.is_mutator(name))
                .collect();
            if mutators.is_empty() {
                continue;
            }
            let count = facts
                .declared_mutators
                .entry(decl.simple_name().to_string())
                .or_insert(0);
            *count = (*count).max(mutators.len());
        }

        for function in unit.functions() {
            if let Some(body) = &function.body {
                self.collect_block(unit, body, &mut facts.sites);
                body.walk(&mut |stmt| {
                    for block in stmt.child_blocks() {
                        self.collect_block(unit, block, &mut facts.sites);
                    }
                });
            }
        }
        facts
    }

    fn collect_block(&self, unit: &SourceUnit, block: &Block, sites: &mut Vec<ConstructorCallSite>) {
        for (idx, stmt) in block.statements.iter().enumerate() {
            let Some((binding, creation)) = construction_of(stmt) else {
                continue;
            };
            let ExprKind::ObjectCreation { ty, args, .. } = &creation.kind else {
                continue;
            };

            let mut mutators = BTreeSet::new();
            for next in &block.statements[idx + 1..] {
                if let Some(selectors) = self.mutator_chain(next, binding) {
                    mutators.extend(selectors);
                    continue;
                }
                if next.mentions(binding) {
                    break;
                }
            }

            sites.push(ConstructorCallSite {
                type_name: ty.base_name().to_string(),
                arg_count: args.len(),
                binding: binding.to_string(),
                mutators,
                location: Location::new(&unit.path, creation.span),
            });
        }
    }

    /// Selectors of `binding.setA(..).setB(..)` when every link is a mutator
    fn mutator_chain(&self, stmt: &Statement, binding: &str) -> Option<Vec<String>> {
        let Statement::Expr(expr) = stmt else {
            return None;
        };
        let mut selectors = Vec::new();
        let mut current = expr;
        loop {
            match &current.kind {
                ExprKind::MethodCall {
                    receiver: Some(receiver),
                    selector,
                    ..
                } if self.is_mutator(selector) => {
                    selectors.push(selector.clone());
                    current = receiver;
                }
                ExprKind::VariableRef(name) if name == binding && !selectors.is_empty() => {
                    return Some(selectors);
                }
                _ => return None,
            }
        }
    }
}

impl Default for IncompleteConstructionDetector {
    fn default() -> Self {
        Self::new()
    }
}

/// `T x = new T(..)` or `x = new T(..)` (anonymous classes excluded)
fn construction_of(stmt: &Statement) -> Option<(&str, &Expr)> {
    let (binding, value) = match stmt {
        Statement::LocalVar {
            name,
            init: Some(init),
            ..
        } => (name.as_str(), init),
        Statement::Expr(Expr {
            kind: ExprKind::Assignment { target, op, value },
            ..
        }) if op == "=" => (target.as_variable()?, value.as_ref()),
        _ => return None,
    };
    match &value.kind {
        ExprKind::ObjectCreation {
            has_body: false, ..
        } => Some((binding, value)),
        _ => None,
    }
}

/// Corpus-wide view of construction sites, built after the pass-1 barrier
#[derive(Debug, Default)]
pub struct ConstructionTable {
    /// Union of mutators observed after construction, per type
    mandatory: BTreeMap<String, BTreeSet<String>>,
    /// Declared mutator count, for types declared in the corpus
    declared: HashMap<String, usize>,
    sites: Vec<ConstructorCallSite>,
}

impl ConstructionTable {
    /// Merge pass-1 facts (in input order) into one table
    pub fn build(facts: impl IntoIterator<Item = ConstructionFacts>) -> Self {
        let mut table = ConstructionTable::default();
        for file in facts {
            for (type_name, count) in file.declared_mutators {
                let entry = table.declared.entry(type_name).or_insert(0);
                *entry = (*entry).max(count);
            }
            for site in file.sites {
                table
                    .mandatory
                    .entry(site.type_name.clone())
                    .or_default()
                    .extend(site.mutators.iter().cloned());
                table.sites.push(site);
            }
        }
        table
    }

    /// Observed mandatory mutator set of a type
    pub fn mandatory(&self, type_name: &str) -> Option<&BTreeSet<String>> {
        self.mandatory.get(type_name)
    }

    pub fn site_count(&self) -> usize {
        self.sites.len()
    }

    /// Mutator count used for eligibility: declared when known, else observed
    fn mutator_count(&self, type_name: &str) -> usize {
        self.declared
            .get(type_name)
            .copied()
            .or_else(|| self.mandatory.get(type_name).map(|m| m.len()))
            .unwrap_or(0)
    }

    /// Pass 2: report eligible sites that skip part of the mandatory set
    pub fn check(&self) -> Vec<Finding> {
        let mut findings = Vec::new();
        for site in &self.sites {
            let Some(mandatory) = self.mandatory.get(&site.type_name) else {
                continue;
            };
            let eligible =
                site.arg_count == 0 || site.arg_count < self.mutator_count(&site.type_name);
            if !eligible
                || !site.mutators.is_subset(mandatory)
                || site.mutators.len() == mandatory.len()
            {
                continue;
            }

            let missing: Vec<&str> = mandatory
                .difference(&site.mutators)
                .map(|s| s.as_str())
                .collect();
            let message = format!(
                "`{}` ({}) is built without {} which other construction sites call",
                site.binding,
                site.type_name,
                missing
                    .iter()
                    .map(|m| format!("`{}`", m))
                    .collect::<Vec<_>>()
                    .join(", ")
            );
            let mut finding = Finding::new(
                RuleId::IncompleteConstruction,
                site.location.clone(),
                message,
            )
            .with_fix(format!(
                "Call {} after constructing `{}`, or give `{}` a constructor or builder that requires them",
                missing.join(", "),
                site.binding,
                site.type_name
            ));

            for mutator in &missing {
                if let Some(other) = self
                    .sites
                    .iter()
                    .find(|s| s.type_name == site.type_name && s.mutators.contains(*mutator))
                {
                    finding = finding
                        .with_related(other.location.clone(), format!("`{}` called here", mutator));
                }
            }
            findings.push(finding);
        }
        findings
    }
}
