//! Code smell detectors
//!
//! Every detector consumes one parsed [`SourceUnit`](crate::ast::SourceUnit)
//! and returns findings. The pipeline composes them from a registry of
//! `Arc<dyn Detector>` values.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     pipeline::Analyzer                      │
//! │  - One rayon task per file                                  │
//! │  - Runs every registered per-file detector on the unit      │
//! │  - Collects construction facts for the global pass          │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!              ┌───────────────┴───────────────┐
//!              ▼                               ▼
//! ┌──────────────────────────┐   ┌──────────────────────────────┐
//! │ Per-file (Detector trait)│   │ Whole-corpus (two phases)    │
//! │ NullableReturn           │   │ IncompleteConstruction       │
//! │ FlagParameter            │   │  collect() per file          │
//! │ LoopInvariant            │   │  ConstructionTable::check()  │
//! │ Naming (advisory)        │   │  after the barrier           │
//! └──────────────────────────┘   └──────────────────────────────┘
//! ```

mod base;

mod flag_parameter;
mod incomplete_construction;
mod loop_invariant;
mod naming;
mod nullable_return;

pub use base::{Detector, DetectorConfig};

pub use flag_parameter::{flag_evidence, FlagEvidence, FlagParameterDetector};
pub use incomplete_construction::{
    ConstructionFacts, ConstructionTable, ConstructorCallSite, IncompleteConstructionDetector,
};
pub use loop_invariant::LoopInvariantDetector;
pub use naming::NamingDetector;
pub use nullable_return::NullableReturnDetector;

use crate::config::RuleSettings;
use crate::models::RuleId;
use std::sync::Arc;

/// Create the per-file detectors that have at least one enabled rule
pub fn default_detectors(settings: &RuleSettings) -> Vec<Arc<dyn Detector>> {
    let all: Vec<Arc<dyn Detector>> = vec![
        Arc::new(NullableReturnDetector::with_config(settings.detector_config(&[
            RuleId::NullableReturn,
            RuleId::NullCollectionReturn,
        ]))),
        Arc::new(FlagParameterDetector::with_config(
            settings.detector_config(&[RuleId::FlagParameter]),
        )),
        Arc::new(LoopInvariantDetector::with_config(
            settings.detector_config(&[RuleId::LoopInvariantReevaluation]),
        )),
        Arc::new(NamingDetector::with_config(settings.detector_config(&[
            RuleId::AmbiguousVerb,
            RuleId::ConjunctionName,
        ]))),
    ];
    all.into_iter()
        .filter(|d| d.rules().iter().any(|r| settings.is_enabled(*r)))
        .collect()
}

/// The whole-corpus construction detector, when its rule is enabled
pub fn construction_detector(settings: &RuleSettings) -> Option<IncompleteConstructionDetector> {
    settings
        .is_enabled(RuleId::IncompleteConstruction)
        .then(|| {
            IncompleteConstructionDetector::with_config(
                settings.detector_config(&[RuleId::IncompleteConstruction]),
            )
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProjectConfig;

    #[test]
    fn test_default_registry_skips_advisory_detectors() {
        let settings = RuleSettings::default();
        let names: Vec<&str> = default_detectors(&settings).iter().map(|d| d.name()).collect();
        assert_eq!(
            names,
            vec!["nullable-return", "flag-parameter", "loop-invariant-reevaluation"]
        );
        assert!(construction_detector(&settings).is_some());
    }

    #[test]
    fn test_only_selected_rules_are_registered() {
        let settings =
            RuleSettings::from_project(&ProjectConfig::default(), Some(&[RuleId::ConjunctionName]));
        let names: Vec<&str> = default_detectors(&settings).iter().map(|d| d.name()).collect();
        assert_eq!(names, vec!["advisory-naming"]);
        assert!(construction_detector(&settings).is_none());
    }
}
