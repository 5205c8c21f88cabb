//! psur_adjudicate
//!
//! Adjudication engine (§4.C): the structural slot-existence gate, three
//! per-obligation checks, global keyword-matched constraints, and the named
//! check registry (§4.C.2) standalone callers can drive directly.

pub mod checks;
pub mod constraint;
pub mod engine;
pub mod registry;

pub use checks::{
    evidence_within_period, leading_device_unchanged, mhra_availability_process, no_invention,
    notified_body_consistent,
};
pub use constraint::{evaluate as evaluate_constraint, AdjudicationContext, ConstraintEvaluator};
pub use engine::AdjudicationEngine;
pub use registry::{CheckContext, CheckFn, CheckRegistry};
