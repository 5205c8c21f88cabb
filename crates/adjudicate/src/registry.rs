//! Named check registry (§4.C.2), ported from the distilled source's
//! `rules/registry.py`. The five built-ins in `checks.rs` take heterogeneous
//! arguments; the registry wraps each behind the uniform `(context) -> (passed,
//! message)` signature from §6's external-interface contract, with `CheckContext`
//! acting as the duck-typed `dict` the Python registry's callables read from.

use crate::checks;
use psur_model::EvidenceAtom;
use psur_model::{PSURPeriod, Transformation};
use std::collections::HashMap;

#[derive(Debug, Clone, Default)]
pub struct CheckContext<'a> {
    pub transformations_used: Vec<Transformation>,
    pub evidence_atoms: Vec<&'a EvidenceAtom>,
    pub period: Option<PSURPeriod>,
    pub previous_leading_device: Option<&'a str>,
    pub current_leading_device: Option<&'a str>,
    pub notified_bodies: Vec<Option<&'a str>>,
    pub has_mhra_process: bool,
}

pub type CheckFn = Box<dyn for<'a> Fn(&CheckContext<'a>) -> (bool, String) + Send + Sync>;

pub struct CheckRegistry {
    checks: HashMap<&'static str, CheckFn>,
}

impl CheckRegistry {
    /// A registry seeded with the five built-ins named in §6.
    pub fn with_builtins() -> Self {
        let mut registry = Self { checks: HashMap::new() };

        registry.register_check("no_invention", Box::new(|ctx| checks::no_invention(&ctx.transformations_used)));

        registry.register_check(
            "evidence_within_period",
            Box::new(|ctx| {
                let Some(period) = ctx.period else {
                    return (true, "No period supplied".to_string());
                };
                let (passed, issues) = checks::evidence_within_period(&ctx.evidence_atoms, &period);
                (passed, issues.join("; "))
            }),
        );

        registry.register_check(
            "leading_device_unchanged",
            Box::new(|ctx| {
                let current = ctx.current_leading_device.unwrap_or_default();
                checks::leading_device_unchanged(ctx.previous_leading_device, current)
            }),
        );

        registry.register_check(
            "notified_body_consistent",
            Box::new(|ctx| checks::notified_body_consistent(&ctx.notified_bodies)),
        );

        registry.register_check(
            "mhra_availability_process",
            Box::new(|ctx| checks::mhra_availability_process(ctx.has_mhra_process)),
        );

        registry
    }

    pub fn register_check(&mut self, check_id: &'static str, check_fn: CheckFn) {
        self.checks.insert(check_id, check_fn);
    }

    pub fn get_check(&self, check_id: &str) -> Option<&CheckFn> {
        self.checks.get(check_id)
    }

    pub fn list_checks(&self) -> Vec<&'static str> {
        self.checks.keys().copied().collect()
    }
}
