//! Built-in named constraint checks (§4.C.2), ported from the distilled
//! source's `rules/checks.py`.

use psur_model::{EvidenceAtom, PSURPeriod, Transformation};
use std::collections::HashSet;

/// Fails if `proposal.transformations_used` intersects {invent, infer, extrapolate}.
pub fn no_invention(transformations_used: &[Transformation]) -> (bool, String) {
    let forbidden: HashSet<Transformation> =
        [Transformation::Invent, Transformation::Infer, Transformation::Extrapolate].into_iter().collect();
    let used: HashSet<Transformation> = transformations_used.iter().copied().collect();
    let mut used_forbidden: Vec<Transformation> = used.intersection(&forbidden).copied().collect();
    used_forbidden.sort_by_key(|t| format!("{t:?}"));

    if used_forbidden.is_empty() {
        (true, "No forbidden transformations".to_string())
    } else {
        (false, format!("Forbidden transformations used: {used_forbidden:?}"))
    }
}

/// Fails per-atom whose period_start/period_end falls outside `period`; returns every
/// violating atom's message, not just the first.
pub fn evidence_within_period(atoms: &[&EvidenceAtom], period: &PSURPeriod) -> (bool, Vec<String>) {
    let mut issues = Vec::new();
    for atom in atoms {
        if let Some(start) = atom.period_start {
            if start < period.start_date {
                issues.push(format!("Atom {} starts before PSUR period", atom.atom_id));
            }
        }
        if let Some(end) = atom.period_end {
            if end > period.end_date {
                issues.push(format!("Atom {} ends after PSUR period", atom.atom_id));
            }
        }
    }
    (issues.is_empty(), issues)
}

/// EU grouping rule: the leading device must not change between PSURs.
pub fn leading_device_unchanged(
    previous_leading_device: Option<&str>,
    current_leading_device: &str,
) -> (bool, String) {
    match previous_leading_device {
        None => (true, "No previous leading device".to_string()),
        Some(previous) if previous == current_leading_device => {
            (true, "Leading device unchanged".to_string())
        }
        Some(_) => (false, "Leading device cannot change. Issue a new PSUR.".to_string()),
    }
}

/// Fails if grouped devices report more than one distinct notified body.
pub fn notified_body_consistent(notified_bodies: &[Option<&str>]) -> (bool, String) {
    let distinct: HashSet<&str> = notified_bodies.iter().filter_map(|b| *b).collect();
    if distinct.len() > 1 {
        let mut sorted: Vec<&&str> = distinct.iter().collect();
        sorted.sort();
        (false, format!("Grouped devices have different notified bodies: {sorted:?}"))
    } else {
        (true, "Notified body consistent".to_string())
    }
}

/// UK-specific: fails if no documented process exists to provide the PSUR to MHRA
/// within 3 working days.
pub fn mhra_availability_process(has_process: bool) -> (bool, String) {
    if has_process {
        (true, "MHRA availability process documented".to_string())
    } else {
        (
            false,
            "UK requires documented process to provide PSUR to MHRA within 3 working days"
                .to_string(),
        )
    }
}
