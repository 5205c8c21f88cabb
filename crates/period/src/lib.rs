//! psur_period
//!
//! Period engine (§4.E): contiguity validation over a set of `PSURPeriod`s and
//! the jurisdiction/device-class reporting-interval table. Ported from the
//! distilled source's `rules/engine.py::validate_period_contiguity` and
//! `get_schedule_constraint`; `PSURPeriod::overlaps`/`has_gap` themselves live
//! in `psur_model` since they're entity-level operations.

use chrono::Duration;
use psur_model::{Jurisdiction, PSURPeriod};

/// Validate that `periods` are contiguous: no two overlap, and no gap exists
/// between adjacent periods once sorted by start date. Returns `(valid, issues)`.
/// The empty set and singleton sets always pass.
pub fn validate_period_contiguity(periods: &[PSURPeriod]) -> (bool, Vec<String>) {
    if periods.is_empty() {
        return (true, vec![]);
    }

    let mut sorted: Vec<&PSURPeriod> = periods.iter().collect();
    sorted.sort_by_key(|p| p.start_date);

    let mut issues = Vec::new();

    for i in 0..sorted.len() {
        for j in (i + 1)..sorted.len() {
            if sorted[i].overlaps(sorted[j]) {
                issues.push(format!(
                    "Period {} overlaps with {}",
                    sorted[i].period_id, sorted[j].period_id
                ));
            }
        }
    }

    for window in sorted.windows(2) {
        let (previous, current) = (window[0], window[1]);
        if previous.has_gap(current) {
            let expected = previous.end_date.succ_opt().expect("date overflow");
            issues.push(format!(
                "Gap between {} (ends {}) and {} (starts {}). Expected start: {}",
                previous.period_id, previous.end_date, current.period_id, current.start_date, expected
            ));
        }
    }

    (issues.is_empty(), issues)
}

/// The required PSUR schedule interval for a device class in a jurisdiction (§4.E).
/// EU and UK share a class-based table; every other jurisdiction falls back to
/// a flat 365-day interval regardless of device class.
pub fn get_schedule_constraint(jurisdiction: Jurisdiction, device_class: &str) -> Duration {
    match jurisdiction {
        Jurisdiction::Eu | Jurisdiction::Uk => match device_class {
            "III" | "IIb" => Duration::days(365),
            "IIa" => Duration::days(730),
            _ => Duration::days(365 * 5),
        },
        _ => Duration::days(365),
    }
}
