//! Keyword-substring constraint interpreter (§4.C.1), `CONDITION_KEYWORD_EVALUATOR`.
//! Ported unchanged from the distilled source's `rules/engine.py::ConstraintEvaluator`:
//! the `condition` string is never parsed as an expression language, just
//! scanned for three fixed keywords.

use psur_model::{Constraint, Jurisdiction, PSURPeriod, Severity};

/// Evaluation context a constraint's condition is checked against.
#[derive(Debug, Clone, Default)]
pub struct AdjudicationContext {
    pub changed_fields: Vec<String>,
    pub periods: Vec<PSURPeriod>,
}

/// Evaluate one constraint's `condition` against `context`. Returns `(passed, message)`.
pub fn evaluate(constraint: &Constraint, context: &AdjudicationContext) -> (bool, String) {
    if constraint.condition.contains("changed") {
        if let Some(field) = extract_first_quoted_field(&constraint.condition) {
            if context.changed_fields.iter().any(|f| f == &field) {
                return (false, constraint.action.clone());
            }
        }
    }

    if constraint.condition.contains("overlap") {
        for (i, p1) in context.periods.iter().enumerate() {
            for p2 in &context.periods[i + 1..] {
                if p1.overlaps(p2) {
                    return (false, "Period overlap detected".to_string());
                }
            }
        }
    }

    if constraint.condition.contains("gap") {
        let mut sorted: Vec<&PSURPeriod> = context.periods.iter().collect();
        sorted.sort_by_key(|p| p.start_date);
        for window in sorted.windows(2) {
            if window[0].has_gap(window[1]) {
                return (false, "Period gap detected".to_string());
            }
        }
    }

    (true, "Constraint passed".to_string())
}

fn extract_first_quoted_field(condition: &str) -> Option<String> {
    let mut parts = condition.split('"');
    parts.next();
    parts.next().map(str::to_string)
}

pub struct ConstraintEvaluator<'a> {
    constraints: &'a [Constraint],
}

impl<'a> ConstraintEvaluator<'a> {
    pub fn new(constraints: &'a [Constraint]) -> Self {
        Self { constraints }
    }

    /// Evaluate every constraint matching `trigger` (and, if given, `jurisdiction`).
    pub fn evaluate_all(
        &self,
        trigger: &str,
        context: &AdjudicationContext,
        jurisdiction: Option<Jurisdiction>,
    ) -> Vec<(&'a Constraint, bool, String)> {
        self.constraints
            .iter()
            .filter(|c| c.trigger == trigger)
            .filter(|c| match (jurisdiction, c.jurisdiction) {
                (Some(want), Some(have)) => want == have,
                _ => true,
            })
            .map(|c| {
                let (passed, message) = evaluate(c, context);
                (c, passed, message)
            })
            .collect()
    }

    /// `BLOCK`-severity constraint failures only.
    pub fn get_blocking_failures(
        &self,
        trigger: &str,
        context: &AdjudicationContext,
        jurisdiction: Option<Jurisdiction>,
    ) -> Vec<(&'a Constraint, String)> {
        self.evaluate_all(trigger, context, jurisdiction)
            .into_iter()
            .filter(|(c, passed, _)| !passed && c.severity == Severity::Block)
            .map(|(c, _, message)| (c, message))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn constraint(condition: &str) -> Constraint {
        Constraint {
            id: "C-1".to_string(),
            severity: Severity::Block,
            trigger: "on_proposal_submit".to_string(),
            condition: condition.to_string(),
            action: "rejected due to change".to_string(),
            sources: vec![],
            jurisdiction: None,
        }
    }

    #[test]
    fn changed_field_fails_when_present() {
        let c = constraint(r#"field "sales_volume" changed"#);
        let ctx = AdjudicationContext { changed_fields: vec!["sales_volume".to_string()], periods: vec![] };
        let (passed, message) = evaluate(&c, &ctx);
        assert!(!passed);
        assert_eq!(message, "rejected due to change");
    }

    #[test]
    fn overlap_keyword_detects_overlapping_periods() {
        let c = constraint("no period overlap allowed");
        let periods = vec![
            PSURPeriod::new("1", "psur-1", d("2024-01-01"), d("2024-06-30"), Jurisdiction::Eu, None),
            PSURPeriod::new("2", "psur-1", d("2024-06-01"), d("2024-12-31"), Jurisdiction::Eu, None),
        ];
        let ctx = AdjudicationContext { changed_fields: vec![], periods };
        let (passed, message) = evaluate(&c, &ctx);
        assert!(!passed);
        assert_eq!(message, "Period overlap detected");
    }

    #[test]
    fn gap_keyword_detects_gaps() {
        let c = constraint("no gap allowed between periods");
        let periods = vec![
            PSURPeriod::new("1", "psur-1", d("2024-01-01"), d("2024-06-30"), Jurisdiction::Eu, None),
            PSURPeriod::new("2", "psur-1", d("2024-07-05"), d("2024-12-31"), Jurisdiction::Eu, None),
        ];
        let ctx = AdjudicationContext { changed_fields: vec![], periods };
        let (passed, message) = evaluate(&c, &ctx);
        assert!(!passed);
        assert_eq!(message, "Period gap detected");
    }

    #[test]
    fn unrecognized_condition_passes() {
        let c = constraint("always true");
        let ctx = AdjudicationContext::default();
        assert_eq!(evaluate(&c, &ctx), (true, "Constraint passed".to_string()));
    }
}
