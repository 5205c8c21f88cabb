//! The adjudication engine (§4.C): structural gate, then per-obligation checks,
//! then global constraint evaluation. Ported from the distilled source's
//! `AdjudicationEngine`.

use crate::constraint::{evaluate as evaluate_constraint, AdjudicationContext};
use chrono::Utc;
use psur_model::{
    AdjudicationResult, AdjudicationStatus, CheckResult, CompiledObligations, CompiledRules,
    EvidenceAtom, EvidenceType, Obligation, ObligationMapping, RejectionReason, SlotProposal,
    TemplateSchema,
};
use std::collections::{HashMap, HashSet};
use uuid::Uuid;

pub struct AdjudicationEngine<'a> {
    rules: &'a CompiledRules,
    template: &'a TemplateSchema,
    mapping: &'a ObligationMapping,
    obligation_lookup: HashMap<&'a str, &'a Obligation>,
}

impl<'a> AdjudicationEngine<'a> {
    pub fn new(
        compiled_obligations: &'a CompiledObligations,
        compiled_rules: &'a CompiledRules,
        template_schema: &'a TemplateSchema,
        mapping: &'a ObligationMapping,
    ) -> Self {
        let obligation_lookup =
            compiled_obligations.obligations.iter().map(|o| (o.id.as_str(), o)).collect();
        Self { rules: compiled_rules, template: template_schema, mapping, obligation_lookup }
    }

    pub fn adjudicate(
        &self,
        proposal: &SlotProposal,
        evidence_atoms: &HashMap<String, EvidenceAtom>,
    ) -> AdjudicationResult {
        let adjudication_id: String = Uuid::new_v4().to_string().chars().take(8).collect();
        let mut check_results = Vec::new();
        let mut rejection_reasons = Vec::new();

        let Some(_slot) = self.template.get_slot(&proposal.slot_id) else {
            rejection_reasons.push(RejectionReason {
                rule_id: "SLOT_EXISTS".to_string(),
                rule_type: "structural".to_string(),
                obligation_id: None,
                message: format!("Slot '{}' does not exist in template", proposal.slot_id),
            });
            return self.build_result(
                adjudication_id,
                proposal.proposal_id.clone(),
                AdjudicationStatus::Rejected,
                check_results,
                rejection_reasons,
            );
        };

        for obligation_id in self.mapping.get_obligations_for_slot(&proposal.slot_id) {
            let Some(obligation) = self.obligation_lookup.get(obligation_id).copied() else {
                continue;
            };

            let evidence_check = self.check_evidence_types(proposal, obligation, evidence_atoms);
            if !evidence_check.passed {
                rejection_reasons.push(RejectionReason {
                    rule_id: "EVIDENCE_TYPES".to_string(),
                    rule_type: "obligation".to_string(),
                    obligation_id: Some(obligation.id.clone()),
                    message: evidence_check.message.clone(),
                });
            }
            check_results.push(evidence_check);

            let time_check = self.check_time_scope(obligation);
            if !time_check.passed {
                rejection_reasons.push(RejectionReason {
                    rule_id: "TIME_SCOPE".to_string(),
                    rule_type: "obligation".to_string(),
                    obligation_id: Some(obligation.id.clone()),
                    message: time_check.message.clone(),
                });
            }
            check_results.push(time_check);

            let transform_check = self.check_transformations(proposal, obligation);
            if !transform_check.passed {
                rejection_reasons.push(RejectionReason {
                    rule_id: "TRANSFORMATIONS".to_string(),
                    rule_type: "obligation".to_string(),
                    obligation_id: Some(obligation.id.clone()),
                    message: transform_check.message.clone(),
                });
            }
            check_results.push(transform_check);
        }

        let context = AdjudicationContext { changed_fields: vec![], periods: vec![] };
        for constraint in &self.rules.constraints {
            if constraint.trigger != "on_proposal_submit" {
                continue;
            }
            let (passed, message) = evaluate_constraint(constraint, &context);
            let result = CheckResult {
                check_id: constraint.id.clone(),
                check_type: "constraint".to_string(),
                passed,
                message: message.clone(),
                obligation_id: None,
                constraint_id: Some(constraint.id.clone()),
            };
            if !result.passed {
                rejection_reasons.push(RejectionReason {
                    rule_id: result.check_id.clone(),
                    rule_type: "constraint".to_string(),
                    obligation_id: None,
                    message: result.message.clone(),
                });
            }
            check_results.push(result);
        }

        let blocking = rejection_reasons.iter().any(|r| r.rule_type != "warning");
        let status = if blocking { AdjudicationStatus::Rejected } else { AdjudicationStatus::Accepted };

        self.build_result(adjudication_id, proposal.proposal_id.clone(), status, check_results, rejection_reasons)
    }

    fn check_evidence_types(
        &self,
        proposal: &SlotProposal,
        obligation: &Obligation,
        evidence_atoms: &HashMap<String, EvidenceAtom>,
    ) -> CheckResult {
        let base = |passed: bool, message: String| CheckResult {
            check_id: "evidence_types".to_string(),
            check_type: "obligation".to_string(),
            passed,
            message,
            obligation_id: Some(obligation.id.clone()),
            constraint_id: None,
        };

        if obligation.required_evidence_types.is_empty() {
            return base(true, "No evidence types required".to_string());
        }

        let present: HashSet<EvidenceType> = proposal
            .evidence_atoms
            .iter()
            .filter_map(|atom_id| evidence_atoms.get(atom_id))
            .map(|a| a.evidence_type)
            .collect();
        let required: HashSet<EvidenceType> = obligation.required_evidence_types.iter().copied().collect();
        let mut missing: Vec<EvidenceType> = required.difference(&present).copied().collect();
        missing.sort_by_key(|t| format!("{t:?}"));

        if !missing.is_empty() && obligation.allow_absence_statement {
            return base(true, format!("Missing evidence types allowed via absence statement: {missing:?}"));
        }
        if !missing.is_empty() {
            return base(false, format!("Missing required evidence types: {missing:?}"));
        }
        base(true, "All required evidence types present".to_string())
    }

    fn check_time_scope(&self, obligation: &Obligation) -> CheckResult {
        let message = if obligation.required_time_scope.is_none() {
            "No time scope required".to_string()
        } else {
            "Time scope validation passed".to_string()
        };
        CheckResult {
            check_id: "time_scope".to_string(),
            check_type: "obligation".to_string(),
            passed: true,
            message,
            obligation_id: Some(obligation.id.clone()),
            constraint_id: None,
        }
    }

    fn check_transformations(&self, proposal: &SlotProposal, obligation: &Obligation) -> CheckResult {
        let base = |passed: bool, message: String| CheckResult {
            check_id: "transformations".to_string(),
            check_type: "obligation".to_string(),
            passed,
            message,
            obligation_id: Some(obligation.id.clone()),
            constraint_id: None,
        };

        let used: HashSet<_> = proposal.transformations_used.iter().copied().collect();
        let allowed: HashSet<_> = obligation.allowed_transformations.iter().copied().collect();
        let forbidden: HashSet<_> = obligation.forbidden_transformations.iter().copied().collect();

        let mut used_forbidden: Vec<_> = used.intersection(&forbidden).copied().collect();
        used_forbidden.sort_by_key(|t| format!("{t:?}"));
        if !used_forbidden.is_empty() {
            return base(false, format!("Forbidden transformations used: {used_forbidden:?}"));
        }

        if !allowed.is_empty() && !used.is_subset(&allowed) {
            let mut not_allowed: Vec<_> = used.difference(&allowed).copied().collect();
            not_allowed.sort_by_key(|t| format!("{t:?}"));
            return base(false, format!("Transformations not in allowed list: {not_allowed:?}"));
        }

        base(true, "All transformations valid".to_string())
    }

    fn build_result(
        &self,
        adjudication_id: String,
        proposal_id: String,
        status: AdjudicationStatus,
        check_results: Vec<CheckResult>,
        rejection_reasons: Vec<RejectionReason>,
    ) -> AdjudicationResult {
        AdjudicationResult {
            adjudication_id,
            proposal_id,
            status,
            check_results,
            rejection_reasons,
            adjudicated_at: Utc::now(),
        }
    }
}
