//! psur_qualify
//!
//! Template qualification (§4.B): checks a `TemplateSchema` + `ObligationMapping`
//! pair against a compiled obligation set. Pure and infallible — every check
//! always runs, and a failing check becomes an entry in the returned report
//! rather than an early return.

use psur_model::{
    CompiledObligations, ObligationMapping, QualificationIssue, QualificationReport,
    QualificationStatus, TemplateSchema,
};
use std::collections::HashSet;

/// Qualify `template_schema` against `compiled_obligations` via `mapping`.
///
/// Runs, in order, all three checks from §4.B and always runs all three —
/// the report is complete even when the first check already fails.
pub fn qualify_template(
    compiled_obligations: &CompiledObligations,
    template_schema: &TemplateSchema,
    mapping: &ObligationMapping,
) -> QualificationReport {
    let mut issues: Vec<QualificationIssue> = Vec::new();
    let mut missing_mandatory: Vec<String> = Vec::new();
    let mut dangling_mappings: Vec<String> = Vec::new();
    let mut incompatible_types: Vec<QualificationIssue> = Vec::new();

    let obligation_lookup: std::collections::HashMap<&str, _> =
        compiled_obligations.obligations.iter().map(|o| (o.id.as_str(), o)).collect();
    let slot_lookup: std::collections::HashMap<&str, _> =
        template_schema.slots.iter().map(|s| (s.slot_id.as_str(), s)).collect();
    let mapped_obligations: HashSet<&str> =
        mapping.mappings.iter().map(|m| m.obligation_id.as_str()).collect();

    // 1. Mandatory coverage.
    for obligation in compiled_obligations.get_mandatory() {
        if !mapped_obligations.contains(obligation.id.as_str()) {
            missing_mandatory.push(obligation.id.clone());
            issues.push(QualificationIssue {
                issue_type: "missing_mandatory".to_string(),
                obligation_id: Some(obligation.id.clone()),
                slot_id: None,
                message: format!(
                    "Mandatory obligation '{}' is not mapped to any slot",
                    obligation.id
                ),
            });
        }
    }

    // 2. Dangling slot references.
    for slot_mapping in &mapping.mappings {
        for slot_id in &slot_mapping.slot_ids {
            if !slot_lookup.contains_key(slot_id.as_str()) {
                dangling_mappings.push(slot_id.clone());
                issues.push(QualificationIssue {
                    issue_type: "dangling_mapping".to_string(),
                    obligation_id: Some(slot_mapping.obligation_id.clone()),
                    slot_id: Some(slot_id.clone()),
                    message: format!(
                        "Slot '{slot_id}' referenced in mapping does not exist in template"
                    ),
                });
            }
        }
    }

    // 3. Slot/output type compatibility.
    for slot_mapping in &mapping.mappings {
        let Some(obligation) = obligation_lookup.get(slot_mapping.obligation_id.as_str()) else {
            continue;
        };
        if obligation.allowed_output_types.is_empty() {
            continue;
        }

        for slot_id in &slot_mapping.slot_ids {
            let Some(slot) = slot_lookup.get(slot_id.as_str()) else {
                continue;
            };
            let compatible = slot.slot_type.compatible_outputs();
            let has_compatible =
                obligation.allowed_output_types.iter().any(|out| compatible.contains(out));

            if !has_compatible {
                let issue = QualificationIssue {
                    issue_type: "incompatible_type".to_string(),
                    obligation_id: Some(obligation.id.clone()),
                    slot_id: Some(slot_id.clone()),
                    message: format!(
                        "Slot '{slot_id}' type '{:?}' is not compatible with obligation allowed outputs: {:?}",
                        slot.slot_type, obligation.allowed_output_types
                    ),
                };
                incompatible_types.push(issue.clone());
                issues.push(issue);
            }
        }
    }

    let status = if issues.is_empty() { QualificationStatus::Pass } else { QualificationStatus::Fail };

    QualificationReport {
        status,
        template_id: template_schema.template_id.clone(),
        missing_mandatory_obligations: missing_mandatory,
        dangling_mappings,
        incompatible_slot_types: incompatible_types,
        issues,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use psur_model::{Jurisdiction, Obligation, OutputType, Slot, SlotMapping, SlotType};

    fn obligation(id: &str, mandatory: bool, allowed_output_types: Vec<OutputType>) -> Obligation {
        Obligation {
            id: id.to_string(),
            title: id.to_string(),
            jurisdiction: Jurisdiction::Eu,
            mandatory,
            required_evidence_types: vec![],
            allowed_transformations: vec![],
            forbidden_transformations: vec![],
            required_time_scope: None,
            allowed_output_types,
            sources: vec![],
            allow_absence_statement: false,
        }
    }

    fn compiled(obligations: Vec<Obligation>) -> CompiledObligations {
        CompiledObligations { version: "1.0".to_string(), compiled_at: Utc::now(), sources: vec![], obligations }
    }

    #[test]
    fn passes_when_fully_mapped_and_compatible() {
        let obligations = compiled(vec![obligation("OB-1", true, vec![OutputType::Narrative])]);
        let template = TemplateSchema {
            template_id: "tpl-1".to_string(),
            name: "Template".to_string(),
            version: "1.0".to_string(),
            slots: vec![Slot { slot_id: "slot-a".to_string(), path: "/a".to_string(), slot_type: SlotType::Narrative, required: true }],
        };
        let mapping = ObligationMapping {
            mapping_id: "map-1".to_string(),
            template_id: "tpl-1".to_string(),
            mappings: vec![SlotMapping { obligation_id: "OB-1".to_string(), slot_ids: vec!["slot-a".to_string()] }],
        };
        let report = qualify_template(&obligations, &template, &mapping);
        assert_eq!(report.status, QualificationStatus::Pass);
        assert!(report.issues.is_empty());
    }

    #[test]
    fn reports_missing_mandatory_obligation() {
        let obligations = compiled(vec![obligation("OB-1", true, vec![])]);
        let template = TemplateSchema { template_id: "tpl-1".to_string(), name: "T".to_string(), version: "1.0".to_string(), slots: vec![] };
        let mapping = ObligationMapping { mapping_id: "map-1".to_string(), template_id: "tpl-1".to_string(), mappings: vec![] };
        let report = qualify_template(&obligations, &template, &mapping);
        assert_eq!(report.status, QualificationStatus::Fail);
        assert_eq!(report.missing_mandatory_obligations, vec!["OB-1"]);
    }

    #[test]
    fn reports_dangling_mapping_and_incompatible_type_independently() {
        let obligations = compiled(vec![obligation("OB-1", false, vec![OutputType::Table])]);
        let template = TemplateSchema {
            template_id: "tpl-1".to_string(),
            name: "T".to_string(),
            version: "1.0".to_string(),
            slots: vec![Slot { slot_id: "slot-a".to_string(), path: "/a".to_string(), slot_type: SlotType::Narrative, required: true }],
        };
        let mapping = ObligationMapping {
            mapping_id: "map-1".to_string(),
            template_id: "tpl-1".to_string(),
            mappings: vec![SlotMapping {
                obligation_id: "OB-1".to_string(),
                slot_ids: vec!["slot-a".to_string(), "slot-ghost".to_string()],
            }],
        };
        let report = qualify_template(&obligations, &template, &mapping);
        assert_eq!(report.status, QualificationStatus::Fail);
        assert_eq!(report.dangling_mappings, vec!["slot-ghost"]);
        assert_eq!(report.incompatible_slot_types.len(), 1);
        assert_eq!(report.incompatible_slot_types[0].slot_id.as_deref(), Some("slot-a"));
    }

    #[test]
    fn empty_allowed_output_types_means_unconstrained() {
        let obligations = compiled(vec![obligation("OB-1", false, vec![])]);
        let template = TemplateSchema {
            template_id: "tpl-1".to_string(),
            name: "T".to_string(),
            version: "1.0".to_string(),
            slots: vec![Slot { slot_id: "slot-a".to_string(), path: "/a".to_string(), slot_type: SlotType::Kv, required: false }],
        };
        let mapping = ObligationMapping {
            mapping_id: "map-1".to_string(),
            template_id: "tpl-1".to_string(),
            mappings: vec![SlotMapping { obligation_id: "OB-1".to_string(), slot_ids: vec!["slot-a".to_string()] }],
        };
        let report = qualify_template(&obligations, &template, &mapping);
        assert_eq!(report.status, QualificationStatus::Pass);
    }
}
