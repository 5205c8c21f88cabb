//! psur_trace
//!
//! Ultra-atomic trace generation (§4.D), ported from the distilled source's
//! `TraceGenerator`: an accepted proposal's payload is fragmented down to the
//! paragraph/cell/kv-pair level so every piece of output text can be traced
//! back to the evidence and transformations that produced it.

pub mod error;

pub use error::TraceError;

use chrono::Utc;
use psur_model::{AdjudicationResult, AdjudicationStatus, FragmentType, SlotProposal, SlotType, TraceNode};
use serde_json::Value;

/// Generate trace nodes for an accepted proposal. Returns `Err` if the
/// adjudication was not accepted — requesting a trace for a rejection is a
/// programmer error, not a recoverable condition (§7).
pub fn generate_trace(
    proposal: &SlotProposal,
    adjudication: &AdjudicationResult,
    slot_type: SlotType,
) -> Result<Vec<TraceNode>, TraceError> {
    if adjudication.status != AdjudicationStatus::Accepted {
        return Err(TraceError::RejectedAdjudication);
    }

    Ok(match slot_type {
        SlotType::Narrative => trace_narrative(proposal, adjudication),
        SlotType::Table => trace_table(proposal, adjudication),
        SlotType::Kv => trace_kv(proposal, adjudication),
    })
}

fn make_node(
    proposal: &SlotProposal,
    adjudication: &AdjudicationResult,
    fragment_type: FragmentType,
    index: usize,
    content: String,
) -> TraceNode {
    TraceNode {
        trace_id: format!("{}-{}", adjudication.adjudication_id, index),
        adjudication_id: adjudication.adjudication_id.clone(),
        slot_id: proposal.slot_id.clone(),
        fragment_type,
        fragment_index: index,
        fragment_content: content,
        evidence_atoms: proposal.evidence_atoms.clone(),
        transformations: proposal.transformations_used.clone(),
        regulatory_basis: proposal.claimed_basis.clone(),
        agent_id: proposal.agent_id.clone(),
        created_at: Utc::now(),
    }
}

fn narrative_paragraphs(proposal: &SlotProposal) -> Vec<String> {
    let content = proposal.payload.get("text").and_then(Value::as_str).unwrap_or("");
    let mut paragraphs: Vec<String> =
        content.split("\n\n").map(str::trim).filter(|p| !p.is_empty()).map(str::to_string).collect();
    if paragraphs.is_empty() && !content.trim().is_empty() {
        paragraphs = vec![content.trim().to_string()];
    }
    paragraphs
}

fn trace_narrative(proposal: &SlotProposal, adjudication: &AdjudicationResult) -> Vec<TraceNode> {
    narrative_paragraphs(proposal)
        .into_iter()
        .enumerate()
        .map(|(idx, paragraph)| make_node(proposal, adjudication, FragmentType::Paragraph, idx, paragraph))
        .collect()
}

fn render_cell(cell: &Value) -> String {
    match cell {
        Value::Object(map) => match map.get("value") {
            Some(Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
            None => String::new(),
        },
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn table_cells(proposal: &SlotProposal) -> Vec<String> {
    let rows = proposal.payload.get("rows").and_then(Value::as_array).cloned().unwrap_or_default();
    let mut cells = Vec::new();
    for row in &rows {
        let row_cells = row.get("cells").and_then(Value::as_array).cloned().unwrap_or_default();
        for cell in &row_cells {
            cells.push(render_cell(cell));
        }
    }
    cells
}

fn trace_table(proposal: &SlotProposal, adjudication: &AdjudicationResult) -> Vec<TraceNode> {
    table_cells(proposal)
        .into_iter()
        .enumerate()
        .map(|(idx, content)| make_node(proposal, adjudication, FragmentType::Cell, idx, content))
        .collect()
}

fn kv_pairs(proposal: &SlotProposal) -> Vec<(String, Value)> {
    match proposal.payload.get("pairs") {
        Some(Value::Object(map)) => map.iter().map(|(k, v)| (k.clone(), v.clone())).collect(),
        Some(Value::Array(items)) => items
            .iter()
            .map(|p| {
                let key = p.get("key").and_then(Value::as_str).unwrap_or_default().to_string();
                let value = p.get("value").cloned().unwrap_or(Value::Null);
                (key, value)
            })
            .collect(),
        _ => Vec::new(),
    }
}

fn render_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => "null".to_string(),
        other => other.to_string(),
    }
}

fn trace_kv(proposal: &SlotProposal, adjudication: &AdjudicationResult) -> Vec<TraceNode> {
    kv_pairs(proposal)
        .into_iter()
        .enumerate()
        .map(|(idx, (key, value))| {
            make_node(proposal, adjudication, FragmentType::KvPair, idx, format!("{key}: {}", render_value(&value)))
        })
        .collect()
}

/// Re-derive the expected fragment count from `proposal.payload` and check that
/// `traces.len() >= expected`. An empty trace set is always invalid, even against
/// an empty expected payload, matching the distilled source exactly.
pub fn validate_trace_completeness(proposal: &SlotProposal, traces: &[TraceNode], slot_type: SlotType) -> bool {
    if traces.is_empty() {
        return false;
    }

    let expected = match slot_type {
        SlotType::Narrative => narrative_paragraphs(proposal).len(),
        SlotType::Table => table_cells(proposal).len(),
        SlotType::Kv => kv_pairs(proposal).len(),
    };

    traces.len() >= expected
}

#[cfg(test)]
mod tests {
    use super::*;
    use psur_model::AdjudicationStatus;

    fn accepted_result() -> AdjudicationResult {
        AdjudicationResult {
            adjudication_id: "adj-1".to_string(),
            proposal_id: "P-1".to_string(),
            status: AdjudicationStatus::Accepted,
            check_results: vec![],
            rejection_reasons: vec![],
            adjudicated_at: Utc::now(),
        }
    }

    fn proposal_with_payload(payload: Value) -> SlotProposal {
        SlotProposal {
            proposal_id: "P-1".to_string(),
            agent_id: "agent-1".to_string(),
            slot_id: "slot-a".to_string(),
            payload,
            evidence_atoms: vec!["atom-1".to_string()],
            claimed_basis: vec!["OB-1".to_string()],
            transformations_used: vec![],
            submitted_at: Utc::now(),
        }
    }

    #[test]
    fn rejects_trace_for_non_accepted_adjudication() {
        let mut result = accepted_result();
        result.status = AdjudicationStatus::Rejected;
        let proposal = proposal_with_payload(serde_json::json!({"text": "x"}));
        assert!(generate_trace(&proposal, &result, SlotType::Narrative).is_err());
    }

    #[test]
    fn narrative_splits_on_blank_lines() {
        let result = accepted_result();
        let proposal = proposal_with_payload(serde_json::json!({"text": "First.\n\nSecond.\n\nThird."}));
        let traces = generate_trace(&proposal, &result, SlotType::Narrative).unwrap();
        assert_eq!(traces.len(), 3);
        assert_eq!(traces[0].fragment_content, "First.");
        assert_eq!(traces[1].fragment_content, "Second.");
        assert_eq!(traces[2].fragment_content, "Third.");
        assert!(validate_trace_completeness(&proposal, &traces, SlotType::Narrative));
    }

    #[test]
    fn narrative_single_fragment_when_no_blank_line() {
        let result = accepted_result();
        let proposal = proposal_with_payload(serde_json::json!({"text": "One paragraph only."}));
        let traces = generate_trace(&proposal, &result, SlotType::Narrative).unwrap();
        assert_eq!(traces.len(), 1);
    }

    #[test]
    fn table_produces_one_trace_per_cell() {
        let result = accepted_result();
        let proposal = proposal_with_payload(serde_json::json!({
            "rows": [
                {"cells": ["a", "b"]},
                {"cells": [{"value": "c"}]},
            ]
        }));
        let traces = generate_trace(&proposal, &result, SlotType::Table).unwrap();
        assert_eq!(traces.len(), 3);
        assert_eq!(traces[2].fragment_content, "c");
        assert!(traces.iter().all(|t| t.fragment_type == psur_model::FragmentType::Cell));
    }

    #[test]
    fn kv_produces_one_trace_per_key() {
        let result = accepted_result();
        let proposal = proposal_with_payload(serde_json::json!({
            "pairs": {"population": "12000", "complaints": "3"}
        }));
        let traces = generate_trace(&proposal, &result, SlotType::Kv).unwrap();
        assert_eq!(traces.len(), 2);
        assert_eq!(traces[0].fragment_content, "population: 12000");
    }

    #[test]
    fn every_trace_carries_evidence_and_basis() {
        let result = accepted_result();
        let proposal = proposal_with_payload(serde_json::json!({"text": "Only paragraph."}));
        let traces = generate_trace(&proposal, &result, SlotType::Narrative).unwrap();
        assert_eq!(traces[0].evidence_atoms, vec!["atom-1".to_string()]);
        assert_eq!(traces[0].regulatory_basis, vec!["OB-1".to_string()]);
    }

    #[test]
    fn empty_trace_set_is_never_complete() {
        let proposal = proposal_with_payload(serde_json::json!({"text": ""}));
        assert!(!validate_trace_completeness(&proposal, &[], SlotType::Narrative));
    }
}
