//! psur_model
//!
//! Core data model (spec §3): the closed enumerations, the regulatory entities
//! compiled from DSL source, the template/mapping pair a report is qualified
//! against, and the evidence/proposal/adjudication/trace entities produced at
//! runtime. Every entity here is immutable once constructed; append-only
//! collaborators (storage, audit log) live in their own crates and never
//! mutate a value once saved.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod period;

pub use period::PSURPeriod;

#[derive(Debug, Error)]
pub enum EnumParseError {
    #[error("unknown {kind} value: '{value}'")]
    Unknown { kind: &'static str, value: String },
}

// ---------------------------------------------------------------------
// Enumerations (closed sets, §3)
// ---------------------------------------------------------------------

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Jurisdiction {
    Eu,
    Uk,
    Fda,
    HealthCanada,
    Tga,
}

impl Jurisdiction {
    /// Case-insensitive match against the closed set, per the DSL's enum-literal rule.
    pub fn parse_ci(s: &str) -> Result<Self, EnumParseError> {
        match s.to_ascii_uppercase().as_str() {
            "EU" => Ok(Self::Eu),
            "UK" => Ok(Self::Uk),
            "FDA" => Ok(Self::Fda),
            "HEALTH_CANADA" => Ok(Self::HealthCanada),
            "TGA" => Ok(Self::Tga),
            _ => Err(EnumParseError::Unknown { kind: "Jurisdiction", value: s.to_string() }),
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
    Block,
    Warn,
}

impl Severity {
    pub fn parse_ci(s: &str) -> Result<Self, EnumParseError> {
        match s.to_ascii_uppercase().as_str() {
            "BLOCK" => Ok(Self::Block),
            "WARN" => Ok(Self::Warn),
            _ => Err(EnumParseError::Unknown { kind: "Severity", value: s.to_string() }),
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlotType {
    Narrative,
    Table,
    Kv,
}

impl SlotType {
    pub fn parse_ci(s: &str) -> Result<Self, EnumParseError> {
        match s.to_ascii_lowercase().as_str() {
            "narrative" => Ok(Self::Narrative),
            "table" => Ok(Self::Table),
            "kv" => Ok(Self::Kv),
            _ => Err(EnumParseError::Unknown { kind: "SlotType", value: s.to_string() }),
        }
    }

    /// The set of OutputTypes this slot type can accept (qualification §4.B).
    pub fn compatible_outputs(self) -> &'static [OutputType] {
        match self {
            Self::Narrative => &[OutputType::Narrative],
            Self::Table => &[OutputType::Table, OutputType::TableRef],
            Self::Kv => &[OutputType::Kv],
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputType {
    Narrative,
    Table,
    TableRef,
    Kv,
}

impl OutputType {
    pub fn parse_ci(s: &str) -> Result<Self, EnumParseError> {
        match s.to_ascii_lowercase().as_str() {
            "narrative" => Ok(Self::Narrative),
            "table" => Ok(Self::Table),
            "table_ref" => Ok(Self::TableRef),
            "kv" => Ok(Self::Kv),
            _ => Err(EnumParseError::Unknown { kind: "OutputType", value: s.to_string() }),
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvidenceType {
    SalesVolume,
    PopulationEstimate,
    ComplaintRecord,
    NonSeriousIncident,
    SeriousIncident,
    Fsca,
    TrendReport,
    LiteratureReview,
    ExternalDatabaseScan,
    PmcfSummary,
    CapaSummary,
    BenefitRiskAnalysis,
    SimilarDeviceInfo,
    StatisticalAnalysis,
}

impl EvidenceType {
    pub fn parse_ci(s: &str) -> Result<Self, EnumParseError> {
        match s.to_ascii_lowercase().as_str() {
            "sales_volume" => Ok(Self::SalesVolume),
            "population_estimate" => Ok(Self::PopulationEstimate),
            "complaint_record" => Ok(Self::ComplaintRecord),
            "non_serious_incident" => Ok(Self::NonSeriousIncident),
            "serious_incident" => Ok(Self::SeriousIncident),
            "fsca" => Ok(Self::Fsca),
            "trend_report" => Ok(Self::TrendReport),
            "literature_review" => Ok(Self::LiteratureReview),
            "external_database_scan" => Ok(Self::ExternalDatabaseScan),
            "pmcf_summary" => Ok(Self::PmcfSummary),
            "capa_summary" => Ok(Self::CapaSummary),
            "benefit_risk_analysis" => Ok(Self::BenefitRiskAnalysis),
            "similar_device_info" => Ok(Self::SimilarDeviceInfo),
            "statistical_analysis" => Ok(Self::StatisticalAnalysis),
            _ => Err(EnumParseError::Unknown { kind: "EvidenceType", value: s.to_string() }),
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Transformation {
    Summarize,
    Cite,
    CrossReference,
    Aggregate,
    Tabulate,
    Quote,
    Infer,
    Invent,
    ReWeightRisk,
    Extrapolate,
}

impl Transformation {
    pub fn parse_ci(s: &str) -> Result<Self, EnumParseError> {
        match s.to_ascii_lowercase().as_str() {
            "summarize" => Ok(Self::Summarize),
            "cite" => Ok(Self::Cite),
            "cross_reference" => Ok(Self::CrossReference),
            "aggregate" => Ok(Self::Aggregate),
            "tabulate" => Ok(Self::Tabulate),
            "quote" => Ok(Self::Quote),
            "infer" => Ok(Self::Infer),
            "invent" => Ok(Self::Invent),
            "re_weight_risk" => Ok(Self::ReWeightRisk),
            "extrapolate" => Ok(Self::Extrapolate),
            _ => Err(EnumParseError::Unknown { kind: "Transformation", value: s.to_string() }),
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AdjudicationStatus {
    Accepted,
    Rejected,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QualificationStatus {
    Pass,
    Fail,
}

// ---------------------------------------------------------------------
// Regulatory entities (§3)
// ---------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegulatorySource {
    pub id: String,
    pub jurisdiction: Jurisdiction,
    pub instrument: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub effective_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub title: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Obligation {
    pub id: String,
    pub title: String,
    pub jurisdiction: Jurisdiction,
    #[serde(default = "default_true")]
    pub mandatory: bool,
    #[serde(default)]
    pub required_evidence_types: Vec<EvidenceType>,
    #[serde(default)]
    pub allowed_transformations: Vec<Transformation>,
    #[serde(default)]
    pub forbidden_transformations: Vec<Transformation>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub required_time_scope: Option<String>,
    #[serde(default)]
    pub allowed_output_types: Vec<OutputType>,
    #[serde(default)]
    pub sources: Vec<String>,
    #[serde(default)]
    pub allow_absence_statement: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Constraint {
    pub id: String,
    pub severity: Severity,
    pub trigger: String,
    pub condition: String,
    pub action: String,
    #[serde(default)]
    pub sources: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub jurisdiction: Option<Jurisdiction>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompiledObligations {
    pub version: String,
    pub compiled_at: DateTime<Utc>,
    #[serde(default)]
    pub sources: Vec<RegulatorySource>,
    #[serde(default)]
    pub obligations: Vec<Obligation>,
}

impl CompiledObligations {
    pub fn get_by_jurisdiction(&self, jurisdiction: Jurisdiction) -> Vec<&Obligation> {
        self.obligations.iter().filter(|o| o.jurisdiction == jurisdiction).collect()
    }

    pub fn get_mandatory(&self) -> Vec<&Obligation> {
        self.obligations.iter().filter(|o| o.mandatory).collect()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompiledRules {
    pub version: String,
    pub compiled_at: DateTime<Utc>,
    #[serde(default)]
    pub constraints: Vec<Constraint>,
}

impl CompiledRules {
    pub fn get_by_trigger(&self, trigger: &str) -> Vec<&Constraint> {
        self.constraints.iter().filter(|c| c.trigger == trigger).collect()
    }
}

// ---------------------------------------------------------------------
// Template / mapping (§3)
// ---------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Slot {
    pub slot_id: String,
    pub path: String,
    pub slot_type: SlotType,
    #[serde(default)]
    pub required: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemplateSchema {
    pub template_id: String,
    pub name: String,
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default)]
    pub slots: Vec<Slot>,
}

fn default_version() -> String {
    "1.0".to_string()
}

impl TemplateSchema {
    pub fn get_slot(&self, slot_id: &str) -> Option<&Slot> {
        self.slots.iter().find(|s| s.slot_id == slot_id)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlotMapping {
    pub obligation_id: String,
    pub slot_ids: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObligationMapping {
    pub mapping_id: String,
    pub template_id: String,
    #[serde(default)]
    pub mappings: Vec<SlotMapping>,
}

impl ObligationMapping {
    pub fn get_slots_for_obligation(&self, obligation_id: &str) -> Vec<&str> {
        self.mappings
            .iter()
            .find(|m| m.obligation_id == obligation_id)
            .map(|m| m.slot_ids.iter().map(String::as_str).collect())
            .unwrap_or_default()
    }

    pub fn get_obligations_for_slot(&self, slot_id: &str) -> Vec<&str> {
        self.mappings
            .iter()
            .filter(|m| m.slot_ids.iter().any(|s| s == slot_id))
            .map(|m| m.obligation_id.as_str())
            .collect()
    }
}

// ---------------------------------------------------------------------
// Evidence (§3, §9 hashing)
// ---------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvidenceAtom {
    pub atom_id: String,
    pub evidence_type: EvidenceType,
    pub content: serde_json::Value,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub source_file: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub source_hash: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub period_start: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub period_end: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub provenance_hash: String,
}

/// Fields hashed for `provenance_hash`, per §9: {atom_id, evidence_type, content, source_file},
/// sorted-key canonical JSON, truncated to 16 hex chars.
#[derive(Serialize)]
struct ProvenancePayload<'a> {
    atom_id: &'a str,
    evidence_type: EvidenceType,
    content: &'a serde_json::Value,
    source_file: &'a Option<String>,
}

impl EvidenceAtom {
    /// Construct an atom, computing `provenance_hash` over the canonical payload.
    pub fn new(
        atom_id: String,
        evidence_type: EvidenceType,
        content: serde_json::Value,
        source_file: Option<String>,
        source_hash: Option<String>,
        period_start: Option<NaiveDate>,
        period_end: Option<NaiveDate>,
        created_at: DateTime<Utc>,
    ) -> Result<Self, psur_common::CanonError> {
        let payload = ProvenancePayload { atom_id: &atom_id, evidence_type, content: &content, source_file: &source_file };
        let provenance_hash = psur_common::sha256_canonical_json_truncated(&payload, 16)?;
        Ok(Self {
            atom_id,
            evidence_type,
            content,
            source_file,
            source_hash,
            period_start,
            period_end,
            created_at,
            provenance_hash,
        })
    }

    /// Recompute the expected provenance hash and compare against the stored one.
    pub fn verify_provenance(&self) -> Result<bool, psur_common::CanonError> {
        let payload = ProvenancePayload {
            atom_id: &self.atom_id,
            evidence_type: self.evidence_type,
            content: &self.content,
            source_file: &self.source_file,
        };
        let expected = psur_common::sha256_canonical_json_truncated(&payload, 16)?;
        Ok(expected == self.provenance_hash)
    }
}

// ---------------------------------------------------------------------
// Proposal / adjudication / trace (§3)
// ---------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlotProposal {
    pub proposal_id: String,
    pub agent_id: String,
    pub slot_id: String,
    pub payload: serde_json::Value,
    #[serde(default)]
    pub evidence_atoms: Vec<String>,
    #[serde(default)]
    pub claimed_basis: Vec<String>,
    #[serde(default)]
    pub transformations_used: Vec<Transformation>,
    pub submitted_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckResult {
    pub check_id: String,
    pub check_type: String,
    pub passed: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub obligation_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub constraint_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RejectionReason {
    pub rule_id: String,
    pub rule_type: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub obligation_id: Option<String>,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdjudicationResult {
    pub adjudication_id: String,
    pub proposal_id: String,
    pub status: AdjudicationStatus,
    #[serde(default)]
    pub check_results: Vec<CheckResult>,
    #[serde(default)]
    pub rejection_reasons: Vec<RejectionReason>,
    pub adjudicated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FragmentType {
    Paragraph,
    Cell,
    KvPair,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraceNode {
    pub trace_id: String,
    pub adjudication_id: String,
    pub slot_id: String,
    pub fragment_type: FragmentType,
    pub fragment_index: usize,
    pub fragment_content: String,
    #[serde(default)]
    pub evidence_atoms: Vec<String>,
    #[serde(default)]
    pub transformations: Vec<Transformation>,
    #[serde(default)]
    pub regulatory_basis: Vec<String>,
    pub agent_id: String,
    pub created_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------
// Qualification report (§4.B)
// ---------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QualificationIssue {
    pub issue_type: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub obligation_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub slot_id: Option<String>,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QualificationReport {
    pub status: QualificationStatus,
    pub template_id: String,
    #[serde(default)]
    pub missing_mandatory_obligations: Vec<String>,
    #[serde(default)]
    pub dangling_mappings: Vec<String>,
    #[serde(default)]
    pub incompatible_slot_types: Vec<QualificationIssue>,
    #[serde(default)]
    pub issues: Vec<QualificationIssue>,
}
