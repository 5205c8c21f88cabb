//! psur_storage
//!
//! File-backed document store collaborator (§4.F.4, §6): the keyed store the
//! control-plane CLI drives. One JSON document per entity under `runtime/store/`,
//! not a database — grounded in the teacher's `EpisodeStore` (JSONL + directory
//! layout), generalized here to several entity kinds instead of one append-only log,
//! since each of these entities is looked up by id rather than queried by tag/time.

use psur_model::{
    AdjudicationResult, CompiledObligations, CompiledRules, EvidenceAtom, ObligationMapping,
    SlotProposal, TemplateSchema, TraceNode,
};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("entity not found: {0}")]
    NotFound(String),
}

pub struct Storage {
    repo_root: PathBuf,
}

impl Storage {
    pub fn new(repo_root: impl Into<PathBuf>) -> Self {
        Self { repo_root: repo_root.into() }
    }

    fn base_dir(&self) -> PathBuf {
        self.repo_root.join("runtime").join("store")
    }

    fn templates_dir(&self) -> PathBuf {
        self.base_dir().join("templates")
    }

    fn mappings_dir(&self) -> PathBuf {
        self.base_dir().join("mappings")
    }

    fn evidence_atoms_dir(&self) -> PathBuf {
        self.base_dir().join("evidence_atoms")
    }

    fn proposals_dir(&self) -> PathBuf {
        self.base_dir().join("proposals")
    }

    fn adjudications_dir(&self) -> PathBuf {
        self.base_dir().join("adjudications")
    }

    fn traces_dir(&self) -> PathBuf {
        self.base_dir().join("traces")
    }

    fn write_json<T: serde::Serialize>(&self, path: &Path, value: &T) -> Result<(), StorageError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serde_json::to_vec_pretty(value)?)?;
        Ok(())
    }

    fn read_json<T: serde::de::DeserializeOwned>(&self, path: &Path) -> Result<Option<T>, StorageError> {
        if !path.exists() {
            return Ok(None);
        }
        let bytes = fs::read(path)?;
        Ok(Some(serde_json::from_slice(&bytes)?))
    }

    pub fn save_compiled_obligations(&self, obligations: &CompiledObligations) -> Result<(), StorageError> {
        self.write_json(&self.base_dir().join("compiled_obligations.json"), obligations)
    }

    pub fn load_compiled_obligations(&self) -> Result<Option<CompiledObligations>, StorageError> {
        self.read_json(&self.base_dir().join("compiled_obligations.json"))
    }

    pub fn save_compiled_rules(&self, rules: &CompiledRules) -> Result<(), StorageError> {
        self.write_json(&self.base_dir().join("compiled_rules.json"), rules)
    }

    pub fn load_compiled_rules(&self) -> Result<Option<CompiledRules>, StorageError> {
        self.read_json(&self.base_dir().join("compiled_rules.json"))
    }

    pub fn save_template(&self, template: &TemplateSchema) -> Result<(), StorageError> {
        let path = self.templates_dir().join(format!("{}.json", template.template_id));
        self.write_json(&path, template)
    }

    pub fn load_template(&self, template_id: &str) -> Result<Option<TemplateSchema>, StorageError> {
        let path = self.templates_dir().join(format!("{template_id}.json"));
        self.read_json(&path)
    }

    pub fn save_mapping(&self, mapping: &ObligationMapping) -> Result<(), StorageError> {
        let path = self.mappings_dir().join(format!("{}.json", mapping.mapping_id));
        self.write_json(&path, mapping)
    }

    pub fn load_mapping(&self, mapping_id: &str) -> Result<Option<ObligationMapping>, StorageError> {
        let path = self.mappings_dir().join(format!("{mapping_id}.json"));
        self.read_json(&path)
    }

    pub fn save_evidence_atom(&self, atom: &EvidenceAtom) -> Result<(), StorageError> {
        let path = self.evidence_atoms_dir().join(format!("{}.json", atom.atom_id));
        self.write_json(&path, atom)
    }

    pub fn load_evidence_atom(&self, atom_id: &str) -> Result<Option<EvidenceAtom>, StorageError> {
        let path = self.evidence_atoms_dir().join(format!("{atom_id}.json"));
        self.read_json(&path)
    }

    /// Scan `evidence_atoms/` and load every atom found, keyed by `atom_id`.
    pub fn load_all_evidence_atoms(&self) -> Result<HashMap<String, EvidenceAtom>, StorageError> {
        let mut atoms = HashMap::new();
        let dir = self.evidence_atoms_dir();
        if !dir.exists() {
            return Ok(atoms);
        }
        for entry in fs::read_dir(&dir)? {
            let entry = entry?;
            if entry.path().extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let bytes = fs::read(entry.path())?;
            let atom: EvidenceAtom = serde_json::from_slice(&bytes)?;
            atoms.insert(atom.atom_id.clone(), atom);
        }
        Ok(atoms)
    }

    pub fn save_proposal(&self, proposal: &SlotProposal) -> Result<(), StorageError> {
        let path = self.proposals_dir().join(format!("{}.json", proposal.proposal_id));
        self.write_json(&path, proposal)
    }

    pub fn load_proposal(&self, proposal_id: &str) -> Result<Option<SlotProposal>, StorageError> {
        let path = self.proposals_dir().join(format!("{proposal_id}.json"));
        self.read_json(&path)
    }

    pub fn save_adjudication(&self, result: &AdjudicationResult) -> Result<(), StorageError> {
        let path = self.adjudications_dir().join(format!("{}.json", result.adjudication_id));
        self.write_json(&path, result)
    }

    pub fn load_adjudication(&self, adjudication_id: &str) -> Result<Option<AdjudicationResult>, StorageError> {
        let path = self.adjudications_dir().join(format!("{adjudication_id}.json"));
        self.read_json(&path)
    }

    pub fn save_trace(&self, trace: &TraceNode) -> Result<(), StorageError> {
        let path = self.traces_dir().join(&trace.adjudication_id).join(format!("{}.json", trace.trace_id));
        self.write_json(&path, trace)
    }

    pub fn load_trace(&self, trace_id: &str) -> Result<Option<TraceNode>, StorageError> {
        let dir = self.traces_dir();
        if !dir.exists() {
            return Ok(None);
        }
        for adjudication_dir in fs::read_dir(&dir)? {
            let adjudication_dir = adjudication_dir?.path();
            if !adjudication_dir.is_dir() {
                continue;
            }
            let path = adjudication_dir.join(format!("{trace_id}.json"));
            if path.exists() {
                return self.read_json(&path);
            }
        }
        Ok(None)
    }

    /// Walk `traces/` and return every `TraceNode` found. `psur_ref` is accepted but
    /// not used to filter, preserving the distilled source's reserved-for-future-use
    /// behavior exactly (§9).
    pub fn export_traces(&self, _psur_ref: Option<&str>) -> Result<Vec<TraceNode>, StorageError> {
        let mut traces = Vec::new();
        let dir = self.traces_dir();
        if !dir.exists() {
            return Ok(traces);
        }
        for adjudication_dir in fs::read_dir(&dir)? {
            let adjudication_dir = adjudication_dir?.path();
            if !adjudication_dir.is_dir() {
                continue;
            }
            for entry in fs::read_dir(&adjudication_dir)? {
                let entry = entry?;
                if entry.path().extension().and_then(|e| e.to_str()) != Some("json") {
                    continue;
                }
                let bytes = fs::read(entry.path())?;
                traces.push(serde_json::from_slice(&bytes)?);
            }
        }
        Ok(traces)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use psur_model::EvidenceType;
    use tempfile::TempDir;

    fn store_in_tmp() -> (TempDir, Storage) {
        let td = TempDir::new().unwrap();
        let storage = Storage::new(td.path().to_path_buf());
        (td, storage)
    }

    #[test]
    fn round_trips_compiled_obligations() {
        let (_td, storage) = store_in_tmp();
        let obligations =
            CompiledObligations { version: "1.0".to_string(), compiled_at: Utc::now(), sources: vec![], obligations: vec![] };
        storage.save_compiled_obligations(&obligations).unwrap();
        let loaded = storage.load_compiled_obligations().unwrap().unwrap();
        assert_eq!(loaded.version, "1.0");
    }

    #[test]
    fn missing_entity_loads_as_none() {
        let (_td, storage) = store_in_tmp();
        assert!(storage.load_template("does-not-exist").unwrap().is_none());
    }

    #[test]
    fn evidence_atoms_scan_finds_every_saved_atom() {
        let (_td, storage) = store_in_tmp();
        let atom1 = EvidenceAtom::new(
            "atom-1".to_string(),
            EvidenceType::SalesVolume,
            serde_json::json!({}),
            None,
            None,
            None,
            None,
            Utc::now(),
        )
        .unwrap();
        let atom2 = EvidenceAtom::new(
            "atom-2".to_string(),
            EvidenceType::ComplaintRecord,
            serde_json::json!({}),
            None,
            None,
            None,
            None,
            Utc::now(),
        )
        .unwrap();
        storage.save_evidence_atom(&atom1).unwrap();
        storage.save_evidence_atom(&atom2).unwrap();

        let all = storage.load_all_evidence_atoms().unwrap();
        assert_eq!(all.len(), 2);
        assert!(all.contains_key("atom-1"));
        assert!(all.contains_key("atom-2"));
    }

    #[test]
    fn export_traces_ignores_psur_ref_filter() {
        let (_td, storage) = store_in_tmp();
        let trace = TraceNode {
            trace_id: "adj-1-0".to_string(),
            adjudication_id: "adj-1".to_string(),
            slot_id: "slot-a".to_string(),
            fragment_type: psur_model::FragmentType::Paragraph,
            fragment_index: 0,
            fragment_content: "text".to_string(),
            evidence_atoms: vec![],
            transformations: vec![],
            regulatory_basis: vec![],
            agent_id: "agent-1".to_string(),
            created_at: Utc::now(),
        };
        storage.save_trace(&trace).unwrap();

        let unfiltered = storage.export_traces(None).unwrap();
        let filtered = storage.export_traces(Some("some-other-ref")).unwrap();
        assert_eq!(unfiltered.len(), 1);
        assert_eq!(filtered.len(), 1);
    }

    #[test]
    fn upsert_overwrites_existing_document() {
        let (_td, storage) = store_in_tmp();
        let template = TemplateSchema { template_id: "tpl-1".to_string(), name: "v1".to_string(), version: "1.0".to_string(), slots: vec![] };
        storage.save_template(&template).unwrap();
        let updated = TemplateSchema { name: "v2".to_string(), ..template };
        storage.save_template(&updated).unwrap();
        let loaded = storage.load_template("tpl-1").unwrap().unwrap();
        assert_eq!(loaded.name, "v2");
    }
}
