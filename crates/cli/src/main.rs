mod error;

use chrono::{NaiveDate, Utc};
use clap::{Parser, Subcommand};
use error::CliError;
use psur_audit_log::{AuditAppender, AuditEvent};
use psur_model::{EvidenceAtom, EvidenceType, ObligationMapping, PSURPeriod, SlotProposal, SlotType, TemplateSchema};
use psur_storage::Storage;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "psur-control", version, about = "PSUR compliance kernel control-plane utilities")]
struct Args {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Compile a DSL source file into obligations/rules and save to the store.
    Compile {
        #[arg(long)]
        dsl_file: PathBuf,
        #[arg(long)]
        repo_root: PathBuf,
        #[arg(long)]
        audit_log: Option<PathBuf>,
        /// Optionally also write compiled_obligations.json/compiled_rules.json here.
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Register a TemplateSchema in the store.
    TemplateRegister {
        #[arg(long)]
        repo_root: PathBuf,
        #[arg(long)]
        template_json: PathBuf,
    },

    /// Register an ObligationMapping in the store.
    MappingRegister {
        #[arg(long)]
        repo_root: PathBuf,
        #[arg(long)]
        mapping_json: PathBuf,
    },

    /// Qualify a template+mapping pair against the compiled obligations. Exits 1 on FAIL.
    Qualify {
        #[arg(long)]
        repo_root: PathBuf,
        #[arg(long)]
        template_id: String,
        #[arg(long)]
        mapping_id: String,
        #[arg(long)]
        audit_log: Option<PathBuf>,
    },

    /// Register one EvidenceAtom in the store.
    EvidenceAdd {
        #[arg(long)]
        repo_root: PathBuf,
        #[arg(long)]
        atom_json: PathBuf,
    },

    /// Adjudicate a SlotProposal against the compiled rules/template/mapping. Exits 1 on REJECTED.
    Adjudicate {
        #[arg(long)]
        repo_root: PathBuf,
        #[arg(long)]
        template_id: String,
        #[arg(long)]
        mapping_id: String,
        #[arg(long)]
        proposal_json: PathBuf,
        #[arg(long)]
        audit_log: Option<PathBuf>,
    },

    /// Generate trace nodes for a previously saved accepted adjudication.
    Trace {
        #[arg(long)]
        repo_root: PathBuf,
        #[arg(long)]
        adjudication_id: String,
        #[arg(long)]
        proposal_id: String,
        #[arg(long, value_enum)]
        slot_type: SlotTypeArg,
        #[arg(long)]
        audit_log: Option<PathBuf>,
    },

    /// Validate contiguity of a JSON array of PSURPeriods.
    PeriodCheck {
        #[arg(long)]
        repo_root: PathBuf,
        #[arg(long)]
        periods_json: PathBuf,
        #[arg(long)]
        audit_log: Option<PathBuf>,
    },

    /// Dump every saved trace node as line-delimited JSON.
    ExportTraces {
        #[arg(long)]
        repo_root: PathBuf,
        #[arg(long)]
        psur_ref: Option<String>,
    },

    /// Replay a hash-chained audit log and print the final hash.
    VerifyAudit {
        #[arg(long)]
        audit_log: PathBuf,
    },
}

#[derive(Clone, Copy, clap::ValueEnum)]
enum SlotTypeArg {
    Narrative,
    Table,
    Kv,
}

impl From<SlotTypeArg> for SlotType {
    fn from(v: SlotTypeArg) -> Self {
        match v {
            SlotTypeArg::Narrative => SlotType::Narrative,
            SlotTypeArg::Table => SlotType::Table,
            SlotTypeArg::Kv => SlotType::Kv,
        }
    }
}

/// Shape of the JSON fed to `evidence-add`: everything `EvidenceAtom::new` needs
/// except `provenance_hash`, which is computed rather than supplied.
#[derive(serde::Deserialize)]
struct EvidenceAtomRequest {
    atom_id: String,
    evidence_type: EvidenceType,
    content: serde_json::Value,
    #[serde(default)]
    source_file: Option<String>,
    #[serde(default)]
    source_hash: Option<String>,
    #[serde(default)]
    period_start: Option<NaiveDate>,
    #[serde(default)]
    period_end: Option<NaiveDate>,
}

fn default_audit_log(repo_root: &Path, audit_log: Option<PathBuf>) -> PathBuf {
    audit_log.unwrap_or_else(|| repo_root.join("runtime").join("logs").join("audit.jsonl"))
}

fn main() {
    if let Err(e) = run() {
        eprintln!("ERROR: {e}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), CliError> {
    let args = Args::parse();
    match args.cmd {
        Command::Compile { dsl_file, repo_root, audit_log, out } => {
            let (obligations, rules) = psur_dsl::compile_file(&dsl_file)?;
            let storage = Storage::new(&repo_root);
            storage.save_compiled_obligations(&obligations)?;
            storage.save_compiled_rules(&rules)?;
            if let Some(out_dir) = &out {
                psur_dsl::compile_to_files(&obligations, &rules, out_dir)?;
            }

            let audit_path = default_audit_log(&repo_root, audit_log);
            let mut audit = AuditAppender::open(&audit_path)?;
            audit.append(AuditEvent::DslCompiled {
                ts: Utc::now(),
                dsl_file: dsl_file.display().to_string(),
                obligation_count: obligations.obligations.len(),
                rule_count: rules.constraints.len(),
            })?;

            println!(
                "{}",
                serde_json::to_string(&serde_json::json!({
                    "obligation_count": obligations.obligations.len(),
                    "rule_count": rules.constraints.len(),
                }))?
            );
            Ok(())
        }

        Command::TemplateRegister { repo_root, template_json } => {
            let bytes = fs::read(&template_json)?;
            let template: TemplateSchema = serde_json::from_slice(&bytes)?;
            let storage = Storage::new(&repo_root);
            storage.save_template(&template)?;
            println!("{}", serde_json::to_string(&serde_json::json!({"template_id": template.template_id}))?);
            Ok(())
        }

        Command::MappingRegister { repo_root, mapping_json } => {
            let bytes = fs::read(&mapping_json)?;
            let mapping: ObligationMapping = serde_json::from_slice(&bytes)?;
            let storage = Storage::new(&repo_root);
            storage.save_mapping(&mapping)?;
            println!("{}", serde_json::to_string(&serde_json::json!({"mapping_id": mapping.mapping_id}))?);
            Ok(())
        }

        Command::Qualify { repo_root, template_id, mapping_id, audit_log } => {
            let storage = Storage::new(&repo_root);
            let obligations = storage
                .load_compiled_obligations()?
                .ok_or_else(|| CliError::NotFound("compiled obligations".to_string()))?;
            let template =
                storage.load_template(&template_id)?.ok_or_else(|| CliError::NotFound(format!("template {template_id}")))?;
            let mapping =
                storage.load_mapping(&mapping_id)?.ok_or_else(|| CliError::NotFound(format!("mapping {mapping_id}")))?;

            let report = psur_qualify::qualify_template(&obligations, &template, &mapping);

            let audit_path = default_audit_log(&repo_root, audit_log);
            let mut audit = AuditAppender::open(&audit_path)?;
            let issue_count = report.missing_mandatory_obligations.len()
                + report.dangling_mappings.len()
                + report.incompatible_slot_types.len();
            audit.append(AuditEvent::TemplateQualified {
                ts: Utc::now(),
                template_id: template_id.clone(),
                mapping_id: mapping_id.clone(),
                status: format!("{:?}", report.status),
                issue_count,
            })?;

            println!("{}", serde_json::to_string(&report)?);
            if report.status == psur_model::QualificationStatus::Fail {
                std::process::exit(1);
            }
            Ok(())
        }

        Command::EvidenceAdd { repo_root, atom_json } => {
            let bytes = fs::read(&atom_json)?;
            let req: EvidenceAtomRequest = serde_json::from_slice(&bytes)?;
            let atom = EvidenceAtom::new(
                req.atom_id,
                req.evidence_type,
                req.content,
                req.source_file,
                req.source_hash,
                req.period_start,
                req.period_end,
                Utc::now(),
            )?;
            let storage = Storage::new(&repo_root);
            storage.save_evidence_atom(&atom)?;
            println!(
                "{}",
                serde_json::to_string(&serde_json::json!({"atom_id": atom.atom_id, "provenance_hash": atom.provenance_hash}))?
            );
            Ok(())
        }

        Command::Adjudicate { repo_root, template_id, mapping_id, proposal_json, audit_log } => {
            let storage = Storage::new(&repo_root);
            let obligations = storage
                .load_compiled_obligations()?
                .ok_or_else(|| CliError::NotFound("compiled obligations".to_string()))?;
            let rules =
                storage.load_compiled_rules()?.ok_or_else(|| CliError::NotFound("compiled rules".to_string()))?;
            let template =
                storage.load_template(&template_id)?.ok_or_else(|| CliError::NotFound(format!("template {template_id}")))?;
            let mapping =
                storage.load_mapping(&mapping_id)?.ok_or_else(|| CliError::NotFound(format!("mapping {mapping_id}")))?;

            let bytes = fs::read(&proposal_json)?;
            let proposal: SlotProposal = serde_json::from_slice(&bytes)?;

            let evidence_atoms = storage.load_all_evidence_atoms()?;
            let engine = psur_adjudicate::AdjudicationEngine::new(&obligations, &rules, &template, &mapping);
            let result = engine.adjudicate(&proposal, &evidence_atoms);
            storage.save_adjudication(&result)?;

            let audit_path = default_audit_log(&repo_root, audit_log);
            let mut audit = AuditAppender::open(&audit_path)?;
            audit.append(AuditEvent::ProposalAdjudicated {
                ts: Utc::now(),
                proposal_id: proposal.proposal_id.clone(),
                adjudication_id: result.adjudication_id.clone(),
                status: format!("{:?}", result.status),
            })?;

            println!("{}", serde_json::to_string(&result)?);
            if result.status == psur_model::AdjudicationStatus::Rejected {
                std::process::exit(1);
            }
            Ok(())
        }

        Command::Trace { repo_root, adjudication_id, proposal_id, slot_type, audit_log } => {
            let storage = Storage::new(&repo_root);
            let adjudication = storage
                .load_adjudication(&adjudication_id)?
                .ok_or_else(|| CliError::NotFound(format!("adjudication {adjudication_id}")))?;
            let proposal =
                storage.load_proposal(&proposal_id)?.ok_or_else(|| CliError::NotFound(format!("proposal {proposal_id}")))?;

            let traces = psur_trace::generate_trace(&proposal, &adjudication, slot_type.into())?;
            for trace in &traces {
                storage.save_trace(trace)?;
            }

            let audit_path = default_audit_log(&repo_root, audit_log);
            let mut audit = AuditAppender::open(&audit_path)?;
            audit.append(AuditEvent::TraceGenerated {
                ts: Utc::now(),
                adjudication_id: adjudication_id.clone(),
                proposal_id: proposal_id.clone(),
                trace_count: traces.len(),
            })?;

            println!("{}", serde_json::to_string(&traces)?);
            Ok(())
        }

        Command::PeriodCheck { repo_root, periods_json, audit_log } => {
            let bytes = fs::read(&periods_json)?;
            let periods: Vec<PSURPeriod> = serde_json::from_slice(&bytes)?;
            let (valid, issues) = psur_period::validate_period_contiguity(&periods);

            let audit_path = default_audit_log(&repo_root, audit_log);
            let mut audit = AuditAppender::open(&audit_path)?;
            audit.append(AuditEvent::PeriodsValidated {
                ts: Utc::now(),
                period_count: periods.len(),
                valid,
                issue_count: issues.len(),
            })?;

            println!("{}", serde_json::to_string(&serde_json::json!({"valid": valid, "issues": issues}))?);
            if !valid {
                std::process::exit(1);
            }
            Ok(())
        }

        Command::ExportTraces { repo_root, psur_ref } => {
            let storage = Storage::new(&repo_root);
            let traces = storage.export_traces(psur_ref.as_deref())?;
            for trace in &traces {
                println!("{}", serde_json::to_string(trace)?);
            }
            Ok(())
        }

        Command::VerifyAudit { audit_log } => {
            let last = psur_audit_log::verify_log(audit_log)?;
            println!("{last}");
            Ok(())
        }
    }
}
