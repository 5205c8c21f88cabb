use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::fs;
use std::path::PathBuf;
use std::process::Command;
use tempfile::TempDir;

fn write_dsl(dir: &TempDir) -> PathBuf {
    let p = dir.path().join("obligations.psur");
    let body = r#"
SOURCE "src-1" {
    jurisdiction: EU
    instrument: "Regulation (EU) 2017/745"
}

OBLIGATION "OB-1" {
    jurisdiction: EU
    required_evidence_types: [sales_volume]
    forbidden_transformations: [invent]
    allowed_transformations: [summarize]
    allowed_output_types: [narrative]
}
"#;
    fs::write(&p, body).unwrap();
    p
}

fn write_template(dir: &TempDir) -> PathBuf {
    let p = dir.path().join("template.json");
    let body = r#"{
  "template_id": "tpl-1",
  "name": "Periodic Safety Update Report",
  "version": "1.0",
  "slots": [{"slot_id": "slot-a", "path": "/summary", "slot_type": "narrative", "required": true}]
}"#;
    fs::write(&p, body).unwrap();
    p
}

fn write_mapping(dir: &TempDir) -> PathBuf {
    let p = dir.path().join("mapping.json");
    let body = r#"{
  "mapping_id": "map-1",
  "template_id": "tpl-1",
  "mappings": [{"obligation_id": "OB-1", "slot_ids": ["slot-a"]}]
}"#;
    fs::write(&p, body).unwrap();
    p
}

fn write_evidence_atom(dir: &TempDir) -> PathBuf {
    let p = dir.path().join("atom.json");
    let body = r#"{
  "atom_id": "atom-1",
  "evidence_type": "sales_volume",
  "content": {"units": 1000}
}"#;
    fs::write(&p, body).unwrap();
    p
}

fn write_proposal(dir: &TempDir) -> PathBuf {
    let p = dir.path().join("proposal.json");
    let body = r#"{
  "proposal_id": "prop-1",
  "agent_id": "agent-1",
  "slot_id": "slot-a",
  "payload": {"text": "Sales were steady throughout the period."},
  "evidence_atoms": ["atom-1"],
  "claimed_basis": ["OB-1"],
  "transformations_used": ["summarize"],
  "submitted_at": "2024-01-01T00:00:00Z"
}"#;
    fs::write(&p, body).unwrap();
    p
}

fn audit_log_path(dir: &TempDir) -> PathBuf {
    dir.path().join("runtime").join("logs").join("audit.jsonl")
}

#[test]
fn full_pipeline_compile_qualify_evidence_adjudicate_trace() {
    let repo = TempDir::new().unwrap();
    let psur_control = assert_cmd::cargo::cargo_bin!("psur-control");
    let audit = audit_log_path(&repo);

    let dsl_file = write_dsl(&repo);
    Command::new(&psur_control)
        .args([
            "compile",
            "--dsl-file",
            dsl_file.to_str().unwrap(),
            "--repo-root",
            repo.path().to_str().unwrap(),
            "--audit-log",
            audit.to_str().unwrap(),
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"obligation_count\":1"));

    let template_json = write_template(&repo);
    Command::new(&psur_control)
        .args([
            "template-register",
            "--repo-root",
            repo.path().to_str().unwrap(),
            "--template-json",
            template_json.to_str().unwrap(),
        ])
        .assert()
        .success();

    let mapping_json = write_mapping(&repo);
    Command::new(&psur_control)
        .args([
            "mapping-register",
            "--repo-root",
            repo.path().to_str().unwrap(),
            "--mapping-json",
            mapping_json.to_str().unwrap(),
        ])
        .assert()
        .success();

    Command::new(&psur_control)
        .args([
            "qualify",
            "--repo-root",
            repo.path().to_str().unwrap(),
            "--template-id",
            "tpl-1",
            "--mapping-id",
            "map-1",
            "--audit-log",
            audit.to_str().unwrap(),
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"PASS\""));

    let atom_json = write_evidence_atom(&repo);
    Command::new(&psur_control)
        .args([
            "evidence-add",
            "--repo-root",
            repo.path().to_str().unwrap(),
            "--atom-json",
            atom_json.to_str().unwrap(),
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"provenance_hash\""));

    let proposal_json = write_proposal(&repo);
    let adjudicate_out = Command::new(&psur_control)
        .args([
            "adjudicate",
            "--repo-root",
            repo.path().to_str().unwrap(),
            "--template-id",
            "tpl-1",
            "--mapping-id",
            "map-1",
            "--proposal-json",
            proposal_json.to_str().unwrap(),
            "--audit-log",
            audit.to_str().unwrap(),
        ])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let s = String::from_utf8(adjudicate_out).unwrap();
    assert!(s.contains("\"ACCEPTED\""));
    let marker = "\"adjudication_id\":\"";
    let start = s.find(marker).expect("adjudication_id missing") + marker.len();
    let end = s[start..].find('"').unwrap() + start;
    let adjudication_id = &s[start..end];

    Command::new(&psur_control)
        .args([
            "trace",
            "--repo-root",
            repo.path().to_str().unwrap(),
            "--adjudication-id",
            adjudication_id,
            "--proposal-id",
            "prop-1",
            "--slot-type",
            "narrative",
            "--audit-log",
            audit.to_str().unwrap(),
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"fragment_content\""));

    Command::new(&psur_control)
        .args(["export-traces", "--repo-root", repo.path().to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"trace_id\""));

    Command::new(&psur_control)
        .args(["verify-audit", "--audit-log", audit.to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("sha256:"));
}

#[test]
fn adjudicate_exits_nonzero_on_rejection() {
    let repo = TempDir::new().unwrap();
    let psur_control = assert_cmd::cargo::cargo_bin!("psur-control");
    let audit = audit_log_path(&repo);

    let dsl_file = write_dsl(&repo);
    Command::new(&psur_control)
        .args([
            "compile",
            "--dsl-file",
            dsl_file.to_str().unwrap(),
            "--repo-root",
            repo.path().to_str().unwrap(),
            "--audit-log",
            audit.to_str().unwrap(),
        ])
        .assert()
        .success();

    let template_json = write_template(&repo);
    Command::new(&psur_control)
        .args([
            "template-register",
            "--repo-root",
            repo.path().to_str().unwrap(),
            "--template-json",
            template_json.to_str().unwrap(),
        ])
        .assert()
        .success();

    let mapping_json = write_mapping(&repo);
    Command::new(&psur_control)
        .args([
            "mapping-register",
            "--repo-root",
            repo.path().to_str().unwrap(),
            "--mapping-json",
            mapping_json.to_str().unwrap(),
        ])
        .assert()
        .success();

    // No evidence registered, and slot-ghost doesn't exist -> structural rejection.
    let proposal_path = repo.path().join("bad_proposal.json");
    fs::write(
        &proposal_path,
        r#"{
  "proposal_id": "prop-2",
  "agent_id": "agent-1",
  "slot_id": "slot-ghost",
  "payload": {},
  "evidence_atoms": [],
  "claimed_basis": [],
  "transformations_used": [],
  "submitted_at": "2024-01-01T00:00:00Z"
}"#,
    )
    .unwrap();

    Command::new(&psur_control)
        .args([
            "adjudicate",
            "--repo-root",
            repo.path().to_str().unwrap(),
            "--template-id",
            "tpl-1",
            "--mapping-id",
            "map-1",
            "--proposal-json",
            proposal_path.to_str().unwrap(),
            "--audit-log",
            audit.to_str().unwrap(),
        ])
        .assert()
        .failure()
        .code(1)
        .stdout(predicate::str::contains("\"REJECTED\""));
}

#[test]
fn period_check_reports_overlap_and_exits_nonzero() {
    let repo = TempDir::new().unwrap();
    let psur_control = assert_cmd::cargo::cargo_bin!("psur-control");

    let periods_path = repo.path().join("periods.json");
    fs::write(
        &periods_path,
        r#"[
  {"period_id": "1", "psur_ref": "psur-1", "start_date": "2024-01-01", "end_date": "2024-06-30", "jurisdiction": "EU"},
  {"period_id": "2", "psur_ref": "psur-1", "start_date": "2024-06-01", "end_date": "2024-12-31", "jurisdiction": "EU"}
]"#,
    )
    .unwrap();

    Command::new(&psur_control)
        .args([
            "period-check",
            "--repo-root",
            repo.path().to_str().unwrap(),
            "--periods-json",
            periods_path.to_str().unwrap(),
        ])
        .assert()
        .failure()
        .code(1)
        .stdout(predicate::str::contains("overlaps"));
}
