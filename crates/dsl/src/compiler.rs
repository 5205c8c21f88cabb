//! Compiles a parsed `DslProgram` into the executable IR (§4.A.2), resolving
//! every raw string field against its closed enum set. Grounded in the
//! distilled source's `DSLCompiler`: one `_compile_X` per declaration kind,
//! plus `compile_file` inlining `IMPORT`ed programs before compiling.

use crate::ast::{ConstraintNode, DslProgram, ObligationNode, SourceNode};
use crate::error::DslError;
use chrono::Utc;
use psur_model::{
    CompiledObligations, CompiledRules, Constraint, EvidenceType, Jurisdiction, Obligation,
    OutputType, RegulatorySource, Severity, Transformation,
};
use std::path::Path;

fn map_jurisdiction(value: &Option<String>, line: usize) -> Result<Jurisdiction, DslError> {
    match value {
        None => Ok(Jurisdiction::Eu),
        Some(v) => Jurisdiction::parse_ci(v)
            .map_err(|_| DslError::UnknownEnum { kind: "jurisdiction", value: v.clone(), line }),
    }
}

fn map_severity(value: &str, line: usize) -> Result<Severity, DslError> {
    Severity::parse_ci(value)
        .map_err(|_| DslError::UnknownEnum { kind: "severity", value: value.to_string(), line })
}

fn map_evidence_types(values: &[String], line: usize) -> Result<Vec<EvidenceType>, DslError> {
    values
        .iter()
        .filter(|v| !v.is_empty())
        .map(|v| {
            EvidenceType::parse_ci(v)
                .map_err(|_| DslError::UnknownEnum { kind: "evidence_type", value: v.clone(), line })
        })
        .collect()
}

fn map_transformations(values: &[String], line: usize) -> Result<Vec<Transformation>, DslError> {
    values
        .iter()
        .filter(|v| !v.is_empty())
        .map(|v| {
            Transformation::parse_ci(v)
                .map_err(|_| DslError::UnknownEnum { kind: "transformation", value: v.clone(), line })
        })
        .collect()
}

fn map_output_types(values: &[String], line: usize) -> Result<Vec<OutputType>, DslError> {
    values
        .iter()
        .filter(|v| !v.is_empty())
        .map(|v| {
            OutputType::parse_ci(v)
                .map_err(|_| DslError::UnknownEnum { kind: "output_type", value: v.clone(), line })
        })
        .collect()
}

fn compile_source(node: &SourceNode) -> Result<RegulatorySource, DslError> {
    Ok(RegulatorySource {
        id: node.id.clone(),
        jurisdiction: map_jurisdiction(&node.jurisdiction, node.line)?,
        instrument: node.instrument.clone().unwrap_or_else(|| "Unknown".to_string()),
        effective_date: node.effective_date,
        title: node.title.clone(),
    })
}

fn compile_obligation(node: &ObligationNode) -> Result<Obligation, DslError> {
    Ok(Obligation {
        id: node.id.clone(),
        title: node.title.clone().unwrap_or_else(|| node.id.clone()),
        jurisdiction: map_jurisdiction(&node.jurisdiction, node.line)?,
        mandatory: node.mandatory,
        required_evidence_types: map_evidence_types(&node.required_evidence_types, node.line)?,
        allowed_transformations: map_transformations(&node.allowed_transformations, node.line)?,
        forbidden_transformations: map_transformations(&node.forbidden_transformations, node.line)?,
        required_time_scope: node.required_time_scope.clone(),
        allowed_output_types: map_output_types(&node.allowed_output_types, node.line)?,
        sources: node.sources.iter().filter(|s| !s.is_empty()).cloned().collect(),
        allow_absence_statement: node.allow_absence_statement,
    })
}

fn compile_constraint(node: &ConstraintNode) -> Result<Constraint, DslError> {
    Ok(Constraint {
        id: node.id.clone(),
        severity: map_severity(&node.severity, node.line)?,
        trigger: node.trigger.clone().unwrap_or_default(),
        condition: node.condition.clone().unwrap_or_default(),
        action: node.action.clone().unwrap_or_default(),
        sources: node.sources.clone(),
        jurisdiction: match &node.jurisdiction {
            Some(_) => Some(map_jurisdiction(&node.jurisdiction, node.line)?),
            None => None,
        },
    })
}

/// Compile an already-parsed program (no import resolution).
pub fn compile(program: &DslProgram) -> Result<(CompiledObligations, CompiledRules), DslError> {
    let sources = program.sources.iter().map(compile_source).collect::<Result<Vec<_>, _>>()?;
    let obligations =
        program.obligations.iter().map(compile_obligation).collect::<Result<Vec<_>, _>>()?;
    let constraints =
        program.constraints.iter().map(compile_constraint).collect::<Result<Vec<_>, _>>()?;

    let compiled_obligations = CompiledObligations {
        version: "1.0".to_string(),
        compiled_at: Utc::now(),
        sources,
        obligations,
    };
    let compiled_rules =
        CompiledRules { version: "1.0".to_string(), compiled_at: Utc::now(), constraints };

    Ok((compiled_obligations, compiled_rules))
}

/// Parse DSL source text and compile it, with no import resolution.
pub fn compile_string(dsl_content: &str) -> Result<(CompiledObligations, CompiledRules), DslError> {
    let program = crate::parser::parse(dsl_content)?;
    compile(&program)
}

/// Parse a DSL file, inlining every `IMPORT`ed file found relative to its directory
/// (imports of imports are not followed, matching the distilled source), then compile.
pub fn compile_file(path: &Path) -> Result<(CompiledObligations, CompiledRules), DslError> {
    let content = std::fs::read_to_string(path)?;
    let mut program = crate::parser::parse(&content)?;

    let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
    let imports = program.imports.clone();
    for imp in &imports {
        let import_path = base_dir.join(&imp.path);
        if import_path.exists() {
            let imported_content = std::fs::read_to_string(&import_path)?;
            let imported_program = crate::parser::parse(&imported_content)?;
            program.sources.extend(imported_program.sources);
            program.obligations.extend(imported_program.obligations);
            program.constraints.extend(imported_program.constraints);
        }
    }

    compile(&program)
}

/// Write the compiled IR to `<out_dir>/compiled_obligations.json` and
/// `<out_dir>/compiled_rules.json` (§4.A.2), pretty-printed.
pub fn compile_to_files(
    obligations: &CompiledObligations,
    rules: &CompiledRules,
    out_dir: &Path,
) -> Result<(), DslError> {
    std::fs::create_dir_all(out_dir)?;
    let obligations_path = out_dir.join("compiled_obligations.json");
    let rules_path = out_dir.join("compiled_rules.json");
    std::fs::write(obligations_path, serde_json::to_string_pretty(obligations)?)?;
    std::fs::write(rules_path, serde_json::to_string_pretty(rules)?)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compiles_a_minimal_program() {
        let src = r#"
            SOURCE "src-1" {
                jurisdiction: EU
                instrument: "Regulation (EU) 2017/745"
            }

            OBLIGATION "OB-1" {
                required_evidence_types: [sales_volume]
                forbidden_transformations: [invent]
                allowed_transformations: [summarize]
                allowed_output_types: [narrative]
            }
        "#;
        let (obligations, rules) = compile_string(src).unwrap();
        assert_eq!(obligations.sources.len(), 1);
        assert_eq!(obligations.obligations.len(), 1);
        assert_eq!(rules.constraints.len(), 0);
        assert_eq!(obligations.obligations[0].jurisdiction, Jurisdiction::Eu);
        assert!(obligations.obligations[0].mandatory);
    }

    #[test]
    fn unknown_enum_literal_is_a_compile_error() {
        let src = r#"
            OBLIGATION "OB-1" {
                jurisdiction: ATLANTIS
            }
        "#;
        assert!(compile_string(src).is_err());
    }
}
