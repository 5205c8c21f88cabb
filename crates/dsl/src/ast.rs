//! Parse-tree node definitions (§4.A), mirroring the distilled source's
//! `SourceNode`/`ObligationNode`/`ConstraintNode`/`ImportNode`/`DSLProgram` shape.
//! Enum-valued fields are kept as raw strings here; resolving them against the
//! closed sets is the compiler's job (`compiler.rs`), so a malformed enum
//! literal is a compile error, not a parse error.

use chrono::NaiveDate;

#[derive(Debug, Clone, Default)]
pub struct SourceNode {
    pub id: String,
    pub line: usize,
    pub jurisdiction: Option<String>,
    pub instrument: Option<String>,
    pub effective_date: Option<NaiveDate>,
    pub title: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ObligationNode {
    pub id: String,
    pub line: usize,
    pub title: Option<String>,
    pub jurisdiction: Option<String>,
    pub mandatory: bool,
    pub required_evidence_types: Vec<String>,
    pub allowed_transformations: Vec<String>,
    pub forbidden_transformations: Vec<String>,
    pub required_time_scope: Option<String>,
    pub allowed_output_types: Vec<String>,
    pub sources: Vec<String>,
    pub allow_absence_statement: bool,
}

impl Default for ObligationNode {
    fn default() -> Self {
        Self {
            id: String::new(),
            line: 0,
            title: None,
            jurisdiction: None,
            mandatory: true,
            required_evidence_types: Vec::new(),
            allowed_transformations: Vec::new(),
            forbidden_transformations: Vec::new(),
            required_time_scope: None,
            allowed_output_types: Vec::new(),
            sources: Vec::new(),
            allow_absence_statement: false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ConstraintNode {
    pub id: String,
    pub line: usize,
    pub severity: String,
    pub trigger: Option<String>,
    pub condition: Option<String>,
    pub action: Option<String>,
    pub sources: Vec<String>,
    pub jurisdiction: Option<String>,
}

impl Default for ConstraintNode {
    fn default() -> Self {
        Self {
            id: String::new(),
            line: 0,
            severity: "BLOCK".to_string(),
            trigger: None,
            condition: None,
            action: None,
            sources: Vec::new(),
            jurisdiction: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ImportNode {
    pub path: String,
    pub line: usize,
}

#[derive(Debug, Clone, Default)]
pub struct DslProgram {
    pub sources: Vec<SourceNode>,
    pub obligations: Vec<ObligationNode>,
    pub constraints: Vec<ConstraintNode>,
    pub imports: Vec<ImportNode>,
}

impl DslProgram {
    pub fn extend(&mut self, other: DslProgram) {
        self.sources.extend(other.sources);
        self.obligations.extend(other.obligations);
        self.constraints.extend(other.constraints);
        self.imports.extend(other.imports);
    }
}
