use thiserror::Error;

#[derive(Debug, Error)]
pub enum DslError {
    #[error("lex error at line {line}, column {col}: {message}")]
    Lex { line: usize, col: usize, message: String },
    #[error("parse error at line {line}, column {col}: {message}")]
    Parse { line: usize, col: usize, message: String },
    #[error("unknown {kind} value '{value}' (declared at line {line})")]
    UnknownEnum { kind: &'static str, value: String, line: usize },
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("canonical json error: {0}")]
    Canon(#[from] psur_common::CanonError),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}
