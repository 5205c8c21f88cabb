use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("canonical json error: {0}")]
    Canon(#[from] psur_common::CanonError),
    #[error("dsl error: {0}")]
    Dsl(#[from] psur_dsl::DslError),
    #[error("trace error: {0}")]
    Trace(#[from] psur_trace::TraceError),
    #[error("storage error: {0}")]
    Storage(#[from] psur_storage::StorageError),
    #[error("audit log error: {0}")]
    Audit(#[from] psur_audit_log::AuditLogError),
    #[error("not found: {0}")]
    NotFound(String),
}
