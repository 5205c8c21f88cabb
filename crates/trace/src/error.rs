use thiserror::Error;

#[derive(Debug, Error)]
pub enum TraceError {
    #[error("cannot generate a trace for a rejected adjudication")]
    RejectedAdjudication,
}
