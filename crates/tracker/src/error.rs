use thiserror::Error;

use cadence_domain::DomainError;

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error(transparent)]
    Config(#[from] DomainError),
    #[error("no audio was supplied")]
    EmptyInput,
    #[error("failed to detect a tempo")]
    NoTempo,
}
