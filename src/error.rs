use thiserror::Error;

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("region not found: {0}")]
    RegionNotFound(String),

    #[error("region shut down: {0}")]
    RegionShutDown(String),

    #[error("driver acquisition abandoned")]
    AcquisitionAbandoned,

    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error("internal error: {0}")]
    Internal(String),
}
