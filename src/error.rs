use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum TrackerError {
    #[error("invalid tracker configuration: {0}")]
    InvalidConfig(String),
    #[error("linear assignment failed: {0}")]
    Assignment(String),
    #[error("innovation covariance is singular")]
    SingularCovariance,
}
