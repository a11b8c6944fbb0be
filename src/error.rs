use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum GalaxyError {
    #[error("invalid parameter `{name}`: {reason}")]
    InvalidParameter { name: &'static str, reason: String },
    #[error("position buffer length {len} is not a multiple of 3")]
    MalformedPositions { len: usize },
    #[error("{resource} would reach {requested}, above the configured limit of {limit}")]
    ResourceExhaustion {
        resource: &'static str,
        requested: usize,
        limit: usize,
    },
    #[error("invalid color: {0}")]
    InvalidColor(String),
}

impl GalaxyError {
    pub(crate) fn invalid(name: &'static str, reason: impl Into<String>) -> Self {
        GalaxyError::InvalidParameter {
            name,
            reason: reason.into(),
        }
    }
}
