use serde::Serialize;

pub type PipelineResult<T> = Result<T, PipelineError>;

#[derive(thiserror::Error, Debug)]
pub enum PipelineError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("invalid upstream response: {0}")]
    InvalidUpstreamResponse(String),

    #[error("io failure: {0}")]
    IoFailure(String),

    #[error("font load error: {0}")]
    FontLoad(String),
}

/// Serializable discriminant carried on error-status results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    NotFound,
    InvalidUpstreamResponse,
    IoFailure,
    FontLoad,
}

impl PipelineError {
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn invalid_upstream(msg: impl Into<String>) -> Self {
        Self::InvalidUpstreamResponse(msg.into())
    }

    pub fn io(msg: impl Into<String>) -> Self {
        Self::IoFailure(msg.into())
    }

    pub fn font_load(msg: impl Into<String>) -> Self {
        Self::FontLoad(msg.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::InvalidUpstreamResponse(_) => ErrorKind::InvalidUpstreamResponse,
            Self::IoFailure(_) => ErrorKind::IoFailure,
            Self::FontLoad(_) => ErrorKind::FontLoad,
        }
    }
}

impl From<std::io::Error> for PipelineError {
    fn from(err: std::io::Error) -> Self {
        Self::IoFailure(err.to_string())
    }
}

impl From<image::ImageError> for PipelineError {
    fn from(err: image::ImageError) -> Self {
        Self::IoFailure(err.to_string())
    }
}
