use crate::error::{ErrorKind, PipelineError};
use anyhow::Result;
use serde::Serialize;
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CompositeStatus {
    Success,
    Error,
}

/// Observability payload for the frame-with-text step.
#[derive(Debug, Clone, Serialize)]
pub struct FrameDetail {
    pub text_lines: usize,
    pub font_size: f32,
    pub text_content: String,
}

/// Observability payload for the logo step: final placement and size.
#[derive(Debug, Clone, Serialize)]
pub struct LogoDetail {
    pub position: (i64, i64),
    pub size: (u32, u32),
}

/// Structured outcome of every compositing operation. Compositing never
/// raises past its boundary; failures surface here with an explicit kind and
/// no partial file written.
#[derive(Debug, Clone, Serialize)]
pub struct CompositeResult {
    pub status: CompositeStatus,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ErrorKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_path: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frame: Option<FrameDetail>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logo: Option<LogoDetail>,
}

impl CompositeResult {
    pub fn success(message: impl Into<String>, output_path: PathBuf) -> Self {
        Self {
            status: CompositeStatus::Success,
            message: message.into(),
            error_kind: None,
            output_path: Some(output_path),
            frame: None,
            logo: None,
        }
    }

    pub fn failure(err: &PipelineError) -> Self {
        Self {
            status: CompositeStatus::Error,
            message: err.to_string(),
            error_kind: Some(err.kind()),
            output_path: None,
            frame: None,
            logo: None,
        }
    }

    pub fn failure_with_context(context: &str, err: &PipelineError) -> Self {
        let mut result = Self::failure(err);
        result.message = format!("{context}: {err}");
        result
    }

    pub fn with_frame(mut self, detail: FrameDetail) -> Self {
        self.frame = Some(detail);
        self
    }

    pub fn with_logo(mut self, detail: LogoDetail) -> Self {
        self.logo = Some(detail);
        self
    }

    pub fn is_success(&self) -> bool {
        self.status == CompositeStatus::Success
    }

    pub fn write_debug_json<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let file = File::create(path)?;
        let writer = BufWriter::new(file);
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failure_carries_kind_and_message() {
        let err = PipelineError::not_found("base image not found: x.jpg");
        let result = CompositeResult::failure(&err);
        assert_eq!(result.status, CompositeStatus::Error);
        assert_eq!(result.error_kind, Some(ErrorKind::NotFound));
        assert!(result.output_path.is_none());
        assert!(result.message.contains("x.jpg"));
    }

    #[test]
    fn serialized_status_is_snake_case() {
        let result = CompositeResult::success("ok", PathBuf::from("out.jpg"));
        let json = serde_json::to_string(&result).unwrap();
        assert!(json.contains("\"status\":\"success\""));
        assert!(!json.contains("error_kind"));
    }
}
