use std::future::Future;

use serde::{Deserialize, Serialize};

use super::BackendError;
use crate::models::{AnalysisResponse, AnalysisResult, BackendReport};
use crate::pipeline::upload::{RejectedFile, UploadTask};
use crate::upload_config::ReportFormat;

/// One multipart upload, built once per task and reused across attempts.
#[derive(Debug, Clone)]
pub struct UploadRequest {
    pub file_name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
    pub report_format: ReportFormat,
    pub analysis_type: String,
}

/// Remote service that analyzes an uploaded document.
pub trait AnalysisBackend: Send + Sync {
    /// Perform one upload attempt. Timeouts are enforced by the caller.
    fn analyze(
        &self,
        request: &UploadRequest,
    ) -> impl Future<Output = Result<AnalysisResponse, BackendError>> + Send;
}

/// Successful analysis attached to a finished task.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletedAnalysis {
    pub result: AnalysisResult,
    pub report: Option<BackendReport>,
    /// SHA-256 of the bytes that were uploaded.
    pub content_sha256: String,
    /// Fabricated locally because the backend was unreachable.
    pub demo: bool,
}

/// Final state of one task.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadOutcome {
    pub task: UploadTask,
    pub analysis: Option<CompletedAnalysis>,
}

impl UploadOutcome {
    pub fn is_success(&self) -> bool {
        self.analysis.is_some()
    }

    pub fn error(&self) -> Option<&str> {
        self.task.last_error.as_deref()
    }
}

/// Result of a whole batch: one outcome per accepted file, plus the files
/// refused before upload.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchOutcome {
    pub outcomes: Vec<UploadOutcome>,
    pub rejected: Vec<RejectedFile>,
}

impl BatchOutcome {
    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_success()).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.succeeded()
    }

    pub fn demo_count(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| o.analysis.as_ref().is_some_and(|a| a.demo))
            .count()
    }
}
