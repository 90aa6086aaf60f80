use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::format::{SizeCategory, ValidatedFile};
use crate::timeout_estimation::{estimate_for_file, TimeoutEstimate};
use crate::upload_config::TimeoutPolicy;

/// Lifecycle of one upload: pending → uploading → {success | error}.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UploadStatus {
    Pending,
    Uploading,
    Success,
    Error,
}

impl UploadStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Uploading => "uploading",
            Self::Success => "success",
            Self::Error => "error",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Success | Self::Error)
    }
}

/// In-memory record tracking one file through the upload pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadTask {
    pub id: Uuid,
    pub file: ValidatedFile,
    pub is_pid: bool,
    pub timeout: Duration,
    pub attempts: u32,
    pub status: UploadStatus,
    pub last_error: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl UploadTask {
    /// Create a pending task, deriving the P&ID flag and timeout.
    pub fn new(file: ValidatedFile, policy: &TimeoutPolicy) -> Self {
        let TimeoutEstimate { is_pid, timeout, .. } =
            estimate_for_file(policy, &file.file_name, file.size_bytes);
        Self {
            id: Uuid::new_v4(),
            file,
            is_pid,
            timeout,
            attempts: 0,
            status: UploadStatus::Pending,
            last_error: None,
            created_at: Utc::now(),
        }
    }

    pub fn file_name(&self) -> &str {
        &self.file.file_name
    }

    pub fn size_category(&self) -> SizeCategory {
        self.file.size_category
    }

    /// Start a new attempt. Returns the 1-based attempt number, or `None`
    /// if the task already finished.
    pub fn begin_attempt(&mut self) -> Option<u32> {
        if self.status.is_terminal() {
            return None;
        }
        self.status = UploadStatus::Uploading;
        self.attempts += 1;
        Some(self.attempts)
    }

    /// Remember why the current attempt failed; the task stays in flight.
    pub fn record_attempt_error(&mut self, message: impl Into<String>) {
        self.last_error = Some(message.into());
    }

    pub fn mark_success(&mut self) -> bool {
        if self.status.is_terminal() {
            return false;
        }
        self.status = UploadStatus::Success;
        self.last_error = None;
        true
    }

    pub fn mark_error(&mut self, message: impl Into<String>) -> bool {
        if self.status.is_terminal() {
            return false;
        }
        self.status = UploadStatus::Error;
        self.last_error = Some(message.into());
        true
    }
}
