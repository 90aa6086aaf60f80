//! Sequential upload of a batch with per-attempt timeout and fixed-delay retry.
//!
//! pending → uploading → {success | error}. Files are sent one at a time so
//! the backend never sees more than one upload from a batch. A timeout
//! cancels only the attempt it wraps; a failed file never stops the batch.

use std::path::PathBuf;
use std::sync::Arc;

use super::demo::fabricate_demo_response;
use super::types::{AnalysisBackend, BatchOutcome, CompletedAnalysis, UploadOutcome, UploadRequest};
use super::BackendError;
use crate::models::AnalysisResponse;
use crate::pipeline::upload::{
    content_sha256, validate_batch, EventSink, RejectedFile, TracingSink, UploadError,
    UploadEvent, UploadTask,
};
use crate::upload_config::UploadConfig;

pub struct UploadOrchestrator<B> {
    backend: B,
    config: UploadConfig,
    events: Arc<dyn EventSink>,
}

impl<B: AnalysisBackend> UploadOrchestrator<B> {
    pub fn new(backend: B, config: UploadConfig) -> Self {
        Self {
            backend,
            config,
            events: Arc::new(TracingSink),
        }
    }

    pub fn with_events(mut self, events: Arc<dyn EventSink>) -> Self {
        self.events = events;
        self
    }

    pub fn config(&self) -> &UploadConfig {
        &self.config
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Validate paths and create one pending task per accepted file.
    /// Rejected files are announced and never become tasks.
    pub fn prepare(
        &self,
        paths: &[PathBuf],
    ) -> Result<(Vec<UploadTask>, Vec<RejectedFile>), UploadError> {
        let (accepted, rejected) = validate_batch(paths, &self.config)?;

        for r in &rejected {
            self.events.emit(&UploadEvent::Rejected {
                file_name: r.file_name.clone(),
                reason: r.reason.clone(),
            });
        }

        let tasks = accepted
            .into_iter()
            .map(|file| UploadTask::new(file, &self.config.timeouts))
            .collect();
        Ok((tasks, rejected))
    }

    /// Validate and upload a batch of paths.
    pub async fn run_batch(&self, paths: &[PathBuf]) -> Result<BatchOutcome, UploadError> {
        let (tasks, rejected) = self.prepare(paths)?;
        let outcomes = self.process_tasks(tasks).await;
        Ok(BatchOutcome { outcomes, rejected })
    }

    /// Upload tasks strictly one after another. Always returns exactly one
    /// outcome per input task, in input order.
    pub async fn process_tasks(&self, tasks: Vec<UploadTask>) -> Vec<UploadOutcome> {
        let total = tasks.len();
        let mut outcomes = Vec::with_capacity(total);

        for (i, task) in tasks.into_iter().enumerate() {
            self.events.emit(&UploadEvent::BatchProgress {
                current: i + 1,
                total,
                file_name: task.file_name().to_string(),
            });
            outcomes.push(self.process_task(task).await);
        }

        outcomes
    }

    /// Run one task to a terminal state.
    pub async fn process_task(&self, mut task: UploadTask) -> UploadOutcome {
        let bytes = match tokio::fs::read(&task.file.path).await {
            Ok(bytes) => bytes,
            Err(e) => {
                let message = format!("Could not read file: {e}");
                return self.fail(task, message);
            }
        };
        let content_sha256 = content_sha256(&bytes);

        let request = UploadRequest {
            file_name: task.file.file_name.clone(),
            mime_type: task.file.mime_type.clone(),
            bytes,
            report_format: self.config.report_format,
            analysis_type: self.config.analysis_type.clone(),
        };

        match self.upload_with_retry(&mut task, &request).await {
            Ok(response) if response.success => {
                self.succeed(task, response, content_sha256, false)
            }
            Ok(response) => {
                let reason = response.failure_reason();
                self.fail(task, reason)
            }
            Err(e) if self.config.demo_fallback && e.is_transient() => {
                self.events.emit(&UploadEvent::DemoFallback {
                    task_id: task.id,
                    file_name: task.file_name().to_string(),
                    error: e.to_string(),
                });
                let demo =
                    fabricate_demo_response(task.file_name(), task.file.size_bytes, task.is_pid);
                self.succeed(task, demo, content_sha256, true)
            }
            Err(e) => self.fail(task, e.to_string()),
        }
    }

    /// Attempt the upload until it succeeds, fails permanently, or the retry
    /// budget is spent. Each attempt is bounded by the task's timeout.
    async fn upload_with_retry(
        &self,
        task: &mut UploadTask,
        request: &UploadRequest,
    ) -> Result<AnalysisResponse, BackendError> {
        let max_attempts = self.config.max_attempts();

        loop {
            let attempt = task
                .begin_attempt()
                .ok_or_else(|| BackendError::InvalidRequest("task already finished".into()))?;

            self.events.emit(&UploadEvent::Started {
                task_id: task.id,
                file_name: task.file_name().to_string(),
                attempt,
                max_attempts,
                timeout_secs: task.timeout.as_secs(),
            });

            let result = match tokio::time::timeout(task.timeout, self.backend.analyze(request)).await
            {
                Ok(result) => result,
                Err(_) => Err(BackendError::Timeout {
                    after_secs: task.timeout.as_secs_f64(),
                }),
            };

            match result {
                Ok(response) => return Ok(response),
                Err(e) if e.is_transient() && attempt < max_attempts => {
                    tracing::warn!(
                        task_id = %task.id,
                        file = %task.file_name(),
                        attempt,
                        error = %e,
                        "Upload attempt failed, retrying"
                    );
                    task.record_attempt_error(e.to_string());
                    self.events.emit(&UploadEvent::Retrying {
                        task_id: task.id,
                        file_name: task.file_name().to_string(),
                        attempt,
                        delay_ms: self.config.retry_delay.as_millis() as u64,
                        error: e.to_string(),
                    });
                    tokio::time::sleep(self.config.retry_delay).await;
                }
                Err(e) => {
                    task.record_attempt_error(e.to_string());
                    return Err(e);
                }
            }
        }
    }

    fn succeed(
        &self,
        mut task: UploadTask,
        response: AnalysisResponse,
        content_sha256: String,
        demo: bool,
    ) -> UploadOutcome {
        let mut result = response.analysis_result;
        if result.file_name.trim().is_empty() {
            result.file_name = task.file_name().to_string();
        }

        task.mark_success();
        tracing::info!(
            task_id = %task.id,
            file = %task.file_name(),
            attempts = task.attempts,
            demo,
            "Document analyzed"
        );
        if !demo {
            self.events.emit(&UploadEvent::Succeeded {
                task_id: task.id,
                file_name: task.file_name().to_string(),
                attempts: task.attempts,
            });
        }

        UploadOutcome {
            task,
            analysis: Some(CompletedAnalysis {
                result,
                report: response.report,
                content_sha256,
                demo,
            }),
        }
    }

    fn fail(&self, mut task: UploadTask, message: String) -> UploadOutcome {
        tracing::warn!(
            task_id = %task.id,
            file = %task.file_name(),
            attempts = task.attempts,
            error = %message,
            "Document upload failed"
        );
        self.events.emit(&UploadEvent::Failed {
            task_id: task.id,
            file_name: task.file_name().to_string(),
            attempts: task.attempts,
            error: message.clone(),
        });
        task.mark_error(message);
        UploadOutcome {
            task,
            analysis: None,
        }
    }
}
