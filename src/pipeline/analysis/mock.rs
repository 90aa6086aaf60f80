use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use super::types::{AnalysisBackend, UploadRequest};
use super::BackendError;
use crate::models::{AnalysisResponse, AnalysisResult};

/// One scripted reaction of the mock backend.
#[derive(Debug, Clone)]
pub enum MockStep {
    Reply(Result<AnalysisResponse, BackendError>),
    /// Sleep before replying successfully; used to trip timeouts.
    Stall(Duration),
}

/// Mock analysis backend for testing. Plays back a script of replies,
/// then repeats the fallback step forever.
pub struct MockAnalysisBackend {
    script: Mutex<VecDeque<MockStep>>,
    fallback: MockStep,
    calls: AtomicU32,
    files: Mutex<Vec<String>>,
}

impl MockAnalysisBackend {
    pub fn new(fallback: MockStep) -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            fallback,
            calls: AtomicU32::new(0),
            files: Mutex::new(Vec::new()),
        }
    }

    /// Always succeed, echoing the uploaded file name.
    pub fn succeeding() -> Self {
        Self::new(MockStep::Reply(Ok(AnalysisResponse {
            success: true,
            ..Default::default()
        })))
    }

    /// Always fail with the same error.
    pub fn failing(error: BackendError) -> Self {
        Self::new(MockStep::Reply(Err(error)))
    }

    /// Steps played in order before the fallback takes over.
    pub fn with_script(self, steps: Vec<MockStep>) -> Self {
        if let Ok(mut script) = self.script.lock() {
            script.extend(steps);
        }
        self
    }

    pub fn call_count(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    /// File names received, one entry per attempt.
    pub fn requested_files(&self) -> Vec<String> {
        self.files.lock().map(|f| f.clone()).unwrap_or_default()
    }

    fn next_step(&self) -> MockStep {
        self.script
            .lock()
            .ok()
            .and_then(|mut s| s.pop_front())
            .unwrap_or_else(|| self.fallback.clone())
    }
}

impl AnalysisBackend for MockAnalysisBackend {
    async fn analyze(&self, request: &UploadRequest) -> Result<AnalysisResponse, BackendError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut files) = self.files.lock() {
            files.push(request.file_name.clone());
        }

        let reply = match self.next_step() {
            MockStep::Reply(reply) => reply,
            MockStep::Stall(duration) => {
                tokio::time::sleep(duration).await;
                Ok(AnalysisResponse {
                    success: true,
                    ..Default::default()
                })
            }
        };

        reply.map(|mut response| {
            if response.success && response.analysis_result.file_name.is_empty() {
                response.analysis_result = AnalysisResult {
                    file_name: request.file_name.clone(),
                    status: "completed".into(),
                    ..response.analysis_result
                };
            }
            response
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::upload_config::ReportFormat;

    fn request() -> UploadRequest {
        UploadRequest {
            file_name: "valve_list.xlsx".into(),
            mime_type: "application/octet-stream".into(),
            bytes: vec![1, 2, 3],
            report_format: ReportFormat::Json,
            analysis_type: "comprehensive".into(),
        }
    }

    #[tokio::test]
    async fn succeeding_echoes_file_name() {
        let backend = MockAnalysisBackend::succeeding();
        let response = backend.analyze(&request()).await.unwrap();
        assert!(response.success);
        assert_eq!(response.analysis_result.file_name, "valve_list.xlsx");
        assert_eq!(backend.call_count(), 1);
    }

    #[tokio::test]
    async fn script_then_fallback() {
        let backend = MockAnalysisBackend::succeeding().with_script(vec![MockStep::Reply(Err(
            BackendError::Connection("x".into()),
        ))]);
        assert!(backend.analyze(&request()).await.is_err());
        assert!(backend.analyze(&request()).await.is_ok());
        assert!(backend.analyze(&request()).await.is_ok());
        assert_eq!(backend.call_count(), 3);
        assert_eq!(backend.requested_files().len(), 3);
    }
}
