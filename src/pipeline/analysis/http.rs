use std::time::Duration;

use reqwest::multipart::{Form, Part};

use super::types::{AnalysisBackend, UploadRequest};
use super::BackendError;
use crate::config;
use crate::models::AnalysisResponse;
use crate::upload_config::UploadConfig;

/// Time allowed to establish the TCP/TLS connection. The overall attempt
/// timeout is applied by the orchestrator.
const CONNECT_TIMEOUT_SECS: u64 = 10;

/// EDRS analysis backend reached over HTTP multipart.
pub struct HttpAnalysisBackend {
    endpoint: String,
    client: reqwest::Client,
    bearer_token: Option<String>,
}

impl HttpAnalysisBackend {
    /// Create a client for `base_url`; the analysis path is appended.
    pub fn new(base_url: &str, bearer_token: Option<String>) -> Result<Self, BackendError> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .user_agent(format!("{}/{}", config::APP_NAME, config::APP_VERSION))
            .build()
            .map_err(|e| BackendError::InvalidRequest(format!("HTTP client setup: {e}")))?;

        Ok(Self {
            endpoint: config::analyze_url(base_url),
            client,
            bearer_token: bearer_token.filter(|t| !t.trim().is_empty()),
        })
    }

    pub fn from_config(config: &UploadConfig) -> Result<Self, BackendError> {
        Self::new(&config.base_url, config.bearer_token.clone())
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn build_form(request: &UploadRequest) -> Result<Form, BackendError> {
        let part = Part::bytes(request.bytes.clone())
            .file_name(request.file_name.clone())
            .mime_str(&request.mime_type)
            .map_err(|e| BackendError::InvalidRequest(format!("MIME type: {e}")))?;

        Ok(Form::new()
            .part("file", part)
            .text("report_format", request.report_format.as_str())
            .text("analysis_type", request.analysis_type.clone()))
    }

    fn classify(&self, e: reqwest::Error) -> BackendError {
        if e.is_connect() {
            BackendError::Connection(self.endpoint.clone())
        } else if e.is_decode() {
            BackendError::ResponseParsing(e.to_string())
        } else if e.is_builder() {
            BackendError::InvalidRequest(e.to_string())
        } else {
            BackendError::Transport(e.to_string())
        }
    }
}

impl AnalysisBackend for HttpAnalysisBackend {
    async fn analyze(&self, request: &UploadRequest) -> Result<AnalysisResponse, BackendError> {
        let form = Self::build_form(request)?;

        let mut builder = self.client.post(&self.endpoint).multipart(form);
        if let Some(token) = &self.bearer_token {
            builder = builder.bearer_auth(token);
        }

        tracing::debug!(
            endpoint = %self.endpoint,
            file = %request.file_name,
            bytes = request.bytes.len(),
            "Posting document for analysis"
        );

        let response = builder.send().await.map_err(|e| self.classify(e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let error = BackendError::Status {
                status: status.as_u16(),
                body: body.clone(),
            };
            // A structured `success: false` body is a backend-reported
            // failure, not a transport problem.
            if !error.is_transient() {
                if let Ok(parsed) = serde_json::from_str::<AnalysisResponse>(&body) {
                    if !parsed.success && (parsed.error.is_some() || parsed.message.is_some()) {
                        return Ok(parsed);
                    }
                }
            }
            return Err(error);
        }

        response
            .json::<AnalysisResponse>()
            .await
            .map_err(|e| BackendError::ResponseParsing(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::analysis::test_server::{refused_base_url, spawn_backend, MockServerConfig};
    use crate::upload_config::ReportFormat;

    fn request(name: &str) -> UploadRequest {
        UploadRequest {
            file_name: name.into(),
            mime_type: "application/pdf".into(),
            bytes: b"%PDF-1.4 test".to_vec(),
            report_format: ReportFormat::Pdf,
            analysis_type: "comprehensive".into(),
        }
    }

    #[test]
    fn constructor_appends_path() {
        let backend = HttpAnalysisBackend::new("http://localhost:8000/", None).unwrap();
        assert_eq!(backend.endpoint(), "http://localhost:8000/api/v1/edrs/analyze");
    }

    #[test]
    fn blank_token_ignored() {
        let backend = HttpAnalysisBackend::new("http://localhost:8000", Some("  ".into())).unwrap();
        assert!(backend.bearer_token.is_none());
    }

    #[tokio::test]
    async fn posts_multipart_fields_and_token() {
        let server = spawn_backend(MockServerConfig::default()).await;
        let backend =
            HttpAnalysisBackend::new(&server.base_url, Some("tok-123".into())).unwrap();

        let response = backend.analyze(&request("pid_diagram.pdf")).await.unwrap();
        assert!(response.success);
        assert_eq!(response.analysis_result.file_name, "pid_diagram.pdf");

        let seen = server.requests();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].file_name, "pid_diagram.pdf");
        assert_eq!(seen[0].file_len, 13);
        assert_eq!(seen[0].report_format, "pdf");
        assert_eq!(seen[0].analysis_type, "comprehensive");
        assert_eq!(seen[0].authorization.as_deref(), Some("Bearer tok-123"));
    }

    #[tokio::test]
    async fn connection_refused_is_transient() {
        let base = refused_base_url().await;
        let backend = HttpAnalysisBackend::new(&base, None).unwrap();
        let err = backend.analyze(&request("a.pdf")).await.unwrap_err();
        assert!(matches!(err, BackendError::Connection(_)), "got {err:?}");
        assert!(err.is_transient());
    }

    #[tokio::test]
    async fn structured_failure_body_is_returned() {
        let server = spawn_backend(MockServerConfig {
            status: 422,
            body: Some(serde_json::json!({"success": false, "error": "Drawing is unreadable"})),
            ..Default::default()
        })
        .await;
        let backend = HttpAnalysisBackend::new(&server.base_url, None).unwrap();
        let response = backend.analyze(&request("a.pdf")).await.unwrap();
        assert!(!response.success);
        assert_eq!(response.failure_reason(), "Drawing is unreadable");
    }

    #[tokio::test]
    async fn gateway_error_is_status_error() {
        let server = spawn_backend(MockServerConfig {
            status: 503,
            body: Some(serde_json::json!({"detail": "warming up"})),
            ..Default::default()
        })
        .await;
        let backend = HttpAnalysisBackend::new(&server.base_url, None).unwrap();
        let err = backend.analyze(&request("a.pdf")).await.unwrap_err();
        assert!(matches!(err, BackendError::Status { status: 503, .. }));
        assert!(err.is_transient());
    }

    #[tokio::test]
    async fn sparse_success_body_still_parses() {
        let server = spawn_backend(MockServerConfig {
            body: Some(serde_json::json!({
                "success": true,
                "analysis_result": {
                    "file_name": "a.pdf",
                    "tags_extracted": null,
                    "risk_level": null,
                    "technical_metrics": {"sheets": 3}
                },
                "report": null
            })),
            ..Default::default()
        })
        .await;
        let backend = HttpAnalysisBackend::new(&server.base_url, None).unwrap();
        let response = backend.analyze(&request("a.pdf")).await.unwrap();
        assert!(response.success);
        assert_eq!(response.analysis_result.tags_extracted, 0);
        assert_eq!(response.analysis_result.technical_metrics["sheets"], "3");
    }
}
