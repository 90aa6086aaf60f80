//! Upload pipeline configuration.
//!
//! Collects every tunable of the upload flow in one place: backend location,
//! retry budget, per-file timeout policy and the file allow-list. The CLI
//! builds one of these from flags and environment; tests build them directly.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config;

// ═══════════════════════════════════════════════════════════
// Defaults
// ═══════════════════════════════════════════════════════════

/// Retries after the first attempt (total attempts = MAX_RETRIES + 1).
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Fixed pause between attempts.
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(2);

/// Largest file accepted for upload.
pub const DEFAULT_MAX_FILE_SIZE: u64 = 50 * 1024 * 1024; // 50MB

/// Largest batch accepted in one run.
pub const DEFAULT_MAX_BATCH_FILES: usize = 50;

/// Extensions the backend knows how to analyze (lowercase, no dot).
pub const DEFAULT_ALLOWED_EXTENSIONS: &[&str] = &[
    "pdf", "png", "jpg", "jpeg", "tif", "tiff", "dwg", "dxf", "doc", "docx", "xls", "xlsx",
    "txt", "csv",
];

pub const DEFAULT_ANALYSIS_TYPE: &str = "comprehensive";

// ═══════════════════════════════════════════════════════════
// Types
// ═══════════════════════════════════════════════════════════

/// Artifact format requested from the backend and written locally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    #[default]
    Json,
    Pdf,
}

impl ReportFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Pdf => "pdf",
        }
    }

    pub fn extension(&self) -> &'static str {
        self.as_str()
    }
}

impl std::fmt::Display for ReportFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ReportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "pdf" => Ok(Self::Pdf),
            other => Err(format!("unknown report format: {other}")),
        }
    }
}

/// Linear timeout rule: `base + size_mb * per_mb`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeoutRate {
    pub base_secs: f64,
    pub per_mb_secs: f64,
}

/// Per-file timeout policy. P&ID drawings are dense and take the backend
/// longer, so they get their own (larger) rate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeoutPolicy {
    pub generic: TimeoutRate,
    pub pid: TimeoutRate,
    pub min: Duration,
    pub max: Duration,
}

impl Default for TimeoutPolicy {
    fn default() -> Self {
        Self {
            generic: TimeoutRate {
                base_secs: 30.0,
                per_mb_secs: 10.0,
            },
            pid: TimeoutRate {
                base_secs: 90.0,
                per_mb_secs: 20.0,
            },
            min: Duration::from_secs(30),
            max: Duration::from_secs(600),
        }
    }
}

/// Everything the upload pipeline needs to run a batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadConfig {
    /// Backend base URL, without trailing slash.
    pub base_url: String,
    /// Bearer token sent with every upload, if any.
    #[serde(skip_serializing)]
    pub bearer_token: Option<String>,
    pub analysis_type: String,
    pub report_format: ReportFormat,
    pub max_retries: u32,
    pub retry_delay: Duration,
    pub timeouts: TimeoutPolicy,
    pub max_file_size: u64,
    pub max_batch_files: usize,
    pub allowed_extensions: Vec<String>,
    /// Fabricate a demo result when the backend stays unreachable.
    /// Demo outcomes are flagged and never reported as real analyses.
    pub demo_fallback: bool,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            base_url: config::api_base_url(),
            bearer_token: None,
            analysis_type: DEFAULT_ANALYSIS_TYPE.to_string(),
            report_format: ReportFormat::default(),
            max_retries: DEFAULT_MAX_RETRIES,
            retry_delay: DEFAULT_RETRY_DELAY,
            timeouts: TimeoutPolicy::default(),
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            max_batch_files: DEFAULT_MAX_BATCH_FILES,
            allowed_extensions: DEFAULT_ALLOWED_EXTENSIONS
                .iter()
                .map(|e| e.to_string())
                .collect(),
            demo_fallback: false,
        }
    }
}

impl UploadConfig {
    /// Config pointing at a specific backend, other values default.
    pub fn for_backend(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            ..Self::default()
        }
    }

    /// Full URL of the analysis endpoint.
    pub fn analyze_url(&self) -> String {
        config::analyze_url(&self.base_url)
    }

    /// Total attempts a single file may consume.
    pub fn max_attempts(&self) -> u32 {
        self.max_retries + 1
    }

    pub fn is_extension_allowed(&self, extension: &str) -> bool {
        let ext = extension.trim_start_matches('.').to_ascii_lowercase();
        self.allowed_extensions.iter().any(|a| *a == ext)
    }
}

// ═══════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_consolidated() {
        let config = UploadConfig::for_backend("http://localhost:9000/");
        assert_eq!(config.base_url, "http://localhost:9000");
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.max_attempts(), 4);
        assert_eq!(config.retry_delay, Duration::from_secs(2));
        assert_eq!(config.analysis_type, "comprehensive");
        assert_eq!(config.report_format, ReportFormat::Json);
        assert!(!config.demo_fallback);
    }

    #[test]
    fn pid_rate_exceeds_generic() {
        let policy = TimeoutPolicy::default();
        assert!(policy.pid.base_secs > policy.generic.base_secs);
        assert!(policy.pid.per_mb_secs > policy.generic.per_mb_secs);
        assert!(policy.min < policy.max);
    }

    #[test]
    fn extension_allow_list_is_case_insensitive() {
        let config = UploadConfig::for_backend("http://localhost:8000");
        assert!(config.is_extension_allowed("PDF"));
        assert!(config.is_extension_allowed(".dwg"));
        assert!(!config.is_extension_allowed("exe"));
        assert!(!config.is_extension_allowed(""));
    }

    #[test]
    fn analyze_url_uses_fixed_path() {
        let config = UploadConfig::for_backend("https://edrs.example.com");
        assert_eq!(
            config.analyze_url(),
            "https://edrs.example.com/api/v1/edrs/analyze"
        );
    }

    #[test]
    fn report_format_parses() {
        assert_eq!("PDF".parse::<ReportFormat>().unwrap(), ReportFormat::Pdf);
        assert_eq!("json".parse::<ReportFormat>().unwrap(), ReportFormat::Json);
        assert!("html".parse::<ReportFormat>().is_err());
    }

    #[test]
    fn report_format_serializes() {
        let json = serde_json::to_string(&ReportFormat::Pdf).unwrap();
        assert_eq!(json, "\"pdf\"");
    }

    #[test]
    fn bearer_token_not_serialized() {
        let mut config = UploadConfig::for_backend("http://localhost:8000");
        config.bearer_token = Some("secret-token".into());
        let json = serde_json::to_string(&config).unwrap();
        assert!(!json.contains("secret-token"));
    }
}
