//! Turning finished analyses into something a user can read or download.

pub mod display;
pub mod json;
pub mod pdf;
pub mod export;

pub use display::*;
pub use export::*;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::models::AnalysisResult;
use crate::pipeline::analysis::UploadOutcome;

#[derive(Error, Debug)]
pub enum ReportError {
    #[error("PDF rendering failed: {0}")]
    Render(String),

    #[error("Backend-supplied PDF is invalid: {0}")]
    BackendPdf(String),

    #[error("JSON encoding failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Everything written into a downloadable report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportDocument {
    pub report_id: String,
    pub generated_at: DateTime<Utc>,
    pub file_name: String,
    pub file_size_bytes: u64,
    pub content_sha256: String,
    pub is_pid: bool,
    pub demo: bool,
    pub attempts: u32,
    pub analysis: AnalysisResult,
    pub display: AnalysisDisplay,
}

impl ReportDocument {
    /// Build the report for a successful outcome; `None` for failed tasks.
    pub fn from_outcome(outcome: &UploadOutcome) -> Option<Self> {
        let analysis = outcome.analysis.as_ref()?;
        let task = &outcome.task;

        let report_id = analysis
            .report
            .as_ref()
            .map(|r| r.report_id.trim().to_string())
            .filter(|id| !id.is_empty())
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        Some(Self {
            report_id,
            generated_at: Utc::now(),
            file_name: task.file_name().to_string(),
            file_size_bytes: task.file.size_bytes,
            content_sha256: analysis.content_sha256.clone(),
            is_pid: task.is_pid,
            demo: analysis.demo,
            attempts: task.attempts,
            display: AnalysisDisplay::from_result(&analysis.result, task.is_pid),
            analysis: analysis.result.clone(),
        })
    }

    /// Heading shown in the PDF header band.
    pub fn title(&self) -> String {
        if self.demo {
            format!("EDRS Analysis Report (DEMO): {}", self.file_name)
        } else {
            format!("EDRS Analysis Report: {}", self.file_name)
        }
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use std::collections::BTreeMap;
    use std::path::PathBuf;

    use super::*;
    use crate::models::{BackendReport, StandardCheck};
    use crate::pipeline::analysis::CompletedAnalysis;
    use crate::pipeline::upload::{SizeCategory, UploadTask, ValidatedFile};
    use crate::upload_config::TimeoutPolicy;

    pub fn sample_result(recommendations: usize) -> AnalysisResult {
        let mut technical_metrics = BTreeMap::new();
        technical_metrics.insert("sheets".to_string(), "3".to_string());
        technical_metrics.insert("line_count".to_string(), "58".to_string());
        AnalysisResult {
            file_name: "pid_diagram.pdf".into(),
            status: "completed".into(),
            confidence_score: "0.92".into(),
            tags_extracted: 41,
            values_extracted: 120,
            components_identified: 17,
            risk_level: "Medium".into(),
            recommendations: (0..recommendations)
                .map(|i| format!("Recommendation {i}: verify PSV-{i:03} set pressure against the datasheet"))
                .collect(),
            standards: vec![StandardCheck {
                standard: "ISA-5.1".into(),
                status: "compliant".into(),
                notes: "Symbols conform".into(),
            }],
            technical_metrics,
            ai_features: vec![],
            processing_time_secs: Some(12.5),
        }
    }

    pub fn sample_outcome(recommendations: usize) -> UploadOutcome {
        let file = ValidatedFile {
            path: PathBuf::from("pid_diagram.pdf"),
            file_name: "pid_diagram.pdf".into(),
            extension: "pdf".into(),
            mime_type: "application/pdf".into(),
            size_bytes: 512 * 1024,
            size_category: SizeCategory::Small,
        };
        let mut task = UploadTask::new(file, &TimeoutPolicy::default());
        task.begin_attempt();
        task.mark_success();
        UploadOutcome {
            task,
            analysis: Some(CompletedAnalysis {
                result: sample_result(recommendations),
                report: Some(BackendReport {
                    report_id: "rpt-42".into(),
                    ..Default::default()
                }),
                content_sha256: "ab".repeat(32),
                demo: false,
            }),
        }
    }

    pub fn sample_document(recommendations: usize) -> ReportDocument {
        ReportDocument::from_outcome(&sample_outcome(recommendations)).unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;

    #[test]
    fn document_from_successful_outcome() {
        let doc = sample_document(2);
        assert_eq!(doc.report_id, "rpt-42");
        assert_eq!(doc.file_name, "pid_diagram.pdf");
        assert!(doc.is_pid);
        assert_eq!(doc.display.confidence, "92.0%");
        assert!(doc.display.feature_tags.contains(&"P&ID Analysis".to_string()));
        assert_eq!(doc.attempts, 1);
    }

    #[test]
    fn failed_outcome_has_no_document() {
        let mut outcome = sample_outcome(0);
        outcome.analysis = None;
        assert!(ReportDocument::from_outcome(&outcome).is_none());
    }

    #[test]
    fn missing_report_id_generates_one() {
        let mut outcome = sample_outcome(0);
        if let Some(a) = outcome.analysis.as_mut() {
            a.report = None;
        }
        let doc = ReportDocument::from_outcome(&outcome).unwrap();
        assert!(Uuid::parse_str(&doc.report_id).is_ok());
    }

    #[test]
    fn demo_title_is_marked() {
        let mut doc = sample_document(0);
        doc.demo = true;
        assert!(doc.title().contains("DEMO"));
    }
}
