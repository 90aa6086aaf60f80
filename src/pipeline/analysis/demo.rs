//! Offline demo analysis.
//!
//! When enabled, a task whose backend stays unreachable gets a locally
//! fabricated result instead of an error. The result is deterministic for
//! a given file and always labelled "demo" so it cannot pass for a real
//! analysis.

use std::collections::BTreeMap;

use crate::models::{AnalysisResponse, AnalysisResult, BackendReport, StandardCheck};

pub const DEMO_STATUS: &str = "demo";

/// Build a demo response for `file_name`. Counts scale with file size so
/// different files do not all look identical.
pub fn fabricate_demo_response(file_name: &str, size_bytes: u64, is_pid: bool) -> AnalysisResponse {
    let size_kb = (size_bytes / 1024) as u32;
    let (tags, values, components) = if is_pid {
        (24 + size_kb % 40, 60 + size_kb % 90, 12 + size_kb % 25)
    } else {
        (4 + size_kb % 10, 15 + size_kb % 30, 2 + size_kb % 8)
    };

    let mut recommendations = vec![
        "Verify document revision against the master register".to_string(),
        "Re-run analysis once the EDRS backend is reachable".to_string(),
    ];
    let mut standards = vec![StandardCheck {
        standard: "ISO 7200".into(),
        status: "not evaluated".into(),
        notes: "Title block check requires backend analysis".into(),
    }];
    if is_pid {
        recommendations.insert(
            0,
            "Cross-check instrument tags with the instrument index".to_string(),
        );
        standards.push(StandardCheck {
            standard: "ISA-5.1".into(),
            status: "not evaluated".into(),
            notes: "Instrument symbology check requires backend analysis".into(),
        });
    }

    let mut technical_metrics = BTreeMap::new();
    technical_metrics.insert("source".to_string(), "offline demo".to_string());
    technical_metrics.insert("file_size_kb".to_string(), size_kb.to_string());

    AnalysisResponse {
        success: true,
        analysis_result: AnalysisResult {
            file_name: file_name.to_string(),
            status: DEMO_STATUS.into(),
            confidence_score: "0.75".into(),
            tags_extracted: tags,
            values_extracted: values,
            components_identified: components,
            risk_level: "Unknown".into(),
            recommendations,
            standards,
            technical_metrics,
            ai_features: Vec::new(),
            processing_time_secs: None,
        },
        report: Some(BackendReport {
            report_id: format!("demo-{}", file_name),
            ..Default::default()
        }),
        error: None,
        message: Some("Demo analysis generated locally".into()),
    }
}
