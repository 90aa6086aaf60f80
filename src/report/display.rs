use serde::{Deserialize, Serialize};

use crate::models::AnalysisResult;

/// Presentation-ready view of an analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisDisplay {
    pub file_name: String,
    pub status_label: String,
    /// Confidence as a percentage string, e.g. "92.0%".
    pub confidence: String,
    pub tags_extracted: u32,
    pub values_extracted: u32,
    pub components_identified: u32,
    pub risk_level: String,
    pub recommendations: Vec<String>,
    pub feature_tags: Vec<String>,
}

impl AnalysisDisplay {
    pub fn from_result(result: &AnalysisResult, is_pid: bool) -> Self {
        Self {
            file_name: result.file_name.clone(),
            status_label: non_empty_or(&result.status, "completed"),
            confidence: format_confidence(&result.confidence_score),
            tags_extracted: result.tags_extracted,
            values_extracted: result.values_extracted,
            components_identified: result.components_identified,
            risk_level: non_empty_or(&result.risk_level, "Not assessed"),
            recommendations: result
                .recommendations
                .iter()
                .map(|r| r.trim())
                .filter(|r| !r.is_empty())
                .map(str::to_string)
                .collect(),
            feature_tags: feature_tags(result, is_pid),
        }
    }
}

/// Render a confidence value as a percentage.
///
/// Values in [0, 1] are fractions; larger numbers are already percentages.
/// Strings that already carry `%`, or are not numeric, pass through.
pub fn format_confidence(raw: &str) -> String {
    let raw = raw.trim();
    if raw.is_empty() {
        return "N/A".to_string();
    }
    if raw.ends_with('%') {
        return raw.to_string();
    }
    match raw.parse::<f64>() {
        Ok(v) if v.is_finite() && v >= 0.0 => {
            let pct = if v <= 1.0 { v * 100.0 } else { v };
            format!("{pct:.1}%")
        }
        _ => raw.to_string(),
    }
}

/// Categorize which AI capabilities contributed to an analysis.
pub fn feature_tags(result: &AnalysisResult, is_pid: bool) -> Vec<String> {
    let mut tags: Vec<String> = vec!["Document Classification".into(), "Text Extraction".into()];
    if is_pid {
        tags.push("P&ID Analysis".into());
        tags.push("Instrument Tag Detection".into());
    }
    if !result.standards.is_empty() {
        tags.push("Standards Compliance".into());
    }
    if !result.recommendations.is_empty() {
        tags.push("Risk Assessment".into());
    }
    for extra in &result.ai_features {
        let extra = extra.trim();
        if !extra.is_empty() && !tags.iter().any(|t| t.eq_ignore_ascii_case(extra)) {
            tags.push(extra.to_string());
        }
    }
    tags
}

fn non_empty_or(value: &str, fallback: &str) -> String {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        fallback.to_string()
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::StandardCheck;

    #[test]
    fn confidence_formats() {
        assert_eq!(format_confidence("0.92"), "92.0%");
        assert_eq!(format_confidence("1"), "100.0%");
        assert_eq!(format_confidence("87.5"), "87.5%");
        assert_eq!(format_confidence("95%"), "95%");
        assert_eq!(format_confidence("high"), "high");
        assert_eq!(format_confidence(""), "N/A");
        assert_eq!(format_confidence("-3"), "-3");
    }

    #[test]
    fn pid_gets_pid_tags() {
        let tags = feature_tags(&AnalysisResult::default(), true);
        assert!(tags.contains(&"P&ID Analysis".to_string()));
        assert!(tags.contains(&"Instrument Tag Detection".to_string()));
    }

    #[test]
    fn generic_file_has_no_pid_tag() {
        let tags = feature_tags(&AnalysisResult::default(), false);
        assert_eq!(tags, vec!["Document Classification", "Text Extraction"]);
    }

    #[test]
    fn backend_features_merged_without_duplicates() {
        let result = AnalysisResult {
            ai_features: vec!["p&id analysis".into(), "Line Sizing".into(), " ".into()],
            standards: vec![StandardCheck::default()],
            recommendations: vec!["x".into()],
            ..Default::default()
        };
        let tags = feature_tags(&result, true);
        assert_eq!(tags.iter().filter(|t| t.eq_ignore_ascii_case("P&ID Analysis")).count(), 1);
        assert!(tags.contains(&"Line Sizing".to_string()));
        assert!(tags.contains(&"Standards Compliance".to_string()));
        assert!(tags.contains(&"Risk Assessment".to_string()));
    }

    #[test]
    fn display_defaults_missing_labels() {
        let result = AnalysisResult {
            file_name: "a.pdf".into(),
            recommendations: vec!["  Check flange rating ".into(), "".into()],
            ..Default::default()
        };
        let display = AnalysisDisplay::from_result(&result, false);
        assert_eq!(display.status_label, "completed");
        assert_eq!(display.risk_level, "Not assessed");
        assert_eq!(display.confidence, "N/A");
        assert_eq!(display.recommendations, vec!["Check flange rating"]);
    }
}
