use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Analysis produced by the backend for one uploaded file.
///
/// Every field defaults so a sparse or partially-populated payload still
/// parses; the renderer decides how to present missing values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AnalysisResult {
    #[serde(deserialize_with = "string_or_number")]
    pub file_name: String,
    /// Backend status label, e.g. "completed".
    #[serde(deserialize_with = "string_or_number")]
    pub status: String,
    /// Confidence as the backend sent it; numbers are normalized to strings.
    #[serde(deserialize_with = "string_or_number")]
    pub confidence_score: String,
    #[serde(deserialize_with = "lenient_count")]
    pub tags_extracted: u32,
    #[serde(deserialize_with = "lenient_count")]
    pub values_extracted: u32,
    #[serde(deserialize_with = "lenient_count")]
    pub components_identified: u32,
    #[serde(deserialize_with = "string_or_number")]
    pub risk_level: String,
    #[serde(deserialize_with = "string_list")]
    pub recommendations: Vec<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub standards: Vec<StandardCheck>,
    /// Free-form metrics; numeric and boolean values are kept as text.
    #[serde(deserialize_with = "metric_map")]
    pub technical_metrics: BTreeMap<String, String>,
    #[serde(deserialize_with = "string_list")]
    pub ai_features: Vec<String>,
    #[serde(deserialize_with = "lenient_seconds")]
    pub processing_time_secs: Option<f64>,
}

/// Compliance check of the document against one engineering standard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct StandardCheck {
    #[serde(deserialize_with = "string_or_number")]
    pub standard: String,
    #[serde(deserialize_with = "string_or_number")]
    pub status: String,
    #[serde(deserialize_with = "string_or_number")]
    pub notes: String,
}

/// Report metadata returned next to the analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct BackendReport {
    #[serde(deserialize_with = "string_or_number")]
    pub report_id: String,
    pub report_data: serde_json::Value,
    pub html_content: Option<String>,
    pub pdf_base64: Option<String>,
}

/// Top-level response body of the analysis endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AnalysisResponse {
    #[serde(deserialize_with = "null_as_default")]
    pub success: bool,
    #[serde(deserialize_with = "null_as_default")]
    pub analysis_result: AnalysisResult,
    pub report: Option<BackendReport>,
    pub error: Option<String>,
    pub message: Option<String>,
}

impl AnalysisResponse {
    /// Human-readable reason for a `success: false` payload.
    pub fn failure_reason(&self) -> String {
        self.error
            .as_deref()
            .or(self.message.as_deref())
            .filter(|m| !m.trim().is_empty())
            .unwrap_or("Analysis failed on the server")
            .to_string()
    }
}

// ═══════════════════════════════════════════════════════════
// Lenient field decoding
// ═══════════════════════════════════════════════════════════
//
// `#[serde(default)]` only covers absent keys. The helpers below also map
// `null` and loosely typed values to the field's default.

fn value_to_string(value: Value) -> String {
    match value {
        Value::String(s) => s,
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Accept `"0.92"`, `0.92`, `92` or `null` for a text field.
fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(value_to_string(Value::deserialize(deserializer)?))
}

/// `null` becomes `T::default()`.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Counts sent as integers, floats, numeric strings or `null`.
fn lenient_count<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    let count = match Value::deserialize(deserializer)? {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64))
            .unwrap_or(0),
        Value::String(s) => s.trim().parse::<f64>().map(|f| f.max(0.0) as u64).unwrap_or(0),
        _ => 0,
    };
    Ok(u32::try_from(count).unwrap_or(u32::MAX))
}

fn lenient_seconds<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    })
}

/// A list of strings; a lone string becomes one entry, nulls are dropped.
fn string_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Array(items) => items
            .into_iter()
            .filter(|v| !v.is_null())
            .map(value_to_string)
            .collect(),
        Value::Null => Vec::new(),
        single => vec![value_to_string(single)],
    })
}

fn metric_map<'de, D>(deserializer: D) -> Result<BTreeMap<String, String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Object(map) => map
            .into_iter()
            .map(|(k, v)| (k, value_to_string(v)))
            .collect(),
        _ => BTreeMap::new(),
    })
}
