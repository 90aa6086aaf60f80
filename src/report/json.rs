use super::{ReportDocument, ReportError};

/// Pretty-printed JSON dump of the whole report document.
pub fn render_json(doc: &ReportDocument) -> Result<Vec<u8>, ReportError> {
    let mut bytes = serde_json::to_vec_pretty(doc)?;
    bytes.push(b'\n');
    Ok(bytes)
}

/// Parse a previously exported JSON report.
pub fn parse_json(bytes: &[u8]) -> Result<ReportDocument, ReportError> {
    Ok(serde_json::from_slice(bytes)?)
}
