//! Writing report artifacts to disk.
//!
//! PDF requests prefer the backend's own PDF, then a local render. If both
//! fail the same document is written as JSON and the artifact says so.

use std::collections::HashSet;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::{Path, PathBuf};

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::Serialize;

use super::{json, pdf, ReportDocument, ReportError};
use crate::models::BackendReport;
use crate::pipeline::upload::sanitize_filename;
use crate::upload_config::ReportFormat;

/// Where the artifact bytes came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactSource {
    /// PDF decoded from the backend's `pdf_base64`.
    Backend,
    /// Rendered locally from the report document.
    Local,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExportedArtifact {
    pub path: PathBuf,
    /// Format actually written.
    pub format: ReportFormat,
    pub requested: ReportFormat,
    pub fell_back: bool,
    pub fallback_reason: Option<String>,
    pub source: ArtifactSource,
}

fn report_stem(file_name: &str) -> String {
    let safe = sanitize_filename(file_name);
    Path::new(&safe)
        .file_stem()
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty())
        .unwrap_or("document")
        .to_string()
}

/// `<out_dir>/<stem>_analysis_report.<ext>`
pub fn artifact_path(out_dir: &Path, file_name: &str, format: ReportFormat) -> PathBuf {
    out_dir.join(format!(
        "{}_analysis_report.{}",
        report_stem(file_name),
        format.extension()
    ))
}

/// Hands out artifact paths in one output directory, never the same path
/// twice. Files sharing a stem (`unit100.pdf`, `unit100.dwg`) get
/// `<stem>_2_analysis_report.<ext>` and so on.
#[derive(Debug)]
pub struct ArtifactNames {
    out_dir: PathBuf,
    claimed: HashSet<PathBuf>,
}

impl ArtifactNames {
    pub fn new(out_dir: impl Into<PathBuf>) -> Self {
        Self {
            out_dir: out_dir.into(),
            claimed: HashSet::new(),
        }
    }

    pub fn out_dir(&self) -> &Path {
        &self.out_dir
    }

    pub fn claim(&mut self, file_name: &str, format: ReportFormat) -> PathBuf {
        let first = artifact_path(&self.out_dir, file_name, format);
        if self.claimed.insert(first.clone()) {
            return first;
        }
        let stem = report_stem(file_name);
        let mut n = 2u32;
        loop {
            let candidate = self.out_dir.join(format!(
                "{stem}_{n}_analysis_report.{}",
                format.extension()
            ));
            if self.claimed.insert(candidate.clone()) {
                return candidate;
            }
            n += 1;
        }
    }
}

/// Export using the built-in PDF renderer.
pub fn export_report(
    doc: &ReportDocument,
    backend_report: Option<&BackendReport>,
    format: ReportFormat,
    names: &mut ArtifactNames,
) -> Result<ExportedArtifact, ReportError> {
    export_report_with(doc, backend_report, format, names, pdf::render_pdf)
}

/// Export with a caller-supplied PDF renderer. A renderer that panics is
/// treated like one that returned an error.
pub fn export_report_with<F>(
    doc: &ReportDocument,
    backend_report: Option<&BackendReport>,
    format: ReportFormat,
    names: &mut ArtifactNames,
    render: F,
) -> Result<ExportedArtifact, ReportError>
where
    F: FnOnce(&ReportDocument) -> Result<Vec<u8>, ReportError>,
{
    std::fs::create_dir_all(names.out_dir())?;

    if format == ReportFormat::Json {
        return write_json(doc, names, format, None);
    }

    if let Some(bytes) = backend_report.and_then(|r| match decode_backend_pdf(r) {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::warn!(report_id = %doc.report_id, error = %e, "Ignoring backend PDF");
            None
        }
    }) {
        let path = names.claim(&doc.file_name, ReportFormat::Pdf);
        std::fs::write(&path, &bytes)?;
        tracing::info!(path = %path.display(), bytes = bytes.len(), "Saved backend PDF report");
        return Ok(ExportedArtifact {
            path,
            format: ReportFormat::Pdf,
            requested: format,
            fell_back: false,
            fallback_reason: None,
            source: ArtifactSource::Backend,
        });
    }

    let rendered = catch_unwind(AssertUnwindSafe(|| render(doc)))
        .unwrap_or_else(|_| Err(ReportError::Render("PDF renderer panicked".into())));

    match rendered {
        Ok(bytes) => {
            let path = names.claim(&doc.file_name, ReportFormat::Pdf);
            std::fs::write(&path, &bytes)?;
            tracing::info!(path = %path.display(), bytes = bytes.len(), "Wrote PDF report");
            Ok(ExportedArtifact {
                path,
                format: ReportFormat::Pdf,
                requested: format,
                fell_back: false,
                fallback_reason: None,
                source: ArtifactSource::Local,
            })
        }
        Err(e) => {
            tracing::warn!(
                report_id = %doc.report_id,
                error = %e,
                "PDF generation failed, falling back to JSON"
            );
            write_json(doc, names, format, Some(e.to_string()))
        }
    }
}

fn write_json(
    doc: &ReportDocument,
    names: &mut ArtifactNames,
    requested: ReportFormat,
    fallback_reason: Option<String>,
) -> Result<ExportedArtifact, ReportError> {
    let bytes = json::render_json(doc)?;
    let path = names.claim(&doc.file_name, ReportFormat::Json);
    std::fs::write(&path, &bytes)?;
    tracing::info!(path = %path.display(), "Wrote JSON report");
    Ok(ExportedArtifact {
        path,
        format: ReportFormat::Json,
        requested,
        fell_back: fallback_reason.is_some(),
        fallback_reason,
        source: ArtifactSource::Local,
    })
}

/// `Ok(None)` when the backend sent no PDF.
fn decode_backend_pdf(report: &BackendReport) -> Result<Option<Vec<u8>>, ReportError> {
    let Some(encoded) = report.pdf_base64.as_deref().map(str::trim) else {
        return Ok(None);
    };
    if encoded.is_empty() {
        return Ok(None);
    }
    let bytes = STANDARD
        .decode(encoded)
        .map_err(|e| ReportError::BackendPdf(e.to_string()))?;
    if !bytes.starts_with(b"%PDF") {
        return Err(ReportError::BackendPdf("missing %PDF header".into()));
    }
    Ok(Some(bytes))
}
