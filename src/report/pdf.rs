//! PDF report layout via `printpdf`.
//!
//! A4 portrait: a filled header band on the first page, then tables for
//! document info, technical metrics, standards and recommendations. Rows
//! that would cross the bottom margin start a new page, and table headers
//! repeat on the new page.

use std::io::BufWriter;
use std::panic::{catch_unwind, AssertUnwindSafe};

use printpdf::*;

use super::{ReportDocument, ReportError};
use crate::config;

const PAGE_W: f32 = 210.0;
const PAGE_H: f32 = 297.0;
const MARGIN_X: f32 = 20.0;
const TOP_MARGIN: f32 = 20.0;
const BOTTOM_MARGIN: f32 = 20.0;
const HEADER_BAND_H: f32 = 28.0;
const LINE_H: f32 = 4.5;
const ROW_PAD: f32 = 1.5;
const BODY_SIZE: f32 = 9.0;
/// Approximate Helvetica glyph width at 9pt, in mm.
const CHAR_W_MM: f32 = 1.7;

struct Column {
    header: &'static str,
    width: f32,
}

impl Column {
    const fn new(header: &'static str, width: f32) -> Self {
        Self { header, width }
    }

    fn capacity(&self) -> usize {
        ((self.width - 2.0) / CHAR_W_MM).max(4.0) as usize
    }
}

struct Canvas<'a> {
    doc: &'a PdfDocumentReference,
    layer: PdfLayerReference,
    font: IndirectFontRef,
    bold: IndirectFontRef,
    y: f32,
    pages: usize,
}

impl<'a> Canvas<'a> {
    fn text(&self, text: &str, size: f32, x: f32, bold: bool) {
        let font = if bold { &self.bold } else { &self.font };
        self.layer
            .use_text(pdf_safe(text), size, Mm(x), Mm(self.y), font);
    }

    fn rule(&self, thickness: f32) {
        self.layer.set_outline_thickness(thickness);
        self.layer.add_line(Line {
            points: vec![
                (Point::new(Mm(MARGIN_X), Mm(self.y)), false),
                (Point::new(Mm(PAGE_W - MARGIN_X), Mm(self.y)), false),
            ],
            is_closed: false,
        });
    }

    fn new_page(&mut self) {
        let (page, layer) = self
            .doc
            .add_page(Mm(PAGE_W), Mm(PAGE_H), format!("Page {}", self.pages + 1));
        self.layer = self.doc.get_page(page).get_layer(layer);
        self.pages += 1;
        self.y = PAGE_H - TOP_MARGIN;
        self.footer();
    }

    /// Returns true if a new page was started.
    fn ensure_space(&mut self, height: f32) -> bool {
        if self.y - height < BOTTOM_MARGIN {
            self.new_page();
            true
        } else {
            false
        }
    }

    fn footer(&self) {
        let text = format!(
            "{} client v{} - page {}",
            config::APP_NAME,
            config::APP_VERSION,
            self.pages
        );
        self.layer
            .use_text(text, 7.0, Mm(MARGIN_X), Mm(BOTTOM_MARGIN / 2.0), &self.font);
    }

    fn header_band(&mut self, title: &str, subtitle: &str) {
        let bottom = PAGE_H - HEADER_BAND_H;
        self.layer
            .set_fill_color(Color::Rgb(Rgb::new(0.11, 0.25, 0.45, None)));
        self.layer
            .add_rect(Rect::new(Mm(0.0), Mm(bottom), Mm(PAGE_W), Mm(PAGE_H)));

        self.layer
            .set_fill_color(Color::Rgb(Rgb::new(1.0, 1.0, 1.0, None)));
        let (size, lines) = title_lines(title);
        self.y = if lines.len() > 1 { PAGE_H - 9.0 } else { PAGE_H - 13.0 };
        for line in &lines {
            self.text(line, size, MARGIN_X, true);
            self.y -= 5.5;
        }
        self.y = bottom + 5.0;
        self.text(subtitle, 9.0, MARGIN_X, false);

        self.layer
            .set_fill_color(Color::Rgb(Rgb::new(0.0, 0.0, 0.0, None)));
        self.y = bottom - 10.0;
    }

    fn section_title(&mut self, title: &str) {
        self.ensure_space(6.0 + 2.0 * (LINE_H + ROW_PAD));
        self.text(title, 11.0, MARGIN_X, true);
        self.y -= 6.0;
    }

    fn header_row(&mut self, columns: &[Column]) {
        let mut x = MARGIN_X;
        for col in columns {
            self.text(col.header, BODY_SIZE, x + 1.0, true);
            x += col.width;
        }
        self.y -= ROW_PAD;
        self.rule(0.6);
        self.y -= LINE_H;
    }

    fn table(&mut self, title: &str, columns: &[Column], rows: &[Vec<String>]) {
        if rows.is_empty() {
            return;
        }
        self.section_title(title);
        self.header_row(columns);

        for row in rows {
            let cells: Vec<Vec<String>> = columns
                .iter()
                .zip(row.iter())
                .map(|(col, cell)| wrap_text(cell, col.capacity()))
                .collect();
            let lines = cells.iter().map(Vec::len).max().unwrap_or(1).max(1);
            let height = lines as f32 * LINE_H + ROW_PAD;

            if self.ensure_space(height) {
                self.header_row(columns);
            }

            let top = self.y;
            let mut x = MARGIN_X;
            for (col, cell_lines) in columns.iter().zip(cells.iter()) {
                self.y = top;
                for line in cell_lines {
                    self.text(line, BODY_SIZE, x + 1.0, false);
                    self.y -= LINE_H;
                }
                x += col.width;
            }
            self.y = top - (lines as f32 - 1.0) * LINE_H - ROW_PAD;
            self.rule(0.2);
            self.y -= LINE_H;
        }
        self.y -= 4.0;
    }
}

/// Lay out the report. Returns the document and its page count.
fn layout(doc: &ReportDocument) -> Result<(PdfDocumentReference, usize), ReportError> {
    let title = doc.title();
    let (pdf, page1, layer1) = PdfDocument::new(&title, Mm(PAGE_W), Mm(PAGE_H), "Page 1");
    let font = pdf
        .add_builtin_font(BuiltinFont::Helvetica)
        .map_err(|e| ReportError::Render(format!("PDF font error: {e}")))?;
    let bold = pdf
        .add_builtin_font(BuiltinFont::HelveticaBold)
        .map_err(|e| ReportError::Render(format!("PDF font error: {e}")))?;

    let pages;
    {
        let mut canvas = Canvas {
            doc: &pdf,
            layer: pdf.get_page(page1).get_layer(layer1),
            font,
            bold,
            y: PAGE_H - TOP_MARGIN,
            pages: 1,
        };

        let subtitle = format!(
            "Report {} - generated {}",
            doc.report_id,
            doc.generated_at.format("%Y-%m-%d %H:%M UTC")
        );
        canvas.header_band(&title, &subtitle);
        canvas.footer();

        canvas.table(
            "DOCUMENT INFORMATION",
            &[Column::new("Field", 45.0), Column::new("Value", 125.0)],
            &document_info_rows(doc),
        );
        canvas.table(
            "TECHNICAL METRICS",
            &[Column::new("Metric", 85.0), Column::new("Value", 85.0)],
            &metric_rows(doc),
        );
        canvas.table(
            "STANDARDS",
            &[
                Column::new("Standard", 40.0),
                Column::new("Status", 35.0),
                Column::new("Notes", 95.0),
            ],
            &standard_rows(doc),
        );
        canvas.table(
            "RECOMMENDATIONS",
            &[Column::new("#", 12.0), Column::new("Recommendation", 158.0)],
            &recommendation_rows(doc),
        );

        pages = canvas.pages;
    }

    Ok((pdf, pages))
}

fn document_info_rows(doc: &ReportDocument) -> Vec<Vec<String>> {
    let d = &doc.display;
    let mut rows = vec![
        vec!["Report ID".into(), doc.report_id.clone()],
        vec!["File name".into(), doc.file_name.clone()],
        vec!["File size".into(), format_size(doc.file_size_bytes)],
        vec!["SHA-256".into(), doc.content_sha256.clone()],
        vec!["Status".into(), d.status_label.clone()],
        vec!["Confidence".into(), d.confidence.clone()],
        vec!["Risk level".into(), d.risk_level.clone()],
        vec![
            "P&ID detected".into(),
            if doc.is_pid { "Yes" } else { "No" }.into(),
        ],
        vec!["Upload attempts".into(), doc.attempts.to_string()],
        vec!["AI features".into(), d.feature_tags.join(", ")],
    ];
    if doc.demo {
        rows.push(vec![
            "Mode".into(),
            "DEMO - generated locally, backend unreachable".into(),
        ]);
    }
    rows
}

fn metric_rows(doc: &ReportDocument) -> Vec<Vec<String>> {
    let d = &doc.display;
    let mut rows = vec![
        vec!["Tags extracted".into(), d.tags_extracted.to_string()],
        vec!["Values extracted".into(), d.values_extracted.to_string()],
        vec![
            "Components identified".into(),
            d.components_identified.to_string(),
        ],
    ];
    if let Some(secs) = doc.analysis.processing_time_secs {
        rows.push(vec!["Processing time".into(), format!("{secs:.1}s")]);
    }
    for (key, value) in &doc.analysis.technical_metrics {
        rows.push(vec![key.replace('_', " "), value.clone()]);
    }
    rows
}

fn standard_rows(doc: &ReportDocument) -> Vec<Vec<String>> {
    doc.analysis
        .standards
        .iter()
        .map(|s| vec![s.standard.clone(), s.status.clone(), s.notes.clone()])
        .collect()
}

fn recommendation_rows(doc: &ReportDocument) -> Vec<Vec<String>> {
    doc.display
        .recommendations
        .iter()
        .enumerate()
        .map(|(i, r)| vec![(i + 1).to_string(), r.clone()])
        .collect()
}

/// Render the report to PDF bytes. Panics anywhere in layout or
/// serialization are caught and reported as render errors so callers can
/// fall back to JSON.
pub fn render_pdf(doc: &ReportDocument) -> Result<Vec<u8>, ReportError> {
    catch_unwind(AssertUnwindSafe(|| layout_and_save(doc)))
        .map_err(|_| ReportError::Render("PDF rendering panicked".into()))?
}

fn layout_and_save(doc: &ReportDocument) -> Result<Vec<u8>, ReportError> {
    let (pdf, pages) = layout(doc)?;

    let mut buf = BufWriter::new(Vec::new());
    pdf.save(&mut buf)
        .map_err(|e| ReportError::Render(format!("PDF save error: {e}")))?;
    let bytes = buf
        .into_inner()
        .map_err(|e| ReportError::Render(format!("PDF buffer error: {e}")))?;

    tracing::debug!(report_id = %doc.report_id, pages, bytes = bytes.len(), "PDF report rendered");
    Ok(bytes)
}

/// Page count the layout produces for a document.
pub fn page_count(doc: &ReportDocument) -> Result<usize, ReportError> {
    let (_, pages) = layout(doc)?;
    Ok(pages)
}

fn format_size(bytes: u64) -> String {
    const KB: f64 = 1024.0;
    let b = bytes as f64;
    if b >= KB * KB {
        format!("{:.2} MB", b / (KB * KB))
    } else if b >= KB {
        format!("{:.1} KB", b / KB)
    } else {
        format!("{bytes} B")
    }
}

/// Builtin PDF fonts cover Latin-1 only; map common typography to ASCII and
/// replace anything else.
fn pdf_safe(text: &str) -> String {
    text.chars()
        .map(|c| match c {
            '\u{2013}' | '\u{2014}' => '-',
            '\u{2018}' | '\u{2019}' => '\'',
            '\u{201C}' | '\u{201D}' => '"',
            '\u{2022}' | '\u{00B7}' => '*',
            c if c.is_control() => ' ',
            c if (c as u32) < 0x100 => c,
            _ => '?',
        })
        .collect()
}

/// Header band title: one line at 14pt, or up to two lines at 11pt.
/// Anything beyond two lines ends with "...".
fn title_lines(title: &str) -> (f32, Vec<String>) {
    const ONE_LINE_CHARS: usize = 60;
    const TWO_LINE_CHARS: usize = 85;

    if title.chars().count() <= ONE_LINE_CHARS {
        return (14.0, vec![title.to_string()]);
    }
    let mut lines = wrap_text(title, TWO_LINE_CHARS);
    if lines.len() > 2 {
        lines.truncate(2);
        let kept: String = lines[1].chars().take(TWO_LINE_CHARS - 3).collect();
        lines[1] = format!("{kept}...");
    }
    (11.0, lines)
}

/// Word-wrap for table cells; words longer than a line are split.
fn wrap_text(text: &str, max_chars: usize) -> Vec<String> {
    let max_chars = max_chars.max(1);
    let mut lines = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        let mut word: Vec<char> = word.chars().collect();
        while word.len() > max_chars {
            if !current.is_empty() {
                lines.push(std::mem::take(&mut current));
            }
            let rest = word.split_off(max_chars);
            lines.push(word.into_iter().collect());
            word = rest;
        }
        let word: String = word.into_iter().collect();
        let len = current.chars().count();
        if len + word.chars().count() + 1 > max_chars && !current.is_empty() {
            lines.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(&word);
    }
    if !current.is_empty() {
        lines.push(current);
    }
    if lines.is_empty() {
        lines.push(String::new());
    }
    lines
}
