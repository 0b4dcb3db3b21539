//! Uploaded document model and text extraction
//!
//! Every uploaded file becomes a [`SourceDocument`]: a bounded text preview for
//! the LLM prompt plus the full extracted text retained for evidence search.
//! Extraction never fails upward; a document that cannot be parsed simply
//! carries empty text and finds no evidence later.

use calamine::{Data, Reader, Xlsx};
use serde::{Deserialize, Serialize};
use std::io::Cursor;

/// Preview budget for PDF and generic documents
pub const PDF_PREVIEW_CHARS: usize = 2000;

/// Preview budget for spreadsheets (wider, to capture full address tables)
pub const SPREADSHEET_PREVIEW_CHARS: usize = 8000;

/// Cell budget when flattening a workbook to text
const MAX_SPREADSHEET_CELLS: usize = 2000;

/// Document category, detected from MIME type or filename extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Pdf,
    Spreadsheet,
    Text,
}

impl DocumentKind {
    pub fn detect(mime_type: &str, filename: &str) -> Self {
        let mime = mime_type.to_lowercase();
        let name = filename.to_lowercase();
        if mime == "application/pdf" || name.ends_with(".pdf") {
            Self::Pdf
        } else if mime == "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
            || name.ends_with(".xlsx")
        {
            Self::Spreadsheet
        } else {
            Self::Text
        }
    }

    /// Preview budget for this kind of document
    pub fn preview_chars(&self) -> usize {
        match self {
            Self::Spreadsheet => SPREADSHEET_PREVIEW_CHARS,
            _ => PDF_PREVIEW_CHARS,
        }
    }
}

/// Full extracted text, shaped by whether the source has page structure
#[derive(Debug, Clone)]
pub enum DocumentText {
    /// Page-structured text (PDFs); enables page-numbered search hits
    Paged(Vec<String>),
    /// Flat text (plain text, CSV, spreadsheet previews)
    Flat(String),
}

impl DocumentText {
    fn joined(&self) -> String {
        match self {
            Self::Paged(pages) => pages.join("\n"),
            Self::Flat(text) => text.clone(),
        }
    }
}

/// One uploaded document, immutable after creation
#[derive(Debug, Clone)]
pub struct SourceDocument {
    pub filename: String,
    pub mime_type: String,
    pub size_bytes: usize,
    pub text_preview: String,
    pub kind: DocumentKind,
    text: DocumentText,
}

/// Serializable per-document metadata for response bodies.
/// Full text is never re-serialized.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentMeta {
    pub filename: String,
    pub mime_type: String,
    pub size_bytes: usize,
    pub text_preview: String,
}

impl SourceDocument {
    /// Build a document from raw uploaded bytes. Never fails: parse errors
    /// degrade to empty text.
    pub fn from_bytes(filename: &str, mime_type: &str, data: &[u8]) -> Self {
        let kind = DocumentKind::detect(mime_type, filename);
        let text = match kind {
            DocumentKind::Pdf => DocumentText::Paged(extract_pdf_pages(data, filename)),
            DocumentKind::Spreadsheet => DocumentText::Flat(extract_xlsx_text(data, filename)),
            DocumentKind::Text => {
                DocumentText::Flat(String::from_utf8_lossy(data).trim().to_string())
            }
        };
        Self::assemble(filename, mime_type, data.len(), kind, text)
    }

    /// Build a page-structured document from already-extracted text
    pub fn from_pages(filename: &str, mime_type: &str, pages: Vec<String>) -> Self {
        let kind = DocumentKind::detect(mime_type, filename);
        let size = pages.iter().map(String::len).sum();
        Self::assemble(filename, mime_type, size, kind, DocumentText::Paged(pages))
    }

    /// Build a flat-text document from already-extracted text
    pub fn from_text(filename: &str, mime_type: &str, text: &str) -> Self {
        let kind = DocumentKind::detect(mime_type, filename);
        Self::assemble(
            filename,
            mime_type,
            text.len(),
            kind,
            DocumentText::Flat(text.to_string()),
        )
    }

    fn assemble(
        filename: &str,
        mime_type: &str,
        size_bytes: usize,
        kind: DocumentKind,
        text: DocumentText,
    ) -> Self {
        let text_preview = truncate_chars(&text.joined(), kind.preview_chars());
        Self {
            filename: filename.to_string(),
            mime_type: mime_type.to_string(),
            size_bytes,
            text_preview,
            kind,
            text,
        }
    }

    /// Full extracted text for evidence search
    pub fn text(&self) -> &DocumentText {
        &self.text
    }

    pub fn is_paged(&self) -> bool {
        matches!(self.text, DocumentText::Paged(_))
    }

    /// Metadata view for response serialization
    pub fn metadata(&self) -> DocumentMeta {
        DocumentMeta {
            filename: self.filename.clone(),
            mime_type: self.mime_type.clone(),
            size_bytes: self.size_bytes,
            text_preview: self.text_preview.clone(),
        }
    }
}

/// Extract page texts from PDF bytes. Pages are split on form feeds when the
/// extractor emits them; otherwise the whole text counts as one page.
fn extract_pdf_pages(data: &[u8], filename: &str) -> Vec<String> {
    let text = match pdf_extract::extract_text_from_mem(data) {
        Ok(text) => text,
        Err(e) => {
            tracing::warn!("PDF extraction failed for {}: {}", filename, e);
            return Vec::new();
        }
    };
    split_pages(&text)
}

/// Split extracted PDF text on form feeds. Blank pages stay in place so page
/// numbers keep matching the physical document; search skips them anyway.
fn split_pages(text: &str) -> Vec<String> {
    let pages: Vec<String> = text.split('\u{c}').map(|p| p.trim().to_string()).collect();
    if pages.iter().all(String::is_empty) {
        return Vec::new();
    }
    pages
}

/// Flatten an XLSX workbook to text: one header line per sheet, rows as
/// comma-joined non-empty cells, bounded by a total cell budget.
fn extract_xlsx_text(data: &[u8], filename: &str) -> String {
    let mut workbook: Xlsx<_> = match Xlsx::new(Cursor::new(data.to_vec())) {
        Ok(wb) => wb,
        Err(e) => {
            tracing::warn!("XLSX parsing failed for {}: {}", filename, e);
            return String::new();
        }
    };

    let mut lines = Vec::new();
    let mut cell_count = 0;
    for name in workbook.sheet_names() {
        let range = match workbook.worksheet_range(&name) {
            Ok(range) => range,
            Err(e) => {
                tracing::warn!("Skipping sheet {} in {}: {}", name, filename, e);
                continue;
            }
        };
        lines.push(format!("# Sheet: {}", name));
        for row in range.rows() {
            if cell_count >= MAX_SPREADSHEET_CELLS {
                break;
            }
            let vals: Vec<String> = row
                .iter()
                .filter(|c| !matches!(c, Data::Empty))
                .map(ToString::to_string)
                .collect();
            if !vals.is_empty() {
                cell_count += vals.len();
                lines.push(vals.join(", "));
            }
        }
        if cell_count >= MAX_SPREADSHEET_CELLS {
            break;
        }
    }
    lines.join("\n").trim().to_string()
}

/// Truncate to a character budget without splitting a char
pub(crate) fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text.to_string(),
    }
}
