//! Prompt assembly for structured extraction
//!
//! The [`ExtractionRequest`] carries exactly what is sent to the model,
//! truncation included, so the cache fingerprint reflects the real prompt.

use crate::document::{truncate_chars, DocumentKind, SourceDocument};
use serde::{Deserialize, Serialize};

/// Preview budget per attachment in the prompt
pub const ATTACHMENT_SUMMARY_CHARS: usize = 500;

/// Wider prompt budget for spreadsheet attachments (address tables)
pub const SPREADSHEET_SUMMARY_CHARS: usize = 2000;

/// System role content for the extraction call
pub const SYSTEM_INSTRUCTIONS: &str = "You are a precise extraction assistant. \
    Extract brokerage details and property addresses from the provided email \
    thread text and attachment summaries. Always return strictly valid JSON \
    that conforms to the schema. No extra text.";

/// Schema description sent inside the user payload. Guess mode relaxes the
/// null rule and asks for confidence scores instead.
pub fn schema_instructions(guess_mode: bool) -> String {
    let mut rules = String::from(
        "Return a JSON object with exactly these fields and types:\n\
         {\n\
         \x20 \"broker_name\": string|null,\n\
         \x20 \"broker_email\": string|null,\n\
         \x20 \"brokerage\": string|null,\n\
         \x20 \"complete_brokerage_address\": string|null,\n\
         \x20 \"property_addresses\": [string],\n\
         \x20 \"citations\": {field: [{\"source\": string, \"snippet\": string, \"match\": string}]}\n\
         }\n\
         Rules:\n\
         - Use the email thread text primarily; use attachment summaries as secondary hints.\n\
         - \"property_addresses\" must be a list of unique, human-readable street addresses.\n\
         - For every non-null field, cite the source document and a short verbatim snippet.\n\
         - Use \"email_pdf\" as the source for the email thread, or the attachment filename.\n\
         - Do not include commentary, only the JSON object.\n",
    );
    if guess_mode {
        rules.push_str(
            "- You may infer unstated fields from context with lowered confidence.\n\
             - Report per-field confidence between 0 and 1 under \"field_confidence\".\n",
        );
    } else {
        rules.push_str("- If a field is not present, return null.\n");
    }
    rules
}

/// Attachment summary exactly as embedded in the prompt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttachmentSummary {
    pub filename: String,
    pub mime_type: String,
    pub size_bytes: usize,
    pub text_preview: String,
}

impl AttachmentSummary {
    /// Summarize a document for the prompt. Truncation happens here, before
    /// fingerprinting, so the cache key matches what the model sees.
    pub fn from_document(doc: &SourceDocument) -> Self {
        let budget = match doc.kind {
            DocumentKind::Spreadsheet => SPREADSHEET_SUMMARY_CHARS,
            _ => ATTACHMENT_SUMMARY_CHARS,
        };
        Self {
            filename: doc.filename.clone(),
            mime_type: doc.mime_type.clone(),
            size_bytes: doc.size_bytes,
            text_preview: truncate_chars(&doc.text_preview, budget),
        }
    }
}

/// Everything that determines one extraction call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionRequest {
    pub email_text: String,
    pub attachment_summaries: Vec<AttachmentSummary>,
    pub model: String,
    pub instructions: String,
    pub guess_mode: bool,
}

impl ExtractionRequest {
    pub fn new(
        email: &SourceDocument,
        attachments: &[SourceDocument],
        model: String,
        guess_mode: bool,
    ) -> Self {
        Self {
            email_text: email.text_preview.clone(),
            attachment_summaries: attachments
                .iter()
                .map(AttachmentSummary::from_document)
                .collect(),
            model,
            instructions: schema_instructions(guess_mode),
            guess_mode,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_truncation_by_kind() {
        let long = "c".repeat(4000);
        let sheet = SourceDocument::from_text(
            "units.xlsx",
            "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
            &long,
        );
        let notes = SourceDocument::from_text("notes.txt", "text/plain", &long);

        let sheet_summary = AttachmentSummary::from_document(&sheet);
        let notes_summary = AttachmentSummary::from_document(&notes);
        assert_eq!(sheet_summary.text_preview.chars().count(), SPREADSHEET_SUMMARY_CHARS);
        assert_eq!(notes_summary.text_preview.chars().count(), ATTACHMENT_SUMMARY_CHARS);
    }

    #[test]
    fn test_guess_mode_changes_instructions() {
        let strict = schema_instructions(false);
        let guess = schema_instructions(true);
        assert_ne!(strict, guess);
        assert!(strict.contains("return null"));
        assert!(guess.contains("field_confidence"));
    }

    #[test]
    fn test_request_carries_email_preview() {
        let email = SourceDocument::from_text("thread.pdf", "application/pdf", "hello");
        let request = ExtractionRequest::new(&email, &[], "gpt-4o-mini".to_string(), false);
        assert_eq!(request.email_text, "hello");
        assert!(request.attachment_summaries.is_empty());
    }
}
