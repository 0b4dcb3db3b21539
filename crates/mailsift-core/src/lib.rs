//! Mailsift Core Library
//!
//! Ingests an email thread PDF plus attachments, extracts bounded text
//! previews, sends them to an LLM for structured field extraction, and
//! reconciles the model's claimed citations against the source documents to
//! produce a provenance trail per field.
//!
//! # Features
//! - Deterministic request fingerprinting (SHA-256 over canonical JSON) with
//!   a process-lifetime cache: at most one paid call per distinct request
//! - Two-tier provenance: model citations preferred, mechanical source search
//!   as the all-or-nothing fallback
//! - Page-aware evidence search with single-line context snippets

pub mod config;
pub mod document;
pub mod error;
pub mod llm;
pub mod provenance;
pub mod search;

pub use config::LlmServiceConfig;
pub use document::{
    DocumentKind, DocumentMeta, DocumentText, SourceDocument, PDF_PREVIEW_CHARS,
    SPREADSHEET_PREVIEW_CHARS,
};
pub use error::{Error, MailsiftError, Result};
pub use llm::{
    extract_with_cache, extraction_data_from_content, fingerprint, parse_model_content,
    AttachmentSummary, Citation, ExtractionCache, ExtractionClient, ExtractionData,
    ExtractionField, ExtractionOutcome, ExtractionRequest, OpenAiClient, ProviderErrorKind,
    ResultCache, TokenUsage,
};
pub use provenance::{
    citation_pass, resolve, CitationPass, ProvenanceEntry, ProvenanceMap, EMAIL_DOC_NAME,
};
pub use search::{build_snippet, search_flat, search_pages, PageHit, DEFAULT_CONTEXT_CHARS};
