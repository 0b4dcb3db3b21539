//! Provenance reconciliation
//!
//! Every extracted field value gets an evidence trail: either the citations
//! the model asserted, or a mechanical search over the source documents. The
//! two tiers are strict: model citations, when any exist, win outright and no
//! search runs at all. The fallback is likewise all-or-nothing; if the model
//! cited some fields and not others, the uncited fields get no search pass.

use crate::document::{DocumentText, SourceDocument};
use crate::llm::{ExtractionData, ExtractionField};
use crate::search::{search_flat, search_pages};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Sentinel document name for the primary email thread
pub const EMAIL_DOC_NAME: &str = "email_pdf";

/// Evidence for one extracted value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProvenanceEntry {
    /// `"email_pdf"` or an attachment filename
    pub doc: String,

    /// 1-based page number; only mechanically verified hits carry one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<usize>,

    pub snippet: String,

    /// The exact text the evidence corresponds to
    #[serde(default, rename = "match", skip_serializing_if = "Option::is_none")]
    pub matched: Option<String>,
}

/// Field-keyed evidence, entries in document scan order
pub type ProvenanceMap = BTreeMap<ExtractionField, Vec<ProvenanceEntry>>;

/// Outcome of the citation-preferred tier
#[derive(Debug, Clone, PartialEq)]
pub enum CitationPass {
    /// The model asserted at least one usable citation; these entries are final
    CitationsPresent(ProvenanceMap),
    /// No usable citations anywhere; fall back to source search
    NeedsSearch,
}

/// Resolve provenance for a successful extraction
pub fn resolve(
    data: &ExtractionData,
    email: &SourceDocument,
    attachments: &[SourceDocument],
) -> ProvenanceMap {
    match citation_pass(data) {
        CitationPass::CitationsPresent(map) => map,
        CitationPass::NeedsSearch => search_pass(data, email, attachments),
    }
}

/// Tier 1: normalize model-asserted citations. Citations carry no verified
/// page number. A blank source means the email thread.
pub fn citation_pass(data: &ExtractionData) -> CitationPass {
    let mut map = ProvenanceMap::new();
    for (field, citations) in &data.citations {
        let entries: Vec<ProvenanceEntry> = citations
            .iter()
            .filter_map(|citation| {
                let snippet = citation.snippet.as_deref().map(str::trim)?;
                if snippet.is_empty() {
                    return None;
                }
                let doc = match citation.source.as_deref().map(str::trim) {
                    Some(source) if !source.is_empty() => source.to_string(),
                    _ => EMAIL_DOC_NAME.to_string(),
                };
                Some(ProvenanceEntry {
                    doc,
                    page: None,
                    snippet: snippet.to_string(),
                    matched: citation
                        .matched
                        .as_deref()
                        .map(str::trim)
                        .filter(|m| !m.is_empty())
                        .map(ToString::to_string),
                })
            })
            .collect();
        if !entries.is_empty() {
            map.insert(*field, entries);
        }
    }

    if map.is_empty() {
        CitationPass::NeedsSearch
    } else {
        CitationPass::CitationsPresent(map)
    }
}

/// Tier 2: search every non-blank value across all documents, email first,
/// attachments in upload order.
fn search_pass(
    data: &ExtractionData,
    email: &SourceDocument,
    attachments: &[SourceDocument],
) -> ProvenanceMap {
    let mut map = ProvenanceMap::new();

    for (field, value) in data.scalar_values() {
        let Some(value) = value else { continue };
        let entries = search_all_documents(value, email, attachments);
        if !entries.is_empty() {
            map.insert(field, entries);
        }
    }

    let mut address_entries = Vec::new();
    for address in &data.property_addresses {
        address_entries.extend(search_all_documents(address, email, attachments));
    }
    if !address_entries.is_empty() {
        map.insert(ExtractionField::PropertyAddresses, address_entries);
    }

    map
}

/// Scan all documents for one value. Email first, then attachments in upload
/// order. Blank values and values absent from every source yield no entries.
fn search_all_documents(
    value: &str,
    email: &SourceDocument,
    attachments: &[SourceDocument],
) -> Vec<ProvenanceEntry> {
    let value = value.trim();
    if value.is_empty() {
        return Vec::new();
    }

    let mut entries = document_hits(email, EMAIL_DOC_NAME, value);
    for attachment in attachments {
        entries.extend(document_hits(attachment, &attachment.filename, value));
    }
    entries
}

/// First-occurrence hits within one document: paged search for documents with
/// page structure, flat search otherwise.
fn document_hits(doc: &SourceDocument, doc_name: &str, value: &str) -> Vec<ProvenanceEntry> {
    match doc.text() {
        DocumentText::Paged(pages) => search_pages(pages, value, 1)
            .into_iter()
            .map(|hit| ProvenanceEntry {
                doc: doc_name.to_string(),
                page: Some(hit.page),
                snippet: hit.snippet,
                matched: Some(value.to_string()),
            })
            .collect(),
        DocumentText::Flat(text) => search_flat(text, value)
            .map(|snippet| ProvenanceEntry {
                doc: doc_name.to_string(),
                page: None,
                snippet,
                matched: Some(value.to_string()),
            })
            .into_iter()
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::Citation;

    fn data_with_citation(snippet: Option<&str>) -> ExtractionData {
        ExtractionData {
            broker_name: Some("John Smith".to_string()),
            citations: [(
                ExtractionField::BrokerName,
                vec![Citation {
                    source: Some("email_pdf".to_string()),
                    snippet: snippet.map(ToString::to_string),
                    matched: Some("John Smith".to_string()),
                }],
            )]
            .into_iter()
            .collect(),
            ..Default::default()
        }
    }

    #[test]
    fn test_citation_pass_present() {
        let pass = citation_pass(&data_with_citation(Some("...Smith...")));
        match pass {
            CitationPass::CitationsPresent(map) => {
                let entries = &map[&ExtractionField::BrokerName];
                assert_eq!(entries.len(), 1);
                assert_eq!(entries[0].doc, "email_pdf");
                assert_eq!(entries[0].page, None);
            }
            CitationPass::NeedsSearch => panic!("expected citations"),
        }
    }

    #[test]
    fn test_blank_snippets_do_not_count_as_citations() {
        assert_eq!(citation_pass(&data_with_citation(Some("  "))), CitationPass::NeedsSearch);
        assert_eq!(citation_pass(&data_with_citation(None)), CitationPass::NeedsSearch);
        assert_eq!(citation_pass(&ExtractionData::default()), CitationPass::NeedsSearch);
    }

    #[test]
    fn test_blank_source_defaults_to_email() {
        let mut data = data_with_citation(Some("quoted text"));
        data.citations
            .get_mut(&ExtractionField::BrokerName)
            .unwrap()[0]
            .source = Some("   ".to_string());
        match citation_pass(&data) {
            CitationPass::CitationsPresent(map) => {
                assert_eq!(map[&ExtractionField::BrokerName][0].doc, EMAIL_DOC_NAME);
            }
            CitationPass::NeedsSearch => panic!("expected citations"),
        }
    }
}
