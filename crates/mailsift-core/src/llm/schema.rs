//! Typed schema for structured extraction results
//!
//! The model's JSON lands here through one boundary: [`extraction_data_from_content`].
//! Unknown field names in citation or confidence maps are dropped at that
//! boundary, never propagated. Content that is not valid JSON gets one salvage
//! pass before falling back to a raw payload.

use serde::de::Deserializer;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// The closed set of extraction fields
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionField {
    BrokerName,
    BrokerEmail,
    Brokerage,
    CompleteBrokerageAddress,
    PropertyAddresses,
}

impl ExtractionField {
    pub const ALL: [Self; 5] = [
        Self::BrokerName,
        Self::BrokerEmail,
        Self::Brokerage,
        Self::CompleteBrokerageAddress,
        Self::PropertyAddresses,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BrokerName => "broker_name",
            Self::BrokerEmail => "broker_email",
            Self::Brokerage => "brokerage",
            Self::CompleteBrokerageAddress => "complete_brokerage_address",
            Self::PropertyAddresses => "property_addresses",
        }
    }

    /// Parse a wire name, rejecting anything outside the closed set
    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|f| f.as_str() == name)
    }

    /// Whether the field is list-valued
    pub fn is_list(&self) -> bool {
        matches!(self, Self::PropertyAddresses)
    }
}

/// A model-asserted provenance claim, unverified against source text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Citation {
    /// `"email_pdf"` or an attachment filename; blank defaults to the email
    #[serde(default)]
    pub source: Option<String>,

    /// Supporting quote; the model sometimes spells this `quote`
    #[serde(default, alias = "quote")]
    pub snippet: Option<String>,

    /// Exact text the evidence corresponds to
    #[serde(default, rename = "match")]
    pub matched: Option<String>,
}

/// Parsed extraction payload from the model
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtractionData {
    #[serde(default)]
    pub broker_name: Option<String>,

    #[serde(default)]
    pub broker_email: Option<String>,

    #[serde(default)]
    pub brokerage: Option<String>,

    #[serde(default)]
    pub complete_brokerage_address: Option<String>,

    #[serde(default, deserialize_with = "de_nullable_list")]
    pub property_addresses: Vec<String>,

    #[serde(
        default,
        deserialize_with = "de_citations",
        skip_serializing_if = "BTreeMap::is_empty"
    )]
    pub citations: BTreeMap<ExtractionField, Vec<Citation>>,

    #[serde(
        default,
        deserialize_with = "de_confidence",
        skip_serializing_if = "BTreeMap::is_empty"
    )]
    pub field_confidence: BTreeMap<ExtractionField, f64>,

    /// Fallback key carrying unparseable model output verbatim
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw: Option<String>,
}

impl ExtractionData {
    /// Scalar field values in schema order
    pub fn scalar_values(&self) -> [(ExtractionField, Option<&String>); 4] {
        [
            (ExtractionField::BrokerName, self.broker_name.as_ref()),
            (ExtractionField::BrokerEmail, self.broker_email.as_ref()),
            (ExtractionField::Brokerage, self.brokerage.as_ref()),
            (
                ExtractionField::CompleteBrokerageAddress,
                self.complete_brokerage_address.as_ref(),
            ),
        ]
    }
}

fn de_nullable_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<String>>::deserialize(deserializer)?.unwrap_or_default())
}

fn de_citations<'de, D>(
    deserializer: D,
) -> Result<BTreeMap<ExtractionField, Vec<Citation>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<BTreeMap<String, serde_json::Value>>::deserialize(deserializer)?
        .unwrap_or_default();
    let mut out = BTreeMap::new();
    for (name, value) in raw {
        let Some(field) = ExtractionField::parse(&name) else {
            tracing::debug!("Dropping unknown citation field: {}", name);
            continue;
        };
        match serde_json::from_value::<Vec<Citation>>(value) {
            Ok(citations) => {
                out.insert(field, citations);
            }
            Err(e) => tracing::debug!("Dropping malformed citations for {}: {}", name, e),
        }
    }
    Ok(out)
}

fn de_confidence<'de, D>(deserializer: D) -> Result<BTreeMap<ExtractionField, f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<BTreeMap<String, serde_json::Value>>::deserialize(deserializer)?
        .unwrap_or_default();
    let mut out = BTreeMap::new();
    for (name, value) in raw {
        let Some(field) = ExtractionField::parse(&name) else {
            continue;
        };
        // bare float, or the object form {"score": f, "explanation": ...}
        let score = value
            .as_f64()
            .or_else(|| value.get("score").and_then(serde_json::Value::as_f64));
        if let Some(score) = score {
            out.insert(field, score);
        }
    }
    Ok(out)
}

/// Token usage reported by the provider
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TokenUsage {
    #[serde(default)]
    pub prompt_tokens: u64,
    #[serde(default)]
    pub completion_tokens: u64,
    #[serde(default)]
    pub total_tokens: u64,
}

/// Failure category for provider errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderErrorKind {
    Timeout,
    Provider,
}

/// Result of one extraction attempt, absorbing all failure modes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ExtractionOutcome {
    Ok {
        model: String,
        data: ExtractionData,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        usage: Option<TokenUsage>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        estimated_cost_usd: Option<f64>,
        latency_ms: u64,
        #[serde(default)]
        cached: bool,
    },
    Error {
        kind: ProviderErrorKind,
        message: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        latency_ms: Option<u64>,
    },
    Skipped {
        reason: String,
    },
}

impl ExtractionOutcome {
    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Ok { .. })
    }

    /// Parsed data when the outcome succeeded
    pub fn data(&self) -> Option<&ExtractionData> {
        match self {
            Self::Ok { data, .. } => Some(data),
            _ => None,
        }
    }
}

/// Best-effort salvage of a JSON object from model output: the substring from
/// the first `{` to the last `}`
fn salvage_json_object(content: &str) -> Option<serde_json::Value> {
    let start = content.find('{')?;
    let end = content.rfind('}')?;
    if end < start {
        return None;
    }
    serde_json::from_str(&content[start..=end]).ok()
}

/// Parse model output content into a JSON value, with one salvage pass.
/// Returns the raw content on failure so it can land under a fallback key.
pub fn parse_model_content(content: &str) -> Result<serde_json::Value, String> {
    if let Ok(value) = serde_json::from_str(content) {
        return Ok(value);
    }
    salvage_json_object(content).ok_or_else(|| content.to_string())
}

/// Boundary between model output and the typed schema. Never fails: anything
/// that resists parsing is retained verbatim under `raw`.
pub fn extraction_data_from_content(content: &str) -> ExtractionData {
    let value = match parse_model_content(content) {
        Ok(value) => value,
        Err(raw) => {
            return ExtractionData {
                raw: Some(raw),
                ..Default::default()
            }
        }
    };

    match serde_json::from_value(value) {
        Ok(data) => data,
        Err(e) => {
            tracing::debug!("Model output did not match extraction schema: {}", e);
            ExtractionData {
                raw: Some(content.to_string()),
                ..Default::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_parse_round_trip() {
        for field in ExtractionField::ALL {
            assert_eq!(ExtractionField::parse(field.as_str()), Some(field));
        }
        assert_eq!(ExtractionField::parse("listing_agent"), None);
    }

    #[test]
    fn test_only_property_addresses_is_list() {
        assert!(ExtractionField::PropertyAddresses.is_list());
        assert!(!ExtractionField::BrokerName.is_list());
    }

    #[test]
    fn test_parse_full_payload() {
        let content = r#"{
            "broker_name": "John Smith",
            "broker_email": null,
            "brokerage": "Acme Brokerage",
            "complete_brokerage_address": null,
            "property_addresses": ["10 Market St, San Francisco, CA 94103"],
            "citations": {
                "broker_name": [{"source": "email_pdf", "snippet": "...Smith...", "match": "John Smith"}],
                "made_up_field": [{"snippet": "ignored"}]
            },
            "field_confidence": {"broker_name": 0.95, "bogus": 0.5}
        }"#;

        let data = extraction_data_from_content(content);
        assert_eq!(data.broker_name.as_deref(), Some("John Smith"));
        assert_eq!(data.broker_email, None);
        assert_eq!(data.property_addresses.len(), 1);
        assert_eq!(data.citations.len(), 1);
        assert_eq!(
            data.citations[&ExtractionField::BrokerName][0].matched.as_deref(),
            Some("John Smith")
        );
        assert_eq!(data.field_confidence.len(), 1);
        assert!(data.raw.is_none());
    }

    #[test]
    fn test_object_shaped_confidence_reads_score() {
        let content = r#"{
            "broker_name": "John Smith",
            "field_confidence": {
                "broker_name": {"score": 0.9, "explanation": "signature block"},
                "brokerage": 0.4,
                "broker_email": {"explanation": "no score given"}
            }
        }"#;
        let data = extraction_data_from_content(content);
        assert_eq!(data.field_confidence[&ExtractionField::BrokerName], 0.9);
        assert_eq!(data.field_confidence[&ExtractionField::Brokerage], 0.4);
        assert!(!data.field_confidence.contains_key(&ExtractionField::BrokerEmail));
    }

    #[test]
    fn test_quote_alias_for_snippet() {
        let content = r#"{
            "broker_name": "Jane Doe",
            "citations": {
                "broker_name": [{"source": "email_pdf", "quote": "from Jane Doe"}]
            }
        }"#;
        let data = extraction_data_from_content(content);
        assert_eq!(
            data.citations[&ExtractionField::BrokerName][0].snippet.as_deref(),
            Some("from Jane Doe")
        );
    }

    #[test]
    fn test_null_property_addresses_becomes_empty() {
        let data = extraction_data_from_content(r#"{"property_addresses": null}"#);
        assert!(data.property_addresses.is_empty());
        assert!(data.raw.is_none());
    }

    #[test]
    fn test_salvage_json_from_prose() {
        let content = "Sure, here is the extraction:\n{\"broker_name\": \"John Smith\"}\nLet me know!";
        let data = extraction_data_from_content(content);
        assert_eq!(data.broker_name.as_deref(), Some("John Smith"));
        assert!(data.raw.is_none());
    }

    #[test]
    fn test_unsalvageable_content_lands_under_raw() {
        let content = "I could not find any brokerage details.";
        let data = extraction_data_from_content(content);
        assert_eq!(data.raw.as_deref(), Some(content));
        assert_eq!(data.broker_name, None);
    }

    #[test]
    fn test_parse_model_content_error_carries_raw_text() {
        let err = parse_model_content("no json here").unwrap_err();
        assert_eq!(err, "no json here");
    }

    #[test]
    fn test_outcome_status_tags() {
        let skipped = ExtractionOutcome::Skipped {
            reason: "missing_api_key".to_string(),
        };
        let json = serde_json::to_value(&skipped).unwrap();
        assert_eq!(json["status"], "skipped");
        assert_eq!(json["reason"], "missing_api_key");

        let error = ExtractionOutcome::Error {
            kind: ProviderErrorKind::Timeout,
            message: "request timed out".to_string(),
            latency_ms: Some(30000),
        };
        let json = serde_json::to_value(&error).unwrap();
        assert_eq!(json["status"], "error");
        assert_eq!(json["kind"], "timeout");
        assert!(!error.is_ok());
    }
}
