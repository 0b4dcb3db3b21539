//! Process-lifetime cache of extraction results
//!
//! Keyed by a deterministic fingerprint of everything sent to the model, so
//! identical requests cost at most one paid call. Unbounded by design; see
//! DESIGN.md before adding eviction.

use crate::llm::prompt::ExtractionRequest;
use crate::llm::schema::ExtractionOutcome;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::RwLock;

/// Injected cache capability. Implementations may be bounded or external;
/// hits must carry the `cached: true` marker and only successful outcomes
/// may be retained.
pub trait ResultCache: Send + Sync {
    fn lookup(&self, key: &str) -> Option<ExtractionOutcome>;
    fn store(&self, key: &str, outcome: &ExtractionOutcome);
}

/// In-memory cache shared across concurrent requests
#[derive(Debug, Default)]
pub struct ExtractionCache {
    entries: RwLock<HashMap<String, ExtractionOutcome>>,
}

impl ExtractionCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ResultCache for ExtractionCache {
    /// Look up a cached outcome. Hits come back as copies flagged
    /// `cached: true`; the stored entry is never mutated.
    fn lookup(&self, key: &str) -> Option<ExtractionOutcome> {
        let entries = self.entries.read().ok()?;
        let mut copy = entries.get(key)?.clone();
        if let ExtractionOutcome::Ok { cached, .. } = &mut copy {
            *cached = true;
        }
        Some(copy)
    }

    /// Store a successful outcome. Error and skipped outcomes are never
    /// cached and will be recomputed on the next identical request.
    /// Concurrent stores of the same key are an idempotent overwrite.
    fn store(&self, key: &str, outcome: &ExtractionOutcome) {
        if !outcome.is_ok() {
            return;
        }
        if let Ok(mut entries) = self.entries.write() {
            entries.insert(key.to_string(), outcome.clone());
        }
    }
}

/// Derive the cache key for a request: canonical JSON (lexicographically
/// sorted keys) of the full prompt tuple, SHA-256, lowercase hex. Attachment
/// previews inside the request are already truncated to what the model sees,
/// so inputs differing only beyond the truncation window collide on purpose.
pub fn fingerprint(request: &ExtractionRequest) -> String {
    // serde_json::Map sorts keys (preserve_order is off), giving a canonical form
    let canonical = serde_json::to_value(request)
        .map(|v| v.to_string())
        .unwrap_or_default();
    let mut hasher = Sha256::new();
    hasher.update(canonical.as_bytes());
    format!("{:x}", hasher.finalize())
}
