//! Search-term extraction.
//!
//! An [`ExtractionService`] holds an ordered list of [`PayloadExtractor`]s. The first one that
//! accepts a payload validates it and produces the [`SearchTerms`] stored on the artefact.

mod party;
pub mod path;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use super::domain::SearchTerms;

pub use party::{PartySearchConfig, PARTIES_FIELD};
pub use path::{PathQuery, PathQueryError};

const BUNDLED_SEARCH_CONFIG: &str = include_str!("../../../config/search-terms.json");

/// Field name → path query mapping, compiled once at start-up.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ExtractionConfig {
    #[serde(default)]
    pub search_values: BTreeMap<String, PathQuery>,
    #[serde(default)]
    pub party_search: Option<PartySearchConfig>,
}

#[derive(Debug, thiserror::Error)]
pub enum ExtractionConfigError {
    #[error("failed to read search configuration {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid search configuration: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("search value '{0}' clashes with the party search output")]
    ReservedField(String),
}

impl ExtractionConfig {
    pub fn bundled() -> Result<Self, ExtractionConfigError> {
        Self::from_json(BUNDLED_SEARCH_CONFIG)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ExtractionConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ExtractionConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&raw)
    }

    pub fn from_json(raw: &str) -> Result<Self, ExtractionConfigError> {
        let config: Self = serde_json::from_str(raw)?;
        if config.party_search.is_some() && config.search_values.contains_key(PARTIES_FIELD) {
            return Err(ExtractionConfigError::ReservedField(
                PARTIES_FIELD.to_string(),
            ));
        }
        Ok(config)
    }

    /// Builds a config with only plain search values.
    pub fn with_search_values<I, K>(values: I) -> Self
    where
        I: IntoIterator<Item = (K, PathQuery)>,
        K: Into<String>,
    {
        Self {
            search_values: values
                .into_iter()
                .map(|(field, query)| (field.into(), query))
                .collect(),
            party_search: None,
        }
    }

    /// Evaluates every configured query against `document`.
    pub fn search_terms(&self, document: &Value) -> SearchTerms {
        let mut terms = SearchTerms::new();

        for (field, query) in &self.search_values {
            let mut values = Vec::new();
            for matched in query.select(document) {
                match matched {
                    Value::Null => {}
                    Value::Array(items) => {
                        values.extend(items.iter().filter(|item| !item.is_null()).cloned())
                    }
                    other => values.push(other.clone()),
                }
            }
            terms.insert(field.clone(), values);
        }

        if let Some(party_search) = &self.party_search {
            terms.insert(PARTIES_FIELD, party::extract_parties(document, party_search));
        }

        terms
    }
}

/// Extraction failed the selected extractor's own structural checks.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{extractor} extractor rejected the payload: {}", .errors.join(", "))]
pub struct ExtractionError {
    pub extractor: &'static str,
    pub errors: Vec<String>,
}

/// A submitted body, parsed as JSON at most once.
#[derive(Debug, Clone)]
pub struct SubmittedPayload<'a> {
    bytes: &'a [u8],
    document: Option<Value>,
}

impl<'a> SubmittedPayload<'a> {
    /// Bodies that are not JSON keep only their bytes.
    pub fn parse(bytes: &'a [u8]) -> Self {
        Self {
            bytes,
            document: serde_json::from_slice(bytes).ok(),
        }
    }

    /// Wraps a body the caller has already parsed.
    pub fn with_document(bytes: &'a [u8], document: Value) -> Self {
        Self {
            bytes,
            document: Some(document),
        }
    }

    pub fn bytes(&self) -> &[u8] {
        self.bytes
    }

    pub fn document(&self) -> Option<&Value> {
        self.document.as_ref()
    }
}

/// Extracts search terms from JSON list payloads.
#[derive(Debug, Clone)]
pub struct JsonExtractor {
    config: Arc<ExtractionConfig>,
}

impl JsonExtractor {
    pub fn new(config: Arc<ExtractionConfig>) -> Self {
        Self { config }
    }

    pub fn is_accepted(&self, payload: &SubmittedPayload<'_>) -> bool {
        payload.document().is_some()
    }

    pub fn validate(&self, payload: &SubmittedPayload<'_>) -> Vec<String> {
        match payload.document() {
            Some(Value::Object(map)) if map.is_empty() => {
                vec!["payload must not be an empty object".to_string()]
            }
            Some(Value::Object(_)) => Vec::new(),
            Some(_) => vec!["payload root must be a JSON object".to_string()],
            None => vec!["payload is not valid JSON".to_string()],
        }
    }

    pub fn extract_search_terms(&self, payload: &SubmittedPayload<'_>) -> SearchTerms {
        payload
            .document()
            .map(|document| self.config.search_terms(document))
            .unwrap_or_default()
    }
}

/// Flat files (PDF, Word, spreadsheets) carry no searchable structure.
#[derive(Debug, Clone, Copy, Default)]
pub struct FlatFileExtractor;

impl FlatFileExtractor {
    pub fn is_accepted(&self, payload: &SubmittedPayload<'_>) -> bool {
        !payload.bytes().is_empty()
    }

    pub fn validate(&self, _payload: &SubmittedPayload<'_>) -> Vec<String> {
        Vec::new()
    }

    pub fn extract_search_terms(&self, _payload: &SubmittedPayload<'_>) -> SearchTerms {
        SearchTerms::new()
    }
}

/// Closed set of extractor implementations.
#[derive(Debug, Clone)]
pub enum PayloadExtractor {
    Json(JsonExtractor),
    FlatFile(FlatFileExtractor),
}

impl PayloadExtractor {
    pub fn name(&self) -> &'static str {
        match self {
            PayloadExtractor::Json(_) => "json",
            PayloadExtractor::FlatFile(_) => "flat-file",
        }
    }

    pub fn is_accepted(&self, payload: &SubmittedPayload<'_>) -> bool {
        match self {
            PayloadExtractor::Json(extractor) => extractor.is_accepted(payload),
            PayloadExtractor::FlatFile(extractor) => extractor.is_accepted(payload),
        }
    }

    pub fn validate(&self, payload: &SubmittedPayload<'_>) -> Vec<String> {
        match self {
            PayloadExtractor::Json(extractor) => extractor.validate(payload),
            PayloadExtractor::FlatFile(extractor) => extractor.validate(payload),
        }
    }

    pub fn extract_search_terms(&self, payload: &SubmittedPayload<'_>) -> SearchTerms {
        match self {
            PayloadExtractor::Json(extractor) => extractor.extract_search_terms(payload),
            PayloadExtractor::FlatFile(extractor) => extractor.extract_search_terms(payload),
        }
    }
}

/// First-match-wins dispatch over the registered extractors.
#[derive(Debug, Clone)]
pub struct ExtractionService {
    extractors: Vec<PayloadExtractor>,
}

impl ExtractionService {
    pub fn new(extractors: Vec<PayloadExtractor>) -> Self {
        Self { extractors }
    }

    /// JSON first, flat files as the fallback.
    pub fn standard(config: Arc<ExtractionConfig>) -> Self {
        Self::new(vec![
            PayloadExtractor::Json(JsonExtractor::new(config)),
            PayloadExtractor::FlatFile(FlatFileExtractor),
        ])
    }

    pub fn extractors(&self) -> &[PayloadExtractor] {
        &self.extractors
    }

    pub fn extract(&self, payload: &[u8]) -> Result<SearchTerms, ExtractionError> {
        self.extract_payload(&SubmittedPayload::parse(payload))
    }

    pub fn extract_payload(
        &self,
        payload: &SubmittedPayload<'_>,
    ) -> Result<SearchTerms, ExtractionError> {
        let Some(extractor) = self
            .extractors
            .iter()
            .find(|extractor| extractor.is_accepted(payload))
        else {
            debug!("no extractor accepted the payload");
            return Ok(SearchTerms::new());
        };

        let errors = extractor.validate(payload);
        if !errors.is_empty() {
            return Err(ExtractionError {
                extractor: extractor.name(),
                errors,
            });
        }

        let terms = extractor.extract_search_terms(payload);
        debug!(
            extractor = extractor.name(),
            fields = terms.len(),
            "search terms extracted"
        );
        Ok(terms)
    }
}
