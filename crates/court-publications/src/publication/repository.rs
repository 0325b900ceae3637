use chrono::NaiveDate;

use super::domain::{Artefact, ArtefactId};

/// Storage abstraction for artefact metadata so the pipeline can be exercised in isolation.
pub trait ArtefactRepository: Send + Sync {
    fn insert(&self, artefact: Artefact) -> Result<Artefact, RepositoryError>;
    fn update(&self, artefact: Artefact) -> Result<(), RepositoryError>;
    fn fetch(&self, id: &ArtefactId) -> Result<Option<Artefact>, RepositoryError>;
    /// The artefact a source system previously submitted under `source_artefact_id`.
    fn find_by_source(
        &self,
        provenance: &str,
        source_artefact_id: &str,
    ) -> Result<Option<Artefact>, RepositoryError>;
    fn find_by_location(&self, location_id: &str) -> Result<Vec<Artefact>, RepositoryError>;
    fn find_by_search_value(&self, field: &str, value: &str)
        -> Result<Vec<Artefact>, RepositoryError>;
    fn delete(&self, id: &ArtefactId) -> Result<Option<Artefact>, RepositoryError>;
    /// Artefacts whose expiry date is before `today`.
    fn expired(&self, today: NaiveDate) -> Result<Vec<Artefact>, RepositoryError>;
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RepositoryError {
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("record not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

/// Blob storage for payload bodies.
pub trait PayloadStore: Send + Sync {
    fn put(&self, key: &str, body: Vec<u8>) -> Result<(), PayloadStoreError>;
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, PayloadStoreError>;
    fn delete(&self, key: &str) -> Result<(), PayloadStoreError>;
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PayloadStoreError {
    #[error("payload store unavailable: {0}")]
    Unavailable(String),
}
