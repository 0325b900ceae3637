use std::path::Path;
use std::sync::Arc;

use chrono::{NaiveDate, NaiveDateTime};
use tracing::{info, warn};

use super::domain::{Artefact, ArtefactId, HeaderGroup, PayloadReference, SearchTerms};
use super::extraction::{
    ExtractionConfig, ExtractionError, ExtractionService, SubmittedPayload,
};
use super::headers::{HeaderError, HeaderValidator, SubmittedHeaders};
use super::location::{LocationLookup, LocationLookupError, LocationResolver, ResolvedLocation};
use super::repository::{
    ArtefactRepository, PayloadStore, PayloadStoreError, RepositoryError,
};
use super::schema::{PayloadValidationError, SchemaRegistry, SchemaValidator};
use super::sensitivity::{SensitivityError, SensitivityFilter, UserDirectory};

/// Everything the pipeline derived from a submission, ready to be stored.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedSubmission {
    pub headers: HeaderGroup,
    pub search: SearchTerms,
    pub location: ResolvedLocation,
}

/// Result of a successful ingestion.
#[derive(Debug, Clone, PartialEq)]
pub struct IngestOutcome {
    pub artefact: Artefact,
    pub superseded: bool,
}

/// Flat-file body plus the metadata needed to serve it back.
#[derive(Debug, Clone)]
pub struct FlatFileUpload {
    pub file_name: String,
    pub content_type: Option<String>,
    pub body: Vec<u8>,
}

/// Service composing header, schema, extraction, location and sensitivity stages with the
/// storage collaborators.
pub struct PublicationService<R, B, L, U> {
    headers: HeaderValidator,
    schemas: SchemaValidator,
    extraction: ExtractionService,
    locations: LocationResolver<L>,
    sensitivity: SensitivityFilter<U>,
    repository: Arc<R>,
    payloads: Arc<B>,
}

impl<R, B, L, U> PublicationService<R, B, L, U>
where
    R: ArtefactRepository + 'static,
    B: PayloadStore + 'static,
    L: LocationLookup + 'static,
    U: UserDirectory + 'static,
{
    pub fn new(
        schemas: Arc<SchemaRegistry>,
        search: Arc<ExtractionConfig>,
        repository: Arc<R>,
        payloads: Arc<B>,
        locations: Arc<L>,
        users: Arc<U>,
    ) -> Self {
        Self {
            headers: HeaderValidator::new(),
            schemas: SchemaValidator::new(schemas),
            extraction: ExtractionService::standard(search),
            locations: LocationResolver::new(locations),
            sensitivity: SensitivityFilter::new(users),
            repository,
            payloads,
        }
    }

    /// Runs every ingestion stage for a JSON payload without storing anything.
    pub fn prepare(
        &self,
        headers: &SubmittedHeaders,
        body: &str,
    ) -> Result<PreparedSubmission, PublicationError> {
        let headers = self.headers.validate(headers)?;
        let document = self.schemas.validated_document(body, &headers)?;
        let search = self
            .extraction
            .extract_payload(&SubmittedPayload::with_document(body.as_bytes(), document))?;
        let location = self
            .locations
            .resolve(&headers.provenance, &headers.location_id)?;

        Ok(PreparedSubmission {
            headers,
            search,
            location,
        })
    }

    /// Validates, extracts and stores a JSON publication.
    pub fn ingest(
        &self,
        headers: &SubmittedHeaders,
        body: &str,
    ) -> Result<IngestOutcome, PublicationError> {
        let prepared = self.prepare(headers, body)?;
        let content_type = mime::APPLICATION_JSON.essence_str().to_string();
        self.store(prepared, body.as_bytes().to_vec(), content_type, None, "json")
    }

    /// Stores a flat-file publication. Flat files skip schema validation.
    pub fn ingest_flat_file(
        &self,
        headers: &SubmittedHeaders,
        upload: FlatFileUpload,
    ) -> Result<IngestOutcome, PublicationError> {
        let headers = self.headers.validate(headers)?;
        if upload.body.is_empty() {
            return Err(PublicationError::EmptyPayload);
        }
        let search = self.extraction.extract(&upload.body)?;
        let location = self
            .locations
            .resolve(&headers.provenance, &headers.location_id)?;

        let content_type = upload
            .content_type
            .as_deref()
            .and_then(|raw| raw.parse::<mime::Mime>().ok())
            .unwrap_or(mime::APPLICATION_OCTET_STREAM)
            .to_string();
        let extension = Path::new(&upload.file_name)
            .extension()
            .and_then(|extension| extension.to_str())
            .unwrap_or("bin")
            .to_ascii_lowercase();

        let prepared = PreparedSubmission {
            headers,
            search,
            location,
        };
        self.store(
            prepared,
            upload.body,
            content_type,
            Some(upload.file_name),
            &extension,
        )
    }

    fn store(
        &self,
        prepared: PreparedSubmission,
        body: Vec<u8>,
        content_type: String,
        file_name: Option<String>,
        extension: &str,
    ) -> Result<IngestOutcome, PublicationError> {
        let PreparedSubmission {
            headers,
            search,
            location,
        } = prepared;

        let existing = self
            .repository
            .find_by_source(&headers.provenance, &headers.source_artefact_id)?;
        let (artefact_id, superseded_count) = match &existing {
            Some(previous) => (previous.artefact_id, previous.superseded_count + 1),
            None => (ArtefactId::generate(), 0),
        };

        let key = format!("{artefact_id}.{extension}");
        // A supersede that reuses the key overwrites the live body; keep it for rollback.
        let previous_body = match &existing {
            Some(previous) if previous.payload.key == key => self.payloads.get(&key)?,
            _ => None,
        };
        let size = body.len();
        self.payloads.put(&key, body)?;

        let artefact = Artefact {
            artefact_id,
            provenance: headers.provenance,
            source_artefact_id: headers.source_artefact_id,
            artefact_type: headers.artefact_type,
            list_type: headers.list_type,
            sensitivity: headers.sensitivity,
            language: headers.language,
            location_id: location.location_id().to_string(),
            content_date: headers.content_date,
            display_from: headers.display_from,
            display_to: headers.display_to,
            expiry_date: headers.display_to.date(),
            payload: PayloadReference {
                key: key.clone(),
                content_type,
                size,
                file_name: file_name.clone(),
            },
            search,
            is_flat_file: file_name.is_some(),
            superseded_count,
        };

        let superseded = existing.is_some();
        let written = if superseded {
            self.repository.update(artefact.clone()).map(|()| artefact)
        } else {
            self.repository.insert(artefact)
        };
        let stored = match written {
            Ok(stored) => stored,
            Err(err) => {
                self.roll_back_payload(&artefact_id, &key, previous_body);
                return Err(err.into());
            }
        };

        if let Some(previous) = &existing {
            if previous.payload.key != key {
                if let Err(err) = self.payloads.delete(&previous.payload.key) {
                    warn!(
                        %artefact_id,
                        key = %previous.payload.key,
                        error = %err,
                        "failed to remove superseded payload"
                    );
                }
            }
        }

        info!(
            artefact_id = %stored.artefact_id,
            list_type = %stored.list_type,
            location_id = %stored.location_id,
            location_matched = location.is_matched(),
            superseded,
            "artefact ingested"
        );

        Ok(IngestOutcome {
            artefact: stored,
            superseded,
        })
    }

    /// Restores the body a failed metadata write replaced, or drops the orphaned one.
    fn roll_back_payload(&self, artefact_id: &ArtefactId, key: &str, previous: Option<Vec<u8>>) {
        let restored = match previous {
            Some(body) => self.payloads.put(key, body),
            None => self.payloads.delete(key),
        };
        if let Err(err) = restored {
            warn!(%artefact_id, key, error = %err, "failed to roll back payload");
        }
    }

    /// Metadata for one artefact, if it is currently displayed and visible to the caller.
    pub fn artefact(
        &self,
        artefact_id: &ArtefactId,
        user_id: Option<&str>,
        now: NaiveDateTime,
    ) -> Result<Artefact, PublicationError> {
        let artefact = self
            .repository
            .fetch(artefact_id)?
            .ok_or(PublicationError::NotFound(*artefact_id))?;

        let visible = self.sensitivity.is_visible(&artefact, user_id)?;
        if !visible || !artefact.is_displayed_at(now) {
            return Err(PublicationError::NotFound(*artefact_id));
        }

        Ok(artefact)
    }

    /// Stored payload body for a visible artefact.
    pub fn payload(
        &self,
        artefact_id: &ArtefactId,
        user_id: Option<&str>,
        now: NaiveDateTime,
    ) -> Result<(Artefact, Vec<u8>), PublicationError> {
        let artefact = self.artefact(artefact_id, user_id, now)?;
        let body = self
            .payloads
            .get(&artefact.payload.key)?
            .ok_or(PublicationError::NotFound(*artefact_id))?;
        Ok((artefact, body))
    }

    pub fn artefacts_for_location(
        &self,
        location_id: &str,
        user_id: Option<&str>,
        now: NaiveDateTime,
    ) -> Result<Vec<Artefact>, PublicationError> {
        let candidates = self.repository.find_by_location(location_id)?;
        self.visible(candidates, user_id, now)
    }

    pub fn search(
        &self,
        field: &str,
        value: &str,
        user_id: Option<&str>,
        now: NaiveDateTime,
    ) -> Result<Vec<Artefact>, PublicationError> {
        let candidates = self.repository.find_by_search_value(field, value)?;
        self.visible(candidates, user_id, now)
    }

    fn visible(
        &self,
        candidates: Vec<Artefact>,
        user_id: Option<&str>,
        now: NaiveDateTime,
    ) -> Result<Vec<Artefact>, PublicationError> {
        let displayed = candidates
            .into_iter()
            .filter(|artefact| artefact.is_displayed_at(now))
            .collect();
        Ok(self.sensitivity.filter(displayed, user_id)?)
    }

    pub fn delete(&self, artefact_id: &ArtefactId) -> Result<Artefact, PublicationError> {
        let removed = self
            .repository
            .delete(artefact_id)?
            .ok_or(PublicationError::NotFound(*artefact_id))?;
        self.payloads.delete(&removed.payload.key)?;
        info!(%artefact_id, "artefact deleted");
        Ok(removed)
    }

    /// Removes every artefact whose expiry date has passed. Returns how many were removed.
    pub fn delete_expired(&self, today: NaiveDate) -> Result<usize, PublicationError> {
        let expired = self.repository.expired(today)?;
        let mut removed = 0;
        for artefact in expired {
            if self.repository.delete(&artefact.artefact_id)?.is_some() {
                self.payloads.delete(&artefact.payload.key)?;
                removed += 1;
            }
        }
        info!(%today, removed, "expired artefacts swept");
        Ok(removed)
    }
}

/// Error raised by the publication service.
#[derive(Debug, thiserror::Error)]
pub enum PublicationError {
    #[error(transparent)]
    Header(#[from] HeaderError),
    #[error(transparent)]
    Payload(#[from] PayloadValidationError),
    #[error(transparent)]
    Extraction(#[from] ExtractionError),
    #[error("payload body must not be empty")]
    EmptyPayload,
    #[error("'{0}' is not a valid artefact id")]
    InvalidArtefactId(String),
    #[error("no artefact found with id {0}")]
    NotFound(ArtefactId),
    #[error(transparent)]
    Location(#[from] LocationLookupError),
    #[error(transparent)]
    Sensitivity(#[from] SensitivityError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error(transparent)]
    PayloadStore(#[from] PayloadStoreError),
}

impl PublicationError {
    /// Validation failures are the caller's to fix; everything else is ours.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            PublicationError::Header(_)
                | PublicationError::Payload(_)
                | PublicationError::Extraction(_)
                | PublicationError::EmptyPayload
                | PublicationError::InvalidArtefactId(_)
        )
    }
}
