//! Court and tribunal publication ingestion.
//!
//! A submission flows through header validation, schema validation, search-term extraction
//! and location resolution before it is stored. Reads are filtered by display window and
//! sensitivity classification.

pub mod domain;
pub mod extraction;
pub mod headers;
pub mod location;
pub mod reference;
pub mod repository;
pub mod router;
pub mod schema;
pub mod sensitivity;
pub mod service;

#[cfg(test)]
mod tests;

pub use domain::{
    Artefact, ArtefactId, ArtefactType, HeaderGroup, Language, ListType, Location,
    LocationReference, PayloadReference, SchemaFamily, SearchTerms, Sensitivity,
    UnknownVariant, UserProfile, UserProvenance, UserRole, MANUAL_UPLOAD_PROVENANCE,
};
pub use extraction::{
    ExtractionConfig, ExtractionConfigError, ExtractionError, ExtractionService, PathQuery,
    PathQueryError, PayloadExtractor, SubmittedPayload,
};
pub use headers::{
    DateValidationError, HeaderError, HeaderValidator, SubmittedHeaders, PUBLICATION_HEADERS,
};
pub use location::{
    LocationLookup, LocationLookupError, LocationResolver, ResolvedLocation, NO_MATCH_PREFIX,
};
pub use reference::{
    user_profiles_from_path, user_profiles_from_reader, LocationDirectory, ReferenceDataError,
};
pub use repository::{
    ArtefactRepository, PayloadStore, PayloadStoreError, RepositoryError,
};
pub use router::{publication_router, ErrorPayload, USER_ID_HEADER};
pub use schema::{
    PayloadValidationError, SchemaRegistry, SchemaRegistryError, SchemaValidator,
    SchemaViolation,
};
pub use sensitivity::{
    can_view, SensitivityError, SensitivityFilter, UserDirectory, UserDirectoryError,
};
pub use service::{
    FlatFileUpload, IngestOutcome, PreparedSubmission, PublicationError, PublicationService,
};
