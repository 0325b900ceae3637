use std::sync::Arc;

use tracing::{debug, warn};

use super::domain::{Location, MANUAL_UPLOAD_PROVENANCE};

/// Marker prefixed onto location ids that could not be resolved.
pub const NO_MATCH_PREFIX: &str = "NoMatch";

pub fn mark_placeholder(original: &str) -> String {
    format!("{NO_MATCH_PREFIX}{original}")
}

pub fn is_placeholder(location_id: &str) -> bool {
    location_id.starts_with(NO_MATCH_PREFIX)
}

/// Recovers the submitted id from a placeholder. Only the first marker is removed.
pub fn strip_placeholder(location_id: &str) -> Option<&str> {
    location_id.strip_prefix(NO_MATCH_PREFIX)
}

/// Read-only view of the location reference data.
pub trait LocationLookup: Send + Sync {
    fn find_by_id(&self, location_id: &str) -> Result<Option<Location>, LocationLookupError>;

    /// Lookup by the id a source system uses for the location.
    fn find_by_source_reference(
        &self,
        provenance: &str,
        source_location_id: &str,
    ) -> Result<Option<Location>, LocationLookupError>;
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LocationLookupError {
    #[error("location reference data unavailable: {0}")]
    Unavailable(String),
}

/// Outcome of resolving a submitted location id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedLocation {
    Matched(Location),
    Unmatched { placeholder: String },
}

impl ResolvedLocation {
    /// Identifier to store on the artefact.
    pub fn location_id(&self) -> &str {
        match self {
            ResolvedLocation::Matched(location) => &location.location_id,
            ResolvedLocation::Unmatched { placeholder } => placeholder,
        }
    }

    pub fn is_matched(&self) -> bool {
        matches!(self, ResolvedLocation::Matched(_))
    }
}

pub struct LocationResolver<L> {
    lookup: Arc<L>,
}

impl<L> Clone for LocationResolver<L> {
    fn clone(&self) -> Self {
        Self {
            lookup: Arc::clone(&self.lookup),
        }
    }
}

impl<L> LocationResolver<L>
where
    L: LocationLookup + 'static,
{
    pub fn new(lookup: Arc<L>) -> Self {
        Self { lookup }
    }

    /// Manual uploads carry our own location id; other sources carry theirs, which is
    /// tried first before falling back to a direct id match.
    pub fn resolve(
        &self,
        provenance: &str,
        submitted: &str,
    ) -> Result<ResolvedLocation, LocationLookupError> {
        let submitted = submitted.trim();

        let found = if provenance.eq_ignore_ascii_case(MANUAL_UPLOAD_PROVENANCE) {
            self.lookup.find_by_id(submitted)?
        } else {
            match self.lookup.find_by_source_reference(provenance, submitted)? {
                Some(location) => Some(location),
                None => self.lookup.find_by_id(submitted)?,
            }
        };

        match found {
            Some(location) => {
                debug!(%provenance, submitted, location_id = %location.location_id, "location resolved");
                Ok(ResolvedLocation::Matched(location))
            }
            None => {
                let placeholder = mark_placeholder(submitted);
                warn!(%provenance, submitted, %placeholder, "no location matched submission");
                Ok(ResolvedLocation::Unmatched { placeholder })
            }
        }
    }
}
