//! Location and user reference data loaded from CSV.

use std::collections::HashSet;
use std::io::Read;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Deserializer};

use super::domain::{
    Location, LocationReference, UnknownVariant, UserProfile, UserProvenance, UserRole,
};
use super::location::{LocationLookup, LocationLookupError};

const BUNDLED_LOCATIONS: &str = include_str!("../../config/locations.csv");

#[derive(Debug, thiserror::Error)]
pub enum ReferenceDataError {
    #[error("failed to read reference data {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid reference data: {0}")]
    Csv(#[from] csv::Error),
    #[error("location reference '{value}' must be written as PROVENANCE:ID")]
    MalformedReference { value: String },
    #[error("duplicate location id {0}")]
    DuplicateId(String),
    #[error("duplicate location name '{0}'")]
    DuplicateName(String),
    #[error("duplicate user id {0}")]
    DuplicateUser(String),
    #[error(transparent)]
    UnknownValue(#[from] UnknownVariant),
}

/// In-memory location directory.
#[derive(Debug, Clone, Default)]
pub struct LocationDirectory {
    locations: Vec<Location>,
}

impl LocationDirectory {
    /// Ids and names must be unique; names are compared case-insensitively.
    pub fn new(locations: Vec<Location>) -> Result<Self, ReferenceDataError> {
        let mut ids = HashSet::new();
        let mut names = HashSet::new();
        for location in &locations {
            if !ids.insert(location.location_id.as_str()) {
                return Err(ReferenceDataError::DuplicateId(location.location_id.clone()));
            }
            if !names.insert(location.name.to_lowercase()) {
                return Err(ReferenceDataError::DuplicateName(location.name.clone()));
            }
        }
        Ok(Self { locations })
    }

    pub fn bundled() -> Result<Self, ReferenceDataError> {
        Self::from_reader(BUNDLED_LOCATIONS.as_bytes())
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ReferenceDataError> {
        Self::from_reader(open(path.as_ref())?)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self, ReferenceDataError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);
        let mut locations = Vec::new();

        for record in csv_reader.deserialize::<LocationRow>() {
            locations.push(record?.into_location()?);
        }

        Self::new(locations)
    }

    pub fn len(&self) -> usize {
        self.locations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locations.is_empty()
    }
}

impl LocationLookup for LocationDirectory {
    fn find_by_id(&self, location_id: &str) -> Result<Option<Location>, LocationLookupError> {
        Ok(self
            .locations
            .iter()
            .find(|location| location.location_id == location_id)
            .cloned())
    }

    fn find_by_source_reference(
        &self,
        provenance: &str,
        source_location_id: &str,
    ) -> Result<Option<Location>, LocationLookupError> {
        Ok(self
            .locations
            .iter()
            .find(|location| {
                location.references.iter().any(|reference| {
                    reference.provenance.eq_ignore_ascii_case(provenance)
                        && reference.source_location_id == source_location_id
                })
            })
            .cloned())
    }
}

fn open(path: &Path) -> Result<std::fs::File, ReferenceDataError> {
    std::fs::File::open(path).map_err(|source| ReferenceDataError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Reads consumer profiles with columns `User ID,Role,Provenance`.
///
/// Roles and provenances use their header labels, matched case-insensitively.
pub fn user_profiles_from_reader<R: Read>(
    reader: R,
) -> Result<Vec<UserProfile>, ReferenceDataError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);
    let mut seen = HashSet::new();
    let mut profiles = Vec::new();

    for record in csv_reader.deserialize::<UserRow>() {
        let row = record?;
        if !seen.insert(row.user_id.clone()) {
            return Err(ReferenceDataError::DuplicateUser(row.user_id));
        }
        profiles.push(UserProfile {
            role: row.role.parse::<UserRole>()?,
            provenance: row.provenance.parse::<UserProvenance>()?,
            user_id: row.user_id,
        });
    }

    Ok(profiles)
}

pub fn user_profiles_from_path(
    path: impl AsRef<Path>,
) -> Result<Vec<UserProfile>, ReferenceDataError> {
    user_profiles_from_reader(open(path.as_ref())?)
}

#[derive(Debug, Deserialize)]
struct UserRow {
    #[serde(rename = "User ID")]
    user_id: String,
    #[serde(rename = "Role")]
    role: String,
    #[serde(rename = "Provenance")]
    provenance: String,
}

#[derive(Debug, Deserialize)]
struct LocationRow {
    #[serde(rename = "Location ID")]
    location_id: String,
    #[serde(rename = "Name")]
    name: String,
    #[serde(rename = "Jurisdictions", default, deserialize_with = "semicolon_list")]
    jurisdictions: Vec<String>,
    #[serde(rename = "Regions", default, deserialize_with = "semicolon_list")]
    regions: Vec<String>,
    #[serde(rename = "References", default, deserialize_with = "semicolon_list")]
    references: Vec<String>,
}

impl LocationRow {
    fn into_location(self) -> Result<Location, ReferenceDataError> {
        let references = self
            .references
            .into_iter()
            .map(|value| {
                let parsed = value.split_once(':').and_then(|(provenance, id)| {
                    let (provenance, id) = (provenance.trim(), id.trim());
                    (!provenance.is_empty() && !id.is_empty()).then(|| LocationReference {
                        provenance: provenance.to_string(),
                        source_location_id: id.to_string(),
                    })
                });
                parsed.ok_or(ReferenceDataError::MalformedReference { value })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Location {
            location_id: self.location_id,
            name: self.name,
            jurisdictions: self.jurisdictions,
            regions: self.regions,
            references,
        })
    }
}

fn semicolon_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw
        .unwrap_or_default()
        .split(';')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect())
}
