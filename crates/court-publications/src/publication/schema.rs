//! Structural validation of JSON publication payloads.
//!
//! Schemas live outside the code as JSON Schema documents, one per [`SchemaFamily`]. They are
//! compiled once into a [`SchemaRegistry`] and shared read-only between requests.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use jsonschema::error::ValidationErrorKind;
use jsonschema::{ValidationError, Validator};
use serde_json::Value;
use tracing::debug;

use super::domain::{HeaderGroup, ListType, SchemaFamily};

const ROOT_PATH: &str = "(root)";

const BUNDLED_SCHEMAS: [(SchemaFamily, &str); 5] = [
    (
        SchemaFamily::SjpPublicList,
        include_str!("../../schemas/sjp_public_list.json"),
    ),
    (
        SchemaFamily::SjpPressList,
        include_str!("../../schemas/sjp_press_list.json"),
    ),
    (
        SchemaFamily::CrimeList,
        include_str!("../../schemas/crime_list.json"),
    ),
    (
        SchemaFamily::DailyCauseList,
        include_str!("../../schemas/daily_cause_list.json"),
    ),
    (
        SchemaFamily::TribunalList,
        include_str!("../../schemas/tribunal_list.json"),
    ),
];

/// Failure to build the registry at start-up.
#[derive(Debug, thiserror::Error)]
pub enum SchemaRegistryError {
    #[error("failed to read schema {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("schema for {family} is not valid JSON: {source}")]
    Parse {
        family: SchemaFamily,
        source: serde_json::Error,
    },
    #[error("schema for {family} does not compile: {message}")]
    Compile {
        family: SchemaFamily,
        message: String,
    },
    #[error("no schema registered for {0}")]
    MissingFamily(SchemaFamily),
}

/// Compiled schemas keyed by family. Immutable once built.
pub struct SchemaRegistry {
    validators: HashMap<SchemaFamily, Validator>,
}

impl fmt::Debug for SchemaRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut families: Vec<_> = self.validators.keys().collect();
        families.sort();
        f.debug_struct("SchemaRegistry")
            .field("families", &families)
            .finish()
    }
}

impl SchemaRegistry {
    /// Registry compiled from the schemas shipped with the crate.
    pub fn bundled() -> Result<Self, SchemaRegistryError> {
        let documents = BUNDLED_SCHEMAS
            .iter()
            .map(|(family, raw)| {
                serde_json::from_str::<Value>(raw)
                    .map(|schema| (*family, schema))
                    .map_err(|source| SchemaRegistryError::Parse {
                        family: *family,
                        source,
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Self::from_documents(documents)
    }

    /// Loads `<family>.json` for every family from `dir`.
    pub fn from_dir(dir: impl AsRef<Path>) -> Result<Self, SchemaRegistryError> {
        let dir = dir.as_ref();
        let mut documents = Vec::with_capacity(SchemaFamily::ALL.len());

        for family in SchemaFamily::ALL.iter().copied() {
            let path = dir.join(family.file_name());
            let raw = std::fs::read_to_string(&path)
                .map_err(|source| SchemaRegistryError::Io { path, source })?;
            let schema = serde_json::from_str::<Value>(&raw)
                .map_err(|source| SchemaRegistryError::Parse { family, source })?;
            documents.push((family, schema));
        }

        Self::from_documents(documents)
    }

    pub fn from_documents<I>(documents: I) -> Result<Self, SchemaRegistryError>
    where
        I: IntoIterator<Item = (SchemaFamily, Value)>,
    {
        let mut validators = HashMap::new();
        for (family, schema) in documents {
            let validator =
                jsonschema::validator_for(&schema).map_err(|err| SchemaRegistryError::Compile {
                    family,
                    message: err.to_string(),
                })?;
            validators.insert(family, validator);
        }

        if let Some(missing) = SchemaFamily::ALL
            .iter()
            .copied()
            .find(|family| !validators.contains_key(family))
        {
            return Err(SchemaRegistryError::MissingFamily(missing));
        }

        Ok(Self { validators })
    }

    pub fn validator(&self, family: SchemaFamily) -> Option<&Validator> {
        self.validators.get(&family)
    }
}

/// A single structural defect, addressed by dot-separated instance path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaViolation {
    pub path: String,
    pub message: String,
}

impl fmt::Display for SchemaViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

/// Every violation found in one payload.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{list_type} payload failed schema validation: {}", join_violations(.violations))]
pub struct PayloadValidationError {
    pub list_type: ListType,
    pub violations: Vec<SchemaViolation>,
}

impl PayloadValidationError {
    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.violations.iter().map(|violation| violation.path.as_str())
    }
}

fn join_violations(violations: &[SchemaViolation]) -> String {
    violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Validates payload bodies against the schema registered for their list type.
#[derive(Debug, Clone)]
pub struct SchemaValidator {
    registry: Arc<SchemaRegistry>,
}

impl SchemaValidator {
    pub fn new(registry: Arc<SchemaRegistry>) -> Self {
        Self { registry }
    }

    pub fn validate(
        &self,
        payload: &str,
        headers: &HeaderGroup,
    ) -> Result<(), PayloadValidationError> {
        self.validated_document(payload, headers).map(|_| ())
    }

    /// Parses and validates `payload`, handing back the document for later stages.
    pub fn validated_document(
        &self,
        payload: &str,
        headers: &HeaderGroup,
    ) -> Result<Value, PayloadValidationError> {
        let document: Value = serde_json::from_str(payload).map_err(|err| {
            PayloadValidationError {
                list_type: headers.list_type,
                violations: vec![SchemaViolation {
                    path: ROOT_PATH.to_string(),
                    message: format!("payload is not valid JSON: {err}"),
                }],
            }
        })?;

        self.validate_document(&document, headers.list_type)?;
        Ok(document)
    }

    pub fn validate_document(
        &self,
        document: &Value,
        list_type: ListType,
    ) -> Result<(), PayloadValidationError> {
        let family = list_type.schema_family();
        let Some(validator) = self.registry.validator(family) else {
            return Err(PayloadValidationError {
                list_type,
                violations: vec![SchemaViolation {
                    path: ROOT_PATH.to_string(),
                    message: format!("no schema registered for {family}"),
                }],
            });
        };

        let violations: Vec<SchemaViolation> =
            validator.iter_errors(document).map(to_violation).collect();

        if violations.is_empty() {
            debug!(%list_type, %family, "payload passed schema validation");
            return Ok(());
        }

        debug!(%list_type, count = violations.len(), "payload failed schema validation");
        Err(PayloadValidationError {
            list_type,
            violations,
        })
    }
}

fn to_violation(error: ValidationError<'_>) -> SchemaViolation {
    let mut segments = pointer_segments(&error.instance_path.to_string());
    if let ValidationErrorKind::Required { property } = &error.kind {
        if let Some(name) = property.as_str() {
            segments.push(name.to_string());
        }
    }

    let path = if segments.is_empty() {
        ROOT_PATH.to_string()
    } else {
        segments.join(".")
    };

    SchemaViolation {
        path,
        message: error.to_string(),
    }
}

fn pointer_segments(pointer: &str) -> Vec<String> {
    pointer
        .split('/')
        .filter(|segment| !segment.is_empty())
        .map(|segment| segment.replace("~1", "/").replace("~0", "~"))
        .collect()
}
