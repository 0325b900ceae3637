//! Submission header validation.
//!
//! Turns the raw header map of an ingestion request into a [`HeaderGroup`], rejecting
//! blank or missing mandatory values and inconsistent display windows before any payload
//! work starts.

use std::collections::BTreeMap;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveDateTime};

use super::domain::{
    ArtefactType, HeaderGroup, Language, ListType, Sensitivity, UnknownVariant,
};

pub const PROVENANCE_HEADER: &str = "x-provenance";
pub const SOURCE_ARTEFACT_ID_HEADER: &str = "x-source-artefact-id";
pub const TYPE_HEADER: &str = "x-type";
pub const SENSITIVITY_HEADER: &str = "x-sensitivity";
pub const LANGUAGE_HEADER: &str = "x-language";
pub const DISPLAY_FROM_HEADER: &str = "x-display-from";
pub const DISPLAY_TO_HEADER: &str = "x-display-to";
pub const LIST_TYPE_HEADER: &str = "x-list-type";
pub const COURT_ID_HEADER: &str = "x-court-id";
pub const CONTENT_DATE_HEADER: &str = "x-content-date";

/// Every header the validator reads, in submission order.
pub const PUBLICATION_HEADERS: [&str; 10] = [
    PROVENANCE_HEADER,
    SOURCE_ARTEFACT_ID_HEADER,
    TYPE_HEADER,
    SENSITIVITY_HEADER,
    LANGUAGE_HEADER,
    DISPLAY_FROM_HEADER,
    DISPLAY_TO_HEADER,
    LIST_TYPE_HEADER,
    COURT_ID_HEADER,
    CONTENT_DATE_HEADER,
];

pub const DEFAULT_SENSITIVITY: Sensitivity = Sensitivity::Classified;
pub const DEFAULT_LANGUAGE: Language = Language::English;

/// Raw header values keyed by lowercase header name.
pub type SubmittedHeaders = BTreeMap<String, String>;

/// Header problems detected before the payload is examined.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HeaderError {
    #[error("{header} is mandatory however an empty value is provided")]
    EmptyRequiredHeader { header: &'static str },
    #[error("{header} is mandatory however no value was provided")]
    MissingRequiredHeader { header: &'static str },
    #[error("{header} has an invalid value: {source}")]
    InvalidValue {
        header: &'static str,
        source: UnknownVariant,
    },
    #[error(transparent)]
    Date(#[from] DateValidationError),
}

impl HeaderError {
    /// Name of the header the failure refers to.
    pub fn header(&self) -> &'static str {
        match self {
            HeaderError::EmptyRequiredHeader { header }
            | HeaderError::MissingRequiredHeader { header }
            | HeaderError::InvalidValue { header, .. } => *header,
            HeaderError::Date(error) => error.header(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DateValidationError {
    #[error("{header} is mandatory however no date was provided")]
    MissingDate { header: &'static str },
    #[error("{header} value '{value}' is not a valid date")]
    Unparseable { header: &'static str, value: String },
    #[error("x-display-from ({from}) must not be after x-display-to ({to})")]
    DisplayWindow {
        from: NaiveDateTime,
        to: NaiveDateTime,
    },
}

impl DateValidationError {
    pub fn header(&self) -> &'static str {
        match self {
            DateValidationError::MissingDate { header }
            | DateValidationError::Unparseable { header, .. } => *header,
            DateValidationError::DisplayWindow { .. } => DISPLAY_FROM_HEADER,
        }
    }
}

/// Stateless validator producing the immutable [`HeaderGroup`] for a request.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeaderValidator;

impl HeaderValidator {
    pub fn new() -> Self {
        Self
    }

    pub fn validate(&self, headers: &SubmittedHeaders) -> Result<HeaderGroup, HeaderError> {
        let provenance = required_text(headers, PROVENANCE_HEADER)?;
        let source_artefact_id = required_text(headers, SOURCE_ARTEFACT_ID_HEADER)?;
        let artefact_type: ArtefactType = required_enum(headers, TYPE_HEADER)?;
        let list_type: ListType = required_enum(headers, LIST_TYPE_HEADER)?;
        let location_id = required_text(headers, COURT_ID_HEADER)?;

        let sensitivity =
            optional_enum(headers, SENSITIVITY_HEADER)?.unwrap_or(DEFAULT_SENSITIVITY);
        let language = optional_enum(headers, LANGUAGE_HEADER)?.unwrap_or(DEFAULT_LANGUAGE);

        let display_from = required_date(headers, DISPLAY_FROM_HEADER)?;
        let display_to = required_date(headers, DISPLAY_TO_HEADER)?;
        let content_date = required_date(headers, CONTENT_DATE_HEADER)?;

        if display_from > display_to {
            return Err(DateValidationError::DisplayWindow {
                from: display_from,
                to: display_to,
            }
            .into());
        }

        Ok(HeaderGroup {
            provenance,
            source_artefact_id,
            artefact_type,
            sensitivity,
            language,
            display_from,
            display_to,
            list_type,
            location_id,
            content_date,
        })
    }
}

fn lookup<'a>(headers: &'a SubmittedHeaders, header: &'static str) -> Option<&'a str> {
    headers.get(header).map(String::as_str)
}

fn required_text(headers: &SubmittedHeaders, header: &'static str) -> Result<String, HeaderError> {
    match lookup(headers, header) {
        None => Err(HeaderError::MissingRequiredHeader { header }),
        Some(value) if value.trim().is_empty() => Err(HeaderError::EmptyRequiredHeader { header }),
        Some(value) => Ok(value.trim().to_string()),
    }
}

fn required_enum<T>(headers: &SubmittedHeaders, header: &'static str) -> Result<T, HeaderError>
where
    T: FromStr<Err = UnknownVariant>,
{
    let raw = required_text(headers, header)?;
    raw.parse()
        .map_err(|source| HeaderError::InvalidValue { header, source })
}

fn optional_enum<T>(
    headers: &SubmittedHeaders,
    header: &'static str,
) -> Result<Option<T>, HeaderError>
where
    T: FromStr<Err = UnknownVariant>,
{
    match lookup(headers, header) {
        Some(value) if !value.trim().is_empty() => value
            .parse()
            .map(Some)
            .map_err(|source| HeaderError::InvalidValue { header, source }),
        _ => Ok(None),
    }
}

fn required_date(
    headers: &SubmittedHeaders,
    header: &'static str,
) -> Result<NaiveDateTime, HeaderError> {
    match lookup(headers, header) {
        None => Err(DateValidationError::MissingDate { header }.into()),
        Some(value) if value.trim().is_empty() => Err(HeaderError::EmptyRequiredHeader { header }),
        Some(value) => parse_datetime(value).ok_or_else(|| {
            DateValidationError::Unparseable {
                header,
                value: value.to_string(),
            }
            .into()
        }),
    }
}

fn parse_datetime(value: &str) -> Option<NaiveDateTime> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(dt.naive_utc());
    }

    if let Ok(dt) = NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(dt);
    }

    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0);
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers() -> SubmittedHeaders {
        [
            (PROVENANCE_HEADER, "MANUAL_UPLOAD"),
            (SOURCE_ARTEFACT_ID_HEADER, "sjp-press-0001"),
            (TYPE_HEADER, "LIST"),
            (SENSITIVITY_HEADER, "PUBLIC"),
            (LANGUAGE_HEADER, "ENGLISH"),
            (DISPLAY_FROM_HEADER, "2022-07-20T00:00:00"),
            (DISPLAY_TO_HEADER, "2022-07-21T23:59:59"),
            (LIST_TYPE_HEADER, "SJP_PRESS_LIST"),
            (COURT_ID_HEADER, "9"),
            (CONTENT_DATE_HEADER, "2022-07-20"),
        ]
        .into_iter()
        .map(|(name, value)| (name.to_string(), value.to_string()))
        .collect()
    }

    #[test]
    fn valid_headers_build_group() {
        let group = HeaderValidator::new()
            .validate(&headers())
            .expect("headers validate");
        assert_eq!(group.provenance, "MANUAL_UPLOAD");
        assert_eq!(group.list_type, ListType::SjpPressList);
        assert_eq!(group.sensitivity, Sensitivity::Public);
        assert_eq!(
            group.content_date,
            NaiveDate::from_ymd_opt(2022, 7, 20)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap()
        );
    }

    #[test]
    fn empty_mandatory_header_names_the_field() {
        for header in [
            PROVENANCE_HEADER,
            SOURCE_ARTEFACT_ID_HEADER,
            TYPE_HEADER,
            LIST_TYPE_HEADER,
            COURT_ID_HEADER,
            DISPLAY_FROM_HEADER,
        ] {
            let mut submitted = headers();
            submitted.insert(header.to_string(), "  ".to_string());
            match HeaderValidator::new().validate(&submitted) {
                Err(error @ HeaderError::EmptyRequiredHeader { .. }) => {
                    assert_eq!(error.header(), header);
                    assert!(error.to_string().contains(header));
                }
                other => panic!("expected empty header error for {header}, got {other:?}"),
            }
        }
    }

    #[test]
    fn missing_headers_are_reported() {
        let mut submitted = headers();
        submitted.remove(SOURCE_ARTEFACT_ID_HEADER);
        assert_eq!(
            HeaderValidator::new().validate(&submitted),
            Err(HeaderError::MissingRequiredHeader {
                header: SOURCE_ARTEFACT_ID_HEADER
            })
        );

        let mut submitted = headers();
        submitted.remove(DISPLAY_TO_HEADER);
        assert_eq!(
            HeaderValidator::new().validate(&submitted),
            Err(HeaderError::Date(DateValidationError::MissingDate {
                header: DISPLAY_TO_HEADER
            }))
        );
    }

    #[test]
    fn display_from_after_display_to_is_rejected() {
        let mut submitted = headers();
        submitted.insert(
            DISPLAY_FROM_HEADER.to_string(),
            "2022-07-25T00:00:00".to_string(),
        );

        match HeaderValidator::new().validate(&submitted) {
            Err(HeaderError::Date(DateValidationError::DisplayWindow { from, to })) => {
                assert!(from > to)
            }
            other => panic!("expected display window error, got {other:?}"),
        }
    }

    #[test]
    fn defaults_apply_when_optional_headers_absent() {
        let mut submitted = headers();
        submitted.remove(SENSITIVITY_HEADER);
        submitted.insert(LANGUAGE_HEADER.to_string(), String::new());

        let group = HeaderValidator::new()
            .validate(&submitted)
            .expect("headers validate");
        assert_eq!(group.sensitivity, Sensitivity::Classified);
        assert_eq!(group.language, Language::English);
    }

    #[test]
    fn unknown_enumerations_are_invalid() {
        let mut submitted = headers();
        submitted.insert(LIST_TYPE_HEADER.to_string(), "BOGUS_LIST".to_string());
        match HeaderValidator::new().validate(&submitted) {
            Err(HeaderError::InvalidValue { header, source }) => {
                assert_eq!(header, LIST_TYPE_HEADER);
                assert_eq!(source.value, "BOGUS_LIST");
            }
            other => panic!("expected invalid value, got {other:?}"),
        }
    }

    #[test]
    fn parse_datetime_supports_rfc3339_local_and_date_strings() {
        assert!(parse_datetime("2022-07-20T10:00:00Z").is_some());
        assert!(parse_datetime("2022-07-20T10:00:00.123").is_some());
        assert!(parse_datetime("2022-07-20").is_some());
        assert!(parse_datetime("   ").is_none());
        assert!(parse_datetime("20/07/2022").is_none());
    }
}
