use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use chrono::{NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use serde::Serialize;
use serde_json::json;
use tracing::warn;

use super::domain::ArtefactId;
use super::headers::SubmittedHeaders;
use super::location::LocationLookup;
use super::repository::{ArtefactRepository, PayloadStore, RepositoryError};
use super::sensitivity::{SensitivityError, UserDirectory};
use super::service::{FlatFileUpload, PublicationError, PublicationService};

/// Header identifying the caller for sensitivity checks. Absent means anonymous.
pub const USER_ID_HEADER: &str = "x-user-id";
/// Original file name of a flat-file upload.
pub const FILE_NAME_HEADER: &str = "x-file-name";

/// Body returned for every failed request.
#[derive(Debug, Serialize)]
pub struct ErrorPayload {
    pub message: String,
    pub timestamp: String,
}

impl ErrorPayload {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        }
    }
}

/// Router builder exposing publication ingestion and retrieval.
pub fn publication_router<R, B, L, U>(service: Arc<PublicationService<R, B, L, U>>) -> Router
where
    R: ArtefactRepository + 'static,
    B: PayloadStore + 'static,
    L: LocationLookup + 'static,
    U: UserDirectory + 'static,
{
    Router::new()
        .route("/publication", post(ingest_handler::<R, B, L, U>))
        .route("/publication/file", post(ingest_file_handler::<R, B, L, U>))
        .route("/publication/expired", post(expiry_handler::<R, B, L, U>))
        .route(
            "/publication/location/:location_id",
            get(location_handler::<R, B, L, U>),
        )
        .route(
            "/publication/search/:field/:value",
            get(search_handler::<R, B, L, U>),
        )
        .route(
            "/publication/:artefact_id",
            get(metadata_handler::<R, B, L, U>).delete(delete_handler::<R, B, L, U>),
        )
        .route(
            "/publication/:artefact_id/payload",
            get(payload_handler::<R, B, L, U>),
        )
        .with_state(service)
}

type SharedService<R, B, L, U> = State<Arc<PublicationService<R, B, L, U>>>;

pub(crate) async fn ingest_handler<R, B, L, U>(
    State(service): SharedService<R, B, L, U>,
    headers: HeaderMap,
    body: String,
) -> Response
where
    R: ArtefactRepository + 'static,
    B: PayloadStore + 'static,
    L: LocationLookup + 'static,
    U: UserDirectory + 'static,
{
    match service.ingest(&submitted_headers(&headers), &body) {
        Ok(outcome) => (
            StatusCode::CREATED,
            axum::Json(json!({ "artefact_id": outcome.artefact.artefact_id })),
        )
            .into_response(),
        Err(err) => err.into_response(),
    }
}

pub(crate) async fn ingest_file_handler<R, B, L, U>(
    State(service): SharedService<R, B, L, U>,
    headers: HeaderMap,
    body: Bytes,
) -> Response
where
    R: ArtefactRepository + 'static,
    B: PayloadStore + 'static,
    L: LocationLookup + 'static,
    U: UserDirectory + 'static,
{
    let upload = FlatFileUpload {
        file_name: header_value(&headers, FILE_NAME_HEADER)
            .unwrap_or("upload.bin")
            .to_string(),
        content_type: header_value(&headers, header::CONTENT_TYPE.as_str()).map(str::to_string),
        body: body.to_vec(),
    };

    match service.ingest_flat_file(&submitted_headers(&headers), upload) {
        Ok(outcome) => (
            StatusCode::CREATED,
            axum::Json(json!({ "artefact_id": outcome.artefact.artefact_id })),
        )
            .into_response(),
        Err(err) => err.into_response(),
    }
}

pub(crate) async fn metadata_handler<R, B, L, U>(
    State(service): SharedService<R, B, L, U>,
    Path(artefact_id): Path<String>,
    headers: HeaderMap,
) -> Response
where
    R: ArtefactRepository + 'static,
    B: PayloadStore + 'static,
    L: LocationLookup + 'static,
    U: UserDirectory + 'static,
{
    let result = parse_id(&artefact_id).and_then(|id| {
        service.artefact(&id, header_value(&headers, USER_ID_HEADER), now())
    });
    match result {
        Ok(artefact) => (StatusCode::OK, axum::Json(artefact)).into_response(),
        Err(err) => err.into_response(),
    }
}

pub(crate) async fn payload_handler<R, B, L, U>(
    State(service): SharedService<R, B, L, U>,
    Path(artefact_id): Path<String>,
    headers: HeaderMap,
) -> Response
where
    R: ArtefactRepository + 'static,
    B: PayloadStore + 'static,
    L: LocationLookup + 'static,
    U: UserDirectory + 'static,
{
    let result = parse_id(&artefact_id).and_then(|id| {
        service.payload(&id, header_value(&headers, USER_ID_HEADER), now())
    });
    match result {
        Ok((artefact, body)) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, artefact.payload.content_type)],
            body,
        )
            .into_response(),
        Err(err) => err.into_response(),
    }
}

pub(crate) async fn location_handler<R, B, L, U>(
    State(service): SharedService<R, B, L, U>,
    Path(location_id): Path<String>,
    headers: HeaderMap,
) -> Response
where
    R: ArtefactRepository + 'static,
    B: PayloadStore + 'static,
    L: LocationLookup + 'static,
    U: UserDirectory + 'static,
{
    match service.artefacts_for_location(
        &location_id,
        header_value(&headers, USER_ID_HEADER),
        now(),
    ) {
        Ok(artefacts) => (StatusCode::OK, axum::Json(artefacts)).into_response(),
        Err(err) => err.into_response(),
    }
}

pub(crate) async fn search_handler<R, B, L, U>(
    State(service): SharedService<R, B, L, U>,
    Path((field, value)): Path<(String, String)>,
    headers: HeaderMap,
) -> Response
where
    R: ArtefactRepository + 'static,
    B: PayloadStore + 'static,
    L: LocationLookup + 'static,
    U: UserDirectory + 'static,
{
    match service.search(&field, &value, header_value(&headers, USER_ID_HEADER), now()) {
        Ok(artefacts) => (StatusCode::OK, axum::Json(artefacts)).into_response(),
        Err(err) => err.into_response(),
    }
}

pub(crate) async fn delete_handler<R, B, L, U>(
    State(service): SharedService<R, B, L, U>,
    Path(artefact_id): Path<String>,
) -> Response
where
    R: ArtefactRepository + 'static,
    B: PayloadStore + 'static,
    L: LocationLookup + 'static,
    U: UserDirectory + 'static,
{
    match parse_id(&artefact_id).and_then(|id| service.delete(&id)) {
        Ok(removed) => (
            StatusCode::OK,
            axum::Json(json!({ "deleted": removed.artefact_id })),
        )
            .into_response(),
        Err(err) => err.into_response(),
    }
}

pub(crate) async fn expiry_handler<R, B, L, U>(
    State(service): SharedService<R, B, L, U>,
) -> Response
where
    R: ArtefactRepository + 'static,
    B: PayloadStore + 'static,
    L: LocationLookup + 'static,
    U: UserDirectory + 'static,
{
    match service.delete_expired(today()) {
        Ok(removed) => (StatusCode::OK, axum::Json(json!({ "deleted": removed }))).into_response(),
        Err(err) => err.into_response(),
    }
}

impl IntoResponse for PublicationError {
    fn into_response(self) -> Response {
        let status = match &self {
            PublicationError::Header(_)
            | PublicationError::Payload(_)
            | PublicationError::Extraction(_)
            | PublicationError::EmptyPayload
            | PublicationError::InvalidArtefactId(_) => StatusCode::BAD_REQUEST,
            PublicationError::NotFound(_)
            | PublicationError::Repository(RepositoryError::NotFound)
            | PublicationError::Sensitivity(SensitivityError::UserNotFound { .. }) => {
                StatusCode::NOT_FOUND
            }
            PublicationError::Repository(RepositoryError::Conflict(_)) => StatusCode::CONFLICT,
            PublicationError::Location(_)
            | PublicationError::Sensitivity(SensitivityError::Directory(_))
            | PublicationError::Repository(RepositoryError::Unavailable(_))
            | PublicationError::PayloadStore(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        if status.is_server_error() {
            warn!(error = %self, "publication request failed");
        }

        (status, axum::Json(ErrorPayload::new(self.to_string()))).into_response()
    }
}

/// Collects the `x-` prefixed request headers the validator inspects.
pub fn submitted_headers(headers: &HeaderMap) -> SubmittedHeaders {
    headers
        .iter()
        .filter(|(name, _)| name.as_str().starts_with("x-"))
        .map(|(name, value)| {
            (
                name.as_str().to_string(),
                String::from_utf8_lossy(value.as_bytes()).into_owned(),
            )
        })
        .collect()
}

fn header_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

fn parse_id(raw: &str) -> Result<ArtefactId, PublicationError> {
    raw.parse()
        .map_err(|_| PublicationError::InvalidArtefactId(raw.to_string()))
}

/// Header dates carrying an offset are normalised to UTC, so reads compare against UTC too.
pub(crate) fn now() -> NaiveDateTime {
    Utc::now().naive_utc()
}

pub(crate) fn today() -> NaiveDate {
    Utc::now().date_naive()
}
