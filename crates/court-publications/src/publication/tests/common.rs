use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};

use axum::response::Response;
use chrono::{NaiveDate, NaiveDateTime};
use serde_json::Value;

use crate::publication::domain::{
    Artefact, ArtefactId, ListType, Location, LocationReference, Sensitivity, UserProfile,
    UserProvenance, UserRole, MANUAL_UPLOAD_PROVENANCE,
};
use crate::publication::extraction::ExtractionConfig;
use crate::publication::headers::{
    SubmittedHeaders, CONTENT_DATE_HEADER, COURT_ID_HEADER, DISPLAY_FROM_HEADER,
    DISPLAY_TO_HEADER, LANGUAGE_HEADER, LIST_TYPE_HEADER, PROVENANCE_HEADER,
    SENSITIVITY_HEADER, SOURCE_ARTEFACT_ID_HEADER, TYPE_HEADER,
};
use crate::publication::location::{LocationLookup, LocationLookupError};
use crate::publication::repository::{
    ArtefactRepository, PayloadStore, PayloadStoreError, RepositoryError,
};
use crate::publication::schema::SchemaRegistry;
use crate::publication::sensitivity::{UserDirectory, UserDirectoryError};
use crate::publication::{publication_router, PublicationService};

pub(super) const SJP_PRESS_LIST: &str = include_str!("../../../tests/fixtures/sjp_press_list.json");
pub(super) const CIVIL_DAILY_CAUSE_LIST: &str =
    include_str!("../../../tests/fixtures/civil_daily_cause_list.json");

pub(super) const DISPLAY_FROM: &str = "2022-07-20T00:00:00";
pub(super) const DISPLAY_TO: &str = "2099-12-31T23:59:59";

pub(super) type TestService =
    PublicationService<MemoryRepository, MemoryPayloads, FixedLocations, MemoryUsers>;

pub(super) fn headers(
    source_artefact_id: &str,
    list_type: ListType,
    sensitivity: Sensitivity,
    court_id: &str,
) -> SubmittedHeaders {
    let mut headers = BTreeMap::new();
    headers.insert(PROVENANCE_HEADER.to_string(), MANUAL_UPLOAD_PROVENANCE.to_string());
    headers.insert(SOURCE_ARTEFACT_ID_HEADER.to_string(), source_artefact_id.to_string());
    headers.insert(TYPE_HEADER.to_string(), "LIST".to_string());
    headers.insert(SENSITIVITY_HEADER.to_string(), sensitivity.as_str().to_string());
    headers.insert(LANGUAGE_HEADER.to_string(), "ENGLISH".to_string());
    headers.insert(DISPLAY_FROM_HEADER.to_string(), DISPLAY_FROM.to_string());
    headers.insert(DISPLAY_TO_HEADER.to_string(), DISPLAY_TO.to_string());
    headers.insert(LIST_TYPE_HEADER.to_string(), list_type.as_str().to_string());
    headers.insert(COURT_ID_HEADER.to_string(), court_id.to_string());
    headers.insert(CONTENT_DATE_HEADER.to_string(), "2022-07-21T00:00:00".to_string());
    headers
}

pub(super) fn sjp_press_headers(sensitivity: Sensitivity) -> SubmittedHeaders {
    headers("sjp-press-0001", ListType::SjpPressList, sensitivity, "9")
}

pub(super) fn civil_headers(sensitivity: Sensitivity) -> SubmittedHeaders {
    headers("civil-0001", ListType::CivilDailyCauseList, sensitivity, "1")
}

pub(super) fn at(value: &str) -> NaiveDateTime {
    NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S").expect("valid timestamp")
}

pub(super) fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2022, 7, 21).expect("valid date")
}

pub(super) fn now() -> NaiveDateTime {
    at("2022-07-21T09:30:00")
}

pub(super) fn without(payload: &str, pointer: &str) -> String {
    let mut document: Value = serde_json::from_str(payload).expect("fixture parses");
    let (parent, field) = pointer.rsplit_once('/').expect("pointer has a parent");
    document
        .pointer_mut(parent)
        .and_then(Value::as_object_mut)
        .expect("parent object exists")
        .remove(field)
        .expect("field exists");
    document.to_string()
}

pub(super) fn locations() -> FixedLocations {
    FixedLocations(vec![
        Location {
            location_id: "9".to_string(),
            name: "Single Justice Procedure".to_string(),
            jurisdictions: vec!["Magistrates Court".to_string()],
            regions: vec!["National".to_string()],
            references: Vec::new(),
        },
        Location {
            location_id: "1".to_string(),
            name: "Oxford Combined Court Centre".to_string(),
            jurisdictions: vec!["Civil".to_string(), "Family".to_string()],
            regions: vec!["South East".to_string()],
            references: vec![LocationReference {
                provenance: "SNL".to_string(),
                source_location_id: "oxford-ccc".to_string(),
            }],
        },
    ])
}

pub(super) fn users() -> MemoryUsers {
    let profiles = [
        ("verified-pi", UserRole::Verified, UserProvenance::PiAad),
        ("verified-cft", UserRole::Verified, UserProvenance::CftIdam),
        ("admin-pi", UserRole::SystemAdmin, UserProvenance::PiAad),
    ];
    MemoryUsers(
        profiles
            .into_iter()
            .map(|(user_id, role, provenance)| {
                (
                    user_id.to_string(),
                    UserProfile {
                        user_id: user_id.to_string(),
                        role,
                        provenance,
                    },
                )
            })
            .collect(),
    )
}

pub(super) fn service_with<R: ArtefactRepository + 'static>(
    repository: Arc<R>,
    payloads: Arc<MemoryPayloads>,
) -> PublicationService<R, MemoryPayloads, FixedLocations, MemoryUsers> {
    PublicationService::new(
        Arc::new(SchemaRegistry::bundled().expect("bundled schemas compile")),
        Arc::new(ExtractionConfig::bundled().expect("bundled search config loads")),
        repository,
        payloads,
        Arc::new(locations()),
        Arc::new(users()),
    )
}

pub(super) fn build_service() -> (TestService, Arc<MemoryRepository>, Arc<MemoryPayloads>) {
    let repository = Arc::new(MemoryRepository::default());
    let payloads = Arc::new(MemoryPayloads::default());
    let service = service_with(repository.clone(), payloads.clone());
    (service, repository, payloads)
}

pub(super) fn router_with_service(service: TestService) -> axum::Router {
    publication_router(Arc::new(service))
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}

#[derive(Default, Clone)]
pub(super) struct MemoryRepository {
    pub(super) records: Arc<Mutex<BTreeMap<ArtefactId, Artefact>>>,
}

impl MemoryRepository {
    pub(super) fn len(&self) -> usize {
        self.records.lock().expect("repository mutex poisoned").len()
    }

    fn select(&self, predicate: impl Fn(&Artefact) -> bool) -> Vec<Artefact> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        guard.values().filter(|artefact| predicate(artefact)).cloned().collect()
    }
}

impl ArtefactRepository for MemoryRepository {
    fn insert(&self, artefact: Artefact) -> Result<Artefact, RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        if guard.contains_key(&artefact.artefact_id) {
            return Err(RepositoryError::Conflict(artefact.artefact_id.to_string()));
        }
        guard.insert(artefact.artefact_id, artefact.clone());
        Ok(artefact)
    }

    fn update(&self, artefact: Artefact) -> Result<(), RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        guard.insert(artefact.artefact_id, artefact);
        Ok(())
    }

    fn fetch(&self, id: &ArtefactId) -> Result<Option<Artefact>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        Ok(guard.get(id).cloned())
    }

    fn find_by_source(
        &self,
        provenance: &str,
        source_artefact_id: &str,
    ) -> Result<Option<Artefact>, RepositoryError> {
        Ok(self
            .select(|artefact| {
                artefact.provenance == provenance
                    && artefact.source_artefact_id == source_artefact_id
            })
            .into_iter()
            .next())
    }

    fn find_by_location(&self, location_id: &str) -> Result<Vec<Artefact>, RepositoryError> {
        Ok(self.select(|artefact| artefact.location_id == location_id))
    }

    fn find_by_search_value(
        &self,
        field: &str,
        value: &str,
    ) -> Result<Vec<Artefact>, RepositoryError> {
        Ok(self.select(|artefact| artefact.search.matches(field, value)))
    }

    fn delete(&self, id: &ArtefactId) -> Result<Option<Artefact>, RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        Ok(guard.remove(id))
    }

    fn expired(&self, today: NaiveDate) -> Result<Vec<Artefact>, RepositoryError> {
        Ok(self.select(|artefact| artefact.is_expired_on(today)))
    }
}

#[derive(Default, Clone)]
pub(super) struct MemoryPayloads {
    blobs: Arc<Mutex<HashMap<String, Vec<u8>>>>,
}

impl MemoryPayloads {
    pub(super) fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self
            .blobs
            .lock()
            .expect("payload mutex poisoned")
            .keys()
            .cloned()
            .collect();
        keys.sort();
        keys
    }
}

impl PayloadStore for MemoryPayloads {
    fn put(&self, key: &str, body: Vec<u8>) -> Result<(), PayloadStoreError> {
        self.blobs
            .lock()
            .expect("payload mutex poisoned")
            .insert(key.to_string(), body);
        Ok(())
    }

    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, PayloadStoreError> {
        Ok(self
            .blobs
            .lock()
            .expect("payload mutex poisoned")
            .get(key)
            .cloned())
    }

    fn delete(&self, key: &str) -> Result<(), PayloadStoreError> {
        self.blobs.lock().expect("payload mutex poisoned").remove(key);
        Ok(())
    }
}

pub(super) struct FixedLocations(Vec<Location>);

impl LocationLookup for FixedLocations {
    fn find_by_id(&self, location_id: &str) -> Result<Option<Location>, LocationLookupError> {
        Ok(self
            .0
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
            .0
            .iter()
            .find(|location| {
                location.references.iter().any(|reference| {
                    reference.provenance == provenance
                        && reference.source_location_id == source_location_id
                })
            })
            .cloned())
    }
}

pub(super) struct MemoryUsers(HashMap<String, UserProfile>);

impl UserDirectory for MemoryUsers {
    fn find_user(&self, user_id: &str) -> Result<Option<UserProfile>, UserDirectoryError> {
        Ok(self.0.get(user_id).cloned())
    }
}

pub(super) struct ConflictRepository;

impl ArtefactRepository for ConflictRepository {
    fn insert(&self, artefact: Artefact) -> Result<Artefact, RepositoryError> {
        Err(RepositoryError::Conflict(artefact.artefact_id.to_string()))
    }

    fn update(&self, _artefact: Artefact) -> Result<(), RepositoryError> {
        Err(RepositoryError::Unavailable("read only".to_string()))
    }

    fn fetch(&self, _id: &ArtefactId) -> Result<Option<Artefact>, RepositoryError> {
        Ok(None)
    }

    fn find_by_source(&self, _: &str, _: &str) -> Result<Option<Artefact>, RepositoryError> {
        Ok(None)
    }

    fn find_by_location(&self, _location_id: &str) -> Result<Vec<Artefact>, RepositoryError> {
        Ok(Vec::new())
    }

    fn find_by_search_value(&self, _: &str, _: &str) -> Result<Vec<Artefact>, RepositoryError> {
        Ok(Vec::new())
    }

    fn delete(&self, _id: &ArtefactId) -> Result<Option<Artefact>, RepositoryError> {
        Ok(None)
    }

    fn expired(&self, _today: NaiveDate) -> Result<Vec<Artefact>, RepositoryError> {
        Ok(Vec::new())
    }
}

pub(super) struct UnavailableRepository;

impl ArtefactRepository for UnavailableRepository {
    fn insert(&self, _artefact: Artefact) -> Result<Artefact, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn update(&self, _artefact: Artefact) -> Result<(), RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn fetch(&self, _id: &ArtefactId) -> Result<Option<Artefact>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn find_by_source(&self, _: &str, _: &str) -> Result<Option<Artefact>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn find_by_location(&self, _location_id: &str) -> Result<Vec<Artefact>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn find_by_search_value(&self, _: &str, _: &str) -> Result<Vec<Artefact>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn delete(&self, _id: &ArtefactId) -> Result<Option<Artefact>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn expired(&self, _today: NaiveDate) -> Result<Vec<Artefact>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }
}

/// Accepts new artefacts but refuses to change stored ones.
pub(super) struct FrozenRepository(pub(super) MemoryRepository);

impl ArtefactRepository for FrozenRepository {
    fn insert(&self, artefact: Artefact) -> Result<Artefact, RepositoryError> {
        self.0.insert(artefact)
    }

    fn update(&self, _artefact: Artefact) -> Result<(), RepositoryError> {
        Err(RepositoryError::Unavailable("database read only".to_string()))
    }

    fn fetch(&self, id: &ArtefactId) -> Result<Option<Artefact>, RepositoryError> {
        self.0.fetch(id)
    }

    fn find_by_source(
        &self,
        provenance: &str,
        source_artefact_id: &str,
    ) -> Result<Option<Artefact>, RepositoryError> {
        self.0.find_by_source(provenance, source_artefact_id)
    }

    fn find_by_location(&self, location_id: &str) -> Result<Vec<Artefact>, RepositoryError> {
        self.0.find_by_location(location_id)
    }

    fn find_by_search_value(
        &self,
        field: &str,
        value: &str,
    ) -> Result<Vec<Artefact>, RepositoryError> {
        self.0.find_by_search_value(field, value)
    }

    fn delete(&self, id: &ArtefactId) -> Result<Option<Artefact>, RepositoryError> {
        self.0.delete(id)
    }

    fn expired(&self, today: NaiveDate) -> Result<Vec<Artefact>, RepositoryError> {
        self.0.expired(today)
    }
}
