//! End-to-end ingestion scenarios driven through the public service facade and HTTP router.

mod common {
    use std::collections::{BTreeMap, HashMap};
    use std::sync::{Arc, Mutex};

    use chrono::NaiveDate;

    use court_publications::publication::headers::{
        CONTENT_DATE_HEADER, COURT_ID_HEADER, DISPLAY_FROM_HEADER, DISPLAY_TO_HEADER,
        LIST_TYPE_HEADER, PROVENANCE_HEADER, SENSITIVITY_HEADER, SOURCE_ARTEFACT_ID_HEADER,
        TYPE_HEADER,
    };
    use court_publications::publication::{
        Artefact, ArtefactId, ArtefactRepository, ExtractionConfig, Location, LocationLookup,
        LocationLookupError, PayloadStore, PayloadStoreError, PublicationService,
        RepositoryError, SchemaRegistry, SubmittedHeaders, UserDirectory, UserDirectoryError,
        UserProfile,
    };

    pub(super) const SJP_PRESS_LIST: &str = include_str!("fixtures/sjp_press_list.json");

    pub(super) type Service =
        PublicationService<MemoryArtefacts, MemoryPayloads, SingleLocation, NoUsers>;

    pub(super) fn headers(source_artefact_id: &str, sensitivity: &str, court_id: &str) -> SubmittedHeaders {
        [
            (PROVENANCE_HEADER, "MANUAL_UPLOAD"),
            (SOURCE_ARTEFACT_ID_HEADER, source_artefact_id),
            (TYPE_HEADER, "LIST"),
            (SENSITIVITY_HEADER, sensitivity),
            (DISPLAY_FROM_HEADER, "2022-07-20T00:00:00"),
            (DISPLAY_TO_HEADER, "2099-07-20T00:00:00"),
            (LIST_TYPE_HEADER, "SJP_PRESS_LIST"),
            (COURT_ID_HEADER, court_id),
            (CONTENT_DATE_HEADER, "2022-07-20"),
        ]
        .into_iter()
        .map(|(name, value)| (name.to_string(), value.to_string()))
        .collect()
    }

    pub(super) fn service() -> Service {
        PublicationService::new(
            Arc::new(SchemaRegistry::bundled().expect("bundled schemas compile")),
            Arc::new(ExtractionConfig::bundled().expect("bundled search config loads")),
            Arc::new(MemoryArtefacts::default()),
            Arc::new(MemoryPayloads::default()),
            Arc::new(SingleLocation(Location {
                location_id: "9".to_string(),
                name: "Single Justice Procedure".to_string(),
                jurisdictions: vec!["Magistrates Court".to_string()],
                regions: vec!["National".to_string()],
                references: Vec::new(),
            })),
            Arc::new(NoUsers),
        )
    }

    #[derive(Default)]
    pub(super) struct MemoryArtefacts {
        records: Mutex<BTreeMap<ArtefactId, Artefact>>,
    }

    impl MemoryArtefacts {
        fn matching(&self, predicate: impl Fn(&Artefact) -> bool) -> Vec<Artefact> {
            let guard = self.records.lock().expect("repository mutex poisoned");
            guard.values().filter(|artefact| predicate(artefact)).cloned().collect()
        }
    }

    impl ArtefactRepository for MemoryArtefacts {
        fn insert(&self, artefact: Artefact) -> Result<Artefact, RepositoryError> {
            let mut guard = self.records.lock().expect("repository mutex poisoned");
            guard.insert(artefact.artefact_id, artefact.clone());
            Ok(artefact)
        }

        fn update(&self, artefact: Artefact) -> Result<(), RepositoryError> {
            self.insert(artefact).map(|_| ())
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
                .matching(|artefact| {
                    artefact.provenance == provenance
                        && artefact.source_artefact_id == source_artefact_id
                })
                .into_iter()
                .next())
        }

        fn find_by_location(&self, location_id: &str) -> Result<Vec<Artefact>, RepositoryError> {
            Ok(self.matching(|artefact| artefact.location_id == location_id))
        }

        fn find_by_search_value(
            &self,
            field: &str,
            value: &str,
        ) -> Result<Vec<Artefact>, RepositoryError> {
            Ok(self.matching(|artefact| artefact.search.matches(field, value)))
        }

        fn delete(&self, id: &ArtefactId) -> Result<Option<Artefact>, RepositoryError> {
            let mut guard = self.records.lock().expect("repository mutex poisoned");
            Ok(guard.remove(id))
        }

        fn expired(&self, today: NaiveDate) -> Result<Vec<Artefact>, RepositoryError> {
            Ok(self.matching(|artefact| artefact.is_expired_on(today)))
        }
    }

    #[derive(Default)]
    pub(super) struct MemoryPayloads {
        blobs: Mutex<HashMap<String, Vec<u8>>>,
    }

    impl PayloadStore for MemoryPayloads {
        fn put(&self, key: &str, body: Vec<u8>) -> Result<(), PayloadStoreError> {
            let mut guard = self.blobs.lock().expect("payload mutex poisoned");
            guard.insert(key.to_string(), body);
            Ok(())
        }

        fn get(&self, key: &str) -> Result<Option<Vec<u8>>, PayloadStoreError> {
            let guard = self.blobs.lock().expect("payload mutex poisoned");
            Ok(guard.get(key).cloned())
        }

        fn delete(&self, key: &str) -> Result<(), PayloadStoreError> {
            let mut guard = self.blobs.lock().expect("payload mutex poisoned");
            guard.remove(key);
            Ok(())
        }
    }

    pub(super) struct SingleLocation(Location);

    impl LocationLookup for SingleLocation {
        fn find_by_id(&self, location_id: &str) -> Result<Option<Location>, LocationLookupError> {
            Ok((self.0.location_id == location_id).then(|| self.0.clone()))
        }

        fn find_by_source_reference(
            &self,
            provenance: &str,
            source_location_id: &str,
        ) -> Result<Option<Location>, LocationLookupError> {
            let known = self.0.references.iter().any(|reference| {
                reference.provenance == provenance
                    && reference.source_location_id == source_location_id
            });
            Ok(known.then(|| self.0.clone()))
        }
    }

    pub(super) struct NoUsers;

    impl UserDirectory for NoUsers {
        fn find_user(&self, _user_id: &str) -> Result<Option<UserProfile>, UserDirectoryError> {
            Ok(None)
        }
    }
}

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use chrono::Utc;
use court_publications::publication::location::strip_placeholder;
use court_publications::publication::{publication_router, PublicationError};
use serde_json::Value;
use tower::ServiceExt;

use common::*;

#[test]
fn well_formed_press_list_is_ingested_with_a_resolvable_id() {
    let service = service();
    let outcome = service
        .ingest(&headers("sjp-press-1", "PUBLIC", "9"), SJP_PRESS_LIST)
        .expect("press list ingests");

    let fetched = service
        .artefact(&outcome.artefact.artefact_id, None, Utc::now().naive_utc())
        .expect("artefact resolvable");
    assert_eq!(fetched, outcome.artefact);
}

#[test]
fn stripped_date_of_birth_fails_schema_validation() {
    let mut document: Value = serde_json::from_str(SJP_PRESS_LIST).expect("fixture parses");
    document
        .pointer_mut("/courtLists/0/courtHouse/courtRoom/0/session/0/sittings/0/hearing/1/party/0/individualDetails")
        .and_then(Value::as_object_mut)
        .expect("individual details present")
        .remove("dateOfBirth");

    match service().ingest(&headers("sjp-press-2", "PUBLIC", "9"), &document.to_string()) {
        Err(PublicationError::Payload(error)) => {
            assert!(error.to_string().contains("dateOfBirth"), "{error}")
        }
        other => panic!("expected schema validation failure, got {other:?}"),
    }
}

#[test]
fn unrecognised_location_is_stored_as_placeholder() {
    let artefact = service()
        .ingest(&headers("sjp-press-3", "PUBLIC", "777"), SJP_PRESS_LIST)
        .expect("press list ingests")
        .artefact;

    assert_eq!(artefact.location_id, "NoMatch777");
    assert_eq!(strip_placeholder(&artefact.location_id), Some("777"));
}

#[tokio::test]
async fn anonymous_callers_only_see_public_artefacts() {
    let service = service();
    let public = service
        .ingest(&headers("sjp-press-4", "PUBLIC", "777"), SJP_PRESS_LIST)
        .expect("public ingests")
        .artefact;
    let classified = service
        .ingest(&headers("sjp-press-5", "CLASSIFIED", "777"), SJP_PRESS_LIST)
        .expect("classified ingests")
        .artefact;
    let router = publication_router(Arc::new(service));

    let response = router
        .clone()
        .oneshot(
            Request::get(format!("/publication/{}", public.artefact_id))
                .body(Body::empty())
                .expect("request builds"),
        )
        .await
        .expect("route executes");
    assert_eq!(response.status(), StatusCode::OK);

    let response = router
        .oneshot(
            Request::get(format!("/publication/{}", classified.artefact_id))
                .body(Body::empty())
                .expect("request builds"),
        )
        .await
        .expect("route executes");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
