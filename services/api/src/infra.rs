use chrono::NaiveDate;
use court_publications::config::PublicationConfig;
use court_publications::error::AppError;
use court_publications::publication::{
    user_profiles_from_path, Artefact, ArtefactId, ArtefactRepository, ExtractionConfig,
    LocationDirectory, PayloadStore, PayloadStoreError, RepositoryError, SchemaRegistry,
    UserDirectory, UserDirectoryError, UserProfile,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::collections::HashMap;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::info;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Schemas, search configuration and reference data for one process.
pub(crate) struct PublicationResources {
    pub(crate) schemas: SchemaRegistry,
    pub(crate) search: ExtractionConfig,
    pub(crate) locations: LocationDirectory,
    pub(crate) users: InMemoryUserDirectory,
}

/// Loads each resource from its configured path, or the bundled copy when none is set.
/// Users have no bundled copy; an unset roster leaves the directory empty.
pub(crate) fn load_resources(config: &PublicationConfig) -> Result<PublicationResources, AppError> {
    let schemas = match &config.schema_dir {
        Some(dir) => SchemaRegistry::from_dir(dir)?,
        None => SchemaRegistry::bundled()?,
    };
    let search = match &config.search_config {
        Some(path) => ExtractionConfig::from_path(path)?,
        None => ExtractionConfig::bundled()?,
    };
    let locations = match &config.locations_csv {
        Some(path) => LocationDirectory::from_path(path)?,
        None => LocationDirectory::bundled()?,
    };
    let users = match &config.users_csv {
        Some(path) => user_profiles_from_path(path)?,
        None => Vec::new(),
    };

    info!(
        search_fields = search.search_values.len(),
        party_search = search.party_search.is_some(),
        locations = locations.len(),
        users = users.len(),
        "publication resources loaded"
    );

    Ok(PublicationResources {
        schemas,
        search,
        locations,
        users: InMemoryUserDirectory::with_profiles(users),
    })
}

fn lock<T>(mutex: &Mutex<T>) -> Result<MutexGuard<'_, T>, RepositoryError> {
    mutex
        .lock()
        .map_err(|_| RepositoryError::Unavailable("repository lock poisoned".to_string()))
}

#[derive(Default, Clone)]
pub(crate) struct InMemoryArtefactRepository {
    records: Arc<Mutex<HashMap<ArtefactId, Artefact>>>,
}

impl InMemoryArtefactRepository {
    /// Matching artefacts, newest content first.
    fn select(
        &self,
        predicate: impl Fn(&Artefact) -> bool,
    ) -> Result<Vec<Artefact>, RepositoryError> {
        let guard = lock(&self.records)?;
        let mut matched: Vec<Artefact> = guard
            .values()
            .filter(|artefact| predicate(artefact))
            .cloned()
            .collect();
        matched.sort_by(|left, right| {
            right
                .content_date
                .cmp(&left.content_date)
                .then_with(|| left.artefact_id.cmp(&right.artefact_id))
        });
        Ok(matched)
    }
}

impl ArtefactRepository for InMemoryArtefactRepository {
    fn insert(&self, artefact: Artefact) -> Result<Artefact, RepositoryError> {
        let mut guard = lock(&self.records)?;
        if guard.contains_key(&artefact.artefact_id) {
            return Err(RepositoryError::Conflict(format!(
                "artefact {} already exists",
                artefact.artefact_id
            )));
        }
        guard.insert(artefact.artefact_id, artefact.clone());
        Ok(artefact)
    }

    fn update(&self, artefact: Artefact) -> Result<(), RepositoryError> {
        let mut guard = lock(&self.records)?;
        if guard.contains_key(&artefact.artefact_id) {
            guard.insert(artefact.artefact_id, artefact);
            Ok(())
        } else {
            Err(RepositoryError::NotFound)
        }
    }

    fn fetch(&self, id: &ArtefactId) -> Result<Option<Artefact>, RepositoryError> {
        let guard = lock(&self.records)?;
        Ok(guard.get(id).cloned())
    }

    fn find_by_source(
        &self,
        provenance: &str,
        source_artefact_id: &str,
    ) -> Result<Option<Artefact>, RepositoryError> {
        let guard = lock(&self.records)?;
        Ok(guard
            .values()
            .find(|artefact| {
                artefact.provenance == provenance
                    && artefact.source_artefact_id == source_artefact_id
            })
            .cloned())
    }

    fn find_by_location(&self, location_id: &str) -> Result<Vec<Artefact>, RepositoryError> {
        self.select(|artefact| artefact.location_id == location_id)
    }

    fn find_by_search_value(
        &self,
        field: &str,
        value: &str,
    ) -> Result<Vec<Artefact>, RepositoryError> {
        self.select(|artefact| artefact.search.matches(field, value))
    }

    fn delete(&self, id: &ArtefactId) -> Result<Option<Artefact>, RepositoryError> {
        let mut guard = lock(&self.records)?;
        Ok(guard.remove(id))
    }

    fn expired(&self, today: NaiveDate) -> Result<Vec<Artefact>, RepositoryError> {
        self.select(|artefact| artefact.is_expired_on(today))
    }
}

#[derive(Default, Clone)]
pub(crate) struct InMemoryPayloadStore {
    blobs: Arc<Mutex<HashMap<String, Vec<u8>>>>,
}

impl InMemoryPayloadStore {
    fn blobs(&self) -> Result<MutexGuard<'_, HashMap<String, Vec<u8>>>, PayloadStoreError> {
        self.blobs
            .lock()
            .map_err(|_| PayloadStoreError::Unavailable("payload lock poisoned".to_string()))
    }
}

impl PayloadStore for InMemoryPayloadStore {
    fn put(&self, key: &str, body: Vec<u8>) -> Result<(), PayloadStoreError> {
        self.blobs()?.insert(key.to_string(), body);
        Ok(())
    }

    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, PayloadStoreError> {
        Ok(self.blobs()?.get(key).cloned())
    }

    fn delete(&self, key: &str) -> Result<(), PayloadStoreError> {
        self.blobs()?.remove(key);
        Ok(())
    }
}

/// Account directory seeded from the configured user roster.
#[derive(Clone)]
pub(crate) struct InMemoryUserDirectory {
    users: Arc<HashMap<String, UserProfile>>,
}

impl InMemoryUserDirectory {
    pub(crate) fn with_profiles(profiles: impl IntoIterator<Item = UserProfile>) -> Self {
        Self {
            users: Arc::new(
                profiles
                    .into_iter()
                    .map(|profile| (profile.user_id.clone(), profile))
                    .collect(),
            ),
        }
    }

    /// Ids of the seeded users matching `keep`, sorted.
    pub(crate) fn user_ids_where(&self, keep: impl Fn(&UserProfile) -> bool) -> Vec<String> {
        let mut ids: Vec<String> = self
            .users
            .values()
            .filter(|profile| keep(profile))
            .map(|profile| profile.user_id.clone())
            .collect();
        ids.sort();
        ids
    }
}

impl UserDirectory for InMemoryUserDirectory {
    fn find_user(&self, user_id: &str) -> Result<Option<UserProfile>, UserDirectoryError> {
        Ok(self.users.get(user_id).cloned())
    }
}
