//! # Test Doubles
//!
//! In-memory store and scripted joke providers shared by the integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use chucknorris_controller::config::ControllerConfig;
use chucknorris_controller::controller::reconciler::{
    ReconcileSignal, Reconciler, ResourceKey, ResourceStore, StoreError,
};
use chucknorris_controller::provider::{FetchError, JokeProvider};
use chucknorris_controller::{ChuckNorris, ChuckNorrisSpec, ChuckNorrisStatus, JokeCategory};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Injected failure for the next store call
#[derive(Debug, Clone)]
pub enum Failure {
    Unavailable(String),
    Conflict,
}

impl Failure {
    fn into_error(self, key: &ResourceKey) -> StoreError {
        match self {
            Failure::Unavailable(message) => StoreError::Unavailable(message),
            Failure::Conflict => StoreError::Conflict {
                key: key.to_string(),
                message: "injected conflict".to_string(),
            },
        }
    }
}

#[derive(Default)]
struct StoreState {
    objects: HashMap<ResourceKey, ChuckNorris>,
    next_version: u64,
    loads: usize,
    writes: usize,
    fail_next_load: Option<Failure>,
    fail_next_write: Option<Failure>,
}

impl StoreState {
    fn bump_version(&mut self) -> String {
        self.next_version += 1;
        self.next_version.to_string()
    }
}

/// Store that behaves like the API server for a single kind: generations advance on
/// spec changes, resource versions on every write, stale writes are rejected.
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<StoreState>,
}

impl MemoryStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Create an object at generation 1 with an empty status
    pub fn insert(&self, namespace: &str, name: &str, category: JokeCategory) -> ResourceKey {
        let mut state = self.state.lock().unwrap();
        let mut resource = ChuckNorris::new(name, ChuckNorrisSpec { category });
        resource.metadata.namespace = Some(namespace.to_string());
        resource.metadata.generation = Some(1);
        resource.metadata.resource_version = Some(state.bump_version());

        let key = ResourceKey::new(namespace, name);
        state.objects.insert(key.clone(), resource);
        key
    }

    /// Change the category the way a user edit would: generation and version advance
    pub fn update_category(&self, key: &ResourceKey, category: JokeCategory) {
        let mut state = self.state.lock().unwrap();
        let version = state.bump_version();
        let resource = state.objects.get_mut(key).unwrap();
        resource.spec.category = category;
        resource.metadata.generation = resource.metadata.generation.map(|g| g + 1);
        resource.metadata.resource_version = Some(version);
    }

    pub fn delete(&self, key: &ResourceKey) {
        self.state.lock().unwrap().objects.remove(key);
    }

    pub fn get(&self, key: &ResourceKey) -> Option<ChuckNorris> {
        self.state.lock().unwrap().objects.get(key).cloned()
    }

    pub fn status(&self, key: &ResourceKey) -> ChuckNorrisStatus {
        self.get(key).and_then(|r| r.status).unwrap_or_default()
    }

    pub fn loads(&self) -> usize {
        self.state.lock().unwrap().loads
    }

    pub fn writes(&self) -> usize {
        self.state.lock().unwrap().writes
    }

    pub fn fail_next_load(&self, failure: Failure) {
        self.state.lock().unwrap().fail_next_load = Some(failure);
    }

    pub fn fail_next_write(&self, failure: Failure) {
        self.state.lock().unwrap().fail_next_write = Some(failure);
    }
}

#[async_trait]
impl ResourceStore for MemoryStore {
    async fn load(&self, key: &ResourceKey) -> Result<Option<ChuckNorris>, StoreError> {
        let mut state = self.state.lock().unwrap();
        state.loads += 1;
        if let Some(failure) = state.fail_next_load.take() {
            return Err(failure.into_error(key));
        }
        Ok(state.objects.get(key).cloned())
    }

    async fn write_status(
        &self,
        key: &ResourceKey,
        resource_version: Option<&str>,
        status: &ChuckNorrisStatus,
    ) -> Result<(), StoreError> {
        let mut state = self.state.lock().unwrap();
        if let Some(failure) = state.fail_next_write.take() {
            return Err(failure.into_error(key));
        }

        let version = state.bump_version();
        let Some(resource) = state.objects.get_mut(key) else {
            // Deleted: same as a 404 from the API server
            return Ok(());
        };

        if let Some(expected) = resource_version {
            if resource.metadata.resource_version.as_deref() != Some(expected) {
                return Err(StoreError::Conflict {
                    key: key.to_string(),
                    message: format!(
                        "expected resourceVersion {expected}, found {:?}",
                        resource.metadata.resource_version
                    ),
                });
            }
        }

        resource.status = Some(status.clone());
        resource.metadata.resource_version = Some(version);
        state.writes += 1;
        Ok(())
    }
}

/// Provider that answers from a queue of canned results
#[derive(Default)]
pub struct ScriptedProvider {
    responses: Mutex<VecDeque<Result<String, FetchError>>>,
    requested: Mutex<Vec<JokeCategory>>,
}

impl ScriptedProvider {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn push_ok(&self, joke: &str) {
        self.responses
            .lock()
            .unwrap()
            .push_back(Ok(joke.to_string()));
    }

    pub fn push_err(&self, error: FetchError) {
        self.responses.lock().unwrap().push_back(Err(error));
    }

    pub fn calls(&self) -> usize {
        self.requested.lock().unwrap().len()
    }

    pub fn requested(&self) -> Vec<JokeCategory> {
        self.requested.lock().unwrap().clone()
    }
}

#[async_trait]
impl JokeProvider for ScriptedProvider {
    async fn fetch(&self, category: JokeCategory) -> Result<String, FetchError> {
        self.requested.lock().unwrap().push(category);
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(FetchError::Transport("no scripted response".to_string())))
    }
}

/// Provider whose requests never complete
#[derive(Default)]
pub struct HangingProvider {
    calls: AtomicUsize,
}

impl HangingProvider {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl JokeProvider for HangingProvider {
    async fn fetch(&self, _category: JokeCategory) -> Result<String, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        std::future::pending().await
    }
}

pub fn reconciler<P: JokeProvider + 'static>(store: Arc<MemoryStore>, provider: Arc<P>) -> Reconciler {
    Reconciler::new(store, provider, ControllerConfig::default())
}

pub fn no_signal() -> ReconcileSignal {
    ReconcileSignal::never()
}
