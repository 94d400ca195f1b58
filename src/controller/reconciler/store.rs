//! # Resource Store
//!
//! Loading `ChuckNorris` objects and writing their status.
//!
//! Status writes carry the `resourceVersion` the object was loaded with, so the API
//! server rejects them with 409 Conflict if the object changed in between.

use crate::constants::FIELD_MANAGER;
use crate::controller::reconciler::types::ResourceKey;
use crate::crd::{ChuckNorris, ChuckNorrisStatus};
use async_trait::async_trait;
use kube::api::{Api, Patch, PatchParams};
use kube::Client;
use tracing::debug;

/// Errors from loading or persisting a resource
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The object changed since it was loaded
    #[error("resource {key} was modified since it was loaded: {message}")]
    Conflict { key: String, message: String },
    /// The store could not serve the request
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("kubernetes API error: {0}")]
    Kube(#[from] kube::Error),
}

/// Load/persist seam used by the reconciler
#[async_trait]
pub trait ResourceStore: Send + Sync {
    /// Current object for `key`, or `None` if it does not exist
    async fn load(&self, key: &ResourceKey) -> Result<Option<ChuckNorris>, StoreError>;

    /// Replace the status of `key`, failing with [`StoreError::Conflict`] if the object
    /// is no longer at `resource_version`
    async fn write_status(
        &self,
        key: &ResourceKey,
        resource_version: Option<&str>,
        status: &ChuckNorrisStatus,
    ) -> Result<(), StoreError>;
}

/// Kubernetes API backed store
#[derive(Clone)]
pub struct KubeStore {
    client: Client,
}

impl std::fmt::Debug for KubeStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KubeStore").finish_non_exhaustive()
    }
}

impl KubeStore {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn api(&self, namespace: &str) -> Api<ChuckNorris> {
        Api::namespaced(self.client.clone(), namespace)
    }
}

/// Merge patch body for a status write
///
/// The whole condition list is sent; merge patches replace arrays wholesale, and the
/// list passed in already contains every earlier entry.
pub fn status_patch(resource_version: Option<&str>, status: &ChuckNorrisStatus) -> serde_json::Value {
    match resource_version {
        Some(version) => serde_json::json!({
            "metadata": { "resourceVersion": version },
            "status": status
        }),
        None => serde_json::json!({ "status": status }),
    }
}

#[async_trait]
impl ResourceStore for KubeStore {
    async fn load(&self, key: &ResourceKey) -> Result<Option<ChuckNorris>, StoreError> {
        Ok(self.api(&key.namespace).get_opt(&key.name).await?)
    }

    async fn write_status(
        &self,
        key: &ResourceKey,
        resource_version: Option<&str>,
        status: &ChuckNorrisStatus,
    ) -> Result<(), StoreError> {
        let patch = status_patch(resource_version, status);

        match self
            .api(&key.namespace)
            .patch_status(
                &key.name,
                &PatchParams::apply(FIELD_MANAGER),
                &Patch::Merge(patch),
            )
            .await
        {
            Ok(_) => Ok(()),
            Err(kube::Error::Api(api_err)) if api_err.code == 409 => Err(StoreError::Conflict {
                key: key.to_string(),
                message: api_err.message.clone(),
            }),
            Err(kube::Error::Api(api_err)) if api_err.code == 404 => {
                // Deleted mid-reconcile; the next load sees NotFound and settles
                debug!(
                    "ChuckNorris {} was deleted during reconciliation, skipping status update",
                    key
                );
                Ok(())
            }
            Err(e) => Err(StoreError::Kube(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const OBJECT_PATH: &str = "/apis/jokes.example.com/v1alpha1/namespaces/jokes/chucknorris/dev-joke";
    const STATUS_PATH: &str =
        "/apis/jokes.example.com/v1alpha1/namespaces/jokes/chucknorris/dev-joke/status";

    fn store_for(server: &MockServer) -> KubeStore {
        // Err when another test installed it first
        let _ = rustls::crypto::ring::default_provider().install_default();
        let config = kube::Config::new(server.uri().parse().unwrap());
        KubeStore::new(Client::try_from(config).unwrap())
    }

    fn api_status(code: u16, reason: &str, message: &str) -> serde_json::Value {
        json!({
            "kind": "Status",
            "apiVersion": "v1",
            "metadata": {},
            "status": "Failure",
            "message": message,
            "reason": reason,
            "details": { "name": "dev-joke", "group": "jokes.example.com", "kind": "chucknorris" },
            "code": code
        })
    }

    fn key() -> ResourceKey {
        ResourceKey::new("jokes", "dev-joke")
    }

    #[tokio::test]
    async fn test_write_status_conflict() {
        let server = MockServer::start().await;
        Mock::given(method("PATCH"))
            .and(path(STATUS_PATH))
            .and(body_partial_json(json!({ "metadata": { "resourceVersion": "41" } })))
            .respond_with(ResponseTemplate::new(409).set_body_json(api_status(
                409,
                "Conflict",
                "the object has been modified; please apply your changes to the latest version and try again",
            )))
            .expect(1)
            .mount(&server)
            .await;

        let result = store_for(&server)
            .write_status(&key(), Some("41"), &ChuckNorrisStatus::default())
            .await;

        match result {
            Err(StoreError::Conflict { key, message }) => {
                assert_eq!(key, "jokes/dev-joke");
                assert!(message.contains("the object has been modified"), "{message}");
            }
            other => panic!("expected conflict, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_write_status_on_deleted_resource_succeeds() {
        let server = MockServer::start().await;
        Mock::given(method("PATCH"))
            .and(path(STATUS_PATH))
            .respond_with(ResponseTemplate::new(404).set_body_json(api_status(
                404,
                "NotFound",
                "chucknorris.jokes.example.com \"dev-joke\" not found",
            )))
            .expect(1)
            .mount(&server)
            .await;

        let result = store_for(&server)
            .write_status(&key(), Some("41"), &ChuckNorrisStatus::default())
            .await;

        assert!(result.is_ok(), "{result:?}");
    }

    #[tokio::test]
    async fn test_write_status_sends_status_and_resource_version() {
        let server = MockServer::start().await;
        let status = ChuckNorrisStatus {
            joke: "joke-A".to_string(),
            observed_generation: Some(1),
            conditions: vec![],
        };
        Mock::given(method("PATCH"))
            .and(path(STATUS_PATH))
            .and(body_partial_json(json!({
                "metadata": { "resourceVersion": "41" },
                "status": { "joke": "joke-A", "observedGeneration": 1 }
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "apiVersion": "jokes.example.com/v1alpha1",
                "kind": "ChuckNorris",
                "metadata": { "name": "dev-joke", "namespace": "jokes", "resourceVersion": "42" },
                "spec": { "category": "dev" },
                "status": { "joke": "joke-A", "observedGeneration": 1, "conditions": [] }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let result = store_for(&server)
            .write_status(&key(), Some("41"), &status)
            .await;

        assert!(result.is_ok(), "{result:?}");
    }

    #[tokio::test]
    async fn test_load_missing_resource_is_none() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(OBJECT_PATH))
            .respond_with(ResponseTemplate::new(404).set_body_json(api_status(
                404,
                "NotFound",
                "chucknorris.jokes.example.com \"dev-joke\" not found",
            )))
            .mount(&server)
            .await;

        let loaded = store_for(&server).load(&key()).await.unwrap();

        assert!(loaded.is_none());
    }

    #[tokio::test]
    async fn test_load_existing_resource() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(OBJECT_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "apiVersion": "jokes.example.com/v1alpha1",
                "kind": "ChuckNorris",
                "metadata": {
                    "name": "dev-joke",
                    "namespace": "jokes",
                    "generation": 3,
                    "resourceVersion": "41"
                },
                "spec": { "category": "food" }
            })))
            .mount(&server)
            .await;

        let loaded = store_for(&server).load(&key()).await.unwrap().unwrap();

        assert_eq!(loaded.spec.category, crate::crd::JokeCategory::Food);
        assert_eq!(loaded.metadata.generation, Some(3));
        assert_eq!(loaded.metadata.resource_version.as_deref(), Some("41"));
    }

    #[test]
    fn test_status_patch_carries_resource_version() {
        let status = ChuckNorrisStatus {
            joke: "joke-A".to_string(),
            observed_generation: Some(2),
            conditions: vec![],
        };
        let patch = status_patch(Some("12345"), &status);
        assert_eq!(patch["metadata"]["resourceVersion"], "12345");
        assert_eq!(patch["status"]["joke"], "joke-A");
        assert_eq!(patch["status"]["observedGeneration"], 2);
    }

    #[test]
    fn test_status_patch_without_resource_version() {
        let patch = status_patch(None, &ChuckNorrisStatus::default());
        assert!(patch.get("metadata").is_none());
        assert!(patch["status"]["conditions"].as_array().unwrap().is_empty());
    }

    #[test]
    fn test_conflict_message() {
        let err = StoreError::Conflict {
            key: "default/dev-joke".to_string(),
            message: "the object has been modified".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "resource default/dev-joke was modified since it was loaded: the object has been modified"
        );
    }
}
