//! Pluggable record storage
//!
//! Records are JSON strings keyed by `(collection, owner_id)`. Two backends
//! implement the same trait (a remote relational record service and a local
//! SQLite store), composed by `FailoverStore`, which tries the remote first
//! and falls back to local without surfacing the error. `PersistenceAdapter`
//! is the typed serde layer the services talk to: reads absorb failures into
//! `None`, writes report plain success booleans, and `clear` is the one
//! privileged operation.

mod failover;
mod local;
mod remote;

pub use failover::FailoverStore;
pub use local::LocalStore;
pub use remote::RemoteStore;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

use crate::error::PortalError;
use crate::types::Role;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("HTTP: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Remote API error {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Backend unavailable: {0}")]
    Unavailable(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Which backend served a call. Surfaced for observability instead of being
/// hidden behind a mode flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    Remote,
    Local,
}

impl std::fmt::Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackendKind::Remote => write!(f, "remote"),
            BackendKind::Local => write!(f, "local"),
        }
    }
}

/// A call result annotated with the backend that produced it.
#[derive(Debug, Clone)]
pub struct Served<T> {
    pub value: T,
    pub served_by: BackendKind,
}

/// Uniform key-value record storage. Payloads are JSON strings; the typed
/// layer above handles (de)serialization.
#[async_trait]
pub trait StorageBackend: Send + Sync {
    fn kind(&self) -> BackendKind;

    async fn get(&self, collection: &str, owner: &str) -> Result<Option<String>, StorageError>;

    async fn put(&self, collection: &str, owner: &str, payload: &str)
        -> Result<(), StorageError>;

    async fn delete(&self, collection: &str, owner: &str) -> Result<(), StorageError>;

    /// Remove every record belonging to an owner.
    async fn clear_owner(&self, owner: &str) -> Result<(), StorageError>;

    /// Remove every record in the store.
    async fn clear_all(&self) -> Result<(), StorageError>;
}

/// Typed persistence layer the services operate against.
///
/// Reads never propagate backend errors; they are logged and absorbed into
/// `None`, so callers see "no data" rather than an exception. Writes return
/// a success flag. `clear` is admin-gated and reports authorization failures
/// distinctly.
pub struct PersistenceAdapter {
    store: FailoverStore,
    last_served: parking_lot::Mutex<BackendKind>,
}

impl PersistenceAdapter {
    pub fn new(store: FailoverStore) -> Self {
        Self {
            store,
            last_served: parking_lot::Mutex::new(BackendKind::Local),
        }
    }

    /// Backend that served the most recent call, for dashboards and logs.
    pub fn last_served(&self) -> BackendKind {
        *self.last_served.lock()
    }

    fn record_served(&self, kind: BackendKind) {
        *self.last_served.lock() = kind;
    }

    /// Fetch and deserialize a record. Absent data, backend failure, and a
    /// corrupt payload all yield `None`; the latter two log a warning.
    pub async fn get<T: DeserializeOwned>(&self, collection: &str, owner: &str) -> Option<T> {
        match self.store.get(collection, owner).await {
            Ok(served) => {
                self.record_served(served.served_by);
                let raw = served.value?;
                match serde_json::from_str(&raw) {
                    Ok(value) => Some(value),
                    Err(e) => {
                        log::warn!("Corrupt payload in {}/{}: {}", collection, owner, e);
                        None
                    }
                }
            }
            Err(e) => {
                log::warn!("Storage get failed for {}/{}: {}", collection, owner, e);
                None
            }
        }
    }

    /// Fetch a list-valued collection, defaulting to empty.
    pub async fn get_list<T: DeserializeOwned>(&self, collection: &str, owner: &str) -> Vec<T> {
        self.get(collection, owner).await.unwrap_or_default()
    }

    /// Serialize and store a record. Returns false on failure (already
    /// logged) rather than propagating.
    pub async fn save<T: Serialize + ?Sized>(
        &self,
        collection: &str,
        record: &T,
        owner: &str,
    ) -> bool {
        let payload = match serde_json::to_string(record) {
            Ok(p) => p,
            Err(e) => {
                log::error!("Serialize failed for {}/{}: {}", collection, owner, e);
                return false;
            }
        };

        match self.store.put(collection, owner, &payload).await {
            Ok(served) => {
                self.record_served(served.served_by);
                true
            }
            Err(e) => {
                log::error!("Storage save failed for {}/{}: {}", collection, owner, e);
                false
            }
        }
    }

    /// Append a record to a list-valued collection (read-modify-write; last
    /// write wins, per the portal's single-writer model).
    pub async fn append<T>(&self, collection: &str, record: &T, owner: &str) -> bool
    where
        T: Serialize + DeserializeOwned + Clone,
    {
        let mut list: Vec<T> = self.get_list(collection, owner).await;
        list.push(record.clone());
        self.save(collection, &list, owner).await
    }

    pub async fn delete(&self, collection: &str, owner: &str) -> bool {
        match self.store.delete(collection, owner).await {
            Ok(served) => {
                self.record_served(served.served_by);
                true
            }
            Err(e) => {
                log::error!("Storage delete failed for {}/{}: {}", collection, owner, e);
                false
            }
        }
    }

    /// Remove stored data across both backends. Admin-only: other roles get
    /// an authorization error before anything is touched.
    pub async fn clear(&self, owner: Option<&str>, role: Role) -> Result<bool, PortalError> {
        if !role.can_clear_data() {
            return Err(PortalError::Authorization(
                "clearing stored data requires the admin role".to_string(),
            ));
        }

        let result = match owner {
            Some(owner) => self.store.clear_owner(owner).await,
            None => self.store.clear_all().await,
        };

        match result {
            Ok(served) => {
                self.record_served(served.served_by);
                Ok(true)
            }
            Err(e) => {
                log::error!("Storage clear failed: {}", e);
                Ok(false)
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    //! In-memory backend with fault injection, shared by service tests.

    use std::collections::{HashMap, HashSet};
    use std::sync::Arc;

    use async_trait::async_trait;
    use parking_lot::Mutex;

    use super::{
        BackendKind, FailoverStore, PersistenceAdapter, StorageBackend, StorageError,
    };

    pub struct MemoryStore {
        records: Mutex<HashMap<(String, String), String>>,
        /// Collection names (or prefixes) whose reads and writes fail with a
        /// synthetic error.
        fail_collections: Mutex<HashSet<String>>,
        /// When set, every call fails. Simulates a dead backend.
        fail_everything: Mutex<bool>,
        kind: BackendKind,
    }

    impl MemoryStore {
        fn with_kind(kind: BackendKind) -> Self {
            Self {
                records: Mutex::new(HashMap::new()),
                fail_collections: Mutex::new(HashSet::new()),
                fail_everything: Mutex::new(false),
                kind,
            }
        }

        pub fn new() -> Self {
            Self::with_kind(BackendKind::Local)
        }

        pub fn new_remote() -> Self {
            Self::with_kind(BackendKind::Remote)
        }

        pub fn fail_collection(&self, collection: &str) {
            self.fail_collections.lock().insert(collection.to_string());
        }

        pub fn fail_everything(&self, fail: bool) {
            *self.fail_everything.lock() = fail;
        }

        pub fn raw_get(&self, collection: &str, owner: &str) -> Option<String> {
            self.records
                .lock()
                .get(&(collection.to_string(), owner.to_string()))
                .cloned()
        }

        pub fn raw_put(&self, collection: &str, owner: &str, payload: &str) {
            self.records.lock().insert(
                (collection.to_string(), owner.to_string()),
                payload.to_string(),
            );
        }

        pub fn len(&self) -> usize {
            self.records.lock().len()
        }

        fn check(&self, collection: &str) -> Result<(), StorageError> {
            if *self.fail_everything.lock() {
                return Err(StorageError::Unavailable("backend down".to_string()));
            }
            if self
                .fail_collections
                .lock()
                .iter()
                .any(|prefix| collection.starts_with(prefix.as_str()))
            {
                return Err(StorageError::Unavailable(format!(
                    "collection {} unavailable",
                    collection
                )));
            }
            Ok(())
        }
    }

    #[async_trait]
    impl StorageBackend for MemoryStore {
        fn kind(&self) -> BackendKind {
            self.kind
        }

        async fn get(
            &self,
            collection: &str,
            owner: &str,
        ) -> Result<Option<String>, StorageError> {
            self.check(collection)?;
            Ok(self.raw_get(collection, owner))
        }

        async fn put(
            &self,
            collection: &str,
            owner: &str,
            payload: &str,
        ) -> Result<(), StorageError> {
            self.check(collection)?;
            self.raw_put(collection, owner, payload);
            Ok(())
        }

        async fn delete(&self, collection: &str, owner: &str) -> Result<(), StorageError> {
            self.check(collection)?;
            self.records
                .lock()
                .remove(&(collection.to_string(), owner.to_string()));
            Ok(())
        }

        async fn clear_owner(&self, owner: &str) -> Result<(), StorageError> {
            if *self.fail_everything.lock() {
                return Err(StorageError::Unavailable("backend down".to_string()));
            }
            self.records.lock().retain(|(_, o), _| o != owner);
            Ok(())
        }

        async fn clear_all(&self) -> Result<(), StorageError> {
            if *self.fail_everything.lock() {
                return Err(StorageError::Unavailable("backend down".to_string()));
            }
            self.records.lock().clear();
            Ok(())
        }
    }

    /// Adapter over a single in-memory store. Returns the store handle so
    /// tests can inject faults and inspect raw payloads.
    pub fn memory_adapter() -> (Arc<PersistenceAdapter>, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        let adapter = Arc::new(PersistenceAdapter::new(FailoverStore::local_only(
            store.clone(),
        )));
        (adapter, store)
    }

    /// Adapter over a remote + local pair, for failover tests.
    pub fn failover_adapter() -> (Arc<PersistenceAdapter>, Arc<MemoryStore>, Arc<MemoryStore>)
    {
        let remote = Arc::new(MemoryStore::new_remote());
        let local = Arc::new(MemoryStore::new());
        let adapter = Arc::new(PersistenceAdapter::new(FailoverStore::new(
            Some(remote.clone()),
            local.clone(),
        )));
        (adapter, remote, local)
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::memory_adapter;
    use super::*;

    #[tokio::test]
    async fn test_get_absorbs_missing_data() {
        let (adapter, _) = memory_adapter();
        let value: Option<serde_json::Value> = adapter.get("content_stories", "anon").await;
        assert!(value.is_none());
    }

    #[tokio::test]
    async fn test_save_then_get_round_trips() {
        let (adapter, _) = memory_adapter();
        let record = serde_json::json!({"id": "s-1", "title": "Pathways"});
        assert!(adapter.save("content_stories", &record, "staff-1").await);

        let loaded: Option<serde_json::Value> =
            adapter.get("content_stories", "staff-1").await;
        assert_eq!(loaded, Some(record));
    }

    #[tokio::test]
    async fn test_get_absorbs_corrupt_payload() {
        let (adapter, store) = memory_adapter();
        store.raw_put("content_stories", "anon", "not json {");
        let value: Option<serde_json::Value> = adapter.get("content_stories", "anon").await;
        assert!(value.is_none());
    }

    #[tokio::test]
    async fn test_append_builds_a_list() {
        let (adapter, _) = memory_adapter();
        assert!(adapter.append("activities", &"first".to_string(), "anon").await);
        assert!(adapter.append("activities", &"second".to_string(), "anon").await);

        let list: Vec<String> = adapter.get_list("activities", "anon").await;
        assert_eq!(list, vec!["first".to_string(), "second".to_string()]);
    }

    #[tokio::test]
    async fn test_clear_requires_admin() {
        let (adapter, store) = memory_adapter();
        adapter.save("activities", &vec!["x"], "anon").await;

        let err = adapter.clear(None, Role::Staff).await.unwrap_err();
        assert!(err.is_authorization());

        // Data untouched after the denied call.
        let list: Vec<String> = adapter.get_list("activities", "anon").await;
        assert_eq!(list.len(), 1);

        assert!(adapter.clear(None, Role::Admin).await.expect("clear"));
        let list: Vec<String> = adapter.get_list("activities", "anon").await;
        assert!(list.is_empty());
        assert_eq!(store.len(), 0);
    }

    #[tokio::test]
    async fn test_last_served_tracks_the_failover() {
        let (adapter, remote, local) = super::test_support::failover_adapter();

        adapter.save("content_stories", &vec!["v"], "anon").await;
        assert_eq!(adapter.last_served(), BackendKind::Remote);
        // Mirrored write is readable from the local snapshot.
        assert!(local.raw_get("content_stories", "anon").is_some());

        remote.fail_everything(true);
        let _: Option<Vec<String>> = adapter.get("content_stories", "anon").await;
        assert_eq!(adapter.last_served(), BackendKind::Local);
    }

    #[tokio::test]
    async fn test_clear_owner_leaves_other_owners() {
        let (adapter, _) = memory_adapter();
        adapter.save("activities", &vec!["a"], "alpha").await;
        adapter.save("activities", &vec!["b"], "beta").await;

        assert!(adapter.clear(Some("alpha"), Role::Admin).await.expect("clear"));

        let alpha: Vec<String> = adapter.get_list("activities", "alpha").await;
        let beta: Vec<String> = adapter.get_list("activities", "beta").await;
        assert!(alpha.is_empty());
        assert_eq!(beta.len(), 1);
    }
}
