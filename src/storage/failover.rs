//! Primary-then-secondary storage decorator
//!
//! Tries the remote backend first when one is configured. Any remote failure
//! is logged and absorbed; the caller is served from local instead and never
//! sees the error. Every successful remote write is mirrored into the local
//! store so local remains a valid fallback snapshot at all times. Each call
//! reports which backend served it.

use std::sync::Arc;

use super::{BackendKind, Served, StorageBackend, StorageError};

pub struct FailoverStore {
    remote: Option<Arc<dyn StorageBackend>>,
    local: Arc<dyn StorageBackend>,
}

impl FailoverStore {
    pub fn new(remote: Option<Arc<dyn StorageBackend>>, local: Arc<dyn StorageBackend>) -> Self {
        Self { remote, local }
    }

    /// A store with no remote configured; everything is served locally.
    pub fn local_only(local: Arc<dyn StorageBackend>) -> Self {
        Self {
            remote: None,
            local,
        }
    }

    pub fn has_remote(&self) -> bool {
        self.remote.is_some()
    }

    pub async fn get(
        &self,
        collection: &str,
        owner: &str,
    ) -> Result<Served<Option<String>>, StorageError> {
        if let Some(remote) = &self.remote {
            match remote.get(collection, owner).await {
                Ok(value) => {
                    return Ok(Served {
                        value,
                        served_by: BackendKind::Remote,
                    })
                }
                Err(e) => {
                    log::warn!(
                        "Remote get failed for {}/{}: {}; serving from local",
                        collection,
                        owner,
                        e
                    );
                }
            }
        }

        let value = self.local.get(collection, owner).await?;
        Ok(Served {
            value,
            served_by: BackendKind::Local,
        })
    }

    pub async fn put(
        &self,
        collection: &str,
        owner: &str,
        payload: &str,
    ) -> Result<Served<()>, StorageError> {
        if let Some(remote) = &self.remote {
            match remote.put(collection, owner, payload).await {
                Ok(()) => {
                    // Mirror into local so the fallback snapshot stays current.
                    if let Err(e) = self.local.put(collection, owner, payload).await {
                        log::warn!(
                            "Local mirror write failed for {}/{}: {}",
                            collection,
                            owner,
                            e
                        );
                    }
                    return Ok(Served {
                        value: (),
                        served_by: BackendKind::Remote,
                    });
                }
                Err(e) => {
                    log::warn!(
                        "Remote put failed for {}/{}: {}; writing to local only",
                        collection,
                        owner,
                        e
                    );
                }
            }
        }

        self.local.put(collection, owner, payload).await?;
        Ok(Served {
            value: (),
            served_by: BackendKind::Local,
        })
    }

    pub async fn delete(
        &self,
        collection: &str,
        owner: &str,
    ) -> Result<Served<()>, StorageError> {
        let mut served_by = BackendKind::Local;
        if let Some(remote) = &self.remote {
            match remote.delete(collection, owner).await {
                Ok(()) => served_by = BackendKind::Remote,
                Err(e) => {
                    log::warn!("Remote delete failed for {}/{}: {}", collection, owner, e)
                }
            }
        }

        // The local copy goes away regardless, mirroring the write path.
        self.local.delete(collection, owner).await?;
        Ok(Served {
            value: (),
            served_by,
        })
    }

    /// Clear an owner's data across both backends. A remote failure is
    /// logged; the local clear must succeed for the call to succeed.
    pub async fn clear_owner(&self, owner: &str) -> Result<Served<()>, StorageError> {
        let mut served_by = BackendKind::Local;
        if let Some(remote) = &self.remote {
            match remote.clear_owner(owner).await {
                Ok(()) => served_by = BackendKind::Remote,
                Err(e) => log::warn!("Remote clear failed for owner {}: {}", owner, e),
            }
        }

        self.local.clear_owner(owner).await?;
        Ok(Served {
            value: (),
            served_by,
        })
    }

    pub async fn clear_all(&self) -> Result<Served<()>, StorageError> {
        let mut served_by = BackendKind::Local;
        if let Some(remote) = &self.remote {
            match remote.clear_all().await {
                Ok(()) => served_by = BackendKind::Remote,
                Err(e) => log::warn!("Remote clear-all failed: {}", e),
            }
        }

        self.local.clear_all().await?;
        Ok(Served {
            value: (),
            served_by,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::super::test_support::MemoryStore;
    use super::*;

    fn pair() -> (FailoverStore, Arc<MemoryStore>, Arc<MemoryStore>) {
        let remote = Arc::new(MemoryStore::new_remote());
        let local = Arc::new(MemoryStore::new());
        let store = FailoverStore::new(Some(remote.clone()), local.clone());
        (store, remote, local)
    }

    #[tokio::test]
    async fn test_writes_mirror_into_local() {
        let (store, remote, local) = pair();
        let served = store.put("c", "o", "v").await.expect("put");
        assert_eq!(served.served_by, BackendKind::Remote);

        assert_eq!(remote.raw_get("c", "o").as_deref(), Some("v"));
        assert_eq!(local.raw_get("c", "o").as_deref(), Some("v"));
    }

    #[tokio::test]
    async fn test_remote_failure_falls_back_silently() {
        let (store, remote, local) = pair();
        remote.fail_everything(true);

        let served = store.put("c", "o", "v").await.expect("put");
        assert_eq!(served.served_by, BackendKind::Local);
        assert_eq!(local.raw_get("c", "o").as_deref(), Some("v"));

        let got = store.get("c", "o").await.expect("get");
        assert_eq!(got.served_by, BackendKind::Local);
        assert_eq!(got.value.as_deref(), Some("v"));
    }

    #[tokio::test]
    async fn test_reads_prefer_remote() {
        let (store, remote, local) = pair();
        remote.raw_put("c", "o", "remote-value");
        local.raw_put("c", "o", "stale-local-value");

        let got = store.get("c", "o").await.expect("get");
        assert_eq!(got.served_by, BackendKind::Remote);
        assert_eq!(got.value.as_deref(), Some("remote-value"));
    }

    #[tokio::test]
    async fn test_local_snapshot_survives_remote_outage() {
        let (store, remote, _local) = pair();
        store.put("c", "o", "v1").await.expect("put");

        // Remote dies after a successful mirrored write.
        remote.fail_everything(true);

        let got = store.get("c", "o").await.expect("get");
        assert_eq!(got.served_by, BackendKind::Local);
        assert_eq!(got.value.as_deref(), Some("v1"));
    }

    #[tokio::test]
    async fn test_clear_owner_reaches_both_backends() {
        let (store, remote, local) = pair();
        store.put("c", "alpha", "v").await.expect("put");
        store.put("c", "beta", "v").await.expect("put");

        store.clear_owner("alpha").await.expect("clear");

        assert!(remote.raw_get("c", "alpha").is_none());
        assert!(local.raw_get("c", "alpha").is_none());
        assert!(remote.raw_get("c", "beta").is_some());
    }
}
