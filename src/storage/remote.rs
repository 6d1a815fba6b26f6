//! Remote record service client
//!
//! Speaks to a PostgREST-style relational service: one `portal_records`
//! table with `collection`, `owner_id`, `payload`, and `updated_at` columns.
//! In-memory fields are camelCase; the wire columns are snake_case; the
//! mapping is fixed here and must not drift, since the local store mirrors
//! the same payload strings.

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::config::RemoteConfig;

use super::{BackendKind, StorageBackend, StorageError};

const RECORDS_TABLE: &str = "portal_records";

#[derive(Debug, Serialize)]
struct RecordRow<'a> {
    collection: &'a str,
    owner_id: &'a str,
    payload: &'a str,
    updated_at: String,
}

#[derive(Debug, Deserialize)]
struct PayloadRow {
    payload: String,
}

pub struct RemoteStore {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl RemoteStore {
    pub fn new(config: &RemoteConfig) -> Result<Self, StorageError> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url: config.url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
        })
    }

    fn records_url(&self) -> String {
        format!("{}/rest/v1/{}", self.base_url, RECORDS_TABLE)
    }

    fn authed(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        req.header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
    }

    async fn check_status(resp: reqwest::Response) -> Result<reqwest::Response, StorageError> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        let message = resp.text().await.unwrap_or_default();
        Err(StorageError::Api {
            status: status.as_u16(),
            message,
        })
    }
}

#[async_trait]
impl StorageBackend for RemoteStore {
    fn kind(&self) -> BackendKind {
        BackendKind::Remote
    }

    async fn get(&self, collection: &str, owner: &str) -> Result<Option<String>, StorageError> {
        let req = self
            .client
            .get(self.records_url())
            .query(&[
                ("collection", format!("eq.{}", collection)),
                ("owner_id", format!("eq.{}", owner)),
                ("select", "payload".to_string()),
                ("limit", "1".to_string()),
            ]);

        let resp = Self::check_status(self.authed(req).send().await?).await?;
        let mut rows: Vec<PayloadRow> = resp.json().await?;
        Ok(rows.pop().map(|r| r.payload))
    }

    async fn put(
        &self,
        collection: &str,
        owner: &str,
        payload: &str,
    ) -> Result<(), StorageError> {
        let row = RecordRow {
            collection,
            owner_id: owner,
            payload,
            updated_at: Utc::now().to_rfc3339(),
        };

        let req = self
            .client
            .post(self.records_url())
            .header("Prefer", "resolution=merge-duplicates,return=minimal")
            .json(&row);

        Self::check_status(self.authed(req).send().await?).await?;
        Ok(())
    }

    async fn delete(&self, collection: &str, owner: &str) -> Result<(), StorageError> {
        let req = self.client.delete(self.records_url()).query(&[
            ("collection", format!("eq.{}", collection)),
            ("owner_id", format!("eq.{}", owner)),
        ]);

        Self::check_status(self.authed(req).send().await?).await?;
        Ok(())
    }

    async fn clear_owner(&self, owner: &str) -> Result<(), StorageError> {
        let req = self
            .client
            .delete(self.records_url())
            .query(&[("owner_id", format!("eq.{}", owner))]);

        Self::check_status(self.authed(req).send().await?).await?;
        Ok(())
    }

    async fn clear_all(&self) -> Result<(), StorageError> {
        // PostgREST requires a filter on DELETE; match every non-null key.
        let req = self
            .client
            .delete(self.records_url())
            .query(&[("owner_id", "not.is.null".to_string())]);

        Self::check_status(self.authed(req).send().await?).await?;
        Ok(())
    }
}
