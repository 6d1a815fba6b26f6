//! Story and media record CRUD
//!
//! Records mutate only through explicit edit calls; there is no background
//! rewriting. Creation and deletion drive the `contentItems` counter through
//! the metrics service, which is also what puts them on the activity feed.

use std::sync::Arc;

use crate::error::{FieldError, PortalError};
use crate::services::metrics::MetricsService;
use crate::storage::PersistenceAdapter;
use crate::types::{ContentMetadata, ContentRecord, ContentType, Metric};
use crate::util;

/// Fields supplied by the staff editor when creating a record.
#[derive(Debug, Clone)]
pub struct ContentDraft {
    pub content_type: ContentType,
    pub title: String,
    pub content: String,
    pub summary: Option<String>,
    pub metadata: ContentMetadata,
}

impl ContentDraft {
    pub fn story(title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            content_type: ContentType::Story,
            title: title.into(),
            content: content.into(),
            summary: None,
            metadata: ContentMetadata::default(),
        }
    }

    pub fn media(title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            content_type: ContentType::Media,
            ..Self::story(title, content)
        }
    }
}

pub struct ContentService {
    adapter: Arc<PersistenceAdapter>,
    metrics: Arc<MetricsService>,
}

impl ContentService {
    pub fn new(adapter: Arc<PersistenceAdapter>, metrics: Arc<MetricsService>) -> Self {
        Self { adapter, metrics }
    }

    /// Create a record. Validation happens before any side effect.
    pub async fn create(
        &self,
        owner: &str,
        draft: ContentDraft,
    ) -> Result<ContentRecord, PortalError> {
        validate_draft(&draft)?;

        let mut metadata = draft.metadata;
        if metadata.date.is_none() {
            metadata.date = Some(util::now());
        }
        if metadata.status.is_none() {
            metadata.status = Some("draft".to_string());
        }

        let record = ContentRecord {
            id: util::new_id(),
            content_type: draft.content_type,
            title: draft.title,
            content: draft.content,
            summary: draft.summary,
            metadata,
        };

        let collection = record.content_type.collection();
        let mut records: Vec<ContentRecord> = self.adapter.get_list(collection, owner).await;
        records.push(record.clone());

        if !self.adapter.save(collection, &records, owner).await {
            return Err(PortalError::Backend(format!(
                "could not persist {} record",
                record.content_type.label()
            )));
        }

        self.metrics.increment(owner, Metric::ContentItems).await;

        Ok(record)
    }

    /// Replace an existing record wholesale (explicit edit).
    pub async fn update(
        &self,
        owner: &str,
        record: ContentRecord,
    ) -> Result<ContentRecord, PortalError> {
        if record.title.trim().is_empty() {
            return Err(PortalError::invalid("title", "must not be empty"));
        }

        let collection = record.content_type.collection();
        let mut records: Vec<ContentRecord> = self.adapter.get_list(collection, owner).await;
        let slot = records
            .iter_mut()
            .find(|r| r.id == record.id)
            .ok_or_else(|| PortalError::NotFound(format!("content record {}", record.id)))?;
        *slot = record.clone();

        if !self.adapter.save(collection, &records, owner).await {
            return Err(PortalError::Backend("could not persist update".to_string()));
        }

        Ok(record)
    }

    pub async fn delete(
        &self,
        owner: &str,
        content_type: ContentType,
        id: &str,
    ) -> Result<(), PortalError> {
        let collection = content_type.collection();
        let mut records: Vec<ContentRecord> = self.adapter.get_list(collection, owner).await;
        let before = records.len();
        records.retain(|r| r.id != id);
        if records.len() == before {
            return Err(PortalError::NotFound(format!("content record {}", id)));
        }

        if !self.adapter.save(collection, &records, owner).await {
            return Err(PortalError::Backend("could not persist deletion".to_string()));
        }

        self.metrics.decrement(owner, Metric::ContentItems).await;

        Ok(())
    }

    pub async fn get(
        &self,
        owner: &str,
        content_type: ContentType,
        id: &str,
    ) -> Option<ContentRecord> {
        self.list(owner, content_type)
            .await
            .into_iter()
            .find(|r| r.id == id)
    }

    pub async fn list(&self, owner: &str, content_type: ContentType) -> Vec<ContentRecord> {
        self.adapter
            .get_list(content_type.collection(), owner)
            .await
    }
}

fn validate_draft(draft: &ContentDraft) -> Result<(), PortalError> {
    let mut errors = Vec::new();

    if draft.title.trim().is_empty() {
        errors.push(FieldError::new("title", "must not be empty"));
    }
    if !matches!(draft.content_type, ContentType::Story | ContentType::Media) {
        errors.push(FieldError::new(
            "contentType",
            "only stories and media are created here",
        ));
    }
    if let Some(score) = draft.metadata.brand_score {
        if !(0.0..=100.0).contains(&score) {
            errors.push(FieldError::new("brandScore", "must be between 0 and 100"));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(PortalError::Validation(errors))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::activity::{ActivityLog, DEFAULT_ACTIVITY_CAP};
    use crate::storage::test_support::memory_adapter;

    fn service() -> (ContentService, Arc<MetricsService>) {
        let (adapter, _) = memory_adapter();
        let activity = Arc::new(ActivityLog::new(adapter.clone(), DEFAULT_ACTIVITY_CAP));
        let metrics = Arc::new(MetricsService::new(adapter.clone(), activity));
        (ContentService::new(adapter, metrics.clone()), metrics)
    }

    #[tokio::test]
    async fn test_create_assigns_id_and_defaults() {
        let (content, _) = service();
        let record = content
            .create("staff-1", ContentDraft::story("Pathways out", "Full story text"))
            .await
            .expect("create");

        assert!(!record.id.is_empty());
        assert!(record.metadata.date.is_some());
        assert_eq!(record.metadata.status.as_deref(), Some("draft"));

        let listed = content.list("staff-1", ContentType::Story).await;
        assert_eq!(listed.len(), 1);
    }

    #[tokio::test]
    async fn test_create_bumps_content_items() {
        let (content, metrics) = service();
        content
            .create("staff-1", ContentDraft::story("A", "body"))
            .await
            .expect("create");
        content
            .create("staff-1", ContentDraft::media("B", "clip"))
            .await
            .expect("create");

        assert_eq!(metrics.get("staff-1").await.content_items, 2);
    }

    #[tokio::test]
    async fn test_empty_title_is_field_level_error() {
        let (content, _) = service();
        let err = content
            .create("staff-1", ContentDraft::story("  ", "body"))
            .await
            .unwrap_err();

        match err {
            PortalError::Validation(fields) => {
                assert_eq!(fields[0].field, "title");
            }
            other => panic!("expected validation error, got {:?}", other),
        }

        // Nothing was written.
        assert!(content.list("staff-1", ContentType::Story).await.is_empty());
    }

    #[tokio::test]
    async fn test_brand_score_out_of_range_rejected() {
        let (content, _) = service();
        let mut draft = ContentDraft::story("Scored", "body");
        draft.metadata.brand_score = Some(140.0);

        let err = content.create("staff-1", draft).await.unwrap_err();
        assert!(err.is_validation());
    }

    #[tokio::test]
    async fn test_update_replaces_record() {
        let (content, _) = service();
        let mut record = content
            .create("staff-1", ContentDraft::story("Original", "body"))
            .await
            .expect("create");

        record.title = "Edited".to_string();
        content.update("staff-1", record.clone()).await.expect("update");

        let loaded = content
            .get("staff-1", ContentType::Story, &record.id)
            .await
            .expect("get");
        assert_eq!(loaded.title, "Edited");
    }

    #[tokio::test]
    async fn test_update_unknown_record_is_not_found() {
        let (content, _) = service();
        let record = ContentRecord {
            id: "missing".to_string(),
            content_type: ContentType::Story,
            title: "X".to_string(),
            content: String::new(),
            summary: None,
            metadata: ContentMetadata::default(),
        };
        let err = content.update("staff-1", record).await.unwrap_err();
        assert!(matches!(err, PortalError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_delete_removes_and_decrements() {
        let (content, metrics) = service();
        let record = content
            .create("staff-1", ContentDraft::story("Gone soon", "body"))
            .await
            .expect("create");

        content
            .delete("staff-1", ContentType::Story, &record.id)
            .await
            .expect("delete");

        assert!(content.list("staff-1", ContentType::Story).await.is_empty());
        assert_eq!(metrics.get("staff-1").await.content_items, 0);
    }
}
