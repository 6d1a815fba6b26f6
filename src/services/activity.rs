//! Append-only activity feed
//!
//! Every dashboard-visible event lands here. The feed is capped: `record`
//! prepends the new item and truncates to the retention count before
//! persisting, so entries beyond the cap are gone for good. The feed is a
//! ticker, not an archive.

use std::sync::Arc;

use crate::storage::PersistenceAdapter;
use crate::types::{ActivityItem, ActivityType};
use crate::util;

pub const DEFAULT_ACTIVITY_CAP: usize = 50;

const COLLECTION: &str = "activities";

/// Owner id used when no staff member is signed in.
pub const ANONYMOUS_OWNER: &str = "anonymous";

pub struct ActivityLog {
    adapter: Arc<PersistenceAdapter>,
    cap: usize,
}

impl ActivityLog {
    pub fn new(adapter: Arc<PersistenceAdapter>, cap: usize) -> Self {
        Self { adapter, cap }
    }

    /// Record one activity item. The write is best-effort: the item is
    /// returned to the caller even when persistence fails (already logged by
    /// the adapter).
    pub async fn record(
        &self,
        activity_type: ActivityType,
        message: impl Into<String>,
        owner: &str,
    ) -> ActivityItem {
        let item = ActivityItem {
            id: util::new_id(),
            activity_type,
            message: message.into(),
            timestamp: util::now(),
            user_id: (owner != ANONYMOUS_OWNER).then(|| owner.to_string()),
        };

        let mut items: Vec<ActivityItem> = self.adapter.get_list(COLLECTION, owner).await;
        items.insert(0, item.clone());
        items.truncate(self.cap);

        let _ = self.adapter.save(COLLECTION, &items, owner).await;

        item
    }

    /// Newest-first activity feed. Absent data yields an empty list; this
    /// never errors.
    pub async fn list(&self, owner: &str, limit: usize) -> Vec<ActivityItem> {
        let items: Vec<ActivityItem> = self.adapter.get_list(COLLECTION, owner).await;
        items.into_iter().take(limit).collect()
    }

    pub fn cap(&self) -> usize {
        self.cap
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::test_support::memory_adapter;

    fn log_with_cap(cap: usize) -> (ActivityLog, Arc<crate::storage::PersistenceAdapter>) {
        let (adapter, _) = memory_adapter();
        (ActivityLog::new(adapter.clone(), cap), adapter)
    }

    #[tokio::test]
    async fn test_record_returns_item_and_persists() {
        let (log, _) = log_with_cap(DEFAULT_ACTIVITY_CAP);
        let item = log
            .record(ActivityType::Content, "New story added", "staff-1")
            .await;

        assert_eq!(item.message, "New story added");
        assert_eq!(item.user_id.as_deref(), Some("staff-1"));

        let listed = log.list("staff-1", 50).await;
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, item.id);
    }

    #[tokio::test]
    async fn test_anonymous_owner_has_no_user_id() {
        let (log, _) = log_with_cap(DEFAULT_ACTIVITY_CAP);
        let item = log
            .record(ActivityType::System, "Nightly backup", ANONYMOUS_OWNER)
            .await;
        assert!(item.user_id.is_none());
    }

    #[tokio::test]
    async fn test_list_on_empty_feed_is_empty() {
        let (log, _) = log_with_cap(DEFAULT_ACTIVITY_CAP);
        assert!(log.list("nobody", 50).await.is_empty());
    }

    #[tokio::test]
    async fn test_truncation_keeps_newest_fifty() {
        let (log, _) = log_with_cap(DEFAULT_ACTIVITY_CAP);

        for i in 0..60 {
            log.record(ActivityType::Content, format!("event {}", i), "staff-1")
                .await;
        }

        let items = log.list("staff-1", 100).await;
        assert_eq!(items.len(), 50);

        // Newest first: the last write is at the head, the first ten writes
        // have been truncated away.
        assert_eq!(items[0].message, "event 59");
        assert_eq!(items[49].message, "event 10");
        for pair in items.windows(2) {
            assert!(pair[0].timestamp >= pair[1].timestamp);
        }
    }

    #[tokio::test]
    async fn test_list_respects_limit() {
        let (log, _) = log_with_cap(DEFAULT_ACTIVITY_CAP);
        for i in 0..10 {
            log.record(ActivityType::Brand, format!("event {}", i), "staff-1")
                .await;
        }
        assert_eq!(log.list("staff-1", 3).await.len(), 3);
    }
}
