//! Portal facade
//!
//! Wires the persistence adapter and services from one `PortalConfig`. The
//! view layer holds a `Portal` and calls services through it; nothing else
//! in the crate knows how the pieces are assembled.

use std::sync::Arc;
use std::time::Duration;

use crate::config::PortalConfig;
use crate::error::PortalError;
use crate::export::JsonFileExporter;
use crate::notification::{LogNotifier, Notifier, WebhookNotifier};
use crate::scheduler::{BackupScheduler, SchedulerHandle};
use crate::services::activity::ActivityLog;
use crate::services::backup::BackupService;
use crate::services::brand_tests::BrandTestService;
use crate::services::content::ContentService;
use crate::services::metrics::MetricsService;
use crate::services::search::SearchService;
use crate::storage::{FailoverStore, LocalStore, PersistenceAdapter, RemoteStore};

pub struct Portal {
    pub config: PortalConfig,
    pub adapter: Arc<PersistenceAdapter>,
    pub activity: Arc<ActivityLog>,
    pub metrics: Arc<MetricsService>,
    pub content: Arc<ContentService>,
    pub search: Arc<SearchService>,
    pub brand_tests: Arc<BrandTestService>,
    pub backups: Arc<BackupService>,
    pub exporter: Arc<JsonFileExporter>,
    pub notifier: Arc<dyn Notifier>,
}

impl Portal {
    /// Open the portal: local store always, remote backend when configured.
    /// A remote that cannot be constructed degrades to local-only with a
    /// warning rather than failing startup.
    pub fn open(config: PortalConfig) -> Result<Self, PortalError> {
        let state_dir = config.state_dir()?;

        let local = Arc::new(
            LocalStore::open(&state_dir)
                .map_err(|e| PortalError::Backend(format!("could not open local store: {}", e)))?,
        );

        let remote: Option<Arc<dyn crate::storage::StorageBackend>> = match &config.remote {
            Some(remote_config) => match RemoteStore::new(remote_config) {
                Ok(store) => {
                    log::info!("Remote record store configured: {}", remote_config.url);
                    Some(Arc::new(store))
                }
                Err(e) => {
                    log::warn!("Remote store unavailable: {}. Running local-only.", e);
                    None
                }
            },
            None => None,
        };

        let adapter = Arc::new(PersistenceAdapter::new(FailoverStore::new(remote, local)));

        let notifier: Arc<dyn Notifier> = match &config.notification_webhook {
            Some(url) => Arc::new(WebhookNotifier::new(url.clone())),
            None => Arc::new(LogNotifier),
        };

        let activity = Arc::new(ActivityLog::new(adapter.clone(), config.activity_cap));
        let metrics = Arc::new(MetricsService::new(adapter.clone(), activity.clone()));
        let content = Arc::new(ContentService::new(adapter.clone(), metrics.clone()));
        let search = Arc::new(SearchService::new(adapter.clone(), config.search.clone()));
        let brand_tests = Arc::new(BrandTestService::new(adapter.clone(), metrics.clone()));
        let backups = Arc::new(BackupService::new(
            adapter.clone(),
            notifier.clone(),
            config.backups.clone(),
        ));
        let exporter = Arc::new(JsonFileExporter::new(
            adapter.clone(),
            state_dir.join("exports"),
        ));

        Ok(Self {
            config,
            adapter,
            activity,
            metrics,
            content,
            search,
            brand_tests,
            backups,
            exporter,
            notifier,
        })
    }

    /// Start the automatic backup loop for an owner. The caller keeps the
    /// handle; there is at most one scheduler per call.
    pub fn start_backup_scheduler(&self, owner: impl Into<String>) -> SchedulerHandle {
        let interval = Duration::from_secs(self.config.backups.interval_minutes * 60);
        BackupScheduler::new(self.backups.clone(), owner, interval).spawn()
    }
}
