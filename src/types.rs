use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// =============================================================================
// Content records
// =============================================================================

/// Content categories indexed by the portal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ContentType {
    Story,
    Media,
    BrandTest,
    Activity,
}

impl ContentType {
    /// Storage collection that holds records of this type.
    pub fn collection(&self) -> &'static str {
        match self {
            ContentType::Story => "content_stories",
            ContentType::Media => "content_media",
            ContentType::BrandTest => "brand_tests",
            ContentType::Activity => "activities",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ContentType::Story => "story",
            ContentType::Media => "media",
            ContentType::BrandTest => "brandTest",
            ContentType::Activity => "activity",
        }
    }
}

/// Structured metadata carried by every content record.
///
/// All fields are optional: imported records frequently arrive with only a
/// title and body, and the search filters treat an absent field as
/// non-matching rather than erroring.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub brand_score: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

/// A unit of searchable portal content: a story, a media item, a brand-test
/// variant, or an activity entry projected into record form.
///
/// The relevance score is computed at query time and returned on `SearchHit`,
/// never persisted here.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentRecord {
    pub id: String,
    pub content_type: ContentType,
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default)]
    pub metadata: ContentMetadata,
}

// =============================================================================
// Activity log
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivityType {
    Content,
    Brand,
    Analytics,
    System,
}

impl ActivityType {
    pub fn label(&self) -> &'static str {
        match self {
            ActivityType::Content => "content",
            ActivityType::Brand => "brand",
            ActivityType::Analytics => "analytics",
            ActivityType::System => "system",
        }
    }
}

/// One entry in the append-only activity feed.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityItem {
    pub id: String,
    pub activity_type: ActivityType,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
}

// =============================================================================
// Dashboard metrics
// =============================================================================

/// Named dashboard counters. `BrandScore` is the only float-valued one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Metric {
    StoriesAnalyzed,
    BrandTestsActive,
    ContentItems,
    BrandScore,
}

impl Metric {
    /// Human-readable name used in activity messages.
    pub fn display_name(&self) -> &'static str {
        match self {
            Metric::StoriesAnalyzed => "Stories analyzed",
            Metric::BrandTestsActive => "Active brand tests",
            Metric::ContentItems => "Content items",
            Metric::BrandScore => "Brand score",
        }
    }

    /// Activity category a change to this counter is filed under.
    pub fn activity_type(&self) -> ActivityType {
        match self {
            Metric::StoriesAnalyzed | Metric::ContentItems => ActivityType::Content,
            Metric::BrandTestsActive | Metric::BrandScore => ActivityType::Brand,
        }
    }
}

/// Derived dashboard counters, one record per owner.
///
/// Integer counters are unbounded signed values: mismatched
/// increment/decrement sequences may drive them negative, and the dashboard
/// shows that drift rather than hiding it behind a clamp.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardMetrics {
    #[serde(default)]
    pub stories_analyzed: i64,
    #[serde(default)]
    pub brand_tests_active: i64,
    #[serde(default)]
    pub content_items: i64,
    #[serde(default)]
    pub brand_score: f64,
    pub last_updated: DateTime<Utc>,
}

impl Default for DashboardMetrics {
    fn default() -> Self {
        Self {
            stories_analyzed: 0,
            brand_tests_active: 0,
            content_items: 0,
            brand_score: 0.0,
            last_updated: Utc::now(),
        }
    }
}

// =============================================================================
// Search
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SortKey {
    #[default]
    Relevance,
    Date,
    Title,
    BrandScore,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

/// Structured filters applied as independent AND conditions over the scored
/// result set.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchFilters {
    /// Content types to scan. Empty means stories + media + brand tests;
    /// activities are only scanned when listed here explicitly.
    #[serde(default)]
    pub content_types: Vec<ContentType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_from: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_to: Option<DateTime<Utc>>,
    /// Author allow-list.
    #[serde(default)]
    pub authors: Vec<String>,
    /// Status allow-list.
    #[serde(default)]
    pub statuses: Vec<String>,
    /// A record passes when it shares at least one tag with this set.
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub brand_score_min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub brand_score_max: Option<f64>,
}

/// One search invocation. Defaults mirror the portal UI: descending
/// relevance, page size 50, no highlights or facets unless asked.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchRequest {
    #[serde(default)]
    pub query: String,
    #[serde(default)]
    pub filters: SearchFilters,
    #[serde(default)]
    pub sort_by: SortKey,
    #[serde(default)]
    pub sort_order: SortOrder,
    #[serde(default = "default_search_limit")]
    pub limit: usize,
    #[serde(default)]
    pub offset: usize,
    #[serde(default)]
    pub include_highlights: bool,
    #[serde(default)]
    pub include_facets: bool,
}

fn default_search_limit() -> usize {
    50
}

impl Default for SearchRequest {
    fn default() -> Self {
        Self {
            query: String::new(),
            filters: SearchFilters::default(),
            sort_by: SortKey::default(),
            sort_order: SortOrder::default(),
            limit: default_search_limit(),
            offset: 0,
            include_highlights: false,
            include_facets: false,
        }
    }
}

/// Highlighted fragments for one hit. Content is truncated to a window
/// around the first match.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchHighlights {
    pub title: String,
    pub content: String,
}

/// A scored, admitted record.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchHit {
    pub record: ContentRecord,
    pub score: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub highlights: Option<SearchHighlights>,
}

/// Value → count histograms over the filtered (pre-pagination) result set.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchFacets {
    pub content_types: HashMap<String, usize>,
    pub authors: HashMap<String, usize>,
    pub tags: HashMap<String, usize>,
    pub statuses: HashMap<String, usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResponse {
    pub results: Vec<SearchHit>,
    /// Total admitted+filtered count before pagination.
    pub total: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub facets: Option<SearchFacets>,
    #[serde(default)]
    pub suggestions: Vec<String>,
    pub search_time_ms: u64,
}

/// One entry in the persisted search history (capped at 100).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchHistoryEntry {
    pub query: String,
    pub timestamp: DateTime<Utc>,
    pub total: usize,
}

/// A user-saved search. Created explicitly; usage counters are bumped on
/// every execution; never auto-deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedSearch {
    pub id: String,
    pub name: String,
    pub query: String,
    #[serde(default)]
    pub filters: SearchFilters,
    pub owner: String,
    #[serde(default)]
    pub use_count: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_used: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Brand tests
// =============================================================================

/// Variant lifecycle: draft -> active -> completed. Linear, no reverse
/// transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VariantStatus {
    Draft,
    Active,
    Completed,
}

/// Tunables for a single test variant.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VariantConfig {
    /// Weight given to audience reach vs. content quality, 0.0–1.0.
    #[serde(default = "default_audience_weight")]
    pub audience_weight: f64,
    /// Days the variant is expected to run once started.
    #[serde(default = "default_duration_days")]
    pub duration_days: u32,
}

fn default_audience_weight() -> f64 {
    0.3
}

fn default_duration_days() -> u32 {
    14
}

impl Default for VariantConfig {
    fn default() -> Self {
        Self {
            audience_weight: default_audience_weight(),
            duration_days: default_duration_days(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestVariant {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub audiences: Vec<String>,
    #[serde(default)]
    pub config: VariantConfig,
    pub status: VariantStatus,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

/// Component scores produced by one analysis pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VariantMetrics {
    pub engagement: f64,
    pub clarity: f64,
    pub brand_alignment: f64,
}

/// One analysis snapshot. `analyze` appends a new snapshot per call and
/// never rewrites earlier ones.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestAnalysis {
    pub id: String,
    pub variant_id: String,
    pub analyzed_at: DateTime<Utc>,
    pub primary_score: f64,
    pub metrics: VariantMetrics,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComparisonOutcome {
    /// Variant id with the maximum primary score; ties go to the first
    /// matching id in the order the caller supplied them.
    pub winner: String,
    /// Gap-derived pseudo-significance in [0, 1). Heuristic, not a real test.
    pub statistical_significance: f64,
    /// Per-variant scores in the caller's order.
    pub scores: Vec<VariantScore>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VariantScore {
    pub variant_id: String,
    pub primary_score: f64,
}

// =============================================================================
// Backup & recovery
// =============================================================================

/// Data-type sections a backup can include.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DataType {
    Stories,
    Media,
    BrandTests,
    Activities,
    Metrics,
    SavedSearches,
}

impl DataType {
    pub const ALL: [DataType; 6] = [
        DataType::Stories,
        DataType::Media,
        DataType::BrandTests,
        DataType::Activities,
        DataType::Metrics,
        DataType::SavedSearches,
    ];

    /// Storage collection this section snapshots.
    pub fn collection(&self) -> &'static str {
        match self {
            DataType::Stories => "content_stories",
            DataType::Media => "content_media",
            DataType::BrandTests => "brand_tests",
            DataType::Activities => "activities",
            DataType::Metrics => "dashboard_metrics",
            DataType::SavedSearches => "saved_searches",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            DataType::Stories => "stories",
            DataType::Media => "media",
            DataType::BrandTests => "brandTests",
            DataType::Activities => "activities",
            DataType::Metrics => "metrics",
            DataType::SavedSearches => "savedSearches",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackupStatus {
    Creating,
    Completed,
    Failed,
    Corrupted,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupMetadata {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub size_bytes: u64,
    /// SHA-256 hex digest of the stored (possibly encoded) payload.
    #[serde(default)]
    pub checksum: String,
    #[serde(default)]
    pub data_types: Vec<DataType>,
    pub status: BackupStatus,
    pub created_by: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// True when the payload is base64-obfuscated. Reversible encoding, not
    /// confidentiality.
    #[serde(default)]
    pub encoded: bool,
}

/// Options for a restore run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RestoreOptions {
    pub backup_id: String,
    /// Restrict the restore to these sections. Empty restores everything the
    /// backup declares.
    #[serde(default)]
    pub selective_data_types: Vec<DataType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_from: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_to: Option<DateTime<Utc>>,
    #[serde(default = "default_true")]
    pub validate_first: bool,
    #[serde(default)]
    pub create_safety_backup_first: bool,
    #[serde(default)]
    pub dry_run: bool,
}

fn default_true() -> bool {
    true
}

impl RestoreOptions {
    pub fn new(backup_id: impl Into<String>) -> Self {
        Self {
            backup_id: backup_id.into(),
            selective_data_types: Vec::new(),
            date_from: None,
            date_to: None,
            validate_first: true,
            create_safety_backup_first: false,
            dry_run: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecoveryStatus {
    Success,
    Partial,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RestoreFailure {
    pub data_type: DataType,
    pub error: String,
}

/// Per-run restore report: per-type outcomes rather than all-or-nothing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecoveryReport {
    pub backup_id: String,
    pub status: RecoveryStatus,
    pub restored: Vec<DataType>,
    pub failures: Vec<RestoreFailure>,
    pub successful_items: usize,
    pub failed_items: usize,
    #[serde(default)]
    pub dry_run: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub safety_backup_id: Option<String>,
    #[serde(default)]
    pub warnings: Vec<String>,
}

// =============================================================================
// Verification
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyOutcome {
    pub backup_id: String,
    pub valid: bool,
    #[serde(default)]
    pub errors: Vec<String>,
}

// =============================================================================
// Authorization
// =============================================================================

/// Caller role for privileged operations. Only `Admin` may clear stored data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Staff,
    Viewer,
}

impl Role {
    pub fn can_clear_data(&self) -> bool {
        matches!(self, Role::Admin)
    }
}
