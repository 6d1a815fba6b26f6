//! Content search engine
//!
//! Linear scan over the content collections: fetch everything for the
//! requested types, score each record against the query, filter, sort,
//! paginate. No index is maintained: collection sizes here are hundreds,
//! not millions, and re-reading the adapter on every call keeps the engine
//! stateless apart from the persisted search history.
//!
//! A failed collection fetch contributes zero results and a warning; the
//! search still returns whatever the other collections produced.

use std::collections::HashMap;
use std::sync::{Arc, OnceLock};
use std::time::Instant;

use regex::Regex;

use crate::config::SearchConfig;
use crate::error::PortalError;
use crate::services::scoring::{RelevanceScorer, SearchQuery, WeightedScorer};
use crate::storage::PersistenceAdapter;
use crate::types::{
    ActivityItem, ContentMetadata, ContentRecord, ContentType, SavedSearch, SearchFacets,
    SearchFilters, SearchHighlights, SearchHistoryEntry, SearchHit, SearchRequest,
    SearchResponse, SortKey, SortOrder, TestVariant, VariantStatus,
};
use crate::util;

const HISTORY_COLLECTION: &str = "search_history";
const RECENT_COLLECTION: &str = "recent_searches";
const SAVED_COLLECTION: &str = "saved_searches";

/// Highlighted terms must be longer than this many characters.
const MIN_HIGHLIGHT_LEN: usize = 2;

/// Characters kept either side of the first content match (~150 total).
const EXCERPT_RADIUS: usize = 75;

const MAX_SUGGESTIONS: usize = 5;

// Compile-once sanitizer patterns via OnceLock.
fn re_script_block() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?is)<script[^>]*>.*?</script>").unwrap())
}

fn re_markup() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"<[^>]*>").unwrap())
}

fn re_script_scheme() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)javascript\s*:").unwrap())
}

/// Strip script-like substrings and markup from a raw query, collapse
/// whitespace, trim.
pub fn sanitize_query(raw: &str) -> String {
    let cleaned = re_script_block().replace_all(raw, " ");
    let cleaned = re_markup().replace_all(&cleaned, " ");
    let cleaned = re_script_scheme().replace_all(&cleaned, " ");
    cleaned.split_whitespace().collect::<Vec<_>>().join(" ")
}

pub struct SearchService {
    adapter: Arc<PersistenceAdapter>,
    scorer: Arc<dyn RelevanceScorer>,
    config: SearchConfig,
}

impl SearchService {
    pub fn new(adapter: Arc<PersistenceAdapter>, config: SearchConfig) -> Self {
        Self::with_scorer(adapter, config, Arc::new(WeightedScorer::default()))
    }

    /// Inject a custom scoring strategy (used by tests and tuning tools).
    pub fn with_scorer(
        adapter: Arc<PersistenceAdapter>,
        config: SearchConfig,
        scorer: Arc<dyn RelevanceScorer>,
    ) -> Self {
        Self {
            adapter,
            scorer,
            config,
        }
    }

    /// Run one search. Never errors: backend trouble degrades to partial
    /// (or empty) results, which is what a staff dashboard wants.
    pub async fn search(&self, owner: &str, request: &SearchRequest) -> SearchResponse {
        let started = Instant::now();

        let sanitized = sanitize_query(&request.query);
        let query = SearchQuery::parse(&sanitized);

        let candidates = self.collect_candidates(owner, &request.filters).await;

        // Admission rule: score > 0, or everything at 1.0 for empty queries.
        let mut hits: Vec<SearchHit> = candidates
            .into_iter()
            .filter_map(|record| {
                let score = self.scorer.score(&record, &query);
                (score > 0.0).then_some(SearchHit {
                    record,
                    score,
                    highlights: None,
                })
            })
            .collect();

        hits.retain(|hit| passes_filters(&hit.record, &request.filters));

        sort_hits(&mut hits, request.sort_by, request.sort_order);

        let total = hits.len();
        let facets = request.include_facets.then(|| compute_facets(&hits));

        let limit = if request.limit == 0 {
            self.config.default_limit
        } else {
            request.limit
        };
        let mut page: Vec<SearchHit> = hits
            .into_iter()
            .skip(request.offset)
            .take(limit)
            .collect();

        if request.include_highlights {
            let marker = highlight_regex(&query);
            for hit in &mut page {
                hit.highlights = Some(build_highlights(&hit.record, marker.as_ref()));
            }
        }

        let suggestions = if query.is_empty() {
            Vec::new()
        } else {
            self.suggestions(owner, &sanitized).await
        };

        if !query.is_empty() {
            self.record_history(owner, &sanitized, total).await;
        }

        SearchResponse {
            results: page,
            total,
            facets,
            suggestions,
            search_time_ms: started.elapsed().as_millis() as u64,
        }
    }

    /// Session search history, newest-first.
    pub async fn history(&self, owner: &str) -> Vec<SearchHistoryEntry> {
        self.adapter.get_list(HISTORY_COLLECTION, owner).await
    }

    /// The short recent-searches list shown under the search box.
    pub async fn recent(&self, owner: &str) -> Vec<String> {
        self.adapter.get_list(RECENT_COLLECTION, owner).await
    }

    // -------------------------------------------------------------------
    // Saved searches
    // -------------------------------------------------------------------

    pub async fn save_search(
        &self,
        owner: &str,
        name: &str,
        query: &str,
        filters: SearchFilters,
    ) -> Result<SavedSearch, PortalError> {
        if name.trim().is_empty() {
            return Err(PortalError::invalid("name", "must not be empty"));
        }

        let saved = SavedSearch {
            id: util::new_id(),
            name: name.trim().to_string(),
            query: sanitize_query(query),
            filters,
            owner: owner.to_string(),
            use_count: 0,
            last_used: None,
            created_at: util::now(),
        };

        let mut searches: Vec<SavedSearch> =
            self.adapter.get_list(SAVED_COLLECTION, owner).await;
        searches.push(saved.clone());
        if !self.adapter.save(SAVED_COLLECTION, &searches, owner).await {
            return Err(PortalError::Backend(
                "could not persist saved search".to_string(),
            ));
        }

        Ok(saved)
    }

    pub async fn saved_searches(&self, owner: &str) -> Vec<SavedSearch> {
        self.adapter.get_list(SAVED_COLLECTION, owner).await
    }

    /// Execute a saved search and bump its usage counters.
    pub async fn execute_saved(
        &self,
        owner: &str,
        id: &str,
    ) -> Result<SearchResponse, PortalError> {
        let mut searches: Vec<SavedSearch> =
            self.adapter.get_list(SAVED_COLLECTION, owner).await;
        let saved = searches
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or_else(|| PortalError::NotFound(format!("saved search {}", id)))?;

        let request = SearchRequest {
            query: saved.query.clone(),
            filters: saved.filters.clone(),
            ..Default::default()
        };

        saved.use_count += 1;
        saved.last_used = Some(util::now());
        let _ = self.adapter.save(SAVED_COLLECTION, &searches, owner).await;

        Ok(self.search(owner, &request).await)
    }

    pub async fn delete_saved(&self, owner: &str, id: &str) -> Result<(), PortalError> {
        let mut searches: Vec<SavedSearch> =
            self.adapter.get_list(SAVED_COLLECTION, owner).await;
        let before = searches.len();
        searches.retain(|s| s.id != id);
        if searches.len() == before {
            return Err(PortalError::NotFound(format!("saved search {}", id)));
        }
        let _ = self.adapter.save(SAVED_COLLECTION, &searches, owner).await;
        Ok(())
    }

    // -------------------------------------------------------------------
    // Internals
    // -------------------------------------------------------------------

    async fn collect_candidates(
        &self,
        owner: &str,
        filters: &SearchFilters,
    ) -> Vec<ContentRecord> {
        let types = enabled_types(filters);

        let mut out = Vec::new();
        for content_type in types {
            match content_type {
                ContentType::Story | ContentType::Media => {
                    let records: Vec<ContentRecord> = self
                        .adapter
                        .get_list(content_type.collection(), owner)
                        .await;
                    out.extend(records);
                }
                ContentType::BrandTest => {
                    let variants: Vec<TestVariant> = self
                        .adapter
                        .get_list(content_type.collection(), owner)
                        .await;
                    out.extend(variants.iter().map(variant_record));
                }
                ContentType::Activity => {
                    let items: Vec<ActivityItem> = self
                        .adapter
                        .get_list(content_type.collection(), owner)
                        .await;
                    out.extend(items.iter().map(activity_record));
                }
            }
        }
        out
    }

    async fn suggestions(&self, owner: &str, sanitized: &str) -> Vec<String> {
        let needle = sanitized.to_lowercase();
        let history: Vec<SearchHistoryEntry> =
            self.adapter.get_list(HISTORY_COLLECTION, owner).await;

        let mut seen = std::collections::HashSet::new();
        history
            .iter()
            .filter(|entry| {
                let candidate = entry.query.to_lowercase();
                candidate != needle && candidate.starts_with(&needle)
            })
            .filter(|entry| seen.insert(entry.query.to_lowercase()))
            .take(MAX_SUGGESTIONS)
            .map(|entry| entry.query.clone())
            .collect()
    }

    async fn record_history(&self, owner: &str, sanitized: &str, total: usize) {
        let mut history: Vec<SearchHistoryEntry> =
            self.adapter.get_list(HISTORY_COLLECTION, owner).await;
        history.insert(
            0,
            SearchHistoryEntry {
                query: sanitized.to_string(),
                timestamp: util::now(),
                total,
            },
        );
        history.truncate(self.config.history_cap);
        let _ = self.adapter.save(HISTORY_COLLECTION, &history, owner).await;

        let mut recent: Vec<String> = self.adapter.get_list(RECENT_COLLECTION, owner).await;
        recent.retain(|q| q != sanitized);
        recent.insert(0, sanitized.to_string());
        recent.truncate(self.config.recent_cap);
        let _ = self.adapter.save(RECENT_COLLECTION, &recent, owner).await;
    }
}

/// Collections to scan. Activities are opt-in: they only appear when the
/// filter names them explicitly.
fn enabled_types(filters: &SearchFilters) -> Vec<ContentType> {
    if filters.content_types.is_empty() {
        return vec![ContentType::Story, ContentType::Media, ContentType::BrandTest];
    }
    let mut types = Vec::new();
    for t in &filters.content_types {
        if !types.contains(t) {
            types.push(*t);
        }
    }
    types
}

/// Project a brand-test variant into record form for indexing.
fn variant_record(variant: &TestVariant) -> ContentRecord {
    let status = match variant.status {
        VariantStatus::Draft => "draft",
        VariantStatus::Active => "active",
        VariantStatus::Completed => "completed",
    };
    ContentRecord {
        id: variant.id.clone(),
        content_type: ContentType::BrandTest,
        title: variant.name.clone(),
        content: variant.content.clone(),
        summary: (!variant.description.is_empty()).then(|| variant.description.clone()),
        metadata: ContentMetadata {
            date: Some(variant.created_at),
            tags: variant.audiences.clone(),
            status: Some(status.to_string()),
            ..Default::default()
        },
    }
}

/// Project an activity item into record form for indexing.
fn activity_record(item: &ActivityItem) -> ContentRecord {
    ContentRecord {
        id: item.id.clone(),
        content_type: ContentType::Activity,
        title: item.message.clone(),
        content: item.message.clone(),
        summary: None,
        metadata: ContentMetadata {
            author: item.user_id.clone(),
            date: Some(item.timestamp),
            status: Some(item.activity_type.label().to_string()),
            ..Default::default()
        },
    }
}

fn passes_filters(record: &ContentRecord, filters: &SearchFilters) -> bool {
    if filters.date_from.is_some() || filters.date_to.is_some() {
        let Some(date) = record.metadata.date else {
            return false;
        };
        if let Some(from) = filters.date_from {
            if date < from {
                return false;
            }
        }
        if let Some(to) = filters.date_to {
            if date > to {
                return false;
            }
        }
    }

    if !filters.authors.is_empty() {
        let Some(author) = record.metadata.author.as_deref() else {
            return false;
        };
        if !filters.authors.iter().any(|a| a.eq_ignore_ascii_case(author)) {
            return false;
        }
    }

    if !filters.statuses.is_empty() {
        let Some(status) = record.metadata.status.as_deref() else {
            return false;
        };
        if !filters.statuses.iter().any(|s| s.eq_ignore_ascii_case(status)) {
            return false;
        }
    }

    if !filters.tags.is_empty() {
        let shares_tag = record.metadata.tags.iter().any(|tag| {
            filters.tags.iter().any(|f| f.eq_ignore_ascii_case(tag))
        });
        if !shares_tag {
            return false;
        }
    }

    if filters.brand_score_min.is_some() || filters.brand_score_max.is_some() {
        let Some(score) = record.metadata.brand_score else {
            return false;
        };
        if let Some(min) = filters.brand_score_min {
            if score < min {
                return false;
            }
        }
        if let Some(max) = filters.brand_score_max {
            if score > max {
                return false;
            }
        }
    }

    true
}

fn sort_hits(hits: &mut [SearchHit], key: SortKey, order: SortOrder) {
    hits.sort_by(|a, b| {
        let ordering = match key {
            SortKey::Relevance => a
                .score
                .partial_cmp(&b.score)
                .unwrap_or(std::cmp::Ordering::Equal),
            SortKey::Date => a.record.metadata.date.cmp(&b.record.metadata.date),
            SortKey::Title => a
                .record
                .title
                .to_lowercase()
                .cmp(&b.record.title.to_lowercase()),
            SortKey::BrandScore => a
                .record
                .metadata
                .brand_score
                .partial_cmp(&b.record.metadata.brand_score)
                .unwrap_or(std::cmp::Ordering::Equal),
        };
        match order {
            SortOrder::Asc => ordering,
            SortOrder::Desc => ordering.reverse(),
        }
    });
}

/// Histograms over the filtered set, computed before pagination.
fn compute_facets(hits: &[SearchHit]) -> SearchFacets {
    let mut facets = SearchFacets::default();
    for hit in hits {
        bump(
            &mut facets.content_types,
            hit.record.content_type.label().to_string(),
        );
        if let Some(author) = &hit.record.metadata.author {
            bump(&mut facets.authors, author.clone());
        }
        for tag in &hit.record.metadata.tags {
            bump(&mut facets.tags, tag.clone());
        }
        if let Some(status) = &hit.record.metadata.status {
            bump(&mut facets.statuses, status.clone());
        }
    }
    facets
}

fn bump(map: &mut HashMap<String, usize>, key: String) {
    *map.entry(key).or_insert(0) += 1;
}

/// One alternation regex over the highlightable tokens, or None when the
/// query has none (short tokens are skipped).
fn highlight_regex(query: &SearchQuery) -> Option<Regex> {
    let terms: Vec<String> = query
        .tokens
        .iter()
        .filter(|t| t.chars().count() > MIN_HIGHLIGHT_LEN)
        .map(|t| regex::escape(t))
        .collect();
    if terms.is_empty() {
        return None;
    }
    Regex::new(&format!("(?i)(?:{})", terms.join("|"))).ok()
}

fn build_highlights(record: &ContentRecord, marker: Option<&Regex>) -> SearchHighlights {
    match marker {
        Some(re) => SearchHighlights {
            title: re.replace_all(&record.title, "<mark>$0</mark>").into_owned(),
            content: {
                let excerpt = content_excerpt(&record.content, re);
                re.replace_all(&excerpt, "<mark>$0</mark>").into_owned()
            },
        },
        None => SearchHighlights {
            title: record.title.clone(),
            content: lead(&record.content, EXCERPT_RADIUS * 2),
        },
    }
}

/// A window of roughly `EXCERPT_RADIUS * 2` characters around the first
/// match, or the lead of the content when nothing in the body matched.
fn content_excerpt(text: &str, re: &Regex) -> String {
    let Some(found) = re.find(text) else {
        return lead(text, EXCERPT_RADIUS * 2);
    };

    let mut start = found.start().saturating_sub(EXCERPT_RADIUS);
    while start > 0 && !text.is_char_boundary(start) {
        start -= 1;
    }
    let mut end = (found.end() + EXCERPT_RADIUS).min(text.len());
    while end < text.len() && !text.is_char_boundary(end) {
        end += 1;
    }

    let mut out = String::new();
    if start > 0 {
        out.push('…');
    }
    out.push_str(&text[start..end]);
    if end < text.len() {
        out.push('…');
    }
    out
}

fn lead(text: &str, max: usize) -> String {
    let mut end = max.min(text.len());
    while end < text.len() && !text.is_char_boundary(end) {
        end += 1;
    }
    let mut out = text[..end].to_string();
    if end < text.len() {
        out.push('…');
    }
    out
}
