//! Relevance scoring
//!
//! Scoring is a strategy trait so the weight table can be swapped or tested
//! in isolation from the search pipeline. The default `WeightedScorer`
//! carries the portal's production weights: title matches dominate, tags
//! outrank body text, summaries sit in between.

use crate::types::ContentRecord;

/// A parsed, sanitized query: the raw text plus lowercase whitespace tokens.
#[derive(Debug, Clone)]
pub struct SearchQuery {
    pub raw: String,
    pub tokens: Vec<String>,
}

impl SearchQuery {
    pub fn parse(sanitized: &str) -> Self {
        Self {
            raw: sanitized.to_string(),
            tokens: sanitized
                .split_whitespace()
                .map(|t| t.to_lowercase())
                .collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

/// Scores one record against one query. Records scoring zero are excluded
/// from results; an empty query admits every record at score 1.
pub trait RelevanceScorer: Send + Sync {
    fn score(&self, record: &ContentRecord, query: &SearchQuery) -> f64;
}

#[derive(Debug, Clone)]
pub struct ScoreWeights {
    pub title_exact: f64,
    pub title_prefix: f64,
    pub title_contains: f64,
    pub content_token: f64,
    pub tag_match: f64,
    pub summary_match: f64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            title_exact: 10.0,
            title_prefix: 5.0,
            title_contains: 2.0,
            content_token: 1.0,
            tag_match: 3.0,
            summary_match: 1.5,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct WeightedScorer {
    pub weights: ScoreWeights,
}

impl WeightedScorer {
    pub fn new(weights: ScoreWeights) -> Self {
        Self { weights }
    }
}

impl RelevanceScorer for WeightedScorer {
    fn score(&self, record: &ContentRecord, query: &SearchQuery) -> f64 {
        if query.is_empty() {
            return 1.0;
        }

        let w = &self.weights;
        let title = record.title.to_lowercase();
        let content = record.content.to_lowercase();
        let summary = record
            .summary
            .as_deref()
            .map(|s| s.to_lowercase())
            .unwrap_or_default();
        let tags: Vec<String> = record
            .metadata
            .tags
            .iter()
            .map(|t| t.to_lowercase())
            .collect();

        let mut score = 0.0;
        for token in &query.tokens {
            if title == *token {
                score += w.title_exact;
            } else if title.starts_with(token.as_str()) {
                score += w.title_prefix;
            } else if title.contains(token.as_str()) {
                score += w.title_contains;
            }

            if content.contains(token.as_str()) {
                score += w.content_token;
            }

            score += tags.iter().filter(|tag| *tag == token).count() as f64 * w.tag_match;

            if !summary.is_empty() && summary.contains(token.as_str()) {
                score += w.summary_match;
            }
        }

        score
    }
}
