use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("not configured: {0}")]
    NotConfigured(String),
    #[error("search timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },
    #[error("search provider failed: {0}")]
    Provider(String),
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

impl Error {
    /// Whether a pipeline may treat this failure as "zero results for one query variant".
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Error::Timeout { .. } | Error::Provider(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// Structured description of a desired item.
///
/// Produced upstream (vision/LLM extraction); absent fields are empty strings.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct AttributeDescriptor {
    pub category: String,
    pub color: String,
    pub material: String,
    pub shape: String,
    pub legs: String,
    pub size: String,
    pub style: String,
    /// Optional storefront domain; query variants get a `site:` scope when set.
    pub site: String,
}

impl AttributeDescriptor {
    pub fn new(category: impl Into<String>) -> Self {
        Self {
            category: category.into(),
            ..Self::default()
        }
    }
}

/// Which provider result section a record came from.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ResultKind {
    #[default]
    Organic,
    Shopping,
}

/// Provider record, as parsed. `link` is never empty and never rewritten.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RawResult {
    pub title: String,
    pub link: String,
    pub snippet: String,
    pub price: Option<String>,
    pub image: Option<String>,
    pub source: Option<String>,
    pub section: ResultKind,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Candidate {
    pub title: String,
    pub link: String,
    pub snippet: String,
    pub price: Option<String>,
    pub image: Option<String>,
    pub source: Option<String>,
    pub kind: ResultKind,
    /// URL host, lowercased, without a leading `www.`.
    pub domain: String,
}

/// Scoring rule that produced a [`Reason`].
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Rule {
    ProductPath,
    NumericId,
    DetailSlug,
    TokenMatch,
    TokenCoverage,
    MissingColor,
    ColorConflict,
    GenericTitle,
}

/// One signed scoring contribution.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Reason {
    pub rule: Rule,
    pub delta: i32,
    pub detail: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ScoredCandidate {
    #[serde(flatten)]
    pub candidate: Candidate,
    pub score: i32,
    /// In evaluation order: product bonuses, token match, constraints, generic-title.
    pub reasons: Vec<Reason>,
}

impl ScoredCandidate {
    pub fn delta_for(&self, rule: Rule) -> i32 {
        self.reasons
            .iter()
            .filter(|r| r.rule == rule)
            .map(|r| r.delta)
            .sum()
    }
}

/// Outcome of one ranking run.
///
/// `raw_count == 0` means the provider had nothing; `raw_count > 0 && surviving_count == 0`
/// means every result was a non-product page. `picked` is `None` iff `surviving_count == 0`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct PickedResult {
    pub picked: Option<ScoredCandidate>,
    pub raw_count: usize,
    pub surviving_count: usize,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub runners_up: Vec<ScoredCandidate>,
}

impl PickedResult {
    pub fn all_rejected(&self) -> bool {
        self.raw_count > 0 && self.surviving_count == 0
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchQuery {
    pub query: String,
    pub max_results: Option<usize>,
    pub language: Option<String>,
    pub country: Option<String>,
    pub timeout_ms: Option<u64>,
}

impl SearchQuery {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            max_results: None,
            language: None,
            country: None,
            timeout_ms: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResponse {
    pub results: Vec<RawResult>,
    pub provider: String,
    /// The query text actually sent last (differs from the input after a domain fallback).
    pub effective_query: String,
    pub attempts: u32,
    pub timings_ms: BTreeMap<String, u128>,
}

#[async_trait::async_trait]
pub trait ProductSearchProvider: Send + Sync {
    fn name(&self) -> &'static str;
    async fn search(&self, q: &SearchQuery) -> Result<SearchResponse>;
}
