//! End-to-end ranking: variants -> provider fan-out -> normalize -> filter -> score ->
//! dedup -> select.

use crate::dedup::dedup;
use crate::filter::{CandidateFilter, Rejection};
use crate::normalize::normalize;
use crate::query::build_queries;
use crate::score::{QueryTerms, Scorer};
use crate::search::{country_from_env, language_from_env, DEFAULT_TIMEOUT_MS};
use crate::select::select;
use crate::tuning::Tuning;
use serde::Serialize;
use shopmatch_core::{
    AttributeDescriptor, PickedResult, ProductSearchProvider, RawResult, Result, SearchQuery,
};
use std::time::Duration;

#[derive(Debug, Clone, Serialize)]
pub struct RejectedCandidate {
    pub link: String,
    pub rule: Rejection,
}

#[derive(Debug, Clone, Serialize)]
pub struct RankReport {
    #[serde(flatten)]
    pub result: PickedResult,
    pub rejected: Vec<RejectedCandidate>,
}

/// The synchronous half of the pipeline. Holds no per-request state.
#[derive(Debug, Clone, Default)]
pub struct Ranker {
    filter: CandidateFilter,
    scorer: Scorer,
}

impl Ranker {
    pub fn new(tuning: Tuning) -> Self {
        Self {
            filter: CandidateFilter::default(),
            scorer: Scorer::new(tuning),
        }
    }

    pub fn with_filter(mut self, filter: CandidateFilter) -> Self {
        self.filter = filter;
        self
    }

    pub fn rank_results(&self, query: &str, raw: Vec<RawResult>, top_n: usize) -> PickedResult {
        self.rank_report(query, raw, top_n).result
    }

    pub fn rank_report(&self, query: &str, raw: Vec<RawResult>, top_n: usize) -> RankReport {
        let raw_count = raw.len();
        let terms = QueryTerms::parse(query);

        let mut rejected = Vec::new();
        let mut surviving = Vec::new();
        for c in raw.into_iter().map(normalize) {
            match self.filter.rejection(&c) {
                Some(rule) => rejected.push(RejectedCandidate { link: c.link, rule }),
                None => surviving.push(c),
            }
        }
        let surviving_count = surviving.len();

        let scored = surviving
            .into_iter()
            .map(|c| self.scorer.score(&terms, c))
            .collect();
        let deduped = dedup(scored, self.scorer.tuning().dedup_jaccard_threshold);
        RankReport {
            result: select(deduped, raw_count, surviving_count, top_n),
            rejected,
        }
    }
}

/// Caller-side knobs for one descriptor lookup.
#[derive(Debug, Clone)]
pub struct FanoutOptions {
    pub max_results: usize,
    pub timeout_ms: u64,
    /// Gap between consecutive variant launches against the same provider.
    pub politeness_delay_ms: u64,
    pub country: Option<String>,
    pub language: Option<String>,
    pub top_n: usize,
}

impl Default for FanoutOptions {
    fn default() -> Self {
        Self {
            max_results: 10,
            timeout_ms: DEFAULT_TIMEOUT_MS,
            politeness_delay_ms: 400,
            country: None,
            language: None,
            top_n: 1,
        }
    }
}

impl FanoutOptions {
    pub fn from_env() -> Self {
        Self {
            country: Some(country_from_env()),
            language: Some(language_from_env()),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct VariantOutcome {
    pub query: String,
    /// Set when the provider rewrote the query (domain fallback).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub effective_query: Option<String>,
    pub raw_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FindReport {
    pub primary_query: String,
    pub variants: Vec<VariantOutcome>,
    #[serde(flatten)]
    pub ranking: RankReport,
}

/// Search every query variant concurrently and rank the union of raw results.
///
/// Variants start `politeness_delay_ms` apart. A timeout or provider error only empties
/// that variant; `NotConfigured` and `InvalidInput` are returned as errors. All candidates
/// are scored against the primary (first, most specific) variant.
pub async fn find_product<P>(
    provider: &P,
    descriptor: &AttributeDescriptor,
    opts: &FanoutOptions,
    ranker: &Ranker,
) -> Result<FindReport>
where
    P: ProductSearchProvider + ?Sized,
{
    let variants = build_queries(descriptor);
    let delay = Duration::from_millis(opts.politeness_delay_ms);

    let futs = variants.iter().enumerate().map(|(i, v)| {
        let q = SearchQuery {
            query: v.clone(),
            max_results: Some(opts.max_results),
            language: opts.language.clone(),
            country: opts.country.clone(),
            timeout_ms: Some(opts.timeout_ms),
        };
        async move {
            if i > 0 {
                tokio::time::sleep(delay * i as u32).await;
            }
            let res = provider.search(&q).await;
            (q.query, res)
        }
    });
    let done = futures_util::future::join_all(futs).await;

    let mut outcomes = Vec::with_capacity(done.len());
    let mut raw: Vec<RawResult> = Vec::new();
    for (query, res) in done {
        match res {
            Ok(resp) => {
                tracing::debug!(
                    query = %query,
                    provider = %resp.provider,
                    attempts = resp.attempts,
                    results = resp.results.len(),
                    "variant searched"
                );
                let effective_query =
                    (resp.effective_query != query).then(|| resp.effective_query.clone());
                outcomes.push(VariantOutcome {
                    query,
                    effective_query,
                    raw_count: resp.results.len(),
                    error: None,
                });
                raw.extend(resp.results);
            }
            Err(e) if e.is_recoverable() => {
                tracing::warn!(
                    provider = provider.name(),
                    query = %query,
                    error = %e,
                    "variant failed; treating as empty"
                );
                outcomes.push(VariantOutcome {
                    query,
                    effective_query: None,
                    raw_count: 0,
                    error: Some(e.to_string()),
                });
            }
            Err(e) => return Err(e),
        }
    }

    let primary_query = variants.first().cloned().unwrap_or_default();
    let ranking = ranker.rank_report(&primary_query, raw, opts.top_n);
    tracing::info!(
        query = %primary_query,
        raw_count = ranking.result.raw_count,
        surviving_count = ranking.result.surviving_count,
        picked = ranking
            .result
            .picked
            .as_ref()
            .map(|p| p.candidate.link.as_str())
            .unwrap_or(""),
        "ranked"
    );
    Ok(FindReport {
        primary_query,
        variants: outcomes,
        ranking,
    })
}
