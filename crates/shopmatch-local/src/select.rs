use shopmatch_core::{PickedResult, ScoredCandidate};

/// Stable sort by score, descending. Ties keep input (provider) order.
pub fn rank(mut candidates: Vec<ScoredCandidate>) -> Vec<ScoredCandidate> {
    candidates.sort_by(|a, b| b.score.cmp(&a.score));
    candidates
}

/// Pick the best candidate and up to `top_n - 1` runners-up.
///
/// Counters are passed through untouched so callers can tell "no results" from
/// "everything was rejected" even when nothing is picked.
pub fn select(
    deduped: Vec<ScoredCandidate>,
    raw_count: usize,
    surviving_count: usize,
    top_n: usize,
) -> PickedResult {
    let mut ranked = rank(deduped).into_iter();
    let picked = ranked.next();
    let runners_up = ranked.take(top_n.saturating_sub(1)).collect();
    PickedResult {
        picked,
        raw_count,
        surviving_count,
        runners_up,
    }
}
