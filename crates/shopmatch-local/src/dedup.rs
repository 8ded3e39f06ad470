use crate::compare::{jaccard, title_token_set};
use shopmatch_core::ScoredCandidate;
use std::collections::BTreeSet;

/// Merge same-domain candidates whose titles are near-identical.
///
/// A merged pair keeps the higher score; on a tie the first-seen entry stays. The survivor
/// occupies the slot of the first-seen entry, so input order is otherwise preserved.
/// Candidates on different domains, or with no title tokens, are never merged.
pub fn dedup(candidates: Vec<ScoredCandidate>, threshold: f64) -> Vec<ScoredCandidate> {
    let mut kept: Vec<(BTreeSet<String>, ScoredCandidate)> = Vec::with_capacity(candidates.len());
    for c in candidates {
        let toks = title_token_set(&c.candidate.title);
        // A title with no tokens says nothing about identity.
        let dup = if toks.is_empty() {
            None
        } else {
            kept.iter().position(|(kt, k)| {
                k.candidate.domain == c.candidate.domain && jaccard(kt, &toks) >= threshold
            })
        };
        match dup {
            Some(i) => {
                if c.score > kept[i].1.score {
                    kept[i] = (toks, c);
                }
            }
            None => kept.push((toks, c)),
        }
    }
    kept.into_iter().map(|(_, c)| c).collect()
}
