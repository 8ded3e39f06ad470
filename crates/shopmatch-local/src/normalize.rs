use crate::urlshape::domain_of;
use shopmatch_core::{Candidate, RawResult};

/// RawResult -> Candidate. Pure; no filtering.
///
/// `kind` comes from the provider section. `domain` comes from the link host; when the link
/// has no usable host, the provider's `source` string is used as given (lowercased).
pub fn normalize(raw: RawResult) -> Candidate {
    let domain = domain_of(&raw.link).unwrap_or_else(|| {
        raw.source
            .as_deref()
            .map(|s| {
                let s = s.trim().to_lowercase();
                s.strip_prefix("www.").map(str::to_string).unwrap_or(s)
            })
            .unwrap_or_default()
    });
    Candidate {
        title: raw.title,
        link: raw.link,
        snippet: raw.snippet,
        price: raw.price,
        image: raw.image,
        source: raw.source,
        kind: raw.section,
        domain,
    }
}
