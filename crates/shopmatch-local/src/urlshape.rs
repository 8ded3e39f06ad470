//! URL shape signals shared by the filter and the scorer.

use regex::Regex;
use std::sync::OnceLock;

/// Parsed view of a result link. Parsing is best-effort: a link without a scheme is
/// retried as `https://`, and an unparseable link yields an empty shape.
#[derive(Debug, Clone, Default)]
pub struct UrlShape {
    /// Host, lowercased, without a leading `www.`.
    pub host: String,
    /// Non-empty path segments, original case.
    pub segments: Vec<String>,
    /// Query pairs, keys lowercased.
    pub query: Vec<(String, String)>,
    /// Whole link, lowercased.
    pub lower: String,
}

impl UrlShape {
    pub fn parse(link: &str) -> Self {
        let link = link.trim();
        let parsed = url::Url::parse(link).or_else(|e| {
            if link.starts_with('/') {
                return Err(e);
            }
            url::Url::parse(&format!("https://{link}"))
        });
        let lower = link.to_lowercase();
        let Ok(u) = parsed else {
            return Self {
                lower,
                ..Self::default()
            };
        };
        let host = u
            .host_str()
            .map(strip_www)
            .unwrap_or_default();
        let segments = u
            .path_segments()
            .map(|it| {
                it.filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect::<Vec<_>>()
            })
            .unwrap_or_default();
        let query = u
            .query_pairs()
            .map(|(k, v)| (k.to_lowercase(), v.into_owned()))
            .collect();
        Self {
            host,
            segments,
            query,
            lower,
        }
    }

    /// True if `host` is `domain` or a subdomain of it.
    pub fn host_matches(&self, domain: &str) -> bool {
        self.host == domain || self.host.ends_with(&format!(".{domain}"))
    }

    pub fn has_segment(&self, name: &str) -> bool {
        self.segments.iter().any(|s| s.eq_ignore_ascii_case(name))
    }

    pub fn path_lower(&self) -> String {
        let mut p = String::from("/");
        p.push_str(&self.segments.join("/").to_lowercase());
        if !self.segments.is_empty() {
            p.push('/');
        }
        p
    }

    pub fn query_value(&self, key: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

fn strip_www(host: &str) -> String {
    let h = host.to_lowercase();
    match h.strip_prefix("www.") {
        Some(rest) => rest.to_string(),
        None => h,
    }
}

/// Domain of a link, lowercased, without `www.`; `None` if the link has no host.
pub fn domain_of(link: &str) -> Option<String> {
    let shape = UrlShape::parse(link);
    if shape.host.is_empty() {
        None
    } else {
        Some(shape.host)
    }
}

fn category_code_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^[A-Za-z0-9]+(?:-[A-Za-z0-9]+)*-C[0-9]+[A-Za-z0-9]*$")
            .expect("category code regex must compile")
    })
}

const CATEGORY_SEGMENTS: &[&str] = &["c", "category", "kategorija"];

/// `<slug>-C<digits><alnum>*`, e.g. `jedilni-stoli-C102C3C1`.
pub fn is_category_code_segment(segment: &str) -> bool {
    category_code_re().is_match(segment)
}

/// Category code segment or a generic `/c/`, `/category/`, `/kategorija/` segment.
pub fn is_category_url(shape: &UrlShape) -> bool {
    shape.segments.iter().any(|s| {
        is_category_code_segment(s) || CATEGORY_SEGMENTS.iter().any(|c| s.eq_ignore_ascii_case(c))
    })
}

/// `/p/` path segment (product detail convention used by several storefronts).
pub fn has_product_path(shape: &UrlShape) -> bool {
    shape.has_segment("p")
}

fn strip_extension(segment: &str) -> &str {
    for ext in [".html", ".htm", ".php", ".aspx"] {
        if let Some(stem) = segment.strip_suffix(ext) {
            return stem;
        }
    }
    segment
}

/// Trailing digit run of the whole link, ignoring a fragment and trailing slashes.
fn trailing_digits(lower: &str, min_digits: usize) -> Option<&str> {
    let end = lower.split('#').next().unwrap_or("").trim_end_matches('/');
    let start = end.trim_end_matches(|c: char| c.is_ascii_digit()).len();
    let run = &end[start..];
    (!run.is_empty() && run.len() >= min_digits).then_some(run)
}

/// Numeric id of at least `min_digits`: a hyphen-delimited all-digit piece in any path
/// segment, or a digit run the link ends in (`?id=123456789`, `/stol123456789`).
pub fn numeric_id(shape: &UrlShape, min_digits: usize) -> Option<&str> {
    shape
        .segments
        .iter()
        .find_map(|seg| {
            strip_extension(seg)
                .split(['-', '_'])
                .find(|piece| piece.len() >= min_digits && piece.chars().all(|c| c.is_ascii_digit()))
        })
        .or_else(|| trailing_digits(&shape.lower, min_digits))
}

/// A long slug-like segment (alphanumeric with `-`/`_`, containing a letter) typical of
/// detail pages. Never fires on category URLs.
pub fn detail_slug(shape: &UrlShape, min_len: usize) -> Option<&str> {
    if is_category_url(shape) {
        return None;
    }
    shape.segments.iter().map(|s| strip_extension(s)).find(|seg| {
        seg.chars().count() >= min_len
            && seg
                .chars()
                .all(|c| c.is_alphanumeric() || c == '-' || c == '_')
            && seg.chars().any(|c| c.is_alphabetic())
    })
}
