//! Hard rejection of non-product pages (category/listing pages, pagination, boilerplate).
//!
//! Rules are independent predicates OR'd together: `is_rejected` does not depend on the
//! order they are evaluated in. `rejection` names the first rule (in `Rejection::ALL`
//! order) that fires, for diagnostics only.

use crate::textprep::scrub;
use crate::urlshape::{is_category_url, UrlShape};
use regex::Regex;
use serde::Serialize;
use shopmatch_core::Candidate;
use std::sync::OnceLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Rejection {
    CategoryPath,
    Pagination,
    ListingPhrase,
    VendorOverride,
}

impl Rejection {
    pub const ALL: [Rejection; 4] = [
        Rejection::CategoryPath,
        Rejection::Pagination,
        Rejection::ListingPhrase,
        Rejection::VendorOverride,
    ];
}

/// Matched on scrubbed title/snippet, at word boundaries.
const LISTING_PHRASES: &[&str] = &[
    "category",
    "categories",
    "collection",
    "show all",
    "page",
    "kategorija",
    "kategorije",
    "kolekcija",
    "prikazi vse",
    "vsi izdelki",
    "najdenih izdelkov",
    "izdelkov v kategoriji",
    "razvrsti po",
    "sort by",
    "products found",
];

/// Storefront whose URL scheme evades the generic rules: anything without a product
/// marker, or with a pagination parameter, is a listing.
#[derive(Debug, Clone)]
pub struct VendorRule {
    pub domains: &'static [&'static str],
    /// Substrings of the lowercased path that identify a product detail page.
    pub product_markers: &'static [&'static str],
    /// Query keys whose presence means a paginated listing.
    pub pagination_params: &'static [&'static str],
}

impl VendorRule {
    fn applies_to(&self, shape: &UrlShape) -> bool {
        self.domains.iter().any(|d| shape.host_matches(d))
    }

    fn rejects(&self, shape: &UrlShape) -> bool {
        if !self.applies_to(shape) {
            return false;
        }
        let paginated = self
            .pagination_params
            .iter()
            .any(|p| shape.query_value(p).is_some());
        let path = shape.path_lower();
        let has_product_marker = self.product_markers.iter().any(|m| path.contains(m));
        paginated || !has_product_marker
    }
}

pub const DEFAULT_VENDOR_RULES: &[VendorRule] = &[VendorRule {
    domains: &["ikea.com", "ikea.si"],
    product_markers: &["/p/"],
    pagination_params: &["page", "p", "start", "offset"],
}];

fn stran_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\bstran \d+\b").expect("pagination regex must compile"))
}

fn contains_phrase(haystack: &str, phrase: &str) -> bool {
    // Both sides are scrubbed: single spaces, no punctuation.
    format!(" {haystack} ").contains(&format!(" {phrase} "))
}

#[derive(Debug, Clone)]
pub struct CandidateFilter {
    vendors: Vec<VendorRule>,
}

impl Default for CandidateFilter {
    fn default() -> Self {
        Self {
            vendors: DEFAULT_VENDOR_RULES.to_vec(),
        }
    }
}

impl CandidateFilter {
    pub fn with_vendor(mut self, rule: VendorRule) -> Self {
        self.vendors.push(rule);
        self
    }

    pub fn is_rejected(&self, c: &Candidate) -> bool {
        let shape = UrlShape::parse(&c.link);
        Rejection::ALL.iter().any(|r| self.fires(*r, c, &shape))
    }

    pub fn rejection(&self, c: &Candidate) -> Option<Rejection> {
        let shape = UrlShape::parse(&c.link);
        Rejection::ALL
            .iter()
            .copied()
            .find(|r| self.fires(*r, c, &shape))
    }

    fn fires(&self, rule: Rejection, c: &Candidate, shape: &UrlShape) -> bool {
        match rule {
            Rejection::CategoryPath => is_category_url(shape),
            Rejection::Pagination => {
                let numeric_p = shape
                    .query_value("p")
                    .is_some_and(|v| !v.is_empty() && v.chars().all(|ch| ch.is_ascii_digit()));
                numeric_p
                    || stran_re().is_match(&scrub(&c.link))
                    || stran_re().is_match(&scrub(&c.title))
                    || stran_re().is_match(&scrub(&c.snippet))
            }
            Rejection::ListingPhrase => {
                let title = scrub(&c.title);
                let snippet = scrub(&c.snippet);
                LISTING_PHRASES
                    .iter()
                    .any(|p| contains_phrase(&title, p) || contains_phrase(&snippet, p))
            }
            Rejection::VendorOverride => self.vendors.iter().any(|v| v.rejects(shape)),
        }
    }
}
