use serde::{Deserialize, Serialize};

/// Every empirically-chosen ranking constant, in one place.
///
/// `Default` holds the compatibility values; a JSON override only needs the fields it
/// changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Tuning {
    /// `/p/` path segment.
    pub product_path_bonus: i32,
    /// Hyphen/slash-delimited numeric id in the URL path.
    pub numeric_id_bonus: i32,
    pub numeric_id_min_digits: usize,
    /// Long slug-like path segment on a non-category URL.
    pub detail_slug_bonus: i32,
    pub detail_slug_min_len: usize,

    pub numeric_token_points: i32,
    pub long_token_points: i32,
    pub short_token_points: i32,
    pub coverage_bonus: i32,
    /// Fraction of query tokens that must match for `coverage_bonus`.
    pub coverage_threshold: f64,

    pub missing_color_penalty: i32,
    pub color_conflict_penalty: i32,

    pub generic_title_penalty: i32,
    /// Below this fraction of query tokens present in the title, apply `generic_title_penalty`.
    pub generic_title_threshold: f64,

    /// Title Jaccard at or above which same-domain candidates are merged.
    pub dedup_jaccard_threshold: f64,
}

impl Default for Tuning {
    fn default() -> Self {
        Self {
            product_path_bonus: 12,
            numeric_id_bonus: 10,
            numeric_id_min_digits: 9,
            detail_slug_bonus: 6,
            detail_slug_min_len: 20,
            numeric_token_points: 3,
            long_token_points: 2,
            short_token_points: 1,
            coverage_bonus: 6,
            coverage_threshold: 0.70,
            missing_color_penalty: -15,
            color_conflict_penalty: -10,
            generic_title_penalty: -8,
            generic_title_threshold: 0.40,
            dedup_jaccard_threshold: 0.88,
        }
    }
}
