//! Local implementations for `shopmatch`: the SerpApi provider client plus the
//! deterministic ranking stages (query builder, normalizer, filter, scorer, dedup,
//! selector).

pub mod compare;
pub mod dedup;
pub mod filter;
pub mod normalize;
pub mod pipeline;
pub mod query;
pub mod score;
pub mod search;
pub mod select;
pub mod textprep;
pub mod tuning;
pub mod urlshape;

pub use pipeline::{find_product, FanoutOptions, FindReport, RankReport, Ranker};
pub use tuning::Tuning;
