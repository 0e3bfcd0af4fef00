//! Cross-source deduplication/merge and deterministic relevance scoring.

mod dedup;
mod scorer;

pub use dedup::deduplicate;
pub use scorer::{score, score_sort_and_paginate, weights};
