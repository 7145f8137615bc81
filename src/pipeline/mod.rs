//! Scoring and de-duplication stages applied after fan-in.

mod dedup;
mod scorer;

pub use dedup::{dedupe, jaccard, title_similarity, DEFAULT_SIMILARITY_THRESHOLD};
pub use scorer::{
    default_host_credibility, recency, social, Keywords, Scorer, CREDIBILITY_WEIGHT,
    DEFAULT_RELEVANCE_THRESHOLD, EXCLUSION_PENALTY, PRIMARY_KEYWORD_POINTS, RECENCY_HORIZON_HOURS,
    RECENCY_WEIGHT, RELEVANCE_WEIGHT, SECONDARY_KEYWORD_POINTS, SOCIAL_WEIGHT,
};
