use std::collections::HashSet;

use crate::types::NewsItem;
use crate::util::normalize_title;

/// Titles more similar than this are the same story
pub const DEFAULT_SIMILARITY_THRESHOLD: f64 = 0.8;

fn word_set(title: &str) -> HashSet<String> {
    normalize_title(title)
        .split(' ')
        .filter(|w| !w.is_empty())
        .map(str::to_string)
        .collect()
}

/// Jaccard index of two word sets: `|a ∩ b| / |a ∪ b|`. Two empty sets
/// score 0.
pub fn jaccard(a: &HashSet<String>, b: &HashSet<String>) -> f64 {
    let union = a.union(b).count();
    if union == 0 {
        return 0.0;
    }
    a.intersection(b).count() as f64 / union as f64
}

/// Jaccard similarity of two headlines after normalization.
pub fn title_similarity(a: &str, b: &str) -> f64 {
    jaccard(&word_set(a), &word_set(b))
}

/// Removes near-duplicate stories.
///
/// Items are visited in input order, which callers should make
/// descending by total score, and compared against every item kept so far. When similarity exceeds `threshold` the one with the higher
/// total score stays, in the slot of the first; ties keep the earlier item.
/// Titles that normalize to nothing are never treated as duplicates.
pub fn dedupe(items: Vec<NewsItem>, threshold: f64) -> Vec<NewsItem> {
    let mut kept: Vec<(NewsItem, HashSet<String>)> = Vec::with_capacity(items.len());

    for item in items {
        let words = word_set(&item.title);
        if words.is_empty() {
            kept.push((item, words));
            continue;
        }

        let existing = kept
            .iter()
            .position(|(_, other)| !other.is_empty() && jaccard(&words, other) > threshold);

        match existing {
            Some(idx) => {
                if item.scores.total > kept[idx].0.scores.total {
                    tracing::trace!(
                        kept = %item.title,
                        dropped = %kept[idx].0.title,
                        "Duplicate story replaced by higher-scored copy"
                    );
                    kept[idx] = (item, words);
                } else {
                    tracing::trace!(
                        kept = %kept[idx].0.title,
                        dropped = %item.title,
                        "Duplicate story dropped"
                    );
                }
            }
            None => kept.push((item, words)),
        }
    }

    kept.into_iter().map(|(item, _)| item).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Scores;
    use chrono::Utc;
    use proptest::prelude::*;

    fn item(title: &str, total: f64) -> NewsItem {
        NewsItem {
            id: format!("{title}-{total}"),
            title: title.to_string(),
            description: String::new(),
            url: format!("https://example.com/{}", title.len()),
            date: "2026-01-01".to_string(),
            date_time: Utc::now(),
            author: None,
            source: "test".to_string(),
            source_icon: "📰".to_string(),
            category: "news".to_string(),
            scores: Scores {
                total,
                ..Default::default()
            },
            is_relevant: true,
        }
    }

    #[test]
    fn test_similarity_of_punctuation_variants() {
        assert_eq!(
            title_similarity("Claude 4 Released by Anthropic", "Claude 4 Released by Anthropic!"),
            1.0
        );
        assert_eq!(title_similarity("a b c d", "a b c e"), 3.0 / 5.0);
        assert_eq!(title_similarity("", ""), 0.0);
    }

    #[test]
    fn test_keeps_higher_scored_duplicate() {
        let out = dedupe(
            vec![
                item("Claude 4 Released by Anthropic", 50.0),
                item("Unrelated story about Rust", 40.0),
                item("Claude 4 Released by Anthropic!", 80.0),
            ],
            DEFAULT_SIMILARITY_THRESHOLD,
        );
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].title, "Claude 4 Released by Anthropic!");
        assert_eq!(out[0].scores.total, 80.0);
        assert_eq!(out[1].title, "Unrelated story about Rust");
    }

    #[test]
    fn test_tie_keeps_earlier() {
        let out = dedupe(
            vec![item("Same headline here", 10.0), item("same headline here.", 10.0)],
            DEFAULT_SIMILARITY_THRESHOLD,
        );
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].title, "Same headline here");
    }

    #[test]
    fn test_threshold_is_strict() {
        // 4 shared of 5 total words: similarity exactly 0.8
        let out = dedupe(vec![item("a b c d", 1.0), item("a b c d e", 2.0)], 0.8);
        assert_eq!(out.len(), 2);
    }

    #[test]
    fn test_empty_titles_never_duplicates() {
        let out = dedupe(
            vec![item("!!!", 1.0), item("...", 2.0)],
            DEFAULT_SIMILARITY_THRESHOLD,
        );
        assert_eq!(out.len(), 2);
    }

    proptest! {
        #[test]
        fn prop_dedupe_output_is_subset(titles in proptest::collection::vec("[a-d ]{0,12}", 0..20)) {
            let items: Vec<NewsItem> = titles
                .iter()
                .enumerate()
                .map(|(i, t)| {
                    let mut it = item(t, i as f64);
                    it.id = i.to_string();
                    it
                })
                .collect();
            let ids: HashSet<String> = items.iter().map(|i| i.id.clone()).collect();

            let out = dedupe(items.clone(), DEFAULT_SIMILARITY_THRESHOLD);
            prop_assert!(out.len() <= items.len());
            for kept in &out {
                prop_assert!(ids.contains(&kept.id));
            }
        }

        #[test]
        fn prop_similarity_symmetric_and_bounded(a in "[a-z ]{0,20}", b in "[a-z ]{0,20}") {
            let ab = title_similarity(&a, &b);
            prop_assert!((0.0..=1.0).contains(&ab));
            prop_assert_eq!(ab, title_similarity(&b, &a));
        }
    }
}
