//! JSON API adapters.
//!
//! Both adapters issue several sub-requests per cycle (one per query or
//! per endpoint), fan them out concurrently, and merge whatever succeeded.
//! A source only counts as failed when every sub-request failed.

mod listing;
mod search;

use std::collections::HashSet;

use crate::error::SourceError;
use crate::types::RawItem;

pub use listing::ListingAdapter;
pub use search::SearchAdapter;

/// Merges per-request outcomes, logging failures and dropping repeated
/// native ids (first occurrence wins).
///
/// # Errors
///
/// [`SourceError::AllRequestsFailed`] when there was at least one request
/// and none of them succeeded.
fn merge_responses(
    source: &str,
    responses: Vec<(String, Result<Vec<RawItem>, SourceError>)>,
) -> Result<Vec<RawItem>, SourceError> {
    let total = responses.len();
    let mut failed = 0;
    let mut seen = HashSet::new();
    let mut merged = Vec::new();

    for (url, result) in responses {
        match result {
            Ok(items) => {
                for item in items {
                    let fresh = match &item.native_id {
                        Some(id) => seen.insert(id.clone()),
                        None => true,
                    };
                    if fresh {
                        merged.push(item);
                    }
                }
            }
            Err(e) => {
                failed += 1;
                tracing::warn!(source = %source, url = %url, error = %e, "API request failed");
            }
        }
    }

    if total > 0 && failed == total {
        return Err(SourceError::AllRequestsFailed { failed });
    }

    if failed > 0 {
        tracing::info!(
            source = %source,
            failed,
            succeeded = total - failed,
            "Partial API results merged"
        );
    }

    Ok(merged)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::FetchError;

    fn item(id: &str, title: &str) -> RawItem {
        RawItem {
            title: title.to_string(),
            link: format!("https://example.com/{id}"),
            native_id: Some(id.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_merge_dedups_by_native_id() {
        let merged = merge_responses(
            "test",
            vec![
                ("a".into(), Ok(vec![item("1", "first"), item("2", "second")])),
                ("b".into(), Ok(vec![item("2", "repeat"), item("3", "third")])),
            ],
        )
        .unwrap();

        let titles: Vec<_> = merged.iter().map(|i| i.title.as_str()).collect();
        assert_eq!(titles, vec!["first", "second", "third"]);
    }

    #[test]
    fn test_merge_partial_failure_is_ok() {
        let merged = merge_responses(
            "test",
            vec![
                ("a".into(), Err(FetchError::HttpStatus(500).into())),
                ("b".into(), Ok(vec![item("1", "survivor")])),
            ],
        )
        .unwrap();
        assert_eq!(merged.len(), 1);
    }

    #[test]
    fn test_merge_all_failed() {
        let result = merge_responses(
            "test",
            vec![
                ("a".into(), Err(FetchError::HttpStatus(500).into())),
                ("b".into(), Err(FetchError::HttpStatus(404).into())),
            ],
        );
        assert!(matches!(
            result,
            Err(SourceError::AllRequestsFailed { failed: 2 })
        ));
    }

    #[test]
    fn test_merge_keeps_items_without_native_id() {
        let mut a = item("x", "one");
        a.native_id = None;
        let mut b = item("y", "two");
        b.native_id = None;
        let merged = merge_responses("test", vec![("a".into(), Ok(vec![a, b]))]).unwrap();
        assert_eq!(merged.len(), 2);
    }
}
