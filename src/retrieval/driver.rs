use futures::{Stream, stream};
use log::debug;

use super::{Page, PageFetcher};
use crate::error::Result;

#[derive(Debug, Clone, Copy)]
struct Cursor {
    offset: u64,
    /// Stopping bound, captured from the first response only
    total: Option<u64>,
}

/// Lazily page through every match in `index`.
///
/// The first page is always requested. Its `total_count` becomes the fixed
/// bound for the whole index: later responses are not consulted, so if the
/// matching set changes mid-extraction the driver may under- or over-fetch
/// relative to the live index. Resuming requires starting over at offset 0.
pub fn extract_all<'a, F: PageFetcher>(
    fetcher: &'a F,
    index: &'a str,
) -> impl Stream<Item = Result<Page>> + 'a {
    let initial = Cursor {
        offset: 0,
        total: None,
    };

    stream::try_unfold(initial, move |cursor| next_page(fetcher, index, cursor))
}

async fn next_page<F: PageFetcher>(
    fetcher: &F,
    index: &str,
    cursor: Cursor,
) -> Result<Option<(Page, Cursor)>> {
    if let Some(total) = cursor.total {
        if cursor.offset >= total {
            debug!("index: {}, reached total {}, stopping", index, total);
            return Ok(None);
        }
    }

    let page = fetcher.fetch(index, cursor.offset).await?;
    let next = Cursor {
        offset: cursor.offset + fetcher.page_size(),
        total: cursor.total.or(Some(page.total_count)),
    };
    Ok(Some((page, next)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ExportError;
    use crate::retrieval::testing::ScriptedFetcher;
    use futures::TryStreamExt;

    async fn collect(fetcher: &ScriptedFetcher, index: &str) -> Result<Vec<Page>> {
        extract_all(fetcher, index).try_collect().await
    }

    #[tokio::test]
    async fn test_partial_last_page() {
        let fetcher = ScriptedFetcher::new(10_000, 25_000);
        let pages = collect(&fetcher, "infra-2022.08.01").await.unwrap();

        assert_eq!(fetcher.offsets(), vec![0, 10_000, 20_000]);
        assert_eq!(pages.len(), 3);
        let sizes: Vec<_> = pages.iter().map(|p| p.records.len()).collect();
        assert_eq!(sizes, vec![10_000, 10_000, 5_000]);
        assert!(pages.iter().all(|p| p.total_count == 25_000));
    }

    #[tokio::test]
    async fn test_exact_multiple() {
        let fetcher = ScriptedFetcher::new(4, 12);
        let pages = collect(&fetcher, "idx").await.unwrap();

        assert_eq!(fetcher.offsets(), vec![0, 4, 8]);
        assert_eq!(pages.last().unwrap().records.len(), 4);
    }

    #[tokio::test]
    async fn test_fetch_count_is_ceil_of_total_over_page_size() {
        for (total, page_size) in [(1, 3), (2, 3), (3, 3), (4, 3), (7, 1), (10, 4)] {
            let fetcher = ScriptedFetcher::new(page_size, total);
            let pages = collect(&fetcher, "idx").await.unwrap();
            let expected = (total as u64).div_ceil(page_size);
            assert_eq!(pages.len() as u64, expected, "T={} P={}", total, page_size);
            let expected_offsets: Vec<u64> = (0..expected).map(|i| i * page_size).collect();
            assert_eq!(fetcher.offsets(), expected_offsets);
        }
    }

    #[tokio::test]
    async fn test_empty_index_issues_single_request() {
        let fetcher = ScriptedFetcher::new(10_000, 0);
        let pages = collect(&fetcher, "idx").await.unwrap();

        assert_eq!(fetcher.offsets(), vec![0]);
        assert_eq!(pages.len(), 1);
        assert!(pages[0].records.is_empty());
        assert_eq!(pages[0].total_count, 0);
    }

    #[tokio::test]
    async fn test_total_is_snapshotted_from_first_page() {
        // Index grows to 100 matches after the first response; the bound stays 5
        let mut fetcher = ScriptedFetcher::new(2, 5);
        fetcher.later_total = Some(100);
        collect(&fetcher, "idx").await.unwrap();
        assert_eq!(fetcher.offsets(), vec![0, 2, 4]);

        // Index shrinks to 1 match; the driver still walks the original bound
        let mut fetcher = ScriptedFetcher::new(2, 5);
        fetcher.later_total = Some(1);
        collect(&fetcher, "idx").await.unwrap();
        assert_eq!(fetcher.offsets(), vec![0, 2, 4]);
    }

    #[tokio::test]
    async fn test_records_preserve_backend_order() {
        let fetcher = ScriptedFetcher::new(3, 8);
        let pages = collect(&fetcher, "idx").await.unwrap();
        let logs: Vec<String> = pages
            .into_iter()
            .flat_map(|p| p.records)
            .map(|r| r.log)
            .collect();
        let expected: Vec<String> = (0..8).map(|i| format!("line {}", i)).collect();
        assert_eq!(logs, expected);
    }

    #[tokio::test]
    async fn test_failure_stops_extraction() {
        let mut fetcher = ScriptedFetcher::new(2, 10);
        fetcher.fail_at = Some(4);

        let mut pages = std::pin::pin!(extract_all(&fetcher, "idx"));
        assert!(pages.try_next().await.unwrap().is_some());
        assert!(pages.try_next().await.unwrap().is_some());
        assert!(matches!(
            pages.try_next().await,
            Err(ExportError::Backend { .. })
        ));
        assert_eq!(fetcher.offsets(), vec![0, 2, 4]);
    }
}
