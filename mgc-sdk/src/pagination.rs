//! Offset/limit paging

use std::future::Future;

/// Page size used by the `list_all_*` helpers
pub const DEFAULT_PAGE_LIMIT: u32 = 25;

/// Fetch every page of a listing
///
/// `fetch(offset, limit)` is called with a growing offset until it returns a
/// page shorter than `limit`. Items are concatenated in page order. A zero
/// limit is treated as one.
pub async fn paginate<T, E, F, Fut>(limit: u32, mut fetch: F) -> Result<Vec<T>, E>
where
    F: FnMut(u32, u32) -> Fut,
    Fut: Future<Output = Result<Vec<T>, E>>,
{
    let limit = limit.max(1);
    let mut offset = 0;
    let mut items = Vec::new();

    loop {
        let page = fetch(offset, limit).await?;
        let len = page.len();
        items.extend(page);
        if len < limit as usize {
            return Ok(items);
        }
        offset += limit;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::convert::Infallible;

    /// Pages over `0..total`, recording every (offset, limit) request
    async fn collect(total: u32, limit: u32) -> (Vec<u32>, Vec<(u32, u32)>) {
        let calls = RefCell::new(Vec::new());
        let items = paginate(limit, |offset, limit| {
            calls.borrow_mut().push((offset, limit));
            let page: Vec<u32> = (offset..total.min(offset + limit)).collect();
            async move { Ok::<_, Infallible>(page) }
        })
        .await
        .unwrap();
        (items, calls.into_inner())
    }

    #[tokio::test]
    async fn concatenates_pages_in_order() {
        let (items, calls) = collect(7, 3).await;
        assert_eq!(items, (0..7).collect::<Vec<_>>());
        assert_eq!(calls, vec![(0, 3), (3, 3), (6, 3)]);
    }

    #[tokio::test]
    async fn request_count_is_ceil_of_total_over_limit() {
        for (total, limit) in [(1, 25), (24, 25), (26, 25), (99, 10), (11, 2)] {
            let (items, calls) = collect(total, limit).await;
            assert_eq!(items.len() as u32, total);
            assert_eq!(calls.len() as u32, total.div_ceil(limit), "total={total} limit={limit}");
        }
    }

    #[tokio::test]
    async fn exact_multiple_needs_a_trailing_empty_page() {
        let (items, calls) = collect(6, 3).await;
        assert_eq!(items.len(), 6);
        assert_eq!(calls.len(), 3);
    }

    #[tokio::test]
    async fn empty_listing_issues_one_request() {
        let (items, calls) = collect(0, 5).await;
        assert!(items.is_empty());
        assert_eq!(calls, vec![(0, 5)]);
    }

    #[tokio::test]
    async fn errors_stop_paging() {
        let mut calls = 0;
        let result: Result<Vec<u32>, &str> = paginate(2, |offset, _| {
            calls += 1;
            async move {
                if offset == 0 {
                    Ok(vec![1, 2])
                } else {
                    Err("boom")
                }
            }
        })
        .await;
        assert_eq!(result, Err("boom"));
        assert_eq!(calls, 2);
    }
}
