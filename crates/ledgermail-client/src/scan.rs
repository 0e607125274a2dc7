//! Paginated enumeration.
//!
//! Walks a paged record stream, concatenating records that pass `filter`
//! until `limit` is reached, `breaker` fires, or the stream ends. The
//! enumerator knows nothing about record semantics; the mailbox codec
//! reuses it unmodified.
//!
//! An unlimited scan can walk the full history behind a query, issuing
//! thousands of requests. Use it wisely.

use async_trait::async_trait;

use ledgermail_core::AccountId;

use crate::error::Result;
use crate::ledger::{Ledger, Page, TransactionRecord};
use crate::network::NetworkContext;

/// The external API's maximum page size.
pub const MAX_PAGE_SIZE: usize = 200;

/// A paged source of records.
#[async_trait]
pub trait PageSource<R>: Send + Sync {
    /// Fetch one page of at most `limit` records starting at `cursor`.
    async fn page(&self, cursor: Option<String>, limit: usize) -> Result<Page<R>>;
}

/// A per-record predicate. May suspend; calls are strictly sequential
/// in arrival order.
#[async_trait]
pub trait ScanPredicate<R>: Send + Sync {
    async fn test(&self, record: &R) -> bool;
}

/// Plain closures are predicates.
#[async_trait]
impl<R, F> ScanPredicate<R> for F
where
    R: Sync,
    F: Fn(&R) -> bool + Send + Sync,
{
    async fn test(&self, record: &R) -> bool {
        self(record)
    }
}

/// Enumeration policies.
#[derive(Default)]
pub struct ScanOptions<'a, R> {
    /// Maximum number of records to return.
    pub limit: Option<usize>,
    /// Inclusion predicate; default includes every record.
    pub filter: Option<&'a dyn ScanPredicate<R>>,
    /// Early-stop predicate; the triggering record is excluded.
    pub breaker: Option<&'a dyn ScanPredicate<R>>,
}

impl<'a, R> ScanOptions<'a, R> {
    /// No limit, no filter, no breaker.
    pub fn all() -> Self {
        Self {
            limit: None,
            filter: None,
            breaker: None,
        }
    }

    /// Only a result-count limit.
    pub fn limited(limit: usize) -> Self {
        Self {
            limit: Some(limit),
            ..Self::all()
        }
    }
}

/// Enumerate `source` under `options`.
///
/// Without filter or breaker, pages are concatenated verbatim and the
/// final page is sliced to the exact remaining count; no page beyond the
/// one needed is fetched. With a filter or breaker, each record is tested
/// in arrival order: breaker first (stop, excluding the trigger), then
/// filter. Both strategies stop on an empty page.
pub async fn scan<R>(source: &dyn PageSource<R>, options: ScanOptions<'_, R>) -> Result<Vec<R>>
where
    R: Send + Sync,
{
    let page_size = match options.limit {
        Some(limit) => limit.min(MAX_PAGE_SIZE),
        None => MAX_PAGE_SIZE,
    };

    if options.filter.is_some() || options.breaker.is_some() {
        scan_with_breakpoints(source, page_size, options).await
    } else {
        scan_plain(source, page_size, options.limit).await
    }
}

async fn scan_plain<R>(
    source: &dyn PageSource<R>,
    page_size: usize,
    limit: Option<usize>,
) -> Result<Vec<R>>
where
    R: Send + Sync,
{
    let mut records: Vec<R> = Vec::new();
    let mut page = source.page(None, page_size).await?;

    while !page.records.is_empty() {
        if let Some(limit) = limit {
            let length = records.len() + page.records.len();
            if length >= limit {
                let take = limit - records.len();
                records.extend(page.records.into_iter().take(take));
                return Ok(records);
            }
        }
        records.extend(page.records);

        let cursor = match page.next_cursor {
            Some(cursor) => cursor,
            None => break,
        };
        page = source.page(Some(cursor), page_size).await?;
    }

    Ok(records)
}

async fn scan_with_breakpoints<R>(
    source: &dyn PageSource<R>,
    page_size: usize,
    options: ScanOptions<'_, R>,
) -> Result<Vec<R>>
where
    R: Send + Sync,
{
    let mut records: Vec<R> = Vec::new();
    let mut page = source.page(None, page_size).await?;

    while !page.records.is_empty() {
        for record in page.records {
            if let Some(limit) = options.limit {
                if records.len() == limit {
                    return Ok(records);
                }
            }
            if let Some(breaker) = options.breaker {
                if breaker.test(&record).await {
                    return Ok(records);
                }
            }
            if let Some(filter) = options.filter {
                if !filter.test(&record).await {
                    continue;
                }
            }
            records.push(record);
        }

        let cursor = match page.next_cursor {
            Some(cursor) => cursor,
            None => break,
        };
        page = source.page(Some(cursor), page_size).await?;
    }

    Ok(records)
}

/// Adapter: the transactions-affecting-an-account query as a page source.
pub struct LedgerTransactions<'a> {
    ledger: &'a dyn Ledger,
    account: AccountId,
    ctx: &'a NetworkContext,
}

impl<'a> LedgerTransactions<'a> {
    pub fn new(ledger: &'a dyn Ledger, account: AccountId, ctx: &'a NetworkContext) -> Self {
        Self {
            ledger,
            account,
            ctx,
        }
    }
}

#[async_trait]
impl PageSource<TransactionRecord> for LedgerTransactions<'_> {
    async fn page(&self, cursor: Option<String>, limit: usize) -> Result<Page<TransactionRecord>> {
        self.ledger
            .transactions_page(&self.account, cursor, limit, self.ctx)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// A page source over a fixed vector, counting fetches.
    struct VecSource {
        items: Vec<u32>,
        fetches: AtomicUsize,
    }

    impl VecSource {
        fn new(count: u32) -> Self {
            Self {
                items: (0..count).collect(),
                fetches: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl PageSource<u32> for VecSource {
        async fn page(&self, cursor: Option<String>, limit: usize) -> Result<Page<u32>> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            let start: usize = cursor.map(|c| c.parse().unwrap()).unwrap_or(0);
            let end = (start + limit).min(self.items.len());
            let records = self.items[start..end].to_vec();
            let next_cursor = (end < self.items.len()).then(|| end.to_string());
            Ok(Page {
                records,
                next_cursor,
            })
        }
    }

    #[tokio::test]
    async fn test_limit_law() {
        let source = VecSource::new(450);
        for limit in [1, 199, 200, 201, 450] {
            let records = scan(&source, ScanOptions::limited(limit)).await.unwrap();
            assert_eq!(records.len(), limit);
        }
        // Limit above the total yields the total.
        let records = scan(&source, ScanOptions::limited(1000)).await.unwrap();
        assert_eq!(records.len(), 450);
    }

    #[tokio::test]
    async fn test_unfiltered_stops_at_needed_page() {
        let source = VecSource::new(1000);
        let records = scan(&source, ScanOptions::limited(250)).await.unwrap();
        assert_eq!(records.len(), 250);
        // 200-record pages: exactly two fetches, never a third.
        assert_eq!(source.fetches.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_unlimited_walks_everything() {
        let source = VecSource::new(401);
        let records = scan(&source, ScanOptions::all()).await.unwrap();
        assert_eq!(records, (0..401).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn test_filter_selects_in_order() {
        let source = VecSource::new(500);
        let even = |r: &u32| r % 2 == 0;
        let records = scan(
            &source,
            ScanOptions {
                limit: Some(10),
                filter: Some(&even),
                breaker: None,
            },
        )
        .await
        .unwrap();
        assert_eq!(records, vec![0, 2, 4, 6, 8, 10, 12, 14, 16, 18]);
    }

    #[tokio::test]
    async fn test_breaker_law() {
        let source = VecSource::new(500);
        let breaker = |r: &u32| *r == 7;
        let odd = |r: &u32| r % 2 == 1;
        let records = scan(
            &source,
            ScanOptions {
                limit: None,
                filter: Some(&odd),
                breaker: Some(&breaker),
            },
        )
        .await
        .unwrap();
        // Records before position 7 that pass the filter; the trigger is
        // excluded.
        assert_eq!(records, vec![1, 3, 5]);
    }

    #[tokio::test]
    async fn test_breaker_crosses_page_boundary() {
        let source = VecSource::new(500);
        let breaker = |r: &u32| *r == 350;
        let records = scan(
            &source,
            ScanOptions {
                limit: None,
                filter: None,
                breaker: Some(&breaker),
            },
        )
        .await
        .unwrap();
        assert_eq!(records.len(), 350);
    }

    #[tokio::test]
    async fn test_empty_stream() {
        let source = VecSource::new(0);
        let records = scan(&source, ScanOptions::all()).await.unwrap();
        assert!(records.is_empty());
    }
}
