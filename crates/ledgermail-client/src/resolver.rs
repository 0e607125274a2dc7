//! Address resolution.
//!
//! Resolves canonical identifiers and federated aliases to accounts.
//! Federated lookups are cached for a bounded time-to-live; concurrent
//! callers for the same unresolved address share one in-flight lookup.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, OnceCell};

use ledgermail_core::{AccountId, SignerKey, Transaction};

use crate::error::{ClientError, Result};
use crate::ledger::{Account, Federation, FederatedAccount, Ledger};
use crate::network::NetworkContext;

/// How long resolved addresses stay cached. Five minutes keeps stale
/// federation entries from outliving a directory update for long.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(300);

type CacheCell = Arc<OnceCell<FederatedAccount>>;

/// Federated address resolver with a coalescing TTL cache.
pub struct Resolver<F: Federation> {
    federation: Arc<F>,
    ttl: Duration,
    cache: Arc<Mutex<HashMap<String, CacheCell>>>,
}

impl<F: Federation + 'static> Resolver<F> {
    /// Create a resolver with the default TTL.
    pub fn new(federation: Arc<F>) -> Self {
        Self::with_ttl(federation, DEFAULT_CACHE_TTL)
    }

    /// Create a resolver with a custom TTL.
    pub fn with_ttl(federation: Arc<F>, ttl: Duration) -> Self {
        Self {
            federation,
            ttl,
            cache: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Resolve `address` to its account identifier.
    ///
    /// Canonical identifiers pass through without a lookup. Federated
    /// aliases hit the cache: an unexpired entry (resolved or in-flight)
    /// is shared; a miss triggers exactly one federation lookup whose
    /// eviction is scheduled TTL after first insertion, regardless of
    /// later hits. A failed lookup propagates and leaves the entry
    /// retryable.
    pub async fn resolve(&self, address: &str) -> Result<FederatedAccount> {
        if AccountId::is_canonical(address) {
            return Ok(FederatedAccount {
                account_id: AccountId::new(address),
                memo: None,
                alias: None,
            });
        }
        if !is_federated(address) {
            return Err(ClientError::Resolution(format!(
                "invalid address: {}",
                shorter(address)
            )));
        }

        let cell = self.cache_entry(address).await;
        let resolved = cell
            .get_or_try_init(|| async {
                tracing::debug!(address, "federation lookup");
                self.federation.resolve(address).await
            })
            .await?;
        Ok(resolved.clone())
    }

    /// Resolve `address` and load its account from `ledger`.
    pub async fn resolve_account(
        &self,
        address: &str,
        ledger: &dyn Ledger,
        ctx: &NetworkContext,
    ) -> Result<Account> {
        let resolved = self.resolve(address).await?;
        ledger.load_account(&resolved.account_id, ctx).await
    }

    /// Fetch the cache cell for `address`, inserting one (and scheduling
    /// its eviction) on a miss.
    async fn cache_entry(&self, address: &str) -> CacheCell {
        let mut cache = self.cache.lock().await;
        if let Some(cell) = cache.get(address) {
            return Arc::clone(cell);
        }

        let cell: CacheCell = Arc::new(OnceCell::new());
        cache.insert(address.to_string(), Arc::clone(&cell));

        let map = Arc::clone(&self.cache);
        let key = address.to_string();
        let evicted = Arc::clone(&cell);
        let ttl = self.ttl;
        tokio::spawn(async move {
            tokio::time::sleep(ttl).await;
            let mut cache = map.lock().await;
            // Only evict the entry this task was scheduled for; a
            // re-inserted successor has its own timer.
            if let Some(current) = cache.get(&key) {
                if Arc::ptr_eq(current, &evicted) {
                    cache.remove(&key);
                }
            }
        });

        cell
    }
}

fn is_federated(address: &str) -> bool {
    match address.split_once('*') {
        Some((name, domain)) => !name.is_empty() && domain.contains('.'),
        None => false,
    }
}

fn shorter(address: &str) -> String {
    // Cut on a char boundary; addresses come from callers and may be
    // arbitrary UTF-8.
    match address.char_indices().nth(18) {
        Some((cut, _)) => format!("{}…", &address[..cut]),
        None => address.to_string(),
    }
}

/// The distinct source accounts of a transaction, in first-seen order.
///
/// Kept in the original's shape so per-operation source overrides can
/// slot in; the current operation model always yields the transaction
/// source alone.
pub fn tx_sources(tx: &Transaction) -> Vec<AccountId> {
    vec![tx.source.clone()]
}

/// The union of the signer keys of `accounts`, deduplicated by key in
/// first-seen order.
pub async fn signers_union(
    ledger: &dyn Ledger,
    ctx: &NetworkContext,
    accounts: &[AccountId],
) -> Result<Vec<SignerKey>> {
    let mut keys: Vec<SignerKey> = Vec::new();
    for id in accounts {
        let account = ledger.load_account(id, ctx).await?;
        for signer in &account.signers {
            if !keys.contains(&signer.key) {
                keys.push(signer.key);
            }
        }
    }
    Ok(keys)
}

/// Every signer key legitimate for `tx`: the union over its sources.
pub async fn tx_signers(
    ledger: &dyn Ledger,
    ctx: &NetworkContext,
    tx: &Transaction,
) -> Result<Vec<SignerKey>> {
    let sources = tx_sources(tx);
    signers_union(ledger, ctx, &sources).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingFederation {
        calls: AtomicUsize,
        fail: bool,
    }

    impl CountingFederation {
        fn new(fail: bool) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                fail,
            })
        }
    }

    #[async_trait]
    impl Federation for CountingFederation {
        async fn resolve(&self, address: &str) -> Result<FederatedAccount> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            // Let concurrent callers pile up on the in-flight lookup.
            tokio::time::sleep(Duration::from_millis(10)).await;
            if self.fail {
                return Err(ClientError::Resolution(address.to_string()));
            }
            Ok(FederatedAccount {
                account_id: AccountId::new("ab".repeat(32)),
                memo: None,
                alias: Some(address.to_string()),
            })
        }
    }

    #[tokio::test]
    async fn test_canonical_addresses_skip_lookup() {
        let federation = CountingFederation::new(false);
        let resolver = Resolver::new(Arc::clone(&federation));
        let id = "cd".repeat(32);
        let resolved = resolver.resolve(&id).await.unwrap();
        assert_eq!(resolved.account_id.as_str(), id);
        assert_eq!(federation.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_malformed_address_rejected() {
        let resolver = Resolver::new(CountingFederation::new(false));
        let err = resolver.resolve("not-an-address").await.unwrap_err();
        assert!(matches!(err, ClientError::Resolution(_)));
    }

    #[tokio::test]
    async fn test_malformed_multibyte_address_rejected() {
        let resolver = Resolver::new(CountingFederation::new(false));
        // 1 + 7×3 bytes; byte 18 lands inside the sixth '€'.
        let address = format!("a{}", "€".repeat(7));
        let err = resolver.resolve(&address).await.unwrap_err();
        assert!(matches!(err, ClientError::Resolution(_)));
    }

    #[tokio::test]
    async fn test_concurrent_lookups_coalesce() {
        let federation = CountingFederation::new(false);
        let resolver = Arc::new(Resolver::new(Arc::clone(&federation)));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let resolver = Arc::clone(&resolver);
            handles.push(tokio::spawn(async move {
                resolver.resolve("alice*example.org").await
            }));
        }
        for handle in handles {
            assert!(handle.await.unwrap().is_ok());
        }
        assert_eq!(federation.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failure_does_not_poison_cache() {
        let federation = CountingFederation::new(true);
        let resolver = Resolver::with_ttl(Arc::clone(&federation), Duration::from_secs(60));

        assert!(resolver.resolve("bob*example.org").await.is_err());
        assert!(resolver.resolve("bob*example.org").await.is_err());
        // Each sequential failure retried the lookup.
        assert_eq!(federation.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_eviction_is_wall_clock_from_insertion() {
        let federation = CountingFederation::new(false);
        let resolver = Resolver::with_ttl(Arc::clone(&federation), Duration::from_secs(300));

        resolver.resolve("carol*example.org").await.unwrap();
        assert_eq!(federation.calls.load(Ordering::SeqCst), 1);

        // Repeated hits inside the TTL window share the cached outcome.
        tokio::time::advance(Duration::from_secs(200)).await;
        tokio::task::yield_now().await;
        resolver.resolve("carol*example.org").await.unwrap();
        assert_eq!(federation.calls.load(Ordering::SeqCst), 1);

        // Past the TTL (counted from first insertion, not last use) a
        // fresh lookup is required.
        tokio::time::advance(Duration::from_secs(150)).await;
        tokio::task::yield_now().await;
        resolver.resolve("carol*example.org").await.unwrap();
        assert_eq!(federation.calls.load(Ordering::SeqCst), 2);
    }
}
