//! Mailbox delivery and retrieval.
//!
//! `send` assembles, signs and submits a delivery; `list`/`list_raw`
//! enumerate a mailbox's history through the paginated scanner; `find`
//! fetches the first matching record; `read` decodes a single known
//! transaction.

use async_trait::async_trait;

use ledgermail_client::{
    scan, Ledger, LedgerTransactions, NetworkContext, ScanOptions, ScanPredicate, SubmitResponse,
    TransactionRecord,
};
use ledgermail_core::{AccountId, Keypair, Tag};

use crate::codec::{decode, encode, Destinations, MailboxMessage, Truncation};
use crate::error::Result;

/// Retrieval policies, forwarded to the scanner.
#[derive(Default)]
pub struct ListOptions<'a> {
    /// Maximum number of records to consider.
    pub limit: Option<usize>,
    /// Caller's record filter, composed with the payload-bearing check.
    pub filter: Option<&'a dyn ScanPredicate<TransactionRecord>>,
    /// Early-stop predicate; the triggering record is excluded.
    pub breaker: Option<&'a dyn ScanPredicate<TransactionRecord>>,
}

/// Baseline filter: a delivery has at least a touch and a chunk. Bare
/// touch records never decode to a message, so they are skipped before
/// the caller's filter runs.
struct PayloadBearing<'a> {
    extra: Option<&'a dyn ScanPredicate<TransactionRecord>>,
}

#[async_trait]
impl ScanPredicate<TransactionRecord> for PayloadBearing<'_> {
    async fn test(&self, record: &TransactionRecord) -> bool {
        if record.operation_count < 2 {
            return false;
        }
        match self.extra {
            Some(filter) => filter.test(record).await,
            None => true,
        }
    }
}

/// Sign and submit a delivery from `keypair`'s account.
pub async fn send(
    ledger: &dyn Ledger,
    ctx: &NetworkContext,
    keypair: &Keypair,
    destinations: &Destinations,
    tag: Tag,
    payload: &[u8],
) -> Result<(SubmitResponse, Option<Truncation>)> {
    let sender = ledger.load_account(&keypair.account_id(), ctx).await?;
    let (mut tx, truncation) = encode(ledger, ctx, &sender, destinations, tag, payload).await?;
    tx.sign(keypair);
    let response = ledger.submit(&tx, ctx).await?;
    Ok((response, truncation))
}

/// Enumerate raw delivery records affecting `mailbox`, most recent
/// first. A never-funded mailbox short-circuits to empty without a
/// history query.
pub async fn list_raw(
    ledger: &dyn Ledger,
    ctx: &NetworkContext,
    mailbox: &AccountId,
    options: ListOptions<'_>,
) -> Result<Vec<TransactionRecord>> {
    if !ledger.account_exists(mailbox, ctx).await? {
        return Ok(Vec::new());
    }

    let filter = PayloadBearing {
        extra: options.filter,
    };
    let source = LedgerTransactions::new(ledger, mailbox.clone(), ctx);
    let records = scan(
        &source,
        ScanOptions {
            limit: options.limit,
            filter: Some(&filter),
            breaker: options.breaker,
        },
    )
    .await?;
    Ok(records)
}

/// Enumerate and decode `mailbox` deliveries. Records that carry no
/// payload are dropped; malformed envelopes fail the whole call.
pub async fn list(
    ledger: &dyn Ledger,
    ctx: &NetworkContext,
    mailbox: &AccountId,
    options: ListOptions<'_>,
) -> Result<Vec<MailboxMessage>> {
    let records = list_raw(ledger, ctx, mailbox, options).await?;
    let mut messages = Vec::with_capacity(records.len());
    for record in &records {
        if let Some(message) = decode(record)? {
            messages.push(message);
        }
    }
    Ok(messages)
}

/// The most recent record matching `predicate`, if any.
pub async fn find(
    ledger: &dyn Ledger,
    ctx: &NetworkContext,
    mailbox: &AccountId,
    predicate: &dyn ScanPredicate<TransactionRecord>,
) -> Result<Option<TransactionRecord>> {
    let records = list_raw(
        ledger,
        ctx,
        mailbox,
        ListOptions {
            limit: Some(1),
            filter: Some(predicate),
            breaker: None,
        },
    )
    .await?;
    Ok(records.into_iter().next())
}

/// Decode a single known transaction by digest hex.
pub async fn read(
    ledger: &dyn Ledger,
    ctx: &NetworkContext,
    hash: &str,
) -> Result<Option<MailboxMessage>> {
    match ledger.transaction_by_hash(hash, ctx).await? {
        Some(record) => decode(&record),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use ledgermail_client::MemoryLedger;

    async fn funded(ledger: &MemoryLedger, ctx: &NetworkContext) -> Keypair {
        let keypair = Keypair::generate();
        ledger.create_account(ctx, &keypair.account_id());
        keypair
    }

    #[tokio::test]
    async fn test_send_then_list_roundtrip() {
        let ledger = MemoryLedger::new();
        let ctx = NetworkContext::test();
        let sender = funded(&ledger, &ctx).await;
        let mailbox = Keypair::generate().account_id();

        let payload = (0u8..=255).collect::<Vec<_>>().repeat(3);
        send(
            &ledger,
            &ctx,
            &sender,
            &Destinations::from(mailbox.clone()),
            Tag::text("object name"),
            &payload,
        )
        .await
        .unwrap();

        let messages = list(&ledger, &ctx, &mailbox, ListOptions::default())
            .await
            .unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].sender, sender.account_id());
        assert_eq!(messages[0].tag, "object name");
        assert_eq!(messages[0].payload, Bytes::from(payload));
    }

    #[tokio::test]
    async fn test_unfunded_mailbox_lists_empty() {
        let ledger = MemoryLedger::new();
        let ctx = NetworkContext::test();
        let mailbox = Keypair::generate().account_id();

        let messages = list(&ledger, &ctx, &mailbox, ListOptions::default())
            .await
            .unwrap();
        assert!(messages.is_empty());
    }

    #[tokio::test]
    async fn test_bare_touch_records_are_skipped() {
        let ledger = MemoryLedger::new();
        let ctx = NetworkContext::test();
        let sender = funded(&ledger, &ctx).await;
        let mailbox = Keypair::generate().account_id();

        // A delivery with no payload is a single touch operation.
        send(
            &ledger,
            &ctx,
            &sender,
            &Destinations::from(mailbox.clone()),
            Tag::None,
            b"",
        )
        .await
        .unwrap();
        send(
            &ledger,
            &ctx,
            &sender,
            &Destinations::from(mailbox.clone()),
            Tag::text("real"),
            b"payload",
        )
        .await
        .unwrap();

        let records = list_raw(&ledger, &ctx, &mailbox, ListOptions::default())
            .await
            .unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].memo, "real");
    }

    #[tokio::test]
    async fn test_find_returns_most_recent_match() {
        let ledger = MemoryLedger::new();
        let ctx = NetworkContext::test();
        let sender = funded(&ledger, &ctx).await;
        let mailbox = Keypair::generate().account_id();

        for name in ["first", "second"] {
            send(
                &ledger,
                &ctx,
                &sender,
                &Destinations::from(mailbox.clone()),
                Tag::text(name),
                b"x",
            )
            .await
            .unwrap();
        }

        let text = |r: &TransactionRecord| r.memo_type == "text";
        let found = find(&ledger, &ctx, &mailbox, &text).await.unwrap();
        // History is most recent first.
        assert_eq!(found.unwrap().memo, "second");
    }

    #[tokio::test]
    async fn test_read_by_hash() {
        let ledger = MemoryLedger::new();
        let ctx = NetworkContext::test();
        let sender = funded(&ledger, &ctx).await;
        let mailbox = Keypair::generate().account_id();

        let (response, _) = send(
            &ledger,
            &ctx,
            &sender,
            &Destinations::from(mailbox),
            Tag::text("direct"),
            b"payload",
        )
        .await
        .unwrap();

        let message = read(&ledger, &ctx, &response.hash).await.unwrap().unwrap();
        assert_eq!(message.tag, "direct");
        assert_eq!(message.payload, Bytes::from_static(b"payload"));

        let missing = read(&ledger, &ctx, &"ff".repeat(32)).await.unwrap();
        assert!(missing.is_none());
    }
}
