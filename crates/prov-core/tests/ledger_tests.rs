use prov_core::{InMemoryLedger, LedgerBackend, LedgerError, TxId, WriteOutcome};
use prov_domain::{AccountId, ContentHash, ImageRef};

fn name(s: &str) -> ImageRef {
    ImageRef::new(s).unwrap()
}

fn hash(s: &str) -> ContentHash {
    ContentHash::new(s).unwrap()
}

fn acct(s: &str) -> AccountId {
    AccountId::new(s).unwrap()
}

// Drives a submit through confirmation, like the queue worker does
async fn register(ledger: &InMemoryLedger,
                  n: &str,
                  h: &str,
                  a: &AccountId)
                  -> Result<TxId, LedgerError> {
    let pending = ledger.submit(&name(n), &hash(h), a).await?;
    match pending.await_confirmation().await? {
        WriteOutcome::Confirmed(tx) => Ok(tx),
        WriteOutcome::Rejected(e) => Err(e),
    }
}

#[tokio::test]
async fn register_then_lookup_round_trip() {
    let ledger = InMemoryLedger::new();
    let a = acct("0xaaa");
    register(&ledger, "demo:v1", "sha256:aaa", &a).await.unwrap();

    let rec = ledger.lookup(&name("demo:v1")).await.unwrap().expect("record should exist");
    assert_eq!(rec.content_hash.as_str(), "sha256:aaa");
    assert_eq!(rec.owner, a);
}

#[tokio::test]
async fn lookup_absent_returns_none() {
    let ledger = InMemoryLedger::new();
    assert!(ledger.lookup(&name("unknown:v1")).await.unwrap().is_none());
}

#[tokio::test]
async fn different_identity_is_rejected_and_record_untouched() {
    let ledger = InMemoryLedger::new();
    let a = acct("0xaaa");
    let b = acct("0xbbb");
    register(&ledger, "demo:v1", "sha256:aaa", &a).await.unwrap();

    let err = register(&ledger, "demo:v1", "sha256:bbb", &b).await.unwrap_err();
    assert!(matches!(err, LedgerError::OwnershipConflict { .. }));

    let rec = ledger.lookup(&name("demo:v1")).await.unwrap().unwrap();
    assert_eq!(rec.content_hash.as_str(), "sha256:aaa");
    assert_eq!(rec.owner, a);
}

#[tokio::test]
async fn owner_may_update_hash() {
    let ledger = InMemoryLedger::new();
    let a = acct("0xaaa");
    register(&ledger, "demo:v1", "sha256:aaa", &a).await.unwrap();
    register(&ledger, "demo:v1", "sha256:bbb", &a).await.unwrap();

    let rec = ledger.lookup(&name("demo:v1")).await.unwrap().unwrap();
    assert_eq!(rec.content_hash.as_str(), "sha256:bbb");
    assert_eq!(rec.owner, a);
}

#[tokio::test]
async fn idempotent_re_attestation_same_owner_same_hash() {
    let ledger = InMemoryLedger::new();
    let a = acct("0xaaa");
    register(&ledger, "demo:v1", "sha256:aaa", &a).await.unwrap();
    register(&ledger, "demo:v1", "sha256:aaa", &a).await.unwrap();

    let rec = ledger.lookup(&name("demo:v1")).await.unwrap().unwrap();
    assert_eq!(rec.content_hash.as_str(), "sha256:aaa");
    // Both accepted writes leave an audit event
    assert_eq!(ledger.events().len(), 2);
}

#[tokio::test]
async fn accepted_write_emits_audit_event() {
    let ledger = InMemoryLedger::new();
    let mut rx = ledger.subscribe();
    let a = acct("0xaaa");
    let tx = register(&ledger, "demo:v1", "sha256:aaa", &a).await.unwrap();

    let ev = rx.recv().await.unwrap();
    assert_eq!(ev.name.as_str(), "demo:v1");
    assert_eq!(ev.content_hash.as_str(), "sha256:aaa");
    assert_eq!(ev.owner, a);
    assert_eq!(ev.tx_id, tx);

    let stored = ledger.events();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].tx_id, tx);
}

#[tokio::test]
async fn rejected_write_emits_no_event() {
    let ledger = InMemoryLedger::new();
    let a = acct("0xaaa");
    let b = acct("0xbbb");
    register(&ledger, "demo:v1", "sha256:aaa", &a).await.unwrap();
    let _ = register(&ledger, "demo:v1", "sha256:bbb", &b).await;
    assert_eq!(ledger.events().len(), 1);
}

#[tokio::test]
async fn names_compare_byte_for_byte() {
    // Case-sensitive keys: "Demo:v1" and "demo:v1" are distinct records
    let ledger = InMemoryLedger::new();
    let a = acct("0xaaa");
    register(&ledger, "demo:v1", "sha256:aaa", &a).await.unwrap();
    register(&ledger, "Demo:v1", "sha256:bbb", &a).await.unwrap();

    assert_eq!(ledger.lookup(&name("demo:v1")).await.unwrap().unwrap().content_hash.as_str(),
               "sha256:aaa");
    assert_eq!(ledger.lookup(&name("Demo:v1")).await.unwrap().unwrap().content_hash.as_str(),
               "sha256:bbb");
}

#[tokio::test]
async fn tx_ids_are_deterministic_per_position() {
    let l1 = InMemoryLedger::new();
    let l2 = InMemoryLedger::new();
    let a = acct("0xaaa");
    let t1 = register(&l1, "demo:v1", "sha256:aaa", &a).await.unwrap();
    let t2 = register(&l2, "demo:v1", "sha256:aaa", &a).await.unwrap();
    assert_eq!(t1, t2);
    assert!(t1.as_str().starts_with("0x"));
}
