use core::num::NonZeroU32;

use chrono::{TimeZone, Utc};
use multisig_txp_domain::{
    KeyId, TxpId, WalletId,
    proposal::TransactionProposal,
    wallet::{Credentials, Key, Wallet},
};

use crate::{TxpStore, TxpStoreError};

fn key(id: &str) -> Key {
    Key::builder().id(id.into()).build()
}

fn wallet(id: &str, key_id: &str) -> Wallet {
    let m = NonZeroU32::new(2).expect("non-zero");
    let n = NonZeroU32::new(3).expect("non-zero");

    Wallet::builder()
        .id(id.into())
        .key_id(key_id.into())
        .copayer_id("copayer-b".into())
        .coin("btc".into())
        .chain("btc".into())
        .network("livenet".into())
        .credentials(Credentials::new(m, n).expect("valid credentials"))
        .balance(100_000)
        .build()
}

fn txp(id: &str, wallet_id: &str) -> TransactionProposal {
    TransactionProposal::builder()
        .id(id.into())
        .wallet_id(wallet_id.into())
        .creator_id("copayer-a".into())
        .copayer_id("copayer-b".into())
        .coin("btc".into())
        .chain("btc".into())
        .amount(1_000)
        .fee(100)
        .required_signatures(NonZeroU32::new(2).expect("non-zero"))
        .created_on(Utc.timestamp_opt(1_700_000_000, 0).single().expect("valid timestamp"))
        .build()
        .expect("valid proposal")
}

fn populated_store() -> TxpStore {
    let store = TxpStore::new();
    store.insert_key(key("key-1")).expect("insert key");
    store.insert_wallet(wallet("wallet-1", "key-1")).expect("insert wallet");
    store.insert_wallet(wallet("wallet-2", "key-1")).expect("insert wallet");
    store
}

#[test]
fn wallet_requires_registered_key() {
    let store = TxpStore::new();

    let err = store.insert_wallet(wallet("wallet-1", "missing")).unwrap_err();

    assert!(matches!(err, TxpStoreError::UnknownKey(key_id) if key_id == KeyId::from("missing")));
    assert_eq!(store.snapshot().revision(), 0);
}

#[test]
fn wallets_keep_registration_order() {
    let store = populated_store();
    store.insert_wallet(wallet("wallet-0", "key-1")).expect("insert wallet");
    // re-registering keeps the original position
    store.insert_wallet(wallet("wallet-1", "key-1")).expect("insert wallet");

    let snapshot = store.snapshot();
    let ids: Vec<&str> = snapshot.wallets().map(|wallet| wallet.id().as_str()).collect();

    assert_eq!(ids, ["wallet-1", "wallet-2", "wallet-0"]);
}

#[test]
fn replace_proposals_swaps_the_whole_list() {
    let store = populated_store();
    let wallet_id = WalletId::from("wallet-1");

    store
        .replace_proposals(&wallet_id, vec![txp("txp-1", "wallet-1"), txp("txp-2", "wallet-1")])
        .expect("replace proposals");
    let before = store.snapshot();

    store.replace_proposals(&wallet_id, vec![txp("txp-3", "wallet-1")]).expect("replace");
    let after = store.snapshot();

    assert_eq!(before.proposals(&wallet_id).len(), 2);
    assert_eq!(after.proposals(&wallet_id).len(), 1);
    assert!(after.proposal(&wallet_id, &TxpId::from("txp-1")).is_none());
    assert!(after.proposal(&wallet_id, &TxpId::from("txp-3")).is_some());
    assert!(after.revision() > before.revision());
}

#[test]
fn foreign_proposal_leaves_store_untouched() {
    let store = populated_store();
    let wallet_id = WalletId::from("wallet-1");
    let revision = store.snapshot().revision();

    let err = store
        .replace_proposals(&wallet_id, vec![txp("txp-1", "wallet-1"), txp("txp-2", "wallet-2")])
        .unwrap_err();

    assert!(matches!(err, TxpStoreError::ForeignProposal { txp_id, .. } if txp_id.as_str() == "txp-2"));
    assert_eq!(store.snapshot().revision(), revision);
    assert!(store.snapshot().proposals(&wallet_id).is_empty());
}

#[test]
fn unknown_wallet_is_rejected() {
    let store = populated_store();
    let wallet_id = WalletId::from("wallet-9");

    let err = store.replace_proposals(&wallet_id, vec![]).unwrap_err();
    assert!(matches!(err, TxpStoreError::UnknownWallet(_)));

    let err = store.set_wallet_balance(&wallet_id, 1).unwrap_err();
    assert!(matches!(err, TxpStoreError::UnknownWallet(_)));
}

#[test]
fn all_proposals_follow_wallet_order() {
    let store = populated_store();
    store
        .replace_proposals(&WalletId::from("wallet-2"), vec![txp("txp-b", "wallet-2")])
        .expect("replace");
    store
        .replace_proposals(&WalletId::from("wallet-1"), vec![txp("txp-a", "wallet-1")])
        .expect("replace");

    let snapshot = store.snapshot();
    let ids: Vec<&str> = snapshot.all_proposals().map(|txp| txp.id().as_str()).collect();

    assert_eq!(ids, ["txp-a", "txp-b"]);
}

#[test]
fn set_wallet_balance_replaces_wallet() {
    let store = populated_store();
    let wallet_id = WalletId::from("wallet-1");
    let before = store.snapshot();

    store.set_wallet_balance(&wallet_id, 42).expect("set balance");

    assert_eq!(before.wallet(&wallet_id).map(Wallet::balance), Some(100_000));
    assert_eq!(store.snapshot().wallet(&wallet_id).map(Wallet::balance), Some(42));
}

#[test]
fn key_lookups() {
    let store = populated_store();
    store.insert_key(Key::builder().id("key-2".into()).is_read_only(true).build()).expect("key");
    store.insert_wallet(wallet("wallet-3", "key-2")).expect("insert wallet");

    let snapshot = store.snapshot();
    let key_2 = KeyId::from("key-2");

    assert_eq!(
        snapshot.key_of_wallet(&WalletId::from("wallet-3")).map(Key::is_read_only),
        Some(true)
    );
    assert_eq!(snapshot.wallets_of_key(&key_2).count(), 1);
    assert_eq!(snapshot.wallets_of_key(&KeyId::from("key-1")).count(), 2);
}

#[tokio::test]
async fn subscribers_observe_updates() {
    let store = populated_store();
    let mut receiver = store.subscribe();
    receiver.mark_unchanged();

    store
        .replace_proposals(&WalletId::from("wallet-1"), vec![txp("txp-1", "wallet-1")])
        .expect("replace");

    receiver.changed().await.expect("store alive");
    assert_eq!(receiver.borrow_and_update().proposals(&WalletId::from("wallet-1")).len(), 1);

    // rejected updates do not notify
    let _ = store.set_wallet_balance(&WalletId::from("wallet-9"), 1);
    assert!(!receiver.has_changed().expect("store alive"));
}
