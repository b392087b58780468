use std::{collections::BTreeMap, sync::Arc};

use multisig_txp_domain::{
    KeyId, TxpId, WalletId,
    proposal::TransactionProposal,
    wallet::{Key, Wallet},
};

/// An immutable view of the store at one revision.
///
/// Snapshots are never modified once published; every store mutation publishes a new one.
/// Readers holding an older snapshot keep a consistent view of it.
#[derive(Debug, Clone, Default)]
pub struct StoreSnapshot {
    pub(crate) revision: u64,
    pub(crate) keys: BTreeMap<KeyId, Key>,
    pub(crate) wallets: BTreeMap<WalletId, Wallet>,
    pub(crate) wallet_order: Vec<WalletId>,
    pub(crate) proposals: BTreeMap<WalletId, Arc<[TransactionProposal]>>,
}

impl StoreSnapshot {
    /// Returns the revision, incremented on every mutation.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Returns the key with id `key_id`.
    pub fn key(&self, key_id: &KeyId) -> Option<&Key> {
        self.keys.get(key_id)
    }

    /// Returns the wallet with id `wallet_id`.
    pub fn wallet(&self, wallet_id: &WalletId) -> Option<&Wallet> {
        self.wallets.get(wallet_id)
    }

    /// Returns the key owning the wallet with id `wallet_id`.
    pub fn key_of_wallet(&self, wallet_id: &WalletId) -> Option<&Key> {
        self.wallet(wallet_id).and_then(|wallet| self.key(wallet.key_id()))
    }

    /// Returns all wallets in registration order.
    pub fn wallets(&self) -> impl Iterator<Item = &Wallet> {
        self.wallet_order.iter().filter_map(|wallet_id| self.wallets.get(wallet_id))
    }

    /// Returns the wallets owned by the key with id `key_id`, in registration order.
    pub fn wallets_of_key<'a>(&'a self, key_id: &'a KeyId) -> impl Iterator<Item = &'a Wallet> {
        self.wallets().filter(move |wallet| wallet.key_id() == key_id)
    }

    /// Returns the pending proposals of the wallet with id `wallet_id`.
    pub fn proposals(&self, wallet_id: &WalletId) -> &[TransactionProposal] {
        self.proposals.get(wallet_id).map(AsRef::as_ref).unwrap_or_default()
    }

    /// Returns the proposal `txp_id` of the wallet `wallet_id`.
    pub fn proposal(&self, wallet_id: &WalletId, txp_id: &TxpId) -> Option<&TransactionProposal> {
        self.proposals(wallet_id).iter().find(|txp| txp.id() == txp_id)
    }

    /// Returns the pending proposals of all wallets, wallet by wallet in registration order.
    pub fn all_proposals(&self) -> impl Iterator<Item = &TransactionProposal> {
        self.wallets().flat_map(|wallet| self.proposals(wallet.id()))
    }
}
