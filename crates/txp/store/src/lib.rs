//! In-memory proposal store.
//!
//! The store is the single source of truth for the keys, wallets and pending proposals known to
//! the application. It publishes immutable [`StoreSnapshot`]s through a [`tokio::sync::watch`]
//! channel:
//!
//! - readers call [`TxpStore::snapshot`] or [`TxpStore::subscribe`] and never observe a
//!   half-applied update
//! - writers replace a wallet's proposal list wholesale with
//!   [`TxpStore::replace_proposals`]; individual proposals are never patched in place
//!
//! # Usage
//!
//! ```ignore
//! let store = TxpStore::new();
//! store.insert_key(key)?;
//! store.insert_wallet(wallet)?;
//! store.replace_proposals(&wallet_id, proposals)?;
//!
//! let snapshot = store.snapshot();
//! for txp in snapshot.all_proposals() {
//!     // ...
//! }
//! ```

mod error;
mod snapshot;

#[cfg(test)]
mod tests;

pub use self::{error::TxpStoreError, snapshot::StoreSnapshot};

use std::sync::Arc;

use multisig_txp_domain::{
    WalletId,
    proposal::TransactionProposal,
    wallet::{Key, Wallet},
};
use tokio::sync::watch;

use self::error::Result;

/// The proposal store shared by the views and the orchestrator.
pub struct TxpStore {
    sender: watch::Sender<Arc<StoreSnapshot>>,
}

impl Default for TxpStore {
    fn default() -> Self {
        Self::new()
    }
}

impl TxpStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        let (sender, _) = watch::channel(Arc::new(StoreSnapshot::default()));
        Self { sender }
    }

    /// Returns the current snapshot.
    pub fn snapshot(&self) -> Arc<StoreSnapshot> {
        Arc::clone(&self.sender.borrow())
    }

    /// Returns a receiver notified on every store change.
    pub fn subscribe(&self) -> watch::Receiver<Arc<StoreSnapshot>> {
        self.sender.subscribe()
    }

    /// Registers `key`, replacing any key with the same id.
    #[tracing::instrument(skip_all, fields(key_id = %key.id(), read_only = key.is_read_only()))]
    pub fn insert_key(&self, key: Key) -> Result<()> {
        self.modify(|snapshot| {
            snapshot.keys.insert(key.id().clone(), key);
            Ok(())
        })
    }

    /// Registers `wallet`, replacing any wallet with the same id.
    ///
    /// # Errors
    ///
    /// Returns an error if the wallet's key was not registered first.
    #[tracing::instrument(skip_all, fields(wallet_id = %wallet.id(), key_id = %wallet.key_id()))]
    pub fn insert_wallet(&self, wallet: Wallet) -> Result<()> {
        self.modify(|snapshot| {
            if !snapshot.keys.contains_key(wallet.key_id()) {
                return Err(TxpStoreError::UnknownKey(wallet.key_id().clone()));
            }

            if !snapshot.wallets.contains_key(wallet.id()) {
                snapshot.wallet_order.push(wallet.id().clone());
            }

            snapshot.wallets.insert(wallet.id().clone(), wallet);
            Ok(())
        })
    }

    /// Replaces the pending proposals of the wallet `wallet_id` with `proposals`.
    ///
    /// # Errors
    ///
    /// Returns an error if the wallet is unknown or a proposal belongs to another wallet. The
    /// store is left untouched in that case.
    #[tracing::instrument(skip_all, fields(%wallet_id, count = proposals.len()))]
    pub fn replace_proposals(
        &self,
        wallet_id: &WalletId,
        proposals: Vec<TransactionProposal>,
    ) -> Result<()> {
        if let Some(foreign) = proposals.iter().find(|txp| txp.wallet_id() != wallet_id) {
            return Err(TxpStoreError::ForeignProposal {
                wallet_id: wallet_id.clone(),
                txp_id: foreign.id().clone(),
            });
        }

        self.modify(|snapshot| {
            if !snapshot.wallets.contains_key(wallet_id) {
                return Err(TxpStoreError::UnknownWallet(wallet_id.clone()));
            }

            snapshot.proposals.insert(wallet_id.clone(), proposals.into());
            Ok(())
        })
    }

    /// Records a new confirmed balance for the wallet `wallet_id`.
    #[tracing::instrument(skip(self))]
    pub fn set_wallet_balance(&self, wallet_id: &WalletId, balance: u64) -> Result<()> {
        self.modify(|snapshot| {
            let wallet = snapshot
                .wallets
                .remove(wallet_id)
                .ok_or_else(|| TxpStoreError::UnknownWallet(wallet_id.clone()))?;

            snapshot.wallets.insert(wallet_id.clone(), wallet.with_balance(balance));
            Ok(())
        })
    }

    /// Applies `f` to a copy of the current snapshot and publishes the copy if `f` succeeds.
    fn modify<F>(&self, f: F) -> Result<()>
    where
        F: FnOnce(&mut StoreSnapshot) -> Result<()>,
    {
        let mut outcome = None;

        self.sender.send_if_modified(|current| {
            let mut next = StoreSnapshot::clone(current);

            match f(&mut next) {
                Ok(()) => {
                    next.revision += 1;
                    *current = Arc::new(next);
                    outcome = Some(Ok(()));
                    true
                },
                Err(e) => {
                    tracing::warn!("store update rejected: {e}");
                    outcome = Some(Err(e));
                    false
                },
            }
        });

        outcome.unwrap_or_else(|| Err(TxpStoreError::other("store update was not applied")))
    }
}
