use std::borrow::Cow;

use multisig_txp_domain::{KeyId, TxpId, WalletId};

pub type Result<T, E = TxpStoreError> = core::result::Result<T, E>;

/// Errors that can occur when updating the proposal store.
#[derive(Debug, thiserror::Error)]
pub enum TxpStoreError {
    /// The referenced key was never registered.
    ///
    /// Wallets can only be registered after the key owning them.
    #[error("unknown key: {0}")]
    UnknownKey(KeyId),

    /// The referenced wallet was never registered.
    #[error("unknown wallet: {0}")]
    UnknownWallet(WalletId),

    /// A proposal list for one wallet contained a proposal of another wallet.
    #[error("proposal {txp_id} does not belong to wallet {wallet_id}")]
    ForeignProposal {
        /// The wallet whose list was being replaced.
        wallet_id: WalletId,
        /// The proposal that belongs elsewhere.
        txp_id: TxpId,
    },

    /// An unclassified error occurred.
    #[error("other error: {0}")]
    Other(Cow<'static, str>),
}

impl TxpStoreError {
    pub(crate) fn other<E>(err: E) -> Self
    where
        Cow<'static, str>: From<E>,
    {
        Self::Other(err.into())
    }
}
