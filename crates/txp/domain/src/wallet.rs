//! Wallet and key domain models.

use core::num::NonZeroU32;

use alloc::string::String;

use bon::Builder;
use dissolve_derive::Dissolve;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{CopayerId, KeyId, TxpError, WalletId};

/// The `m`-of-`n` signing policy of a wallet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(
        try_from = "crate::with_serde::CredentialsRepr",
        into = "crate::with_serde::CredentialsRepr"
    )
)]
pub struct Credentials {
    /// Signatures required.
    m: NonZeroU32,
    /// Total copayers.
    n: NonZeroU32,
}

/// A wallet holding funds that proposals spend from.
#[derive(Debug, Clone, PartialEq, Eq, Builder, Dissolve)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(rename_all = "camelCase"))]
pub struct Wallet {
    /// The wallet's unique identifier.
    id: WalletId,

    /// The key owning this wallet.
    key_id: KeyId,

    /// The local user's copayer identity on this wallet.
    copayer_id: CopayerId,

    /// The coin held, e.g. `btc`.
    coin: String,

    /// The chain the coin lives on.
    chain: String,

    /// The network, e.g. `livenet` or `testnet`.
    network: String,

    /// The signing policy.
    credentials: Credentials,

    /// Confirmed balance in minor units.
    balance: u64,
}

/// A key owning one or more wallets.
///
/// A read-only key holds no signing material; proposals of its wallets can be viewed but never
/// signed.
#[derive(Debug, Clone, PartialEq, Eq, Builder, Dissolve)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(rename_all = "camelCase"))]
pub struct Key {
    /// The key's unique identifier.
    id: KeyId,

    /// Whether the key lacks signing capability.
    #[builder(default)]
    is_read_only: bool,
}

impl Credentials {
    /// Creates an `m`-of-`n` policy.
    ///
    /// Returns an error when `m` exceeds `n`.
    pub fn new(m: NonZeroU32, n: NonZeroU32) -> Result<Self, TxpError> {
        if m > n {
            return Err(TxpError::ThresholdExceedsCopayers);
        }

        Ok(Self { m, n })
    }

    /// Returns the number of signatures required.
    pub fn m(&self) -> NonZeroU32 {
        self.m
    }

    /// Returns the number of copayers.
    pub fn n(&self) -> NonZeroU32 {
        self.n
    }

    /// Returns `true` if more than one copayer shares the wallet.
    pub fn is_shared(&self) -> bool {
        self.n.get() > 1
    }
}

impl Wallet {
    /// Returns the wallet id.
    pub fn id(&self) -> &WalletId {
        &self.id
    }

    /// Returns the id of the owning key.
    pub fn key_id(&self) -> &KeyId {
        &self.key_id
    }

    /// Returns the local user's copayer identity.
    pub fn copayer_id(&self) -> &CopayerId {
        &self.copayer_id
    }

    /// Returns the coin.
    pub fn coin(&self) -> &str {
        &self.coin
    }

    /// Returns the chain.
    pub fn chain(&self) -> &str {
        &self.chain
    }

    /// Returns the network.
    pub fn network(&self) -> &str {
        &self.network
    }

    /// Returns the signing policy.
    pub fn credentials(&self) -> Credentials {
        self.credentials
    }

    /// Returns the confirmed balance in minor units.
    pub fn balance(&self) -> u64 {
        self.balance
    }

    /// Returns a copy of the wallet carrying `balance`.
    pub fn with_balance(self, balance: u64) -> Self {
        Self { balance, ..self }
    }
}

impl Key {
    /// Returns the key id.
    pub fn id(&self) -> &KeyId {
        &self.id
    }

    /// Returns `true` if the key cannot sign.
    pub fn is_read_only(&self) -> bool {
        self.is_read_only
    }
}
