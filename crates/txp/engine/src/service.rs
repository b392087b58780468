//! Collaborators the engine drives.
//!
//! The wallet service, the payment-request service and the confirmation prompt live outside
//! this crate; the engine only depends on the traits below.

use std::borrow::Cow;

use bon::Builder;
use chrono::{DateTime, Utc};
use multisig_txp_domain::{
    WalletId,
    paypro::PayProDetails,
    proposal::TransactionProposal,
    wallet::{Key, Wallet},
};
use url::Url;

/// Errors reported by the wallet service.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WalletServiceError {
    /// The spending password was wrong.
    #[error("invalid password")]
    InvalidPassword,

    /// The user dismissed the password prompt.
    #[error("password canceled")]
    PasswordCanceled,

    /// The provider failed; carries its diagnostic text.
    #[error("provider error: {0}")]
    Provider(Cow<'static, str>),
}

/// Errors reported by the payment-request service.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PaymentRequestError {
    /// The merchant server could not be reached or refused the request.
    #[error("network error: {0}")]
    Network(Cow<'static, str>),

    /// The proposal's payment-request URL is malformed.
    #[error("invalid url: {0}")]
    InvalidUrl(Cow<'static, str>),
}

impl WalletServiceError {
    /// Creates a [`WalletServiceError::Provider`] error.
    pub fn provider<E>(err: E) -> Self
    where
        Cow<'static, str>: From<E>,
    {
        Self::Provider(err.into())
    }

    pub(crate) fn into_message(self) -> Cow<'static, str> {
        match self {
            Self::Provider(msg) => msg,
            other => other.to_string().into(),
        }
    }
}

/// Outcome of a successful broadcast.
#[derive(Debug, Clone, PartialEq, Eq, Builder)]
pub struct BroadcastedTx {
    /// Network transaction id.
    txid: String,

    /// Fee paid, in minor units.
    fee: u64,

    /// Amount sent, in minor units.
    amount: u64,
}

impl BroadcastedTx {
    /// Returns the network transaction id.
    pub fn txid(&self) -> &str {
        &self.txid
    }

    /// Returns the fee paid.
    pub fn fee(&self) -> u64 {
        self.fee
    }

    /// Returns the amount sent.
    pub fn amount(&self) -> u64 {
        self.amount
    }

    /// Returns the total debited from the wallet.
    pub fn total_spent(&self) -> u64 {
        self.fee.saturating_add(self.amount)
    }
}

/// The data posted to the merchant server when fetching a payment request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentRequestPayload {
    /// A receive address of the paying wallet.
    pub address: String,
}

/// A multisig wallet service.
pub trait WalletService: Send + Sync + 'static {
    /// Returns the pending proposals of the wallet `wallet_id`.
    fn get_pending_proposals(
        &self,
        wallet_id: &WalletId,
    ) -> impl Future<Output = Result<Vec<TransactionProposal>, WalletServiceError>> + Send;

    /// Records the local copayer's signature on `txp` and returns the updated proposal.
    ///
    /// Prompts for the spending password when the key is encrypted.
    fn accept_and_sign(
        &self,
        txp: &TransactionProposal,
        key: &Key,
        wallet: &Wallet,
    ) -> impl Future<Output = Result<TransactionProposal, WalletServiceError>> + Send;

    /// Records the local copayer's rejection of `txp`.
    fn reject(
        &self,
        txp: &TransactionProposal,
        wallet: &Wallet,
    ) -> impl Future<Output = Result<(), WalletServiceError>> + Send;

    /// Deletes `txp`.
    fn remove(
        &self,
        txp: &TransactionProposal,
        wallet: &Wallet,
    ) -> impl Future<Output = Result<(), WalletServiceError>> + Send;

    /// Submits the fully signed `txp` to the network.
    fn broadcast(
        &self,
        wallet: &Wallet,
        txp: &TransactionProposal,
    ) -> impl Future<Output = Result<BroadcastedTx, WalletServiceError>> + Send;

    /// Refreshes the wallet's status, bypassing caches when `force` is set.
    fn refresh_wallet_status(
        &self,
        key: &Key,
        wallet: &Wallet,
        force: bool,
    ) -> impl Future<Output = Result<(), WalletServiceError>> + Send;

    /// Returns a receive address of `wallet`, a fresh one when `new_address` is set.
    fn derive_receive_address(
        &self,
        wallet: &Wallet,
        new_address: bool,
    ) -> impl Future<Output = Result<String, WalletServiceError>> + Send;

    /// Returns the wallet's confirmed balance as currently seen by the service.
    fn fetch_wallet_balance(
        &self,
        wallet: &Wallet,
    ) -> impl Future<Output = Result<u64, WalletServiceError>> + Send;
}

/// A merchant payment-request (PayPro) service.
pub trait PaymentRequestService: Send + Sync + 'static {
    /// Fetches the payment request at `url` on behalf of the wallet described by `payload`.
    fn fetch_payment_request(
        &self,
        url: &Url,
        coin: &str,
        chain: &str,
        payload: &PaymentRequestPayload,
    ) -> impl Future<Output = Result<PayProDetails, PaymentRequestError>> + Send;
}

/// A destructive-action confirmation dialog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfirmPrompt {
    /// Dialog title.
    pub title: &'static str,
    /// Question asked.
    pub message: &'static str,
    /// Label of the confirming button.
    pub confirm_label: &'static str,
    /// Label of the dismissing button.
    pub cancel_label: &'static str,
}

impl ConfirmPrompt {
    /// The prompt shown before rejecting a proposal.
    pub const REJECT: Self = Self {
        title: "Warning!",
        message: "Are you sure you want to reject this transaction?",
        confirm_label: "REJECT",
        cancel_label: "CANCEL",
    };

    /// The prompt shown before deleting a proposal.
    pub const REMOVE: Self = Self {
        title: "Warning!",
        message: "Are you sure you want to delete this transaction?",
        confirm_label: "DELETE",
        cancel_label: "CANCEL",
    };
}

/// Asks the user to confirm a destructive action.
pub trait ConfirmAction: Send + Sync {
    /// Shows `prompt` and resolves to `true` if the user confirmed.
    fn confirm(&self, prompt: &ConfirmPrompt) -> impl Future<Output = bool> + Send;
}

/// A source of wall-clock time.
pub trait Clock: Send + Sync + 'static {
    /// Returns the current time.
    fn now(&self) -> DateTime<Utc>;
}

/// The system clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
