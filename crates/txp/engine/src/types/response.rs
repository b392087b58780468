//! Response types for proposal engine operations.

use dissolve_derive::Dissolve;
use multisig_txp_domain::{
    actions::ActionAvailability, classify::Classification, proposal::TransactionProposal,
};
use strum::{Display, IntoStaticStr};
use tokio::task::JoinHandle;

use crate::{error::TxpEngineError, service::BroadcastedTx};

/// Title of the success notification shown after signing or broadcasting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, IntoStaticStr)]
pub enum PaymentTitle {
    /// The proposal was sent to the network.
    #[strum(serialize = "Payment Sent")]
    Sent,
    /// The local signature was recorded; more are needed.
    #[strum(serialize = "Payment Accepted")]
    Accepted,
}

/// Outcome of an operation guarded by a confirmation prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmedOutcome {
    /// The user dismissed the prompt; nothing was done.
    Canceled,
    /// The operation went through and the wallet was refreshed; the screen should close.
    Completed,
}

/// A broadcast together with the balance watch it started.
#[derive(Debug, Dissolve)]
pub struct BroadcastOutcome {
    /// The broadcast transactions
    txs: Vec<BroadcastedTx>,

    /// Balance the wallet is expected to settle at
    target_balance: u64,

    /// Resolves to `true` once the wallet reached the target balance
    balance_watch: JoinHandle<bool>,
}

/// Response from signing a single proposal.
#[derive(Debug, Dissolve)]
pub struct AcceptResponse {
    /// The proposal as returned by the wallet service
    proposal: TransactionProposal,

    /// Title of the success notification
    title: PaymentTitle,

    /// Present when the local signature completed the proposal and it was sent
    broadcast: Option<BroadcastOutcome>,
}

/// Response from signing a batch of proposals.
#[derive(Debug, Dissolve)]
pub struct SignBatchResponse {
    /// One result per requested proposal, in request order
    results: Vec<Result<TransactionProposal, TxpEngineError>>,

    /// Present when at least one proposal was completed and sent
    broadcast: Option<BroadcastOutcome>,

    /// The password error that stopped the batch, if any
    aborted: Option<TxpEngineError>,
}

/// Response from broadcasting a proposal.
#[derive(Debug, Dissolve)]
pub struct BroadcastResponse {
    /// Title of the success notification
    title: PaymentTitle,

    /// The broadcast and its balance watch
    broadcast: BroadcastOutcome,
}

/// A proposal with everything derived from it for the local copayer.
#[derive(Debug, Dissolve)]
pub struct GetProposalResponse {
    /// The proposal
    proposal: TransactionProposal,

    /// Its classification
    classification: Classification,

    /// Whether the local copayer may delete it now
    can_be_removed: bool,

    /// Whether the local copayer's signature completes it
    last_signer: bool,

    /// The actions it admits
    availability: ActionAvailability,
}

/// Response from refreshing every wallet holding proposals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Dissolve)]
pub struct RefreshResponse {
    /// Wallets refreshed successfully
    refreshed: usize,

    /// Wallets whose refresh failed
    failed: usize,
}

impl PaymentTitle {
    /// Returns the title for a signature that does or does not complete the proposal.
    pub fn for_last_signer(last_signer: bool) -> Self {
        if last_signer { Self::Sent } else { Self::Accepted }
    }
}

impl BroadcastOutcome {
    /// Returns the broadcast transactions.
    pub fn txs(&self) -> &[BroadcastedTx] {
        &self.txs
    }

    /// Returns the balance the wallet is expected to settle at.
    pub fn target_balance(&self) -> u64 {
        self.target_balance
    }
}

impl AcceptResponse {
    /// Returns the proposal as returned by the wallet service.
    pub fn proposal(&self) -> &TransactionProposal {
        &self.proposal
    }

    /// Returns the title of the success notification.
    pub fn title(&self) -> PaymentTitle {
        self.title
    }

    /// Returns the broadcast, if the proposal was sent.
    pub fn broadcast(&self) -> Option<&BroadcastOutcome> {
        self.broadcast.as_ref()
    }
}

impl SignBatchResponse {
    /// Returns the per-proposal results in request order.
    pub fn results(&self) -> &[Result<TransactionProposal, TxpEngineError>] {
        &self.results
    }

    /// Returns the number of proposals signed.
    pub fn success_count(&self) -> usize {
        self.results.iter().filter(|result| result.is_ok()).count()
    }

    /// Returns the number of proposals that could not be signed.
    pub fn failed_count(&self) -> usize {
        self.results.len() - self.success_count()
    }

    /// Returns the broadcast, if any proposal was sent.
    pub fn broadcast(&self) -> Option<&BroadcastOutcome> {
        self.broadcast.as_ref()
    }

    /// Returns the password error that stopped the batch.
    ///
    /// The proposals from the one that hit it onwards carry the same error in [`Self::results`].
    pub fn aborted(&self) -> Option<&TxpEngineError> {
        self.aborted.as_ref()
    }

    /// Returns the success notification title, `None` if nothing was signed.
    pub fn success_title(&self) -> Option<String> {
        match self.success_count() {
            0 => None,
            1 => Some("Proposal signed".to_owned()),
            n => Some(format!("{n} proposals signed")),
        }
    }

    /// Returns the failure notification text, `None` if every proposal was signed.
    ///
    /// Each failure is listed with the 1-based position of the proposal in the batch. Password
    /// errors are left out; they are presented through [`Self::aborted`].
    pub fn error_message(&self) -> Option<String> {
        let failed = self
            .results
            .iter()
            .filter(|result| result.as_ref().is_err_and(|e| !e.is_user_recoverable()))
            .count();

        if failed == 0 {
            return None;
        }

        let header = format!(
            "There was problem while trying to sign {failed} of your transactions proposals. \
             Please, try again"
        );

        let lines = self.results.iter().enumerate().filter_map(|(index, result)| {
            let err = result.as_ref().err().filter(|e| !e.is_user_recoverable())?;
            let text = err.user_message().unwrap_or_else(|| err.to_string());
            Some(format!("[ERROR {}] {text}", index + 1))
        });

        let message = core::iter::once(header).chain(lines).collect::<Vec<_>>().join("\n\n");

        Some(message)
    }
}

impl BroadcastResponse {
    /// Returns the title of the success notification.
    pub fn title(&self) -> PaymentTitle {
        self.title
    }

    /// Returns the broadcast.
    pub fn broadcast(&self) -> &BroadcastOutcome {
        &self.broadcast
    }
}

impl GetProposalResponse {
    /// Returns the proposal.
    pub fn proposal(&self) -> &TransactionProposal {
        &self.proposal
    }

    /// Returns the classification.
    pub fn classification(&self) -> &Classification {
        &self.classification
    }

    /// Returns `true` if the local copayer may delete the proposal now.
    pub fn can_be_removed(&self) -> bool {
        self.can_be_removed
    }

    /// Returns `true` if the local signature completes the proposal.
    pub fn last_signer(&self) -> bool {
        self.last_signer
    }

    /// Returns the available actions.
    pub fn availability(&self) -> &ActionAvailability {
        &self.availability
    }
}

impl RefreshResponse {
    /// Returns the number of wallets refreshed.
    pub fn refreshed(&self) -> usize {
        self.refreshed
    }

    /// Returns the number of wallets whose refresh failed.
    pub fn failed(&self) -> usize {
        self.failed
    }
}

#[bon::bon]
impl BroadcastOutcome {
    #[builder]
    pub(crate) fn new(
        txs: Vec<BroadcastedTx>,
        target_balance: u64,
        balance_watch: JoinHandle<bool>,
    ) -> Self {
        Self { txs, target_balance, balance_watch }
    }
}

#[bon::bon]
impl AcceptResponse {
    #[builder]
    pub(crate) fn new(
        proposal: TransactionProposal,
        title: PaymentTitle,
        broadcast: Option<BroadcastOutcome>,
    ) -> Self {
        Self { proposal, title, broadcast }
    }
}

#[bon::bon]
impl SignBatchResponse {
    #[builder]
    pub(crate) fn new(
        results: Vec<Result<TransactionProposal, TxpEngineError>>,
        broadcast: Option<BroadcastOutcome>,
        aborted: Option<TxpEngineError>,
    ) -> Self {
        Self { results, broadcast, aborted }
    }
}

#[bon::bon]
impl BroadcastResponse {
    #[builder]
    pub(crate) fn new(title: PaymentTitle, broadcast: BroadcastOutcome) -> Self {
        Self { title, broadcast }
    }
}

#[bon::bon]
impl GetProposalResponse {
    #[builder]
    pub(crate) fn new(
        proposal: TransactionProposal,
        classification: Classification,
        can_be_removed: bool,
        last_signer: bool,
        availability: ActionAvailability,
    ) -> Self {
        Self { proposal, classification, can_be_removed, last_signer, availability }
    }
}

#[bon::bon]
impl RefreshResponse {
    #[builder]
    pub(crate) fn new(refreshed: usize, failed: usize) -> Self {
        Self { refreshed, failed }
    }
}
