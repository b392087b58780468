//! Transaction proposal domain models.

use core::num::NonZeroU32;

use alloc::{collections::BTreeSet, string::String, vec::Vec};

use bon::Builder;
use chrono::{DateTime, Utc};
use dissolve_derive::Dissolve;
use strum::{Display, EnumString, IntoStaticStr};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{CopayerId, TxpError, TxpId, WalletId};

/// The aggregate status of a proposal as reported by the wallet service.
///
/// `Broadcasted`, `Rejected` and `Removed` are terminal: no further action applies to a
/// proposal once it reaches one of them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoStaticStr, EnumString, Display)]
#[strum(serialize_all = "snake_case")]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(rename_all = "snake_case"))]
pub enum TxpStatus {
    /// Collecting signatures.
    Pending,
    /// Enough signatures collected, not yet broadcast.
    Accepted,
    /// Enough copayers rejected the proposal.
    Rejected,
    /// The signed transaction was submitted to the network.
    Broadcasted,
    /// The proposal was deleted.
    Removed,
}

/// The kind of decision a copayer recorded on a proposal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoStaticStr, EnumString, Display)]
#[strum(serialize_all = "snake_case")]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(rename_all = "snake_case"))]
pub enum ActionKind {
    /// The copayer signed the proposal.
    Accept,
    /// The copayer rejected the proposal.
    Reject,
    /// The copayer's signing attempt failed; counts as no decision.
    Failed,
}

/// A decision recorded by one copayer on a proposal.
#[derive(Debug, Clone, PartialEq, Eq, Builder, Dissolve)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(rename_all = "camelCase"))]
pub struct TxpAction {
    /// The copayer who acted.
    copayer_id: CopayerId,

    /// What the copayer decided.
    #[cfg_attr(feature = "serde", serde(rename = "type"))]
    kind: ActionKind,

    /// When the decision was recorded.
    #[cfg_attr(feature = "serde", serde(with = "chrono::serde::ts_seconds"))]
    created_on: DateTime<Utc>,
}

/// One output of a proposal.
#[derive(Debug, Clone, PartialEq, Eq, Builder, Dissolve)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(rename_all = "camelCase"))]
pub struct Recipient {
    /// Destination address.
    to_address: String,

    /// Amount sent to the address, in minor units.
    amount: u64,
}

/// A proposed, not yet final, transaction awaiting authorization by the copayers of a wallet.
///
/// Proposals are immutable values: every derived view (classification, removability,
/// availability of actions) is computed from them without mutating them. Use
/// [`TransactionProposal::builder`] to construct one; the builder rejects action lists holding
/// more than one decision per copayer.
#[derive(Debug, Clone, PartialEq, Eq, Dissolve)]
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(
        try_from = "crate::with_serde::TransactionProposalRepr",
        into = "crate::with_serde::TransactionProposalRepr"
    )
)]
pub struct TransactionProposal {
    id: TxpId,
    wallet_id: WalletId,
    creator_id: CopayerId,
    copayer_id: CopayerId,
    coin: String,
    chain: String,
    amount: u64,
    fee: u64,
    recipients: Vec<Recipient>,
    raw: Option<String>,
    message: Option<String>,
    display_amount: Option<String>,
    required_signatures: NonZeroU32,
    actions: Vec<TxpAction>,
    status: TxpStatus,
    created_on: DateTime<Utc>,
    can_be_removed: Option<bool>,
    pay_pro_url: Option<String>,
    broadcasted_on: Option<DateTime<Utc>>,
    multisig_contract_address: Option<String>,
}

impl TxpStatus {
    /// Returns `true` if no further action applies to a proposal with this status.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Broadcasted | Self::Rejected | Self::Removed)
    }
}

impl TxpAction {
    /// Returns the copayer who acted.
    pub fn copayer_id(&self) -> &CopayerId {
        &self.copayer_id
    }

    /// Returns the recorded decision.
    pub fn kind(&self) -> ActionKind {
        self.kind
    }

    /// Returns when the decision was recorded.
    pub fn created_on(&self) -> DateTime<Utc> {
        self.created_on
    }
}

impl Recipient {
    /// Returns the destination address.
    pub fn to_address(&self) -> &str {
        &self.to_address
    }

    /// Returns the amount in minor units.
    pub fn amount(&self) -> u64 {
        self.amount
    }
}

#[bon::bon]
impl TransactionProposal {
    /// Creates a proposal, validating that each copayer has acted at most once.
    ///
    /// `copayer_id` is the identity of the local user on the proposal's wallet, while
    /// `creator_id` identifies the copayer who created it.
    #[builder]
    pub fn new(
        id: TxpId,
        wallet_id: WalletId,
        creator_id: CopayerId,
        copayer_id: CopayerId,
        coin: String,
        chain: String,
        amount: u64,
        fee: u64,
        #[builder(default)] recipients: Vec<Recipient>,
        raw: Option<String>,
        message: Option<String>,
        display_amount: Option<String>,
        required_signatures: NonZeroU32,
        #[builder(default)] actions: Vec<TxpAction>,
        #[builder(default = TxpStatus::Pending)] status: TxpStatus,
        created_on: DateTime<Utc>,
        can_be_removed: Option<bool>,
        pay_pro_url: Option<String>,
        broadcasted_on: Option<DateTime<Utc>>,
        multisig_contract_address: Option<String>,
    ) -> Result<Self, TxpError> {
        let duplicate = {
            let mut seen = BTreeSet::new();
            actions
                .iter()
                .find(|action| !seen.insert(action.copayer_id()))
                .map(|action| action.copayer_id().clone())
        };

        if let Some(copayer_id) = duplicate {
            return Err(TxpError::DuplicateCopayerAction { txp_id: id, copayer_id });
        }

        Ok(Self {
            id,
            wallet_id,
            creator_id,
            copayer_id,
            coin,
            chain,
            amount,
            fee,
            recipients,
            raw,
            message,
            display_amount,
            required_signatures,
            actions,
            status,
            created_on,
            can_be_removed,
            pay_pro_url,
            broadcasted_on,
            multisig_contract_address,
        })
    }
}

impl TransactionProposal {
    /// Returns the proposal id.
    pub fn id(&self) -> &TxpId {
        &self.id
    }

    /// Returns the id of the wallet the proposal spends from.
    pub fn wallet_id(&self) -> &WalletId {
        &self.wallet_id
    }

    /// Returns the copayer who created the proposal.
    pub fn creator_id(&self) -> &CopayerId {
        &self.creator_id
    }

    /// Returns the local user's copayer identity on this proposal's wallet.
    pub fn copayer_id(&self) -> &CopayerId {
        &self.copayer_id
    }

    /// Returns the coin, e.g. `btc`.
    pub fn coin(&self) -> &str {
        &self.coin
    }

    /// Returns the chain, e.g. `btc` or `eth`.
    pub fn chain(&self) -> &str {
        &self.chain
    }

    /// Returns the amount in minor units.
    pub fn amount(&self) -> u64 {
        self.amount
    }

    /// Returns the fee in minor units.
    pub fn fee(&self) -> u64 {
        self.fee
    }

    /// Returns the outputs of the proposal.
    pub fn recipients(&self) -> &[Recipient] {
        &self.recipients
    }

    /// Returns the address of the first output, if any.
    pub fn to_address(&self) -> Option<&str> {
        self.recipients.first().map(Recipient::to_address)
    }

    /// Returns the unsigned or partially signed transaction payload.
    pub fn raw(&self) -> Option<&str> {
        self.raw.as_deref()
    }

    /// Returns the note attached by the creator.
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    /// Returns the formatted amount, present once the amount could be resolved for display.
    pub fn display_amount(&self) -> Option<&str> {
        self.display_amount.as_deref()
    }

    /// Returns the number of signatures required to send the proposal.
    pub fn required_signatures(&self) -> NonZeroU32 {
        self.required_signatures
    }

    /// Returns the recorded copayer decisions in the order they were made.
    pub fn actions(&self) -> &[TxpAction] {
        &self.actions
    }

    /// Returns the decision recorded by `copayer_id`, if any.
    pub fn action_of(&self, copayer_id: &CopayerId) -> Option<&TxpAction> {
        self.actions.iter().find(|action| action.copayer_id() == copayer_id)
    }

    /// Returns the number of copayers who signed the proposal.
    pub fn accept_count(&self) -> u32 {
        let count = self.actions.iter().filter(|a| a.kind() == ActionKind::Accept).count();
        // the action list holds one entry per copayer, so it cannot exceed u32::MAX
        count as u32
    }

    /// Returns the aggregate status reported by the wallet service.
    pub fn status(&self) -> TxpStatus {
        self.status
    }

    /// Returns when the proposal was created.
    pub fn created_on(&self) -> DateTime<Utc> {
        self.created_on
    }

    /// Returns the wallet service's own removability verdict, if it sent one.
    pub fn can_be_removed(&self) -> Option<bool> {
        self.can_be_removed
    }

    /// Returns the payment-request URL for proposals paying a merchant invoice.
    pub fn pay_pro_url(&self) -> Option<&str> {
        self.pay_pro_url.as_deref()
    }

    /// Returns when the proposal was broadcast, if it was.
    pub fn broadcasted_on(&self) -> Option<DateTime<Utc>> {
        self.broadcasted_on
    }

    /// Returns the multisig contract address for contract-based multisig wallets.
    pub fn multisig_contract_address(&self) -> Option<&str> {
        self.multisig_contract_address.as_deref()
    }

    /// Returns `true` if the proposal was deleted.
    pub fn is_removed(&self) -> bool {
        self.status == TxpStatus::Removed
    }

    /// Returns `true` if the proposal reached the network.
    pub fn is_broadcasted(&self) -> bool {
        self.status == TxpStatus::Broadcasted || self.broadcasted_on.is_some()
    }

    /// Returns the total the wallet spends when the proposal is broadcast.
    pub fn total_spent(&self) -> u64 {
        self.amount.saturating_add(self.fee)
    }
}
