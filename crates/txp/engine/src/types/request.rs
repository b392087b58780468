//! Request types for proposal engine operations.

use bon::Builder;
use dissolve_derive::Dissolve;
use multisig_txp_domain::{TxpId, WalletId, paypro::PaymentRequestGate};

/// Request to sign a single proposal.
#[derive(Debug, Builder, Dissolve)]
pub struct AcceptRequest {
    /// The wallet the proposal spends from
    wallet_id: WalletId,

    /// The proposal to sign
    txp_id: TxpId,

    /// State of the proposal's payment request, as reported by its
    /// [`ExpirationTracker`](crate::ExpirationTracker). Ignored for proposals without one.
    payment: Option<PaymentRequestGate>,
}

/// Request to sign several proposals of one wallet.
#[derive(Debug, Builder, Dissolve)]
pub struct SignBatchRequest {
    /// The wallet the proposals spend from
    wallet_id: WalletId,

    /// The proposals to sign, in the order results are reported
    txp_ids: Vec<TxpId>,
}

/// Request to reject a proposal.
#[derive(Debug, Builder, Dissolve)]
pub struct RejectRequest {
    /// The wallet the proposal spends from
    wallet_id: WalletId,

    /// The proposal to reject
    txp_id: TxpId,

    /// State of the proposal's payment request. Ignored for proposals without one.
    payment: Option<PaymentRequestGate>,
}

/// Request to delete a proposal.
#[derive(Debug, Builder, Dissolve)]
pub struct RemoveRequest {
    /// The wallet the proposal spends from
    wallet_id: WalletId,

    /// The proposal to delete
    txp_id: TxpId,
}

/// Request to broadcast a fully signed proposal.
#[derive(Debug, Builder, Dissolve)]
pub struct BroadcastRequest {
    /// The wallet the proposal spends from
    wallet_id: WalletId,

    /// The proposal to broadcast
    txp_id: TxpId,

    /// State of the proposal's payment request. Ignored for proposals without one.
    payment: Option<PaymentRequestGate>,
}

/// Request to evaluate the actions available on a proposal.
#[derive(Debug, Builder, Dissolve)]
pub struct GetProposalRequest {
    /// The wallet the proposal spends from
    wallet_id: WalletId,

    /// The proposal to inspect
    txp_id: TxpId,

    /// State of the proposal's payment request. Ignored for proposals without one.
    payment: Option<PaymentRequestGate>,
}

/// Request to reload a wallet's status and pending proposals.
#[derive(Debug, Builder, Dissolve)]
pub struct RefreshWalletRequest {
    /// The wallet to reload
    wallet_id: WalletId,
}
