//! Classification of proposals relative to the local copayer.
//!
//! Classification is a pure function of a proposal and the local copayer identity. The derived
//! values are returned as a separate [`Classification`] and never written back onto the
//! proposal.

use chrono::{DateTime, TimeDelta, Utc};

use crate::{
    CopayerId,
    proposal::{ActionKind, TransactionProposal, TxpStatus},
};

/// The list bucket a proposal falls into. Every proposal falls into exactly one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum TxpBucket {
    /// Single-signature proposal that can be sent right away.
    Unsent,
    /// Single-signature proposal paying a merchant invoice, waiting on the payment request.
    PaymentRequestPending,
    /// Multisig proposal the local copayer has not decided on yet.
    Pending,
    /// Multisig proposal the local copayer signed.
    Accepted,
    /// Multisig proposal the local copayer rejected.
    Rejected,
}

/// The local copayer's own decision on a multisig proposal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusForUs {
    /// No decision yet, or the last signing attempt failed.
    Pending,
    /// Signed.
    Accepted,
    /// Rejected.
    Rejected,
}

/// The values derived from a proposal for the local copayer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classification {
    bucket: TxpBucket,
    status_for_us: Option<StatusForUs>,
    pending_for_us: bool,
    last_signer: bool,
}

impl Classification {
    /// Returns the list bucket.
    pub fn bucket(&self) -> TxpBucket {
        self.bucket
    }

    /// Returns the local decision, `None` for single-signature proposals.
    pub fn status_for_us(&self) -> Option<StatusForUs> {
        self.status_for_us
    }

    /// Returns `true` if the local copayer still has to decide on a pending proposal.
    pub fn pending_for_us(&self) -> bool {
        self.pending_for_us
    }

    /// Returns `true` if the local copayer's signature would complete the proposal.
    pub fn last_signer(&self) -> bool {
        self.last_signer
    }
}

/// Classifies `txp` for the copayer `local`.
///
/// A `failed` local action counts as no action. Proposals in a terminal status always land in
/// the same bucket: `rejected` and `removed` ones in [`TxpBucket::Rejected`], broadcast ones in
/// [`TxpBucket::Accepted`].
pub fn classify(txp: &TransactionProposal, local: &CopayerId) -> Classification {
    let local_kind = txp.action_of(local).map(|action| action.kind());
    let decided = matches!(local_kind, Some(ActionKind::Accept | ActionKind::Reject));

    let pending_for_us = !decided && txp.status() == TxpStatus::Pending;
    let last_signer = is_last_signer(txp);

    let (bucket, status_for_us) = match txp.status() {
        TxpStatus::Rejected | TxpStatus::Removed => (TxpBucket::Rejected, None),
        TxpStatus::Broadcasted => (TxpBucket::Accepted, None),
        TxpStatus::Pending | TxpStatus::Accepted if txp.required_signatures().get() == 1 => {
            match txp.pay_pro_url() {
                None => (TxpBucket::Unsent, None),
                Some(_) => (TxpBucket::PaymentRequestPending, None),
            }
        },
        TxpStatus::Pending | TxpStatus::Accepted => match local_kind {
            Some(ActionKind::Accept) => (TxpBucket::Accepted, Some(StatusForUs::Accepted)),
            Some(ActionKind::Reject) => (TxpBucket::Rejected, Some(StatusForUs::Rejected)),
            Some(ActionKind::Failed) | None => (TxpBucket::Pending, Some(StatusForUs::Pending)),
        },
    };

    Classification { bucket, status_for_us, pending_for_us, last_signer }
}

/// Returns `true` if exactly one more signature completes `txp`.
pub fn is_last_signer(txp: &TransactionProposal) -> bool {
    txp.accept_count() == txp.required_signatures().get() - 1
}

/// The default time after creation from which any copayer may remove a proposal.
pub fn default_removal_grace() -> TimeDelta {
    TimeDelta::minutes(10)
}

/// Returns `true` if the copayer `local` may remove `txp` at `now`.
///
/// A proposal is removable when the wallet service says so, when `local` created it and nobody
/// signed it yet, or once `grace` has elapsed since its creation.
pub fn can_be_removed(
    txp: &TransactionProposal,
    local: &CopayerId,
    now: DateTime<Utc>,
    grace: TimeDelta,
) -> bool {
    if txp.status().is_terminal() {
        return false;
    }

    if txp.can_be_removed() == Some(true) {
        return true;
    }

    let unsigned_by_others = txp.creator_id() == local && txp.accept_count() == 0;
    let aged = now.signed_duration_since(txp.created_on()) >= grace;

    unsigned_by_others || aged
}
