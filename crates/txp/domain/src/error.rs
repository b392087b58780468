use crate::{CopayerId, TxpId};

/// Errors raised when a domain value would violate one of its invariants.
#[derive(Debug, thiserror::Error)]
pub enum TxpError {
    /// A copayer appears more than once in the action list of a proposal.
    #[error("proposal {txp_id} holds more than one action for copayer {copayer_id}")]
    DuplicateCopayerAction {
        /// The offending proposal.
        txp_id: TxpId,
        /// The copayer with more than one action.
        copayer_id: CopayerId,
    },

    /// The required signature count exceeds the number of copayers of the wallet.
    #[error("threshold exceeds number of copayers")]
    ThresholdExceedsCopayers,
}
