//! Which lifecycle actions a proposal currently admits.

use crate::{
    classify::Classification,
    paypro::PaymentRequestGate,
    proposal::{TransactionProposal, TxpStatus},
    wallet::{Key, Wallet},
};

/// The actions available to the local copayer on one proposal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ActionAvailability {
    accept: bool,
    reject: bool,
    remove: bool,
    broadcast: bool,
    payment_unpayable: bool,
}

impl ActionAvailability {
    /// Evaluates the available actions.
    ///
    /// `can_be_removed` is the removability verdict for the local copayer at the current time and
    /// `payment` the state of the proposal's payment request.
    pub fn evaluate(
        txp: &TransactionProposal,
        classification: &Classification,
        can_be_removed: bool,
        wallet: &Wallet,
        key: &Key,
        payment: PaymentRequestGate,
    ) -> Self {
        let terminal = txp.status().is_terminal();
        let pending_for_us = classification.pending_for_us() && !terminal;

        let accept = pending_for_us && !key.is_read_only() && payment.allows_payment();

        let reject = !txp.is_removed()
            && pending_for_us
            && payment != PaymentRequestGate::Expired
            && txp.multisig_contract_address().is_none()
            && wallet.credentials().is_shared();

        let accepted_unsent = txp.status() == TxpStatus::Accepted && !txp.is_broadcasted();

        let remove = (!txp.is_removed() && can_be_removed) || accepted_unsent;

        let broadcast = accepted_unsent && payment.allows_payment();

        Self {
            accept,
            reject,
            remove,
            broadcast,
            payment_unpayable: payment.is_unpayable(),
        }
    }

    /// Returns `true` if the local copayer may sign the proposal.
    pub fn accept(&self) -> bool {
        self.accept
    }

    /// Returns `true` if the local copayer may reject the proposal.
    pub fn reject(&self) -> bool {
        self.reject
    }

    /// Returns `true` if the local copayer may delete the proposal.
    pub fn remove(&self) -> bool {
        self.remove
    }

    /// Returns `true` if the fully signed proposal may be broadcast.
    pub fn broadcast(&self) -> bool {
        self.broadcast
    }

    /// Returns `true` if the proposal's payment request expired or could not be fetched, in
    /// which case it has to be deleted and created again.
    pub fn payment_unpayable(&self) -> bool {
        self.payment_unpayable
    }
}
