use std::{
    collections::{BTreeMap, BTreeSet, VecDeque},
    sync::{Mutex, MutexGuard},
};

use multisig_txp_domain::{
    TxpId, WalletId,
    paypro::PayProDetails,
    proposal::{ActionKind, TransactionProposal, TxpStatus},
    wallet::{Key, Wallet},
};
use multisig_txp_engine::{
    BroadcastedTx, ConfirmAction, ConfirmPrompt, PaymentRequestError, PaymentRequestPayload,
    PaymentRequestService, WalletService, WalletServiceError,
};
use url::Url;

use crate::fixtures;

// WALLET SERVICE
// ================================================================================================

/// A call received by [`MockWalletService`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WalletCall {
    /// `get_pending_proposals`
    GetPendingProposals(WalletId),
    /// `accept_and_sign`
    AcceptAndSign(TxpId),
    /// `reject`
    Reject(TxpId),
    /// `remove`
    Remove(TxpId),
    /// `broadcast`
    Broadcast(TxpId),
    /// `refresh_wallet_status`
    RefreshWalletStatus {
        /// Refreshed wallet
        wallet_id: WalletId,
        /// Whether caches were bypassed
        force: bool,
    },
    /// `derive_receive_address`
    DeriveReceiveAddress {
        /// Wallet the address belongs to
        wallet_id: WalletId,
        /// Whether a fresh address was requested
        new_address: bool,
    },
    /// `fetch_wallet_balance`
    FetchWalletBalance(WalletId),
}

#[derive(Default)]
struct WalletState {
    proposals: BTreeMap<WalletId, Vec<TransactionProposal>>,
    failures: BTreeMap<(&'static str, TxpId), WalletServiceError>,
    refresh_failures: BTreeSet<WalletId>,
    address_failure: Option<WalletServiceError>,
    balances: BTreeMap<WalletId, VecDeque<u64>>,
    calls: Vec<WalletCall>,
}

/// An in-memory wallet service.
///
/// Proposals are kept per wallet and updated the way a real service would: signing appends the
/// local copayer's accept action, broadcasting and deleting drop the proposal from the pending
/// list. Failures are scripted per operation and proposal.
#[derive(Default)]
pub struct MockWalletService {
    state: Mutex<WalletState>,
}

impl MockWalletService {
    /// Creates a service without proposals.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the pending proposals served for `wallet_id`.
    pub fn set_proposals(&self, wallet_id: &WalletId, proposals: Vec<TransactionProposal>) {
        self.state().proposals.insert(wallet_id.clone(), proposals);
    }

    /// Returns the pending proposals currently held for `wallet_id`.
    pub fn proposals(&self, wallet_id: &WalletId) -> Vec<TransactionProposal> {
        self.state().proposals.get(wallet_id).cloned().unwrap_or_default()
    }

    /// Makes `accept_and_sign` of `txp_id` fail with `err`.
    pub fn fail_accept(&self, txp_id: &str, err: WalletServiceError) {
        self.state().failures.insert(("accept", txp_id.into()), err);
    }

    /// Makes `reject` of `txp_id` fail with `err`.
    pub fn fail_reject(&self, txp_id: &str, err: WalletServiceError) {
        self.state().failures.insert(("reject", txp_id.into()), err);
    }

    /// Makes `remove` of `txp_id` fail with `err`.
    pub fn fail_remove(&self, txp_id: &str, err: WalletServiceError) {
        self.state().failures.insert(("remove", txp_id.into()), err);
    }

    /// Makes `broadcast` of `txp_id` fail with `err`.
    pub fn fail_broadcast(&self, txp_id: &str, err: WalletServiceError) {
        self.state().failures.insert(("broadcast", txp_id.into()), err);
    }

    /// Makes `refresh_wallet_status` of `wallet_id` fail.
    pub fn fail_refresh(&self, wallet_id: &WalletId) {
        self.state().refresh_failures.insert(wallet_id.clone());
    }

    /// Makes `derive_receive_address` fail with `err`.
    pub fn fail_address(&self, err: WalletServiceError) {
        self.state().address_failure = Some(err);
    }

    /// Queues balances returned by successive `fetch_wallet_balance` calls; the last one repeats.
    pub fn push_balances<I>(&self, wallet_id: &WalletId, balances: I)
    where
        I: IntoIterator<Item = u64>,
    {
        self.state().balances.entry(wallet_id.clone()).or_default().extend(balances);
    }

    /// Returns the calls received so far.
    pub fn calls(&self) -> Vec<WalletCall> {
        self.state().calls.clone()
    }

    /// Returns how many calls satisfied `predicate`.
    pub fn count_calls<F>(&self, predicate: F) -> usize
    where
        F: Fn(&WalletCall) -> bool,
    {
        self.state().calls.iter().filter(|call| predicate(call)).count()
    }

    fn state(&self) -> MutexGuard<'_, WalletState> {
        self.state.lock().expect("mock state lock")
    }

    fn scripted_failure(&self, op: &'static str, txp_id: &TxpId) -> Result<(), WalletServiceError> {
        match self.state().failures.get(&(op, txp_id.clone())) {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }

    fn update<F>(&self, txp: &TransactionProposal, f: F)
    where
        F: FnOnce(&mut Vec<TransactionProposal>),
    {
        let mut state = self.state();
        let proposals = state.proposals.entry(txp.wallet_id().clone()).or_default();
        f(proposals);
    }
}

impl WalletService for MockWalletService {
    async fn get_pending_proposals(
        &self,
        wallet_id: &WalletId,
    ) -> Result<Vec<TransactionProposal>, WalletServiceError> {
        self.state().calls.push(WalletCall::GetPendingProposals(wallet_id.clone()));
        Ok(self.proposals(wallet_id))
    }

    async fn accept_and_sign(
        &self,
        txp: &TransactionProposal,
        _key: &Key,
        _wallet: &Wallet,
    ) -> Result<TransactionProposal, WalletServiceError> {
        self.state().calls.push(WalletCall::AcceptAndSign(txp.id().clone()));
        self.scripted_failure("accept", txp.id())?;

        let signed = fixtures::signed_by(txp.clone(), txp.copayer_id().as_str());

        self.update(txp, |proposals| {
            if let Some(slot) = proposals.iter_mut().find(|p| p.id() == txp.id()) {
                *slot = signed.clone();
            }
        });

        Ok(signed)
    }

    async fn reject(
        &self,
        txp: &TransactionProposal,
        _wallet: &Wallet,
    ) -> Result<(), WalletServiceError> {
        self.state().calls.push(WalletCall::Reject(txp.id().clone()));
        self.scripted_failure("reject", txp.id())?;

        let rejected = fixtures::with_action(txp.clone(), txp.copayer_id().as_str(), ActionKind::Reject);

        self.update(txp, |proposals| {
            if let Some(slot) = proposals.iter_mut().find(|p| p.id() == txp.id()) {
                *slot = rejected;
            }
        });

        Ok(())
    }

    async fn remove(
        &self,
        txp: &TransactionProposal,
        _wallet: &Wallet,
    ) -> Result<(), WalletServiceError> {
        self.state().calls.push(WalletCall::Remove(txp.id().clone()));
        self.scripted_failure("remove", txp.id())?;

        self.update(txp, |proposals| proposals.retain(|p| p.id() != txp.id()));

        Ok(())
    }

    async fn broadcast(
        &self,
        _wallet: &Wallet,
        txp: &TransactionProposal,
    ) -> Result<BroadcastedTx, WalletServiceError> {
        self.state().calls.push(WalletCall::Broadcast(txp.id().clone()));
        self.scripted_failure("broadcast", txp.id())?;

        if txp.status() != TxpStatus::Accepted {
            return Err(WalletServiceError::provider("proposal is not fully signed"));
        }

        self.update(txp, |proposals| proposals.retain(|p| p.id() != txp.id()));

        let tx = BroadcastedTx::builder()
            .txid(format!("txid-{}", txp.id()))
            .fee(txp.fee())
            .amount(txp.amount())
            .build();

        Ok(tx)
    }

    async fn refresh_wallet_status(
        &self,
        _key: &Key,
        wallet: &Wallet,
        force: bool,
    ) -> Result<(), WalletServiceError> {
        let mut state = self.state();
        state.calls.push(WalletCall::RefreshWalletStatus { wallet_id: wallet.id().clone(), force });

        if state.refresh_failures.contains(wallet.id()) {
            return Err(WalletServiceError::provider("wallet status unavailable"));
        }

        Ok(())
    }

    async fn derive_receive_address(
        &self,
        wallet: &Wallet,
        new_address: bool,
    ) -> Result<String, WalletServiceError> {
        let mut state = self.state();
        state.calls.push(WalletCall::DeriveReceiveAddress {
            wallet_id: wallet.id().clone(),
            new_address,
        });

        match state.address_failure.clone() {
            Some(err) => Err(err),
            None => Ok(format!("address-{}", wallet.id())),
        }
    }

    async fn fetch_wallet_balance(&self, wallet: &Wallet) -> Result<u64, WalletServiceError> {
        let mut state = self.state();
        state.calls.push(WalletCall::FetchWalletBalance(wallet.id().clone()));

        let queue = state.balances.entry(wallet.id().clone()).or_default();
        let balance = if queue.len() > 1 { queue.pop_front() } else { queue.front().copied() };

        balance.ok_or_else(|| WalletServiceError::provider("balance unavailable"))
    }
}

// PAYMENT REQUEST SERVICE
// ================================================================================================

/// An in-memory payment-request service answering every fetch with the same scripted response.
pub struct MockPaymentRequests {
    response: Mutex<Result<PayProDetails, PaymentRequestError>>,
    calls: Mutex<Vec<(Url, PaymentRequestPayload)>>,
}

impl MockPaymentRequests {
    /// Creates a service answering with `details`.
    pub fn returning(details: PayProDetails) -> Self {
        Self { response: Mutex::new(Ok(details)), calls: Mutex::default() }
    }

    /// Creates a service failing with `err`.
    pub fn failing(err: PaymentRequestError) -> Self {
        Self { response: Mutex::new(Err(err)), calls: Mutex::default() }
    }

    /// Changes the scripted response.
    pub fn respond_with(&self, response: Result<PayProDetails, PaymentRequestError>) {
        *self.response.lock().expect("mock response lock") = response;
    }

    /// Returns the URLs and payloads fetched so far.
    pub fn calls(&self) -> Vec<(Url, PaymentRequestPayload)> {
        self.calls.lock().expect("mock calls lock").clone()
    }
}

impl PaymentRequestService for MockPaymentRequests {
    async fn fetch_payment_request(
        &self,
        url: &Url,
        _coin: &str,
        _chain: &str,
        payload: &PaymentRequestPayload,
    ) -> Result<PayProDetails, PaymentRequestError> {
        self.calls.lock().expect("mock calls lock").push((url.clone(), payload.clone()));
        self.response.lock().expect("mock response lock").clone()
    }
}

// CONFIRMATION
// ================================================================================================

/// A confirmation dialog with a fixed answer.
pub struct MockConfirm {
    answer: bool,
    prompts: Mutex<Vec<ConfirmPrompt>>,
}

impl MockConfirm {
    /// A dialog the user always confirms.
    pub fn accepting() -> Self {
        Self { answer: true, prompts: Mutex::default() }
    }

    /// A dialog the user always dismisses.
    pub fn declining() -> Self {
        Self { answer: false, prompts: Mutex::default() }
    }

    /// Returns the prompts shown so far.
    pub fn prompts(&self) -> Vec<ConfirmPrompt> {
        self.prompts.lock().expect("mock prompts lock").clone()
    }
}

impl ConfirmAction for MockConfirm {
    async fn confirm(&self, prompt: &ConfirmPrompt) -> bool {
        self.prompts.lock().expect("mock prompts lock").push(prompt.clone());
        self.answer
    }
}
