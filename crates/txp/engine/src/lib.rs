//! Transaction proposal engine.
//!
//! This crate drives the lifecycle of multisig transaction proposals on top of the
//! [`TxpStore`]: it groups proposals for display, tracks the user's batch selection, signs,
//! rejects, deletes and broadcasts proposals through a [`WalletService`], and tracks the expiry
//! of merchant payment requests.
//!
//! # Main Components
//!
//! - [`TxpEngine`] - Orchestrates every state-changing operation
//! - [`GroupedProposals`] - Sectioned, wallet-grouped view of the store
//! - [`SelectionEngine`] - Single-wallet multi-selection for batch signing
//! - [`ExpirationTracker`] - Payment-request countdown owned by one open proposal
//! - [`TxpEngineError`] - The error every operation maps its failures into
//!
//! # Usage
//!
//! ```ignore
//! let engine = TxpEngine::builder()
//!     .wallet_service(wallet_service.into())
//!     .payment_requests(payment_requests.into())
//!     .store(store.into())
//!     .config(config::get_configuration()?)
//!     .build();
//!
//! let grouped = engine.sections(&ProposalScope::All);
//!
//! let request = AcceptRequest::builder().wallet_id(wallet_id).txp_id(txp_id).build();
//! let response = engine.accept_and_sign(request).await?;
//! ```

pub mod config;

mod balance;
mod error;
mod expiration;
mod in_flight;
mod sections;
mod selection;
mod service;
mod types;

pub use self::{
    error::TxpEngineError,
    expiration::{ExpirationTracker, PayProState},
    sections::{
        ClassifiedProposal, GroupedProposals, ProposalScope, ProposalSection, SectionKind,
        WalletGroup,
    },
    selection::{SelectionEngine, SelectionSet},
    service::{
        BroadcastedTx, Clock, ConfirmAction, ConfirmPrompt, PaymentRequestError,
        PaymentRequestPayload, PaymentRequestService, SystemClock, WalletService,
        WalletServiceError,
    },
    types::{request, response},
};

use std::sync::Arc;

use futures::future;
use itertools::Itertools;
use multisig_txp_domain::{
    TxpId, WalletId,
    actions::ActionAvailability,
    classify,
    paypro::PaymentRequestGate,
    proposal::{TransactionProposal, TxpStatus},
    wallet::{Key, Wallet},
};
use multisig_txp_store::TxpStore;

use self::{
    config::EngineConfig,
    error::Result,
    in_flight::{InFlight, InFlightGuard},
    types::{
        request::{
            AcceptRequest, AcceptRequestDissolved, BroadcastRequest, BroadcastRequestDissolved,
            GetProposalRequest, GetProposalRequestDissolved, RefreshWalletRequest,
            RefreshWalletRequestDissolved, RejectRequest, RejectRequestDissolved, RemoveRequest,
            RemoveRequestDissolved, SignBatchRequest, SignBatchRequestDissolved,
        },
        response::{
            AcceptResponse, BroadcastOutcome, BroadcastResponse, ConfirmedOutcome,
            GetProposalResponse, PaymentTitle, RefreshResponse, SignBatchResponse,
        },
    },
};

/// Orchestrates signing, rejecting, deleting and broadcasting proposals.
///
/// Operations on the same proposal are mutually exclusive: while one is running, any other
/// fails with [`TxpEngineError::OperationInFlight`]. After every successful state change the
/// wallet's status is force-refreshed and its proposal list replaced in the store.
pub struct TxpEngine<W, P> {
    wallet_service: Arc<W>,
    payment_requests: Arc<P>,
    store: Arc<TxpStore>,
    clock: Arc<dyn Clock>,
    config: EngineConfig,
    in_flight: InFlight,
}

/// A proposal resolved from the store together with its wallet and key.
struct Resolved {
    wallet: Wallet,
    key: Key,
    txp: TransactionProposal,
}

#[bon::bon]
impl<W, P> TxpEngine<W, P>
where
    W: WalletService,
    P: PaymentRequestService,
{
    /// Creates an engine over `store`.
    #[builder]
    pub fn new(
        wallet_service: Arc<W>,
        payment_requests: Arc<P>,
        store: Arc<TxpStore>,
        #[builder(default = Arc::new(SystemClock) as Arc<dyn Clock>)] clock: Arc<dyn Clock>,
        #[builder(default)] config: EngineConfig,
    ) -> Self {
        Self {
            wallet_service,
            payment_requests,
            store,
            clock,
            config,
            in_flight: InFlight::default(),
        }
    }
}

impl<W, P> TxpEngine<W, P>
where
    W: WalletService,
    P: PaymentRequestService,
{
    /// Returns the proposal store.
    pub fn store(&self) -> &Arc<TxpStore> {
        &self.store
    }

    /// Returns the engine configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Returns `true` while an operation on the proposal is running.
    pub fn is_busy(&self, wallet_id: &WalletId, txp_id: &TxpId) -> bool {
        self.in_flight.is_busy(wallet_id, txp_id)
    }

    /// Groups the proposals selected by `scope` for display.
    pub fn sections(&self, scope: &ProposalScope) -> GroupedProposals {
        GroupedProposals::from_snapshot(&self.store.snapshot(), scope)
    }

    /// Returns a proposal with everything derived from it for the local copayer.
    pub fn get_proposal(&self, request: GetProposalRequest) -> Result<GetProposalResponse> {
        let GetProposalRequestDissolved { wallet_id, txp_id, payment } = request.dissolve();

        let resolved = self.resolve(&wallet_id, &txp_id)?;

        Ok(self.evaluate(&resolved, payment))
    }

    /// Signs a proposal.
    ///
    /// When the local signature completes the proposal, it is broadcast right away and a balance
    /// watch is started; the success title is then [`PaymentTitle::Sent`].
    ///
    /// Once the signature is recorded the wallet is refreshed even if the broadcast fails.
    #[tracing::instrument(skip_all, fields(wallet_id, txp_id))]
    pub async fn accept_and_sign(&self, request: AcceptRequest) -> Result<AcceptResponse> {
        let AcceptRequestDissolved { wallet_id, txp_id, payment } = request.dissolve();
        record_ids(&wallet_id, Some(&txp_id));

        let resolved = self.resolve(&wallet_id, &txp_id)?;
        let gate = payment_gate(&resolved.txp, payment);
        let last_signer = classify::is_last_signer(&resolved.txp);

        let (signed, _guard) = self.sign_one(&resolved, gate).await?;

        let sent = if signed.status() == TxpStatus::Accepted {
            Some(self.broadcast_one(&resolved.wallet, &signed).await)
        } else {
            None
        };

        self.refresh_after_change(&resolved.key, &resolved.wallet).await;

        let broadcast = sent
            .transpose()?
            .map(|tx| self.watch_balance(&resolved.key, &resolved.wallet, vec![tx]));

        let response = AcceptResponse::builder()
            .proposal(signed)
            .title(PaymentTitle::for_last_signer(last_signer))
            .maybe_broadcast(broadcast)
            .build();

        Ok(response)
    }

    /// Signs several proposals of one wallet.
    ///
    /// Every proposal is attempted and reported on individually, except after a password error:
    /// the failing proposal and every later one report that error and are not attempted, see
    /// [`SignBatchResponse::aborted`]. Proposals completed by the local signature are broadcast
    /// and a single balance watch covering all of them is started, then the wallet is refreshed.
    #[tracing::instrument(skip_all, fields(wallet_id))]
    pub async fn sign_batch(&self, request: SignBatchRequest) -> Result<SignBatchResponse> {
        let SignBatchRequestDissolved { wallet_id, txp_ids } = request.dissolve();
        record_ids(&wallet_id, None);

        let (wallet, key) = self.resolve_wallet(&wallet_id)?;

        if key.is_read_only() {
            return Err(TxpEngineError::not_actionable("the wallet's key cannot sign"));
        }

        let snapshot = self.store.snapshot();
        let mut results = Vec::with_capacity(txp_ids.len());
        let mut guards = Vec::with_capacity(txp_ids.len());
        let mut aborted: Option<TxpEngineError> = None;

        for txp_id in &txp_ids {
            if let Some(e) = &aborted {
                results.push(Err(e.clone()));
                continue;
            }

            let result = match snapshot.proposal(&wallet_id, txp_id) {
                Some(txp) => {
                    let resolved =
                        Resolved { wallet: wallet.clone(), key: key.clone(), txp: txp.clone() };
                    // batches do not wait on payment requests
                    self.sign_one(&resolved, PaymentRequestGate::NotRequired).await.map(
                        |(signed, guard)| {
                            guards.push(guard);
                            signed
                        },
                    )
                },
                None => Err(TxpEngineError::not_found(format!("proposal {txp_id} not found"))),
            };

            if let Some(e) = result.as_ref().err().filter(|e| e.is_user_recoverable()) {
                tracing::debug!(%txp_id, "batch stopped: {e}");
                aborted = Some(e.clone());
            }

            results.push(result);
        }

        let mut txs = Vec::new();

        for result in &mut results {
            let Ok(signed) = &*result else {
                continue;
            };

            if signed.status() != TxpStatus::Accepted {
                continue;
            }

            let sent = self.broadcast_one(&wallet, signed).await;

            match sent {
                Ok(tx) => txs.push(tx),
                Err(e) => *result = Err(e),
            }
        }

        let broadcast = (!txs.is_empty()).then(|| self.watch_balance(&key, &wallet, txs));

        drop(guards);
        self.refresh_after_change(&key, &wallet).await;

        let response = SignBatchResponse::builder()
            .results(results)
            .maybe_broadcast(broadcast)
            .maybe_aborted(aborted)
            .build();

        tracing::info!(
            success = response.success_count(),
            failed = response.failed_count(),
            "batch signed"
        );

        Ok(response)
    }

    /// Signs the proposals selected in `selection`, then clears it whatever the outcome.
    ///
    /// Proposals are signed in the order the store lists them; selected ids no longer in the
    /// store are skipped.
    pub async fn sign_selected(&self, selection: &mut SelectionEngine) -> Result<SignBatchResponse> {
        let current = selection.current();

        let Some(wallet_id) = current.wallet_id().filter(|_| !current.is_empty()).cloned() else {
            return Err(TxpEngineError::not_actionable("no proposal selected"));
        };

        let txp_ids = self
            .store
            .snapshot()
            .proposals(&wallet_id)
            .iter()
            .map(TransactionProposal::id)
            .filter(|txp_id| current.contains(txp_id))
            .cloned()
            .collect();

        let request = SignBatchRequest::builder().wallet_id(wallet_id).txp_ids(txp_ids).build();
        let result = self.sign_batch(request).await;

        selection.clear();

        result
    }

    /// Rejects a proposal once the user confirms.
    #[tracing::instrument(skip_all, fields(wallet_id, txp_id))]
    pub async fn reject<C>(&self, request: RejectRequest, confirm: &C) -> Result<ConfirmedOutcome>
    where
        C: ConfirmAction,
    {
        let RejectRequestDissolved { wallet_id, txp_id, payment } = request.dissolve();
        record_ids(&wallet_id, Some(&txp_id));

        let resolved = self.resolve(&wallet_id, &txp_id)?;

        if !self.evaluate(&resolved, payment).availability().reject() {
            return Err(TxpEngineError::not_actionable("proposal cannot be rejected"));
        }

        let _guard = self.in_flight.acquire(&wallet_id, &txp_id)?;

        if !confirm.confirm(&ConfirmPrompt::REJECT).await {
            tracing::debug!(%txp_id, "rejection canceled");
            return Ok(ConfirmedOutcome::Canceled);
        }

        self.wallet_service
            .reject(&resolved.txp, &resolved.wallet)
            .await
            .map_err(TxpEngineError::service)?;

        tracing::info!(%wallet_id, %txp_id, "proposal rejected");

        self.refresh_after_change(&resolved.key, &resolved.wallet).await;

        Ok(ConfirmedOutcome::Completed)
    }

    /// Deletes a proposal once the user confirms.
    #[tracing::instrument(skip_all, fields(wallet_id, txp_id))]
    pub async fn remove<C>(&self, request: RemoveRequest, confirm: &C) -> Result<ConfirmedOutcome>
    where
        C: ConfirmAction,
    {
        let RemoveRequestDissolved { wallet_id, txp_id } = request.dissolve();
        record_ids(&wallet_id, Some(&txp_id));

        let resolved = self.resolve(&wallet_id, &txp_id)?;

        if !self.evaluate(&resolved, None).availability().remove() {
            return Err(TxpEngineError::not_actionable("proposal cannot be deleted"));
        }

        let _guard = self.in_flight.acquire(&wallet_id, &txp_id)?;

        if !confirm.confirm(&ConfirmPrompt::REMOVE).await {
            tracing::debug!(%txp_id, "removal canceled");
            return Ok(ConfirmedOutcome::Canceled);
        }

        self.wallet_service
            .remove(&resolved.txp, &resolved.wallet)
            .await
            .map_err(TxpEngineError::service)?;

        tracing::info!(%wallet_id, %txp_id, "proposal removed");

        self.refresh_after_change(&resolved.key, &resolved.wallet).await;

        Ok(ConfirmedOutcome::Completed)
    }

    /// Broadcasts a fully signed proposal and starts watching for the resulting balance.
    #[tracing::instrument(skip_all, fields(wallet_id, txp_id))]
    pub async fn broadcast(&self, request: BroadcastRequest) -> Result<BroadcastResponse> {
        let BroadcastRequestDissolved { wallet_id, txp_id, payment } = request.dissolve();
        record_ids(&wallet_id, Some(&txp_id));

        let resolved = self.resolve(&wallet_id, &txp_id)?;

        if !self.evaluate(&resolved, payment).availability().broadcast() {
            return Err(TxpEngineError::not_actionable("proposal cannot be broadcast"));
        }

        let _guard = self.in_flight.acquire(&wallet_id, &txp_id)?;

        let title = PaymentTitle::for_last_signer(classify::is_last_signer(&resolved.txp));

        let tx = self.broadcast_one(&resolved.wallet, &resolved.txp).await?;
        let broadcast = self.watch_balance(&resolved.key, &resolved.wallet, vec![tx]);

        self.refresh_after_change(&resolved.key, &resolved.wallet).await;

        Ok(BroadcastResponse::builder().title(title).broadcast(broadcast).build())
    }

    /// Force-refreshes a wallet and replaces its proposal list in the store.
    #[tracing::instrument(skip_all, fields(wallet_id))]
    pub async fn refresh_wallet(&self, request: RefreshWalletRequest) -> Result<()> {
        let RefreshWalletRequestDissolved { wallet_id } = request.dissolve();
        record_ids(&wallet_id, None);

        let (wallet, key) = self.resolve_wallet(&wallet_id)?;

        self.refresh(&key, &wallet).await
    }

    /// Force-refreshes, concurrently, every wallet of every key holding at least one proposal.
    ///
    /// Individual failures are logged and counted rather than aborting the refresh.
    #[tracing::instrument(skip_all)]
    pub async fn refresh_wallets_with_proposals(&self) -> RefreshResponse {
        let snapshot = self.store.snapshot();

        let keys = snapshot
            .all_proposals()
            .map(TransactionProposal::wallet_id)
            .unique()
            .filter_map(|wallet_id| snapshot.key_of_wallet(wallet_id))
            .unique_by(|key| key.id().clone())
            .cloned();

        let (read_only, signing): (Vec<_>, Vec<_>) = keys.partition(Key::is_read_only);

        tracing::debug!(
            signing = signing.len(),
            read_only = read_only.len(),
            "refreshing keys with proposals"
        );

        let wallets = signing
            .iter()
            .chain(&read_only)
            .flat_map(|key| snapshot.wallets_of_key(key.id()).map(move |wallet| (key, wallet)));

        let results =
            future::join_all(wallets.map(|(key, wallet)| self.refresh(key, wallet))).await;

        let failed = results.iter().filter(|result| result.is_err()).count();

        if failed > 0 {
            tracing::warn!(failed, "failed to update some wallets");
        }

        RefreshResponse::builder().refreshed(results.len() - failed).failed(failed).build()
    }

    /// Creates an idle payment-request tracker using the engine's clock and countdown tick.
    pub fn expiration_tracker(&self) -> ExpirationTracker {
        ExpirationTracker::new(Arc::clone(&self.clock), self.config.countdown_tick)
    }

    /// Fetches the payment request of a proposal and starts `tracker`'s countdown.
    pub async fn open_payment_request(
        &self,
        tracker: &mut ExpirationTracker,
        wallet_id: &WalletId,
        txp_id: &TxpId,
    ) -> Result<PayProState> {
        let Resolved { wallet, txp, .. } = self.resolve(wallet_id, txp_id)?;

        tracker
            .start(self.wallet_service.as_ref(), self.payment_requests.as_ref(), &wallet, &txp)
            .await
    }

    #[tracing::instrument(skip_all, fields(txp_id = %resolved.txp.id(), ?gate))]
    async fn sign_one(
        &self,
        resolved: &Resolved,
        gate: PaymentRequestGate,
    ) -> Result<(TransactionProposal, InFlightGuard)> {
        let Resolved { wallet, key, txp } = resolved;

        let classification = classify::classify(txp, txp.copayer_id());
        let can_be_removed = self.can_be_removed(txp);
        let availability =
            ActionAvailability::evaluate(txp, &classification, can_be_removed, wallet, key, gate);

        if !availability.accept() {
            return Err(TxpEngineError::not_actionable("proposal cannot be signed"));
        }

        let guard = self.in_flight.acquire(wallet.id(), txp.id())?;

        let signed = self
            .wallet_service
            .accept_and_sign(txp, key, wallet)
            .await
            .map_err(TxpEngineError::signing)?;

        tracing::info!(status = %signed.status(), "proposal signed");

        Ok((signed, guard))
    }

    #[tracing::instrument(skip_all, fields(txp_id = %txp.id()))]
    async fn broadcast_one(
        &self,
        wallet: &Wallet,
        txp: &TransactionProposal,
    ) -> Result<BroadcastedTx> {
        tracing::debug!("trying to broadcast proposal");

        match self.wallet_service.broadcast(wallet, txp).await {
            Ok(tx) => {
                tracing::debug!(txid = tx.txid(), "proposal broadcast");
                Ok(tx)
            },
            Err(e) => {
                tracing::error!(
                    coin = txp.coin(),
                    chain = txp.chain(),
                    network = wallet.network(),
                    raw = txp.raw().unwrap_or_default(),
                    "could not broadcast proposal: {e}"
                );
                Err(TxpEngineError::broadcast(e))
            },
        }
    }

    fn watch_balance(&self, key: &Key, wallet: &Wallet, txs: Vec<BroadcastedTx>) -> BroadcastOutcome {
        let spent = txs.iter().map(BroadcastedTx::total_spent).fold(0, u64::saturating_add);
        let target_balance = wallet.balance().saturating_sub(spent);

        let balance_watch = tokio::spawn(balance::wait_for_target_balance(
            Arc::clone(&self.wallet_service),
            Arc::clone(&self.store),
            key.clone(),
            wallet.clone(),
            target_balance,
            self.config.balance_poll,
        ));

        BroadcastOutcome::builder()
            .txs(txs)
            .target_balance(target_balance)
            .balance_watch(balance_watch)
            .build()
    }

    #[tracing::instrument(skip_all, fields(wallet_id = %wallet.id()))]
    async fn refresh(&self, key: &Key, wallet: &Wallet) -> Result<()> {
        self.wallet_service
            .refresh_wallet_status(key, wallet, true)
            .await
            .map_err(TxpEngineError::service)?;

        let proposals = self
            .wallet_service
            .get_pending_proposals(wallet.id())
            .await
            .map_err(TxpEngineError::service)?;

        self.store.replace_proposals(wallet.id(), proposals)?;

        Ok(())
    }

    async fn refresh_after_change(&self, key: &Key, wallet: &Wallet) {
        if let Err(e) = self.refresh(key, wallet).await {
            tracing::warn!(wallet_id = %wallet.id(), "failed to refresh wallet: {e}");
        }
    }

    fn evaluate(&self, resolved: &Resolved, payment: Option<PaymentRequestGate>) -> GetProposalResponse {
        let Resolved { wallet, key, txp } = resolved;

        let classification = classify::classify(txp, txp.copayer_id());
        let can_be_removed = self.can_be_removed(txp);
        let availability = ActionAvailability::evaluate(
            txp,
            &classification,
            can_be_removed,
            wallet,
            key,
            payment_gate(txp, payment),
        );

        GetProposalResponse::builder()
            .proposal(txp.clone())
            .classification(classification)
            .can_be_removed(can_be_removed)
            .last_signer(classification.last_signer())
            .availability(availability)
            .build()
    }

    fn can_be_removed(&self, txp: &TransactionProposal) -> bool {
        classify::can_be_removed(
            txp,
            txp.copayer_id(),
            self.clock.now(),
            self.config.removal_grace_delta(),
        )
    }

    fn resolve_wallet(&self, wallet_id: &WalletId) -> Result<(Wallet, Key)> {
        let snapshot = self.store.snapshot();

        let wallet = snapshot
            .wallet(wallet_id)
            .ok_or_else(|| TxpEngineError::not_found(format!("wallet {wallet_id} not found")))?;

        let key = snapshot.key(wallet.key_id()).ok_or_else(|| {
            TxpEngineError::not_found(format!("key {} not found", wallet.key_id()))
        })?;

        Ok((wallet.clone(), key.clone()))
    }

    fn resolve(&self, wallet_id: &WalletId, txp_id: &TxpId) -> Result<Resolved> {
        let (wallet, key) = self.resolve_wallet(wallet_id)?;

        let txp = self
            .store
            .snapshot()
            .proposal(wallet_id, txp_id)
            .cloned()
            .ok_or_else(|| TxpEngineError::not_found(format!("proposal {txp_id} not found")))?;

        Ok(Resolved { wallet, key, txp })
    }
}

/// Records the ids of the operation's target on the current span.
fn record_ids(wallet_id: &WalletId, txp_id: Option<&TxpId>) {
    let span = tracing::Span::current();
    span.record("wallet_id", tracing::field::display(wallet_id));

    if let Some(txp_id) = txp_id {
        span.record("txp_id", tracing::field::display(txp_id));
    }
}

/// Proposals carrying a payment request are gated by it; an unknown state counts as still
/// loading.
fn payment_gate(txp: &TransactionProposal, payment: Option<PaymentRequestGate>) -> PaymentRequestGate {
    match (txp.pay_pro_url(), payment) {
        (None, _) => PaymentRequestGate::NotRequired,
        (Some(_), None | Some(PaymentRequestGate::NotRequired)) => PaymentRequestGate::Loading,
        (Some(_), Some(gate)) => gate,
    }
}
