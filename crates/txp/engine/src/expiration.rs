//! Countdown of merchant payment requests.
//!
//! An [`ExpirationTracker`] belongs to one open proposal screen. It walks through
//! `Idle -> Fetching -> Active -> Expired` and owns at most one countdown task, which is aborted
//! when the request expires, when the tracker is stopped or restarted, and when it is dropped.

use core::time::Duration;
use std::sync::Arc;

use multisig_txp_domain::{
    paypro::{PayProDetails, PaymentRequestGate, RemainingTime},
    proposal::TransactionProposal,
    wallet::Wallet,
};
use tokio::{
    sync::watch,
    task::JoinHandle,
    time::{self, MissedTickBehavior},
};
use url::Url;

use crate::{
    config::MIN_PERIOD,
    error::{Result, TxpEngineError},
    service::{
        Clock, PaymentRequestError, PaymentRequestPayload, PaymentRequestService, WalletService,
    },
};

/// The state of a proposal's payment request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PayProState {
    /// Nothing fetched, either not started yet or the last fetch failed.
    Idle,
    /// Fetching the payment request.
    Fetching,
    /// The payment request can still be paid.
    Active {
        /// Fetched request metadata.
        details: PayProDetails,
        /// Time left before expiry.
        remaining: RemainingTime,
    },
    /// The payment request can no longer be paid.
    Expired {
        /// Fetched request metadata.
        details: PayProDetails,
    },
}

impl PayProState {
    /// Returns the fetched metadata, if any.
    pub fn details(&self) -> Option<&PayProDetails> {
        match self {
            Self::Active { details, .. } | Self::Expired { details } => Some(details),
            Self::Idle | Self::Fetching => None,
        }
    }

    /// Returns the countdown as displayed, `MM:SS` or `Expired`.
    pub fn remaining_str(&self) -> Option<String> {
        match self {
            Self::Active { remaining, .. } => Some(remaining.to_string()),
            Self::Expired { .. } => Some(RemainingTime::Expired.to_string()),
            Self::Idle | Self::Fetching => None,
        }
    }

    /// Returns the gate the state imposes on the proposal's actions.
    pub fn gate(&self) -> PaymentRequestGate {
        match self {
            Self::Idle => PaymentRequestGate::Unavailable,
            Self::Fetching => PaymentRequestGate::Loading,
            Self::Active { .. } => PaymentRequestGate::Ready,
            Self::Expired { .. } => PaymentRequestGate::Expired,
        }
    }

    fn at(details: PayProDetails, remaining: RemainingTime) -> Self {
        match remaining {
            RemainingTime::Expired => Self::Expired { details },
            remaining @ RemainingTime::Active(_) => Self::Active { details, remaining },
        }
    }
}

/// Tracks the expiry of one proposal's payment request.
pub struct ExpirationTracker {
    clock: Arc<dyn Clock>,
    tick: Duration,
    state: Arc<watch::Sender<PayProState>>,
    countdown: Option<JoinHandle<()>>,
}

impl ExpirationTracker {
    /// Creates an idle tracker whose countdown ticks every `tick`, at least every millisecond.
    pub fn new(clock: Arc<dyn Clock>, tick: Duration) -> Self {
        let (state, _) = watch::channel(PayProState::Idle);
        let tick = tick.max(MIN_PERIOD);
        Self { clock, tick, state: Arc::new(state), countdown: None }
    }

    /// Returns the current state.
    pub fn state(&self) -> PayProState {
        self.state.borrow().clone()
    }

    /// Returns a receiver notified on every state change.
    pub fn subscribe(&self) -> watch::Receiver<PayProState> {
        self.state.subscribe()
    }

    /// Returns the gate the current state imposes on the proposal's actions.
    pub fn gate(&self) -> PaymentRequestGate {
        self.state.borrow().gate()
    }

    /// Returns `true` while a countdown task is running.
    pub fn is_counting_down(&self) -> bool {
        self.countdown.as_ref().is_some_and(|handle| !handle.is_finished())
    }

    /// Fetches the payment request of `txp` and starts the countdown.
    ///
    /// A receive address of `wallet` is derived first and posted along with the request. On
    /// failure the tracker returns to [`PayProState::Idle`]; no retry is scheduled.
    #[tracing::instrument(skip_all, fields(wallet_id = %wallet.id(), txp_id = %txp.id()))]
    pub async fn start<W, P>(
        &mut self,
        wallet_service: &W,
        payment_requests: &P,
        wallet: &Wallet,
        txp: &TransactionProposal,
    ) -> Result<PayProState>
    where
        W: WalletService,
        P: PaymentRequestService,
    {
        let Some(pay_pro_url) = txp.pay_pro_url() else {
            return Err(TxpEngineError::not_actionable("proposal carries no payment request"));
        };

        self.stop();
        self.state.send_replace(PayProState::Fetching);

        let details = match fetch(wallet_service, payment_requests, wallet, txp, pay_pro_url).await {
            Ok(details) => details,
            Err(e) => {
                tracing::warn!("error fetching this invoice: {e}");
                self.state.send_replace(PayProState::Idle);
                return Err(e);
            },
        };

        let state = PayProState::at(details.clone(), details.remaining_at(self.clock.now()));
        self.state.send_replace(state.clone());

        if !matches!(state, PayProState::Expired { .. }) {
            self.countdown = Some(tokio::spawn(count_down(
                Arc::clone(&self.clock),
                self.tick,
                Arc::clone(&self.state),
                details,
            )));
        }

        Ok(state)
    }

    /// Cancels the countdown and returns to [`PayProState::Idle`].
    pub fn stop(&mut self) {
        if let Some(handle) = self.countdown.take() {
            handle.abort();
        }

        self.state.send_if_modified(|state| {
            let modified = *state != PayProState::Idle;
            *state = PayProState::Idle;
            modified
        });
    }
}

impl Drop for ExpirationTracker {
    fn drop(&mut self) {
        if let Some(handle) = self.countdown.take() {
            handle.abort();
        }
    }
}

async fn fetch<W, P>(
    wallet_service: &W,
    payment_requests: &P,
    wallet: &Wallet,
    txp: &TransactionProposal,
    pay_pro_url: &str,
) -> Result<PayProDetails>
where
    W: WalletService,
    P: PaymentRequestService,
{
    let url = Url::parse(pay_pro_url)
        .map_err(|e| PaymentRequestError::InvalidUrl(e.to_string().into()))?;

    let address = wallet_service
        .derive_receive_address(wallet, false)
        .await
        .map_err(TxpEngineError::address)?;

    let payload = PaymentRequestPayload { address };

    payment_requests
        .fetch_payment_request(&url, txp.coin(), txp.chain(), &payload)
        .await
        .map_err(From::from)
}

async fn count_down(
    clock: Arc<dyn Clock>,
    tick: Duration,
    state: Arc<watch::Sender<PayProState>>,
    details: PayProDetails,
) {
    let mut interval = time::interval(tick);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        interval.tick().await;

        let remaining = details.remaining_at(clock.now());
        let next = PayProState::at(details.clone(), remaining);

        state.send_if_modified(|current| {
            let modified = *current != next;
            *current = next;
            modified
        });

        if remaining.is_expired() {
            tracing::debug!("payment request expired");
            break;
        }
    }
}
