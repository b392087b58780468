//! payment request countdown tests for multisig-txp-engine

use core::time::Duration;

use std::sync::Arc;

use chrono::TimeDelta;
use multisig_txp_domain::{
    TxpId, WalletId,
    paypro::{PayProDetails, PaymentRequestGate, RemainingTime},
};
use multisig_txp_engine::{
    Clock, ExpirationTracker, PayProState, PaymentRequestError, TxpEngine, TxpEngineError,
    WalletServiceError,
    request::{AcceptRequest, GetProposalRequest},
};
use multisig_txp_store::TxpStore;
use multisig_txp_test_utils::{
    MockPaymentRequests, MockWalletService, TokioClock, WalletCall, fixtures,
};

const INVOICE_URL: &str = "https://merchant.example/i/42";

type Engine = TxpEngine<MockWalletService, MockPaymentRequests>;

fn engine(
    payment_requests: Arc<MockPaymentRequests>,
    clock: Arc<dyn Clock>,
) -> (Engine, Arc<MockWalletService>) {
    multisig_txp_test_utils::init_tracing();

    let store = Arc::new(TxpStore::new());
    let service = Arc::new(MockWalletService::new());

    let wallet = fixtures::wallet("wallet-1", "key-1", 2, 3);
    let txp = fixtures::with_pay_pro_url(fixtures::proposal("txp-1", "wallet-1", 3), INVOICE_URL);

    store.insert_key(fixtures::key("key-1")).unwrap();
    store.insert_wallet(wallet).unwrap();
    store.replace_proposals(&wallet_1(), vec![txp.clone()]).unwrap();
    service.set_proposals(&wallet_1(), vec![txp]);

    let engine = TxpEngine::builder()
        .wallet_service(Arc::clone(&service))
        .payment_requests(payment_requests)
        .store(store)
        .clock(clock)
        .build();

    (engine, service)
}

fn invoice(expires_in: TimeDelta) -> PayProDetails {
    fixtures::pay_pro_details(fixtures::base_time(), expires_in)
}

fn tokio_clock() -> Arc<dyn Clock> {
    Arc::new(TokioClock::new(fixtures::base_time()))
}

fn wallet_1() -> WalletId {
    fixtures::wallet_id("wallet-1")
}

fn txp_1() -> TxpId {
    "txp-1".into()
}

#[tokio::test(start_paused = true)]
async fn countdown_decreases_until_expiry() {
    // Arrange
    let payment_requests = Arc::new(MockPaymentRequests::returning(invoice(TimeDelta::seconds(90))));
    let clock = tokio_clock();
    let (engine, service) = engine(Arc::clone(&payment_requests), Arc::clone(&clock));

    let mut tracker = engine.expiration_tracker();
    let mut rx = tracker.subscribe();

    // Act
    let state = engine.open_payment_request(&mut tracker, &wallet_1(), &txp_1()).await.unwrap();

    // Assert
    assert!(matches!(state, PayProState::Active { remaining: RemainingTime::Active(90), .. }));
    assert_eq!(state.remaining_str().as_deref(), Some("01:30"));
    assert_eq!(tracker.gate(), PaymentRequestGate::Ready);
    assert!(tracker.is_counting_down());

    assert!(service.calls().contains(&WalletCall::DeriveReceiveAddress {
        wallet_id: wallet_1(),
        new_address: false,
    }));

    let calls = payment_requests.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].0.as_str(), INVOICE_URL);
    assert_eq!(calls[0].1.address, "address-wallet-1");

    let _ = rx.borrow_and_update();
    let mut last = 90;

    loop {
        rx.changed().await.unwrap();
        let state = rx.borrow_and_update().clone();

        match state {
            PayProState::Active { remaining: RemainingTime::Active(secs), .. } => {
                assert!(secs < last, "countdown went from {last} to {secs}");
                last = secs;
            },
            PayProState::Expired { .. } => break,
            other => panic!("unexpected state {other:?}"),
        }
    }

    assert!(clock.now() - fixtures::base_time() >= TimeDelta::seconds(90));
    assert_eq!(tracker.state().remaining_str().as_deref(), Some("Expired"));
    assert_eq!(tracker.gate(), PaymentRequestGate::Expired);

    tokio::time::sleep(Duration::from_secs(1)).await;
    assert!(!tracker.is_counting_down());
}

#[tokio::test(start_paused = true)]
async fn already_expired_invoice_starts_no_countdown() {
    let payment_requests = Arc::new(MockPaymentRequests::returning(invoice(TimeDelta::seconds(-1))));
    let (engine, _) = engine(payment_requests, tokio_clock());

    let mut tracker = engine.expiration_tracker();
    let state = engine.open_payment_request(&mut tracker, &wallet_1(), &txp_1()).await.unwrap();

    assert!(matches!(state, PayProState::Expired { .. }));
    assert!(!tracker.is_counting_down());

    let response = engine
        .get_proposal(
            GetProposalRequest::builder()
                .wallet_id(wallet_1())
                .txp_id(txp_1())
                .payment(tracker.gate())
                .build(),
        )
        .unwrap();

    assert!(response.availability().payment_unpayable());
    assert!(!response.availability().accept());
}

#[tokio::test(start_paused = true)]
async fn fetch_failure_returns_to_idle() {
    let payment_requests = Arc::new(MockPaymentRequests::failing(PaymentRequestError::Network(
        "invoice not found".into(),
    )));
    let (engine, _) = engine(payment_requests, tokio_clock());

    let mut tracker = engine.expiration_tracker();
    let err = engine.open_payment_request(&mut tracker, &wallet_1(), &txp_1()).await.unwrap_err();

    assert_eq!(err, TxpEngineError::PaymentRequest("invoice not found".into()));
    assert_eq!(err.user_title(), Some("Error fetching this invoice"));
    assert_eq!(err.user_message().as_deref(), Some("invoice not found"));

    assert_eq!(tracker.state(), PayProState::Idle);
    assert_eq!(tracker.gate(), PaymentRequestGate::Unavailable);
    assert!(!tracker.is_counting_down());

    let request = AcceptRequest::builder()
        .wallet_id(wallet_1())
        .txp_id(txp_1())
        .payment(tracker.gate())
        .build();
    let err = engine.accept_and_sign(request).await.unwrap_err();
    assert!(matches!(err, TxpEngineError::NotActionable(_)));
}

#[tokio::test(start_paused = true)]
async fn address_failure_skips_the_fetch() {
    let payment_requests = Arc::new(MockPaymentRequests::returning(invoice(TimeDelta::seconds(90))));
    let (engine, service) = engine(Arc::clone(&payment_requests), tokio_clock());

    service.fail_address(WalletServiceError::provider("wallet not complete"));

    let mut tracker = engine.expiration_tracker();
    let err = engine.open_payment_request(&mut tracker, &wallet_1(), &txp_1()).await.unwrap_err();

    assert_eq!(err, TxpEngineError::Address("wallet not complete".into()));
    assert!(payment_requests.calls().is_empty());
    assert_eq!(tracker.state(), PayProState::Idle);
}

#[tokio::test(start_paused = true)]
async fn restart_replaces_the_running_countdown() {
    let payment_requests = Arc::new(MockPaymentRequests::returning(invoice(TimeDelta::seconds(90))));
    let (engine, _) = engine(Arc::clone(&payment_requests), tokio_clock());

    let mut tracker = engine.expiration_tracker();
    engine.open_payment_request(&mut tracker, &wallet_1(), &txp_1()).await.unwrap();

    tokio::time::sleep(Duration::from_secs(30)).await;

    payment_requests.respond_with(Ok(invoice(TimeDelta::seconds(300))));
    let state = engine.open_payment_request(&mut tracker, &wallet_1(), &txp_1()).await.unwrap();

    // 300s from the base time, 30s of which already elapsed
    assert!(matches!(state, PayProState::Active { remaining: RemainingTime::Active(270), .. }));

    tokio::time::sleep(Duration::from_millis(100_500)).await;
    assert!(matches!(tracker.state(), PayProState::Active { remaining: RemainingTime::Active(170), .. }));

    tracker.stop();
    assert_eq!(tracker.state(), PayProState::Idle);
    assert!(!tracker.is_counting_down());
}

#[tokio::test(start_paused = true)]
async fn zero_tick_still_reaches_expiry() {
    let payment_requests = MockPaymentRequests::returning(invoice(TimeDelta::seconds(2)));
    let service = MockWalletService::new();

    let wallet = fixtures::wallet("wallet-1", "key-1", 2, 3);
    let txp = fixtures::with_pay_pro_url(fixtures::proposal("txp-1", "wallet-1", 3), INVOICE_URL);

    let mut tracker = ExpirationTracker::new(tokio_clock(), Duration::ZERO);
    tracker.start(&service, &payment_requests, &wallet, &txp).await.unwrap();

    assert_eq!(tracker.gate(), PaymentRequestGate::Ready);

    tokio::time::sleep(Duration::from_secs(5)).await;

    assert_eq!(tracker.gate(), PaymentRequestGate::Expired);
    assert!(!tracker.is_counting_down());
}

#[tokio::test]
async fn proposal_without_invoice_has_nothing_to_track() {
    let payment_requests = Arc::new(MockPaymentRequests::returning(invoice(TimeDelta::seconds(90))));
    let (engine, _) = engine(Arc::clone(&payment_requests), tokio_clock());

    let plain = fixtures::proposal("txp-2", "wallet-1", 3);
    engine.store().replace_proposals(&wallet_1(), vec![plain]).unwrap();

    let mut tracker = engine.expiration_tracker();
    let err = engine
        .open_payment_request(&mut tracker, &wallet_1(), &"txp-2".into())
        .await
        .unwrap_err();

    assert!(matches!(err, TxpEngineError::NotActionable(_)));
    assert!(payment_requests.calls().is_empty());
}
