use core::num::NonZeroU32;

use chrono::{DateTime, TimeDelta, Utc};

use crate::{
    CopayerId, TxpError,
    actions::ActionAvailability,
    classify::{self, StatusForUs, TxpBucket},
    paypro::{PaymentRequestGate, RemainingTime},
    proposal::{ActionKind, TransactionProposal, TxpAction, TxpStatus},
    wallet::{Credentials, Key, Wallet},
};

const LOCAL: &str = "copayer-b";
const OTHER: &str = "copayer-a";

fn now() -> DateTime<Utc> {
    DateTime::from_timestamp(1_700_000_000, 0).unwrap()
}

fn action(copayer: &str, kind: ActionKind) -> TxpAction {
    TxpAction::builder().copayer_id(copayer.into()).kind(kind).created_on(now()).build()
}

fn proposal(required: u32, actions: Vec<TxpAction>) -> TransactionProposal {
    TransactionProposal::builder()
        .id("txp-1".into())
        .wallet_id("wallet-1".into())
        .creator_id(OTHER.into())
        .copayer_id(LOCAL.into())
        .coin("btc".into())
        .chain("btc".into())
        .amount(10_000)
        .fee(250)
        .display_amount("0.0001 BTC".into())
        .required_signatures(NonZeroU32::new(required).unwrap())
        .actions(actions)
        .created_on(now() - TimeDelta::minutes(1))
        .build()
        .unwrap()
}

fn wallet(m: u32, n: u32) -> Wallet {
    Wallet::builder()
        .id("wallet-1".into())
        .key_id("key-1".into())
        .copayer_id(LOCAL.into())
        .coin("btc".into())
        .chain("btc".into())
        .network("livenet".into())
        .credentials(Credentials::new(NonZeroU32::new(m).unwrap(), NonZeroU32::new(n).unwrap()).unwrap())
        .balance(1_000_000)
        .build()
}

fn local() -> CopayerId {
    LOCAL.into()
}

#[test]
fn single_signature_without_payment_request_is_unsent() {
    let txp = proposal(1, vec![]);

    let classification = classify::classify(&txp, &local());

    assert_eq!(classification.bucket(), TxpBucket::Unsent);
    assert_eq!(classification.status_for_us(), None);
    assert!(classification.pending_for_us());
}

#[test]
fn single_signature_with_payment_request_waits_on_it() {
    let txp = TransactionProposal::builder()
        .id("txp-1".into())
        .wallet_id("wallet-1".into())
        .creator_id(LOCAL.into())
        .copayer_id(LOCAL.into())
        .coin("btc".into())
        .chain("btc".into())
        .amount(10_000)
        .fee(250)
        .required_signatures(NonZeroU32::MIN)
        .created_on(now())
        .pay_pro_url("https://merchant.example/i/abc".into())
        .build()
        .unwrap();

    assert_eq!(classify::classify(&txp, &local()).bucket(), TxpBucket::PaymentRequestPending);
}

#[test]
fn multisig_buckets_follow_local_action() {
    let cases = [
        (None, TxpBucket::Pending, StatusForUs::Pending, true),
        (Some(ActionKind::Failed), TxpBucket::Pending, StatusForUs::Pending, true),
        (Some(ActionKind::Accept), TxpBucket::Accepted, StatusForUs::Accepted, false),
        (Some(ActionKind::Reject), TxpBucket::Rejected, StatusForUs::Rejected, false),
    ];

    for (kind, bucket, status_for_us, pending_for_us) in cases {
        let mut actions = vec![action(OTHER, ActionKind::Accept)];
        actions.extend(kind.map(|kind| action(LOCAL, kind)));
        let txp = proposal(2, actions);

        let classification = classify::classify(&txp, &local());

        assert_eq!(classification.bucket(), bucket, "{kind:?}");
        assert_eq!(classification.status_for_us(), Some(status_for_us), "{kind:?}");
        assert_eq!(classification.pending_for_us(), pending_for_us, "{kind:?}");
    }
}

#[test]
fn terminal_statuses_classify_the_same_way_every_time() {
    for (status, bucket) in [
        (TxpStatus::Broadcasted, TxpBucket::Accepted),
        (TxpStatus::Rejected, TxpBucket::Rejected),
        (TxpStatus::Removed, TxpBucket::Rejected),
    ] {
        for required in [1, 2, 3] {
            let txp = TransactionProposal::builder()
                .id("txp-1".into())
                .wallet_id("wallet-1".into())
                .creator_id(OTHER.into())
                .copayer_id(LOCAL.into())
                .coin("btc".into())
                .chain("btc".into())
                .amount(1)
                .fee(1)
                .required_signatures(NonZeroU32::new(required).unwrap())
                .status(status)
                .created_on(now())
                .build()
                .unwrap();

            let first = classify::classify(&txp, &local());
            let second = classify::classify(&txp, &local());

            assert_eq!(first, second);
            assert_eq!(first.bucket(), bucket);
            assert!(!first.pending_for_us());
        }
    }
}

#[test]
fn duplicate_copayer_actions_are_rejected() {
    let result = TransactionProposal::builder()
        .id("txp-1".into())
        .wallet_id("wallet-1".into())
        .creator_id(OTHER.into())
        .copayer_id(LOCAL.into())
        .coin("btc".into())
        .chain("btc".into())
        .amount(1)
        .fee(1)
        .required_signatures(NonZeroU32::new(2).unwrap())
        .actions(vec![action(OTHER, ActionKind::Failed), action(OTHER, ActionKind::Accept)])
        .created_on(now())
        .build();

    assert!(matches!(
        result,
        Err(TxpError::DuplicateCopayerAction { copayer_id, .. }) if copayer_id.as_str() == OTHER
    ));
}

#[test]
fn last_signer_counts_existing_accepts() {
    let txp = proposal(2, vec![action(OTHER, ActionKind::Accept)]);
    assert!(classify::classify(&txp, &local()).last_signer());

    let txp = proposal(3, vec![action(OTHER, ActionKind::Accept)]);
    assert!(!classify::classify(&txp, &local()).last_signer());
}

#[test]
fn removable_after_grace_period_even_without_server_flag() {
    let grace = classify::default_removal_grace();

    let aged = TransactionProposal::builder()
        .id("txp-1".into())
        .wallet_id("wallet-1".into())
        .creator_id(OTHER.into())
        .copayer_id(LOCAL.into())
        .coin("btc".into())
        .chain("btc".into())
        .amount(1)
        .fee(1)
        .required_signatures(NonZeroU32::new(2).unwrap())
        .created_on(now() - TimeDelta::minutes(11))
        .build()
        .unwrap();
    assert!(classify::can_be_removed(&aged, &local(), now(), grace));

    let fresh_signed = proposal(2, vec![action(OTHER, ActionKind::Accept)]);
    assert!(!classify::can_be_removed(&fresh_signed, &local(), now(), grace));
}

#[test]
fn creator_may_remove_unsigned_proposal_right_away() {
    let txp = proposal(2, vec![]);

    assert!(classify::can_be_removed(&txp, &OTHER.into(), now(), classify::default_removal_grace()));
    assert!(!classify::can_be_removed(&txp, &local(), now(), classify::default_removal_grace()));
}

#[test]
fn remaining_time_counts_down_and_expires() {
    let expires = now() + TimeDelta::seconds(90);

    let mut previous = None;
    for elapsed in 0..90 {
        let remaining = RemainingTime::until(expires, now() + TimeDelta::seconds(elapsed));
        if let Some(previous) = previous {
            assert!(remaining < previous);
        }
        assert!(!remaining.is_expired());
        previous = Some(remaining);
    }

    assert_eq!(RemainingTime::until(expires, now()).to_string(), "01:30");
    assert_eq!(RemainingTime::until(expires, now() + TimeDelta::seconds(89)).to_string(), "00:01");

    for elapsed in [90, 91, 3_600] {
        let remaining = RemainingTime::until(expires, now() + TimeDelta::seconds(elapsed));
        assert_eq!(remaining, RemainingTime::Expired);
        assert_eq!(remaining.to_string(), "Expired");
    }
}

#[test]
fn remaining_time_truncates_sub_second_precision() {
    let expires = now() + TimeDelta::seconds(61);
    let almost = now() + TimeDelta::milliseconds(999);

    assert_eq!(RemainingTime::until(expires, almost).to_string(), "01:01");
}

#[test]
fn availability_for_pending_multisig_proposal() {
    let txp = proposal(2, vec![action(OTHER, ActionKind::Accept)]);
    let classification = classify::classify(&txp, &local());
    let key = Key::builder().id("key-1".into()).build();

    let availability = ActionAvailability::evaluate(
        &txp,
        &classification,
        false,
        &wallet(2, 3),
        &key,
        PaymentRequestGate::NotRequired,
    );

    assert!(availability.accept());
    assert!(availability.reject());
    assert!(!availability.remove());
    assert!(!availability.broadcast());
    assert!(!availability.payment_unpayable());
}

#[test]
fn read_only_key_cannot_accept() {
    let txp = proposal(2, vec![]);
    let classification = classify::classify(&txp, &local());
    let key = Key::builder().id("key-1".into()).is_read_only(true).build();

    let availability = ActionAvailability::evaluate(
        &txp,
        &classification,
        false,
        &wallet(2, 3),
        &key,
        PaymentRequestGate::NotRequired,
    );

    assert!(!availability.accept());
}

#[test]
fn expired_payment_request_blocks_accept_and_reject() {
    let txp = proposal(2, vec![]);
    let classification = classify::classify(&txp, &local());
    let key = Key::builder().id("key-1".into()).build();

    let availability = ActionAvailability::evaluate(
        &txp,
        &classification,
        true,
        &wallet(2, 3),
        &key,
        PaymentRequestGate::Expired,
    );

    assert!(!availability.accept());
    assert!(!availability.reject());
    assert!(availability.remove());
    assert!(availability.payment_unpayable());
}

#[test]
fn accepted_proposal_can_be_broadcast_or_removed() {
    let txp = TransactionProposal::builder()
        .id("txp-1".into())
        .wallet_id("wallet-1".into())
        .creator_id(OTHER.into())
        .copayer_id(LOCAL.into())
        .coin("btc".into())
        .chain("btc".into())
        .amount(1)
        .fee(1)
        .required_signatures(NonZeroU32::new(2).unwrap())
        .actions(vec![action(OTHER, ActionKind::Accept), action(LOCAL, ActionKind::Accept)])
        .status(TxpStatus::Accepted)
        .created_on(now())
        .build()
        .unwrap();
    let classification = classify::classify(&txp, &local());
    let key = Key::builder().id("key-1".into()).build();

    let availability = ActionAvailability::evaluate(
        &txp,
        &classification,
        false,
        &wallet(2, 3),
        &key,
        PaymentRequestGate::NotRequired,
    );

    assert!(availability.broadcast());
    assert!(availability.remove());
    assert!(!availability.accept());
    assert!(!availability.reject());
}

#[test]
fn single_copayer_wallet_never_offers_reject() {
    let txp = proposal(1, vec![]);
    let classification = classify::classify(&txp, &local());
    let key = Key::builder().id("key-1".into()).build();

    let availability = ActionAvailability::evaluate(
        &txp,
        &classification,
        false,
        &wallet(1, 1),
        &key,
        PaymentRequestGate::NotRequired,
    );

    assert!(availability.accept());
    assert!(!availability.reject());
}

#[test]
fn credentials_reject_threshold_above_copayers() {
    let result = Credentials::new(NonZeroU32::new(3).unwrap(), NonZeroU32::new(2).unwrap());

    assert!(matches!(result, Err(TxpError::ThresholdExceedsCopayers)));
}

#[cfg(feature = "serde")]
#[test]
fn proposal_parses_from_wallet_service_payload() {
    let json = r#"{
        "id": "txp-9",
        "walletId": "wallet-1",
        "creatorId": "copayer-a",
        "copayerId": "copayer-b",
        "coin": "btc",
        "chain": "btc",
        "amount": 5000,
        "fee": 120,
        "outputs": [{ "toAddress": "bc1qexample", "amount": 5000 }],
        "requiredSignatures": 2,
        "actions": [{ "copayerId": "copayer-a", "type": "accept", "createdOn": 1700000000 }],
        "status": "pending",
        "createdOn": 1699999000,
        "payProUrl": "https://merchant.example/i/9"
    }"#;

    let txp: TransactionProposal = serde_json::from_str(json).unwrap();

    assert_eq!(txp.id().as_str(), "txp-9");
    assert_eq!(txp.to_address(), Some("bc1qexample"));
    assert_eq!(txp.accept_count(), 1);
    assert_eq!(txp.pay_pro_url(), Some("https://merchant.example/i/9"));
    assert_eq!(classify::classify(&txp, &local()).bucket(), TxpBucket::Pending);
}

#[cfg(feature = "serde")]
#[test]
fn proposal_payload_with_duplicate_actions_fails_to_parse() {
    let json = r#"{
        "id": "txp-9",
        "walletId": "wallet-1",
        "creatorId": "copayer-a",
        "copayerId": "copayer-b",
        "coin": "btc",
        "chain": "btc",
        "amount": 5000,
        "fee": 120,
        "requiredSignatures": 2,
        "actions": [
            { "copayerId": "copayer-a", "type": "accept", "createdOn": 1700000000 },
            { "copayerId": "copayer-a", "type": "reject", "createdOn": 1700000001 }
        ],
        "status": "pending",
        "createdOn": 1699999000
    }"#;

    assert!(serde_json::from_str::<TransactionProposal>(json).is_err());
}

#[cfg(feature = "serde")]
#[test]
fn credentials_payload_above_copayers_fails_to_parse() {
    let credentials: Credentials = serde_json::from_str(r#"{ "m": 2, "n": 3 }"#).unwrap();
    assert_eq!((credentials.m().get(), credentials.n().get()), (2, 3));

    assert!(serde_json::from_str::<Credentials>(r#"{ "m": 3, "n": 2 }"#).is_err());
}
