//! Proposal, wallet and key fixtures.
//!
//! Every fixture wallet uses [`LOCAL_COPAYER`] as the local copayer identity and every fixture
//! proposal is created by [`OTHER_COPAYER`] at [`base_time`] unless modified.

use core::num::NonZeroU32;

use chrono::{DateTime, TimeDelta, TimeZone, Utc};
use multisig_txp_domain::{
    CopayerId, TxpId, WalletId,
    paypro::{PayProDetails, PayProInstruction},
    proposal::{
        ActionKind, Recipient, TransactionProposal, TransactionProposalDissolved, TxpAction,
        TxpStatus,
    },
    wallet::{Credentials, Key, Wallet},
};

/// The local user's copayer id.
pub const LOCAL_COPAYER: &str = "copayer-b";

/// Another copayer of the fixture wallets.
pub const OTHER_COPAYER: &str = "copayer-a";

/// A third copayer of the fixture wallets.
pub const THIRD_COPAYER: &str = "copayer-c";

/// Pending proposals of wallet `wallet-1` as served by the wallet service.
pub const PENDING_PROPOSALS_JSON: &str = include_str!("../fixtures/pending_proposals.json");

/// The reference instant fixtures are created at.
pub fn base_time() -> DateTime<Utc> {
    Utc.timestamp_opt(1_700_000_000, 0).single().expect("valid timestamp")
}

fn non_zero(n: u32) -> NonZeroU32 {
    NonZeroU32::new(n).expect("non-zero")
}

/// A signing key.
pub fn key(id: &str) -> Key {
    Key::builder().id(id.into()).build()
}

/// A key without signing capability.
pub fn read_only_key(id: &str) -> Key {
    Key::builder().id(id.into()).is_read_only(true).build()
}

/// An `m`-of-`n` wallet holding 100 000 minor units.
pub fn wallet(id: &str, key_id: &str, m: u32, n: u32) -> Wallet {
    Wallet::builder()
        .id(id.into())
        .key_id(key_id.into())
        .copayer_id(LOCAL_COPAYER.into())
        .coin("btc".into())
        .chain("btc".into())
        .network("livenet".into())
        .credentials(Credentials::new(non_zero(m), non_zero(n)).expect("valid credentials"))
        .balance(100_000)
        .build()
}

/// A pending proposal sending 1 000 units with a 100 unit fee, requiring `required` signatures.
pub fn proposal(id: &str, wallet_id: &str, required: u32) -> TransactionProposal {
    let recipient = Recipient::builder().to_address("bc1qrecipient".into()).amount(1_000).build();

    TransactionProposal::builder()
        .id(id.into())
        .wallet_id(wallet_id.into())
        .creator_id(OTHER_COPAYER.into())
        .copayer_id(LOCAL_COPAYER.into())
        .coin("btc".into())
        .chain("btc".into())
        .amount(1_000)
        .fee(100)
        .recipients(vec![recipient])
        .raw(format!("raw-{id}"))
        .display_amount("0.00001 BTC".into())
        .required_signatures(non_zero(required))
        .created_on(base_time())
        .build()
        .expect("valid proposal")
}

/// Returns `txp` with `copayer_id`'s decision replaced by `kind`, recorded at [`base_time`].
pub fn with_action(txp: TransactionProposal, copayer_id: &str, kind: ActionKind) -> TransactionProposal {
    let copayer_id = CopayerId::from(copayer_id);

    modify(txp, |d| {
        d.actions.retain(|action| *action.copayer_id() != copayer_id);
        d.actions.push(
            TxpAction::builder().copayer_id(copayer_id).kind(kind).created_on(base_time()).build(),
        );
    })
}

/// Returns `txp` with the aggregate `status`.
pub fn with_status(txp: TransactionProposal, status: TxpStatus) -> TransactionProposal {
    modify(txp, |d| d.status = status)
}

/// Returns `txp` paying the merchant invoice at `url`.
pub fn with_pay_pro_url(txp: TransactionProposal, url: &str) -> TransactionProposal {
    modify(txp, |d| d.pay_pro_url = Some(url.into()))
}

/// Returns `txp` created by `creator_id` `age` before [`base_time`].
pub fn created(txp: TransactionProposal, creator_id: &str, age: TimeDelta) -> TransactionProposal {
    modify(txp, |d| {
        d.creator_id = creator_id.into();
        d.created_on = base_time() - age;
    })
}

/// Returns `txp` without a resolved display amount.
pub fn without_display_amount(txp: TransactionProposal) -> TransactionProposal {
    modify(txp, |d| d.display_amount = None)
}

/// Returns `txp` as the wallet service reports it after `copayer_id` signed.
///
/// The status becomes `accepted` once enough signatures are collected.
pub fn signed_by(txp: TransactionProposal, copayer_id: &str) -> TransactionProposal {
    let signed = with_action(txp, copayer_id, ActionKind::Accept);

    if signed.accept_count() >= signed.required_signatures().get() {
        with_status(signed, TxpStatus::Accepted)
    } else {
        signed
    }
}

/// A payment request expiring `expires_in` after `now`.
pub fn pay_pro_details(now: DateTime<Utc>, expires_in: TimeDelta) -> PayProDetails {
    let instruction =
        PayProInstruction::builder().to_address("bc1qmerchant".into()).amount(1_000).build();

    PayProDetails::builder()
        .expires(now + expires_in)
        .memo("Payment request for invoice 42".into())
        .instructions(vec![instruction])
        .build()
}

/// Parses a list of proposals in the wallet service's JSON format.
pub fn proposals_from_json(json: &str) -> Vec<TransactionProposal> {
    serde_json::from_str(json).expect("valid proposal json")
}

/// Convenience conversion for ids in assertions.
pub fn txp_ids(txps: &[TransactionProposal]) -> Vec<TxpId> {
    txps.iter().map(|txp| txp.id().clone()).collect()
}

/// Convenience conversion for wallet ids in assertions.
pub fn wallet_id(id: &str) -> WalletId {
    id.into()
}

fn modify<F>(txp: TransactionProposal, f: F) -> TransactionProposal
where
    F: FnOnce(&mut TransactionProposalDissolved),
{
    let mut d = txp.dissolve();
    f(&mut d);

    TransactionProposal::builder()
        .id(d.id)
        .wallet_id(d.wallet_id)
        .creator_id(d.creator_id)
        .copayer_id(d.copayer_id)
        .coin(d.coin)
        .chain(d.chain)
        .amount(d.amount)
        .fee(d.fee)
        .recipients(d.recipients)
        .maybe_raw(d.raw)
        .maybe_message(d.message)
        .maybe_display_amount(d.display_amount)
        .required_signatures(d.required_signatures)
        .actions(d.actions)
        .status(d.status)
        .created_on(d.created_on)
        .maybe_can_be_removed(d.can_be_removed)
        .maybe_pay_pro_url(d.pay_pro_url)
        .maybe_broadcasted_on(d.broadcasted_on)
        .maybe_multisig_contract_address(d.multisig_contract_address)
        .build()
        .expect("valid proposal")
}
