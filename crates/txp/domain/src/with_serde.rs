//! Wire representation of proposals as served by the wallet service.
//!
//! Deserialization goes through [`TransactionProposal::builder`] and [`Credentials::new`] so
//! that payloads violating their invariants are rejected instead of silently accepted.

use core::num::NonZeroU32;

use alloc::{string::String, vec::Vec};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_with::DisplayFromStr;

use crate::{
    CopayerId, TxpError, TxpId, WalletId,
    proposal::{Recipient, TransactionProposal, TransactionProposalDissolved, TxpAction, TxpStatus},
    wallet::Credentials,
};

#[serde_with::serde_as]
#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionProposalRepr {
    id: TxpId,
    wallet_id: WalletId,
    creator_id: CopayerId,
    copayer_id: CopayerId,
    coin: String,
    chain: String,
    amount: u64,
    fee: u64,

    #[serde(default, rename = "outputs")]
    recipients: Vec<Recipient>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    raw: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    message: Option<String>,

    #[serde(default, rename = "amountStr", skip_serializing_if = "Option::is_none")]
    display_amount: Option<String>,

    required_signatures: NonZeroU32,

    #[serde(default)]
    actions: Vec<TxpAction>,

    #[serde_as(as = "DisplayFromStr")]
    status: TxpStatus,

    #[serde(with = "chrono::serde::ts_seconds")]
    created_on: DateTime<Utc>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    can_be_removed: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pay_pro_url: Option<String>,

    #[serde(
        default,
        with = "chrono::serde::ts_seconds_option",
        skip_serializing_if = "Option::is_none"
    )]
    broadcasted_on: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    multisig_contract_address: Option<String>,
}

impl TryFrom<TransactionProposalRepr> for TransactionProposal {
    type Error = TxpError;

    fn try_from(repr: TransactionProposalRepr) -> Result<Self, Self::Error> {
        TransactionProposal::builder()
            .id(repr.id)
            .wallet_id(repr.wallet_id)
            .creator_id(repr.creator_id)
            .copayer_id(repr.copayer_id)
            .coin(repr.coin)
            .chain(repr.chain)
            .amount(repr.amount)
            .fee(repr.fee)
            .recipients(repr.recipients)
            .maybe_raw(repr.raw)
            .maybe_message(repr.message)
            .maybe_display_amount(repr.display_amount)
            .required_signatures(repr.required_signatures)
            .actions(repr.actions)
            .status(repr.status)
            .created_on(repr.created_on)
            .maybe_can_be_removed(repr.can_be_removed)
            .maybe_pay_pro_url(repr.pay_pro_url)
            .maybe_broadcasted_on(repr.broadcasted_on)
            .maybe_multisig_contract_address(repr.multisig_contract_address)
            .build()
    }
}

impl From<TransactionProposal> for TransactionProposalRepr {
    fn from(txp: TransactionProposal) -> Self {
        let TransactionProposalDissolved {
            id,
            wallet_id,
            creator_id,
            copayer_id,
            coin,
            chain,
            amount,
            fee,
            recipients,
            raw,
            message,
            display_amount,
            required_signatures,
            actions,
            status,
            created_on,
            can_be_removed,
            pay_pro_url,
            broadcasted_on,
            multisig_contract_address,
        } = txp.dissolve();

        Self {
            id,
            wallet_id,
            creator_id,
            copayer_id,
            coin,
            chain,
            amount,
            fee,
            recipients,
            raw,
            message,
            display_amount,
            required_signatures,
            actions,
            status,
            created_on,
            can_be_removed,
            pay_pro_url,
            broadcasted_on,
            multisig_contract_address,
        }
    }
}

#[derive(Serialize, Deserialize)]
pub struct CredentialsRepr {
    m: NonZeroU32,
    n: NonZeroU32,
}

impl TryFrom<CredentialsRepr> for Credentials {
    type Error = TxpError;

    fn try_from(repr: CredentialsRepr) -> Result<Self, Self::Error> {
        Credentials::new(repr.m, repr.n)
    }
}

impl From<Credentials> for CredentialsRepr {
    fn from(credentials: Credentials) -> Self {
        Self { m: credentials.m(), n: credentials.n() }
    }
}
