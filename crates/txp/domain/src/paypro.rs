//! Payment-request (PayPro) models and countdown arithmetic.

use core::fmt;

use alloc::{string::String, vec::Vec};

use bon::Builder;
use chrono::{DateTime, Utc};
use dissolve_derive::Dissolve;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A single payment instruction of a merchant invoice.
#[derive(Debug, Clone, PartialEq, Eq, Builder, Dissolve)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(rename_all = "camelCase"))]
pub struct PayProInstruction {
    /// Address the merchant expects the funds at.
    to_address: String,

    /// Amount requested, in minor units.
    amount: u64,
}

/// Metadata of a merchant payment request.
#[derive(Debug, Clone, PartialEq, Eq, Builder, Dissolve)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(rename_all = "camelCase"))]
pub struct PayProDetails {
    /// When the merchant stops accepting the payment.
    expires: DateTime<Utc>,

    /// Merchant memo shown to the user.
    #[cfg_attr(feature = "serde", serde(default, skip_serializing_if = "Option::is_none"))]
    memo: Option<String>,

    /// What the merchant asks to be paid.
    #[builder(default)]
    #[cfg_attr(feature = "serde", serde(default))]
    instructions: Vec<PayProInstruction>,
}

/// Time left before a payment request expires, truncated to whole seconds.
///
/// Renders as `MM:SS`, or `Expired` once the expiry second is reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum RemainingTime {
    /// Seconds left; never zero.
    Active(u64),
    /// The request can no longer be paid.
    Expired,
}

/// Whether a proposal's payment request lets it be acted upon.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentRequestGate {
    /// The proposal carries no payment request.
    NotRequired,
    /// The payment request is still being fetched.
    Loading,
    /// The payment request was fetched and is still payable.
    Ready,
    /// Fetching the payment request failed.
    Unavailable,
    /// The payment request expired.
    Expired,
}

impl PayProInstruction {
    /// Returns the destination address.
    pub fn to_address(&self) -> &str {
        &self.to_address
    }

    /// Returns the requested amount.
    pub fn amount(&self) -> u64 {
        self.amount
    }
}

impl PayProDetails {
    /// Returns the expiry time.
    pub fn expires(&self) -> DateTime<Utc> {
        self.expires
    }

    /// Returns the merchant memo.
    pub fn memo(&self) -> Option<&str> {
        self.memo.as_deref()
    }

    /// Returns the payment instructions.
    pub fn instructions(&self) -> &[PayProInstruction] {
        &self.instructions
    }

    /// Returns the time left at `now`.
    pub fn remaining_at(&self, now: DateTime<Utc>) -> RemainingTime {
        RemainingTime::until(self.expires, now)
    }
}

impl RemainingTime {
    /// Computes the time left until `expires` as seen at `now`.
    ///
    /// Both instants are floored to whole seconds first, so a request is expired from the
    /// second it expires in onwards.
    pub fn until(expires: DateTime<Utc>, now: DateTime<Utc>) -> Self {
        let left = expires.timestamp() - now.timestamp();

        match u64::try_from(left) {
            Ok(secs) if secs > 0 => Self::Active(secs),
            _ => Self::Expired,
        }
    }

    /// Returns `true` once the request expired.
    pub fn is_expired(&self) -> bool {
        matches!(self, Self::Expired)
    }
}

impl fmt::Display for RemainingTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Active(secs) => write!(f, "{:02}:{:02}", secs / 60, secs % 60),
            Self::Expired => f.write_str("Expired"),
        }
    }
}

impl PaymentRequestGate {
    /// Returns `true` if the proposal may be signed or broadcast.
    pub fn allows_payment(self) -> bool {
        matches!(self, Self::NotRequired | Self::Ready)
    }

    /// Returns `true` if the user must be told the request expired or was refused.
    pub fn is_unpayable(self) -> bool {
        matches!(self, Self::Unavailable | Self::Expired)
    }
}
