//! Domain types for multisig transaction proposals.
//!
//! This crate provides the core models of the proposal lifecycle: the proposals themselves,
//! the wallets and keys they belong to, and the pure derivations the rest of the workspace
//! builds its views on. Nothing here performs I/O; every derived value is a function of its
//! inputs so that it can be recomputed whenever the proposal store changes.

#![cfg_attr(not(test), no_std)]

extern crate alloc;

pub mod actions;
pub mod classify;
pub mod paypro;
pub mod proposal;
pub mod wallet;

mod error;
mod ids;

#[cfg(feature = "serde")]
mod with_serde;

#[cfg(test)]
mod tests;

pub use self::{
    error::TxpError,
    ids::{CopayerId, KeyId, TxpId, WalletId},
};
