//! Test utilities for the multisig proposal workspace.
//!
//! This crate provides scriptable stand-ins for the collaborators of the proposal engine
//! (wallet service, payment-request service, confirmation dialog), a clock following tokio's
//! virtual time, proposal and wallet fixtures, and tracing initialisation for tests.

pub mod fixtures;

mod clock;
mod mock;

pub use self::{
    clock::TokioClock,
    mock::{MockConfirm, MockPaymentRequests, MockWalletService, WalletCall},
};

use std::sync::Once;

use tracing_subscriber::{EnvFilter, Registry, fmt, layer::SubscriberExt};

/// Installs a global tracing subscriber writing to the test output.
///
/// The filter is read from `RUST_LOG` and defaults to `info`. Calling this more than once is a
/// no-op.
pub fn init_tracing() {
    static INIT: Once = Once::new();

    INIT.call_once(|| {
        let env_filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

        let subscriber = Registry::default()
            .with(fmt::layer().with_target(false).with_line_number(true).with_test_writer())
            .with(env_filter);

        // another harness may have installed one already
        let _ = tracing::subscriber::set_global_default(subscriber);
    });
}
