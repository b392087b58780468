use std::sync::Arc;

use multisig_txp_domain::wallet::{Key, Wallet};
use multisig_txp_store::TxpStore;
use tokio::time::{self, MissedTickBehavior};

use crate::{
    config::{BalancePollConfig, MIN_PERIOD},
    service::WalletService,
};

/// Polls the wallet balance until it reaches `target`, then refreshes the wallet and records the
/// new balance in the store.
///
/// Returns `true` if the target balance was observed within the configured attempts.
#[tracing::instrument(skip_all, fields(wallet_id = %wallet.id(), target_balance = target))]
pub(crate) async fn wait_for_target_balance<W>(
    service: Arc<W>,
    store: Arc<TxpStore>,
    key: Key,
    wallet: Wallet,
    target: u64,
    config: BalancePollConfig,
) -> bool
where
    W: WalletService,
{
    let mut interval = time::interval(config.interval.max(MIN_PERIOD));
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // the first tick completes immediately
    interval.tick().await;

    for attempt in 1..=config.max_attempts.get() {
        interval.tick().await;

        match service.fetch_wallet_balance(&wallet).await {
            Ok(balance) if balance == target => {
                tracing::info!(attempt, "target balance reached");

                if let Err(e) = service.refresh_wallet_status(&key, &wallet, true).await {
                    tracing::warn!("failed to refresh wallet status: {e}");
                }

                if let Err(e) = store.set_wallet_balance(wallet.id(), balance) {
                    tracing::warn!("failed to record wallet balance: {e}");
                }

                return true;
            },
            Ok(balance) => tracing::debug!(attempt, balance, "balance not updated yet"),
            Err(e) => tracing::debug!(attempt, "failed to fetch wallet balance: {e}"),
        }
    }

    tracing::warn!("gave up waiting for target balance");
    false
}
