use std::{
    collections::BTreeSet,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use multisig_txp_domain::{TxpId, WalletId};

use crate::error::{Result, TxpEngineError};

type ProposalKey = (WalletId, TxpId);

/// The proposals currently under an engine operation.
#[derive(Debug, Clone, Default)]
pub(crate) struct InFlight {
    proposals: Arc<Mutex<BTreeSet<ProposalKey>>>,
}

/// Marks a proposal as busy until dropped.
#[derive(Debug)]
pub(crate) struct InFlightGuard {
    proposals: Arc<Mutex<BTreeSet<ProposalKey>>>,
    key: ProposalKey,
}

impl InFlight {
    /// Marks the proposal busy, failing if another operation already holds it.
    pub(crate) fn acquire(&self, wallet_id: &WalletId, txp_id: &TxpId) -> Result<InFlightGuard> {
        let key = (wallet_id.clone(), txp_id.clone());

        if !lock(&self.proposals).insert(key.clone()) {
            return Err(TxpEngineError::OperationInFlight(
                format!("proposal {txp_id} of wallet {wallet_id} is busy").into(),
            ));
        }

        Ok(InFlightGuard { proposals: Arc::clone(&self.proposals), key })
    }

    pub(crate) fn is_busy(&self, wallet_id: &WalletId, txp_id: &TxpId) -> bool {
        lock(&self.proposals).contains(&(wallet_id.clone(), txp_id.clone()))
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        lock(&self.proposals).remove(&self.key);
    }
}

// the set stays consistent across a panic, so poisoning is ignored
fn lock(proposals: &Mutex<BTreeSet<ProposalKey>>) -> MutexGuard<'_, BTreeSet<ProposalKey>> {
    proposals.lock().unwrap_or_else(PoisonError::into_inner)
}
