//! Multi-selection of proposals for batch signing.

use std::{collections::BTreeSet, sync::Arc};

use multisig_txp_domain::{TxpId, WalletId};

/// An immutable selection of proposals, scoped to a single wallet.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SelectionSet {
    wallet_id: Option<WalletId>,
    checked: BTreeSet<TxpId>,
    all_selected: bool,
}

impl SelectionSet {
    /// Returns the wallet the selection is scoped to.
    pub fn wallet_id(&self) -> Option<&WalletId> {
        self.wallet_id.as_ref()
    }

    /// Returns `true` if `txp_id` is selected.
    pub fn contains(&self, txp_id: &TxpId) -> bool {
        self.checked.contains(txp_id)
    }

    /// Returns the selected proposal ids.
    pub fn ids(&self) -> impl Iterator<Item = &TxpId> {
        self.checked.iter()
    }

    /// Returns the number of selected proposals.
    pub fn len(&self) -> usize {
        self.checked.len()
    }

    /// Returns `true` if nothing is selected.
    pub fn is_empty(&self) -> bool {
        self.checked.is_empty()
    }

    /// Returns `true` if the last operation was a select-all.
    pub fn is_all_selected(&self) -> bool {
        self.all_selected
    }

    fn is_scoped_to(&self, wallet_id: &WalletId) -> bool {
        self.wallet_id.as_ref() == Some(wallet_id)
    }
}

/// Tracks the proposals the user intends to sign together.
///
/// Every operation replaces the current [`SelectionSet`] with a new one; previously returned sets
/// are never modified. Selecting a proposal of another wallet silently drops the prior selection.
#[derive(Debug, Default)]
pub struct SelectionEngine {
    current: Arc<SelectionSet>,
}

impl SelectionEngine {
    /// Creates an engine with an empty selection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the current selection.
    pub fn current(&self) -> Arc<SelectionSet> {
        Arc::clone(&self.current)
    }

    /// Adds `txp_id` to the selection, or removes it if already selected.
    ///
    /// Toggling a proposal of a wallet other than the current scope starts a new selection
    /// holding only that proposal.
    #[tracing::instrument(skip_all, fields(%wallet_id, %txp_id))]
    pub fn toggle(&mut self, txp_id: &TxpId, wallet_id: &WalletId) -> Arc<SelectionSet> {
        let checked = if self.current.is_scoped_to(wallet_id) {
            let mut checked = self.current.checked.clone();
            if !checked.remove(txp_id) {
                checked.insert(txp_id.clone());
            }
            checked
        } else {
            BTreeSet::from([txp_id.clone()])
        };

        self.replace(SelectionSet {
            wallet_id: Some(wallet_id.clone()),
            checked,
            all_selected: false,
        })
    }

    /// Selects every proposal of `txp_ids`, or deselects everything if the previous operation was
    /// a select-all.
    ///
    /// Selecting from a wallet other than the current scope replaces the prior selection instead
    /// of extending it.
    #[tracing::instrument(skip_all, fields(%wallet_id))]
    pub fn select_all<'a, I>(&mut self, txp_ids: I, wallet_id: &WalletId) -> Arc<SelectionSet>
    where
        I: IntoIterator<Item = &'a TxpId>,
    {
        let same_wallet = self.current.is_scoped_to(wallet_id);

        let next = if self.current.all_selected {
            SelectionSet {
                wallet_id: Some(wallet_id.clone()),
                checked: BTreeSet::new(),
                all_selected: false,
            }
        } else {
            let mut checked = if same_wallet { self.current.checked.clone() } else { BTreeSet::new() };
            checked.extend(txp_ids.into_iter().cloned());

            SelectionSet {
                wallet_id: Some(wallet_id.clone()),
                checked,
                all_selected: true,
            }
        };

        self.replace(next)
    }

    /// Empties the selection and resets its scope.
    pub fn clear(&mut self) -> Arc<SelectionSet> {
        self.replace(SelectionSet::default())
    }

    fn replace(&mut self, next: SelectionSet) -> Arc<SelectionSet> {
        tracing::debug!(selected = next.len(), "selection changed");
        self.current = Arc::new(next);
        self.current()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(set: &SelectionSet) -> Vec<&str> {
        set.ids().map(TxpId::as_str).collect()
    }

    #[test]
    fn toggle_adds_then_removes() {
        let mut engine = SelectionEngine::new();
        let wallet = WalletId::from("wallet-a");

        engine.toggle(&"txp-1".into(), &wallet);
        let set = engine.toggle(&"txp-2".into(), &wallet);
        assert_eq!(ids(&set), ["txp-1", "txp-2"]);

        let set = engine.toggle(&"txp-1".into(), &wallet);
        assert_eq!(ids(&set), ["txp-2"]);
        assert_eq!(set.wallet_id(), Some(&wallet));
    }

    #[test]
    fn selecting_from_another_wallet_drops_prior_selection() {
        let mut engine = SelectionEngine::new();
        let wallet_a = WalletId::from("wallet-a");
        let wallet_b = WalletId::from("wallet-b");

        engine.select_all(&[TxpId::from("a-1"), TxpId::from("a-2")], &wallet_a);
        let set = engine.toggle(&"b-1".into(), &wallet_b);

        assert_eq!(ids(&set), ["b-1"]);
        assert_eq!(set.wallet_id(), Some(&wallet_b));
    }

    #[test]
    fn select_all_twice_empties_the_selection() {
        let mut engine = SelectionEngine::new();
        let wallet = WalletId::from("wallet-a");
        let txps = [TxpId::from("txp-1"), TxpId::from("txp-2")];

        let set = engine.select_all(&txps, &wallet);
        assert_eq!(set.len(), 2);
        assert!(set.is_all_selected());

        let set = engine.select_all(&txps, &wallet);
        assert!(set.is_empty());
        assert!(!set.is_all_selected());
    }

    #[test]
    fn select_all_extends_selection_of_same_wallet() {
        let mut engine = SelectionEngine::new();
        let wallet = WalletId::from("wallet-a");

        engine.toggle(&"txp-0".into(), &wallet);
        let set = engine.select_all(&[TxpId::from("txp-1")], &wallet);

        assert_eq!(ids(&set), ["txp-0", "txp-1"]);
    }

    #[test]
    fn toggle_after_select_all_resets_flag() {
        let mut engine = SelectionEngine::new();
        let wallet = WalletId::from("wallet-a");
        let txps = [TxpId::from("txp-1"), TxpId::from("txp-2")];

        engine.select_all(&txps, &wallet);
        engine.toggle(&"txp-1".into(), &wallet);
        let set = engine.select_all(&txps, &wallet);

        assert_eq!(set.len(), 2);
    }

    #[test]
    fn previous_snapshots_are_not_modified() {
        let mut engine = SelectionEngine::new();
        let wallet = WalletId::from("wallet-a");

        let first = engine.toggle(&"txp-1".into(), &wallet);
        engine.toggle(&"txp-2".into(), &wallet);
        engine.clear();

        assert_eq!(ids(&first), ["txp-1"]);
        assert!(engine.current().is_empty());
        assert!(engine.current().wallet_id().is_none());
    }
}
