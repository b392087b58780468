//! Grouping of classified proposals into list sections.

use multisig_txp_domain::{
    KeyId, WalletId,
    classify::{self, Classification, TxpBucket},
    proposal::TransactionProposal,
};
use multisig_txp_store::StoreSnapshot;
use strum::{Display, IntoStaticStr};

/// Which proposals a list shows.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ProposalScope {
    /// Proposals of every wallet.
    #[default]
    All,
    /// Proposals of the wallets owned by one key.
    Key(KeyId),
    /// Proposals of a single wallet.
    Wallet(WalletId),
}

/// A list section. Sections are displayed in declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Display, IntoStaticStr)]
pub enum SectionKind {
    /// Single-signature proposals ready to be sent.
    #[strum(serialize = "Unsent Transactions")]
    Unsent,
    /// Multisig proposals awaiting the local copayer's decision.
    #[strum(serialize = "Payment Proposal")]
    PaymentProposal,
    /// Multisig proposals the local copayer signed.
    #[strum(serialize = "Accepted")]
    Accepted,
    /// Rejected proposals, and single-signature proposals waiting on a payment request.
    #[strum(serialize = "Rejected")]
    Rejected,
}

/// A proposal together with its classification for the local copayer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifiedProposal {
    proposal: TransactionProposal,
    classification: Classification,
}

/// The proposals of one wallet within a section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalletGroup {
    wallet_id: WalletId,
    proposals: Vec<ClassifiedProposal>,
    need_sign: bool,
}

/// One section of the proposal list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProposalSection {
    kind: SectionKind,
    groups: Vec<WalletGroup>,
}

/// The grouped proposal list. Sections without proposals are omitted.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct GroupedProposals {
    sections: Vec<ProposalSection>,
}

impl SectionKind {
    /// Returns the section a bucket is displayed in.
    pub fn of(bucket: TxpBucket) -> Self {
        match bucket {
            TxpBucket::Unsent => Self::Unsent,
            TxpBucket::Pending => Self::PaymentProposal,
            TxpBucket::Accepted => Self::Accepted,
            TxpBucket::Rejected | TxpBucket::PaymentRequestPending => Self::Rejected,
        }
    }

    /// Returns the section title.
    pub fn title(self) -> &'static str {
        self.into()
    }
}

impl ClassifiedProposal {
    /// Classifies `proposal` for the copayer identity it carries.
    pub fn new(proposal: TransactionProposal) -> Self {
        let classification = classify::classify(&proposal, proposal.copayer_id());
        Self { proposal, classification }
    }

    /// Returns the proposal.
    pub fn proposal(&self) -> &TransactionProposal {
        &self.proposal
    }

    /// Returns the classification.
    pub fn classification(&self) -> &Classification {
        &self.classification
    }
}

impl WalletGroup {
    /// Returns the wallet id.
    pub fn wallet_id(&self) -> &WalletId {
        &self.wallet_id
    }

    /// Returns the proposals of the wallet in this section.
    pub fn proposals(&self) -> &[ClassifiedProposal] {
        &self.proposals
    }

    /// Returns `true` if at least one proposal of the group awaits the local copayer's signature.
    pub fn need_sign(&self) -> bool {
        self.need_sign
    }
}

impl ProposalSection {
    /// Returns the section kind.
    pub fn kind(&self) -> SectionKind {
        self.kind
    }

    /// Returns the section title.
    pub fn title(&self) -> &'static str {
        self.kind.title()
    }

    /// Returns the wallet groups in first-seen order.
    pub fn groups(&self) -> &[WalletGroup] {
        &self.groups
    }
}

impl GroupedProposals {
    /// Groups the proposals of `snapshot` selected by `scope`.
    pub fn from_snapshot(snapshot: &StoreSnapshot, scope: &ProposalScope) -> Self {
        let proposals = snapshot.all_proposals().filter(|txp| match scope {
            ProposalScope::All => true,
            ProposalScope::Wallet(wallet_id) => txp.wallet_id() == wallet_id,
            ProposalScope::Key(key_id) => snapshot
                .wallet(txp.wallet_id())
                .is_some_and(|wallet| wallet.key_id() == key_id),
        });

        Self::group(proposals.cloned(), snapshot)
    }

    /// Groups `proposals`, looking up wallets and keys in `snapshot`.
    pub fn group<I>(proposals: I, snapshot: &StoreSnapshot) -> Self
    where
        I: IntoIterator<Item = TransactionProposal>,
    {
        let mut by_kind: [Vec<WalletGroup>; 4] = Default::default();

        for proposal in proposals.into_iter().map(ClassifiedProposal::new) {
            let kind = SectionKind::of(proposal.classification.bucket());
            let groups = &mut by_kind[kind as usize];

            let needs_signature = needs_signature(&proposal, snapshot);

            match groups.iter_mut().find(|group| group.wallet_id == *proposal.proposal.wallet_id()) {
                Some(group) => {
                    group.need_sign |= needs_signature;
                    group.proposals.push(proposal);
                },
                None => groups.push(WalletGroup {
                    wallet_id: proposal.proposal.wallet_id().clone(),
                    need_sign: needs_signature,
                    proposals: vec![proposal],
                }),
            }
        }

        let kinds = [
            SectionKind::Unsent,
            SectionKind::PaymentProposal,
            SectionKind::Accepted,
            SectionKind::Rejected,
        ];

        let sections = kinds
            .into_iter()
            .zip(by_kind)
            .filter(|(_, groups)| !groups.is_empty())
            .map(|(kind, groups)| ProposalSection { kind, groups })
            .collect();

        Self { sections }
    }

    /// Returns the non-empty sections in display order.
    pub fn sections(&self) -> &[ProposalSection] {
        &self.sections
    }

    /// Returns the section of the given kind, if it holds any proposal.
    pub fn section(&self, kind: SectionKind) -> Option<&ProposalSection> {
        self.sections.iter().find(|section| section.kind == kind)
    }

    /// Returns `true` if there is nothing to show, in which case the list should be closed.
    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    /// Returns the number of proposals across all sections.
    pub fn len(&self) -> usize {
        self.sections
            .iter()
            .flat_map(|section| &section.groups)
            .map(|group| group.proposals.len())
            .sum()
    }
}

/// A proposal needs the local signature when it awaits our decision, its amount could be
/// resolved for display and its wallet's key can sign.
fn needs_signature(proposal: &ClassifiedProposal, snapshot: &StoreSnapshot) -> bool {
    let can_sign = snapshot
        .key_of_wallet(proposal.proposal.wallet_id())
        .is_some_and(|key| !key.is_read_only());

    proposal.classification.bucket() == TxpBucket::Pending
        && proposal.proposal.display_amount().is_some()
        && can_sign
}
