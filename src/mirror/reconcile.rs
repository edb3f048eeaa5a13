//! Reconciliation of the mirror against placement links
//!
//! The account store is the source of truth. `reconcile` backfills nodes for
//! placed accounts that lack one and reports nodes that disagree with the
//! placement links; it never rewrites existing nodes.

use tracing::{info, warn};

use super::{ensure_mirrored, MirrorError};
use crate::account::AccountId;
use crate::store::{AccountStore, MemoryMirrorStore, MirrorStore};

/// Mirror node whose parent differs from the account's placement-parent
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Drift {
    /// Affected account
    pub account: AccountId,
    /// Parent recorded in the mirror
    pub mirrored_parent: Option<AccountId>,
    /// Placement-parent recorded on the account
    pub placement_parent: Option<AccountId>,
}

/// Outcome of a reconciliation pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    /// Nodes created, ancestors included
    pub created: usize,
    /// Nodes whose parent link disagrees with the account
    pub drifted: Vec<Drift>,
    /// Nodes whose account is missing or no longer placed
    pub orphaned: Vec<AccountId>,
}

impl ReconcileReport {
    /// True when the mirror already matched the accounts
    pub fn is_clean(&self) -> bool {
        self.created == 0 && self.drifted.is_empty() && self.orphaned.is_empty()
    }
}

/// Backfill missing nodes and report drift.
pub fn reconcile<A, M>(accounts: &A, mirror: &mut M) -> Result<ReconcileReport, MirrorError>
where
    A: AccountStore + ?Sized,
    M: MirrorStore + ?Sized,
{
    let mut report = ReconcileReport::default();

    for node in mirror.nodes() {
        match accounts.get(node.account) {
            Some(account) if account.is_placed() => {
                if account.placement_parent != node.parent {
                    report.drifted.push(Drift {
                        account: node.account,
                        mirrored_parent: node.parent,
                        placement_parent: account.placement_parent,
                    });
                }
            }
            _ => report.orphaned.push(node.account),
        }
    }

    let before = mirror.len();
    for account in accounts.accounts() {
        if account.is_placed() && !mirror.contains(account.id) {
            ensure_mirrored(accounts, mirror, account.id)?;
        }
    }
    report.created = mirror.len() - before;

    if !report.drifted.is_empty() || !report.orphaned.is_empty() {
        warn!(
            drifted = report.drifted.len(),
            orphaned = report.orphaned.len(),
            "mirror disagrees with placement links"
        );
    }
    info!(created = report.created, "mirror reconciled");
    Ok(report)
}

/// Build a fresh mirror from the placement links alone.
pub fn rebuild<A: AccountStore + ?Sized>(accounts: &A) -> Result<MemoryMirrorStore, MirrorError> {
    let mut mirror = MemoryMirrorStore::new();
    reconcile(accounts, &mut mirror)?;
    Ok(mirror)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::account::{Account, ExternalId};
    use crate::store::MemoryAccountStore;

    fn insert(store: &mut MemoryAccountStore, id: u64, parent: Option<u64>, is_root: bool) {
        store
            .insert(Account {
                id: AccountId(id),
                external_id: ExternalId::new(format!("EXT-{id}")),
                email: format!("u{id}@example.com"),
                first_name: String::new(),
                last_name: String::new(),
                is_root,
                sponsor: parent.map(AccountId),
                placement_parent: parent.map(AccountId),
            })
            .unwrap();
    }

    fn accounts() -> MemoryAccountStore {
        let mut accounts = MemoryAccountStore::new();
        insert(&mut accounts, 1, None, true);
        insert(&mut accounts, 2, Some(1), false);
        insert(&mut accounts, 3, Some(1), false);
        insert(&mut accounts, 4, Some(3), false);
        accounts
    }

    #[test]
    fn test_rebuild_follows_placement_links() {
        let accounts = accounts();
        let mirror = rebuild(&accounts).unwrap();

        assert_eq!(mirror.len(), 4);
        for account in accounts.accounts() {
            assert_eq!(
                mirror.get(account.id).map(|n| n.parent),
                Some(account.placement_parent)
            );
        }
        assert_eq!(mirror.children(AccountId(1)), vec![AccountId(2), AccountId(3)]);
    }

    #[test]
    fn test_reconcile_reports_drift_and_orphans() {
        let accounts = accounts();
        let mut mirror = MemoryMirrorStore::new();
        mirror.insert(AccountId(1), None).unwrap();
        mirror.insert(AccountId(4), Some(AccountId(1))).unwrap();
        mirror.insert(AccountId(9), None).unwrap();

        let report = reconcile(&accounts, &mut mirror).unwrap();
        assert_eq!(report.created, 2);
        assert_eq!(
            report.drifted,
            vec![Drift {
                account: AccountId(4),
                mirrored_parent: Some(AccountId(1)),
                placement_parent: Some(AccountId(3)),
            }]
        );
        assert_eq!(report.orphaned, vec![AccountId(9)]);
        assert!(!report.is_clean());

        let again = reconcile(&accounts, &mut mirror).unwrap();
        assert_eq!(again.created, 0);
    }

    #[test]
    fn test_clean_mirror() {
        let accounts = accounts();
        let mut mirror = rebuild(&accounts).unwrap();
        assert!(reconcile(&accounts, &mut mirror).unwrap().is_clean());
    }
}
