//! Mirror hierarchy
//!
//! A derived index over the placement links: one node per placed account,
//! each pointing at the node of its placement-parent. Nodes are created
//! lazily by [`ensure_mirrored`]; [`reconcile`] and [`rebuild`] restore the
//! index from the account store.
//!
//! Queries:
//! - [`upline`]: ancestors, root first
//! - [`downline`]: descendants, pre-order
//! - [`NestedSetIndex`]: `[left, right]` numbering for containment checks

mod maintainer;
mod nested;
mod reconcile;
mod view;

pub use maintainer::ensure_mirrored;
pub use nested::{NestedInterval, NestedSetIndex};
pub use reconcile::{rebuild, reconcile, Drift, ReconcileReport};
pub use view::{render_text, tree_view, TreeView};
#[cfg(feature = "visualize")]
pub use view::to_json;

use crate::account::AccountId;
use crate::store::{MirrorStore, StoreError};
use thiserror::Error;

/// Node of the mirror hierarchy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MirrorNode {
    /// Account this node mirrors
    pub account: AccountId,
    /// Account whose node is the parent (its placement-parent)
    pub parent: Option<AccountId>,
    /// Depth below the tree root (root = 0)
    pub level: usize,
}

impl MirrorNode {
    /// Whether this node starts a tree
    #[inline]
    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }
}

/// Inconsistent placement ancestry
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MirrorError {
    /// Account id not present in the account store
    #[error("account {0} does not exist")]
    UnknownAccount(AccountId),

    /// Account is neither a root nor has a placement-parent
    #[error("account {0} has never been placed")]
    UnplacedAccount(AccountId),

    /// Placement-parent refers to a missing account
    #[error("account {account} is placed under missing account {parent}")]
    DanglingParent {
        /// Child holding the stale link
        account: AccountId,
        /// Missing parent
        parent: AccountId,
    },

    /// Existing mirror node hangs under a different parent than the account
    #[error("mirror node for {account} is under {mirrored:?}, account is placed under {placement:?}")]
    StaleParent {
        /// Account whose node is stale
        account: AccountId,
        /// Parent recorded in the mirror
        mirrored: Option<AccountId>,
        /// Placement-parent recorded on the account
        placement: Option<AccountId>,
    },

    /// Placement ancestry loops back on itself
    #[error("placement ancestry of {0} is cyclic")]
    CyclicAncestry(AccountId),

    /// Mirror store rejected a write
    #[error("mirror store error: {0}")]
    Store(#[from] StoreError),
}

/// Ancestors of `account`, root first. Empty for roots and unmirrored accounts.
pub fn upline<M: MirrorStore + ?Sized>(mirror: &M, account: AccountId) -> Vec<AccountId> {
    let mut ancestors = Vec::new();
    let mut cursor = mirror.get(account).and_then(|node| node.parent);

    while let Some(id) = cursor {
        ancestors.push(id);
        cursor = mirror.get(id).and_then(|node| node.parent);
    }

    ancestors.reverse();
    ancestors
}

/// Descendants of `account` in pre-order (children in creation order).
pub fn downline<M: MirrorStore + ?Sized>(mirror: &M, account: AccountId) -> Vec<AccountId> {
    let mut descendants = Vec::new();
    let mut stack: Vec<AccountId> = mirror.children(account).into_iter().rev().collect();

    while let Some(id) = stack.pop() {
        descendants.push(id);
        stack.extend(mirror.children(id).into_iter().rev());
    }

    descendants
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryMirrorStore;

    fn mirror() -> MemoryMirrorStore {
        // 1 ─┬─ 2 ── 4
        //    └─ 3
        let mut mirror = MemoryMirrorStore::new();
        mirror.insert(AccountId(1), None).unwrap();
        mirror.insert(AccountId(2), Some(AccountId(1))).unwrap();
        mirror.insert(AccountId(3), Some(AccountId(1))).unwrap();
        mirror.insert(AccountId(4), Some(AccountId(2))).unwrap();
        mirror
    }

    #[test]
    fn test_upline_root_first() {
        let mirror = mirror();
        assert_eq!(upline(&mirror, AccountId(4)), vec![AccountId(1), AccountId(2)]);
        assert!(upline(&mirror, AccountId(1)).is_empty());
        assert!(upline(&mirror, AccountId(99)).is_empty());
    }

    #[test]
    fn test_downline_preorder() {
        let mirror = mirror();
        assert_eq!(
            downline(&mirror, AccountId(1)),
            vec![AccountId(2), AccountId(4), AccountId(3)]
        );
        assert!(downline(&mirror, AccountId(4)).is_empty());
    }
}
