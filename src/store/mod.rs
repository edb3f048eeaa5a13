//! Storage seams
//!
//! The placement core only needs a handful of queries from its collaborators:
//! - accounts by id, external id and email
//! - direct placement-children of a node, in creation order
//! - mirror node existence, roots and children
//!
//! In-memory implementations are provided; persistent backends implement the
//! same traits.

mod memory;

pub use memory::{MemoryAccountStore, MemoryMirrorStore};

use crate::account::{Account, AccountId, ExternalId};
use crate::mirror::MirrorNode;
use thiserror::Error;

/// Constraint violations reported by a store
#[derive(Debug, Error, PartialEq, Eq)]
pub enum StoreError {
    /// Account id already present
    #[error("account {0} already exists")]
    DuplicateId(AccountId),

    /// External id already issued to another account
    #[error("external id {0} already issued")]
    DuplicateExternalId(ExternalId),

    /// Email already registered
    #[error("email {0} already registered")]
    DuplicateEmail(String),

    /// Mirror node already present for the account
    #[error("mirror node for {0} already exists")]
    DuplicateMirror(AccountId),

    /// Parent mirror node must be created before its children
    #[error("mirror node for {child} references missing parent mirror {parent}")]
    MissingMirrorParent {
        /// Account whose node was being inserted
        child: AccountId,
        /// Parent account lacking a mirror node
        parent: AccountId,
    },
}

/// Account persistence used by the placement core
pub trait AccountStore {
    /// Id the next inserted account should take
    fn next_id(&self) -> AccountId;

    /// Persist a new account
    fn insert(&mut self, account: Account) -> Result<(), StoreError>;

    /// Delete an account (used to roll back a failed registration)
    fn remove(&mut self, id: AccountId) -> Option<Account>;

    /// Lookup by internal id
    fn get(&self, id: AccountId) -> Option<&Account>;

    /// Lookup by external id / referral token
    fn find_by_external_id(&self, external_id: &str) -> Option<&Account>;

    /// Lookup by email (case-insensitive)
    fn find_by_email(&self, email: &str) -> Option<&Account>;

    /// Accounts whose placement-parent is `id`, in creation order
    fn placement_children(&self, id: AccountId) -> Vec<AccountId>;

    /// Number of accounts whose placement-parent is `id`
    fn placement_child_count(&self, id: AccountId) -> usize {
        self.placement_children(id).len()
    }

    /// Accounts whose sponsor is `id`, in creation order
    fn sponsored_by(&self, id: AccountId) -> Vec<AccountId>;

    /// Earliest-created account flagged as root
    fn first_root(&self) -> Option<&Account>;

    /// All accounts in creation order
    fn accounts(&self) -> Vec<&Account>;

    /// Number of stored accounts
    fn len(&self) -> usize;

    /// Whether the store is empty
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Mirror hierarchy persistence
pub trait MirrorStore {
    /// Whether a mirror node exists for the account
    fn contains(&self, account: AccountId) -> bool {
        self.get(account).is_some()
    }

    /// Mirror node of an account
    fn get(&self, account: AccountId) -> Option<MirrorNode>;

    /// Create a mirror node; the parent's node must already exist.
    fn insert(
        &mut self,
        account: AccountId,
        parent: Option<AccountId>,
    ) -> Result<MirrorNode, StoreError>;

    /// Nodes without a parent, in creation order
    fn roots(&self) -> Vec<AccountId>;

    /// Direct mirror children, in creation order
    fn children(&self, account: AccountId) -> Vec<AccountId>;

    /// All nodes in creation order
    fn nodes(&self) -> Vec<MirrorNode>;

    /// Number of nodes
    fn len(&self) -> usize;

    /// Whether no node exists
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
