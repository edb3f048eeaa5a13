//! # Sponsorship and Bounded Fan-out Placement
//!
//! Every registered account gets two links:
//!
//! 1. **Sponsor**: the account whose referral token it signed up with
//!    (the root when no token was given)
//! 2. **Placement-parent**: the first node, breadth-first from the sponsor,
//!    with fewer than 5 direct children
//!
//! A separate mirror hierarchy over the placement links answers upline /
//! downline queries and feeds tree visualization. It is a derived index:
//! missing nodes are backfilled on demand and the whole mirror can be
//! rebuilt from the accounts.
//!
//! ## Usage Example
//!
//! ```
//! use downline::{NewAccount, PlacementConfig, Registry};
//!
//! let mut registry = Registry::new(PlacementConfig::default())?;
//! let root = registry.register_root(NewAccount::new("company@example.com", "Company", "Root"))?;
//! let token = registry.account(root).unwrap().external_id.to_string();
//!
//! let joined = registry.register(NewAccount::new("ann@example.com", "Ann", "Lee"), Some(&token))?;
//! assert_eq!(joined.sponsor, root);
//! assert_eq!(joined.placement_parent, root);
//! # Ok::<(), downline::PlacementError>(())
//! ```

#![warn(missing_docs, missing_debug_implementations)]

pub mod account;    // Account records and external ids
pub mod config;     // Placement configuration
pub mod mirror;     // Mirror hierarchy maintenance and queries
pub mod placement;  // Sponsor resolution and BFS placement
pub mod registry;   // Registration orchestration
pub mod store;      // Storage traits and in-memory stores

// Re-exports for convenience
pub use account::{Account, AccountId, ExternalId, NewAccount};
pub use config::{ConfigError, PlacementConfig, DEFAULT_FANOUT_LIMIT};
pub use mirror::{MirrorError, MirrorNode, TreeView};
pub use registry::{Registration, Registry, SharedRegistry};
pub use store::{AccountStore, MemoryAccountStore, MemoryMirrorStore, MirrorStore, StoreError};

use thiserror::Error;

/// Errors that can occur while registering or placing an account
#[derive(Error, Debug)]
pub enum PlacementError {
    /// Referral token supplied but matching no account
    #[error("invalid referral token '{0}'")]
    InvalidReferral(String),

    /// No configured root and no account flagged as root
    #[error("no root account available")]
    NoRootAccount,

    /// Account id does not exist
    #[error("unknown account {0}")]
    UnknownAccount(AccountId),

    /// Placement links loop back to an account already visited
    #[error("placement tree is cyclic at {0}")]
    CyclicPlacement(AccountId),

    /// Breadth-first search found no node with spare capacity
    #[error("no placement capacity under sponsor {0}")]
    NoCapacity(AccountId),

    /// Post-write check saw more children than the fan-out limit allows
    #[error("placement parent {parent} has {count} children (limit {limit})")]
    FanoutExceeded {
        /// Overfull parent
        parent: AccountId,
        /// Children observed after the write
        count: usize,
        /// Configured limit
        limit: usize,
    },

    /// Email is empty or malformed
    #[error("invalid email '{0}'")]
    InvalidEmail(String),

    /// Email already registered
    #[error("a user with email '{0}' already exists")]
    DuplicateEmail(String),

    /// Every external id candidate collided
    #[error("could not issue a unique external id for '{0}'")]
    IdSpaceExhausted(String),

    /// Shared registry lock was poisoned by a panicking holder
    #[error("registry lock poisoned")]
    LockPoisoned,

    /// Mirror maintenance failed
    #[error("mirror maintenance failed: {0}")]
    Mirror(#[from] MirrorError),

    /// Store rejected a write
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Configuration invalid
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
}

impl PlacementError {
    /// Whether the caller supplied bad input (as opposed to corrupt state)
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            PlacementError::InvalidReferral(_)
                | PlacementError::InvalidEmail(_)
                | PlacementError::DuplicateEmail(_)
        )
    }
}
