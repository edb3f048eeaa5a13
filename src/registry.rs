//! Registration orchestration
//!
//! Runs the whole placement sequence for one new account:
//! 1. Email validation
//! 2. Sponsor resolution
//! 3. Breadth-first placement search
//! 4. External id issue + account write
//! 5. Post-write fan-out assertion
//! 6. Mirror maintenance
//!
//! Any failure after the write removes the account again, so no account is
//! left placed but unmirrored.
//!
//! Placement is check-then-act: the child count read in step 3 must still hold
//! at step 4. `register` takes `&mut self`, and [`SharedRegistry`] holds its lock
//! across all six steps, so decisions are serialized. Step 5 catches stores
//! mutated behind the registry's back.

use std::sync::{Arc, Mutex};

use tracing::{info, warn};

use crate::account::{Account, AccountId, ExternalId, ExternalIdGenerator, NewAccount, COMPANY_LABEL};
use crate::config::PlacementConfig;
use crate::mirror::{self, ensure_mirrored, ReconcileReport, TreeView};
use crate::placement::{find_placement_parent, SponsorResolver};
use crate::store::{AccountStore, MemoryAccountStore, MemoryMirrorStore, MirrorStore};
use crate::PlacementError;

/// Result of a successful registration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registration {
    /// New account
    pub account: AccountId,
    /// Issued external id
    pub external_id: ExternalId,
    /// Resolved sponsor
    pub sponsor: AccountId,
    /// Resolved placement-parent
    pub placement_parent: AccountId,
}

/// Account registry owning the account and mirror stores
#[derive(Debug)]
pub struct Registry<A = MemoryAccountStore, M = MemoryMirrorStore> {
    accounts: A,
    mirror: M,
    config: PlacementConfig,
    ids: ExternalIdGenerator,
}

impl Registry {
    /// In-memory registry
    pub fn new(config: PlacementConfig) -> Result<Self, PlacementError> {
        Self::with_stores(MemoryAccountStore::new(), MemoryMirrorStore::new(), config)
    }
}

impl<A: AccountStore, M: MirrorStore> Registry<A, M> {
    /// Registry over existing stores
    pub fn with_stores(accounts: A, mirror: M, config: PlacementConfig) -> Result<Self, PlacementError> {
        config.validate()?;
        let ids = config.id_generator();
        Ok(Self {
            accounts,
            mirror,
            config,
            ids,
        })
    }

    /// Active configuration
    pub fn config(&self) -> &PlacementConfig {
        &self.config
    }

    /// Account store
    pub fn accounts(&self) -> &A {
        &self.accounts
    }

    /// Mirror store
    pub fn mirror(&self) -> &M {
        &self.mirror
    }

    /// Split into the underlying stores
    pub fn into_parts(self) -> (A, M) {
        (self.accounts, self.mirror)
    }

    /// Account by id
    pub fn account(&self, id: AccountId) -> Option<&Account> {
        self.accounts.get(id)
    }

    fn check_email(&self, email: &str) -> Result<String, PlacementError> {
        let email = email.trim();
        let well_formed = email
            .split_once('@')
            .is_some_and(|(local, domain)| !local.is_empty() && !domain.is_empty());
        if !well_formed {
            return Err(PlacementError::InvalidEmail(email.to_string()));
        }
        if self.accounts.find_by_email(email).is_some() {
            return Err(PlacementError::DuplicateEmail(email.to_string()));
        }
        Ok(email.to_string())
    }

    fn issue_id(&self, new: &NewAccount) -> Result<ExternalId, PlacementError> {
        let accounts = &self.accounts;
        self.ids
            .issue(new, |candidate| {
                accounts.find_by_external_id(candidate.as_str()).is_some()
            })
            .ok_or_else(|| PlacementError::IdSpaceExhausted(new.email.clone()))
    }

    fn mirror_or_rollback(&mut self, id: AccountId) -> Result<(), PlacementError> {
        if let Err(err) = ensure_mirrored(&self.accounts, &mut self.mirror, id) {
            warn!(account = %id, error = %err, "mirror maintenance failed, rolling back");
            self.accounts.remove(id);
            return Err(err.into());
        }
        Ok(())
    }

    /// Create an administrative root account.
    ///
    /// Roots have no sponsor and no placement-parent. The first root becomes
    /// the configured root if none was injected.
    pub fn register_root(&mut self, new: NewAccount) -> Result<AccountId, PlacementError> {
        let email = self.check_email(&new.email)?;
        let external_id = self.issue_id(&new)?;
        let id = self.accounts.next_id();

        self.accounts.insert(Account {
            id,
            external_id,
            email,
            first_name: new.first_name,
            last_name: new.last_name,
            is_root: true,
            sponsor: None,
            placement_parent: None,
        })?;
        self.mirror_or_rollback(id)?;

        if self.config.root.is_none() {
            self.config.root = Some(id);
        }
        info!(account = %id, "root account registered");
        Ok(id)
    }

    /// Register a new account under the sponsor named by `referral_token`.
    pub fn register(
        &mut self,
        new: NewAccount,
        referral_token: Option<&str>,
    ) -> Result<Registration, PlacementError> {
        let email = self.check_email(&new.email)?;

        let sponsor = SponsorResolver::new(self.config.root).resolve(&self.accounts, referral_token)?;
        let limit = self.config.fanout_limit;
        let parent = find_placement_parent(&self.accounts, sponsor, limit)?;

        let external_id = self.issue_id(&new)?;
        let id = self.accounts.next_id();
        self.accounts.insert(Account {
            id,
            external_id: external_id.clone(),
            email,
            first_name: new.first_name,
            last_name: new.last_name,
            is_root: false,
            sponsor: Some(sponsor),
            placement_parent: Some(parent),
        })?;

        let count = self.accounts.placement_child_count(parent);
        if count > limit {
            warn!(%parent, count, limit, "fan-out exceeded after write, rolling back");
            self.accounts.remove(id);
            return Err(PlacementError::FanoutExceeded { parent, count, limit });
        }

        self.mirror_or_rollback(id)?;

        info!(account = %id, %external_id, %sponsor, %parent, "account placed");
        Ok(Registration {
            account: id,
            external_id,
            sponsor,
            placement_parent: parent,
        })
    }

    /// Registration link carrying the account's referral token
    pub fn referral_link(&self, id: AccountId) -> Option<String> {
        self.accounts
            .get(id)
            .map(|account| account.referral_link(&self.config.referral_base_url))
    }

    fn linked_email(&self, link: Option<AccountId>) -> String {
        link.and_then(|id| self.accounts.get(id))
            .map(|account| account.email.clone())
            .unwrap_or_else(|| COMPANY_LABEL.to_string())
    }

    /// Sponsor's email, or `Company` for unsponsored accounts
    pub fn referred_by(&self, id: AccountId) -> Option<String> {
        let account = self.accounts.get(id)?;
        Some(self.linked_email(account.sponsor))
    }

    /// Placement-parent's email, or `Company` for roots
    pub fn placed_under(&self, id: AccountId) -> Option<String> {
        let account = self.accounts.get(id)?;
        Some(self.linked_email(account.placement_parent))
    }

    /// Accounts this account referred
    pub fn sponsored(&self, id: AccountId) -> Vec<AccountId> {
        self.accounts.sponsored_by(id)
    }

    /// Placement ancestors, root first
    pub fn upline(&self, id: AccountId) -> Vec<AccountId> {
        mirror::upline(&self.mirror, id)
    }

    /// Placement descendants, pre-order
    pub fn downline(&self, id: AccountId) -> Vec<AccountId> {
        mirror::downline(&self.mirror, id)
    }

    /// Visualization export of every tree
    pub fn tree(&self) -> Vec<TreeView> {
        mirror::tree_view(&self.accounts, &self.mirror)
    }

    /// Backfill and audit the mirror against the accounts
    pub fn reconcile(&mut self) -> Result<ReconcileReport, PlacementError> {
        Ok(mirror::reconcile(&self.accounts, &mut self.mirror)?)
    }
}

/// Registry shared across threads; one lock spans a whole registration.
#[derive(Debug)]
pub struct SharedRegistry<A = MemoryAccountStore, M = MemoryMirrorStore> {
    inner: Arc<Mutex<Registry<A, M>>>,
}

impl<A, M> Clone for SharedRegistry<A, M> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<A: AccountStore, M: MirrorStore> SharedRegistry<A, M> {
    /// Wrap a registry
    pub fn new(registry: Registry<A, M>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(registry)),
        }
    }

    /// Serialized [`Registry::register`]
    pub fn register(
        &self,
        new: NewAccount,
        referral_token: Option<&str>,
    ) -> Result<Registration, PlacementError> {
        let mut registry = self.inner.lock().map_err(|_| PlacementError::LockPoisoned)?;
        registry.register(new, referral_token)
    }

    /// Serialized [`Registry::register_root`]
    pub fn register_root(&self, new: NewAccount) -> Result<AccountId, PlacementError> {
        let mut registry = self.inner.lock().map_err(|_| PlacementError::LockPoisoned)?;
        registry.register_root(new)
    }

    /// Run a read-only closure against the registry
    pub fn read<R>(&self, f: impl FnOnce(&Registry<A, M>) -> R) -> Result<R, PlacementError> {
        let registry = self.inner.lock().map_err(|_| PlacementError::LockPoisoned)?;
        Ok(f(&registry))
    }
}
