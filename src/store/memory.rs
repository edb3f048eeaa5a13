//! In-memory stores
//!
//! Children lists are kept in insertion order so that breadth-first placement
//! breaks ties by creation order.

use std::collections::{BTreeMap, HashMap};

use super::{AccountStore, MirrorStore, StoreError};
use crate::account::{Account, AccountId, ExternalId};
use crate::mirror::MirrorNode;

/// Accounts held in memory, keyed by creation order
#[derive(Debug, Default)]
pub struct MemoryAccountStore {
    accounts: BTreeMap<AccountId, Account>,
    by_external_id: HashMap<ExternalId, AccountId>,
    by_email: HashMap<String, AccountId>,
    placement_children: HashMap<AccountId, Vec<AccountId>>,
    sponsored: HashMap<AccountId, Vec<AccountId>>,
    next_id: u64,
}

impl MemoryAccountStore {
    /// Create an empty store (ids start at 1)
    pub fn new() -> Self {
        Self {
            next_id: 1,
            ..Self::default()
        }
    }
}

fn email_key(email: &str) -> String {
    email.trim().to_ascii_lowercase()
}

fn detach(index: &mut HashMap<AccountId, Vec<AccountId>>, parent: AccountId, child: AccountId) {
    if let Some(list) = index.get_mut(&parent) {
        list.retain(|&id| id != child);
        if list.is_empty() {
            index.remove(&parent);
        }
    }
}

impl AccountStore for MemoryAccountStore {
    fn next_id(&self) -> AccountId {
        AccountId(self.next_id.max(1))
    }

    fn insert(&mut self, account: Account) -> Result<(), StoreError> {
        if self.accounts.contains_key(&account.id) {
            return Err(StoreError::DuplicateId(account.id));
        }
        if self.by_external_id.contains_key(&account.external_id) {
            return Err(StoreError::DuplicateExternalId(account.external_id));
        }
        let email = email_key(&account.email);
        if self.by_email.contains_key(&email) {
            return Err(StoreError::DuplicateEmail(account.email));
        }

        let id = account.id;
        self.next_id = self.next_id.max(id.0 + 1);
        self.by_external_id.insert(account.external_id.clone(), id);
        self.by_email.insert(email, id);
        if let Some(parent) = account.placement_parent {
            self.placement_children.entry(parent).or_default().push(id);
        }
        if let Some(sponsor) = account.sponsor {
            self.sponsored.entry(sponsor).or_default().push(id);
        }
        self.accounts.insert(id, account);
        Ok(())
    }

    fn remove(&mut self, id: AccountId) -> Option<Account> {
        let account = self.accounts.remove(&id)?;
        self.by_external_id.remove(&account.external_id);
        self.by_email.remove(&email_key(&account.email));
        if let Some(parent) = account.placement_parent {
            detach(&mut self.placement_children, parent, id);
        }
        if let Some(sponsor) = account.sponsor {
            detach(&mut self.sponsored, sponsor, id);
        }
        Some(account)
    }

    fn get(&self, id: AccountId) -> Option<&Account> {
        self.accounts.get(&id)
    }

    fn find_by_external_id(&self, external_id: &str) -> Option<&Account> {
        self.by_external_id
            .get(&ExternalId::new(external_id))
            .and_then(|id| self.accounts.get(id))
    }

    fn find_by_email(&self, email: &str) -> Option<&Account> {
        self.by_email
            .get(&email_key(email))
            .and_then(|id| self.accounts.get(id))
    }

    fn placement_children(&self, id: AccountId) -> Vec<AccountId> {
        self.placement_children.get(&id).cloned().unwrap_or_default()
    }

    fn placement_child_count(&self, id: AccountId) -> usize {
        self.placement_children.get(&id).map_or(0, Vec::len)
    }

    fn sponsored_by(&self, id: AccountId) -> Vec<AccountId> {
        self.sponsored.get(&id).cloned().unwrap_or_default()
    }

    fn first_root(&self) -> Option<&Account> {
        self.accounts.values().find(|account| account.is_root)
    }

    fn accounts(&self) -> Vec<&Account> {
        self.accounts.values().collect()
    }

    fn len(&self) -> usize {
        self.accounts.len()
    }
}

/// Mirror hierarchy held in memory
#[derive(Debug, Default)]
pub struct MemoryMirrorStore {
    nodes: HashMap<AccountId, MirrorNode>,
    order: Vec<AccountId>,
    roots: Vec<AccountId>,
    children: HashMap<AccountId, Vec<AccountId>>,
}

impl MemoryMirrorStore {
    /// Create an empty mirror
    pub fn new() -> Self {
        Self::default()
    }
}

impl MirrorStore for MemoryMirrorStore {
    fn get(&self, account: AccountId) -> Option<MirrorNode> {
        self.nodes.get(&account).copied()
    }

    fn insert(
        &mut self,
        account: AccountId,
        parent: Option<AccountId>,
    ) -> Result<MirrorNode, StoreError> {
        if self.nodes.contains_key(&account) {
            return Err(StoreError::DuplicateMirror(account));
        }

        let level = match parent {
            Some(parent) => {
                let parent_node = self.nodes.get(&parent).ok_or(StoreError::MissingMirrorParent {
                    child: account,
                    parent,
                })?;
                parent_node.level + 1
            }
            None => 0,
        };

        let node = MirrorNode {
            account,
            parent,
            level,
        };
        match parent {
            Some(parent) => self.children.entry(parent).or_default().push(account),
            None => self.roots.push(account),
        }
        self.order.push(account);
        self.nodes.insert(account, node);
        Ok(node)
    }

    fn roots(&self) -> Vec<AccountId> {
        self.roots.clone()
    }

    fn children(&self, account: AccountId) -> Vec<AccountId> {
        self.children.get(&account).cloned().unwrap_or_default()
    }

    fn nodes(&self) -> Vec<MirrorNode> {
        self.order.iter().map(|id| self.nodes[id]).collect()
    }

    fn len(&self) -> usize {
        self.nodes.len()
    }
}
