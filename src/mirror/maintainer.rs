use std::collections::HashSet;

use tracing::debug;

use super::{MirrorError, MirrorNode};
use crate::account::{Account, AccountId};
use crate::store::{AccountStore, MirrorStore};

fn placement_parent_of(account: &Account) -> Result<Option<AccountId>, MirrorError> {
    match account.placement_parent {
        Some(parent) => Ok(Some(parent)),
        None if account.is_root => Ok(None),
        None => Err(MirrorError::UnplacedAccount(account.id)),
    }
}

/// Ensure `account` has a mirror node, backfilling missing ancestors.
///
/// Walks up the placement links until it reaches a mirrored ancestor or a
/// root, validating the whole chain before writing anything, then creates
/// the missing nodes root-most first. Idempotent: an existing node is
/// returned untouched as long as its parent still matches the account's
/// placement-parent; otherwise the node is stale and `StaleParent` is
/// returned without writing.
pub fn ensure_mirrored<A, M>(
    accounts: &A,
    mirror: &mut M,
    account: AccountId,
) -> Result<MirrorNode, MirrorError>
where
    A: AccountStore + ?Sized,
    M: MirrorStore + ?Sized,
{
    let target = accounts
        .get(account)
        .ok_or(MirrorError::UnknownAccount(account))?;
    let target_parent = placement_parent_of(target)?;

    if let Some(node) = mirror.get(account) {
        if node.parent != target_parent {
            return Err(MirrorError::StaleParent {
                account,
                mirrored: node.parent,
                placement: target_parent,
            });
        }
        return Ok(node);
    }

    let mut pending = Vec::new();
    let mut seen = HashSet::from([account]);
    let mut child = account;
    let mut cursor = target_parent;

    while let Some(id) = cursor {
        if mirror.contains(id) {
            break;
        }
        if !seen.insert(id) {
            return Err(MirrorError::CyclicAncestry(id));
        }
        let ancestor = accounts.get(id).ok_or(MirrorError::DanglingParent {
            account: child,
            parent: id,
        })?;
        let parent = placement_parent_of(ancestor)?;
        pending.push((id, parent));
        child = id;
        cursor = parent;
    }

    for (id, parent) in pending.into_iter().rev() {
        mirror.insert(id, parent)?;
        debug!(account = %id, "backfilled mirror node");
    }

    let node = mirror.insert(account, target_parent)?;
    debug!(%account, level = node.level, "mirror node created");
    Ok(node)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::account::ExternalId;
    use crate::store::{MemoryAccountStore, MemoryMirrorStore};

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

    fn chain() -> MemoryAccountStore {
        let mut accounts = MemoryAccountStore::new();
        insert(&mut accounts, 1, None, true);
        insert(&mut accounts, 2, Some(1), false);
        insert(&mut accounts, 3, Some(2), false);
        accounts
    }

    #[test]
    fn test_backfills_ancestors() {
        let accounts = chain();
        let mut mirror = MemoryMirrorStore::new();

        let node = ensure_mirrored(&accounts, &mut mirror, AccountId(3)).unwrap();
        assert_eq!(node.parent, Some(AccountId(2)));
        assert_eq!(node.level, 2);
        assert_eq!(mirror.len(), 3);
        assert_eq!(mirror.roots(), vec![AccountId(1)]);
        assert_eq!(
            mirror.get(AccountId(2)).map(|n| n.parent),
            Some(Some(AccountId(1)))
        );
    }

    #[test]
    fn test_idempotent() {
        let accounts = chain();
        let mut mirror = MemoryMirrorStore::new();

        let first = ensure_mirrored(&accounts, &mut mirror, AccountId(2)).unwrap();
        let second = ensure_mirrored(&accounts, &mut mirror, AccountId(2)).unwrap();
        assert_eq!(first, second);
        assert_eq!(mirror.len(), 2);
    }

    #[test]
    fn test_existing_node_under_other_parent_is_stale() {
        let mut accounts = chain();
        insert(&mut accounts, 4, Some(1), false);
        let mut mirror = MemoryMirrorStore::new();
        ensure_mirrored(&accounts, &mut mirror, AccountId(4)).unwrap();
        ensure_mirrored(&accounts, &mut mirror, AccountId(2)).unwrap();

        // Account 3 is placed under 2, but its mirror node points at 4.
        mirror.insert(AccountId(3), Some(AccountId(4))).unwrap();
        let err = ensure_mirrored(&accounts, &mut mirror, AccountId(3)).unwrap_err();
        assert_eq!(
            err,
            MirrorError::StaleParent {
                account: AccountId(3),
                mirrored: Some(AccountId(4)),
                placement: Some(AccountId(2)),
            }
        );
        assert_eq!(mirror.len(), 4);
        assert_eq!(mirror.get(AccountId(3)).unwrap().parent, Some(AccountId(4)));
    }

    #[test]
    fn test_root_with_parented_node_is_stale() {
        let mut accounts = MemoryAccountStore::new();
        insert(&mut accounts, 1, None, true);
        insert(&mut accounts, 2, None, true);
        let mut mirror = MemoryMirrorStore::new();
        mirror.insert(AccountId(1), None).unwrap();
        mirror.insert(AccountId(2), Some(AccountId(1))).unwrap();

        let err = ensure_mirrored(&accounts, &mut mirror, AccountId(2)).unwrap_err();
        assert!(matches!(err, MirrorError::StaleParent { placement: None, .. }));
        assert_eq!(ensure_mirrored(&accounts, &mut mirror, AccountId(1)).unwrap().level, 0);
    }

    #[test]
    fn test_node_without_account_is_unknown() {
        let accounts = MemoryAccountStore::new();
        let mut mirror = MemoryMirrorStore::new();
        mirror.insert(AccountId(7), None).unwrap();

        let err = ensure_mirrored(&accounts, &mut mirror, AccountId(7)).unwrap_err();
        assert_eq!(err, MirrorError::UnknownAccount(AccountId(7)));
    }

    #[test]
    fn test_unplaced_ancestor_fails_without_writes() {
        let mut accounts = MemoryAccountStore::new();
        insert(&mut accounts, 1, None, false);
        insert(&mut accounts, 2, Some(1), false);
        let mut mirror = MemoryMirrorStore::new();

        let err = ensure_mirrored(&accounts, &mut mirror, AccountId(2)).unwrap_err();
        assert_eq!(err, MirrorError::UnplacedAccount(AccountId(1)));
        assert!(mirror.is_empty());
    }

    #[test]
    fn test_dangling_parent() {
        let mut accounts = MemoryAccountStore::new();
        insert(&mut accounts, 2, Some(1), false);
        let mut mirror = MemoryMirrorStore::new();

        let err = ensure_mirrored(&accounts, &mut mirror, AccountId(2)).unwrap_err();
        assert_eq!(
            err,
            MirrorError::DanglingParent {
                account: AccountId(2),
                parent: AccountId(1)
            }
        );
    }

    #[test]
    fn test_cyclic_ancestry() {
        let mut accounts = MemoryAccountStore::new();
        insert(&mut accounts, 1, Some(2), false);
        insert(&mut accounts, 2, Some(1), false);
        let mut mirror = MemoryMirrorStore::new();

        let err = ensure_mirrored(&accounts, &mut mirror, AccountId(1)).unwrap_err();
        assert_eq!(err, MirrorError::CyclicAncestry(AccountId(1)));
        assert!(mirror.is_empty());
    }
}
