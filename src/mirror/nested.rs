//! Nested-set numbering of the mirror hierarchy
//!
//! Node = interval [left, right] within its tree
//! Pre-order walk assigns `left` on entry and `right` on exit:
//!   b descends from a  ⇔  a.left < b.left ∧ b.right < a.right
//!   descendants(a)     =  (a.right - a.left - 1) / 2

use std::collections::HashMap;
use std::fmt;

use crate::account::AccountId;
use crate::store::MirrorStore;

/// Interval assigned to one mirror node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NestedInterval {
    /// Index of the root this node belongs to (creation order)
    pub tree_id: usize,

    /// Entry counter (inclusive)
    pub left: usize,

    /// Exit counter (inclusive)
    pub right: usize,

    /// Depth below the root
    pub level: usize,
}

impl NestedInterval {
    /// Check if leaf
    #[inline]
    pub fn is_leaf(&self) -> bool {
        self.right == self.left + 1
    }

    /// Number of descendants
    #[inline]
    pub fn descendant_count(&self) -> usize {
        (self.right - self.left - 1) / 2
    }

    /// Strict containment within the same tree
    #[inline]
    pub fn contains(&self, other: &NestedInterval) -> bool {
        self.tree_id == other.tree_id && self.left < other.left && other.right < self.right
    }
}

impl fmt::Display for NestedInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:[{}, {}]", self.tree_id, self.left, self.right)
    }
}

/// Snapshot of nested-set intervals for every mirror node.
///
/// Rebuilt on demand; not kept in sync with later inserts.
#[derive(Debug, Default)]
pub struct NestedSetIndex {
    intervals: HashMap<AccountId, NestedInterval>,
}

enum Visit {
    Enter(AccountId, usize),
    Exit(AccountId),
}

impl NestedSetIndex {
    /// Number every tree of the mirror
    pub fn build<M: MirrorStore + ?Sized>(mirror: &M) -> Self {
        let mut intervals = HashMap::with_capacity(mirror.len());

        for (tree_id, root) in mirror.roots().into_iter().enumerate() {
            let mut counter = 1;
            let mut stack = vec![Visit::Enter(root, 0)];

            while let Some(visit) = stack.pop() {
                match visit {
                    Visit::Enter(id, level) => {
                        intervals.insert(
                            id,
                            NestedInterval {
                                tree_id,
                                left: counter,
                                right: counter,
                                level,
                            },
                        );
                        counter += 1;
                        stack.push(Visit::Exit(id));
                        for child in mirror.children(id).into_iter().rev() {
                            stack.push(Visit::Enter(child, level + 1));
                        }
                    }
                    Visit::Exit(id) => {
                        if let Some(interval) = intervals.get_mut(&id) {
                            interval.right = counter;
                        }
                        counter += 1;
                    }
                }
            }
        }

        Self { intervals }
    }

    /// Interval of an account, if mirrored
    pub fn get(&self, account: AccountId) -> Option<NestedInterval> {
        self.intervals.get(&account).copied()
    }

    /// Whether `descendant` sits strictly below `ancestor`
    pub fn is_descendant(&self, descendant: AccountId, ancestor: AccountId) -> bool {
        match (self.get(ancestor), self.get(descendant)) {
            (Some(a), Some(d)) => a.contains(&d),
            _ => false,
        }
    }

    /// Descendants of `account` ordered by `left`
    pub fn descendants(&self, account: AccountId) -> Vec<AccountId> {
        let Some(outer) = self.get(account) else {
            return Vec::new();
        };
        let mut inner: Vec<(usize, AccountId)> = self
            .intervals
            .iter()
            .filter(|(_, interval)| outer.contains(interval))
            .map(|(&id, interval)| (interval.left, id))
            .collect();
        inner.sort_unstable();
        inner.into_iter().map(|(_, id)| id).collect()
    }

    /// Number of indexed nodes
    pub fn len(&self) -> usize {
        self.intervals.len()
    }

    /// Whether the index is empty
    pub fn is_empty(&self) -> bool {
        self.intervals.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryMirrorStore;

    #[test]
    fn test_numbering() {
        // 1 ─┬─ 2 ── 4      1:[1, 8]  2:[2, 5]  4:[3, 4]  3:[6, 7]
        //    └─ 3
        let mut mirror = MemoryMirrorStore::new();
        mirror.insert(AccountId(1), None).unwrap();
        mirror.insert(AccountId(2), Some(AccountId(1))).unwrap();
        mirror.insert(AccountId(3), Some(AccountId(1))).unwrap();
        mirror.insert(AccountId(4), Some(AccountId(2))).unwrap();

        let index = NestedSetIndex::build(&mirror);
        let root = index.get(AccountId(1)).unwrap();
        assert_eq!((root.left, root.right), (1, 8));
        assert_eq!(root.descendant_count(), 3);
        assert_eq!(index.get(AccountId(2)).unwrap().to_string(), "0:[2, 5]");
        assert!(index.get(AccountId(4)).unwrap().is_leaf());
        assert_eq!(index.get(AccountId(3)).unwrap().level, 1);

        assert!(index.is_descendant(AccountId(4), AccountId(1)));
        assert!(!index.is_descendant(AccountId(3), AccountId(2)));
        assert!(!index.is_descendant(AccountId(1), AccountId(1)));
        assert_eq!(
            index.descendants(AccountId(1)),
            vec![AccountId(2), AccountId(4), AccountId(3)]
        );
    }

    #[test]
    fn test_separate_trees_do_not_overlap() {
        let mut mirror = MemoryMirrorStore::new();
        mirror.insert(AccountId(1), None).unwrap();
        mirror.insert(AccountId(2), None).unwrap();
        mirror.insert(AccountId(3), Some(AccountId(2))).unwrap();

        let index = NestedSetIndex::build(&mirror);
        assert_eq!(index.len(), 3);
        assert_eq!(index.get(AccountId(2)).unwrap().tree_id, 1);
        assert!(!index.is_descendant(AccountId(3), AccountId(1)));
        assert!(index.is_descendant(AccountId(3), AccountId(2)));
    }
}
