use std::collections::{HashSet, VecDeque};

use tracing::debug;

use crate::account::AccountId;
use crate::store::AccountStore;
use crate::PlacementError;

/// Find the placement-parent for an account sponsored by `sponsor`.
///
/// Breadth-first from the sponsor: the first node with fewer than
/// `fanout_limit` direct children wins. Children are visited in creation
/// order, so ties go to the earliest-created node on the shallowest level.
///
/// Read-only. A node reached twice means the placement links contain a cycle
/// and is reported as [`PlacementError::CyclicPlacement`].
pub fn find_placement_parent<S: AccountStore + ?Sized>(
    store: &S,
    sponsor: AccountId,
    fanout_limit: usize,
) -> Result<AccountId, PlacementError> {
    if store.get(sponsor).is_none() {
        return Err(PlacementError::UnknownAccount(sponsor));
    }

    let mut queue = VecDeque::from([sponsor]);
    let mut seen = HashSet::from([sponsor]);

    while let Some(candidate) = queue.pop_front() {
        let children = store.placement_children(candidate);
        if children.len() < fanout_limit {
            debug!(
                %sponsor,
                parent = %candidate,
                children = children.len(),
                visited = seen.len(),
                "placement parent found"
            );
            return Ok(candidate);
        }

        for child in children {
            if !seen.insert(child) {
                return Err(PlacementError::CyclicPlacement(child));
            }
            queue.push_back(child);
        }
    }

    // Every enqueued node was full and had no children: only possible when
    // the limit is 0.
    Err(PlacementError::NoCapacity(sponsor))
}
