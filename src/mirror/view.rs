//! Tree export for visualization

use std::fmt;

use crate::account::AccountId;
use crate::store::{AccountStore, MirrorStore};

/// Nested view of one mirror subtree
///
/// Building, rendering, serializing and dropping all walk the tree with an
/// explicit stack; a fan-out-1 chain is as deep as it is long.
pub struct TreeView {
    /// Internal account id
    pub id: u64,
    /// External id / referral token
    pub external_id: String,
    /// Display name
    pub name: String,
    /// Direct children in creation order
    pub children: Vec<TreeView>,
}

impl TreeView {
    /// Number of nodes in this subtree, self included
    pub fn size(&self) -> usize {
        let mut count = 0;
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            count += 1;
            stack.extend(node.children.iter());
        }
        count
    }

    /// Depth of the deepest node below this one (leaf = 0)
    pub fn depth(&self) -> usize {
        let mut deepest = 0;
        let mut stack = vec![(self, 0)];
        while let Some((node, depth)) = stack.pop() {
            deepest = deepest.max(depth);
            stack.extend(node.children.iter().map(|child| (child, depth + 1)));
        }
        deepest
    }
}

impl fmt::Debug for TreeView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TreeView")
            .field("id", &self.id)
            .field("external_id", &self.external_id)
            .field("name", &self.name)
            .field("children", &self.children.len())
            .finish()
    }
}

impl Drop for TreeView {
    fn drop(&mut self) {
        // Detach descendants before they drop so no drop recurses.
        let mut pending = std::mem::take(&mut self.children);
        while let Some(mut node) = pending.pop() {
            pending.append(&mut node.children);
        }
    }
}

enum Visit {
    Enter(AccountId),
    Exit(AccountId, usize),
}

fn subtree<A, M>(accounts: &A, mirror: &M, root: AccountId) -> Option<TreeView>
where
    A: AccountStore + ?Sized,
    M: MirrorStore + ?Sized,
{
    // Post-order: a node is assembled once its children sit on `built`.
    let mut built: Vec<TreeView> = Vec::new();
    let mut stack = vec![Visit::Enter(root)];

    while let Some(visit) = stack.pop() {
        match visit {
            Visit::Enter(id) => {
                let children = mirror.children(id);
                stack.push(Visit::Exit(id, children.len()));
                stack.extend(children.into_iter().rev().map(Visit::Enter));
            }
            Visit::Exit(id, count) => {
                let children = built.split_off(built.len().saturating_sub(count));
                let (external_id, name) = accounts
                    .get(id)
                    .map(|account| (account.external_id.to_string(), account.display_name()))
                    .unwrap_or_default();
                built.push(TreeView {
                    id: id.0,
                    external_id,
                    name,
                    children,
                });
            }
        }
    }

    built.pop()
}

/// Export every mirror tree, roots in creation order
pub fn tree_view<A, M>(accounts: &A, mirror: &M) -> Vec<TreeView>
where
    A: AccountStore + ?Sized,
    M: MirrorStore + ?Sized,
{
    mirror
        .roots()
        .into_iter()
        .filter_map(|root| subtree(accounts, mirror, root))
        .collect()
}

/// Render as indented text, one node per line
pub fn render_text(trees: &[TreeView], indent: usize) -> String {
    let mut out = String::new();
    let mut stack: Vec<(&TreeView, usize)> = trees.iter().rev().map(|tree| (tree, 0)).collect();

    while let Some((node, depth)) = stack.pop() {
        let name = if node.name.is_empty() { "-" } else { node.name.as_str() };
        out.push_str(&" ".repeat(depth * indent));
        out.push_str(&format!("{} ({})\n", name, node.external_id));
        stack.extend(node.children.iter().rev().map(|child| (child, depth + 1)));
    }

    out
}

/// Serialize the view as a JSON array of `{id, external_id, name, children}`
#[cfg(feature = "visualize")]
pub fn to_json(trees: &[TreeView]) -> serde_json::Result<String> {
    enum Step<'a> {
        Open(&'a TreeView, bool),
        Close,
    }

    let mut out = String::from("[");
    let mut stack: Vec<Step<'_>> = trees
        .iter()
        .enumerate()
        .rev()
        .map(|(i, tree)| Step::Open(tree, i == 0))
        .collect();

    while let Some(step) = stack.pop() {
        match step {
            Step::Open(node, first) => {
                if !first {
                    out.push(',');
                }
                out.push_str(&format!(
                    "{{\"id\":{},\"external_id\":{},\"name\":{},\"children\":[",
                    node.id,
                    serde_json::to_string(&node.external_id)?,
                    serde_json::to_string(&node.name)?,
                ));
                stack.push(Step::Close);
                stack.extend(
                    node.children
                        .iter()
                        .enumerate()
                        .rev()
                        .map(|(i, child)| Step::Open(child, i == 0)),
                );
            }
            Step::Close => out.push_str("]}"),
        }
    }

    out.push(']');
    Ok(out)
}
