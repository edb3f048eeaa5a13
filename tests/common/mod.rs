#![allow(dead_code)]

use std::fs;
use std::path::Path;

use downline::{AccountId, NewAccount, PlacementConfig, Registration, Registry, TreeView};

/// Compare the first-name outline of `trees` with `tests/snapshots/<name>`.
///
/// Lines are compared one by one so a failure names the first node that moved.
/// `DOWNLINE_BLESS=1` rewrites the golden file instead.
pub fn assert_tree_golden(name: &str, trees: &[TreeView]) {
    let path = Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests/snapshots")
        .join(name);
    let actual = render_names(trees);

    if std::env::var_os("DOWNLINE_BLESS").is_some() {
        fs::write(&path, &actual).expect("write golden tree");
        return;
    }

    let golden = fs::read_to_string(&path)
        .unwrap_or_else(|err| panic!("golden tree {} unreadable: {err}", path.display()));
    let expected: Vec<&str> = golden.lines().map(str::trim_end).collect();
    let actual: Vec<&str> = actual.lines().collect();

    if let Some(line) = (0..expected.len().max(actual.len()))
        .find(|&i| expected.get(i) != actual.get(i))
    {
        panic!(
            "{}: line {} differs\n  expected: {:?}\n  actual:   {:?}\n({} expected lines, {} actual)",
            path.display(),
            line + 1,
            expected.get(line),
            actual.get(line),
            expected.len(),
            actual.len(),
        );
    }
}

pub fn member(n: usize) -> NewAccount {
    NewAccount::new(format!("member{n}@example.com"), format!("M{n}"), "Member")
}

/// Registry with a single root account.
pub fn registry_with_root(fanout: usize) -> (Registry, AccountId) {
    let config = PlacementConfig::default().with_fanout_limit(fanout);
    let mut registry = Registry::new(config).expect("valid config");
    let root = registry
        .register_root(NewAccount::new("company@example.com", "Company", "Root"))
        .expect("root registers");
    (registry, root)
}

/// Register `count` members without referral tokens.
pub fn register_many(registry: &mut Registry, start: usize, count: usize) -> Vec<Registration> {
    (start..start + count)
        .map(|n| registry.register(member(n), None).expect("registration succeeds"))
        .collect()
}

pub fn token_of(registry: &Registry, id: AccountId) -> String {
    registry
        .account(id)
        .expect("account exists")
        .external_id
        .to_string()
}

/// Indented first names only, for id-independent golden trees.
pub fn render_names(trees: &[TreeView]) -> String {
    let mut out = String::new();
    let mut stack: Vec<(&TreeView, usize)> = trees.iter().rev().map(|tree| (tree, 0)).collect();
    while let Some((node, depth)) = stack.pop() {
        let first = node.name.split_whitespace().next().unwrap_or("-");
        out.push_str(&"  ".repeat(depth));
        out.push_str(first);
        out.push('\n');
        stack.extend(node.children.iter().rev().map(|child| (child, depth + 1)));
    }
    out
}
