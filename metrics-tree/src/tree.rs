//! The metric tree.
//!
//! A [`Branch`] maps names to children, where a child is either another branch or a leaf metric.
//! Branches own their child branches, but only hold *weak* references to leaves: a metric lives
//! exactly as long as the handles the application holds for it.  Once the last handle is dropped,
//! the leaf silently disappears from traversals, and its slot is reclaimed by the next call to
//! [`Branch::remove_empty_nodes`].
//!
//! Nothing is reclaimed automatically.  Exporters are expected to prune periodically, usually
//! right before printing.
use std::collections::BTreeMap;
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tracing::trace;

use crate::visitor::{Leaf, Visitor};

enum Child {
    Branch(Arc<Branch>),
    Leaf(Weak<dyn Leaf>),
}

enum Live {
    Branch(Arc<Branch>),
    Leaf(Arc<dyn Leaf>),
}

/// A named node of the metric tree.
///
/// Children are kept in name order, which is also the order in which they are visited.  The lock
/// guarding the children is only ever held for the duration of a single operation on this branch,
/// and never while calling into a leaf, a visitor or another branch.
#[derive(Default)]
pub struct Branch {
    children: Mutex<BTreeMap<String, Child>>,
}

impl Branch {
    /// Creates a new, empty `Branch`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Gets the child branch called `name`, creating it if necessary.
    ///
    /// If `name` currently holds a leaf, the leaf is evicted and replaced by an empty branch.
    pub fn get_branch(&self, name: &str) -> Arc<Branch> {
        let mut children = self.children.lock();
        if let Some(Child::Branch(branch)) = children.get(name) {
            return Arc::clone(branch);
        }

        let branch = Arc::new(Branch::new());
        children.insert(name.to_string(), Child::Branch(Arc::clone(&branch)));
        branch
    }

    /// Registers `leaf` under `name`.
    ///
    /// Whatever was previously stored at `name`, branch or leaf, is replaced.
    pub fn add_leaf(&self, name: &str, leaf: Weak<dyn Leaf>) {
        self.children.lock().insert(name.to_string(), Child::Leaf(leaf));
    }

    /// Gets the number of children, including leaves that are no longer alive.
    pub fn len(&self) -> usize {
        self.children.lock().len()
    }

    /// Returns `true` if this branch has no children at all.
    pub fn is_empty(&self) -> bool {
        self.children.lock().is_empty()
    }

    /// Drives `visitor` over this branch and everything beneath it.
    ///
    /// Leaves whose metric has been dropped are skipped without being announced.  The children are
    /// snapshotted first, so the visitor and the leaves run without this branch's lock held, and
    /// changes made to the tree in the meantime only show up in the next traversal.
    pub fn print(&self, visitor: &mut dyn Visitor) {
        let snapshot = self
            .children
            .lock()
            .iter()
            .filter_map(|(name, child)| {
                let live = match child {
                    Child::Branch(branch) => Live::Branch(Arc::clone(branch)),
                    Child::Leaf(leaf) => Live::Leaf(leaf.upgrade()?),
                };
                Some((name.clone(), live))
            })
            .collect::<Vec<_>>();

        visitor.start_node();
        for (name, child) in snapshot {
            visitor.child(&name);
            match child {
                Live::Branch(branch) => branch.print(visitor),
                Live::Leaf(leaf) => leaf.print(visitor),
            }
        }
        visitor.end_node();
    }

    /// Removes dead leaves and unreferenced empty branches, depth first.
    ///
    /// A child branch is only removed when it is empty after its own pass *and* nothing outside the
    /// tree still holds a reference to it, such as a scoped [`Registry`](crate::Registry).
    ///
    /// Returns `true` if this branch is empty afterwards.
    pub fn remove_empty_nodes(&self) -> bool {
        let mut children = self.children.lock();

        let before = children.len();
        children.retain(|_, child| match child {
            Child::Branch(branch) => {
                let empty = branch.remove_empty_nodes();
                !(empty && Arc::strong_count(branch) == 1)
            }
            Child::Leaf(leaf) => leaf.strong_count() > 0,
        });

        let removed = before - children.len();
        if removed > 0 {
            trace!(removed, remaining = children.len(), "Pruned metric tree nodes.");
        }

        children.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::Branch;
    use crate::visitor::test_util::RecordingVisitor;
    use crate::visitor::{print_field, Leaf, Visitor};
    use std::sync::{Arc, Weak};

    struct TestLeaf(i64);

    impl Leaf for TestLeaf {
        fn print(&self, visitor: &mut dyn Visitor) {
            visitor.value(self.0.into());
        }
    }

    struct PairLeaf;

    impl Leaf for PairLeaf {
        fn print(&self, visitor: &mut dyn Visitor) {
            visitor.start_node();
            print_field(visitor, "a", 1);
            print_field(visitor, "b", 2.5);
            visitor.end_node();
        }
    }

    fn make_leaf(value: i64) -> Arc<TestLeaf> {
        Arc::new(TestLeaf(value))
    }

    fn weak<L: Leaf + 'static>(leaf: &Arc<L>) -> Weak<dyn Leaf> {
        Arc::downgrade(leaf) as Weak<dyn Leaf>
    }

    fn print(root: &Branch) -> Vec<String> {
        let mut visitor = RecordingVisitor::default();
        root.print(&mut visitor);
        visitor.events().into_iter().map(str::to_owned).collect()
    }

    #[test]
    fn test_empty() {
        let root = Branch::new();
        assert_eq!(print(&root), ["start", "end"]);
    }

    #[test]
    fn test_children_in_name_order() {
        let root = Branch::new();
        let leaf1 = make_leaf(1);
        let leaf2 = make_leaf(2);
        let leaf3 = make_leaf(3);
        let pair = Arc::new(PairLeaf);

        root.add_leaf("leaf1", weak(&leaf1));
        root.get_branch("bar").add_leaf("leaf3", weak(&leaf3));
        root.get_branch("bar").add_leaf("leaf2", weak(&leaf2));
        root.add_leaf("pair", weak(&pair));

        assert_eq!(
            print(&root),
            [
                "start",
                "child bar",
                "start",
                "child leaf2",
                "int 2",
                "child leaf3",
                "int 3",
                "end",
                "child leaf1",
                "int 1",
                "child pair",
                "start",
                "child a",
                "int 1",
                "child b",
                "float 2.5",
                "end",
                "end",
            ]
        );
    }

    #[test]
    fn test_dead_leaves_are_not_printed() {
        let root = Branch::new();
        root.add_leaf("dead_leaf1", weak(&make_leaf(1)));

        assert_eq!(print(&root), ["start", "end"]);
        assert_eq!(root.len(), 1);
    }

    #[test]
    fn test_leaf_and_branch_evict_each_other() {
        let root = Branch::new();
        let leaf = make_leaf(1);

        let branch = root.get_branch("name");
        branch.add_leaf("inner", weak(&leaf));
        root.add_leaf("name", weak(&leaf));
        assert_eq!(print(&root), ["start", "child name", "int 1", "end"]);

        // The evicted branch is no longer owned by the tree.
        assert_eq!(Arc::strong_count(&branch), 1);

        let replacement = root.get_branch("name");
        assert!(replacement.is_empty());
        assert!(!Arc::ptr_eq(&branch, &replacement));
        assert_eq!(print(&root), ["start", "child name", "start", "end", "end"]);

        // Asking again hands out the same branch.
        assert!(Arc::ptr_eq(&replacement, &root.get_branch("name")));
    }

    struct PruningLeaf(Arc<Branch>);

    impl Leaf for PruningLeaf {
        fn print(&self, visitor: &mut dyn Visitor) {
            let empty = self.0.remove_empty_nodes();
            visitor.value(i64::from(empty).into());
        }
    }

    #[test]
    fn test_leaves_may_touch_the_tree_while_printed() {
        let root = Arc::new(Branch::new());
        let pruner = Arc::new(PruningLeaf(Arc::clone(&root)));
        root.add_leaf("pruner", weak(&pruner));
        root.add_leaf("dead", weak(&make_leaf(1)));

        assert_eq!(print(&root), ["start", "child pruner", "int 0", "end"]);
        assert_eq!(root.len(), 1);
    }

    #[test]
    fn test_remove_empty_nodes() {
        let root = Branch::new();
        let leaf1 = make_leaf(1);
        let leaf2 = make_leaf(2);

        root.add_leaf("live_leaf1", weak(&leaf1));
        root.add_leaf("dead_leaf4", weak(&make_leaf(4)));

        let dead_branch = Arc::downgrade(&root.get_branch("dead_branch").get_branch("sub"));
        dead_branch
            .upgrade()
            .expect("branch is owned by the tree")
            .add_leaf("dead_leaf5", weak(&make_leaf(5)));

        let live_branch1 = root.get_branch("live_branch1");
        let live_branch2 = Arc::downgrade(&root.get_branch("live_branch2").get_branch("sub"));
        live_branch2
            .upgrade()
            .expect("branch is owned by the tree")
            .add_leaf("live_leaf2", weak(&leaf2));

        assert!(!root.remove_empty_nodes());

        assert!(dead_branch.upgrade().is_none());
        assert!(live_branch2.upgrade().is_some());
        assert_eq!(Arc::strong_count(&live_branch1), 2);
        assert_eq!(root.len(), 3);

        drop(leaf1);
        drop(leaf2);
        drop(live_branch1);
        assert!(root.remove_empty_nodes());
        assert!(live_branch2.upgrade().is_none());
    }
}
