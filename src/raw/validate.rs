use alloc::collections::VecDeque;
use alloc::format;
use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;

use super::handle::Handle;
use super::node::{MAX_KEYS, MIN_KEYS};
use super::raw_two_four_tree::RawTwoFourTree;

/// A structural invariant violation reported by
/// [`check`](crate::TwoFourTreeSet::check).
///
/// Identifies the offending node (by arena index) where one exists; tree-wide
/// problems such as a key-count mismatch carry no node.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Violation {
    node: Option<usize>,
    message: String,
}

impl Violation {
    fn at(node: Handle, message: String) -> Self {
        Self {
            node: Some(node.to_index()),
            message,
        }
    }

    fn tree(message: String) -> Self {
        Self { node: None, message }
    }

    /// Arena index of the offending node, if the violation is node-local.
    #[must_use]
    pub fn node(&self) -> Option<usize> {
        self.node
    }

    /// Describes the violated invariant, with expected and actual values.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.node {
            Some(node) => write!(f, "n{node}: {}", self.message),
            None => write!(f, "tree: {}", self.message),
        }
    }
}

fn name(handle: Option<Handle>) -> String {
    handle.map_or_else(|| String::from("none"), |h| format!("{h}"))
}

impl<K: Ord + fmt::Debug> RawTwoFourTree<K> {
    /// Verifies every structural invariant with a breadth-first walk and
    /// reports each violation found.
    ///
    /// Read-only and independent of the insert/erase code paths. The walk
    /// never stops at the first problem: every node is visited and every
    /// violation accumulated, so a corrupt tree can be diagnosed in one pass.
    pub(crate) fn check_invariants(&self) -> Vec<Violation> {
        let mut violations = Vec::new();

        let Some(root) = self.root() else {
            if self.len() != 0 {
                violations.push(Violation::tree(format!(
                    "stored key count is {} but the tree has no root",
                    self.len()
                )));
            }
            if self.node_count() != 0 {
                violations.push(Violation::tree(format!(
                    "arena holds {} nodes but the tree has no root",
                    self.node_count()
                )));
            }
            return violations;
        };

        let mut population = 0;
        let mut visited = 0;
        let mut leaf_depth: Option<usize> = None;
        let mut queue: VecDeque<(Option<Handle>, Handle, usize)> = VecDeque::from([(None, root, 0)]);

        while let Some((expected_parent, handle, depth)) = queue.pop_front() {
            let node = self.node(handle);
            population += node.key_count();
            visited += 1;

            if node.parent() != expected_parent {
                violations.push(Violation::at(
                    handle,
                    format!(
                        "parent back-reference is {}, expected {}",
                        name(node.parent()),
                        name(expected_parent)
                    ),
                ));
            }

            if node.key_count() > MAX_KEYS {
                violations.push(Violation::at(
                    handle,
                    format!("holds {} keys, more than {MAX_KEYS}", node.key_count()),
                ));
            }
            if expected_parent.is_some() && node.key_count() < MIN_KEYS {
                violations.push(Violation::at(handle, String::from("non-root node holds no keys")));
            }
            if expected_parent.is_none() && node.key_count() == 0 {
                violations.push(Violation::at(handle, String::from("root node holds no keys")));
            }

            for index in 1..node.key_count() {
                if node.key(index - 1) >= node.key(index) {
                    violations.push(Violation::at(
                        handle,
                        format!(
                            "keys out of order: {:?} at {} is not below {:?} at {}",
                            node.key(index - 1),
                            index - 1,
                            node.key(index),
                            index
                        ),
                    ));
                }
            }

            if node.is_leaf() {
                // All leaves sit on one level.
                match leaf_depth {
                    None => leaf_depth = Some(depth),
                    Some(expected) if expected != depth => {
                        violations.push(Violation::at(
                            handle,
                            format!("leaf at depth {depth}, expected depth {expected}"),
                        ));
                    }
                    Some(_) => {}
                }
                continue;
            }

            if node.child_count() != node.key_count() + 1 {
                violations.push(Violation::at(
                    handle,
                    format!(
                        "internal node holds {} children for {} keys",
                        node.child_count(),
                        node.key_count()
                    ),
                ));
            }

            for (index, &child) in node.children().iter().enumerate() {
                // Each subtree is bounded by the separators around it: keys
                // below keys[index] on the left of a separator, above the last
                // key in the final child.
                if index < node.key_count() {
                    if let Some(child_max) = self.subtree_max(child)
                        && child_max >= node.key(index)
                    {
                        violations.push(Violation::at(
                            handle,
                            format!(
                                "child {index} reaches up to {child_max:?}, not below separator {:?}",
                                node.key(index)
                            ),
                        ));
                    }
                } else if node.key_count() > 0
                    && let Some(child_min) = self.subtree_min(child)
                    && child_min <= node.key(node.key_count() - 1)
                {
                    violations.push(Violation::at(
                        handle,
                        format!(
                            "last child reaches down to {child_min:?}, not above separator {:?}",
                            node.key(node.key_count() - 1)
                        ),
                    ));
                }
                queue.push_back((Some(handle), child, depth + 1));
            }
        }

        if population != self.len() {
            violations.push(Violation::tree(format!(
                "stored key count is {}, found {population}",
                self.len()
            )));
        }
        if visited != self.node_count() {
            violations.push(Violation::tree(format!(
                "arena holds {} nodes but the walk reached {visited}",
                self.node_count()
            )));
        }

        violations
    }

    /// Smallest key reachable from `from`, assuming in-node ordering.
    fn subtree_min(&self, from: Handle) -> Option<&K> {
        self.node(self.leftmost_leaf(from)).keys().first()
    }

    /// Largest key reachable from `from`, assuming in-node ordering.
    fn subtree_max(&self, from: Handle) -> Option<&K> {
        self.node(self.rightmost_leaf(from)).keys().last()
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    fn sample() -> RawTwoFourTree<i32> {
        let mut tree = RawTwoFourTree::new();
        for key in [1, 2, 3, 4] {
            tree.insert(key);
        }
        // Root [2] over leaves [1] and [3, 4].
        tree
    }

    fn messages(tree: &RawTwoFourTree<i32>) -> alloc::vec::Vec<String> {
        tree.check_invariants().iter().map(|v| format!("{v}")).collect()
    }

    #[test]
    fn clean_tree_reports_nothing() {
        assert!(sample().check_invariants().is_empty());
        assert!(RawTwoFourTree::<i32>::new().check_invariants().is_empty());
    }

    #[test]
    fn detached_parent_reference_is_reported() {
        let mut tree = sample();
        let root = tree.root().unwrap();
        let child = tree.node(root).child(0);
        tree.node_mut(child).set_parent(None);

        let reported = messages(&tree);
        assert!(reported.iter().any(|m| m.contains("parent back-reference is none")), "{reported:?}");
    }

    #[test]
    fn unsorted_keys_are_reported() {
        let mut tree = sample();
        let root = tree.root().unwrap();
        let right = tree.node(root).child(1);
        tree.node_mut(right).replace_key(0, 99);

        let reported = messages(&tree);
        assert!(reported.iter().any(|m| m.contains("keys out of order")), "{reported:?}");
    }

    #[test]
    fn separator_bound_violations_are_reported() {
        let mut tree = sample();
        let root = tree.root().unwrap();
        tree.node_mut(root).replace_key(0, 0);

        // Left subtree [1] now reaches above the separator 0, and the right
        // subtree's bound stays intact.
        let reported = messages(&tree);
        assert!(reported.iter().any(|m| m.contains("not below separator")), "{reported:?}");
    }

    #[test]
    fn stolen_key_breaks_population_and_minimum() {
        let mut tree = sample();
        let root = tree.root().unwrap();
        let left = tree.node(root).child(0);
        tree.node_mut(left).remove_key(0);

        let reported = messages(&tree);
        assert!(reported.iter().any(|m| m.contains("non-root node holds no keys")), "{reported:?}");
        assert!(reported.iter().any(|m| m.contains("stored key count is 4, found 3")), "{reported:?}");
    }

    #[test]
    fn every_violation_is_accumulated() {
        let mut tree = sample();
        let root = tree.root().unwrap();
        let left = tree.node(root).child(0);
        tree.node_mut(left).set_parent(None);
        tree.node_mut(left).remove_key(0);

        assert!(tree.check_invariants().len() >= 3);
    }
}
