use core::borrow::Borrow;

use smallvec::SmallVec;

use super::arena::Arena;
use super::handle::Handle;
use super::node::{MAX_CHILDREN, Node, SearchResult};

/// A slot within a node: the key lives at `keys[position.1]` of node
/// `position.0`.
pub(crate) type Position = (Handle, usize);

/// The core 2-3-4 tree backing `TwoFourTreeSet`.
///
/// All structural mutation happens here. Insertion splits full nodes on the
/// way down, so a split never has to propagate after the fact; erasure repairs
/// underflow bottom-up through sibling borrows and merges. Both walks are
/// explicit loops over parent handles, never recursion, so stack depth is
/// bounded by tree height alone.
pub(crate) struct RawTwoFourTree<K> {
    /// Arena storing all tree nodes.
    nodes: Arena<Node<K>>,
    /// Handle to the root node, if the tree is non-empty.
    root: Option<Handle>,
    /// Total number of keys in the tree.
    len: usize,
}

impl<K> RawTwoFourTree<K> {
    /// Creates a new, empty tree.
    pub(crate) const fn new() -> Self {
        Self {
            nodes: Arena::new(),
            root: None,
            len: 0,
        }
    }

    /// Returns the number of keys in the tree.
    pub(crate) const fn len(&self) -> usize {
        self.len
    }

    /// Returns true if the tree contains no keys.
    pub(crate) const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Clears all keys from the tree.
    pub(crate) fn clear(&mut self) {
        self.nodes.clear();
        self.root = None;
        self.len = 0;
    }

    /// Returns the root handle, if the tree is non-empty.
    pub(crate) fn root(&self) -> Option<Handle> {
        self.root
    }

    /// Returns a reference to a node by handle.
    pub(crate) fn node(&self, handle: Handle) -> &Node<K> {
        self.nodes.get(handle)
    }

    /// Returns a mutable reference to a node by handle. Test-only: lets the
    /// validator tests damage a tree in controlled ways.
    #[cfg(test)]
    pub(crate) fn node_mut(&mut self, handle: Handle) -> &mut Node<K> {
        self.nodes.get_mut(handle)
    }

    /// Returns the number of live nodes in the arena.
    pub(crate) fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Returns the number of levels in the tree; zero when empty.
    pub(crate) fn height(&self) -> usize {
        let Some(root) = self.root else { return 0 };
        let mut height = 1;
        let mut current = root;
        while !self.nodes.get(current).is_leaf() {
            current = self.nodes.get(current).child(0);
            height += 1;
        }
        height
    }

    /// Returns the position of the first (smallest) key.
    pub(crate) fn first_position(&self) -> Option<Position> {
        let root = self.root?;
        Some((self.leftmost_leaf(root), 0))
    }

    /// Returns the position of the last (largest) key.
    pub(crate) fn last_position(&self) -> Option<Position> {
        let root = self.root?;
        let leaf = self.rightmost_leaf(root);
        Some((leaf, self.nodes.get(leaf).key_count() - 1))
    }

    /// Returns the position holding the next key in sorted order.
    ///
    /// For an internal slot the successor is the leftmost key of the subtree
    /// to the slot's right; for the last slot of a leaf it is found by
    /// climbing parent links until the node climbed from was not its parent's
    /// last child.
    pub(crate) fn successor(&self, (handle, index): Position) -> Option<Position> {
        let node = self.nodes.get(handle);
        if !node.is_leaf() {
            return Some((self.leftmost_leaf(node.child(index + 1)), 0));
        }
        if index + 1 < node.key_count() {
            return Some((handle, index + 1));
        }

        let mut current = handle;
        while let Some(parent) = self.nodes.get(current).parent() {
            let child_index = self.child_index(parent, current);
            if child_index < self.nodes.get(parent).key_count() {
                return Some((parent, child_index));
            }
            current = parent;
        }
        None
    }

    /// Returns the position holding the previous key in sorted order; the
    /// mirror of [`successor`](Self::successor).
    pub(crate) fn predecessor(&self, (handle, index): Position) -> Option<Position> {
        let node = self.nodes.get(handle);
        if !node.is_leaf() {
            let leaf = self.rightmost_leaf(node.child(index));
            return Some((leaf, self.nodes.get(leaf).key_count() - 1));
        }
        if index > 0 {
            return Some((handle, index - 1));
        }

        let mut current = handle;
        while let Some(parent) = self.nodes.get(current).parent() {
            let child_index = self.child_index(parent, current);
            if child_index > 0 {
                return Some((parent, child_index - 1));
            }
            current = parent;
        }
        None
    }

    /// Descends to the leftmost leaf of the subtree rooted at `from`.
    pub(super) fn leftmost_leaf(&self, from: Handle) -> Handle {
        let mut current = from;
        while !self.nodes.get(current).is_leaf() {
            current = self.nodes.get(current).child(0);
        }
        current
    }

    /// Descends to the rightmost leaf of the subtree rooted at `from`.
    pub(super) fn rightmost_leaf(&self, from: Handle) -> Handle {
        let mut current = from;
        loop {
            let node = self.nodes.get(current);
            if node.is_leaf() {
                return current;
            }
            current = node.child(node.child_count() - 1);
        }
    }

    /// Returns the slot `child` occupies in `parent`'s child list.
    ///
    /// A miss means a parent back-reference and a child slot disagree, which
    /// is an algorithmic defect, so this fails loudly rather than guessing.
    fn child_index(&self, parent: Handle, child: Handle) -> usize {
        self.nodes
            .get(parent)
            .children()
            .iter()
            .position(|&c| c == child)
            .unwrap_or_else(|| panic!("`RawTwoFourTree::child_index()` - {child} is not a child of {parent}!"))
    }
}

impl<K: Ord> RawTwoFourTree<K> {
    /// Searches for a key and returns its position if present.
    pub(crate) fn search<Q>(&self, key: &Q) -> Option<Position>
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        let mut current = self.root?;
        loop {
            let node = self.nodes.get(current);
            match node.search(key) {
                SearchResult::Found(idx) => return Some((current, idx)),
                SearchResult::NotFound(idx) => {
                    if node.is_leaf() {
                        return None;
                    }
                    current = node.child(idx);
                }
            }
        }
    }

    /// Returns a reference to the stored key equal to `key`, if any.
    pub(crate) fn get<Q>(&self, key: &Q) -> Option<&K>
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        let (handle, index) = self.search(key)?;
        Some(self.nodes.get(handle).key(index))
    }

    /// Inserts a key, splitting full nodes on the way down.
    ///
    /// Returns the key's position and whether a new key was added; an equal
    /// key already present is left untouched and its position returned.
    pub(crate) fn insert(&mut self, key: K) -> (Position, bool) {
        let Some(root) = self.root else {
            let mut node = Node::new_leaf();
            node.push_key(key);
            let handle = self.nodes.alloc(node);
            self.root = Some(handle);
            self.len = 1;
            return ((handle, 0), true);
        };

        // A full root splits into a new root; the only height increase.
        if self.nodes.get(root).is_full() {
            self.split_root(root);
        }

        let mut current = self.root.unwrap();
        loop {
            match self.nodes.get(current).search(&key) {
                SearchResult::Found(idx) => return ((current, idx), false),
                SearchResult::NotFound(idx) => {
                    if self.nodes.get(current).is_leaf() {
                        // Every full ancestor was split on the way down, so
                        // the leaf has room.
                        self.nodes.get_mut(current).insert_key(idx, key);
                        self.len += 1;
                        return ((current, idx), true);
                    }

                    let child = self.nodes.get(current).child(idx);
                    if self.nodes.get(child).is_full() {
                        // Split before descending. The promoted median lands
                        // in `current` and may redirect or terminate the
                        // descent, so rescan this node.
                        self.split_child(current, idx);
                    } else {
                        current = child;
                    }
                }
            }
        }
    }

    /// Removes a key from the tree. Returns false if the key was absent.
    pub(crate) fn erase<Q>(&mut self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        match self.search(key) {
            Some((handle, index)) => {
                self.remove_at(handle, index);
                true
            }
            None => false,
        }
    }

    /// Removes and returns the smallest key.
    pub(crate) fn pop_first(&mut self) -> Option<K> {
        let (handle, index) = self.first_position()?;
        Some(self.remove_at(handle, index))
    }

    /// Removes and returns the largest key.
    pub(crate) fn pop_last(&mut self) -> Option<K> {
        let (handle, index) = self.last_position()?;
        Some(self.remove_at(handle, index))
    }

    /// Removes the key at a known position and returns it.
    ///
    /// An interior slot is refilled with its in-order predecessor (when the
    /// left child can lend a key) or successor (otherwise), and the donor key
    /// is extracted from the leaf it came from; either way the structural
    /// repair starts at a leaf.
    fn remove_at(&mut self, handle: Handle, index: usize) -> K {
        let (leaf, removed) = if self.nodes.get(handle).is_leaf() {
            (handle, self.nodes.get_mut(handle).remove_key(index))
        } else {
            let left = self.nodes.get(handle).child(index);
            let (donor_leaf, donor_key) = if self.nodes.get(left).can_lend() {
                let leaf = self.rightmost_leaf(left);
                let last = self.nodes.get(leaf).key_count() - 1;
                (leaf, self.nodes.get_mut(leaf).remove_key(last))
            } else {
                let right = self.nodes.get(handle).child(index + 1);
                let leaf = self.leftmost_leaf(right);
                (leaf, self.nodes.get_mut(leaf).remove_key(0))
            };
            (donor_leaf, self.nodes.get_mut(handle).replace_key(index, donor_key))
        };

        self.len -= 1;
        self.fix_underflow(leaf);
        removed
    }

    /// Splits the full root, growing the tree by one level.
    fn split_root(&mut self, root: Handle) {
        let new_root = self.nodes.alloc(Node::new_leaf());
        self.nodes.get_mut(new_root).push_child(root);
        self.nodes.get_mut(root).set_parent(Some(new_root));
        self.root = Some(new_root);
        self.split_child(new_root, 0);
    }

    /// Splits the full child at `index` of `parent`, promoting the child's
    /// median key into `parent` at that slot.
    fn split_child(&mut self, parent: Handle, index: usize) {
        let child = self.nodes.get(parent).child(index);
        let (median, right) = self.nodes.get_mut(child).split_off();

        let right_handle = self.nodes.alloc(right);
        self.nodes.get_mut(right_handle).set_parent(Some(parent));

        // The right half took the upper two children with it; point them at
        // their new owner.
        let moved: SmallVec<[Handle; MAX_CHILDREN]> =
            self.nodes.get(right_handle).children().iter().copied().collect();
        for grandchild in moved {
            self.nodes.get_mut(grandchild).set_parent(Some(right_handle));
        }

        self.nodes.get_mut(parent).insert_separator(index, median, right_handle);
    }

    /// Repairs a zero-key node, walking toward the root while merges keep
    /// emptying parents.
    fn fix_underflow(&mut self, start: Handle) {
        let mut handle = start;
        while self.nodes.get(handle).key_count() == 0 {
            let Some(parent) = self.nodes.get(handle).parent() else {
                // Root underflow: drop a level, or empty the tree.
                if self.nodes.get(handle).is_leaf() {
                    self.nodes.free(handle);
                    self.root = None;
                } else {
                    let child = self.nodes.get(handle).child(0);
                    self.nodes.get_mut(child).set_parent(None);
                    self.nodes.free(handle);
                    self.root = Some(child);
                }
                return;
            };

            let index = self.child_index(parent, handle);

            if index > 0 {
                let left = self.nodes.get(parent).child(index - 1);
                if self.nodes.get(left).can_lend() {
                    self.borrow_from_left(parent, index);
                    return;
                }
            }
            if index + 1 < self.nodes.get(parent).child_count() {
                let right = self.nodes.get(parent).child(index + 1);
                if self.nodes.get(right).can_lend() {
                    self.borrow_from_right(parent, index);
                    return;
                }
            }

            // No sibling can lend: merge with the adjacent one (left when
            // present) around the separating key, then re-examine the parent.
            let separator = if index > 0 { index - 1 } else { index };
            self.merge_children(parent, separator);
            handle = parent;
        }
    }

    /// Rotates the left sibling's last key up through the parent separator and
    /// the separator down into the front of the child at `index`.
    fn borrow_from_left(&mut self, parent: Handle, index: usize) {
        let left = self.nodes.get(parent).child(index - 1);
        let node = self.nodes.get(parent).child(index);

        let borrowed = self.nodes.get_mut(left).pop_key();
        let separator = self.nodes.get_mut(parent).replace_key(index - 1, borrowed);
        self.nodes.get_mut(node).push_key_front(separator);

        if !self.nodes.get(left).is_leaf() {
            let child = self.nodes.get_mut(left).pop_child();
            self.nodes.get_mut(child).set_parent(Some(node));
            self.nodes.get_mut(node).push_child_front(child);
        }
    }

    /// Mirror of [`borrow_from_left`](Self::borrow_from_left): rotates the
    /// right sibling's first key through the parent separator at `index`.
    fn borrow_from_right(&mut self, parent: Handle, index: usize) {
        let right = self.nodes.get(parent).child(index + 1);
        let node = self.nodes.get(parent).child(index);

        let borrowed = self.nodes.get_mut(right).remove_key(0);
        let separator = self.nodes.get_mut(parent).replace_key(index, borrowed);
        self.nodes.get_mut(node).push_key(separator);

        if !self.nodes.get(right).is_leaf() {
            let child = self.nodes.get_mut(right).pop_child_front();
            self.nodes.get_mut(child).set_parent(Some(node));
            self.nodes.get_mut(node).push_child(child);
        }
    }

    /// Merges the children on both sides of the parent's separator at
    /// `separator` into the left one, freeing the right.
    fn merge_children(&mut self, parent: Handle, separator: usize) {
        let (key, right_handle) = self.nodes.get_mut(parent).remove_separator(separator);
        let left = self.nodes.get(parent).child(separator);

        let right = self.nodes.take(right_handle);
        let moved: SmallVec<[Handle; MAX_CHILDREN]> = right.children().iter().copied().collect();
        self.nodes.get_mut(left).absorb(key, right);

        for child in moved {
            self.nodes.get_mut(child).set_parent(Some(left));
        }
    }
}

// Handles are arena indices, so a field-wise clone preserves the whole node
// graph; no fix-up pass is required.
impl<K: Clone> Clone for RawTwoFourTree<K> {
    fn clone(&self) -> Self {
        Self {
            nodes: self.nodes.clone(),
            root: self.root,
            len: self.len,
        }
    }
}
