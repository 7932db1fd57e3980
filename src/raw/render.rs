use alloc::collections::{BTreeMap, VecDeque};
use alloc::string::String;
use core::fmt::{self, Write};

use super::handle::Handle;
use super::raw_two_four_tree::RawTwoFourTree;

/// Horizontal extent of a subtree in the rendered text, as a half-open
/// `(begin, end)` column pair. Keyed by handle, never by address, so the map
/// stays valid however the arena stores its nodes.
type Spans = BTreeMap<Handle, (usize, usize)>;

impl<K: fmt::Display> RawTwoFourTree<K> {
    /// Draws the tree as text, one line per level, with each internal node's
    /// label centered over the rendered width of its subtree.
    ///
    /// Two passes: the first walks the leaves left to right and measures every
    /// subtree's span; the second walks level by level and emits the lines.
    pub(crate) fn render(&self) -> String {
        let Some(root) = self.root() else {
            return String::from("[]\n");
        };

        let spans = self.measure(root);
        self.draw(root, &spans)
    }

    /// Formats a node's key list as `[k0, k1, k2]`.
    fn label(&self, handle: Handle) -> String {
        let mut label = String::from("[");
        for (index, key) in self.node(handle).keys().iter().enumerate() {
            if index > 0 {
                label.push_str(", ");
            }
            let _ = write!(label, "{key}");
        }
        label.push(']');
        label
    }

    /// Measurement pass: assigns each leaf a span sized to its label plus one
    /// separator column, left to right, and pushes the edges up to the
    /// ancestors that share them.
    fn measure(&self, root: Handle) -> Spans {
        let mut spans = Spans::new();
        let mut cursor = 0;

        // Level order visits the bottom level left to right, so leaves are
        // measured in display order.
        let mut queue = VecDeque::from([root]);
        while let Some(handle) = queue.pop_front() {
            let node = self.node(handle);
            if !node.is_leaf() {
                queue.extend(node.children().iter().copied());
                continue;
            }

            let span = (cursor, cursor + self.label(handle).len() + 1);
            cursor = span.1;
            spans.insert(handle, span);

            // A leaf's left edge is also its parent's exactly while the climb
            // stays on first-child links; this visit is the first time each
            // such ancestor is seen, so it enters the map here.
            let mut current = handle;
            while let Some(parent) = self.node(current).parent() {
                if self.node(parent).child(0) != current {
                    break;
                }
                spans.entry(parent).or_insert(span).0 = span.0;
                current = parent;
            }

            // Mirror climb along last-child links. Every ancestor reached here
            // was already opened by its leftmost leaf; a missing entry means
            // the measurement itself is broken.
            let mut current = handle;
            while let Some(parent) = self.node(current).parent() {
                let parent_node = self.node(parent);
                if parent_node.child(parent_node.child_count() - 1) != current {
                    break;
                }
                spans
                    .get_mut(&parent)
                    .unwrap_or_else(|| panic!("`RawTwoFourTree::measure()` - no span recorded for {parent}!"))
                    .1 = span.1;
                current = parent;
            }
        }

        spans
    }

    /// Render pass: one line per level, leaves as `label` plus a separator,
    /// internal labels centered within their measured span. A `None` entry in
    /// the queue marks the end of a level.
    fn draw(&self, root: Handle, spans: &Spans) -> String {
        let mut out = String::new();
        let mut queue: VecDeque<Option<Handle>> = VecDeque::from([Some(root), None]);

        while let Some(item) = queue.pop_front() {
            let Some(handle) = item else {
                out.push('\n');
                if queue.is_empty() {
                    break;
                }
                queue.push_back(None);
                continue;
            };

            let label = self.label(handle);
            let node = self.node(handle);
            if node.is_leaf() {
                out.push_str(&label);
                out.push(' ');
                continue;
            }

            let &(begin, end) = spans
                .get(&handle)
                .unwrap_or_else(|| panic!("`RawTwoFourTree::draw()` - no span recorded for {handle}!"));
            let span = end - begin;
            let field = span / 2 + label.len() / 2;
            push_spaces(&mut out, field.saturating_sub(label.len()));
            out.push_str(&label);
            push_spaces(&mut out, (span / 2).saturating_sub(label.len() / 2));

            queue.extend(node.children().iter().map(|&child| Some(child)));
        }

        out
    }
}

fn push_spaces(out: &mut String, count: usize) {
    for _ in 0..count {
        out.push(' ');
    }
}
