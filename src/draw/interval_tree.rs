//! An insert-only interval tree for windowed overlap queries.
//!
//! Balanced as a left-leaning red-black tree keyed by interval start,
//! with every node caching the maximum end of its subtree so a query can
//! prune branches that end before the window opens. Nodes live in one
//! pre-reserved vector and reference each other by index, so building the
//! tree never allocates per node. Duplicates (equal start *and* end)
//! chain as a sibling list on their node instead of occupying tree
//! positions.
//!
//! Queries cost `O(log n + k)` for `k` reported intervals, which keeps a
//! viewport redraw independent of total event count.

use crate::error::Error;

/// An item indexable by the tree.
pub trait Interval {
    fn start(&self) -> i64;
    fn end(&self) -> i64;
}

const NIL: u32 = u32::MAX;

struct Node<T> {
    item: T,
    left: u32,
    right: u32,
    sibling: u32,
    /// Maximum end over this node, its siblings and both subtrees. Set by
    /// [`IntervalTree::rebuild_maxima`].
    max_end: i64,
    red: bool,
}

pub struct IntervalTree<T> {
    nodes: Vec<Node<T>>,
    root: u32,
    capacity: usize,
}

impl<T: Interval + Copy> IntervalTree<T> {
    /// A tree that can hold up to `capacity` intervals.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            nodes: Vec::with_capacity(capacity),
            root: NIL,
            capacity,
        }
    }

    /// Number of stored intervals, sibling chains included.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Insert an interval. Fails once the declared capacity is exhausted,
    /// which would otherwise reallocate the node pool.
    pub fn insert(&mut self, item: T) -> Result<(), Error> {
        let root = self.insert_at(self.root, item)?;
        self.root = root;
        self.nodes[root as usize].red = false;
        Ok(())
    }

    /// Recompute every subtree maximum. Must run after the last insert
    /// and before the first query.
    pub fn rebuild_maxima(&mut self) {
        self.rebuild_at(self.root);
    }

    /// Collect every stored interval overlapping the closed window
    /// `[start, end]` into `out`.
    pub fn query(&self, start: i64, end: i64, out: &mut Vec<T>) {
        self.query_at(self.root, start, end, out);
    }

    fn new_node(&mut self, item: T) -> Result<u32, Error> {
        if self.nodes.len() >= self.capacity {
            return Err(Error::InvalidConfiguration(
                "interval tree capacity exceeded",
            ));
        }
        let max_end = item.end();
        self.nodes.push(Node {
            item,
            left: NIL,
            right: NIL,
            sibling: NIL,
            max_end,
            red: true,
        });
        Ok((self.nodes.len() - 1) as u32)
    }

    fn is_red(&self, node: u32) -> bool {
        node != NIL && self.nodes[node as usize].red
    }

    fn insert_at(&mut self, h: u32, item: T) -> Result<u32, Error> {
        if h == NIL {
            return self.new_node(item);
        }

        if self.is_red(self.nodes[h as usize].left) && self.is_red(self.nodes[h as usize].right) {
            self.flip_colors(h);
        }

        let here = &self.nodes[h as usize].item;
        let (here_start, here_end) = (here.start(), here.end());
        if item.start() == here_start && item.end() == here_end {
            // Same interval: chain it instead of growing the tree.
            let node = self.new_node(item)?;
            let mut tail = h;
            while self.nodes[tail as usize].sibling != NIL {
                tail = self.nodes[tail as usize].sibling;
            }
            self.nodes[tail as usize].sibling = node;
        } else if item.start() < here_start {
            let left = self.insert_at(self.nodes[h as usize].left, item)?;
            self.nodes[h as usize].left = left;
        } else {
            let right = self.insert_at(self.nodes[h as usize].right, item)?;
            self.nodes[h as usize].right = right;
        }

        let mut h = h;
        if self.is_red(self.nodes[h as usize].right) && !self.is_red(self.nodes[h as usize].left) {
            h = self.rotate_left(h);
        }
        let left = self.nodes[h as usize].left;
        if self.is_red(left) && self.is_red(self.nodes[left as usize].left) {
            h = self.rotate_right(h);
        }
        Ok(h)
    }

    fn flip_colors(&mut self, h: u32) {
        let node = &mut self.nodes[h as usize];
        node.red = !node.red;
        let (left, right) = (node.left, node.right);
        self.nodes[left as usize].red = !self.nodes[left as usize].red;
        self.nodes[right as usize].red = !self.nodes[right as usize].red;
    }

    fn rotate_left(&mut self, h: u32) -> u32 {
        let x = self.nodes[h as usize].right;
        self.nodes[h as usize].right = self.nodes[x as usize].left;
        self.nodes[x as usize].left = h;
        self.nodes[x as usize].red = self.nodes[h as usize].red;
        self.nodes[h as usize].red = true;
        x
    }

    fn rotate_right(&mut self, h: u32) -> u32 {
        let x = self.nodes[h as usize].left;
        self.nodes[h as usize].left = self.nodes[x as usize].right;
        self.nodes[x as usize].right = h;
        self.nodes[x as usize].red = self.nodes[h as usize].red;
        self.nodes[h as usize].red = true;
        x
    }

    fn rebuild_at(&mut self, node: u32) -> i64 {
        if node == NIL {
            return i64::MIN;
        }

        // The node's own maximum includes its sibling chain.
        let mut own = self.nodes[node as usize].item.end();
        let mut sibling = self.nodes[node as usize].sibling;
        while sibling != NIL {
            own = own.max(self.nodes[sibling as usize].item.end());
            sibling = self.nodes[sibling as usize].sibling;
        }

        let left = self.rebuild_at(self.nodes[node as usize].left);
        let right = self.rebuild_at(self.nodes[node as usize].right);
        let max_end = own.max(left).max(right);
        self.nodes[node as usize].max_end = max_end;
        max_end
    }

    fn query_at(&self, node: u32, start: i64, end: i64, out: &mut Vec<T>) {
        if node == NIL {
            return;
        }
        let n = &self.nodes[node as usize];

        // Nothing in this subtree ends late enough to reach the window.
        if start > n.max_end {
            return;
        }

        self.query_at(n.left, start, end, out);

        let mut current = node;
        while current != NIL {
            let item = &self.nodes[current as usize].item;
            if item.start() <= end && start <= item.end() {
                out.push(*item);
            }
            current = self.nodes[current as usize].sibling;
        }

        // Everything to the right starts after the window closes.
        if end < n.item.start() {
            return;
        }

        self.query_at(n.right, start, end, out);
    }
}
