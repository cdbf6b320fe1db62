//! Collection of nodes used for the RRB tree.
//!
//! A tree is built from two kinds of nodes. A `Leaf` holds the elements
//! themselves. An `Internal` node holds a homogeneous list of children (leaves
//! at level 1, internal nodes above that) together with a cumulative
//! [`SizeTable`] describing how many elements live under each child. Nodes are
//! shared between trees through [`SharedPointer`] handles and are never
//! mutated once another tree can observe them; all in-place edits go through
//! `SharedPointer::make_mut`, which copies the node if it is shared.

use crate::size_table::SizeTable;
use crate::RRB_WIDTH;
use archery::{SharedPointer, SharedPointerKind};

/// A leaf indicates a terminal node in the tree.
#[derive(Clone, Debug)]
pub(crate) struct Leaf<A> {
    buffer: Vec<A>,
}

impl<A> Leaf<A> {
    /// Constructs a new empty leaf.
    pub fn empty() -> Self {
        Leaf { buffer: Vec::new() }
    }

    /// Constructs a new leaf with a single item.
    pub fn with_item(item: A) -> Self {
        Leaf { buffer: vec![item] }
    }

    /// Constructs a new leaf from the given items.
    pub fn with_items(items: Vec<A>) -> Self {
        debug_assert!(items.len() <= RRB_WIDTH);
        Leaf { buffer: items }
    }

    /// Returns the number of elements in the leaf.
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Returns true if the leaf holds no elements.
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Returns the amount of space left in the leaf.
    pub fn free_space(&self) -> usize {
        RRB_WIDTH - self.len()
    }

    /// Returns a reference to the element at the given position.
    pub fn get(&self, idx: usize) -> Option<&A> {
        self.buffer.get(idx)
    }

    /// Returns a mutable reference to the element at the given position.
    pub fn get_mut(&mut self, idx: usize) -> Option<&mut A> {
        self.buffer.get_mut(idx)
    }

    /// Removes and returns the element at the given position.
    pub fn remove(&mut self, idx: usize) -> A {
        self.buffer.remove(idx)
    }

    /// Returns the elements as a slice.
    pub fn as_slice(&self) -> &[A] {
        &self.buffer
    }

    /// Removes elements from the front of `self` and appends them to
    /// `destination`. At most `len` elements are moved; the number actually
    /// moved is returned.
    pub fn share_children_with(&mut self, destination: &mut Self, len: usize) -> usize {
        let shared = len.min(self.len()).min(destination.free_space());
        destination.buffer.extend(self.buffer.drain(..shared));
        shared
    }
}

/// Represents a homogeneous list of nodes.
#[derive(Debug)]
pub(crate) enum ChildList<A, P: SharedPointerKind> {
    /// The children of a node at level 1.
    Leaves(Vec<SharedPointer<Leaf<A>, P>>),
    /// The children of a node at level 2 or above.
    Internals(Vec<SharedPointer<Internal<A, P>, P>>),
}

impl<A, P: SharedPointerKind> Clone for ChildList<A, P> {
    fn clone(&self) -> Self {
        match self {
            ChildList::Leaves(children) => ChildList::Leaves(children.clone()),
            ChildList::Internals(children) => ChildList::Internals(children.clone()),
        }
    }
}

impl<A, P: SharedPointerKind> ChildList<A, P> {
    /// Returns a reference to the list as a list of leaf nodes.
    ///
    /// # Panics
    ///
    /// Panics if `self` is not a list of leaf nodes.
    pub fn leaves_ref(&self) -> &Vec<SharedPointer<Leaf<A>, P>> {
        if let ChildList::Leaves(x) = self {
            x
        } else {
            panic!("Failed to unwrap a child list as a leaves list")
        }
    }

    /// Returns a reference to the list as a list of internal nodes.
    ///
    /// # Panics
    ///
    /// Panics if `self` is not a list of internal nodes.
    pub fn internals_ref(&self) -> &Vec<SharedPointer<Internal<A, P>, P>> {
        if let ChildList::Internals(x) = self {
            x
        } else {
            panic!("Failed to unwrap a child list as an internals list")
        }
    }

    /// Returns the number of children in the list.
    pub fn len(&self) -> usize {
        match self {
            ChildList::Leaves(children) => children.len(),
            ChildList::Internals(children) => children.len(),
        }
    }
}

/// An internal node of the tree: a list of children and the cumulative size
/// table that indexes into them.
#[derive(Debug)]
pub(crate) struct Internal<A, P: SharedPointerKind> {
    pub(crate) sizes: SizeTable,
    pub(crate) children: ChildList<A, P>,
}

impl<A, P: SharedPointerKind> Clone for Internal<A, P> {
    fn clone(&self) -> Self {
        Internal {
            sizes: self.sizes.clone(),
            children: self.children.clone(),
        }
    }
}

impl<A, P: SharedPointerKind> Internal<A, P> {
    /// Constructs a new empty node at level 1. This is the root of the empty
    /// tree.
    pub fn empty_leaves() -> Self {
        Internal {
            sizes: SizeTable::new(1),
            children: ChildList::Leaves(Vec::new()),
        }
    }

    /// Constructs a node at level 1 from the given leaves.
    pub fn from_leaves(leaves: Vec<SharedPointer<Leaf<A>, P>>) -> Self {
        debug_assert!(leaves.len() <= RRB_WIDTH);
        let mut sizes = SizeTable::new(1);
        for leaf in &leaves {
            sizes.push_child(leaf.len());
        }
        Internal {
            sizes,
            children: ChildList::Leaves(leaves),
        }
    }

    /// Constructs a node at the given level (at least 2) from the given
    /// internal children, which must all sit one level below.
    pub fn from_internals(level: usize, internals: Vec<SharedPointer<Internal<A, P>, P>>) -> Self {
        debug_assert!(level >= 2);
        debug_assert!(internals.len() <= RRB_WIDTH);
        let mut sizes = SizeTable::new(level);
        for child in &internals {
            debug_assert_eq!(child.level() + 1, level);
            sizes.push_child(child.len());
        }
        Internal {
            sizes,
            children: ChildList::Internals(internals),
        }
    }

    /// Constructs a node at the given level from a homogeneous list of child
    /// handles.
    pub fn from_nodes(level: usize, nodes: Vec<NodeRc<A, P>>) -> Self {
        debug_assert!(!nodes.is_empty());
        if matches!(nodes[0], NodeRc::Leaf(_)) {
            debug_assert_eq!(level, 1);
            Self::from_leaves(nodes.into_iter().map(|node| node.leaf()).collect())
        } else {
            Self::from_internals(level, nodes.into_iter().map(|node| node.internal()).collect())
        }
    }

    /// Returns the level of the node. Level 1 nodes hold leaves.
    pub fn level(&self) -> usize {
        self.sizes.level()
    }

    /// Returns the number of elements under the node.
    pub fn len(&self) -> usize {
        self.sizes.cumulative_size()
    }

    /// Returns the number of direct children of the node.
    pub fn slots(&self) -> usize {
        self.children.len()
    }

    /// Returns the number of unused child positions in the node.
    pub fn free_slots(&self) -> usize {
        RRB_WIDTH - self.slots()
    }

    /// Returns true if the node has no children.
    pub fn is_empty(&self) -> bool {
        self.slots() == 0
    }

    /// Returns a reference to the element at the given position under this
    /// node.
    pub fn get(&self, idx: usize) -> Option<&A> {
        let (slot, subidx) = self.sizes.position_info_for(idx)?;
        match &self.children {
            ChildList::Leaves(children) => children[slot].get(subidx),
            ChildList::Internals(children) => children[slot].get(subidx),
        }
    }

    /// Returns a mutable reference to the element at the given position under
    /// this node, copying every shared node on the path to it.
    pub fn get_mut(&mut self, idx: usize) -> Option<&mut A>
    where
        A: Clone,
    {
        let (slot, subidx) = self.sizes.position_info_for(idx)?;
        match &mut self.children {
            ChildList::Leaves(children) => {
                SharedPointer::make_mut(&mut children[slot]).get_mut(subidx)
            }
            ChildList::Internals(children) => {
                SharedPointer::make_mut(&mut children[slot]).get_mut(subidx)
            }
        }
    }

    /// Removes children from the front of `self` and appends them to
    /// `destination`, keeping both size tables consistent. At most `len`
    /// children are moved; the number actually moved is returned.
    pub fn share_children_with(&mut self, destination: &mut Self, len: usize) -> usize {
        debug_assert_eq!(self.level(), destination.level());
        let shared = len.min(self.slots()).min(destination.free_slots());
        for _ in 0..shared {
            let size = self.sizes.pop_front_child();
            destination.sizes.push_child(size);
        }
        match (&mut self.children, &mut destination.children) {
            (ChildList::Leaves(source), ChildList::Leaves(dest)) => {
                dest.extend(source.drain(..shared));
            }
            (ChildList::Internals(source), ChildList::Internals(dest)) => {
                dest.extend(source.drain(..shared));
            }
            _ => panic!("Tried to share children between nodes of different levels"),
        }
        shared
    }

    /// Checks that the node and everything below it satisfy the tree
    /// invariants: the size table is cumulative over the children, fan-out
    /// never exceeds the node width, children sit exactly one level down, and
    /// no node below the root is empty. Returns the total number of elements
    /// under the node.
    pub fn debug_check_invariants(&self, expected_level: usize) -> usize {
        assert_eq!(self.level(), expected_level);
        assert!(self.slots() <= RRB_WIDTH);
        assert_eq!(self.sizes.len(), self.slots());
        let mut cumulative = 0;
        match &self.children {
            ChildList::Leaves(children) => {
                assert_eq!(expected_level, 1);
                for (slot, child) in children.iter().enumerate() {
                    assert!(!child.is_empty());
                    assert!(child.len() <= RRB_WIDTH);
                    cumulative += child.len();
                    assert_eq!(self.sizes.get_cumulative_child_size(slot), Some(cumulative));
                }
            }
            ChildList::Internals(children) => {
                assert!(expected_level > 1);
                for (slot, child) in children.iter().enumerate() {
                    assert!(!child.is_empty());
                    cumulative += child.debug_check_invariants(expected_level - 1);
                    assert_eq!(self.sizes.get_cumulative_child_size(slot), Some(cumulative));
                }
            }
        }
        cumulative
    }
}

/// A handle to either kind of node.
#[derive(Debug)]
pub(crate) enum NodeRc<A, P: SharedPointerKind> {
    /// A handle to a leaf.
    Leaf(SharedPointer<Leaf<A>, P>),
    /// A handle to an internal node.
    Internal(SharedPointer<Internal<A, P>, P>),
}

impl<A, P: SharedPointerKind> Clone for NodeRc<A, P> {
    fn clone(&self) -> Self {
        match self {
            NodeRc::Leaf(node) => NodeRc::Leaf(node.clone()),
            NodeRc::Internal(node) => NodeRc::Internal(node.clone()),
        }
    }
}

impl<A, P: SharedPointerKind> NodeRc<A, P> {
    /// Returns the number of elements under the node.
    pub fn size(&self) -> usize {
        match self {
            NodeRc::Leaf(node) => node.len(),
            NodeRc::Internal(node) => node.len(),
        }
    }

    /// Returns the number of elements or children directly held by the node.
    pub fn slots(&self) -> usize {
        match self {
            NodeRc::Leaf(node) => node.len(),
            NodeRc::Internal(node) => node.slots(),
        }
    }

    /// Returns true if the node directly holds nothing.
    pub fn is_empty(&self) -> bool {
        self.slots() == 0
    }

    /// Returns true if the node has no free positions.
    pub fn is_full(&self) -> bool {
        self.slots() == RRB_WIDTH
    }

    /// Consumes `self` and returns the handle as a leaf handle.
    ///
    /// # Panics
    ///
    /// Panics if `self` is not a leaf handle.
    pub fn leaf(self) -> SharedPointer<Leaf<A>, P> {
        if let NodeRc::Leaf(x) = self {
            x
        } else {
            panic!("Failed to unwrap a node as a leaf")
        }
    }

    /// Consumes `self` and returns the handle as an internal node handle.
    ///
    /// # Panics
    ///
    /// Panics if `self` is not an internal node handle.
    pub fn internal(self) -> SharedPointer<Internal<A, P>, P> {
        if let NodeRc::Internal(x) = self {
            x
        } else {
            panic!("Failed to unwrap a node as an internal node")
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use archery::RcK;

    fn leaf_of(range: std::ops::Range<usize>) -> SharedPointer<Leaf<usize>, RcK> {
        SharedPointer::new(Leaf::with_items(range.collect()))
    }

    #[test]
    fn leaf_sharing() {
        let mut source = Leaf::with_items(vec![3, 4, 5]);
        let mut destination = Leaf::with_items(vec![1, 2]);

        // Capped by the destination's free space.
        assert_eq!(source.share_children_with(&mut destination, RRB_WIDTH), 2);
        assert_eq!(destination.as_slice(), &[1, 2, 3, 4]);
        assert_eq!(source.as_slice(), &[5]);

        // Capped by what the source has left.
        let mut rest = Leaf::empty();
        assert_eq!(source.share_children_with(&mut rest, RRB_WIDTH), 1);
        assert!(source.is_empty());
        assert_eq!(rest.as_slice(), &[5]);
    }

    #[test]
    fn internal_from_leaves() {
        let node: Internal<usize, RcK> =
            Internal::from_leaves(vec![leaf_of(0..4), leaf_of(4..7), leaf_of(7..9)]);

        assert_eq!(node.level(), 1);
        assert_eq!(node.len(), 9);
        assert_eq!(node.slots(), 3);
        assert_eq!(node.sizes.as_slice(), &[4, 7, 9]);
        for i in 0..9 {
            assert_eq!(node.get(i), Some(&i));
        }
        assert_eq!(node.get(9), None);
        node.debug_check_invariants(1);
    }

    #[test]
    fn internal_sharing_keeps_tables_consistent() {
        let mut source: Internal<usize, RcK> =
            Internal::from_leaves(vec![leaf_of(2..4), leaf_of(4..8)]);
        let mut destination: Internal<usize, RcK> = Internal::from_leaves(vec![leaf_of(0..2)]);

        assert_eq!(source.share_children_with(&mut destination, 1), 1);
        assert_eq!(destination.sizes.as_slice(), &[2, 4]);
        assert_eq!(source.sizes.as_slice(), &[4]);
        for i in 0..4 {
            assert_eq!(destination.get(i), Some(&i));
        }
        for i in 0..4 {
            assert_eq!(source.get(i), Some(&(i + 4)));
        }
        destination.debug_check_invariants(1);
        source.debug_check_invariants(1);
    }

    #[test]
    fn get_mut_copies_the_path_only() {
        let shared = leaf_of(0..4);
        let mut node: Internal<usize, RcK> =
            Internal::from_internals(2, vec![
                SharedPointer::new(Internal::from_leaves(vec![shared.clone(), leaf_of(4..8)])),
                SharedPointer::new(Internal::from_leaves(vec![leaf_of(8..12)])),
            ]);
        let untouched = node.children.internals_ref()[1].clone();

        *node.get_mut(5).unwrap() = 99;
        assert_eq!(node.get(5), Some(&99));
        // The original leaf handle still sees the old value.
        assert_eq!(shared.get(0), Some(&0));
        // The sibling subtree was not copied.
        assert!(SharedPointer::ptr_eq(
            &untouched,
            &node.children.internals_ref()[1]
        ));
        node.debug_check_invariants(2);
    }
}
