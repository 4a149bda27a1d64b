//! The element graph shared by grammars and automata.
//!
//! Both containers store their elements (productions or transitions) in an arena, and thread
//! them into *groups*: a grammar's productions are grouped by the variable they belong to, an
//! automaton's transitions by their source state. Groups are numbered, and walking every group's
//! chain in number order visits every element exactly once (the *global chain*).

use std::{fmt, ptr};

use crate::{arena::Key, generator::PatternMatch};

pub(crate) mod sealed {
    use std::fmt;

    use crate::arena::Key;

    /// Passed to [`Sealed::hold`] and [`Sealed::release`]. Only [`Handle`](super::Handle) can
    /// construct one, so reference counts can't be adjusted from outside this crate.
    pub struct Token(pub(in crate::graph) ());

    /// The element graph plumbing behind [`Graph`](super::Graph). This trait can't be named
    /// outside the crate, so none of these methods are part of the public API.
    pub trait Sealed {
        /// What a group number is reported to users as.
        type Group: Copy + Eq + fmt::Debug;

        /// The head of the global chain (which may be tombstoned).
        fn first_element(&self) -> Option<Key>;
        /// The group a groups generator starts scanning from.
        fn first_group(&self) -> u32;
        fn group_head(&self, group: u32) -> Option<Key>;
        fn group_of(&self, key: Key) -> u32;
        fn next_in_group(&self, key: Key) -> Option<Key>;
        /// The next group after `group` in number order.
        fn next_group(&self, group: u32) -> Option<u32>;
        /// The size of the group table. Groups are numbered below this.
        fn groups_len(&self) -> u32;
        /// Should `group` be reported by a groups generator?
        fn group_is_visible(&self, group: u32) -> bool;
        fn group_value(group: u32) -> Self::Group;
        /// The size of the terminal table, including its reserved `0` entry.
        fn symbols_len(&self) -> u32;
        fn is_deleted(&self, key: Key) -> bool;
        fn hold(&self, key: Key, _: Token);
        fn release(&self, key: Key, _: Token);
    }
}

/// A container that [`Handle`]s and [`Generator`](crate::Generator)s can be built over. This
/// trait is sealed: it is implemented by [`Cfg`](crate::cfg::Cfg) and
/// [`Pda`](crate::pda::Pda) only, and its graph plumbing is not callable from outside the crate:
///
/// ```compile_fail
/// use fltl::{Graph, cfg::Cfg};
///
/// let cfg = Cfg::<char>::new();
/// cfg.first_element();
/// ```
///
/// The type a generator reports groups as (a variable's [`Symbol`](crate::Symbol) for grammars,
/// a [`StIdx`](crate::StIdx) for automata) is available as `G::Group`.
pub trait Graph: sealed::Sealed + Sized {
    /// The compiled query type for this graph's elements.
    type Pattern: PatternMatch<Self> + fmt::Debug;
}

/// A reference-counted read view of a graph element. While a handle exists, its element is
/// never reclaimed, though it may be removed (see [`is_deleted`](Handle::is_deleted)) in the
/// meantime.
///
/// There is no "null" handle: APIs which may not produce an element return `Option<Handle>`.
pub struct Handle<'g, G: Graph> {
    graph: &'g G,
    key: Key,
}

impl<'g, G: Graph> Handle<'g, G> {
    pub(crate) fn new(graph: &'g G, key: Key) -> Self {
        graph.hold(key, sealed::Token(()));
        Handle { graph, key }
    }

    pub(crate) fn graph(&self) -> &'g G {
        self.graph
    }

    pub(crate) fn key(&self) -> Key {
        self.key
    }

    /// Has this element been removed from its container since the handle was created?
    pub fn is_deleted(&self) -> bool {
        self.graph.is_deleted(self.key)
    }
}

impl<G: Graph> Clone for Handle<'_, G> {
    fn clone(&self) -> Self {
        Handle::new(self.graph, self.key)
    }

    fn clone_from(&mut self, source: &Self) {
        if ptr::eq(self.graph, source.graph) && self.key == source.key {
            return;
        }
        source.graph.hold(source.key, sealed::Token(()));
        self.graph.release(self.key, sealed::Token(()));
        self.graph = source.graph;
        self.key = source.key;
    }
}

impl<G: Graph> Drop for Handle<'_, G> {
    fn drop(&mut self) {
        self.graph.release(self.key, sealed::Token(()));
    }
}

impl<G: Graph> fmt::Debug for Handle<'_, G> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Handle({:?})", self.key)
    }
}

impl<G: Graph> PartialEq for Handle<'_, G> {
    fn eq(&self, other: &Self) -> bool {
        ptr::eq(self.graph, other.graph) && self.key == other.key
    }
}

impl<G: Graph> Eq for Handle<'_, G> {}

/// Return the element after `key` in the global chain, or, if `scoped`, only within `key`'s own
/// group. The result may be tombstoned.
pub(crate) fn find_next<G: Graph>(graph: &G, key: Key, scoped: bool) -> Option<Key> {
    if let Some(next) = graph.next_in_group(key) {
        return Some(next);
    }
    if scoped {
        return None;
    }
    let mut group = graph.group_of(key);
    while let Some(g) = graph.next_group(group) {
        if let Some(head) = graph.group_head(g) {
            return Some(head);
        }
        group = g;
    }
    None
}

/// Take `cursor` and step it over tombstones, returning the first live element from (and
/// including) the cursor's position. Elements stepped over are released as we go.
pub(crate) fn next_live<'g, G: Graph>(
    graph: &'g G,
    cursor: &mut Option<Handle<'g, G>>,
    scoped: bool,
) -> Option<Handle<'g, G>> {
    let mut curr = cursor.take()?;
    while curr.is_deleted() {
        curr = Handle::new(graph, find_next(graph, curr.key(), scoped)?);
    }
    Some(curr)
}
