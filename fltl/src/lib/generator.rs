//! Lazy, restartable enumeration of a container's elements.
//!
//! A [`Generator`] walks one axis of a container (every element, every group, every terminal,
//! or every element matching a pattern) and exposes each match through its [`Match`] outputs.
//! Matches are produced one at a time by [`match_next`](Generator::match_next); the container is
//! never mutated, and elements removed from the container are never produced, even if they were
//! removed while a generator was positioned on them.

use std::{fmt, rc::Rc};

use tracing::trace;

use crate::{
    StIdx, Symbol, SymbolString,
    graph::{Graph, Handle, find_next, next_live},
};

/// A named output position in a pattern. Matching a pattern writes the value found for each
/// [`Term::Bind`] into its slot, readable with [`Generator::get`] or [`Match::get`].
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct Slot(pub usize);

/// One field of a pattern.
#[derive(Clone, Debug, PartialEq)]
pub enum Term<T> {
    /// Accept any value.
    Any,
    /// Accept only this value.
    Is(T),
    /// Accept any value and bind it to the given slot. If the same slot is used by several terms
    /// of a pattern, all of them must see the same value.
    Bind(Slot),
}

impl<T: PartialEq> Term<T> {
    pub(crate) fn unify<F>(&self, value: T, slots: &mut [Option<Binding>], wrap: F) -> bool
    where
        F: FnOnce(T) -> Binding,
    {
        match self {
            Term::Any => true,
            Term::Is(x) => *x == value,
            Term::Bind(Slot(i)) => {
                let b = wrap(value);
                match &slots[*i] {
                    Some(prev) => *prev == b,
                    None => {
                        slots[*i] = Some(b);
                        true
                    }
                }
            }
        }
    }

    pub(crate) fn slot(&self) -> Option<Slot> {
        match self {
            Term::Bind(s) => Some(*s),
            _ => None,
        }
    }
}

impl<T> From<T> for Term<T> {
    fn from(x: T) -> Self {
        Term::Is(x)
    }
}

impl<T> Default for Term<T> {
    fn default() -> Self {
        Term::Any
    }
}

/// A value bound to a [`Slot`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Binding {
    Symbol(Symbol),
    Symbols(SymbolString),
    State(StIdx),
}

/// A compiled query over a graph's elements.
pub trait PatternMatch<G: Graph> {
    /// If the pattern fixes the group, the group's number: only that group's chain is searched.
    fn scope(&self) -> Option<u32>;
    /// How many slots a match fills (i.e. one more than the highest slot number used).
    fn slots_len(&self) -> usize;
    /// Does `element` match? Unbound terms write into `slots`, which are all `None` on entry.
    fn matches(&self, element: &Handle<'_, G>, slots: &mut [Option<Binding>]) -> bool;
}

/// The outputs of a successful [`Generator::match_next`]. Which fields are filled depends on the
/// kind of generator; everything is `None` before the first match and after exhaustion.
pub struct Match<'g, G: Graph> {
    element: Option<Handle<'g, G>>,
    group: Option<G::Group>,
    symbol: Option<Symbol>,
    slots: Vec<Option<Binding>>,
}

impl<'g, G: Graph> Match<'g, G> {
    fn empty() -> Self {
        Match {
            element: None,
            group: None,
            symbol: None,
            slots: Vec::new(),
        }
    }

    fn clear(&mut self) {
        self.element = None;
        self.group = None;
        self.symbol = None;
        self.slots.clear();
    }

    /// The matched element (production or transition).
    pub fn element(&self) -> Option<&Handle<'g, G>> {
        self.element.as_ref()
    }

    /// The matched group (variable or state), or the group of the matched element.
    pub fn group(&self) -> Option<G::Group> {
        self.group
    }

    /// The matched terminal.
    pub fn symbol(&self) -> Option<Symbol> {
        self.symbol
    }

    /// The value bound to `slot`, if the pattern bound one.
    pub fn get(&self, slot: Slot) -> Option<&Binding> {
        self.slots.get(slot.0).and_then(|b| b.as_ref())
    }
}

impl<G: Graph> Clone for Match<'_, G> {
    fn clone(&self) -> Self {
        Match {
            element: self.element.clone(),
            group: self.group,
            symbol: self.symbol,
            slots: self.slots.clone(),
        }
    }
}

impl<G: Graph> fmt::Debug for Match<'_, G> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Match")
            .field("element", &self.element)
            .field("group", &self.group)
            .field("symbol", &self.symbol)
            .field("slots", &self.slots)
            .finish()
    }
}

enum Strategy<'g, G: Graph> {
    /// A default generator, which never matches anything.
    Unbound,
    /// Every live element, in global chain order.
    Elements { cursor: Option<Handle<'g, G>> },
    /// Every visible group, in number order. `offset` is the next group to look at.
    Groups { offset: u32 },
    /// Every terminal. `offset` is one more than the last terminal offset produced.
    Symbols { offset: u32 },
    /// Every live element matching `pattern`.
    Pattern {
        pattern: Rc<G::Pattern>,
        cursor: Option<Handle<'g, G>>,
    },
}

impl<G: Graph> Strategy<'_, G> {
    fn name(&self) -> &'static str {
        match self {
            Strategy::Unbound => "unbound",
            Strategy::Elements { .. } => "elements",
            Strategy::Groups { .. } => "groups",
            Strategy::Symbols { .. } => "symbols",
            Strategy::Pattern { .. } => "pattern",
        }
    }
}

impl<G: Graph> Clone for Strategy<'_, G> {
    fn clone(&self) -> Self {
        match self {
            Strategy::Unbound => Strategy::Unbound,
            Strategy::Elements { cursor } => Strategy::Elements {
                cursor: cursor.clone(),
            },
            Strategy::Groups { offset } => Strategy::Groups { offset: *offset },
            Strategy::Symbols { offset } => Strategy::Symbols { offset: *offset },
            Strategy::Pattern { pattern, cursor } => Strategy::Pattern {
                pattern: Rc::clone(pattern),
                cursor: cursor.clone(),
            },
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
enum Progress {
    /// Never used: the first `match_next` rewinds.
    Unstarted,
    Running,
    /// Stays exhausted until rewound.
    Exhausted,
}

/// A lazy, restartable search over a container. Generators are created by a container's
/// `search_*` methods; a `Default` generator is bound to nothing and never matches.
///
/// A generator holds a reference on the element it is positioned at (and on its pattern, if it
/// has one); both are released when it is rewound or dropped.
pub struct Generator<'g, G: Graph> {
    graph: Option<&'g G>,
    strategy: Strategy<'g, G>,
    progress: Progress,
    current: Match<'g, G>,
}

impl<'g, G: Graph> Generator<'g, G> {
    fn with_strategy(graph: &'g G, strategy: Strategy<'g, G>) -> Self {
        Generator {
            graph: Some(graph),
            strategy,
            progress: Progress::Unstarted,
            current: Match::empty(),
        }
    }

    pub(crate) fn elements(graph: &'g G) -> Self {
        Generator::with_strategy(graph, Strategy::Elements { cursor: None })
    }

    pub(crate) fn groups(graph: &'g G) -> Self {
        Generator::with_strategy(graph, Strategy::Groups { offset: 0 })
    }

    pub(crate) fn symbols(graph: &'g G) -> Self {
        Generator::with_strategy(graph, Strategy::Symbols { offset: 0 })
    }

    pub(crate) fn pattern(graph: &'g G, pattern: Rc<G::Pattern>) -> Self {
        Generator::with_strategy(
            graph,
            Strategy::Pattern {
                pattern,
                cursor: None,
            },
        )
    }

    /// Is this generator attached to a container?
    pub fn is_bound(&self) -> bool {
        self.graph.is_some()
    }

    /// Make this (unbound) generator a fresh copy of `that`.
    ///
    /// # Panics
    ///
    /// If this generator is already bound: overwriting it would abandon its search.
    pub fn assign(&mut self, that: &Self) {
        assert!(
            self.graph.is_none(),
            "Illegal assignment to an initialized generator."
        );
        *self = that.clone();
    }

    /// Reset this generator so that the next [`match_next`](Generator::match_next) produces the
    /// first match again. Any outputs are cleared.
    pub fn rewind(&mut self) {
        self.current.clear();
        self.progress = Progress::Running;
        let Some(graph) = self.graph else {
            return;
        };
        match &mut self.strategy {
            Strategy::Unbound => (),
            Strategy::Elements { cursor } => {
                *cursor = graph.first_element().map(|k| Handle::new(graph, k));
            }
            Strategy::Groups { offset } => *offset = graph.first_group(),
            Strategy::Symbols { offset } => *offset = 1,
            Strategy::Pattern { pattern, cursor } => {
                let head = match pattern.scope() {
                    Some(group) => graph.group_head(group),
                    None => graph.first_element(),
                };
                *cursor = head.map(|k| Handle::new(graph, k));
            }
        }
        trace!(strategy = self.strategy.name(), "rewound generator");
    }

    /// Try to find the next match, returning `true` and filling this generator's outputs if one
    /// is found. Once `false` has been returned, all outputs are `None` and every subsequent call
    /// returns `false` until the generator is rewound.
    pub fn match_next(&mut self) -> bool {
        match self.progress {
            Progress::Unstarted => self.rewind(),
            Progress::Running => (),
            Progress::Exhausted => return false,
        }
        let found = match self.graph {
            Some(graph) => self.advance(graph),
            None => false,
        };
        if !found {
            self.current.clear();
            if let Strategy::Elements { cursor } | Strategy::Pattern { cursor, .. } =
                &mut self.strategy
            {
                *cursor = None;
            }
            self.progress = Progress::Exhausted;
            trace!(strategy = self.strategy.name(), "generator exhausted");
        }
        found
    }

    fn advance(&mut self, graph: &'g G) -> bool {
        let current = &mut self.current;
        match &mut self.strategy {
            Strategy::Unbound => false,
            Strategy::Elements { cursor } => match next_live(graph, cursor, false) {
                Some(elem) => {
                    *cursor = find_next(graph, elem.key(), false).map(|k| Handle::new(graph, k));
                    current.group = Some(G::group_value(graph.group_of(elem.key())));
                    current.element = Some(elem);
                    true
                }
                None => false,
            },
            Strategy::Groups { offset } => {
                while *offset < graph.groups_len() {
                    let group = *offset;
                    *offset += 1;
                    if graph.group_is_visible(group) {
                        current.group = Some(G::group_value(group));
                        return true;
                    }
                }
                false
            }
            Strategy::Symbols { offset } => {
                *offset += 1;
                if *offset > graph.symbols_len() {
                    return false;
                }
                current.symbol = Some(Symbol::terminal(*offset - 1));
                true
            }
            Strategy::Pattern { pattern, cursor } => {
                let scoped = pattern.scope().is_some();
                let Some(mut curr) = next_live(graph, cursor, scoped) else {
                    return false;
                };
                let mut slots = vec![None; pattern.slots_len()];
                loop {
                    let next = find_next(graph, curr.key(), scoped);
                    if !curr.is_deleted() && pattern.matches(&curr, &mut slots) {
                        *cursor = next.map(|k| Handle::new(graph, k));
                        current.group = Some(G::group_value(graph.group_of(curr.key())));
                        current.element = Some(curr);
                        current.slots = slots;
                        return true;
                    }
                    slots.iter_mut().for_each(|s| *s = None);
                    match next {
                        Some(k) => curr = Handle::new(graph, k),
                        None => return false,
                    }
                }
            }
        }
    }

    /// The outputs of the most recent successful match.
    pub fn current(&self) -> &Match<'g, G> {
        &self.current
    }

    /// Shorthand for `self.current().get(slot)`.
    pub fn get(&self, slot: Slot) -> Option<&Binding> {
        self.current.get(slot)
    }
}

impl<G: Graph> Default for Generator<'_, G> {
    fn default() -> Self {
        Generator {
            graph: None,
            strategy: Strategy::Unbound,
            progress: Progress::Unstarted,
            current: Match::empty(),
        }
    }
}

/// Cloning produces an unstarted generator over the same container and pattern.
impl<G: Graph> Clone for Generator<'_, G> {
    fn clone(&self) -> Self {
        Generator {
            graph: self.graph,
            strategy: self.strategy.clone(),
            progress: Progress::Unstarted,
            current: Match::empty(),
        }
    }
}

/// Iterating a generator calls [`match_next`](Generator::match_next) and yields a copy of each
/// match's outputs.
impl<'g, G: Graph> Iterator for Generator<'g, G> {
    type Item = Match<'g, G>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.match_next() {
            Some(self.current.clone())
        } else {
            None
        }
    }
}
