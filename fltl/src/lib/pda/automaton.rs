use std::{cell::RefCell, hash::Hash, rc::Rc};

use fnv::FnvHashMap;
use indexmap::IndexSet;
use tracing::debug;
use vob::Vob;

use super::{OpaqueTransition, PdaGenerator, TransitionPattern};
use crate::{
    FltlError, FltlErrorKind, StIdx, Symbol, XIdx,
    arena::{Arena, Key},
    generator::Generator,
    graph::{
        Graph, Handle,
        sealed::{Sealed, Token},
    },
};

pub(super) struct TransNode {
    pub(super) id: XIdx,
    pub(super) source: u32,
    pub(super) sink: u32,
    pub(super) read: Symbol,
    pub(super) pop: Symbol,
    pub(super) push: Symbol,
    /// The next transition leaving `source`.
    next: Option<Key>,
}

struct StateNode {
    first: Option<Key>,
    last: Option<Key>,
}

type TransitionKey = (u32, Symbol, Symbol, Symbol, u32);

pub(super) struct PdaInner<A> {
    pub(super) transitions: Arena<TransNode>,
    states: Vec<StateNode>,
    accept: Vob,
    start: u32,
    /// Symbol `-n` is stored at index `n - 1`.
    symbols: IndexSet<A>,
    /// The most recently added transition for each distinct `(source, read, pop, push, sink)`.
    index: FnvHashMap<TransitionKey, Key>,
    next_xidx: XIdx,
}

/// A pushdown automaton.
///
/// A transition `(source, read, pop, push, sink)` moves from `source` to `sink` by reading `read`
/// from the input, popping `pop` off the stack, and pushing `push` onto it; any of the three
/// symbols may be epsilon. A new automaton has a single state, `0`, which is its start state.
///
/// Like [`Cfg`](crate::cfg::Cfg), all operations take `&self`, and removed transitions stay
/// readable through existing handles until they are [`reclaim`](Pda::reclaim)ed.
pub struct Pda<A> {
    pub(super) inner: RefCell<PdaInner<A>>,
}

impl<A: Eq + Hash> Pda<A> {
    pub fn new() -> Self {
        Pda {
            inner: RefCell::new(PdaInner {
                transitions: Arena::new(),
                states: vec![StateNode {
                    first: None,
                    last: None,
                }],
                accept: Vob::from_elem(false, 1),
                start: 0,
                symbols: IndexSet::new(),
                index: FnvHashMap::default(),
                next_xidx: XIdx(0),
            }),
        }
    }

    /// Return the symbol for `a`, adding it to the alphabet if necessary.
    pub fn get_symbol(&self, a: A) -> Symbol {
        let (idx, _) = self.inner.borrow_mut().symbols.insert_full(a);
        Symbol::terminal(idx as u32 + 1)
    }
}

impl<A: Eq + Hash> Default for Pda<A> {
    fn default() -> Self {
        Pda::new()
    }
}

impl<A> Pda<A> {
    /// The empty symbol.
    pub fn epsilon(&self) -> Symbol {
        Symbol::EPSILON
    }

    pub fn add_state(&self) -> StIdx {
        let mut inner = self.inner.borrow_mut();
        let st = StIdx(inner.states.len() as u32);
        inner.states.push(StateNode {
            first: None,
            last: None,
        });
        inner.accept.push(false);
        st
    }

    pub fn num_states(&self) -> usize {
        self.inner.borrow().states.len()
    }

    pub fn start_state(&self) -> StIdx {
        StIdx(self.inner.borrow().start)
    }

    pub fn set_start_state(&self, st: StIdx) -> Result<(), FltlError> {
        let mut inner = self.inner.borrow_mut();
        inner.start = Self::check_state(&inner, st)?;
        Ok(())
    }

    /// Mark (or unmark) `st` as an accepting state.
    pub fn set_accept_state(&self, st: StIdx, accept: bool) -> Result<(), FltlError> {
        let mut inner = self.inner.borrow_mut();
        let idx = Self::check_state(&inner, st)?;
        inner.accept.set(idx as usize, accept);
        Ok(())
    }

    /// Is `st` an accepting state? Unknown states never are.
    pub fn is_accept_state(&self, st: StIdx) -> bool {
        self.inner
            .borrow()
            .accept
            .get(usize::from(st))
            .unwrap_or(false)
    }

    /// Return the alphabet value of `sym`, or `None` if it is not one of this automaton's
    /// symbols.
    pub fn symbol_value(&self, sym: Symbol) -> Option<A>
    where
        A: Clone,
    {
        let offset = sym.terminal_offset()?;
        self.inner
            .borrow()
            .symbols
            .get_index(offset as usize - 1)
            .cloned()
    }

    fn check_state(inner: &PdaInner<A>, st: StIdx) -> Result<u32, FltlError> {
        if usize::from(st) < inner.states.len() {
            Ok(st.0)
        } else {
            Err(FltlError::new(FltlErrorKind::UnknownState(st)))
        }
    }

    fn check_symbol(inner: &PdaInner<A>, sym: Symbol) -> Result<(), FltlError> {
        match sym.terminal_offset() {
            Some(offset) if offset as usize > inner.symbols.len() => {
                Err(FltlError::new(FltlErrorKind::UnknownTerminal(sym)))
            }
            _ if sym.is_variable() => Err(FltlError::new(FltlErrorKind::NotATerminal(sym))),
            _ => Ok(()),
        }
    }

    /// Add the transition `(source, read, pop, push, sink)`, appending it to the end of
    /// `source`'s transitions. If an identical live transition exists, it is returned instead.
    pub fn add_transition(
        &self,
        source: StIdx,
        read: Symbol,
        pop: Symbol,
        push: Symbol,
        sink: StIdx,
    ) -> Result<OpaqueTransition<'_, A>, FltlError> {
        let key = {
            let mut guard = self.inner.borrow_mut();
            let inner = &mut *guard;
            let source = Self::check_state(inner, source)?;
            let sink = Self::check_state(inner, sink)?;
            for sym in [read, pop, push] {
                Self::check_symbol(inner, sym)?;
            }
            let index_key = (source, read, pop, push, sink);
            let existing = inner
                .index
                .get(&index_key)
                .copied()
                .filter(|&k| !inner.transitions.is_deleted(k));
            match existing {
                Some(k) => k,
                None => {
                    let xidx = inner.next_xidx;
                    inner.next_xidx = xidx.succ();
                    let key = inner.transitions.insert(TransNode {
                        id: xidx,
                        source,
                        sink,
                        read,
                        pop,
                        push,
                        next: None,
                    });
                    let state = &mut inner.states[source as usize];
                    match state.last.replace(key) {
                        Some(last) => inner.transitions.get_mut(last).next = Some(key),
                        None => state.first = Some(key),
                    }
                    inner.index.insert(index_key, key);
                    key
                }
            }
        };
        Ok(Handle::new(self, key))
    }

    /// Remove `trans` from the automaton. Returns `false` if it was already removed.
    ///
    /// # Panics
    ///
    /// If `trans` belongs to a different automaton.
    pub fn remove_transition(&self, trans: &OpaqueTransition<'_, A>) -> bool {
        assert!(
            std::ptr::eq(trans.graph(), self),
            "Transition belongs to a different automaton"
        );
        let mut inner = self.inner.borrow_mut();
        let removed = inner.transitions.tombstone(trans.key());
        if removed {
            debug!(transition = ?inner.transitions.get(trans.key()).id, "removed transition");
        }
        removed
    }

    /// Physically free every removed transition which is no longer referenced, returning how
    /// many were freed.
    pub fn reclaim(&self) -> usize {
        let mut guard = self.inner.borrow_mut();
        let inner = &mut *guard;
        let dead = inner.transitions.reclaimable();
        for &key in &dead {
            let node = inner.transitions.get(key);
            let index_key = (node.source, node.read, node.pop, node.push, node.sink);
            let (source, next) = (node.source, node.next);
            let mut pred = None;
            let mut cursor = inner.states[source as usize].first;
            while let Some(k) = cursor {
                if k == key {
                    break;
                }
                pred = Some(k);
                cursor = inner.transitions.get(k).next;
            }
            match pred {
                Some(p) => inner.transitions.get_mut(p).next = next,
                None => inner.states[source as usize].first = next,
            }
            let state = &mut inner.states[source as usize];
            if state.last == Some(key) {
                state.last = pred;
            }
            if inner.index.get(&index_key) == Some(&key) {
                inner.index.remove(&index_key);
            }
            inner.transitions.reclaim(key);
        }
        if !dead.is_empty() {
            debug!(reclaimed = dead.len(), "reclaimed transitions");
        }
        dead.len()
    }

    /// How many live transitions the automaton has.
    pub fn num_transitions(&self) -> usize {
        self.inner.borrow().transitions.len()
    }

    pub fn num_symbols(&self) -> usize {
        self.inner.borrow().symbols.len()
    }

    /// Return a generator over every live transition, grouped by source state.
    pub fn search_transitions(&self) -> PdaGenerator<'_, A> {
        Generator::elements(self)
    }

    /// Return a generator over every state.
    pub fn search_states(&self) -> PdaGenerator<'_, A> {
        Generator::groups(self)
    }

    /// Return a generator over every symbol of the alphabet, in order of creation.
    pub fn search_symbols(&self) -> PdaGenerator<'_, A> {
        Generator::symbols(self)
    }

    /// Return a generator over every live transition matching `pattern`.
    pub fn search<P: Into<Rc<TransitionPattern>>>(&self, pattern: P) -> PdaGenerator<'_, A> {
        Generator::pattern(self, pattern.into())
    }

    /// Return a generator over the live transitions leaving `st`.
    pub fn transitions_from(&self, st: StIdx) -> PdaGenerator<'_, A> {
        self.search(TransitionPattern::new().source(st))
    }
}

impl<A> Graph for Pda<A> {
    type Pattern = TransitionPattern;
}

impl<A> Sealed for Pda<A> {
    type Group = StIdx;

    fn first_element(&self) -> Option<Key> {
        self.inner.borrow().states.iter().find_map(|s| s.first)
    }

    fn first_group(&self) -> u32 {
        0
    }

    fn group_head(&self, group: u32) -> Option<Key> {
        self.inner
            .borrow()
            .states
            .get(group as usize)
            .and_then(|s| s.first)
    }

    fn group_of(&self, key: Key) -> u32 {
        self.inner.borrow().transitions.get(key).source
    }

    fn next_in_group(&self, key: Key) -> Option<Key> {
        self.inner.borrow().transitions.get(key).next
    }

    fn next_group(&self, group: u32) -> Option<u32> {
        if (group as usize) + 1 < self.inner.borrow().states.len() {
            Some(group + 1)
        } else {
            None
        }
    }

    fn groups_len(&self) -> u32 {
        self.inner.borrow().states.len() as u32
    }

    /// Every state is reported, whether or not it has transitions.
    fn group_is_visible(&self, group: u32) -> bool {
        (group as usize) < self.inner.borrow().states.len()
    }

    fn group_value(group: u32) -> StIdx {
        StIdx(group)
    }

    fn symbols_len(&self) -> u32 {
        self.inner.borrow().symbols.len() as u32 + 1
    }

    fn is_deleted(&self, key: Key) -> bool {
        self.inner.borrow().transitions.is_deleted(key)
    }

    fn hold(&self, key: Key, _: Token) {
        self.inner.borrow().transitions.hold(key);
    }

    fn release(&self, key: Key, _: Token) {
        self.inner.borrow().transitions.release(key);
    }
}

#[cfg(test)]
mod test {
    use super::Pda;
    use crate::{
        Binding, FltlErrorKind, Slot, StIdx, Symbol, Term,
        pda::{PdaGenerator, TransitionPattern},
    };

    /// The classic `a^n b^n` recogniser: push an `a` for every `a` read, then pop one for every
    /// `b`.
    fn anbn() -> (Pda<char>, [StIdx; 3], Symbol, Symbol) {
        let pda = Pda::new();
        let q0 = pda.start_state();
        let q1 = pda.add_state();
        let q2 = pda.add_state();
        let a = pda.get_symbol('a');
        let b = pda.get_symbol('b');
        let eps = pda.epsilon();
        pda.add_transition(q0, a, eps, a, q0).unwrap();
        pda.add_transition(q0, eps, eps, eps, q1).unwrap();
        pda.add_transition(q1, b, a, eps, q1).unwrap();
        pda.add_transition(q1, eps, eps, eps, q2).unwrap();
        pda.set_accept_state(q2, true).unwrap();
        (pda, [q0, q1, q2], a, b)
    }

    fn sources(g: PdaGenerator<'_, char>) -> Vec<StIdx> {
        g.map(|m| m.element().unwrap().source()).collect()
    }

    #[test]
    fn test_states() {
        let (pda, [q0, q1, q2], _, _) = anbn();
        assert_eq!(pda.num_states(), 3);
        assert_eq!(pda.start_state(), q0);
        assert!(pda.is_accept_state(q2));
        assert!(!pda.is_accept_state(q1));
        assert!(!pda.is_accept_state(StIdx(7)));
        pda.set_start_state(q1).unwrap();
        assert_eq!(pda.start_state(), q1);
        pda.set_accept_state(q2, false).unwrap();
        assert!(!pda.is_accept_state(q2));

        // States are reported whether or not they have transitions.
        let q3 = pda.add_state();
        let mut g = pda.search_states();
        let mut found = Vec::new();
        while g.match_next() {
            assert!(g.transition().is_none());
            found.push(g.state().unwrap());
        }
        assert_eq!(found, vec![q0, q1, q2, q3]);
        assert!(!g.match_next());
    }

    #[test]
    fn test_transitions_grouped_by_source() {
        let pda = Pda::new();
        let q0 = pda.start_state();
        let q1 = pda.add_state();
        let a = pda.get_symbol('a');
        let eps = pda.epsilon();
        pda.add_transition(q1, a, eps, eps, q0).unwrap();
        pda.add_transition(q0, a, eps, eps, q1).unwrap();
        pda.add_transition(q1, eps, a, eps, q1).unwrap();
        assert_eq!(pda.num_transitions(), 3);
        assert_eq!(sources(pda.search_transitions()), vec![q0, q1, q1]);

        let mut g = pda.search_transitions();
        assert!(g.match_next());
        assert_eq!(g.state(), Some(q0));
        assert_eq!(g.transition().unwrap().sink(), q1);
    }

    #[test]
    fn test_remove_under_cursor() {
        let (pda, [q0, q1, _], _, b) = anbn();
        let mut g = pda.search_transitions();
        assert!(g.match_next());
        assert!(g.match_next());
        assert_eq!(g.state(), Some(q0));
        let t = pda.search(TransitionPattern::new().read(b)).next().unwrap();
        let t = t.element().unwrap().clone();
        assert!(pda.remove_transition(&t));
        assert!(!pda.remove_transition(&t));
        assert!(g.match_next());
        assert_eq!(g.state(), Some(q1));
        assert!(g.transition().unwrap().read().is_epsilon());
        assert!(!g.match_next());
        assert!(t.is_deleted());
        assert_eq!(t.read(), b);
        assert_eq!(pda.num_transitions(), 3);
    }

    #[test]
    fn test_scoped_pattern() {
        let (pda, [q0, q1, q2], a, _) = anbn();
        let eps = pda.epsilon();
        let mut g = pda.transitions_from(q1);
        assert!(g.match_next());
        // A transition added to another state mid-search is never visited.
        pda.add_transition(q0, a, a, a, q2).unwrap();
        assert!(g.match_next());
        assert_eq!(g.transition().unwrap().sink(), q2);
        assert!(!g.match_next());
        assert_eq!(sources(pda.transitions_from(q0)), vec![q0, q0, q0]);
        assert_eq!(pda.transitions_from(q2).count(), 0);

        let pushes = pda
            .search(TransitionPattern::new().push(a).pop(eps))
            .count();
        assert_eq!(pushes, 1);
    }

    #[test]
    fn test_bound_pattern() {
        let (pda, [q0, q1, q2], a, b) = anbn();
        let loops = TransitionPattern::new()
            .source(Term::Bind(Slot(0)))
            .sink(Term::Bind(Slot(0)))
            .read(Term::Bind(Slot(1)));
        let found = pda
            .search(loops)
            .map(|m| (m.get(Slot(0)).cloned(), m.get(Slot(1)).cloned()))
            .collect::<Vec<_>>();
        assert_eq!(
            found,
            vec![
                (Some(Binding::State(q0)), Some(Binding::Symbol(a))),
                (Some(Binding::State(q1)), Some(Binding::Symbol(b))),
            ]
        );

        // The same slot in read and pop: transitions which pop exactly what they read.
        let same = TransitionPattern::new()
            .read(Term::Bind(Slot(0)))
            .pop(Term::Bind(Slot(0)));
        let found = pda.search(same).map(|m| m.element().unwrap().sink()).collect::<Vec<_>>();
        assert_eq!(found, vec![q1, q2]);
    }

    #[test]
    fn test_search_symbols() {
        let (pda, _, a, b) = anbn();
        assert_eq!(pda.get_symbol('b'), b);
        assert_eq!(pda.num_symbols(), 2);
        let mut g = pda.search_symbols();
        assert!(g.match_next());
        assert_eq!(g.symbol(), Some(a));
        assert!(g.match_next());
        assert_eq!(g.symbol(), Some(b));
        assert!(!g.match_next());
        assert!(!g.match_next());
        assert_eq!(pda.symbol_value(a), Some('a'));
        assert_eq!(pda.symbol_value(Symbol::EPSILON), None);
    }

    #[test]
    fn test_dedup() {
        let (pda, [q0, _, _], a, _) = anbn();
        let eps = pda.epsilon();
        let t1 = pda.add_transition(q0, a, eps, a, q0).unwrap();
        assert_eq!(pda.num_transitions(), 4);
        let t2 = pda.add_transition(q0, a, eps, a, q0).unwrap();
        assert_eq!(t1, t2);
        pda.remove_transition(&t1);
        let t3 = pda.add_transition(q0, a, eps, a, q0).unwrap();
        assert_ne!(t1.id(), t3.id());
        assert_eq!(pda.num_transitions(), 4);
    }

    #[test]
    fn test_reclaim() {
        let (pda, [q0, q1, _], a, _) = anbn();
        let eps = pda.epsilon();
        let t = pda.add_transition(q0, a, eps, a, q0).unwrap();
        let key = t.key();
        assert_eq!(pda.inner.borrow().transitions.refs(key), 1);
        pda.remove_transition(&t);
        assert_eq!(pda.reclaim(), 0);
        drop(t);
        assert_eq!(pda.reclaim(), 1);
        assert_eq!(pda.reclaim(), 0);
        assert_eq!(sources(pda.search_transitions()), vec![q0, q1, q1]);

        // Re-adding after a reclaim appends to the (now shorter) chain.
        let t = pda.add_transition(q0, a, eps, a, q0).unwrap();
        assert_eq!(pda.transitions_from(q0).last().unwrap().element(), Some(&t));
    }

    #[test]
    fn test_pp() {
        let (pda, [q0, ..], a, _) = anbn();
        let t = pda.transitions_from(q0).next().unwrap();
        let name = |sym: Symbol| pda.symbol_value(sym).map_or_else(String::new, |c| c.to_string());
        assert_eq!(t.element().unwrap().pp(name), "0 -- a, ε / a --> 0");
        assert_eq!(t.element().unwrap().read(), a);
    }

    #[test]
    fn test_errors() {
        let pda = Pda::new();
        let q0 = pda.start_state();
        let a = pda.get_symbol('a');
        let eps = pda.epsilon();
        let other = Pda::new();
        other.get_symbol('x');
        let far = other.get_symbol('y');
        let cfg = crate::cfg::Cfg::<char>::new();
        let var = cfg.add_variable();

        assert_eq!(
            pda.add_transition(q0, a, eps, eps, StIdx(4)).unwrap_err().kind,
            FltlErrorKind::UnknownState(StIdx(4))
        );
        assert_eq!(
            pda.add_transition(q0, far, eps, eps, q0).unwrap_err().kind,
            FltlErrorKind::UnknownTerminal(far)
        );
        assert_eq!(
            pda.add_transition(q0, eps, var, eps, q0).unwrap_err().kind,
            FltlErrorKind::NotATerminal(var)
        );
        assert_eq!(
            pda.set_start_state(StIdx(1)).unwrap_err().kind,
            FltlErrorKind::UnknownState(StIdx(1))
        );
        assert_eq!(pda.num_transitions(), 0);
    }
}
