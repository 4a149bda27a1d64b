use super::Pda;
use crate::{
    StIdx, Symbol,
    generator::{Binding, PatternMatch, Slot, Term},
    graph::Handle,
};

/// A query over an automaton's transitions. Fields which are not constrained match anything:
///
/// ```
/// use fltl::{Binding, Slot, Term, pda::{Pda, TransitionPattern}};
///
/// let pda = Pda::new();
/// let q0 = pda.start_state();
/// let q1 = pda.add_state();
/// let a = pda.get_symbol('a');
/// let eps = pda.epsilon();
/// pda.add_transition(q0, a, eps, a, q1).unwrap();
/// pda.add_transition(q1, a, a, eps, q1).unwrap();
///
/// // Transitions which read `a` and loop back to where they started.
/// let pattern = TransitionPattern::new()
///     .read(a)
///     .source(Term::Bind(Slot(0)))
///     .sink(Term::Bind(Slot(0)));
/// let mut g = pda.search(pattern);
/// assert!(g.match_next());
/// assert_eq!(g.get(Slot(0)), Some(&Binding::State(q1)));
/// assert!(!g.match_next());
/// ```
///
/// A pattern which fixes the source state only ever visits that state's transitions.
#[derive(Clone, Debug, Default)]
pub struct TransitionPattern {
    source: Term<StIdx>,
    read: Term<Symbol>,
    pop: Term<Symbol>,
    push: Term<Symbol>,
    sink: Term<StIdx>,
}

impl TransitionPattern {
    /// A pattern that matches every transition.
    pub fn new() -> Self {
        TransitionPattern::default()
    }

    pub fn source<T: Into<Term<StIdx>>>(mut self, st: T) -> Self {
        self.source = st.into();
        self
    }

    pub fn sink<T: Into<Term<StIdx>>>(mut self, st: T) -> Self {
        self.sink = st.into();
        self
    }

    pub fn read<T: Into<Term<Symbol>>>(mut self, sym: T) -> Self {
        self.read = sym.into();
        self
    }

    pub fn pop<T: Into<Term<Symbol>>>(mut self, sym: T) -> Self {
        self.pop = sym.into();
        self
    }

    pub fn push<T: Into<Term<Symbol>>>(mut self, sym: T) -> Self {
        self.push = sym.into();
        self
    }
}

impl<A> PatternMatch<Pda<A>> for TransitionPattern {
    fn scope(&self) -> Option<u32> {
        match self.source {
            Term::Is(st) => Some(st.0),
            _ => None,
        }
    }

    fn slots_len(&self) -> usize {
        [
            self.source.slot(),
            self.read.slot(),
            self.pop.slot(),
            self.push.slot(),
            self.sink.slot(),
        ]
        .into_iter()
        .flatten()
        .map(|Slot(i)| i + 1)
        .max()
        .unwrap_or(0)
    }

    fn matches(&self, trans: &Handle<'_, Pda<A>>, slots: &mut [Option<Binding>]) -> bool {
        self.source.unify(trans.source(), slots, Binding::State)
            && self.read.unify(trans.read(), slots, Binding::Symbol)
            && self.pop.unify(trans.pop(), slots, Binding::Symbol)
            && self.push.unify(trans.push(), slots, Binding::Symbol)
            && self.sink.unify(trans.sink(), slots, Binding::State)
    }
}
