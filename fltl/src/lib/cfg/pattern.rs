use super::Cfg;
use crate::{
    Symbol, SymbolString,
    generator::{Binding, PatternMatch, Slot, Term},
    graph::Handle,
};

#[derive(Clone, Debug)]
enum Rhs {
    /// Constrain the right-hand side as a whole.
    Whole(Term<SymbolString>),
    /// Constrain the right-hand side symbol by symbol: it must have exactly this many symbols.
    Positional(Vec<Term<Symbol>>),
}

/// A query over a grammar's productions. Fields which are not constrained match anything. For
/// example, to find every production of `s` whose right-hand side is `a X a` for some single
/// symbol `X`, binding `X` to slot 0:
///
/// ```
/// use fltl::{Binding, Slot, Term, cfg::{Cfg, ProductionPattern}};
///
/// let cfg = Cfg::new();
/// let s = cfg.add_variable();
/// let a = cfg.get_terminal('a');
/// cfg.add_production(s, &(a + s + a)).unwrap();
/// cfg.add_production(s, &(a + s)).unwrap();
///
/// let pattern = ProductionPattern::new()
///     .variable(s)
///     .rhs(vec![Term::Is(a), Term::Bind(Slot(0)), Term::Is(a)]);
/// let mut g = cfg.search(pattern);
/// assert!(g.match_next());
/// assert_eq!(g.get(Slot(0)), Some(&Binding::Symbol(s)));
/// assert!(!g.match_next());
/// ```
///
/// A pattern which fixes the variable only ever visits that variable's productions. Patterns can
/// be wrapped in an `Rc` and shared between any number of generators.
#[derive(Clone, Debug)]
pub struct ProductionPattern {
    variable: Term<Symbol>,
    rhs: Rhs,
}

impl ProductionPattern {
    /// A pattern that matches every production.
    pub fn new() -> Self {
        ProductionPattern {
            variable: Term::Any,
            rhs: Rhs::Whole(Term::Any),
        }
    }

    /// Constrain the variable, e.g. `.variable(s)` to only match productions of `s`, or
    /// `.variable(Term::Bind(slot))` to bind each match's variable to `slot`.
    pub fn variable<T: Into<Term<Symbol>>>(mut self, var: T) -> Self {
        self.variable = var.into();
        self
    }

    /// Constrain the right-hand side as a whole.
    pub fn symbols<T: Into<Term<SymbolString>>>(mut self, rhs: T) -> Self {
        self.rhs = Rhs::Whole(rhs.into());
        self
    }

    /// Constrain the right-hand side one symbol at a time.
    pub fn rhs(mut self, terms: Vec<Term<Symbol>>) -> Self {
        self.rhs = Rhs::Positional(terms);
        self
    }
}

impl Default for ProductionPattern {
    fn default() -> Self {
        ProductionPattern::new()
    }
}

impl<A> PatternMatch<Cfg<A>> for ProductionPattern {
    fn scope(&self) -> Option<u32> {
        match &self.variable {
            Term::Is(var) => var.variable_id(),
            _ => None,
        }
    }

    fn slots_len(&self) -> usize {
        let rhs_slots: Vec<Slot> = match &self.rhs {
            Rhs::Whole(t) => t.slot().into_iter().collect(),
            Rhs::Positional(ts) => ts.iter().filter_map(|t| t.slot()).collect(),
        };
        self.variable
            .slot()
            .into_iter()
            .chain(rhs_slots)
            .map(|Slot(i)| i + 1)
            .max()
            .unwrap_or(0)
    }

    fn matches(&self, prod: &Handle<'_, Cfg<A>>, slots: &mut [Option<Binding>]) -> bool {
        if !self.variable.unify(prod.variable(), slots, Binding::Symbol) {
            return false;
        }
        match &self.rhs {
            Rhs::Whole(Term::Any) => true,
            Rhs::Whole(t) => t.unify(prod.symbols(), slots, Binding::Symbols),
            Rhs::Positional(terms) => {
                let rhs = prod.symbols();
                terms.len() == rhs.len()
                    && terms
                        .iter()
                        .zip(rhs.iter())
                        .all(|(t, sym)| t.unify(sym, slots, Binding::Symbol))
            }
        }
    }
}
