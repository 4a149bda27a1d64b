use std::fmt::Write;

use super::{Cfg, CfgGenerator, OpaqueProduction};
use crate::{PIdx, Symbol, SymbolString, graph::Handle};

impl<'g, A> Handle<'g, Cfg<A>> {
    fn with_node<T>(&self, f: impl FnOnce(&super::grammar::ProdNode) -> T) -> T {
        f(self.graph().inner.borrow().prods.get(self.key()))
    }

    /// This production's identifier, which is unique within its grammar.
    pub fn id(&self) -> PIdx {
        self.with_node(|n| n.id)
    }

    /// The variable on the left-hand side.
    pub fn variable(&self) -> Symbol {
        self.with_node(|n| Symbol::variable(n.var))
    }

    /// The right-hand side.
    pub fn symbols(&self) -> SymbolString {
        self.with_node(|n| n.rhs.clone())
    }

    /// Return the `i`th symbol of the right-hand side, or `None` if `i` is out of range.
    pub fn symbol(&self, i: usize) -> Option<Symbol> {
        self.with_node(|n| n.rhs.get(i))
    }

    /// The length of the right-hand side.
    pub fn len(&self) -> usize {
        self.with_node(|n| n.rhs.len())
    }

    /// Is this an epsilon production?
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Pretty print this production using `name` to render each symbol, e.g. `1 -> 'a' 1 'a'`.
    pub fn pp<F>(&self, mut name: F) -> String
    where
        F: FnMut(Symbol) -> String,
    {
        let mut s = String::new();
        write!(s, "{} ->", name(self.variable())).ok();
        let rhs = self.symbols();
        if rhs.is_empty() {
            s.push_str(" ε");
        }
        for sym in rhs.iter() {
            write!(s, " {}", name(sym)).ok();
        }
        s
    }
}

impl<'g, A> CfgGenerator<'g, A> {
    /// The production found by the most recent match of a production or pattern generator.
    pub fn production(&self) -> Option<&OpaqueProduction<'g, A>> {
        self.current().element()
    }

    /// The variable found by the most recent match of a variable generator, or the owning
    /// variable of the production found by a production or pattern generator.
    pub fn variable(&self) -> Option<Symbol> {
        self.current().group()
    }

    /// The terminal found by the most recent match of a terminal generator.
    pub fn terminal(&self) -> Option<Symbol> {
        self.current().symbol()
    }
}
