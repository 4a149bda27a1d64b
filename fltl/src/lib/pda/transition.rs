use std::fmt::Write;

use super::{OpaqueTransition, Pda, PdaGenerator, automaton::TransNode};
use crate::{StIdx, Symbol, XIdx, graph::Handle};

impl<'g, A> Handle<'g, Pda<A>> {
    fn with_node<T>(&self, f: impl FnOnce(&TransNode) -> T) -> T {
        f(self.graph().inner.borrow().transitions.get(self.key()))
    }

    /// This transition's identifier, which is unique within its automaton.
    pub fn id(&self) -> XIdx {
        self.with_node(|n| n.id)
    }

    pub fn source(&self) -> StIdx {
        self.with_node(|n| StIdx(n.source))
    }

    pub fn sink(&self) -> StIdx {
        self.with_node(|n| StIdx(n.sink))
    }

    /// The symbol read from the input (possibly epsilon).
    pub fn read(&self) -> Symbol {
        self.with_node(|n| n.read)
    }

    /// The symbol popped off the stack (possibly epsilon).
    pub fn pop(&self) -> Symbol {
        self.with_node(|n| n.pop)
    }

    /// The symbol pushed onto the stack (possibly epsilon).
    pub fn push(&self) -> Symbol {
        self.with_node(|n| n.push)
    }

    /// Pretty print this transition using `name` to render each symbol, e.g.
    /// `0 -- a, ε / a --> 1`.
    pub fn pp<F>(&self, mut name: F) -> String
    where
        F: FnMut(Symbol) -> String,
    {
        let (source, read, pop, push, sink) =
            self.with_node(|n| (n.source, n.read, n.pop, n.push, n.sink));
        let mut render = |sym: Symbol| {
            if sym.is_epsilon() {
                "ε".to_owned()
            } else {
                name(sym)
            }
        };
        let mut s = String::new();
        write!(
            s,
            "{} -- {}, {} / {} --> {}",
            source,
            render(read),
            render(pop),
            render(push),
            sink
        )
        .ok();
        s
    }
}

impl<'g, A> PdaGenerator<'g, A> {
    /// The transition found by the most recent match of a transition or pattern generator.
    pub fn transition(&self) -> Option<&OpaqueTransition<'g, A>> {
        self.current().element()
    }

    /// The state found by the most recent match of a state generator, or the source state of
    /// the transition found by a transition or pattern generator.
    pub fn state(&self) -> Option<StIdx> {
        self.current().group()
    }

    /// The symbol found by the most recent match of a symbol generator.
    pub fn symbol(&self) -> Option<Symbol> {
        self.current().symbol()
    }
}
