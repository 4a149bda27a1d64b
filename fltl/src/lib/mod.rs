#![allow(clippy::len_without_is_empty)]
#![allow(clippy::new_without_default)]

//! A library of in-memory formal language structures: context-free grammars ([`cfg::Cfg`]) and
//! pushdown automata ([`pda::Pda`]), together with a declarative way of querying them.
//!
//! Both kinds of structure are graphs of *elements* (a grammar's productions; an automaton's
//! transitions) threaded into *groups* (the variable a production belongs to; the state a
//! transition leaves from). Elements are read through reference-counted handles
//! ([`cfg::OpaqueProduction`], [`pda::OpaqueTransition`]) and enumerated with a
//! [`Generator`], a lazy, restartable cursor:
//!
//! ```
//! use fltl::cfg::Cfg;
//!
//! let cfg = Cfg::new();
//! let s = cfg.add_variable();
//! let a = cfg.get_terminal('a');
//! cfg.add_production(s, &(a + s)).unwrap();
//! cfg.add_production(s, &a.into()).unwrap();
//!
//! let mut prods = cfg.search_productions();
//! while prods.match_next() {
//!     let p = prods.production().unwrap();
//!     println!("{}", p.pp(|sym| format!("{}", sym.value())));
//! }
//! ```
//!
//! fltl makes the following guarantees:
//!
//!   * Variables are numbered from `1` to `num_variables()` (inclusive) and terminals are
//!     encoded as negative symbols from `-1` to `-num_terminals()` (inclusive); `0` is epsilon.
//!   * Automaton states are numbered from `0` to `num_states() - 1` (inclusive).
//!   * An element is never physically freed while a handle or generator refers to it. Removing
//!     an element only marks it as deleted: existing handles can still read it, but no generator
//!     will produce it from then on.
//!   * Generators never mutate the structure they search.
//!
//! Containers are single threaded: they use interior mutability so that elements can be added
//! and removed while generators and handles borrow the container.

mod arena;
pub mod cfg;
mod error;
mod generator;
mod graph;
mod idxnewtype;
pub mod pda;
mod symbol;

pub use crate::{
    error::{FltlError, FltlErrorKind},
    generator::{Binding, Generator, Match, PatternMatch, Slot, Term},
    graph::{Graph, Handle},
    idxnewtype::{PIdx, StIdx, XIdx},
    symbol::{Fingerprint, Symbol, SymbolString},
};
