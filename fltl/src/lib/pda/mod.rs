//! Pushdown automata.
//!
//! A [`Pda`] owns states, an input/stack alphabet, and transitions. Transitions are read through
//! [`OpaqueTransition`] handles and enumerated with generators:
//!
//! ```
//! use fltl::pda::{Pda, TransitionPattern};
//!
//! let pda = Pda::new();
//! let q0 = pda.start_state();
//! let q1 = pda.add_state();
//! let a = pda.get_symbol('a');
//! let eps = pda.epsilon();
//! pda.add_transition(q0, a, eps, a, q0).unwrap();
//! pda.add_transition(q0, eps, eps, eps, q1).unwrap();
//! pda.add_transition(q1, a, a, eps, q1).unwrap();
//!
//! let mut from_q0 = pda.search(TransitionPattern::new().source(q0));
//! let mut n = 0;
//! while from_q0.match_next() {
//!     assert_eq!(from_q0.transition().unwrap().source(), q0);
//!     n += 1;
//! }
//! assert_eq!(n, 2);
//! ```

mod automaton;
mod pattern;
mod transition;

pub use self::{automaton::Pda, pattern::TransitionPattern};

use crate::{generator::Generator, graph::Handle};

/// A handle to a transition of a [`Pda`].
pub type OpaqueTransition<'g, A> = Handle<'g, Pda<A>>;

/// A generator over the elements of a [`Pda`].
pub type PdaGenerator<'g, A> = Generator<'g, Pda<A>>;
