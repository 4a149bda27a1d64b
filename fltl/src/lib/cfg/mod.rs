//! Context-free grammars.
//!
//! A [`Cfg`] owns variables, terminals, and productions. Productions are read through
//! [`OpaqueProduction`] handles and enumerated with generators:
//!
//! ```
//! use fltl::cfg::{Cfg, ProductionPattern};
//!
//! let cfg = Cfg::new();
//! let s = cfg.add_variable();
//! let a = cfg.get_terminal('a');
//! cfg.add_production(s, &(a + s + a)).unwrap();
//! cfg.add_production(s, &a.into()).unwrap();
//!
//! let mut prods = cfg.search(ProductionPattern::new().variable(s));
//! let mut n = 0;
//! while prods.match_next() {
//!     assert_eq!(prods.production().unwrap().variable(), s);
//!     n += 1;
//! }
//! assert_eq!(n, 2);
//! ```

mod grammar;
mod pattern;
mod production;

pub use self::{grammar::Cfg, pattern::ProductionPattern};

use crate::{generator::Generator, graph::Handle};

/// A handle to a production of a [`Cfg`].
pub type OpaqueProduction<'g, A> = Handle<'g, Cfg<A>>;

/// A generator over the elements of a [`Cfg`].
pub type CfgGenerator<'g, A> = Generator<'g, Cfg<A>>;
