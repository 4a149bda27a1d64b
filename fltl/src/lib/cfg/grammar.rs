use std::{cell::RefCell, hash::Hash, rc::Rc};

use fnv::FnvHashMap;
use indexmap::IndexSet;
use tracing::debug;

use super::{CfgGenerator, OpaqueProduction, ProductionPattern};
use crate::{
    FltlError, FltlErrorKind, PIdx, Symbol, SymbolString,
    arena::{Arena, Key},
    generator::Generator,
    graph::{
        Graph, Handle,
        sealed::{Sealed, Token},
    },
    symbol::Fingerprint,
};

pub(super) struct ProdNode {
    pub(super) id: PIdx,
    /// The id of the owning variable.
    pub(super) var: u32,
    /// The next production of the owning variable.
    pub(super) next: Option<Key>,
    pub(super) rhs: SymbolString,
}

struct VarNode {
    first: Option<Key>,
    last: Option<Key>,
    /// The next variable in id order.
    next: Option<u32>,
}

pub(super) struct CfgInner<A> {
    pub(super) prods: Arena<ProdNode>,
    /// A mapping from variable id -> `VarNode`. Index `0` is reserved.
    vars: Vec<Option<VarNode>>,
    last_var: Option<u32>,
    /// Terminal `-n` is stored at index `n - 1`.
    terminals: IndexSet<A>,
    /// Productions indexed by owning variable and right-hand side, so that duplicates can be
    /// detected without walking a variable's whole chain.
    rhs_index: FnvHashMap<(u32, Fingerprint), Vec<Key>>,
    next_pidx: PIdx,
}

/// A context-free grammar.
///
/// Variables are numbered from `1` in creation order and each owns an ordered chain of
/// productions. Terminals are interned from alphabet values of type `A`. All operations take
/// `&self`, so productions can be added and removed while [`Generator`]s and handles over the
/// grammar are alive: handles keep removed productions readable, and generators skip them.
///
/// Removed productions are only physically freed by [`reclaim`](Cfg::reclaim), and only once
/// nothing refers to them.
pub struct Cfg<A> {
    pub(super) inner: RefCell<CfgInner<A>>,
}

impl<A: Eq + Hash> Cfg<A> {
    pub fn new() -> Self {
        Cfg {
            inner: RefCell::new(CfgInner {
                prods: Arena::new(),
                vars: vec![None],
                last_var: None,
                terminals: IndexSet::new(),
                rhs_index: FnvHashMap::default(),
                next_pidx: PIdx(0),
            }),
        }
    }

    /// Return the terminal for `a`, adding it to the alphabet if necessary.
    pub fn get_terminal(&self, a: A) -> Symbol {
        let (idx, _) = self.inner.borrow_mut().terminals.insert_full(a);
        Symbol::terminal(idx as u32 + 1)
    }
}

impl<A: Eq + Hash> Default for Cfg<A> {
    fn default() -> Self {
        Cfg::new()
    }
}

impl<A> Cfg<A> {
    /// The empty symbol.
    pub fn epsilon(&self) -> Symbol {
        Symbol::EPSILON
    }

    /// Add a new variable with no productions.
    pub fn add_variable(&self) -> Symbol {
        let mut inner = self.inner.borrow_mut();
        let id = inner.vars.len() as u32;
        inner.vars.push(Some(VarNode {
            first: None,
            last: None,
            next: None,
        }));
        if let Some(prev) = inner.last_var {
            inner.vars[prev as usize].as_mut().unwrap().next = Some(id);
        }
        inner.last_var = Some(id);
        Symbol::variable(id)
    }

    /// Return the alphabet value of `terminal`, or `None` if it is not one of this grammar's
    /// terminals.
    pub fn terminal_value(&self, terminal: Symbol) -> Option<A>
    where
        A: Clone,
    {
        let offset = terminal.terminal_offset()?;
        self.inner
            .borrow()
            .terminals
            .get_index(offset as usize - 1)
            .cloned()
    }

    fn check_variable(inner: &CfgInner<A>, var: Symbol) -> Result<u32, FltlError> {
        let id = var
            .variable_id()
            .ok_or_else(|| FltlError::new(FltlErrorKind::NotAVariable(var)))?;
        match inner.vars.get(id as usize) {
            Some(Some(_)) => Ok(id),
            _ => Err(FltlError::new(FltlErrorKind::UnknownVariable(var))),
        }
    }

    fn check_symbol(inner: &CfgInner<A>, sym: Symbol) -> Result<(), FltlError> {
        match sym.terminal_offset() {
            Some(offset) if offset as usize > inner.terminals.len() => {
                Err(FltlError::new(FltlErrorKind::UnknownTerminal(sym)))
            }
            Some(_) => Ok(()),
            None if sym.is_variable() => Self::check_variable(inner, sym).map(|_| ()),
            None => Ok(()),
        }
    }

    /// Add the production `var -> rhs`, appending it to the end of `var`'s productions. If `var`
    /// already has a live production with the same right-hand side, that production is returned
    /// instead.
    pub fn add_production(
        &self,
        var: Symbol,
        rhs: &SymbolString,
    ) -> Result<OpaqueProduction<'_, A>, FltlError> {
        let key = {
            let mut guard = self.inner.borrow_mut();
            let inner = &mut *guard;
            let id = Self::check_variable(inner, var)?;
            for sym in rhs.iter() {
                Self::check_symbol(inner, sym)?;
            }
            let index_key = (id, rhs.fingerprint());
            let existing = inner.rhs_index.get(&index_key).and_then(|keys| {
                keys.iter()
                    .copied()
                    .find(|&k| !inner.prods.is_deleted(k) && inner.prods.get(k).rhs == *rhs)
            });
            match existing {
                Some(k) => k,
                None => {
                    let pidx = inner.next_pidx;
                    inner.next_pidx = pidx.succ();
                    let key = inner.prods.insert(ProdNode {
                        id: pidx,
                        var: id,
                        next: None,
                        rhs: rhs.clone(),
                    });
                    let var_node = inner.vars[id as usize].as_mut().unwrap();
                    let prev_last = var_node.last.replace(key);
                    if prev_last.is_none() {
                        var_node.first = Some(key);
                    }
                    if let Some(last) = prev_last {
                        inner.prods.get_mut(last).next = Some(key);
                    }
                    inner.rhs_index.entry(index_key).or_default().push(key);
                    key
                }
            }
        };
        Ok(Handle::new(self, key))
    }

    /// Remove `prod` from the grammar. Existing handles to it stay readable, but it will not be
    /// produced by any generator from now on. Returns `false` if it was already removed.
    ///
    /// # Panics
    ///
    /// If `prod` belongs to a different grammar.
    pub fn remove_production(&self, prod: &OpaqueProduction<'_, A>) -> bool {
        assert!(
            std::ptr::eq(prod.graph(), self),
            "Production belongs to a different grammar"
        );
        let mut inner = self.inner.borrow_mut();
        let removed = inner.prods.tombstone(prod.key());
        if removed {
            debug!(production = ?inner.prods.get(prod.key()).id, "removed production");
        }
        removed
    }

    /// Remove every production of `var`, returning how many were removed.
    pub fn remove_variable(&self, var: Symbol) -> Result<usize, FltlError> {
        let mut inner = self.inner.borrow_mut();
        let id = Self::check_variable(&inner, var)?;
        let mut removed = 0;
        let mut cursor = inner.vars[id as usize].as_ref().unwrap().first;
        while let Some(key) = cursor {
            if inner.prods.tombstone(key) {
                removed += 1;
            }
            cursor = inner.prods.get(key).next;
        }
        debug!(variable = id, removed, "removed variable's productions");
        Ok(removed)
    }

    /// Physically free every removed production which is no longer referenced, returning how
    /// many were freed.
    pub fn reclaim(&self) -> usize {
        let mut guard = self.inner.borrow_mut();
        let inner = &mut *guard;
        let dead = inner.prods.reclaimable();
        for &key in &dead {
            let (var, next, fp) = {
                let node = inner.prods.get(key);
                (node.var, node.next, node.rhs.fingerprint())
            };
            // Find the predecessor in the variable's chain, which may itself be a tombstone
            // that a generator is still positioned on.
            let mut pred = None;
            let mut cursor = inner.vars[var as usize].as_ref().unwrap().first;
            while let Some(k) = cursor {
                if k == key {
                    break;
                }
                pred = Some(k);
                cursor = inner.prods.get(k).next;
            }
            match pred {
                Some(p) => inner.prods.get_mut(p).next = next,
                None => inner.vars[var as usize].as_mut().unwrap().first = next,
            }
            let var_node = inner.vars[var as usize].as_mut().unwrap();
            if var_node.last == Some(key) {
                var_node.last = pred;
            }
            if let Some(keys) = inner.rhs_index.get_mut(&(var, fp)) {
                keys.retain(|&k| k != key);
                if keys.is_empty() {
                    inner.rhs_index.remove(&(var, fp));
                }
            }
            inner.prods.reclaim(key);
        }
        if !dead.is_empty() {
            debug!(reclaimed = dead.len(), "reclaimed productions");
        }
        dead.len()
    }

    /// How many live productions the grammar has.
    pub fn num_productions(&self) -> usize {
        self.inner.borrow().prods.len()
    }

    pub fn num_variables(&self) -> usize {
        self.inner.borrow().vars.len() - 1
    }

    pub fn num_terminals(&self) -> usize {
        self.inner.borrow().terminals.len()
    }

    /// Return a generator over every live production, grouped by variable in id order.
    pub fn search_productions(&self) -> CfgGenerator<'_, A> {
        Generator::elements(self)
    }

    /// Return a generator over every variable with at least one live production.
    pub fn search_variables(&self) -> CfgGenerator<'_, A> {
        Generator::groups(self)
    }

    /// Return a generator over every terminal, in order of creation.
    pub fn search_terminals(&self) -> CfgGenerator<'_, A> {
        Generator::symbols(self)
    }

    /// Return a generator over every live production matching `pattern`.
    pub fn search<P: Into<Rc<ProductionPattern>>>(&self, pattern: P) -> CfgGenerator<'_, A> {
        Generator::pattern(self, pattern.into())
    }

    /// Return a generator over `var`'s live productions.
    pub fn productions_of(&self, var: Symbol) -> CfgGenerator<'_, A> {
        self.search(ProductionPattern::new().variable(var))
    }
}

impl<A> Graph for Cfg<A> {
    type Pattern = ProductionPattern;
}

impl<A> Sealed for Cfg<A> {
    type Group = Symbol;

    fn first_element(&self) -> Option<Key> {
        let inner = self.inner.borrow();
        let mut var = if inner.vars.len() > 1 { Some(1) } else { None };
        while let Some(id) = var {
            let node = inner.vars[id as usize].as_ref().unwrap();
            if node.first.is_some() {
                return node.first;
            }
            var = node.next;
        }
        None
    }

    fn first_group(&self) -> u32 {
        self.first_element().map_or(1, |k| self.group_of(k))
    }

    fn group_head(&self, group: u32) -> Option<Key> {
        self.inner
            .borrow()
            .vars
            .get(group as usize)
            .and_then(|v| v.as_ref())
            .and_then(|v| v.first)
    }

    fn group_of(&self, key: Key) -> u32 {
        self.inner.borrow().prods.get(key).var
    }

    fn next_in_group(&self, key: Key) -> Option<Key> {
        self.inner.borrow().prods.get(key).next
    }

    fn next_group(&self, group: u32) -> Option<u32> {
        self.inner
            .borrow()
            .vars
            .get(group as usize)
            .and_then(|v| v.as_ref())
            .and_then(|v| v.next)
    }

    fn groups_len(&self) -> u32 {
        self.inner.borrow().vars.len() as u32
    }

    /// A variable is only reported if it has at least one live production.
    fn group_is_visible(&self, group: u32) -> bool {
        let inner = self.inner.borrow();
        let mut cursor = match inner.vars.get(group as usize) {
            Some(Some(v)) => v.first,
            _ => return false,
        };
        while let Some(k) = cursor {
            if !inner.prods.is_deleted(k) {
                return true;
            }
            cursor = inner.prods.get(k).next;
        }
        false
    }

    fn group_value(group: u32) -> Symbol {
        Symbol::variable(group)
    }

    fn symbols_len(&self) -> u32 {
        self.inner.borrow().terminals.len() as u32 + 1
    }

    fn is_deleted(&self, key: Key) -> bool {
        self.inner.borrow().prods.is_deleted(key)
    }

    fn hold(&self, key: Key, _: Token) {
        self.inner.borrow().prods.hold(key);
    }

    fn release(&self, key: Key, _: Token) {
        self.inner.borrow().prods.release(key);
    }
}
