use std::{
    fmt,
    hash::{Hash, Hasher},
    ops::Add,
    rc::Rc,
};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Multiplier of the polynomial string hash. It must be odd so that scaling by a power of it is
/// a bijection on `u32`.
const HASH_MULTIPLIER: u32 = 0x9e37_79b1;

/// The 32-bit finaliser of MurmurHash3 (`fmix32`), by Austin Appleby.
pub(crate) fn fmix32(mut h: u32) -> u32 {
    h ^= h >> 16;
    h = h.wrapping_mul(0x85eb_ca6b);
    h ^= h >> 13;
    h = h.wrapping_mul(0xc2b2_ae35);
    h ^= h >> 16;
    h
}

/// A grammar or automaton symbol. `0` is epsilon, positive values identify variables, and
/// negative values identify terminals (the terminal at offset `n` of its alphabet table is
/// stored as `-n`).
///
/// Symbols are only handed out by the container (a [`Cfg`](crate::cfg::Cfg) or
/// [`Pda`](crate::pda::Pda)) that owns them.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, Ord, PartialEq, PartialOrd)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Symbol(i32);

impl Symbol {
    /// The empty symbol.
    pub const EPSILON: Symbol = Symbol(0);

    pub(crate) fn variable(id: u32) -> Self {
        debug_assert!(id > 0 && id <= i32::MAX as u32);
        Symbol(id as i32)
    }

    pub(crate) fn terminal(offset: u32) -> Self {
        debug_assert!(offset > 0 && offset <= i32::MAX as u32);
        Symbol(-(offset as i32))
    }

    /// The raw encoded value of this symbol.
    pub fn value(self) -> i32 {
        self.0
    }

    pub fn is_epsilon(self) -> bool {
        self.0 == 0
    }

    pub fn is_variable(self) -> bool {
        self.0 > 0
    }

    pub fn is_terminal(self) -> bool {
        self.0 < 0
    }

    /// If this symbol is a variable, return its id.
    pub fn variable_id(self) -> Option<u32> {
        if self.is_variable() {
            Some(self.0 as u32)
        } else {
            None
        }
    }

    /// If this symbol is a terminal, return its (1-based) offset in the alphabet table.
    pub fn terminal_offset(self) -> Option<u32> {
        if self.is_terminal() {
            Some(self.0.unsigned_abs())
        } else {
            None
        }
    }

    /// How many symbols this symbol contributes to a string: `0` for epsilon, otherwise `1`.
    pub fn len(self) -> usize {
        if self.is_epsilon() { 0 } else { 1 }
    }

    pub fn is_empty(self) -> bool {
        self.is_epsilon()
    }

    fn randomize(self) -> u32 {
        fmix32(self.0 as u32)
    }
}

/// The cached `(length, hash)` pair of a [`SymbolString`].
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Fingerprint {
    pub len: u32,
    pub hash: u32,
}

/// An immutable sequence of symbols (never containing epsilon). Clones share storage.
///
/// Every string caches an accumulated hash `h` and the scale `M^len`, where `M` is an odd
/// multiplier and each symbol contributes `fmix32(symbol)`. Concatenation then only needs the
/// operands' cached values:
///
/// ```text
///   h(a + b)     = h(a) * scale(b) + h(b)
///   scale(a + b) = scale(a) * scale(b)
/// ```
///
/// which is exactly associative, so the fingerprint of a string does not depend on the order in
/// which it was concatenated together.
#[derive(Clone)]
pub struct SymbolString {
    syms: Rc<[Symbol]>,
    hash: u32,
    scale: u32,
}

impl SymbolString {
    /// Create an empty string.
    pub fn new() -> Self {
        SymbolString {
            syms: Rc::from(Vec::new()),
            hash: 0,
            scale: 1,
        }
    }

    /// Create a string from `syms`, dropping any epsilons.
    pub fn from_symbols(syms: &[Symbol]) -> Self {
        syms.iter().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.syms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.syms.is_empty()
    }

    /// Return the symbol at `i`, or `None` if `i` is out of range.
    pub fn get(&self, i: usize) -> Option<Symbol> {
        self.syms.get(i).copied()
    }

    pub fn symbols(&self) -> &[Symbol] {
        &self.syms
    }

    pub fn iter(&self) -> impl Iterator<Item = Symbol> + '_ {
        self.syms.iter().copied()
    }

    pub fn fingerprint(&self) -> Fingerprint {
        let len = self.syms.len() as u32;
        Fingerprint {
            len,
            hash: fmix32(self.hash ^ len),
        }
    }

    /// Return the concatenation of `self` and `other`. The result's hash is derived from the two
    /// cached hashes; neither operand's elements are rehashed.
    pub fn concat(&self, other: &SymbolString) -> SymbolString {
        if other.is_empty() {
            return self.clone();
        }
        if self.is_empty() {
            return other.clone();
        }
        let mut syms = Vec::with_capacity(self.len() + other.len());
        syms.extend_from_slice(&self.syms);
        syms.extend_from_slice(&other.syms);
        SymbolString {
            syms: Rc::from(syms),
            hash: self.hash.wrapping_mul(other.scale).wrapping_add(other.hash),
            scale: self.scale.wrapping_mul(other.scale),
        }
    }
}

impl Default for SymbolString {
    fn default() -> Self {
        SymbolString::new()
    }
}

impl FromIterator<Symbol> for SymbolString {
    fn from_iter<I: IntoIterator<Item = Symbol>>(iter: I) -> Self {
        let mut syms = Vec::new();
        let mut hash = 0u32;
        let mut scale = 1u32;
        for sym in iter.into_iter().filter(|s| !s.is_epsilon()) {
            hash = hash.wrapping_mul(HASH_MULTIPLIER).wrapping_add(sym.randomize());
            scale = scale.wrapping_mul(HASH_MULTIPLIER);
            syms.push(sym);
        }
        SymbolString {
            syms: Rc::from(syms),
            hash,
            scale,
        }
    }
}

impl From<Symbol> for SymbolString {
    fn from(sym: Symbol) -> Self {
        SymbolString::from_symbols(&[sym])
    }
}

impl PartialEq for SymbolString {
    fn eq(&self, other: &Self) -> bool {
        // Lengths and hashes settle almost every comparison; the element-wise check only runs
        // when both agree.
        self.len() == other.len()
            && self.hash == other.hash
            && (Rc::ptr_eq(&self.syms, &other.syms) || self.syms == other.syms)
    }
}

impl Eq for SymbolString {}

impl Hash for SymbolString {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.fingerprint().hash(state);
    }
}

impl PartialEq<SymbolString> for Symbol {
    fn eq(&self, other: &SymbolString) -> bool {
        self.len() == other.len() && (self.is_epsilon() || other.syms[0] == *self)
    }
}

impl PartialEq<Symbol> for SymbolString {
    fn eq(&self, other: &Symbol) -> bool {
        other == self
    }
}

impl fmt::Debug for SymbolString {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_list().entries(self.syms.iter()).finish()
    }
}

impl Add for Symbol {
    type Output = SymbolString;

    fn add(self, rhs: Symbol) -> SymbolString {
        SymbolString::from_symbols(&[self, rhs])
    }
}

impl Add<&SymbolString> for Symbol {
    type Output = SymbolString;

    fn add(self, rhs: &SymbolString) -> SymbolString {
        SymbolString::from(self).concat(rhs)
    }
}

impl Add<Symbol> for &SymbolString {
    type Output = SymbolString;

    fn add(self, rhs: Symbol) -> SymbolString {
        self.concat(&SymbolString::from(rhs))
    }
}

impl Add<Symbol> for SymbolString {
    type Output = SymbolString;

    fn add(self, rhs: Symbol) -> SymbolString {
        &self + rhs
    }
}

impl Add for &SymbolString {
    type Output = SymbolString;

    fn add(self, rhs: &SymbolString) -> SymbolString {
        self.concat(rhs)
    }
}

impl Add<&SymbolString> for SymbolString {
    type Output = SymbolString;

    fn add(self, rhs: &SymbolString) -> SymbolString {
        self.concat(rhs)
    }
}

#[cfg(test)]
mod test {
    use super::{Symbol, SymbolString};

    fn syms(vals: &[i32]) -> SymbolString {
        vals.iter().map(|&v| Symbol(v)).collect()
    }

    #[test]
    fn test_symbol_kinds() {
        assert!(Symbol::EPSILON.is_epsilon());
        assert_eq!(Symbol::EPSILON.len(), 0);
        let v = Symbol::variable(3);
        assert!(v.is_variable());
        assert_eq!(v.variable_id(), Some(3));
        assert_eq!(v.terminal_offset(), None);
        let t = Symbol::terminal(2);
        assert!(t.is_terminal());
        assert_eq!(t.value(), -2);
        assert_eq!(t.terminal_offset(), Some(2));
        assert_eq!(t.variable_id(), None);
    }

    #[test]
    fn test_epsilon_dropped() {
        let s = syms(&[0, 1, 0, -1, 0]);
        assert_eq!(s.len(), 2);
        assert_eq!(s, syms(&[1, -1]));
        assert_eq!(Symbol::EPSILON + Symbol::EPSILON, SymbolString::new());
        assert_eq!(Symbol::EPSILON, SymbolString::new());
    }

    #[test]
    fn test_symbol_equals_unit_string() {
        let a = Symbol(-1);
        assert_eq!(a, SymbolString::from(a));
        assert_eq!(SymbolString::from(a), a);
        assert!(a != syms(&[-2]));
        assert!(a != syms(&[-1, -1]));
        assert_eq!(
            SymbolString::from(a).fingerprint(),
            (Symbol::EPSILON + a).fingerprint()
        );
    }

    #[test]
    fn test_concat_matches_direct_construction() {
        let (s, a) = (Symbol(1), Symbol(-1));
        let prod = syms(&[-1, 1, -1]);
        let built = s + a + &prod + &prod + a;
        let direct = syms(&[1, -1, -1, 1, -1, -1, 1, -1, -1]);
        assert_eq!(built.len(), 9);
        assert_eq!(built.fingerprint(), direct.fingerprint());
        assert_eq!(built, direct);
        assert_eq!(s + a, s + a);
    }

    #[test]
    fn test_concat_identity() {
        let a = syms(&[3, -4, 5]);
        let e = SymbolString::new();
        assert_eq!((&a + &e).fingerprint(), a.fingerprint());
        assert_eq!((&e + &a).fingerprint(), a.fingerprint());
    }

    #[test]
    fn test_fingerprint_associative() {
        // A small linear congruential generator gives us a reproducible spread of strings.
        let mut seed = 0x2545_f491u32;
        let mut next = move |n: usize| -> SymbolString {
            (0..n)
                .map(|_| {
                    seed = seed.wrapping_mul(1_103_515_245).wrapping_add(12345);
                    Symbol(((seed >> 16) % 21) as i32 - 10)
                })
                .collect()
        };
        for i in 0..200 {
            let a = next(i % 5);
            let b = next(i % 7);
            let c = next(i % 3 + 1);
            let left = &a + &(&b + &c);
            let right = &(&a + &b) + &c;
            assert_eq!(left.fingerprint(), right.fingerprint());
            assert_eq!(left, right);
            let flat: SymbolString = a.iter().chain(b.iter()).chain(c.iter()).collect();
            assert_eq!(left.fingerprint(), flat.fingerprint());
        }
    }

    #[test]
    fn test_order_matters() {
        assert!(syms(&[1, -1]) != syms(&[-1, 1]));
        assert!(syms(&[1, -1]).fingerprint() != syms(&[-1, 1]).fingerprint());
        assert!(syms(&[1]) != syms(&[1, 1]));
    }
}
