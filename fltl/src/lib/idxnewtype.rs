// Copyright (c) 2018 King's College London
// created by the Software Development Team <http://soft-dev.org/>
//
// The Universal Permissive License (UPL), Version 1.0
//
// Subject to the condition set forth below, permission is hereby granted to any person obtaining a
// copy of this software, associated documentation and/or data (collectively the "Software"), free
// of charge and under any and all copyright rights in the Software, and any and all patent rights
// owned or freely licensable by each licensor hereunder covering either (i) the unmodified
// Software as contributed to or provided by such licensor, or (ii) the Larger Works (as defined
// below), to deal in both
//
// (a) the Software, and
// (b) any piece of software and/or hardware listed in the lrgrwrks.txt file
// if one is included with the Software (each a "Larger Work" to which the Software is contributed
// by such licensors),
//
// without restriction, including without limitation the rights to copy, create derivative works
// of, display, perform, and distribute the Software and make, use, sell, offer for sale, import,
// export, have made, and have sold the Software and the Larger Work(s), and to sublicense the
// foregoing rights on either these or other terms.
//
// This license is subject to the following condition: The above copyright notice and either this
// complete permission notice or at a minimum a reference to the UPL must be included in all copies
// or substantial portions of the Software.
//
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR IMPLIED, INCLUDING
// BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY, FITNESS FOR A PARTICULAR PURPOSE AND
// NONINFRINGEMENT. IN NO EVENT SHALL THE AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM,
// DAMAGES OR OTHER LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM,
// OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE SOFTWARE.

// This macro generates a struct which exposes a u32 API (but which may, internally, use a smaller
// storage size).

use std::mem::size_of;

use num_traits::{self, PrimInt, Unsigned};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

macro_rules! IdxNewtype {
    ($(#[$attr:meta])* $n: ident) => {
        $(#[$attr])*
        #[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
        #[cfg_attr(feature="serde", derive(Serialize, Deserialize))]
        pub struct $n<T = u32>(pub T);

        impl<T: PrimInt + Unsigned> From<$n<T>> for usize {
            fn from(st: $n<T>) -> Self {
                debug_assert!(size_of::<usize>() >= size_of::<T>());
                num_traits::cast(st.0).unwrap()
            }
        }

        impl<T: PrimInt + Unsigned> From<$n<T>> for u32 {
            fn from(st: $n<T>) -> Self {
                debug_assert!(size_of::<u32>() >= size_of::<T>());
                num_traits::cast(st.0).unwrap()
            }
        }

        impl<T: PrimInt + Unsigned> $n<T> {
            pub fn as_storaget(&self) -> T {
                self.0
            }

            /// The index following this one.
            ///
            /// # Panics
            ///
            /// If the successor cannot be represented in `T`.
            #[allow(dead_code)]
            pub(crate) fn succ(self) -> Self {
                match self.0.checked_add(&T::one()) {
                    Some(x) => $n(x),
                    None => panic!("{} overflowed its storage type", stringify!($n)),
                }
            }
        }
    }
}

IdxNewtype!(
    /// A stable identifier for a production.
    ///
    /// Identifiers are handed out in creation order and are never reused, even once the
    /// production has been removed and its storage reclaimed.
    PIdx);
IdxNewtype!(
    /// A stable identifier for a pushdown automaton transition. Like [`PIdx`], identifiers are
    /// never reused.
    XIdx);
IdxNewtype!(
    /// A type specifically for automaton state numbers.
    ///
    /// States are numbered from `0` (the initial start state) to `num_states() - 1`
    /// (inclusive).
    StIdx);

#[cfg(test)]
mod test {
    use super::{PIdx, StIdx};

    #[test]
    fn test_conversions() {
        assert_eq!(usize::from(StIdx(7u32)), 7);
        assert_eq!(u32::from(PIdx(3u16)), 3);
        assert_eq!(PIdx(3u32).succ(), PIdx(4));
    }

    #[test]
    #[should_panic]
    fn test_succ_overflow() {
        PIdx(u8::MAX).succ();
    }
}
