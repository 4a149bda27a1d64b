use std::{error::Error, fmt};

use crate::{StIdx, Symbol};

/// The ways in which a container can reject a request.
#[derive(Debug, PartialEq, Eq)]
pub enum FltlErrorKind {
    /// The symbol is a variable, but not one that this grammar owns.
    UnknownVariable(Symbol),
    /// The symbol was expected to be a variable.
    NotAVariable(Symbol),
    /// The symbol is a terminal that is not in this container's alphabet.
    UnknownTerminal(Symbol),
    /// Automata only deal in terminals and epsilon.
    NotATerminal(Symbol),
    UnknownState(StIdx),
}

/// Any error from a [`Cfg`](crate::cfg::Cfg) or [`Pda`](crate::pda::Pda) returns an instance of
/// this struct.
#[derive(Debug, PartialEq, Eq)]
pub struct FltlError {
    pub kind: FltlErrorKind,
}

impl FltlError {
    pub(crate) fn new(kind: FltlErrorKind) -> Self {
        FltlError { kind }
    }
}

impl Error for FltlError {}

impl fmt::Display for FltlError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.kind)
    }
}

impl fmt::Display for FltlErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            FltlErrorKind::UnknownVariable(s) => write!(f, "Unknown variable {}", s.value()),
            FltlErrorKind::NotAVariable(s) => write!(f, "Symbol {} is not a variable", s.value()),
            FltlErrorKind::UnknownTerminal(s) => write!(f, "Unknown terminal {}", s.value()),
            FltlErrorKind::NotATerminal(s) => {
                write!(f, "Symbol {} is neither a terminal nor epsilon", s.value())
            }
            FltlErrorKind::UnknownState(st) => write!(f, "Unknown state {}", st.0),
        }
    }
}

#[cfg(test)]
mod test {
    use super::{FltlError, FltlErrorKind};
    use crate::{StIdx, Symbol};

    #[test]
    fn test_display() {
        let e = FltlError::new(FltlErrorKind::NotAVariable(Symbol::terminal(2)));
        assert_eq!(e.to_string(), "Symbol -2 is not a variable");
        let e = FltlError::new(FltlErrorKind::UnknownState(StIdx(9)));
        assert_eq!(e.to_string(), "Unknown state 9");
    }
}
