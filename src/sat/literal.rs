use super::{Result, SatError};
use std::{
    fmt::Display,
    num::{NonZeroIsize, NonZeroUsize},
};

/// A variable in a SAT solver.
///
/// A variable is represented by a non-null positive integer.
/// It can be obtained through the [From] trait from an integer type;
/// use [`Variable::try_new`] when the integer comes from an untrusted source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Variable(NonZeroUsize);

impl Variable {
    /// Builds a variable, returning an [`InvalidUsage`](SatError::InvalidUsage) error for `0`.
    pub fn try_new(id: usize) -> Result<Self> {
        NonZeroUsize::new(id)
            .map(Self)
            .ok_or_else(|| SatError::invalid_usage("0 is not a variable id"))
    }

    /// Returns the literal of this variable with the given polarity.
    pub fn literal(self, polarity: bool) -> Literal {
        let id = self.0.get() as isize;
        Literal::from(if polarity { id } else { -id })
    }

    /// Returns the positive literal of this variable.
    pub fn positive(self) -> Literal {
        self.literal(true)
    }

    /// Returns the negative literal of this variable.
    pub fn negative(self) -> Literal {
        self.literal(false)
    }

    /// Returns the zero-based index of this variable, used to address per-variable arrays.
    pub fn index(self) -> usize {
        self.0.get() - 1
    }
}

macro_rules! impl_var_from {
    ($t: ty) => {
        impl From<$t> for Variable {
            fn from(v: $t) -> Self {
                Self(NonZeroUsize::try_from(v as usize).unwrap())
            }
        }
    };
}
impl_var_from!(usize);
impl_var_from!(u64);
impl_var_from!(u32);

macro_rules! impl_var_from_neg {
    ($t: ty) => {
        impl From<$t> for Variable {
            fn from(v: $t) -> Self {
                if v < 0 {
                    panic!("cannot build a variable from a negative integer")
                }
                Self(NonZeroUsize::try_from(v as usize).unwrap())
            }
        }
    };
}
impl_var_from_neg!(isize);
impl_var_from_neg!(i64);
impl_var_from_neg!(i32);

impl From<Variable> for usize {
    fn from(v: Variable) -> Self {
        v.0.into()
    }
}

impl Display for Variable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A literal in a SAT solver.
///
/// A literal is represented by a non-null integer: its absolute value is the variable id and its sign is the polarity.
/// It can be obtained through the [From] trait from a signed integer type, which panics on `0`;
/// use [`Literal::try_new`] when the integer comes from an untrusted source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Literal(NonZeroIsize);

impl Literal {
    /// Builds a literal, returning an [`InvalidUsage`](SatError::InvalidUsage) error for `0`.
    pub fn try_new(l: isize) -> Result<Self> {
        NonZeroIsize::new(l)
            .map(Self)
            .ok_or_else(|| SatError::invalid_usage("0 is not a literal"))
    }

    /// Returns the opposite literal.
    pub fn negate(self) -> Self {
        Self::from(-self.0.get())
    }

    /// Returns the variable of this literal.
    pub fn var(&self) -> Variable {
        Variable(self.0.unsigned_abs())
    }

    /// Returns `true` iff this literal asserts its variable to `true`.
    pub fn is_positive(&self) -> bool {
        self.0.get() > 0
    }
}

macro_rules! impl_lit_from {
    ($t: ty) => {
        impl From<$t> for Literal {
            fn from(l: $t) -> Self {
                Self(NonZeroIsize::try_from(l as isize).unwrap())
            }
        }
    };
}
impl_lit_from!(isize);
impl_lit_from!(i64);
impl_lit_from!(i32);

impl From<Literal> for isize {
    fn from(l: Literal) -> Self {
        l.0.into()
    }
}

impl Display for Literal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Builds a clause from a list of integers.
#[macro_export]
macro_rules! clause {
    () => (
        vec![] as Vec<$crate::sat::Literal>
    );
    ($($x:expr),+ $(,)?) => (
        [$($x),+].into_iter().map($crate::sat::Literal::from).collect::<Vec<$crate::sat::Literal>>()
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_var_from_pos() {
        let v = Variable::from(1);
        assert_eq!(1, usize::from(v));
        assert_eq!(0, v.index());
    }

    #[test]
    #[allow(unused_must_use)]
    #[should_panic]
    fn test_var_from_null() {
        Variable::from(0);
    } // kcov-ignore

    #[test]
    #[allow(unused_must_use)]
    #[should_panic]
    fn test_var_from_neg() {
        Variable::from(-1);
    } // kcov-ignore

    #[test]
    fn test_var_try_new() {
        assert_eq!(Variable::from(3), Variable::try_new(3).unwrap());
        assert!(Variable::try_new(0).unwrap_err().is_invalid_usage());
    }

    #[test]
    fn test_lit_from_pos() {
        let l = Literal::from(1);
        assert_eq!(1, isize::from(l));
        assert!(l.is_positive());
    }

    #[test]
    #[allow(unused_must_use)]
    #[should_panic]
    fn test_lit_from_null() {
        Literal::from(0);
    } // kcov-ignore

    #[test]
    fn test_lit_from_neg() {
        let l = Literal::from(-1);
        assert_eq!(-1, isize::from(l));
        assert!(!l.is_positive());
        assert_eq!(Variable::from(1), l.var());
    }

    #[test]
    fn test_lit_try_new() {
        assert_eq!(Literal::from(-4), Literal::try_new(-4).unwrap());
        assert!(Literal::try_new(0).unwrap_err().is_invalid_usage());
    }

    #[test]
    fn test_negate_lit() {
        assert_eq!(Literal::from(-1), Literal::from(1).negate());
        assert_eq!(Literal::from(1), Literal::from(-1).negate());
    }

    #[test]
    fn test_var_literals() {
        let v = Variable::from(5);
        assert_eq!(Literal::from(5), v.positive());
        assert_eq!(Literal::from(-5), v.negative());
        assert_eq!(v.positive(), v.literal(true));
    }

    #[test]
    fn test_clause_macro() {
        assert!(clause![].is_empty());
        assert_eq!(
            vec![Literal::from(1), Literal::from(-2)],
            clause![1, -2]
        );
    }
}
