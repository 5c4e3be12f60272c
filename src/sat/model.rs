use super::Variable;
use std::fmt::Display;

/// The outcome of a solve call.
///
/// None of these outcomes is an error.
/// [`Unknown`](SolvingResult::Unknown) is returned when a budget is exhausted or when the search is interrupted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolvingResult {
    /// The formula is satisfiable under the assumptions; a model is available.
    Satisfiable,
    /// The formula is unsatisfiable under the assumptions.
    Unsatisfiable,
    /// The engine stopped before reaching a conclusion.
    Unknown,
}

impl Display for SolvingResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SolvingResult::Satisfiable => write!(f, "SAT"),
            SolvingResult::Unsatisfiable => write!(f, "UNSAT"),
            SolvingResult::Unknown => write!(f, "UNKNOWN"),
        }
    }
}

/// The ternary value of a variable or a literal.
///
/// This is the single value convention of the crate, whatever the engine:
/// engines reporting binary values never produce [`Unknown`](Value::Unknown),
/// engines leaving unconstrained variables unassigned report them as [`Unknown`](Value::Unknown).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Value {
    /// assigned to true
    True,
    /// assigned to false
    False,
    /// not assigned
    Unknown,
}

impl Value {
    /// Returns the value of the opposite literal.
    pub fn negate(self) -> Self {
        match self {
            Value::True => Value::False,
            Value::False => Value::True,
            Value::Unknown => Value::Unknown,
        }
    }

    /// Returns the value of a literal with the given polarity, given the value of its variable.
    pub fn with_polarity(self, positive: bool) -> Self {
        if positive {
            self
        } else {
            self.negate()
        }
    }

    /// Returns the Boolean value, or `None` if the value is unknown.
    pub fn to_option(self) -> Option<bool> {
        match self {
            Value::True => Some(true),
            Value::False => Some(false),
            Value::Unknown => None,
        }
    }

    /// Returns the Boolean value, using the provided default for unknown values.
    pub fn unwrap_or(self, default: bool) -> bool {
        self.to_option().unwrap_or(default)
    }
}

impl From<Option<bool>> for Value {
    fn from(v: Option<bool>) -> Self {
        match v {
            Some(true) => Value::True,
            Some(false) => Value::False,
            None => Value::Unknown,
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::from(Some(v))
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::True => write!(f, "true"),
            Value::False => write!(f, "false"),
            Value::Unknown => write!(f, "unknown"),
        }
    }
}

/// A model returned after a satisfiable solve call.
///
/// The model is 1-based: it holds `n_vars + 1` values, the one at index `0` being always [`Value::Unknown`].
/// Some engines leave variables unassigned (e.g. variables that do not appear in any clause);
/// callers that need a binary model must choose how to project them, see [`to_bools`](Self::to_bools).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Model(Vec<Value>);

impl Model {
    pub(crate) fn new(values: Vec<Value>) -> Self {
        Self(std::iter::once(Value::Unknown).chain(values).collect())
    }

    /// Returns the value assigned to the variable.
    ///
    /// # Panics
    ///
    /// If the variable is not covered by the model.
    pub fn value_of<T>(&self, v: T) -> Value
    where
        T: Into<Variable>,
    {
        self.0[usize::from(v.into())]
    }

    /// Returns the number of variables covered by the model.
    pub fn n_vars(&self) -> usize {
        self.0.len() - 1
    }

    /// Returns the raw 1-based values, index `0` included.
    pub fn as_slice(&self) -> &[Value] {
        &self.0
    }

    /// Returns `true` iff every variable has a Boolean value.
    pub fn is_complete(&self) -> bool {
        self.iter().all(|(_, v)| v != Value::Unknown)
    }

    /// Projects the model to Boolean values (0-based), replacing unknown values by `default`.
    pub fn to_bools(&self, default: bool) -> Vec<bool> {
        self.iter().map(|(_, v)| v.unwrap_or(default)).collect()
    }

    /// Iterates over the couples of variable ids and values, starting at variable `1`.
    pub fn iter(&self) -> impl Iterator<Item = (usize, Value)> + '_ {
        self.0.iter().copied().enumerate().skip(1)
    }
}
