use crate::sat::{Literal, Session};
use anyhow::{Context, Result};

/// A CNF formula, as read from a DIMACS file.
///
/// The formula declares a number of variables; every literal of its clauses refers to one of them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CnfFormula {
    n_vars: usize,
    clauses: Vec<Vec<Literal>>,
}

impl CnfFormula {
    /// Builds an empty formula over `n_vars` variables.
    pub fn new(n_vars: usize) -> Self {
        Self {
            n_vars,
            clauses: vec![],
        }
    }

    /// Adds a clause to the formula.
    ///
    /// # Panics
    ///
    /// If a literal refers to a variable that is not declared by the formula.
    pub fn add_clause(&mut self, clause: Vec<Literal>) {
        if let Some(l) = clause.iter().find(|l| l.var().index() >= self.n_vars) {
            panic!("undeclared variable in literal {}", l);
        }
        self.clauses.push(clause);
    }

    /// Returns the number of declared variables.
    pub fn n_vars(&self) -> usize {
        self.n_vars
    }

    /// Returns the number of clauses.
    pub fn n_clauses(&self) -> usize {
        self.clauses.len()
    }

    /// Iterates over the clauses.
    pub fn iter_clauses(&self) -> impl Iterator<Item = &[Literal]> + '_ {
        self.clauses.iter().map(|c| c.as_slice())
    }

    /// Loads the formula into a session, allocating the missing variables first.
    ///
    /// Returns `false` iff the session became trivially unsatisfiable.
    ///
    /// ```
    /// # use satbridge::io::{DimacsReader, InstanceReader};
    /// # use satbridge::sat::{EngineConfig, Session, SolvingResult};
    /// let formula = DimacsReader::default()
    ///     .read(&mut "p cnf 2 2\n1 2 0\n-1 0\n".as_bytes())
    ///     .unwrap();
    /// let mut session = Session::new(EngineConfig::default()).unwrap();
    /// assert!(formula.add_to(&mut session).unwrap());
    /// assert_eq!(SolvingResult::Satisfiable, session.solve().unwrap());
    /// ```
    pub fn add_to(&self, session: &mut Session) -> Result<bool> {
        if self.n_vars > session.n_vars() {
            session
                .reserve_vars(self.n_vars)
                .context("while allocating the formula variables")?;
        }
        let mut okay = true;
        for (i, clause) in self.clauses.iter().enumerate() {
            okay &= session
                .add_clause(clause)
                .with_context(|| format!("while adding the clause with index {}", i))?;
        }
        Ok(okay)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        clause,
        sat::{EngineConfig, EngineKind, SolvingResult, Value},
    };

    #[test]
    fn test_add_to_session() {
        let mut formula = CnfFormula::new(3);
        formula.add_clause(clause![1, -2]);
        formula.add_clause(clause![2, 3]);
        assert_eq!(3, formula.n_vars());
        assert_eq!(2, formula.n_clauses());
        let mut session = Session::new(EngineConfig::new(EngineKind::Varisat)).unwrap();
        session.reserve_vars(1).unwrap();
        assert!(formula.add_to(&mut session).unwrap());
        assert_eq!(3, session.n_vars());
        assert_eq!(2, session.n_clauses());
        assert_eq!(
            SolvingResult::Unsatisfiable,
            session.solve_with(&clause![-1, -3]).unwrap()
        );
        assert_eq!(
            SolvingResult::Satisfiable,
            session.solve_with(&clause![-1]).unwrap()
        );
        assert_eq!(Value::False, session.value(2.into()).unwrap());
        assert_eq!(Value::True, session.value(3.into()).unwrap());
    }

    #[test]
    fn test_add_empty_clause() {
        let mut formula = CnfFormula::new(1);
        formula.add_clause(vec![]);
        let mut session = Session::new(EngineConfig::default()).unwrap();
        assert!(!formula.add_to(&mut session).unwrap());
    }

    #[test]
    #[should_panic(expected = "undeclared variable")]
    fn test_undeclared_variable() {
        let mut formula = CnfFormula::new(1);
        formula.add_clause(clause![1, -2]);
    }
}
