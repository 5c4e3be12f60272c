use super::{Literal, Result, SatError, Session};
use log::debug;
use std::collections::VecDeque;

/// Declares a totalizer over the literals and returns its output literals.
///
/// The `i`-th output literal (1-based) is true iff at least `i` of the input literals are true.
/// Fresh variables are allocated in the session for every internal node of the totalizer.
pub fn declare_totalizer(session: &mut Session, literals: &[Literal]) -> Result<Vec<Literal>> {
    if literals.is_empty() {
        return Err(SatError::invalid_usage(
            "cannot declare a totalizer over an empty set of literals",
        ));
    }
    session.comment(&format!("Totalizer({})", literals.len()));
    let mut queue = literals
        .iter()
        .map(|l| vec![*l])
        .collect::<VecDeque<Vec<Literal>>>();
    let totalizer = loop {
        let a = queue
            .pop_front()
            .ok_or_else(|| SatError::Engine("the totalizer has no output".to_string()))?;
        let b = match queue.pop_front() {
            Some(b) => b,
            None => break a,
        };
        let m1 = a.len();
        let m2 = b.len();
        let m = m1 + m2;
        let r = (0..m)
            .map(|_| session.new_var_default().map(|v| v.positive()))
            .collect::<Result<Vec<Literal>>>()?;
        for alpha in 0..=m1 {
            for beta in 0..=m2 {
                let sigma = alpha + beta;
                if sigma > 0 {
                    let mut cl = Vec::with_capacity(3);
                    if alpha > 0 {
                        cl.push(a[alpha - 1].negate());
                    }
                    if beta > 0 {
                        cl.push(b[beta - 1].negate());
                    }
                    cl.push(r[sigma - 1]);
                    session.add_clause(&cl)?;
                }
                if sigma < m {
                    let mut cl = Vec::with_capacity(3);
                    if alpha < m1 {
                        cl.push(a[alpha]);
                    }
                    if beta < m2 {
                        cl.push(b[beta]);
                    }
                    cl.push(r[sigma].negate());
                    session.add_clause(&cl)?;
                }
            }
        }
        queue.push_back(r);
    };
    Ok(totalizer)
}

/// A cardinality constraint over a set of literals, backed by a totalizer.
///
/// Bounds can be declared, which adds clauses to the session, or assumed.
/// Declared bounds can only be tightened.
/// Assumed bounds are returned by [`assumptions`](Self::assumptions), which must be given to the solve calls they apply to.
///
/// ```
/// # use satbridge::{clause, sat::{Cardinality, EngineConfig, Session, SolvingResult}};
/// let mut session = Session::new(EngineConfig::default()).unwrap();
/// session.reserve_vars(4).unwrap();
/// let mut card = Cardinality::declare(&mut session, &clause![1, 2, 3, 4]).unwrap();
/// card.declare_upper_bound_less_than_or_equal(&mut session, 2).unwrap();
/// card.assume_lower_bound_greater_than_or_equal(Some(3)).unwrap();
/// assert_eq!(
///     SolvingResult::Unsatisfiable,
///     session.solve_with(&card.assumptions()).unwrap()
/// );
/// ```
#[derive(Debug, Clone)]
pub struct Cardinality {
    totalizer: Vec<Literal>,
    declared_upper_bound: Option<usize>,
    declared_lower_bound: Option<usize>,
    assumed_upper: Vec<Literal>,
    assumed_lower: Vec<Literal>,
}

impl Cardinality {
    /// Declares a totalizer over the literals.
    pub fn declare(session: &mut Session, literals: &[Literal]) -> Result<Self> {
        let totalizer = declare_totalizer(session, literals)?;
        Ok(Self {
            totalizer,
            declared_upper_bound: None,
            declared_lower_bound: None,
            assumed_upper: vec![],
            assumed_lower: vec![],
        })
    }

    /// Returns the output literals of the totalizer.
    pub fn totalizer(&self) -> &[Literal] {
        &self.totalizer
    }

    /// Returns the strongest declared upper bound (exclusive).
    pub fn declared_upper_bound(&self) -> Option<usize> {
        self.declared_upper_bound
    }

    /// Returns the strongest declared lower bound (inclusive).
    pub fn declared_lower_bound(&self) -> Option<usize> {
        self.declared_lower_bound
    }

    /// Requires less than `upper_bound` literals to be true.
    pub fn declare_upper_bound_less_than(
        &mut self,
        session: &mut Session,
        upper_bound: usize,
    ) -> Result<()> {
        if let Some(current) = self.declared_upper_bound {
            if upper_bound > current {
                return Err(SatError::invalid_usage(format!(
                    "cannot soften the upper bound from {} to {}",
                    current, upper_bound
                )));
            }
        }
        let max = self.declared_upper_bound.unwrap_or(self.totalizer.len() + 1);
        session.comment(&format!("Comparator(<{} up to {})", upper_bound, max));
        if upper_bound == 0 {
            session.add_empty_clause()?;
        }
        for i in upper_bound.max(1)..max.min(self.totalizer.len() + 1) {
            session.add_unit(self.totalizer[i - 1].negate())?;
        }
        debug!("cardinality upper bound set to < {}", upper_bound);
        self.declared_upper_bound = Some(upper_bound);
        Ok(())
    }

    /// Requires at most `upper_bound` literals to be true.
    pub fn declare_upper_bound_less_than_or_equal(
        &mut self,
        session: &mut Session,
        upper_bound: usize,
    ) -> Result<()> {
        self.declare_upper_bound_less_than(session, upper_bound + 1)
    }

    /// Requires at least `lower_bound` literals to be true.
    pub fn declare_lower_bound_greater_than_or_equal(
        &mut self,
        session: &mut Session,
        lower_bound: usize,
    ) -> Result<()> {
        if let Some(current) = self.declared_lower_bound {
            if lower_bound < current {
                return Err(SatError::invalid_usage(format!(
                    "cannot soften the lower bound from {} to {}",
                    current, lower_bound
                )));
            }
        }
        let min = self.declared_lower_bound.unwrap_or(0) + 1;
        session.comment(&format!("Comparator(>={} from {})", lower_bound, min));
        if lower_bound > self.totalizer.len() {
            session.add_empty_clause()?;
        }
        for i in min..=lower_bound.min(self.totalizer.len()) {
            session.add_unit(self.totalizer[i - 1])?;
        }
        debug!("cardinality lower bound set to >= {}", lower_bound);
        self.declared_lower_bound = Some(lower_bound);
        Ok(())
    }

    /// Requires more than `lower_bound` literals to be true.
    pub fn declare_lower_bound_greater_than(
        &mut self,
        session: &mut Session,
        lower_bound: usize,
    ) -> Result<()> {
        self.declare_lower_bound_greater_than_or_equal(session, lower_bound + 1)
    }

    /// Assumes less than `upper_bound` literals are true, or removes the assumed upper bound.
    pub fn assume_upper_bound_less_than(&mut self, upper_bound: Option<usize>) -> Result<()> {
        self.assumed_upper = match upper_bound {
            None => vec![],
            Some(0) => {
                return Err(SatError::invalid_usage(
                    "cannot assume less than 0 true literals",
                ))
            }
            Some(ub) => self
                .totalizer
                .iter()
                .skip(ub - 1)
                .map(|l| l.negate())
                .collect(),
        };
        Ok(())
    }

    /// Assumes at most `upper_bound` literals are true, or removes the assumed upper bound.
    pub fn assume_upper_bound_less_than_or_equal(&mut self, upper_bound: Option<usize>) -> Result<()> {
        self.assume_upper_bound_less_than(upper_bound.map(|ub| ub + 1))
    }

    /// Assumes at least `lower_bound` literals are true, or removes the assumed lower bound.
    pub fn assume_lower_bound_greater_than_or_equal(&mut self, lower_bound: Option<usize>) -> Result<()> {
        self.assumed_lower = match lower_bound {
            None => vec![],
            Some(lb) if lb > self.totalizer.len() => {
                return Err(SatError::invalid_usage(format!(
                    "the lower bound {} is greater than the number of literals ({})",
                    lb,
                    self.totalizer.len()
                )))
            }
            Some(lb) => self.totalizer[..lb].to_vec(),
        };
        Ok(())
    }

    /// Assumes more than `lower_bound` literals are true, or removes the assumed lower bound.
    pub fn assume_lower_bound_greater_than(&mut self, lower_bound: Option<usize>) -> Result<()> {
        self.assume_lower_bound_greater_than_or_equal(lower_bound.map(|lb| lb + 1))
    }

    /// Returns the assumptions encoding the assumed bounds.
    pub fn assumptions(&self) -> Vec<Literal> {
        self.assumed_upper
            .iter()
            .chain(self.assumed_lower.iter())
            .copied()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        clause,
        sat::{EngineConfig, Model, SolvingResult, Variable},
    };

    fn new_session(n_vars: usize) -> Session {
        let mut s = Session::new(EngineConfig::default()).unwrap();
        s.reserve_vars(n_vars).unwrap();
        s
    }

    fn input_vars(n: usize) -> Vec<Variable> {
        (1..=n).map(Variable::from).collect()
    }

    fn count_true(model: &Model, n: usize) -> usize {
        model.to_bools(false)[..n].iter().filter(|b| **b).count()
    }

    fn enumerate(s: &mut Session, n: usize, assumptions: &[Literal]) -> Vec<usize> {
        let mut counts = s
            .all_solutions(Some(input_vars(n)), assumptions)
            .map(|m| count_true(&m.unwrap(), n))
            .collect::<Vec<usize>>();
        counts.sort_unstable();
        counts
    }

    #[test]
    fn test_totalizer_outputs() {
        let mut s = new_session(3);
        let t = declare_totalizer(&mut s, &clause![1, 2, 3]).unwrap();
        assert_eq!(3, t.len());
        assert_eq!(
            SolvingResult::Satisfiable,
            s.solve_with(&clause![1, -2, 3]).unwrap()
        );
        let values = t.iter().map(|l| s.value(*l).unwrap().unwrap_or(false)).collect::<Vec<bool>>();
        assert_eq!(vec![true, true, false], values);
    }

    #[test]
    fn test_totalizer_single_literal() {
        let mut s = new_session(1);
        assert_eq!(clause![-1], declare_totalizer(&mut s, &clause![-1]).unwrap());
        assert_eq!(1, s.n_vars());
    }

    #[test]
    fn test_totalizer_empty() {
        let mut s = new_session(1);
        assert!(declare_totalizer(&mut s, &[]).unwrap_err().is_invalid_usage());
    }

    #[test]
    fn test_declared_bounds() {
        let mut s = new_session(5);
        let lits = input_vars(5).iter().map(|v| v.positive()).collect::<Vec<Literal>>();
        let mut card = Cardinality::declare(&mut s, &lits).unwrap();
        card.declare_upper_bound_less_than_or_equal(&mut s, 3).unwrap();
        card.declare_lower_bound_greater_than(&mut s, 1).unwrap();
        let counts = enumerate(&mut s, 5, &[]);
        // C(5,2) + C(5,3)
        assert_eq!(20, counts.len());
        assert!(counts.iter().all(|c| (2..=3).contains(c)));
    }

    #[test]
    fn test_declared_bounds_cannot_soften() {
        let mut s = new_session(3);
        let mut card = Cardinality::declare(&mut s, &clause![1, 2, 3]).unwrap();
        card.declare_upper_bound_less_than(&mut s, 2).unwrap();
        assert!(card
            .declare_upper_bound_less_than(&mut s, 3)
            .unwrap_err()
            .is_invalid_usage());
        card.declare_upper_bound_less_than(&mut s, 1).unwrap();
        card.declare_lower_bound_greater_than_or_equal(&mut s, 0).unwrap();
        assert!(card
            .declare_lower_bound_greater_than_or_equal(&mut s, 0)
            .is_ok());
        assert_eq!(Some(1), card.declared_upper_bound());
        assert_eq!(vec![0], enumerate(&mut s, 3, &[]));
    }

    #[test]
    fn test_unreachable_declared_bounds() {
        let mut s = new_session(2);
        let mut card = Cardinality::declare(&mut s, &clause![1, 2]).unwrap();
        card.declare_upper_bound_less_than(&mut s, 5).unwrap();
        assert_eq!(SolvingResult::Satisfiable, s.solve().unwrap());
        card.declare_lower_bound_greater_than_or_equal(&mut s, 3).unwrap();
        assert_eq!(SolvingResult::Unsatisfiable, s.solve().unwrap());
    }

    #[test]
    fn test_assumed_bounds() {
        let mut s = new_session(4);
        let mut card = Cardinality::declare(&mut s, &clause![1, 2, 3, 4]).unwrap();
        card.assume_upper_bound_less_than_or_equal(Some(1)).unwrap();
        assert_eq!(vec![0, 1, 1, 1, 1], enumerate(&mut s, 4, &card.assumptions()));

        let mut s = new_session(4);
        let mut card = Cardinality::declare(&mut s, &clause![1, 2, 3, 4]).unwrap();
        card.assume_lower_bound_greater_than(Some(2)).unwrap();
        assert_eq!(vec![3, 3, 3, 3, 4], enumerate(&mut s, 4, &card.assumptions()));
        card.assume_lower_bound_greater_than(None).unwrap();
        assert!(card.assumptions().is_empty());
    }

    #[test]
    fn test_assumed_bounds_are_checked() {
        let mut s = new_session(2);
        let mut card = Cardinality::declare(&mut s, &clause![1, 2]).unwrap();
        assert!(card
            .assume_upper_bound_less_than(Some(0))
            .unwrap_err()
            .is_invalid_usage());
        assert!(card
            .assume_lower_bound_greater_than_or_equal(Some(3))
            .unwrap_err()
            .is_invalid_usage());
        card.assume_upper_bound_less_than(Some(3)).unwrap();
        assert!(card.assumptions().is_empty());
    }
}
