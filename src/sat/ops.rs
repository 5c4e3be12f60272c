use super::{Literal, Model, Result, Session, SolvingResult, Value, Variable};
use log::{debug, trace};
use std::{sync::mpsc, thread, time::Duration};

/// Clause-construction helpers.
///
/// Each helper adds the clauses of a common constraint and returns the conjunction of the results of
/// [`add_clause`](Session::add_clause), i.e. `false` as soon as the engine knows the formula is unsatisfiable.
impl Session {
    fn add_clauses<I>(&mut self, clauses: I) -> Result<bool>
    where
        I: IntoIterator<Item = Vec<Literal>>,
    {
        let mut okay = true;
        for cl in clauses {
            okay &= self.add_clause(&cl)?;
        }
        Ok(okay)
    }

    /// Adds `OR(literals)`.
    pub fn at_least_one(&mut self, literals: &[Literal]) -> Result<bool> {
        self.add_clause(literals)
    }

    /// Adds `AtMostOne(literals)` with the pairwise encoding.
    pub fn at_most_one(&mut self, literals: &[Literal]) -> Result<bool> {
        self.add_clauses(
            literals
                .iter()
                .enumerate()
                .flat_map(|(i, a)| literals[i + 1..].iter().map(|b| vec![a.negate(), b.negate()])),
        )
    }

    /// Adds `ExactlyOne(literals)`.
    pub fn exactly_one(&mut self, literals: &[Literal]) -> Result<bool> {
        let at_least = self.at_least_one(literals)?;
        Ok(self.at_most_one(literals)? && at_least)
    }

    /// Adds `lhs => rhs`.
    pub fn imply(&mut self, lhs: Literal, rhs: Literal) -> Result<bool> {
        self.add_binary(lhs.negate(), rhs)
    }

    /// Adds `lhs <=> rhs`.
    pub fn iff(&mut self, lhs: Literal, rhs: Literal) -> Result<bool> {
        let direct = self.imply(lhs, rhs)?;
        Ok(self.imply(rhs, lhs)? && direct)
    }

    /// Adds `ITE(cond, a, b)`, i.e. `(cond => a) AND (-cond => b)`.
    pub fn ite(&mut self, cond: Literal, a: Literal, b: Literal) -> Result<bool> {
        let then = self.imply(cond, a)?;
        Ok(self.imply(cond.negate(), b)? && then)
    }

    /// Adds `lhs => AND(rhs)`.
    pub fn imply_and(&mut self, lhs: Literal, rhs: &[Literal]) -> Result<bool> {
        self.add_clauses(rhs.iter().map(|x| vec![lhs.negate(), *x]))
    }

    /// Adds `lhs => OR(rhs)`.
    pub fn imply_or(&mut self, lhs: Literal, rhs: &[Literal]) -> Result<bool> {
        let cl = std::iter::once(lhs.negate())
            .chain(rhs.iter().copied())
            .collect::<Vec<Literal>>();
        self.add_clause(&cl)
    }

    /// Adds `x1 => (x2 => x3)`.
    pub fn imply_imply(&mut self, x1: Literal, x2: Literal, x3: Literal) -> Result<bool> {
        self.add_ternary(x1.negate(), x2.negate(), x3)
    }

    /// Adds `x1 => (x2 <=> x3)`.
    pub fn imply_iff(&mut self, x1: Literal, x2: Literal, x3: Literal) -> Result<bool> {
        let direct = self.imply_imply(x1, x2, x3)?;
        Ok(self.imply_imply(x1, x3, x2)? && direct)
    }

    /// Adds `lhs => ITE(cond, a, b)`.
    pub fn imply_ite(&mut self, lhs: Literal, cond: Literal, a: Literal, b: Literal) -> Result<bool> {
        let then = self.imply_imply(lhs, cond, a)?;
        Ok(self.imply_imply(lhs, cond.negate(), b)? && then)
    }

    /// Adds `lhs <=> AND(rhs)`.
    pub fn iff_and(&mut self, lhs: Literal, rhs: &[Literal]) -> Result<bool> {
        let backward = std::iter::once(lhs)
            .chain(rhs.iter().map(|x| x.negate()))
            .collect::<Vec<Literal>>();
        let forward = self.imply_and(lhs, rhs)?;
        Ok(self.add_clause(&backward)? && forward)
    }

    /// Adds `lhs <=> OR(rhs)`.
    pub fn iff_or(&mut self, lhs: Literal, rhs: &[Literal]) -> Result<bool> {
        let backward = self.add_clauses(rhs.iter().map(|x| vec![x.negate(), lhs]))?;
        Ok(self.imply_or(lhs, rhs)? && backward)
    }

    /// Adds `lhs <=> (x1 => x2)`.
    pub fn iff_imply(&mut self, lhs: Literal, x1: Literal, x2: Literal) -> Result<bool> {
        self.add_clauses([
            vec![lhs.negate(), x1.negate(), x2],
            vec![lhs, x1],
            vec![lhs, x2.negate()],
        ])
    }

    /// Adds `lhs <=> ITE(cond, a, b)`.
    pub fn iff_ite(&mut self, lhs: Literal, cond: Literal, a: Literal, b: Literal) -> Result<bool> {
        let forward = self.imply_ite(lhs, cond, a, b)?;
        let backward = self.add_clauses([
            vec![cond.negate(), a.negate(), lhs],
            vec![cond, b.negate(), lhs],
        ])?;
        Ok(forward && backward)
    }

    /// Adds `x1 => (x2 <=> AND(xs))`.
    pub fn imply_iff_and(&mut self, x1: Literal, x2: Literal, xs: &[Literal]) -> Result<bool> {
        let backward = [x1.negate(), x2]
            .into_iter()
            .chain(xs.iter().map(|x| x.negate()))
            .collect::<Vec<Literal>>();
        let forward = self.add_clauses(xs.iter().map(|x| vec![x1.negate(), x2.negate(), *x]))?;
        Ok(self.add_clause(&backward)? && forward)
    }

    /// Adds `x1 => (x2 <=> OR(xs))`.
    pub fn imply_iff_or(&mut self, x1: Literal, x2: Literal, xs: &[Literal]) -> Result<bool> {
        let forward = [x1.negate(), x2.negate()]
            .into_iter()
            .chain(xs.iter().copied())
            .collect::<Vec<Literal>>();
        let backward = self.add_clauses(xs.iter().map(|x| vec![x1.negate(), x.negate(), x2]))?;
        Ok(self.add_clause(&forward)? && backward)
    }
}

/// Model enumeration and time-boxed executions.
impl Session {
    /// Enumerates the models of the formula, projected on the essential variables.
    ///
    /// After each model, a clause excluding its projection on the essential variables is added to the session.
    /// When no essential variables are given, every variable allocated at the time of the model is considered.
    /// The assumptions are given to each solve call.
    ///
    /// The enumeration ends when the formula becomes unsatisfiable.
    /// If a solve call ends with [`SolvingResult::Unknown`], a [`SatError::ResourceExhausted`](super::SatError::ResourceExhausted)
    /// error is returned and the enumeration ends.
    ///
    /// ```
    /// # use satbridge::{clause, sat::{EngineConfig, Session}};
    /// let mut session = Session::new(EngineConfig::default()).unwrap();
    /// session.reserve_vars(2).unwrap();
    /// session.add_clause(&clause![1, 2]).unwrap();
    /// let models = session
    ///     .all_solutions(None, &[])
    ///     .collect::<Result<Vec<_>, _>>()
    ///     .unwrap();
    /// assert_eq!(3, models.len());
    /// ```
    pub fn all_solutions<'s>(
        &'s mut self,
        essential: Option<Vec<Variable>>,
        assumptions: &[Literal],
    ) -> AllSolutions<'s, impl FnMut(&Model) -> Vec<Literal>> {
        self.all_solutions_with(assumptions, move |model: &Model| match &essential {
            Some(vars) => vars
                .iter()
                .map(|v| {
                    let value = model.as_slice().get(usize::from(*v)).copied();
                    blocking_literal(*v, value.unwrap_or(Value::Unknown))
                })
                .collect(),
            None => model
                .iter()
                .map(|(v, value)| blocking_literal(Variable::from(v), value))
                .collect(),
        })
    }

    /// Enumerates the models of the formula, excluding each one with the clause computed by `refutation`.
    pub fn all_solutions_with<F>(&mut self, assumptions: &[Literal], refutation: F) -> AllSolutions<'_, F>
    where
        F: FnMut(&Model) -> Vec<Literal>,
    {
        AllSolutions {
            session: self,
            assumptions: assumptions.to_vec(),
            refutation,
            done: false,
        }
    }

    /// Runs `f` on this session, interrupting the engine if it runs longer than `timeout`.
    ///
    /// The interruption flag is lowered before this function returns.
    /// Fails with [`SatError::Unsupported`](super::SatError::Unsupported) if the engine cannot be interrupted.
    pub fn run_with_timeout<T, F>(&mut self, timeout: Duration, f: F) -> Result<T>
    where
        F: FnOnce(&mut Session) -> T,
    {
        let interrupter = self.interrupter()?;
        debug!("running with a timeout of {:?}", timeout);
        let (done_tx, done_rx) = mpsc::channel::<()>();
        let watchdog = thread::spawn(move || {
            if let Err(mpsc::RecvTimeoutError::Timeout) = done_rx.recv_timeout(timeout) {
                debug!("timeout reached, interrupting the engine");
                interrupter.interrupt();
            }
        });
        let result = f(self);
        drop(done_tx);
        if watchdog.join().is_err() {
            debug!("the timeout watchdog panicked");
        }
        self.clear_interrupt();
        Ok(result)
    }
}

fn blocking_literal(var: Variable, value: Value) -> Literal {
    var.literal(value != Value::True)
}

/// The iterator returned by [`Session::all_solutions`] and [`Session::all_solutions_with`].
pub struct AllSolutions<'s, F>
where
    F: FnMut(&Model) -> Vec<Literal>,
{
    session: &'s mut Session,
    assumptions: Vec<Literal>,
    refutation: F,
    done: bool,
}

impl<F> AllSolutions<'_, F>
where
    F: FnMut(&Model) -> Vec<Literal>,
{
    fn next_model(&mut self) -> Result<Option<Model>> {
        match self.session.solve_with(&self.assumptions)? {
            SolvingResult::Satisfiable => {
                let model = self.session.model()?;
                let refutation = (self.refutation)(&model);
                trace!("refutation: {:?}", refutation);
                self.session.add_clause(&refutation)?;
                Ok(Some(model))
            }
            SolvingResult::Unsatisfiable => {
                trace!("no more solutions");
                Ok(None)
            }
            SolvingResult::Unknown => Err(super::SatError::ResourceExhausted(
                "the enumeration was stopped before its end".to_string(),
            )),
        }
    }
}

impl<F> Iterator for AllSolutions<'_, F>
where
    F: FnMut(&Model) -> Vec<Literal>,
{
    type Item = Result<Model>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let next = self.next_model();
        if !matches!(next, Ok(Some(_))) {
            self.done = true;
        }
        next.transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        clause,
        sat::{tests::add_pigeon_hole_clauses_to_session, EngineConfig, EngineKind, SatError},
    };

    fn new_session(n_vars: usize) -> Session {
        let mut s = Session::new(EngineConfig::default()).unwrap();
        s.reserve_vars(n_vars).unwrap();
        s
    }

    fn count_models(s: &mut Session, vars: Vec<Variable>) -> usize {
        s.all_solutions(Some(vars), &[])
            .collect::<Result<Vec<Model>>>()
            .unwrap()
            .len()
    }

    fn all_vars(n: usize) -> Vec<Variable> {
        (1..=n).map(Variable::from).collect()
    }

    #[test]
    fn test_at_most_one() {
        let mut s = new_session(3);
        assert!(s.at_most_one(&clause![1, 2, 3]).unwrap());
        assert_eq!(3, s.n_clauses());
        assert_eq!(4, count_models(&mut s, all_vars(3)));
    }

    #[test]
    fn test_exactly_one() {
        let mut s = new_session(4);
        s.exactly_one(&clause![1, 2, 3, 4]).unwrap();
        let models = s
            .all_solutions(None, &[])
            .collect::<Result<Vec<Model>>>()
            .unwrap();
        assert_eq!(4, models.len());
        for m in models {
            assert_eq!(1, m.to_bools(false).into_iter().filter(|b| *b).count());
        }
    }

    #[test]
    fn test_exactly_one_empty_is_unsat() {
        let mut s = new_session(1);
        assert!(!s.exactly_one(&[]).unwrap());
        assert_eq!(SolvingResult::Unsatisfiable, s.solve().unwrap());
    }

    #[test]
    fn test_imply_and_iff() {
        let mut s = new_session(3);
        s.imply(1.into(), 2.into()).unwrap();
        s.iff(2.into(), (-3).into()).unwrap();
        assert_eq!(SolvingResult::Satisfiable, s.solve_with(&clause![1]).unwrap());
        assert_eq!(Value::True, s.value(2.into()).unwrap());
        assert_eq!(Value::False, s.value(3.into()).unwrap());
        assert_eq!(
            SolvingResult::Unsatisfiable,
            s.solve_with(&clause![1, 3]).unwrap()
        );
    }

    #[test]
    fn test_ite() {
        let mut s = new_session(3);
        s.ite(1.into(), 2.into(), 3.into()).unwrap();
        assert_eq!(SolvingResult::Satisfiable, s.solve_with(&clause![-1]).unwrap());
        assert_eq!(Value::True, s.value(3.into()).unwrap());
        assert_eq!(
            SolvingResult::Unsatisfiable,
            s.solve_with(&clause![1, -2]).unwrap()
        );
    }

    #[test]
    fn test_iff_and() {
        let mut s = new_session(3);
        s.iff_and(1.into(), &clause![2, 3]).unwrap();
        for m in s.all_solutions(None, &[]) {
            let b = m.unwrap().to_bools(false);
            assert_eq!(b[0], b[1] && b[2]);
        }
    }

    #[test]
    fn test_iff_or() {
        let mut s = new_session(3);
        s.iff_or(1.into(), &clause![2, 3]).unwrap();
        let models = s
            .all_solutions(None, &[])
            .collect::<Result<Vec<Model>>>()
            .unwrap();
        assert_eq!(4, models.len());
        for m in models {
            let b = m.to_bools(false);
            assert_eq!(b[0], b[1] || b[2]);
        }
    }

    #[test]
    fn test_iff_imply_and_iff_ite() {
        let mut s = new_session(4);
        s.iff_imply(1.into(), 2.into(), 3.into()).unwrap();
        for m in s.all_solutions(None, &[]) {
            let b = m.unwrap().to_bools(false);
            assert_eq!(b[0], !b[1] || b[2]);
        }
        let mut s = new_session(4);
        s.iff_ite(1.into(), 2.into(), 3.into(), 4.into()).unwrap();
        let models = s
            .all_solutions(None, &[])
            .collect::<Result<Vec<Model>>>()
            .unwrap();
        assert_eq!(8, models.len());
        for m in models {
            let b = m.to_bools(false);
            assert_eq!(b[0], if b[1] { b[2] } else { b[3] });
        }
    }

    #[test]
    fn test_imply_or_and_imply_iff() {
        let mut s = new_session(4);
        s.imply_or(1.into(), &clause![2, 3]).unwrap();
        s.imply_iff(1.into(), 2.into(), 4.into()).unwrap();
        for m in s.all_solutions(None, &clause![1]) {
            let b = m.unwrap().to_bools(false);
            assert!(b[0] && (b[1] || b[2]) && b[1] == b[3]);
        }
    }

    #[test]
    fn test_imply_iff_and_or() {
        let mut s = new_session(4);
        s.imply_iff_and(1.into(), 2.into(), &clause![3, 4]).unwrap();
        for m in s.all_solutions(None, &[]) {
            let b = m.unwrap().to_bools(false);
            assert!(!b[0] || b[1] == (b[2] && b[3]));
        }
        let mut s = new_session(4);
        s.imply_iff_or(1.into(), 2.into(), &clause![3, 4]).unwrap();
        for m in s.all_solutions(None, &[]) {
            let b = m.unwrap().to_bools(false);
            assert!(!b[0] || b[1] == (b[2] || b[3]));
        }
    }

    #[test]
    fn test_all_solutions_projection() {
        let mut s = new_session(3);
        s.add_clause(&clause![1, 2, 3]).unwrap();
        assert_eq!(2, count_models(&mut s, vec![Variable::from(1)]));
        assert_eq!(SolvingResult::Unsatisfiable, s.solve_with(&clause![1]).unwrap());
    }

    #[test]
    fn test_all_solutions_under_assumptions() {
        let mut s = new_session(3);
        let n = s
            .all_solutions(None, &clause![-1, 2])
            .collect::<Result<Vec<Model>>>()
            .unwrap()
            .len();
        assert_eq!(2, n);
        assert_eq!(SolvingResult::Satisfiable, s.solve_with(&clause![1]).unwrap());
    }

    #[test]
    fn test_all_solutions_with_refutation() {
        let mut s = new_session(2);
        let mut seen = 0;
        for m in s.all_solutions_with(&[], |_| clause![1]) {
            m.unwrap();
            seen += 1;
            if seen > 4 {
                break;
            }
        }
        assert!(seen > 4);
    }

    #[test]
    fn test_all_solutions_stopped_by_budget() {
        let mut s = Session::new(EngineConfig::default()).unwrap();
        add_pigeon_hole_clauses_to_session(&mut s, 9);
        s.set_budget(crate::sat::BudgetKind::Conflicts, 10).unwrap();
        let mut it = s.all_solutions(None, &[]);
        assert!(matches!(
            it.next(),
            Some(Err(SatError::ResourceExhausted(_)))
        ));
        assert!(it.next().is_none());
    }

    #[test]
    fn test_run_with_timeout() {
        let mut s = Session::new(EngineConfig::default()).unwrap();
        add_pigeon_hole_clauses_to_session(&mut s, 12);
        let result = s
            .run_with_timeout(Duration::from_millis(100), |s| s.solve())
            .unwrap()
            .unwrap();
        assert_eq!(SolvingResult::Unknown, result);
        assert!(!s.interrupter().unwrap().is_interrupted());
    }

    #[test]
    fn test_run_with_timeout_fast() {
        let mut s = new_session(2);
        s.add_clause(&clause![1, 2]).unwrap();
        let result = s
            .run_with_timeout(Duration::from_secs(60), |s| s.solve())
            .unwrap()
            .unwrap();
        assert_eq!(SolvingResult::Satisfiable, result);
    }

    #[test]
    fn test_run_with_timeout_unsupported() {
        let mut s = Session::new(EngineConfig::new(EngineKind::Varisat)).unwrap();
        assert!(s
            .run_with_timeout(Duration::from_secs(1), |s| s.n_vars())
            .unwrap_err()
            .is_unsupported());
    }
}
