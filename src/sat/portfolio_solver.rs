use super::{
    engine::StopCondition, BatsatSolver, Budget, BudgetKind, Engine, LiteralCodec, Result,
    SatError, SimplifyPolicy, SolvingResult, Statistic, Value, VarOptions, Variable,
};
use batsat::SolverOpts;
use log::debug;
use std::{
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Arc,
    },
    thread,
};

const NAME: &str = "portfolio";

const SEED_STEP: f64 = 7919.;

const NO_WINNER: usize = usize::MAX;

/// A portfolio of batsat workers racing on the same formula.
///
/// Each worker holds its own copy of the formula and its own heuristics (seeds and initial activities differ).
/// A solve call runs all the workers concurrently; the first one reaching a conclusion stops the others,
/// and its model (or its failed assumptions) becomes the one of the engine.
///
/// Clauses are expected in canonical literal order, and simplification is only allowed before the first solve call.
pub struct PortfolioSolver {
    workers: Vec<BatsatSolver>,
    race_over: Arc<AtomicBool>,
    winner: usize,
}

impl PortfolioSolver {
    /// Builds a portfolio of `n_threads` workers (at least one) derived from the given options.
    pub fn new(options: SolverOpts, n_threads: usize, interrupt: Arc<AtomicBool>) -> Self {
        let race_over = Arc::new(AtomicBool::new(false));
        let workers = (0..n_threads.max(1))
            .map(|i| {
                let mut worker_options = options.clone();
                worker_options.random_seed += i as f64 * SEED_STEP;
                worker_options.rnd_init_act = i > 0;
                let stop =
                    StopCondition::new(Arc::clone(&interrupt)).with_race(Arc::clone(&race_over));
                BatsatSolver::with_stop_condition(worker_options, stop)
            })
            .collect();
        Self {
            workers,
            race_over,
            winner: 0,
        }
    }

    /// Returns the number of workers.
    pub fn n_workers(&self) -> usize {
        self.workers.len()
    }

    fn race(&mut self, assumptions: &[i64], budget: &Budget) -> Result<SolvingResult> {
        let race_over = &self.race_over;
        let winner = AtomicUsize::new(NO_WINNER);
        let results = thread::scope(|s| {
            let handles = self
                .workers
                .iter_mut()
                .enumerate()
                .map(|(i, w)| {
                    let winner = &winner;
                    s.spawn(move || {
                        let r = w.solve(assumptions, budget);
                        if matches!(
                            r,
                            Ok(SolvingResult::Satisfiable | SolvingResult::Unsatisfiable)
                        ) && winner
                            .compare_exchange(NO_WINNER, i, Ordering::SeqCst, Ordering::SeqCst)
                            .is_ok()
                        {
                            race_over.store(true, Ordering::Relaxed);
                        }
                        r
                    })
                })
                .collect::<Vec<_>>();
            handles
                .into_iter()
                .map(|h| {
                    h.join().unwrap_or_else(|_| {
                        Err(SatError::Engine("a portfolio worker panicked".to_string()))
                    })
                })
                .collect::<Vec<_>>()
        });
        match winner.into_inner() {
            NO_WINNER => {
                results.into_iter().collect::<Result<Vec<_>>>()?;
                Ok(SolvingResult::Unknown)
            }
            i => {
                debug!("portfolio worker {} won the race", i);
                self.winner = i;
                results
                    .into_iter()
                    .nth(i)
                    .unwrap_or(Ok(SolvingResult::Unknown))
            }
        }
    }
}

impl Engine for PortfolioSolver {
    fn name(&self) -> &'static str {
        NAME
    }

    fn codec(&self) -> LiteralCodec {
        LiteralCodec::Arithmetic
    }

    fn sorts_clauses(&self) -> bool {
        true
    }

    fn simplify_policy(&self) -> SimplifyPolicy {
        SimplifyPolicy::BeforeFirstSolve
    }

    fn supports_budget(&self, kind: BudgetKind) -> bool {
        matches!(kind, BudgetKind::Conflicts | BudgetKind::Time)
    }

    fn supports_interrupt(&self) -> bool {
        true
    }

    fn new_var(&mut self, options: VarOptions) -> Result<()> {
        self.workers.iter_mut().try_for_each(|w| w.new_var(options))
    }

    fn add_clause(&mut self, lits: &[i64]) -> Result<bool> {
        self.workers
            .iter_mut()
            .try_fold(true, |ok, w| Ok(w.add_clause(lits)? && ok))
    }

    fn solve(&mut self, assumptions: &[i64], budget: &Budget) -> Result<SolvingResult> {
        self.race_over.store(false, Ordering::Relaxed);
        if self.workers.len() == 1 {
            self.winner = 0;
            return self.workers[0].solve(assumptions, budget);
        }
        self.race(assumptions, budget)
    }

    fn value(&mut self, lit: i64) -> Result<Value> {
        self.workers[self.winner].value(lit)
    }

    fn okay(&self) -> Option<bool> {
        Some(self.workers.iter().all(|w| w.okay().unwrap_or(true)))
    }

    fn statistic(&self, stat: Statistic) -> Result<u64> {
        self.workers
            .iter()
            .try_fold(0, |acc, w| Ok(acc + w.statistic(stat)?))
    }

    fn is_eliminated(&self, _var: Variable) -> Result<bool> {
        Ok(false)
    }

    fn simplify(&mut self) -> Result<bool> {
        self.workers
            .iter_mut()
            .try_fold(true, |ok, w| Ok(w.simplify()? && ok))
    }

    fn failed(&mut self, lit: i64) -> Result<bool> {
        self.workers[self.winner].failed(lit)
    }
}
