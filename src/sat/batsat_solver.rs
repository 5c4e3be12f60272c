use super::{
    engine::{self, StopCondition},
    Budget, BudgetKind, Engine, LiteralCodec, Result, SolvingResult, Statistic, Value, VarOptions,
    Variable,
};
use batsat::{lbool, Callbacks, ClauseKind, Lit, SolverInterface, SolverOpts, Var};
use std::sync::{atomic::AtomicBool, Arc};

const NAME: &str = "batsat";

/// The callbacks used to enforce budgets and interruptions in batsat searches.
///
/// Batsat learns exactly one clause per conflict, so the learnt clause notifications drive the conflict budget.
pub(crate) struct BudgetCallbacks {
    stop: StopCondition,
    conflicts_left: Option<u64>,
    n_learnts: u64,
}

impl BudgetCallbacks {
    pub(crate) fn new(stop: StopCondition) -> Self {
        Self {
            stop,
            conflicts_left: None,
            n_learnts: 0,
        }
    }

    fn arm(&mut self, budget: &Budget) {
        self.stop.arm(budget);
        self.conflicts_left = budget.get(BudgetKind::Conflicts);
    }
}

impl Callbacks for BudgetCallbacks {
    fn on_new_clause(&mut self, _c: &[Lit], src: ClauseKind) {
        if src == ClauseKind::Learnt {
            self.n_learnts += 1;
            if let Some(n) = self.conflicts_left.as_mut() {
                *n = n.saturating_sub(1);
            }
        }
    }

    fn stop(&self) -> bool {
        self.conflicts_left == Some(0) || self.stop.should_stop()
    }
}

pub(crate) fn to_batsat_lit(engine: &'static str, code: i64) -> Result<Lit> {
    let code = engine::to_u32(engine, code)?;
    Ok(Lit::new(Var::unsafe_from_idx(code >> 1), code & 1 == 0))
}

pub(crate) fn from_lbool(v: lbool) -> Value {
    if v == lbool::TRUE {
        Value::True
    } else if v == lbool::FALSE {
        Value::False
    } else {
        Value::Unknown
    }
}

pub(crate) fn to_lbool(polarity: Option<bool>) -> lbool {
    polarity.map(lbool::new).unwrap_or(lbool::UNDEF)
}

/// An engine backed by the batsat crate, a CDCL solver of the MiniSat lineage.
///
/// Simplification is available at any time, conflict and time budgets are honored, and the search polls the interruption flag.
/// Polarity and decision attributes can only be given when the variable is created.
pub struct BatsatSolver {
    solver: batsat::Solver<BudgetCallbacks>,
}

impl BatsatSolver {
    /// Builds a new batsat engine with the given options, polling the given interruption flag.
    pub fn new(options: SolverOpts, interrupt: Arc<AtomicBool>) -> Self {
        Self::with_stop_condition(options, StopCondition::new(interrupt))
    }

    pub(crate) fn with_stop_condition(options: SolverOpts, stop: StopCondition) -> Self {
        Self {
            solver: batsat::Solver::new(options, BudgetCallbacks::new(stop)),
        }
    }

    fn lit(&self, code: i64) -> Result<Lit> {
        to_batsat_lit(NAME, code)
    }
}

impl Engine for BatsatSolver {
    fn name(&self) -> &'static str {
        NAME
    }

    fn codec(&self) -> LiteralCodec {
        LiteralCodec::Arithmetic
    }

    fn supports_budget(&self, kind: BudgetKind) -> bool {
        matches!(kind, BudgetKind::Conflicts | BudgetKind::Time)
    }

    fn supports_interrupt(&self) -> bool {
        true
    }

    fn new_var(&mut self, options: VarOptions) -> Result<()> {
        self.solver
            .new_var(to_lbool(options.polarity), options.decision);
        Ok(())
    }

    fn add_clause(&mut self, lits: &[i64]) -> Result<bool> {
        let mut clause = lits
            .iter()
            .map(|l| self.lit(*l))
            .collect::<Result<Vec<Lit>>>()?;
        Ok(self.solver.add_clause_reuse(&mut clause))
    }

    fn solve(&mut self, assumptions: &[i64], budget: &Budget) -> Result<SolvingResult> {
        let assumptions = assumptions
            .iter()
            .map(|l| self.lit(*l))
            .collect::<Result<Vec<Lit>>>()?;
        self.solver.cb_mut().arm(budget);
        let r = self.solver.solve_limited(&assumptions);
        Ok(if r == lbool::TRUE {
            SolvingResult::Satisfiable
        } else if r == lbool::FALSE {
            SolvingResult::Unsatisfiable
        } else {
            SolvingResult::Unknown
        })
    }

    fn value(&mut self, lit: i64) -> Result<Value> {
        let l = self.lit(lit)?;
        Ok(from_lbool(self.solver.value_lit(l)))
    }

    fn okay(&self) -> Option<bool> {
        Some(self.solver.is_ok())
    }

    fn statistic(&self, stat: Statistic) -> Result<u64> {
        Ok(match stat {
            Statistic::Learnts => self.solver.cb().n_learnts,
            Statistic::Decisions => self.solver.num_decisions(),
            Statistic::Propagations => self.solver.num_propagations(),
            Statistic::Conflicts => self.solver.num_conflicts(),
        })
    }

    fn is_eliminated(&self, _var: Variable) -> Result<bool> {
        // batsat never eliminates variables
        Ok(false)
    }

    fn simplify(&mut self) -> Result<bool> {
        Ok(self.solver.simplify())
    }

    fn failed(&mut self, lit: i64) -> Result<bool> {
        let l = self.lit(lit)?;
        Ok(self.solver.unsat_core_contains_lit(!l))
    }

    fn fixed(&mut self, lit: i64) -> Result<Value> {
        let l = self.lit(lit)?;
        Ok(from_lbool(self.solver.value_lvl_0(l)))
    }
}
