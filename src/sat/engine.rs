use super::{LiteralCodec, Result, SatError, SolvingResult, Value, Variable};
use std::{
    path::Path,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::{Duration, Instant},
};

/// The kinds of resource ceilings that can be attached to a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BudgetKind {
    /// maximal number of conflicts
    Conflicts,
    /// maximal number of propagations
    Propagations,
    /// maximal number of decisions
    Decisions,
    /// maximal wall-clock time, in milliseconds
    Time,
}

impl BudgetKind {
    /// Returns a human-readable name for this kind.
    pub fn name(self) -> &'static str {
        match self {
            BudgetKind::Conflicts => "conflict budget",
            BudgetKind::Propagations => "propagation budget",
            BudgetKind::Decisions => "decision budget",
            BudgetKind::Time => "time budget",
        }
    }
}

/// The resource ceilings applied to the solve calls of a session.
///
/// Ceilings apply to each solve call independently and persist until cleared.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Budget {
    conflicts: Option<u64>,
    propagations: Option<u64>,
    decisions: Option<u64>,
    time: Option<Duration>,
}

impl Budget {
    /// Sets a ceiling. Time ceilings are given in milliseconds.
    pub fn set(&mut self, kind: BudgetKind, value: u64) {
        match kind {
            BudgetKind::Conflicts => self.conflicts = Some(value),
            BudgetKind::Propagations => self.propagations = Some(value),
            BudgetKind::Decisions => self.decisions = Some(value),
            BudgetKind::Time => self.time = Some(Duration::from_millis(value)),
        }
    }

    /// Removes all the ceilings.
    pub fn clear(&mut self) {
        *self = Budget::default();
    }

    /// Returns the ceiling of the given kind, if any. Time ceilings are given in milliseconds.
    pub fn get(&self, kind: BudgetKind) -> Option<u64> {
        match kind {
            BudgetKind::Conflicts => self.conflicts,
            BudgetKind::Propagations => self.propagations,
            BudgetKind::Decisions => self.decisions,
            BudgetKind::Time => self.time.map(|d| d.as_millis() as u64),
        }
    }

    /// Returns the time ceiling.
    pub fn time(&self) -> Option<Duration> {
        self.time
    }

    /// Returns `true` iff no ceiling is set.
    pub fn is_empty(&self) -> bool {
        *self == Budget::default()
    }

    /// Returns the ceilings that are set.
    pub fn kinds(&self) -> Vec<BudgetKind> {
        [
            BudgetKind::Conflicts,
            BudgetKind::Propagations,
            BudgetKind::Decisions,
            BudgetKind::Time,
        ]
        .into_iter()
        .filter(|k| self.get(*k).is_some())
        .collect()
    }
}

/// A handle used to interrupt the solve calls of a session, possibly from another thread.
///
/// The interruption flag stays raised until it is cleared;
/// while it is raised, every solve call returns [`SolvingResult::Unknown`] as soon as the engine polls it.
#[derive(Debug, Clone, Default)]
pub struct Interrupter(Arc<AtomicBool>);

impl Interrupter {
    /// Raises the interruption flag.
    pub fn interrupt(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    /// Lowers the interruption flag.
    pub fn clear(&self) {
        self.0.store(false, Ordering::Relaxed);
    }

    /// Returns `true` iff the interruption flag is raised.
    pub fn is_interrupted(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }

    pub(crate) fn flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.0)
    }
}

/// The condition polled by engines with a termination callback.
#[derive(Debug, Clone)]
pub(crate) struct StopCondition {
    interrupt: Arc<AtomicBool>,
    deadline: Option<Instant>,
    race_over: Option<Arc<AtomicBool>>,
}

impl StopCondition {
    pub(crate) fn new(interrupt: Arc<AtomicBool>) -> Self {
        Self {
            interrupt,
            deadline: None,
            race_over: None,
        }
    }

    /// Starts the time budget (if any) from now.
    pub(crate) fn arm(&mut self, budget: &Budget) {
        self.deadline = budget.time().map(|d| Instant::now() + d);
    }

    pub(crate) fn with_race(mut self, race_over: Arc<AtomicBool>) -> Self {
        self.race_over = Some(race_over);
        self
    }

    pub(crate) fn should_stop(&self) -> bool {
        self.interrupt.load(Ordering::Relaxed)
            || self
                .race_over
                .as_ref()
                .map(|r| r.load(Ordering::Relaxed))
                .unwrap_or(false)
            || self.deadline.map(|d| Instant::now() >= d).unwrap_or(false)
    }
}

/// Engine statistics that may be queried on a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Statistic {
    /// number of learnt clauses
    Learnts,
    /// number of decisions
    Decisions,
    /// number of propagations
    Propagations,
    /// number of conflicts
    Conflicts,
}

impl Statistic {
    pub(crate) fn operation_name(self) -> &'static str {
        match self {
            Statistic::Learnts => "nLearnts",
            Statistic::Decisions => "decisions",
            Statistic::Propagations => "propagations",
            Statistic::Conflicts => "conflicts",
        }
    }
}

/// When an engine accepts simplification requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimplifyPolicy {
    /// at any point of the session
    Anytime,
    /// only while no solve call has been made
    BeforeFirstSolve,
}

/// The attributes given to a new variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VarOptions {
    /// the preferred polarity when the engine branches on the variable (`None` lets the engine decide)
    pub polarity: Option<bool>,
    /// whether the variable may be chosen as a decision variable
    pub decision: bool,
}

impl Default for VarOptions {
    fn default() -> Self {
        Self {
            polarity: None,
            decision: true,
        }
    }
}

impl VarOptions {
    /// Returns `true` iff these are the default options.
    pub fn is_default(&self) -> bool {
        *self == VarOptions::default()
    }
}

/// The capability set implemented by each engine adapter.
///
/// Literals are exchanged in the representation given by the engine [`codec`](Engine::codec);
/// the session controller converts them and checks them against the allocated variables beforehand.
/// The session controller also checks the state-related preconditions, so adapters may assume that
/// e.g. [`value`](Engine::value) is only called after a satisfiable solve call.
///
/// Operations an engine does not provide keep their default implementation, which returns a [`SatError::Unsupported`] error.
pub trait Engine {
    /// Returns the name of the engine.
    fn name(&self) -> &'static str;

    /// Returns the literal codec of the engine.
    fn codec(&self) -> LiteralCodec;

    /// Returns `true` iff the engine needs the literals of its clauses in canonical order.
    fn sorts_clauses(&self) -> bool {
        false
    }

    /// Returns when the engine accepts simplification requests.
    fn simplify_policy(&self) -> SimplifyPolicy {
        SimplifyPolicy::Anytime
    }

    /// Returns `true` iff the engine honors the given kind of budget.
    fn supports_budget(&self, _kind: BudgetKind) -> bool {
        false
    }

    /// Returns `true` iff the engine polls the interruption flag.
    fn supports_interrupt(&self) -> bool {
        false
    }

    /// Allocates a new variable.
    fn new_var(&mut self, options: VarOptions) -> Result<()>;

    /// Adds a clause, returning `false` if the engine knows the formula is refuted.
    fn add_clause(&mut self, lits: &[i64]) -> Result<bool>;

    /// Solves the formula under the assumptions, honoring the budget.
    fn solve(&mut self, assumptions: &[i64], budget: &Budget) -> Result<SolvingResult>;

    /// Returns the value of a literal in the last model.
    fn value(&mut self, lit: i64) -> Result<Value>;

    /// Returns the engine's own liveness status, if it tracks one.
    fn okay(&self) -> Option<bool> {
        None
    }

    /// Returns the value of a statistic.
    fn statistic(&self, stat: Statistic) -> Result<u64> {
        Err(SatError::unsupported(self.name(), stat.operation_name()))
    }

    /// Sets the preferred polarity of an existing variable.
    fn set_polarity(&mut self, _var: Variable, _polarity: Option<bool>) -> Result<()> {
        Err(SatError::unsupported(self.name(), "setPolarity"))
    }

    /// Sets whether an existing variable may be used as a decision variable.
    fn set_decision(&mut self, _var: Variable, _decision: bool) -> Result<()> {
        Err(SatError::unsupported(self.name(), "setDecision"))
    }

    /// Protects a variable against elimination.
    fn freeze(&mut self, _var: Variable) -> Result<()> {
        Err(SatError::unsupported(self.name(), "freeze"))
    }

    /// Removes the protection set by [`freeze`](Engine::freeze).
    fn melt(&mut self, _var: Variable) -> Result<()> {
        Err(SatError::unsupported(self.name(), "melt"))
    }

    /// Returns `true` iff the variable is frozen.
    fn frozen(&self, _var: Variable) -> Result<bool> {
        Err(SatError::unsupported(self.name(), "frozen"))
    }

    /// Returns `true` iff the variable was eliminated.
    fn is_eliminated(&self, _var: Variable) -> Result<bool> {
        Err(SatError::unsupported(self.name(), "isEliminated"))
    }

    /// Runs the engine simplification, returning `false` if it proves unsatisfiability.
    fn simplify(&mut self) -> Result<bool> {
        Err(SatError::unsupported(self.name(), "simplify"))
    }

    /// Runs a variable elimination pass, returning `false` if it proves unsatisfiability.
    fn eliminate(&mut self, _turn_off_elimination: bool) -> Result<bool> {
        Err(SatError::unsupported(self.name(), "eliminate"))
    }

    /// Returns `true` iff the assumption took part in the last refutation.
    fn failed(&mut self, _lit: i64) -> Result<bool> {
        Err(SatError::unsupported(self.name(), "failed"))
    }

    /// Returns the root-level value of a literal.
    fn fixed(&mut self, _lit: i64) -> Result<Value> {
        Err(SatError::unsupported(self.name(), "fixed"))
    }

    /// Writes the clause database of the engine in the DIMACS CNF format.
    fn write_dimacs(&self, _path: &Path) -> Result<()> {
        Err(SatError::unsupported(self.name(), "toDimacs"))
    }
}

/// Narrows an engine literal to a 32-bit native literal.
pub(crate) fn to_i32(engine: &'static str, code: i64) -> Result<i32> {
    i32::try_from(code).map_err(|_| {
        SatError::invalid_usage(format!(
            "literal code {} exceeds the range of engine {}",
            code, engine
        ))
    })
}

/// Narrows an engine literal to a 32-bit unsigned native literal.
pub(crate) fn to_u32(engine: &'static str, code: i64) -> Result<u32> {
    u32::try_from(code).map_err(|_| {
        SatError::invalid_usage(format!(
            "literal code {} exceeds the range of engine {}",
            code, engine
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_budget_set_get_clear() {
        let mut b = Budget::default();
        assert!(b.is_empty());
        b.set(BudgetKind::Conflicts, 10);
        b.set(BudgetKind::Time, 1500);
        assert_eq!(Some(10), b.get(BudgetKind::Conflicts));
        assert_eq!(None, b.get(BudgetKind::Decisions));
        assert_eq!(Some(1500), b.get(BudgetKind::Time));
        assert_eq!(Some(Duration::from_millis(1500)), b.time());
        assert_eq!(vec![BudgetKind::Conflicts, BudgetKind::Time], b.kinds());
        b.clear();
        assert!(b.is_empty());
    }

    #[test]
    fn test_interrupter() {
        let i = Interrupter::default();
        let other = i.clone();
        assert!(!i.is_interrupted());
        other.interrupt();
        assert!(i.is_interrupted());
        i.clear();
        assert!(!other.is_interrupted());
    }

    #[test]
    fn test_stop_condition_interrupt() {
        let i = Interrupter::default();
        let c = StopCondition::new(i.flag());
        assert!(!c.should_stop());
        i.interrupt();
        assert!(c.should_stop());
    }

    #[test]
    fn test_stop_condition_deadline() {
        let mut c = StopCondition::new(Interrupter::default().flag());
        let mut b = Budget::default();
        b.set(BudgetKind::Time, 0);
        c.arm(&b);
        assert!(c.should_stop());
        c.arm(&Budget::default());
        assert!(!c.should_stop());
    }

    #[test]
    fn test_stop_condition_race() {
        let race = Arc::new(AtomicBool::new(false));
        let c = StopCondition::new(Interrupter::default().flag()).with_race(Arc::clone(&race));
        assert!(!c.should_stop());
        race.store(true, Ordering::Relaxed);
        assert!(c.should_stop());
    }

    #[test]
    fn test_narrowing() {
        assert_eq!(-3, to_i32("e", -3).unwrap());
        assert!(to_i32("e", 1 << 40).unwrap_err().is_invalid_usage());
        assert!(to_u32("e", -1).unwrap_err().is_invalid_usage());
    }
}
