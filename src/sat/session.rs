use super::{
    Budget, BudgetKind, Engine, EngineConfig, Interrupter, Literal, LiteralBatch, Model, Result,
    SatError, SimplifyPolicy, SolvingResult, Statistic, Value, VarOptions, Variable,
};
use log::{debug, info};
use std::{
    fmt::Display,
    fs::File,
    io::{BufWriter, Write},
    path::Path,
};

/// The states of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No variable nor clause was added; engine knobs may still be changed.
    Fresh,
    /// The formula was modified since the last solve call (if any).
    Building,
    /// The last solve call returned [`SolvingResult::Satisfiable`]; the model is available.
    SolvedSat,
    /// The last solve call returned [`SolvingResult::Unsatisfiable`]; failed assumptions are available.
    SolvedUnsat,
    /// The last solve call returned [`SolvingResult::Unknown`].
    SolvedUnknown,
    /// The session was destroyed.
    Destroyed,
}

impl Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            SessionState::Fresh => "FRESH",
            SessionState::Building => "BUILDING",
            SessionState::SolvedSat => "SOLVED_SAT",
            SessionState::SolvedUnsat => "SOLVED_UNSAT",
            SessionState::SolvedUnknown => "SOLVED_UNKNOWN",
            SessionState::Destroyed => "DESTROYED",
        };
        write!(f, "{}", s)
    }
}

/// When plain [`solve`](Session::solve) calls run the engine simplification first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SimpStrategy {
    /// never
    #[default]
    Never,
    /// before the first solve call only
    Once,
    /// before each solve call
    Always,
}

/// A trait for objects observing the solve calls of a session.
pub trait SolvingListener {
    /// Called when a solve call starts.
    fn solving_start(&self, n_vars: usize, n_clauses: usize);

    /// Called when a solve call ends.
    fn solving_end(&self, result: &SolvingResult);
}

/// An incremental SAT session over one engine.
///
/// The session holds the engine-independent part of the protocol:
/// literals are checked against the allocated variables and converted by the engine codec,
/// each operation is checked against the session state,
/// and the budgets, the interruption flag, the pending assumptions and the DIMACS transcript live here.
///
/// ```
/// # use satbridge::sat::{EngineConfig, EngineKind, Session, SolvingResult, Value};
/// let mut session = Session::new(EngineConfig::new(EngineKind::Batsat)).unwrap();
/// let a = session.new_var_default().unwrap();
/// let b = session.new_var_default().unwrap();
/// session.add_binary(a.positive(), b.positive()).unwrap();
/// assert_eq!(
///     SolvingResult::Satisfiable,
///     session.solve_with(&[a.negative()]).unwrap()
/// );
/// assert_eq!(Value::True, session.value(b.positive()).unwrap());
/// assert_eq!(
///     SolvingResult::Unsatisfiable,
///     session.solve_with(&[a.negative(), b.negative()]).unwrap()
/// );
/// ```
pub struct Session {
    config: EngineConfig,
    engine: Box<dyn Engine>,
    state: SessionState,
    n_vars: usize,
    n_clauses: usize,
    budget: Budget,
    interrupter: Interrupter,
    assumptions: Vec<Literal>,
    keep_assumptions: bool,
    n_solves: usize,
    refuted: bool,
    simp_strategy: SimpStrategy,
    elimination_off: bool,
    transcript: Option<Vec<String>>,
    listeners: Vec<Box<dyn SolvingListener>>,
}

impl Session {
    /// Builds a new session, and the engine described by the configuration.
    pub fn new(config: EngineConfig) -> Result<Self> {
        let interrupter = Interrupter::default();
        let engine = config.build(interrupter.flag())?;
        debug!("new session on engine {}", engine.name());
        Ok(Self {
            config,
            engine,
            state: SessionState::Fresh,
            n_vars: 0,
            n_clauses: 0,
            budget: Budget::default(),
            interrupter,
            assumptions: Vec::new(),
            keep_assumptions: false,
            n_solves: 0,
            refuted: false,
            simp_strategy: SimpStrategy::default(),
            elimination_off: false,
            transcript: Some(Vec::new()),
            listeners: Vec::new(),
        })
    }

    /// Returns the number of allocated variables.
    pub fn n_vars(&self) -> usize {
        self.n_vars
    }

    /// Returns the number of clauses added since the creation (or the last reset) of the session.
    pub fn n_clauses(&self) -> usize {
        self.n_clauses
    }

    /// Returns the number of clauses learnt by the engine.
    pub fn n_learnts(&self) -> Result<u64> {
        self.engine.statistic(Statistic::Learnts)
    }

    /// Returns the number of decisions made by the engine.
    pub fn decisions(&self) -> Result<u64> {
        self.engine.statistic(Statistic::Decisions)
    }

    /// Returns the number of propagations made by the engine.
    pub fn propagations(&self) -> Result<u64> {
        self.engine.statistic(Statistic::Propagations)
    }

    /// Returns the number of conflicts encountered by the engine.
    pub fn conflicts(&self) -> Result<u64> {
        self.engine.statistic(Statistic::Conflicts)
    }

    /// Returns `false` iff the formula is known to be unsatisfiable (regardless of any assumption).
    pub fn okay(&self) -> bool {
        !self.refuted && self.engine.okay().unwrap_or(true)
    }

    /// Returns the state of the session.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Returns the name of the underlying engine.
    pub fn engine_name(&self) -> &'static str {
        self.engine.name()
    }

    /// Returns the configuration the engine was built from.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    fn touch(&mut self) {
        self.state = SessionState::Building;
    }

    fn record<F>(&mut self, line: F)
    where
        F: FnOnce() -> String,
    {
        if let Some(t) = self.transcript.as_mut() {
            t.push(line());
        }
    }

    fn check_var(&self, var: Variable) -> Result<()> {
        if usize::from(var) > self.n_vars {
            Err(SatError::invalid_usage(format!(
                "variable {} is not allocated (the engine has {} variable(s))",
                var, self.n_vars
            )))
        } else {
            Ok(())
        }
    }

    fn check_state(&self, expected: SessionState, operation: &str) -> Result<()> {
        if self.state == expected {
            Ok(())
        } else {
            Err(SatError::invalid_usage(format!(
                "{} requires state {}, but the session is in state {}",
                operation, expected, self.state
            )))
        }
    }

    fn encode(&self, lit: Literal) -> Result<i64> {
        self.check_var(lit.var())?;
        Ok(self.engine.codec().encode(lit))
    }

    /// Allocates a new variable with the given attributes and returns it.
    ///
    /// Variables are allocated in order, starting at `1`.
    pub fn new_var(&mut self, options: VarOptions) -> Result<Variable> {
        self.engine.new_var(options)?;
        self.n_vars += 1;
        self.touch();
        Ok(Variable::from(self.n_vars))
    }

    /// Allocates a new variable with the default attributes and returns it.
    pub fn new_var_default(&mut self) -> Result<Variable> {
        self.new_var(VarOptions::default())
    }

    /// Allocates variables until `n` variables are available.
    pub fn reserve_vars(&mut self, n: usize) -> Result<()> {
        while self.n_vars < n {
            self.new_var_default()?;
        }
        Ok(())
    }

    /// Adds a clause.
    ///
    /// Returns `false` if the formula is now known to be unsatisfiable.
    /// Every literal must refer to an allocated variable.
    pub fn add_clause(&mut self, literals: &[Literal]) -> Result<bool> {
        let mut batch = LiteralBatch::build(self.engine.codec(), literals, self.n_vars)?;
        if self.engine.sorts_clauses() {
            batch.sort();
        }
        self.record(|| format_literals(literals, true));
        let engine_ok = self.engine.add_clause(batch.as_slice())?;
        self.n_clauses += 1;
        if literals.is_empty() || !engine_ok {
            self.refuted = true;
        }
        self.touch();
        Ok(self.okay())
    }

    /// Adds the empty clause, making the formula unsatisfiable.
    pub fn add_empty_clause(&mut self) -> Result<bool> {
        self.add_clause(&[])
    }

    /// Adds a unit clause.
    pub fn add_unit(&mut self, l: Literal) -> Result<bool> {
        self.add_clause(&[l])
    }

    /// Adds a binary clause.
    pub fn add_binary(&mut self, l0: Literal, l1: Literal) -> Result<bool> {
        self.add_clause(&[l0, l1])
    }

    /// Adds a ternary clause.
    pub fn add_ternary(&mut self, l0: Literal, l1: Literal, l2: Literal) -> Result<bool> {
        self.add_clause(&[l0, l1, l2])
    }

    /// Sets the preferred polarity of a variable (`None` lets the engine decide).
    pub fn set_polarity(&mut self, var: Variable, polarity: Option<bool>) -> Result<()> {
        self.check_var(var)?;
        self.engine.set_polarity(var, polarity)
    }

    /// Sets whether a variable may be used as a decision variable.
    pub fn set_decision(&mut self, var: Variable, decision: bool) -> Result<()> {
        self.check_var(var)?;
        self.engine.set_decision(var, decision)
    }

    /// Protects a variable against elimination.
    pub fn freeze(&mut self, var: Variable) -> Result<()> {
        self.check_var(var)?;
        self.engine.freeze(var)
    }

    /// Removes the protection set by [`freeze`](Self::freeze).
    ///
    /// Melting a variable that is not frozen is an [`InvalidUsage`](SatError::InvalidUsage) error.
    pub fn melt(&mut self, var: Variable) -> Result<()> {
        self.check_var(var)?;
        self.engine.melt(var)
    }

    /// Returns `true` iff the variable is frozen.
    pub fn frozen(&self, var: Variable) -> Result<bool> {
        self.check_var(var)?;
        self.engine.frozen(var)
    }

    /// Returns `true` iff the variable was eliminated by the engine.
    pub fn is_eliminated(&self, var: Variable) -> Result<bool> {
        self.check_var(var)?;
        self.engine.is_eliminated(var)
    }

    /// Adds a comment line to the DIMACS transcript.
    pub fn comment(&mut self, text: &str) {
        self.record(|| format!("c {}", text));
    }

    /// Runs the engine simplification.
    ///
    /// Returns `false` if the simplification proves the formula unsatisfiable.
    /// Engines that only simplify before the first solve call return an [`InvalidUsage`](SatError::InvalidUsage) error afterwards.
    pub fn simplify(&mut self) -> Result<bool> {
        if self.engine.simplify_policy() == SimplifyPolicy::BeforeFirstSolve && self.n_solves > 0 {
            return Err(SatError::invalid_usage(format!(
                "engine {} cannot simplify after a solve call",
                self.engine.name()
            )));
        }
        let ok = self.engine.simplify()?;
        if !ok {
            self.refuted = true;
        }
        self.touch();
        Ok(ok)
    }

    /// Runs a variable elimination pass.
    ///
    /// If `turn_off_elimination` is `true`, elimination is disabled afterwards, and further calls are [`InvalidUsage`](SatError::InvalidUsage) errors.
    pub fn eliminate(&mut self, turn_off_elimination: bool) -> Result<bool> {
        if self.elimination_off {
            return Err(SatError::invalid_usage(
                "elimination was turned off by a previous call",
            ));
        }
        let ok = self.engine.eliminate(turn_off_elimination)?;
        if turn_off_elimination {
            self.elimination_off = true;
        }
        if !ok {
            self.refuted = true;
        }
        self.touch();
        Ok(ok)
    }

    /// Sets a resource ceiling for the next solve calls (time ceilings are given in milliseconds).
    pub fn set_budget(&mut self, kind: BudgetKind, value: u64) -> Result<()> {
        if !self.engine.supports_budget(kind) {
            return Err(SatError::unsupported(self.engine.name(), kind.name()));
        }
        debug!("setting {} to {}", kind.name(), value);
        self.budget.set(kind, value);
        Ok(())
    }

    /// Removes all the resource ceilings.
    pub fn clear_budget(&mut self) {
        self.budget.clear();
    }

    /// Returns the resource ceilings.
    pub fn budget(&self) -> &Budget {
        &self.budget
    }

    /// Raises the interruption flag.
    ///
    /// The flag stays raised until [`clear_interrupt`](Self::clear_interrupt) is called.
    pub fn interrupt(&self) -> Result<()> {
        self.interrupter()?.interrupt();
        Ok(())
    }

    /// Lowers the interruption flag.
    pub fn clear_interrupt(&self) {
        self.interrupter.clear();
    }

    /// Returns a handle that can raise the interruption flag from another thread.
    pub fn interrupter(&self) -> Result<Interrupter> {
        if self.engine.supports_interrupt() {
            Ok(self.interrupter.clone())
        } else {
            Err(SatError::unsupported(self.engine.name(), "interrupt"))
        }
    }

    fn reconfigure<F>(&mut self, operation: &str, f: F) -> Result<()>
    where
        F: FnOnce(EngineConfig) -> EngineConfig,
    {
        self.check_state(SessionState::Fresh, operation)?;
        let config = f(self.config.clone());
        let engine = config.build(self.interrupter.flag())?;
        debug!("engine {} rebuilt with {:?}", engine.name(), config);
        self.engine = engine;
        self.config = config;
        Ok(())
    }

    /// Sets the random seed of the engine. Only allowed in state [`Fresh`](SessionState::Fresh).
    pub fn set_random_seed(&mut self, seed: f64) -> Result<()> {
        self.reconfigure("setRandomSeed", |c| c.with_seed(seed))
    }

    /// Sets the frequency of random decisions of the engine. Only allowed in state [`Fresh`](SessionState::Fresh).
    pub fn set_random_var_freq(&mut self, freq: f64) -> Result<()> {
        self.reconfigure("setRandomVarFreq", |c| c.with_random_var_freq(freq))
    }

    /// Sets the number of threads of the engine. Only allowed in state [`Fresh`](SessionState::Fresh).
    pub fn set_thread_count(&mut self, threads: usize) -> Result<()> {
        self.reconfigure("setThreadCount", |c| c.with_threads(threads))
    }

    /// Sets when plain solve calls simplify the formula first.
    pub fn set_simp_strategy(&mut self, strategy: SimpStrategy) {
        self.simp_strategy = strategy;
    }

    /// Sets whether the pending assumptions survive solve calls.
    pub fn set_keep_assumptions(&mut self, keep: bool) {
        self.keep_assumptions = keep;
    }

    /// Enables or disables the DIMACS transcript. Disabling it drops the recorded lines.
    pub fn set_transcript(&mut self, enabled: bool) {
        match (enabled, self.transcript.is_some()) {
            (true, false) => self.transcript = Some(Vec::new()),
            (false, true) => self.transcript = None,
            _ => {}
        }
    }

    /// Drops the engine and rebuilds it from the configuration.
    ///
    /// The session goes back to state [`Fresh`](SessionState::Fresh); budgets, interruption flag and listeners are kept.
    pub fn reset(&mut self) -> Result<()> {
        self.engine = self.config.build(self.interrupter.flag())?;
        self.state = SessionState::Fresh;
        self.n_vars = 0;
        self.n_clauses = 0;
        self.assumptions.clear();
        self.n_solves = 0;
        self.refuted = false;
        self.elimination_off = false;
        if let Some(t) = self.transcript.as_mut() {
            t.clear();
        }
        debug!("session on engine {} was reset", self.engine.name());
        Ok(())
    }

    /// Adds a listener that is notified of the solve calls.
    pub fn add_listener(&mut self, listener: Box<dyn SolvingListener>) {
        self.listeners.push(listener);
    }

    /// Adds assumptions for the next solve call.
    ///
    /// The order of the assumptions is preserved.
    pub fn assume(&mut self, literals: &[Literal]) -> Result<()> {
        literals.iter().try_for_each(|l| self.check_var(l.var()))?;
        self.assumptions.extend_from_slice(literals);
        Ok(())
    }

    /// Removes the pending assumptions.
    pub fn clear_assumptions(&mut self) {
        self.assumptions.clear();
    }

    /// Returns the pending assumptions.
    pub fn assumptions(&self) -> &[Literal] {
        &self.assumptions
    }

    /// Solves the formula under the pending assumptions, following the simplification strategy.
    pub fn solve(&mut self) -> Result<SolvingResult> {
        let simplify = match self.simp_strategy {
            SimpStrategy::Never => false,
            SimpStrategy::Once => self.n_solves == 0,
            SimpStrategy::Always => true,
        };
        if simplify {
            self.strategy_simplify()?;
        }
        self.solve_pending()
    }

    /// Adds assumptions and solves the formula under the pending assumptions.
    pub fn solve_with(&mut self, assumptions: &[Literal]) -> Result<SolvingResult> {
        self.assume(assumptions)?;
        self.solve()
    }

    /// Solves the formula under the pending assumptions, simplifying it first if `simplify` is `true`.
    pub fn solve_with_simp(&mut self, simplify: bool) -> Result<SolvingResult> {
        if simplify && !self.refuted {
            self.simplify()?;
        }
        self.solve_pending()
    }

    fn strategy_simplify(&mut self) -> Result<()> {
        if self.refuted
            || (self.engine.simplify_policy() == SimplifyPolicy::BeforeFirstSolve
                && self.n_solves > 0)
        {
            return Ok(());
        }
        match self.simplify() {
            Err(SatError::Unsupported { .. }) => {
                debug!("engine {} does not simplify", self.engine.name());
                Ok(())
            }
            r => r.map(|_| ()),
        }
    }

    fn solve_pending(&mut self) -> Result<SolvingResult> {
        let assumptions = if self.keep_assumptions {
            self.assumptions.clone()
        } else {
            std::mem::take(&mut self.assumptions)
        };
        let batch = match LiteralBatch::build(self.engine.codec(), &assumptions, self.n_vars) {
            Ok(b) => b,
            Err(e) => {
                self.restore_assumptions(assumptions);
                return Err(e);
            }
        };
        debug!("solve(assumptions = [{}])", format_literals(&assumptions, false));
        self.record(|| format!("c solve {}", format_literals(&assumptions, false)));
        self.listeners
            .iter()
            .for_each(|l| l.solving_start(self.n_vars, self.n_clauses));
        let result = match self.engine.solve(batch.as_slice(), &self.budget) {
            Ok(r) => r,
            Err(e) => {
                self.touch();
                self.restore_assumptions(assumptions);
                return Err(e);
            }
        };
        self.n_solves += 1;
        if result == SolvingResult::Unsatisfiable && assumptions.is_empty() {
            self.refuted = true;
        }
        self.state = match result {
            SolvingResult::Satisfiable => SessionState::SolvedSat,
            SolvingResult::Unsatisfiable => SessionState::SolvedUnsat,
            SolvingResult::Unknown => SessionState::SolvedUnknown,
        };
        if self.interrupter.is_interrupted() && result == SolvingResult::Unknown {
            info!("solve call interrupted");
        }
        debug!("solve result: {}", result);
        self.listeners.iter().for_each(|l| l.solving_end(&result));
        Ok(result)
    }

    fn restore_assumptions(&mut self, assumptions: Vec<Literal>) {
        if !self.keep_assumptions {
            self.assumptions = assumptions;
        }
    }

    /// Returns the value of a literal in the model. Only allowed in state [`SolvedSat`](SessionState::SolvedSat).
    pub fn value(&mut self, lit: Literal) -> Result<Value> {
        self.check_state(SessionState::SolvedSat, "value")?;
        let code = self.encode(lit)?;
        self.engine.value(code)
    }

    /// Returns the model. Only allowed in state [`SolvedSat`](SessionState::SolvedSat).
    pub fn model(&mut self) -> Result<Model> {
        self.check_state(SessionState::SolvedSat, "model")?;
        let codec = self.engine.codec();
        let values = (1..=self.n_vars)
            .map(|v| self.engine.value(codec.encode(Variable::from(v).positive())))
            .collect::<Result<Vec<Value>>>()?;
        Ok(Model::new(values))
    }

    /// Returns `true` iff the assumption took part in the refutation.
    /// Only allowed in state [`SolvedUnsat`](SessionState::SolvedUnsat).
    pub fn failed(&mut self, lit: Literal) -> Result<bool> {
        self.check_state(SessionState::SolvedUnsat, "failed")?;
        let code = self.encode(lit)?;
        self.engine.failed(code)
    }

    /// Returns the value of a literal implied at the root level.
    pub fn fixed(&mut self, lit: Literal) -> Result<Value> {
        let code = self.encode(lit)?;
        self.engine.fixed(code)
    }

    /// Writes the formula in the DIMACS CNF format.
    ///
    /// Engines with a native export write their own clause database;
    /// the DIMACS transcript of the session is written otherwise.
    pub fn to_dimacs(&self, path: &Path) -> Result<()> {
        match self.engine.write_dimacs(path) {
            Err(SatError::Unsupported { engine, operation }) => match &self.transcript {
                Some(t) => self.write_transcript(path, t),
                None => Err(SatError::Unsupported { engine, operation }),
            },
            r => r,
        }
    }

    fn write_transcript(&self, path: &Path, transcript: &[String]) -> Result<()> {
        let mut writer = BufWriter::new(File::create(path)?);
        writeln!(writer, "p cnf {} {}", self.n_vars, self.n_clauses)?;
        for line in transcript {
            writeln!(writer, "{}", line)?;
        }
        writer.flush()?;
        Ok(())
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        debug!("dropping session on engine {}", self.engine.name());
    }
}

fn format_literals(literals: &[Literal], terminated: bool) -> String {
    let mut s = literals
        .iter()
        .map(|l| l.to_string())
        .collect::<Vec<String>>()
        .join(" ");
    if terminated {
        if !s.is_empty() {
            s.push(' ');
        }
        s.push('0');
    }
    s
}
