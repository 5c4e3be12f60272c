use super::{
    Budget, Engine, LiteralCodec, Result, SatError, SolvingResult, Value, VarOptions,
};
use varisat::{solver::SolverError, ExtendFormula};

const NAME: &str = "varisat";

/// An engine backed by the varisat crate.
///
/// Varisat offers neither budgets nor interruptions, and decides the polarity of its variables by itself.
/// Unconstrained variables may be missing from its models; they are reported as [`Value::Unknown`].
pub struct VarisatSolver {
    solver: varisat::Solver<'static>,
    vars: Vec<varisat::Var>,
    model: Vec<Value>,
    failed: Vec<varisat::Lit>,
}

impl Default for VarisatSolver {
    fn default() -> Self {
        Self::new()
    }
}

impl VarisatSolver {
    /// Builds a new varisat engine.
    pub fn new() -> Self {
        Self {
            solver: varisat::Solver::new(),
            vars: Vec::new(),
            model: Vec::new(),
            failed: Vec::new(),
        }
    }

    fn lit(&self, code: i64) -> Result<varisat::Lit> {
        let var = usize::try_from(code >> 1)
            .ok()
            .and_then(|i| self.vars.get(i))
            .ok_or_else(|| {
                SatError::invalid_usage(format!("no varisat variable for literal code {}", code))
            })?;
        Ok(var.lit(code & 1 == 0))
    }
}

impl Engine for VarisatSolver {
    fn name(&self) -> &'static str {
        NAME
    }

    fn codec(&self) -> LiteralCodec {
        LiteralCodec::Arithmetic
    }

    fn new_var(&mut self, options: VarOptions) -> Result<()> {
        if !options.is_default() {
            return Err(SatError::unsupported(NAME, "variable attributes"));
        }
        let v = self.solver.new_var();
        self.vars.push(v);
        Ok(())
    }

    fn add_clause(&mut self, lits: &[i64]) -> Result<bool> {
        let clause = lits
            .iter()
            .map(|l| self.lit(*l))
            .collect::<Result<Vec<varisat::Lit>>>()?;
        self.solver.add_clause(&clause);
        Ok(true)
    }

    fn solve(&mut self, assumptions: &[i64], _budget: &Budget) -> Result<SolvingResult> {
        let assumptions = assumptions
            .iter()
            .map(|l| self.lit(*l))
            .collect::<Result<Vec<varisat::Lit>>>()?;
        self.solver.assume(&assumptions);
        self.model.clear();
        self.failed.clear();
        match self.solver.solve() {
            Ok(true) => {
                let mut model = vec![Value::Unknown; self.vars.len()];
                for l in self.solver.model().unwrap_or_default() {
                    if let Some(slot) = model.get_mut(l.index()) {
                        *slot = Value::from(l.is_positive());
                    }
                }
                self.model = model;
                Ok(SolvingResult::Satisfiable)
            }
            Ok(false) => {
                self.failed = self.solver.failed_core().unwrap_or(&[]).to_vec();
                Ok(SolvingResult::Unsatisfiable)
            }
            Err(SolverError::Interrupted) => Ok(SolvingResult::Unknown),
            Err(e) => Err(SatError::Engine(e.to_string())),
        }
    }

    fn value(&mut self, lit: i64) -> Result<Value> {
        let l = self.lit(lit)?;
        let v = self.model.get(l.index()).copied().unwrap_or(Value::Unknown);
        Ok(v.with_polarity(l.is_positive()))
    }

    fn failed(&mut self, lit: i64) -> Result<bool> {
        let l = self.lit(lit)?;
        Ok(self.failed.contains(&l))
    }
}
