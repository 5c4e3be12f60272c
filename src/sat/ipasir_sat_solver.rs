use super::{
    engine::{self, StopCondition},
    Budget, BudgetKind, Engine, LiteralCodec, Result, SatError, SolvingResult, Value, VarOptions,
};
use ipasir_loading::{IpasirSolverLoader, IpasirSolverWrapper};
use log::warn;
use std::{
    cell::RefCell,
    path::Path,
    rc::Rc,
    sync::{atomic::AtomicBool, Arc},
};

const NAME: &str = "ipasir";

fn engine_error(e: anyhow::Error) -> SatError {
    SatError::Engine(format!("{:#}", e))
}

/// Returns the signature of the IPASIR solver contained in a shared library.
pub fn ipasir_signature(library: &Path) -> Result<String> {
    IpasirSolverLoader::from_path(library)
        .and_then(|l| l.ipasir_signature())
        .map_err(engine_error)
}

/// A wrapper for solvers that implement the IPASIR interface, loaded from a shared library.
///
/// Literals are passed unchanged (direct codec).
/// When the library provides `ipasir_set_terminate`, time budgets and interruptions are honored.
pub struct IpasirSatSolver {
    solver: IpasirSolverWrapper,
    stop: Option<Rc<RefCell<StopCondition>>>,
}

impl IpasirSatSolver {
    /// Loads the shared library and builds a new solver from it.
    pub fn new(library: &Path, interrupt: Arc<AtomicBool>) -> Result<Self> {
        let mut loader = IpasirSolverLoader::from_path(library).map_err(|e| {
            SatError::Engine(format!(
                "cannot load IPASIR library {}: {:#}",
                library.display(),
                e
            ))
        })?;
        loader.enable_set_terminate(true);
        match loader.new_solver() {
            Ok(mut solver) => {
                let stop = Rc::new(RefCell::new(StopCondition::new(interrupt)));
                let callback_stop = Rc::clone(&stop);
                solver
                    .ipasir_set_terminate(Box::new(move || callback_stop.borrow().should_stop()))
                    .map_err(engine_error)?;
                Ok(Self {
                    solver,
                    stop: Some(stop),
                })
            }
            Err(e) => {
                warn!(
                    "cannot enable the termination callback of {}: {:#}",
                    library.display(),
                    e
                );
                loader.enable_set_terminate(false);
                let solver = loader.new_solver().map_err(engine_error)?;
                Ok(Self { solver, stop: None })
            }
        }
    }

    fn lit(&self, code: i64) -> Result<i32> {
        engine::to_i32(NAME, code)
    }
}

impl Engine for IpasirSatSolver {
    fn name(&self) -> &'static str {
        NAME
    }

    fn codec(&self) -> LiteralCodec {
        LiteralCodec::Direct
    }

    fn supports_budget(&self, kind: BudgetKind) -> bool {
        kind == BudgetKind::Time && self.stop.is_some()
    }

    fn supports_interrupt(&self) -> bool {
        self.stop.is_some()
    }

    fn new_var(&mut self, options: VarOptions) -> Result<()> {
        if options.is_default() {
            Ok(())
        } else {
            Err(SatError::unsupported(NAME, "variable attributes"))
        }
    }

    fn add_clause(&mut self, lits: &[i64]) -> Result<bool> {
        for l in lits {
            let l = self.lit(*l)?;
            self.solver.ipasir_add(l).map_err(engine_error)?;
        }
        self.solver.ipasir_add(0).map_err(engine_error)?;
        Ok(true)
    }

    fn solve(&mut self, assumptions: &[i64], budget: &Budget) -> Result<SolvingResult> {
        for l in assumptions {
            let l = self.lit(*l)?;
            self.solver.ipasir_assume(l).map_err(engine_error)?;
        }
        if let Some(stop) = &self.stop {
            stop.borrow_mut().arm(budget);
        }
        Ok(match self.solver.ipasir_solve().map_err(engine_error)? {
            Some(true) => SolvingResult::Satisfiable,
            Some(false) => SolvingResult::Unsatisfiable,
            None => SolvingResult::Unknown,
        })
    }

    fn value(&mut self, lit: i64) -> Result<Value> {
        let l = self.lit(lit)?;
        self.solver
            .ipasir_val(l.abs())
            .map(|v| Value::from(v).with_polarity(l > 0))
            .map_err(engine_error)
    }

    fn failed(&mut self, lit: i64) -> Result<bool> {
        let l = self.lit(lit)?;
        self.solver.ipasir_failed(l).map_err(engine_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_library() {
        let err = IpasirSatSolver::new(
            Path::new("/path/to/a/missing/libipasir.so"),
            Arc::new(AtomicBool::new(false)),
        )
        .err()
        .unwrap();
        assert!(matches!(err, SatError::Engine(_)));
        assert!(ipasir_signature(Path::new("/path/to/a/missing/libipasir.so")).is_err());
    }

    fn library_from_env() -> Option<std::path::PathBuf> {
        std::env::var_os("SATBRIDGE_IPASIR_LIBRARY").map(std::path::PathBuf::from)
    }

    #[test]
    fn test_solve_with_library() {
        let library = match library_from_env() {
            Some(l) => l,
            None => return,
        };
        let mut s = IpasirSatSolver::new(&library, Arc::new(AtomicBool::new(false))).unwrap();
        s.new_var(VarOptions::default()).unwrap();
        s.new_var(VarOptions::default()).unwrap();
        s.add_clause(&[-1, -2]).unwrap();
        s.add_clause(&[-1, 2]).unwrap();
        assert_eq!(
            SolvingResult::Satisfiable,
            s.solve(&[], &Budget::default()).unwrap()
        );
        assert_eq!(Value::False, s.value(1).unwrap());
        assert_eq!(
            SolvingResult::Unsatisfiable,
            s.solve(&[1], &Budget::default()).unwrap()
        );
        assert!(s.failed(1).unwrap());
    }
}
