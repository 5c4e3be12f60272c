use super::{
    engine::{self, StopCondition},
    Budget, BudgetKind, Engine, LiteralCodec, Result, SatError, SolvingResult, Value, VarOptions,
    Variable,
};
use std::{
    ffi::{c_char, c_int, c_void, CStr, CString},
    path::Path,
    sync::{atomic::AtomicBool, Arc},
};

// the native library is built and linked by the cadical crate
extern crate cadical as _;

const NAME: &str = "cadical";

extern "C" {
    fn ccadical_signature() -> *const c_char;
    fn ccadical_init() -> *mut c_void;
    fn ccadical_release(ptr: *mut c_void);
    fn ccadical_add(ptr: *mut c_void, lit: c_int);
    fn ccadical_assume(ptr: *mut c_void, lit: c_int);
    fn ccadical_solve(ptr: *mut c_void) -> c_int;
    fn ccadical_val(ptr: *mut c_void, lit: c_int) -> c_int;
    fn ccadical_failed(ptr: *mut c_void, lit: c_int) -> c_int;
    fn ccadical_set_terminate(
        ptr: *mut c_void,
        state: *mut c_void,
        terminate: Option<extern "C" fn(*mut c_void) -> c_int>,
    );
    fn ccadical_set_option(ptr: *mut c_void, name: *const c_char, val: c_int);
    fn ccadical_limit(ptr: *mut c_void, name: *const c_char, limit: c_int);
    fn ccadical_fixed(ptr: *mut c_void, lit: c_int) -> c_int;
    fn ccadical_freeze(ptr: *mut c_void, lit: c_int);
    fn ccadical_frozen(ptr: *mut c_void, lit: c_int) -> c_int;
    fn ccadical_melt(ptr: *mut c_void, lit: c_int);
    fn ccadical_simplify(ptr: *mut c_void) -> c_int;
    fn ccadical_write_dimacs(ptr: *mut c_void, path: *const c_char, min_max_var: c_int) -> *const c_char;
    fn ccadical_reserve(ptr: *mut c_void, min_max_var: c_int);
}

extern "C" fn terminate_cb(state: *mut c_void) -> c_int {
    debug_assert!(!state.is_null());
    let condition = unsafe { &*(state as *const StopCondition) };
    condition.should_stop() as c_int
}

/// Returns the name and version of the embedded CaDiCaL library.
pub fn cadical_signature() -> String {
    unsafe { CStr::from_ptr(ccadical_signature()) }
        .to_string_lossy()
        .into_owned()
}

fn c_string(s: &str) -> Result<CString> {
    CString::new(s).map_err(|e| SatError::invalid_usage(format!("invalid C string: {}", e)))
}

fn clamp_limit(value: u64) -> c_int {
    c_int::try_from(value).unwrap_or(c_int::MAX)
}

/// An engine backed by the CaDiCaL C API.
///
/// Literals are passed unchanged (direct codec).
/// CaDiCaL eliminates variables during its simplification phases, so this engine offers the freeze/melt lifecycle.
/// Turning elimination off freezes every current and future variable.
/// Conflict and decision budgets are native limits, reinstalled before each solve call since CaDiCaL forgets them afterwards;
/// time budgets and interruptions go through the termination callback.
pub struct CadicalSolver {
    ptr: *mut c_void,
    n_vars: c_int,
    stop: Box<StopCondition>,
    freeze_new_vars: bool,
}

impl CadicalSolver {
    /// Builds a new CaDiCaL engine polling the given interruption flag.
    ///
    /// When a seed is given, it is installed as the `seed` option of the solver.
    /// CaDiCaL only accepts options right after its initialization, so this is the only place where they are set.
    pub fn new(seed: Option<i32>, interrupt: Arc<AtomicBool>) -> Result<Self> {
        let ptr = unsafe { ccadical_init() };
        if ptr.is_null() {
            return Err(SatError::ResourceExhausted(
                "cannot allocate a CaDiCaL instance".to_string(),
            ));
        }
        let mut solver = Self {
            ptr,
            n_vars: 0,
            stop: Box::new(StopCondition::new(interrupt)),
            freeze_new_vars: false,
        };
        if let Some(s) = seed {
            solver.set_option("seed", s)?;
        }
        let state = solver.stop.as_mut() as *mut StopCondition as *mut c_void;
        unsafe { ccadical_set_terminate(solver.ptr, state, Some(terminate_cb)) };
        Ok(solver)
    }

    fn set_option(&mut self, name: &str, value: c_int) -> Result<()> {
        let name = c_string(name)?;
        unsafe { ccadical_set_option(self.ptr, name.as_ptr(), value) };
        Ok(())
    }

    fn set_limit(&mut self, name: &str, value: c_int) -> Result<()> {
        let name = c_string(name)?;
        unsafe { ccadical_limit(self.ptr, name.as_ptr(), value) };
        Ok(())
    }

    fn lit(&self, code: i64) -> Result<c_int> {
        engine::to_i32(NAME, code)
    }

    fn var_lit(&self, var: Variable) -> Result<c_int> {
        engine::to_i32(NAME, usize::from(var) as i64)
    }
}

impl Drop for CadicalSolver {
    fn drop(&mut self) {
        unsafe {
            ccadical_set_terminate(self.ptr, std::ptr::null_mut(), None);
            ccadical_release(self.ptr);
        }
    }
}

impl Engine for CadicalSolver {
    fn name(&self) -> &'static str {
        NAME
    }

    fn codec(&self) -> LiteralCodec {
        LiteralCodec::Direct
    }

    fn supports_budget(&self, kind: BudgetKind) -> bool {
        matches!(
            kind,
            BudgetKind::Conflicts | BudgetKind::Decisions | BudgetKind::Time
        )
    }

    fn supports_interrupt(&self) -> bool {
        true
    }

    fn new_var(&mut self, options: VarOptions) -> Result<()> {
        if !options.is_default() {
            return Err(SatError::unsupported(NAME, "variable attributes"));
        }
        if self.n_vars == c_int::MAX {
            return Err(SatError::ResourceExhausted(
                "CaDiCaL variable indices are exhausted".to_string(),
            ));
        }
        self.n_vars += 1;
        unsafe {
            ccadical_reserve(self.ptr, self.n_vars);
            if self.freeze_new_vars {
                ccadical_freeze(self.ptr, self.n_vars);
            }
        }
        Ok(())
    }

    fn add_clause(&mut self, lits: &[i64]) -> Result<bool> {
        let lits = lits
            .iter()
            .map(|l| self.lit(*l))
            .collect::<Result<Vec<c_int>>>()?;
        unsafe {
            lits.iter().for_each(|l| ccadical_add(self.ptr, *l));
            ccadical_add(self.ptr, 0);
        }
        Ok(true)
    }

    fn solve(&mut self, assumptions: &[i64], budget: &Budget) -> Result<SolvingResult> {
        let assumptions = assumptions
            .iter()
            .map(|l| self.lit(*l))
            .collect::<Result<Vec<c_int>>>()?;
        if let Some(n) = budget.get(BudgetKind::Conflicts) {
            self.set_limit("conflicts", clamp_limit(n))?;
        }
        if let Some(n) = budget.get(BudgetKind::Decisions) {
            self.set_limit("decisions", clamp_limit(n))?;
        }
        self.stop.arm(budget);
        let status = unsafe {
            assumptions
                .iter()
                .for_each(|l| ccadical_assume(self.ptr, *l));
            ccadical_solve(self.ptr)
        };
        match status {
            10 => Ok(SolvingResult::Satisfiable),
            20 => Ok(SolvingResult::Unsatisfiable),
            0 => Ok(SolvingResult::Unknown),
            n => Err(SatError::Engine(format!(
                "unexpected CaDiCaL solve status {}",
                n
            ))),
        }
    }

    fn value(&mut self, lit: i64) -> Result<Value> {
        let l = self.lit(lit)?;
        // the sign of the returned value gives the truth value of the variable
        let v = unsafe { ccadical_val(self.ptr, l.abs()) };
        let value = match v.signum() {
            1 => Value::True,
            -1 => Value::False,
            _ => Value::Unknown,
        };
        Ok(value.with_polarity(l > 0))
    }

    fn freeze(&mut self, var: Variable) -> Result<()> {
        let l = self.var_lit(var)?;
        unsafe { ccadical_freeze(self.ptr, l) };
        Ok(())
    }

    fn melt(&mut self, var: Variable) -> Result<()> {
        if !self.frozen(var)? {
            return Err(SatError::invalid_usage(format!(
                "cannot melt variable {} which is not frozen",
                var
            )));
        }
        let l = self.var_lit(var)?;
        unsafe { ccadical_melt(self.ptr, l) };
        Ok(())
    }

    fn frozen(&self, var: Variable) -> Result<bool> {
        let l = self.var_lit(var)?;
        Ok(unsafe { ccadical_frozen(self.ptr, l) } != 0)
    }

    fn simplify(&mut self) -> Result<bool> {
        Ok(unsafe { ccadical_simplify(self.ptr) } != 20)
    }

    fn eliminate(&mut self, turn_off_elimination: bool) -> Result<bool> {
        let ok = self.simplify()?;
        if turn_off_elimination {
            // options are frozen once clauses are added; frozen variables are never eliminated
            for v in 1..=self.n_vars {
                unsafe { ccadical_freeze(self.ptr, v) };
            }
            self.freeze_new_vars = true;
        }
        Ok(ok)
    }

    fn failed(&mut self, lit: i64) -> Result<bool> {
        let l = self.lit(lit)?;
        Ok(unsafe { ccadical_failed(self.ptr, l) } != 0)
    }

    fn fixed(&mut self, lit: i64) -> Result<Value> {
        let l = self.lit(lit)?;
        Ok(match unsafe { ccadical_fixed(self.ptr, l) } {
            1 => Value::True,
            -1 => Value::False,
            _ => Value::Unknown,
        })
    }

    fn write_dimacs(&self, path: &Path) -> Result<()> {
        let path = c_string(&path.to_string_lossy())?;
        let err = unsafe { ccadical_write_dimacs(self.ptr, path.as_ptr(), self.n_vars) };
        if err.is_null() {
            Ok(())
        } else {
            let msg = unsafe { CStr::from_ptr(err) }.to_string_lossy().into_owned();
            Err(SatError::Engine(msg))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_solver(n_vars: usize) -> CadicalSolver {
        let mut s = CadicalSolver::new(None, Arc::new(AtomicBool::new(false))).unwrap();
        (0..n_vars).for_each(|_| s.new_var(VarOptions::default()).unwrap());
        s
    }

    #[test]
    fn test_signature() {
        assert!(cadical_signature().starts_with("cadical"));
    }

    #[test]
    fn test_sat() {
        let mut s = new_solver(2);
        s.add_clause(&[1, 2]).unwrap();
        s.add_clause(&[-1]).unwrap();
        assert_eq!(
            SolvingResult::Satisfiable,
            s.solve(&[], &Budget::default()).unwrap()
        );
        assert_eq!(Value::False, s.value(1).unwrap());
        assert_eq!(Value::True, s.value(-1).unwrap());
        assert_eq!(Value::True, s.value(2).unwrap());
        assert_eq!(Value::False, s.value(-2).unwrap());
    }

    #[test]
    fn test_negative_literal_values() {
        let mut s = new_solver(3);
        s.add_clause(&[-1]).unwrap();
        s.add_clause(&[1, 2]).unwrap();
        s.add_clause(&[-3]).unwrap();
        assert_eq!(
            SolvingResult::Satisfiable,
            s.solve(&[], &Budget::default()).unwrap()
        );
        assert_eq!(Value::False, s.value(1).unwrap());
        assert_eq!(Value::True, s.value(-1).unwrap());
        assert_eq!(Value::True, s.value(2).unwrap());
        assert_eq!(Value::False, s.value(-2).unwrap());
        assert_eq!(Value::True, s.value(-3).unwrap());
    }

    #[test]
    fn test_unsat_and_failed() {
        let mut s = new_solver(2);
        s.add_clause(&[1, 2]).unwrap();
        assert_eq!(
            SolvingResult::Unsatisfiable,
            s.solve(&[-1, -2], &Budget::default()).unwrap()
        );
        assert!(s.failed(-1).unwrap() || s.failed(-2).unwrap());
        assert_eq!(
            SolvingResult::Satisfiable,
            s.solve(&[-1], &Budget::default()).unwrap()
        );
    }

    #[test]
    fn test_freeze_melt() {
        let mut s = new_solver(2);
        let v = Variable::from(2);
        assert!(!s.frozen(v).unwrap());
        s.freeze(v).unwrap();
        assert!(s.frozen(v).unwrap());
        s.melt(v).unwrap();
        assert!(!s.frozen(v).unwrap());
        assert!(s.melt(v).unwrap_err().is_invalid_usage());
    }

    #[test]
    fn test_fixed() {
        let mut s = new_solver(2);
        s.add_clause(&[2]).unwrap();
        s.add_clause(&[-2, -1]).unwrap();
        assert!(s.simplify().unwrap());
        assert_eq!(Value::True, s.fixed(2).unwrap());
        assert_eq!(Value::False, s.fixed(1).unwrap());
    }

    #[test]
    fn test_simplify_unsat() {
        let mut s = new_solver(1);
        s.add_clause(&[1]).unwrap();
        s.add_clause(&[-1]).unwrap();
        assert!(!s.simplify().unwrap());
    }

    #[test]
    fn test_eliminate_keeps_frozen_vars_usable() {
        let mut s = new_solver(3);
        s.freeze(Variable::from(1)).unwrap();
        s.add_clause(&[-1, 2]).unwrap();
        s.add_clause(&[-2, 3]).unwrap();
        assert!(s.eliminate(true).unwrap());
        assert_eq!(
            SolvingResult::Satisfiable,
            s.solve(&[1], &Budget::default()).unwrap()
        );
        assert_eq!(Value::True, s.value(3).unwrap());
    }

    #[test]
    fn test_elimination_turned_off() {
        let mut s = new_solver(1);
        s.add_clause(&[1]).unwrap();
        assert!(s.eliminate(true).unwrap());
        s.new_var(VarOptions::default()).unwrap();
        assert!(s.frozen(Variable::from(1)).unwrap());
        assert!(s.frozen(Variable::from(2)).unwrap());
    }

    #[test]
    fn test_attributes_unsupported() {
        let mut s = new_solver(0);
        let options = VarOptions {
            polarity: Some(true),
            decision: true,
        };
        assert!(s.new_var(options).unwrap_err().is_unsupported());
        assert!(s.is_eliminated(Variable::from(1)).unwrap_err().is_unsupported());
    }

    #[test]
    fn test_interrupted() {
        let flag = Arc::new(AtomicBool::new(true));
        let mut s = CadicalSolver::new(None, Arc::clone(&flag)).unwrap();
        crate::sat::tests::add_pigeon_hole_clauses(&mut s, 9);
        assert_eq!(
            SolvingResult::Unknown,
            s.solve(&[], &Budget::default()).unwrap()
        );
    }
}
