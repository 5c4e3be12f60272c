use super::{
    buffered_sat_solver::{BufferedSatSolver, DimacsInstanceRead},
    Budget, Engine, LiteralCodec, Result, SatError, SolvingResult, Value, VarOptions,
};
use log::debug;
use std::{
    io::{Cursor, Read, Write},
    process::{Command, Stdio},
};

/// A SAT solver which execution is made by a system command.
///
/// The system command is composed by an executable program, and a potential list of CLI arguments.
///
/// The SAT solver must read from the standard input (if it does not by default, this may be possible with the right CLI arguments).
/// The input and output formats must follow the ones from the SAT competitions.
pub struct ExternalSatSolver {
    buffered_sat_solver: BufferedSatSolver,
}

impl ExternalSatSolver {
    /// Builds a new external SAT solver.
    ///
    /// The `program` argument is the path from a directory in execution path to the software to execute.
    /// The `options` parameter is the CLI options to provide to the software under execution.
    ///
    /// # Example
    ///
    /// ```no_run
    /// # use satbridge::sat::{EngineConfig, EngineKind, EngineRegistry};
    /// let mut registry = EngineRegistry::default();
    /// let handle = registry
    ///     .create(EngineConfig::new(EngineKind::External {
    ///         program: "/home/me/my_solver".to_string(),
    ///         options: vec!["-i".to_string(), "/dev/stdin".to_string()],
    ///     }))
    ///     .unwrap();
    /// let session = registry.session_mut(handle).unwrap();
    /// session.reserve_vars(2).unwrap();
    /// session.add_binary((-1).into(), (-2).into()).unwrap();
    /// session.add_binary((-1).into(), 2.into()).unwrap();
    /// session.solve().unwrap();
    /// ```
    pub fn new(program: String, options: Vec<String>) -> Self {
        Self {
            buffered_sat_solver: BufferedSatSolver::new(Box::new(move |r| {
                exec_solver(r, &program, &options)
            })),
        }
    }
}

impl Engine for ExternalSatSolver {
    fn name(&self) -> &'static str {
        self.buffered_sat_solver.name()
    }

    fn codec(&self) -> LiteralCodec {
        self.buffered_sat_solver.codec()
    }

    fn new_var(&mut self, options: VarOptions) -> Result<()> {
        self.buffered_sat_solver.new_var(options)
    }

    fn add_clause(&mut self, lits: &[i64]) -> Result<bool> {
        self.buffered_sat_solver.add_clause(lits)
    }

    fn solve(&mut self, assumptions: &[i64], budget: &Budget) -> Result<SolvingResult> {
        self.buffered_sat_solver.solve(assumptions, budget)
    }

    fn value(&mut self, lit: i64) -> Result<Value> {
        self.buffered_sat_solver.value(lit)
    }
}

fn exec_solver(
    mut reader: DimacsInstanceRead,
    program: &str,
    options: &[String],
) -> Result<Box<dyn Read>> {
    debug!("running external solver {} {:?}", program, options);
    let mut child = Command::new(program)
        .args(options)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .spawn()
        .map_err(|e| SatError::Engine(format!("cannot spawn {}: {}", program, e)))?;
    let mut stdin = child
        .stdin
        .take()
        .ok_or_else(|| SatError::Engine(format!("cannot open the stdin of {}", program)))?;
    let writer = std::thread::spawn(move || {
        let mut buffer = String::new();
        reader.read_to_string(&mut buffer)?;
        // the child may exit without reading its input
        match stdin.write_all(buffer.as_bytes()) {
            Err(e) if e.kind() == std::io::ErrorKind::BrokenPipe => Ok(()),
            r => r,
        }
    });
    let output = child.wait_with_output()?;
    writer
        .join()
        .map_err(|_| SatError::Engine("the input writer thread panicked".to_string()))??;
    Ok(Box::new(Cursor::new(output.stdout)))
}
