use super::{Budget, Engine, LiteralCodec, Result, SatError, SolvingResult, Value, VarOptions};
use std::io::{BufRead, BufReader, Cursor, Read};

/// The function used by a [`BufferedSatSolver`] to solve an instance.
///
/// It receives the whole instance in the DIMACS format and returns the SAT competition output of a solver.
pub type SolvingFn = dyn Fn(DimacsInstanceRead) -> Result<Box<dyn Read>>;

/// A reader over a DIMACS instance built by a [`BufferedSatSolver`].
///
/// Assumptions are appended to the clauses as unit clauses.
pub struct DimacsInstanceRead {
    preamble: Cursor<String>,
    clauses: Cursor<String>,
    assumptions: Cursor<String>,
}

impl Read for DimacsInstanceRead {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        for part in [&mut self.preamble, &mut self.clauses, &mut self.assumptions] {
            let r = part.read(buf)?;
            if r > 0 {
                return Ok(r);
            }
        }
        Ok(0)
    }
}

const DEFAULT_BUFFER_CAP: usize = 1 << 20;

const NAME: &str = "external";

/// An engine that buffers the formula as DIMACS text and delegates each solve call to a function.
///
/// Each solve call sends the whole formula again; nothing is kept between two calls.
/// Literals are passed unchanged (direct codec).
pub struct BufferedSatSolver {
    n_vars: usize,
    n_clauses: usize,
    clauses: String,
    solving_fn: Box<SolvingFn>,
    model: Vec<Value>,
}

impl BufferedSatSolver {
    /// Builds a new buffered engine given its solving function.
    pub fn new(solving_fn: Box<SolvingFn>) -> Self {
        Self {
            n_vars: 0,
            n_clauses: 0,
            clauses: String::with_capacity(DEFAULT_BUFFER_CAP),
            solving_fn,
            model: Vec::new(),
        }
    }

    fn read_output(&mut self, solver_output: Box<dyn Read>) -> Result<SolvingResult> {
        let context = "error while reading solving function output";
        let output_error = |msg: String| SatError::Engine(format!("{}: {}", context, msg));
        let mut status = None;
        let mut assignment = vec![Value::Unknown; self.n_vars];
        let mut assignment_line_seen = false;
        let mut assignment_line_end = false;
        for line in BufReader::new(solver_output).lines() {
            let line = line?;
            if line == "s SATISFIABLE" || line == "s UNSATISFIABLE" || line == "s UNKNOWN" {
                if status.is_some() {
                    return Err(output_error("multiple status lines".to_string()));
                }
                status = Some(line);
            } else if line.starts_with("v ") {
                assignment_line_seen = true;
                for w in line.split_ascii_whitespace().skip(1) {
                    let n = w
                        .parse::<isize>()
                        .map_err(|_| output_error(format!(r#""{}" is not a literal"#, w)))?;
                    if n == 0 {
                        if assignment_line_end {
                            return Err(output_error("multiple zeroes on value line".to_string()));
                        }
                        assignment_line_end = true;
                    } else {
                        let v = n.unsigned_abs() - 1;
                        if v >= self.n_vars {
                            return Err(output_error(
                                "a variable in value line is out of bounds".to_string(),
                            ));
                        }
                        assignment[v] = Value::from(n > 0);
                    }
                }
            } else if !line.starts_with("c ") && line != "c" && line != "v" && !line.is_empty() {
                return Err(output_error(format!(r#"unexpected line "{}""#, line)));
            }
        }
        Ok(match status.as_deref() {
            Some("s SATISFIABLE") if assignment_line_seen => {
                self.model = assignment;
                SolvingResult::Satisfiable
            }
            Some("s UNSATISFIABLE") => SolvingResult::Unsatisfiable,
            _ => SolvingResult::Unknown,
        })
    }
}

impl Engine for BufferedSatSolver {
    fn name(&self) -> &'static str {
        NAME
    }

    fn codec(&self) -> LiteralCodec {
        LiteralCodec::Direct
    }

    fn new_var(&mut self, options: VarOptions) -> Result<()> {
        if !options.is_default() {
            return Err(SatError::unsupported(NAME, "variable attributes"));
        }
        self.n_vars += 1;
        Ok(())
    }

    fn add_clause(&mut self, lits: &[i64]) -> Result<bool> {
        lits.iter().for_each(|l| {
            self.clauses.push_str(&l.to_string());
            self.clauses.push(' ');
        });
        self.clauses.push_str("0\n");
        self.n_clauses += 1;
        Ok(true)
    }

    fn solve(&mut self, assumptions: &[i64], _budget: &Budget) -> Result<SolvingResult> {
        self.model.clear();
        let preamble = format!(
            "p cnf {} {}\n",
            self.n_vars,
            self.n_clauses + assumptions.len()
        );
        let assumptions = assumptions.iter().fold(String::new(), |mut acc, a| {
            acc.push_str(&format!("{} 0\n", a));
            acc
        });
        let instance_reader = DimacsInstanceRead {
            preamble: Cursor::new(preamble),
            clauses: Cursor::new(self.clauses.clone()),
            assumptions: Cursor::new(assumptions),
        };
        let solver_output = (self.solving_fn)(instance_reader)?;
        self.read_output(solver_output)
    }

    fn value(&mut self, lit: i64) -> Result<Value> {
        let index = (lit.unsigned_abs() - 1) as usize;
        let v = self.model.get(index).copied().unwrap_or(Value::Unknown);
        Ok(v.with_polarity(lit > 0))
    }
}
