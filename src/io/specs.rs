use super::CnfFormula;
use crate::sat::Model;
use anyhow::{Context, Result};
use std::io::{Read, Write};

/// The type of callback functions to call when warnings are raised while parsing a formula.
///
/// The first parameter is the index of the line the warning is related to.
pub type WarningHandler = Box<dyn Fn(usize, String)>;

/// A trait implemented by objects able to read CNF formulas.
pub trait InstanceReader {
    /// Reads a [`CnfFormula`].
    ///
    /// In case warnings are raised, the callback functions registered by [add_warning_handler](Self::add_warning_handler) are triggered.
    ///
    /// # Example
    ///
    /// ```
    /// # use satbridge::io::{CnfFormula, DimacsReader, InstanceReader};
    /// fn read_formula_from_str(s: &str) -> CnfFormula {
    ///     let reader = DimacsReader::default();
    ///     reader.read(&mut s.as_bytes()).expect("invalid DIMACS formula")
    /// }
    /// # read_formula_from_str("p cnf 1 1\n1 0\n");
    /// ```
    fn read(&self, reader: &mut dyn Read) -> Result<CnfFormula>;

    /// Adds a callback function to call when warnings are raised while parsing a formula.
    fn add_warning_handler(&mut self, h: WarningHandler);
}

/// A trait implemented by objects that write the result of a solve call.
pub trait ResponseWriter {
    /// Writes a satisfiable status and the model found by the engine.
    fn write_satisfiable(&self, writer: &mut dyn Write, model: &Model) -> Result<()>;

    /// Writes an unsatisfiable status.
    fn write_unsatisfiable(&self, writer: &mut dyn Write) -> Result<()>;

    /// Writes an unknown status.
    fn write_unknown(&self, writer: &mut dyn Write) -> Result<()>;
}

pub(crate) fn write_status(writer: &mut dyn Write, status: &str) -> Result<()> {
    let context = "while writing a solving status";
    writeln!(writer, "s {}", status).context(context)?;
    writer.flush().context(context)
}
