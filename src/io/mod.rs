//! Objects used to read CNF formulas and write the results of solve calls.

mod cnf_formula;
pub use cnf_formula::CnfFormula;

mod dimacs_reader;
pub use dimacs_reader::DimacsReader;

mod dimacs_writer;
pub use dimacs_writer::DimacsWriter;

mod specs;
pub use specs::InstanceReader;
pub use specs::ResponseWriter;
pub use specs::WarningHandler;
