//! Satbridge is a uniform front end to incremental SAT solvers.
//!
//! The [`sat`] module provides sessions driving several SAT engines through a single set of operations;
//! the [`io`] module reads DIMACS formulas and writes solving results in the SAT competition format.

#![warn(missing_docs)]

pub mod io;

pub mod sat;
