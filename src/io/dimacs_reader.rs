use super::{CnfFormula, InstanceReader, WarningHandler};
use crate::sat::Literal;
use anyhow::{anyhow, Context, Result};
use std::io::{BufRead, BufReader, Read};

/// A reader for the DIMACS CNF format.
///
/// This object is used to read a [`CnfFormula`] encoded using the DIMACS input format of the SAT competitions.
///
/// # DIMACS format
///
/// The following content defines a formula with three variables and two clauses, `x1 ∨ ¬x3` and `x2 ∨ x3 ∨ ¬x1`.
/// Lines beginning with `c` are comments.
/// Clauses are sequences of non-null literals terminated by `0`; they may span several lines.
///
/// ```text
/// c an example
/// p cnf 3 2
/// 1 -3 0
/// 2 3 -1 0
/// ```
///
/// A warning is raised when the number of clauses differs from the one announced in the preamble.
#[derive(Default)]
pub struct DimacsReader {
    warning_handlers: Vec<WarningHandler>,
}

impl DimacsReader {
    fn warn(&self, line: usize, msg: String) {
        self.warning_handlers.iter().for_each(|h| h(line, msg.clone()));
    }
}

impl InstanceReader for DimacsReader {
    fn read(&self, reader: &mut dyn Read) -> Result<CnfFormula> {
        let br = BufReader::new(reader);
        let mut preamble: Option<(CnfFormula, usize)> = None;
        let mut current_clause = vec![];
        let mut last_line = 0;
        for (i, line) in br.lines().enumerate() {
            let context = || format!("while reading line with index {}", i);
            let l = line.with_context(context)?;
            last_line = i;
            let words = l.split_whitespace().collect::<Vec<&str>>();
            if words.is_empty() || words[0].starts_with('c') {
                continue;
            }
            if preamble.is_none() {
                let (n_vars, n_clauses) = read_preamble(&words).with_context(context)?;
                preamble = Some((CnfFormula::new(n_vars), n_clauses));
                continue;
            }
            if words[0] == "p" {
                return Err(anyhow!("found a second preamble")).with_context(context);
            }
            let formula = match preamble.as_mut() {
                Some((f, _)) => f,
                None => continue,
            };
            for w in words {
                let lit = read_literal(w, formula.n_vars()).with_context(context)?;
                match lit {
                    Some(l) => current_clause.push(l),
                    None => formula.add_clause(std::mem::take(&mut current_clause)),
                }
            }
        }
        let (mut formula, n_clauses) = preamble.ok_or_else(|| anyhow!("missing preamble"))?;
        if !current_clause.is_empty() {
            self.warn(
                last_line,
                "the last clause is not terminated by 0".to_string(),
            );
            formula.add_clause(current_clause);
        }
        if formula.n_clauses() != n_clauses {
            self.warn(
                last_line,
                format!(
                    "the preamble announces {} clause(s), but {} were found",
                    n_clauses,
                    formula.n_clauses()
                ),
            );
        }
        Ok(formula)
    }

    fn add_warning_handler(&mut self, h: WarningHandler) {
        self.warning_handlers.push(h);
    }
}

fn read_preamble(words: &[&str]) -> Result<(usize, usize)> {
    if words.len() != 4 {
        return Err(anyhow!(
            r#"error in preamble; expected 4 words, got {}"#,
            words.len()
        ));
    }
    if words[0] != "p" {
        return Err(anyhow!(
            r#"error in first word of preamble; expected "p", got "{}""#,
            words[0]
        ));
    }
    if words[1] != "cnf" {
        return Err(anyhow!(
            r#"error in second word of preamble; expected "cnf", got "{}""#,
            words[1]
        ));
    }
    let read_count = |word: &str, kind| {
        word.parse::<usize>()
            .map_err(|_| anyhow!("error in preamble: invalid number of {}", kind))
    };
    let n_vars = read_count(words[2], "variables")?;
    let n_clauses = read_count(words[3], "clauses")?;
    Ok((n_vars, n_clauses))
}

fn read_literal(word: &str, n_vars: usize) -> Result<Option<Literal>> {
    match word.parse::<isize>() {
        Ok(0) => Ok(None),
        Ok(n) if n.unsigned_abs() <= n_vars => Ok(Some(Literal::from(n))),
        Ok(n) => Err(anyhow!(
            "literal {} refers to an undeclared variable (the preamble declares {})",
            n,
            n_vars
        )),
        Err(_) => Err(anyhow!(r#"invalid literal "{}""#, word)),
    }
}
