use super::{specs, ResponseWriter};
use crate::sat::{Model, Value};
use anyhow::{Context, Result};
use std::io::Write;

const MAX_VALUE_LINE_LEN: usize = 80;

/// A writer for the output format used in the SAT competitions.
///
/// More precisely, the results are written this way:
///   * satisfiable: the line `s SATISFIABLE`, followed by value lines beginning with `v` that list the literals of the model and end with `0`
///   * unsatisfiable: the line `s UNSATISFIABLE`
///   * unknown: the line `s UNKNOWN`
///
/// Unassigned variables are omitted from the value lines.
#[derive(Default)]
pub struct DimacsWriter;

impl ResponseWriter for DimacsWriter {
    fn write_satisfiable(&self, writer: &mut dyn Write, model: &Model) -> Result<()> {
        specs::write_status(writer, "SATISFIABLE")?;
        let context = "while writing a model";
        let mut line = String::from("v");
        for (v, value) in model.iter() {
            let lit = match value {
                Value::True => v as isize,
                Value::False => -(v as isize),
                Value::Unknown => continue,
            };
            let word = lit.to_string();
            if line.len() + 1 + word.len() > MAX_VALUE_LINE_LEN {
                writeln!(writer, "{}", line).context(context)?;
                line = String::from("v");
            }
            line.push(' ');
            line.push_str(&word);
        }
        writeln!(writer, "{} 0", line).context(context)?;
        writer.flush().context(context)
    }

    fn write_unsatisfiable(&self, writer: &mut dyn Write) -> Result<()> {
        specs::write_status(writer, "UNSATISFIABLE")
    }

    fn write_unknown(&self, writer: &mut dyn Write) -> Result<()> {
        specs::write_status(writer, "UNKNOWN")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::BufWriter;

    fn write_with<F>(f: F) -> String
    where
        F: Fn(&DimacsWriter, &mut dyn Write) -> Result<()>,
    {
        let writer = DimacsWriter::default();
        let mut buffer = BufWriter::new(Vec::new());
        f(&writer, &mut buffer).unwrap();
        String::from_utf8(buffer.into_inner().unwrap()).unwrap()
    }

    #[test]
    fn test_write_satisfiable() {
        let model = Model::new(vec![Value::True, Value::False, Value::Unknown, Value::True]);
        assert_eq!(
            "s SATISFIABLE\nv 1 -2 4 0\n",
            write_with(|w, b| w.write_satisfiable(b, &model))
        );
    }

    #[test]
    fn test_write_empty_model() {
        let model = Model::new(vec![]);
        assert_eq!(
            "s SATISFIABLE\nv 0\n",
            write_with(|w, b| w.write_satisfiable(b, &model))
        );
    }

    #[test]
    fn test_write_long_model() {
        let model = Model::new(vec![Value::False; 100]);
        let output = write_with(|w, b| w.write_satisfiable(b, &model));
        let lines = output.lines().collect::<Vec<&str>>();
        assert!(lines.len() > 3);
        assert!(lines.iter().all(|l| l.len() <= MAX_VALUE_LINE_LEN + 2));
        assert!(lines[1..].iter().all(|l| l.starts_with("v ")));
        assert!(lines.last().unwrap().ends_with("-100 0"));
    }

    #[test]
    fn test_write_unsatisfiable() {
        assert_eq!(
            "s UNSATISFIABLE\n",
            write_with(|w, b| w.write_unsatisfiable(b))
        );
    }

    #[test]
    fn test_write_unknown() {
        assert_eq!("s UNKNOWN\n", write_with(|w, b| w.write_unknown(b)));
    }
}
