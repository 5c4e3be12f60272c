use super::{cli_manager, command::Command, common};
use anyhow::{anyhow, Context, Result};
use clap::{App, AppSettings, Arg, ArgMatches, SubCommand};
use log::info;
use satbridge::{
    io::{DimacsWriter, ResponseWriter},
    sat::{BudgetKind, Literal, Session, SimpStrategy, SolvingResult},
};
use std::path::Path;

const CMD_NAME: &str = "solve";

const ARG_ASSUME: &str = "ASSUME";
const ARG_CONFLICTS: &str = "CONFLICTS";
const ARG_PROPAGATIONS: &str = "PROPAGATIONS";
const ARG_DECISIONS: &str = "DECISIONS";
const ARG_TIME_LIMIT: &str = "TIME_LIMIT";
const ARG_SIMP: &str = "SIMP";
const ARG_DUMP_DIMACS: &str = "DUMP_DIMACS";

const BUDGET_ARGS: [(&str, &str, BudgetKind); 4] = [
    (ARG_CONFLICTS, "conflicts", BudgetKind::Conflicts),
    (ARG_PROPAGATIONS, "propagations", BudgetKind::Propagations),
    (ARG_DECISIONS, "decisions", BudgetKind::Decisions),
    (ARG_TIME_LIMIT, "time-limit", BudgetKind::Time),
];

pub(crate) struct SolveCommand;

impl SolveCommand {
    pub(crate) fn new() -> Self {
        SolveCommand
    }
}

impl<'a> Command<'a> for SolveCommand {
    fn name(&self) -> &str {
        CMD_NAME
    }

    fn clap_subcommand(&self) -> App<'a, 'a> {
        let budget_args = BUDGET_ARGS.into_iter().map(|(name, long, kind)| {
            let help = match kind {
                BudgetKind::Time => "the time limit of the solve call, in seconds",
                BudgetKind::Conflicts => "the maximal number of conflicts of the solve call",
                BudgetKind::Propagations => "the maximal number of propagations of the solve call",
                BudgetKind::Decisions => "the maximal number of decisions of the solve call",
            };
            Arg::with_name(name)
                .long(long)
                .empty_values(false)
                .multiple(false)
                .help(help)
                .required(false)
        });
        SubCommand::with_name(CMD_NAME)
            .about("Solves a DIMACS CNF formula")
            .setting(AppSettings::DisableVersion)
            .arg(common::input_args())
            .args(&common::engine_args())
            .args(&budget_args.collect::<Vec<Arg>>())
            .arg(
                Arg::with_name(ARG_ASSUME)
                    .long("assume")
                    .empty_values(false)
                    .multiple(true)
                    .number_of_values(1)
                    .use_delimiter(true)
                    .allow_hyphen_values(true)
                    .help("the literals to assume, separated by commas")
                    .required(false),
            )
            .arg(
                Arg::with_name(ARG_SIMP)
                    .long("simp")
                    .empty_values(false)
                    .multiple(false)
                    .possible_values(&["never", "once", "always"])
                    .default_value("never")
                    .help("when the engine simplifies the formula before solving")
                    .required(false),
            )
            .arg(
                Arg::with_name(ARG_DUMP_DIMACS)
                    .long("dump-dimacs")
                    .empty_values(false)
                    .multiple(false)
                    .help("a path to write the formula held by the session to")
                    .required(false),
            )
            .arg(cli_manager::logging_level_cli_arg())
    }

    fn execute(&self, arg_matches: &ArgMatches<'_>) -> Result<()> {
        let file = arg_matches
            .value_of(common::ARG_INPUT)
            .ok_or_else(|| anyhow!("missing input file"))?;
        let formula = common::read_file_path(file)?;
        let config = common::create_engine_config(arg_matches)?;
        let mut session = Session::new(config).context("while creating the session")?;
        session.add_listener(Box::<common::SatSolvingLogger>::default());
        set_budget(&mut session, arg_matches)?;
        session.set_simp_strategy(match arg_matches.value_of(ARG_SIMP) {
            Some("once") => SimpStrategy::Once,
            Some("always") => SimpStrategy::Always,
            _ => SimpStrategy::Never,
        });
        formula
            .add_to(&mut session)
            .context("while loading the formula")?;
        let assumptions = read_assumptions(arg_matches, formula.n_vars())?;
        if let Some(path) = arg_matches.value_of(ARG_DUMP_DIMACS) {
            session
                .to_dimacs(Path::new(path))
                .with_context(|| format!(r#"while writing the formula to "{}""#, path))?;
            info!("formula written to {:?}", path);
        }
        let result = session
            .solve_with(&assumptions)
            .context("while solving the formula")?;
        let writer = DimacsWriter::default();
        let mut out = std::io::stdout();
        match result {
            SolvingResult::Satisfiable => {
                let model = session.model().context("while reading the model")?;
                writer.write_satisfiable(&mut out, &model)
            }
            SolvingResult::Unsatisfiable => {
                log_failed_assumptions(&mut session, &assumptions);
                writer.write_unsatisfiable(&mut out)
            }
            SolvingResult::Unknown => writer.write_unknown(&mut out),
        }
    }
}

fn set_budget(session: &mut Session, arg_matches: &ArgMatches<'_>) -> Result<()> {
    for (name, long, kind) in BUDGET_ARGS {
        if let Some(value) = common::parse_value::<u64>(arg_matches, name)
            .with_context(|| format!("while reading the --{} option", long))?
        {
            let value = match kind {
                BudgetKind::Time => value.saturating_mul(1000),
                _ => value,
            };
            session
                .set_budget(kind, value)
                .with_context(|| format!("while setting the {} budget", kind.name()))?;
        }
    }
    Ok(())
}

fn read_assumptions(arg_matches: &ArgMatches<'_>, n_vars: usize) -> Result<Vec<Literal>> {
    arg_matches
        .values_of(ARG_ASSUME)
        .map(|values| {
            values
                .map(|v| {
                    let context = || format!(r#"while reading the assumption "{}""#, v);
                    let n = v
                        .trim()
                        .parse::<isize>()
                        .map_err(|e| anyhow!("{}", e))
                        .with_context(context)?;
                    let l = Literal::try_new(n).with_context(context)?;
                    if l.var().index() >= n_vars {
                        return Err(anyhow!("undeclared variable")).with_context(context);
                    }
                    Ok(l)
                })
                .collect::<Result<Vec<Literal>>>()
        })
        .transpose()
        .map(|a| a.unwrap_or_default())
}

fn log_failed_assumptions(session: &mut Session, assumptions: &[Literal]) {
    if assumptions.is_empty() {
        return;
    }
    let failed = assumptions
        .iter()
        .map(|l| session.failed(*l).map(|f| (*l, f)))
        .collect::<satbridge::sat::Result<Vec<(Literal, bool)>>>();
    match failed {
        Ok(f) => info!(
            "failed assumptions: {:?}",
            f.iter()
                .filter(|(_, failed)| *failed)
                .map(|(l, _)| isize::from(*l))
                .collect::<Vec<isize>>()
        ),
        Err(e) => info!("failed assumptions are not available: {}", e),
    }
}
