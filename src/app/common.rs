use super::{
    app_helper::AppHelper, command::Command, AuthorsCommand, CheckCommand, EnginesCommand,
    SolveCommand,
};
use anyhow::{anyhow, Context, Result};
use clap::{Arg, ArgMatches};
use log::{info, warn};
use satbridge::{
    io::{CnfFormula, DimacsReader, InstanceReader},
    sat::{ipasir_signature, EngineConfig, EngineKind, SolvingListener, SolvingResult},
};
use std::{
    fs::{self, File},
    io::{BufReader, Read},
    path::PathBuf,
    str::FromStr,
};

pub(crate) fn create_app_helper() -> AppHelper<'static> {
    let app_name = option_env!("CARGO_PKG_NAME").unwrap_or("unknown app name");
    let app_version = option_env!("CARGO_PKG_VERSION").unwrap_or("unknown version");
    let authors = option_env!("CARGO_PKG_AUTHORS").unwrap_or("unknown authors");
    let mut app = AppHelper::new(
        app_name,
        app_version,
        authors,
        "Satbridge, a uniform front end to incremental SAT solvers.",
    );
    let commands: Vec<Box<dyn Command>> = vec![
        Box::new(AuthorsCommand::new(app_name, app_version, authors)),
        Box::new(CheckCommand::new()),
        Box::new(EnginesCommand::new()),
        Box::new(SolveCommand::new()),
    ];
    for c in commands {
        app.add_command(c);
    }
    app
}

pub(crate) const ARG_INPUT: &str = "INPUT";

pub(crate) fn input_args() -> Arg<'static, 'static> {
    Arg::with_name(ARG_INPUT)
        .short("f")
        .empty_values(false)
        .multiple(false)
        .help("the input file that contains the DIMACS CNF formula")
        .required(true)
}

pub(crate) fn read_file_path(file_path: &str) -> Result<CnfFormula> {
    let mut reader = DimacsReader::default();
    reader.add_warning_handler(Box::new(|line, msg| warn!("at line {}: {}", line, msg)));
    let formula = read_file_path_with(file_path, &|r| reader.read(r))?;
    info!(
        "the formula has {} variable(s) and {} clause(s)",
        formula.n_vars(),
        formula.n_clauses(),
    );
    Ok(formula)
}

pub(crate) fn read_file_path_with<F, R>(file_path: &str, reader: &F) -> Result<R>
where
    F: Fn(&mut dyn Read) -> Result<R>,
{
    let canonicalized = canonicalize_file_path(file_path)?;
    info!("reading input file {:?}", canonicalized);
    let mut file_reader = BufReader::new(
        File::open(&canonicalized)
            .with_context(|| format!("while opening file {:?}", canonicalized))?,
    );
    (reader)(&mut file_reader)
}

/// Canonicalize a path given by the user.
pub(crate) fn canonicalize_file_path(file_path: &str) -> Result<PathBuf> {
    fs::canonicalize(PathBuf::from(file_path))
        .with_context(|| format!(r#"while opening file "{}""#, file_path))
}

const ARG_ENGINE: &str = "ENGINE";
const ARG_EXTERNAL_SAT_SOLVER: &str = "EXTERNAL_SAT_SOLVER";
const ARG_EXTERNAL_SAT_SOLVER_OPTIONS: &str = "EXTERNAL_SAT_SOLVER_OPTIONS";
const ARG_IPASIR_LIBRARY: &str = "ARG_IPASIR_LIBRARY";
const ARG_SEED: &str = "SEED";
const ARG_RANDOM_VAR_FREQ: &str = "RANDOM_VAR_FREQ";
const ARG_THREADS: &str = "THREADS";

pub(crate) const ENGINE_NAMES: [&str; 6] = [
    "batsat",
    "varisat",
    "cadical",
    "portfolio",
    "external",
    "ipasir",
];

pub(crate) fn engine_args() -> Vec<Arg<'static, 'static>> {
    vec![
        Arg::with_name(ARG_ENGINE)
            .long("engine")
            .empty_values(false)
            .multiple(false)
            .possible_values(&ENGINE_NAMES)
            .help("the engine backing the session (default: batsat)")
            .required(false),
        Arg::with_name(ARG_EXTERNAL_SAT_SOLVER)
            .long("external-sat-solver")
            .empty_values(false)
            .multiple(false)
            .help("a path to an external SAT solver reading DIMACS formulas on its standard input")
            .required(false),
        Arg::with_name(ARG_EXTERNAL_SAT_SOLVER_OPTIONS)
            .long("external-sat-solver-opt")
            .requires(ARG_EXTERNAL_SAT_SOLVER)
            .empty_values(false)
            .multiple(true)
            .number_of_values(1)
            .allow_hyphen_values(true)
            .help("a option to give to the external SAT solver")
            .required(false),
        Arg::with_name(ARG_IPASIR_LIBRARY)
            .long("ipasir-library")
            .empty_values(false)
            .multiple(false)
            .help("a path to a shared library containing an IPASIR compatible SAT solver")
            .required(false)
            .conflicts_with(ARG_EXTERNAL_SAT_SOLVER),
        Arg::with_name(ARG_SEED)
            .long("seed")
            .empty_values(false)
            .multiple(false)
            .help("the random seed of the engine")
            .required(false),
        Arg::with_name(ARG_RANDOM_VAR_FREQ)
            .long("random-var-freq")
            .empty_values(false)
            .multiple(false)
            .help("the frequency of random decisions, in [0, 1]")
            .required(false),
        Arg::with_name(ARG_THREADS)
            .long("threads")
            .empty_values(false)
            .multiple(false)
            .help("the number of worker threads (portfolio engine)")
            .required(false),
    ]
}

/// Parses an optional CLI value.
pub(crate) fn parse_value<T>(arg_matches: &ArgMatches<'_>, arg: &str) -> Result<Option<T>>
where
    T: FromStr,
    <T as FromStr>::Err: std::fmt::Display,
{
    arg_matches
        .value_of(arg)
        .map(|v| {
            v.parse::<T>()
                .map_err(|e| anyhow!(r#"invalid value "{}": {}"#, v, e))
        })
        .transpose()
}

fn engine_kind(arg_matches: &ArgMatches<'_>) -> Result<EngineKind> {
    let external_solver = arg_matches.value_of(ARG_EXTERNAL_SAT_SOLVER);
    let ipasir_library = arg_matches.value_of(ARG_IPASIR_LIBRARY);
    let engine_name = match (arg_matches.value_of(ARG_ENGINE), external_solver, ipasir_library) {
        (Some(e), _, _) => e,
        (None, Some(_), _) => "external",
        (None, None, Some(_)) => "ipasir",
        (None, None, None) => "batsat",
    };
    match engine_name {
        "batsat" => Ok(EngineKind::Batsat),
        "varisat" => Ok(EngineKind::Varisat),
        "cadical" => Ok(EngineKind::Cadical),
        "portfolio" => Ok(EngineKind::Portfolio),
        "external" => {
            let program = external_solver.ok_or_else(|| {
                anyhow!("the external engine requires the --external-sat-solver option")
            })?;
            let path = canonicalize_file_path(program)?;
            let program = path
                .to_str()
                .ok_or_else(|| anyhow!("the path {:?} is not valid UTF-8", path))?
                .to_string();
            let options = arg_matches
                .values_of(ARG_EXTERNAL_SAT_SOLVER_OPTIONS)
                .map(|v| v.map(|o| o.to_string()).collect::<Vec<String>>())
                .unwrap_or_default();
            Ok(EngineKind::External { program, options })
        }
        "ipasir" => {
            let library = ipasir_library.ok_or_else(|| {
                anyhow!("the ipasir engine requires the --ipasir-library option")
            })?;
            let library = canonicalize_file_path(library)?;
            info!("IPASIR signature is {}", ipasir_signature(&library)?);
            Ok(EngineKind::Ipasir { library })
        }
        _ => Err(anyhow!(r#"unknown engine "{}""#, engine_name)),
    }
}

pub(crate) fn create_engine_config(arg_matches: &ArgMatches<'_>) -> Result<EngineConfig> {
    let kind = engine_kind(arg_matches)?;
    let consistent = match &kind {
        EngineKind::External { .. } => arg_matches.value_of(ARG_IPASIR_LIBRARY).is_none(),
        EngineKind::Ipasir { .. } => arg_matches.value_of(ARG_EXTERNAL_SAT_SOLVER).is_none(),
        _ => {
            arg_matches.value_of(ARG_EXTERNAL_SAT_SOLVER).is_none()
                && arg_matches.value_of(ARG_IPASIR_LIBRARY).is_none()
        }
    };
    if !consistent {
        return Err(anyhow!(
            "the options of the external and ipasir engines cannot be used with the {} engine",
            kind
        ));
    }
    info!("using the {} engine", kind);
    let mut config = EngineConfig::new(kind);
    if let Some(seed) = parse_value::<f64>(arg_matches, ARG_SEED).context("while reading the seed")? {
        config = config.with_seed(seed);
    }
    if let Some(freq) = parse_value::<f64>(arg_matches, ARG_RANDOM_VAR_FREQ)
        .context("while reading the random var frequency")?
    {
        config = config.with_random_var_freq(freq);
    }
    if let Some(threads) =
        parse_value::<usize>(arg_matches, ARG_THREADS).context("while reading the thread count")?
    {
        config = config.with_threads(threads);
    }
    Ok(config)
}

#[derive(Default)]
pub(crate) struct SatSolvingLogger;

impl SolvingListener for SatSolvingLogger {
    fn solving_start(&self, n_vars: usize, n_clauses: usize) {
        info!(
            "launching SAT solver on an instance with {} variables and {} clauses",
            n_vars, n_clauses
        );
    }

    fn solving_end(&self, result: &SolvingResult) {
        info!("SAT solver ended with result {}", result);
    }
}
