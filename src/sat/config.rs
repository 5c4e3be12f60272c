use super::{
    BatsatSolver, CadicalSolver, Engine, ExternalSatSolver, IpasirSatSolver, LiteralCodec,
    PortfolioSolver, Result, SatError, VarisatSolver,
};
use batsat::SolverOpts;
use std::{
    fmt::Display,
    path::PathBuf,
    sync::{atomic::AtomicBool, Arc},
};

/// The engine adapters that can back a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineKind {
    /// The batsat CDCL solver.
    Batsat,
    /// The varisat CDCL solver.
    Varisat,
    /// The CaDiCaL solver.
    Cadical,
    /// A portfolio of batsat workers.
    Portfolio,
    /// A solver executable reading DIMACS instances on its standard input.
    External {
        /// the program to run
        program: String,
        /// the CLI options given to the program
        options: Vec<String>,
    },
    /// A solver loaded from an IPASIR shared library.
    Ipasir {
        /// the path to the library
        library: PathBuf,
    },
}

impl EngineKind {
    /// Returns the name of the engine adapter.
    pub fn name(&self) -> &'static str {
        match self {
            EngineKind::Batsat => "batsat",
            EngineKind::Varisat => "varisat",
            EngineKind::Cadical => "cadical",
            EngineKind::Portfolio => "portfolio",
            EngineKind::External { .. } => "external",
            EngineKind::Ipasir { .. } => "ipasir",
        }
    }

    /// Returns the literal codec used by the engines of this kind.
    pub fn codec(&self) -> LiteralCodec {
        match self {
            EngineKind::Batsat | EngineKind::Varisat | EngineKind::Portfolio => {
                LiteralCodec::Arithmetic
            }
            EngineKind::Cadical | EngineKind::External { .. } | EngineKind::Ipasir { .. } => {
                LiteralCodec::Direct
            }
        }
    }

    /// Returns the engine kinds that need no further parameter.
    pub fn in_process() -> Vec<EngineKind> {
        vec![
            EngineKind::Batsat,
            EngineKind::Varisat,
            EngineKind::Cadical,
            EngineKind::Portfolio,
        ]
    }
}

impl Display for EngineKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// The configuration a session engine is built from.
///
/// ```
/// # use satbridge::sat::{EngineConfig, EngineKind};
/// let config = EngineConfig::new(EngineKind::Portfolio)
///     .with_seed(42.)
///     .with_threads(4);
/// assert_eq!(Some(4), config.threads());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    kind: EngineKind,
    seed: Option<f64>,
    random_var_freq: Option<f64>,
    threads: Option<usize>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::new(EngineKind::Batsat)
    }
}

impl EngineConfig {
    /// Builds a configuration for the given engine, with the engine defaults.
    pub fn new(kind: EngineKind) -> Self {
        Self {
            kind,
            seed: None,
            random_var_freq: None,
            threads: None,
        }
    }

    /// Sets the random seed.
    pub fn with_seed(mut self, seed: f64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Sets the frequency of random decisions, in `[0, 1]`.
    pub fn with_random_var_freq(mut self, freq: f64) -> Self {
        self.random_var_freq = Some(freq);
        self
    }

    /// Sets the number of worker threads.
    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = Some(threads);
        self
    }

    /// Returns the engine kind.
    pub fn kind(&self) -> &EngineKind {
        &self.kind
    }

    /// Returns the random seed, if set.
    pub fn seed(&self) -> Option<f64> {
        self.seed
    }

    /// Returns the frequency of random decisions, if set.
    pub fn random_var_freq(&self) -> Option<f64> {
        self.random_var_freq
    }

    /// Returns the number of worker threads, if set.
    pub fn threads(&self) -> Option<usize> {
        self.threads
    }

    fn batsat_options(&self) -> Result<SolverOpts> {
        let mut options = SolverOpts::default();
        if let Some(s) = self.seed {
            options.random_seed = s;
        }
        if let Some(f) = self.random_var_freq {
            options.random_var_freq = f;
        }
        if options.check() {
            Ok(options)
        } else {
            Err(SatError::invalid_usage(format!(
                "invalid options for {}: the seed must be positive and the random var frequency in [0, 1]",
                self.kind
            )))
        }
    }

    fn unsupported_knobs(&self, random_var_freq: bool, threads: bool) -> Result<()> {
        let name = self.kind.name();
        if !random_var_freq && self.random_var_freq.is_some() {
            return Err(SatError::unsupported(name, "setRandomVarFreq"));
        }
        if !threads && self.threads.is_some() {
            return Err(SatError::unsupported(name, "setThreadCount"));
        }
        Ok(())
    }

    /// Builds the engine described by this configuration, polling the given interruption flag.
    pub(crate) fn build(&self, interrupt: Arc<AtomicBool>) -> Result<Box<dyn Engine>> {
        match &self.kind {
            EngineKind::Batsat => {
                self.unsupported_knobs(true, false)?;
                Ok(Box::new(BatsatSolver::new(self.batsat_options()?, interrupt)))
            }
            EngineKind::Portfolio => Ok(Box::new(PortfolioSolver::new(
                self.batsat_options()?,
                self.threads.unwrap_or(DEFAULT_PORTFOLIO_THREADS),
                interrupt,
            ))),
            EngineKind::Cadical => {
                self.unsupported_knobs(false, false)?;
                let seed = self.seed.map(cadical_seed).transpose()?;
                Ok(Box::new(CadicalSolver::new(seed, interrupt)?))
            }
            EngineKind::Varisat => {
                self.unsupported_knobs(false, false)?;
                if self.seed.is_some() {
                    return Err(SatError::unsupported("varisat", "setRandomSeed"));
                }
                Ok(Box::new(VarisatSolver::new()))
            }
            EngineKind::External { program, options } => {
                self.unsupported_knobs(false, false)?;
                if self.seed.is_some() {
                    return Err(SatError::unsupported("external", "setRandomSeed"));
                }
                Ok(Box::new(ExternalSatSolver::new(
                    program.clone(),
                    options.clone(),
                )))
            }
            EngineKind::Ipasir { library } => {
                self.unsupported_knobs(false, false)?;
                if self.seed.is_some() {
                    return Err(SatError::unsupported("ipasir", "setRandomSeed"));
                }
                Ok(Box::new(IpasirSatSolver::new(library, interrupt)?))
            }
        }
    }
}

const DEFAULT_PORTFOLIO_THREADS: usize = 2;

fn cadical_seed(seed: f64) -> Result<i32> {
    if seed.fract() != 0. || seed < 0. || seed > i32::MAX as f64 {
        return Err(SatError::invalid_usage(format!(
            "the CaDiCaL seed must be an integer in [0, {}], got {}",
            i32::MAX,
            seed
        )));
    }
    Ok(seed as i32)
}
