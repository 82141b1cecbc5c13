use crate::error::AppError;
use clap::{Parser, ValueEnum};
use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use wfc_solver::{ExecutionMode, DEFAULT_PARALLEL_THRESHOLD};

/// Prefix of environment variables overriding settings, e.g. `BLOCK_FORGE_WIDTH`.
pub const ENV_PREFIX: &str = "BLOCK_FORGE_";

/// Log level applied to every module unless `RUST_LOG` says otherwise.
#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum GlobalLogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

/// Which solver variant runs.
#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Threading {
    #[default]
    Single,
    Multi,
}

impl From<Threading> for ExecutionMode {
    fn from(threading: Threading) -> Self {
        match threading {
            Threading::Single => ExecutionMode::SingleThreaded,
            Threading::Multi => ExecutionMode::MultiThreaded,
        }
    }
}

/// Command line of the Block Forge application.
///
/// Options left unset fall back to the `--config` file, then to
/// `BLOCK_FORGE_*` environment variables, then to built-in defaults.
#[derive(Parser, Debug, Default, Serialize)]
#[command(author, version, about, long_about = None)]
pub struct AppConfig {
    /// TOML file with default settings.
    #[arg(short, long, value_name = "FILE")]
    #[serde(skip)]
    pub config: Option<PathBuf>,

    /// Block repository (RON or JSON).
    #[arg(short, long, value_name = "FILE")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rule_file: Option<PathBuf>,

    /// RON scene of several regions; replaces the single level.
    #[arg(long, value_name = "FILE")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scene: Option<PathBuf>,

    #[arg(long)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<usize>,

    #[arg(long)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<usize>,

    #[arg(long)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub depth: Option<usize>,

    /// Seed of the first attempt; later attempts derive from it.
    #[arg(long)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,

    /// Attempts before giving up on a region.
    #[arg(long)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_iterations: Option<u32>,

    #[arg(long, value_enum)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub threading: Option<Threading>,

    /// Pending bans that start a phased parallel flush.
    #[arg(long)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parallel_threshold: Option<usize>,

    /// Require Solid blocks below the level.
    #[arg(long)]
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub solid_ground: bool,

    /// CSV file receiving `x,y,z,hash,block` rows.
    #[arg(short, long, value_name = "FILE")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_path: Option<PathBuf>,

    /// Print per-stage solver timings.
    #[arg(long)]
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub profile: bool,

    /// Time single- against multi-threaded solving instead of writing a level.
    #[arg(long)]
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub benchmark_mode: bool,

    #[arg(long)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub benchmark_runs: Option<usize>,

    /// Optional: Path to save benchmark results as a CSV file.
    #[arg(long, value_name = "CSV_FILE")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub benchmark_csv_output: Option<PathBuf>,

    #[arg(long, value_enum, default_value_t = GlobalLogLevel::Info, env = "BLOCK_FORGE_LOG_LEVEL")]
    #[serde(skip)]
    pub global_log_level: GlobalLogLevel,
}

/// Fully resolved settings of one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolveSettings {
    pub rule_file: Option<PathBuf>,
    pub scene: Option<PathBuf>,
    pub width: usize,
    pub height: usize,
    pub depth: usize,
    pub seed: Option<u64>,
    pub max_iterations: u32,
    pub threading: Threading,
    pub parallel_threshold: usize,
    pub solid_ground: bool,
    pub output_path: PathBuf,
    pub profile: bool,
    pub benchmark_mode: bool,
    pub benchmark_runs: usize,
    pub benchmark_csv_output: Option<PathBuf>,
}

impl Default for SolveSettings {
    fn default() -> Self {
        Self {
            rule_file: None,
            scene: None,
            width: 8,
            height: 4,
            depth: 8,
            seed: None,
            max_iterations: 10,
            threading: Threading::default(),
            parallel_threshold: DEFAULT_PARALLEL_THRESHOLD,
            solid_ground: false,
            output_path: PathBuf::from("output.csv"),
            profile: false,
            benchmark_mode: false,
            benchmark_runs: 5,
            benchmark_csv_output: None,
        }
    }
}

impl SolveSettings {
    /// The repository file, which every run needs.
    pub fn require_rule_file(&self) -> Result<&PathBuf, AppError> {
        self.rule_file
            .as_ref()
            .ok_or_else(|| AppError::Config("no rule file given (--rule-file or `rule_file` in config)".to_owned()))
    }

    /// Level size as signed extents.
    pub fn extents(&self) -> Result<[i32; 3], AppError> {
        let mut extents = [0; 3];
        for (extent, (axis, value)) in extents
            .iter_mut()
            .zip([("width", self.width), ("height", self.height), ("depth", self.depth)])
        {
            *extent = i32::try_from(value)
                .ok()
                .filter(|&v| v > 0)
                .ok_or_else(|| AppError::Config(format!("{axis} must be between 1 and {}, got {value}", i32::MAX)))?;
        }
        Ok(extents)
    }
}

impl AppConfig {
    /// Layers defaults, the config file, the environment and the command line.
    pub fn settings(&self) -> Result<SolveSettings, AppError> {
        let mut figment = Figment::from(Serialized::defaults(SolveSettings::default()));
        if let Some(path) = &self.config {
            if !path.is_file() {
                return Err(AppError::Config(format!("config file {} not found", path.display())));
            }
            figment = figment.merge(Toml::file(path));
        }
        let settings: SolveSettings = figment
            .merge(Env::prefixed(ENV_PREFIX))
            .merge(Serialized::defaults(self))
            .extract()
            .map_err(|e| AppError::Config(e.to_string()))?;
        log::debug!("Resolved settings: {settings:?}");
        Ok(settings)
    }
}
