use thiserror::Error;
use wfc_catalog::LoadError;
use wfc_solver::{OrchestrationError, SolveError};

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration Error: {0}")]
    Config(String),

    #[error("IO Error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Repository Error: {0}")]
    Load(#[from] LoadError),

    #[error("Solver Error: {0}")]
    Solve(#[from] SolveError),

    #[error("Orchestration Error: {0}")]
    Orchestration(#[from] OrchestrationError),

    #[error("Scene Error: {0}")]
    Scene(String),

    #[error("CSV Error: {0}")]
    Csv(#[from] csv::Error),

    #[error("No solution found after {0} attempts")]
    Unsolved(u32),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}
