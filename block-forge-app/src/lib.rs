//! Block Forge Application Library
//!
//! Command line driver around `wfc-catalog` and `wfc-solver`: resolves
//! settings, loads a block repository, solves a single level or a scene of
//! several regions and writes the result as CSV.

pub mod benchmark;
pub mod config;
pub mod error;
pub mod logging;
pub mod output;
pub mod scene;

pub use config::{AppConfig, SolveSettings};
pub use error::AppError;

use anyhow::Result;
use clap::Parser;
use log::info;
use std::io;
use std::sync::Arc;
use wfc_catalog::loader::load_from_file;
use wfc_catalog::{Catalog, Direction, SOLID_GROUP};
use wfc_solver::{read_level, Bounds, LevelData, Profiler, Solver, SolverConfig};

/// What a run produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunSummary {
    /// Levels were solved and `rows` cells written.
    Solved { regions: usize, rows: usize },
    /// Benchmarks ran for this many modes.
    Benchmarked { scenarios: usize },
}

/// Entry point of the `block-forge` binary.
pub fn run() -> Result<()> {
    let config = AppConfig::parse();
    logging::init_logger(config.global_log_level);
    info!("Block Forge starting");

    let settings = config.settings()?;
    let summary = execute(&settings)?;
    info!("Block Forge finished: {summary:?}");
    Ok(())
}

/// Runs the solve, scene or benchmark described by `settings`.
pub fn execute(settings: &SolveSettings) -> Result<RunSummary, AppError> {
    let rule_file = settings.require_rule_file()?;
    info!("Loading repository from {:?}", rule_file);
    let catalog = Arc::new(load_from_file(rule_file)?);

    if settings.benchmark_mode {
        let scenarios = benchmark::run_benchmarks(&catalog, settings)?;
        benchmark::report_comparison(&scenarios);
        if let Some(path) = &settings.benchmark_csv_output {
            benchmark::write_scenario_results_to_csv(&scenarios, path)?;
            info!("Benchmark results written to {:?}", path);
        }
        return Ok(RunSummary::Benchmarked {
            scenarios: scenarios.len(),
        });
    }

    match &settings.scene {
        Some(scene) => solve_scene(&catalog, settings, scene),
        None => solve_level(&catalog, settings),
    }
}

fn solve_level(catalog: &Arc<Catalog>, settings: &SolveSettings) -> Result<RunSummary, AppError> {
    let [width, height, depth] = settings.extents()?;
    let bounds = Bounds::from_size(width, height, depth);
    let level = LevelData::new(bounds).shared();

    let config = SolverConfig::new(bounds.dimensions())
        .with_mode(settings.threading.into())
        .with_parallel_threshold(settings.parallel_threshold);
    let mut solver = Solver::new(config);
    solver.set_catalog(Arc::clone(catalog));
    solver.set_level_data(Arc::clone(&level));
    if settings.solid_ground {
        solver.set_group_boundary(SOLID_GROUP, Direction::Down, false)?;
    }
    let profiler = settings.profile.then(|| Profiler::new("Solver"));
    solver.set_profiler(profiler.clone());

    let attempt = solver.solve(bounds, settings.max_iterations, settings.seed)?;
    if let Some(profiler) = &profiler {
        benchmark::print_profiler_summary(profiler);
    }
    if attempt == 0 {
        return Err(AppError::Unsolved(settings.max_iterations));
    }
    info!("Solved on attempt {attempt}: {:?}", solver.last_attempt_stats());

    let level = read_level(&level);
    output::print_level_summary(&mut io::stdout().lock(), "level", &level, catalog)?;
    let rows = output::save_levels_to_csv([&*level], catalog, &settings.output_path)?;
    Ok(RunSummary::Solved { regions: 1, rows })
}

fn solve_scene(
    catalog: &Arc<Catalog>,
    settings: &SolveSettings,
    path: &std::path::Path,
) -> Result<RunSummary, AppError> {
    info!("Loading scene from {:?}", path);
    let scene = scene::load_scene(path)?;
    let scheduler = scene.build(
        Arc::clone(catalog),
        settings.threading.into(),
        settings.max_iterations,
        settings.seed,
    )?;
    if !scheduler.rebuild_all()? {
        return Err(AppError::Scene(format!("{} could not be solved", path.display())));
    }

    let guards: Vec<_> = scheduler.builders().iter().map(|b| read_level(&b.level)).collect();
    let mut stdout = io::stdout().lock();
    for (builder, level) in scheduler.builders().iter().zip(&guards) {
        output::print_level_summary(&mut stdout, &builder.name, level, catalog)?;
    }
    let rows = output::save_levels_to_csv(guards.iter().map(|guard| &**guard), catalog, &settings.output_path)?;
    Ok(RunSummary::Solved {
        regions: guards.len(),
        rows,
    })
}
