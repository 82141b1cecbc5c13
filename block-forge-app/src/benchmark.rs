//! Benchmarking of single- against multi-threaded solving.

use crate::config::SolveSettings;
use crate::error::AppError;
use anyhow::{Error, Result};
use colored::Colorize;
use std::collections::HashMap;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use wfc_catalog::{Catalog, Direction, SOLID_GROUP};
use wfc_solver::profiler::format_duration;
use wfc_solver::{AttemptStats, Bounds, ExecutionMode, LevelData, ProfileMetric, Profiler, Solver, SolverConfig};

/// Outcome of one timed solve.
#[derive(Debug)]
pub struct BenchmarkResult {
    pub mode: ExecutionMode,
    /// Wall-clock time of the whole solve, retries included.
    pub total_time: Duration,
    /// Successful attempt, `0` when every attempt failed.
    pub attempt: u32,
    pub stats: AttemptStats,
    pub profile_metrics: HashMap<String, ProfileMetric>,
}

/// Aggregated results of one mode over several runs.
#[derive(Debug)]
pub struct BenchmarkScenarioResult {
    pub rule_file: PathBuf,
    pub width: usize,
    pub height: usize,
    pub depth: usize,
    pub num_blocks: usize,
    pub mode: ExecutionMode,
    pub runs: usize,
    pub successful_runs: usize,
    pub failed_runs: usize,
    pub avg_total_time_ms: Option<f64>,
    pub median_total_time_ms: Option<f64>,
    pub stddev_total_time_ms: Option<f64>,
}

/// Solves a fresh level once with `mode` and records timings.
pub fn run_single_benchmark(
    catalog: &Arc<Catalog>,
    settings: &SolveSettings,
    mode: ExecutionMode,
    seed: u64,
) -> Result<BenchmarkResult, AppError> {
    let [width, height, depth] = settings.extents()?;
    let bounds = Bounds::from_size(width, height, depth);
    let level = LevelData::new(bounds).shared();
    let profiler = Profiler::new(&format!("{mode:?}"));

    let config = SolverConfig::new(bounds.dimensions())
        .with_mode(mode)
        .with_parallel_threshold(settings.parallel_threshold);
    let mut solver = Solver::new(config);
    solver.set_catalog(Arc::clone(catalog));
    solver.set_level_data(level);
    solver.set_profiler(Some(profiler.clone()));
    if settings.solid_ground {
        solver.set_group_boundary(SOLID_GROUP, Direction::Down, false)?;
    }

    let start_time = Instant::now();
    let attempt = solver.solve(bounds, settings.max_iterations, Some(seed))?;
    let total_time = start_time.elapsed();

    Ok(BenchmarkResult {
        mode,
        total_time,
        attempt,
        stats: solver.last_attempt_stats(),
        profile_metrics: profiler.get_metrics(),
    })
}

/// Runs `settings.benchmark_runs` solves per mode with identical seeds.
pub fn run_benchmarks(catalog: &Arc<Catalog>, settings: &SolveSettings) -> Result<Vec<BenchmarkScenarioResult>, AppError> {
    let rule_file = settings.require_rule_file()?.clone();
    let base_seed = settings.seed.unwrap_or(0);
    let mut scenarios = Vec::new();
    for mode in [ExecutionMode::SingleThreaded, ExecutionMode::MultiThreaded] {
        log::info!("Benchmarking {mode:?} over {} runs", settings.benchmark_runs);
        let mut times_ms = Vec::new();
        let mut failed_runs = 0;
        for run in 0..settings.benchmark_runs {
            let result = run_single_benchmark(catalog, settings, mode, base_seed.wrapping_add(run as u64))?;
            if result.attempt == 0 {
                failed_runs += 1;
            } else {
                times_ms.push(result.total_time.as_secs_f64() * 1e3);
            }
            log::debug!(
                "{mode:?} run {run}: attempt {}, {} bans, {}",
                result.attempt,
                result.stats.bans,
                format_duration(result.total_time)
            );
        }

        let avg = (!times_ms.is_empty()).then(|| times_ms.iter().sum::<f64>() / times_ms.len() as f64);
        scenarios.push(BenchmarkScenarioResult {
            rule_file: rule_file.clone(),
            width: settings.width,
            height: settings.height,
            depth: settings.depth,
            num_blocks: catalog.len(),
            mode,
            runs: settings.benchmark_runs,
            successful_runs: times_ms.len(),
            failed_runs,
            avg_total_time_ms: avg,
            stddev_total_time_ms: avg.and_then(|mean| calculate_std_dev(&times_ms, mean)),
            median_total_time_ms: calculate_median(&mut times_ms),
        });
    }
    Ok(scenarios)
}

/// Prints a side-by-side comparison of the scenarios.
pub fn report_comparison(scenarios: &[BenchmarkScenarioResult]) {
    println!("{}", "=== Benchmark Results ===".bold());
    println!(
        "{:<16} | {:>6} | {:>6} | {:>12} | {:>12} | {:>12}",
        "Mode", "Runs", "Failed", "Avg (ms)", "Median (ms)", "Std Dev (ms)"
    );
    println!("{:-<79}", "");
    let fmt = |value: Option<f64>| value.map_or_else(|| "-".to_owned(), |v| format!("{v:.3}"));
    for scenario in scenarios {
        let failed = if scenario.failed_runs > 0 {
            scenario.failed_runs.to_string().red()
        } else {
            scenario.failed_runs.to_string().green()
        };
        println!(
            "{:<16} | {:>6} | {:>6} | {:>12} | {:>12} | {:>12}",
            format!("{:?}", scenario.mode),
            scenario.runs,
            failed,
            fmt(scenario.avg_total_time_ms),
            fmt(scenario.median_total_time_ms),
            fmt(scenario.stddev_total_time_ms)
        );
    }
    if let [single, multi] = scenarios {
        if let (Some(s), Some(m)) = (single.avg_total_time_ms, multi.avg_total_time_ms) {
            if m > 0.0 {
                println!("Speedup: {}", format!("{:.2}x", s / m).bold());
            }
        }
    }
    println!();
}

/// Prints every profiled section, longest first.
pub fn print_profiler_summary(profiler: &Profiler) {
    let sections = profiler.sorted_metrics();
    if sections.is_empty() {
        println!("No profiling data collected for {}", profiler.name());
        return;
    }

    println!("=== {} Profiling Results ===", profiler.name());
    println!(
        "{:<25} | {:<10} | {:<10} | {:<10} | {:<10}",
        "Section", "Calls", "Total", "Average", "Max"
    );
    println!("{:-<79}", "");

    for (section, metric) in sections {
        println!(
            "{:<25} | {:<10} | {:<10} | {:<10} | {:<10}",
            section,
            metric.calls,
            format_duration(metric.total_time),
            format_duration(metric.average_time()),
            format_duration(metric.max_time)
        );
    }
    println!();
}

pub fn write_scenario_results_to_csv(scenario_results: &[BenchmarkScenarioResult], path: &Path) -> Result<(), Error> {
    let file = File::create(path)?;
    let mut wtr = csv::Writer::from_writer(file);

    wtr.write_record([
        "Rule File",
        "Width",
        "Height",
        "Depth",
        "Num Blocks",
        "Mode",
        "Total Runs",
        "Successful Runs",
        "Failed Runs",
        "Avg Time (ms)",
        "Median Time (ms)",
        "Std Dev Time (ms)",
    ])?;

    let fmt = |value: Option<f64>| value.map(|t| format!("{t:.6}")).unwrap_or_default();
    for scenario in scenario_results {
        wtr.write_record([
            scenario
                .rule_file
                .file_name()
                .map_or_else(|| scenario.rule_file.to_string_lossy(), |n| n.to_string_lossy())
                .to_string(),
            scenario.width.to_string(),
            scenario.height.to_string(),
            scenario.depth.to_string(),
            scenario.num_blocks.to_string(),
            format!("{:?}", scenario.mode),
            scenario.runs.to_string(),
            scenario.successful_runs.to_string(),
            scenario.failed_runs.to_string(),
            fmt(scenario.avg_total_time_ms),
            fmt(scenario.median_total_time_ms),
            fmt(scenario.stddev_total_time_ms),
        ])?;
    }

    wtr.flush()?;
    Ok(())
}

fn calculate_median(data: &mut [f64]) -> Option<f64> {
    if data.is_empty() {
        return None;
    }
    data.sort_unstable_by(f64::total_cmp);
    let mid = data.len() / 2;
    if data.len() % 2 == 0 {
        Some((data[mid - 1] + data[mid]) / 2.0)
    } else {
        Some(data[mid])
    }
}

/// Sample standard deviation; needs at least two values.
fn calculate_std_dev(data: &[f64], mean: f64) -> Option<f64> {
    let n = data.len();
    if n < 2 {
        return None;
    }
    let variance = data
        .iter()
        .map(|value| {
            let diff = mean - value;
            diff * diff
        })
        .sum::<f64>()
        / (n - 1) as f64;
    Some(variance.sqrt())
}
