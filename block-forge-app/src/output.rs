use anyhow::{Context, Result};
use colored::Colorize;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{self, Write};
use std::path::Path;
use wfc_catalog::{Catalog, UNSET_HASH};
use wfc_solver::LevelData;

/// Name written for a hash the catalog does not know.
const UNKNOWN_BLOCK: &str = "?";

fn block_name(catalog: &Catalog, hash: u64) -> &str {
    if hash == UNSET_HASH {
        return "";
    }
    catalog
        .get_block_index(hash)
        .map_or(UNKNOWN_BLOCK, |index| catalog.block(index).name.as_str())
}

/// Writes every cell of `levels` as `x,y,z,hash,block` rows in world
/// coordinates. Returns the number of rows written.
pub fn save_levels_to_csv<'a>(
    levels: impl IntoIterator<Item = &'a LevelData>,
    catalog: &Catalog,
    output_path: &Path,
) -> Result<usize> {
    log::info!("Attempting to save levels to {:?}...", output_path);
    let file = File::create(output_path)
        .with_context(|| format!("Failed to create output file: {:?}", output_path))?;
    let mut writer = csv::Writer::from_writer(io::BufWriter::new(file));
    writer.write_record(["x", "y", "z", "hash", "block"])?;

    let mut rows = 0;
    for level in levels {
        for world in level.bounds().positions() {
            let hash = level.get(world).unwrap_or(UNSET_HASH);
            writer
                .write_record([
                    world.x.to_string(),
                    world.y.to_string(),
                    world.z.to_string(),
                    hash.to_string(),
                    block_name(catalog, hash).to_owned(),
                ])
                .with_context(|| format!("Failed to write cell {:?}", world.as_slice()))?;
            rows += 1;
        }
    }

    writer.flush().context("Failed to flush writer for output file")?;
    log::info!("Saved {rows} cells to {:?}", output_path);
    Ok(rows)
}

/// Block usage of `level`, most used first.
pub fn block_histogram<'a>(level: &LevelData, catalog: &'a Catalog) -> Vec<(&'a str, usize)> {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for &hash in level.blocks().as_slice() {
        let name = match hash {
            UNSET_HASH => "unset",
            _ => block_name(catalog, hash),
        };
        *counts.entry(name).or_default() += 1;
    }
    let mut histogram: Vec<_> = counts.into_iter().collect();
    histogram.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
    histogram
}

/// Prints a coloured per-level summary.
pub fn print_level_summary(out: &mut impl Write, name: &str, level: &LevelData, catalog: &Catalog) -> io::Result<()> {
    let bounds = level.bounds();
    let solved = level.resolved_count() == bounds.volume();
    let status = if solved { "solved".green().bold() } else { "unsolved".red().bold() };
    writeln!(
        out,
        "{} {} at {:?}, size {:?}",
        name.bold(),
        status,
        bounds.min.as_slice(),
        bounds.size.as_slice()
    )?;
    for (block, count) in block_histogram(level, catalog) {
        writeln!(out, "  {:<24} {:>8}", block.cyan(), count)?;
    }
    Ok(())
}
