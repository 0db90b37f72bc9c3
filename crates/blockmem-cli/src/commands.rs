use anyhow::Context;
use blockmem_disk::{Disk, DiskConfig, DiskStats};
use blockmem_store::{ObjectId, ObjectRegistry, ObjectStorage, WriteMode};
use colored::Colorize;
use serde::Serialize;
use tracing::info;

use crate::cli::*;

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Command::Config(args) => cmd_config(&args),
        Command::Inspect(args) => cmd_inspect(&args, cli.format),
        Command::Exercise(args) => cmd_exercise(&args, cli.format),
    }
}

/// Load the configuration file (or defaults), then apply flag overrides.
pub fn resolve_config(args: &DiskArgs) -> anyhow::Result<DiskConfig> {
    let mut config = match &args.config {
        Some(path) => DiskConfig::load(path)
            .with_context(|| format!("loading disk config from {}", path.display()))?,
        None => DiskConfig::default(),
    };
    if let Some(blocks) = args.blocks {
        config.number_of_blocks = blocks;
    }
    if let Some(block_size) = args.block_size {
        config.block_size = block_size;
    }
    config.validate()?;
    Ok(config)
}

fn cmd_config(args: &DiskArgs) -> anyhow::Result<()> {
    let config = resolve_config(args)?;
    print!("{}", config.to_toml_string()?);
    Ok(())
}

fn cmd_inspect(args: &DiskArgs, format: OutputFormat) -> anyhow::Result<()> {
    let config = resolve_config(args)?;
    let stats = Disk::from_config(&config)?.stats();
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&stats)?),
        OutputFormat::Text => {
            println!("{}", "Disk".bold());
            println!("  Blocks:     {}", stats.number_of_blocks.to_string().cyan());
            println!("  Block size: {} bytes", stats.block_size.to_string().cyan());
            println!("  Capacity:   {} bytes", stats.total_capacity.to_string().bold());
            println!("  Available:  {} bytes", stats.available.to_string().green());
        }
    }
    Ok(())
}

fn cmd_exercise(args: &ExerciseArgs, format: OutputFormat) -> anyhow::Result<()> {
    let config = resolve_config(&args.disk)?;
    let reports = run_workload(args, &config)?;
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&reports)?),
        OutputFormat::Text => {
            for r in &reports {
                println!(
                    "{:<8} objects={:<5} used={:<10} available={:<10} pooled={:<6} allocations={}",
                    r.phase.yellow(),
                    r.objects,
                    r.stats.used,
                    r.stats.available.to_string().green(),
                    r.stats.pooled_blocks,
                    r.stats.allocation_calls
                );
            }
            println!("{} All space returned to the disk.", "✓".green().bold());
        }
    }
    Ok(())
}

/// Accounting after one workload phase.
#[derive(Debug, Serialize)]
pub struct PhaseReport {
    pub phase: &'static str,
    pub objects: usize,
    pub stats: DiskStats,
}

fn snapshot(phase: &'static str, storage: &ObjectStorage) -> PhaseReport {
    info!(phase, used = storage.memory_used(), "phase complete");
    PhaseReport {
        phase,
        objects: storage.len(),
        stats: storage.disk().stats(),
    }
}

fn pattern(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 251) as u8).collect()
}

/// Write, append, shrink, verify, copy and finally remove a set of objects,
/// recording disk accounting after each phase.
pub fn run_workload(args: &ExerciseArgs, config: &DiskConfig) -> anyhow::Result<Vec<PhaseReport>> {
    let mut storage = ObjectStorage::new(Disk::from_config(config)?);
    let ids: Vec<ObjectId> = (0..args.objects).map(ObjectId::new).collect();
    let payload = pattern(args.size);
    let mut reports = Vec::new();

    for &id in &ids {
        storage
            .write(id, &payload, WriteMode::Overwrite)
            .with_context(|| format!("writing object {id}"))?;
    }
    reports.push(snapshot("write", &storage));

    let tail = vec![0xA5; args.append];
    for &id in &ids {
        storage
            .write(id, &tail, WriteMode::Append)
            .with_context(|| format!("appending to object {id}"))?;
    }
    reports.push(snapshot("append", &storage));

    let short = &payload[..args.shrink_to.min(payload.len())];
    for &id in ids.iter().step_by(2) {
        storage
            .write(id, short, WriteMode::Overwrite)
            .with_context(|| format!("shrinking object {id}"))?;
    }
    reports.push(snapshot("shrink", &storage));

    for &id in &ids {
        let size = storage.object_size(id).unwrap_or(0);
        let read = storage.read(id).map(Iterator::count).unwrap_or(0);
        anyhow::ensure!(read == size, "object {id}: read {read} bytes, expected {size}");
    }

    if let Some(&first) = ids.first() {
        let target = ObjectId::new(args.objects);
        storage
            .copy(first, target)
            .with_context(|| format!("copying object {first} to {target}"))?;
    }
    reports.push(snapshot("copy", &storage));

    for id in storage.all_ids() {
        storage.remove(id);
    }
    reports.push(snapshot("remove", &storage));
    anyhow::ensure!(
        storage.memory_used() == 0,
        "{} bytes still allocated after removing every object",
        storage.memory_used()
    );

    Ok(reports)
}
