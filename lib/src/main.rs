//! LCE G-code CLI - plan deposition programs for LCE networks
//!
//! Usage:
//!   lce-gcode generate <network.json>... --tables <mapping.json>... --materials <material_data.json>
//!   lce-gcode generate <dir> -o <out_dir> --tables ... --materials ... --config printer.json
//!   lce-gcode annotate <network.json> --tables <mapping.json>... -o <annotated.json>
//!   lce-gcode info <network.json>

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use lce_gcode::pipeline::annotate_edges;
use lce_gcode::{MaterialTable, NetworkGraph, NetworkPlanner, ParameterResolver, PlannerConfig};
use log::{info, warn, LevelFilter};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Toolpath planner for direct-ink-writing of LCE networks
#[derive(Parser, Debug)]
#[command(name = "lce-gcode")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Enable debug output
    #[arg(short, long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Generate layer-by-layer G-code for one or more networks
    Generate {
        /// Network files, or directories of network files
        #[arg(value_name = "INPUT", required = true)]
        inputs: Vec<PathBuf>,

        /// Output directory (defaults to each input's directory)
        #[arg(short, long, value_name = "DIR")]
        output: Option<PathBuf>,

        /// Speed/pressure mapping table, one per material in material order
        #[arg(short, long = "tables", value_name = "TABLE", required = true, num_args = 1..)]
        tables: Vec<PathBuf>,

        /// Material head configuration (material_data.json)
        #[arg(short, long, value_name = "MATERIALS")]
        materials: PathBuf,

        /// Planner configuration file (JSON format)
        #[arg(short, long, value_name = "CONFIG")]
        config: Option<PathBuf>,

        /// Travel speed in mm/s
        #[arg(long)]
        travel_speed: Option<f64>,

        /// Travel height in mm
        #[arg(long)]
        travel_height: Option<f64>,

        /// Dwell after each deposited layer in seconds
        #[arg(long)]
        post_dwell: Option<f64>,
    },

    /// Write the resolved, speed-ordered edge list of a network
    Annotate {
        /// Network file
        #[arg(value_name = "INPUT")]
        input: PathBuf,

        /// Speed/pressure mapping table, one per material in material order
        #[arg(short, long = "tables", value_name = "TABLE", required = true, num_args = 1..)]
        tables: Vec<PathBuf>,

        /// Output JSON file (defaults to <input>_annotated.json)
        #[arg(short, long, value_name = "OUTPUT")]
        output: Option<PathBuf>,
    },

    /// Show information about a network file
    Info {
        /// Network file
        #[arg(value_name = "INPUT")]
        input: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    let log_level = if cli.debug {
        LevelFilter::Debug
    } else if cli.verbose {
        LevelFilter::Info
    } else {
        LevelFilter::Warn
    };

    env_logger::Builder::new()
        .filter_level(log_level)
        .format_timestamp(None)
        .init();

    match cli.command {
        Commands::Generate {
            inputs,
            output,
            tables,
            materials,
            config,
            travel_speed,
            travel_height,
            post_dwell,
        } => cmd_generate(
            inputs,
            output,
            tables,
            materials,
            config,
            travel_speed,
            travel_height,
            post_dwell,
        ),
        Commands::Annotate {
            input,
            tables,
            output,
        } => cmd_annotate(input, tables, output),
        Commands::Info { input } => cmd_info(input),
    }
}

/// Expand directories into their `*.json` files, sorted by name.
fn collect_inputs(inputs: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for input in inputs {
        if input.is_dir() {
            let mut found: Vec<PathBuf> = fs::read_dir(input)
                .with_context(|| format!("Failed to read directory {}", input.display()))?
                .filter_map(|entry| entry.ok().map(|e| e.path()))
                .filter(|p| p.is_file() && p.extension().is_some_and(|ext| ext == "json"))
                .collect();
            found.sort();
            if found.is_empty() {
                warn!("No network files in {}", input.display());
            }
            files.extend(found);
        } else {
            files.push(input.clone());
        }
    }
    Ok(files)
}

/// `<dir>/<stem>_bylayer.pgm`
fn output_path(input: &Path, output_dir: Option<&Path>) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "network".to_string());
    let dir = output_dir
        .map(Path::to_path_buf)
        .or_else(|| input.parent().map(Path::to_path_buf))
        .unwrap_or_default();
    dir.join(format!("{}_bylayer.pgm", stem))
}

#[allow(clippy::too_many_arguments)]
fn cmd_generate(
    inputs: Vec<PathBuf>,
    output: Option<PathBuf>,
    tables: Vec<PathBuf>,
    materials_file: PathBuf,
    config_file: Option<PathBuf>,
    travel_speed: Option<f64>,
    travel_height: Option<f64>,
    post_dwell: Option<f64>,
) -> Result<()> {
    let mut config = match config_file {
        Some(path) => {
            info!("Loading planner config from: {}", path.display());
            PlannerConfig::from_file(&path).context("Failed to load planner config")?
        }
        None => PlannerConfig::default(),
    };
    if let Some(speed) = travel_speed {
        config = config.travel_speed(speed);
    }
    if let Some(height) = travel_height {
        config = config.travel_height(height);
    }
    if let Some(dwell) = post_dwell {
        config = config.post_extrusion_dwell(dwell);
    }
    config.validate().context("Invalid planner configuration")?;
    info!("Planner config: {}", config);

    let resolver =
        ParameterResolver::from_files(&tables).context("Failed to load mapping tables")?;
    let materials =
        MaterialTable::from_file(&materials_file).context("Failed to load material data")?;
    if resolver.material_count() != materials.len() {
        warn!(
            "{} mapping tables for {} materials",
            resolver.material_count(),
            materials.len()
        );
    }

    let planner = NetworkPlanner::new(config, resolver, materials);
    let files = collect_inputs(&inputs)?;
    if files.is_empty() {
        bail!("No network files to process");
    }
    if let Some(dir) = &output {
        fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create output directory {}", dir.display()))?;
    }

    let progress = if files.len() > 1 {
        let bar = ProgressBar::new(files.len() as u64);
        bar.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                .context("Invalid progress template")?
                .progress_chars("#>-"),
        );
        bar
    } else {
        ProgressBar::hidden()
    };

    let mut failed = 0usize;
    for file in &files {
        progress.set_message(file.display().to_string());
        match generate_one(&planner, file, output.as_deref()) {
            Ok(path) => progress.suspend(|| println!("{} -> {}", file.display(), path.display())),
            Err(err) => {
                failed += 1;
                progress.suspend(|| eprintln!("{}: {:#}", file.display(), err));
            }
        }
        progress.inc(1);
    }
    progress.finish_and_clear();

    if failed > 0 {
        bail!("{} of {} networks failed", failed, files.len());
    }
    Ok(())
}

fn generate_one(planner: &NetworkPlanner, input: &Path, output_dir: Option<&Path>) -> Result<PathBuf> {
    info!("Loading network: {}", input.display());
    let graph = NetworkGraph::from_file(input).context("Failed to load network")?;
    let plan = planner.plan(&graph).context("Planning failed")?;

    let path = output_path(input, output_dir);
    plan.gcode
        .write_to_file(&path)
        .with_context(|| format!("Failed to write {}", path.display()))?;

    info!("{}", plan.summary);
    info!("{}", plan.gcode.stats);
    Ok(path)
}

fn cmd_annotate(input: PathBuf, tables: Vec<PathBuf>, output: Option<PathBuf>) -> Result<()> {
    let graph = NetworkGraph::from_file(&input).context("Failed to load network")?;
    let resolver =
        ParameterResolver::from_files(&tables).context("Failed to load mapping tables")?;

    let ordered =
        annotate_edges(&graph, &resolver).context("Failed to resolve print parameters")?;

    let path = output.unwrap_or_else(|| {
        let stem = input
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "network".to_string());
        input.with_file_name(format!("{}_annotated.json", stem))
    });
    let json = serde_json::to_string_pretty(&ordered)?;
    fs::write(&path, json).with_context(|| format!("Failed to write {}", path.display()))?;

    println!("Annotated {} edges -> {}", ordered.len(), path.display());
    Ok(())
}

fn cmd_info(input: PathBuf) -> Result<()> {
    let graph = NetworkGraph::from_file(&input).context("Failed to load network")?;

    let mut speeds: Vec<f64> = graph.edges().iter().map(|e| e.print_speed_mmps).collect();
    speeds.sort_by(|a, b| b.total_cmp(a));
    speeds.dedup();

    let mut materials: BTreeMap<usize, usize> = BTreeMap::new();
    for edge in graph.edges() {
        *materials.entry(edge.material_index()).or_default() += 1;
    }
    let layers: u64 = graph.edges().iter().map(|e| e.numlayers_z as u64).sum();

    println!("Network Information:");
    println!("  File: {}", input.display());
    println!("  Nodes: {}", graph.node_count());
    println!("  Edges: {}", graph.edge_count());
    println!("  Total layers: {}", layers);
    println!("  Speed buckets ({}):", speeds.len());
    for speed in speeds {
        let count = graph
            .edges()
            .iter()
            .filter(|e| e.print_speed_mmps == speed)
            .count();
        println!("    {} mm/s: {} edges", speed, count);
    }
    println!("  Materials:");
    for (material, count) in materials {
        println!("    {}: {} edges", material, count);
    }

    Ok(())
}
