//! picsort CLI
//!
//! Sort an image collection into visually similar clusters.

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use picsort::{init_rayon, pipeline::chunks, run_sort, Config};

#[derive(Parser)]
#[command(name = "picsort")]
#[command(about = "Cluster image collections by visual similarity", long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.yaml", global = true)]
    config: PathBuf,

    /// Override worker thread count
    #[arg(long, global = true)]
    threads: Option<usize>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the clustering pipeline (default if no command specified)
    Run,

    /// Enumerate the input and print the work plan without processing
    Analyze,

    /// Validate configuration
    Validate,

    /// Generate a sample configuration file
    GenerateConfig {
        /// Output path for configuration file
        #[arg(short, long, default_value = "config.yaml")]
        output: PathBuf,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .init();

    let cli = Cli::parse();

    match cli.command {
        None | Some(Commands::Run) => run_command(cli.config, cli.threads)?,
        Some(Commands::Analyze) => analyze_command(cli.config, cli.threads)?,
        Some(Commands::Validate) => validate_command(cli.config)?,
        Some(Commands::GenerateConfig { output }) => generate_config_command(output)?,
    }

    Ok(())
}

fn run_command(config_path: PathBuf, threads: Option<usize>) -> Result<()> {
    let mut config = Config::from_file(&config_path)?;

    if let Some(threads) = threads {
        config.processing.threads = threads;
    }

    config.validate()?;
    init_rayon(config.processing.rayon_threads)?;

    let summary = run_sort(&config)?;
    println!("{summary}");

    Ok(())
}

fn analyze_command(config_path: PathBuf, threads: Option<usize>) -> Result<()> {
    let mut config = Config::from_file(&config_path)?;

    if let Some(threads) = threads {
        config.processing.threads = threads;
    }

    config.validate()?;

    let paths = picsort::io::list_images(&config.input.directory, config.input.recursive)?;

    println!("\n=== Work Analysis ===");
    println!("Input directory: {}", config.input.directory.display());
    println!("Images found: {}", paths.len());

    if paths.is_empty() {
        println!("Nothing to do.");
        return Ok(());
    }

    let plan = chunks::plan(paths.len(), config.processing.threads)?;
    println!(
        "Workers per fan-out stage: {} (requested {})",
        plan.len(),
        config.processing.threads
    );
    for (index, range) in plan.ranges().iter().enumerate() {
        println!("  worker {index}: images [{}, {})", range.start, range.end);
    }

    println!("\n=== Algorithms ===");
    println!("Feature extractor: {:?}", config.algorithms.feature_extractor);
    println!("Clustering: {:?}", config.algorithms.clustering);
    match &config.algorithms.reduction {
        Some(kind) => println!("Reduction: {kind:?}"),
        None => println!("Reduction: disabled"),
    }
    println!("=====================\n");

    Ok(())
}

fn validate_command(config_path: PathBuf) -> Result<()> {
    let config = Config::from_file(&config_path)?;
    config.validate()?;
    println!("Configuration is valid");
    Ok(())
}

fn generate_config_command(output: PathBuf) -> Result<()> {
    // Generate a commented YAML config
    let yaml = r#"# picsort configuration

# === INPUT: Where to find images ===
input:
  # Directory scanned for images
  directory: "./photos"

  # Descend into subdirectories
  recursive: true

# === OUTPUT: Where clustered files go ===
output:
  # One numbered subdirectory is created per cluster
  directory: "./sorted"

  # Copy files instead of moving them
  keep_originals: false

  # Write the reduced 2-D layout as JSON (omit to skip)
  # layout_path: "./sorted/layout.json"

# === PROCESSING: Performance tuning ===
processing:
  # Worker threads per fan-out stage (load, preprocess, extract)
  threads: 4

  # Tokio runtime worker threads (null = num CPUs)
  # worker_threads: 8

  # Rayon thread pool size for clustering (null = num CPUs)
  # rayon_threads: 8

  # Delay between pipeline polls in milliseconds
  poll_interval_ms: 100

  # Images are resized to this size before feature extraction
  resize_width: 300
  resize_height: 300

# === ALGORITHMS ===
algorithms:
  # Feature extractor: hue-histogram (with bins) or color-moments
  feature_extractor:
    type: hue-histogram
    bins: 32

  # Clustering: k-means or k-medians, each with a cluster count
  clustering:
    type: k-means
    clusters: 8

  # Dimensionality reduction for the layout; comment out to disable
  reduction:
    type: mds
"#;

    std::fs::write(&output, yaml)?;
    println!("Generated sample configuration at: {}", output.display());

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parse_default() {
        // No subcommand - should default to Run
        let cli = Cli::try_parse_from(["picsort"]);
        assert!(cli.is_ok());
        assert!(cli.unwrap().command.is_none());
    }

    #[test]
    fn test_cli_parse_with_config() {
        let cli = Cli::try_parse_from(["picsort", "-c", "other.yaml"]);
        assert!(cli.is_ok());
    }

    #[test]
    fn test_cli_parse_validate() {
        let cli = Cli::try_parse_from(["picsort", "validate", "-c", "test.json"]);
        assert!(cli.is_ok());
    }

    #[test]
    fn test_generated_config_parses() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        generate_config_command(path.clone()).unwrap();

        let config = Config::from_file(&path).unwrap();
        assert!(config.validate().is_ok());
    }
}
