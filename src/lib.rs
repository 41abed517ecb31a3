//! picsort
//!
//! Batch image clustering pipeline: load, preprocess, featurize, cluster,
//! and lay out an image collection, then sort the files into one directory
//! per cluster.
//!
//! # Architecture
//!
//! - **Pipeline**: poll-driven state machine fanning each stage out over a
//!   bounded worker pool, with lock-free progress counters
//! - **I/O**: image decoding, input enumeration, clustered output placement
//! - **Transform**: preprocessing (uniform resize)
//! - **Features**: hue histogram and color moment extractors
//! - **Cluster / Reduce**: k-means, k-medians, and classical MDS for the
//!   2-D layout
//!
//! # Usage
//!
//! ```no_run
//! use picsort::{run_sort, Config};
//!
//! fn main() -> anyhow::Result<()> {
//!     let config = Config::from_file(&"config.yaml".into())?;
//!     let summary = run_sort(&config)?;
//!     println!("{summary}");
//!     Ok(())
//! }
//! ```

pub mod cluster;
pub mod config;
pub mod error;
pub mod features;
pub mod io;
pub mod pipeline;
pub mod reduce;
pub mod transform;
pub mod types;

pub use config::Config;
pub use error::Error;
pub use pipeline::{Pipeline, PipelineStages, PipelineState, Progress};
pub use types::{Cluster, FeatureRecord, LoadedImage};

use anyhow::{Context, Result};
use std::time::{Duration, Instant};

/// Run the full clustering pipeline and sort the files it clusters.
///
/// Drives the pipeline with the polling protocol: a non-blocking
/// [`Pipeline::advance`] per tick, a progress log line whenever the numbers
/// move, and a short sleep in between.
pub fn run_sort(config: &Config) -> Result<SortSummary> {
    config.validate()?;

    let started = Instant::now();

    let paths = io::list_images(&config.input.directory, config.input.recursive)?;
    if paths.is_empty() {
        anyhow::bail!(
            "no images found under {}",
            config.input.directory.display()
        );
    }
    tracing::info!(
        "found {} images under {}",
        paths.len(),
        config.input.directory.display()
    );

    let stages = PipelineStages::from_config(config)?;
    let has_reducer = stages.reducer.is_some();

    let mut pipeline = Pipeline::new(stages, config.processing.worker_threads)?;
    let image_count = paths.len();
    pipeline.set_input(paths)?;
    pipeline.start(config.processing.threads)?;

    let poll_interval = Duration::from_millis(config.processing.poll_interval_ms.max(1));
    let mut last_progress = pipeline.progress();
    loop {
        let state = pipeline.advance()?;
        let progress = pipeline.progress();
        if progress != last_progress {
            tracing::info!("[{state}] {progress}");
            last_progress = progress;
        }
        if state == PipelineState::Completed {
            break;
        }
        std::thread::sleep(poll_interval);
    }

    let clusters = pipeline.clusters()?;
    let files_placed = io::sort_into_directories(
        &clusters,
        &config.output.directory,
        config.output.keep_originals,
    )?;

    let mut layout_written = None;
    if has_reducer {
        if let Some(path) = &config.output.layout_path {
            let reduced = pipeline.reduced_features()?;
            let json = serde_json::to_string_pretty(&reduced)?;
            std::fs::write(path, json)
                .with_context(|| format!("failed to write layout to {}", path.display()))?;
            layout_written = Some(path.clone());
        }
    }

    let summary = SortSummary {
        images: image_count,
        cluster_sizes: clusters.iter().map(types::Cluster::len).collect(),
        files_placed,
        layout_written,
        elapsed: started.elapsed(),
    };

    tracing::info!("pipeline complete: {summary}");
    Ok(summary)
}

/// Statistics from a completed sorting run.
#[derive(Debug, Clone)]
pub struct SortSummary {
    /// Images fed into the pipeline
    pub images: usize,

    /// Size of each resulting cluster
    pub cluster_sizes: Vec<usize>,

    /// Files moved or copied into cluster directories
    pub files_placed: usize,

    /// Where the reduced 2-D layout was written, if anywhere
    pub layout_written: Option<std::path::PathBuf>,

    /// Wall-clock duration of the run
    pub elapsed: Duration,
}

impl std::fmt::Display for SortSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Images: {}, Clusters: {} (sizes: {:?}), Placed: {}, Elapsed: {:.1}s",
            self.images,
            self.cluster_sizes.len(),
            self.cluster_sizes,
            self.files_placed,
            self.elapsed.as_secs_f64(),
        )
    }
}

/// Build a Tokio runtime with the specified configuration.
pub fn build_runtime(worker_threads: Option<usize>) -> Result<tokio::runtime::Runtime> {
    let mut builder = tokio::runtime::Builder::new_multi_thread();

    if let Some(threads) = worker_threads {
        builder.worker_threads(threads);
    }

    builder.enable_all();

    Ok(builder.build()?)
}

/// Initialize the Rayon thread pool.
pub fn init_rayon(threads: Option<usize>) -> Result<()> {
    if let Some(threads) = threads {
        rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_display() {
        let summary = SortSummary {
            images: 12,
            cluster_sizes: vec![7, 5],
            files_placed: 12,
            layout_written: None,
            elapsed: Duration::from_secs(3),
        };

        let line = format!("{summary}");
        assert!(line.contains("Images: 12"));
        assert!(line.contains("Clusters: 2"));
        assert!(line.contains("Placed: 12"));
    }

    #[test]
    fn test_build_runtime() {
        assert!(build_runtime(Some(1)).is_ok());
        assert!(build_runtime(None).is_ok());
    }
}
