//! Configuration for the image clustering pipeline.

use crate::cluster::{ClusteringAlgorithm, KMeans, KMedians};
use crate::features::{ColorMoments, FeatureExtractor, HueHistogram};
use crate::reduce::{ClassicalMds, DimReductionAlgorithm};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;

/// Main configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Input configuration
    pub input: InputConfig,

    /// Output configuration
    pub output: OutputConfig,

    /// Processing configuration
    #[serde(default)]
    pub processing: ProcessingConfig,

    /// Algorithm selection
    #[serde(default)]
    pub algorithms: AlgorithmConfig,
}

/// Input data configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputConfig {
    /// Directory to scan for images
    pub directory: PathBuf,

    /// Descend into subdirectories
    #[serde(default = "default_true")]
    pub recursive: bool,
}

/// Output configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Directory receiving one numbered subdirectory per cluster
    pub directory: PathBuf,

    /// Copy files into cluster directories instead of moving them
    #[serde(default)]
    pub keep_originals: bool,

    /// Optional path for the reduced 2-D layout as JSON
    #[serde(default)]
    pub layout_path: Option<PathBuf>,
}

/// Processing configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessingConfig {
    /// Number of worker threads per fan-out stage
    #[serde(default = "default_threads")]
    pub threads: usize,

    /// Tokio runtime worker threads (null = num CPUs)
    #[serde(default)]
    pub worker_threads: Option<usize>,

    /// Rayon thread pool size for CPU-bound clustering (null = num CPUs)
    #[serde(default)]
    pub rayon_threads: Option<usize>,

    /// Delay between pipeline polls in milliseconds
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,

    /// Width images are resized to before feature extraction
    #[serde(default = "default_resize_edge")]
    pub resize_width: u32,

    /// Height images are resized to before feature extraction
    #[serde(default = "default_resize_edge")]
    pub resize_height: u32,
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            threads: default_threads(),
            worker_threads: None,
            rayon_threads: None,
            poll_interval_ms: default_poll_interval(),
            resize_width: default_resize_edge(),
            resize_height: default_resize_edge(),
        }
    }
}

/// Algorithm selection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlgorithmConfig {
    /// Feature extractor
    #[serde(default)]
    pub feature_extractor: FeatureExtractorKind,

    /// Clustering algorithm
    #[serde(default)]
    pub clustering: ClusteringKind,

    /// Dimensionality reduction for the 2-D layout; null disables the stage
    #[serde(default = "default_reduction")]
    pub reduction: Option<ReductionKind>,
}

impl Default for AlgorithmConfig {
    fn default() -> Self {
        Self {
            feature_extractor: FeatureExtractorKind::default(),
            clustering: ClusteringKind::default(),
            reduction: default_reduction(),
        }
    }
}

/// Selectable feature extractors.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum FeatureExtractorKind {
    HueHistogram {
        #[serde(default = "default_bins")]
        bins: usize,
    },
    ColorMoments,
}

impl Default for FeatureExtractorKind {
    fn default() -> Self {
        Self::HueHistogram {
            bins: default_bins(),
        }
    }
}

impl FeatureExtractorKind {
    pub fn build(&self) -> anyhow::Result<Arc<dyn FeatureExtractor>> {
        Ok(match self {
            Self::HueHistogram { bins } => Arc::new(HueHistogram::new(*bins)?),
            Self::ColorMoments => Arc::new(ColorMoments),
        })
    }
}

/// Selectable clustering algorithms.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ClusteringKind {
    KMeans {
        #[serde(default = "default_clusters")]
        clusters: usize,
    },
    KMedians {
        #[serde(default = "default_clusters")]
        clusters: usize,
    },
}

impl Default for ClusteringKind {
    fn default() -> Self {
        Self::KMeans {
            clusters: default_clusters(),
        }
    }
}

impl ClusteringKind {
    pub fn build(&self) -> anyhow::Result<Arc<dyn ClusteringAlgorithm>> {
        Ok(match self {
            Self::KMeans { clusters } => Arc::new(KMeans::new(*clusters)?),
            Self::KMedians { clusters } => Arc::new(KMedians::new(*clusters)?),
        })
    }
}

/// Selectable dimensionality reduction algorithms.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ReductionKind {
    Mds,
}

impl ReductionKind {
    pub fn build(&self) -> anyhow::Result<Arc<dyn DimReductionAlgorithm>> {
        Ok(match self {
            Self::Mds => Arc::new(ClassicalMds::new()),
        })
    }
}

impl Config {
    /// Load configuration from a YAML or JSON file.
    /// Format is auto-detected from file extension (.yaml, .yml, or .json).
    pub fn from_file(path: &PathBuf) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");

        let config: Config = match ext {
            "json" => serde_json::from_str(&contents)?,
            // YAML is a superset of JSON, so it is also the fallback.
            _ => serde_yaml::from_str(&contents)?,
        };
        Ok(config)
    }

    /// Load configuration from a YAML string.
    pub fn from_yaml(yaml: &str) -> anyhow::Result<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Serialize configuration to YAML.
    pub fn to_yaml(&self) -> anyhow::Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.processing.threads == 0 {
            anyhow::bail!("threads must be > 0");
        }
        if self.processing.resize_width == 0 || self.processing.resize_height == 0 {
            anyhow::bail!("resize dimensions must be > 0");
        }

        match &self.algorithms.feature_extractor {
            FeatureExtractorKind::HueHistogram { bins } if *bins == 0 => {
                anyhow::bail!("histogram bin count must be > 0");
            }
            _ => {}
        }

        match &self.algorithms.clustering {
            ClusteringKind::KMeans { clusters } | ClusteringKind::KMedians { clusters }
                if *clusters == 0 =>
            {
                anyhow::bail!("cluster count must be > 0");
            }
            _ => {}
        }

        Ok(())
    }
}

// Default value functions for serde
fn default_true() -> bool {
    true
}
fn default_threads() -> usize {
    std::thread::available_parallelism().map_or(4, |n| n.get())
}
fn default_poll_interval() -> u64 {
    100
}
fn default_resize_edge() -> u32 {
    300
}
fn default_bins() -> usize {
    32
}
fn default_clusters() -> usize {
    8
}
fn default_reduction() -> Option<ReductionKind> {
    Some(ReductionKind::Mds)
}
