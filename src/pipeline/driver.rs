//! Pipeline driver: state machine, stage launching, and the polling API.
//!
//! The driver owns the pools, the worker handles, and the collaborator
//! objects for the lifetime of a run. An external caller (CLI loop or GUI
//! timer) drives it by calling [`Pipeline::advance`] repeatedly: each call
//! is a non-blocking probe that either does nothing (current stage still
//! running), or joins the finished stage and launches the next one. The
//! caller's thread is never stalled waiting for work to finish.
//!
//! Fan-out stages (load, preprocess, extract) run one blocking worker per
//! chunk of the input; the clustering and dimensionality reduction stages
//! run as single background tasks over the whole feature dataset. A stage's
//! workers are always joined before the next stage is launched, so a stage
//! sees a fully populated, stable input pool.

use crate::cluster::ClusteringAlgorithm;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::features::FeatureExtractor;
use crate::io::{FsLoader, ImageLoader};
use crate::pipeline::{
    chunks, executor, ChunkPlan, PipelineState, Progress, ProgressTracker, SharedPool,
};
use crate::reduce::DimReductionAlgorithm;
use crate::transform::{Preprocessor, Resizer};
use crate::types::{Cluster, FeatureRecord, LoadedImage};
use anyhow::anyhow;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::runtime::Runtime;
use tokio::task::{JoinError, JoinHandle};

/// Output dimensionality handed to the reduction algorithm.
pub const REDUCED_DIM: usize = 2;

/// The pluggable stage collaborators, selected once at construction.
#[derive(Clone)]
pub struct PipelineStages {
    pub loader: Arc<dyn ImageLoader>,
    pub preprocessor: Arc<dyn Preprocessor>,
    pub extractor: Arc<dyn FeatureExtractor>,
    pub clustering: Arc<dyn ClusteringAlgorithm>,
    pub reducer: Option<Arc<dyn DimReductionAlgorithm>>,
}

impl PipelineStages {
    /// Build the collaborator set described by a configuration.
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        Ok(Self {
            loader: Arc::new(FsLoader),
            preprocessor: Arc::new(Resizer::new(
                config.processing.resize_width,
                config.processing.resize_height,
            )),
            extractor: config.algorithms.feature_extractor.build()?,
            clustering: config.algorithms.clustering.build()?,
            reducer: config
                .algorithms
                .reduction
                .as_ref()
                .map(|kind| kind.build())
                .transpose()?,
        })
    }
}

/// Batch image clustering pipeline.
pub struct Pipeline {
    runtime: Runtime,
    stages: PipelineStages,

    state: PipelineState,
    halted: Option<PipelineState>,
    input_size: usize,
    plan: Option<ChunkPlan>,

    paths: Arc<SharedPool<PathBuf>>,
    images: Arc<SharedPool<LoadedImage>>,
    features: Arc<SharedPool<FeatureRecord>>,
    progress: Arc<ProgressTracker>,

    workers: Vec<executor::WorkerHandle>,
    clustering_task: Option<JoinHandle<anyhow::Result<Vec<Cluster>>>>,
    reduction_task: Option<JoinHandle<anyhow::Result<Vec<FeatureRecord>>>>,
    cluster_result: Option<Vec<Cluster>>,
    reduced_result: Option<Vec<FeatureRecord>>,
}

impl Pipeline {
    /// Create a pipeline with the given collaborators.
    ///
    /// `worker_threads` sizes the owned Tokio runtime; stage workers run on
    /// its blocking pool, bounded per stage by the chunk plan.
    pub fn new(stages: PipelineStages, worker_threads: Option<usize>) -> anyhow::Result<Self> {
        let runtime = crate::build_runtime(worker_threads)?;

        Ok(Self {
            runtime,
            stages,
            state: PipelineState::Ready,
            halted: None,
            input_size: 0,
            plan: None,
            paths: Arc::new(SharedPool::new()),
            images: Arc::new(SharedPool::new()),
            features: Arc::new(SharedPool::new()),
            progress: Arc::new(ProgressTracker::new()),
            workers: Vec::new(),
            clustering_task: None,
            reduction_task: None,
            cluster_result: None,
            reduced_result: None,
        })
    }

    /// Supply the input paths. Legal only while `Ready`.
    pub fn set_input(&mut self, paths: Vec<PathBuf>) -> Result<()> {
        self.ensure_state(PipelineState::Ready, "set_input")?;

        self.input_size = paths.len();
        self.progress.set_total(self.input_size);
        self.paths.replace(paths);
        Ok(())
    }

    /// Launch the first stage across `threads` workers. Legal only while
    /// `Ready`, with a nonzero thread count and a non-empty input.
    pub fn start(&mut self, threads: usize) -> Result<()> {
        self.ensure_state(PipelineState::Ready, "start")?;

        if threads == 0 {
            return Err(Error::ZeroThreads);
        }
        if self.input_size == 0 {
            return Err(Error::EmptyInput);
        }

        self.plan = Some(chunks::plan(self.input_size, threads)?);
        self.state = PipelineState::LoadingImages;
        self.spawn_load();

        tracing::info!(
            images = self.input_size,
            workers = self.plan.as_ref().map_or(0, ChunkPlan::len),
            "pipeline started"
        );
        Ok(())
    }

    pub fn status(&self) -> PipelineState {
        self.state
    }

    pub fn progress(&self) -> Progress {
        self.progress.snapshot()
    }

    /// Poll the pipeline forward.
    ///
    /// No-op while the current stage is still running. Once the stage has
    /// finished, joins its workers or task (brief: they have already exited
    /// or are about to), re-raises any captured failure, and launches the
    /// next stage. Never blocks waiting for work to finish.
    pub fn advance(&mut self) -> Result<PipelineState> {
        if let Some(stage) = self.halted {
            return Err(Error::Halted { stage });
        }

        if self.state.is_idle() || !self.current_stage_finished() {
            return Ok(self.state);
        }

        self.join_current_stage()?;
        self.transition();
        Ok(self.state)
    }

    /// The computed clusters. Legal only once `Completed`.
    pub fn clusters(&self) -> Result<Vec<Cluster>> {
        self.ensure_state(PipelineState::Completed, "clusters")?;
        Ok(self.cluster_result.clone().unwrap_or_default())
    }

    /// The dimensionality-reduced feature set. Legal only once `Completed`,
    /// and only when a reducer was configured.
    pub fn reduced_features(&self) -> Result<Vec<FeatureRecord>> {
        self.ensure_state(PipelineState::Completed, "reduced_features")?;
        if self.stages.reducer.is_none() {
            return Err(Error::NoReducerConfigured);
        }
        Ok(self.reduced_result.clone().unwrap_or_default())
    }

    /// Return the pipeline to `Ready`, clearing all pools, counters, and
    /// results. Legal from `Ready`, `Completed`, or a halted pipeline (all
    /// of which have no work in flight); illegal while a stage runs.
    pub fn reset(&mut self) -> Result<()> {
        if !self.state.is_idle() && self.halted.is_none() {
            return Err(Error::InvalidState {
                operation: "reset",
                state: self.state,
            });
        }

        self.state = PipelineState::Ready;
        self.halted = None;
        self.input_size = 0;
        self.plan = None;
        self.workers.clear();
        self.clustering_task = None;
        self.reduction_task = None;
        self.cluster_result = None;
        self.reduced_result = None;
        self.paths.clear();
        self.images.clear();
        self.features.clear();
        self.progress.reset();
        Ok(())
    }

    fn ensure_state(&self, expected: PipelineState, operation: &'static str) -> Result<()> {
        if self.state == expected {
            Ok(())
        } else {
            Err(Error::InvalidState {
                operation,
                state: self.state,
            })
        }
    }

    /// Non-blocking probe for the current stage's completion.
    ///
    /// Fan-out stages are finished when their counter reaches the input
    /// size, or when every worker has exited (which covers workers that
    /// failed before finishing their batch). Background stages are probed
    /// through their task handle.
    fn current_stage_finished(&self) -> bool {
        match self.state {
            PipelineState::LoadingImages => {
                self.progress.loaded.completed() == self.input_size
                    || executor::all_finished(&self.workers)
            }
            PipelineState::PreprocessingImages => {
                self.progress.preprocessed.completed() == self.input_size
                    || executor::all_finished(&self.workers)
            }
            PipelineState::GeneratingFeatures => {
                self.progress.features_extracted.completed() == self.input_size
                    || executor::all_finished(&self.workers)
            }
            PipelineState::PerformingClustering => self
                .clustering_task
                .as_ref()
                .is_some_and(JoinHandle::is_finished),
            PipelineState::ReducingDimensions => self
                .reduction_task
                .as_ref()
                .is_some_and(JoinHandle::is_finished),
            PipelineState::Ready | PipelineState::Completed => true,
        }
    }

    fn join_current_stage(&mut self) -> Result<()> {
        match self.state {
            PipelineState::LoadingImages
            | PipelineState::PreprocessingImages
            | PipelineState::GeneratingFeatures => self.join_workers(),

            PipelineState::PerformingClustering => {
                let Some(task) = self.clustering_task.take() else {
                    return Ok(());
                };
                match flatten(self.runtime.block_on(task)) {
                    Ok(clusters) => {
                        self.progress.mark_clustering_done();
                        self.cluster_result = Some(clusters);
                        Ok(())
                    }
                    Err(error) => self.halt(error),
                }
            }

            PipelineState::ReducingDimensions => {
                let Some(task) = self.reduction_task.take() else {
                    return Ok(());
                };
                match flatten(self.runtime.block_on(task)) {
                    Ok(reduced) => {
                        self.progress.mark_reduction_done();
                        self.reduced_result = Some(reduced);
                        Ok(())
                    }
                    Err(error) => self.halt(error),
                }
            }

            PipelineState::Ready | PipelineState::Completed => Ok(()),
        }
    }

    /// Join every worker of the finished stage, keeping the first captured
    /// failure. Later failures are logged rather than lost.
    fn join_workers(&mut self) -> Result<()> {
        let mut first_error = None;

        for handle in self.workers.drain(..) {
            match flatten(self.runtime.block_on(handle)) {
                Ok(()) => {}
                Err(error) if first_error.is_none() => first_error = Some(error),
                Err(error) => tracing::warn!("additional worker failure: {error:#}"),
            }
        }

        match first_error {
            None => Ok(()),
            Some(error) => self.halt(error),
        }
    }

    fn halt(&mut self, error: anyhow::Error) -> Result<()> {
        let stage = self.state;
        self.halted = Some(stage);
        tracing::error!(stage = %stage, "pipeline halted: {error:#}");
        Err(Error::StageFailed { stage, error })
    }

    fn transition(&mut self) {
        match self.state {
            PipelineState::LoadingImages => {
                self.state = self.state.next();
                self.spawn_preprocess();
            }
            PipelineState::PreprocessingImages => {
                self.state = self.state.next();
                self.spawn_extract();
            }
            PipelineState::GeneratingFeatures => {
                self.state = self.state.next();
                self.spawn_cluster();
            }
            PipelineState::PerformingClustering => {
                if self.stages.reducer.is_some() {
                    self.state = self.state.next();
                    self.spawn_reduce();
                } else {
                    self.state = PipelineState::Completed;
                }
            }
            PipelineState::ReducingDimensions => {
                self.state = PipelineState::Completed;
            }
            PipelineState::Ready | PipelineState::Completed => {}
        }

        tracing::info!(state = %self.state, "pipeline advanced");
    }

    fn spawn_load(&mut self) {
        let Some(plan) = &self.plan else { return };
        let loader = Arc::clone(&self.stages.loader);

        self.workers = executor::fan_out(
            self.runtime.handle(),
            plan,
            &self.paths,
            &self.images,
            &self.progress.loaded,
            move |batch, progress| loader.load_batch(batch, progress),
        );
    }

    fn spawn_preprocess(&mut self) {
        let Some(plan) = &self.plan else { return };
        let preprocessor = Arc::clone(&self.stages.preprocessor);

        self.workers = executor::fan_out_in_place(
            self.runtime.handle(),
            plan,
            &self.images,
            &self.progress.preprocessed,
            move |batch, progress| preprocessor.prepare_batch(batch, progress),
        );
    }

    fn spawn_extract(&mut self) {
        let Some(plan) = &self.plan else { return };
        let extractor = Arc::clone(&self.stages.extractor);

        self.workers = executor::fan_out(
            self.runtime.handle(),
            plan,
            &self.images,
            &self.features,
            &self.progress.features_extracted,
            move |batch, progress| extractor.build_features(batch, progress),
        );
    }

    fn spawn_cluster(&mut self) {
        let clustering = Arc::clone(&self.stages.clustering);
        let records = self.features.snapshot();

        self.clustering_task = Some(
            self.runtime
                .spawn_blocking(move || clustering.cluster(&records)),
        );
    }

    fn spawn_reduce(&mut self) {
        let Some(reducer) = self.stages.reducer.as_ref().map(Arc::clone) else {
            return;
        };
        let records = self.features.snapshot();

        self.reduction_task = Some(
            self.runtime
                .spawn_blocking(move || reducer.reduce(&records, REDUCED_DIM)),
        );
    }
}

/// Collapse a join result, turning worker panics into errors.
fn flatten<T>(joined: std::result::Result<anyhow::Result<T>, JoinError>) -> anyhow::Result<T> {
    match joined {
        Ok(inner) => inner,
        Err(join_error) => Err(anyhow!("stage worker panicked: {join_error}")),
    }
}
