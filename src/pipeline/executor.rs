//! Fan-out execution of one stage across a chunk plan.
//!
//! One blocking worker is spawned per chunk. Each worker extracts its slice
//! from the input pool (transient lock hold), runs the stage closure over
//! the batch, and appends the output (or writes it back over its own range
//! for in-place stages). Workers never talk to each other; their only
//! shared state is the pools and the progress counter, both internally
//! synchronized. Errors and panics are captured by the returned handles and
//! re-raised at the state machine's join point.

use crate::pipeline::{ChunkPlan, SharedPool, StageProgress};
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

/// Handle to one stage worker.
pub type WorkerHandle = JoinHandle<anyhow::Result<()>>;

/// Non-blocking completion probe over a stage's worker set.
pub fn all_finished(workers: &[WorkerHandle]) -> bool {
    !workers.is_empty() && workers.iter().all(|handle| handle.is_finished())
}

/// Launch one worker per chunk, appending each worker's output batch to
/// `output`.
pub fn fan_out<I, O, F>(
    handle: &Handle,
    plan: &ChunkPlan,
    input: &Arc<SharedPool<I>>,
    output: &Arc<SharedPool<O>>,
    progress: &StageProgress,
    work: F,
) -> Vec<WorkerHandle>
where
    I: Clone + Send + 'static,
    O: Send + 'static,
    F: Fn(Vec<I>, &StageProgress) -> anyhow::Result<Vec<O>> + Send + Sync + 'static,
{
    let work = Arc::new(work);

    plan.ranges()
        .iter()
        .cloned()
        .map(|range| {
            let input = Arc::clone(input);
            let output = Arc::clone(output);
            let progress = progress.clone();
            let work = Arc::clone(&work);

            handle.spawn_blocking(move || {
                let batch = input.extract_range(range);
                let produced = (*work)(batch, &progress)?;
                output.append_all(produced);
                Ok(())
            })
        })
        .collect()
}

/// Launch one worker per chunk, writing each worker's output back over the
/// range it extracted. Batch length must be preserved by the closure.
pub fn fan_out_in_place<T, F>(
    handle: &Handle,
    plan: &ChunkPlan,
    pool: &Arc<SharedPool<T>>,
    progress: &StageProgress,
    work: F,
) -> Vec<WorkerHandle>
where
    T: Clone + Send + 'static,
    F: Fn(Vec<T>, &StageProgress) -> anyhow::Result<Vec<T>> + Send + Sync + 'static,
{
    let work = Arc::new(work);

    plan.ranges()
        .iter()
        .cloned()
        .map(|range| {
            let pool = Arc::clone(pool);
            let progress = progress.clone();
            let work = Arc::clone(&work);

            handle.spawn_blocking(move || {
                let start = range.start;
                let batch = pool.extract_range(range);
                let produced = (*work)(batch, &progress)?;
                pool.write_range(start, produced);
                Ok(())
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::chunks;
    use anyhow::anyhow;
    use std::time::{Duration, Instant};

    fn runtime() -> tokio::runtime::Runtime {
        tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .build()
            .unwrap()
    }

    fn join_all(rt: &tokio::runtime::Runtime, workers: Vec<WorkerHandle>) -> Vec<anyhow::Result<()>> {
        workers
            .into_iter()
            .map(|handle| rt.block_on(handle).unwrap())
            .collect()
    }

    #[test]
    fn test_fan_out_processes_every_chunk() {
        let rt = runtime();
        let plan = chunks::plan(10, 3).unwrap();
        let input = Arc::new(SharedPool::new());
        input.replace((0..10).collect());
        let output: Arc<SharedPool<i32>> = Arc::new(SharedPool::new());
        let progress = StageProgress::new();

        let workers = fan_out(rt.handle(), &plan, &input, &output, &progress, |batch, progress| {
            let doubled = batch.iter().map(|n| n * 2).collect();
            progress.add(batch.len());
            Ok(doubled)
        });

        assert_eq!(workers.len(), 3);
        for result in join_all(&rt, workers) {
            result.unwrap();
        }

        let mut produced = output.snapshot();
        produced.sort_unstable();
        assert_eq!(produced, (0..10).map(|n| n * 2).collect::<Vec<_>>());
        assert_eq!(progress.completed(), 10);
    }

    #[test]
    fn test_fan_out_in_place_keeps_positions() {
        let rt = runtime();
        let plan = chunks::plan(7, 2).unwrap();
        let pool = Arc::new(SharedPool::new());
        pool.replace((0..7).collect());
        let progress = StageProgress::new();

        let workers = fan_out_in_place(rt.handle(), &plan, &pool, &progress, |batch, progress| {
            progress.add(batch.len());
            Ok(batch.iter().map(|n| n + 100).collect())
        });

        for result in join_all(&rt, workers) {
            result.unwrap();
        }

        // In-place stages preserve positional order, unlike appends.
        assert_eq!(pool.snapshot(), (100..107).collect::<Vec<_>>());
    }

    #[test]
    fn test_worker_error_is_captured_not_swallowed() {
        let rt = runtime();
        let plan = chunks::plan(4, 2).unwrap();
        let input = Arc::new(SharedPool::new());
        input.replace(vec![1, 2, 3, 4]);
        let output: Arc<SharedPool<i32>> = Arc::new(SharedPool::new());
        let progress = StageProgress::new();

        let workers = fan_out(rt.handle(), &plan, &input, &output, &progress, |batch, _| {
            if batch.contains(&1) {
                Err(anyhow!("unreadable item"))
            } else {
                Ok(batch)
            }
        });

        let results = join_all(&rt, workers);
        assert_eq!(results.iter().filter(|r| r.is_err()).count(), 1);
        assert_eq!(output.len(), 2);
    }

    #[test]
    fn test_all_finished_probe() {
        let rt = runtime();
        let plan = chunks::plan(2, 1).unwrap();
        let input = Arc::new(SharedPool::new());
        input.replace(vec![1, 2]);
        let output: Arc<SharedPool<i32>> = Arc::new(SharedPool::new());
        let progress = StageProgress::new();

        assert!(!all_finished(&[]));

        let workers = fan_out(rt.handle(), &plan, &input, &output, &progress, |batch, _| Ok(batch));

        let deadline = Instant::now() + Duration::from_secs(5);
        while !all_finished(&workers) {
            assert!(Instant::now() < deadline, "worker never finished");
            std::thread::sleep(Duration::from_millis(1));
        }

        join_all(&rt, workers);
    }
}
