//! Bounded concurrency executor
//!
//! Runs one task per chunk with at most `max_concurrent` in flight. Slots
//! are admitted in input order through a fair semaphore, and every result
//! lands in the slot of its chunk index, so the output follows the source's
//! temporal order whatever order tasks finish in.
//!
//! Tasks are multiplexed on the calling task; nothing is spawned, so task
//! futures need not be `Send` or `'static`.

use crate::chunk::{split_bytes, AudioChunk, ByteChunk};
use crate::error::{ChunkProcessingError, OptimizerError, Result};
use crate::monitor::PerformanceMetrics;
use futures_util::stream::{FuturesUnordered, StreamExt};
use std::fmt::Display;
use std::future::Future;
use tokio::sync::Semaphore;

/// Work item carrying the index of its result slot
pub trait Indexed {
    fn index(&self) -> usize;
}

impl Indexed for AudioChunk {
    fn index(&self) -> usize {
        self.index
    }
}

impl Indexed for ByteChunk {
    fn index(&self) -> usize {
        self.index
    }
}

/// Result of one task
pub type ChunkOutcome<T> = std::result::Result<T, ChunkProcessingError>;

/// Per-index outcomes of a run
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionReport<T> {
    outcomes: Vec<ChunkOutcome<T>>,
}

impl<T> ExecutionReport<T> {
    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    /// Outcomes in index order
    pub fn outcomes(&self) -> &[ChunkOutcome<T>] {
        &self.outcomes
    }

    pub fn failures(&self) -> Vec<&ChunkProcessingError> {
        self.outcomes.iter().filter_map(|o| o.as_ref().err()).collect()
    }

    pub fn is_success(&self) -> bool {
        self.outcomes.iter().all(|o| o.is_ok())
    }

    /// Results in index order, or every failure if any task failed
    pub fn into_results(self) -> std::result::Result<Vec<T>, Vec<ChunkProcessingError>> {
        let mut results = Vec::with_capacity(self.outcomes.len());
        let mut failures = Vec::new();

        for outcome in self.outcomes {
            match outcome {
                Ok(value) => results.push(value),
                Err(e) => failures.push(e),
            }
        }

        if failures.is_empty() {
            Ok(results)
        } else {
            Err(failures)
        }
    }
}

/// Executor with a fixed cap on in-flight tasks
#[derive(Debug, Clone, Copy)]
pub struct BoundedExecutor {
    max_concurrent: usize,
}

impl BoundedExecutor {
    /// A cap of 0 is treated as 1
    pub fn new(max_concurrent: usize) -> Self {
        Self {
            max_concurrent: max_concurrent.max(1),
        }
    }

    pub fn max_concurrent(&self) -> usize {
        self.max_concurrent
    }

    /// Run `task` over every item
    ///
    /// A failing task fills its own slot with a [`ChunkProcessingError`];
    /// the others keep running and nothing is retried. `on_progress`
    /// receives `completed / total * 100` after every completion, success
    /// or failure, ending at exactly 100.
    ///
    /// # Errors
    /// Fails before running anything if item indices are not exactly
    /// `0..items.len()`.
    pub async fn run<I, T, E, F, Fut>(
        &self,
        items: Vec<I>,
        task: F,
        mut on_progress: impl FnMut(f64),
    ) -> Result<ExecutionReport<T>>
    where
        I: Indexed,
        E: Display,
        F: Fn(I) -> Fut,
        Fut: Future<Output = std::result::Result<T, E>>,
    {
        let total = items.len();
        validate_indices(&items)?;

        let semaphore = Semaphore::new(self.max_concurrent);
        let task = &task;
        let semaphore = &semaphore;

        let mut pending: FuturesUnordered<_> = items
            .into_iter()
            .map(|item| async move {
                let index = item.index();
                // Never closed, so acquiring only waits
                let _permit = semaphore.acquire().await.ok();
                tracing::trace!(index, "Chunk task admitted");
                (index, task(item).await)
            })
            .collect();

        let mut slots: Vec<Option<ChunkOutcome<T>>> = (0..total).map(|_| None).collect();
        let mut completed = 0;

        while let Some((index, outcome)) = pending.next().await {
            let outcome = outcome.map_err(|e| {
                tracing::warn!(index, error = %e, "Chunk task failed");
                ChunkProcessingError {
                    index,
                    message: e.to_string(),
                }
            });
            slots[index] = Some(outcome);

            completed += 1;
            on_progress(completed as f64 / total as f64 * 100.0);
        }

        let outcomes: Vec<ChunkOutcome<T>> = slots
            .into_iter()
            .enumerate()
            .map(|(index, slot)| {
                slot.unwrap_or_else(|| {
                    Err(ChunkProcessingError {
                        index,
                        message: "task never completed".to_string(),
                    })
                })
            })
            .collect();

        tracing::debug!(
            total,
            failed = outcomes.iter().filter(|o| o.is_err()).count(),
            max_concurrent = self.max_concurrent,
            "Chunk tasks finished"
        );

        Ok(ExecutionReport { outcomes })
    }
}

/// Run `task` over `items` with at most `max_concurrent` in flight
pub async fn run_bounded<I, T, E, F, Fut>(
    items: Vec<I>,
    max_concurrent: usize,
    task: F,
    on_progress: impl FnMut(f64),
) -> Result<ExecutionReport<T>>
where
    I: Indexed,
    E: Display,
    F: Fn(I) -> Fut,
    Fut: Future<Output = std::result::Result<T, E>>,
{
    BoundedExecutor::new(max_concurrent)
        .run(items, task, on_progress)
        .await
}

/// Process an undecoded payload in pieces of the recommended size
///
/// `data` is cut into `metrics.recommended_chunk_size_mb` pieces which run
/// through [`run_bounded`]; progress is reported per finished piece.
pub async fn process_in_chunks<T, E, F, Fut>(
    data: &[u8],
    metrics: &PerformanceMetrics,
    max_concurrent: usize,
    task: F,
    on_progress: impl FnMut(f64),
) -> Result<ExecutionReport<T>>
where
    E: Display,
    F: Fn(ByteChunk) -> Fut,
    Fut: Future<Output = std::result::Result<T, E>>,
{
    let pieces = split_bytes(data, metrics.recommended_chunk_size_mb)?;
    tracing::debug!(
        size = data.len(),
        pieces = pieces.len(),
        chunk_size_mb = metrics.recommended_chunk_size_mb,
        "Processing payload in chunks"
    );
    run_bounded(pieces, max_concurrent, task, on_progress).await
}

fn validate_indices<I: Indexed>(items: &[I]) -> Result<()> {
    let len = items.len();
    let mut seen = vec![false; len];

    for item in items {
        let index = item.index();
        match seen.get_mut(index) {
            None => return Err(OptimizerError::ChunkIndexOutOfRange { index, len }),
            Some(true) => return Err(OptimizerError::DuplicateChunkIndex(index)),
            Some(slot) => *slot = true,
        }
    }
    Ok(())
}
