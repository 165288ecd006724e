//! Harmonia Optimizer
//!
//! Keeps large files tractable:
//! - **Chunk planner**: overlapping time windows over a decoded source
//! - **Bounded executor**: runs chunk tasks under a concurrency cap, results by index
//! - **Byte chunks**: raw payloads cut to the monitor's recommended size
//! - **Resource monitor**: size analysis, memory sampling, advisory warnings
//! - **Complexity estimate**: coarse cost class and chunk length from file size
//!
//! # Example
//!
//! ```rust
//! use harmonia_optimizer::{plan_windows, ChunkingOptions};
//!
//! let options = ChunkingOptions {
//!     chunk_size_secs: 30.0,
//!     overlap_secs: 2.0,
//!     max_concurrent: 3,
//! };
//! let windows = plan_windows(70.0, &options).unwrap();
//!
//! assert_eq!(windows.len(), 3);
//! assert_eq!(windows[1].start_secs, 28.0);
//! assert_eq!(windows[2].end_secs, 70.0);
//! ```

#![forbid(unsafe_code)]

pub mod chunk;
pub mod complexity;
pub mod error;
pub mod executor;
pub mod monitor;

pub use chunk::{
    plan_chunks, plan_windows, split_bytes, AudioChunk, ByteChunk, ChunkWindow, ChunkingOptions,
};
pub use complexity::{chunk_secs_for_size, estimate_complexity, ComplexityEstimate, ProcessingComplexity};
pub use error::{ChunkProcessingError, OptimizerError, Result};
pub use executor::{
    process_in_chunks, run_bounded, BoundedExecutor, ChunkOutcome, ExecutionReport, Indexed,
};
pub use monitor::{
    recommendations, MemoryAvailability, MemoryProbe, MemoryReclaim, PerformanceMetrics,
    PerformanceWarning, ResourceMonitor, SystemMemoryProbe, TempResource,
};
