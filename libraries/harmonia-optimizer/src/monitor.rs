//! Performance and resource monitor
//!
//! Estimates processing cost from file size, samples live memory on a
//! timer, raises advisory warnings and reclaims temporary buffers. One
//! monitor is constructed per session and passed to whoever needs it.

use crate::error::Result;
use harmonia_core::OptimizerSettings;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use sysinfo::{ProcessesToUpdate, System};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

pub(crate) const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

/// Memory usage above which closing other work is recommended
const MEMORY_ADVICE_MB: f64 = 300.0;

/// File size above which multi-minute processing is expected
const SLOW_PROCESSING_MB: f64 = 200.0;

/// Usage ratio above which memory counts as unavailable
const MAX_MEMORY_USAGE: f64 = 0.8;

/// Usage ratio above which optimizing first is recommended
const OPTIMIZE_MEMORY_USAGE: f64 = 0.7;

/// Advisory warning tags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PerformanceWarning {
    /// File is over the configured maximum size
    LargeFile,
    /// File is over the very-large threshold
    VeryLargeFile,
    /// Sampled memory usage went over the threshold
    HighMemory,
}

impl PerformanceWarning {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::LargeFile => "large-file",
            Self::VeryLargeFile => "very-large-file",
            Self::HighMemory => "high-memory",
        }
    }
}

impl std::fmt::Display for PerformanceWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    pub file_size_mb: f64,
    /// Last sampled memory usage; 0 until a sample succeeds
    pub memory_usage_mb: f64,
    pub is_large_file: bool,
    pub recommended_chunk_size_mb: f64,
    pub estimated_processing_time_secs: f64,
    /// Wall time of the last `begin_processing`/`finish_processing` pair
    pub processing_time_secs: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryAvailability {
    pub available: bool,
    pub usage_percentage: f64,
    pub recommendation: String,
}

/// What `optimize_memory` released
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MemoryReclaim {
    pub revoked: usize,
    pub bytes_released: usize,
}

/// Source of memory readings
pub trait MemoryProbe: Send + Sync {
    /// Memory used by this process in MB, if the platform reports it
    fn used_mb(&self) -> Option<f64>;

    /// Memory usable by this process in MB, if known
    fn limit_mb(&self) -> Option<f64>;

    /// Best-effort request to return freed memory to the system
    fn reclaim(&self) {}
}

/// Probe reading process RSS and total memory through sysinfo
pub struct SystemMemoryProbe {
    system: Mutex<System>,
}

impl SystemMemoryProbe {
    pub fn new() -> Self {
        Self {
            system: Mutex::new(System::new()),
        }
    }

    fn system(&self) -> MutexGuard<'_, System> {
        self.system.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for SystemMemoryProbe {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryProbe for SystemMemoryProbe {
    fn used_mb(&self) -> Option<f64> {
        let pid = sysinfo::get_current_pid().ok()?;
        let mut system = self.system();
        system.refresh_processes(ProcessesToUpdate::Some(&[pid]), true);
        system
            .process(pid)
            .map(|process| process.memory() as f64 / BYTES_PER_MB)
    }

    fn limit_mb(&self) -> Option<f64> {
        let mut system = self.system();
        system.refresh_memory();
        match system.total_memory() {
            0 => None,
            total => Some(total as f64 / BYTES_PER_MB),
        }
    }
}

/// Temporary byte buffer tracked by the monitor
///
/// Clones share the buffer. Once only the monitor's registry holds it,
/// `optimize_memory` revokes it.
#[derive(Debug, Clone)]
pub struct TempResource {
    bytes: Arc<[u8]>,
}

impl TempResource {
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

#[derive(Debug, Default)]
struct MonitorState {
    metrics: PerformanceMetrics,
    warnings: Vec<PerformanceWarning>,
    processing_started: Option<Instant>,
    resources: Vec<Arc<[u8]>>,
}

impl MonitorState {
    fn warn(&mut self, warning: PerformanceWarning) -> bool {
        if self.warnings.contains(&warning) {
            return false;
        }
        tracing::warn!(%warning, "Performance warning raised");
        self.warnings.push(warning);
        true
    }
}

#[derive(Debug, Clone, Copy)]
struct Thresholds {
    max_file_size_mb: f64,
    default_chunk_size_mb: f64,
    very_large_file_mb: f64,
    high_memory_mb: f64,
}

/// Session resource monitor
pub struct ResourceMonitor {
    settings: OptimizerSettings,
    probe: Arc<dyn MemoryProbe>,
    state: Arc<Mutex<MonitorState>>,
    sampler: Mutex<Option<JoinHandle<()>>>,
}

impl ResourceMonitor {
    /// # Arguments
    /// * `settings` - Size and memory thresholds, sampling period
    /// * `probe` - Where memory readings come from
    pub fn new(settings: OptimizerSettings, probe: Arc<dyn MemoryProbe>) -> Self {
        let state = MonitorState {
            metrics: PerformanceMetrics {
                recommended_chunk_size_mb: settings.default_chunk_size_mb,
                ..PerformanceMetrics::default()
            },
            ..MonitorState::default()
        };

        Self {
            settings,
            probe,
            state: Arc::new(Mutex::new(state)),
            sampler: Mutex::new(None),
        }
    }

    /// Monitor backed by [`SystemMemoryProbe`]
    pub fn with_system_probe(settings: OptimizerSettings) -> Self {
        Self::new(settings, Arc::new(SystemMemoryProbe::new()))
    }

    fn thresholds(&self) -> Thresholds {
        Thresholds {
            max_file_size_mb: self.settings.max_file_size_mb,
            default_chunk_size_mb: self.settings.default_chunk_size_mb,
            very_large_file_mb: self.settings.very_large_file_mb,
            high_memory_mb: self.settings.high_memory_mb,
        }
    }

    fn lock(&self) -> MutexGuard<'_, MonitorState> {
        lock_state(&self.state)
    }

    pub fn metrics(&self) -> PerformanceMetrics {
        self.lock().metrics
    }

    pub fn warnings(&self) -> Vec<PerformanceWarning> {
        self.lock().warnings.clone()
    }

    // ===== File analysis =====

    /// Analyze the file at `path`
    pub fn analyze_file(&self, path: &Path) -> Result<PerformanceMetrics> {
        let size = std::fs::metadata(path)?.len();
        Ok(self.analyze_size(size))
    }

    /// Analyze a file of `size_bytes`, replacing the previous file's
    /// metrics and warnings
    pub fn analyze_size(&self, size_bytes: u64) -> PerformanceMetrics {
        let thresholds = self.thresholds();
        let file_size_mb = size_bytes as f64 / BYTES_PER_MB;
        let is_large_file = file_size_mb > thresholds.max_file_size_mb;

        let mut state = self.lock();
        state.metrics = PerformanceMetrics {
            file_size_mb,
            memory_usage_mb: state.metrics.memory_usage_mb,
            is_large_file,
            recommended_chunk_size_mb: recommended_chunk_size_mb(
                file_size_mb,
                thresholds.default_chunk_size_mb,
            ),
            estimated_processing_time_secs: estimated_processing_time_secs(file_size_mb),
            processing_time_secs: 0.0,
        };

        state.warnings.clear();
        if is_large_file {
            state.warn(PerformanceWarning::LargeFile);
        }
        if file_size_mb > thresholds.very_large_file_mb {
            state.warn(PerformanceWarning::VeryLargeFile);
        }

        tracing::info!(
            file_size_mb,
            is_large_file,
            recommended_chunk_size_mb = state.metrics.recommended_chunk_size_mb,
            "Analyzed file"
        );

        state.metrics
    }

    // ===== Memory =====

    /// Take one memory sample; returns the reading
    pub fn sample_memory(&self) -> Option<f64> {
        sample_into(&self.state, self.probe.as_ref(), self.thresholds())
    }

    /// Sample memory every poll interval until stopped
    ///
    /// Must be called inside a tokio runtime. Returns false when monitoring
    /// is disabled or already running.
    pub fn start_monitoring(&self) -> bool {
        if !self.settings.enable_monitoring {
            return false;
        }

        let mut sampler = self.sampler.lock().unwrap_or_else(PoisonError::into_inner);
        if sampler.as_ref().is_some_and(|h| !h.is_finished()) {
            return false;
        }

        let state = Arc::clone(&self.state);
        let probe = Arc::clone(&self.probe);
        let thresholds = self.thresholds();
        let period = Duration::from_millis(self.settings.memory_poll_interval_ms.max(1));

        *sampler = Some(tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick completes immediately; sampling starts one period in
            interval.tick().await;

            loop {
                interval.tick().await;
                sample_into(&state, probe.as_ref(), thresholds);
            }
        }));

        tracing::debug!(period_ms = period.as_millis() as u64, "Memory monitoring started");
        true
    }

    pub fn stop_monitoring(&self) {
        let handle = self
            .sampler
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = handle {
            handle.abort();
            tracing::debug!("Memory monitoring stopped");
        }
    }

    pub fn is_monitoring(&self) -> bool {
        self.sampler
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(|h| !h.is_finished())
    }

    /// Current usage against the memory limit
    pub fn check_memory_availability(&self) -> MemoryAvailability {
        match (self.probe.used_mb(), self.probe.limit_mb()) {
            (Some(used), Some(limit)) if limit > 0.0 => {
                let ratio = used / limit;
                MemoryAvailability {
                    available: ratio < MAX_MEMORY_USAGE,
                    usage_percentage: ratio * 100.0,
                    recommendation: if ratio > OPTIMIZE_MEMORY_USAGE {
                        "Consider optimizing memory before continuing".to_string()
                    } else {
                        "Sufficient memory available".to_string()
                    },
                }
            }
            _ => MemoryAvailability {
                available: true,
                usage_percentage: 0.0,
                recommendation: "Unable to determine memory usage".to_string(),
            },
        }
    }

    /// Register a temporary buffer so `optimize_memory` can reclaim it
    pub fn register_resource(&self, bytes: Vec<u8>) -> TempResource {
        let bytes: Arc<[u8]> = bytes.into();
        self.lock().resources.push(Arc::clone(&bytes));
        TempResource { bytes }
    }

    pub fn tracked_resources(&self) -> usize {
        self.lock().resources.len()
    }

    /// Revoke temporary buffers nothing else holds and ask the probe to
    /// return memory to the system
    pub fn optimize_memory(&self) -> MemoryReclaim {
        let mut reclaim = MemoryReclaim::default();

        self.lock().resources.retain(|bytes| {
            if Arc::strong_count(bytes) > 1 {
                return true;
            }
            reclaim.revoked += 1;
            reclaim.bytes_released += bytes.len();
            false
        });

        self.probe.reclaim();

        tracing::info!(
            revoked = reclaim.revoked,
            bytes_released = reclaim.bytes_released,
            "Optimized memory"
        );
        reclaim
    }

    // ===== Processing =====

    /// Start timing a processing run and begin memory monitoring
    pub fn begin_processing(&self) {
        self.lock().processing_started = Some(Instant::now());
        self.start_monitoring();
    }

    /// Stop timing and monitoring; returns the elapsed seconds
    pub fn finish_processing(&self) -> f64 {
        self.stop_monitoring();

        let mut state = self.lock();
        let elapsed = state
            .processing_started
            .take()
            .map_or(0.0, |started| started.elapsed().as_secs_f64());
        state.metrics.processing_time_secs = elapsed;
        elapsed
    }

    pub fn is_processing(&self) -> bool {
        self.lock().processing_started.is_some()
    }

    /// Guidance for the current file and memory state
    pub fn recommendations(&self) -> Vec<String> {
        let state = self.lock();
        recommendations(&state.metrics, &state.warnings)
    }
}

impl Drop for ResourceMonitor {
    fn drop(&mut self) {
        self.stop_monitoring();
    }
}

fn lock_state(state: &Mutex<MonitorState>) -> MutexGuard<'_, MonitorState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

fn sample_into(
    state: &Mutex<MonitorState>,
    probe: &dyn MemoryProbe,
    thresholds: Thresholds,
) -> Option<f64> {
    let used = probe.used_mb()?;

    let mut state = lock_state(state);
    state.metrics.memory_usage_mb = used;
    if used > thresholds.high_memory_mb {
        state.warn(PerformanceWarning::HighMemory);
    }

    tracing::trace!(memory_usage_mb = used, "Sampled memory");
    Some(used)
}

/// Chunk size in MB for a file of `file_size_mb`
pub fn recommended_chunk_size_mb(file_size_mb: f64, default_mb: f64) -> f64 {
    if file_size_mb >= 200.0 {
        5.0
    } else if file_size_mb >= 100.0 {
        8.0
    } else {
        default_mb
    }
}

/// Half a second per MB, at least five seconds
pub fn estimated_processing_time_secs(file_size_mb: f64) -> f64 {
    (file_size_mb * 0.5).max(5.0)
}

/// Human-readable guidance derived only from `metrics` and `warnings`
pub fn recommendations(
    metrics: &PerformanceMetrics,
    warnings: &[PerformanceWarning],
) -> Vec<String> {
    let mut out = Vec::new();

    if metrics.is_large_file || warnings.contains(&PerformanceWarning::LargeFile) {
        out.push("Use chunked processing to avoid running out of memory".to_string());
    }

    if metrics.memory_usage_mb > MEMORY_ADVICE_MB
        || warnings.contains(&PerformanceWarning::HighMemory)
    {
        out.push("Consider closing other applications to free memory".to_string());
    }

    if metrics.file_size_mb > SLOW_PROCESSING_MB
        || warnings.contains(&PerformanceWarning::VeryLargeFile)
    {
        out.push("Processing may take several minutes".to_string());
        out.push("Avoid navigating away while processing".to_string());
    }

    out
}
