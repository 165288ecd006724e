//! Layered configuration
//!
//! Values come from an optional TOML file, then `HARMONIA_*` environment
//! variables (section and key separated by a double underscore, e.g.
//! `HARMONIA_SERVER__URL`). Anything missing falls back to a default.

use crate::error::{HarmoniaError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

const ENV_PREFIX: &str = "HARMONIA";

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct HarmoniaConfig {
    #[serde(default = "default_player")]
    pub player: PlayerSettings,

    #[serde(default = "default_chunking")]
    pub chunking: ChunkingSettings,

    #[serde(default = "default_optimizer")]
    pub optimizer: OptimizerSettings,

    #[serde(default = "default_server")]
    pub server: ServerSettings,
}

/// Which signal path the player builds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineKind {
    /// source -> equalizer bands -> master gain -> output
    Graph,
    /// source -> master gain -> output
    Direct,
}

/// Band layout used by the graph engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EqualizerLayout {
    /// 8 bands, 60 Hz to 12 kHz
    Rich,
    /// 5 bands, 60 Hz to 12 kHz
    Simple,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct PlayerSettings {
    #[serde(default = "default_volume")]
    pub default_volume: f32,

    #[serde(default = "default_engine")]
    pub engine: EngineKind,

    #[serde(default = "default_layout")]
    pub equalizer: EqualizerLayout,

    /// Q of the interior peaking bands
    #[serde(default = "default_peaking_q")]
    pub peaking_q: f32,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ChunkingSettings {
    #[serde(default = "default_chunk_size_secs")]
    pub chunk_size_secs: f64,

    #[serde(default = "default_overlap_secs")]
    pub overlap_secs: f64,

    #[serde(default = "default_max_concurrent")]
    pub max_concurrent: usize,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct OptimizerSettings {
    #[serde(default = "default_max_file_size_mb")]
    pub max_file_size_mb: f64,

    #[serde(default = "default_chunk_size_mb")]
    pub default_chunk_size_mb: f64,

    #[serde(default = "default_very_large_file_mb")]
    pub very_large_file_mb: f64,

    #[serde(default = "default_high_memory_mb")]
    pub high_memory_mb: f64,

    #[serde(default = "default_memory_poll_interval_ms")]
    pub memory_poll_interval_ms: u64,

    #[serde(default = "default_enabled")]
    pub enable_monitoring: bool,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ServerSettings {
    #[serde(default = "default_server_url")]
    pub url: String,

    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl HarmoniaConfig {
    /// Load configuration from an optional file and the environment
    ///
    /// A path that does not exist is skipped, so hosts can pass their
    /// conventional location unconditionally.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        Self::load_with_prefix(path, ENV_PREFIX)
    }

    fn load_with_prefix(path: Option<&Path>, prefix: &str) -> Result<Self> {
        let mut settings = config::Config::builder();

        if let Some(path) = path.filter(|p| p.exists()) {
            settings = settings.add_source(config::File::from(path));
        }

        settings = settings.add_source(
            config::Environment::with_prefix(prefix)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config: Self = settings.build()?.try_deserialize()?;
        config.validate()?;

        tracing::debug!(
            engine = ?config.player.engine,
            server = %config.server.url,
            "Loaded configuration"
        );

        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.player.default_volume) {
            return Err(HarmoniaError::config(format!(
                "player.default_volume must be within [0, 1], got {}",
                self.player.default_volume
            )));
        }

        if self.player.peaking_q <= 0.0 || !self.player.peaking_q.is_finite() {
            return Err(HarmoniaError::config("player.peaking_q must be positive"));
        }

        let chunking = &self.chunking;
        if chunking.chunk_size_secs <= 0.0 || !chunking.chunk_size_secs.is_finite() {
            return Err(HarmoniaError::config(
                "chunking.chunk_size_secs must be positive",
            ));
        }

        if chunking.overlap_secs < 0.0 || chunking.overlap_secs >= chunking.chunk_size_secs {
            return Err(HarmoniaError::config(
                "chunking.overlap_secs must be within [0, chunk_size_secs)",
            ));
        }

        if chunking.max_concurrent == 0 {
            return Err(HarmoniaError::config(
                "chunking.max_concurrent must be at least 1",
            ));
        }

        if self.optimizer.memory_poll_interval_ms == 0 {
            return Err(HarmoniaError::config(
                "optimizer.memory_poll_interval_ms must be at least 1",
            ));
        }

        if self.server.url.trim().is_empty() {
            return Err(HarmoniaError::config(
                "server.url is required (set HARMONIA_SERVER__URL)",
            ));
        }

        Ok(())
    }
}

impl Default for HarmoniaConfig {
    fn default() -> Self {
        Self {
            player: default_player(),
            chunking: default_chunking(),
            optimizer: default_optimizer(),
            server: default_server(),
        }
    }
}

impl Default for PlayerSettings {
    fn default() -> Self {
        default_player()
    }
}

impl Default for ChunkingSettings {
    fn default() -> Self {
        default_chunking()
    }
}

impl Default for OptimizerSettings {
    fn default() -> Self {
        default_optimizer()
    }
}

impl Default for ServerSettings {
    fn default() -> Self {
        default_server()
    }
}

// Default values
fn default_player() -> PlayerSettings {
    PlayerSettings {
        default_volume: default_volume(),
        engine: default_engine(),
        equalizer: default_layout(),
        peaking_q: default_peaking_q(),
    }
}

fn default_volume() -> f32 {
    0.7
}

fn default_engine() -> EngineKind {
    EngineKind::Graph
}

fn default_layout() -> EqualizerLayout {
    EqualizerLayout::Rich
}

fn default_peaking_q() -> f32 {
    1.0
}

fn default_chunking() -> ChunkingSettings {
    ChunkingSettings {
        chunk_size_secs: default_chunk_size_secs(),
        overlap_secs: default_overlap_secs(),
        max_concurrent: default_max_concurrent(),
    }
}

fn default_chunk_size_secs() -> f64 {
    30.0
}

fn default_overlap_secs() -> f64 {
    2.0
}

fn default_max_concurrent() -> usize {
    3
}

fn default_optimizer() -> OptimizerSettings {
    OptimizerSettings {
        max_file_size_mb: default_max_file_size_mb(),
        default_chunk_size_mb: default_chunk_size_mb(),
        very_large_file_mb: default_very_large_file_mb(),
        high_memory_mb: default_high_memory_mb(),
        memory_poll_interval_ms: default_memory_poll_interval_ms(),
        enable_monitoring: default_enabled(),
    }
}

fn default_max_file_size_mb() -> f64 {
    100.0
}

fn default_chunk_size_mb() -> f64 {
    10.0
}

fn default_very_large_file_mb() -> f64 {
    500.0
}

fn default_high_memory_mb() -> f64 {
    500.0
}

fn default_memory_poll_interval_ms() -> u64 {
    1000
}

fn default_enabled() -> bool {
    true
}

fn default_server() -> ServerSettings {
    ServerSettings {
        url: default_server_url(),
        poll_interval_ms: default_poll_interval_ms(),
        timeout_secs: default_timeout_secs(),
    }
}

fn default_server_url() -> String {
    "http://localhost:8000".to_string()
}

fn default_poll_interval_ms() -> u64 {
    1000
}

fn default_timeout_secs() -> u64 {
    30
}
