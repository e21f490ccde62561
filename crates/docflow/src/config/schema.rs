use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::broker::memory::DEFAULT_CAPACITY;
use crate::render::image::DEFAULT_JPEG_QUALITY;
use crate::render::rasterize::DEFAULT_PDFTOPPM;

pub const CONFIG_VERSION: &str = "1.0";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub version: String,
    #[serde(default = "default_database_path")]
    pub database_path: String,
    #[serde(default)]
    pub object_store: ObjectStoreConfig,
    #[serde(default)]
    pub broker: BrokerConfig,
    #[serde(default)]
    pub worker: WorkerConfig,
    #[serde(default)]
    pub renderer: RendererConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION.to_string(),
            database_path: default_database_path(),
            object_store: ObjectStoreConfig::default(),
            broker: BrokerConfig::default(),
            worker: WorkerConfig::default(),
            renderer: RendererConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

/// `~/.local/share/docflow` or the platform equivalent.
pub fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("docflow")
}

fn default_database_path() -> String {
    crate::db::default_database_path().display().to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObjectStoreConfig {
    #[serde(default = "default_object_root")]
    pub root: String,
    #[serde(default = "default_bucket")]
    pub bucket: String,
}

fn default_object_root() -> String {
    default_data_dir().join("objects").display().to_string()
}

fn default_bucket() -> String {
    "docflow".to_string()
}

impl Default for ObjectStoreConfig {
    fn default() -> Self {
        Self {
            root: default_object_root(),
            bucket: default_bucket(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrokerConfig {
    /// Messages queued per subscriber before publishers wait.
    #[serde(default = "default_broker_capacity")]
    pub capacity: usize,
}

fn default_broker_capacity() -> usize {
    DEFAULT_CAPACITY
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            capacity: default_broker_capacity(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerConfig {
    #[serde(default = "default_worker_count")]
    pub worker_count: usize,
    /// Defaults to twice the worker count.
    #[serde(default)]
    pub queue_capacity: Option<usize>,
}

fn default_worker_count() -> usize {
    num_cpus::get()
}

impl WorkerConfig {
    pub fn queue_capacity(&self) -> usize {
        self.queue_capacity.unwrap_or(self.worker_count * 2)
    }
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            worker_count: default_worker_count(),
            queue_capacity: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RendererConfig {
    #[serde(default = "default_dpi")]
    pub dpi: u32,
    #[serde(default = "default_jpeg_quality")]
    pub jpeg_quality: u8,
    #[serde(default = "default_pdftoppm_path")]
    pub pdftoppm_path: String,
}

fn default_dpi() -> u32 {
    150
}

fn default_jpeg_quality() -> u8 {
    DEFAULT_JPEG_QUALITY
}

fn default_pdftoppm_path() -> String {
    DEFAULT_PDFTOPPM.to_string()
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            dpi: default_dpi(),
            jpeg_quality: default_jpeg_quality(),
            pdftoppm_path: default_pdftoppm_path(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Compact,
    Json,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// `EnvFilter` directive, e.g. `info` or `docflow=debug,warn`.
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub format: LogFormat,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}
