use std::path::Path;

use crate::config::schema::{Config, CONFIG_VERSION};
use crate::error::ConfigError;
use crate::model::params::{MAX_DPI, MIN_DPI};
use crate::storage::validate_object_path;

const SCHEMA_JSON: &str = include_str!("../../../../schema/config-v1.json");

pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
        path: path.to_path_buf(),
        source: e,
    })?;

    load_config_from_str(&content)
}

/// Loads `path` when given, otherwise returns the built-in defaults.
pub fn load_or_default(path: Option<&Path>) -> Result<Config, ConfigError> {
    match path {
        Some(path) => load_config(path),
        None => Ok(Config::default()),
    }
}

pub fn load_config_from_str(content: &str) -> Result<Config, ConfigError> {
    let json_value: serde_json::Value = serde_json::from_str(content)?;

    validate_schema(&json_value)?;

    let config: Config = serde_json::from_value(json_value)?;

    validate_config(&config)?;

    Ok(config)
}

fn validate_schema(json_value: &serde_json::Value) -> Result<(), ConfigError> {
    let schema: serde_json::Value =
        serde_json::from_str(SCHEMA_JSON).map_err(|e| ConfigError::Validation {
            message: format!("Invalid embedded schema JSON: {}", e),
        })?;

    let validator = jsonschema::validator_for(&schema).map_err(|e| ConfigError::Validation {
        message: format!("Failed to compile JSON schema: {}", e),
    })?;

    let error_messages: Vec<String> = validator
        .iter_errors(json_value)
        .map(|e| e.to_string())
        .collect();
    if !error_messages.is_empty() {
        return Err(ConfigError::SchemaValidation {
            errors: error_messages.join("; "),
        });
    }

    Ok(())
}

fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.version != CONFIG_VERSION {
        return Err(ConfigError::Validation {
            message: format!("Unsupported config version: {}", config.version),
        });
    }

    let bucket = &config.object_store.bucket;
    if bucket.contains('/') || validate_object_path(bucket).is_err() {
        return Err(ConfigError::Validation {
            message: format!("Invalid bucket name '{}'", bucket),
        });
    }

    if config.worker.worker_count == 0 {
        return Err(ConfigError::Validation {
            message: "worker_count must be at least 1".to_string(),
        });
    }
    if config.worker.queue_capacity() == 0 {
        return Err(ConfigError::Validation {
            message: "queue_capacity must be at least 1".to_string(),
        });
    }
    if config.broker.capacity == 0 {
        return Err(ConfigError::Validation {
            message: "broker capacity must be at least 1".to_string(),
        });
    }

    let renderer = &config.renderer;
    if !(MIN_DPI..=MAX_DPI).contains(&renderer.dpi) {
        return Err(ConfigError::Validation {
            message: format!(
                "renderer dpi must be between {} and {}, got {}",
                MIN_DPI, MAX_DPI, renderer.dpi
            ),
        });
    }
    if !(1..=100).contains(&renderer.jpeg_quality) {
        return Err(ConfigError::Validation {
            message: format!(
                "renderer jpeg_quality must be between 1 and 100, got {}",
                renderer.jpeg_quality
            ),
        });
    }

    Ok(())
}
