use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::sync::LazyLock;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse config file '{path}': {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub parser: ParserRules,
    pub index: IndexRules,
    pub ingest: IngestRules,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ParserRules {
    /// Parse errors recorded per batch before further errors are only counted.
    pub max_errors: usize,
    /// Decode structured lines as JSON5 (unquoted keys, single quotes, trailing commas).
    pub lenient_json: bool,
    /// Lift `key=value` pairs out of free-text messages into structured fields.
    pub extract_key_values: bool,
}

impl Default for ParserRules {
    fn default() -> Self {
        Self {
            max_errors: 1000,
            lenient_json: false,
            extract_key_values: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexRules {
    pub message_boost: f64,
    pub level_boost: f64,
    /// Boost for file, source, service and host.
    pub label_boost: f64,
    /// Allowed edits per query-term character when fuzzy matching.
    pub fuzziness: f64,
    pub max_edit_distance: usize,
    /// Query terms shorter than this only match exactly.
    pub prefix_min_len: usize,
    pub max_examples: usize,
}

impl Default for IndexRules {
    fn default() -> Self {
        Self {
            message_boost: 2.0,
            level_boost: 1.5,
            label_boost: 1.0,
            fuzziness: 0.2,
            max_edit_distance: 2,
            prefix_min_len: 2,
            max_examples: 10,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestRules {
    /// Lines parsed and indexed per progress step.
    pub chunk_lines: usize,
}

impl Default for IngestRules {
    fn default() -> Self {
        Self { chunk_lines: 5000 }
    }
}

pub fn load_config(path: Option<&Path>) -> Result<AppConfig, ConfigError> {
    if let Some(path) = path {
        load_config_from_path(path)
    } else {
        Ok(default_config().clone())
    }
}

pub fn load_config_from_path(path: &Path) -> Result<AppConfig, ConfigError> {
    let path_display = path.display().to_string();
    let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path_display.clone(),
        source,
    })?;

    let config = toml::from_str::<AppConfig>(&raw).map_err(|source| ConfigError::Parse {
        path: path_display,
        source,
    })?;
    tracing::debug!(path = %path.display(), "loaded config");
    Ok(config)
}

pub fn default_config() -> &'static AppConfig {
    static DEFAULT_CONFIG: LazyLock<AppConfig> = LazyLock::new(AppConfig::default);
    &DEFAULT_CONFIG
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_toml_keeps_defaults() {
        let config: AppConfig = toml::from_str(
            r#"
            [parser]
            max_errors = 5

            [index]
            fuzziness = 0.3
            "#,
        )
        .unwrap();

        assert_eq!(config.parser.max_errors, 5);
        assert!(config.parser.extract_key_values);
        assert_eq!(config.index.fuzziness, 0.3);
        assert_eq!(config.index.message_boost, 2.0);
        assert_eq!(config.ingest.chunk_lines, 5000);
    }
}
