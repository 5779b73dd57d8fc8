//! Configuration file loading.
//!
//! Settings come from an `alps.toml` file with optional `[render]` and
//! `[resolver]` tables. Command-line flags are applied on top by the binary.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use alps_render_dot::{DotRenderConfig, LabelMode};
use alps_resolver::ResolverConfig;
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, info};

/// File name looked up in the working directory when no path is given.
pub const LOCAL_CONFIG_FILE: &str = "alps.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to parse TOML configuration: {0}")]
    Parse(String),

    #[error("Missing configuration file: {0}")]
    MissingFile(PathBuf),

    #[error("Failed to read configuration file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Validation error: {0}")]
    Validation(String),
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AlpsConfig {
    pub render: RenderSection,
    pub resolver: ResolverSection,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RenderSection {
    /// `id` or `title`.
    pub label: Option<String>,
    pub graph_name: Option<String>,
    pub font_name: Option<String>,
    pub font_size: Option<f32>,
    pub include_title: Option<bool>,
    pub link_nodes: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ResolverSection {
    pub timeout_ms: Option<u64>,
    pub allow_remote: Option<bool>,
    pub base_dir: Option<PathBuf>,
}

impl AlpsConfig {
    /// Render settings with every unset key at its default.
    pub fn render_config(&self) -> Result<DotRenderConfig, ConfigError> {
        let section = &self.render;
        let mut config = DotRenderConfig::default();

        if let Some(label) = section.label.as_deref() {
            config.label_mode = label
                .parse::<LabelMode>()
                .map_err(|err| ConfigError::Validation(err.to_string()))?;
        }
        if let Some(name) = section.graph_name.as_deref() {
            if name.trim().is_empty() {
                return Err(ConfigError::Validation(
                    "render.graph_name must not be empty".to_string(),
                ));
            }
            config.graph_name = name.to_string();
        }
        if let Some(font) = &section.font_name {
            config.font_name.clone_from(font);
        }
        if let Some(size) = section.font_size {
            if !size.is_finite() || size <= 0.0 {
                return Err(ConfigError::Validation(format!(
                    "render.font_size must be positive, got {size}"
                )));
            }
            config.font_size = size;
        }
        if let Some(include_title) = section.include_title {
            config.include_title = include_title;
        }
        if let Some(link_nodes) = section.link_nodes {
            config.link_nodes = link_nodes;
        }
        Ok(config)
    }

    /// Resolver settings. Without an explicit `base_dir`, relative
    /// references are anchored at `input_dir`.
    #[must_use]
    pub fn resolver_config(&self, input_dir: Option<&Path>) -> ResolverConfig {
        let section = &self.resolver;
        let mut config = ResolverConfig::default();
        if let Some(timeout_ms) = section.timeout_ms {
            config.fetch_timeout = Duration::from_millis(timeout_ms);
        }
        if let Some(allow_remote) = section.allow_remote {
            config.allow_remote = allow_remote;
        }
        config.base_dir = section
            .base_dir
            .clone()
            .or_else(|| input_dir.map(Path::to_path_buf));
        config
    }
}

/// Find and load configuration.
///
/// Search order:
/// 1. Explicit path if provided (must exist)
/// 2. `alps.toml` in the working directory
/// 3. Defaults
pub fn load_config(explicit_path: Option<&Path>) -> Result<AlpsConfig, ConfigError> {
    load_config_from(explicit_path, Path::new("."))
}

/// Same as [`load_config`] with the local lookup rooted at `search_dir`.
pub fn load_config_from(
    explicit_path: Option<&Path>,
    search_dir: &Path,
) -> Result<AlpsConfig, ConfigError> {
    if let Some(path) = explicit_path {
        info!(path = %path.display(), "Loading configuration from explicit path");
        return load_config_file(path);
    }

    let local_config = search_dir.join(LOCAL_CONFIG_FILE);
    if local_config.exists() {
        info!(path = %local_config.display(), "Loading configuration from local path");
        return load_config_file(&local_config);
    }

    debug!("No configuration file found, using default configuration");
    Ok(AlpsConfig::default())
}

fn load_config_file(path: &Path) -> Result<AlpsConfig, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::MissingFile(path.to_path_buf()));
    }

    let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    toml::from_str(&content).map_err(|e| ConfigError::Parse(e.to_string()))
}
