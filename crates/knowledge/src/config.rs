//! Knowledge base configuration management.

use crate::types::KnowledgeBaseConfig;
use drugsearch_core::config::STATE_DIR;
use drugsearch_core::{AppError, AppResult};
use std::fs;
use std::path::{Path, PathBuf};

/// Name used for the ephemeral `--file` knowledge base.
pub const EPHEMERAL_BASE_NAME: &str = "default";

/// Load knowledge base configuration.
///
/// Loads from `.drugsearch/knowledge/<base>/config.yaml` if it exists,
/// otherwise returns the workspace default with the provided base name.
pub fn load_config(workspace: &Path, base_name: &str) -> AppResult<KnowledgeBaseConfig> {
    let config_path = get_config_path(workspace, base_name);

    let mut config = if config_path.exists() {
        tracing::debug!("Loaded knowledge base config for '{}'", base_name);
        read_config(&config_path)?
    } else {
        tracing::debug!(
            "Using default knowledge base config for '{}' (no config file found)",
            base_name
        );
        load_default_config(workspace)?
    };

    config.name = base_name.to_string();
    Ok(config)
}

/// Load the workspace-wide default from `.drugsearch/knowledge/default.yaml`,
/// or built-in defaults when that file does not exist.
///
/// This is the configuration of the ephemeral index built from `--file`.
pub fn load_default_config(workspace: &Path) -> AppResult<KnowledgeBaseConfig> {
    let path = get_default_config_path(workspace);

    let mut config = if path.exists() {
        read_config(&path)?
    } else {
        KnowledgeBaseConfig::default()
    };

    if config.name.is_empty() {
        config.name = EPHEMERAL_BASE_NAME.to_string();
    }
    Ok(config)
}

/// Save knowledge base configuration.
pub fn save_config(workspace: &Path, config: &KnowledgeBaseConfig) -> AppResult<()> {
    let config_path = get_config_path(workspace, &config.name);

    if let Some(parent) = config_path.parent() {
        fs::create_dir_all(parent).map_err(|e| {
            AppError::Knowledge(format!("Failed to create config directory: {}", e))
        })?;
    }

    let yaml = serde_yaml::to_string(config)
        .map_err(|e| AppError::Knowledge(format!("Failed to serialize config: {}", e)))?;

    fs::write(&config_path, yaml).map_err(|e| {
        AppError::Knowledge(format!("Failed to write config to {:?}: {}", config_path, e))
    })?;

    tracing::debug!("Saved knowledge base config for '{}'", config.name);
    Ok(())
}

fn read_config(path: &Path) -> AppResult<KnowledgeBaseConfig> {
    let content = fs::read_to_string(path)
        .map_err(|e| AppError::Knowledge(format!("Failed to read config at {:?}: {}", path, e)))?;

    serde_yaml::from_str(&content)
        .map_err(|e| AppError::Knowledge(format!("Failed to parse config at {:?}: {}", path, e)))
}

/// Get the root directory holding all knowledge bases.
pub fn get_knowledge_dir(workspace: &Path) -> PathBuf {
    workspace.join(STATE_DIR).join("knowledge")
}

/// Get the base directory for a knowledge base.
pub fn get_base_dir(workspace: &Path, base_name: &str) -> PathBuf {
    get_knowledge_dir(workspace).join(base_name)
}

/// Get the path to a base's config file.
pub fn get_config_path(workspace: &Path, base_name: &str) -> PathBuf {
    get_base_dir(workspace, base_name).join("config.yaml")
}

/// Get the path to the workspace default knowledge config.
pub fn get_default_config_path(workspace: &Path) -> PathBuf {
    get_knowledge_dir(workspace).join("default.yaml")
}

/// Get the SQLite index path for a base.
pub fn get_index_path(workspace: &Path, base_name: &str) -> PathBuf {
    get_base_dir(workspace, base_name).join("index.sqlite")
}
