pub mod consolidate;
pub mod init;
pub mod inspect;
pub mod student;
pub mod validate;

use std::path::{Path, PathBuf};

use anyhow::Result;

use examtally_core::config::{load_config_from, ExamtallyConfig};

/// Load the config file (or defaults) and apply a command-line input override.
pub fn load_with_input(config_path: Option<&Path>, input: Option<PathBuf>) -> Result<ExamtallyConfig> {
    let mut config = load_config_from(config_path)?;
    if let Some(input) = input {
        config.input_dir = input;
    }
    tracing::debug!("input directory: {}", config.input_dir.display());
    Ok(config)
}
