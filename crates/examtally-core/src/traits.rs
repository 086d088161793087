//! Core trait definitions for export sources.
//!
//! The engine never touches the filesystem directly: it asks an
//! [`ExportSource`] for the exports to consolidate and for their contents.
//! `crate::source` provides the directory and in-memory implementations.

use std::path::PathBuf;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Handle to one raw export known to a source.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ExportFile {
    /// Location used for ordering; exports are processed in ascending order.
    pub path: PathBuf,
    /// File name, used for exam identity and in messages.
    pub name: String,
}

impl ExportFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Self { path, name }
    }
}

/// Something that yields raw exam exports.
#[async_trait]
pub trait ExportSource: Send + Sync {
    /// Human-readable location, used in the "no valid input" error.
    fn location(&self) -> String;

    /// All exports, sorted by path.
    async fn list_exports(&self) -> anyhow::Result<Vec<ExportFile>>;

    /// The text of one export.
    async fn read_export(&self, export: &ExportFile) -> anyhow::Result<String>;
}
