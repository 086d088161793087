//! Export sources: a recursive directory walker and an in-memory source.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use async_trait::async_trait;

use crate::error::ConsolidationError;
use crate::traits::{ExportFile, ExportSource};

/// Recursively collect `*.csv` files (case-insensitive extension), sorted by path.
pub fn collect_export_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    walk(dir, &mut files)?;
    files.sort();
    Ok(files)
}

fn walk(dir: &Path, files: &mut Vec<PathBuf>) -> Result<()> {
    for entry in std::fs::read_dir(dir)
        .with_context(|| format!("failed to read directory: {}", dir.display()))?
    {
        let entry = entry?;
        let path = entry.path();

        if path.is_dir() {
            walk(&path, files)?;
        } else if path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"))
        {
            files.push(path);
        }
    }
    Ok(())
}

/// Exports stored as CSV files under a directory.
#[derive(Debug, Clone)]
pub struct DirectorySource {
    root: PathBuf,
}

impl DirectorySource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl ExportSource for DirectorySource {
    fn location(&self) -> String {
        self.root.display().to_string()
    }

    async fn list_exports(&self) -> Result<Vec<ExportFile>> {
        if !self.root.is_dir() {
            return Err(ConsolidationError::NoValidInput {
                location: self.location(),
            }
            .into());
        }
        let files = collect_export_files(&self.root)?;
        Ok(files.into_iter().map(ExportFile::new).collect())
    }

    async fn read_export(&self, export: &ExportFile) -> Result<String> {
        tokio::fs::read_to_string(&export.path)
            .await
            .with_context(|| format!("failed to read export: {}", export.path.display()))
    }
}

/// Exports held in memory, keyed by file name.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    exports: BTreeMap<String, String>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_export(mut self, name: &str, content: &str) -> Self {
        self.exports.insert(name.to_string(), content.to_string());
        self
    }
}

#[async_trait]
impl ExportSource for MemorySource {
    fn location(&self) -> String {
        "memory".to_string()
    }

    async fn list_exports(&self) -> Result<Vec<ExportFile>> {
        Ok(self.exports.keys().map(ExportFile::new).collect())
    }

    async fn read_export(&self, export: &ExportFile) -> Result<String> {
        self.exports
            .get(&export.name)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("unknown export: {}", export.name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collects_csv_recursively_and_sorted() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("nested")).unwrap();
        std::fs::write(dir.path().join("b.csv"), "").unwrap();
        std::fs::write(dir.path().join("a.CSV"), "").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "").unwrap();
        std::fs::write(dir.path().join("nested/c.csv"), "").unwrap();

        let files = collect_export_files(dir.path()).unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.strip_prefix(dir.path()).unwrap().to_string_lossy().replace('\\', "/"))
            .collect();
        assert_eq!(names, vec!["a.CSV", "b.csv", "nested/c.csv"]);
    }

    #[tokio::test]
    async fn missing_directory_is_no_valid_input() {
        let source = DirectorySource::new("/definitely/not/here");
        let err = source.list_exports().await.unwrap_err();
        assert!(err.downcast_ref::<ConsolidationError>().is_some());
        assert!(err.to_string().contains("/definitely/not/here"));
    }

    #[tokio::test]
    async fn directory_source_reads_exports() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("e1.csv"), "StudentID\nS1\n").unwrap();
        let source = DirectorySource::new(dir.path());

        let exports = source.list_exports().await.unwrap();
        assert_eq!(exports.len(), 1);
        assert_eq!(exports[0].name, "e1.csv");
        let content = source.read_export(&exports[0]).await.unwrap();
        assert!(content.starts_with("StudentID"));
    }

    #[tokio::test]
    async fn memory_source_lists_by_name() {
        let source = MemorySource::new()
            .with_export("z.csv", "StudentID\n")
            .with_export("a.csv", "StudentID\n");
        let names: Vec<_> = source
            .list_exports()
            .await
            .unwrap()
            .into_iter()
            .map(|e| e.name)
            .collect();
        assert_eq!(names, vec!["a.csv", "z.csv"]);
    }
}
