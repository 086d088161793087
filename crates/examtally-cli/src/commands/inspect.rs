//! The `examtally inspect` command.
//!
//! Quick look at a download folder before consolidating it.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use comfy_table::{Cell, Table};

/// Extensions read as text for line counts.
const TEXT_EXTENSIONS: &[&str] = &["csv", "txt", "md", "toml", "json"];

#[derive(Debug, Clone, PartialEq)]
pub struct FileDescription {
    pub name: String,
    pub size: u64,
    pub kind: &'static str,
    /// `None` for binary files or text that is not valid UTF-8.
    pub lines: Option<usize>,
    pub first_line: String,
}

fn kind_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "csv" => "text/csv",
        "txt" => "text/plain",
        "md" => "text/markdown",
        "toml" => "application/toml",
        "json" => "application/json",
        "html" | "htm" => "text/html",
        "pdf" => "application/pdf",
        "xlsx" => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        "xls" => "application/vnd.ms-excel",
        "zip" => "application/zip",
        _ => "unknown",
    }
}

pub fn describe_file(path: &Path) -> Result<FileDescription> {
    let metadata =
        std::fs::metadata(path).with_context(|| format!("failed to stat {}", path.display()))?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    let is_text = path
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .is_some_and(|e| TEXT_EXTENSIONS.contains(&e.as_str()));

    let (lines, first_line) = if is_text {
        match std::fs::read_to_string(path) {
            Ok(content) => (
                Some(content.lines().count()),
                content.lines().next().unwrap_or_default().trim().to_string(),
            ),
            Err(_) => (None, String::new()),
        }
    } else {
        (None, String::new())
    };

    Ok(FileDescription {
        name,
        size: metadata.len(),
        kind: kind_for(path),
        lines,
        first_line,
    })
}

/// Describe the regular files directly under `dir`, sorted by name.
pub fn describe_directory(dir: &Path) -> Result<Vec<FileDescription>> {
    anyhow::ensure!(dir.is_dir(), "{} is not a directory", dir.display());

    let mut paths: Vec<PathBuf> = std::fs::read_dir(dir)
        .with_context(|| format!("failed to read directory: {}", dir.display()))?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<std::io::Result<_>>()?;
    paths.retain(|p| p.is_file());
    paths.sort();

    paths.iter().map(|p| describe_file(p)).collect()
}

pub fn execute(dir: PathBuf) -> Result<()> {
    let files = describe_directory(&dir)?;

    let mut table = Table::new();
    table.set_header(vec!["File", "Size", "Type", "Lines", "First line"]);
    for f in &files {
        let mut first_line = f.first_line.clone();
        if first_line.chars().count() > 60 {
            first_line = first_line.chars().take(57).collect::<String>() + "...";
        }
        table.add_row(vec![
            Cell::new(&f.name),
            Cell::new(format!("{} B", f.size)),
            Cell::new(f.kind),
            Cell::new(f.lines.map(|l| l.to_string()).unwrap_or_default()),
            Cell::new(first_line),
        ]);
    }

    println!("{table}");
    println!("Total files: {}", files.len());
    Ok(())
}
