//! The `examtally validate` command.

use std::path::PathBuf;

use anyhow::Result;

use examtally_core::error::ConsolidationError;
use examtally_core::parser::{export_warnings, parse_export_file};
use examtally_core::source::collect_export_files;

pub fn execute(input: Option<PathBuf>, config_path: Option<PathBuf>) -> Result<()> {
    let config = super::load_with_input(config_path.as_deref(), input)?;
    let input = config.input_dir;

    let files = if input.is_dir() {
        collect_export_files(&input)?
    } else if input.is_file() {
        vec![input.clone()]
    } else {
        anyhow::bail!("input not found: {}", input.display());
    };

    if files.is_empty() {
        return Err(ConsolidationError::NoValidInput {
            location: input.display().to_string(),
        }
        .into());
    }

    let mut total_warnings = 0;
    let mut malformed = 0;

    for path in &files {
        match parse_export_file(path) {
            Ok(export) => {
                println!(
                    "Export: {} -> exam '{}' ({} students, {} questions)",
                    export.source,
                    export.exam_id,
                    export.rows.len(),
                    export.total_questions()
                );
                let warnings = export_warnings(&export);
                for w in &warnings {
                    println!("  WARNING: {w}");
                }
                total_warnings += warnings.len();
            }
            Err(e) => {
                println!("  MALFORMED: {}: {e:#}", path.display());
                malformed += 1;
            }
        }
    }

    anyhow::ensure!(
        malformed == 0,
        "{malformed} of {} export(s) are malformed",
        files.len()
    );

    if total_warnings == 0 {
        println!("All {} exports valid.", files.len());
    } else {
        println!("\n{total_warnings} warning(s) found.");
    }

    Ok(())
}
