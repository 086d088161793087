//! The `examtally student` command.

use std::path::PathBuf;

use anyhow::Result;
use comfy_table::{Cell, Table};

use examtally_core::engine::{Consolidator, NoopReporter};
use examtally_core::model::NOT_RENDERED;
use examtally_core::report::StudentDetail;
use examtally_core::source::DirectorySource;
use examtally_core::traits::ExportSource;

pub async fn execute(
    id: String,
    input: Option<PathBuf>,
    json: bool,
    config_path: Option<PathBuf>,
) -> Result<()> {
    let config = super::load_with_input(config_path.as_deref(), input)?;
    let source = DirectorySource::new(&config.input_dir);
    let report = Consolidator::new(config.consolidation())
        .run(&source, &NoopReporter)
        .await?;

    let id = id.trim();
    let detail = report
        .student_detail(id)
        .ok_or_else(|| anyhow::anyhow!("student '{id}' not found in {}", source.location()))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&detail)?);
    } else {
        print_detail(&detail);
    }
    Ok(())
}

fn print_detail(detail: &StudentDetail) {
    println!(
        "Student: {} ({})",
        detail.student.student_id,
        detail.student.display_name()
    );

    let mut table = Table::new();
    table.set_header(vec![
        "Exam",
        "Status",
        "Score",
        "Correct",
        "Incorrect",
        "Exported",
        "Projected correct",
    ]);

    let dash = || "-".to_string();
    for exam in &detail.exams {
        let (status, score) = if exam.cell.is_rendered() {
            ("R", exam.cell.to_string())
        } else {
            (NOT_RENDERED, dash())
        };
        table.add_row(vec![
            Cell::new(&exam.exam_id),
            Cell::new(status),
            Cell::new(score),
            Cell::new(exam.correct_count.map_or_else(dash, |c| c.to_string())),
            Cell::new(exam.incorrect_count.map_or_else(dash, |c| c.to_string())),
            Cell::new(exam.exported_at.clone().unwrap_or_else(dash)),
            Cell::new(exam.projection.map_or_else(dash, |p| p.to_string())),
        ]);
    }

    println!("{table}");

    let rendered = detail.exams.iter().filter(|e| e.cell.is_rendered()).count();
    println!("Rendered {rendered} of {} exams.", detail.exams.len());
}
