//! The `examtally consolidate` command.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;

use examtally_core::config::resolve_formats;
use examtally_core::difficulty::exam_mean_index;
use examtally_core::engine::{Consolidator, ProgressReporter};
use examtally_core::model::{ExamOrdering, ScorePolicy};
use examtally_core::parser::ParsedExport;
use examtally_core::report::{ConsolidationReport, SkippedExport};
use examtally_core::source::DirectorySource;
use examtally_report::{write_csv_reports, write_html_report};

/// Console progress reporter.
pub struct ConsoleReporter;

impl ProgressReporter for ConsoleReporter {
    fn on_export_parsed(&self, export: &ParsedExport) {
        eprintln!(
            "  Parsed: {} -> {} ({} students, {} questions)",
            export.source,
            export.exam_id,
            export.rows.len(),
            export.total_questions()
        );
    }

    fn on_export_skipped(&self, skipped: &SkippedExport) {
        eprintln!("  SKIPPED: {}: {}", skipped.source, skipped.reason);
    }

    fn on_run_complete(&self, exams: usize, skipped: usize, elapsed: Duration) {
        eprintln!(
            "\nComplete: {exams} exams consolidated, {skipped} exports skipped ({:.1}s)",
            elapsed.as_secs_f64()
        );
    }
}

#[allow(clippy::too_many_arguments)]
pub async fn execute(
    input: Option<PathBuf>,
    output: Option<PathBuf>,
    format: Option<String>,
    order: Option<String>,
    exam_order: Option<String>,
    score_policy: Option<String>,
    parallelism: Option<usize>,
    config_path: Option<PathBuf>,
) -> Result<()> {
    let mut config = super::load_with_input(config_path.as_deref(), input)?;

    // Flags override the config file.
    if let Some(output) = output {
        config.output_dir = output;
    }
    if let Some(format) = format {
        config.formats = format.split(',').map(|s| s.trim().to_string()).collect();
    }
    if let Some(order) = order {
        config.exam_order = order.parse::<ExamOrdering>().map_err(anyhow::Error::msg)?;
    }
    if let Some(exams) = exam_order {
        config.exam_order = ExamOrdering::Explicit {
            exams: exams
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
        };
    }
    if let Some(policy) = score_policy {
        config.score_policy = policy.parse::<ScorePolicy>().map_err(anyhow::Error::msg)?;
    }
    if let Some(parallelism) = parallelism {
        config.parallelism = parallelism;
    }
    anyhow::ensure!(config.parallelism >= 1, "parallelism must be at least 1");
    let formats = resolve_formats(&config.formats)?;

    eprintln!(
        "examtally v{} — Consolidating exports in {}",
        env!("CARGO_PKG_VERSION"),
        config.input_dir.display()
    );
    eprintln!();

    let source = DirectorySource::new(&config.input_dir);
    let engine = Consolidator::new(config.consolidation());
    let report = engine.run(&source, &ConsoleReporter).await?;

    print_summary(&report);

    let output = &config.output_dir;
    std::fs::create_dir_all(output)?;
    for fmt in &formats {
        match fmt.as_str() {
            "csv" => {
                for path in write_csv_reports(&report, output)? {
                    eprintln!("Table: {}", path.display());
                }
            }
            "json" => {
                let path = output.join("report.json");
                report.save_json(&path)?;
                eprintln!("Results saved to: {}", path.display());
            }
            "html" => {
                let path = output.join("report.html");
                write_html_report(&report, &path)?;
                eprintln!("HTML report: {}", path.display());
            }
            other => anyhow::bail!("unknown output format: {other}"),
        }
    }

    Ok(())
}

fn print_summary(report: &ConsolidationReport) {
    use comfy_table::{Cell, Table};

    let mut table = Table::new();
    table.set_header(vec![
        "Exam",
        "Students",
        "Questions",
        "Attendance",
        "Mean difficulty",
    ]);

    for exam in &report.exams {
        let attendance = report
            .matrix
            .attendance_rate(&exam.exam_id)
            .map(|r| format!("{:.1}%", r * 100.0))
            .unwrap_or_else(|| "-".to_string());
        let mean = exam_mean_index(&report.difficulty, &exam.exam_id)
            .map(|m| format!("{m:.4}"))
            .unwrap_or_else(|| "-".to_string());
        table.add_row(vec![
            Cell::new(&exam.exam_id),
            Cell::new(exam.student_count),
            Cell::new(exam.total_questions),
            Cell::new(attendance),
            Cell::new(mean),
        ]);
    }

    eprintln!("\n{table}");
    eprintln!(
        "{} students, {} not-rendered pairs, {} warnings",
        report.students.len(),
        report.matrix.not_rendered().count(),
        report.warnings.len()
    );
}
