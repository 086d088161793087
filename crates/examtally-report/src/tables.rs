//! CSV table writers.
//!
//! Each table has a writer generic over [`std::io::Write`] and a path wrapper
//! used by [`write_csv_reports`]. Rows follow the report's ordering: exam
//! column order, then student id.

use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Serialize;

use examtally_core::model::NOT_RENDERED;
use examtally_core::report::ConsolidationReport;

pub const STUDENT_TALLIES: &str = "student_tallies.csv";
pub const DIFFICULTY: &str = "difficulty.csv";
pub const ATTENDANCE_MATRIX: &str = "attendance_matrix.csv";
pub const ATTENDANCE_SUMMARY: &str = "attendance_summary.csv";
pub const PROJECTIONS: &str = "projections.csv";
pub const SKIPPED: &str = "skipped.csv";

#[derive(Serialize)]
struct TallyRow<'a> {
    exam_id: &'a str,
    student_id: &'a str,
    correct_count: u32,
    incorrect_count: u32,
}

#[derive(Serialize)]
struct DifficultyRow<'a> {
    exam_id: &'a str,
    question_index: u32,
    correct_fraction: String,
}

#[derive(Serialize)]
struct SummaryRow<'a> {
    student_id: &'a str,
    first_name: &'a str,
    last_name: &'a str,
    exam: &'a str,
    status: &'static str,
    score: String,
}

#[derive(Serialize)]
struct ProjectionRow<'a> {
    student_id: &'a str,
    exam_id: &'a str,
    expected_correct: String,
}

#[derive(Serialize)]
struct SkippedRow<'a> {
    source: &'a str,
    reason: &'a str,
}

/// Headers are written up front so empty tables still carry them.
fn writer<W: Write>(out: W, header: &[&str]) -> Result<csv::Writer<W>> {
    let mut wtr = csv::WriterBuilder::new().has_headers(false).from_writer(out);
    wtr.write_record(header)?;
    Ok(wtr)
}

fn names<'a>(report: &'a ConsolidationReport, student_id: &str) -> (&'a str, &'a str) {
    report
        .student(student_id)
        .map(|s| (s.first_name.as_str(), s.last_name.as_str()))
        .unwrap_or(("", ""))
}

pub fn write_student_tallies<W: Write>(report: &ConsolidationReport, out: W) -> Result<()> {
    let mut wtr = writer(out, &["exam_id", "student_id", "correct_count", "incorrect_count"])?;
    for r in &report.results {
        wtr.serialize(TallyRow {
            exam_id: &r.exam_id,
            student_id: &r.student_id,
            correct_count: r.correct_count,
            incorrect_count: r.incorrect_count,
        })?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn write_difficulty<W: Write>(report: &ConsolidationReport, out: W) -> Result<()> {
    let mut wtr = writer(out, &["exam_id", "question_index", "correct_fraction"])?;
    for d in &report.difficulty {
        wtr.serialize(DifficultyRow {
            exam_id: &d.exam_id,
            question_index: d.question_index,
            correct_fraction: d.index.to_string(),
        })?;
    }
    wtr.flush()?;
    Ok(())
}

/// Wide form: one row per student, one column per exam.
pub fn write_attendance_matrix<W: Write>(report: &ConsolidationReport, out: W) -> Result<()> {
    let mut header = vec!["student_id", "first_name", "last_name"];
    header.extend(report.matrix.exams.iter().map(String::as_str));
    let mut wtr = writer(out, &header)?;

    for row in &report.matrix.rows {
        let (first, last) = names(report, &row.student_id);
        let mut record = vec![row.student_id.clone(), first.to_string(), last.to_string()];
        record.extend(row.cells.iter().map(|c| c.to_string()));
        wtr.write_record(&record)?;
    }
    wtr.flush()?;
    Ok(())
}

/// Long form: one row per (student, exam) pair with status `R` or `NR`.
pub fn write_attendance_summary<W: Write>(report: &ConsolidationReport, out: W) -> Result<()> {
    let mut wtr = writer(out, &["student_id", "first_name", "last_name", "exam", "status", "score"])?;
    for row in report.matrix.to_long_rows() {
        let (first_name, last_name) = names(report, row.student_id);
        let (status, score) = match row.cell.score() {
            Some(_) => ("R", row.cell.to_string()),
            None => (NOT_RENDERED, String::new()),
        };
        wtr.serialize(SummaryRow {
            student_id: row.student_id,
            first_name,
            last_name,
            exam: row.exam_id,
            status,
            score,
        })?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn write_projections<W: Write>(report: &ConsolidationReport, out: W) -> Result<()> {
    let mut wtr = writer(out, &["student_id", "exam_id", "expected_correct"])?;
    for p in &report.projections {
        wtr.serialize(ProjectionRow {
            student_id: &p.student_id,
            exam_id: &p.exam_id,
            expected_correct: p.outcome.to_string(),
        })?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn write_skipped<W: Write>(report: &ConsolidationReport, out: W) -> Result<()> {
    let mut wtr = writer(out, &["source", "reason"])?;
    for s in &report.skipped {
        wtr.serialize(SkippedRow {
            source: &s.source,
            reason: &s.reason,
        })?;
    }
    wtr.flush()?;
    Ok(())
}

fn write_file<F>(dir: &Path, name: &str, write: F) -> Result<PathBuf>
where
    F: FnOnce(std::io::BufWriter<std::fs::File>) -> Result<()>,
{
    let path = dir.join(name);
    let file = std::fs::File::create(&path)
        .with_context(|| format!("failed to create {}", path.display()))?;
    write(std::io::BufWriter::new(file))
        .with_context(|| format!("failed to write {}", path.display()))?;
    Ok(path)
}

/// Write every CSV table into `dir`, returning the paths written.
///
/// `skipped.csv` is only written when some export was skipped.
pub fn write_csv_reports(report: &ConsolidationReport, dir: &Path) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("failed to create output directory: {}", dir.display()))?;

    let mut written = vec![
        write_file(dir, STUDENT_TALLIES, |w| write_student_tallies(report, w))?,
        write_file(dir, DIFFICULTY, |w| write_difficulty(report, w))?,
        write_file(dir, ATTENDANCE_MATRIX, |w| write_attendance_matrix(report, w))?,
        write_file(dir, ATTENDANCE_SUMMARY, |w| write_attendance_summary(report, w))?,
        write_file(dir, PROJECTIONS, |w| write_projections(report, w))?,
    ];
    if !report.skipped.is_empty() {
        written.push(write_file(dir, SKIPPED, |w| write_skipped(report, w))?);
    }
    Ok(written)
}
