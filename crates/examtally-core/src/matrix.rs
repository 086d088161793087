//! Student × exam attendance matrix.

use std::cmp::Ordering;
use std::collections::{BTreeSet, HashMap};

use serde::{Deserialize, Serialize};

use crate::model::{AttendanceCell, ExamOrdering, ExamRoster, ExamSummary, StudentExamResult};

/// Order exam identifiers for report columns.
pub fn order_exams(exams: &[ExamSummary], ordering: &ExamOrdering) -> Vec<String> {
    let mut sorted: Vec<&ExamSummary> = exams.iter().collect();
    match ordering {
        ExamOrdering::Name => sorted.sort_by(|a, b| a.exam_id.cmp(&b.exam_id)),
        ExamOrdering::Date => sorted.sort_by(|a, b| match (a.date, b.date) {
            (Some(x), Some(y)) => x.cmp(&y).then_with(|| a.exam_id.cmp(&b.exam_id)),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => a.exam_id.cmp(&b.exam_id),
        }),
        ExamOrdering::Explicit { exams: listed } => {
            let position = |id: &str| listed.iter().position(|e| e == id);
            sorted.sort_by(|a, b| match (position(&a.exam_id), position(&b.exam_id)) {
                (Some(x), Some(y)) => x.cmp(&y),
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => a.exam_id.cmp(&b.exam_id),
            });
        }
    }
    sorted.into_iter().map(|e| e.exam_id.clone()).collect()
}

/// One student's row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatrixRow {
    pub student_id: String,
    /// One cell per exam, aligned with [`AttendanceMatrix::exams`].
    pub cells: Vec<AttendanceCell>,
}

/// One `(student, exam)` pair of the long form.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LongRow<'a> {
    pub student_id: &'a str,
    pub exam_id: &'a str,
    pub cell: &'a AttendanceCell,
}

/// Total student × exam table: every pair has exactly one cell.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AttendanceMatrix {
    /// Column order.
    pub exams: Vec<String>,
    /// Rows ordered by student id.
    pub rows: Vec<MatrixRow>,
}

impl AttendanceMatrix {
    /// Build the matrix. The student universe is the union of all rosters;
    /// a pair with a result is `Scored`, anything else `NotRendered`.
    pub fn build(exams: Vec<String>, rosters: &[ExamRoster], results: &[StudentExamResult]) -> Self {
        let students: BTreeSet<&str> = rosters
            .iter()
            .flat_map(|r| r.students.iter().map(String::as_str))
            .collect();

        let scores: HashMap<(&str, &str), f64> = results
            .iter()
            .map(|r| ((r.student_id.as_str(), r.exam_id.as_str()), r.score))
            .collect();

        let rows = students
            .into_iter()
            .map(|student_id| MatrixRow {
                student_id: student_id.to_string(),
                cells: exams
                    .iter()
                    .map(|exam_id| match scores.get(&(student_id, exam_id.as_str())) {
                        Some(&score) => AttendanceCell::Scored { score },
                        None => AttendanceCell::NotRendered,
                    })
                    .collect(),
            })
            .collect();

        Self { exams, rows }
    }

    pub fn cell(&self, student_id: &str, exam_id: &str) -> Option<&AttendanceCell> {
        let column = self.exams.iter().position(|e| e == exam_id)?;
        let row = self
            .rows
            .binary_search_by(|r| r.student_id.as_str().cmp(student_id))
            .ok()?;
        self.rows[row].cells.get(column)
    }

    pub fn student_ids(&self) -> impl Iterator<Item = &str> {
        self.rows.iter().map(|r| r.student_id.as_str())
    }

    /// Every cell as its own row, student-major then in column order.
    pub fn to_long_rows(&self) -> Vec<LongRow<'_>> {
        self.rows
            .iter()
            .flat_map(|row| {
                self.exams.iter().zip(&row.cells).map(move |(exam, cell)| LongRow {
                    student_id: &row.student_id,
                    exam_id: exam,
                    cell,
                })
            })
            .collect()
    }

    /// `(student_id, exam_id)` pairs without an attempt, row-major.
    pub fn not_rendered(&self) -> impl Iterator<Item = (&str, &str)> {
        self.to_long_rows()
            .into_iter()
            .filter(|r| !r.cell.is_rendered())
            .map(|r| (r.student_id, r.exam_id))
    }

    /// Fraction of students with an attempt at the exam.
    pub fn attendance_rate(&self, exam_id: &str) -> Option<f64> {
        let column = self.exams.iter().position(|e| e == exam_id)?;
        if self.rows.is_empty() {
            return None;
        }
        let rendered = self
            .rows
            .iter()
            .filter(|r| r.cells[column].is_rendered())
            .count();
        Some(rendered as f64 / self.rows.len() as f64)
    }
}
