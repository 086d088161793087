//! Consolidation report types with JSON persistence and per-student lookup.

use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::matrix::AttendanceMatrix;
use crate::model::{
    AttendanceCell, DifficultyRecord, ExamSummary, ProjectionOutcome, ProjectionRecord,
    RunWarning, ScorePolicy, StudentExamResult, StudentInfo,
};

/// An export left out of the run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkippedExport {
    /// File name.
    pub source: String,
    /// Why it was skipped.
    pub reason: String,
}

/// A complete consolidation run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsolidationReport {
    /// Unique run identifier.
    pub id: Uuid,
    /// When the report was created.
    pub created_at: DateTime<Utc>,
    /// How scores were computed.
    pub score_policy: ScorePolicy,
    /// Exams in column order.
    pub exams: Vec<ExamSummary>,
    /// Students ordered by id.
    pub students: Vec<StudentInfo>,
    /// Per-student, per-exam tallies ordered by exam column then student.
    pub results: Vec<StudentExamResult>,
    pub difficulty: Vec<DifficultyRecord>,
    pub matrix: AttendanceMatrix,
    /// One record per not-rendered pair of non-empty exams.
    pub projections: Vec<ProjectionRecord>,
    #[serde(default)]
    pub skipped: Vec<SkippedExport>,
    #[serde(default)]
    pub warnings: Vec<RunWarning>,
    /// Total wall-clock duration in milliseconds.
    pub duration_ms: u64,
}

/// Everything known about one student.
#[derive(Debug, Clone, Serialize)]
pub struct StudentDetail {
    pub student: StudentInfo,
    /// One entry per exam, in column order.
    pub exams: Vec<StudentExamDetail>,
}

/// One student's standing on one exam.
#[derive(Debug, Clone, Serialize)]
pub struct StudentExamDetail {
    pub exam_id: String,
    pub cell: AttendanceCell,
    pub correct_count: Option<u32>,
    pub incorrect_count: Option<u32>,
    pub exported_at: Option<String>,
    /// Present for not-rendered exams with a known question count.
    pub projection: Option<ProjectionOutcome>,
}

impl ConsolidationReport {
    /// Save the report as JSON to a file.
    pub fn save_json(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).context("failed to serialize report")?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, json)
            .with_context(|| format!("failed to write report to {}", path.display()))?;
        Ok(())
    }

    /// Load a report from a JSON file.
    pub fn load_json(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read report from {}", path.display()))?;
        let report: ConsolidationReport =
            serde_json::from_str(&content).context("failed to parse report JSON")?;
        Ok(report)
    }

    pub fn student(&self, student_id: &str) -> Option<&StudentInfo> {
        self.students
            .binary_search_by(|s| s.student_id.as_str().cmp(student_id))
            .ok()
            .map(|i| &self.students[i])
    }

    pub fn result(&self, student_id: &str, exam_id: &str) -> Option<&StudentExamResult> {
        self.results
            .iter()
            .find(|r| r.student_id == student_id && r.exam_id == exam_id)
    }

    pub fn projection(&self, student_id: &str, exam_id: &str) -> Option<&ProjectionRecord> {
        self.projections
            .iter()
            .find(|p| p.student_id == student_id && p.exam_id == exam_id)
    }

    /// Per-exam view of one student, `None` for unknown ids.
    pub fn student_detail(&self, student_id: &str) -> Option<StudentDetail> {
        let student = self.student(student_id)?.clone();
        let exams = self
            .matrix
            .exams
            .iter()
            .filter_map(|exam_id| {
                let cell = *self.matrix.cell(student_id, exam_id)?;
                let result = self.result(student_id, exam_id);
                Some(StudentExamDetail {
                    exam_id: exam_id.clone(),
                    cell,
                    correct_count: result.map(|r| r.correct_count),
                    incorrect_count: result.map(|r| r.incorrect_count),
                    exported_at: result.and_then(|r| r.exported_at.clone()),
                    projection: self.projection(student_id, exam_id).map(|p| p.outcome),
                })
            })
            .collect();
        Some(StudentDetail { student, exams })
    }

    /// Number of exams each student rendered, in student order.
    pub fn rendered_counts(&self) -> Vec<(&str, usize)> {
        self.matrix
            .rows
            .iter()
            .map(|row| {
                (
                    row.student_id.as_str(),
                    row.cells.iter().filter(|c| c.is_rendered()).count(),
                )
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ExamRoster;

    fn make_report() -> ConsolidationReport {
        let rosters = vec![
            ExamRoster {
                exam_id: "E1".into(),
                students: vec!["S1".into(), "S2".into()],
                total_questions: 2,
            },
            ExamRoster {
                exam_id: "E2".into(),
                students: vec!["S2".into()],
                total_questions: 10,
            },
        ];
        let results = vec![
            StudentExamResult {
                exam_id: "E1".into(),
                student_id: "S1".into(),
                correct_count: 1,
                incorrect_count: 1,
                score: 1.0,
                exported_at: Some("2025-03-01".into()),
            },
            StudentExamResult {
                exam_id: "E1".into(),
                student_id: "S2".into(),
                correct_count: 2,
                incorrect_count: 0,
                score: 2.0,
                exported_at: None,
            },
            StudentExamResult {
                exam_id: "E2".into(),
                student_id: "S2".into(),
                correct_count: 9,
                incorrect_count: 1,
                score: 9.0,
                exported_at: None,
            },
        ];
        let matrix = AttendanceMatrix::build(vec!["E1".into(), "E2".into()], &rosters, &results);
        let projections = crate::projection::project_all(&matrix, &rosters, &results);

        ConsolidationReport {
            id: Uuid::nil(),
            created_at: Utc::now(),
            score_policy: ScorePolicy::Correct,
            exams: vec![],
            students: vec![
                StudentInfo {
                    student_id: "S1".into(),
                    first_name: "Ana".into(),
                    last_name: "Soto".into(),
                },
                StudentInfo {
                    student_id: "S2".into(),
                    first_name: "Ben".into(),
                    last_name: "Rojas".into(),
                },
            ],
            results,
            difficulty: vec![],
            matrix,
            projections,
            skipped: vec![],
            warnings: vec![],
            duration_ms: 0,
        }
    }

    #[test]
    fn student_detail_includes_projection_for_nr() {
        let report = make_report();
        let detail = report.student_detail("S1").unwrap();
        assert_eq!(detail.exams.len(), 2);
        assert_eq!(detail.exams[0].cell, AttendanceCell::Scored { score: 1.0 });
        assert_eq!(detail.exams[0].exported_at.as_deref(), Some("2025-03-01"));
        assert_eq!(detail.exams[1].cell, AttendanceCell::NotRendered);
        assert_eq!(
            detail.exams[1].projection.and_then(|p| p.expected_correct()),
            Some(5)
        );
    }

    #[test]
    fn unknown_student_has_no_detail() {
        assert!(make_report().student_detail("nobody").is_none());
    }

    #[test]
    fn rendered_counts_per_student() {
        let report = make_report();
        assert_eq!(report.rendered_counts(), vec![("S1", 1), ("S2", 2)]);
    }

    #[test]
    fn json_roundtrip() {
        let report = make_report();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out/report.json");

        report.save_json(&path).unwrap();
        let loaded = ConsolidationReport::load_json(&path).unwrap();

        assert_eq!(loaded.matrix, report.matrix);
        assert_eq!(loaded.projections, report.projections);
    }
}
