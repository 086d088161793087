//! Core data model types for examtally.
//!
//! These are the normalized records the whole pipeline works on: responses
//! parsed from exports, per-exam rollups, attendance cells, difficulty and
//! projection records. All of them are derived from the input files and are
//! never mutated after a run completes.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Marker written wherever a student has no attempt at an exam.
pub const NOT_RENDERED: &str = "NR";

/// Marker written wherever a fraction or projection has no defined value.
pub const UNDEFINED: &str = "undefined";

/// One student's answer to one question on one exam.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionResponse {
    /// Exam sitting identifier.
    pub exam_id: String,
    /// Student identifier, stable across exams.
    pub student_id: String,
    /// 1-based question ordinal taken from the column suffix (`Points12` → 12).
    pub question_index: u32,
    /// Points the question is worth. Zero-point questions are unscored.
    pub points_possible: f64,
    /// Whether the student's answer matched.
    pub is_correct: bool,
}

impl QuestionResponse {
    /// The key under which this response is unique within a run.
    pub fn key(&self) -> ResponseKey {
        ResponseKey {
            exam_id: self.exam_id.clone(),
            student_id: self.student_id.clone(),
            question_index: self.question_index,
        }
    }
}

/// `(exam_id, student_id, question_index)`; ordering groups responses by exam
/// then student.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResponseKey {
    pub exam_id: String,
    pub student_id: String,
    pub question_index: u32,
}

/// Rollup of one student's performance on one exam.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudentExamResult {
    pub exam_id: String,
    pub student_id: String,
    /// Correct answers on scored questions.
    pub correct_count: u32,
    /// Incorrect answers on scored questions.
    pub incorrect_count: u32,
    /// Score under the run's [`ScorePolicy`].
    pub score: f64,
    /// Export timestamp reported by the grading service for this row.
    #[serde(default)]
    pub exported_at: Option<String>,
}

impl StudentExamResult {
    /// Number of scored questions the student answered.
    pub fn scored_questions(&self) -> u32 {
        self.correct_count + self.incorrect_count
    }
}

/// How a [`StudentExamResult::score`] is derived.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScorePolicy {
    /// Raw count of correct scored answers.
    #[default]
    Correct,
    /// Sum of the point values of correct scored answers.
    Points,
}

impl fmt::Display for ScorePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScorePolicy::Correct => write!(f, "correct"),
            ScorePolicy::Points => write!(f, "points"),
        }
    }
}

impl FromStr for ScorePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "correct" | "count" => Ok(ScorePolicy::Correct),
            "points" | "weighted" => Ok(ScorePolicy::Points),
            other => Err(format!("unknown score policy: {other}")),
        }
    }
}

/// Column ordering for exams in the attendance matrix and every report.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "by", rename_all = "lowercase")]
pub enum ExamOrdering {
    /// Lexicographic by exam identifier.
    #[default]
    Name,
    /// By the date encoded in the export file name; undated exams last.
    Date,
    /// Listed exams first, in list order, then the rest by name.
    Explicit { exams: Vec<String> },
}

impl FromStr for ExamOrdering {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "name" => Ok(ExamOrdering::Name),
            "date" => Ok(ExamOrdering::Date),
            other => Err(format!("unknown exam ordering: {other}")),
        }
    }
}

/// The students who attempted an exam and the exam's scored-question count.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExamRoster {
    pub exam_id: String,
    /// Student ids, sorted.
    pub students: Vec<String>,
    /// Distinct questions with `points_possible > 0`.
    pub total_questions: u32,
}

impl ExamRoster {
    pub fn is_empty(&self) -> bool {
        self.students.is_empty()
    }
}

/// Per-exam metadata carried into reports.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExamSummary {
    pub exam_id: String,
    /// Export file names that contributed to this exam, in processing order.
    pub sources: Vec<String>,
    #[serde(default)]
    pub date: Option<NaiveDate>,
    pub total_questions: u32,
    pub student_count: usize,
}

impl ExamSummary {
    /// An exam whose exports had no valid student rows.
    pub fn is_empty(&self) -> bool {
        self.student_count == 0
    }
}

/// Identity of a student as reported by the exports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudentInfo {
    pub student_id: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
}

impl StudentInfo {
    /// "First Last", falling back to the id when both names are blank.
    pub fn display_name(&self) -> String {
        let name = format!("{} {}", self.first_name, self.last_name);
        let name = name.trim();
        if name.is_empty() {
            self.student_id.clone()
        } else {
            name.to_string()
        }
    }

    /// Fill blank name fields from another sighting of the same student.
    pub fn merge_names(&mut self, other: &StudentInfo) {
        if self.first_name.is_empty() {
            self.first_name = other.first_name.clone();
        }
        if self.last_name.is_empty() {
            self.last_name = other.last_name.clone();
        }
    }
}

/// One (student, exam) cell of the attendance matrix.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AttendanceCell {
    Scored { score: f64 },
    NotRendered,
}

impl AttendanceCell {
    pub fn is_rendered(&self) -> bool {
        matches!(self, AttendanceCell::Scored { .. })
    }

    pub fn score(&self) -> Option<f64> {
        match self {
            AttendanceCell::Scored { score } => Some(*score),
            AttendanceCell::NotRendered => None,
        }
    }
}

impl fmt::Display for AttendanceCell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttendanceCell::Scored { score } => write!(f, "{}", format_score(*score)),
            AttendanceCell::NotRendered => write!(f, "{NOT_RENDERED}"),
        }
    }
}

/// Format a score without spurious float noise: `5`, `2.5`, `3.33`.
pub fn format_score(score: f64) -> String {
    let rounded = (score * 100.0).round() / 100.0;
    format!("{rounded}")
}

/// Fraction of respondents who answered a question correctly.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum DifficultyIndex {
    Fraction(f64),
    /// Nobody responded to the question.
    Undefined,
}

impl DifficultyIndex {
    pub fn from_counts(correct: u32, respondents: u32) -> Self {
        if respondents == 0 {
            DifficultyIndex::Undefined
        } else {
            DifficultyIndex::Fraction(correct as f64 / respondents as f64)
        }
    }

    pub fn fraction(&self) -> Option<f64> {
        match self {
            DifficultyIndex::Fraction(f) => Some(*f),
            DifficultyIndex::Undefined => None,
        }
    }
}

impl fmt::Display for DifficultyIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DifficultyIndex::Fraction(v) => write!(f, "{v:.4}"),
            DifficultyIndex::Undefined => write!(f, "{UNDEFINED}"),
        }
    }
}

/// Difficulty of one question on one exam.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DifficultyRecord {
    pub exam_id: String,
    pub question_index: u32,
    pub respondents: u32,
    pub correct_respondents: u32,
    pub index: DifficultyIndex,
}

/// Result of projecting a student onto an exam they have not rendered.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ProjectionOutcome {
    Expected {
        expected_correct: u32,
        historical_ratio: f64,
    },
    /// The student has no rendered exam with a scored question.
    Undefined,
}

impl ProjectionOutcome {
    pub fn expected_correct(&self) -> Option<u32> {
        match self {
            ProjectionOutcome::Expected {
                expected_correct, ..
            } => Some(*expected_correct),
            ProjectionOutcome::Undefined => None,
        }
    }
}

impl fmt::Display for ProjectionOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProjectionOutcome::Expected {
                expected_correct, ..
            } => write!(f, "{expected_correct}"),
            ProjectionOutcome::Undefined => write!(f, "{UNDEFINED}"),
        }
    }
}

/// Projection for one (student, not-rendered exam) pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectionRecord {
    pub student_id: String,
    pub exam_id: String,
    pub total_questions: u32,
    pub outcome: ProjectionOutcome,
}

/// Non-fatal events recorded during a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RunWarning {
    /// The export had no valid student rows.
    EmptyRoster { exam_id: String, source: String },
    /// A row without a student identifier was ignored.
    InvalidRow { source: String, row: usize },
    /// A later row for the same student and exam replaced earlier responses.
    DuplicateResponseOverride {
        exam_id: String,
        student_id: String,
        source: String,
    },
}

impl fmt::Display for RunWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunWarning::EmptyRoster { exam_id, source } => {
                write!(f, "{source}: exam '{exam_id}' has no valid student rows")
            }
            RunWarning::InvalidRow { source, row } => {
                write!(f, "{source}: row {row} has no StudentID, ignored")
            }
            RunWarning::DuplicateResponseOverride {
                exam_id,
                student_id,
                source,
            } => write!(
                f,
                "{source}: student '{student_id}' already seen for exam '{exam_id}', later responses win"
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn score_policy_display_and_parse() {
        assert_eq!(ScorePolicy::Correct.to_string(), "correct");
        assert_eq!("points".parse::<ScorePolicy>().unwrap(), ScorePolicy::Points);
        assert_eq!("Count".parse::<ScorePolicy>().unwrap(), ScorePolicy::Correct);
        assert!("median".parse::<ScorePolicy>().is_err());
    }

    #[test]
    fn attendance_cell_display() {
        assert_eq!(AttendanceCell::Scored { score: 5.0 }.to_string(), "5");
        assert_eq!(AttendanceCell::Scored { score: 2.5 }.to_string(), "2.5");
        assert_eq!(AttendanceCell::NotRendered.to_string(), "NR");
    }

    #[test]
    fn difficulty_undefined_is_not_zero() {
        let idx = DifficultyIndex::from_counts(0, 0);
        assert_eq!(idx, DifficultyIndex::Undefined);
        assert_eq!(idx.to_string(), "undefined");
        assert_eq!(DifficultyIndex::from_counts(0, 4).to_string(), "0.0000");
    }

    #[test]
    fn display_name_falls_back_to_id() {
        let mut s = StudentInfo {
            student_id: "S1".into(),
            first_name: String::new(),
            last_name: String::new(),
        };
        assert_eq!(s.display_name(), "S1");
        s.merge_names(&StudentInfo {
            student_id: "S1".into(),
            first_name: "Ana".into(),
            last_name: "Soto".into(),
        });
        assert_eq!(s.display_name(), "Ana Soto");
    }

    #[test]
    fn projection_outcome_serde_roundtrip() {
        let outcome = ProjectionOutcome::Expected {
            expected_correct: 5,
            historical_ratio: 0.5,
        };
        let json = serde_json::to_string(&outcome).unwrap();
        let back: ProjectionOutcome = serde_json::from_str(&json).unwrap();
        assert_eq!(back, outcome);
        assert_eq!(ProjectionOutcome::Undefined.to_string(), "undefined");
    }
}
