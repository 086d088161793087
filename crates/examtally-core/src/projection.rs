//! Historical-ratio projection of correct answers on exams not yet taken.
//!
//! `historical_ratio = Σcorrect / Σ(correct + incorrect)` over the student's
//! rendered exams that had at least one scored question, and
//! `expected_correct = round_half_up(ratio × total_questions)`.

use std::collections::HashMap;

use crate::matrix::AttendanceMatrix;
use crate::model::{ExamRoster, ProjectionOutcome, ProjectionRecord, StudentExamResult};

/// Sum correct and answered scored questions across rendered results.
pub fn historical_totals<'a, I>(rendered: I) -> (u64, u64)
where
    I: IntoIterator<Item = &'a StudentExamResult>,
{
    rendered
        .into_iter()
        .filter(|r| r.scored_questions() > 0)
        .fold((0, 0), |(correct, answered), r| {
            (
                correct + u64::from(r.correct_count),
                answered + u64::from(r.scored_questions()),
            )
        })
}

/// Expected correct answers out of `total_questions`.
///
/// Rounds half up in exact integer arithmetic:
/// `floor((2·correct·total + answered) / (2·answered))`, clamped to
/// `[0, total_questions]`. `None` when nothing was answered.
pub fn expected_correct(correct: u64, answered: u64, total_questions: u32) -> Option<u32> {
    if answered == 0 {
        return None;
    }
    let correct = correct.min(answered);
    let total = u64::from(total_questions);
    let expected = (2 * correct * total + answered) / (2 * answered);
    Some(expected.min(total) as u32)
}

/// Project one student onto one target exam.
pub fn project<'a, I>(student_id: &str, rendered: I, target: &ExamRoster) -> ProjectionRecord
where
    I: IntoIterator<Item = &'a StudentExamResult>,
{
    let (correct, answered) = historical_totals(rendered);
    let outcome = match expected_correct(correct, answered, target.total_questions) {
        Some(expected_correct) => ProjectionOutcome::Expected {
            expected_correct,
            historical_ratio: correct as f64 / answered as f64,
        },
        None => ProjectionOutcome::Undefined,
    };
    ProjectionRecord {
        student_id: student_id.to_string(),
        exam_id: target.exam_id.clone(),
        total_questions: target.total_questions,
        outcome,
    }
}

/// One projection per not-rendered (student, exam) pair of the matrix.
///
/// Exams with an empty roster have no known question count and are skipped.
pub fn project_all(
    matrix: &AttendanceMatrix,
    rosters: &[ExamRoster],
    results: &[StudentExamResult],
) -> Vec<ProjectionRecord> {
    let rosters: HashMap<&str, &ExamRoster> = rosters
        .iter()
        .filter(|r| !r.is_empty())
        .map(|r| (r.exam_id.as_str(), r))
        .collect();

    let mut by_student: HashMap<&str, Vec<&StudentExamResult>> = HashMap::new();
    for r in results {
        by_student.entry(r.student_id.as_str()).or_default().push(r);
    }

    matrix
        .not_rendered()
        .filter_map(|(student_id, exam_id)| {
            let target = rosters.get(exam_id)?;
            let rendered = by_student.get(student_id).map(Vec::as_slice).unwrap_or(&[]);
            Some(project(student_id, rendered.iter().copied(), target))
        })
        .collect()
}
