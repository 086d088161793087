//! Per-question difficulty indices.
//!
//! The index of a question is the fraction of its respondents who answered
//! correctly. Every response counts, zero-point questions included.

use std::collections::HashMap;

use crate::model::{DifficultyIndex, DifficultyRecord, QuestionResponse};

/// Compute difficulty records for the declared questions of each exam.
///
/// `declared` lists exams in report order with their question ordinals; the
/// output follows that order. A declared question nobody responded to gets
/// [`DifficultyIndex::Undefined`].
pub fn compute_difficulty<'a, I>(responses: I, declared: &[(String, Vec<u32>)]) -> Vec<DifficultyRecord>
where
    I: IntoIterator<Item = &'a QuestionResponse>,
{
    let mut counts: HashMap<(&str, u32), (u32, u32)> = HashMap::new();
    for r in responses {
        let entry = counts
            .entry((r.exam_id.as_str(), r.question_index))
            .or_insert((0, 0));
        entry.0 += 1;
        if r.is_correct {
            entry.1 += 1;
        }
    }

    let mut records = Vec::new();
    for (exam_id, questions) in declared {
        for &question_index in questions {
            let (respondents, correct_respondents) = counts
                .get(&(exam_id.as_str(), question_index))
                .copied()
                .unwrap_or((0, 0));
            records.push(DifficultyRecord {
                exam_id: exam_id.clone(),
                question_index,
                respondents,
                correct_respondents,
                index: DifficultyIndex::from_counts(correct_respondents, respondents),
            });
        }
    }
    records
}

/// Mean defined index per exam, `None` when no question of the exam is defined.
pub fn exam_mean_index(records: &[DifficultyRecord], exam_id: &str) -> Option<f64> {
    let fractions: Vec<f64> = records
        .iter()
        .filter(|r| r.exam_id == exam_id)
        .filter_map(|r| r.index.fraction())
        .collect();
    if fractions.is_empty() {
        None
    } else {
        Some(fractions.iter().sum::<f64>() / fractions.len() as f64)
    }
}
