//! Correctness classification and per-exam tallies.
//!
//! `classify` is the single rule deciding whether a response counts toward a
//! student's tally. Difficulty computation deliberately ignores it.

use crate::model::{QuestionResponse, ScorePolicy};

/// Outcome of classifying one response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    /// A question with `points_possible > 0`.
    Scored(bool),
    /// A zero-point question; never tallied.
    Unscored,
}

pub fn classify(response: &QuestionResponse) -> Classification {
    if response.points_possible <= 0.0 {
        Classification::Unscored
    } else {
        Classification::Scored(response.is_correct)
    }
}

/// Running correct/incorrect counts for one student on one exam.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Tally {
    pub correct: u32,
    pub incorrect: u32,
    /// Points of correctly answered scored questions.
    pub points_earned: f64,
}

impl Tally {
    pub fn record(&mut self, response: &QuestionResponse) {
        match classify(response) {
            Classification::Scored(true) => {
                self.correct += 1;
                self.points_earned += response.points_possible;
            }
            Classification::Scored(false) => self.incorrect += 1,
            Classification::Unscored => {}
        }
    }

    pub fn score(&self, policy: ScorePolicy) -> f64 {
        match policy {
            ScorePolicy::Correct => self.correct as f64,
            ScorePolicy::Points => self.points_earned,
        }
    }
}

/// Tally a student's responses on one exam.
pub fn tally<'a, I>(responses: I) -> Tally
where
    I: IntoIterator<Item = &'a QuestionResponse>,
{
    let mut tally = Tally::default();
    for response in responses {
        tally.record(response);
    }
    tally
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(q: u32, points: f64, correct: bool) -> QuestionResponse {
        QuestionResponse {
            exam_id: "E1".into(),
            student_id: "S1".into(),
            question_index: q,
            points_possible: points,
            is_correct: correct,
        }
    }

    #[test]
    fn zero_points_is_unscored() {
        assert_eq!(classify(&response(1, 0.0, true)), Classification::Unscored);
        assert_eq!(classify(&response(1, -1.0, false)), Classification::Unscored);
    }

    #[test]
    fn positive_points_keep_correctness() {
        assert_eq!(classify(&response(1, 1.0, true)), Classification::Scored(true));
        assert_eq!(classify(&response(1, 0.5, false)), Classification::Scored(false));
    }

    #[test]
    fn tally_skips_zero_point_questions() {
        let responses = vec![
            response(1, 1.0, true),
            response(2, 1.0, false),
            response(3, 0.0, true),
            response(4, 0.0, false),
        ];
        let t = tally(&responses);
        assert_eq!(t.correct, 1);
        assert_eq!(t.incorrect, 1);
        assert_eq!(t.correct + t.incorrect, 2);
    }

    #[test]
    fn score_policies() {
        let responses = vec![response(1, 2.0, true), response(2, 3.0, true), response(3, 1.0, false)];
        let t = tally(&responses);
        assert_eq!(t.score(ScorePolicy::Correct), 2.0);
        assert_eq!(t.score(ScorePolicy::Points), 5.0);
    }
}
