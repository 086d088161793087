//! Central consolidation orchestrator.
//!
//! Reads and parses exports concurrently, then reduces them on one thread so
//! the output ordering depends only on the input file set.

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::ops::RangeInclusive;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use futures::stream::{FuturesUnordered, StreamExt};
use tokio::sync::Semaphore;
use uuid::Uuid;

use crate::classifier::tally;
use crate::difficulty::compute_difficulty;
use crate::error::ConsolidationError;
use crate::matrix::{order_exams, AttendanceMatrix};
use crate::model::{
    ExamOrdering, ExamRoster, ExamSummary, QuestionResponse, ResponseKey, RunWarning,
    ScorePolicy, StudentExamResult, StudentInfo,
};
use crate::parser::{export_warnings, parse_export, ParsedExport};
use crate::projection::project_all;
use crate::report::{ConsolidationReport, SkippedExport};
use crate::traits::{ExportFile, ExportSource};

/// Configuration for the consolidation engine.
#[derive(Debug, Clone)]
pub struct ConsolidationConfig {
    /// Maximum exports read and parsed at once.
    pub parallelism: usize,
    pub score_policy: ScorePolicy,
    pub exam_order: ExamOrdering,
}

impl Default for ConsolidationConfig {
    fn default() -> Self {
        Self {
            parallelism: 4,
            score_policy: ScorePolicy::Correct,
            exam_order: ExamOrdering::Name,
        }
    }
}

/// Progress reporting trait.
pub trait ProgressReporter: Send + Sync {
    fn on_export_parsed(&self, export: &ParsedExport);
    fn on_export_skipped(&self, skipped: &SkippedExport);
    fn on_run_complete(&self, exams: usize, skipped: usize, elapsed: Duration);
}

/// No-op progress reporter.
pub struct NoopReporter;

impl ProgressReporter for NoopReporter {
    fn on_export_parsed(&self, _: &ParsedExport) {}
    fn on_export_skipped(&self, _: &SkippedExport) {}
    fn on_run_complete(&self, _: usize, _: usize, _: Duration) {}
}

/// The consolidation engine.
pub struct Consolidator {
    config: ConsolidationConfig,
}

impl Consolidator {
    pub fn new(config: ConsolidationConfig) -> Self {
        Self { config }
    }

    /// Consolidate every export the source yields.
    ///
    /// Fails only when the source has no exports or none of them parse.
    pub async fn run(
        &self,
        source: &dyn ExportSource,
        progress: &dyn ProgressReporter,
    ) -> Result<ConsolidationReport> {
        let start = Instant::now();
        let mut exports = source.list_exports().await?;
        exports.sort();

        if exports.is_empty() {
            return Err(ConsolidationError::NoValidInput {
                location: source.location(),
            }
            .into());
        }

        let semaphore = Arc::new(Semaphore::new(self.config.parallelism.max(1)));
        let mut futures = FuturesUnordered::new();

        for (position, export) in exports.iter().enumerate() {
            let semaphore = Arc::clone(&semaphore);
            futures.push(async move {
                let outcome = read_and_parse(source, export, semaphore).await;
                (position, outcome)
            });
        }

        let mut outcomes = Vec::with_capacity(exports.len());
        while let Some(outcome) = futures.next().await {
            outcomes.push(outcome);
        }
        // Completion order is arbitrary; reduce in source order.
        outcomes.sort_by_key(|(position, _)| *position);

        let mut parsed = Vec::new();
        let mut skipped = Vec::new();
        for (position, outcome) in outcomes {
            match outcome {
                Ok(export) => {
                    progress.on_export_parsed(&export);
                    parsed.push(export);
                }
                Err(e) => {
                    let entry = SkippedExport {
                        source: exports[position].name.clone(),
                        reason: format!("{e:#}"),
                    };
                    tracing::warn!("skipping {}: {}", entry.source, entry.reason);
                    progress.on_export_skipped(&entry);
                    skipped.push(entry);
                }
            }
        }

        if parsed.is_empty() {
            return Err(ConsolidationError::NoValidInput {
                location: source.location(),
            }
            .into());
        }

        let mut report = consolidate(&parsed, &self.config);
        report.skipped = skipped;

        let elapsed = start.elapsed();
        report.duration_ms = elapsed.as_millis() as u64;
        progress.on_run_complete(report.exams.len(), report.skipped.len(), elapsed);
        tracing::info!(
            "consolidated {} exams, {} students, {} skipped exports",
            report.exams.len(),
            report.students.len(),
            report.skipped.len()
        );

        Ok(report)
    }
}

async fn read_and_parse(
    source: &dyn ExportSource,
    export: &ExportFile,
    semaphore: Arc<Semaphore>,
) -> Result<ParsedExport> {
    let _permit = semaphore
        .acquire_owned()
        .await
        .map_err(|_| anyhow::anyhow!("semaphore closed"))?;

    let content = source.read_export(export).await?;
    let name = export.name.clone();
    let parsed = tokio::task::spawn_blocking(move || parse_export(&content, &name)).await??;
    Ok(parsed)
}

/// Reduce parsed exports, in the given order, into a report.
///
/// Later exports win: when a student appears again for the same exam, every
/// response from the earlier export is dropped in favour of the new row, and
/// the override is recorded as a warning.
pub fn consolidate(exports: &[ParsedExport], config: &ConsolidationConfig) -> ConsolidationReport {
    let mut responses: BTreeMap<ResponseKey, QuestionResponse> = BTreeMap::new();
    let mut exported_at: BTreeMap<(String, String), Option<String>> = BTreeMap::new();
    let mut seen: HashSet<(String, String)> = HashSet::new();
    let mut roster_students: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
    let mut declared: BTreeMap<String, BTreeSet<u32>> = BTreeMap::new();
    let mut summaries: BTreeMap<String, ExamSummary> = BTreeMap::new();
    let mut students: BTreeMap<String, StudentInfo> = BTreeMap::new();
    let mut warnings = Vec::new();

    for export in exports {
        for warning in export_warnings(export) {
            tracing::warn!("{warning}");
            warnings.push(warning);
        }

        let summary = summaries
            .entry(export.exam_id.clone())
            .or_insert_with(|| ExamSummary {
                exam_id: export.exam_id.clone(),
                sources: Vec::new(),
                date: None,
                total_questions: 0,
                student_count: 0,
            });
        summary.sources.push(export.source.clone());
        summary.date = summary.date.or(export.date);

        let roster = roster_students.entry(export.exam_id.clone()).or_default();
        if !export.is_empty() {
            declared
                .entry(export.exam_id.clone())
                .or_default()
                .extend(export.question_indices.iter().copied());
        }

        for row in &export.rows {
            let pair = (export.exam_id.clone(), row.student.student_id.clone());
            if !seen.insert(pair.clone()) {
                let warning = RunWarning::DuplicateResponseOverride {
                    exam_id: pair.0.clone(),
                    student_id: pair.1.clone(),
                    source: export.source.clone(),
                };
                tracing::warn!("{warning}");
                warnings.push(warning);

                let stale: Vec<ResponseKey> = responses
                    .range(student_keys(&pair.0, &pair.1))
                    .map(|(k, _)| k.clone())
                    .collect();
                for key in &stale {
                    responses.remove(key);
                }
            }

            students
                .entry(row.student.student_id.clone())
                .and_modify(|s| s.merge_names(&row.student))
                .or_insert_with(|| row.student.clone());
            roster.insert(row.student.student_id.clone());
            exported_at.insert(pair, row.exported_at.clone());

            for response in &row.responses {
                responses.insert(response.key(), response.clone());
            }
        }
    }

    // Scored questions per exam, after merging.
    let mut scored: BTreeMap<&str, BTreeSet<u32>> = BTreeMap::new();
    for r in responses.values().filter(|r| r.points_possible > 0.0) {
        scored
            .entry(r.exam_id.as_str())
            .or_default()
            .insert(r.question_index);
    }

    let rosters: Vec<ExamRoster> = roster_students
        .into_iter()
        .map(|(exam_id, students)| {
            let total_questions = scored.get(exam_id.as_str()).map_or(0, |q| q.len() as u32);
            ExamRoster {
                exam_id,
                students: students.into_iter().collect(),
                total_questions,
            }
        })
        .collect();

    for roster in &rosters {
        if let Some(summary) = summaries.get_mut(&roster.exam_id) {
            summary.total_questions = roster.total_questions;
            summary.student_count = roster.students.len();
        }
    }

    let summaries: Vec<ExamSummary> = summaries.into_values().collect();
    let exam_order = order_exams(&summaries, &config.exam_order);
    let column = |exam_id: &str| exam_order.iter().position(|e| e == exam_id);

    let mut results = Vec::new();
    for roster in &rosters {
        for student_id in &roster.students {
            let t = tally(
                responses
                    .range(student_keys(&roster.exam_id, student_id))
                    .map(|(_, r)| r),
            );
            results.push(StudentExamResult {
                exam_id: roster.exam_id.clone(),
                student_id: student_id.clone(),
                correct_count: t.correct,
                incorrect_count: t.incorrect,
                score: t.score(config.score_policy),
                exported_at: exported_at
                    .get(&(roster.exam_id.clone(), student_id.clone()))
                    .cloned()
                    .flatten(),
            });
        }
    }
    results.sort_by(|a, b| {
        column(&a.exam_id)
            .cmp(&column(&b.exam_id))
            .then_with(|| a.student_id.cmp(&b.student_id))
    });

    let declared: Vec<(String, Vec<u32>)> = exam_order
        .iter()
        .filter_map(|exam_id| {
            declared
                .get(exam_id)
                .map(|q| (exam_id.clone(), q.iter().copied().collect()))
        })
        .collect();
    let difficulty = compute_difficulty(responses.values(), &declared);

    let matrix = AttendanceMatrix::build(exam_order.clone(), &rosters, &results);
    let projections = project_all(&matrix, &rosters, &results);

    let mut exams = summaries;
    exams.sort_by_key(|e| column(&e.exam_id));

    ConsolidationReport {
        id: Uuid::new_v4(),
        created_at: chrono::Utc::now(),
        score_policy: config.score_policy,
        exams,
        students: students.into_values().collect(),
        results,
        difficulty,
        matrix,
        projections,
        skipped: Vec::new(),
        warnings,
        duration_ms: 0,
    }
}

/// Every response key belonging to one student on one exam.
fn student_keys(exam_id: &str, student_id: &str) -> RangeInclusive<ResponseKey> {
    let key = |question_index| ResponseKey {
        exam_id: exam_id.to_string(),
        student_id: student_id.to_string(),
        question_index,
    };
    key(0)..=key(u32::MAX)
}
