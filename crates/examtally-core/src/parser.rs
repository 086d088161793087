//! CSV export parser.
//!
//! Turns the text of one grading-service export into a [`ParsedExport`]:
//! exam identity, the validated question schema, and one [`QuestionResponse`]
//! per student and keyed question.
//!
//! Recognised per-question columns, for each question `N`:
//!
//! - `PointsN` — points possible; blank or missing means zero.
//! - `StuN` + `PriKeyN` — given and expected answer, compared trimmed.
//! - `CorrectN` — an explicit correctness flag, preferred when present.

use std::collections::BTreeMap;
use std::path::Path;

use chrono::NaiveDate;
use csv::StringRecord;

use crate::error::ExportError;
use crate::model::{QuestionResponse, RunWarning, StudentInfo};

const STUDENT_ID: &str = "StudentID";
const FIRST_NAME: &str = "FirstName";
const LAST_NAME: &str = "LastName";
const QUIZ_NAME: &str = "QuizName";
const DATA_EXPORTED: &str = "DataExported";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum QuestionField {
    Points,
    Given,
    Key,
    Flag,
}

impl QuestionField {
    fn prefix(self) -> &'static str {
        match self {
            QuestionField::Points => "Points",
            QuestionField::Given => "Stu",
            QuestionField::Key => "PriKey",
            QuestionField::Flag => "Correct",
        }
    }
}

/// Match a header against the per-question column patterns.
fn question_column(header: &str) -> Option<(QuestionField, u32)> {
    for field in [
        QuestionField::Key,
        QuestionField::Points,
        QuestionField::Given,
        QuestionField::Flag,
    ] {
        if let Some(rest) = header.strip_prefix(field.prefix()) {
            if !rest.is_empty() && rest.bytes().all(|b| b.is_ascii_digit()) {
                return rest.parse::<u32>().ok().filter(|n| *n > 0).map(|n| (field, n));
            }
        }
    }
    None
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Correctness {
    Flag(usize),
    AnswerKey { given: usize, expected: usize },
}

#[derive(Debug, Clone)]
struct QuestionColumns {
    index: u32,
    points: Option<usize>,
    correctness: Correctness,
}

#[derive(Debug, Default)]
struct PartialQuestion {
    points: Option<usize>,
    given: Option<usize>,
    key: Option<usize>,
    flag: Option<usize>,
}

impl PartialQuestion {
    fn slot(&mut self, field: QuestionField) -> &mut Option<usize> {
        match field {
            QuestionField::Points => &mut self.points,
            QuestionField::Given => &mut self.given,
            QuestionField::Key => &mut self.key,
            QuestionField::Flag => &mut self.flag,
        }
    }
}

/// Validated column layout of one export.
#[derive(Debug, Clone)]
pub struct ExportSchema {
    student_id: usize,
    first_name: Option<usize>,
    last_name: Option<usize>,
    quiz_name: Option<usize>,
    exported_at: Option<usize>,
    questions: Vec<QuestionColumns>,
}

impl ExportSchema {
    /// Build the schema from a header row, rejecting layouts from which
    /// correctness cannot be derived.
    pub fn from_headers(headers: &StringRecord, source_name: &str) -> Result<Self, ExportError> {
        let header_error = |reason: String| ExportError::MalformedHeader {
            source_name: source_name.to_string(),
            reason,
        };

        let mut student_id = None;
        let mut first_name = None;
        let mut last_name = None;
        let mut quiz_name = None;
        let mut exported_at = None;
        let mut partial: BTreeMap<u32, PartialQuestion> = BTreeMap::new();

        for (i, raw) in headers.iter().enumerate() {
            let header = raw.trim();
            match header {
                STUDENT_ID => student_id = Some(i),
                FIRST_NAME => first_name = Some(i),
                LAST_NAME => last_name = Some(i),
                QUIZ_NAME => quiz_name = Some(i),
                DATA_EXPORTED => exported_at = Some(i),
                _ => {
                    if let Some((field, n)) = question_column(header) {
                        let slot = partial.entry(n).or_default().slot(field);
                        if slot.is_some() {
                            return Err(header_error(format!("duplicate column {header}")));
                        }
                        *slot = Some(i);
                    }
                }
            }
        }

        let student_id = student_id
            .ok_or_else(|| header_error(format!("missing required column {STUDENT_ID}")))?;

        let questions = partial
            .into_iter()
            .map(|(index, q)| {
                let correctness = match (q.flag, q.given, q.key) {
                    (Some(flag), _, _) => Correctness::Flag(flag),
                    (None, Some(given), Some(expected)) => Correctness::AnswerKey { given, expected },
                    (None, Some(_), None) => {
                        return Err(header_error(format!(
                            "column Stu{index} has no matching PriKey{index}"
                        )))
                    }
                    (None, None, Some(_)) => {
                        return Err(header_error(format!(
                            "column PriKey{index} has no matching Stu{index}"
                        )))
                    }
                    (None, None, None) => {
                        return Err(header_error(format!(
                            "column Points{index} has no correctness columns \
                             (expected Correct{index} or Stu{index} + PriKey{index})"
                        )))
                    }
                };
                Ok(QuestionColumns {
                    index,
                    points: q.points,
                    correctness,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            student_id,
            first_name,
            last_name,
            quiz_name,
            exported_at,
            questions,
        })
    }

    /// Question ordinals declared by the header, ascending.
    pub fn question_indices(&self) -> Vec<u32> {
        self.questions.iter().map(|q| q.index).collect()
    }
}

/// One valid student row of an export.
#[derive(Debug, Clone)]
pub struct ExportRow {
    /// 1-based data row.
    pub row: usize,
    pub student: StudentInfo,
    pub exported_at: Option<String>,
    pub responses: Vec<QuestionResponse>,
}

/// A fully parsed export.
#[derive(Debug, Clone)]
pub struct ParsedExport {
    pub exam_id: String,
    /// File name the export came from.
    pub source: String,
    pub date: Option<NaiveDate>,
    /// Question ordinals declared by the header.
    pub question_indices: Vec<u32>,
    pub rows: Vec<ExportRow>,
    /// Data rows ignored for lacking a student id.
    pub invalid_rows: Vec<usize>,
}

impl ParsedExport {
    /// No valid student rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn responses(&self) -> impl Iterator<Item = &QuestionResponse> {
        self.rows.iter().flat_map(|r| r.responses.iter())
    }

    /// Distinct questions that carry points on at least one row.
    pub fn total_questions(&self) -> u32 {
        let mut scored: Vec<u32> = self
            .responses()
            .filter(|r| r.points_possible > 0.0)
            .map(|r| r.question_index)
            .collect();
        scored.sort_unstable();
        scored.dedup();
        scored.len() as u32
    }
}

/// Read an export file from disk and parse it.
pub fn parse_export_file(path: &Path) -> anyhow::Result<ParsedExport> {
    use anyhow::Context;

    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read export: {}", path.display()))?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    Ok(parse_export(&content, &name)?)
}

/// Parse the text of one export.
pub fn parse_export(content: &str, source_name: &str) -> Result<ParsedExport, ExportError> {
    let content = content.strip_prefix('\u{feff}').unwrap_or(content);
    if content.trim().is_empty() {
        // Nobody sat the exam; it still gets a column.
        tracing::debug!("parsed {source_name}: empty export");
        return Ok(ParsedExport {
            exam_id: exam_id_from_source(source_name),
            source: source_name.to_string(),
            date: exam_date_from_source(source_name),
            question_indices: Vec::new(),
            rows: Vec::new(),
            invalid_rows: Vec::new(),
        });
    }

    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(content.as_bytes());

    let csv_error = |source: csv::Error| ExportError::Csv {
        source_name: source_name.to_string(),
        source,
    };

    let headers = reader.headers().map_err(csv_error)?.clone();
    let schema = ExportSchema::from_headers(&headers, source_name)?;

    let records = reader
        .records()
        .collect::<Result<Vec<_>, _>>()
        .map_err(csv_error)?;

    let field = |record: &StringRecord, column: Option<usize>| -> String {
        column
            .and_then(|i| record.get(i))
            .map(|v| v.trim().to_string())
            .unwrap_or_default()
    };

    let mut invalid_rows = Vec::new();
    let mut valid = Vec::new();
    for (i, record) in records.iter().enumerate() {
        let row = i + 1;
        if field(record, Some(schema.student_id)).is_empty() {
            invalid_rows.push(row);
        } else {
            valid.push((row, record));
        }
    }

    let exam_id = valid
        .first()
        .map(|(_, record)| normalize_quiz_name(&field(record, schema.quiz_name)))
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| exam_id_from_source(source_name));

    let mut rows = Vec::with_capacity(valid.len());
    for (row, record) in valid {
        let student = StudentInfo {
            student_id: field(record, Some(schema.student_id)),
            first_name: field(record, schema.first_name),
            last_name: field(record, schema.last_name),
        };

        let mut responses = Vec::with_capacity(schema.questions.len());
        for question in &schema.questions {
            let points_possible = parse_points(record, question, row, &headers, source_name)?;
            let Some(is_correct) = parse_correctness(record, question, row, &headers, source_name)?
            else {
                continue;
            };
            responses.push(QuestionResponse {
                exam_id: exam_id.clone(),
                student_id: student.student_id.clone(),
                question_index: question.index,
                points_possible,
                is_correct,
            });
        }

        let exported_at = Some(field(record, schema.exported_at)).filter(|s| !s.is_empty());
        rows.push(ExportRow {
            row,
            student,
            exported_at,
            responses,
        });
    }

    tracing::debug!(
        "parsed {source_name}: exam '{exam_id}', {} rows, {} questions",
        rows.len(),
        schema.questions.len()
    );

    Ok(ParsedExport {
        exam_id,
        source: source_name.to_string(),
        date: exam_date_from_source(source_name),
        question_indices: schema.question_indices(),
        rows,
        invalid_rows,
    })
}

fn column_name(headers: &StringRecord, column: usize) -> String {
    headers.get(column).unwrap_or_default().trim().to_string()
}

fn parse_points(
    record: &StringRecord,
    question: &QuestionColumns,
    row: usize,
    headers: &StringRecord,
    source_name: &str,
) -> Result<f64, ExportError> {
    let Some(column) = question.points else {
        return Ok(0.0);
    };
    let raw = record.get(column).unwrap_or_default().trim();
    if raw.is_empty() {
        return Ok(0.0);
    }
    match raw.parse::<f64>() {
        Ok(points) if points.is_finite() && points >= 0.0 => Ok(points),
        _ => Err(ExportError::Malformed {
            source_name: source_name.to_string(),
            row,
            column: column_name(headers, column),
            reason: format!("expected a non-negative number, got '{raw}'"),
        }),
    }
}

/// `None` when the row carries no answer key (or flag) for the question.
fn parse_correctness(
    record: &StringRecord,
    question: &QuestionColumns,
    row: usize,
    headers: &StringRecord,
    source_name: &str,
) -> Result<Option<bool>, ExportError> {
    match question.correctness {
        Correctness::AnswerKey { given, expected } => {
            let expected = record.get(expected).unwrap_or_default().trim();
            if expected.is_empty() {
                return Ok(None);
            }
            let given = record.get(given).unwrap_or_default().trim();
            Ok(Some(given == expected))
        }
        Correctness::Flag(column) => {
            let raw = record.get(column).unwrap_or_default().trim();
            parse_flag(raw).map_err(|reason| ExportError::Malformed {
                source_name: source_name.to_string(),
                row,
                column: column_name(headers, column),
                reason,
            })
        }
    }
}

fn parse_flag(raw: &str) -> Result<Option<bool>, String> {
    match raw.to_lowercase().as_str() {
        "" => Ok(None),
        "1" | "true" | "yes" | "y" | "x" | "c" => Ok(Some(true)),
        "0" | "false" | "no" | "n" | "-" => Ok(Some(false)),
        other => Err(format!("unrecognised correctness flag '{other}'")),
    }
}

/// Collapse line breaks that some exports embed in quiz titles.
fn normalize_quiz_name(name: &str) -> String {
    name.replace(['\r', '\n'], " ").trim().to_string()
}

/// Exam identifier derived from a file name.
///
/// Downloaded exports are named `YYYY-MM-DD - Title - full.csv`; for those the
/// title is used, otherwise the whole stem.
pub fn exam_id_from_source(source_name: &str) -> String {
    let stem = Path::new(source_name)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| source_name.to_string());
    let parts: Vec<&str> = stem.split(" - ").collect();
    if parts.len() >= 3 && parts[parts.len() - 1].trim().eq_ignore_ascii_case("full") {
        parts[1..parts.len() - 1].join(" - ").trim().to_string()
    } else {
        stem.trim().to_string()
    }
}

/// Date prefix of a `YYYY-MM-DD - …` file name.
pub fn exam_date_from_source(source_name: &str) -> Option<NaiveDate> {
    let prefix = source_name.split(" - ").next()?.trim();
    NaiveDate::parse_from_str(prefix, "%Y-%m-%d").ok()
}

/// Non-fatal issues found in a parsed export.
pub fn export_warnings(export: &ParsedExport) -> Vec<RunWarning> {
    let mut warnings: Vec<RunWarning> = export
        .invalid_rows
        .iter()
        .map(|&row| RunWarning::InvalidRow {
            source: export.source.clone(),
            row,
        })
        .collect();

    if export.is_empty() {
        warnings.push(RunWarning::EmptyRoster {
            exam_id: export.exam_id.clone(),
            source: export.source.clone(),
        });
    }

    warnings
}

#[cfg(test)]
mod tests {
    use super::*;

    const TWO_STUDENTS: &str = "\
QuizName,StudentID,FirstName,LastName,Points1,Stu1,PriKey1,Points2,Stu2,PriKey2,Points3,Stu3,PriKey3
E1,S1,Ana,Soto,1,A,A,1,B,C,0,D,D
E1,S2,Ben,Rojas,1,A,A,1,C,C,0,A,D
";

    #[test]
    fn parse_answer_key_export() {
        let export = parse_export(TWO_STUDENTS, "e1.csv").unwrap();
        assert_eq!(export.exam_id, "E1");
        assert_eq!(export.rows.len(), 2);
        assert_eq!(export.question_indices, vec![1, 2, 3]);
        assert_eq!(export.total_questions(), 2);

        let s1: Vec<_> = export.rows[0].responses.iter().map(|r| r.is_correct).collect();
        assert_eq!(s1, vec![true, false, true]);
        assert_eq!(export.rows[0].student.first_name, "Ana");
        assert_eq!(export.rows[0].responses[2].points_possible, 0.0);
    }

    #[test]
    fn missing_points_column_means_zero() {
        let csv = "StudentID,Stu1,PriKey1,Points2,Stu2,PriKey2\nS1,A,A,,B,B\n";
        let export = parse_export(csv, "e.csv").unwrap();
        let points: Vec<f64> = export.responses().map(|r| r.points_possible).collect();
        assert_eq!(points, vec![0.0, 0.0]);
        assert_eq!(export.total_questions(), 0);
    }

    #[test]
    fn non_numeric_points_is_malformed() {
        let csv = "StudentID,Points1,Stu1,PriKey1\nS1,1,A,A\nS2,abc,A,A\n";
        let err = parse_export(csv, "bad.csv").unwrap_err();
        match err {
            ExportError::Malformed {
                source_name,
                row,
                column,
                ..
            } => {
                assert_eq!(source_name, "bad.csv");
                assert_eq!(row, 2);
                assert_eq!(column, "Points1");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn negative_points_is_malformed() {
        let csv = "StudentID,Points1,Stu1,PriKey1\nS1,-1,A,A\n";
        assert!(matches!(
            parse_export(csv, "neg.csv"),
            Err(ExportError::Malformed { .. })
        ));
    }

    #[test]
    fn missing_student_id_column_is_rejected() {
        let csv = "Name,Points1,Stu1,PriKey1\nAna,1,A,A\n";
        let err = parse_export(csv, "x.csv").unwrap_err();
        assert!(err.to_string().contains("StudentID"));
    }

    #[test]
    fn points_without_correctness_is_rejected() {
        let csv = "StudentID,Points1,Stu1,PriKey1,Points2\nS1,1,A,A,1\n";
        let err = parse_export(csv, "x.csv").unwrap_err();
        assert!(matches!(err, ExportError::MalformedHeader { .. }));
        assert!(err.to_string().contains("Points2"));
    }

    #[test]
    fn flag_columns_take_precedence() {
        let csv = "StudentID,Points1,Correct1,Stu1,PriKey1,Points2,Correct2\nS1,1,yes,A,B,1,0\nS2,1,,A,A,1,X\n";
        let export = parse_export(csv, "flags.csv").unwrap();
        let s1: Vec<_> = export.rows[0].responses.iter().map(|r| r.is_correct).collect();
        assert_eq!(s1, vec![true, false]);
        // Blank flag: no response for question 1.
        assert_eq!(export.rows[1].responses.len(), 1);
        assert!(export.rows[1].responses[0].is_correct);
    }

    #[test]
    fn unrecognised_flag_is_malformed() {
        let csv = "StudentID,Points1,Correct1\nS1,1,maybe\n";
        let err = parse_export(csv, "flags.csv").unwrap_err();
        assert_eq!(err.row(), Some(1));
    }

    #[test]
    fn blank_key_skips_response_blank_answer_is_incorrect() {
        let csv = "StudentID,Points1,Stu1,PriKey1,Points2,Stu2,PriKey2\nS1,1,A,,1,,B\n";
        let export = parse_export(csv, "e.csv").unwrap();
        let responses: Vec<_> = export.responses().collect();
        assert_eq!(responses.len(), 1);
        assert_eq!(responses[0].question_index, 2);
        assert!(!responses[0].is_correct);
    }

    #[test]
    fn rows_without_student_id_are_invalid() {
        let csv = "StudentID,Points1,Stu1,PriKey1\n,1,A,A\nS2,1,A,A\n";
        let export = parse_export(csv, "e.csv").unwrap();
        assert_eq!(export.rows.len(), 1);
        assert_eq!(export.invalid_rows, vec![1]);
        let warnings = export_warnings(&export);
        assert_eq!(
            warnings,
            vec![RunWarning::InvalidRow {
                source: "e.csv".into(),
                row: 1
            }]
        );
    }

    #[test]
    fn empty_export_uses_file_name_and_warns() {
        let csv = "QuizName,StudentID,Points1,Stu1,PriKey1\n";
        let export = parse_export(csv, "2025-03-10 - M1 Moraleja - full.csv").unwrap();
        assert!(export.is_empty());
        assert_eq!(export.exam_id, "M1 Moraleja");
        assert_eq!(
            export.date,
            Some(NaiveDate::from_ymd_opt(2025, 3, 10).unwrap())
        );
        assert!(export_warnings(&export)
            .iter()
            .any(|w| matches!(w, RunWarning::EmptyRoster { .. })));
    }

    #[test]
    fn zero_byte_export_is_an_empty_roster() {
        let export = parse_export("", "2025-05-01 - E9 - full.csv").unwrap();
        assert!(export.is_empty());
        assert_eq!(export.exam_id, "E9");
        assert!(export.question_indices.is_empty());
        assert_eq!(
            export_warnings(&export),
            vec![RunWarning::EmptyRoster {
                exam_id: "E9".into(),
                source: "2025-05-01 - E9 - full.csv".into(),
            }]
        );

        let blank = parse_export("\u{feff}\n\n", "blank.csv").unwrap();
        assert!(blank.is_empty());
        assert_eq!(blank.exam_id, "blank");
    }

    #[test]
    fn quiz_name_line_breaks_are_collapsed() {
        let csv = "QuizName,StudentID,Points1,Stu1,PriKey1\n\"Ensayo\nM2 \",S1,1,A,A\n";
        let export = parse_export(csv, "x.csv").unwrap();
        assert_eq!(export.exam_id, "Ensayo M2");
    }

    #[test]
    fn byte_order_mark_is_stripped() {
        let csv = "\u{feff}StudentID,Points1,Stu1,PriKey1\nS1,1,A,A\n";
        let export = parse_export(csv, "bom.csv").unwrap();
        assert_eq!(export.rows.len(), 1);
    }

    #[test]
    fn exam_id_from_plain_stem() {
        assert_eq!(exam_id_from_source("quiz-M1.csv"), "quiz-M1");
        assert_eq!(exam_id_from_source("2025-01-02 - A - B - full.csv"), "A - B");
        assert_eq!(exam_date_from_source("quiz-M1.csv"), None);
    }

    #[test]
    fn student_id_header_is_not_a_question_column() {
        assert_eq!(question_column("StudentID"), None);
        assert_eq!(question_column("Stu12"), Some((QuestionField::Given, 12)));
        assert_eq!(question_column("PriKey3"), Some((QuestionField::Key, 3)));
        assert_eq!(question_column("Possible Points"), None);
        assert_eq!(question_column("Points0"), None);
    }

    #[test]
    fn parse_file_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("e1.csv");
        std::fs::write(&path, TWO_STUDENTS).unwrap();
        let export = parse_export_file(&path).unwrap();
        assert_eq!(export.source, "e1.csv");
    }
}
