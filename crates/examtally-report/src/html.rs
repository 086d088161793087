//! HTML report generator.
//!
//! Produces a self-contained HTML file with all CSS/JS inlined.

use anyhow::Result;
use std::path::Path;

use examtally_core::difficulty::exam_mean_index;
use examtally_core::model::AttendanceCell;
use examtally_core::report::ConsolidationReport;

/// Escape a string for safe HTML insertion.
fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#x27;")
}

/// Generate an HTML report from a consolidation report.
pub fn generate_html(report: &ConsolidationReport) -> String {
    let mut html = String::new();

    html.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n");
    html.push_str("<meta charset=\"utf-8\">\n");
    html.push_str("<meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n");
    html.push_str(&format!(
        "<title>examtally report — {} exams</title>\n",
        report.exams.len()
    ));
    html.push_str("<style>\n");
    html.push_str(CSS);
    html.push_str("</style>\n");
    html.push_str("</head>\n<body>\n");

    // Header
    html.push_str("<header>\n");
    html.push_str("<h1>examtally report</h1>\n");
    html.push_str(&format!(
        "<p class=\"meta\">{} exams | {} students | score: {} | {}</p>\n",
        report.exams.len(),
        report.students.len(),
        report.score_policy,
        report.created_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    html.push_str("</header>\n");

    // Exam summary
    html.push_str("<section class=\"dashboard\">\n");
    html.push_str("<h2>Exams</h2>\n");
    html.push_str("<table class=\"summary\">\n");
    html.push_str("<thead><tr><th>Exam</th><th>Date</th><th>Students</th><th>Questions</th><th>Attendance</th><th>Mean difficulty</th></tr></thead>\n");
    html.push_str("<tbody>\n");
    for exam in &report.exams {
        let date = exam
            .date
            .map(|d| d.to_string())
            .unwrap_or_else(|| "-".to_string());
        let attendance = report
            .matrix
            .attendance_rate(&exam.exam_id)
            .map(|r| format!("{:.1}%", r * 100.0))
            .unwrap_or_else(|| "-".to_string());
        let mean = exam_mean_index(&report.difficulty, &exam.exam_id)
            .map(|m| format!("{m:.4}"))
            .unwrap_or_else(|| "-".to_string());
        let class = if exam.is_empty() { " class=\"empty\"" } else { "" };
        html.push_str(&format!(
            "<tr{}><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>\n",
            class,
            html_escape(&exam.exam_id),
            date,
            exam.student_count,
            exam.total_questions,
            attendance,
            mean,
        ));
    }
    html.push_str("</tbody></table>\n");

    if !report.exams.is_empty() && !report.matrix.rows.is_empty() {
        html.push_str(&generate_bar_chart(report));
    }
    html.push_str("</section>\n");

    // Attendance matrix
    html.push_str("<section class=\"results\">\n");
    html.push_str("<h2>Attendance</h2>\n");
    html.push_str("<table class=\"results-table\" id=\"results\">\n");
    html.push_str("<thead><tr><th onclick=\"sortTable(0)\">Student</th><th onclick=\"sortTable(1)\">Name</th>");
    for (i, exam) in report.matrix.exams.iter().enumerate() {
        html.push_str(&format!(
            "<th onclick=\"sortTable({})\">{}</th>",
            i + 2,
            html_escape(exam)
        ));
    }
    html.push_str("</tr></thead>\n<tbody>\n");

    for row in &report.matrix.rows {
        let name = report
            .student(&row.student_id)
            .map(|s| s.display_name())
            .unwrap_or_default();
        html.push_str(&format!(
            "<tr><td>{}</td><td>{}</td>",
            html_escape(&row.student_id),
            html_escape(&name)
        ));
        for cell in &row.cells {
            let class = match cell {
                AttendanceCell::Scored { .. } => "pass",
                AttendanceCell::NotRendered => "nr",
            };
            html.push_str(&format!("<td class=\"{class}\">{cell}</td>"));
        }
        html.push_str("</tr>\n");
    }
    html.push_str("</tbody></table>\n");
    html.push_str("</section>\n");

    // Projections
    if !report.projections.is_empty() {
        html.push_str("<section class=\"projections\">\n");
        html.push_str("<h2>Projections</h2>\n");
        html.push_str("<table>\n");
        html.push_str("<thead><tr><th>Student</th><th>Exam</th><th>Expected correct</th><th>Questions</th></tr></thead>\n");
        html.push_str("<tbody>\n");
        for p in &report.projections {
            html.push_str(&format!(
                "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>\n",
                html_escape(&p.student_id),
                html_escape(&p.exam_id),
                p.outcome,
                p.total_questions
            ));
        }
        html.push_str("</tbody></table>\n");
        html.push_str("</section>\n");
    }

    // Difficulty
    html.push_str("<section class=\"difficulty\">\n");
    html.push_str("<details>\n<summary>Question difficulty</summary>\n");
    html.push_str("<table>\n");
    html.push_str("<thead><tr><th>Exam</th><th>Question</th><th>Respondents</th><th>Correct fraction</th></tr></thead>\n");
    html.push_str("<tbody>\n");
    for d in &report.difficulty {
        html.push_str(&format!(
            "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>\n",
            html_escape(&d.exam_id),
            d.question_index,
            d.respondents,
            d.index
        ));
    }
    html.push_str("</tbody></table>\n");
    html.push_str("</details>\n</section>\n");

    // Skipped exports and warnings
    if !report.skipped.is_empty() || !report.warnings.is_empty() {
        html.push_str("<section class=\"issues\">\n");
        html.push_str("<h2>Issues</h2>\n<ul>\n");
        for s in &report.skipped {
            html.push_str(&format!(
                "<li class=\"fail\">skipped {}: {}</li>\n",
                html_escape(&s.source),
                html_escape(&s.reason)
            ));
        }
        for w in &report.warnings {
            html.push_str(&format!("<li>{}</li>\n", html_escape(&w.to_string())));
        }
        html.push_str("</ul>\n</section>\n");
    }

    // Raw JSON
    html.push_str("<section class=\"raw-data\">\n");
    html.push_str("<details>\n<summary>Raw JSON Data</summary>\n");
    html.push_str("<pre><code>");
    html.push_str(&html_escape(
        &serde_json::to_string_pretty(report).unwrap_or_default(),
    ));
    html.push_str("</code></pre>\n");
    html.push_str("</details>\n</section>\n");

    // JavaScript for sorting
    html.push_str("<script>\n");
    html.push_str(JS);
    html.push_str("</script>\n");

    html.push_str("</body>\n</html>");
    html
}

/// Write an HTML report to a file.
pub fn write_html_report(report: &ConsolidationReport, path: &Path) -> Result<()> {
    let html = generate_html(report);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, html)?;
    Ok(())
}

/// Attendance rate per exam.
fn generate_bar_chart(report: &ConsolidationReport) -> String {
    let bar_height = 30;
    let max_width = 400;
    let padding = 10;
    let label_width = 200;

    let exams: Vec<(&String, f64)> = report
        .matrix
        .exams
        .iter()
        .map(|e| (e, report.matrix.attendance_rate(e).unwrap_or(0.0)))
        .collect();

    let total_height = exams.len() * (bar_height + padding) + padding;

    let mut svg = format!(
        "<svg width=\"{}\" height=\"{}\" xmlns=\"http://www.w3.org/2000/svg\">\n",
        label_width + max_width + 60,
        total_height
    );

    for (i, (exam, rate)) in exams.iter().enumerate() {
        let y = i * (bar_height + padding) + padding;
        let width = (*rate * max_width as f64) as usize;

        let color = if *rate >= 0.8 {
            "#22c55e"
        } else if *rate >= 0.5 {
            "#eab308"
        } else {
            "#ef4444"
        };

        svg.push_str(&format!(
            "  <text x=\"{}\" y=\"{}\" font-size=\"14\" fill=\"currentColor\" text-anchor=\"end\" dominant-baseline=\"middle\">{}</text>\n",
            label_width - 10,
            y + bar_height / 2,
            html_escape(exam)
        ));
        svg.push_str(&format!(
            "  <rect x=\"{}\" y=\"{}\" width=\"{}\" height=\"{}\" fill=\"{}\" rx=\"4\"/>\n",
            label_width, y, width, bar_height, color
        ));
        svg.push_str(&format!(
            "  <text x=\"{}\" y=\"{}\" font-size=\"12\" fill=\"currentColor\" dominant-baseline=\"middle\">{:.1}%</text>\n",
            label_width + width + 8,
            y + bar_height / 2,
            rate * 100.0
        ));
    }

    svg.push_str("</svg>\n");
    svg
}

const CSS: &str = r#"
:root { --bg: #fff; --fg: #1a1a1a; --border: #e5e7eb; --pass: #dcfce7; --fail: #fde2e2; --nr: #f3f4f6; }
@media (prefers-color-scheme: dark) {
  :root { --bg: #111827; --fg: #f9fafb; --border: #374151; --pass: #064e3b; --fail: #7f1d1d; --nr: #1f2937; }
}
body { font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', sans-serif; margin: 0; padding: 2rem; background: var(--bg); color: var(--fg); }
h1, h2 { margin-top: 2rem; }
.meta { color: #6b7280; }
table { border-collapse: collapse; width: 100%; margin: 1rem 0; }
th, td { border: 1px solid var(--border); padding: 0.5rem 1rem; text-align: left; }
th { background: var(--border); cursor: pointer; }
.pass { background: var(--pass); }
.fail { background: var(--fail); }
.nr { background: var(--nr); color: #9ca3af; text-align: center; }
tr.empty td { color: #9ca3af; font-style: italic; }
pre { overflow-x: auto; padding: 1rem; background: var(--border); border-radius: 8px; }
code { font-family: 'JetBrains Mono', 'Fira Code', monospace; font-size: 0.85rem; }
details { margin: 1rem 0; }
summary { cursor: pointer; font-weight: bold; }
svg { margin: 1rem 0; }
"#;

const JS: &str = r#"
function sortTable(col) {
  const table = document.getElementById('results');
  const tbody = table.querySelector('tbody');
  const rows = Array.from(tbody.querySelectorAll('tr'));
  const asc = table.dataset.sortCol == col && table.dataset.sortDir == 'asc' ? false : true;
  rows.sort((a, b) => {
    const va = a.cells[col].textContent;
    const vb = b.cells[col].textContent;
    const na = parseFloat(va), nb = parseFloat(vb);
    // Scores sort before NR and other text.
    const cmp = !isNaN(na) && !isNaN(nb) ? na - nb
      : !isNaN(na) ? -1
      : !isNaN(nb) ? 1
      : va.localeCompare(vb);
    return asc ? cmp : -cmp;
  });
  table.dataset.sortCol = col;
  table.dataset.sortDir = asc ? 'asc' : 'desc';
  rows.forEach(r => tbody.appendChild(r));
}
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tables::tests::make_report;

    #[test]
    fn html_report_contains_required_elements() {
        let report = make_report();
        let html = generate_html(&report);

        assert!(html.contains("<html"));
        assert!(html.contains("</html>"));
        assert!(html.contains("<th onclick=\"sortTable(2)\">E1</th>"));
        assert!(html.contains("<td class=\"nr\">NR</td>"));
        assert!(html.contains("Cleo Díaz"));
        assert!(html.contains("<svg"));
        assert!(html.contains("Projections"));
    }

    #[test]
    fn html_escapes_identifiers() {
        let mut report = make_report();
        report.matrix.exams[0] = "<script>".into();
        let html = generate_html(&report);
        assert!(html.contains("&lt;script&gt;"));
        assert!(!html.contains("<th onclick=\"sortTable(2)\"><script>"));
    }

    #[test]
    fn raw_json_escapes_ampersands() {
        let mut report = make_report();
        report.students[0].last_name = "Soto & <b>Lee</b>".into();
        let html = generate_html(&report);
        assert!(html.contains("Soto &amp; &lt;b&gt;Lee&lt;/b&gt;"));
        assert!(!html.contains("Soto & "));
        assert!(!html.contains("<b>Lee"));
    }

    #[test]
    fn numeric_cells_sort_before_nr() {
        let html = generate_html(&make_report());
        assert!(html.contains("!isNaN(na) ? -1"));
        assert!(html.contains("!isNaN(nb) ? 1"));
    }

    #[test]
    fn html_report_write_to_file() {
        let report = make_report();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/report.html");

        write_html_report(&report, &path).unwrap();
        assert!(path.exists());

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("<html"));
    }
}
