//! examtally-report — CSV tables and HTML reports for a consolidation run.

pub mod html;
pub mod tables;

pub use html::{generate_html, write_html_report};
pub use tables::write_csv_reports;
