//! The `examtally init` command.

use anyhow::Result;

pub fn execute() -> Result<()> {
    // Create examtally.toml
    if std::path::Path::new("examtally.toml").exists() {
        println!("examtally.toml already exists, skipping.");
    } else {
        std::fs::write("examtally.toml", SAMPLE_CONFIG)?;
        println!("Created examtally.toml");
    }

    // Create the exports directory
    let exports = std::path::Path::new("exports");
    if exports.is_dir() {
        println!("exports/ already exists, skipping.");
    } else {
        std::fs::create_dir_all(exports)?;
        println!("Created exports/");
    }

    println!("\nNext steps:");
    println!("  1. Copy one CSV export per exam sitting into exports/");
    println!("  2. Run: examtally validate");
    println!("  3. Run: examtally consolidate --format all");

    Ok(())
}

const SAMPLE_CONFIG: &str = r#"# examtally configuration

input_dir = "exports"
output_dir = "examtally-results"
parallelism = 4

# "correct" counts correct answers, "points" sums their point values
score_policy = "correct"

# csv, json, html or all
formats = ["csv"]

# Exam column order: by = "name", "date" (from "YYYY-MM-DD - Title - full.csv"),
# or "explicit" with an exams list
[exam_order]
by = "name"
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use examtally_core::config::ExamtallyConfig;

    #[test]
    fn sample_config_parses_to_defaults() {
        let config: ExamtallyConfig = toml::from_str(SAMPLE_CONFIG).unwrap();
        let defaults = ExamtallyConfig::default();
        assert_eq!(config.parallelism, defaults.parallelism);
        assert_eq!(config.score_policy, defaults.score_policy);
        assert_eq!(config.exam_order, defaults.exam_order);
        assert_eq!(config.formats, defaults.formats);
    }
}
