//! examtally CLI — the user-facing command-line interface.

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "examtally",
    version,
    about = "Consolidate quiz exports into attendance, difficulty and projection reports"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Consolidate every export in a directory and write the reports
    Consolidate {
        /// Directory with one CSV export per exam sitting
        #[arg(long)]
        input: Option<PathBuf>,

        /// Output directory
        #[arg(long)]
        output: Option<PathBuf>,

        /// Output formats: csv, json, html, all (comma-separated)
        #[arg(long)]
        format: Option<String>,

        /// Exam column order: name, date
        #[arg(long)]
        order: Option<String>,

        /// Explicit exam column order (comma-separated exam ids)
        #[arg(long)]
        exam_order: Option<String>,

        /// Score shown in matrix cells: correct, points
        #[arg(long)]
        score_policy: Option<String>,

        /// Max exports parsed concurrently
        #[arg(long)]
        parallelism: Option<usize>,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Parse exports and report problems without consolidating
    Validate {
        /// Export file or directory
        #[arg(long)]
        input: Option<PathBuf>,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Show one student's results and projections
    Student {
        /// Student identifier
        #[arg(long)]
        id: String,

        /// Directory with one CSV export per exam sitting
        #[arg(long)]
        input: Option<PathBuf>,

        /// Print the detail as JSON
        #[arg(long)]
        json: bool,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Describe the files in a directory
    Inspect {
        /// Directory to describe
        #[arg(default_value = ".")]
        dir: PathBuf,
    },

    /// Create a starter config and the exports directory
    Init,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("examtally=info".parse().unwrap()),
        )
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Consolidate {
            input,
            output,
            format,
            order,
            exam_order,
            score_policy,
            parallelism,
            config,
        } => {
            commands::consolidate::execute(
                input,
                output,
                format,
                order,
                exam_order,
                score_policy,
                parallelism,
                config,
            )
            .await
        }
        Commands::Validate { input, config } => commands::validate::execute(input, config),
        Commands::Student {
            id,
            input,
            json,
            config,
        } => commands::student::execute(id, input, json, config).await,
        Commands::Inspect { dir } => commands::inspect::execute(dir),
        Commands::Init => commands::init::execute(),
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}
