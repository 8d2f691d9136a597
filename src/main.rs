use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use cpp_grader::config::{FixtureConfig, GraderConfig};
use cpp_grader::Grader;

/// Batch grader for C++ programming submissions.
#[derive(Parser, Debug)]
#[command(name = "cpp-grader", version, about)]
struct Cli {
    /// Directory holding one subdirectory per submission.
    corpus: PathBuf,

    /// JSON configuration overlay; unset sections keep their defaults.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Where to write the text report.
    #[arg(long, default_value = "grading_output.txt")]
    report: PathBuf,

    /// Also write the report tree as JSON.
    #[arg(long)]
    json_report: Option<PathBuf>,

    /// Override the similarity threshold (identical lines, inclusive).
    #[arg(long)]
    threshold: Option<usize>,

    /// Reference fixture directory reconciled into each submission.
    #[arg(long)]
    fixtures: Option<PathBuf>,

    /// Submissions processed concurrently.
    #[arg(long, default_value_t = 1)]
    jobs: usize,

    /// Increase log verbosity (-v: debug, -vv: trace).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_level = match cli.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let mut config = match &cli.config {
        Some(path) => GraderConfig::from_file(path)?,
        None => GraderConfig::default(),
    };
    if let Some(threshold) = cli.threshold {
        config.similarity.threshold = threshold;
    }
    if let Some(fixtures) = cli.fixtures {
        config.fixtures = Some(FixtureConfig::new(fixtures));
    }

    // Only corpus problems abort the run; everything else lands in the
    // report.
    let report = Grader::new(config).jobs(cli.jobs).run(&cli.corpus).await?;

    std::fs::write(&cli.report, report.render_text())
        .with_context(|| format!("writing {}", cli.report.display()))?;
    if let Some(path) = &cli.json_report {
        std::fs::write(path, report.to_json()?)
            .with_context(|| format!("writing {}", path.display()))?;
    }

    println!(
        "Graded {} submission(s); {} similarity record(s). Report written to {}",
        report.submissions.len(),
        report.similarity.len(),
        cli.report.display()
    );
    Ok(())
}
