//! Batch processing command for multiple statement files.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use clap::Args;
use console::style;
use glob::glob;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, warn};

use solvo_core::{DocumentOutcome, DocumentPipeline, DocumentReport, FailureKind};

use super::output::{format_reports, write_summary, OutputFormat};
use super::{load_config, read_document};

/// Arguments for the batch command.
#[derive(Args)]
pub struct BatchArgs {
    /// Input files or glob patterns, processed in the order given
    #[arg(required = true)]
    inputs: Vec<String>,

    /// Output file for the reports (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "json")]
    format: OutputFormat,

    /// Also write a summary CSV to this path
    #[arg(long)]
    summary: Option<PathBuf>,
}

pub async fn run(args: BatchArgs, config_path: Option<&Path>) -> anyhow::Result<()> {
    let start = Instant::now();

    let config = load_config(config_path)?;
    let files = expand_inputs(&args.inputs)?;

    if files.is_empty() {
        anyhow::bail!("No matching files found for: {}", args.inputs.join(" "));
    }

    eprintln!(
        "{} Found {} files to process",
        style("ℹ").blue(),
        files.len()
    );

    let pipeline = DocumentPipeline::from_config(&config)?;

    let pb = ProgressBar::new(files.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} files")?
            .progress_chars("=>-"),
    );

    let mut reports = Vec::with_capacity(files.len());
    for path in &files {
        let report = match read_document(path) {
            Ok(document) => pipeline.process(&document),
            Err(e) => {
                warn!("{:#}", e);
                unreadable(path, &e)
            }
        };
        reports.push(report);
        pb.inc(1);
    }

    pb.finish_and_clear();

    let output = format_reports(&reports, args.format)?;
    if let Some(output_path) = &args.output {
        fs::write(output_path, &output)?;
        debug!("Wrote reports to {}", output_path.display());
    } else {
        println!("{}", output);
    }

    if let Some(summary_path) = &args.summary {
        write_summary(summary_path, &reports)?;
        eprintln!(
            "{} Summary written to {}",
            style("✓").green(),
            summary_path.display()
        );
    }

    let failed: Vec<_> = reports.iter().filter(|r| !r.is_success()).collect();

    eprintln!(
        "{} Processed {} files in {:?}: {} successful, {} failed",
        style("✓").green(),
        reports.len(),
        start.elapsed(),
        style(reports.len() - failed.len()).green(),
        style(failed.len()).red()
    );

    for report in &failed {
        eprintln!(
            "  - {}: {}",
            report.filename,
            report.error().unwrap_or("unknown error")
        );
    }

    Ok(())
}

/// Expand each input in order. Literal paths are kept even when missing so
/// they show up as failures instead of disappearing.
fn expand_inputs(inputs: &[String]) -> anyhow::Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    for input in inputs {
        let matches: Vec<PathBuf> = glob(input)?
            .filter_map(|r| r.ok())
            .filter(|p| p.is_file())
            .collect();

        if matches.is_empty() {
            if glob::Pattern::escape(input) == *input {
                files.push(PathBuf::from(input));
            } else {
                warn!("Pattern matched no files: {}", input);
            }
        } else {
            files.extend(matches);
        }
    }

    Ok(files)
}

fn unreadable(path: &Path, error: &anyhow::Error) -> DocumentReport {
    DocumentReport {
        filename: path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string()),
        outcome: DocumentOutcome::Failure {
            kind: FailureKind::SourceUnavailable,
            error: format!("{:#}", error),
            fields: None,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expand_inputs_keeps_order_and_missing_literals() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b.txt", "a.txt", "c.pdf"] {
            fs::write(dir.path().join(name), "x").unwrap();
        }

        let inputs = vec![
            dir.path().join("c.pdf").display().to_string(),
            dir.path().join("*.txt").display().to_string(),
            dir.path().join("missing.pdf").display().to_string(),
        ];
        let files = expand_inputs(&inputs).unwrap();

        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["c.pdf", "a.txt", "b.txt", "missing.pdf"]);
    }
}
