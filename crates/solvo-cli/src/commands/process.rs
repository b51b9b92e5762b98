//! Process command - extract figures and ratios from a single statement file.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use clap::Args;
use console::style;
use tracing::{debug, info};

use solvo_core::error::SourceError;
use solvo_core::{DocumentPipeline, TextSource};

use super::output::{format_report, OutputFormat};
use super::{load_config, read_document};

/// Arguments for the process command.
#[derive(Args)]
pub struct ProcessArgs {
    /// Input file (PDF, image or extracted text)
    #[arg(required = true)]
    input: PathBuf,

    /// Output file (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "json")]
    format: OutputFormat,

    /// Print where each field was found in the text
    #[arg(long)]
    explain: bool,
}

pub async fn run(args: ProcessArgs, config_path: Option<&Path>) -> anyhow::Result<()> {
    let start = Instant::now();

    let config = load_config(config_path)?;

    // Check input file exists
    if !args.input.exists() {
        anyhow::bail!("Input file not found: {}", args.input.display());
    }

    info!("Processing file: {}", args.input.display());

    let document = read_document(&args.input)?;
    let pipeline = DocumentPipeline::from_config(&config)?;

    // Fetch the text once; OCR is too slow to repeat for --explain
    let text = pipeline.source().get_text(&document);
    if args.explain {
        explain(&pipeline, text.as_deref());
    }

    let report = pipeline.process_text(&document, text);
    let output = format_report(&report, args.format)?;

    // Write output
    if let Some(output_path) = &args.output {
        fs::write(output_path, &output)?;
        eprintln!(
            "{} Output written to {}",
            style("✓").green(),
            output_path.display()
        );
    } else {
        println!("{}", output);
    }

    debug!("Total processing time: {:?}", start.elapsed());

    if let (Some(kind), Some(error)) = (report.failure_kind(), report.error()) {
        anyhow::bail!("{} failed ({}): {}", report.filename, kind.as_str(), error);
    }

    Ok(())
}

/// Print each located span to stderr so stdout stays machine-readable.
fn explain(pipeline: &DocumentPipeline, text: Result<&str, &SourceError>) {
    let text = match text {
        Ok(text) => text,
        Err(e) => {
            eprintln!("{} {}", style("✗").red(), e);
            return;
        }
    };

    let spans = pipeline.locator().spans(text);
    eprintln!(
        "{} {} of {} fields located in {} characters",
        style("ℹ").blue(),
        spans.len(),
        pipeline.locator().table().len(),
        text.len()
    );
    for span in &spans {
        eprintln!(
            "  {:<22} pattern {}  {:>18}  bytes {}..{}",
            span.key.as_str(),
            span.pattern_index,
            span.raw,
            span.start,
            span.end
        );
    }

    for definition in pipeline.locator().table().iter() {
        if !spans.iter().any(|s| s.key == definition.key) {
            let marker = if definition.required {
                style("missing").red()
            } else {
                style("absent (optional)").yellow()
            };
            eprintln!("  {:<22} {}", definition.key.as_str(), marker);
        }
    }
}
