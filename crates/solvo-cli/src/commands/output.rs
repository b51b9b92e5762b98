//! Report formatting shared by `process`, `batch` and `serve`.

use std::path::Path;

use solvo_core::statement::rules::format_spanish_amount;
use solvo_core::{DocumentReport, RatioSet};

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    /// JSON output
    Json,
    /// CSV output
    Csv,
    /// Plain text summary
    Text,
}

const CSV_HEADER: [&str; 12] = [
    "filename",
    "status",
    "kind",
    "size_kb",
    "liquidity",
    "cash_net_debt_to_risk",
    "equity_to_risk",
    "equity_to_total_assets",
    "total_assets_approximated",
    "group_investments_over_half_current_assets",
    "inventory_over_half_current_assets",
    "error",
];

/// Format a single report.
pub fn format_report(report: &DocumentReport, format: OutputFormat) -> anyhow::Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(report)?),
        OutputFormat::Csv => format_csv(std::slice::from_ref(report)),
        OutputFormat::Text => Ok(format_text(report)),
    }
}

/// Format a batch of reports, in order.
pub fn format_reports(reports: &[DocumentReport], format: OutputFormat) -> anyhow::Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(reports)?),
        OutputFormat::Csv => format_csv(reports),
        OutputFormat::Text => Ok(reports.iter().map(format_text).collect::<Vec<_>>().join("\n")),
    }
}

fn format_csv(reports: &[DocumentReport]) -> anyhow::Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(CSV_HEADER)?;

    for report in reports {
        let kind = report.failure_kind().map(|k| k.as_str()).unwrap_or("");
        let size_kb = match &report.outcome {
            solvo_core::DocumentOutcome::Success { size_kb, .. } => size_kb.to_string(),
            solvo_core::DocumentOutcome::Failure { .. } => String::new(),
        };
        let status = if report.is_success() { "success" } else { "failure" };
        let ratios = report.ratios().map(ratio_columns).unwrap_or_default();
        let ratio_cell = |i: usize| ratios.get(i).cloned().unwrap_or_default();

        wtr.write_record([
            report.filename.as_str(),
            status,
            kind,
            &size_kb,
            &ratio_cell(0),
            &ratio_cell(1),
            &ratio_cell(2),
            &ratio_cell(3),
            &ratio_cell(4),
            &ratio_cell(5),
            &ratio_cell(6),
            report.error().unwrap_or(""),
        ])?;
    }

    let data = String::from_utf8(wtr.into_inner()?)?;
    Ok(data)
}

fn ratio_columns(ratios: &RatioSet) -> Vec<String> {
    vec![
        ratios.liquidity.to_string(),
        ratios.cash_net_debt_to_risk.to_string(),
        ratios.equity_to_risk.to_string(),
        ratios.equity_to_total_assets.to_string(),
        ratios.total_assets_approximated.to_string(),
        ratios.group_investments_over_half_current_assets.to_string(),
        ratios.inventory_over_half_current_assets.to_string(),
    ]
}

fn format_text(report: &DocumentReport) -> String {
    let mut output = String::new();

    match report.failure_kind() {
        None => output.push_str(&format!("{}: success\n", report.filename)),
        Some(kind) => output.push_str(&format!(
            "{}: failure ({})\n  {}\n",
            report.filename,
            kind.as_str(),
            report.error().unwrap_or("")
        )),
    }

    if let Some(fields) = report.fields() {
        output.push_str("\nFields:\n");
        for (key, value) in fields.iter() {
            output.push_str(&format!("  {:<22} {:>20}\n", key.as_str(), format_spanish_amount(value)));
        }
    }

    if let Some(ratios) = report.ratios() {
        output.push_str("\nRatios:\n");
        output.push_str(&format!("  Liquidity:              {}\n", ratios.liquidity));
        output.push_str(&format!("  Cash net debt / risk:   {}\n", ratios.cash_net_debt_to_risk));
        output.push_str(&format!("  Equity / risk:          {}\n", ratios.equity_to_risk));
        output.push_str(&format!("  Equity / total assets:  {}", ratios.equity_to_total_assets));
        if ratios.total_assets_approximated {
            output.push_str(" (non-current assets missing, counted as zero)");
        }
        output.push('\n');
        if ratios.group_investments_over_half_current_assets {
            output.push_str("  ! Group investments exceed half of current assets\n");
        }
        if ratios.inventory_over_half_current_assets {
            output.push_str("  ! Inventory exceeds half of current assets\n");
        }
    }

    output
}

/// Write the batch summary CSV: one row per document plus the run timestamp.
pub fn write_summary(path: &Path, reports: &[DocumentReport]) -> anyhow::Result<()> {
    let processed_at = chrono::Local::now().to_rfc3339();
    let mut wtr = csv::Writer::from_path(path)?;

    wtr.write_record(["filename", "status", "kind", "liquidity", "error", "processed_at"])?;

    for report in reports {
        let liquidity = report
            .ratios()
            .map(|r| r.liquidity.to_string())
            .unwrap_or_default();
        wtr.write_record([
            report.filename.as_str(),
            if report.is_success() { "success" } else { "failure" },
            report.failure_kind().map(|k| k.as_str()).unwrap_or(""),
            &liquidity,
            report.error().unwrap_or(""),
            &processed_at,
        ])?;
    }

    wtr.flush()?;
    Ok(())
}
