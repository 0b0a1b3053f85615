use billing_consolidator_core::prelude::*;
use std::env;
use tracing_subscriber::{fmt, EnvFilter};

fn format_number(amount: f64) -> String {
    let whole = format!("{:.2}", amount.abs());
    let (int_part, frac_part) = whole.split_once('.').unwrap_or((whole.as_str(), "00"));

    let mut grouped = String::new();
    for (i, c) in int_part.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    let grouped: String = grouped.chars().rev().collect();

    let sign = if amount < 0.0 { "-" } else { "" };
    format!("{}{}.{}", sign, grouped, frac_part)
}

fn print_summary(summary: &ConsolidationSummary) {
    println!();
    println!("Files scanned:   {}", summary.files_scanned);
    println!("Files read:      {}", summary.files_read);
    println!("Files missing:   {}", summary.files_missing);
    println!("Files failed:    {}", summary.files_failed);
    println!("Names skipped:   {}", summary.names_skipped);
    println!("Rows skipped:    {}", summary.rows_skipped);
    println!("Accounts:        {}", summary.accounts);
    println!("Projects:        {}", summary.projects);

    let months: Vec<&str> = summary.months.iter().map(MonthKey::as_str).collect();
    println!("Months:          {}", months.join(", "));

    if let Some(latest) = summary.months.last() {
        println!(
            "Total {}:   ${}",
            latest,
            format_number(summary.latest_month_total)
        );
        if let Some(next) = latest.next_month() {
            println!(
                "Forecast {}: ${}",
                next,
                format_number(summary.forecast_total)
            );
        }
    }
}

fn main() -> Result<()> {
    let filter =
        EnvFilter::from_default_env().add_directive("billing_consolidator_core=info".parse()?);
    fmt().with_env_filter(filter).init();

    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        eprintln!("Usage: {} <billing_export_dir> [output_dir]", args[0]);
        std::process::exit(1);
    }

    let mut config = ReportConfig::new(&args[1]);
    if let Some(output_dir) = args.get(2) {
        config = config.with_base_path(output_dir).with_output_folder(".");
    }

    println!("Consolidating billing exports from: {}", args[1]);
    let consolidator = BillingConsolidator::new(config);

    match consolidator.run()? {
        ConsolidationOutcome::NoFiles => {
            println!("No billing files found.");
        }
        ConsolidationOutcome::NoData(summary) => {
            println!("No project rows found in the billing files.");
            print_summary(&summary);
        }
        ConsolidationOutcome::Written { path, summary } => {
            println!("Report written to: {}", path.display());
            print_summary(&summary);
        }
    }

    Ok(())
}
