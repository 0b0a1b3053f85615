use crate::calculator::Calculator;
use crate::config::ReportConfig;
use crate::data_structures::{BillingTotals, ConsolidationSummary, ReportRow};
use crate::error::BillingResult;
use crate::loader::{DataLoader, ScanResult};
use crate::report::ReportWriter;
use std::path::PathBuf;
use tracing::info;

#[derive(Debug, Clone)]
pub enum ConsolidationOutcome {
    /// The input directory held no parseable billing exports.
    NoFiles,
    /// Files were read but none contained project rows.
    NoData(ConsolidationSummary),
    Written {
        path: PathBuf,
        summary: ConsolidationSummary,
    },
}

impl ConsolidationOutcome {
    pub fn summary(&self) -> Option<&ConsolidationSummary> {
        match self {
            ConsolidationOutcome::NoFiles => None,
            ConsolidationOutcome::NoData(summary) => Some(summary),
            ConsolidationOutcome::Written { summary, .. } => Some(summary),
        }
    }

    pub fn output_path(&self) -> Option<&PathBuf> {
        match self {
            ConsolidationOutcome::Written { path, .. } => Some(path),
            _ => None,
        }
    }
}

/// Runs scan, aggregation, forecasting and report writing for one input
/// directory.
pub struct BillingConsolidator {
    config: ReportConfig,
    loader: DataLoader,
    calculator: Calculator,
    writer: ReportWriter,
}

impl BillingConsolidator {
    pub fn new(config: ReportConfig) -> Self {
        let calculator = Calculator::with_thresholds(*config.thresholds());
        let writer = ReportWriter::new(config.output_dir());

        Self {
            config,
            loader: DataLoader::new(),
            calculator,
            writer,
        }
    }

    pub fn scan(&self) -> BillingResult<ScanResult> {
        self.loader.scan_directory(self.config.input_folder())
    }

    /// Reads every scanned file into fresh totals. Files that vanish or fail
    /// to open are logged and skipped.
    pub fn aggregate(&self, scan: &ScanResult) -> (BillingTotals, ConsolidationSummary) {
        let mut summary = ConsolidationSummary {
            files_scanned: scan.files().len(),
            names_skipped: scan.skipped().len(),
            ..ConsolidationSummary::default()
        };
        let totals = self.loader.load_files(scan.files(), &mut summary);

        summary.accounts = totals.account_count();
        summary.projects = totals.project_count();
        summary.months = totals.months();
        summary.latest_month_total = totals
            .latest_month()
            .map(|month| totals.month_total(month))
            .unwrap_or(0.0);

        (totals, summary)
    }

    pub fn forecast(&self, totals: &BillingTotals) -> Vec<ReportRow> {
        self.calculator.build_rows(totals)
    }

    pub fn run(&self) -> BillingResult<ConsolidationOutcome> {
        let scan = self.scan()?;
        if scan.is_empty() {
            info!("No billing files to process");
            return Ok(ConsolidationOutcome::NoFiles);
        }

        let (totals, mut summary) = self.aggregate(&scan);
        if totals.is_empty() {
            info!("No project data found in the billing CSV files");
            return Ok(ConsolidationOutcome::NoData(summary));
        }

        let months = totals.months();
        let rows = self.forecast(&totals);
        summary.forecast_total = self.calculator.calculate_forecast_total(&rows);

        if let Some(next) = totals.latest_month().and_then(|m| m.next_month()) {
            info!("Projected {} total: {:.2}", next, summary.forecast_total);
        }

        let path = self.writer.write(&months, &rows)?;
        info!(
            "Consolidated {} projects across {} accounts and {} months",
            summary.projects,
            summary.accounts,
            months.len()
        );

        Ok(ConsolidationOutcome::Written { path, summary })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_structures::MonthKey;
    use crate::error::BillingError;
    use std::fs;
    use tempfile::TempDir;

    const HEADER: &str = "Billing account name,Project name,Project ID,Project number,Subtotal ($)";

    fn write_export(dir: &std::path::Path, name: &str, rows: &[&str]) {
        let mut content = HEADER.to_string();
        for row in rows {
            content.push('\n');
            content.push_str(row);
        }
        content.push('\n');
        fs::write(dir.join(name), content).unwrap();
    }

    fn consolidator(input: &TempDir, output: &TempDir) -> BillingConsolidator {
        BillingConsolidator::new(
            ReportConfig::new(input.path())
                .with_base_path(output.path())
                .with_output_folder("Reports/Billing"),
        )
    }

    #[test]
    fn test_missing_input_directory_aborts() {
        let output = TempDir::new().unwrap();
        let consolidator = BillingConsolidator::new(
            ReportConfig::new(output.path().join("nope")).with_base_path(output.path()),
        );

        let err = consolidator.run().unwrap_err();
        assert!(matches!(err, BillingError::DirectoryNotFound(_)));
    }

    #[test]
    fn test_no_files_is_not_an_error() {
        let input = TempDir::new().unwrap();
        let output = TempDir::new().unwrap();

        let outcome = consolidator(&input, &output).run().unwrap();
        assert!(matches!(outcome, ConsolidationOutcome::NoFiles));
        assert!(!output.path().join("Reports").exists());
    }

    #[test]
    fn test_files_without_projects_report_no_data() {
        let input = TempDir::new().unwrap();
        let output = TempDir::new().unwrap();
        write_export(
            input.path(),
            "Acme_Reports, 2026-01-01 — 2026-01-31.csv",
            &["Acme,,,,12.00"],
        );

        let outcome = consolidator(&input, &output).run().unwrap();
        match outcome {
            ConsolidationOutcome::NoData(summary) => {
                assert_eq!(summary.files_read, 1);
                assert_eq!(summary.projects, 0);
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[test]
    fn test_end_to_end_report() {
        let input = TempDir::new().unwrap();
        let output = TempDir::new().unwrap();

        write_export(
            input.path(),
            "Acme_Reports, 2025-12-01 — 2025-12-31.csv",
            &["Acme,web,web-1,111,100.00", "Acme,db,db-1,222,0.00"],
        );
        write_export(
            input.path(),
            "Acme_Reports, 2026-01-01 — 2026-01-31.csv",
            &["Acme,web,web-1,111,120.00", "Acme,db,db-1,222,50.00", "Acme,,,,999.00"],
        );
        write_export(
            input.path(),
            "Acme_Reports, 2026-02-01 — 2026-02-28.csv",
            &["Acme,web,web-1,111,150.00", "Acme,db,db-1,222,75.00"],
        );
        write_export(
            input.path(),
            "Acme_Reports, 2026-02-01 — 2026-02-28 (1).csv",
            &["Acme,cache,cache-1,333,8.00"],
        );
        write_export(
            input.path(),
            "Acme_Reports, 2026-01-01 — 2026-01-31 (1).csv",
            &["Acme,cache,cache-1,333,5.00"],
        );
        fs::write(input.path().join("Acme_Reports, undated.csv"), HEADER).unwrap();

        let outcome = consolidator(&input, &output).run().unwrap();
        let path = outcome.output_path().unwrap().clone();
        let summary = outcome.summary().unwrap();

        assert_eq!(
            path,
            output.path().join("Reports/Billing").join("Billing_2026-02.csv")
        );
        assert_eq!(summary.files_scanned, 5);
        assert_eq!(summary.files_read, 5);
        assert_eq!(summary.names_skipped, 1);
        assert_eq!(summary.accounts, 2);
        assert_eq!(summary.projects, 3);
        assert_eq!(
            summary.months,
            vec![
                MonthKey::new("2025-12"),
                MonthKey::new("2026-01"),
                MonthKey::new("2026-02")
            ]
        );
        assert_eq!(summary.latest_month_total, 233.0);

        let content = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(
            lines,
            vec![
                "Billing Account Name,Billing Account ID,Project Name,Project ID,Project Number,Subtotal 2025-12,Subtotal 2026-01,Subtotal 2026-02,MoM Change %,Next Month Forecast,Next Month Growth %",
                "Acme,BA-acme,db,db-1,222,0.00,50.00,75.00,50.00%,100.00,33.33%",
                "Acme,BA-acme,web,web-1,111,100.00,120.00,150.00,25.00%,183.71,22.47%",
                "Acme 1,BA-acme-1,cache,cache-1,333,0.00,5.00,8.00,60.00%,11.00,37.50%",
            ]
        );
    }

    #[test]
    fn test_literal_and_suffixed_accounts_get_separate_rows() {
        let input = TempDir::new().unwrap();
        let output = TempDir::new().unwrap();
        write_export(
            input.path(),
            "Acme 1_Reports, 2026-01-01 — 2026-01-31.csv",
            &["Acme 1,web,web-1,111,10.00"],
        );
        write_export(
            input.path(),
            "Acme_Reports, 2026-01-01 — 2026-01-31 (1).csv",
            &["Acme,web,web-1,111,5.00"],
        );

        let outcome = consolidator(&input, &output).run().unwrap();
        let summary = outcome.summary().unwrap();
        assert_eq!(summary.accounts, 2);
        assert_eq!(summary.projects, 2);

        let content = fs::read_to_string(outcome.output_path().unwrap()).unwrap();
        let lines: Vec<&str> = content.lines().skip(1).collect();
        assert_eq!(
            lines,
            vec![
                "Acme 1,BA-acme-1,web,web-1,111,5.00,,,",
                "Acme 1,BA-acme-1,web,web-1,111,10.00,,,",
            ]
        );
    }

    #[test]
    fn test_oversized_suffix_does_not_merge_into_base_account() {
        let input = TempDir::new().unwrap();
        let output = TempDir::new().unwrap();
        write_export(
            input.path(),
            "Acme_Reports, 2026-01-01 — 2026-01-31.csv",
            &["Acme,web,web-1,111,10.00"],
        );
        write_export(
            input.path(),
            "Acme_Reports, 2026-01-01 — 2026-01-31 (99999999999).csv",
            &["Acme,web,web-1,111,5.00"],
        );

        let outcome = consolidator(&input, &output).run().unwrap();

        let content = fs::read_to_string(outcome.output_path().unwrap()).unwrap();
        let lines: Vec<&str> = content.lines().skip(1).collect();
        assert_eq!(
            lines,
            vec![
                "Acme,BA-acme,web,web-1,111,10.00,,,",
                "Acme 99999999999,BA-acme-99999999999,web,web-1,111,5.00,,,",
            ]
        );
    }

    #[test]
    fn test_unreadable_file_is_counted_as_failed() {
        let input = TempDir::new().unwrap();
        let output = TempDir::new().unwrap();
        write_export(
            input.path(),
            "Acme_Reports, 2026-01-01 — 2026-01-31.csv",
            &["Acme,web,web-1,111,10.00"],
        );
        let scan = consolidator(&input, &output).scan().unwrap();
        fs::remove_file(input.path().join("Acme_Reports, 2026-01-01 — 2026-01-31.csv")).unwrap();
        fs::create_dir(input.path().join("Acme_Reports, 2026-01-01 — 2026-01-31.csv")).unwrap();

        let (totals, summary) = consolidator(&input, &output).aggregate(&scan);

        assert!(totals.is_empty());
        assert_eq!(summary.files_scanned, 1);
        assert_eq!(summary.files_failed, 1);
        assert_eq!(summary.files_missing, 0);
    }
}
