use crate::data_structures::{MonthKey, ReportRow};
use crate::error::{BillingError, BillingResult};
use csv::Writer;
use std::fs;
use std::path::PathBuf;
use tracing::debug;

pub const IDENTITY_COLUMNS: [&str; 5] = [
    "Billing Account Name",
    "Billing Account ID",
    "Project Name",
    "Project ID",
    "Project Number",
];
pub const PERCENT_CHANGE_COLUMN: &str = "MoM Change %";
pub const FORECAST_COLUMN: &str = "Next Month Forecast";
pub const FORECAST_GROWTH_COLUMN: &str = "Next Month Growth %";

pub struct ReportWriter {
    output_dir: PathBuf,
}

impl ReportWriter {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    /// `Billing_<latest month>.csv`, or `Billing_unknown.csv` without months.
    pub fn output_filename(months: &[MonthKey]) -> String {
        match months.last() {
            Some(latest) => format!("Billing_{}.csv", latest),
            None => "Billing_unknown.csv".to_string(),
        }
    }

    pub fn header(months: &[MonthKey]) -> Vec<String> {
        let mut header: Vec<String> = IDENTITY_COLUMNS.iter().map(|c| c.to_string()).collect();
        header.extend(months.iter().map(|m| format!("Subtotal {}", m)));
        header.push(PERCENT_CHANGE_COLUMN.to_string());
        header.push(FORECAST_COLUMN.to_string());
        header.push(FORECAST_GROWTH_COLUMN.to_string());
        header
    }

    /// Writes the consolidated report and returns its path. Rows are written
    /// in the order given.
    pub fn write(&self, months: &[MonthKey], rows: &[ReportRow]) -> BillingResult<PathBuf> {
        fs::create_dir_all(&self.output_dir).map_err(|e| BillingError::io(&self.output_dir, e))?;

        let path = self.output_dir.join(Self::output_filename(months));
        let mut writer = Writer::from_path(&path).map_err(|e| BillingError::csv(&path, e))?;

        writer
            .write_record(Self::header(months))
            .map_err(|e| BillingError::csv(&path, e))?;

        for row in rows {
            writer
                .write_record(row.to_record())
                .map_err(|e| BillingError::csv(&path, e))?;
        }

        writer.flush().map_err(|e| BillingError::io(&path, e))?;
        debug!(path = %path.display(), rows = rows.len(), "Report written");

        Ok(path)
    }
}
