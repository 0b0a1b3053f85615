pub mod calculator;
pub mod config;
pub mod consolidator;
pub mod data_structures;
pub mod error;
pub mod filename;
pub mod identifier;
pub mod loader;
pub mod report;

pub use calculator::Calculator;
pub use config::{ConfigFile, ForecastThresholds, ReportConfig};
pub use consolidator::{BillingConsolidator, ConsolidationOutcome};
pub use data_structures::{
    AccountGroup, AccountIdentity, AggregationKey, BillingFile, BillingTotals,
    ConsolidationSummary, Forecast, MonthKey, MonthlySeries, PercentChange, ReportRow,
};
pub use error::{BillingError, BillingResult};
pub use filename::{parse_billing_filename, ParsedFilename};
pub use identifier::AccountIdentifier;
pub use loader::{DataLoader, FileOutcome, ScanResult};
pub use report::ReportWriter;

pub mod prelude {
    pub use crate::config::ReportConfig;
    pub use crate::consolidator::{BillingConsolidator, ConsolidationOutcome};
    pub use crate::data_structures::{ConsolidationSummary, MonthKey};
    pub use crate::error::{BillingError, BillingResult};
    pub use anyhow::Result;
}
