use chrono::{Datelike, Months, NaiveDate};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::{Path, PathBuf};

/// A billing period in `YYYY-MM` form. Lexicographic order is chronological.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MonthKey(String);

impl MonthKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn from_parts(year: &str, month: &str) -> Self {
        Self(format!("{}-{}", year, month))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The following calendar month, if this key is a real date.
    pub fn next_month(&self) -> Option<MonthKey> {
        let first_day = NaiveDate::parse_from_str(&format!("{}-01", self.0), "%Y-%m-%d").ok()?;
        let next = first_day.checked_add_months(Months::new(1))?;
        Some(MonthKey(format!("{:04}-{:02}", next.year(), next.month())))
    }
}

impl fmt::Display for MonthKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The (raw account name, duplicate suffix) pair billing files are grouped
/// by. Suffixes are kept as digit strings without leading zeros.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AccountGroup {
    name: String,
    suffix: Option<String>,
}

impl AccountGroup {
    pub fn new(name: impl Into<String>, suffix: Option<&str>) -> Self {
        Self {
            name: name.into(),
            suffix: suffix.map(str::to_string),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn suffix(&self) -> Option<&str> {
        self.suffix.as_deref()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AccountIdentity {
    group: AccountGroup,
    display_name: String,
    account_id: String,
}

impl AccountIdentity {
    pub fn new(group: AccountGroup, display_name: String, account_id: String) -> Self {
        Self {
            group,
            display_name,
            account_id,
        }
    }

    pub fn group(&self) -> &AccountGroup {
        &self.group
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn account_id(&self) -> &str {
        &self.account_id
    }
}

#[derive(Debug, Clone)]
pub struct BillingFile {
    path: PathBuf,
    month: MonthKey,
    account: AccountIdentity,
}

impl BillingFile {
    pub fn new(path: PathBuf, month: MonthKey, account: AccountIdentity) -> Self {
        Self {
            path,
            month,
            account,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn month(&self) -> &MonthKey {
        &self.month
    }

    pub fn account(&self) -> &AccountIdentity {
        &self.account
    }
}

/// Identifies one output row. Ordered by account display name, then project
/// name; the remaining fields only break ties.
///
/// The account group takes part in equality, so two accounts that resolve
/// to the same display name and id (`Acme 1` and `Acme (1)`) stay apart.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AggregationKey {
    group: AccountGroup,
    account_name: String,
    account_id: String,
    project_name: String,
    project_id: String,
    project_number: String,
}

impl AggregationKey {
    pub fn new(
        account: &AccountIdentity,
        project_name: String,
        project_id: String,
        project_number: String,
    ) -> Self {
        Self {
            group: account.group().clone(),
            account_name: account.display_name().to_string(),
            account_id: account.account_id().to_string(),
            project_name,
            project_id,
            project_number,
        }
    }

    pub fn group(&self) -> &AccountGroup {
        &self.group
    }

    pub fn account_name(&self) -> &str {
        &self.account_name
    }

    pub fn account_id(&self) -> &str {
        &self.account_id
    }

    pub fn project_name(&self) -> &str {
        &self.project_name
    }

    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    pub fn project_number(&self) -> &str {
        &self.project_number
    }

    fn sort_tuple(&self) -> (&str, &str, &str, &str, &str, &AccountGroup) {
        (
            &self.account_name,
            &self.project_name,
            &self.account_id,
            &self.project_id,
            &self.project_number,
            &self.group,
        )
    }
}

impl Ord for AggregationKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.sort_tuple().cmp(&other.sort_tuple())
    }
}

impl PartialOrd for AggregationKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MonthlySeries {
    amounts: BTreeMap<MonthKey, f64>,
}

impl MonthlySeries {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, month: &MonthKey, amount: f64) {
        *self.amounts.entry(month.clone()).or_insert(0.0) += amount;
    }

    /// Amount for `month`, zero when the project had no cost rows that month.
    pub fn get(&self, month: &MonthKey) -> f64 {
        self.amounts.get(month).copied().unwrap_or(0.0)
    }

    pub fn values_for(&self, months: &[MonthKey]) -> Vec<f64> {
        months.iter().map(|month| self.get(month)).collect()
    }
}

/// Everything accumulated during one run: per-row series plus the union of
/// months seen across the files that were actually read.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BillingTotals {
    series: BTreeMap<AggregationKey, MonthlySeries>,
    months: BTreeSet<MonthKey>,
}

impl BillingTotals {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn observe_month(&mut self, month: &MonthKey) {
        self.months.insert(month.clone());
    }

    pub fn add(&mut self, key: AggregationKey, month: &MonthKey, amount: f64) {
        self.observe_month(month);
        self.series.entry(key).or_default().add(month, amount);
    }

    /// Observed months, ascending.
    pub fn months(&self) -> Vec<MonthKey> {
        self.months.iter().cloned().collect()
    }

    pub fn latest_month(&self) -> Option<&MonthKey> {
        self.months.iter().next_back()
    }

    pub fn rows(&self) -> impl Iterator<Item = (&AggregationKey, &MonthlySeries)> {
        self.series.iter()
    }

    pub fn get(&self, key: &AggregationKey) -> Option<&MonthlySeries> {
        self.series.get(key)
    }

    pub fn project_count(&self) -> usize {
        self.series.len()
    }

    pub fn account_count(&self) -> usize {
        self.series
            .keys()
            .map(|key| key.group())
            .collect::<BTreeSet<_>>()
            .len()
    }

    pub fn month_total(&self, month: &MonthKey) -> f64 {
        self.series.values().map(|series| series.get(month)).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PercentChange {
    Value(f64),
    /// Growth from a zero base.
    Undefined,
    Empty,
}

impl fmt::Display for PercentChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PercentChange::Value(pct) => write!(f, "{:.2}%", pct),
            PercentChange::Undefined => f.write_str("N/A"),
            PercentChange::Empty => Ok(()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Forecast {
    value: Option<f64>,
    growth_pct: Option<f64>,
}

impl Forecast {
    pub fn new(value: f64, growth_pct: Option<f64>) -> Self {
        Self {
            value: Some(value),
            growth_pct,
        }
    }

    pub fn none() -> Self {
        Self::default()
    }

    pub fn value(&self) -> Option<f64> {
        self.value
    }

    pub fn value_cell(&self) -> String {
        self.value.map(format_amount).unwrap_or_default()
    }

    pub fn growth_cell(&self) -> String {
        self.growth_pct
            .map(|pct| format!("{:.2}%", pct))
            .unwrap_or_default()
    }
}

pub fn format_amount(amount: f64) -> String {
    format!("{:.2}", amount)
}

/// One fully derived output line.
#[derive(Debug, Clone)]
pub struct ReportRow {
    key: AggregationKey,
    monthly_values: Vec<f64>,
    percent_change: PercentChange,
    forecast: Forecast,
}

impl ReportRow {
    pub fn new(
        key: AggregationKey,
        monthly_values: Vec<f64>,
        percent_change: PercentChange,
        forecast: Forecast,
    ) -> Self {
        Self {
            key,
            monthly_values,
            percent_change,
            forecast,
        }
    }

    pub fn key(&self) -> &AggregationKey {
        &self.key
    }

    pub fn monthly_values(&self) -> &[f64] {
        &self.monthly_values
    }

    pub fn percent_change(&self) -> PercentChange {
        self.percent_change
    }

    pub fn forecast(&self) -> Forecast {
        self.forecast
    }

    pub fn to_record(&self) -> Vec<String> {
        let mut record = vec![
            self.key.account_name().to_string(),
            self.key.account_id().to_string(),
            self.key.project_name().to_string(),
            self.key.project_id().to_string(),
            self.key.project_number().to_string(),
        ];
        record.extend(self.monthly_values.iter().copied().map(format_amount));
        record.push(self.percent_change.to_string());
        record.push(self.forecast.value_cell());
        record.push(self.forecast.growth_cell());
        record
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ConsolidationSummary {
    pub files_scanned: usize,
    pub files_read: usize,
    pub files_missing: usize,
    /// Files that exist but could not be opened or whose header was unreadable.
    pub files_failed: usize,
    pub names_skipped: usize,
    pub rows_skipped: usize,
    pub accounts: usize,
    pub projects: usize,
    pub months: Vec<MonthKey>,
    pub latest_month_total: f64,
    pub forecast_total: f64,
}
