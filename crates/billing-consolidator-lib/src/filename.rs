use crate::data_structures::MonthKey;
use once_cell::sync::Lazy;
use regex::Regex;

/// Marker separating the billing account name from the reporting period.
pub const REPORTS_MARKER: &str = "_Reports,";

static MONTH_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d{4})-(\d{2})-\d{2}").expect("valid month regex"));
static SUFFIX_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s*\((\d+)\)\.csv$").expect("valid suffix regex"));
static ACCOUNT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(.+?)_Reports,").expect("valid account regex"));

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedFilename {
    account_name: String,
    month: MonthKey,
    suffix: Option<String>,
}

impl ParsedFilename {
    pub fn account_name(&self) -> &str {
        &self.account_name
    }

    pub fn month(&self) -> &MonthKey {
        &self.month
    }

    /// Duplicate-account suffix, e.g. `"2"` for `... (2).csv`, without
    /// leading zeros. A `(0)` suffix is treated as absent.
    pub fn suffix(&self) -> Option<&str> {
        self.suffix.as_deref()
    }
}

/// Splits a billing export file name such as
/// `Acme_Reports, 2026-01-01 — 2026-01-31 (1).csv` into its parts.
///
/// Returns `None` when the name carries no date or no account marker.
pub fn parse_billing_filename(filename: &str) -> Option<ParsedFilename> {
    let captures = MONTH_RE.captures(filename)?;
    let month = MonthKey::from_parts(&captures[1], &captures[2]);

    // Kept as digits so arbitrarily long suffixes never collapse into "none".
    let suffix = SUFFIX_RE
        .captures(filename)
        .map(|caps| caps[1].trim_start_matches('0').to_string())
        .filter(|digits| !digits.is_empty());

    let base_name = SUFFIX_RE.replace(filename, ".csv");
    let account_name = ACCOUNT_RE.captures(&base_name)?[1].to_string();

    Some(ParsedFilename {
        account_name,
        month,
        suffix,
    })
}

/// Cheap pre-filter applied while listing a directory.
pub fn is_billing_export(filename: &str) -> bool {
    filename.contains(REPORTS_MARKER) && filename.ends_with(".csv")
}
