use crate::data_structures::{
    AccountGroup, AggregationKey, BillingFile, BillingTotals, ConsolidationSummary, MonthKey,
};
use crate::error::{BillingError, BillingResult};
use crate::filename::{is_billing_export, parse_billing_filename};
use crate::identifier::AccountIdentifier;
use csv::{ReaderBuilder, StringRecord};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

pub const PROJECT_NAME_COLUMN: &str = "Project name";
pub const PROJECT_ID_COLUMN: &str = "Project ID";
pub const PROJECT_NUMBER_COLUMN: &str = "Project number";
pub const SUBTOTAL_COLUMN: &str = "Subtotal ($)";
pub const UNROUNDED_SUBTOTAL_COLUMN: &str = "Unrounded subtotal ($)";

/// Files found by [`DataLoader::scan_directory`], plus the names that could
/// not be parsed.
#[derive(Debug, Clone, Default)]
pub struct ScanResult {
    files: Vec<BillingFile>,
    skipped: Vec<String>,
}

impl ScanResult {
    pub fn files(&self) -> &[BillingFile] {
        &self.files
    }

    pub fn skipped(&self) -> &[String] {
        &self.skipped
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileOutcome {
    /// The file disappeared between scan and load.
    Missing,
    Loaded { rows: usize, skipped_rows: usize },
}

pub struct DataLoader {
    identifier: AccountIdentifier,
}

impl DataLoader {
    pub fn new() -> Self {
        Self {
            identifier: AccountIdentifier::new(),
        }
    }

    /// Lists the billing exports in `dir_path`, grouped into accounts by
    /// (raw account name, duplicate suffix).
    pub fn scan_directory<P: AsRef<Path>>(&self, dir_path: P) -> BillingResult<ScanResult> {
        let dir_path = dir_path.as_ref();
        if !dir_path.is_dir() {
            return Err(BillingError::DirectoryNotFound(dir_path.to_path_buf()));
        }

        let dir = std::fs::read_dir(dir_path).map_err(|e| BillingError::io(dir_path, e))?;

        let mut candidates = Vec::new();
        let mut skipped = Vec::new();
        for entry in dir {
            let entry = entry.map_err(|e| BillingError::io(dir_path, e))?;
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            let Some(raw_name) = path.file_name() else {
                continue;
            };
            match raw_name.to_str() {
                Some(name) if is_billing_export(name) => {
                    candidates.push((name.to_string(), path.clone()));
                }
                Some(_) => {}
                None => {
                    let name = raw_name.to_string_lossy().into_owned();
                    if is_billing_export(&name) {
                        warn!("Could not parse billing file name (not valid UTF-8): {}", name);
                        skipped.push(name);
                    }
                }
            }
        }

        if candidates.is_empty() {
            warn!("No billing CSV files found in {}", dir_path.display());
            return Ok(ScanResult {
                files: Vec::new(),
                skipped,
            });
        }

        candidates.sort();

        let mut groups: BTreeMap<AccountGroup, Vec<(PathBuf, MonthKey)>> = BTreeMap::new();

        for (name, path) in candidates {
            match parse_billing_filename(&name) {
                Some(parsed) => {
                    groups
                        .entry(AccountGroup::new(parsed.account_name(), parsed.suffix()))
                        .or_default()
                        .push((path, parsed.month().clone()));
                }
                None => {
                    warn!("Could not parse billing file name: {}", name);
                    skipped.push(name);
                }
            }
        }

        let accounts = groups.len();
        let mut files = Vec::new();
        for (group, members) in groups {
            let identity = self.identifier.resolve(group.name(), group.suffix());
            debug!(
                account = identity.display_name(),
                id = identity.account_id(),
                files = members.len(),
                "Resolved billing account"
            );
            for (path, month) in members {
                files.push(BillingFile::new(path, month, identity.clone()));
            }
        }
        files.sort_by(|a, b| a.path().cmp(b.path()));

        info!("Found {} billing files from {} accounts", files.len(), accounts);

        Ok(ScanResult { files, skipped })
    }

    /// Adds every project row of `file` to `totals` under the file's month.
    pub fn load_file(&self, file: &BillingFile, totals: &mut BillingTotals) -> BillingResult<FileOutcome> {
        let path = file.path();
        let handle = match File::open(path) {
            Ok(handle) => handle,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                warn!("Billing file does not exist: {}", path.display());
                return Ok(FileOutcome::Missing);
            }
            Err(e) => return Err(BillingError::io(path, e)),
        };

        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(handle);

        let headers = reader
            .headers()
            .map_err(|e| BillingError::csv(path, e))?
            .clone();
        let columns = ColumnIndex::from_headers(&headers);

        totals.observe_month(file.month());

        let mut rows = 0;
        let mut skipped_rows = 0;

        for (line_num, result) in reader.records().enumerate() {
            // 1-indexed plus the header row
            let line = line_num + 2;
            let record = match result {
                Ok(record) => record,
                Err(e) => {
                    warn!("Skipping unreadable line {} in {}: {}", line, path.display(), e);
                    skipped_rows += 1;
                    continue;
                }
            };

            let project_name = columns.field(&record, columns.project_name);
            if project_name.is_empty() {
                continue;
            }

            let raw_subtotal = [columns.subtotal, columns.unrounded_subtotal]
                .into_iter()
                .map(|idx| columns.field(&record, idx))
                .find(|value| !value.is_empty())
                .unwrap_or("");

            let Some(amount) = parse_amount(raw_subtotal) else {
                warn!(
                    "Skipping line {} in {}: invalid subtotal '{}'",
                    line,
                    path.display(),
                    raw_subtotal
                );
                skipped_rows += 1;
                continue;
            };

            let key = AggregationKey::new(
                file.account(),
                project_name.to_string(),
                columns.field(&record, columns.project_id).to_string(),
                columns.field(&record, columns.project_number).to_string(),
            );
            totals.add(key, file.month(), amount);
            rows += 1;
        }

        debug!(
            file = %path.display(),
            month = %file.month(),
            rows,
            skipped_rows,
            "Loaded billing file"
        );

        Ok(FileOutcome::Loaded { rows, skipped_rows })
    }

    /// Reads `files` into fresh totals, tallying per-file outcomes into
    /// `summary`. Files are always read in path order, so floating point
    /// sums come out identical whatever order they are passed in.
    pub fn load_files(
        &self,
        files: &[BillingFile],
        summary: &mut ConsolidationSummary,
    ) -> BillingTotals {
        let mut ordered: Vec<&BillingFile> = files.iter().collect();
        ordered.sort_by(|a, b| a.path().cmp(b.path()));

        let mut totals = BillingTotals::new();
        for file in ordered {
            match self.load_file(file, &mut totals) {
                Ok(FileOutcome::Loaded { skipped_rows, .. }) => {
                    summary.files_read += 1;
                    summary.rows_skipped += skipped_rows;
                }
                Ok(FileOutcome::Missing) => summary.files_missing += 1,
                Err(e) => {
                    warn!("Failed to load file {}: {}", file.path().display(), e);
                    summary.files_failed += 1;
                }
            }
        }
        totals
    }
}

impl Default for DataLoader {
    fn default() -> Self {
        Self::new()
    }
}

struct ColumnIndex {
    project_name: Option<usize>,
    project_id: Option<usize>,
    project_number: Option<usize>,
    subtotal: Option<usize>,
    unrounded_subtotal: Option<usize>,
}

impl ColumnIndex {
    fn from_headers(headers: &StringRecord) -> Self {
        let find = |name: &str| {
            headers
                .iter()
                .position(|h| h.trim_start_matches('\u{feff}').trim() == name)
        };

        Self {
            project_name: find(PROJECT_NAME_COLUMN),
            project_id: find(PROJECT_ID_COLUMN),
            project_number: find(PROJECT_NUMBER_COLUMN),
            subtotal: find(SUBTOTAL_COLUMN),
            unrounded_subtotal: find(UNROUNDED_SUBTOTAL_COLUMN),
        }
    }

    fn field<'r>(&self, record: &'r StringRecord, idx: Option<usize>) -> &'r str {
        idx.and_then(|i| record.get(i)).unwrap_or("").trim()
    }
}

/// Parses a subtotal cell. Empty cells count as zero; `.` is tried as the
/// decimal separator before `,`.
pub fn parse_amount(value: &str) -> Option<f64> {
    let value = value.trim();
    if value.is_empty() {
        return Some(0.0);
    }

    value
        .parse::<f64>()
        .ok()
        .or_else(|| value.replace(',', ".").parse::<f64>().ok())
}
