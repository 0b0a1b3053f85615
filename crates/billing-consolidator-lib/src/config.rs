use crate::error::{BillingError, BillingResult};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_INPUT_FOLDER: &str = "Files_report";
pub const DEFAULT_OUTPUT_FOLDER: &str = "Reports/Billing";
pub const DEFAULT_BASE_PATH: &str = ".";
pub const DEFAULT_CONFIG_FILE: &str = ".billing.json";

/// Cut-offs that keep tiny bases from producing misleading percentages and
/// projections. Amounts are in the export's currency (USD).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForecastThresholds {
    /// Previous-month amount above which a month-over-month percentage is
    /// computed.
    pub pct_base_floor: f64,
    pub min_subtotal_for_forecast: f64,
    /// Month-over-month growth assumed when only the latest month is
    /// above the forecast threshold.
    pub conservative_growth: f64,
}

impl Default for ForecastThresholds {
    fn default() -> Self {
        Self {
            pct_base_floor: 0.01,
            min_subtotal_for_forecast: 10.0,
            conservative_growth: 0.05,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReportConfig {
    input_folder: PathBuf,
    output_folder: PathBuf,
    base_path: PathBuf,
    thresholds: ForecastThresholds,
}

impl ReportConfig {
    pub fn new(input_folder: impl Into<PathBuf>) -> Self {
        Self {
            input_folder: input_folder.into(),
            ..Self::default()
        }
    }

    pub fn with_output_folder(mut self, output_folder: impl Into<PathBuf>) -> Self {
        self.output_folder = output_folder.into();
        self
    }

    pub fn with_base_path(mut self, base_path: impl Into<PathBuf>) -> Self {
        self.base_path = base_path.into();
        self
    }

    pub fn with_thresholds(mut self, thresholds: ForecastThresholds) -> Self {
        self.thresholds = thresholds;
        self
    }

    /// Applies the values present in a config file on top of this config.
    pub fn merge_file(mut self, file: &ConfigFile) -> Self {
        if let Some(output_folder) = &file.output_folder {
            self.output_folder = output_folder.clone();
        }
        if let Some(base_path) = &file.base_path {
            self.base_path = base_path.clone();
        }
        if let Some(thresholds) = file.thresholds {
            self.thresholds = thresholds;
        }
        self
    }

    pub fn input_folder(&self) -> &Path {
        &self.input_folder
    }

    pub fn output_folder(&self) -> &Path {
        &self.output_folder
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    pub fn thresholds(&self) -> &ForecastThresholds {
        &self.thresholds
    }

    pub fn output_dir(&self) -> PathBuf {
        self.base_path.join(&self.output_folder)
    }
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            input_folder: PathBuf::from(DEFAULT_INPUT_FOLDER),
            output_folder: PathBuf::from(DEFAULT_OUTPUT_FOLDER),
            base_path: PathBuf::from(DEFAULT_BASE_PATH),
            thresholds: ForecastThresholds::default(),
        }
    }
}

/// On-disk overrides, e.g. `.billing.json`:
///
/// ```json
/// { "output_folder": "Reports/Billing", "base_path": "~/console_gcp" }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigFile {
    pub output_folder: Option<PathBuf>,
    pub base_path: Option<PathBuf>,
    pub thresholds: Option<ForecastThresholds>,
}

impl ConfigFile {
    pub fn load<P: AsRef<Path>>(path: P) -> BillingResult<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| BillingError::io(path, e))?;

        serde_json::from_str(&content).map_err(|e| BillingError::Config {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Loads `path` if it exists, otherwise returns an empty override set.
    pub fn load_optional<P: AsRef<Path>>(path: P) -> BillingResult<Self> {
        let path = path.as_ref();
        if path.is_file() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }
}
