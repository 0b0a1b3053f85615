use anyhow::{Context, Result};
use billing_consolidator_core::config::{DEFAULT_BASE_PATH, DEFAULT_CONFIG_FILE, DEFAULT_OUTPUT_FOLDER};
use billing_consolidator_core::prelude::*;
use billing_consolidator_core::ConfigFile;
use clap::Parser;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[clap(
    version,
    about = "Combines monthly GCP billing CSV exports into one consolidated report"
)]
struct Args {
    /// Directory holding the `<Account>_Reports, <period>.csv` exports
    #[arg(short = 'f', long = "folder")]
    folder: String,

    /// Output directory, relative to the base path [default: Reports/Billing]
    #[arg(long = "output-folder")]
    output_folder: Option<String>,

    /// Base directory the output folder is resolved against [default: .]
    #[arg(long = "base-path")]
    base_path: Option<String>,

    /// JSON config file with output and threshold overrides [default: .billing.json if present]
    #[arg(short = 'c', long = "config")]
    config: Option<String>,

    /// More output; repeat for debug (-v) or trace (-vv)
    #[arg(short = 'v', action = clap::ArgAction::Count)]
    verbose: u8,

    /// Only print warnings and errors
    #[arg(short = 'q', long = "quiet", conflicts_with = "verbose")]
    quiet: bool,
}

fn init_tracing(verbose: u8, quiet: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let level = match (quiet, verbose) {
        (true, _) => "warn",
        (false, 0) => "info",
        (false, 1) => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    fmt()
        .with_env_filter(filter)
        .with_target(verbose > 1)
        .with_writer(std::io::stdout)
        .init();
}

fn expand_path(path: &Path) -> PathBuf {
    let raw = path.to_string_lossy();
    PathBuf::from(shellexpand::tilde(raw.as_ref()).as_ref())
}

fn load_config_file(explicit: Option<&str>) -> Result<ConfigFile> {
    match explicit {
        Some(path) => {
            let path = expand_path(Path::new(path));
            ConfigFile::load(&path)
                .with_context(|| format!("Failed to load config file: {}", path.display()))
        }
        None => ConfigFile::load_optional(DEFAULT_CONFIG_FILE)
            .with_context(|| format!("Failed to load config file: {}", DEFAULT_CONFIG_FILE)),
    }
}

/// Defaults, then the config file, then command-line flags.
fn build_config(args: &Args, file: &ConfigFile) -> ReportConfig {
    let mut config = ReportConfig::new(expand_path(Path::new(&args.folder))).merge_file(file);

    if let Some(output_folder) = &args.output_folder {
        config = config.with_output_folder(output_folder);
    }
    if let Some(base_path) = &args.base_path {
        config = config.with_base_path(base_path);
    }

    let base_path = expand_path(config.base_path());
    config.with_base_path(base_path)
}

fn skipped_inputs(summary: &ConsolidationSummary) -> Option<String> {
    let counts = [
        (summary.names_skipped, "unparseable file names"),
        (summary.files_missing, "missing files"),
        (summary.files_failed, "unreadable files"),
        (summary.rows_skipped, "invalid rows"),
    ];
    let parts: Vec<String> = counts
        .iter()
        .filter(|(count, _)| *count > 0)
        .map(|(count, label)| format!("{} {}", count, label))
        .collect();

    if parts.is_empty() {
        None
    } else {
        Some(format!("Skipped {}", parts.join(", ")))
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose, args.quiet);

    let file = load_config_file(args.config.as_deref())?;
    let config = build_config(&args, &file);

    info!(
        "Scanning {} (output: {})",
        config.input_folder().display(),
        config.output_dir().display()
    );

    let consolidator = BillingConsolidator::new(config);
    let outcome = consolidator
        .run()
        .context("Billing consolidation failed")?;

    match outcome {
        ConsolidationOutcome::NoFiles => {
            info!("No billing files found to process");
        }
        ConsolidationOutcome::NoData(summary) => {
            info!(
                "No project data found in {} billing files",
                summary.files_read
            );
        }
        ConsolidationOutcome::Written { path, summary } => {
            if let Some(message) = skipped_inputs(&summary) {
                warn!("{}", message);
            }
            let absolute = std::fs::canonicalize(&path).unwrap_or(path);
            println!("Combined report written: {}", absolute.display());
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_folder_is_required() {
        assert!(Args::try_parse_from(["billing-consolidator"]).is_err());
    }

    #[test]
    fn test_defaults_without_flags() {
        let args = Args::try_parse_from(["billing-consolidator", "-f", "exports"]).unwrap();
        let config = build_config(&args, &ConfigFile::default());

        assert_eq!(config.input_folder(), Path::new("exports"));
        assert_eq!(
            config.output_dir(),
            Path::new(DEFAULT_BASE_PATH).join(DEFAULT_OUTPUT_FOLDER)
        );
        assert_eq!(args.verbose, 0);
        assert!(!args.quiet);
    }

    #[test]
    fn test_flags_override_config_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file
            .write_all(br#"{"output_folder": "from-file", "base_path": "/srv/file"}"#)
            .unwrap();
        let file = ConfigFile::load(temp_file.path()).unwrap();

        let args = Args::try_parse_from([
            "billing-consolidator",
            "--folder",
            "exports",
            "--base-path",
            "/srv/cli",
            "-vv",
        ])
        .unwrap();
        let config = build_config(&args, &file);

        assert_eq!(config.output_dir(), Path::new("/srv/cli/from-file"));
        assert_eq!(args.verbose, 2);
    }

    #[test]
    fn test_tilde_is_expanded() {
        let args = Args::try_parse_from([
            "billing-consolidator",
            "-f",
            "exports",
            "--base-path",
            "~/billing",
        ])
        .unwrap();
        let config = build_config(&args, &ConfigFile::default());

        let expected = shellexpand::tilde("~/billing").to_string();
        assert_eq!(config.base_path(), Path::new(&expected));
    }

    #[test]
    fn test_skipped_inputs_separates_missing_from_unreadable() {
        assert_eq!(skipped_inputs(&ConsolidationSummary::default()), None);

        let summary = ConsolidationSummary {
            files_failed: 2,
            rows_skipped: 1,
            ..ConsolidationSummary::default()
        };
        assert_eq!(
            skipped_inputs(&summary).as_deref(),
            Some("Skipped 2 unreadable files, 1 invalid rows")
        );
    }

    #[test]
    fn test_missing_explicit_config_is_an_error() {
        assert!(load_config_file(Some("/definitely/not/here.json")).is_err());
    }
}
