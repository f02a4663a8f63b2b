use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use depcheck_core::checks::default_check_registry;
use depcheck_core::services::{CheckOutcome, CheckRunner};
use depcheck_core::tags::parse_overrides;
use tracing::info;

use crate::commands::{load_config, load_metadata_files, open_catalog};
use crate::metadata_fingerprint;

/// Arguments of `depcheck check`.
#[derive(Debug, Clone, Default)]
pub struct CheckOptions {
    pub db: String,
    pub config: Option<String>,
    pub overrides: Option<String>,
    /// Tag file to write; the tag report goes to stdout when absent.
    pub output: Option<String>,
    pub record: bool,
    pub jobs: Option<usize>,
    pub debug: bool,
    pub metadata: Vec<String>,
}

/// Run the checks and reconcile dependencies, returning the outcome.
pub fn run_check(opts: &CheckOptions) -> Result<CheckOutcome> {
    let mut config = load_config(opts.config.as_deref())?;
    if let Some(jobs) = opts.jobs {
        config.jobs = jobs;
    }
    let (paths, packages) = load_metadata_files(&opts.metadata)?;
    let catalog = open_catalog(&opts.db)?;
    let registry = default_check_registry(&config).context("Invalid check configuration")?;

    let overrides = match &opts.overrides {
        Some(path) => {
            let body = fs::read_to_string(path)
                .with_context(|| format!("Failed to read overrides file at {path}"))?;
            parse_overrides(&body)
        }
        None => Vec::new(),
    };

    let scope = config.scope.clone();
    let outcome = CheckRunner::new(&catalog, registry, config)
        .with_overrides(overrides)
        .run(packages)
        .context("Check run failed")?;

    if opts.record {
        let fingerprint = metadata_fingerprint(&paths)?;
        let run_id = catalog
            .record_check_run(&outcome, &scope, Some(&fingerprint))
            .context("Failed to record check run")?;
        info!(run_id, %fingerprint, "recorded check run");
    }
    Ok(outcome)
}

/// `depcheck check`: print the screen report and write the tag report.
///
/// Finding tags is not a failure; the tag report is the product.
pub fn check_command(opts: &CheckOptions) -> Result<()> {
    let outcome = run_check(opts)?;
    print!("{}", outcome.screen_report(opts.debug));

    let report = outcome.tag_report();
    match &opts.output {
        Some(path) => {
            let path = PathBuf::from(path);
            fs::write(&path, &report)
                .with_context(|| format!("Failed to write tag file at {}", path.display()))?;
            println!("Tag report written to {}", path.display());
        }
        None => print!("{report}"),
    }
    Ok(())
}
