use anyhow::Result;
use clap::{Parser, Subcommand};
use depcheck::commands::{
    check_command, import_package_command, init_catalog_command, list_packages_command,
    resolve_soname_command, CheckOptions,
};
use tracing_subscriber::EnvFilter;

/// Dependency checker for binary packages.
///
/// This CLI is a thin wrapper around `depcheck-core` (exposed in code as
/// `depcheck_core`). The checks, the catalog and the reconciliation engine
/// all live in the library.
#[derive(Parser, Debug)]
#[command(
    name = "depcheck",
    version,
    about = "Check binary packages for missing and surplus dependencies",
    long_about = None
)]
struct Cli {
    /// Verbose logging and the full tag listing in reports.
    #[arg(long, global = true, default_value_t = false)]
    debug: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create the catalog database (or migrate an existing one).
    InitCatalog {
        /// Path to the SQLite catalog database.
        #[arg(long)]
        db: String,
    },

    /// Import package metadata documents into the catalog.
    ///
    /// Packages are stored under the scope from the config; re-importing a
    /// package replaces it.
    ImportPackage {
        #[arg(long)]
        db: String,

        /// Check config (JSON or YAML). Defaults are used when omitted.
        #[arg(long)]
        config: Option<String>,

        /// Package metadata files (JSON or YAML).
        #[arg(required = true)]
        metadata: Vec<String>,
    },

    /// List the packages in the catalog for the configured scope.
    ListPackages {
        #[arg(long)]
        db: String,

        #[arg(long)]
        config: Option<String>,

        /// Emit JSON instead of human-readable text.
        #[arg(long, default_value_t = false)]
        json: bool,
    },

    /// Show where a soname would be loaded from.
    ResolveSoname {
        #[arg(long)]
        db: String,

        #[arg(long)]
        config: Option<String>,

        #[arg(long)]
        soname: String,

        /// Runpath entries, in order. Repeat the flag for each entry.
        #[arg(long)]
        runpath: Vec<String>,
    },

    /// Run the checks over a package set and report dependency problems.
    Check {
        #[arg(long)]
        db: String,

        #[arg(long)]
        config: Option<String>,

        /// Overrides file, one `[pkgname:]tag[ info]` per line.
        #[arg(long)]
        overrides: Option<String>,

        /// Write the tag report here instead of stdout.
        #[arg(long)]
        output: Option<String>,

        /// Store the outcome in the catalog database.
        #[arg(long, default_value_t = false)]
        record: bool,

        /// Worker threads for individual checks; overrides the config.
        #[arg(long)]
        jobs: Option<usize>,

        /// Package metadata files (JSON or YAML).
        #[arg(required = true)]
        metadata: Vec<String>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.debug);

    match cli.command {
        Command::InitCatalog { db } => init_catalog_command(&db)?,
        Command::ImportPackage { db, config, metadata } => {
            import_package_command(&db, config.as_deref(), &metadata)?
        }
        Command::ListPackages { db, config, json } => {
            list_packages_command(&db, config.as_deref(), json)?
        }
        Command::ResolveSoname { db, config, soname, runpath } => {
            resolve_soname_command(&db, config.as_deref(), &soname, &runpath)?
        }
        Command::Check { db, config, overrides, output, record, jobs, metadata } => {
            check_command(&CheckOptions {
                db,
                config,
                overrides,
                output,
                record,
                jobs,
                debug: cli.debug,
                metadata,
            })?
        }
    }

    Ok(())
}

/// Logs go to stderr so reports on stdout stay clean. `RUST_LOG` wins.
fn init_logging(debug: bool) {
    let default = if debug { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
}
