// SPDX-License-Identifier: PMPL-1.0-or-later

//! nsguard: find and repair translation namespace mismatches
//!
//! Scans a source tree for namespace bindings and accessor calls, checks
//! every call against the primary locale, and applies fixes to locale
//! files and sources.

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use nsguard::config::Config;
use nsguard::diagnostics;
use nsguard::plan::SELECT_ALL;
use nsguard::report::{self, diff, ReportOutputFormat};
use nsguard::{ApplyOptions, Engine};
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "nsguard")]
#[command(version)]
#[command(about = "Translation namespace consistency checker and fixer")]
#[command(long_about = None)]
struct Cli {
    /// Config file (default: nsguard.yaml / .yml / .json in the working directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Directory holding <locale>.json files
    #[arg(long, global = true)]
    locales: Option<PathBuf>,

    /// Primary locale code
    #[arg(long, global = true)]
    primary: Option<String>,

    /// Source root to scan (repeatable)
    #[arg(long = "src", global = true)]
    src: Vec<PathBuf>,

    /// Debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan sources and locales and report issues
    Analyze {
        /// Save the report to a file
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Report format for --output (default: from extension)
        #[arg(short, long, value_enum)]
        format: Option<ReportOutputFormat>,

        /// Print counts only
        #[arg(short, long)]
        quiet: bool,
    },

    /// Apply fixes for selected issue and duplicate ids
    Fix {
        /// Issue or duplicate-group id (repeatable)
        #[arg(long = "select", value_name = "ID")]
        select: Vec<String>,

        /// Select every fixable entry
        #[arg(long)]
        all: bool,

        /// Take ids from a saved report instead of a fresh analysis
        #[arg(long, value_name = "REPORT")]
        from: Option<PathBuf>,

        /// Compute and print changes without writing anything
        #[arg(long)]
        dry_run: bool,
    },

    /// Copy keys missing from secondary locales from the primary locale
    Sync,

    /// Compare two saved analysis reports
    Diff {
        #[arg(value_name = "BASE")]
        base: PathBuf,

        #[arg(value_name = "COMPARE")]
        compare: PathBuf,
    },

    /// Check configuration and corpus layout
    Doctor,
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = if verbose {
        EnvFilter::new(default)
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Config from file (or defaults) with CLI overrides applied.
fn load_config(cli: &Cli) -> Result<(Config, String)> {
    let cwd = std::env::current_dir()?;
    let (config, origin) = match &cli.config {
        Some(path) => {
            let base = path.parent().unwrap_or(Path::new(".")).to_path_buf();
            (Config::load(path)?.rebase(&base), path.display().to_string())
        }
        None => {
            let origin = Config::find_default(&cwd)
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "defaults".to_string());
            (Config::discover(None, &cwd)?.rebase(&cwd), origin)
        }
    };

    let mut config = config;
    if let Some(locales) = &cli.locales {
        config.locales_dir = locales.clone();
    }
    if let Some(primary) = &cli.primary {
        config.primary_locale = primary.clone();
    }
    if !cli.src.is_empty() {
        config.source_roots = cli.src.clone();
    }
    Ok((config, origin))
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match &cli.command {
        Commands::Analyze {
            output,
            format,
            quiet,
        } => {
            let (config, _) = load_config(&cli)?;
            let engine = Engine::open(config)?;
            let result = engine.analyze()?;
            report::print_report(&result, *quiet);

            if let Some(path) = output {
                let format = format.unwrap_or_else(|| ReportOutputFormat::for_path(path));
                report::ReportFormatter::new().save(&result, path, format)?;
            }
        }

        Commands::Fix {
            select,
            all,
            from,
            dry_run,
        } => {
            let mut ids = select.clone();
            if *all {
                ids.push(SELECT_ALL.to_string());
            }
            if ids.is_empty() {
                bail!("nothing selected: pass --select ID or --all");
            }

            let (config, _) = load_config(&cli)?;
            let mut engine = Engine::open(config)?;
            let analysis = match from {
                Some(path) => {
                    info!(report = %path.display(), "using saved report");
                    diff::load_report(path)?
                }
                None => engine.analyze()?,
            };
            let result = engine.apply_fixes_with(
                &ids,
                &analysis,
                ApplyOptions { dry_run: *dry_run },
            )?;
            report::print_apply(&result);
        }

        Commands::Sync => {
            let (config, _) = load_config(&cli)?;
            let mut engine = Engine::open(config)?;
            let added = engine.store_mut().sync_missing();
            if added > 0 {
                let written = engine.store().save()?;
                println!("Copied {} missing keys into {} locale files", added, written.len());
            } else {
                println!("All locales already have every primary key");
            }
        }

        Commands::Diff { base, compare } => {
            let base_report = diff::load_report(base)?;
            let compare_report = diff::load_report(compare)?;
            let output = diff::format_diff(
                &base_report,
                &compare_report,
                &base.display().to_string(),
                &compare.display().to_string(),
            );
            println!("{}", output);
        }

        Commands::Doctor => {
            let (config, origin) = load_config(&cli)?;
            diagnostics::run_self_diagnostics(&config, &origin)?;
        }
    }

    Ok(())
}
