//! CLI command definitions, routing, and tracing setup.

use std::io::Write;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, WrapErr, eyre};
use frbsync_core::extraction::decode_candidates;
use frbsync_core::pipeline::{PipelineSummary, ProgressReporter, sync_catalog};
use frbsync_shared::{AppConfig, MergeMode, SyncConfig, init_config, load_config};
use frbsync_storage::Catalog;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

use crate::report;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// frbsync — keep an FRB catalog in step with new announcements.
#[derive(Parser)]
#[command(
    name = "frbsync",
    version,
    about = "Merge extracted Fast Radio Burst localizations into a catalog without duplicates.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Catalog database (overrides config).
    #[arg(long, global = true)]
    pub catalog: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Check extracted candidates against the catalog and optionally add them.
    Ingest {
        /// Oracle output: a JSON array of candidates ("-" for stdin).
        #[arg(long)]
        candidates: String,

        /// Write new bursts to the catalog (overrides config).
        #[arg(long)]
        commit: bool,

        /// Report what would be added without writing (overrides config).
        #[arg(long, conflicts_with = "commit")]
        dry_run: bool,

        /// Match radius in arcseconds (overrides config).
        #[arg(long)]
        radius: Option<f64>,

        /// URL recorded as the reference for candidates lacking one.
        #[arg(long)]
        source_url: Option<String>,

        /// Save the run summary as JSON.
        #[arg(long)]
        json: Option<PathBuf>,

        /// Save a markdown report of accepted bursts.
        #[arg(long)]
        report: Option<PathBuf>,
    },

    /// Show catalog statistics.
    Stats,

    /// Export the catalog as CSV.
    Export {
        /// Destination CSV file.
        #[arg(short, long)]
        out: PathBuf,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "frbsync=info",
        1 => "frbsync=debug",
        _ => "frbsync=trace",
    };

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    let catalog = cli.catalog;
    match cli.command {
        Command::Ingest {
            candidates,
            commit,
            dry_run,
            radius,
            source_url,
            json,
            report,
        } => {
            let opts = IngestOptions {
                catalog,
                candidates,
                commit,
                dry_run,
                radius,
                source_url,
                json,
                report,
            };
            cmd_ingest(opts).await
        }
        Command::Stats => cmd_stats(catalog.as_deref()).await,
        Command::Export { out } => cmd_export(catalog.as_deref(), &out).await,
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init().await,
            ConfigAction::Show => cmd_config_show().await,
        },
    }
}

/// Resolve the catalog path: CLI flag, then config file.
fn catalog_path(flag: Option<&Path>, config: &AppConfig) -> PathBuf {
    flag.map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from(&config.catalog.path))
}

// ---------------------------------------------------------------------------
// ingest
// ---------------------------------------------------------------------------

struct IngestOptions {
    catalog: Option<PathBuf>,
    candidates: String,
    commit: bool,
    dry_run: bool,
    radius: Option<f64>,
    source_url: Option<String>,
    json: Option<PathBuf>,
    report: Option<PathBuf>,
}

async fn cmd_ingest(opts: IngestOptions) -> Result<()> {
    let config = load_config()?;

    let mut sync = SyncConfig::from(&config);
    sync.catalog_path = catalog_path(opts.catalog.as_deref(), &config);
    sync.mode = resolve_mode(sync.mode, opts.commit, opts.dry_run);
    if let Some(r) = opts.radius {
        if !r.is_finite() || r <= 0.0 {
            return Err(eyre!("--radius must be a positive number of arcseconds"));
        }
        sync.match_radius_arcsec = r;
    }

    let text = read_candidates(&opts.candidates)?;
    let decoded = decode_candidates(&text, opts.source_url.as_deref())?;

    info!(
        catalog = %sync.catalog_path.display(),
        mode = %sync.mode,
        candidates = decoded.len(),
        "ingesting candidates"
    );

    if decoded.is_empty() {
        println!("No candidates to check.");
        return Ok(());
    }

    let reporter = CliProgress::new();
    let summary = sync_catalog(&sync, decoded, &reporter).await?;

    println!();
    for outcome in &summary.outcomes {
        println!("  {}: {}", outcome.identifier, outcome.message);
    }
    println!();
    println!(
        "  {} accepted, {} duplicate(s), {} error(s) [{}] in {:.1}s",
        summary.accepted.len(),
        summary.duplicates,
        summary.errors,
        summary.mode,
        summary.elapsed.as_secs_f64()
    );
    println!();

    let markdown = report::render_markdown(&summary, &sync.catalog_path);
    match &opts.report {
        Some(path) => {
            std::fs::write(path, markdown)
                .wrap_err_with(|| format!("writing report to {}", path.display()))?;
            println!("Report saved to: {}", path.display());
        }
        None if !summary.accepted.is_empty() => println!("{markdown}"),
        None => {}
    }

    if let Some(path) = &opts.json {
        let json = serde_json::to_string_pretty(&summary)?;
        std::fs::write(path, json)
            .wrap_err_with(|| format!("writing JSON summary to {}", path.display()))?;
        println!("JSON summary saved to: {}", path.display());
    }

    if let Ok(output) = std::env::var("GITHUB_OUTPUT") {
        write_github_output(Path::new(&output), &summary)?;
    }

    Ok(())
}

/// Pick the run mode: an explicit flag wins over the configured default.
fn resolve_mode(configured: MergeMode, commit: bool, dry_run: bool) -> MergeMode {
    if dry_run {
        MergeMode::DryRun
    } else if commit {
        MergeMode::Commit
    } else {
        configured
    }
}

fn read_candidates(source: &str) -> Result<String> {
    if source == "-" {
        let mut buf = String::new();
        std::io::Read::read_to_string(&mut std::io::stdin(), &mut buf)
            .wrap_err("reading candidates from stdin")?;
        return Ok(buf);
    }
    std::fs::read_to_string(source).wrap_err_with(|| format!("reading candidates from {source}"))
}

/// Append step outputs for CI workflows.
fn write_github_output(path: &Path, summary: &PipelineSummary) -> Result<()> {
    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .wrap_err_with(|| format!("opening {}", path.display()))?;
    writeln!(file, "new_frbs_count={}", summary.accepted.len())?;
    writeln!(file, "new_frbs_names={}", summary.accepted_names().join(","))?;
    Ok(())
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::with_template("{spinner:.cyan} {msg}") {
            spinner.set_style(
                style.tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
            );
        }
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }
}

impl ProgressReporter for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn candidate_checked(&self, identifier: &str, message: &str, current: usize, total: usize) {
        self.spinner
            .set_message(format!("Checked [{current}/{total}] {identifier}: {message}"));
    }

    fn done(&self, _summary: &PipelineSummary) {
        self.spinner.finish_and_clear();
    }
}

// ---------------------------------------------------------------------------
// stats / export
// ---------------------------------------------------------------------------

async fn cmd_stats(catalog: Option<&Path>) -> Result<()> {
    let config = load_config()?;
    let path = catalog_path(catalog, &config);
    let catalog = Catalog::open_readonly(&path).await?;
    let stats = catalog.stats().await?;

    println!();
    println!("  Catalog:       {}", path.display());
    println!("  Total FRBs:    {}", stats.total);
    println!("  With redshift: {}", stats.with_redshift);
    if let (Some(lo), Some(hi)) = (stats.z_min, stats.z_max) {
        println!("  Redshift:      {lo:.4} - {hi:.4}");
    }
    if !stats.by_telescope.is_empty() {
        println!();
        println!("  By survey:");
        for (telescope, n) in &stats.by_telescope {
            println!("    {telescope}: {n}");
        }
    }
    println!();
    Ok(())
}

async fn cmd_export(catalog: Option<&Path>, out: &Path) -> Result<()> {
    let config = load_config()?;
    let path = catalog_path(catalog, &config);
    let catalog = Catalog::open_readonly(&path).await?;
    let n = catalog.export_csv(out).await?;
    println!("Exported {n} FRBs to {}", out.display());
    Ok(())
}

// ---------------------------------------------------------------------------
// config
// ---------------------------------------------------------------------------

async fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

async fn cmd_config_show() -> Result<()> {
    let config: AppConfig = load_config()?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_override_configured_mode() {
        assert_eq!(resolve_mode(MergeMode::Commit, false, true), MergeMode::DryRun);
        assert_eq!(resolve_mode(MergeMode::DryRun, true, false), MergeMode::Commit);
        assert_eq!(resolve_mode(MergeMode::Commit, false, false), MergeMode::Commit);
        assert_eq!(resolve_mode(MergeMode::DryRun, false, false), MergeMode::DryRun);
    }

    #[test]
    fn dry_run_and_commit_conflict() {
        let parsed = Cli::try_parse_from([
            "frbsync", "ingest", "--candidates", "-", "--commit", "--dry-run",
        ]);
        assert!(parsed.is_err());

        let cli = Cli::try_parse_from(["frbsync", "ingest", "--candidates", "-", "--dry-run"])
            .expect("parse");
        let Command::Ingest { dry_run, commit, .. } = cli.command else {
            panic!("expected ingest");
        };
        assert!(dry_run);
        assert!(!commit);
    }
}
