use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

use open_dancing::{CheckRun, Policy, PlaylistReport, RunConfig, VERSION};

/// Check a dance-evening playlist against the dance ordering policy
#[derive(Parser, Debug)]
#[command(name = "open-dancing", version, about, long_about = None)]
struct Cli {
    /// More log output on stderr (-v info, -vv debug). RUST_LOG wins when unset.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Resolve dances, validate the order, write the report CSV
    Check(CheckArgs),

    /// Print the ordering policy
    Policy {
        /// Policy JSON (built-in policy otherwise)
        #[arg(long)]
        policy: Option<PathBuf>,
    },

    /// Run the check and browse the result in the terminal
    Browse(CheckArgs),
}

#[derive(Args, Debug, Default)]
struct CheckArgs {
    /// Run configuration (TOML)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Playlist export CSV
    #[arg(long)]
    playlist: Option<PathBuf>,

    /// Markdown dance notes
    #[arg(long)]
    notes: Option<PathBuf>,

    /// Policy JSON
    #[arg(long)]
    policy: Option<PathBuf>,

    /// Report CSV to write
    #[arg(long)]
    output: Option<PathBuf>,

    /// Exit with status 2 when there are violations or tracks without a dance
    #[arg(long)]
    strict: bool,
}

impl CheckArgs {
    /// Config file (or defaults) with the command-line overrides applied
    fn run_config(&self) -> Result<RunConfig> {
        let mut config = match &self.config {
            Some(path) => RunConfig::from_file(path)?,
            None => RunConfig::default(),
        };

        if let Some(playlist) = &self.playlist {
            config.playlist = playlist.clone();
        }
        if let Some(notes) = &self.notes {
            config.notes = notes.clone();
        }
        if let Some(policy) = &self.policy {
            config.policy = Some(policy.clone());
        }
        if let Some(output) = &self.output {
            config.output = output.clone();
        }

        Ok(config)
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match &cli.command {
        Commands::Check(args) => run_check(args),
        Commands::Policy { policy } => run_policy(policy.as_ref()).map(|_| ExitCode::SUCCESS),
        Commands::Browse(args) => run_browse(args),
    };

    match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!("❌ {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(verbose: u8) {
    let filter = match verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("info"),
        _ => EnvFilter::new("debug"),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn run_check(args: &CheckArgs) -> Result<ExitCode> {
    println!("💃 Open Dancing v{} - Playlist Check", VERSION);
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    let config = args.run_config()?;
    println!("\n📂 Playlist: {}", config.playlist.display());
    println!("📝 Notes:    {}", config.notes.display());

    let run = CheckRun::new(config);
    let report = run.execute()?;

    println!();
    print_report(&report);

    println!("\n━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("💾 Report written to {}", run.config().output.display());

    if report.has_findings() {
        println!("⚠️  Playlist needs attention");
        if args.strict {
            return Ok(ExitCode::from(2));
        }
    } else {
        println!("🎉 Playlist follows the policy!");
    }

    Ok(ExitCode::SUCCESS)
}

fn print_report(report: &PlaylistReport) {
    for line in report.summary_lines() {
        println!("{}", line);
    }
}

fn run_policy(path: Option<&PathBuf>) -> Result<()> {
    let policy = match path {
        Some(path) => Policy::from_file(path)?,
        None => Policy::builtin()?,
    };

    println!("🧭 Policy: {}", policy.name);
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("Anchor (opens each block): {}", policy.anchor);
    println!("Fingerprint: {}", policy.fingerprint()?);

    println!("\nTransitions ({} edges):", policy.transitions.edge_count());
    for category in policy.transitions.categories() {
        let successors: Vec<&str> = policy
            .transitions
            .successors(category)
            .map(|s| s.iter().map(String::as_str).collect())
            .unwrap_or_default();
        println!("  {:<16} → {}", category, successors.join(", "));
    }

    if !policy.frequency.is_empty() {
        println!("\nFrequency rules:");
        for (category, rule) in &policy.frequency {
            println!("  {:<16} {}", category, rule.describe());
        }
    }

    Ok(())
}

#[cfg(feature = "tui")]
fn run_browse(args: &CheckArgs) -> Result<ExitCode> {
    println!("🖥️  Loading Open Dancing report browser...\n");

    let run = CheckRun::new(args.run_config()?);
    let report = run.evaluate()?;

    println!("✓ Checked {} tracks\n", report.rows.len());
    println!("Starting UI... (Press 'q' to quit)\n");

    let mut app = open_dancing::ui::App::new(report);
    open_dancing::ui::run_ui(&mut app)?;

    println!("\n✅ UI closed successfully");

    Ok(ExitCode::SUCCESS)
}

#[cfg(not(feature = "tui"))]
fn run_browse(_args: &CheckArgs) -> Result<ExitCode> {
    eprintln!("❌ TUI mode not available!");
    eprintln!("   Rebuild with: cargo build --features tui");
    eprintln!("   Or use: open-dancing check");
    Ok(ExitCode::FAILURE)
}
