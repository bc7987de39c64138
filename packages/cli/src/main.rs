mod commands;
mod config;
mod site;

use clap::{Parser, Subcommand};
use colored::Colorize;
use commands::{apply, assign_ids, init, lint, ApplyArgs, AssignIdsArgs, InitArgs, LintArgs};
use tracing_subscriber::EnvFilter;

/// Folio CLI - in-place content overrides for static sites
#[derive(Parser, Debug)]
#[command(name = "folio")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Log at debug level (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Initialize a new Folio site
    Init(InitArgs),

    /// Render stored overrides and section order into static pages
    Apply(ApplyArgs),

    /// Attach persistent ids to editable elements
    AssignIds(AssignIdsArgs),

    /// Check pages for missing or duplicate ids and stale overrides
    Lint(LintArgs),
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let cwd = std::env::current_dir()?.display().to_string();

    match cli.command {
        Command::Init(args) => init(args, &cwd),
        Command::Apply(args) => apply(args, &cwd),
        Command::AssignIds(args) => assign_ids(args, &cwd),
        Command::Lint(args) => lint(args, &cwd, cli.verbose),
    }
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(err) = run(cli) {
        eprintln!();
        eprintln!("{} {:#}", "Error:".red().bold(), err);
        eprintln!();
        std::process::exit(1);
    }
}
