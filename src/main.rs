use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::Path;
use std::sync::Mutex;

use clap::Parser;
use color_eyre::Result;
use tracing_subscriber::EnvFilter;
use wk::cli::{self, Cli, Commands};
use wk::{Config, Profile, Workspace};

fn env_filter(verbose: u8) -> EnvFilter {
    let default_level = match verbose {
        0 => "wk=warn",
        1 => "wk=debug",
        _ => "wk=trace",
    };
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level))
}

/// Log to stderr for one-shot commands
fn init_stderr_logging(verbose: u8) {
    tracing_subscriber::fmt()
        .with_env_filter(env_filter(verbose))
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

/// Log to a file while the TUI owns the terminal
fn init_file_logging(verbose: u8, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let file = OpenOptions::new().create(true).append(true).open(path)?;
    tracing_subscriber::fmt()
        .with_env_filter(env_filter(verbose))
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .init();
    tracing::info!(path = %path.display(), "logging to file");
    Ok(())
}

fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();

    // --dev keeps a separate config and database
    let profile = if cli.dev { Profile::Dev } else { Profile::Prod };
    let config = match cli.config {
        Some(ref path) => Config::load_from_path(path)?,
        None => Config::load_with_profile(profile)?,
    };

    let command = cli.command.unwrap_or(Commands::Tui);
    if matches!(command, Commands::Tui) {
        init_file_logging(cli.verbose, &config.get_log_path())?;
    } else {
        init_stderr_logging(cli.verbose);
    }

    // Period math needs no storage
    if let Commands::Period { ref date } = command {
        cli::handle_period(date.as_deref(), &mut io::stdout())?;
        return Ok(());
    }

    let mut workspace = Workspace::open(config)?;
    let stdout = io::stdout();
    let mut out = stdout.lock();

    match command {
        Commands::Tui => {
            drop(out);
            let app = wk::tui::App::new(workspace);
            wk::tui::run_event_loop(app)?;
            return Ok(());
        }
        Commands::Log(args) => cli::handle_log(args, &mut workspace, &mut out)?,
        Commands::List { all, date } => cli::handle_list(all, date.as_deref(), &workspace, &mut out)?,
        Commands::Delete { id } => cli::handle_delete(&id, &mut workspace, &mut out)?,
        Commands::Polish { id } => cli::handle_polish(&id, &mut workspace, &mut out)?,
        Commands::Suggest { task } => cli::handle_suggest(&task, &workspace, &mut out)?,
        Commands::Period { .. } => {}
        Commands::Status { date } => cli::handle_status(date.as_deref(), &workspace, &mut out)?,
        Commands::Submit { date } => cli::handle_submit(date.as_deref(), &mut workspace, &mut out)?,
        Commands::History => cli::handle_history(&workspace, &mut out)?,
        Commands::Report {
            output,
            date,
            submission,
        } => cli::handle_report(output, date.as_deref(), submission.as_deref(), &workspace, &mut out)?,
    }

    out.flush()?;
    Ok(())
}
