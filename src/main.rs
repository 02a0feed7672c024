// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Orderly: sort a directory tree by type and owner, with text analytics

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use orderly::config::AppConfig;
use orderly::db::{Database, MemoryStore, SessionStore};
use orderly::export::{export_csv, AnalyticsSummary};
use orderly::models::{ProcessingSession, RunReport};
use orderly::{OrderlyError, OrganizerEngine, Result};

/// Orderly CLI - file organizer and text analytics
#[derive(Parser, Debug)]
#[command(name = "orderly")]
#[command(author = "Jonathan D. A. Jewell <hyperpolymath>")]
#[command(version)]
#[command(about = "Sort files into type and owner folders and summarize their text", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Path to configuration file (JSON format)
    #[arg(short, long, default_value = "orderly.json", global = true)]
    config: PathBuf,

    /// Database file (overrides config)
    #[arg(long, global = true)]
    database: Option<PathBuf>,

    /// Enable verbose logging (debug level)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Enable trace logging (most verbose)
    #[arg(long, global = true)]
    trace: bool,

    /// Output format for results
    #[arg(long, global = true, default_value = "text", value_parser = ["text", "json"])]
    format: String,

    /// Suppress non-essential output (quiet mode)
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Organize a directory into {bucket}/{owner}/ folders
    Organize {
        /// Directory to organize
        input: PathBuf,

        /// Output directory (default: `output` next to the input)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Keep records in memory only
        #[arg(long)]
        no_db: bool,
    },

    /// Inspect past runs
    Sessions {
        #[command(subcommand)]
        action: SessionCommands,
    },

    /// List recorded files
    Files {
        /// Only files from this session
        #[arg(short, long)]
        session: Option<String>,

        /// Maximum number to show
        #[arg(short, long, default_value = "50")]
        limit: usize,
    },

    /// Export file records to CSV
    Export {
        /// Output file
        output: PathBuf,

        /// Only files from this session
        #[arg(short, long)]
        session: Option<String>,
    },

    /// Show aggregate analytics
    Stats {
        /// Only files from this session
        #[arg(short, long)]
        session: Option<String>,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigCommands,
    },
}

#[derive(Subcommand, Debug)]
enum SessionCommands {
    /// List sessions, newest first
    List {
        /// Number of sessions to show
        #[arg(short = 'n', long, default_value = "10")]
        count: usize,
    },

    /// Show one session in detail
    Show {
        /// Session id
        id: String,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigCommands {
    /// Show current configuration
    Show,

    /// Generate default configuration file
    Generate {
        /// Output file path
        #[arg(short, long, default_value = "orderly.json")]
        output: PathBuf,
    },

    /// Validate configuration file
    Validate,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.trace {
        "trace"
    } else if cli.verbose {
        "debug"
    } else if cli.quiet {
        "warn"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let mut config = AppConfig::load(&cli.config)?;
    if let Some(ref db) = cli.database {
        config.database.path = db.to_string_lossy().to_string();
    }

    match cli.command {
        Commands::Organize { input, output, no_db } => {
            let output = output.unwrap_or_else(|| default_output(&input));
            run_organize(&config, &input, &output, no_db, &cli.format)
        }
        Commands::Sessions { action } => run_sessions_command(&config, action, &cli.format),
        Commands::Files { session, limit } => run_files(&config, session.as_deref(), limit, &cli.format),
        Commands::Export { output, session } => run_export(&config, &output, session.as_deref()),
        Commands::Stats { session } => run_stats(&config, session.as_deref(), &cli.format),
        Commands::Config { action } => run_config_command(&config, action, &cli.config),
    }
}

/// `output` beside the input directory
fn default_output(input: &Path) -> PathBuf {
    input
        .parent()
        .map(|p| p.join("output"))
        .unwrap_or_else(|| PathBuf::from("output"))
}

fn run_organize(config: &AppConfig, input: &Path, output: &Path, no_db: bool, format: &str) -> Result<()> {
    let report = if no_db {
        warn!("No database: records are kept for this run only");
        OrganizerEngine::new(config, MemoryStore::new()).organize(input, output)?
    } else {
        let db = Database::open(&config.database.path)?;
        info!("Database: {}", config.database.path);
        OrganizerEngine::new(config, db).organize(input, output)?
    };

    print_report(&report, format)
}

fn print_report(report: &RunReport, format: &str) -> Result<()> {
    if format == "json" {
        println!("{}", serde_json::to_string_pretty(report)?);
        return Ok(());
    }

    let session = &report.session;
    println!("Session {}", session.session_id);
    println!("  Organized: {}", session.total_files_processed);
    println!("  Duplicates renamed: {}", report.duplicates());
    println!("  Skipped: {}", session.files_skipped);
    println!("  Duration: {:.2}s", session.duration().num_milliseconds() as f64 / 1000.0);

    if !session.files_by_type.is_empty() {
        println!("\nBy type:");
        for (bucket, count) in &session.files_by_type {
            println!("  {}: {}", bucket, count);
        }
    }
    if !session.files_by_owner.is_empty() {
        println!("\nBy owner:");
        for (owner, count) in &session.files_by_owner {
            println!("  {}: {}", owner, count);
        }
    }
    if !report.failures.is_empty() {
        println!("\nFailures:");
        for failure in &report.failures {
            println!("  {}: {}", failure.path.display(), failure.reason);
        }
    }
    Ok(())
}

fn run_sessions_command(config: &AppConfig, action: SessionCommands, format: &str) -> Result<()> {
    let db = Database::open(&config.database.path)?;

    match action {
        SessionCommands::List { count } => {
            let sessions: Vec<ProcessingSession> = db.list_sessions()?.into_iter().take(count).collect();
            if format == "json" {
                println!("{}", serde_json::to_string_pretty(&sessions)?);
                return Ok(());
            }
            println!("Sessions ({}):", sessions.len());
            for s in sessions {
                println!(
                    "  {} {} [{}] {} files, {} failed  {}",
                    s.session_id,
                    s.started_at.format("%Y-%m-%d %H:%M"),
                    s.status,
                    s.total_files_processed,
                    s.failures.len(),
                    s.input_directory.display()
                );
            }
        }
        SessionCommands::Show { id } => {
            let session = db
                .get_session(&id)?
                .ok_or_else(|| OrderlyError::SessionNotFound(id.clone()))?;
            if format == "json" {
                println!("{}", serde_json::to_string_pretty(&session)?);
                return Ok(());
            }
            println!("Session {}", session.session_id);
            println!("  Status: {}", session.status);
            println!("  Input: {}", session.input_directory.display());
            println!("  Output: {}", session.output_directory.display());
            println!("  Started: {}", session.started_at.format("%Y-%m-%d %H:%M:%S"));
            if let Some(done) = session.completed_at {
                println!("  Completed: {}", done.format("%Y-%m-%d %H:%M:%S"));
            }
            if let Some(ref message) = session.error_message {
                println!("  Error: {}", message);
            }
            println!("  Organized: {}", session.total_files_processed);
            println!("  Skipped: {}", session.files_skipped);
            for failure in &session.failures {
                println!("    {}: {}", failure.path.display(), failure.reason);
            }
        }
    }

    Ok(())
}

fn run_files(config: &AppConfig, session: Option<&str>, limit: usize, format: &str) -> Result<()> {
    let db = Database::open(&config.database.path)?;
    let files: Vec<_> = db.list_files(session)?.into_iter().take(limit).collect();

    if format == "json" {
        println!("{}", serde_json::to_string_pretty(&files)?);
        return Ok(());
    }

    println!("Files ({}):", files.len());
    for file in files {
        println!("  {} -> {}", file.original_path.display(), file.new_path.display());
        if let Some(ref keywords) = file.keywords {
            if !keywords.is_empty() {
                println!("      keywords: {}", keywords.join(", "));
            }
        }
        if let Some(ref reason) = file.analysis_error {
            println!("      analysis failed: {}", reason);
        }
    }
    Ok(())
}

fn run_export(config: &AppConfig, output: &Path, session: Option<&str>) -> Result<()> {
    let db = Database::open(&config.database.path)?;
    let files = db.list_files(session)?;
    let count = export_csv(output, &files)?;
    println!("Exported {} files to {:?}", count, output);
    Ok(())
}

fn run_stats(config: &AppConfig, session: Option<&str>, format: &str) -> Result<()> {
    let db = Database::open(&config.database.path)?;
    let summary = AnalyticsSummary::from_files(&db.list_files(session)?);

    if format == "json" {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    let stats = db.get_stats()?;
    println!("Analytics:");
    println!("  Sessions: {} ({} never finished)", stats.session_count, stats.orphaned_sessions);
    println!("  Files: {}", summary.total_files);
    println!("  Total size: {:.2} MB", summary.total_size_mb);
    println!("  With text analysis: {}", summary.text_analyzed);
    println!("  Duplicates renamed: {}", summary.duplicates);

    println!("\nBy type:");
    for (file_type, count) in &summary.by_type {
        let label = if file_type.is_empty() { "(none)" } else { file_type.as_str() };
        println!("  {}: {}", label, count);
    }
    println!("\nBy owner:");
    for (owner, count) in &summary.by_owner {
        println!("  {}: {}", owner, count);
    }
    Ok(())
}

fn run_config_command(config: &AppConfig, action: ConfigCommands, config_path: &Path) -> Result<()> {
    match action {
        ConfigCommands::Show => {
            println!("{}", serde_json::to_string_pretty(config)?);
        }
        ConfigCommands::Generate { output } => {
            AppConfig::default().save(&output)?;
            println!("Generated config at {:?}", output);
        }
        ConfigCommands::Validate => {
            config.validate()?;
            println!("Configuration at {:?} is valid", config_path);
            println!("  Known owners: {:?}", config.owners.known);
            println!("  Text buckets: {}", config.classify.extractors.len());
            println!("  Database: {}", config.database.path);
        }
    }

    Ok(())
}
