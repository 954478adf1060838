//! CLI administration tool for expiring-shortener.
//!
//! Inspects mappings, triggers an expiry sweep by hand, and performs database
//! checks without going through the HTTP API.
//!
//! # Usage
//!
//! ```bash
//! # Delete expired mappings now
//! cargo run --bin admin -- sweep
//!
//! # Show a mapping
//! cargo run --bin admin -- lookup aZ3k_x9Q
//!
//! # View statistics
//! cargo run --bin admin -- stats
//!
//! # Check database connection
//! cargo run --bin admin -- db check
//! ```
//!
//! # Environment Variables
//!
//! - `DATABASE_URL` (required): PostgreSQL connection string

use expiring_shortener::domain::clock::{Clock, SystemClock};
use expiring_shortener::domain::expiry_sweeper::ExpirySweeper;
use expiring_shortener::domain::repositories::MappingRepository;
use expiring_shortener::infrastructure::persistence::PgMappingRepository;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::*;
use dialoguer::Confirm;
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;

/// Upper bound for a manual sweep.
const SWEEP_TIMEOUT: Duration = Duration::from_secs(60);

/// CLI tool for managing expiring-shortener.
#[derive(Parser)]
#[command(name = "admin")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Top-level command groups.
#[derive(Subcommand)]
enum Commands {
    /// Delete expired mappings now
    Sweep {
        /// Skip confirmation prompt
        #[arg(short = 'y', long)]
        yes: bool,
    },

    /// Show a mapping by short code
    Lookup {
        /// Short code or custom alias
        code: String,
    },

    /// Show statistics
    Stats,

    /// Database operations
    Db {
        #[command(subcommand)]
        action: DbAction,
    },
}

/// Database operation subcommands.
#[derive(Subcommand)]
enum DbAction {
    /// Check database connection
    Check,

    /// Show database info
    Info,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL must be set")?;

    let pool = PgPool::connect(&database_url)
        .await
        .context("Failed to connect to database")?;

    match cli.command {
        Commands::Sweep { yes } => sweep(&pool, yes).await?,
        Commands::Lookup { code } => lookup(&pool, &code).await?,
        Commands::Stats => handle_stats(&pool).await?,
        Commands::Db { action } => handle_db_action(action, &pool).await?,
    }

    Ok(())
}

/// Runs one expiry sweep against the database.
///
/// Shows how many mappings are past their expiry and asks for confirmation
/// (unless `--yes`) before deleting them.
async fn sweep(pool: &PgPool, skip_confirm: bool) -> Result<()> {
    println!("{}", "🧹 Expiry Sweep".bright_blue().bold());
    println!();

    let expired: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM url_mappings WHERE expires_at < NOW()")
            .fetch_one(pool)
            .await?;

    if expired == 0 {
        println!("{}", "✅ Nothing to sweep".green());
        return Ok(());
    }

    println!(
        "  Expired mappings: {}",
        expired.to_string().bright_yellow().bold()
    );
    println!();

    if !skip_confirm {
        let confirmed = Confirm::new()
            .with_prompt("Delete them now?")
            .default(false)
            .interact()?;

        if !confirmed {
            println!("{}", "❌ Cancelled".red());
            return Ok(());
        }
    }

    let repository: Arc<dyn MappingRepository> =
        Arc::new(PgMappingRepository::new(Arc::new(pool.clone())));
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    let deleted = ExpirySweeper::new(repository, clock, SWEEP_TIMEOUT)
        .sweep_once()
        .await
        .map_err(|e| anyhow::anyhow!("Sweep failed: {}", e))?;

    println!();
    println!(
        "{} {}",
        "✅ Deleted".green().bold(),
        format!("{deleted} mappings").bright_white()
    );
    println!();

    Ok(())
}

/// Prints a single mapping and whether it still redirects.
async fn lookup(pool: &PgPool, code: &str) -> Result<()> {
    let repository = PgMappingRepository::new(Arc::new(pool.clone()));

    let mapping = repository
        .find(code)
        .await
        .map_err(|e| anyhow::anyhow!("Database error: {}", e))?
        .context("Mapping not found")?;

    let status = if mapping.is_live_at(SystemClock.now()) {
        "LIVE".green()
    } else {
        "EXPIRED".red()
    };

    println!("{}", "🔗 Mapping".bright_blue().bold());
    println!();
    println!("  Code:     {}", mapping.code.cyan());
    println!("  Long URL: {}", mapping.long_url.bright_white());
    println!(
        "  Created:  {}",
        mapping
            .created_at
            .format("%Y-%m-%d %H:%M:%S")
            .to_string()
            .bright_black()
    );
    println!(
        "  Expires:  {}",
        mapping
            .expires_at
            .map(|e| e.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_else(|| "never".to_string())
            .bright_black()
    );
    println!("  Status:   {}", status);
    println!();

    Ok(())
}

/// Displays mapping counts.
///
/// Shows:
/// - Total number of mappings
/// - Mappings past their expiry, awaiting the next sweep
/// - Mappings without an expiry
async fn handle_stats(pool: &PgPool) -> Result<()> {
    println!("{}", "📊 Statistics".bright_blue().bold());
    println!();

    let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM url_mappings")
        .fetch_one(pool)
        .await?;

    let expired: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM url_mappings WHERE expires_at < NOW()")
            .fetch_one(pool)
            .await?;

    let permanent: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM url_mappings WHERE expires_at IS NULL")
            .fetch_one(pool)
            .await?;

    println!(
        "  Mappings:      {}",
        total.to_string().bright_green().bold()
    );
    println!(
        "  Expired:       {}",
        expired.to_string().bright_yellow().bold()
    );
    println!(
        "  No expiry:     {}",
        permanent.to_string().bright_green().bold()
    );
    println!();

    Ok(())
}

/// Handles database diagnostic commands.
async fn handle_db_action(action: DbAction, pool: &PgPool) -> Result<()> {
    match action {
        DbAction::Check => {
            println!("{}", "🔍 Checking database connection...".bright_blue());

            sqlx::query("SELECT 1").fetch_one(pool).await?;

            println!("{}", "✅ Database connection OK".green().bold());
        }
        DbAction::Info => {
            println!("{}", "ℹ️  Database Information".bright_blue().bold());
            println!();

            let version: String = sqlx::query_scalar("SELECT version()")
                .fetch_one(pool)
                .await?;

            println!("  PostgreSQL: {}", version.bright_white());
            println!();
        }
    }

    Ok(())
}
