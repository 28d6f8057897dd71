//! CLI administration tool for smartlink.
//!
//! Manages API tokens, prints A/B test reports and checks the database without
//! going through the HTTP API.
//!
//! # Usage
//!
//! ```bash
//! # Create a new API token
//! cargo run --bin admin -- token create
//!
//! # List all tokens
//! cargo run --bin admin -- token list
//!
//! # Revoke a token by name or ID
//! cargo run --bin admin -- token revoke "Production API"
//!
//! # Report on the live A/B test of a link
//! cargo run --bin admin -- experiment report promo
//!
//! # Overall counts
//! cargo run --bin admin -- stats
//!
//! # Check database connection
//! cargo run --bin admin -- db check
//! ```
//!
//! # Environment Variables
//!
//! Reads the same configuration as the server (see [`smartlink::config`]). Token
//! hashes are keyed with `TOKEN_SIGNING_SECRET`, so it must match the server's.

use smartlink::application::services::{ExperimentReport, ExperimentService, hash_token};
use smartlink::config::{self, Config};
use smartlink::domain::repositories::{ApiToken, TokenRepository};
use smartlink::infrastructure::persistence::{
    PgExperimentRepository, PgLinkRepository, PgTokenRepository,
};
use smartlink::utils::clock::SystemClock;

use anyhow::{Context, Result};
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use clap::{Parser, Subcommand};
use colored::*;
use dialoguer::{Confirm, Input};
use sqlx::PgPool;
use std::sync::Arc;

/// Random bytes per generated token (256 bits).
const TOKEN_BYTES: usize = 32;

/// CLI tool for managing smartlink.
#[derive(Parser)]
#[command(name = "admin")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage API tokens
    Token {
        #[command(subcommand)]
        action: TokenAction,
    },

    /// Inspect A/B tests
    Experiment {
        #[command(subcommand)]
        action: ExperimentAction,
    },

    /// Show overall counts
    Stats,

    /// Database operations
    Db {
        #[command(subcommand)]
        action: DbAction,
    },
}

#[derive(Subcommand)]
enum TokenAction {
    /// Create a new API token
    Create {
        /// Token name (e.g., "Production API", "Landing pages")
        #[arg(short, long)]
        name: Option<String>,

        /// Skip confirmation prompt
        #[arg(short = 'y', long)]
        yes: bool,
    },

    /// List all tokens
    List,

    /// Revoke a token
    Revoke {
        /// Token name or ID to revoke
        name_or_id: String,
    },
}

#[derive(Subcommand)]
enum ExperimentAction {
    /// Statistical report for the live test of a link
    Report {
        /// Short code or custom alias
        code: String,
    },
}

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
    let config = config::load_from_env()?;

    let pool = PgPool::connect(&config.database_url)
        .await
        .context("Failed to connect to database")?;

    match cli.command {
        Commands::Token { action } => handle_token_action(action, &pool, &config).await?,
        Commands::Experiment { action } => {
            handle_experiment_action(action, &pool, &config).await?
        }
        Commands::Stats => handle_stats(&pool).await?,
        Commands::Db { action } => handle_db_action(action, &pool).await?,
    }

    Ok(())
}

async fn handle_token_action(action: TokenAction, pool: &PgPool, config: &Config) -> Result<()> {
    let repo = PgTokenRepository::new(Arc::new(pool.clone()));

    match action {
        TokenAction::Create { name, yes } => {
            create_token(&repo, &config.token_signing_secret, name, yes).await?;
        }
        TokenAction::List => {
            list_tokens(&repo).await?;
        }
        TokenAction::Revoke { name_or_id } => {
            revoke_token(&repo, &name_or_id).await?;
        }
    }

    Ok(())
}

/// Creates a new API token with interactive prompts.
///
/// Only the HMAC-SHA256 hash is stored. The raw token is displayed once and
/// cannot be retrieved later.
async fn create_token(
    repo: &PgTokenRepository,
    secret: &str,
    name: Option<String>,
    skip_confirm: bool,
) -> Result<()> {
    println!("{}", "Create API Token".bright_blue().bold());
    println!();

    let token_name = match name {
        Some(n) => n,
        None => Input::new()
            .with_prompt("Token name")
            .with_initial_text("Production API")
            .interact_text()?,
    };

    let token_value = generate_token()?;

    println!("{}", "Token details:".bright_white().bold());
    println!("  Name:  {}", token_name.cyan());
    println!("  Token: {}", token_value.bright_yellow().bold());
    println!();
    println!(
        "{}",
        "IMPORTANT: Save this token now! You won't be able to see it again."
            .red()
            .bold()
    );
    println!();

    if !skip_confirm {
        let confirmed = Confirm::new()
            .with_prompt("Create this token?")
            .default(true)
            .interact()?;

        if !confirmed {
            println!("{}", "Cancelled".red());
            return Ok(());
        }
    }

    repo.create_token(&token_name, &hash_token(secret, &token_value))
        .await
        .map_err(|e| anyhow::anyhow!("Failed to create token: {}", e))?;

    println!();
    println!("{}", "Token created successfully!".green().bold());
    println!();
    println!("{}", "Example:".bright_white());
    println!(
        "  curl -H \"Authorization: Bearer {}\" http://localhost:3000/api/links/promo/targets",
        token_value.bright_yellow()
    );
    println!();

    Ok(())
}

async fn list_tokens(repo: &PgTokenRepository) -> Result<()> {
    println!("{}", "API Tokens".bright_blue().bold());
    println!();

    let tokens = repo
        .list_tokens()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to list tokens: {}", e))?;

    if tokens.is_empty() {
        println!("{}", "  No tokens found".yellow());
        println!();
        println!(
            "  Create one with: {} admin token create",
            "cargo run --bin".bright_cyan()
        );
        return Ok(());
    }

    println!(
        "  {:<4} {:<30} {:<18} {:<18} {:<8}",
        "ID".bright_white().bold(),
        "Name".bright_white().bold(),
        "Created".bright_white().bold(),
        "Last used".bright_white().bold(),
        "Status".bright_white().bold()
    );
    println!("  {}", "-".repeat(84).bright_black());

    for token in &tokens {
        let status = if token.is_revoked() {
            "REVOKED".red()
        } else {
            "ACTIVE".green()
        };
        let last_used = token
            .last_used_at
            .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| "never".to_string());

        println!(
            "  {:<4} {:<30} {:<18} {:<18} {}",
            token.id.to_string().bright_black(),
            token.name.cyan(),
            token
                .created_at
                .format("%Y-%m-%d %H:%M")
                .to_string()
                .bright_black(),
            last_used.bright_black(),
            status
        );
    }

    println!();
    println!(
        "  Total: {}",
        tokens.len().to_string().bright_white().bold()
    );
    println!();

    Ok(())
}

/// Picks the token an operator meant: numeric input matches the ID, anything
/// else the exact name.
fn find_token<'a>(tokens: &'a [ApiToken], name_or_id: &str) -> Option<&'a ApiToken> {
    match name_or_id.parse::<i64>() {
        Ok(id) => tokens.iter().find(|t| t.id == id),
        Err(_) => tokens.iter().find(|t| t.name == name_or_id),
    }
}

async fn revoke_token(repo: &PgTokenRepository, name_or_id: &str) -> Result<()> {
    println!("{}", "Revoke API Token".bright_blue().bold());
    println!();

    let tokens = repo
        .list_tokens()
        .await
        .map_err(|e| anyhow::anyhow!("Database error: {}", e))?;

    let token = find_token(&tokens, name_or_id).context("Token not found")?;

    if token.is_revoked() {
        println!("{}", "This token is already revoked".yellow());
        return Ok(());
    }

    println!("  Token: {}", token.name.cyan());
    println!("  ID:    {}", token.id.to_string().bright_black());
    println!();

    let confirmed = Confirm::new()
        .with_prompt("Revoke this token?")
        .default(false)
        .interact()?;

    if !confirmed {
        println!("{}", "Cancelled".red());
        return Ok(());
    }

    repo.revoke_token(token.id)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to revoke token: {}", e))?;

    println!();
    println!("{}", "Token revoked successfully!".green().bold());
    println!();

    Ok(())
}

async fn handle_experiment_action(
    action: ExperimentAction,
    pool: &PgPool,
    config: &Config,
) -> Result<()> {
    let pool = Arc::new(pool.clone());
    let service = ExperimentService::new(
        Arc::new(PgLinkRepository::new(pool.clone())),
        Arc::new(PgExperimentRepository::new(pool)),
        Arc::new(SystemClock),
        config.stats_settings(),
    );

    match action {
        ExperimentAction::Report { code } => {
            let report = service
                .report(&code)
                .await
                .map_err(|e| anyhow::anyhow!("{}", e))?;
            print_report(&report);
        }
    }

    Ok(())
}

fn print_report(report: &ExperimentReport) {
    let summary = &report.summary;
    let plan = &report.plan;

    println!(
        "{} {}",
        "A/B test".bright_blue().bold(),
        report.test.name.cyan().bold()
    );
    println!();
    println!(
        "  {:<20} {:>8} {:>12} {:>9} {:>9} {:>12}",
        "Variant".bright_white().bold(),
        "Weight".bright_white().bold(),
        "Clicks".bright_white().bold(),
        "Conv.".bright_white().bold(),
        "Rate".bright_white().bold(),
        "Lift".bright_white().bold()
    );
    println!("  {}", "-".repeat(76).bright_black());

    for (variant, stats) in report.test.variants.iter().zip(&summary.variants) {
        let lift = stats
            .improvement
            .map(|i| format!("{:+.2}%", i))
            .unwrap_or_else(|| "control".to_string());
        let name = if summary.winner == Some(variant.id) {
            format!("{} *", variant.name).green().bold()
        } else {
            variant.name.normal()
        };

        println!(
            "  {:<20} {:>8} {:>12} {:>9} {:>8.2}% {:>12}",
            name,
            variant.weight,
            stats.clicks,
            stats.conversions,
            stats.conversion_rate,
            lift
        );
    }

    println!();
    println!("  Confidence:     {:.2}%", summary.confidence);
    println!(
        "  Significant:    {}",
        if summary.is_significant {
            "yes".green()
        } else {
            "no".yellow()
        }
    );
    println!("  Recommendation: {}", summary.recommendation.bright_white());
    println!();

    let required = plan
        .required_total_clicks
        .map(|n| n.to_string())
        .unwrap_or_else(|| "n/a (no baseline conversions yet)".to_string());
    let remaining = plan
        .estimated_days_remaining
        .map(|d| format!("{} days", d))
        .unwrap_or_else(|| "unknown".to_string());

    println!("  Running for:    {:.1} days", plan.days_running);
    println!(
        "  Needed clicks:  {} (MDE {}%)",
        required, plan.min_detectable_effect
    );
    println!("  Time remaining: {}", remaining);
    println!();
}

/// Displays overall counts.
async fn handle_stats(pool: &PgPool) -> Result<()> {
    println!("{}", "Statistics".bright_blue().bold());
    println!();

    let links_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM links")
        .fetch_one(pool)
        .await?;

    let clicks_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM link_clicks")
        .fetch_one(pool)
        .await?;

    let targets_count: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM link_targets WHERE is_active")
            .fetch_one(pool)
            .await?;

    let tests_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM ab_tests WHERE is_active")
        .fetch_one(pool)
        .await?;

    let tokens_count: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM api_tokens WHERE revoked_at IS NULL")
            .fetch_one(pool)
            .await?;

    for (label, value) in [
        ("Links:", links_count),
        ("Clicks:", clicks_count),
        ("Targeting rules:", targets_count),
        ("Live A/B tests:", tests_count),
        ("Active tokens:", tokens_count),
    ] {
        println!("  {:<18} {}", label, value.to_string().bright_green().bold());
    }
    println!();

    Ok(())
}

async fn handle_db_action(action: DbAction, pool: &PgPool) -> Result<()> {
    match action {
        DbAction::Check => {
            println!("{}", "Checking database connection...".bright_blue());

            sqlx::query("SELECT 1").fetch_one(pool).await?;

            println!("{}", "Database connection OK".green().bold());
        }
        DbAction::Info => {
            println!("{}", "Database Information".bright_blue().bold());
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

/// Generates a URL-safe token from 256 bits of OS randomness.
fn generate_token() -> Result<String> {
    let mut bytes = [0u8; TOKEN_BYTES];
    getrandom::fill(&mut bytes).map_err(|e| anyhow::anyhow!("No OS randomness: {}", e))?;
    Ok(URL_SAFE_NO_PAD.encode(bytes))
}
