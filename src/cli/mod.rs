//! CLI module for the Smart Link command-line interface.
//!
//! Without a subcommand (or with `serve`) the binary runs the API server.
//! The other subcommands talk to a running server:
//! - `sites list` - Print the directory, optionally filtered
//! - `sites show <id>` - Show one entry
//! - `login` - Print a session token
//! - `describe` - Generate a description (admin token required)
//! - `config check` - Validate configuration file

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::client::{ApiClient, ClientContext, ClientError};
use crate::db::Site;

/// CLI arguments structure
#[derive(Parser, Debug)]
#[command(name = "smartlink")]
#[command(author, version, about = "A curated directory of website links", long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "smartlink.toml")]
    pub config: PathBuf,

    /// Override log level
    #[arg(short, long)]
    pub log_level: Option<String>,

    /// API URL to connect to
    #[arg(long, env = "SMARTLINK_API_URL", default_value = "http://localhost:3001")]
    pub api_url: String,

    /// Session token (can also be set via SMARTLINK_TOKEN env var)
    #[arg(long, env = "SMARTLINK_TOKEN")]
    pub token: Option<String>,

    /// Subcommand to run (if none, starts the server)
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the API server
    Serve,

    /// Site directory commands
    #[command(subcommand)]
    Sites(SitesCommands),

    /// Log in and print a session token
    Login {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },

    /// Generate a description for a site
    Describe {
        #[arg(long)]
        title: String,
        #[arg(long)]
        category: String,
        #[arg(long)]
        link: String,
    },

    /// Configuration management commands
    #[command(subcommand)]
    Config(ConfigCommands),
}

/// Sites subcommands
#[derive(Subcommand, Debug)]
pub enum SitesCommands {
    /// List sites, newest first
    List {
        /// Case-insensitive text filter over title, URL, category and description
        #[arg(short, long)]
        search: Option<String>,
        /// Exact category filter
        #[arg(short, long)]
        category: Option<String>,
    },
    /// Show details for a specific site
    Show { id: i64 },
}

/// Config subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Validate configuration file
    Check,
}

impl Cli {
    /// Whether this invocation runs the server
    pub fn is_serve(&self) -> bool {
        matches!(self.command, None | Some(Commands::Serve))
    }
}

fn create_client(cli: &Cli) -> Result<ApiClient> {
    Ok(ApiClient::new(&cli.api_url)
        .context("Failed to create HTTP client")?
        .with_token(cli.token.clone()))
}

/// Turn client errors into CLI-facing messages
fn describe_error(err: ClientError) -> anyhow::Error {
    match err.status() {
        Some(reqwest::StatusCode::UNAUTHORIZED) => anyhow::anyhow!(
            "{}. Use --token or set SMARTLINK_TOKEN environment variable.",
            err
        ),
        Some(status) => anyhow::anyhow!("Server returned error {}: {}", status, err),
        None => anyhow::Error::new(err).context("Is the Smart Link server running?"),
    }
}

/// Run a CLI command
pub async fn run_command(cli: &Cli) -> Result<()> {
    match &cli.command {
        Some(Commands::Sites(SitesCommands::List { search, category })) => {
            cmd_sites_list(cli, search.as_deref(), category.clone()).await
        }
        Some(Commands::Sites(SitesCommands::Show { id })) => cmd_sites_show(cli, *id).await,
        Some(Commands::Login { email, password }) => cmd_login(cli, email, password).await,
        Some(Commands::Describe {
            title,
            category,
            link,
        }) => cmd_describe(cli, title, category, link).await,
        Some(Commands::Config(ConfigCommands::Check)) => cmd_config_check(cli).await,
        None | Some(Commands::Serve) => {
            // Serving is handled in main.rs
            Ok(())
        }
    }
}

async fn cmd_sites_list(cli: &Cli, search: Option<&str>, category: Option<String>) -> Result<()> {
    let mut ctx = ClientContext::new(create_client(cli)?);
    ctx.fetch_sites().await.map_err(describe_error)?;

    if let Some(term) = search {
        ctx.set_search_term(term);
    }
    ctx.set_category_filter(category);

    let store = ctx.sites();
    if store.sites().is_empty() {
        println!("No sites found.");
        return Ok(());
    }

    println!();
    println!("{:<6}  {:<30}  {:<14}  {:<50}", "ID", "TITLE", "CATEGORY", "URL");
    println!("{}", "-".repeat(106));

    for site in store.filtered() {
        println!(
            "{:<6}  {:<30}  {:<14}  {:<50}",
            site.id,
            truncate(&site.title, 30),
            truncate(&site.category, 14),
            truncate(&site.site_url, 50)
        );
    }

    println!();
    println!(
        "{} of {} sites shown. Categories: {}",
        store.filtered().len(),
        store.sites().len(),
        store.categories().join(", ")
    );
    Ok(())
}

async fn cmd_sites_show(cli: &Cli, id: i64) -> Result<()> {
    let client = create_client(cli)?;
    let site = client.get_site(id).await.map_err(describe_error)?;
    print_site(&site);
    Ok(())
}

fn print_site(site: &Site) {
    println!();
    println!("=== Site: {} ===", site.title);
    println!();
    println!("ID:          {}", site.id);
    println!("URL:         {}", site.site_url);
    println!("Category:    {}", site.category);
    println!(
        "Cover Image: {}",
        if site.cover_image.is_empty() {
            "-"
        } else {
            &site.cover_image
        }
    );
    println!("Created:     {}", site.created_at);
    println!("Updated:     {}", site.updated_at);
    println!();
    println!("{}", site.description);
    println!();
}

async fn cmd_login(cli: &Cli, email: &str, password: &str) -> Result<()> {
    let mut ctx = ClientContext::new(create_client(cli)?);
    let user = ctx
        .login(email, password)
        .await
        .map_err(describe_error)?
        .clone();

    println!("[OK] Logged in as {} ({})", user.email, user.role);
    if let Some(token) = ctx.session().token() {
        println!();
        println!("export SMARTLINK_TOKEN={}", token);
    }
    Ok(())
}

async fn cmd_describe(cli: &Cli, title: &str, category: &str, link: &str) -> Result<()> {
    if cli.token.is_none() {
        anyhow::bail!("Authentication required. Use --token or set SMARTLINK_TOKEN environment variable.");
    }

    let mut ctx = ClientContext::new(create_client(cli)?);
    let description = ctx
        .generate_description(title, category, link)
        .await
        .map_err(describe_error)?;

    println!("{}", description);
    Ok(())
}

async fn cmd_config_check(cli: &Cli) -> Result<()> {
    use crate::config::Config;

    let config_path = &cli.config;

    println!("Checking configuration file: {}", config_path.display());
    println!();

    if !config_path.exists() {
        println!(
            "[!!] Configuration file not found: {}",
            config_path.display()
        );
        println!();
        println!("Defaults and environment variables will be used when starting the server.");
        println!("To create a custom configuration, copy smartlink.example.toml to smartlink.toml");
    }

    let config = match Config::load(config_path) {
        Ok(config) => config,
        Err(e) => {
            println!("[!!] Configuration file is invalid!");
            println!();
            println!("Error: {:#}", e);
            println!();
            println!("Please check the configuration file syntax and try again.");
            anyhow::bail!("Invalid configuration file");
        }
    };

    println!("=== Configuration Summary ===");
    println!();
    println!("Server:");
    println!("  Address:      {}:{}", config.server.host, config.server.port);
    println!("  Frontend URL: {}", config.server.frontend_url);
    println!();
    println!("Database:");
    println!("  URL:          {}", config.database.url);
    println!();
    println!("Auth:");
    println!("  Token TTL:    {}h", config.auth.token_ttl_hours);
    println!(
        "  Admin:        {}",
        config.auth.admin_email.as_deref().unwrap_or("(not bootstrapped)")
    );
    println!();
    println!("Integrations:");
    println!(
        "  Image store:  {}",
        if config.images.is_configured() {
            "Configured"
        } else {
            "Not configured"
        }
    );
    println!(
        "  AI:           {}",
        if config.ai.api_key.as_deref().map_or(false, |k| !k.is_empty()) {
            "Configured"
        } else {
            "Fallback descriptions only"
        }
    );
    println!();

    if let Err(e) = config.validate() {
        println!("[!!] {}", e);
        anyhow::bail!("Invalid configuration");
    }

    println!("[OK] Configuration is valid!");
    Ok(())
}

/// Truncate a string to max characters with ellipsis
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
