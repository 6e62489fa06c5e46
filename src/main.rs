//! Proxy Dashboard CLI - manage and open registered proxy targets.
//!
//! This is the main binary entry point. See the `proxy_dashboard` library
//! for the core functionality.

use anyhow::Result;
use clap::{Parser, Subcommand};
use mimalloc::MiMalloc;
use proxy_dashboard::{Config, DashboardController, NewProxy, ProxyId, ProxyUpdate};

/// Global allocator configured per M-MIMALLOC-APPS guideline.
#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

// CLI
#[derive(Parser)]
#[command(name = "proxy-dashboard")]
#[command(version)]
#[command(about = "Manage reverse proxy targets on the local network")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List registered proxies
    List {
        /// Print the records as JSON
        #[arg(long)]
        json: bool,
    },
    /// Register a new proxy
    Add {
        /// Display name
        name: String,
        /// Address of the internal service (e.g. http://192.168.1.100:8080)
        target_url: String,
        /// Optional description
        #[arg(long, default_value = "")]
        description: String,
        /// Explicit id (derived from the name by the server otherwise)
        #[arg(long)]
        id: Option<String>,
        /// Register the proxy disabled
        #[arg(long)]
        disabled: bool,
    },
    /// Change fields of a registered proxy
    Edit {
        /// Proxy id
        id: String,
        /// New display name
        #[arg(long)]
        name: Option<String>,
        /// New target URL
        #[arg(long)]
        target_url: Option<String>,
        /// New description
        #[arg(long)]
        description: Option<String>,
        /// Enable or disable the proxy
        #[arg(long)]
        enabled: Option<bool>,
    },
    /// Delete a registered proxy
    Remove {
        /// Proxy id
        id: String,
    },
    /// Show the embedded view URL and sandbox for a proxy
    View {
        /// Proxy id
        id: String,
    },
    /// Show or change configuration
    Config {
        /// Key to set (origin, request_timeout_secs)
        key: Option<String>,
        /// New value
        value: Option<String>,
    },
}

async fn run(command: Commands) -> Result<()> {
    if let Commands::Config { key, value } = command {
        return configure(key, value);
    }

    let config = Config::load()?;
    let dashboard = DashboardController::from_config(&config)?;

    let result = dispatch(&dashboard, command).await;
    dashboard.dispose();
    result
}

async fn dispatch(dashboard: &DashboardController, command: Commands) -> Result<()> {
    match command {
        Commands::List { json } => {
            dashboard.start().await?;
            let view = dashboard.view();
            if json {
                println!("{}", serde_json::to_string_pretty(view.records())?);
            } else if view.records().is_empty() {
                println!("No proxies configured");
            } else {
                for record in view.records() {
                    println!(
                        "{}\t{}\t{}{}",
                        record.id,
                        record.name,
                        record.target_url,
                        if record.enabled { "" } else { "\t(disabled)" }
                    );
                }
            }
        }
        Commands::Add {
            name,
            target_url,
            description,
            id,
            disabled,
        } => {
            let mut fields = NewProxy::new(name, target_url)
                .with_description(description)
                .enabled(!disabled);
            if let Some(id) = id {
                fields = fields.with_id(id);
            }
            let created = dashboard.request_create(fields).await?;
            println!("Added {} ({})", created.id, created.name);
        }
        Commands::Edit {
            id,
            name,
            target_url,
            description,
            enabled,
        } => {
            let update = ProxyUpdate {
                name,
                target_url,
                description,
                enabled,
            };
            if update.is_empty() {
                anyhow::bail!("Nothing to change; pass at least one field");
            }
            let updated = dashboard.request_update(&ProxyId::new(id), update).await?;
            println!("Updated {} ({})", updated.id, updated.name);
        }
        Commands::Remove { id } => {
            let id = ProxyId::new(id);
            dashboard.request_delete(&id).await?;
            println!("Removed {}", id);
        }
        Commands::View { id } => {
            dashboard.start().await?;
            let session = dashboard.request_select(ProxyId::new(id))?;
            let view = dashboard.view();
            let Some(record) = view.selected_record else {
                anyhow::bail!("No proxy with id {:?}", session.id().as_str());
            };
            println!("{} -> {}", record.name, record.target_url);
            println!("frame:   {}", session.frame_url());
            println!("sandbox: {}", session.sandbox_attribute());
            println!("open:    {}", session.external_url());
        }
        Commands::Config { key, value } => configure(key, value)?,
    }
    Ok(())
}

fn configure(key: Option<String>, value: Option<String>) -> Result<()> {
    let mut config = Config::load()?;
    match (key.as_deref(), value) {
        (None, _) => println!("{}", serde_json::to_string_pretty(&config)?),
        (Some("origin"), None) => println!("{}", config.origin),
        (Some("request_timeout_secs"), None) => println!("{}", config.request_timeout_secs),
        (Some("origin"), Some(v)) => {
            config.origin = v;
            config.origin_url()?;
            config.save()?;
        }
        (Some("request_timeout_secs"), Some(v)) => {
            config.request_timeout_secs = Config::parse_timeout(&v)?;
            config.save()?;
        }
        (Some(other), _) => anyhow::bail!("Unknown config key {:?}", other),
    }
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // Logs go to stderr so stdout stays clean for scripting
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"))
        .format_timestamp_secs()
        .init();

    let cli = Cli::parse();
    run(cli.command).await
}
