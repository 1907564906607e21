//! Skinior CLI - Database migrations and management tools.
//!
//! # Usage
//!
//! ```bash
//! # Apply database migrations
//! skn-cli migrate
//!
//! # Create an admin account
//! skn-cli admin create -e admin@skinior.com -p 'long-password' -f Lina -l Haddad
//!
//! # Create an agent account and print its API key
//! skn-cli agent create -n consultation-bot -e bot@skinior.com
//!
//! # Load demo catalog data (built-in, or from a YAML file)
//! skn-cli seed
//! skn-cli seed --file catalog.yaml
//! ```
//!
//! # Commands
//!
//! - `migrate` - Run database migrations
//! - `admin create` - Create admin users
//! - `agent create` - Create agent accounts with API keys
//! - `seed` - Seed categories, brands, products and discount codes

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "skn-cli")]
#[command(author, version, about = "Skinior CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Manage admin users
    Admin {
        #[command(subcommand)]
        action: AdminAction,
    },
    /// Manage agent accounts
    Agent {
        #[command(subcommand)]
        action: AgentAction,
    },
    /// Seed the database with demo catalog data
    Seed {
        /// YAML catalog file (defaults to the built-in demo catalog)
        #[arg(short, long)]
        file: Option<String>,
    },
}

#[derive(Subcommand)]
enum AdminAction {
    /// Create a new admin user
    Create {
        /// Admin email address
        #[arg(short, long)]
        email: String,

        /// Admin password (at least 8 characters)
        #[arg(short, long)]
        password: String,

        /// First name
        #[arg(short, long)]
        first_name: Option<String>,

        /// Last name
        #[arg(short, long)]
        last_name: Option<String>,
    },
}

#[derive(Subcommand)]
enum AgentAction {
    /// Create an agent account and print its API key
    Create {
        /// Agent name, used in the key prefix
        #[arg(short, long)]
        name: String,

        /// Agent account email
        #[arg(short, long)]
        email: String,

        /// What the key is for
        #[arg(short, long)]
        description: Option<String>,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "skn_cli=info,skinior_api=info".into()),
        )
        .init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Migrate => commands::migrate::run().await?,
        Commands::Admin { action } => match action {
            AdminAction::Create {
                email,
                password,
                first_name,
                last_name,
            } => {
                commands::admin::create_user(&email, &password, first_name, last_name).await?;
            }
        },
        Commands::Agent { action } => match action {
            AgentAction::Create {
                name,
                email,
                description,
            } => {
                commands::agent::create(&name, &email, description).await?;
            }
        },
        Commands::Seed { file } => commands::seed::catalog(file.as_deref()).await?,
    }
    Ok(())
}
