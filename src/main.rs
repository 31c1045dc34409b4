use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use sqlx::postgres::PgPoolOptions;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use uuid::Uuid;

mod auth;
mod authz;
mod db;
mod http;
mod models;
mod portfolio;
mod stats;
mod store;

use http::{build_router, AppConfig, AppState};
use store::{MemStore, Store};

#[derive(Parser)]
#[command(name = "learnteam")]
#[command(about = "LearnTeam API server and operations CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the database schema
    InitDb,
    /// Load demo seed data
    Seed,
    /// Import team learning logs from a CSV file
    Import {
        #[arg(long)]
        csv: PathBuf,
        /// Team the imported logs belong to
        #[arg(long)]
        team: Uuid,
        /// User recorded as the author of the imported logs
        #[arg(long)]
        user: Uuid,
    },
    /// Run the HTTP API server
    Serve {
        /// Listen address; falls back to LEARNTEAM_BIND, then 0.0.0.0:8080
        #[arg(long)]
        bind: Option<String>,
        /// Use an in-memory store with demo data instead of Postgres
        #[arg(long, default_value_t = false)]
        demo: bool,
    },
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

async fn connect_pool() -> anyhow::Result<sqlx::PgPool> {
    let database_url = std::env::var("DATABASE_URL")
        .context("DATABASE_URL must be set to a Postgres instance")?;
    PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await
        .context("failed to connect to Postgres")
}

fn env_flag(name: &str) -> bool {
    std::env::var(name)
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Commands::InitDb => {
            let pool = connect_pool().await?;
            db::init_db(&pool).await?;
            println!("Schema ready.");
        }
        Commands::Seed => {
            let pool = connect_pool().await?;
            db::seed(&pool).await?;
            println!("Seed data inserted.");
        }
        Commands::Import { csv, team, user } => {
            let pool = connect_pool().await?;
            let inserted = db::import_csv(&pool, &csv, team, user).await?;
            println!("Inserted {inserted} learning logs from {}.", csv.display());
        }
        Commands::Serve { bind, demo } => {
            let store: Arc<dyn Store> = if demo {
                info!(
                    token = store::DEMO_SESSION_TOKEN,
                    "demo mode: serving from an in-memory store"
                );
                Arc::new(MemStore::with_demo_data()?)
            } else {
                let pool = connect_pool().await?;
                Arc::new(db::PgStore::new(pool))
            };

            let config = AppConfig {
                public_url: std::env::var("LEARNTEAM_PUBLIC_URL")
                    .unwrap_or_else(|_| "http://localhost:3000".to_string()),
                require_email_confirmation: env_flag("REQUIRE_EMAIL_CONFIRMATION"),
            };

            let bind = bind
                .or_else(|| std::env::var("LEARNTEAM_BIND").ok())
                .unwrap_or_else(|| "0.0.0.0:8080".to_string());
            let addr: SocketAddr = bind
                .parse()
                .with_context(|| format!("invalid bind address {bind}"))?;

            let app = build_router(AppState::new(store, config));
            let listener = TcpListener::bind(addr).await?;
            info!("learnteam listening on {bind}");
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    let _ = tokio::signal::ctrl_c().await;
                })
                .await?;
        }
    }

    Ok(())
}
