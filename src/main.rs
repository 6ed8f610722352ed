use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use gigit::api::{build_router, AppState};
use gigit::catalog::seed::{seed_demo_accounts, seed_skills};
use gigit::config::AppConfig;
use gigit::database::Database;
use gigit::email::{mailer_from_config, Postmaster};
use gigit::storage::{ObjectStore, S3Store};

#[derive(Parser)]
#[command(name = "gigit")]
#[command(about = "GigIt labor marketplace service")]
struct Cli {
    /// Configuration file; environment variables override it
    #[arg(short, long, default_value = "gigit.toml")]
    config: String,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP API (default)
    Serve,
    /// Apply database migrations and exit
    Migrate,
    /// Seed the skill catalog
    Seed {
        /// Also create the demo admin, worker and business accounts
        #[arg(long)]
        demo: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "gigit=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    let config = AppConfig::load(&cli.config)?;
    config.validate()?;
    info!("Configuration loaded");

    let database = Database::new(&config.database_url, config.database_max_connections).await?;
    database.run_migrations().await?;
    info!("Database migrations completed");

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Migrate => Ok(()),
        Commands::Seed { demo } => {
            let inserted = seed_skills(database.pool()).await?;
            info!("Seeded {} new skills", inserted);
            if demo {
                seed_demo_accounts(database.pool(), config.session.password_cost).await?;
                info!("Demo accounts ready");
            }
            Ok(())
        }
        Commands::Serve => serve(database, config).await,
    }
}

async fn serve(database: Database, config: AppConfig) -> anyhow::Result<()> {
    info!("Starting GigIt marketplace");

    let store: Option<Arc<dyn ObjectStore>> = match &config.storage {
        Some(storage) => {
            let store = S3Store::connect(storage).await?;
            info!("Object storage ready (bucket {})", storage.bucket);
            Some(Arc::new(store))
        }
        None => {
            info!("Object storage not configured; uploads are disabled");
            None
        }
    };

    let postmaster = Postmaster::new(mailer_from_config(&config.email), config.app_url.clone());
    let addr = config.bind_address();
    let app = build_router(AppState::new(database, config, postmaster, store));

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("Server listening on {}", addr);
    axum::serve(listener, app).await?;

    Ok(())
}
