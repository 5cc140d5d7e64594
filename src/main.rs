use clap::Parser;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use keygate::config::Config;
use keygate::db::{AppState, create_pool, init_db};
use keygate::engine;
use keygate::handlers;
use keygate::models::DurationPolicy;
use keygate::util::now;

#[derive(Parser, Debug)]
#[command(name = "keygate")]
#[command(about = "HWID-bound license key server")]
struct Cli {
    /// Generate this many never-expiring keys on startup (dev mode only)
    #[arg(long, value_name = "COUNT")]
    seed: Option<u32>,

    /// Delete the database on exit (dev mode only, useful for fresh starts)
    #[arg(long)]
    ephemeral: bool,
}

/// Mint a batch of dev keys and print them for copy-paste.
fn seed_dev_keys(state: &AppState, count: u32) {
    let mut conn = state.db.get().expect("Failed to get db connection for seeding");

    let keys = engine::generate(
        &mut conn,
        i64::from(count),
        DurationPolicy::Infinite,
        state.max_generate_count,
        now(),
    )
    .expect("Failed to seed dev keys");

    tracing::info!("============================================");
    tracing::info!("SEEDED {} DEV KEY(S)", keys.len());
    tracing::info!("============================================");

    println!();
    println!("--- COPY FROM HERE ---");
    for key in &keys {
        println!("  {}", key);
    }
    println!("--- END COPY ---");
    println!();
}

fn remove_database_files(db_path: &str) {
    tracing::info!("Cleaning up ephemeral database...");
    if let Err(e) = std::fs::remove_file(db_path) {
        tracing::warn!("Failed to remove {}: {}", db_path, e);
    } else {
        tracing::info!("Removed {}", db_path);
    }
    let _ = std::fs::remove_file(format!("{}-wal", db_path));
    let _ = std::fs::remove_file(format!("{}-shm", db_path));
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "keygate=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env();

    if config.dev_mode {
        tracing::info!("Running in DEVELOPMENT mode");
    }

    let db_pool = create_pool(&config.database_path, config.db_pool_size)
        .expect("Failed to create database pool");

    {
        let conn = db_pool.get().expect("Failed to get connection");
        init_db(&conn).expect("Failed to initialize database");
    }

    let state = AppState {
        db: db_pool,
        max_generate_count: config.max_generate_count,
    };

    if let Some(count) = cli.seed {
        if config.dev_mode {
            seed_dev_keys(&state, count);
        } else {
            tracing::warn!("--seed flag ignored: not in dev mode (set KEYGATE_ENV=dev)");
        }
    }

    let app = handlers::router()
        .layer(handlers::cors_layer(&config.cors_origins))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr = config.addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("Failed to bind to address");

    let cleanup_on_exit = cli.ephemeral && config.dev_mode;
    if cli.ephemeral && !config.dev_mode {
        tracing::warn!("--ephemeral flag ignored: not in dev mode (set KEYGATE_ENV=dev)");
    }
    if cleanup_on_exit {
        tracing::info!("EPHEMERAL MODE: database will be deleted on exit");
    }

    tracing::info!("keygate listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Failed to start server");

    if cleanup_on_exit {
        remove_database_files(&config.database_path);
    }
}

async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("Failed to install Ctrl+C handler");
    tracing::info!("Shutdown signal received, stopping server...");
}
