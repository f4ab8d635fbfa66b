//! faceoff server entry point

use clap::Parser;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use faceoff::{
    config::Args,
    db::MongoClient,
    server,
    store::{MemoryContentStore, Stores},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file if present
    let _ = dotenvy::dotenv();

    let args = Args::parse();

    // Initialize tracing/logging
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("faceoff={},info", args.log_level).into());
    let registry = tracing_subscriber::registry().with(filter);
    if args.log_json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }

    if let Err(e) = args.validate() {
        error!("Configuration error: {}", e);
        std::process::exit(1);
    }

    info!("======================================");
    info!("  faceoff");
    info!("======================================");
    info!("Listen: {}", args.listen);
    info!("Mode: {}", if args.dev_mode { "DEVELOPMENT" } else { "PRODUCTION" });
    info!("MongoDB: {} (db: {})", args.mongodb_uri, args.mongodb_db);
    info!(
        "Credit scheduler: {} (UTC{:+}, trigger: {:?})",
        if args.scheduler.credit_scheduler_enabled { "enabled" } else { "disabled" },
        args.scheduler.reset_utc_offset_hours,
        args.scheduler.reset_trigger
    );
    info!("======================================");

    // Connect to MongoDB (memory fallback in dev mode)
    let stores = match MongoClient::new(&args.mongodb_uri, &args.mongodb_db).await {
        Ok(client) => {
            info!("MongoDB connected successfully");
            Stores::mongo(&client, &args.collections).await?
        }
        Err(e) => {
            if args.dev_mode {
                warn!("MongoDB connection failed (dev mode, using in-memory stores): {}", e);
                let content = MemoryContentStore::demo();
                info!(items = content.len(), "Serving the built-in demo catalog");
                Stores::memory_with_content(content)
            } else {
                error!("MongoDB connection failed: {}", e);
                std::process::exit(1);
            }
        }
    };

    let state = Arc::new(server::AppState::new(args, stores)?);

    if state.args.scheduler.credit_scheduler_enabled {
        state.scheduler.start().await;
    }

    server::run(state).await?;

    Ok(())
}
