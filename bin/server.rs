// Cashback Tracker - Web Server
// Receives Mini App submissions and answers cashback lookups

use anyhow::{Context, Result};
use cashback_tracker::api::{router, AppState};
use cashback_tracker::{init_logging, open_database, Config};

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::load()?;
    init_logging(&config.log_level);

    println!("🌐 Cashback Tracker - Web Server");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    let conn = open_database(&config.db_path)?;
    println!("✓ Database opened: {:?}", config.db_path);

    let state = AppState::new(conn, config.webapp_url.clone());
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", config.bind_addr))?;

    tracing::info!(addr = %config.bind_addr, "server listening");
    println!("\n🚀 Server running on http://{}", config.bind_addr);
    println!("   API:     http://{}/api/health", config.bind_addr);
    println!("   Mini App: {}", config.webapp_url);
    println!("\n   Press Ctrl+C to stop\n");

    axum::serve(listener, app)
        .await
        .context("Server error")?;

    Ok(())
}
