#[tokio::main]
async fn main() {
    // Load .env if present so cargo run picks up DATABASE_URL, JWT_SECRET, etc.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt::init();

    let config = crewdesk_api::config::config();
    tracing::info!("Starting CrewDesk API in {:?} mode", config.environment);

    if let Err(e) = crewdesk_api::server::serve(None).await {
        eprintln!("server error: {}", e);
        std::process::exit(1);
    }
}
