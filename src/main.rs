use anyhow::Result;
use clap::Parser;
use tracing::info;
use voicebridge::{create_router, AppState, Config};

/// Real-time voice agent client with an HTTP control surface
#[derive(Parser, Debug)]
#[command(name = "voicebridge", version)]
struct Args {
    /// Path to the config file (without extension)
    #[arg(long, default_value = "config/voicebridge")]
    config: String,

    /// Override the HTTP bind address
    #[arg(long)]
    bind: Option<String>,

    /// Override the HTTP port
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    let cfg = Config::load(&args.config)?;

    let bind = args.bind.unwrap_or_else(|| cfg.service.http.bind.clone());
    let port = args.port.unwrap_or(cfg.service.http.port);

    info!("{} v{}", cfg.service.name, env!("CARGO_PKG_VERSION"));
    info!("agent server: {}", cfg.agent.server_url);
    info!(
        "audio: {}Hz, {} channel(s), {}-sample frames",
        cfg.audio.sample_rate, cfg.audio.channels, cfg.audio.frame_size
    );

    let state = AppState::new(cfg);
    let router = create_router(state);

    let addr = format!("{bind}:{port}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("HTTP control surface listening on {}", addr);

    axum::serve(listener, router).await?;

    Ok(())
}
