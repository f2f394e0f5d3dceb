use anyhow::Result;
use clap::Parser;
use std::sync::Arc;
use tracing::info;

use live_transcribe::{Config, SessionConfig, StreamingSession, WsTransport};

/// Transcribe microphone audio in real time
#[derive(Debug, Parser)]
#[command(version, about)]
struct Cli {
    /// Recording duration in seconds
    #[arg(short = 't', long, default_value_t = 5)]
    timeout: u64,

    /// Credentials file with an [auth] section (region, apikey)
    #[arg(long, default_value = "speech.cfg")]
    config: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let cfg = Config::load(&cli.config)?;

    let url = cfg.recognize_url();
    info!("Session endpoint: {}", url);

    let (transport, events) = WsTransport::connect(&url, &cfg.authorization_header()).await?;

    let session_config = SessionConfig {
        record_seconds: cli.timeout,
        ..SessionConfig::default()
    };

    let session = StreamingSession::new(Arc::new(transport), session_config);
    let outcome = session.run(events).await?;

    println!("{}", outcome.transcript);
    match outcome.close_code {
        Some(code) => println!(
            "Connection closed with status: {}, message: {}",
            code, outcome.close_reason
        ),
        None => println!(
            "Connection closed without a status code, message: {}",
            outcome.close_reason
        ),
    }

    Ok(())
}
