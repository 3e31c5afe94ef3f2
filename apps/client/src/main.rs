//! Terminal client for the Mafia game server.
//!
//! Reads player input line by line from stdin and prints the transcript to
//! stdout. Structured logs go to stderr.

mod telemetry;

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use mafia_client::{
    ClientConfig, GameSession, HttpGameClient, InputError, PresentationSink, TerminalSink,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "mafia-client")]
#[command(about = "Play Mafia against AI players from the terminal")]
struct Args {
    /// Player name (1-10 letters or digits); prompted for when omitted
    #[arg(short, long)]
    name: Option<String>,

    /// Base URL of the game server API (overrides MAFIA_API_BASE_URL)
    #[arg(long)]
    api_url: Option<String>,

    /// Per-request timeout in milliseconds (overrides MAFIA_REQUEST_TIMEOUT_MS)
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// Timeout in milliseconds for calls that wait on AI players (overrides MAFIA_AI_REQUEST_TIMEOUT_MS)
    #[arg(long)]
    ai_timeout_ms: Option<u64>,

    /// State polling interval in milliseconds (overrides MAFIA_POLL_INTERVAL_MS)
    #[arg(long)]
    poll_ms: Option<u64>,

    /// Multiplier over the default pacing delays (overrides MAFIA_PACING_SCALE)
    #[arg(long)]
    pacing_scale: Option<f64>,

    /// Print the server's AI usage statistics and exit
    #[arg(long, conflicts_with = "reset_usage_stats")]
    usage_stats: bool,

    /// Reset the server's AI usage statistics and exit
    #[arg(long)]
    reset_usage_stats: bool,
}

fn apply_overrides(mut config: ClientConfig, args: &Args) -> ClientConfig {
    if let Some(url) = &args.api_url {
        config.api_base_url = url.clone();
    }
    if let Some(ms) = args.timeout_ms.filter(|ms| *ms > 0) {
        config.request_timeout = Duration::from_millis(ms);
    }
    if let Some(ms) = args.ai_timeout_ms.filter(|ms| *ms > 0) {
        config.ai_request_timeout = Duration::from_millis(ms);
    }
    if let Some(ms) = args.poll_ms.filter(|ms| *ms > 0) {
        config.poll_interval = Duration::from_millis(ms);
    }
    if let Some(scale) = args.pacing_scale.filter(|s| s.is_finite() && *s >= 0.0) {
        config.pacing_scale = scale;
    }
    config
}

#[tokio::main]
async fn main() {
    telemetry::init_tracing();
    let args = Args::parse();

    let config = match ClientConfig::from_env() {
        Ok(config) => apply_overrides(config, &args),
        Err(e) => {
            eprintln!("❌ {e}");
            std::process::exit(1);
        }
    };

    let client = match HttpGameClient::new(config.api_base_url.clone(), config.request_timeout) {
        Ok(client) => Arc::new(client.with_ai_timeout(config.ai_request_timeout)),
        Err(e) => {
            eprintln!("❌ Failed to build HTTP client: {e}");
            std::process::exit(1);
        }
    };
    info!(
        api_base_url = %config.api_base_url,
        timeout_ms = config.request_timeout.as_millis() as u64,
        ai_timeout_ms = config.ai_request_timeout.as_millis() as u64,
        pacing_scale = config.pacing_scale,
        "Client configured"
    );

    let sink: Arc<dyn PresentationSink> = Arc::new(TerminalSink::new());
    let session = GameSession::new(client, sink)
        .with_pacing(config.pacing())
        .with_poll_interval(config.poll_interval);

    if args.usage_stats || args.reset_usage_stats {
        run_usage_command(&session, args.reset_usage_stats).await;
        return;
    }

    if session.connect().await.is_err() {
        eprintln!("❌ Is the game server running at {}?", config.api_base_url);
        std::process::exit(1);
    }

    let (tx, mut rx) = mpsc::channel::<String>(32);
    tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) => {
                    if tx.send(line).await.is_err() {
                        break;
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    warn!(error = %e, "Reading stdin failed");
                    break;
                }
            }
        }
    });

    let mut name = args.name.clone();
    loop {
        let candidate = match name.take() {
            Some(candidate) => candidate,
            None => {
                println!("Enter your name (1-10 letters or digits):");
                match rx.recv().await {
                    Some(line) => line,
                    None => return,
                }
            }
        };
        match session.start(&candidate).await {
            Ok(started) => {
                println!(
                    "You are a citizen. {} players are at the table.",
                    started.players.len()
                );
                break;
            }
            Err(InputError::InvalidName { reason }) => println!("{reason}"),
            Err(e) => {
                eprintln!("❌ Failed to start the game: {e}");
                std::process::exit(1);
            }
        }
    }

    let shutdown = CancellationToken::new();
    let ctrl_c = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            ctrl_c.cancel();
        }
    });

    session.run(rx, shutdown).await;
}

async fn run_usage_command(session: &GameSession, reset: bool) {
    if reset {
        match session.reset_usage_stats().await {
            Ok(()) => println!("Usage statistics reset."),
            Err(e) => {
                eprintln!("❌ Failed to reset usage statistics: {e}");
                std::process::exit(1);
            }
        }
        return;
    }
    match session.usage_stats().await {
        Ok(stats) => match serde_json::to_string_pretty(&stats) {
            Ok(pretty) => println!("{pretty}"),
            Err(_) => println!("{stats}"),
        },
        Err(e) => {
            eprintln!("❌ Failed to fetch usage statistics: {e}");
            std::process::exit(1);
        }
    }
}
