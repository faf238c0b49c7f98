use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use broadcast_hub::client;
use broadcast_hub::config::{ClientConfig, ServerConfig, DEFAULT_HOST, DEFAULT_PORT};
use broadcast_hub::error::HubError;
use broadcast_hub::protocol::DEFAULT_NAME;
use broadcast_hub::server::Server;

/// Simple WebSocket broadcast server and client
#[derive(Parser, Debug)]
#[command(name = "broadcast-hub", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the broadcast server
    Start {
        /// Host to bind server [default: 127.0.0.1, or BROADCAST_HOST]
        #[arg(long)]
        host: Option<String>,

        /// Port to bind server [default: 8765, or BROADCAST_PORT]
        #[arg(long)]
        port: Option<u16>,
    },
    /// Connect as a client
    Connect {
        /// Server host
        #[arg(long, default_value = DEFAULT_HOST)]
        host: String,

        /// Server port
        #[arg(long, default_value_t = DEFAULT_PORT)]
        port: u16,

        /// Display name
        #[arg(long, default_value = DEFAULT_NAME)]
        name: String,
    },
}

#[tokio::main]
async fn main() {
    // Load .env file if present (before any env var reads)
    if let Err(e) = dotenvy::dotenv() {
        if !matches!(e, dotenvy::Error::Io(_)) {
            eprintln!("Warning: Failed to load .env file: {}", e);
        }
    }

    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "broadcast_hub=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    match cli.command {
        Command::Start { host, port } => start(host, port).await,
        Command::Connect { host, port, name } => connect(ClientConfig { host, port, name }).await,
    }
}

async fn start(host: Option<String>, port: Option<u16>) {
    let config = ServerConfig::from_env().with_overrides(host, port);
    println!("Starting broadcast server on ws://{}", config.bind_address());

    let server = match Server::bind(&config).await {
        Ok(server) => server,
        Err(e) => {
            tracing::error!(error = %e, "Failed to start server");
            std::process::exit(1);
        }
    };
    println!("Server is running. Press Ctrl+C to stop.");

    let result = server
        .run(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "Failed to listen for Ctrl+C");
                std::future::pending::<()>().await;
            }
            println!("\nShutting down...");
        })
        .await;

    if let Err(e) = result {
        tracing::error!(error = %e, "Server stopped with an error");
        std::process::exit(1);
    }
}

async fn connect(config: ClientConfig) {
    tokio::select! {
        result = client::run_client(&config) => match result {
            Ok(()) => {}
            Err(HubError::Connect { source, .. }) => {
                println!("Could not connect to server: {}", source);
            }
            Err(e) => println!("Connection closed: {}", e),
        },
        _ = tokio::signal::ctrl_c() => println!("\nShutting down..."),
    }

    // A pending stdin read would otherwise keep the runtime from shutting down
    std::process::exit(0);
}
