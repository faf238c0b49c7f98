//! Interactive line-based client for the `connect` command.

use futures::{SinkExt, StreamExt};
use std::io::Write;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio_tungstenite::{connect_async, tungstenite::Message};

use crate::config::ClientConfig;
use crate::error::{HubError, HubResult};
use crate::protocol;

const QUIT_COMMANDS: [&str; 2] = ["/quit", "/exit"];

/// Connect to a server and chat using lines from stdin
pub async fn run_client(config: &ClientConfig) -> HubResult<()> {
    run_client_with_input(config, BufReader::new(tokio::io::stdin())).await
}

/// Same as [`run_client`], reading lines from `input`.
///
/// Returns when the user quits, input ends, or the server goes away.
pub async fn run_client_with_input<R>(config: &ClientConfig, input: R) -> HubResult<()>
where
    R: AsyncBufRead + Unpin,
{
    let url = config.url();
    println!("Connecting to {} ...", url);

    let (socket, _) = connect_async(url.as_str())
        .await
        .map_err(|source| HubError::Connect {
            url: url.clone(),
            source,
        })?;
    println!("Connected. Type /quit to exit.");

    let (mut write, mut read) = socket.split();
    write
        .send(Message::Text(protocol::name_frame(&config.name)))
        .await
        .map_err(|source| HubError::Connect {
            url: url.clone(),
            source,
        })?;

    let receiver = async {
        while let Some(msg) = read.next().await {
            match msg {
                Ok(Message::Text(text)) => println!("\n{}", text),
                Ok(Message::Close(_)) => break,
                Ok(_) => {}
                Err(e) => {
                    tracing::debug!(error = %e, "Receive failed");
                    break;
                }
            }
        }
        println!("Server closed the connection.");
    };

    let prompt = format!("{}> ", config.name);
    let sender = async {
        let mut lines = input.lines();
        loop {
            print!("{}", prompt);
            let _ = std::io::stdout().flush();

            // EOF behaves like /quit
            let line = match lines.next_line().await {
                Ok(Some(line)) => line,
                Ok(None) | Err(_) => QUIT_COMMANDS[0].to_string(),
            };
            let text = line.trim();
            if text.is_empty() {
                continue;
            }

            if QUIT_COMMANDS.contains(&text.to_lowercase().as_str()) {
                let _ = write.close().await;
                break;
            }

            if write.send(Message::Text(text.to_string())).await.is_err() {
                println!("Disconnected from server.");
                break;
            }
        }
    };

    // Whichever side finishes first ends the session
    tokio::select! {
        _ = receiver => {}
        _ = sender => {}
    }

    Ok(())
}
