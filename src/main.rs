use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use parley::negotiation::NegotiationState;
use parley::{bootstrap, Config, Negotiator, SignalingChannel, WebRtcEngine};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "parley")]
#[command(about = "Peer-to-peer connection negotiator over a relay channel", long_about = None)]
struct Cli {
    /// Relay base URL, overriding the config file
    #[arg(long, global = true)]
    server: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Register with the relay and negotiate a connection
    Join,
    /// Print the resolved configuration
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let cli = Cli::parse();
    let config = Config::load()?;
    let base_url = cli
        .server
        .unwrap_or_else(|| config.relay.base_url.clone());

    match cli.command {
        Commands::Join => {
            let registration = bootstrap::register(&base_url)
                .await
                .context("Failed to register with relay")?;

            let engine = Arc::new(
                WebRtcEngine::new(
                    config.ice.stun_servers.clone(),
                    config.ice.candidate_pool_size,
                )
                .await
                .context("Failed to create media engine")?,
            );

            let ws = bootstrap::ws_url(&base_url, &registration);
            let (channel, channel_rx) = SignalingChannel::connect(&ws, registration.id.clone())
                .await
                .context("Failed to open signaling channel")?;

            let (negotiator, handle) =
                Negotiator::new(registration.id.clone(), engine, channel, channel_rx)
                    .await
                    .context("Failed to start negotiator")?;

            println!("Session id: {}", registration.id);
            println!("Relay: {}", base_url);

            let run = tokio::spawn(negotiator.run());

            // Report state transitions until the session ends or ctrl-c
            let mut watcher = handle.clone();
            tokio::select! {
                reached = watcher.wait_for(NegotiationState::Established) => {
                    if reached {
                        println!("Connection established");
                        // Stay up for the media path; negotiation itself is done
                        tokio::signal::ctrl_c().await?;
                    }
                }
                _ = tokio::signal::ctrl_c() => {
                    println!("Interrupted");
                }
            }

            handle.close();
            match run.await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => return Err(e).context("Negotiation failed"),
                Err(e) => return Err(e).context("Negotiator task panicked"),
            }
        }
        Commands::Config => {
            println!("Config file: {}", parley::config::get_config_path().display());
            println!("Relay base URL: {}", config.relay.base_url);
            println!("STUN servers:");
            for server in &config.ice.stun_servers {
                println!("  {}", server);
            }
            println!("Candidate pool size: {}", config.ice.candidate_pool_size);
        }
    }

    Ok(())
}
