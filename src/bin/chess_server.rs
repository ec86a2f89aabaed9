use std::path::Path;
use std::sync::Arc;
use anyhow::{Context, Result};
use chess_rooms::config::ServerConfig;
use chess_rooms::servers::ServerState;

const DEFAULT_CONF: &str = "conf/server.yaml";

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_ansi(std::io::IsTerminal::is_terminal(&std::io::stderr()))
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let mut conf_file: Option<String> = None;

    let args: Vec<String> = std::env::args().collect();
    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--help" | "--h" | "--?" | "/?" => {
                println!("Usage: chess_server [--conf FILE]");
                return Ok(());
            }
            "--conf" => {
                if i + 1 < args.len() {
                    i += 1;
                    conf_file = Some(args[i].clone());
                } else {
                    eprintln!("Error: --conf requires a FILE argument");
                    return Ok(());
                }
            }
            other => tracing::warn!("[server] [unknown_arg] arg={}", other),
        }
        i += 1;
    }

    let config = match conf_file {
        Some(path) => ServerConfig::from_file(&path)
            .with_context(|| format!("Cannot load config: {}", path))?,
        None if Path::new(DEFAULT_CONF).exists() => ServerConfig::from_file(DEFAULT_CONF)
            .with_context(|| format!("Cannot load config: {}", DEFAULT_CONF))?,
        None => {
            tracing::info!("[server] [config] {} not found, using defaults", DEFAULT_CONF);
            ServerConfig::default()
        }
    };

    tracing::info!("[server] [started] Chess Server Started");

    let bind = config.bind_addr();
    let state = Arc::new(ServerState::new(config));

    let signal_state = Arc::clone(&state);
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                tracing::info!("[server] [shutdown] interrupt received");
                signal_state.request_shutdown();
            }
            Err(e) => tracing::error!("[server] [signal_failed] err={}", e),
        }
    });

    ServerState::run(state, &bind).await?;
    Ok(())
}
