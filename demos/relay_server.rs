//! Relay server
//!
//! Run with: cargo run --example relay_server
//!
//! Configuration comes from the environment:
//!
//! - `APP_PORT`: listen address, e.g. `:9000`, `9000` or `127.0.0.1:9000`
//!   (default `:9000`)
//! - `BYTE_LIMIT`: per-connection upload and download quota in bytes
//!   (default 100)
//! - `RUST_LOG`: log filter, e.g. `byte_relay=debug`
//!
//! Connect two or more clients (`nc localhost 9000`, or the `relay_client`
//! example) and whatever one types shows up on the others.

use byte_relay::{HubConfig, RelayServer, ServerConfig};

fn init_tracing() -> Result<(), Box<dyn std::error::Error>> {
    use tracing_subscriber::EnvFilter;

    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::new("info").add_directive("byte_relay=debug".parse()?),
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing()?;

    let config = ServerConfig::from_env();
    let hub_config = HubConfig::from_env();

    println!("Starting relay server on {}", config.bind_addr);
    println!("Byte limit per connection: {}", hub_config.byte_quota);
    println!();
    println!("Connect with: nc <host> <port> (listening on {})", config.bind_addr);
    println!();

    let server = RelayServer::new(config, hub_config);

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            eprintln!("Failed to listen for Ctrl+C: {}", e);
        }
        println!("\nShutting down...");
    };

    if let Err(e) = server.run_until(shutdown).await {
        eprintln!("Server error: {}", e);
        std::process::exit(1);
    }

    Ok(())
}
