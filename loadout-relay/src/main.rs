//! Loadout relay — standalone room-keyed event fan-out server.
//!
//! Bind address comes from `LOADOUT_BIND` (default `127.0.0.1:9090`);
//! log filtering via `RUST_LOG` as usual.

use loadout_collab::server::{RelayConfig, RelayServer};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let bind_addr =
        std::env::var("LOADOUT_BIND").unwrap_or_else(|_| "127.0.0.1:9090".to_string());
    let config = RelayConfig {
        bind_addr,
        ..RelayConfig::default()
    };

    let relay = RelayServer::new(config);
    log::info!("Starting relay on {}", relay.bind_addr());
    relay.run().await
}
