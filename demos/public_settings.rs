//! Connect to a DDP server and fetch its public settings.
//!
//! Demonstrates:
//! - Building a controller and connecting with the handshake
//! - Sending a method call and reading the classified response
//! - Disconnecting cleanly
//!
//! Usage:
//!   cargo run --example public_settings
//!   cargo run --example public_settings -- ws://localhost:3000/websocket
//!   cargo run --example public_settings -- --debug

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use ddp_socket::{Controller, Result};
use serde_json::json;
use tracing_subscriber::EnvFilter;

// ============================================================================
// Constants
// ============================================================================

const DEFAULT_ADDRESS: &str = "ws://localhost:3000/websocket";

/// The controller has no request timeout; the demo layers its own.
const RESPONSE_TIMEOUT: Duration = Duration::from_secs(15);

// ============================================================================
// Main
// ============================================================================

#[tokio::main]
async fn main() {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let debug = args.iter().any(|a| a == "--debug");
    let address = args
        .iter()
        .find(|a| !a.starts_with("--"))
        .cloned()
        .unwrap_or_else(|| DEFAULT_ADDRESS.to_string());

    init_logging(debug);

    if let Err(e) = run(&address).await {
        eprintln!("\n[ERROR] {e}");
        std::process::exit(1);
    }
}

async fn run(address: &str) -> Result<()> {
    println!("=== DDP public settings ===\n");

    let controller = Controller::builder().build()?;

    println!("[Connect] {address}");
    let outcome = controller.connect(address)?.await?;
    if !outcome.connected {
        println!(
            "          ✗ not connected: {}",
            outcome.error.as_deref().unwrap_or("unknown reason")
        );
        return Ok(());
    }
    println!("          ✓ session {}\n", outcome.session);

    println!("[Method] public-settings/get");
    let handle = controller.send(&json!({
        "msg": "method",
        "method": "public-settings/get",
        "params": [],
    }))?;

    match tokio::time::timeout(RESPONSE_TIMEOUT, handle).await {
        Ok(response) => {
            let response = response?;
            if response.is_error() {
                println!("          ✗ server error: {:?}", response.envelope().get("error"));
            } else {
                let count = response
                    .envelope()
                    .get("result")
                    .and_then(|r| r.as_array())
                    .map_or(0, Vec::len);
                println!("          ✓ {count} settings");
            }
        }
        Err(_) => println!("          ✗ no response within {RESPONSE_TIMEOUT:?}"),
    }

    println!("\n[Disconnect]");
    controller.disconnect()?.await?;
    println!("          ✓ closed");

    Ok(())
}

/// Initialize tracing/logging.
fn init_logging(debug: bool) {
    let filter = if debug {
        "ddp_socket=debug"
    } else {
        "ddp_socket=info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_target(false)
        .init();
}
