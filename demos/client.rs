//! Echo client.
//!
//! Demonstrates:
//! - Connecting over `ws://` or `wss://` with a self-signed certificate
//! - Running the read loop on its own task
//! - Writing from the main task while reading
//!
//! Start `echo_server` first.
//!
//! Usage:
//!   cargo run --example client
//!   cargo run --example client -- --tls

mod common;

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;
use std::time::Duration;

use common::Args;
use wsduplex::{Client, Result, self_signed_dialer};

// ============================================================================
// Constants
// ============================================================================

const MESSAGES: &[&str] = &["first", "second", "third"];

// ============================================================================
// Main
// ============================================================================

#[tokio::main]
async fn main() {
    let args = Args::parse();
    common::init_logging(args.debug);

    if let Err(e) = run(args).await {
        eprintln!("\n[ERROR] {e}");
        std::process::exit(1);
    }
}

async fn run(args: Args) -> Result<()> {
    println!("=== Echo Client ===\n");

    let target = format!("localhost:{}", args.port());
    let client = if args.tls {
        let client = Client::with_dialer(self_signed_dialer(common::CERT_PATH)?);
        client.connect_secure(&target, "/").await?;
        client
    } else {
        let client = Client::new();
        client.connect(&target, "/").await?;
        client
    };
    let client = Arc::new(client);
    println!("[1] Connected to {target}\n");

    let reader = Arc::clone(&client);
    let read_task = tokio::spawn(async move {
        reader
            .read_loop(|data| println!("    [>] {}", String::from_utf8_lossy(&data)))
            .await
    });

    println!("[2] Sending {} messages...", MESSAGES.len());
    for message in MESSAGES {
        client.write(message.as_bytes().to_vec()).await?;
    }

    tokio::time::sleep(Duration::from_millis(500)).await;

    println!("\n[3] Closing...");
    client.close().await;
    if let Ok(result) = read_task.await {
        result?;
    }

    println!("\n=== Done ===");
    Ok(())
}
