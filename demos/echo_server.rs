//! Echo server.
//!
//! Demonstrates:
//! - Building a server with connect and receive hooks
//! - Pushing frames back to a client by id
//! - Plain and TLS serving
//! - Graceful shutdown on Ctrl+C
//!
//! Usage:
//!   cargo run --example echo_server
//!   cargo run --example echo_server -- --tls
//!   cargo run --example echo_server -- --debug

mod common;

// ============================================================================
// Imports
// ============================================================================

use common::Args;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use wsduplex::{Result, Server, tls};

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
    println!("=== Echo Server ===\n");

    // Hooks run on read loops; hand frames to a task that writes them back
    let (echo_tx, mut echo_rx) = mpsc::unbounded_channel();
    let server = Server::builder()
        .on_connect(|id| println!("[+] {id} connected"))
        .on_receive(move |id, data| {
            println!("[<] {id}: {} bytes", data.len());
            let _ = echo_tx.send((id.clone(), data));
        })
        .build()?;

    tokio::spawn({
        let server = server.clone();
        async move {
            while let Some((id, data)) = echo_rx.recv().await {
                if let Err(e) = server.send(&id, data).await {
                    println!("[!] echo to {id} failed: {e}");
                }
            }
        }
    });

    let acceptor = if args.tls {
        Some(tls::acceptor(common::CERT_PATH, common::KEY_PATH)?)
    } else {
        None
    };
    let scheme = if acceptor.is_some() { "wss" } else { "ws" };

    let listener = TcpListener::bind(("127.0.0.1", args.port())).await?;
    let serving = tokio::spawn({
        let server = server.clone();
        async move {
            match acceptor {
                Some(acceptor) => server.serve_tls(listener, acceptor).await,
                None => server.serve(listener).await,
            }
        }
    });

    println!("Listening on {scheme}://127.0.0.1:{}/", args.port());
    println!("Press Ctrl+C to exit...");
    tokio::signal::ctrl_c().await.ok();

    server.shutdown().await;
    if let Ok(result) = serving.await {
        result?;
    }
    println!("\n=== Done ===");
    Ok(())
}
