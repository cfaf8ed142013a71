//! Server handler driven over in-memory streams.

mod common;

use std::net::SocketAddr;
use std::time::Duration;

use anyhow::{Context, Result};
use futures_util::{SinkExt, StreamExt};
use tokio::io::{DuplexStream, duplex};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::{self, Message, http::StatusCode};
use tokio_tungstenite::{WebSocketStream, client_async};
use wsduplex::{ClientId, Error, FrameKind, Handler, Server};

use common::WAIT;

/// Starts `handler` on one end of a pipe; returns the other end.
fn accept(
    handler: &Handler,
    peer: &str,
) -> Result<(DuplexStream, JoinHandle<wsduplex::Result<()>>)> {
    let peer: SocketAddr = peer.parse()?;
    let (client_io, server_io) = duplex(64 * 1024);
    let handler = handler.clone();
    let task = tokio::spawn(async move { handler.handle(server_io, peer).await });
    Ok((client_io, task))
}

/// Upgrades the client end of a pipe.
async fn upgrade(
    io: DuplexStream,
    path: &str,
) -> std::result::Result<WebSocketStream<DuplexStream>, tungstenite::Error> {
    let url = format!("ws://localhost{path}");
    client_async(url.as_str(), io).await.map(|(ws, _)| ws)
}

#[tokio::test]
async fn test_peer_ip_becomes_client_id() -> Result<()> {
    common::init_tracing();
    let server = Server::new();

    let (io, task) = accept(&server.handler(), "10.1.2.3:5000")?;
    let mut ws = upgrade(io, "/").await?;
    common::wait_until(|| server.is_connected("10.1.2.3")).await?;
    assert_eq!(server.client_ids(), vec![ClientId::new("10.1.2.3")]);

    ws.close(None).await?;
    timeout(WAIT, task).await??.context("handler result")?;
    assert_eq!(server.connection_count(), 0);
    Ok(())
}

#[tokio::test]
async fn test_second_connection_from_same_host_gets_duplicate_id() -> Result<()> {
    common::init_tracing();
    let server = Server::new();
    let handler = server.handler();

    let (io, first) = accept(&handler, "10.1.2.3:5000")?;
    let mut ws = upgrade(io, "/").await?;
    common::wait_until(|| server.is_connected("10.1.2.3")).await?;

    let (io, second) = accept(&handler, "10.1.2.3:5001")?;
    match upgrade(io, "/").await {
        Err(tungstenite::Error::Http(response)) => {
            assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        }
        Err(e) => panic!("expected 400 rejection, got {e}"),
        Ok(_) => panic!("expected 400 rejection, upgrade succeeded"),
    }
    let result = timeout(WAIT, second).await??;
    assert!(matches!(result, Err(Error::DuplicateId { .. })));

    // The first registration survives the rejected attempt
    assert_eq!(server.client_ids(), vec![ClientId::new("10.1.2.3")]);
    server.send("10.1.2.3", vec![5]).await?;
    let frame = ws.next().await.context("stream ended")??;
    assert_eq!(frame, Message::binary(vec![5]));

    ws.close(None).await?;
    timeout(WAIT, first).await??.context("first handler")?;
    Ok(())
}

#[tokio::test]
async fn test_concurrent_upgrades_single_winner() -> Result<()> {
    common::init_tracing();
    let server = Server::new();
    let handler = server.handler();

    let attempts: Vec<_> = (0..4)
        .map(|port| accept(&handler, &format!("10.7.7.7:{}", 6000 + port)))
        .collect::<Result<_>>()?;

    // Start every handler before any handshake is sent
    let (ios, tasks): (Vec<_>, Vec<_>) = attempts.into_iter().unzip();
    let upgrades = ios.into_iter().map(|io| tokio::spawn(upgrade(io, "/")));

    let mut winners = Vec::new();
    for outcome in futures_util::future::join_all(upgrades).await {
        if let Ok(ws) = outcome? {
            winners.push(ws);
        }
    }
    assert_eq!(winners.len(), 1);

    let mut duplicates = 0;
    for task in tasks {
        // The winner is still serving and times out here
        let outcome = timeout(WAIT / 5, task).await;
        if matches!(outcome, Ok(Ok(Err(Error::DuplicateId { .. })))) {
            duplicates += 1;
        }
    }
    assert_eq!(duplicates, 3);
    assert_eq!(server.connection_count(), 1);

    for mut ws in winners {
        ws.close(None).await?;
    }
    common::wait_until(|| server.connection_count() == 0).await?;
    Ok(())
}

#[tokio::test]
async fn test_send_to_unknown_id_leaves_registry_untouched() -> Result<()> {
    common::init_tracing();
    let server = Server::new();

    let (io, task) = accept(&server.handler(), "10.0.0.8:4000")?;
    let mut ws = upgrade(io, "/").await?;
    common::wait_until(|| server.is_connected("10.0.0.8")).await?;

    let result = server.send("unknown-id", vec![1, 2, 3]).await;
    assert!(matches!(result, Err(Error::InvalidId { .. })));
    assert_eq!(server.client_ids(), vec![ClientId::new("10.0.0.8")]);

    server.send("10.0.0.8", vec![4]).await?;
    assert_eq!(ws.next().await.context("stream ended")??, Message::binary(vec![4]));

    ws.close(None).await?;
    timeout(WAIT, task).await??.context("handler result")?;
    Ok(())
}

#[tokio::test]
async fn test_text_frame_ends_connection() -> Result<()> {
    common::init_tracing();
    let server = Server::new();

    let (io, task) = accept(&server.handler(), "10.0.0.9:4000")?;
    let mut ws = upgrade(io, "/").await?;
    ws.send(Message::text("hello")).await?;

    let result = timeout(WAIT, task).await??;
    assert!(matches!(
        result,
        Err(Error::UnexpectedFrameType {
            kind: FrameKind::Text
        })
    ));
    assert_eq!(server.connection_count(), 0);
    Ok(())
}

#[tokio::test]
async fn test_abrupt_disconnect_releases_id() -> Result<()> {
    common::init_tracing();
    let (tx, mut rx) = mpsc::unbounded_channel();
    let server = Server::builder()
        .on_connect(move |id| {
            let _ = tx.send(id.clone());
        })
        .build()?;

    let (io, task) = accept(&server.handler(), "10.0.0.10:4000")?;
    let ws = upgrade(io, "/").await?;
    timeout(WAIT, rx.recv()).await?.context("hook dropped")?;
    drop(ws);

    let result = timeout(WAIT, task).await??;
    assert!(matches!(result, Err(Error::WebSocket(_))));
    assert!(!server.is_connected("10.0.0.10"));

    // The id is free again
    let (io, task) = accept(&server.handler(), "10.0.0.10:4001")?;
    let mut ws = upgrade(io, "/").await?;
    ws.close(None).await?;
    timeout(WAIT, task).await??.context("handler result")?;
    Ok(())
}

#[tokio::test]
async fn test_wrong_path_releases_id() -> Result<()> {
    common::init_tracing();
    let server = Server::builder().path("/ws").build()?;

    let (io, task) = accept(&server.handler(), "10.0.0.11:4000")?;
    match upgrade(io, "/nope").await {
        Err(tungstenite::Error::Http(response)) => {
            assert_eq!(response.status(), StatusCode::NOT_FOUND);
        }
        Err(e) => panic!("expected 404 rejection, got {e}"),
        Ok(_) => panic!("expected 404 rejection, upgrade succeeded"),
    }
    let result = timeout(WAIT, task).await??;
    assert!(matches!(result, Err(Error::WebSocket(_))));

    let (io, task) = accept(&server.handler(), "10.0.0.11:4001")?;
    let mut ws = upgrade(io, "/ws").await?;
    ws.close(None).await?;
    timeout(WAIT, task).await??.context("handler result")?;
    Ok(())
}

#[tokio::test]
async fn test_silent_peer_does_not_block_its_id() -> Result<()> {
    common::init_tracing();
    let server = Server::builder()
        .handshake_timeout(Duration::from_millis(300))
        .build()?;
    let handler = server.handler();

    // Connected but never sends an upgrade request
    let (_silent_io, silent) = accept(&handler, "10.0.0.12:4000")?;

    let (io, task) = accept(&handler, "10.0.0.12:4001")?;
    let mut ws = upgrade(io, "/").await?;
    common::wait_until(|| server.is_connected("10.0.0.12")).await?;

    let result = timeout(WAIT, silent).await??;
    assert!(matches!(
        result,
        Err(Error::ConnectionTimeout { timeout_ms: 300 })
    ));
    assert_eq!(server.client_ids(), vec![ClientId::new("10.0.0.12")]);

    ws.close(None).await?;
    timeout(WAIT, task).await??.context("handler result")?;
    Ok(())
}

#[tokio::test]
async fn test_disconnect_ends_handler_without_client_reply() -> Result<()> {
    common::init_tracing();
    let server = Server::new();

    let (io, task) = accept(&server.handler(), "10.0.0.13:4000")?;
    // Held open but never polled, so the close is never answered
    let _ws = upgrade(io, "/").await?;
    common::wait_until(|| server.is_connected("10.0.0.13")).await?;

    timeout(WAIT, server.disconnect("10.0.0.13")).await??;
    timeout(WAIT, task).await??.context("handler result")?;
    assert_eq!(server.connection_count(), 0);
    assert!(server.send("10.0.0.13", vec![1]).await.is_err());
    Ok(())
}

#[tokio::test]
async fn test_upgrade_after_shutdown_is_closed() -> Result<()> {
    common::init_tracing();
    let (tx, mut rx) = mpsc::unbounded_channel();
    let server = Server::builder()
        .on_connect(move |id| {
            let _ = tx.send(id.clone());
        })
        .build()?;
    server.shutdown().await;

    let (io, task) = accept(&server.handler(), "10.0.0.14:4000")?;
    let mut ws = upgrade(io, "/").await?;

    timeout(WAIT, task).await??.context("handler result")?;
    assert_eq!(server.connection_count(), 0);
    assert!(rx.try_recv().is_err());

    let frame = timeout(WAIT, ws.next()).await?.context("stream ended")??;
    assert!(frame.is_close());
    Ok(())
}
