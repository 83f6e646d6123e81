//! # WebSocket Front End
//!
//! Accepts WebSocket connections, registers each as a subscriber, feeds its
//! text frames to command dispatch and removes it from the hub when the
//! socket closes. Holds no membership state of its own.

use std::net::SocketAddr;

use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::broadcast;
use tokio_tungstenite::{accept_async, tungstenite::Message};

use super::errors::{TransportError, TransportResult};
use crate::command::{apply, ApplyReport, CommandUnit};
use crate::config::ServerConfig;
use crate::hub::{SharedHub, SubscriberHandle};

/// WebSocket server
pub struct WebSocketServer {
    config: ServerConfig,
    hub: SharedHub,
    shutdown_tx: broadcast::Sender<()>,
}

impl WebSocketServer {
    pub fn new(config: ServerConfig, hub: SharedHub) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);

        Self {
            config,
            hub,
            shutdown_tx,
        }
    }

    /// Accept connections until `shutdown` is called
    pub async fn run(&self) -> TransportResult<()> {
        let addr = self.config.socket_addr();
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|e| TransportError::Bind {
                addr: addr.clone(),
                reason: e.to_string(),
            })?;
        self.serve(listener).await
    }

    /// Accept connections on an already bound listener
    pub async fn serve(&self, listener: TcpListener) -> TransportResult<()> {
        if let Ok(addr) = listener.local_addr() {
            tracing::info!(addr = %addr, "WebSocket server listening");
        }

        let monitor = self.hub.spawn_monitor(self.config.monitor_period());
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        loop {
            tokio::select! {
                accept_result = listener.accept() => {
                    match accept_result {
                        Ok((stream, peer_addr)) => {
                            let hub = self.hub.clone();
                            let welcome = self.config.welcome_message.clone();

                            tokio::spawn(async move {
                                if let Err(e) = handle_connection(stream, peer_addr, hub, welcome).await {
                                    tracing::debug!(peer = %peer_addr, error = %e, "Connection error");
                                }
                            });
                        }
                        Err(e) => {
                            tracing::error!(error = %e, "Failed to accept connection");
                        }
                    }
                }

                _ = shutdown_rx.recv() => {
                    tracing::info!("WebSocket server shutting down");
                    break;
                }
            }
        }

        monitor.abort();
        self.hub.with(|h| h.shutdown())?;
        Ok(())
    }

    /// Stop the accept loop
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(());
    }
}

/// Decode one text frame and apply it for `sender`
///
/// A malformed unit is dropped whole with a warning; the sender gets no
/// reply.
pub fn handle_frame(hub: &SharedHub, sender: &SubscriberHandle, text: &str) -> Option<ApplyReport> {
    let unit = match CommandUnit::decode(text) {
        Ok(unit) => unit,
        Err(e) => {
            tracing::warn!(subscriber = %sender.id(), error = %e, "Rejected command unit");
            return None;
        }
    };

    match hub.with(|h| apply(h, sender, &unit)) {
        Ok(report) => Some(report),
        Err(e) => {
            tracing::error!(subscriber = %sender.id(), error = %e, "Failed to apply command unit");
            None
        }
    }
}

async fn handle_connection(
    stream: TcpStream,
    peer_addr: SocketAddr,
    hub: SharedHub,
    welcome: Option<String>,
) -> TransportResult<()> {
    let ws_stream = accept_async(stream)
        .await
        .map_err(|e| TransportError::Handshake(e.to_string()))?;
    let (mut ws_sender, mut ws_receiver) = ws_stream.split();

    let (handle, mut outbound) = hub.with(|h| h.connect())?;
    tracing::debug!(subscriber = %handle.id(), peer = %peer_addr, "Client connected");

    if let Some(text) = welcome {
        handle.send(text);
    }

    loop {
        tokio::select! {
            msg = ws_receiver.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        handle_frame(&hub, &handle, &text);
                    }
                    Some(Ok(Message::Ping(data))) => {
                        if let Err(e) = ws_sender.send(Message::Pong(data)).await {
                            tracing::debug!(subscriber = %handle.id(), error = %e, "Failed to send pong");
                            break;
                        }
                    }
                    Some(Ok(Message::Binary(_))) => {
                        tracing::debug!(subscriber = %handle.id(), "Ignoring binary frame");
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(e)) => {
                        tracing::debug!(subscriber = %handle.id(), error = %e, "WebSocket receive error");
                        break;
                    }
                    _ => {}
                }
            }

            Some(frame) = outbound.recv() => {
                if let Err(e) = ws_sender.send(Message::Text(frame)).await {
                    tracing::debug!(subscriber = %handle.id(), error = %e, "Failed to send frame");
                    break;
                }
            }
        }
    }

    handle.close();
    hub.with(|h| h.remove_subscriber(handle.id()))?;
    tracing::debug!(subscriber = %handle.id(), peer = %peer_addr, "Client disconnected");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hub::{Hub, LogicalId};

    #[test]
    fn test_handle_frame_applies_unit() {
        let hub = SharedHub::new(Hub::new());
        let (a, _ra) = hub.with(|h| h.connect()).unwrap();

        let report = handle_frame(
            &hub,
            &a,
            r#"[{"MESSAGE_ROLE": "SUBSCRIBE", "CHANNEL_NAME": ["room"], "LOGICAL_ID": "u1"}]"#,
        )
        .unwrap();

        assert_eq!(report.subscribed, 1);
        let member = hub
            .with(|h| h.registry().is_member(a.id(), "room", &LogicalId::from("u1")))
            .unwrap();
        assert!(member);
    }

    #[test]
    fn test_malformed_frame_changes_nothing() {
        let hub = SharedHub::new(Hub::new());
        let (a, mut ra) = hub.with(|h| h.connect()).unwrap();

        let text = r#"[
            {"MESSAGE_ROLE": "SUBSCRIBE", "CHANNEL_NAME": ["room"], "LOGICAL_ID": "u1"},
            {"MESSAGE_ROLE": "SUBSCRIBE", "CHANNEL_NAME": ["room"]}
        ]"#;
        assert!(handle_frame(&hub, &a, text).is_none());

        let snapshot = hub.with(|h| h.snapshot()).unwrap();
        assert_eq!(snapshot.channel_count, 0);
        assert!(ra.try_recv().is_err());
    }
}
