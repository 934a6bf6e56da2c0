use crate::Ledger;
use futures_util::{SinkExt, StreamExt};
use std::net::SocketAddr;
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::{accept_async, tungstenite::Message};
use tracing::{info, warn};
use uuid::Uuid;
use voting_common::{decode_frame, send_message_to_peer, Request, VotingError};

/// Websocket front of a ledger. Each connection carries bincode `Request` frames and
/// receives one `Response` frame per request, in request order. A frame that does not
/// decode closes the connection.
pub struct LedgerNetwork {
    ledger: Ledger,
}

impl LedgerNetwork {
    pub fn new(ledger: Ledger) -> Self {
        Self { ledger }
    }

    /// Binds `address` and serves connections in the background. Returns the bound
    /// address, which differs from `address` when port 0 was requested.
    pub async fn listen(&self, address: &str) -> Result<SocketAddr, VotingError> {
        let listener = TcpListener::bind(address)
            .await
            .map_err(|e| VotingError::NetworkError(e.to_string()))?;
        let local_addr = listener
            .local_addr()
            .map_err(|e| VotingError::NetworkError(e.to_string()))?;

        let ledger = self.ledger.clone();
        tokio::spawn(async move {
            while let Ok((stream, peer)) = listener.accept().await {
                let ledger = ledger.clone();
                tokio::spawn(async move {
                    serve_connection(ledger, stream, peer).await;
                });
            }
        });

        info!("WebSocket server listening on {}", local_addr);
        Ok(local_addr)
    }
}

async fn serve_connection(ledger: Ledger, stream: TcpStream, peer: SocketAddr) {
    let ws_stream = match accept_async(stream).await {
        Ok(ws_stream) => ws_stream,
        Err(e) => {
            warn!("Handshake with {} failed: {}", peer, e);
            return;
        }
    };
    let session_id = Uuid::new_v4();
    let (mut sink, mut read) = ws_stream.split();
    info!("Session with ID {:?} opened from {}", session_id, peer);

    while let Some(frame) = read.next().await {
        match frame {
            Ok(Message::Binary(data)) => match decode_frame::<Request>(&data) {
                Ok(request) => {
                    let response = ledger.handle_request(request).await;
                    if let Err(e) = send_message_to_peer(&mut sink, &response).await {
                        warn!("Failed to reply on session {}: {}", session_id, e);
                        break;
                    }
                }
                Err(e) => {
                    warn!("Closing session {}, undecodable request: {}", session_id, e);
                    break;
                }
            },
            Ok(Message::Close(_)) => break,
            Ok(_) => {}
            Err(e) => {
                warn!("Session {} read error: {}", session_id, e);
                break;
            }
        }
    }
    let _ = sink.close().await;
    info!("Session with ID {:?} terminated", session_id);
}
