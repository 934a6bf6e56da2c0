use async_trait::async_trait;
use dashmap::DashMap;
use futures_util::stream::SplitSink;
use futures_util::StreamExt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::{oneshot, Mutex};
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};
use tracing::{info, warn};
use voting_common::{
    decode_frame, send_message_to_peer, Call, Identity, LedgerApi, Reply, Request, RequestId,
    Response, VotingError,
};

type WsSink = SplitSink<WebSocketStream<MaybeTlsStream<TcpStream>>, Message>;
type PendingReplies = Arc<DashMap<RequestId, oneshot::Sender<Response>>>;

/// Connection to a remote ledger. Calls are multiplexed over one websocket and matched
/// to their responses by request id.
pub struct LedgerConnection {
    sink: Mutex<WsSink>,
    pending: PendingReplies,
    next_id: AtomicU64,
    reply_timeout: Duration,
}

impl LedgerConnection {
    pub const DEFAULT_REPLY_TIMEOUT: Duration = Duration::from_secs(10);

    /// Connects to the ledger at `url` and spawns a task that routes its responses.
    pub async fn connect(url: &str) -> Result<Self, VotingError> {
        let (ws_stream, _) = connect_async(url)
            .await
            .map_err(|e| VotingError::NetworkError(e.to_string()))?;
        let (sink, mut stream) = ws_stream.split();
        let pending: PendingReplies = Arc::new(DashMap::new());

        let replies = pending.clone();
        tokio::spawn(async move {
            while let Some(Ok(frame)) = stream.next().await {
                if let Message::Binary(data) = frame {
                    match decode_frame::<Response>(&data) {
                        Ok(response) => match replies.remove(&response.id) {
                            Some((_, tx)) => {
                                let _ = tx.send(response);
                            }
                            None => warn!("Reply for unknown request {}", response.id),
                        },
                        Err(e) => warn!("Failed to deserialize response: {}", e),
                    }
                }
            }
            // Dropping the senders fails every call still waiting.
            replies.clear();
            info!("Ledger connection closed");
        });

        info!("Connected to ledger at {}", url);
        Ok(LedgerConnection {
            sink: Mutex::new(sink),
            pending,
            next_id: AtomicU64::new(0),
            reply_timeout: Self::DEFAULT_REPLY_TIMEOUT,
        })
    }

    pub fn with_reply_timeout(mut self, reply_timeout: Duration) -> Self {
        self.reply_timeout = reply_timeout;
        self
    }
}

#[async_trait]
impl LedgerApi for LedgerConnection {
    async fn execute(&self, caller: Identity, call: Call) -> Result<Reply, VotingError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = oneshot::channel();
        self.pending.insert(id, tx);

        let request = Request { id, caller, call };
        let sent = {
            let mut sink = self.sink.lock().await;
            send_message_to_peer(&mut *sink, &request).await
        };
        if let Err(e) = sent {
            self.pending.remove(&id);
            return Err(e);
        }

        match tokio::time::timeout(self.reply_timeout, rx).await {
            Ok(Ok(response)) => response.result,
            Ok(Err(_)) => Err(VotingError::NetworkError(
                "Connection dropped before reply".to_string(),
            )),
            Err(_) => {
                self.pending.remove(&id);
                Err(VotingError::NetworkError(format!(
                    "No reply to request {id} within {:?}",
                    self.reply_timeout
                )))
            }
        }
    }
}
