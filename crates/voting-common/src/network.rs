use crate::errors::VotingError;
use crate::message::{Call, Reply};
use crate::types::Identity;
use async_trait::async_trait;
use bincode::{Decode, Encode};
use futures_util::{Sink, SinkExt};
use tokio_tungstenite::tungstenite::{self, Message as TungMessage};

/// Anything that can execute a call on behalf of a caller: the ledger itself, or a
/// connection to a remote one.
#[async_trait]
pub trait LedgerApi: Send + Sync {
    async fn execute(&self, caller: Identity, call: Call) -> Result<Reply, VotingError>;
}

pub fn encode_frame<T: Encode>(message: &T) -> Result<Vec<u8>, VotingError> {
    bincode::encode_to_vec(message, bincode::config::standard())
        .map_err(|e| VotingError::SerializationError(e.to_string()))
}

pub fn decode_frame<T: Decode<()>>(data: &[u8]) -> Result<T, VotingError> {
    bincode::decode_from_slice(data, bincode::config::standard())
        .map(|(message, _)| message)
        .map_err(|e| VotingError::SerializationError(e.to_string()))
}

pub async fn send_message_to_peer<S, T>(sink: &mut S, message: &T) -> Result<(), VotingError>
where
    S: Sink<TungMessage, Error = tungstenite::Error> + Unpin,
    T: Encode,
{
    let data = encode_frame(message)?;
    sink.send(TungMessage::Binary(data.into()))
        .await
        .map_err(|e| VotingError::NetworkError(e.to_string()))?;
    Ok(())
}
