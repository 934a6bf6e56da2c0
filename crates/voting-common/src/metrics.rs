use crate::errors::VotingError;
use prometheus::Encoder;

/// Renders every metric in the default registry in the text exposition format.
pub fn render() -> Result<String, VotingError> {
    let encoder = prometheus::TextEncoder::new();
    let mut buffer = Vec::new();
    encoder
        .encode(&prometheus::gather(), &mut buffer)
        .map_err(|e| VotingError::SerializationError(e.to_string()))?;
    String::from_utf8(buffer).map_err(|e| VotingError::SerializationError(e.to_string()))
}
