pub mod crypto;
pub mod errors;
pub mod message;
pub mod metrics;
pub mod network;
pub mod types;

pub use crypto::Crypto;
pub use errors::{ErrorKind, VotingError};
pub use message::{Call, Command, Query, Reply, Request, RequestId, Response};
pub use network::{decode_frame, encode_frame, send_message_to_peer, LedgerApi};
pub use types::{
    Identity, Operation, Phase, Proposal, ProposalIndex, Role, SessionSnapshot, Voter,
};
