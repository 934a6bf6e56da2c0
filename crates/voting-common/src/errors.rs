use crate::types::{Identity, Operation, Phase, Role};
use bincode::{Decode, Encode};
use serde::{Deserialize, Serialize};

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Encode, Decode)]
pub enum VotingError {
    #[error("{}", .0.denial_message())]
    Unauthorized(Role),
    #[error("{operation} is not permitted while {phase}")]
    InvalidPhaseTransition { operation: Operation, phase: Phase },
    #[error("Voter already registered")]
    AlreadyRegistered(Identity),
    #[error("Voter not registered: {0}")]
    NotRegistered(Identity),
    #[error("You have already voted")]
    AlreadyVoted,
    #[error("Proposal description must not be empty")]
    EmptyDescription,
    #[error("Index {index} out of range (length {len})")]
    IndexOutOfRange { index: u32, len: u32 },
    #[error("Votes have not been tallied")]
    WinnerNotAvailable,
    #[error("Invalid identity: {0}")]
    InvalidIdentity(String),
    #[error("Unknown workflow status: {0}")]
    UnknownPhase(u8),
    #[error("Serialization error: {0}")]
    SerializationError(String),
    #[error("Network error: {0}")]
    NetworkError(String),
    #[error("Configuration error: {0}")]
    ConfigError(String),
    #[error("Unexpected reply: {0}")]
    UnexpectedReply(String),
}

/// Stable, payload-free classification of a [`VotingError`], for callers that render
/// their own messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    Unauthorized,
    InvalidPhaseTransition,
    AlreadyRegistered,
    NotRegistered,
    AlreadyVoted,
    EmptyDescription,
    IndexOutOfRange,
    WinnerNotAvailable,
    InvalidIdentity,
    UnknownPhase,
    Serialization,
    Network,
    Config,
    UnexpectedReply,
}

impl ErrorKind {
    pub fn code(self) -> &'static str {
        match self {
            ErrorKind::Unauthorized => "unauthorized",
            ErrorKind::InvalidPhaseTransition => "invalid_phase_transition",
            ErrorKind::AlreadyRegistered => "already_registered",
            ErrorKind::NotRegistered => "not_registered",
            ErrorKind::AlreadyVoted => "already_voted",
            ErrorKind::EmptyDescription => "empty_description",
            ErrorKind::IndexOutOfRange => "index_out_of_range",
            ErrorKind::WinnerNotAvailable => "winner_not_available",
            ErrorKind::InvalidIdentity => "invalid_identity",
            ErrorKind::UnknownPhase => "unknown_phase",
            ErrorKind::Serialization => "serialization",
            ErrorKind::Network => "network",
            ErrorKind::Config => "config",
            ErrorKind::UnexpectedReply => "unexpected_reply",
        }
    }
}

impl VotingError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            VotingError::Unauthorized(_) => ErrorKind::Unauthorized,
            VotingError::InvalidPhaseTransition { .. } => ErrorKind::InvalidPhaseTransition,
            VotingError::AlreadyRegistered(_) => ErrorKind::AlreadyRegistered,
            VotingError::NotRegistered(_) => ErrorKind::NotRegistered,
            VotingError::AlreadyVoted => ErrorKind::AlreadyVoted,
            VotingError::EmptyDescription => ErrorKind::EmptyDescription,
            VotingError::IndexOutOfRange { .. } => ErrorKind::IndexOutOfRange,
            VotingError::WinnerNotAvailable => ErrorKind::WinnerNotAvailable,
            VotingError::InvalidIdentity(_) => ErrorKind::InvalidIdentity,
            VotingError::UnknownPhase(_) => ErrorKind::UnknownPhase,
            VotingError::SerializationError(_) => ErrorKind::Serialization,
            VotingError::NetworkError(_) => ErrorKind::Network,
            VotingError::ConfigError(_) => ErrorKind::Config,
            VotingError::UnexpectedReply(_) => ErrorKind::UnexpectedReply,
        }
    }

    /// Errors raised by the ledger's rules, as opposed to transport or setup failures.
    pub fn is_rejection(&self) -> bool {
        !matches!(
            self.kind(),
            ErrorKind::Serialization
                | ErrorKind::Network
                | ErrorKind::Config
                | ErrorKind::UnexpectedReply
        )
    }

    pub fn out_of_range(index: u32, len: usize) -> Self {
        VotingError::IndexOutOfRange {
            index,
            len: u32::try_from(len).unwrap_or(u32::MAX),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn authorization_messages() {
        assert_eq!(
            VotingError::Unauthorized(Role::Owner).to_string(),
            "Ownable: caller is not the owner"
        );
        assert_eq!(
            VotingError::Unauthorized(Role::RegisteredVoter).to_string(),
            "Only registered voters can perform this action"
        );
        let id = Identity::from_bytes([0; 32]);
        assert_eq!(
            VotingError::AlreadyRegistered(id).to_string(),
            "Voter already registered"
        );
    }

    #[test]
    fn phase_errors_name_the_operation_and_phase() {
        let err = VotingError::InvalidPhaseTransition {
            operation: Operation::Vote,
            phase: Phase::RegisteringVoters,
        };
        assert_eq!(err.to_string(), "vote is not permitted while Registering voters");
        assert_eq!(err.kind().code(), "invalid_phase_transition");
    }

    #[test]
    fn transport_failures_are_not_rejections() {
        assert!(VotingError::AlreadyVoted.is_rejection());
        assert!(VotingError::WinnerNotAvailable.is_rejection());
        assert!(!VotingError::NetworkError("closed".into()).is_rejection());
        assert!(!VotingError::UnexpectedReply("Done".into()).is_rejection());
    }
}
