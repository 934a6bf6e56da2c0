use crate::errors::VotingError;
use crate::types::{Identity, Operation, Proposal, ProposalIndex, SessionSnapshot, Voter};
use bincode::{Decode, Encode};
use serde::{Deserialize, Serialize};

pub type RequestId = u64;

/// Calls that mutate the session. They run under the session's exclusive lock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Encode, Decode)]
pub enum Command {
    RegisterVoter(Identity),
    RemoveVoter(Identity),
    StartProposalsRegistration,
    RegisterProposal(String),
    EndProposalsRegistration,
    StartVotingSession,
    Vote(ProposalIndex),
    EndVotingSession,
    TallyVotes,
    ResetVoting,
}

impl Command {
    pub fn operation(&self) -> Operation {
        match self {
            Command::RegisterVoter(_) => Operation::RegisterVoter,
            Command::RemoveVoter(_) => Operation::RemoveVoter,
            Command::StartProposalsRegistration => Operation::StartProposalsRegistration,
            Command::RegisterProposal(_) => Operation::RegisterProposal,
            Command::EndProposalsRegistration => Operation::EndProposalsRegistration,
            Command::StartVotingSession => Operation::StartVotingSession,
            Command::Vote(_) => Operation::Vote,
            Command::EndVotingSession => Operation::EndVotingSession,
            Command::TallyVotes => Operation::TallyVotes,
            Command::ResetVoting => Operation::ResetVoting,
        }
    }
}

/// Read-only calls. Any caller may issue them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Encode, Decode)]
pub enum Query {
    Owner,
    VoterCount,
    VoterAddress(u32),
    Voter(Identity),
    ProposalsCount,
    Proposal(ProposalIndex),
    WorkflowStatus,
    Winner,
    Snapshot,
}

impl Query {
    pub fn operation(&self) -> Operation {
        match self {
            Query::Owner => Operation::Owner,
            Query::VoterCount => Operation::GetVoterCount,
            Query::VoterAddress(_) => Operation::GetVoterAddress,
            Query::Voter(_) => Operation::GetVoter,
            Query::ProposalsCount => Operation::GetProposalsCount,
            Query::Proposal(_) => Operation::GetProposal,
            Query::WorkflowStatus => Operation::GetWorkflowStatus,
            Query::Winner => Operation::GetWinner,
            Query::Snapshot => Operation::Snapshot,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Encode, Decode)]
pub enum Call {
    Command(Command),
    Query(Query),
}

impl Call {
    pub fn operation(&self) -> Operation {
        match self {
            Call::Command(command) => command.operation(),
            Call::Query(query) => query.operation(),
        }
    }
}

impl From<Command> for Call {
    fn from(command: Command) -> Self {
        Call::Command(command)
    }
}

impl From<Query> for Call {
    fn from(query: Query) -> Self {
        Call::Query(query)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Encode, Decode)]
pub enum Reply {
    Done,
    ProposalIndex(ProposalIndex),
    Count(u32),
    Identity(Identity),
    Voter(Voter),
    Proposal(Proposal),
    /// Workflow phase as its ordinal, decoded with `Phase::try_from`.
    Status(u8),
    Winner(String),
    Snapshot(SessionSnapshot),
}

/// A call attributed to `caller`, as carried on the wire.
#[derive(Debug, Clone, Encode, Decode)]
pub struct Request {
    pub id: RequestId,
    pub caller: Identity,
    pub call: Call,
}

#[derive(Debug, Clone, Encode, Decode)]
pub struct Response {
    pub id: RequestId,
    pub result: Result<Reply, VotingError>,
}
