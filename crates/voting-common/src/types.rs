use crate::errors::VotingError;
use bincode::{Decode, Encode};
use ed25519_dalek::VerifyingKey as PublicKey;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Position of a proposal in the registry. Indices are dense and never reused.
pub type ProposalIndex = u32;

/// Opaque caller principal: the bytes of an ed25519 public key.
///
/// How a caller proves it holds the key is outside the ledger's concern; the ledger
/// only compares identities against the owner and the voter registry.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Encode, Decode)]
pub struct Identity(#[serde(with = "hex")] [u8; 32]);

impl Identity {
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Identity(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn public_key(&self) -> Result<PublicKey, VotingError> {
        PublicKey::from_bytes(&self.0)
            .map_err(|_| VotingError::InvalidIdentity(hex::encode(self.0)))
    }
}

impl From<PublicKey> for Identity {
    fn from(key: PublicKey) -> Self {
        Identity(key.to_bytes())
    }
}

impl FromStr for Identity {
    type Err = VotingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = s.trim().trim_start_matches("0x");
        let mut bytes = [0u8; 32];
        hex::decode_to_slice(raw, &mut bytes)
            .map_err(|_| VotingError::InvalidIdentity(s.to_string()))?;
        let identity = Identity(bytes);
        identity.public_key()?;
        Ok(identity)
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl fmt::Debug for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Identity({}..)", &hex::encode(&self.0[..4]))
    }
}

/// Roles a caller can hold. Owner and registered voter are independent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Encode, Decode)]
pub enum Role {
    Owner,
    RegisteredVoter,
}

impl Role {
    /// Message returned to a caller that does not hold this role.
    pub fn denial_message(self) -> &'static str {
        match self {
            Role::Owner => "Ownable: caller is not the owner",
            Role::RegisteredVoter => "Only registered voters can perform this action",
        }
    }
}

/// The six workflow states of a voting session, in their only legal order.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Encode,
    Decode,
)]
#[repr(u8)]
pub enum Phase {
    #[default]
    RegisteringVoters = 0,
    ProposalsRegistrationStarted = 1,
    ProposalsRegistrationEnded = 2,
    VotingSessionStarted = 3,
    VotingSessionEnded = 4,
    VotesTallied = 5,
}

impl Phase {
    pub const ALL: [Phase; 6] = [
        Phase::RegisteringVoters,
        Phase::ProposalsRegistrationStarted,
        Phase::ProposalsRegistrationEnded,
        Phase::VotingSessionStarted,
        Phase::VotingSessionEnded,
        Phase::VotesTallied,
    ];

    pub const fn ordinal(self) -> u8 {
        self as u8
    }

    pub fn label(self) -> &'static str {
        match self {
            Phase::RegisteringVoters => "Registering voters",
            Phase::ProposalsRegistrationStarted => "Proposals registration started",
            Phase::ProposalsRegistrationEnded => "Proposals registration ended",
            Phase::VotingSessionStarted => "Voting session started",
            Phase::VotingSessionEnded => "Voting session ended",
            Phase::VotesTallied => "Votes tallied",
        }
    }

    /// The workflow transition table. Returns the phase reached by applying `operation`
    /// in this phase, or `None` if the operation is not a legal transition from here.
    pub fn transition(self, operation: Operation) -> Option<Phase> {
        use Operation::*;
        use Phase::*;
        match (self, operation) {
            (RegisteringVoters, StartProposalsRegistration) => Some(ProposalsRegistrationStarted),
            (ProposalsRegistrationStarted, EndProposalsRegistration) => {
                Some(ProposalsRegistrationEnded)
            }
            (ProposalsRegistrationEnded, StartVotingSession) => Some(VotingSessionStarted),
            (VotingSessionStarted, EndVotingSession) => Some(VotingSessionEnded),
            (VotingSessionEnded, TallyVotes) => Some(VotesTallied),
            (_, ResetVoting) => Some(RegisteringVoters),
            _ => None,
        }
    }

    /// Whether `operation` may run in this phase. Operations without a phase gate are
    /// always permitted.
    pub fn permits(self, operation: Operation) -> bool {
        if operation.is_transition() {
            return self.transition(operation).is_some();
        }
        match operation.required_phase() {
            Some(phase) => phase == self,
            None => true,
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl TryFrom<u8> for Phase {
    type Error = VotingError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Phase::ALL
            .get(value as usize)
            .copied()
            .ok_or(VotingError::UnknownPhase(value))
    }
}

/// Every call the ledger accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Encode, Decode)]
pub enum Operation {
    RegisterVoter,
    RemoveVoter,
    GetVoterCount,
    GetVoterAddress,
    GetVoter,
    Owner,
    StartProposalsRegistration,
    RegisterProposal,
    EndProposalsRegistration,
    StartVotingSession,
    Vote,
    EndVotingSession,
    TallyVotes,
    GetWinner,
    GetProposalsCount,
    GetProposal,
    GetWorkflowStatus,
    Snapshot,
    ResetVoting,
}

impl Operation {
    pub const ALL: [Operation; 19] = [
        Operation::RegisterVoter,
        Operation::RemoveVoter,
        Operation::GetVoterCount,
        Operation::GetVoterAddress,
        Operation::GetVoter,
        Operation::Owner,
        Operation::StartProposalsRegistration,
        Operation::RegisterProposal,
        Operation::EndProposalsRegistration,
        Operation::StartVotingSession,
        Operation::Vote,
        Operation::EndVotingSession,
        Operation::TallyVotes,
        Operation::GetWinner,
        Operation::GetProposalsCount,
        Operation::GetProposal,
        Operation::GetWorkflowStatus,
        Operation::Snapshot,
        Operation::ResetVoting,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Operation::RegisterVoter => "registerVoter",
            Operation::RemoveVoter => "removeVoter",
            Operation::GetVoterCount => "getVoterCount",
            Operation::GetVoterAddress => "getVoterAddress",
            Operation::GetVoter => "getVoter",
            Operation::Owner => "owner",
            Operation::StartProposalsRegistration => "startProposalsRegistration",
            Operation::RegisterProposal => "registerProposal",
            Operation::EndProposalsRegistration => "endProposalsRegistration",
            Operation::StartVotingSession => "startVotingSession",
            Operation::Vote => "vote",
            Operation::EndVotingSession => "endVotingSession",
            Operation::TallyVotes => "tallyVotes",
            Operation::GetWinner => "getWinner",
            Operation::GetProposalsCount => "getProposalsCount",
            Operation::GetProposal => "getProposal",
            Operation::GetWorkflowStatus => "getWorkflowStatus",
            Operation::Snapshot => "snapshot",
            Operation::ResetVoting => "resetVoting",
        }
    }

    /// Role the caller must hold. Reads require none.
    pub fn required_role(self) -> Option<Role> {
        match self {
            Operation::RegisterVoter
            | Operation::RemoveVoter
            | Operation::StartProposalsRegistration
            | Operation::EndProposalsRegistration
            | Operation::StartVotingSession
            | Operation::EndVotingSession
            | Operation::TallyVotes
            | Operation::ResetVoting => Some(Role::Owner),
            Operation::RegisterProposal | Operation::Vote => Some(Role::RegisteredVoter),
            Operation::GetVoterCount
            | Operation::GetVoterAddress
            | Operation::GetVoter
            | Operation::Owner
            | Operation::GetWinner
            | Operation::GetProposalsCount
            | Operation::GetProposal
            | Operation::GetWorkflowStatus
            | Operation::Snapshot => None,
        }
    }

    /// Phase the operation is gated on. `ResetVoting` is legal from any phase and the
    /// voter registry is not phase gated.
    pub fn required_phase(self) -> Option<Phase> {
        match self {
            Operation::StartProposalsRegistration => Some(Phase::RegisteringVoters),
            Operation::RegisterProposal | Operation::EndProposalsRegistration => {
                Some(Phase::ProposalsRegistrationStarted)
            }
            Operation::StartVotingSession => Some(Phase::ProposalsRegistrationEnded),
            Operation::Vote | Operation::EndVotingSession => Some(Phase::VotingSessionStarted),
            Operation::TallyVotes => Some(Phase::VotingSessionEnded),
            _ => None,
        }
    }

    /// Whether the operation moves the workflow to another phase.
    pub fn is_transition(self) -> bool {
        matches!(
            self,
            Operation::StartProposalsRegistration
                | Operation::EndProposalsRegistration
                | Operation::StartVotingSession
                | Operation::EndVotingSession
                | Operation::TallyVotes
                | Operation::ResetVoting
        )
    }

    pub fn is_mutating(self) -> bool {
        self.required_role().is_some()
    }

    /// Whether a caller holding `held` roles may issue this operation in `phase`.
    pub fn permitted(self, phase: Phase, held: &[Role]) -> bool {
        let role_ok = match self.required_role() {
            Some(role) => held.contains(&role),
            None => true,
        };
        role_ok && phase.permits(self)
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Encode, Decode)]
pub struct Proposal {
    pub description: String,
    pub vote_count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Encode, Decode)]
pub struct Voter {
    pub identity: Identity,
    pub is_registered: bool,
    pub has_voted: bool,
    pub voted_proposal_index: Option<ProposalIndex>,
}

impl Voter {
    pub fn registered(identity: Identity) -> Self {
        Voter {
            identity,
            is_registered: true,
            has_voted: false,
            voted_proposal_index: None,
        }
    }
}

/// A consistent view of a whole session, taken under a single read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Encode, Decode)]
pub struct SessionSnapshot {
    pub owner: Identity,
    pub phase: Phase,
    pub voters: Vec<Voter>,
    pub proposals: Vec<Proposal>,
    pub winning_proposal_index: Option<ProposalIndex>,
}

impl SessionSnapshot {
    pub fn roles_of(&self, identity: &Identity) -> Vec<Role> {
        let mut roles = Vec::new();
        if self.owner == *identity {
            roles.push(Role::Owner);
        }
        if self
            .voters
            .iter()
            .any(|v| v.identity == *identity && v.is_registered)
        {
            roles.push(Role::RegisteredVoter);
        }
        roles
    }

    /// Operations `identity` may issue right now, judged by role and phase alone.
    pub fn permitted_operations(&self, identity: &Identity) -> Vec<Operation> {
        let roles = self.roles_of(identity);
        Operation::ALL
            .into_iter()
            .filter(|op| op.permitted(self.phase, &roles))
            .collect()
    }

    pub fn total_votes(&self) -> u64 {
        self.proposals.iter().map(|p| p.vote_count).sum()
    }

    pub fn winner(&self) -> Option<&Proposal> {
        self.winning_proposal_index
            .and_then(|index| self.proposals.get(index as usize))
    }
}
