use crate::tally::winning_proposal;
use indexmap::IndexMap;
use std::collections::HashMap;
use tracing::debug;
use voting_common::{
    Command, Identity, Operation, Phase, Proposal, ProposalIndex, Query, Reply, Role,
    SessionSnapshot, Voter, VotingError,
};

/// State of one voting round.
///
/// Every mutating method checks the caller's role first, then the workflow phase, then
/// the registry preconditions, and only then writes. A call that fails leaves the
/// session untouched.
///
/// Removing a voter who has already voted does not take their vote back out of the
/// proposal it went to. The sum of vote counts therefore only matches the number of
/// voters with `has_voted` when no such voter has been removed.
///
/// Ballots are kept per identity for the whole round. A removed voter who is registered
/// again comes back with `has_voted` set and cannot vote a second time; only a reset
/// forgets cast ballots.
#[derive(Debug, Clone)]
pub struct Session {
    owner: Identity,
    phase: Phase,
    voters: IndexMap<Identity, Voter>,
    ballots: HashMap<Identity, ProposalIndex>,
    proposals: Vec<Proposal>,
    winning_proposal_index: Option<ProposalIndex>,
}

fn count(len: usize) -> u32 {
    u32::try_from(len).unwrap_or(u32::MAX)
}

impl Session {
    pub fn new(owner: Identity) -> Self {
        Session {
            owner,
            phase: Phase::RegisteringVoters,
            voters: IndexMap::new(),
            ballots: HashMap::new(),
            proposals: Vec::new(),
            winning_proposal_index: None,
        }
    }

    pub fn owner(&self) -> Identity {
        self.owner
    }

    pub fn workflow_status(&self) -> Phase {
        self.phase
    }

    pub fn holds(&self, caller: &Identity, role: Role) -> bool {
        match role {
            Role::Owner => *caller == self.owner,
            Role::RegisteredVoter => self
                .voters
                .get(caller)
                .is_some_and(|voter| voter.is_registered),
        }
    }

    pub fn roles_of(&self, caller: &Identity) -> Vec<Role> {
        [Role::Owner, Role::RegisteredVoter]
            .into_iter()
            .filter(|role| self.holds(caller, *role))
            .collect()
    }

    fn authorize(&self, caller: &Identity, role: Role) -> Result<(), VotingError> {
        if self.holds(caller, role) {
            Ok(())
        } else {
            Err(VotingError::Unauthorized(role))
        }
    }

    fn require_phase(&self, operation: Operation) -> Result<(), VotingError> {
        if self.phase.permits(operation) {
            Ok(())
        } else {
            Err(VotingError::InvalidPhaseTransition {
                operation,
                phase: self.phase,
            })
        }
    }

    /// Next phase for an owner-issued workflow transition, without applying it.
    fn next_phase(&self, caller: &Identity, operation: Operation) -> Result<Phase, VotingError> {
        self.authorize(caller, Role::Owner)?;
        self.phase
            .transition(operation)
            .ok_or(VotingError::InvalidPhaseTransition {
                operation,
                phase: self.phase,
            })
    }

    fn advance(&mut self, caller: &Identity, operation: Operation) -> Result<(), VotingError> {
        let next = self.next_phase(caller, operation)?;
        debug!(from = %self.phase, to = %next, "Workflow advanced");
        self.phase = next;
        Ok(())
    }

    // Voter registry.

    pub fn register_voter(
        &mut self,
        caller: &Identity,
        voter: Identity,
    ) -> Result<(), VotingError> {
        self.authorize(caller, Role::Owner)?;
        voter.public_key()?;
        if self.voters.contains_key(&voter) {
            return Err(VotingError::AlreadyRegistered(voter));
        }
        let mut record = Voter::registered(voter);
        if let Some(&index) = self.ballots.get(&voter) {
            record.has_voted = true;
            record.voted_proposal_index = Some(index);
        }
        self.voters.insert(voter, record);
        Ok(())
    }

    pub fn remove_voter(&mut self, caller: &Identity, voter: Identity) -> Result<(), VotingError> {
        self.authorize(caller, Role::Owner)?;
        voter.public_key()?;
        self.voters
            .shift_remove(&voter)
            .map(|_| ())
            .ok_or(VotingError::NotRegistered(voter))
    }

    pub fn voter_count(&self) -> u32 {
        count(self.voters.len())
    }

    pub fn voter_address(&self, index: u32) -> Result<Identity, VotingError> {
        self.voters
            .get_index(index as usize)
            .map(|(identity, _)| *identity)
            .ok_or_else(|| VotingError::out_of_range(index, self.voters.len()))
    }

    pub fn voter(&self, identity: &Identity) -> Result<&Voter, VotingError> {
        self.voters
            .get(identity)
            .ok_or(VotingError::NotRegistered(*identity))
    }

    // Workflow.

    pub fn start_proposals_registration(&mut self, caller: &Identity) -> Result<(), VotingError> {
        self.advance(caller, Operation::StartProposalsRegistration)
    }

    pub fn end_proposals_registration(&mut self, caller: &Identity) -> Result<(), VotingError> {
        self.advance(caller, Operation::EndProposalsRegistration)
    }

    pub fn start_voting_session(&mut self, caller: &Identity) -> Result<(), VotingError> {
        self.advance(caller, Operation::StartVotingSession)
    }

    pub fn end_voting_session(&mut self, caller: &Identity) -> Result<(), VotingError> {
        self.advance(caller, Operation::EndVotingSession)
    }

    /// Computes the winner and closes the session. Returns the winning index, which is
    /// `None` only when no proposal was ever registered.
    pub fn tally_votes(&mut self, caller: &Identity) -> Result<Option<ProposalIndex>, VotingError> {
        let next = self.next_phase(caller, Operation::TallyVotes)?;
        let winner = winning_proposal(&self.proposals);
        self.winning_proposal_index = winner;
        self.phase = next;
        debug!(winner = ?winner, "Votes tallied");
        Ok(winner)
    }

    /// Back to the initial phase with empty registries. The owner is kept.
    pub fn reset_voting(&mut self, caller: &Identity) -> Result<(), VotingError> {
        let next = self.next_phase(caller, Operation::ResetVoting)?;
        self.phase = next;
        self.voters.clear();
        self.ballots.clear();
        self.proposals.clear();
        self.winning_proposal_index = None;
        Ok(())
    }

    // Proposals.

    pub fn register_proposal(
        &mut self,
        caller: &Identity,
        description: String,
    ) -> Result<ProposalIndex, VotingError> {
        self.authorize(caller, Role::RegisteredVoter)?;
        self.require_phase(Operation::RegisterProposal)?;
        if description.is_empty() {
            return Err(VotingError::EmptyDescription);
        }
        let index = ProposalIndex::try_from(self.proposals.len())
            .map_err(|_| VotingError::out_of_range(u32::MAX, self.proposals.len()))?;
        self.proposals.push(Proposal {
            description,
            vote_count: 0,
        });
        Ok(index)
    }

    pub fn proposals_count(&self) -> u32 {
        count(self.proposals.len())
    }

    pub fn proposal(&self, index: ProposalIndex) -> Result<&Proposal, VotingError> {
        self.proposals
            .get(index as usize)
            .ok_or_else(|| VotingError::out_of_range(index, self.proposals.len()))
    }

    pub fn vote(&mut self, caller: &Identity, index: ProposalIndex) -> Result<(), VotingError> {
        self.authorize(caller, Role::RegisteredVoter)?;
        self.require_phase(Operation::Vote)?;
        if self.ballots.contains_key(caller) {
            return Err(VotingError::AlreadyVoted);
        }
        let len = self.proposals.len();
        let voter = self
            .voters
            .get_mut(caller)
            .ok_or(VotingError::Unauthorized(Role::RegisteredVoter))?;
        if voter.has_voted {
            return Err(VotingError::AlreadyVoted);
        }
        let proposal = self
            .proposals
            .get_mut(index as usize)
            .ok_or_else(|| VotingError::out_of_range(index, len))?;
        proposal.vote_count += 1;
        voter.has_voted = true;
        voter.voted_proposal_index = Some(index);
        self.ballots.insert(*caller, index);
        Ok(())
    }

    // Tally results.

    pub fn winner(&self) -> Result<&Proposal, VotingError> {
        self.winning_proposal_index
            .and_then(|index| self.proposals.get(index as usize))
            .ok_or(VotingError::WinnerNotAvailable)
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            owner: self.owner,
            phase: self.phase,
            voters: self.voters.values().cloned().collect(),
            proposals: self.proposals.clone(),
            winning_proposal_index: self.winning_proposal_index,
        }
    }

    pub fn permitted_operations(&self, caller: &Identity) -> Vec<Operation> {
        let roles = self.roles_of(caller);
        Operation::ALL
            .into_iter()
            .filter(|op| op.permitted(self.phase, &roles))
            .collect()
    }

    /// Applies a mutating call on behalf of `caller`.
    pub fn execute(&mut self, caller: &Identity, command: Command) -> Result<Reply, VotingError> {
        match command {
            Command::RegisterVoter(voter) => self.register_voter(caller, voter)?,
            Command::RemoveVoter(voter) => self.remove_voter(caller, voter)?,
            Command::StartProposalsRegistration => self.start_proposals_registration(caller)?,
            Command::RegisterProposal(description) => {
                return self
                    .register_proposal(caller, description)
                    .map(Reply::ProposalIndex)
            }
            Command::EndProposalsRegistration => self.end_proposals_registration(caller)?,
            Command::StartVotingSession => self.start_voting_session(caller)?,
            Command::Vote(index) => self.vote(caller, index)?,
            Command::EndVotingSession => self.end_voting_session(caller)?,
            Command::TallyVotes => {
                self.tally_votes(caller)?;
            }
            Command::ResetVoting => self.reset_voting(caller)?,
        }
        Ok(Reply::Done)
    }

    pub fn query(&self, query: &Query) -> Result<Reply, VotingError> {
        Ok(match query {
            Query::Owner => Reply::Identity(self.owner),
            Query::VoterCount => Reply::Count(self.voter_count()),
            Query::VoterAddress(index) => Reply::Identity(self.voter_address(*index)?),
            Query::Voter(identity) => Reply::Voter(self.voter(identity)?.clone()),
            Query::ProposalsCount => Reply::Count(self.proposals_count()),
            Query::Proposal(index) => Reply::Proposal(self.proposal(*index)?.clone()),
            Query::WorkflowStatus => Reply::Status(self.phase.ordinal()),
            Query::Winner => Reply::Winner(self.winner()?.description.clone()),
            Query::Snapshot => Reply::Snapshot(self.snapshot()),
        })
    }
}
