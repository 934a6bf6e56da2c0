use lazy_static::lazy_static;
use prometheus::{register_int_counter_vec, IntCounterVec};
use std::sync::Arc;
use tracing::{error, info, warn};
use voting_common::{
    Call, Command, Crypto, Identity, LedgerApi, Operation, Phase, Proposal, ProposalIndex, Query,
    Reply, SessionSnapshot, Voter, VotingError,
};

lazy_static! {
    static ref CALLS_SUBMITTED: IntCounterVec = register_int_counter_vec!(
        "client_calls_submitted_total",
        "Calls submitted to the ledger",
        &["operation"]
    )
    .expect("client_calls_submitted_total can be registered");
    static ref CALLS_FAILED: IntCounterVec = register_int_counter_vec!(
        "client_calls_failed_total",
        "Calls that came back with an error",
        &["operation", "kind"]
    )
    .expect("client_calls_failed_total can be registered");
}

fn unexpected(reply: Reply) -> VotingError {
    VotingError::UnexpectedReply(format!("{reply:?}"))
}

/// A participant's view of the ledger. Every call it makes is attributed to the
/// identity derived from its key.
pub struct VotingClient {
    crypto: Crypto,
    ledger: Arc<dyn LedgerApi>,
}

impl VotingClient {
    pub fn new(ledger: Arc<dyn LedgerApi>, crypto: Crypto) -> Self {
        VotingClient { crypto, ledger }
    }

    pub fn identity(&self) -> Identity {
        self.crypto.identity()
    }

    async fn call(&self, call: Call) -> Result<Reply, VotingError> {
        let operation = call.operation();
        CALLS_SUBMITTED.with_label_values(&[operation.name()]).inc();
        let result = self.ledger.execute(self.identity(), call).await;
        match &result {
            Ok(_) if operation.is_mutating() => info!(%operation, "Call accepted"),
            Ok(_) => {}
            Err(e) => {
                CALLS_FAILED
                    .with_label_values(&[operation.name(), e.kind().code()])
                    .inc();
                if e.is_rejection() {
                    warn!(%operation, "Call rejected: {}", e);
                } else {
                    error!(%operation, "Call failed: {}", e);
                }
            }
        }
        result
    }

    async fn command(&self, command: Command) -> Result<(), VotingError> {
        self.call(Call::Command(command)).await.map(|_| ())
    }

    async fn query(&self, query: Query) -> Result<Reply, VotingError> {
        self.call(Call::Query(query)).await
    }

    async fn count(&self, query: Query) -> Result<u32, VotingError> {
        match self.query(query).await? {
            Reply::Count(n) => Ok(n),
            other => Err(unexpected(other)),
        }
    }

    async fn identity_reply(&self, query: Query) -> Result<Identity, VotingError> {
        match self.query(query).await? {
            Reply::Identity(identity) => Ok(identity),
            other => Err(unexpected(other)),
        }
    }

    // Owner operations.

    pub async fn register_voter(&self, voter: Identity) -> Result<(), VotingError> {
        self.command(Command::RegisterVoter(voter)).await
    }

    pub async fn remove_voter(&self, voter: Identity) -> Result<(), VotingError> {
        self.command(Command::RemoveVoter(voter)).await
    }

    pub async fn start_proposals_registration(&self) -> Result<(), VotingError> {
        self.command(Command::StartProposalsRegistration).await
    }

    pub async fn end_proposals_registration(&self) -> Result<(), VotingError> {
        self.command(Command::EndProposalsRegistration).await
    }

    pub async fn start_voting_session(&self) -> Result<(), VotingError> {
        self.command(Command::StartVotingSession).await
    }

    pub async fn end_voting_session(&self) -> Result<(), VotingError> {
        self.command(Command::EndVotingSession).await
    }

    pub async fn tally_votes(&self) -> Result<(), VotingError> {
        self.command(Command::TallyVotes).await
    }

    pub async fn reset_voting(&self) -> Result<(), VotingError> {
        self.command(Command::ResetVoting).await
    }

    // Voter operations.

    pub async fn register_proposal(
        &self,
        description: String,
    ) -> Result<ProposalIndex, VotingError> {
        match self.call(Command::RegisterProposal(description).into()).await? {
            Reply::ProposalIndex(index) => Ok(index),
            other => Err(unexpected(other)),
        }
    }

    pub async fn vote(&self, proposal: ProposalIndex) -> Result<(), VotingError> {
        self.command(Command::Vote(proposal)).await
    }

    // Reads.

    pub async fn owner(&self) -> Result<Identity, VotingError> {
        self.identity_reply(Query::Owner).await
    }

    pub async fn is_owner(&self) -> Result<bool, VotingError> {
        Ok(self.owner().await? == self.identity())
    }

    pub async fn voter_count(&self) -> Result<u32, VotingError> {
        self.count(Query::VoterCount).await
    }

    pub async fn voter_address(&self, index: u32) -> Result<Identity, VotingError> {
        self.identity_reply(Query::VoterAddress(index)).await
    }

    /// All registered identities, read one by one the way the registry enumerates them.
    pub async fn voter_addresses(&self) -> Result<Vec<Identity>, VotingError> {
        let count = self.voter_count().await?;
        let mut addresses = Vec::with_capacity(count as usize);
        for index in 0..count {
            addresses.push(self.voter_address(index).await?);
        }
        Ok(addresses)
    }

    pub async fn voter(&self, identity: Identity) -> Result<Voter, VotingError> {
        match self.query(Query::Voter(identity)).await? {
            Reply::Voter(voter) => Ok(voter),
            other => Err(unexpected(other)),
        }
    }

    pub async fn proposals_count(&self) -> Result<u32, VotingError> {
        self.count(Query::ProposalsCount).await
    }

    pub async fn proposal(&self, index: ProposalIndex) -> Result<Proposal, VotingError> {
        match self.query(Query::Proposal(index)).await? {
            Reply::Proposal(proposal) => Ok(proposal),
            other => Err(unexpected(other)),
        }
    }

    pub async fn workflow_status(&self) -> Result<Phase, VotingError> {
        match self.query(Query::WorkflowStatus).await? {
            Reply::Status(ordinal) => Phase::try_from(ordinal),
            other => Err(unexpected(other)),
        }
    }

    pub async fn winner(&self) -> Result<String, VotingError> {
        match self.query(Query::Winner).await? {
            Reply::Winner(description) => Ok(description),
            other => Err(unexpected(other)),
        }
    }

    pub async fn snapshot(&self) -> Result<SessionSnapshot, VotingError> {
        match self.query(Query::Snapshot).await? {
            Reply::Snapshot(snapshot) => Ok(snapshot),
            other => Err(unexpected(other)),
        }
    }

    /// Operations this client may issue right now, from one consistent snapshot.
    pub async fn permitted_operations(&self) -> Result<Vec<Operation>, VotingError> {
        Ok(self.snapshot().await?.permitted_operations(&self.identity()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Records calls and answers each with a canned reply.
    struct Scripted {
        reply: Reply,
        calls: Mutex<Vec<(Identity, Call)>>,
    }

    #[async_trait]
    impl LedgerApi for Scripted {
        async fn execute(&self, caller: Identity, call: Call) -> Result<Reply, VotingError> {
            self.calls.lock().unwrap().push((caller, call));
            Ok(self.reply.clone())
        }
    }

    fn scripted(reply: Reply) -> Arc<Scripted> {
        Arc::new(Scripted {
            reply,
            calls: Mutex::new(Vec::new()),
        })
    }

    #[tokio::test]
    async fn calls_are_attributed_to_the_client_identity() {
        let ledger = scripted(Reply::Done);
        let client = VotingClient::new(ledger.clone(), Crypto::from_secret_key(&[3; 32]));
        client.vote(1).await.unwrap();

        let calls = ledger.calls.lock().unwrap();
        assert_eq!(
            calls.as_slice(),
            &[(client.identity(), Call::Command(Command::Vote(1)))]
        );
    }

    #[tokio::test]
    async fn mismatched_replies_are_reported() {
        let client = VotingClient::new(scripted(Reply::Done), Crypto::from_secret_key(&[3; 32]));
        assert!(matches!(
            client.voter_count().await,
            Err(VotingError::UnexpectedReply(_))
        ));
        assert!(matches!(
            client.winner().await,
            Err(VotingError::UnexpectedReply(_))
        ));
    }

    #[tokio::test]
    async fn workflow_status_decodes_the_phase_ordinal() {
        let key = || Crypto::from_secret_key(&[3; 32]);
        let client = VotingClient::new(scripted(Reply::Status(3)), key());
        assert_eq!(client.workflow_status().await, Ok(Phase::VotingSessionStarted));

        let client = VotingClient::new(scripted(Reply::Status(9)), key());
        assert_eq!(
            client.workflow_status().await,
            Err(VotingError::UnknownPhase(9))
        );
    }
}
