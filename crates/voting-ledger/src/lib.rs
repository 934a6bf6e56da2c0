use async_trait::async_trait;
use lazy_static::lazy_static;
use prometheus::{register_int_counter_vec, register_int_gauge, IntCounterVec, IntGauge};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use voting_common::{
    Call, Command, Identity, LedgerApi, Query, Reply, Request, Response, SessionSnapshot,
    VotingError,
};

pub mod config;
pub mod network;
pub mod session;
pub mod tally;

pub use session::Session;

lazy_static! {
    static ref CALLS_ACCEPTED: IntCounterVec = register_int_counter_vec!(
        "ledger_calls_accepted_total",
        "Calls applied by the ledger",
        &["operation"]
    )
    .expect("ledger_calls_accepted_total can be registered");
    static ref CALLS_REJECTED: IntCounterVec = register_int_counter_vec!(
        "ledger_calls_rejected_total",
        "Calls rejected by the ledger",
        &["operation", "kind"]
    )
    .expect("ledger_calls_rejected_total can be registered");
    static ref WORKFLOW_STATUS: IntGauge =
        register_int_gauge!("ledger_workflow_status", "Current workflow phase ordinal")
            .expect("ledger_workflow_status can be registered");
    static ref REGISTERED_VOTERS: IntGauge =
        register_int_gauge!("ledger_registered_voters", "Entries in the voter registry")
            .expect("ledger_registered_voters can be registered");
}

/// Handle to one voting session.
///
/// Commands take the session's write lock and queries its read lock, so every command
/// is applied as one atomic step and every query sees a state between two commands.
/// Clones share the same session.
#[derive(Clone)]
pub struct Ledger {
    state: Arc<RwLock<Session>>,
}

impl Ledger {
    /// Creates a ledger whose session is owned by `owner`.
    pub fn new(owner: Identity) -> Self {
        info!("Voting session created, owner {}", owner);
        Ledger {
            state: Arc::new(RwLock::new(Session::new(owner))),
        }
    }

    /// Applies a mutating call. The caller must be a well-formed public key.
    pub async fn command(&self, caller: Identity, command: Command) -> Result<Reply, VotingError> {
        let operation = command.operation();
        let result = match caller.public_key() {
            Ok(_) => {
                let mut session = self.state.write().await;
                let result = session.execute(&caller, command);
                if result.is_ok() {
                    WORKFLOW_STATUS.set(i64::from(session.workflow_status().ordinal()));
                    REGISTERED_VOTERS.set(i64::from(session.voter_count()));
                }
                result
            }
            Err(e) => Err(e),
        };
        match &result {
            Ok(_) => {
                CALLS_ACCEPTED.with_label_values(&[operation.name()]).inc();
                info!(%operation, %caller, "Call accepted");
            }
            Err(e) => {
                CALLS_REJECTED
                    .with_label_values(&[operation.name(), e.kind().code()])
                    .inc();
                warn!(%operation, %caller, "Call rejected: {}", e);
            }
        }
        result
    }

    pub async fn query(&self, query: Query) -> Result<Reply, VotingError> {
        let operation = query.operation();
        let result = self.state.read().await.query(&query);
        debug!(%operation, ok = result.is_ok(), "Query served");
        result
    }

    pub async fn snapshot(&self) -> SessionSnapshot {
        self.state.read().await.snapshot()
    }

    /// Answers a request received from the wire. Requests attributed to something that
    /// is not an ed25519 public key are refused before dispatch.
    pub async fn handle_request(&self, request: Request) -> Response {
        let Request { id, caller, call } = request;
        let result = match caller.public_key() {
            Ok(_) => self.execute(caller, call).await,
            Err(e) => {
                warn!(operation = %call.operation(), "Request from malformed identity refused");
                Err(e)
            }
        };
        Response { id, result }
    }
}

#[async_trait]
impl LedgerApi for Ledger {
    async fn execute(&self, caller: Identity, call: Call) -> Result<Reply, VotingError> {
        match call {
            Call::Command(command) => self.command(caller, command).await,
            Call::Query(query) => self.query(query).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use voting_common::{Crypto, Phase, Role};

    fn identity(n: u8) -> Identity {
        Crypto::from_secret_key(&[n; 32]).identity()
    }

    #[tokio::test]
    async fn commands_and_queries_are_dispatched() {
        let owner = identity(1);
        let voter = identity(2);
        let ledger = Ledger::new(owner);

        ledger
            .execute(owner, Command::RegisterVoter(voter).into())
            .await
            .unwrap();
        assert_eq!(
            ledger.execute(voter, Query::VoterCount.into()).await,
            Ok(Reply::Count(1))
        );
        assert_eq!(
            ledger
                .execute(voter, Command::StartProposalsRegistration.into())
                .await,
            Err(VotingError::Unauthorized(Role::Owner))
        );
        assert_eq!(
            ledger.execute(voter, Query::WorkflowStatus.into()).await,
            Ok(Reply::Status(Phase::RegisteringVoters.ordinal()))
        );
    }

    #[tokio::test]
    async fn requests_keep_their_id() {
        let owner = identity(1);
        let ledger = Ledger::new(owner);
        let response = ledger
            .handle_request(Request {
                id: 17,
                caller: owner,
                call: Query::Owner.into(),
            })
            .await;
        assert_eq!(response.id, 17);
        assert_eq!(response.result, Ok(Reply::Identity(owner)));
    }

    #[tokio::test]
    async fn malformed_identities_never_reach_the_registry() {
        let owner = identity(1);
        let ledger = Ledger::new(owner);
        let not_a_key = Identity::from_bytes([2; 32]);

        assert!(matches!(
            ledger
                .command(owner, Command::RegisterVoter(not_a_key))
                .await,
            Err(VotingError::InvalidIdentity(_))
        ));
        for call in [
            Call::Command(Command::StartProposalsRegistration),
            Call::Query(Query::VoterCount),
        ] {
            let response = ledger
                .handle_request(Request {
                    id: 3,
                    caller: not_a_key,
                    call,
                })
                .await;
            assert_eq!(response.id, 3);
            assert!(matches!(
                response.result,
                Err(VotingError::InvalidIdentity(_))
            ));
        }

        let snapshot = ledger.snapshot().await;
        assert!(snapshot.voters.is_empty());
        assert_eq!(snapshot.phase, Phase::RegisteringVoters);
    }

    #[tokio::test]
    async fn ledgers_do_not_share_state() {
        let owner = identity(1);
        let a = Ledger::new(owner);
        let b = Ledger::new(owner);
        a.command(owner, Command::StartProposalsRegistration)
            .await
            .unwrap();
        assert_eq!(a.snapshot().await.phase, Phase::ProposalsRegistrationStarted);
        assert_eq!(b.snapshot().await.phase, Phase::RegisteringVoters);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_votes_are_counted_exactly_once() {
        let owner = identity(1);
        let ledger = Ledger::new(owner);
        let voters: Vec<Identity> = (10..40).map(identity).collect();
        for voter in &voters {
            ledger
                .command(owner, Command::RegisterVoter(*voter))
                .await
                .unwrap();
        }
        ledger
            .command(owner, Command::StartProposalsRegistration)
            .await
            .unwrap();
        ledger
            .command(voters[0], Command::RegisterProposal("A".into()))
            .await
            .unwrap();
        ledger
            .command(voters[1], Command::RegisterProposal("B".into()))
            .await
            .unwrap();
        ledger
            .command(owner, Command::EndProposalsRegistration)
            .await
            .unwrap();
        ledger
            .command(owner, Command::StartVotingSession)
            .await
            .unwrap();

        // Every voter tries to vote twice, from two tasks at once.
        let mut tasks = Vec::new();
        for (i, voter) in voters.iter().copied().enumerate() {
            for attempt in 0..2u32 {
                let ledger = ledger.clone();
                let index = (i as u32 + attempt) % 2;
                tasks.push(tokio::spawn(async move {
                    ledger.command(voter, Command::Vote(index)).await
                }));
            }
        }
        let mut accepted = 0;
        let mut already_voted = 0;
        for task in tasks {
            match task.await.unwrap() {
                Ok(_) => accepted += 1,
                Err(VotingError::AlreadyVoted) => already_voted += 1,
                Err(e) => panic!("unexpected error {e}"),
            }
        }
        assert_eq!(accepted, voters.len());
        assert_eq!(already_voted, voters.len());

        let snapshot = ledger.snapshot().await;
        assert_eq!(snapshot.total_votes(), voters.len() as u64);
        assert!(snapshot.voters.iter().all(|v| v.has_voted));
    }

    #[tokio::test]
    async fn rejected_commands_leave_state_unchanged() {
        let owner = identity(1);
        let ledger = Ledger::new(owner);
        let before = ledger.snapshot().await;
        assert!(ledger
            .command(identity(2), Command::RegisterVoter(identity(3)))
            .await
            .is_err());
        assert!(ledger.command(owner, Command::TallyVotes).await.is_err());
        assert_eq!(ledger.snapshot().await, before);
    }
}
