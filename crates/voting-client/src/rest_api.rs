//! JSON over HTTP surface for a presentation layer. Every mutating route acts as the
//! client's own identity; the UI re-reads whatever it displays after each call.

use crate::client::VotingClient;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use voting_common::{
    metrics, ErrorKind, Identity, Operation, Proposal, ProposalIndex, SessionSnapshot, Voter,
    VotingError,
};

type ApiResult<T> = Result<Json<T>, ApiError>;

/// A ledger error as an HTTP response: a status code plus `{kind, code, message}`.
#[derive(Debug)]
pub struct ApiError(pub VotingError);

impl From<VotingError> for ApiError {
    fn from(e: VotingError) -> Self {
        ApiError(e)
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub kind: ErrorKind,
    pub code: &'static str,
    pub message: String,
}

pub fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::Unauthorized => StatusCode::FORBIDDEN,
        ErrorKind::InvalidPhaseTransition
        | ErrorKind::AlreadyRegistered
        | ErrorKind::AlreadyVoted => StatusCode::CONFLICT,
        ErrorKind::NotRegistered | ErrorKind::IndexOutOfRange | ErrorKind::WinnerNotAvailable => {
            StatusCode::NOT_FOUND
        }
        ErrorKind::EmptyDescription | ErrorKind::InvalidIdentity | ErrorKind::UnknownPhase => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        ErrorKind::Network | ErrorKind::UnexpectedReply => StatusCode::BAD_GATEWAY,
        ErrorKind::Serialization | ErrorKind::Config => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let kind = self.0.kind();
        let body = ErrorBody {
            kind,
            code: kind.code(),
            message: self.0.to_string(),
        };
        (status_for(kind), Json(body)).into_response()
    }
}

fn parse_identity(raw: &str) -> Result<Identity, ApiError> {
    raw.parse().map_err(ApiError)
}

#[derive(Deserialize)]
pub struct VoterRequest {
    identity: String,
}

#[derive(Deserialize)]
pub struct ProposalRequest {
    description: String,
}

#[derive(Deserialize)]
pub struct VoteRequest {
    proposal_index: ProposalIndex,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub status: u8,
    pub label: &'static str,
}

#[derive(Debug, Serialize)]
pub struct WinnerResponse {
    pub description: String,
}

pub async fn identity(State(client): State<Arc<VotingClient>>) -> Json<Identity> {
    Json(client.identity())
}

pub async fn owner(State(client): State<Arc<VotingClient>>) -> ApiResult<Identity> {
    Ok(Json(client.owner().await?))
}

pub async fn status(State(client): State<Arc<VotingClient>>) -> ApiResult<StatusResponse> {
    let phase = client.workflow_status().await?;
    Ok(Json(StatusResponse {
        status: phase.ordinal(),
        label: phase.label(),
    }))
}

pub async fn snapshot(State(client): State<Arc<VotingClient>>) -> ApiResult<SessionSnapshot> {
    Ok(Json(client.snapshot().await?))
}

pub async fn permissions(State(client): State<Arc<VotingClient>>) -> ApiResult<Vec<Operation>> {
    Ok(Json(client.permitted_operations().await?))
}

pub async fn list_voters(State(client): State<Arc<VotingClient>>) -> ApiResult<Vec<Identity>> {
    Ok(Json(client.voter_addresses().await?))
}

pub async fn voter_count(State(client): State<Arc<VotingClient>>) -> ApiResult<u32> {
    Ok(Json(client.voter_count().await?))
}

pub async fn voter_address(
    State(client): State<Arc<VotingClient>>,
    Path(index): Path<u32>,
) -> ApiResult<Identity> {
    Ok(Json(client.voter_address(index).await?))
}

pub async fn voter(
    State(client): State<Arc<VotingClient>>,
    Path(identity): Path<String>,
) -> ApiResult<Voter> {
    let identity = parse_identity(&identity)?;
    Ok(Json(client.voter(identity).await?))
}

pub async fn register_voter(
    State(client): State<Arc<VotingClient>>,
    Json(req): Json<VoterRequest>,
) -> Result<StatusCode, ApiError> {
    client.register_voter(parse_identity(&req.identity)?).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn remove_voter(
    State(client): State<Arc<VotingClient>>,
    Json(req): Json<VoterRequest>,
) -> Result<StatusCode, ApiError> {
    client.remove_voter(parse_identity(&req.identity)?).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn register_proposal(
    State(client): State<Arc<VotingClient>>,
    Json(req): Json<ProposalRequest>,
) -> ApiResult<ProposalIndex> {
    Ok(Json(client.register_proposal(req.description).await?))
}

/// Every proposal in index order.
pub async fn list_proposals(State(client): State<Arc<VotingClient>>) -> ApiResult<Vec<Proposal>> {
    Ok(Json(client.snapshot().await?.proposals))
}

pub async fn proposals_count(State(client): State<Arc<VotingClient>>) -> ApiResult<u32> {
    Ok(Json(client.proposals_count().await?))
}

pub async fn proposal(
    State(client): State<Arc<VotingClient>>,
    Path(index): Path<ProposalIndex>,
) -> ApiResult<Proposal> {
    Ok(Json(client.proposal(index).await?))
}

pub async fn vote(
    State(client): State<Arc<VotingClient>>,
    Json(req): Json<VoteRequest>,
) -> Result<StatusCode, ApiError> {
    client.vote(req.proposal_index).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn start_proposals_registration(
    State(client): State<Arc<VotingClient>>,
) -> Result<StatusCode, ApiError> {
    client.start_proposals_registration().await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn end_proposals_registration(
    State(client): State<Arc<VotingClient>>,
) -> Result<StatusCode, ApiError> {
    client.end_proposals_registration().await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn start_voting_session(
    State(client): State<Arc<VotingClient>>,
) -> Result<StatusCode, ApiError> {
    client.start_voting_session().await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn end_voting_session(
    State(client): State<Arc<VotingClient>>,
) -> Result<StatusCode, ApiError> {
    client.end_voting_session().await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn tally_votes(State(client): State<Arc<VotingClient>>) -> Result<StatusCode, ApiError> {
    client.tally_votes().await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn reset_voting(State(client): State<Arc<VotingClient>>) -> Result<StatusCode, ApiError> {
    client.reset_voting().await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn winner(State(client): State<Arc<VotingClient>>) -> ApiResult<WinnerResponse> {
    Ok(Json(WinnerResponse {
        description: client.winner().await?,
    }))
}

pub async fn metrics_text() -> Result<String, ApiError> {
    Ok(metrics::render()?)
}

pub fn router(client: Arc<VotingClient>) -> Router {
    Router::new()
        .route("/identity", get(identity))
        .route("/owner", get(owner))
        .route("/status", get(status))
        .route("/snapshot", get(snapshot))
        .route("/permissions", get(permissions))
        .route("/voters", get(list_voters))
        .route("/voters/count", get(voter_count))
        .route("/voters/{index}", get(voter_address))
        .route("/voters/register", post(register_voter))
        .route("/voters/remove", post(remove_voter))
        .route("/voter/{identity}", get(voter))
        .route("/proposals", get(list_proposals).post(register_proposal))
        .route("/proposals/count", get(proposals_count))
        .route("/proposals/{index}", get(proposal))
        .route("/vote", post(vote))
        .route(
            "/workflow/start-proposals-registration",
            post(start_proposals_registration),
        )
        .route(
            "/workflow/end-proposals-registration",
            post(end_proposals_registration),
        )
        .route("/workflow/start-voting-session", post(start_voting_session))
        .route("/workflow/end-voting-session", post(end_voting_session))
        .route("/workflow/tally", post(tally_votes))
        .route("/workflow/reset", post(reset_voting))
        .route("/winner", get(winner))
        .route("/metrics", get(metrics_text))
        .with_state(client)
}
