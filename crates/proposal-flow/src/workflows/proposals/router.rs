use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use uuid::Uuid;

use super::domain::{CreateProposalRequest, Proposal};
use super::repository::{ProposalRepository, RepositoryError};
use super::service::{EvaluationDispatch, ProposalService, ProposalServiceError};
use crate::events::ProposalCreatedEvent;
use crate::queue::EventPublisher;

/// Router exposing proposal creation and lookup.
pub fn proposal_router<R, P>(service: Arc<ProposalService<R, P>>) -> Router
where
    R: ProposalRepository + 'static,
    P: EventPublisher<ProposalCreatedEvent> + 'static,
{
    Router::new()
        .route("/proposals", post(create_handler::<R, P>))
        .route("/proposals/:proposal_id", get(get_handler::<R, P>))
        .with_state(service)
}

#[derive(Debug, Serialize)]
pub struct ProposalView {
    #[serde(flatten)]
    pub proposal: Proposal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub evaluation: Option<EvaluationDispatch>,
}

/// JSON error body: `{"code": ..., "message": ...}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApiError {
    #[serde(skip)]
    status: StatusCode,
    pub code: &'static str,
    pub message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), Json(self)).into_response()
    }
}

impl From<ProposalServiceError> for ApiError {
    fn from(err: ProposalServiceError) -> Self {
        match err {
            ProposalServiceError::InvalidBirthDate { .. }
            | ProposalServiceError::InvalidProposal(_) => {
                ApiError::new(StatusCode::BAD_REQUEST, "INVALID_INPUT", err.to_string())
            }
            ProposalServiceError::DuplicateCpf => {
                ApiError::new(StatusCode::CONFLICT, "DUPLICATE_CPF", err.to_string())
            }
            ProposalServiceError::Repository(RepositoryError::NotFound) => {
                ApiError::new(StatusCode::NOT_FOUND, "NOT_FOUND", "proposal not found")
            }
            ProposalServiceError::Repository(other) => ApiError::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                other.to_string(),
            ),
        }
    }
}

pub(crate) async fn create_handler<R, P>(
    State(service): State<Arc<ProposalService<R, P>>>,
    body: Result<Json<CreateProposalRequest>, JsonRejection>,
) -> Response
where
    R: ProposalRepository + 'static,
    P: EventPublisher<ProposalCreatedEvent> + 'static,
{
    let Json(request) = match body {
        Ok(body) => body,
        Err(rejection) => {
            return ApiError::new(StatusCode::BAD_REQUEST, "INVALID_JSON", rejection.body_text())
                .into_response()
        }
    };

    match service.create(request).await {
        Ok(creation) => {
            let view = ProposalView {
                proposal: creation.proposal,
                evaluation: Some(creation.evaluation),
            };
            (StatusCode::CREATED, Json(view)).into_response()
        }
        Err(err) => ApiError::from(err).into_response(),
    }
}

pub(crate) async fn get_handler<R, P>(
    State(service): State<Arc<ProposalService<R, P>>>,
    Path(proposal_id): Path<String>,
) -> Response
where
    R: ProposalRepository + 'static,
    P: EventPublisher<ProposalCreatedEvent> + 'static,
{
    let Ok(id) = Uuid::parse_str(&proposal_id) else {
        return ApiError::new(
            StatusCode::BAD_REQUEST,
            "INVALID_ID",
            format!("'{proposal_id}' is not a valid proposal id"),
        )
        .into_response();
    };

    match service.get(id) {
        Ok(proposal) => {
            let view = ProposalView {
                proposal,
                evaluation: None,
            };
            (StatusCode::OK, Json(view)).into_response()
        }
        Err(err) => ApiError::from(err).into_response(),
    }
}
