use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use serde_json::json;
use tower::ServiceExt;

use super::common::*;
use crate::workflows::proposals::{
    proposal_router, ApiError, ProposalRepository, ProposalServiceError, ProposalValidationError,
};

fn post_json(body: impl Into<Body>) -> Request<Body> {
    Request::post("/proposals")
        .header(header::CONTENT_TYPE, "application/json")
        .body(body.into())
        .expect("request builds")
}

#[tokio::test]
async fn create_route_returns_created_with_dispatch() {
    let (service, repository, _) = build_service();
    let router = proposal_router(service);

    let response = router
        .oneshot(post_json(serde_json::to_vec(&request()).expect("serializes")))
        .await
        .expect("router responds");

    assert_eq!(response.status(), StatusCode::CREATED);
    let body = json_body(response).await;
    assert_eq!(body["status"], "pending");
    assert_eq!(body["cpf"], "12345678902");
    assert_eq!(body["evaluation"], json!({"status": "triggered"}));

    let id = body["id"].as_str().expect("id string");
    let id = uuid::Uuid::parse_str(id).expect("uuid");
    assert!(repository.find_by_id(id).expect("lookup").is_some());
}

#[tokio::test]
async fn create_route_maps_malformed_json() {
    let (service, _, _) = build_service();

    let response = proposal_router(service)
        .oneshot(post_json("{\"full_name\": "))
        .await
        .expect("router responds");

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(response).await["code"], "INVALID_JSON");
}

#[tokio::test]
async fn create_route_maps_invalid_input_and_duplicates() {
    let (service, _, _) = build_service();
    let router = proposal_router(service);

    let mut invalid = request();
    invalid.birth_date = "not-a-date".to_string();
    let response = router
        .clone()
        .oneshot(post_json(serde_json::to_vec(&invalid).expect("serializes")))
        .await
        .expect("router responds");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(response).await["code"], "INVALID_INPUT");

    let body = serde_json::to_vec(&request()).expect("serializes");
    let first = router
        .clone()
        .oneshot(post_json(body.clone()))
        .await
        .expect("router responds");
    assert_eq!(first.status(), StatusCode::CREATED);

    let duplicate = router
        .oneshot(post_json(body))
        .await
        .expect("router responds");
    assert_eq!(duplicate.status(), StatusCode::CONFLICT);
    assert_eq!(json_body(duplicate).await["code"], "DUPLICATE_CPF");
}

#[tokio::test]
async fn get_route_returns_stored_proposal() {
    let (service, _, _) = build_service();
    let created = service.create(request()).await.expect("created");

    let response = proposal_router(service)
        .oneshot(
            Request::get(format!("/proposals/{}", created.proposal.id))
                .body(Body::empty())
                .expect("request builds"),
        )
        .await
        .expect("router responds");

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["id"], created.proposal.id.to_string());
    assert!(body.get("evaluation").is_none());
}

#[tokio::test]
async fn get_route_maps_bad_and_unknown_ids() {
    let (service, _, _) = build_service();
    let router = proposal_router(service);

    let response = router
        .clone()
        .oneshot(
            Request::get("/proposals/not-a-uuid")
                .body(Body::empty())
                .expect("request builds"),
        )
        .await
        .expect("router responds");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(response).await["code"], "INVALID_ID");

    let response = router
        .oneshot(
            Request::get(format!("/proposals/{}", uuid::Uuid::new_v4()))
                .body(Body::empty())
                .expect("request builds"),
        )
        .await
        .expect("router responds");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(json_body(response).await["code"], "NOT_FOUND");
}

#[tokio::test]
async fn create_route_refuses_negative_salary_as_invalid_input() {
    let (service, repository, publisher) = build_service();
    let mut body = serde_json::to_value(request()).expect("serializes");
    body["salary"] = json!(-1.0);

    let response = proposal_router(service)
        .oneshot(post_json(serde_json::to_vec(&body).expect("serializes")))
        .await
        .expect("router responds");

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response).await;
    assert_eq!(body["code"], "INVALID_INPUT");
    assert_eq!(body["message"], "salary must not be negative");
    assert!(repository.is_empty());
    assert!(publisher.events().is_empty());
}

#[test]
fn validation_failures_map_to_bad_request() {
    let error = ApiError::from(ProposalServiceError::InvalidProposal(
        ProposalValidationError::NegativeSalary,
    ));

    assert_eq!(error.status(), StatusCode::BAD_REQUEST);
    assert_eq!(error.code, "INVALID_INPUT");
}
