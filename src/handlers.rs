// src/handlers.rs
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::HeaderMap,
    Json,
};

use crate::envelope::ActionResult;
use crate::error::PollError;
use crate::identity::HeaderIdentity;
use crate::models::{Poll, PollRequest, PollResults, VoteRequest};
use crate::state::AppState;

fn body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, PollError> {
    payload
        .map(|Json(value)| value)
        .map_err(|rejection| PollError::validation(rejection.body_text()))
}

/// Create a poll owned by the caller
pub async fn create_poll(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<PollRequest>, JsonRejection>,
) -> ActionResult<()> {
    let resolver = HeaderIdentity::new(headers);
    let result = match body(payload) {
        Ok(req) => state
            .service
            .create_poll(&resolver, &req.question, &req.options)
            .await
            .map(|_| ()),
        Err(e) => Err(e),
    };
    ActionResult::completed(result)
}

/// Polls owned by the caller, newest first
pub async fn get_user_polls(State(state): State<AppState>, headers: HeaderMap) -> ActionResult<Vec<Poll>> {
    let resolver = HeaderIdentity::new(headers);
    state.service.get_user_polls(&resolver).await.into()
}

pub async fn get_poll(State(state): State<AppState>, Path(id): Path<String>) -> ActionResult<Poll> {
    state.service.get_poll_by_id(&id).await.into()
}

pub async fn get_poll_results(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ActionResult<PollResults> {
    state.service.get_poll_results(&id).await.into()
}

pub async fn update_poll(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    payload: Result<Json<PollRequest>, JsonRejection>,
) -> ActionResult<()> {
    let resolver = HeaderIdentity::new(headers);
    let result = match body(payload) {
        Ok(req) => {
            state
                .service
                .update_poll(&resolver, &id, &req.question, &req.options)
                .await
        }
        Err(e) => Err(e),
    };
    ActionResult::completed(result)
}

pub async fn delete_poll(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> ActionResult<()> {
    let resolver = HeaderIdentity::new(headers);
    ActionResult::completed(state.service.delete_poll(&resolver, &id).await)
}

/// Record or replace the caller's vote
pub async fn submit_vote(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    payload: Result<Json<VoteRequest>, JsonRejection>,
) -> ActionResult<()> {
    let resolver = HeaderIdentity::new(headers);
    let result = match body(payload) {
        Ok(req) => state.service.submit_vote(&resolver, &id, req.option_index).await,
        Err(e) => Err(e),
    };
    ActionResult::completed(result)
}

pub async fn health() -> ActionResult<&'static str> {
    ActionResult::ok("ok")
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::http::{HeaderValue, StatusCode};

    use super::*;
    use crate::identity::{USER_ID_HEADER, USER_ROLE_HEADER};
    use crate::store::MemoryPollStore;

    fn state() -> AppState {
        AppState::with_store(Arc::new(MemoryPollStore::new()))
    }

    fn headers_for(user: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(USER_ID_HEADER, HeaderValue::from_str(user).unwrap());
        headers
    }

    fn poll_request(question: &str, options: &[&str]) -> Result<Json<PollRequest>, JsonRejection> {
        Ok(Json(PollRequest {
            question: question.to_string(),
            options: options.iter().map(|s| s.to_string()).collect(),
        }))
    }

    async fn create_and_fetch(state: &AppState, owner: &str) -> Poll {
        let created = create_poll(
            State(state.clone()),
            headers_for(owner),
            poll_request("Best color?", &["Red", "Blue"]),
        )
        .await;
        assert_eq!(created.status(), StatusCode::OK);

        let listed = get_user_polls(State(state.clone()), headers_for(owner)).await;
        listed.data.unwrap().remove(0)
    }

    #[tokio::test]
    async fn create_without_session_is_401() {
        let result = create_poll(
            State(state()),
            HeaderMap::new(),
            poll_request("Best color?", &["Red", "Blue"]),
        )
        .await;
        assert_eq!(result.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(result.error.as_deref(), Some("Not authenticated"));
    }

    #[tokio::test]
    async fn invalid_create_is_400_with_joined_messages() {
        let result = create_poll(State(state()), headers_for("alice"), poll_request("Hi", &["one"])).await;
        assert_eq!(result.status(), StatusCode::BAD_REQUEST);
        let message = result.error.unwrap();
        assert!(message.contains("Question must be at least 5 characters"));
        assert!(message.contains("At least 2 options are required"));
    }

    #[tokio::test]
    async fn vote_and_read_results() {
        let state = state();
        let poll = create_and_fetch(&state, "alice").await;

        let voted = submit_vote(
            State(state.clone()),
            headers_for("bob"),
            Path(poll.id.to_string()),
            Ok(Json(VoteRequest { option_index: 1 })),
        )
        .await;
        assert!(voted.is_ok());

        let results = get_poll_results(State(state.clone()), Path(poll.id.to_string())).await;
        let results = results.data.unwrap();
        assert_eq!(results.total_votes, 1);
        assert_eq!(results.tallies[1].votes, 1);
    }

    #[tokio::test]
    async fn out_of_range_vote_is_400() {
        let state = state();
        let poll = create_and_fetch(&state, "alice").await;

        let voted = submit_vote(
            State(state),
            headers_for("bob"),
            Path(poll.id.to_string()),
            Ok(Json(VoteRequest { option_index: 2 })),
        )
        .await;
        assert_eq!(voted.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn delete_status_codes() {
        let state = state();
        let poll = create_and_fetch(&state, "alice").await;
        let id = poll.id.to_string();

        let forbidden = delete_poll(State(state.clone()), headers_for("bob"), Path(id.clone())).await;
        assert_eq!(forbidden.status(), StatusCode::FORBIDDEN);

        let mut admin = headers_for("root");
        admin.insert(USER_ROLE_HEADER, HeaderValue::from_static("admin"));
        let deleted = delete_poll(State(state.clone()), admin, Path(id.clone())).await;
        assert_eq!(deleted.status(), StatusCode::OK);

        let missing = get_poll(State(state), Path(id)).await;
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn malformed_id_is_400() {
        let result = get_poll(State(state()), Path("not-a-uuid".to_string())).await;
        assert_eq!(result.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn health_reports_ok() {
        let result = health().await;
        assert_eq!(result.data, Some("ok"));
    }
}
