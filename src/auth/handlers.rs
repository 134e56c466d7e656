use axum::{
    extract::{rejection::JsonRejection, State},
    routing::post,
    Json, Router,
};
use tracing::instrument;

use crate::{
    auth::{
        dto::{AuthResponse, LoginRequest, SignupRequest},
        services,
    },
    error::ApiResult,
    response::{created, ok},
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/signup", post(signup))
        .route("/auth/login", post(login))
}

#[instrument(skip(state, payload))]
pub async fn signup(
    State(state): State<AppState>,
    payload: Result<Json<SignupRequest>, JsonRejection>,
) -> ApiResult<AuthResponse> {
    let Json(payload) = payload?;
    let res = services::signup(state.users.as_ref(), &state.jwt, payload).await?;
    Ok(created(res))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> ApiResult<AuthResponse> {
    let Json(payload) = payload?;
    let res = services::login(state.users.as_ref(), &state.jwt, payload).await?;
    Ok(ok(res))
}
