//! Cookie-holding proxy in front of the backend for browser clients.
//!
//! The browser never sees the bearer token: login/signup responses have it
//! moved into an http-only cookie, and task calls get it re-attached as an
//! `Authorization` header on the way to the backend.

mod cookie;
pub mod handlers;

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};

use crate::{
    app::{method_not_allowed, not_found},
    config::GatewayConfig,
};

#[derive(Clone)]
pub struct GatewayState {
    pub client: reqwest::Client,
    pub config: Arc<GatewayConfig>,
}

impl GatewayState {
    pub fn new(config: GatewayConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("tasktrack-gateway/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            client,
            config: Arc::new(config),
        })
    }
}

pub fn build_gateway(state: GatewayState) -> Router {
    let router = Router::new()
        .route("/api/signup", post(handlers::signup))
        .route("/api/login", post(handlers::login))
        .route("/api/logout", post(handlers::logout))
        .route(
            "/api/tasks",
            get(handlers::forward_tasks).post(handlers::forward_tasks),
        )
        .route(
            "/api/tasks/:id",
            get(handlers::forward_task)
                .put(handlers::forward_task)
                .delete(handlers::forward_task),
        )
        .method_not_allowed_fallback(method_not_allowed)
        .fallback(not_found)
        .with_state(state);
    crate::app::with_common_layers(router)
}
