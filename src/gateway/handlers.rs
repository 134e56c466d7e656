use anyhow::{anyhow, Context};
use axum::{
    extract::{Path, RawQuery, State},
    http::{header, HeaderMap, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use bytes::Bytes;
use serde_json::{json, Value};
use tracing::{debug, instrument, warn};

use super::{
    cookie::{clear_cookie, session_cookie},
    GatewayState,
};
use crate::{
    auth::extractors::{cookie_value, TOKEN_COOKIE},
    error::ApiError,
    response::ApiResponse,
};

const SNIPPET_LEN: usize = 100;

#[instrument(skip(gw, body))]
pub async fn signup(State(gw): State<GatewayState>, body: Bytes) -> Result<Response, ApiError> {
    forward_auth(&gw, "/auth/signup", body).await
}

#[instrument(skip(gw, body))]
pub async fn login(State(gw): State<GatewayState>, body: Bytes) -> Result<Response, ApiError> {
    forward_auth(&gw, "/auth/login", body).await
}

pub async fn logout(State(gw): State<GatewayState>) -> impl IntoResponse {
    let secure = gw.config.environment.is_production();
    (
        StatusCode::OK,
        [(header::SET_COOKIE, clear_cookie(secure))],
        Json(ApiResponse::success(json!({ "message": "Logged out" }))),
    )
}

#[instrument(skip(gw, headers, body))]
pub async fn forward_tasks(
    State(gw): State<GatewayState>,
    method: Method,
    headers: HeaderMap,
    RawQuery(query): RawQuery,
    body: Bytes,
) -> Result<Response, ApiError> {
    forward_to_tasks(&gw, method, &headers, None, query, body).await
}

#[instrument(skip(gw, headers, body))]
pub async fn forward_task(
    State(gw): State<GatewayState>,
    method: Method,
    headers: HeaderMap,
    Path(id): Path<String>,
    body: Bytes,
) -> Result<Response, ApiError> {
    forward_to_tasks(&gw, method, &headers, Some(id), None, body).await
}

async fn forward_auth(gw: &GatewayState, path: &str, body: Bytes) -> Result<Response, ApiError> {
    let url = format!("{}{}", gw.config.backend_url, path);
    let res = gw
        .client
        .post(&url)
        .header(header::CONTENT_TYPE, "application/json")
        .body(body)
        .send()
        .await
        .with_context(|| format!("POST {url}"))?;

    let (status, mut json) = read_json(res).await?;
    let token = if status.is_success() {
        take_token(&mut json)
    } else {
        None
    };

    let mut response = (status, Json(json)).into_response();
    if let Some(token) = token {
        let secure = gw.config.environment.is_production();
        let cookie = HeaderValue::from_str(&session_cookie(&token, secure))
            .context("token is not a valid cookie value")?;
        response.headers_mut().insert(header::SET_COOKIE, cookie);
        debug!("session cookie set");
    }
    Ok(response)
}

async fn forward_to_tasks(
    gw: &GatewayState,
    method: Method,
    headers: &HeaderMap,
    id: Option<String>,
    query: Option<String>,
    body: Bytes,
) -> Result<Response, ApiError> {
    let mut url = reqwest::Url::parse(&format!("{}/tasks", gw.config.backend_url))
        .context("parse backend url")?;
    if let Some(id) = id {
        url.path_segments_mut()
            .map_err(|_| anyhow!("backend url cannot carry a path"))?
            .push(&id);
    }
    url.set_query(query.as_deref().filter(|q| !q.is_empty()));

    let mut req = gw.client.request(method.clone(), url.clone());
    if let Some(token) = cookie_value(headers, TOKEN_COOKIE) {
        req = req.bearer_auth(token);
    }
    if !body.is_empty() && method != Method::GET {
        req = req
            .header(header::CONTENT_TYPE, "application/json")
            .body(body);
    }

    let res = req
        .send()
        .await
        .with_context(|| format!("{method} {url}"))?;
    let (status, json) = read_json(res).await?;
    Ok((status, Json(json)).into_response())
}

/// Reads the body as text first so a non-JSON upstream reply is reported
/// instead of surfacing as a decode failure.
async fn read_json(res: reqwest::Response) -> Result<(StatusCode, Value), ApiError> {
    let status = res.status();
    let text = res.text().await.context("read backend response")?;
    match serde_json::from_str::<Value>(&text) {
        Ok(json) => Ok((status, json)),
        Err(_) => {
            let snippet: String = text.chars().take(SNIPPET_LEN).collect();
            warn!(%status, body = %snippet, "backend returned a non-JSON body");
            Err(ApiError::BadGateway("Invalid response from backend".into()))
        }
    }
}

/// Removes the token from `data.token` (or a top-level `token`) and returns it.
fn take_token(json: &mut Value) -> Option<String> {
    let from_data = json
        .get_mut("data")
        .and_then(Value::as_object_mut)
        .and_then(|data| data.remove("token"));
    let top_level = json.as_object_mut().and_then(|obj| obj.remove("token"));
    from_data
        .or(top_level)
        .and_then(|v| v.as_str().map(str::to_string))
}
