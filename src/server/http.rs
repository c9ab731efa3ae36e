//! HTTP API for the IPAM server
//!
//! One POST route per inbound RPC method. Every request may carry a `seq`
//! correlation id (one is generated when absent) and every response body is
//! `{seq, code, message, data}`: errors travel as wire codes, not HTTP
//! transport failures, so agents can switch on them uniformly.

use crate::common::Result;
use crate::ipam::{
    AddSubnetRequest, AllocateFixedIpRequest, AllocateIpRequest, ChangeSubnetRequest,
    CleanFixedIpRequest, CleanNodeRequest, ReleaseIpRequest,
};
use crate::server::AppState;
use axum::{
    error_handling::HandleErrorLayer,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Duration;
use tower::{timeout::TimeoutLayer, ServiceBuilder};
use tower_http::trace::TraceLayer;

/// Request envelope: correlation seq + the method's own fields.
#[derive(Debug, Deserialize)]
struct Rpc<T> {
    #[serde(default)]
    seq: String,
    #[serde(flatten)]
    body: T,
}

/// Response envelope. `code` 0 means success.
#[derive(Debug, Serialize)]
struct RpcResponse<T: Serialize> {
    seq: String,
    code: u32,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
}

fn seq_or_new(seq: String) -> String {
    if seq.is_empty() {
        uuid::Uuid::new_v4().to_string()
    } else {
        seq
    }
}

fn reply<T: Serialize>(seq: String, result: Result<T>) -> Json<RpcResponse<T>> {
    let seq = seq_or_new(seq);
    match result {
        Ok(data) => Json(RpcResponse {
            seq,
            code: 0,
            message: "ok".to_string(),
            data: Some(data),
        }),
        Err(e) => {
            tracing::warn!(%seq, code = e.code(), error = %e, "request failed");
            Json(RpcResponse {
                seq,
                code: e.code(),
                message: e.to_string(),
                data: None,
            })
        }
    }
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/v1/ip/allocate", post(allocate_ip))
        .route("/v1/ip/release", post(release_ip))
        .route("/v1/ip/allocate-fixed", post(allocate_fixed_ip))
        .route("/v1/ip/release-fixed", post(release_fixed_ip))
        .route("/v1/node/clean", post(clean_node))
        .route("/v1/ip/clean-fixed", post(clean_fixed_ip))
        .route("/v1/subnet/add", post(add_subnet))
        .route("/v1/subnet/delete", post(delete_subnet))
        .route("/v1/subnet/change", post(change_subnet))
        .route("/v1/subnet/list", get(list_subnets))
        .route("/v1/subnet/available", get(available_subnets))
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Cap per-request handling time. The timeout service is fallible, so it
/// rides behind an error handler that maps elapsed deadlines to 408.
pub fn with_timeout(router: Router, timeout: Duration) -> Router {
    router.layer(
        ServiceBuilder::new()
            .layer(HandleErrorLayer::new(|_: tower::BoxError| async {
                StatusCode::REQUEST_TIMEOUT
            }))
            .layer(TimeoutLayer::new(timeout)),
    )
}

async fn allocate_ip(
    State(state): State<AppState>,
    Json(req): Json<Rpc<AllocateIpRequest>>,
) -> impl IntoResponse {
    reply(req.seq, state.allocator.allocate(&req.body).await)
}

async fn release_ip(
    State(state): State<AppState>,
    Json(req): Json<Rpc<ReleaseIpRequest>>,
) -> impl IntoResponse {
    reply(req.seq, state.releases.release(&req.body).await)
}

async fn allocate_fixed_ip(
    State(state): State<AppState>,
    Json(req): Json<Rpc<AllocateFixedIpRequest>>,
) -> impl IntoResponse {
    reply(req.seq, state.fixed.allocate_fixed(&req.body).await)
}

async fn release_fixed_ip(
    State(state): State<AppState>,
    Json(req): Json<Rpc<ReleaseIpRequest>>,
) -> impl IntoResponse {
    reply(req.seq, state.releases.release_fixed(&req.body).await)
}

async fn clean_node(
    State(state): State<AppState>,
    Json(req): Json<Rpc<CleanNodeRequest>>,
) -> impl IntoResponse {
    reply(req.seq, state.node_cleaner.clean_node(&req.body).await)
}

async fn clean_fixed_ip(
    State(state): State<AppState>,
    Json(req): Json<Rpc<CleanFixedIpRequest>>,
) -> impl IntoResponse {
    reply(req.seq, state.node_cleaner.clean_fixed(&req.body).await)
}

async fn add_subnet(
    State(state): State<AppState>,
    Json(req): Json<Rpc<AddSubnetRequest>>,
) -> impl IntoResponse {
    reply(req.seq, state.subnets.add_subnet(&req.body).await)
}

#[derive(Debug, Deserialize)]
struct DeleteSubnetRequest {
    subnet_id: String,
}

async fn delete_subnet(
    State(state): State<AppState>,
    Json(req): Json<Rpc<DeleteSubnetRequest>>,
) -> impl IntoResponse {
    reply(req.seq, state.subnets.delete_subnet(&req.body.subnet_id).await)
}

async fn change_subnet(
    State(state): State<AppState>,
    Json(req): Json<Rpc<ChangeSubnetRequest>>,
) -> impl IntoResponse {
    reply(req.seq, state.subnets.change_subnet(&req.body).await)
}

async fn list_subnets(State(state): State<AppState>) -> impl IntoResponse {
    reply(String::new(), state.subnets.list_subnets().await)
}

async fn available_subnets(State(state): State<AppState>) -> impl IntoResponse {
    reply(String::new(), state.subnets.get_available_subnets().await)
}

/// Health check endpoint reporting leadership.
async fn health(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({
        "status": "healthy",
        "is_leader": state.gate.is_leader(),
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
