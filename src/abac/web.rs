use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};

use crate::abac::engine::Resolver;
use crate::abac::errors::AbacError;
use crate::abac::loader::compile_rules;
use crate::abac::mask::apply_mask;
use crate::abac::types::{CheckRequest, Decision, MaskRequest};
use crate::abac::AbacState;

pub fn router(state: Arc<AbacState>) -> Router {
    Router::new()
        .route("/v1/check", post(handle_check))
        .route("/v1/mask", post(handle_mask))
        .route("/healthz", get(health))
        .with_state(state)
}

async fn handle_check(
    State(state): State<Arc<AbacState>>,
    Json(req): Json<CheckRequest>,
) -> impl IntoResponse {
    match decide(&state, req) {
        Ok(decision) => Json(decision).into_response(),
        Err(e) => e.into_response(),
    }
}

/// A rule tree in the request replaces the loaded one for that request only.
fn decide(state: &AbacState, req: CheckRequest) -> Result<Decision, AbacError> {
    let request_rules = req.rules.as_ref().map(compile_rules).transpose()?;
    let rules = request_rules.as_ref().unwrap_or(&state.rules);
    let default_resolution = req.default_resolution.unwrap_or(state.default_resolution);

    let resolver = Resolver::new(req.subject, req.data_source, rules, default_resolution);
    Ok(resolver.check(&req.resource, &req.action))
}

async fn handle_mask(
    State(state): State<Arc<AbacState>>,
    Json(req): Json<MaskRequest>,
) -> impl IntoResponse {
    let mut object = req.object;
    apply_mask(&mut object, &req.mask, req.mode.unwrap_or(state.mask_mode));
    Json(object)
}

async fn health() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}
