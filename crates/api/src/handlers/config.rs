use axum::extract::State;
use axum::response::{IntoResponse, Response};
use axum::{Extension, Json};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::info;
use vigil_dns_domain::Config;

use crate::errors::{ApiError, RequestTimer};
use crate::state::AppState;

/// GET /api/config — the full typed configuration tree.
pub async fn get_config(
    State(state): State<AppState>,
    Extension(timer): Extension<RequestTimer>,
) -> Json<Value> {
    let cfg = state.config.load_full();
    Json(json!({
        "config": *cfg,
        "took": timer.took(),
    }))
}

#[derive(Debug, Deserialize)]
pub struct PatchConfigRequest {
    pub config: Value,
}

/// PATCH /api/config — apply a partial update. Keys that only take effect
/// after a restart are rejected so the running state never silently
/// diverges from the file.
pub async fn patch_config(
    State(state): State<AppState>,
    Extension(timer): Extension<RequestTimer>,
    Json(body): Json<PatchConfigRequest>,
) -> Response {
    let current = state.config.load_full();

    let mut merged = match serde_json::to_value(&*current) {
        Ok(v) => v,
        Err(e) => {
            return ApiError::new(
                axum::http::StatusCode::INTERNAL_SERVER_ERROR,
                "internal_error",
                "Cannot serialize configuration",
            )
            .with_hint(e.to_string())
            .with_timer(&timer)
            .into_response()
        }
    };
    merge_into(&mut merged, &body.config);

    let fresh: Config = match serde_json::from_value(merged) {
        Ok(cfg) => cfg,
        Err(e) => {
            return ApiError::bad_request("Invalid configuration")
                .with_hint(e.to_string())
                .with_timer(&timer)
                .into_response()
        }
    };

    if let Err(e) = fresh.validate() {
        return ApiError::bad_request("Invalid configuration")
            .with_hint(e.to_string())
            .with_timer(&timer)
            .into_response();
    }

    if current.restart_required(&fresh) {
        return ApiError::bad_request("Configuration change requires a restart")
            .with_hint("config_restart_required")
            .with_timer(&timer)
            .into_response();
    }

    if let Some(path) = &state.config_path {
        if let Err(e) = fresh.save(path) {
            return ApiError::new(
                axum::http::StatusCode::INTERNAL_SERVER_ERROR,
                "internal_error",
                "Cannot persist configuration",
            )
            .with_hint(e.to_string())
            .with_timer(&timer)
            .into_response();
        }
    }

    state.config.store(Arc::new(fresh.clone()));
    info!("Configuration updated via API");

    Json(json!({
        "config": fresh,
        "took": timer.took(),
    }))
    .into_response()
}

/// Recursive merge: objects merge key-wise, everything else replaces.
fn merge_into(base: &mut Value, patch: &Value) {
    match (base, patch) {
        (Value::Object(base_map), Value::Object(patch_map)) => {
            for (key, patch_value) in patch_map {
                match base_map.get_mut(key) {
                    Some(base_value) => merge_into(base_value, patch_value),
                    None => {
                        base_map.insert(key.clone(), patch_value.clone());
                    }
                }
            }
        }
        (base, patch) => *base = patch.clone(),
    }
}
