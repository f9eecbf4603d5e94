//! HTTP handlers for tenant commands.

use crate::AppState;
use axum::{
    extract::Path,
    http::StatusCode,
    response::{IntoResponse, Response},
    Extension, Json,
};
use chatrelay_pipeline::{CommandError, CommandReply};
use chatrelay_types::TenantId;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

/// Body of `POST /tenants/{tenantId}/join`.
///
/// Both fields are optional on the wire so that a missing value produces the
/// command's own reply rather than a deserialization error.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinRequest {
    #[serde(default)]
    pub live_id: Option<String>,
    #[serde(default)]
    pub voice_channel: Option<String>,
}

/// Reply text for a command that was carried out.
#[derive(Debug, Serialize, Deserialize)]
pub struct CommandResponse {
    pub reply: String,
}

impl From<CommandReply> for CommandResponse {
    fn from(reply: CommandReply) -> Self {
        Self {
            reply: reply.to_string(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("invalid input: {0}")]
    BadRequest(String),
    #[error("upstream failure: {0}")]
    BadGateway(String),
}

impl From<CommandError> for ApiError {
    fn from(err: CommandError) -> Self {
        match err {
            CommandError::NotInVoiceChannel | CommandError::MissingLiveId => {
                ApiError::BadRequest(err.to_string())
            }
            CommandError::Connect(_) => ApiError::BadGateway(err.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::BadGateway(msg) => (StatusCode::BAD_GATEWAY, msg),
        };

        let body = Json(serde_json::json!({
            "error": message
        }));

        (status, body).into_response()
    }
}

fn parse_tenant(raw: String) -> Result<TenantId, ApiError> {
    TenantId::new(raw).map_err(|e| ApiError::BadRequest(e.to_string()))
}

/// Handler for `POST /tenants/{tenantId}/join`.
pub async fn join_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path(tenant_id): Path<String>,
    Json(payload): Json<JoinRequest>,
) -> Result<Json<CommandResponse>, ApiError> {
    let tenant_id = parse_tenant(tenant_id)?;
    let reply = state
        .handler
        .join(
            &tenant_id,
            payload.voice_channel.as_deref(),
            payload.live_id.as_deref(),
        )
        .await?;
    Ok(Json(reply.into()))
}

/// Handler for `POST /tenants/{tenantId}/stop`.
pub async fn stop_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path(tenant_id): Path<String>,
) -> Result<Json<CommandResponse>, ApiError> {
    let tenant_id = parse_tenant(tenant_id)?;
    let reply = state.handler.stop(&tenant_id).await?;
    Ok(Json(reply.into()))
}
