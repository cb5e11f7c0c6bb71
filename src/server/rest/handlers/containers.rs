use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::warn;
use utoipa::ToSchema;

use super::parse_id;
use crate::docker::{ContainerSummary, ReconcileAction};
use crate::server::rest::error::ApiResult;
use crate::shared::models::AppState;

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateContainerRequest {
    /// Device identifier as listed by `/api/listusb`
    pub device: String,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateContainerResponse {
    pub id: String,
    pub container_name: String,
    pub port: u16,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ContainerIdRequest {
    pub id: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct RenameContainerRequest {
    pub id: String,
    /// Absent or null clears the display name
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ReconciledContainer {
    pub id: String,
    pub action: ReconcileAction,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct FailedContainer {
    pub id: String,
    pub error: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ReconcileResponse {
    pub converged: Vec<ReconciledContainer>,
    pub failures: Vec<FailedContainer>,
}

pub async fn list_containers(
    State(state): State<Arc<AppState>>,
) -> ApiResult<Json<Vec<ContainerSummary>>> {
    Ok(Json(state.lifecycle.list().await?))
}

pub async fn create_container(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateContainerRequest>,
) -> ApiResult<(StatusCode, Json<CreateContainerResponse>)> {
    let created = state.lifecycle.create(&req.device).await?;

    Ok((
        StatusCode::CREATED,
        Json(CreateContainerResponse {
            id: created.id.to_string(),
            container_name: created.instance_name,
            port: created.port,
        }),
    ))
}

pub async fn delete_container(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ContainerIdRequest>,
) -> ApiResult<Json<MessageResponse>> {
    let id = parse_id(&req.id)?;
    state.lifecycle.delete(id).await?;

    Ok(Json(MessageResponse {
        message: format!("Container {} deleted", id),
    }))
}

pub async fn restart_container(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ContainerIdRequest>,
) -> ApiResult<Json<MessageResponse>> {
    let id = parse_id(&req.id)?;
    state.lifecycle.restart(id).await?;

    Ok(Json(MessageResponse {
        message: format!("Container {} restarted", id),
    }))
}

pub async fn rename_container(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RenameContainerRequest>,
) -> ApiResult<Json<MessageResponse>> {
    let id = parse_id(&req.id)?;
    state.lifecycle.rename(id, req.name.as_deref()).await?;

    Ok(Json(MessageResponse {
        message: format!("Container {} renamed", id),
    }))
}

pub async fn reconcile(State(state): State<Arc<AppState>>) -> ApiResult<Json<ReconcileResponse>> {
    let report = state.lifecycle.reconcile_all().await?;

    let unreadable = report.invalid.into_iter().map(|row| FailedContainer {
        id: row.id,
        error: row.error.to_string(),
    });
    let failures = report
        .failures
        .into_iter()
        .map(|failure| {
            warn!("Container {} did not converge: {}", failure.id, failure.error);
            FailedContainer {
                id: failure.id.to_string(),
                error: failure.error.to_string(),
            }
        })
        .chain(unreadable)
        .collect();

    Ok(Json(ReconcileResponse {
        converged: report
            .converged
            .into_iter()
            .map(|(id, action)| ReconciledContainer {
                id: id.to_string(),
                action,
            })
            .collect(),
        failures,
    }))
}
