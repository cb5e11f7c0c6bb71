use axum::{extract::State, Json};
use serde::Serialize;
use std::sync::Arc;
use utoipa::ToSchema;

use crate::docker::DeviceInfo;
use crate::server::rest::error::ApiResult;
use crate::shared::models::AppState;

#[derive(Debug, Serialize, ToSchema)]
pub struct DeviceListResponse {
    pub devices: Vec<DeviceInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

pub async fn list_devices(State(state): State<Arc<AppState>>) -> ApiResult<Json<DeviceListResponse>> {
    let devices = state.lifecycle.list_devices().await?;
    let message = devices
        .is_empty()
        .then(|| "No serial devices connected".to_string());

    Ok(Json(DeviceListResponse { devices, message }))
}
