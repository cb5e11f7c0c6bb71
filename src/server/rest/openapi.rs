use utoipa::OpenApi;

use crate::docker::{ContainerSummary, DeviceInfo, ReconcileAction};
use crate::server::rest::{
    error::{ErrorDetails, ErrorResponse},
    handlers::{
        containers::{
            ContainerIdRequest, CreateContainerRequest, CreateContainerResponse, FailedContainer,
            MessageResponse, ReconcileResponse, ReconciledContainer, RenameContainerRequest,
        },
        devices::DeviceListResponse,
    },
};

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::server::rest::openapi::health,
        crate::server::rest::openapi::list_devices,
        crate::server::rest::openapi::list_containers,
        crate::server::rest::openapi::create_container,
        crate::server::rest::openapi::delete_container,
        crate::server::rest::openapi::restart_container,
        crate::server::rest::openapi::rename_container,
        crate::server::rest::openapi::reconcile,
    ),
    components(
        schemas(
            ErrorResponse,
            ErrorDetails,
            ContainerSummary,
            DeviceInfo,
            DeviceListResponse,
            CreateContainerRequest,
            CreateContainerResponse,
            ContainerIdRequest,
            RenameContainerRequest,
            MessageResponse,
            ReconcileAction,
            ReconcileResponse,
            ReconciledContainer,
            FailedContainer,
        )
    ),
    tags(
        (name = "Health", description = "Health check endpoints"),
        (name = "Devices", description = "Serial device discovery"),
        (name = "Containers", description = "OctoPrint container management"),
    ),
    info(
        title = "OctoPrint Manager REST API",
        version = "1.0.0",
        description = "Runs one OctoPrint container per attached 3D printer",
    ),
    servers(
        (url = "/", description = "Current server"),
    ),
)]
pub struct ApiDoc;

#[utoipa::path(
    get,
    path = "/api/health",
    tag = "Health",
    responses(
        (status = 200, description = "Service is healthy"),
    ),
)]
#[allow(dead_code)]
pub async fn health() {}

#[utoipa::path(
    get,
    path = "/api/listusb",
    tag = "Devices",
    responses(
        (status = 200, description = "Connected serial devices", body = DeviceListResponse),
        (status = 500, description = "Device directory unreadable", body = ErrorResponse),
    ),
)]
#[allow(dead_code)]
pub async fn list_devices() {}

#[utoipa::path(
    get,
    path = "/api/getcontainers",
    tag = "Containers",
    responses(
        (status = 200, description = "Recorded containers in creation order", body = Vec<ContainerSummary>),
    ),
)]
#[allow(dead_code)]
pub async fn list_containers() {}

#[utoipa::path(
    post,
    path = "/api/newcontainer",
    tag = "Containers",
    request_body = CreateContainerRequest,
    responses(
        (status = 201, description = "Container created and started", body = CreateContainerResponse),
        (status = 404, description = "Device not found", body = ErrorResponse),
        (status = 409, description = "No host port available", body = ErrorResponse),
        (status = 500, description = "Runtime or storage failure", body = ErrorResponse),
    ),
)]
#[allow(dead_code)]
pub async fn create_container() {}

#[utoipa::path(
    post,
    path = "/api/deletecontainer",
    tag = "Containers",
    request_body = ContainerIdRequest,
    responses(
        (status = 200, description = "Container deleted", body = MessageResponse),
        (status = 400, description = "Malformed id", body = ErrorResponse),
        (status = 404, description = "Unknown container", body = ErrorResponse),
    ),
)]
#[allow(dead_code)]
pub async fn delete_container() {}

#[utoipa::path(
    post,
    path = "/api/restartcontainer",
    tag = "Containers",
    request_body = ContainerIdRequest,
    responses(
        (status = 200, description = "Container restarted or recreated", body = MessageResponse),
        (status = 400, description = "Malformed id", body = ErrorResponse),
        (status = 404, description = "Unknown container or missing device", body = ErrorResponse),
    ),
)]
#[allow(dead_code)]
pub async fn restart_container() {}

#[utoipa::path(
    post,
    path = "/api/renamecontainer",
    tag = "Containers",
    request_body = RenameContainerRequest,
    responses(
        (status = 200, description = "Display name updated", body = MessageResponse),
        (status = 400, description = "Malformed id", body = ErrorResponse),
        (status = 404, description = "Unknown container", body = ErrorResponse),
    ),
)]
#[allow(dead_code)]
pub async fn rename_container() {}

#[utoipa::path(
    post,
    path = "/api/reconcile",
    tag = "Containers",
    responses(
        (status = 200, description = "Per-container reconciliation outcome", body = ReconcileResponse),
        (status = 500, description = "Store unreachable", body = ErrorResponse),
    ),
)]
#[allow(dead_code)]
pub async fn reconcile() {}
