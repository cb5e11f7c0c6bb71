pub mod containers;
pub mod devices;

use uuid::Uuid;

use crate::server::rest::error::{ApiError, ApiResult};

/// Container ids arrive as plain strings from the frontend.
pub(crate) fn parse_id(raw: &str) -> ApiResult<Uuid> {
    Uuid::parse_str(raw.trim())
        .map_err(|_| ApiError::BadRequest(format!("Invalid container id: {}", raw)))
}
