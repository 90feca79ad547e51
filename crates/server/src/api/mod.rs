pub mod deliveries;
pub mod handlers;
pub mod orders;
pub mod routes;

pub use routes::create_router;

use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use serde::Serialize;

use pronto_core::{Actor, LifecycleError, Role, StoreError};

/// Error response body shared by all API handlers
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

pub(crate) type ApiError = (StatusCode, Json<ErrorResponse>);

pub(crate) fn error(status: StatusCode, message: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
}

/// Map a store failure to the HTTP status the caller can act on:
/// illegal transitions and lost CAS races are conflicts, role failures are
/// forbidden, unmet preconditions are unprocessable.
pub(crate) fn store_error(e: StoreError) -> ApiError {
    let status = match &e {
        StoreError::NotFound(_) => StatusCode::NOT_FOUND,
        StoreError::Conflict(_) => StatusCode::CONFLICT,
        StoreError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
        StoreError::Lifecycle(lifecycle) => match lifecycle {
            LifecycleError::InvalidTransition { .. } => StatusCode::CONFLICT,
            LifecycleError::Unauthorized { .. } => StatusCode::FORBIDDEN,
            LifecycleError::InvalidState { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            LifecycleError::InvalidCoordinates { .. } => StatusCode::BAD_REQUEST,
        },
        StoreError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    error(status, e.to_string())
}

/// Extract the acting identity from the `X-User-Id` / `X-User-Role` headers.
///
/// Authentication happens upstream; these headers carry the already-verified
/// identity into this service.
pub(crate) fn actor_from_headers(headers: &HeaderMap) -> Result<Actor, ApiError> {
    let user_id = headers
        .get("x-user-id")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| error(StatusCode::UNAUTHORIZED, "missing X-User-Id header"))?;

    let role = headers
        .get("x-user-role")
        .and_then(|v| v.to_str().ok())
        .and_then(Role::parse)
        .ok_or_else(|| {
            error(
                StatusCode::UNAUTHORIZED,
                "missing or unknown X-User-Role header",
            )
        })?;

    Ok(Actor::new(user_id, role))
}
