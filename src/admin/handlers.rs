use axum::{
    extract::{rejection::JsonRejection, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::admin::AdminState;
use crate::registry::endpoint::validate_endpoint;
use crate::registry::{ApplyOutcome, Operation, RegistrationRequest};

#[derive(Debug, Serialize)]
pub struct OperationStatus {
    pub status: &'static str,
    pub changed: bool,
    pub persisted: bool,
}

#[derive(Debug, Serialize)]
pub struct ErrorStatus {
    pub status: &'static str,
    pub message: String,
}

/// Error answer of the admin surface.
#[derive(Debug)]
pub enum AdminError {
    BadRequest(String),
    Internal(String),
}

impl IntoResponse for AdminError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AdminError::BadRequest(message) => (StatusCode::BAD_REQUEST, message),
            AdminError::Internal(message) => (StatusCode::INTERNAL_SERVER_ERROR, message),
        };
        let body = ErrorStatus {
            status: "error",
            message,
        };
        (status, Json(body)).into_response()
    }
}

pub async fn add_host(
    State(state): State<AdminState>,
    payload: Result<Json<RegistrationRequest>, JsonRejection>,
) -> Result<Json<OperationStatus>, AdminError> {
    apply(state, Operation::Add, payload).await
}

pub async fn remove_host(
    State(state): State<AdminState>,
    payload: Result<Json<RegistrationRequest>, JsonRejection>,
) -> Result<Json<OperationStatus>, AdminError> {
    apply(state, Operation::Remove, payload).await
}

/// Current routing configuration in its file form.
pub async fn list_hosts(State(state): State<AdminState>) -> Response {
    let body = state.manager.to_json();
    ([(header::CONTENT_TYPE, "application/json")], body).into_response()
}

async fn apply(
    state: AdminState,
    operation: Operation,
    payload: Result<Json<RegistrationRequest>, JsonRejection>,
) -> Result<Json<OperationStatus>, AdminError> {
    let Json(request) = payload.map_err(|rejection| {
        tracing::warn!(op = %operation, error = %rejection.body_text(), "Rejected admin request");
        AdminError::BadRequest(rejection.body_text())
    })?;
    let request = validate(request).map_err(|message| {
        tracing::warn!(op = %operation, error = %message, "Rejected admin request");
        AdminError::BadRequest(message)
    })?;

    let manager = state.manager.clone();
    let outcome: ApplyOutcome =
        tokio::task::spawn_blocking(move || manager.apply(operation, &request))
            .await
            .map_err(|e| AdminError::Internal(e.to_string()))?;

    Ok(Json(OperationStatus {
        status: "ok",
        changed: outcome.changed,
        persisted: outcome.persisted,
    }))
}

fn validate(request: RegistrationRequest) -> Result<RegistrationRequest, String> {
    let name = request.name.trim();
    if name.is_empty() {
        return Err("name must not be empty".to_string());
    }
    let url = validate_endpoint(&request.url).map_err(|e| e.to_string())?;
    Ok(RegistrationRequest::new(request.scope, name, url))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::Scope;

    #[test]
    fn test_validate_trims_and_normalizes() {
        let request = validate(RegistrationRequest::container(" unit-1 ", "http://h1:8080/")).unwrap();
        assert_eq!(request, RegistrationRequest::new(Scope::Container, "unit-1", "http://h1:8080"));
    }

    #[test]
    fn test_validate_rejects() {
        assert!(validate(RegistrationRequest::container("  ", "http://h1:8080")).is_err());
        assert!(validate(RegistrationRequest::container("unit-1", "")).is_err());
        assert!(validate(RegistrationRequest::container("unit-1", "ftp://h1")).is_err());
        assert!(validate(RegistrationRequest::server("s1", "not a url")).is_err());
    }
}
