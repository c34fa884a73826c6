use crate::database::ContextError;
use log::{error, warn};
use rocket::response::{Responder, Response};
use rocket::{Request, http::Status};
use std::io::Cursor;

#[derive(Debug)]
pub enum ApiError {
    DatabaseError(String),
    NotFound(String),
    Conflict(String),
    ServiceUnavailable(String),
    InternalServerError(String),
}

impl<'r> Responder<'r, 'static> for ApiError {
    fn respond_to(self, _: &'r Request<'_>) -> rocket::response::Result<'static> {
        let (status, message) = match self {
            ApiError::DatabaseError(msg) => (Status::InternalServerError, msg),
            ApiError::NotFound(msg) => (Status::NotFound, msg),
            ApiError::Conflict(msg) => (Status::Conflict, msg),
            ApiError::ServiceUnavailable(msg) => (Status::ServiceUnavailable, msg),
            ApiError::InternalServerError(msg) => (Status::InternalServerError, msg),
        };

        Response::build()
            .status(status)
            .header(rocket::http::ContentType::Plain)
            .sized_body(message.len(), Cursor::new(message))
            .ok()
    }
}

impl From<ContextError> for ApiError {
    fn from(err: ContextError) -> Self {
        match err {
            ContextError::ReadOnly(msg) => {
                warn!("Write rejected in read-only mode");
                ApiError::ServiceUnavailable(msg)
            }
            ContextError::Storage(diesel::result::Error::NotFound) => {
                ApiError::NotFound("Record not found".to_string())
            }
            err if err.is_foreign_key_violation() => ApiError::Conflict(err.to_string()),
            ContextError::Storage(e) => {
                error!("Storage error: {e}");
                ApiError::DatabaseError(format!("Database error: {e}"))
            }
            other => {
                error!("Persistence failure: {other}");
                ApiError::InternalServerError(other.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_only_maps_to_service_unavailable() {
        let api: ApiError = ContextError::read_only().into();
        match api {
            ApiError::ServiceUnavailable(msg) => assert!(msg.contains("read only mode")),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_missing_row_maps_to_not_found() {
        let api: ApiError = ContextError::Storage(diesel::result::Error::NotFound).into();
        assert!(matches!(api, ApiError::NotFound(_)));
    }
}
