use rocket::http::Status;
use rocket::response::Responder;
use rocket::serde::json::Json;
use shared::{validation::ValidationError, ErrorCode, ErrorResponse};
use thiserror::Error;
use tracing::{error, warn};
use crate::store::StoreError;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Malformed request body: {0}")]
    MalformedBody(String),
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ApiError {
    pub fn code(&self) -> ErrorCode {
        match self {
            ApiError::MalformedBody(_) | ApiError::Validation(_) => ErrorCode::InvalidInput,
            ApiError::Store(_) => ErrorCode::SystemError,
        }
    }

    /// Server faults never leak store details to the caller.
    pub fn body(&self) -> ErrorResponse {
        match self.code() {
            ErrorCode::SystemError => ErrorResponse::new(ErrorCode::SystemError),
            code => ErrorResponse::with_details(code, self.to_string()),
        }
    }
}

impl<'r, 'o: 'r> Responder<'r, 'o> for ApiError {
    fn respond_to(self, req: &'r rocket::Request<'_>) -> rocket::response::Result<'o> {
        let code = self.code();
        let status = Status::from_code(code.status()).unwrap_or(Status::InternalServerError);
        match (&self, code) {
            (ApiError::Store(StoreError::UnknownOption(option)), _) => {
                warn!(%status, uri = %req.uri(), %option, "vote for unknown option")
            }
            (_, ErrorCode::SystemError) => error!(%status, uri = %req.uri(), "request failed: {}", self),
            _ => warn!(%status, uri = %req.uri(), "request rejected: {}", self),
        }

        rocket::Response::build_from(Json(self.body()).respond_to(req)?)
            .status(status)
            .ok()
    }
}
