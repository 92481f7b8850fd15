use rocket::{Request, catch, http::Status, serde::json::Json};
use shared::{ErrorCode, ErrorResponse};

#[catch(400)]
pub fn bad_request(_req: &Request) -> Json<ErrorResponse> {
    Json(ErrorResponse::new(ErrorCode::InvalidInput))
}

#[catch(404)]
pub fn not_found(_req: &Request) -> Json<ErrorResponse> {
    Json(ErrorResponse::new(ErrorCode::NotFound))
}

#[catch(422)]
pub fn unprocessable(_req: &Request) -> Json<ErrorResponse> {
    Json(ErrorResponse::new(ErrorCode::InvalidInput))
}

#[catch(500)]
pub fn internal_error(_req: &Request) -> Json<ErrorResponse> {
    Json(ErrorResponse::new(ErrorCode::SystemError))
}

#[catch(default)]
pub fn fallback(status: Status, _req: &Request) -> (Status, Json<ErrorResponse>) {
    let code = if status.code >= 500 {
        ErrorCode::SystemError
    } else if status == Status::NotFound || status == Status::MethodNotAllowed {
        ErrorCode::NotFound
    } else {
        ErrorCode::InvalidInput
    };
    (status, Json(ErrorResponse::new(code)))
}
