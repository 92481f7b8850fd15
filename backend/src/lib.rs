pub mod catchers;
pub mod config;
pub mod cors;
pub mod error;
pub mod processor;
pub mod routes;
pub mod store;
pub mod utils;
pub use shared::{models::*, ErrorCode, ErrorResponse};

use rocket::{catchers, routes, Build, Rocket};
use crate::{
    catchers::{bad_request, fallback, internal_error, not_found, unprocessable},
    cors::CORS,
    routes::{cast_vote, list_options, preflight, AppState},
};

pub fn build_rocket(state: AppState) -> Rocket<Build> {
    rocket::build()
        .attach(CORS)
        .manage(state)
        .mount("/", routes![cast_vote, list_options, preflight])
        .register(
            "/",
            catchers![bad_request, not_found, unprocessable, internal_error, fallback],
        )
}
