use std::sync::Arc;
use std::time::Duration;
use rocket::{State, get, post, http::Status, serde::json::{self, Json}};
use tracing::{info, instrument};
use shared::models::{Acknowledgement, OptionsResponse, VoteRequest};
use crate::{
    error::ApiError,
    processor::{OptionLister, VoteRecorder},
    store::{TallyStore, UnknownOptionPolicy},
};

pub struct AppState {
    pub recorder: VoteRecorder,
    pub lister: OptionLister,
}

impl AppState {
    pub fn new(store: Arc<dyn TallyStore>, policy: UnknownOptionPolicy, timeout: Duration) -> Self {
        Self {
            recorder: VoteRecorder::new(Arc::clone(&store), policy, timeout),
            lister: OptionLister::new(store, timeout),
        }
    }
}

#[rocket::options("/<_..>")]
pub async fn preflight() -> Status {
    Status::Ok
}

#[instrument(skip(state, request))]
#[post("/vote", data = "<request>")]
pub async fn cast_vote(
    state: &State<AppState>,
    request: Result<Json<VoteRequest>, json::Error<'_>>,
) -> Result<Json<Acknowledgement>, ApiError> {
    info!("cast vote called");
    let request = request.map_err(|e| ApiError::MalformedBody(e.to_string()))?;

    let id = state.recorder.record(&request).await?;
    info!(option = %id, "vote recorded");
    Ok(Json(Acknowledgement::success()))
}

#[instrument(skip(state))]
#[get("/vote")]
pub async fn list_options(state: &State<AppState>) -> Result<Json<OptionsResponse>, ApiError> {
    info!("list options called");
    let response = OptionsResponse { data: state.lister.list().await? };

    info!(count = response.data.len(), total_votes = response.total_votes(), "returning options");
    Ok(Json(response))
}
