use serde::{Serialize, Deserialize};
use std::fmt;

pub const SUCCESS_MESSAGE: &str = "success";

/// A validated option identifier. Build one with [`crate::validate_option_id`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OptionId(String);

impl OptionId {
    pub(crate) fn new_unchecked(id: String) -> Self {
        Self(id)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for OptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OptionRecord {
    pub id: String,
    pub votes: u64,
}

impl OptionRecord {
    pub fn new(id: impl Into<String>, votes: u64) -> Self {
        Self { id: id.into(), votes }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct VoteRequest {
    #[serde(rename = "vote_ID", default)]
    pub vote_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Acknowledgement {
    pub message: String,
}

impl Acknowledgement {
    pub fn success() -> Self {
        Self { message: SUCCESS_MESSAGE.into() }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct OptionsResponse {
    pub data: Vec<OptionRecord>,
}

impl OptionsResponse {
    pub fn total_votes(&self) -> u64 {
        self.data.iter().fold(0, |total, record| total.saturating_add(record.votes))
    }
}
