use crate::models::{OptionId, VoteRequest};

/// DynamoDB caps partition keys at 2048 bytes; stay well inside that for every backend.
pub const MAX_OPTION_ID_BYTES: usize = 1024;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("vote_ID is required")]
    MissingOptionId,
    #[error("vote_ID must not be empty")]
    EmptyOptionId,
    #[error("vote_ID exceeds maximum length of {MAX_OPTION_ID_BYTES} bytes ({0} given)")]
    OptionIdTooLong(usize),
    #[error("vote_ID must not contain control characters")]
    ControlCharacter,
}

pub fn validate_option_id(raw: &str) -> Result<OptionId, ValidationError> {
    if raw.trim().is_empty() { return Err(ValidationError::EmptyOptionId); }
    if raw.len() > MAX_OPTION_ID_BYTES { return Err(ValidationError::OptionIdTooLong(raw.len())); }
    if raw.chars().any(char::is_control) { return Err(ValidationError::ControlCharacter); }

    Ok(OptionId::new_unchecked(raw.to_owned()))
}

pub fn validate_vote_request(request: &VoteRequest) -> Result<OptionId, ValidationError> {
    let raw = request.vote_id.as_deref().ok_or(ValidationError::MissingOptionId)?;
    validate_option_id(raw)
}
