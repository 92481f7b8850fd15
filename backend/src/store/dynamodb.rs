//! DynamoDB tally table.
//!
//! Layout: partition key `key_attribute` (string, `VOTE_ID` by default) and a
//! numeric `votes` attribute maintained exclusively through `ADD`.

use std::collections::HashMap;
use std::fmt::Debug;
use aws_config::{meta::region::RegionProviderChain, BehaviorVersion};
use aws_sdk_dynamodb::{
    config::Region,
    error::{DisplayErrorContext, ProvideErrorMetadata, SdkError},
    types::AttributeValue,
    Client,
};
use shared::models::{OptionId, OptionRecord};
use tracing::{debug, info};
use super::{Page, PageToken, StoreError, TallyStore, UnknownOptionPolicy};

pub const DEFAULT_KEY_ATTRIBUTE: &str = "VOTE_ID";
pub const DEFAULT_REGION: &str = "ap-southeast-1";
pub const VOTES_ATTRIBUTE: &str = "votes";

const THROTTLING_CODES: &[&str] = &[
    "ProvisionedThroughputExceededException",
    "RequestLimitExceeded",
    "ThrottlingException",
];
const PERMISSION_CODES: &[&str] = &[
    "AccessDeniedException",
    "UnrecognizedClientException",
    "MissingAuthenticationTokenException",
];

/// Builds an SDK client. The region falls back from the configured value to the
/// default AWS provider chain and finally to [`DEFAULT_REGION`].
pub async fn create_client(region: Option<String>, endpoint_url: Option<String>) -> Client {
    let region_provider = RegionProviderChain::first_try(region.map(Region::new))
        .or_default_provider()
        .or_else(Region::new(DEFAULT_REGION));

    let mut loader = aws_config::defaults(BehaviorVersion::latest()).region(region_provider);
    if let Some(url) = endpoint_url {
        info!(%url, "using DynamoDB endpoint override");
        loader = loader.endpoint_url(url);
    }

    Client::new(&loader.load().await)
}

#[derive(Clone, Debug)]
pub struct DynamoStore {
    client: Client,
    table_name: String,
    key_attribute: String,
    page_size: Option<i32>,
}

impl DynamoStore {
    pub fn new(client: Client, table_name: impl Into<String>, key_attribute: impl Into<String>) -> Self {
        Self {
            client,
            table_name: table_name.into(),
            key_attribute: key_attribute.into(),
            page_size: None,
        }
    }

    pub fn with_page_size(mut self, page_size: Option<usize>) -> Self {
        self.page_size = page_size.map(|size| i32::try_from(size).unwrap_or(i32::MAX));
        self
    }
}

#[rocket::async_trait]
impl TallyStore for DynamoStore {
    async fn increment(&self, id: &OptionId, policy: UnknownOptionPolicy) -> Result<(), StoreError> {
        let mut request = self
            .client
            .update_item()
            .table_name(&self.table_name)
            .key(&self.key_attribute, AttributeValue::S(id.to_string()))
            .update_expression("ADD #votes :inc")
            .expression_attribute_names("#votes", VOTES_ATTRIBUTE)
            .expression_attribute_values(":inc", AttributeValue::N("1".into()));

        if policy == UnknownOptionPolicy::Reject {
            request = request
                .condition_expression("attribute_exists(#key)")
                .expression_attribute_names("#key", &self.key_attribute);
        }

        request.send().await.map_err(|err| classify(err, Some(id)))?;
        debug!(table = %self.table_name, option = %id, "incremented tally");
        Ok(())
    }

    async fn scan_page(&self, start: Option<PageToken>) -> Result<Page, StoreError> {
        let start_key = start.map(|token| exclusive_start_key(token, &self.key_attribute));
        let output = self
            .client
            .scan()
            .table_name(&self.table_name)
            .set_exclusive_start_key(start_key)
            .set_limit(self.page_size)
            .send()
            .await
            .map_err(|err| classify(err, None))?;

        let records = output
            .items()
            .iter()
            .map(|item| record_from_item(item, &self.key_attribute))
            .collect::<Result<Vec<_>, _>>()?;

        let next = output
            .last_evaluated_key()
            .map(|key| token_from_key(key, &self.key_attribute))
            .transpose()?;

        debug!(table = %self.table_name, count = records.len(), more = next.is_some(), "scanned page");
        Ok(Page { records, next })
    }

    fn name(&self) -> &'static str {
        "dynamodb"
    }
}

fn classify<E, R>(err: SdkError<E, R>, id: Option<&OptionId>) -> StoreError
where
    E: ProvideErrorMetadata + std::error::Error + Send + Sync + 'static,
    R: Debug,
{
    if matches!(err, SdkError::TimeoutError(_)) {
        return StoreError::Unavailable("request timed out in the SDK".into());
    }
    let code = err.code().map(str::to_owned);
    let message = err
        .message()
        .map(str::to_owned)
        .unwrap_or_else(|| DisplayErrorContext(&err).to_string());
    classify_code(code.as_deref(), message, id)
}

/// Maps a DynamoDB error code onto the store taxonomy.
pub fn classify_code(code: Option<&str>, message: String, id: Option<&OptionId>) -> StoreError {
    match (code, id) {
        (Some("ConditionalCheckFailedException"), Some(id)) => StoreError::UnknownOption(id.to_string()),
        (Some(code), _) if THROTTLING_CODES.contains(&code) => StoreError::Throttled(message),
        (Some(code), _) if PERMISSION_CODES.contains(&code) => StoreError::PermissionDenied(message),
        _ => StoreError::Unavailable(message),
    }
}

pub fn record_from_item(
    item: &HashMap<String, AttributeValue>,
    key_attribute: &str,
) -> Result<OptionRecord, StoreError> {
    let id = item
        .get(key_attribute)
        .ok_or_else(|| StoreError::Malformed(format!("item without {key_attribute}")))?
        .as_s()
        .map_err(|_| StoreError::Malformed(format!("{key_attribute} is not a string")))?;

    let votes = match item.get(VOTES_ATTRIBUTE) {
        None => 0,
        Some(value) => {
            let raw = value
                .as_n()
                .map_err(|_| StoreError::Malformed(format!("{VOTES_ATTRIBUTE} of {id} is not a number")))?;
            parse_tally(raw)?
        }
    };

    Ok(OptionRecord::new(id.clone(), votes))
}

pub fn exclusive_start_key(token: PageToken, key_attribute: &str) -> HashMap<String, AttributeValue> {
    HashMap::from([(key_attribute.to_owned(), AttributeValue::S(token.0))])
}

pub fn token_from_key(
    key: &HashMap<String, AttributeValue>,
    key_attribute: &str,
) -> Result<PageToken, StoreError> {
    key.get(key_attribute)
        .and_then(|value| value.as_s().ok())
        .map(|last| PageToken(last.clone()))
        .ok_or_else(|| StoreError::Malformed(format!("LastEvaluatedKey without string {key_attribute}")))
}

/// Normalizes a DynamoDB number (an arbitrary-precision decimal string) to a
/// plain integer. `"7"`, `"7.0"` and `"0.7E1"` are all 7; fractional, negative
/// or out-of-range values are malformed.
pub fn parse_tally(raw: &str) -> Result<u64, StoreError> {
    let malformed = || StoreError::Malformed(format!("tally {raw:?} is not a non-negative integer"));
    let text = raw.trim();
    if let Ok(votes) = text.parse::<u64>() {
        return Ok(votes);
    }

    let (mantissa, exponent) = match text.find(|c: char| c == 'e' || c == 'E') {
        Some(at) => (&text[..at], text[at + 1..].parse::<i64>().map_err(|_| malformed())?),
        None => (text, 0),
    };
    let mantissa = mantissa.strip_prefix('+').unwrap_or(mantissa);
    let (whole, fraction) = mantissa.split_once('.').unwrap_or((mantissa, ""));
    if whole.is_empty() && fraction.is_empty() {
        return Err(malformed());
    }
    if !whole.chars().chain(fraction.chars()).all(|c| c.is_ascii_digit()) {
        return Err(malformed());
    }

    // value = digits * 10^shift
    let digits = format!("{whole}{fraction}");
    let shift = exponent.saturating_sub(fraction.len() as i64);
    let significant = digits.trim_start_matches('0');
    if significant.is_empty() {
        return Ok(0);
    }

    let integral = if shift >= 0 {
        if (significant.len() as i64).saturating_add(shift) > 20 {
            return Err(malformed());
        }
        let mut integral = significant.to_owned();
        integral.extend(std::iter::repeat('0').take(shift as usize));
        integral
    } else {
        let cut = shift.unsigned_abs() as usize;
        if cut > significant.len() {
            return Err(malformed());
        }
        let (kept, dropped) = significant.split_at(significant.len() - cut);
        if dropped.chars().any(|c| c != '0') {
            return Err(malformed());
        }
        kept.to_owned()
    };

    integral.parse::<u64>().map_err(|_| malformed())
}
