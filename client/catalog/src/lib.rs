//! # Catalog
//!
//! Everything the client knows about the backend: payload shapes and the HTTP
//! client that fetches them.
//!
//! ## Envelope
//!
//! Every JSON response is wrapped the same way.
//! ```json
//! { "success": true, "foods": [...], "totalHits": 10 }
//! { "success": false, "error": "Food item not found" }
//! ```
//! - `success: false` or a non-2xx status is always an error
//! - 429 carries an optional `retry_after` in seconds
//! - Field casing is whatever the backend route uses, camelCase for USDA data
//!   and snake_case for user data
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use reqwest::StatusCode;
use serde::{Deserialize, Deserializer, de::DeserializeOwned};
use serde_json::Value;

pub mod cancel;
pub mod error;
pub mod foods;
pub mod meals;
pub mod profile;
pub mod remote;

pub use cancel::CancelToken;
pub use error::ApiError;
use error::{DEFAULT_RATE_LIMIT_MESSAGE, DEFAULT_RETRY_AFTER};

pub type FdcId = u64;

pub fn read_envelope<T: DeserializeOwned>(
    status: StatusCode,
    body: &[u8],
    fallback: &str,
) -> Result<T, ApiError> {
    let value: Value = if body.is_empty() {
        Value::Null
    } else {
        match serde_json::from_slice(body) {
            Ok(value) => value,
            Err(_) if !status.is_success() => Value::Null,
            Err(e) => return Err(e.into()),
        }
    };

    let message = value
        .get("error")
        .and_then(Value::as_str)
        .map(str::to_string);

    if status == StatusCode::TOO_MANY_REQUESTS {
        let retry_after = value
            .get("retry_after")
            .and_then(Value::as_u64)
            .unwrap_or(DEFAULT_RETRY_AFTER);

        return Err(ApiError::RateLimited {
            retry_after,
            message: message.unwrap_or_else(|| DEFAULT_RATE_LIMIT_MESSAGE.to_string()),
        });
    }

    let succeeded = value.get("success").and_then(Value::as_bool).unwrap_or(true);
    if !status.is_success() || !succeeded {
        return Err(ApiError::Rejected(
            message.unwrap_or_else(|| fallback.to_string()),
        ));
    }

    Ok(serde_json::from_value(value)?)
}

/// SQLite hands back `CURRENT_TIMESTAMP` as `YYYY-MM-DD HH:MM:SS` in UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }

    ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
        .map(|naive| naive.and_utc())
}

pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    raw.get(..10)
        .and_then(|prefix| NaiveDate::parse_from_str(prefix, "%Y-%m-%d").ok())
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawId {
    Number(u64),
    Text(String),
}

// fdc ids are stored as TEXT on the backend, so they come back either way
pub(crate) fn fdc_id<'de, D>(deserializer: D) -> Result<FdcId, D::Error>
where
    D: Deserializer<'de>,
{
    match RawId::deserialize(deserializer)? {
        RawId::Number(id) => Ok(id),
        RawId::Text(text) => text.trim().parse().map_err(serde::de::Error::custom),
    }
}

pub(crate) fn lenient_f64<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or_default())
}
