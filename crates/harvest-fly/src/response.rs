//! Scrape API response decoding.
//!
//! A successful call returns `{"result": {"content", "status_code", ...}}` with
//! the request cost in the `X-Scrapfly-Api-Cost` header. A failed call returns
//! `{"code": "ERR::...", "message": ...}`, or a `result.error` object when the
//! upstream fetch itself failed.

use harvest_engine::backend::{FetchFailure, FetchResponse};
use harvest_engine::{CostToken, FetchError};
use serde::Deserialize;

pub const COST_HEADER: &str = "X-Scrapfly-Api-Cost";

#[derive(Debug, Deserialize)]
struct ScrapeBody {
    result: Option<ScrapeResult>,
    code: Option<String>,
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ScrapeResult {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    status_code: Option<u16>,
    #[serde(default)]
    error: Option<ServiceError>,
}

#[derive(Debug, Deserialize)]
struct ServiceError {
    code: String,
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
struct AccountBody {
    subscription: Subscription,
}

#[derive(Debug, Deserialize)]
struct Subscription {
    usage: Usage,
}

#[derive(Debug, Deserialize)]
struct Usage {
    scrape: ScrapeUsage,
}

#[derive(Debug, Deserialize)]
struct ScrapeUsage {
    remaining: u64,
}

/// Decodes a scrape response. Failures keep `cost`, since the service bills
/// some failed calls.
pub fn parse_scrape(
    http_status: u16,
    body: &str,
    cost: CostToken,
) -> Result<FetchResponse, FetchFailure> {
    match decode_scrape(http_status, body) {
        Ok((content, status)) => Ok(FetchResponse {
            content,
            status,
            cost,
        }),
        Err(error) => Err(FetchFailure::charged(error, cost)),
    }
}

fn decode_scrape(http_status: u16, body: &str) -> Result<(String, u16), FetchError> {
    let parsed: ScrapeBody = serde_json::from_str(body).map_err(|e| {
        if (200..300).contains(&http_status) {
            FetchError::Malformed(e.to_string())
        } else {
            FetchError::Service {
                code: format!("HTTP_{}", http_status),
                message: truncate(body, 200),
            }
        }
    })?;

    if let Some(code) = parsed.code {
        return Err(FetchError::Service {
            code,
            message: parsed.message.unwrap_or_default(),
        });
    }

    let result = parsed
        .result
        .ok_or_else(|| FetchError::Malformed("missing result object".into()))?;

    if let Some(err) = result.error {
        return Err(FetchError::Service {
            code: err.code,
            message: err.message,
        });
    }

    if !(200..300).contains(&http_status) {
        return Err(FetchError::Service {
            code: format!("HTTP_{}", http_status),
            message: "scrape call failed without an error code".into(),
        });
    }

    Ok((
        result.content.unwrap_or_default(),
        result.status_code.unwrap_or(http_status),
    ))
}

pub fn parse_account(body: &str) -> Result<u64, FetchError> {
    let account: AccountBody = serde_json::from_str(body)?;
    Ok(account.subscription.usage.scrape.remaining)
}

fn truncate(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => format!("{}...", &s[..idx]),
        None => s.to_string(),
    }
}
