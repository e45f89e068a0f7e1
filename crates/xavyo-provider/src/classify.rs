//! Error classifier
//!
//! Turns a raw HTTP status and response body into an [`ApiError`]. The
//! function is total: malformed error payloads are an expected failure mode
//! and degrade to [`ErrorKind::Unknown`] with the status preserved.

use reqwest::StatusCode;
use serde::Deserialize;

use crate::error::{ApiError, ErrorKind};

/// Longest slice of a non-JSON body kept as the error message.
const MAX_RAW_MESSAGE_LEN: usize = 512;

#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

/// Classify a failed response.
pub fn classify(status: u16, body: &str) -> ApiError {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return unknown(status, reason_phrase(status));
    }

    let parsed = match serde_json::from_str::<ErrorBody>(trimmed) {
        Ok(parsed) => parsed,
        Err(_) => return unknown(status, truncate(trimmed)),
    };

    let message = parsed
        .message
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| reason_phrase(status));

    match parsed.code.filter(|c| !c.trim().is_empty()) {
        Some(code) => {
            let kind =
                ErrorKind::from_code(&code).unwrap_or_else(|| ErrorKind::from_status(status));
            ApiError::new(kind, code, message, status)
        }
        None => {
            let kind = ErrorKind::from_status(status);
            ApiError::new(kind, kind.code(), message, status)
        }
    }
}

fn unknown(status: u16, message: String) -> ApiError {
    ApiError::new(ErrorKind::Unknown, ErrorKind::Unknown.code(), message, status)
}

fn reason_phrase(status: u16) -> String {
    StatusCode::from_u16(status)
        .ok()
        .and_then(|s| s.canonical_reason())
        .map_or_else(|| format!("HTTP {status}"), str::to_string)
}

fn truncate(raw: &str) -> String {
    if raw.len() <= MAX_RAW_MESSAGE_LEN {
        return raw.to_string();
    }
    let mut end = MAX_RAW_MESSAGE_LEN;
    while !raw.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &raw[..end])
}
