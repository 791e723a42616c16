//! Verbose request/response logging at a caller-chosen level.

use crate::{metadata::PendingRequest, response::RawResponse};
use http::header::AUTHORIZATION;
use http::HeaderMap;
use std::time::Duration;
use tracing::Level;

macro_rules! event_at {
    ($level:expr, $($args:tt)+) => {
        if $level == Level::ERROR {
            tracing::error!($($args)+)
        } else if $level == Level::WARN {
            tracing::warn!($($args)+)
        } else if $level == Level::INFO {
            tracing::info!($($args)+)
        } else if $level == Level::DEBUG {
            tracing::debug!($($args)+)
        } else {
            tracing::trace!($($args)+)
        }
    };
}

/// Logs the outgoing request, if request logging is enabled.
pub(crate) fn log_request(level: Option<Level>, request: &PendingRequest) {
    let Some(level) = level else { return };

    let body = request
        .body
        .as_deref()
        .map(String::from_utf8_lossy)
        .unwrap_or_default();

    event_at!(
        level,
        method = %request.method,
        url = %request.url,
        headers = %describe_headers(&request.headers),
        body = %body,
        "HTTP request"
    );
}

/// Logs the received response, if response logging is enabled.
pub(crate) fn log_response(level: Option<Level>, response: &RawResponse, latency: Duration) {
    let Some(level) = level else { return };

    event_at!(
        level,
        status = response.status.as_u16(),
        latency_ms = latency.as_millis(),
        headers = %describe_headers(&response.headers),
        body = %response.text(),
        "HTTP response"
    );
}

/// Renders headers as `name: value` lines with credentials masked.
fn describe_headers(headers: &HeaderMap) -> String {
    headers
        .iter()
        .map(|(name, value)| {
            let value = if name == AUTHORIZATION {
                "<redacted>"
            } else {
                value.to_str().unwrap_or("<binary>")
            };
            format!("{}: {}", name, value)
        })
        .collect::<Vec<_>>()
        .join(", ")
}
