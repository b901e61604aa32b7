//! Offline Responses
//!
//! Synthesized responses for requests that can be served neither from the
//! network nor from a cache.

use serde::Serialize;
use serde_json::Value;

use super::fetch::Response;

const JSON: &str = "application/json";

/// Last-known-data placeholder returned for API reads while offline.
///
/// Every collection is empty so clients can render without special-casing.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OfflineSnapshot<'a> {
    pub status: &'static str,
    pub offline: bool,
    pub user_status: &'static str,
    pub users: &'static [Value],
    pub comments: &'static [Value],
    pub announcements: &'static [Value],
    pub view_counts: &'static [Value],
    pub announcements_view_counts: &'static [Value],
    pub message: &'a str,
}

/// Body returned when a mutating API call cannot reach the network
#[derive(Debug, Clone, Serialize)]
pub struct OfflineMutation<'a> {
    pub status: &'static str,
    pub message: &'a str,
}

/// HTTP 200 JSON snapshot for API reads
pub fn api_snapshot(message: &str) -> Response {
    let body = OfflineSnapshot {
        status: "offline",
        offline: true,
        user_status: "pending",
        users: &[],
        comments: &[],
        announcements: &[],
        view_counts: &[],
        announcements_view_counts: &[],
        message,
    };
    json_response(200, &body)
}

/// HTTP 503 JSON body for API writes: the action did not happen
pub fn api_mutation(message: &str) -> Response {
    json_response(
        503,
        &OfflineMutation {
            status: "offline",
            message,
        },
    )
}

/// Minimal page for navigations with nothing cached
pub fn notice() -> Response {
    Response::new(503)
        .with_header("Content-Type", "text/plain; charset=utf-8")
        .with_body("offline")
}

/// Empty 503 for sub-resources with nothing cached
pub fn unavailable() -> Response {
    Response::new(503)
}

fn json_response<T: Serialize>(status: u16, body: &T) -> Response {
    match serde_json::to_vec(body) {
        Ok(bytes) => Response::new(status)
            .with_header("Content-Type", JSON)
            .with_body(bytes),
        Err(e) => {
            log::error!("[SW] Failed to encode offline body: {}", e);
            unavailable()
        }
    }
}
