//! Diagnostic request handling shared by every HTTP front end.
//!
//! The device answers exactly one diagnostic question, `GET /id`, with the
//! application identifier. Front ends (the esp-idf httpd on hardware, axum
//! on desktop) translate their native request into [`HttpRequest`] and send
//! back whatever [`respond`] returns. Firmware upload on
//! [`FIRMWARE_UPDATE_PATH`] is platform specific and handled by the front
//! end itself.

use alloc::string::String;

use crate::traits::{HttpMethod, HttpRequest, HttpResponse};

/// Path answering with the application identifier.
pub const APP_ID_PATH: &str = "/id";

/// Path accepting firmware images.
pub const FIRMWARE_UPDATE_PATH: &str = "/update";

/// Errors raised while servicing diagnostics.
#[derive(Debug, thiserror::Error)]
pub enum DiagnosticsError {
    /// The background server is no longer running.
    #[error("diagnostic server stopped")]
    ServerStopped,
    /// Writing or finalizing a firmware image failed.
    #[error("firmware update failed: {0}")]
    Update(String),
}

/// Answer a diagnostic request.
///
/// ```rust
/// use sensor_node::diagnostics::respond;
/// use sensor_node::traits::{HttpMethod, HttpRequest};
///
/// let resp = respond(&HttpRequest::new(HttpMethod::Get, "/id"), "336141");
/// assert_eq!(resp.status, 200);
/// assert_eq!(resp.body_str(), Some("336141"));
///
/// let resp = respond(&HttpRequest::new(HttpMethod::Get, "/nope"), "336141");
/// assert_eq!(resp.status, 404);
/// ```
pub fn respond(request: &HttpRequest, app_id: &str) -> HttpResponse {
    match (request.method, request.path.as_str()) {
        (HttpMethod::Get, APP_ID_PATH) => HttpResponse::ok_text(app_id),
        _ => HttpResponse::not_found(),
    }
}
