//! HTTP response handlers.

use anyhow::{Context, Result};
use std::{fs, path::Path};
use tiny_http::{Header, Method, Request, Response, StatusCode};

use crate::utils::mime::types::PLAIN;

/// Respond with an artifact.
///
/// Artifacts change on every rebuild, so caching is disabled.
pub fn respond_file(request: Request, path: &Path) -> Result<()> {
    let content_type = crate::utils::mime::from_path(path);

    if is_head_request(&request) {
        let response = Response::empty(StatusCode(200));
        return send(request, response, content_type);
    }

    let body = fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    send(request, Response::from_data(body), content_type)
}

/// Respond with 404.
pub fn respond_not_found(request: Request) -> Result<()> {
    send_text(request, 404, "404 Not Found")
}

/// Respond with 503 while the initial build has not finished yet.
pub fn respond_loading(request: Request) -> Result<()> {
    send_text(request, 503, "503 initial build in progress")
}

/// Respond with 503 Service Unavailable (server shutting down).
pub fn respond_unavailable(request: Request) -> Result<()> {
    send_text(request, 503, "503 Service Unavailable")
}

fn is_head_request(request: &Request) -> bool {
    request.method() == &Method::Head
}

fn send_text(request: Request, status: u16, text: &str) -> Result<()> {
    let response = Response::from_string(text).with_status_code(StatusCode(status));
    send(request, response, PLAIN)
}

fn send<R: std::io::Read>(
    request: Request,
    response: Response<R>,
    content_type: &'static str,
) -> Result<()> {
    let response = response
        .with_header(make_header("Content-Type", content_type))
        .with_header(make_header("Cache-Control", "no-store"))
        .with_header(make_header("Access-Control-Allow-Origin", "*"));
    request.respond(response)?;
    Ok(())
}

fn make_header(key: &'static str, value: &'static str) -> Header {
    // Static ASCII pairs always form a valid header
    Header::from_bytes(key, value).unwrap_or_else(|()| unreachable!())
}
