//! Request dispatch module
//!
//! hyper service entry point: extracts the raw request path, delegates to
//! the resolver, transmits the resulting plan, and writes the access log.

use crate::config::AppState;
use crate::http::response;
use crate::logger;
use http_body_util::Full;
use hyper::body::Bytes;
use hyper::{Method, Request, Response};
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

/// Main entry point for HTTP request handling.
///
/// Infallible: every request gets a response, whatever the resolver found.
pub async fn handle_request(
    req: Request<hyper::body::Incoming>,
    state: Arc<AppState>,
    peer_addr: SocketAddr,
) -> Result<Response<Full<Bytes>>, Infallible> {
    let started = Instant::now();
    let is_head = *req.method() == Method::HEAD;

    // The resolver strips query and fragment itself; hand it the
    // path-and-query exactly as received.
    let raw_path = req
        .uri()
        .path_and_query()
        .map_or_else(|| req.uri().path().to_string(), ToString::to_string);

    let plan = state.resolver.resolve(&raw_path).await;

    if state.access_log {
        let mut entry = logger::AccessLogEntry::new(
            peer_addr.ip().to_string(),
            req.method().to_string(),
            req.uri().path().to_string(),
        );
        entry.query = req.uri().query().map(ToString::to_string);
        entry.status = plan.status;
        entry.body_bytes = plan.body.len();
        entry.request_time_us = u64::try_from(started.elapsed().as_micros()).unwrap_or(u64::MAX);
        entry.referer = header_value(&req, "referer");
        entry.user_agent = header_value(&req, "user-agent");
        logger::log_access(&entry, &state.config.logging.access_log_format);
    }

    Ok(response::from_plan(plan, is_head))
}

fn header_value(req: &Request<hyper::body::Incoming>, name: &str) -> Option<String> {
    req.headers()
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(ToString::to_string)
}
