//! HTTP response transmission module
//!
//! Converts a resolved `ResponsePlan` into a hyper response, verbatim.

use crate::handler::resolver::ResponsePlan;
use crate::logger;
use http_body_util::Full;
use hyper::body::Bytes;
use hyper::Response;

/// Transmit a plan: status line, headers, then body bytes.
///
/// HEAD requests carry the same status and headers with an empty body;
/// Content-Length still reflects the full representation.
pub fn from_plan(plan: ResponsePlan, is_head: bool) -> Response<Full<Bytes>> {
    let status = plan.status;
    let mut builder = Response::builder()
        .status(status)
        .header("Content-Length", plan.body.len());

    for (name, value) in &plan.headers {
        builder = builder.header(*name, value);
    }

    let body = if is_head { Bytes::new() } else { plan.body };

    builder.body(Full::new(body)).unwrap_or_else(|e| {
        logger::log_error(&format!("Failed to build {status} response: {e}"));
        Response::new(Full::new(Bytes::new()))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    fn plan() -> ResponsePlan {
        ResponsePlan {
            status: 200,
            headers: vec![
                ("Content-Type", "text/css".to_string()),
                ("Cache-Control", "public, max-age=31536000".to_string()),
            ],
            body: Bytes::from("body{}"),
        }
    }

    #[tokio::test]
    async fn transmits_plan_verbatim() {
        let response = from_plan(plan(), false);
        assert_eq!(response.status(), 200);
        assert_eq!(response.headers()["Content-Type"], "text/css");
        assert_eq!(response.headers()["Cache-Control"], "public, max-age=31536000");
        assert_eq!(response.headers()["Content-Length"], "6");
        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(body, Bytes::from("body{}"));
    }

    #[tokio::test]
    async fn head_strips_body_but_keeps_length() {
        let response = from_plan(plan(), true);
        assert_eq!(response.status(), 200);
        assert_eq!(response.headers()["Content-Length"], "6");
        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert!(body.is_empty());
    }
}
