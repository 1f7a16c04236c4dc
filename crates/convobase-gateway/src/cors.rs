use axum::extract::Request;
use axum::http::{header::HeaderValue, Method, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

const ALLOW_ORIGIN: &str = "*";
const ALLOW_HEADERS: &str =
    "Content-Type,Authorization,X-Amz-Date,X-Api-Key,X-Amz-Security-Token";
const ALLOW_METHODS: &str = "GET,POST,PUT,DELETE,OPTIONS";

fn stamp(response: &mut Response) {
    let headers = response.headers_mut();
    headers.insert(
        "Access-Control-Allow-Origin",
        HeaderValue::from_static(ALLOW_ORIGIN),
    );
    headers.insert(
        "Access-Control-Allow-Headers",
        HeaderValue::from_static(ALLOW_HEADERS),
    );
    headers.insert(
        "Access-Control-Allow-Methods",
        HeaderValue::from_static(ALLOW_METHODS),
    );
}

/// Stamps the CORS headers on every response; `OPTIONS` on any path is a
/// preflight answered with an empty 200.
pub async fn apply(request: Request, next: Next) -> Response {
    if request.method() == Method::OPTIONS {
        let mut response = StatusCode::OK.into_response();
        stamp(&mut response);
        return response;
    }
    let mut response = next.run(request).await;
    stamp(&mut response);
    response
}
