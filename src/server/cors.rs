// src/server/cors.rs
//
// Permissive CORS: any origin, method and header. Preflight requests are answered here
// and never reach the handlers.

use axum::{
    body::Body,
    extract::Request,
    http::{header, HeaderMap, HeaderValue, Method, StatusCode},
    middleware::Next,
    response::Response,
};

pub async fn cors_middleware(req: Request, next: Next) -> Response {
    let request_headers = req.headers().clone();
    let mut response = if req.method() == Method::OPTIONS {
        let mut preflight = Response::new(Body::empty());
        *preflight.status_mut() = StatusCode::OK;
        preflight
    } else {
        next.run(req).await
    };
    apply_cors_headers(&request_headers, response.headers_mut());
    response
}

fn apply_cors_headers(request: &HeaderMap, response: &mut HeaderMap) {
    let any = HeaderValue::from_static("*");
    // Credentials are allowed, which rules out a literal `*` origin
    let origin = request.get(header::ORIGIN).cloned().unwrap_or_else(|| any.clone());
    let methods = request
        .get(header::ACCESS_CONTROL_REQUEST_METHOD)
        .cloned()
        .unwrap_or_else(|| any.clone());
    let headers = request
        .get(header::ACCESS_CONTROL_REQUEST_HEADERS)
        .cloned()
        .unwrap_or(any);

    response.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, origin);
    response.insert(header::ACCESS_CONTROL_ALLOW_METHODS, methods);
    response.insert(header::ACCESS_CONTROL_ALLOW_HEADERS, headers);
    response.insert(
        header::ACCESS_CONTROL_ALLOW_CREDENTIALS,
        HeaderValue::from_static("true"),
    );
    response.insert(header::VARY, HeaderValue::from_static("Origin"));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn echoes_request_origin() {
        let mut request = HeaderMap::new();
        request.insert(header::ORIGIN, HeaderValue::from_static("http://localhost:8501"));
        request.insert(
            header::ACCESS_CONTROL_REQUEST_METHOD,
            HeaderValue::from_static("POST"),
        );
        let mut response = HeaderMap::new();
        apply_cors_headers(&request, &mut response);
        assert_eq!(response[header::ACCESS_CONTROL_ALLOW_ORIGIN], "http://localhost:8501");
        assert_eq!(response[header::ACCESS_CONTROL_ALLOW_METHODS], "POST");
        assert_eq!(response[header::ACCESS_CONTROL_ALLOW_HEADERS], "*");
    }

    #[test]
    fn wildcard_without_origin() {
        let mut response = HeaderMap::new();
        apply_cors_headers(&HeaderMap::new(), &mut response);
        assert_eq!(response[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
    }
}
