//! Translation between inbound and outbound HTTP messages.
//!
//! # Responsibilities
//! - Build the backend request from the inbound one and a resolved endpoint
//! - Rewrite the target URI and Host header for the endpoint
//! - Turn backend responses into gateway responses, raising 503 as a failure
//!
//! # Design Decisions
//! - The inbound body is buffered once so every attempt sends the same bytes
//! - GET, HEAD, DELETE and TRACE never carry a body
//! - Content headers only travel with a body
//! - Response bodies stream through without buffering

use axum::body::Body;
use axum::http::{header, HeaderMap, HeaderName, HeaderValue, Method, Request, Response, StatusCode};
use bytes::Bytes;
use tokio_util::sync::CancellationToken;

use crate::error::{BoxError, GatewayError, GatewayResult};
use crate::http::body::CancellableBody;
use crate::resolver::Endpoint;

/// Headers describing the payload rather than the request.
const CONTENT_HEADERS: &[&str] = &[
    "allow",
    "content-disposition",
    "content-encoding",
    "content-language",
    "content-length",
    "content-location",
    "content-md5",
    "content-range",
    "content-type",
    "expires",
    "last-modified",
];

/// Whether requests with `method` forward a body.
pub fn method_carries_body(method: &Method) -> bool {
    !matches!(
        *method,
        Method::GET | Method::HEAD | Method::DELETE | Method::TRACE
    )
}

fn is_content_header(name: &HeaderName) -> bool {
    CONTENT_HEADERS.contains(&name.as_str())
}

/// Join the endpoint prefix, the route's relative path and the inbound path.
///
/// A prefix of `/` contributes nothing; the result always starts with `/`.
pub fn rewrite_path(prefix: &str, relative_path: &str, path_and_query: &str) -> String {
    let prefix = prefix.trim_end_matches('/');
    let relative_path = relative_path.trim_end_matches('/');

    let mut target =
        String::with_capacity(prefix.len() + relative_path.len() + path_and_query.len() + 1);
    target.push_str(prefix);
    target.push_str(relative_path);
    target.push_str(path_and_query);

    if !target.starts_with('/') {
        target.insert(0, '/');
    }
    target
}

/// Inbound request reduced to what every attempt needs.
#[derive(Debug, Clone)]
pub struct ForwardedRequest {
    method: Method,
    headers: HeaderMap,
    path_base: String,
    path_and_query: String,
    body: Option<Bytes>,
}

impl ForwardedRequest {
    /// `path_and_query` is the inbound path below the mount, with query.
    pub fn new(
        method: Method,
        headers: HeaderMap,
        path_base: impl Into<String>,
        path_and_query: impl Into<String>,
        body: Bytes,
    ) -> Self {
        let body = method_carries_body(&method).then_some(body);
        Self {
            method,
            headers,
            path_base: path_base.into(),
            path_and_query: path_and_query.into(),
            body,
        }
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn body(&self) -> Option<&Bytes> {
        self.body.as_ref()
    }

    /// Build the request for one attempt against `endpoint`.
    pub fn to_outbound(
        &self,
        endpoint: &Endpoint,
        relative_path: &str,
        path_base_header: &HeaderName,
    ) -> GatewayResult<Request<Body>> {
        let path = rewrite_path(endpoint.path_prefix(), relative_path, &self.path_and_query);
        let uri = format!("{}://{}{}", endpoint.scheme(), endpoint.authority(), path);

        let mut builder = Request::builder().method(self.method.clone()).uri(uri);

        let headers = builder
            .headers_mut()
            .ok_or_else(|| GatewayError::InvalidArgument("cannot build outbound request".into()))?;
        for (name, value) in &self.headers {
            if name == header::HOST {
                continue;
            }
            if self.body.is_none() && is_content_header(name) {
                continue;
            }
            headers.append(name.clone(), value.clone());
        }

        let path_base = HeaderValue::from_str(&self.path_base).map_err(|e| {
            GatewayError::InvalidArgument(format!("path base {:?}: {e}", self.path_base))
        })?;
        headers.insert(path_base_header.clone(), path_base);

        let host = HeaderValue::from_str(&endpoint.authority())
            .map_err(|e| GatewayError::InvalidArgument(format!("host {endpoint}: {e}")))?;
        headers.insert(header::HOST, host);

        let body = match &self.body {
            Some(bytes) => Body::from(bytes.clone()),
            None => Body::empty(),
        };
        builder
            .body(body)
            .map_err(|e| GatewayError::InvalidArgument(format!("outbound request: {e}")))
    }
}

/// Convert a backend response into the response returned to the caller.
///
/// A 503 is raised as [`GatewayError::UpstreamUnavailable`] so the retry
/// loop re-resolves instead of forwarding it.
pub fn into_inbound_response<B>(
    response: Response<B>,
    endpoint: &Endpoint,
    cancel: CancellationToken,
) -> GatewayResult<Response<Body>>
where
    B: http_body::Body<Data = Bytes> + Send + 'static,
    B::Error: Into<BoxError>,
{
    if response.status() == StatusCode::SERVICE_UNAVAILABLE {
        return Err(GatewayError::UpstreamUnavailable {
            endpoint: endpoint.to_string(),
        });
    }

    let (mut parts, body) = response.into_parts();
    parts.headers.remove(header::TRANSFER_ENCODING);
    Ok(Response::from_parts(
        parts,
        Body::new(CancellableBody::new(body, cancel)),
    ))
}
