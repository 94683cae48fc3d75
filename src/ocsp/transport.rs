use std::time::Duration;

use thiserror::Error;
use url::Url;

pub const OCSP_REQUEST_CONTENT_TYPE: &str = "application/ocsp-request";
pub const OCSP_RESPONSE_CONTENT_TYPE: &str = "application/ocsp-response";

#[derive(Error, Debug)]
pub enum TransportError {
    #[error("Request failed: {0}")]
    RequestFailed(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("HTTP status {0}")]
    HttpStatus(u16),

    #[error("Timeout error")]
    Timeout,
}

/// Blocking HTTP transport used for the OCSP exchange, the pipeline's
/// only network I/O. Implementations must be shareable across threads;
/// tests substitute a canned-response mock.
pub trait OcspTransport: Send + Sync {
    fn send(&self, req: http::Request<Vec<u8>>) -> Result<http::Response<Vec<u8>>, TransportError>;
}

/// Builds the `POST` request carrying a DER-encoded OCSPRequest.
pub(crate) fn ocsp_http_request(
    url: &Url,
    body: Vec<u8>,
) -> Result<http::Request<Vec<u8>>, TransportError> {
    http::Request::builder()
        .method(http::Method::POST)
        .uri(url.as_str())
        .header(http::header::CONTENT_TYPE, OCSP_REQUEST_CONTENT_TYPE)
        .body(body)
        .map_err(|e| TransportError::RequestFailed(e.to_string()))
}

/// `reqwest`-backed transport honouring the configured deadline for
/// both connection establishment and the whole response.
pub struct ReqwestTransport {
    client: reqwest::blocking::Client,
}

impl ReqwestTransport {
    pub fn new(timeout: Duration) -> Result<Self, TransportError> {
        let client = reqwest::blocking::Client::builder()
            .connect_timeout(timeout)
            .timeout(timeout)
            .build()
            .map_err(|e| TransportError::RequestFailed(e.to_string()))?;
        Ok(ReqwestTransport { client })
    }
}

impl OcspTransport for ReqwestTransport {
    fn send(&self, req: http::Request<Vec<u8>>) -> Result<http::Response<Vec<u8>>, TransportError> {
        let (parts, body) = req.into_parts();

        let response = self
            .client
            .request(parts.method, parts.uri.to_string())
            .headers(parts.headers)
            .body(body)
            .send()
            .map_err(|e| {
                if e.is_timeout() {
                    TransportError::Timeout
                } else {
                    TransportError::RequestFailed(e.to_string())
                }
            })?;

        let status = response.status();
        if status != reqwest::StatusCode::OK {
            return Err(TransportError::HttpStatus(status.as_u16()));
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        if content_type != OCSP_RESPONSE_CONTENT_TYPE {
            return Err(TransportError::InvalidResponse(format!(
                "unexpected content type {content_type}"
            )));
        }

        let body = response
            .bytes()
            .map_err(|e| {
                if e.is_timeout() {
                    TransportError::Timeout
                } else {
                    TransportError::InvalidResponse(e.to_string())
                }
            })?
            .to_vec();

        http::Response::builder()
            .status(status.as_u16())
            .header(http::header::CONTENT_TYPE, OCSP_RESPONSE_CONTENT_TYPE)
            .body(body)
            .map_err(|e| TransportError::InvalidResponse(e.to_string()))
    }
}
