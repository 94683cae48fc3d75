use serde::{Deserialize, Serialize};

/// The authentication token as submitted by the browser extension.
///
/// All fields are opaque strings until the validation pipeline has
/// examined them; in particular the certificate is unverified and the
/// embedded subject identity must not be trusted before
/// [`crate::validator::AuthTokenValidator::validate`] has succeeded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebEidAuthToken {
    /// Base64-encoded DER of the user's X.509 authentication certificate.
    #[serde(rename = "unverifiedCertificate")]
    pub unverified_certificate: String,

    /// JWS algorithm identifier, e.g. `ES384`.
    pub algorithm: String,

    /// Base64-encoded signature over the origin/nonce digest pair.
    pub signature: String,

    /// Token format tag, e.g. `web-eid:1.0`. Presence is required,
    /// the value itself is not interpreted.
    pub format: String,
}
