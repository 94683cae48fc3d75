use thiserror::Error;

use crate::ocsp::transport::TransportError;

/// Failure modes surfaced to the caller of the validation pipeline.
///
/// Every check in the pipeline is fail-fast: the first failing check
/// produces one of these variants and nothing downstream of it runs.
/// Messages never contain signatures, keys or nonce values; certificate
/// subject names and algorithm names are considered safe to log.
#[derive(Error, Debug)]
pub enum AuthTokenValidationError {
    #[error("TokenParse: [{0}]")]
    TokenParse(String),

    #[error("ChallengeEmpty")]
    ChallengeEmpty,

    #[error("CertificateNotTrusted: no configured CA has signed the certificate of [{subject}]")]
    CertificateNotTrusted { subject: String },

    #[error("CertificateWrongPurpose")]
    CertificateWrongPurpose,

    #[error("CertificateNotYetValid")]
    CertificateNotYetValid,

    #[error("CertificateExpired")]
    CertificateExpired,

    #[error("CertificateDisallowedPolicy: [{policy}]")]
    CertificateDisallowedPolicy { policy: String },

    #[error("CertificateRevoked: [{}]", reason.as_deref().unwrap_or("unspecified"))]
    CertificateRevoked { reason: Option<String> },

    #[error("OcspUrlMissing")]
    OcspUrlMissing,

    #[error("OcspHttpError: [{0}]")]
    OcspHttpError(String),

    #[error("OcspTimeout")]
    OcspTimeout,

    #[error("OcspResponseInvalidStatus: [{status}]")]
    OcspResponseInvalidStatus { status: u32 },

    #[error("OcspResponseInvalidType: [{response_type}]")]
    OcspResponseInvalidType { response_type: String },

    #[error("OcspResponderMismatch")]
    OcspResponderMismatch,

    #[error("OcspResponderNotTrusted: [{0}]")]
    OcspResponderNotTrusted(String),

    #[error("OcspResponseSignatureInvalid")]
    OcspResponseSignatureInvalid,

    #[error("OcspCertIdMismatch")]
    OcspCertIdMismatch,

    #[error("OcspStaleResponse: [{0}]")]
    OcspStaleResponse(String),

    #[error("OcspNonceMismatch")]
    OcspNonceMismatch,

    #[error("UnsupportedAlgorithm: [{0}]")]
    UnsupportedAlgorithm(String),

    #[error("InvalidSignatureFormat: [{0}]")]
    InvalidSignatureFormat(String),

    #[error("TokenSignatureInvalid")]
    TokenSignatureInvalid,

    #[error("ConfigurationError: [{0}]")]
    ConfigurationError(String),

    #[error("CertificateParse: [{0}]")]
    CertificateParse(String),

    #[error("InternalDerError: [{0}]")]
    InternalDerError(#[from] der::Error),

    #[error("InternalCryptoError: [{0}]")]
    InternalCryptoError(String),
}

impl From<TransportError> for AuthTokenValidationError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::Timeout => AuthTokenValidationError::OcspTimeout,
            other => AuthTokenValidationError::OcspHttpError(other.to_string()),
        }
    }
}

impl From<serde_json::Error> for AuthTokenValidationError {
    fn from(err: serde_json::Error) -> Self {
        AuthTokenValidationError::TokenParse(err.to_string())
    }
}

impl From<base64::DecodeError> for AuthTokenValidationError {
    fn from(err: base64::DecodeError) -> Self {
        AuthTokenValidationError::TokenParse(err.to_string())
    }
}
