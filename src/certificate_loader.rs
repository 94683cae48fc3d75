use x509_cert::Certificate;

use crate::error::AuthTokenValidationError;
use crate::utils::decode_der_base64;
use crate::x509::parse_certificate;

/// Loads a certificate from a PEM string with a `CERTIFICATE` label.
///
/// # Errors
///
/// `CertificateParse` when the PEM armor, label or the wrapped DER is
/// invalid.
pub fn load_certificate_from_pem(pem: &str) -> Result<Certificate, AuthTokenValidationError> {
    let mut buf = vec![0u8; pem.len()];
    let (label, der) = pem_rfc7468::decode(pem.as_bytes(), &mut buf)
        .map_err(|e| AuthTokenValidationError::CertificateParse(e.to_string()))?;

    if label != "CERTIFICATE" {
        return Err(AuthTokenValidationError::CertificateParse(format!(
            "expected a CERTIFICATE PEM block, got {label}"
        )));
    }

    parse_certificate(der)
}

/// Loads a certificate from a standard-base64 DER string, the encoding
/// the auth token and most configuration formats carry certificates in.
pub fn load_certificate_from_base64(encoded: &str) -> Result<Certificate, AuthTokenValidationError> {
    let der = decode_der_base64(encoded)
        .map_err(|e| AuthTokenValidationError::CertificateParse(e.to_string()))?;
    parse_certificate(&der)
}

/// Loads a list of trust-anchor certificates from PEM strings.
pub fn load_certificates_from_pem(pems: &[&str]) -> Result<Vec<Certificate>, AuthTokenValidationError> {
    pems.iter().map(|pem| load_certificate_from_pem(pem)).collect()
}
