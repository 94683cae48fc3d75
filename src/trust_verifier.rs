use tracing::debug;
use x509_cert::Certificate;

use crate::error::AuthTokenValidationError;
use crate::x509::{tbs_certificate_der, verify_signed_data};

/// Verifies that a certificate was issued by one of the configured
/// trusted intermediate CAs.
///
/// The verifier is single-hop on purpose: the trusted set is expected
/// to contain the direct issuers of user and OCSP responder
/// certificates, and self-signed roots above them are never consulted.
#[derive(Debug, Clone)]
pub struct CertificateTrustVerifier {
    trusted_ca_certificates: Vec<Certificate>,
}

impl CertificateTrustVerifier {
    pub fn new(trusted_ca_certificates: Vec<Certificate>) -> Self {
        CertificateTrustVerifier {
            trusted_ca_certificates,
        }
    }

    /// Finds the trusted CA that issued `subject`.
    ///
    /// Candidates are the trusted certificates whose subject DN equals
    /// the subject certificate's issuer DN; the first candidate whose
    /// public key verifies the signature over `tbsCertificate` wins.
    ///
    /// # Errors
    ///
    /// `CertificateNotTrusted` when no candidate matches or none
    /// verifies.
    pub fn verify<'a>(
        &'a self,
        subject: &Certificate,
    ) -> Result<&'a Certificate, AuthTokenValidationError> {
        let tbs = tbs_certificate_der(subject)?;
        let signature = subject.signature.raw_bytes();

        for candidate in self
            .trusted_ca_certificates
            .iter()
            .filter(|ca| ca.tbs_certificate.subject == subject.tbs_certificate.issuer)
        {
            if verify_signed_data(&tbs, signature, &subject.signature_algorithm, candidate)? {
                debug!(
                    issuer = %candidate.tbs_certificate.subject,
                    "certificate issuer found in trusted CA set"
                );
                return Ok(candidate);
            }
        }

        Err(AuthTokenValidationError::CertificateNotTrusted {
            subject: subject.tbs_certificate.subject.to_string(),
        })
    }
}
