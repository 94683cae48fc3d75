use chrono::{DateTime, Utc};
use const_oid::ObjectIdentifier;
use tracing::debug;
use x509_cert::ext::pkix::{CertificatePolicies, ExtendedKeyUsage, KeyUsage, KeyUsages};
use x509_cert::Certificate;

use crate::error::AuthTokenValidationError;
use crate::trust_verifier::CertificateTrustVerifier;
use crate::x509::{decode_extension, oids, time_to_unix};

/// The ordered checks applied to the user certificate before any
/// revocation or signature work: purpose, validity window, policy
/// exclusion and trust. The trusted issuer resolved by the final check
/// is the output, as the revocation check needs it to build the
/// OCSP CertID.
pub struct SubjectCertificateValidator<'a> {
    trust_verifier: &'a CertificateTrustVerifier,
    disallowed_policies: &'a [ObjectIdentifier],
}

impl<'a> SubjectCertificateValidator<'a> {
    pub fn new(
        trust_verifier: &'a CertificateTrustVerifier,
        disallowed_policies: &'a [ObjectIdentifier],
    ) -> Self {
        SubjectCertificateValidator {
            trust_verifier,
            disallowed_policies,
        }
    }

    /// Runs all checks in order, failing at the first violation, and
    /// returns the trusted issuer of the certificate.
    pub fn validate(
        &self,
        certificate: &Certificate,
        now: DateTime<Utc>,
    ) -> Result<&'a Certificate, AuthTokenValidationError> {
        self.validate_purpose(certificate)?;
        self.validate_validity_window(certificate, now)?;
        self.validate_policies(certificate)?;
        let issuer = self.trust_verifier.verify(certificate)?;
        debug!(
            subject = %certificate.tbs_certificate.subject,
            "user certificate passed subject checks"
        );
        Ok(issuer)
    }

    /// KeyUsage must include `digitalSignature` and ExtendedKeyUsage
    /// must include `id-kp-clientAuth`; absence of either extension
    /// disqualifies the certificate.
    fn validate_purpose(&self, certificate: &Certificate) -> Result<(), AuthTokenValidationError> {
        let key_usage: KeyUsage = decode_extension(certificate, oids::KEY_USAGE)?
            .ok_or(AuthTokenValidationError::CertificateWrongPurpose)?;
        if !key_usage.0.contains(KeyUsages::DigitalSignature) {
            return Err(AuthTokenValidationError::CertificateWrongPurpose);
        }

        let ext_key_usage: ExtendedKeyUsage = decode_extension(certificate, oids::EXT_KEY_USAGE)?
            .ok_or(AuthTokenValidationError::CertificateWrongPurpose)?;
        if !ext_key_usage.0.contains(&oids::KP_CLIENT_AUTH) {
            return Err(AuthTokenValidationError::CertificateWrongPurpose);
        }
        Ok(())
    }

    /// `notBefore ≤ now ≤ notAfter` in UTC, boundaries inclusive.
    fn validate_validity_window(
        &self,
        certificate: &Certificate,
        now: DateTime<Utc>,
    ) -> Result<(), AuthTokenValidationError> {
        let timestamp = now.timestamp();
        let validity = &certificate.tbs_certificate.validity;
        if timestamp < time_to_unix(&validity.not_before) {
            return Err(AuthTokenValidationError::CertificateNotYetValid);
        }
        if timestamp > time_to_unix(&validity.not_after) {
            return Err(AuthTokenValidationError::CertificateExpired);
        }
        Ok(())
    }

    /// The certificatePolicies extension must not carry any of the
    /// configured disallowed OIDs.
    fn validate_policies(&self, certificate: &Certificate) -> Result<(), AuthTokenValidationError> {
        let Some(policies) =
            decode_extension::<CertificatePolicies>(certificate, oids::CERTIFICATE_POLICIES)?
        else {
            return Ok(());
        };

        for policy in policies.0.iter() {
            if self.disallowed_policies.contains(&policy.policy_identifier) {
                return Err(AuthTokenValidationError::CertificateDisallowedPolicy {
                    policy: policy.policy_identifier.to_string(),
                });
            }
        }
        Ok(())
    }
}
