use chrono::DateTime;
use der::{Decode, Encode};
use ring::digest;
use tracing::debug;
use x509_cert::ext::pkix::{CrlReason, ExtendedKeyUsage};
use x509_cert::Certificate;
use x509_ocsp::{
    BasicOcspResponse, CertStatus, OcspResponse, OcspResponseStatus, ResponderId, SingleResponse,
};

use crate::error::AuthTokenValidationError;
use crate::ocsp::request_builder::{cert_id_matches, BuiltOcspRequest};
use crate::ocsp::service::OcspService;
use crate::trust_verifier::CertificateTrustVerifier;
use crate::x509::{decode_extension, is_valid_at, oids, public_key_bits, verify_signed_data};

/// Tolerated clock difference between the responder and this host for
/// the freshness window, in seconds.
pub const ALLOWED_TIME_SKEW_SECONDS: i64 = 900;

/// Validates an OCSP response against the request that elicited it and
/// the responder trust rules of the selected service.
///
/// The checks run in a fixed order and the first failure wins:
/// response status, response type, responder identity, response
/// signature, CertID equality, nonce equality, freshness, certificate
/// status.
pub struct OcspResponseValidator<'a> {
    trust_verifier: &'a CertificateTrustVerifier,
}

impl<'a> OcspResponseValidator<'a> {
    pub fn new(trust_verifier: &'a CertificateTrustVerifier) -> Self {
        OcspResponseValidator { trust_verifier }
    }

    pub fn validate(
        &self,
        response_der: &[u8],
        request: &BuiltOcspRequest,
        service: &OcspService,
    ) -> Result<(), AuthTokenValidationError> {
        let response = OcspResponse::from_der(response_der)?;

        if !matches!(response.response_status, OcspResponseStatus::Successful) {
            return Err(AuthTokenValidationError::OcspResponseInvalidStatus {
                status: ocsp_status_code(&response.response_status),
            });
        }

        let Some(response_bytes) = response.response_bytes else {
            return Err(AuthTokenValidationError::OcspResponseInvalidType {
                response_type: "absent".to_string(),
            });
        };
        if response_bytes.response_type != oids::PKIX_OCSP_BASIC {
            return Err(AuthTokenValidationError::OcspResponseInvalidType {
                response_type: response_bytes.response_type.to_string(),
            });
        }

        let basic = BasicOcspResponse::from_der(response_bytes.response.as_bytes())?;
        let produced_at = basic.tbs_response_data.produced_at.0.to_unix_duration().as_secs() as i64;

        let responder = self.validate_responder(&basic, service, produced_at)?;
        self.validate_signature(&basic, responder)?;

        let single = single_response_for(&basic, request)?;
        validate_nonce(&basic, request)?;
        validate_freshness(single, produced_at)?;
        validate_certificate_status(single)
    }

    /// Responder identity rules. Designated service: the certificate
    /// delivered in the response must be byte-equal to the pinned one
    /// (compared without short-circuiting). AIA service: the responder
    /// certificate must be signed by a trusted CA, valid at
    /// `producedAt` and authorized for OCSP signing.
    fn validate_responder<'b>(
        &self,
        basic: &'b BasicOcspResponse,
        service: &OcspService,
        produced_at: i64,
    ) -> Result<&'b Certificate, AuthTokenValidationError> {
        let responder = find_responder_certificate(basic)?;

        if let Some(pinned) = &service.designated_responder {
            let pinned_der = pinned.to_der()?;
            let responder_der = responder.to_der()?;
            if ring::constant_time::verify_slices_are_equal(&pinned_der, &responder_der).is_err() {
                return Err(AuthTokenValidationError::OcspResponderMismatch);
            }
            return Ok(responder);
        }

        self.trust_verifier.verify(responder).map_err(|e| match e {
            AuthTokenValidationError::CertificateNotTrusted { .. } => {
                AuthTokenValidationError::OcspResponderNotTrusted(
                    "responder certificate is not signed by a trusted CA".to_string(),
                )
            }
            other => other,
        })?;

        if !is_valid_at(responder, produced_at) {
            return Err(AuthTokenValidationError::OcspResponderNotTrusted(
                "responder certificate is not valid at producedAt".to_string(),
            ));
        }

        let ocsp_signing = decode_extension::<ExtendedKeyUsage>(responder, oids::EXT_KEY_USAGE)?
            .map(|eku| eku.0.contains(&oids::KP_OCSP_SIGNING))
            .unwrap_or(false);
        if !ocsp_signing {
            return Err(AuthTokenValidationError::OcspResponderNotTrusted(
                "responder certificate has no OCSP signing extended key usage".to_string(),
            ));
        }

        Ok(responder)
    }

    fn validate_signature(
        &self,
        basic: &BasicOcspResponse,
        responder: &Certificate,
    ) -> Result<(), AuthTokenValidationError> {
        let tbs = basic.tbs_response_data.to_der()?;
        let signature = basic.signature.raw_bytes();
        if !verify_signed_data(&tbs, signature, &basic.signature_algorithm, responder)? {
            return Err(AuthTokenValidationError::OcspResponseSignatureInvalid);
        }
        debug!("OCSP response signature verified");
        Ok(())
    }
}

/// Selects the responder certificate from the response's `certs` by
/// the ResponderID, falling back to the first certificate. A response
/// without certificates cannot pass responder validation.
fn find_responder_certificate(
    basic: &BasicOcspResponse,
) -> Result<&Certificate, AuthTokenValidationError> {
    let certs = basic
        .certs
        .as_ref()
        .filter(|certs| !certs.is_empty())
        .ok_or_else(|| {
            AuthTokenValidationError::OcspResponderNotTrusted(
                "response carries no responder certificate".to_string(),
            )
        })?;

    let matched = match &basic.tbs_response_data.responder_id {
        ResponderId::ByName(name) => certs
            .iter()
            .find(|cert| &cert.tbs_certificate.subject == name),
        ResponderId::ByKey(key_hash) => certs.iter().find(|cert| {
            digest::digest(&digest::SHA1_FOR_LEGACY_USE_ONLY, public_key_bits(cert)).as_ref()
                == key_hash.as_bytes()
        }),
    };
    Ok(matched.unwrap_or(&certs[0]))
}

/// The response entry answering our CertID; all four fields must match
/// the request.
fn single_response_for<'b>(
    basic: &'b BasicOcspResponse,
    request: &BuiltOcspRequest,
) -> Result<&'b SingleResponse, AuthTokenValidationError> {
    basic
        .tbs_response_data
        .responses
        .iter()
        .find(|single| cert_id_matches(&single.cert_id, &request.cert_id))
        .ok_or(AuthTokenValidationError::OcspCertIdMismatch)
}

/// When the request carried a nonce the response must echo it exactly;
/// without a request nonce any response nonce is ignored.
fn validate_nonce(
    basic: &BasicOcspResponse,
    request: &BuiltOcspRequest,
) -> Result<(), AuthTokenValidationError> {
    let Some(expected) = &request.nonce else {
        return Ok(());
    };

    let response_nonce = basic
        .tbs_response_data
        .response_extensions
        .as_ref()
        .and_then(|exts| exts.iter().find(|ext| ext.extn_id == oids::PKIX_OCSP_NONCE))
        .and_then(|ext| der::asn1::OctetString::from_der(ext.extn_value.as_bytes()).ok());

    match response_nonce {
        Some(nonce) if nonce.as_bytes() == expected.as_slice() => Ok(()),
        _ => Err(AuthTokenValidationError::OcspNonceMismatch),
    }
}

/// Freshness window: `thisUpdate` must not be more than the allowed
/// skew after `producedAt`, and `producedAt` must not be more than the
/// allowed skew after `nextUpdate` (or `thisUpdate` when absent).
fn validate_freshness(
    single: &SingleResponse,
    produced_at: i64,
) -> Result<(), AuthTokenValidationError> {
    let this_update = single.this_update.0.to_unix_duration().as_secs() as i64;
    let next_update = single
        .next_update
        .as_ref()
        .map(|t| t.0.to_unix_duration().as_secs() as i64);
    let notified_until = next_update.unwrap_or(this_update);

    if this_update > produced_at + ALLOWED_TIME_SKEW_SECONDS
        || produced_at - ALLOWED_TIME_SKEW_SECONDS > notified_until
    {
        return Err(AuthTokenValidationError::OcspStaleResponse(format!(
            "producedAt {}, thisUpdate {}, nextUpdate {}",
            format_timestamp(produced_at),
            format_timestamp(this_update),
            next_update.map(format_timestamp).unwrap_or_else(|| "absent".to_string()),
        )));
    }
    Ok(())
}

fn validate_certificate_status(single: &SingleResponse) -> Result<(), AuthTokenValidationError> {
    match &single.cert_status {
        CertStatus::Good(_) => {
            debug!("certificate status is good");
            Ok(())
        }
        CertStatus::Revoked(info) => Err(AuthTokenValidationError::CertificateRevoked {
            reason: info.revocation_reason.map(crl_reason_name).map(str::to_string),
        }),
        CertStatus::Unknown(_) => Err(AuthTokenValidationError::CertificateRevoked {
            reason: Some("unknown".to_string()),
        }),
    }
}

/// RFC 6960 OCSPResponseStatus values for error reporting.
fn ocsp_status_code(status: &OcspResponseStatus) -> u32 {
    match status {
        OcspResponseStatus::Successful => 0,
        OcspResponseStatus::MalformedRequest => 1,
        OcspResponseStatus::InternalError => 2,
        OcspResponseStatus::TryLater => 3,
        OcspResponseStatus::SigRequired => 5,
        OcspResponseStatus::Unauthorized => 6,
    }
}

fn crl_reason_name(reason: CrlReason) -> &'static str {
    match reason {
        CrlReason::Unspecified => "unspecified",
        CrlReason::KeyCompromise => "keyCompromise",
        CrlReason::CaCompromise => "cACompromise",
        CrlReason::AffiliationChanged => "affiliationChanged",
        CrlReason::Superseded => "superseded",
        CrlReason::CessationOfOperation => "cessationOfOperation",
        CrlReason::CertificateHold => "certificateHold",
        CrlReason::RemoveFromCRL => "removeFromCRL",
        CrlReason::PrivilegeWithdrawn => "privilegeWithdrawn",
        CrlReason::AaCompromise => "aACompromise",
    }
}

fn format_timestamp(unix: i64) -> String {
    DateTime::from_timestamp(unix, 0)
        .map(|dt| dt.to_rfc3339())
        .unwrap_or_else(|| unix.to_string())
}
