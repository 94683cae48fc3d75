use der::asn1::OctetString;
use der::Encode;
use ring::digest;
use ring::rand::SecureRandom;
use spki::AlgorithmIdentifierOwned;
use x509_cert::ext::Extension;
use x509_cert::Certificate;
use x509_ocsp::{CertId, OcspRequest, Request, TbsRequest, Version};

use crate::error::AuthTokenValidationError;
use crate::x509::{oids, public_key_bits};

/// Length of the anti-replay nonce carried in the request extension.
const NONCE_LENGTH: usize = 32;

/// A built OCSPRequest together with the values the response must be
/// checked against: the CertID that was asked about and the nonce that
/// must be echoed.
#[derive(Debug, Clone)]
pub struct BuiltOcspRequest {
    pub(crate) der: Vec<u8>,
    pub(crate) cert_id: CertId,
    pub(crate) nonce: Option<Vec<u8>>,
}

impl BuiltOcspRequest {
    pub fn as_der(&self) -> &[u8] {
        &self.der
    }

    pub fn nonce(&self) -> Option<&[u8]> {
        self.nonce.as_deref()
    }
}

/// Builds a single-request OCSPRequest for `subject`, identified by
/// the RFC 6960 CertID: SHA-1 over the DER of the issuer subject DN,
/// SHA-1 over the value bits of the issuer SubjectPublicKeyInfo, and
/// the subject serial. When `with_nonce` is set a fresh 256-bit random
/// value is attached as the `id-pkix-ocsp-nonce` request extension and
/// retained for the response comparison.
pub fn build_ocsp_request(
    subject: &Certificate,
    issuer: &Certificate,
    with_nonce: bool,
    rng: &dyn SecureRandom,
) -> Result<BuiltOcspRequest, AuthTokenValidationError> {
    let issuer_name_der = issuer.tbs_certificate.subject.to_der()?;
    let issuer_name_hash = digest::digest(&digest::SHA1_FOR_LEGACY_USE_ONLY, &issuer_name_der);
    let issuer_key_hash =
        digest::digest(&digest::SHA1_FOR_LEGACY_USE_ONLY, public_key_bits(issuer));

    let cert_id = CertId {
        hash_algorithm: AlgorithmIdentifierOwned {
            oid: oids::SHA1,
            parameters: None,
        },
        issuer_name_hash: OctetString::new(issuer_name_hash.as_ref())?,
        issuer_key_hash: OctetString::new(issuer_key_hash.as_ref())?,
        serial_number: subject.tbs_certificate.serial_number.clone(),
    };

    let nonce = if with_nonce {
        let mut nonce = vec![0u8; NONCE_LENGTH];
        rng.fill(&mut nonce).map_err(|_| {
            AuthTokenValidationError::InternalCryptoError("nonce generation failed".to_string())
        })?;
        Some(nonce)
    } else {
        None
    };

    let request_extensions = match &nonce {
        Some(nonce) => Some(vec![nonce_extension(nonce)?]),
        None => None,
    };

    let ocsp_request = OcspRequest {
        tbs_request: TbsRequest {
            version: Version::V1,
            requestor_name: None,
            request_list: vec![Request {
                req_cert: cert_id.clone(),
                single_request_extensions: None,
            }],
            request_extensions,
        },
        optional_signature: None,
    };

    Ok(BuiltOcspRequest {
        der: ocsp_request.to_der()?,
        cert_id,
        nonce,
    })
}

/// The nonce extension value is the DER OCTET STRING of the nonce,
/// itself wrapped in the extension's OCTET STRING.
fn nonce_extension(nonce: &[u8]) -> Result<Extension, AuthTokenValidationError> {
    let inner = OctetString::new(nonce)?.to_der()?;
    Ok(Extension {
        extn_id: oids::PKIX_OCSP_NONCE,
        critical: false,
        extn_value: OctetString::new(inner)?,
    })
}

/// CertID equality over all four fields; the hash algorithm is
/// compared by OID so that absent and NULL parameters are treated as
/// the same encoding.
pub(crate) fn cert_id_matches(a: &CertId, b: &CertId) -> bool {
    a.hash_algorithm.oid == b.hash_algorithm.oid
        && a.issuer_name_hash == b.issuer_name_hash
        && a.issuer_key_hash == b.issuer_key_hash
        && a.serial_number == b.serial_number
}
