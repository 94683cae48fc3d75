//! Shared X.509 helpers built on the RustCrypto `x509-cert` stack:
//! certificate parsing, extension decoding, validity arithmetic and
//! signature verification dispatched by algorithm OID.

use const_oid::ObjectIdentifier;
use der::{Decode, Encode};
use spki::AlgorithmIdentifierOwned;
use x509_cert::ext::Extension;
use x509_cert::time::Time;
use x509_cert::Certificate;

use crate::error::AuthTokenValidationError;

pub(crate) mod oids {
    use const_oid::ObjectIdentifier;

    pub const SHA1: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.3.14.3.2.26");

    pub const SHA256_WITH_RSA: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.113549.1.1.11");
    pub const SHA384_WITH_RSA: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.113549.1.1.12");
    pub const SHA512_WITH_RSA: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.113549.1.1.13");
    pub const ECDSA_WITH_SHA256: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.10045.4.3.2");
    pub const ECDSA_WITH_SHA384: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.10045.4.3.3");
    pub const ECDSA_WITH_SHA512: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.10045.4.3.4");

    pub const KEY_USAGE: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.5.29.15");
    pub const EXT_KEY_USAGE: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.5.29.37");
    pub const CERTIFICATE_POLICIES: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.5.29.32");
    pub const AUTHORITY_INFO_ACCESS: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.3.6.1.5.5.7.1.1");

    pub const AD_OCSP: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.3.6.1.5.5.7.48.1");
    pub const KP_CLIENT_AUTH: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.3.6.1.5.5.7.3.2");
    pub const KP_OCSP_SIGNING: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.3.6.1.5.5.7.3.9");
    pub const PKIX_OCSP_BASIC: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.3.6.1.5.5.7.48.1.1");
    pub const PKIX_OCSP_NONCE: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.3.6.1.5.5.7.48.1.2");

    pub const AT_COMMON_NAME: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.5.4.3");
    pub const AT_SURNAME: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.5.4.4");
    pub const AT_SERIAL_NUMBER: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.5.4.5");
    pub const AT_COUNTRY: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.5.4.6");
    pub const AT_GIVEN_NAME: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.5.4.42");
}

/// Parses a DER-encoded X.509 certificate.
pub fn parse_certificate(der_bytes: &[u8]) -> Result<Certificate, AuthTokenValidationError> {
    Certificate::from_der(der_bytes)
        .map_err(|e| AuthTokenValidationError::CertificateParse(e.to_string()))
}

/// Finds an extension of the certificate by OID.
pub(crate) fn find_extension(cert: &Certificate, oid: ObjectIdentifier) -> Option<&Extension> {
    cert.tbs_certificate
        .extensions
        .as_ref()
        .and_then(|exts| exts.iter().find(|ext| ext.extn_id == oid))
}

/// Decodes the payload of an extension into its PKIX type, if present.
pub(crate) fn decode_extension<'a, T: Decode<'a>>(
    cert: &'a Certificate,
    oid: ObjectIdentifier,
) -> Result<Option<T>, der::Error> {
    match find_extension(cert, oid) {
        Some(ext) => Ok(Some(T::from_der(ext.extn_value.as_bytes())?)),
        None => Ok(None),
    }
}

/// The value bits of the certificate's SubjectPublicKeyInfo BIT STRING,
/// excluding tag, length and the unused-bits octet. For EC keys this is
/// the SEC1 point, for RSA keys the PKCS#1 `RSAPublicKey` structure.
pub(crate) fn public_key_bits(cert: &Certificate) -> &[u8] {
    cert.tbs_certificate
        .subject_public_key_info
        .subject_public_key
        .raw_bytes()
}

pub(crate) fn time_to_unix(time: &Time) -> i64 {
    match time {
        Time::UtcTime(utc) => utc.to_unix_duration().as_secs() as i64,
        Time::GeneralTime(gen) => gen.to_unix_duration().as_secs() as i64,
    }
}

/// Checks `notBefore ≤ timestamp ≤ notAfter` with inclusive bounds.
pub(crate) fn is_valid_at(cert: &Certificate, timestamp: i64) -> bool {
    let validity = &cert.tbs_certificate.validity;
    timestamp >= time_to_unix(&validity.not_before) && timestamp <= time_to_unix(&validity.not_after)
}

/// Verifies `signature` over `message` with the public key of `signer`,
/// selecting the verification primitive from the signature algorithm
/// OID. EC curves that share an algorithm OID are told apart by the
/// SEC1 point length, P-521 is handled by the `p521` crate since ring
/// implements no P-521 ECDSA.
///
/// Returns `Ok(false)` when the cryptographic check itself fails, so
/// callers can attach their own failure variant (or move on to the next
/// trust-anchor candidate).
///
/// # Errors
///
/// `UnsupportedAlgorithm` for OIDs and key sizes outside the supported
/// set.
pub(crate) fn verify_signed_data(
    message: &[u8],
    signature: &[u8],
    signature_algorithm: &AlgorithmIdentifierOwned,
    signer: &Certificate,
) -> Result<bool, AuthTokenValidationError> {
    let public_key = public_key_bits(signer);
    let alg_oid = signature_algorithm.oid;

    let ring_algorithm: &dyn ring::signature::VerificationAlgorithm = if alg_oid == oids::SHA256_WITH_RSA {
        &ring::signature::RSA_PKCS1_2048_8192_SHA256
    } else if alg_oid == oids::SHA384_WITH_RSA {
        &ring::signature::RSA_PKCS1_2048_8192_SHA384
    } else if alg_oid == oids::SHA512_WITH_RSA {
        &ring::signature::RSA_PKCS1_2048_8192_SHA512
    } else if alg_oid == oids::ECDSA_WITH_SHA256 {
        match public_key.len() {
            65 => &ring::signature::ECDSA_P256_SHA256_ASN1,
            97 => &ring::signature::ECDSA_P384_SHA256_ASN1,
            len => {
                return Err(AuthTokenValidationError::UnsupportedAlgorithm(format!(
                    "ecdsa-with-SHA256 over a {len}-byte EC point"
                )))
            }
        }
    } else if alg_oid == oids::ECDSA_WITH_SHA384 {
        match public_key.len() {
            65 => &ring::signature::ECDSA_P256_SHA384_ASN1,
            97 => &ring::signature::ECDSA_P384_SHA384_ASN1,
            len => {
                return Err(AuthTokenValidationError::UnsupportedAlgorithm(format!(
                    "ecdsa-with-SHA384 over a {len}-byte EC point"
                )))
            }
        }
    } else if alg_oid == oids::ECDSA_WITH_SHA512 {
        return verify_p521_signature(message, signature, public_key);
    } else {
        return Err(AuthTokenValidationError::UnsupportedAlgorithm(format!(
            "signature algorithm {alg_oid}"
        )));
    };

    let key = ring::signature::UnparsedPublicKey::new(ring_algorithm, public_key);
    Ok(key.verify(message, signature).is_ok())
}

/// ECDSA P-521 with SHA-512 over a DER-encoded signature.
pub(crate) fn verify_p521_signature(
    message: &[u8],
    signature: &[u8],
    public_key: &[u8],
) -> Result<bool, AuthTokenValidationError> {
    use p521::ecdsa::signature::Verifier;
    use p521::ecdsa::{DerSignature, Signature, VerifyingKey};

    // 133 bytes: 0x04 prefix plus two 66-byte coordinates.
    if public_key.len() != 133 {
        return Err(AuthTokenValidationError::UnsupportedAlgorithm(format!(
            "ecdsa-with-SHA512 over a {}-byte EC point",
            public_key.len()
        )));
    }

    let Ok(key) = VerifyingKey::from_sec1_bytes(public_key) else {
        return Ok(false);
    };
    let Ok(der_sig) = DerSignature::try_from(signature) else {
        return Ok(false);
    };
    let Ok(sig) = Signature::try_from(der_sig) else {
        return Ok(false);
    };
    Ok(key.verify(message, &sig).is_ok())
}

/// DER-encodes the to-be-signed part of a certificate, the exact bytes
/// its signature covers.
pub(crate) fn tbs_certificate_der(cert: &Certificate) -> Result<Vec<u8>, der::Error> {
    cert.tbs_certificate.to_der()
}
