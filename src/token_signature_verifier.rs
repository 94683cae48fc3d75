use ring::digest;
use ring::signature::UnparsedPublicKey;
use tracing::debug;
use x509_cert::Certificate;

use crate::challenge_nonce::ChallengeNonce;
use crate::error::AuthTokenValidationError;
use crate::signature_algorithm::{ecdsa_raw_to_der, SignatureAlgorithm, SignatureScheme};
use crate::utils::decode_der_base64;
use crate::x509::{public_key_bits, verify_p521_signature};

/// Verifies the token signature over `H(origin) ‖ H(nonce)` with the
/// subject certificate's public key.
///
/// The two digests are concatenated without a separator, using the
/// hash the JWS algorithm names. The origin string is the configured
/// origin serialization and the nonce bytes are hashed exactly as
/// stored; neither side is canonicalized further.
///
/// # Errors
///
/// * `UnsupportedAlgorithm` for algorithms outside the allowed set.
/// * `InvalidSignatureFormat` for undecodable or mis-sized signatures.
/// * `TokenSignatureInvalid` when the cryptographic check fails.
pub fn verify_token_signature(
    algorithm: &str,
    signature_base64: &str,
    subject: &Certificate,
    origin: &str,
    challenge_nonce: &ChallengeNonce,
) -> Result<(), AuthTokenValidationError> {
    let algorithm: SignatureAlgorithm = algorithm.parse()?;
    let raw_signature = decode_der_base64(signature_base64)
        .map_err(|e| AuthTokenValidationError::InvalidSignatureFormat(e.to_string()))?;

    let hash = algorithm.hash_algorithm();
    let mut payload = Vec::new();
    payload.extend_from_slice(digest::digest(hash, origin.as_bytes()).as_ref());
    payload.extend_from_slice(digest::digest(hash, challenge_nonce.as_bytes()).as_ref());

    let public_key = public_key_bits(subject);

    match algorithm.scheme() {
        SignatureScheme::Ecdsa => {
            verify_ecdsa_signature(algorithm, &payload, &raw_signature, public_key)
        }
        SignatureScheme::RsaPss | SignatureScheme::RsaPkcs1 => {
            let verification_algorithm = rsa_verification_algorithm(algorithm).ok_or_else(|| {
                AuthTokenValidationError::InternalCryptoError(format!(
                    "no RSA verification for {algorithm}"
                ))
            })?;
            let key = UnparsedPublicKey::new(verification_algorithm, public_key);
            key.verify(&payload, &raw_signature)
                .map_err(|_| AuthTokenValidationError::TokenSignatureInvalid)?;
            debug!(%algorithm, "token signature verified");
            Ok(())
        }
    }
}

/// ECDSA verification after transcoding the card's raw `R ‖ S` into
/// DER. Each algorithm is bound to its curve: a key on any other curve
/// cannot have produced the signature.
fn verify_ecdsa_signature(
    algorithm: SignatureAlgorithm,
    payload: &[u8],
    raw_signature: &[u8],
    public_key: &[u8],
) -> Result<(), AuthTokenValidationError> {
    let field_width = algorithm.ec_field_width().ok_or_else(|| {
        AuthTokenValidationError::InternalCryptoError(format!("no EC field width for {algorithm}"))
    })?;
    let der_signature = ecdsa_raw_to_der(raw_signature, field_width)?;

    let verified = match algorithm {
        SignatureAlgorithm::Es256 if public_key.len() == 65 => {
            UnparsedPublicKey::new(&ring::signature::ECDSA_P256_SHA256_ASN1, public_key)
                .verify(payload, &der_signature)
                .is_ok()
        }
        SignatureAlgorithm::Es384 if public_key.len() == 97 => {
            UnparsedPublicKey::new(&ring::signature::ECDSA_P384_SHA384_ASN1, public_key)
                .verify(payload, &der_signature)
                .is_ok()
        }
        SignatureAlgorithm::Es512 => verify_p521_signature(payload, &der_signature, public_key)?,
        // Key on a different curve than the algorithm names.
        _ => false,
    };

    if !verified {
        return Err(AuthTokenValidationError::TokenSignatureInvalid);
    }
    debug!(%algorithm, "token signature verified");
    Ok(())
}

fn rsa_verification_algorithm(
    algorithm: SignatureAlgorithm,
) -> Option<&'static dyn ring::signature::VerificationAlgorithm> {
    match algorithm {
        SignatureAlgorithm::Ps256 => Some(&ring::signature::RSA_PSS_2048_8192_SHA256),
        SignatureAlgorithm::Ps384 => Some(&ring::signature::RSA_PSS_2048_8192_SHA384),
        SignatureAlgorithm::Ps512 => Some(&ring::signature::RSA_PSS_2048_8192_SHA512),
        SignatureAlgorithm::Rs256 => Some(&ring::signature::RSA_PKCS1_2048_8192_SHA256),
        SignatureAlgorithm::Rs384 => Some(&ring::signature::RSA_PKCS1_2048_8192_SHA384),
        SignatureAlgorithm::Rs512 => Some(&ring::signature::RSA_PKCS1_2048_8192_SHA512),
        _ => None,
    }
}
