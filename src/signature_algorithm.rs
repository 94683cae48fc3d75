use std::fmt;
use std::str::FromStr;

use ring::digest;

use crate::error::AuthTokenValidationError;

/// Signature scheme implied by a JWS algorithm identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureScheme {
    Ecdsa,
    RsaPss,
    RsaPkcs1,
}

/// The set of JWS algorithms accepted in authentication tokens.
///
/// Anything outside this set fails token validation up front with
/// `UnsupportedAlgorithm`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureAlgorithm {
    Es256,
    Es384,
    Es512,
    Ps256,
    Ps384,
    Ps512,
    Rs256,
    Rs384,
    Rs512,
}

impl SignatureAlgorithm {
    /// The digest the algorithm hashes the signed payload with.
    pub fn hash_algorithm(&self) -> &'static digest::Algorithm {
        match self {
            Self::Es256 | Self::Ps256 | Self::Rs256 => &digest::SHA256,
            Self::Es384 | Self::Ps384 | Self::Rs384 => &digest::SHA384,
            Self::Es512 | Self::Ps512 | Self::Rs512 => &digest::SHA512,
        }
    }

    pub fn scheme(&self) -> SignatureScheme {
        match self {
            Self::Es256 | Self::Es384 | Self::Es512 => SignatureScheme::Ecdsa,
            Self::Ps256 | Self::Ps384 | Self::Ps512 => SignatureScheme::RsaPss,
            Self::Rs256 | Self::Rs384 | Self::Rs512 => SignatureScheme::RsaPkcs1,
        }
    }

    /// Fixed byte width of each half of a raw ECDSA signature for the
    /// curve the algorithm pairs with: P-256, P-384 or P-521.
    /// `None` for the RSA variants.
    pub fn ec_field_width(&self) -> Option<usize> {
        match self {
            Self::Es256 => Some(32),
            Self::Es384 => Some(48),
            Self::Es512 => Some(66),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Es256 => "ES256",
            Self::Es384 => "ES384",
            Self::Es512 => "ES512",
            Self::Ps256 => "PS256",
            Self::Ps384 => "PS384",
            Self::Ps512 => "PS512",
            Self::Rs256 => "RS256",
            Self::Rs384 => "RS384",
            Self::Rs512 => "RS512",
        }
    }
}

impl fmt::Display for SignatureAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SignatureAlgorithm {
    type Err = AuthTokenValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ES256" => Ok(Self::Es256),
            "ES384" => Ok(Self::Es384),
            "ES512" => Ok(Self::Es512),
            "PS256" => Ok(Self::Ps256),
            "PS384" => Ok(Self::Ps384),
            "PS512" => Ok(Self::Ps512),
            "RS256" => Ok(Self::Rs256),
            "RS384" => Ok(Self::Rs384),
            "RS512" => Ok(Self::Rs512),
            other => Err(AuthTokenValidationError::UnsupportedAlgorithm(other.to_string())),
        }
    }
}

/// Transcodes a raw ECDSA signature `R ‖ S`, as emitted by the smart
/// card, into the ASN.1 DER `SEQUENCE { INTEGER r, INTEGER s }` form
/// that signature verifiers consume.
///
/// Both halves must be exactly `field_width` bytes wide (32, 48 or 66
/// for P-256, P-384 and P-521). Each half is re-encoded as a minimal
/// two's-complement INTEGER: leading zero bytes are stripped and a
/// single `0x00` is prepended when the top bit of the first remaining
/// byte is set.
///
/// # Errors
///
/// `InvalidSignatureFormat` when the input is not twice a supported
/// field width.
pub fn ecdsa_raw_to_der(raw: &[u8], field_width: usize) -> Result<Vec<u8>, AuthTokenValidationError> {
    const SUPPORTED_WIDTHS: [usize; 3] = [32, 48, 66];

    if !SUPPORTED_WIDTHS.contains(&field_width) {
        return Err(AuthTokenValidationError::InvalidSignatureFormat(format!(
            "unsupported curve field width {field_width}"
        )));
    }
    if raw.len() != field_width * 2 {
        return Err(AuthTokenValidationError::InvalidSignatureFormat(format!(
            "raw ECDSA signature is {} bytes, expected {}",
            raw.len(),
            field_width * 2
        )));
    }

    let r = encode_der_integer(&raw[..field_width]);
    let s = encode_der_integer(&raw[field_width..]);

    let mut body = Vec::with_capacity(r.len() + s.len() + 4);
    body.push(0x02);
    body.push(r.len() as u8);
    body.extend_from_slice(&r);
    body.push(0x02);
    body.push(s.len() as u8);
    body.extend_from_slice(&s);

    // Content stays under 256 bytes even for P-521, so long-form length
    // needs at most one length octet.
    let mut der = Vec::with_capacity(body.len() + 3);
    der.push(0x30);
    if body.len() < 128 {
        der.push(body.len() as u8);
    } else {
        der.push(0x81);
        der.push(body.len() as u8);
    }
    der.extend_from_slice(&body);
    Ok(der)
}

/// Minimal two's-complement content octets of a non-negative INTEGER.
fn encode_der_integer(bytes: &[u8]) -> Vec<u8> {
    let first_nonzero = bytes.iter().position(|&b| b != 0);
    match first_nonzero {
        // All-zero half encodes as the single octet 0x00.
        None => vec![0x00],
        Some(start) => {
            let stripped = &bytes[start..];
            if stripped[0] & 0x80 != 0 {
                let mut out = Vec::with_capacity(stripped.len() + 1);
                out.push(0x00);
                out.extend_from_slice(stripped);
                out
            } else {
                stripped.to_vec()
            }
        }
    }
}
