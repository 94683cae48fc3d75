use base64::engine::general_purpose::STANDARD;
use base64::{DecodeError, Engine};

/// Decodes a standard-base64 string into a DER byte vector.
///
/// The auth token and configuration formats carry certificates and
/// signatures in standard base64 with padding; this is the single
/// decode path for all of them.
///
/// # Errors
///
/// Returns a `DecodeError` when the string is not valid base64.
pub fn decode_der_base64(encoded: &str) -> Result<Vec<u8>, DecodeError> {
    STANDARD.decode(encoded)
}
