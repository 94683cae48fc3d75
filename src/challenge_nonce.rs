use crate::error::AuthTokenValidationError;

/// A server-issued challenge nonce bound to the user's session.
///
/// The nonce is generated and stored outside this crate; the pipeline
/// only consumes it as the second half of the signed payload. The
/// constructor enforces the non-emptiness invariant, so a value of this
/// type is always usable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChallengeNonce(Vec<u8>);

impl ChallengeNonce {
    /// Wraps the raw nonce bytes, rejecting empty input.
    pub fn new(nonce: impl Into<Vec<u8>>) -> Result<Self, AuthTokenValidationError> {
        let bytes = nonce.into();
        if bytes.is_empty() {
            return Err(AuthTokenValidationError::ChallengeEmpty);
        }
        Ok(ChallengeNonce(bytes))
    }

    /// The exact bytes that were issued to the client. These are hashed
    /// as-is into the signed payload, with no canonicalization.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}
