use chrono::{DateTime, Utc};
use ring::rand::SystemRandom;
use tracing::{debug, warn};
use x509_cert::Certificate;

use crate::auth_token::WebEidAuthToken;
use crate::certificate_validator::SubjectCertificateValidator;
use crate::challenge_nonce::ChallengeNonce;
use crate::config::AuthTokenValidationConfiguration;
use crate::error::AuthTokenValidationError;
use crate::ocsp::request_builder::build_ocsp_request;
use crate::ocsp::response_validator::OcspResponseValidator;
use crate::ocsp::service::OcspServiceProvider;
use crate::ocsp::transport::{ocsp_http_request, OcspTransport, ReqwestTransport};
use crate::token_signature_verifier::verify_token_signature;
use crate::trust_verifier::CertificateTrustVerifier;
use crate::utils::decode_der_base64;
use crate::x509::parse_certificate;

/// Parses an authentication token from its JSON wire format.
///
/// # Errors
///
/// `TokenParse` for malformed JSON or missing fields.
pub fn parse_auth_token(token_json: &str) -> Result<WebEidAuthToken, AuthTokenValidationError> {
    Ok(serde_json::from_str(token_json)?)
}

/// The validation pipeline for Web eID authentication tokens.
///
/// Immutable after construction and safe to share across threads: all
/// per-request state lives on the stack of the [`validate`] call. The
/// configuration, trusted-CA set and random source are read-only.
///
/// [`validate`]: AuthTokenValidator::validate
pub struct AuthTokenValidator<T: OcspTransport = ReqwestTransport> {
    configuration: AuthTokenValidationConfiguration,
    trust_verifier: CertificateTrustVerifier,
    ocsp_service_provider: OcspServiceProvider,
    transport: Option<T>,
    rng: SystemRandom,
}

impl AuthTokenValidator<ReqwestTransport> {
    /// Creates a validator with the default HTTP transport, honouring
    /// the configured OCSP timeout. No transport is set up when
    /// revocation checking is disabled.
    pub fn new(
        configuration: AuthTokenValidationConfiguration,
    ) -> Result<Self, AuthTokenValidationError> {
        let transport = if configuration.ocsp_enabled {
            Some(ReqwestTransport::new(configuration.ocsp_request_timeout)?)
        } else {
            None
        };
        Ok(Self::assemble(configuration, transport))
    }
}

impl<T: OcspTransport> AuthTokenValidator<T> {
    /// Creates a validator with a caller-supplied OCSP transport.
    pub fn with_transport(
        configuration: AuthTokenValidationConfiguration,
        transport: T,
    ) -> Self {
        Self::assemble(configuration, Some(transport))
    }

    fn assemble(configuration: AuthTokenValidationConfiguration, transport: Option<T>) -> Self {
        let trust_verifier =
            CertificateTrustVerifier::new(configuration.trusted_ca_certificates.clone());
        let ocsp_service_provider = OcspServiceProvider::new(&configuration);
        AuthTokenValidator {
            configuration,
            trust_verifier,
            ocsp_service_provider,
            transport,
            rng: SystemRandom::new(),
        }
    }

    pub fn configuration(&self) -> &AuthTokenValidationConfiguration {
        &self.configuration
    }

    /// Validates the token against the current time. On success the
    /// parsed user certificate is returned as the authenticated
    /// identity.
    pub fn validate(
        &self,
        token: &WebEidAuthToken,
        challenge_nonce: &ChallengeNonce,
    ) -> Result<Certificate, AuthTokenValidationError> {
        self.validate_at(token, challenge_nonce, Utc::now())
    }

    /// Validates the token at an explicit point in time. The pipeline
    /// is a pure function of the token, the nonce, the OCSP exchange
    /// and `now`; repeated invocation with identical inputs yields the
    /// identical outcome.
    pub fn validate_at(
        &self,
        token: &WebEidAuthToken,
        challenge_nonce: &ChallengeNonce,
        now: DateTime<Utc>,
    ) -> Result<Certificate, AuthTokenValidationError> {
        let result = self.run_pipeline(token, challenge_nonce, now);
        if let Err(error) = &result {
            warn!(%error, "authentication token validation failed");
        }
        result
    }

    fn run_pipeline(
        &self,
        token: &WebEidAuthToken,
        challenge_nonce: &ChallengeNonce,
        now: DateTime<Utc>,
    ) -> Result<Certificate, AuthTokenValidationError> {
        let certificate_der = decode_der_base64(&token.unverified_certificate)
            .map_err(|e| AuthTokenValidationError::TokenParse(e.to_string()))?;
        let certificate = parse_certificate(&certificate_der)
            .map_err(|e| AuthTokenValidationError::TokenParse(e.to_string()))?;
        debug!(
            subject = %certificate.tbs_certificate.subject,
            algorithm = %token.algorithm,
            "token parsed"
        );

        let subject_validator = SubjectCertificateValidator::new(
            &self.trust_verifier,
            &self.configuration.disallowed_policy_oids,
        );
        let issuer = subject_validator.validate(&certificate, now)?;

        if self.configuration.ocsp_enabled {
            self.check_revocation(&certificate, issuer)?;
        } else {
            debug!("revocation checking is disabled, skipping OCSP");
        }

        verify_token_signature(
            &token.algorithm,
            &token.signature,
            &certificate,
            self.configuration.origin(),
            challenge_nonce,
        )?;

        Ok(certificate)
    }

    /// The OCSP leg: select the responder, send the request, validate
    /// the response. This is the pipeline's only network I/O.
    fn check_revocation(
        &self,
        certificate: &Certificate,
        issuer: &Certificate,
    ) -> Result<(), AuthTokenValidationError> {
        let transport = self.transport.as_ref().ok_or_else(|| {
            AuthTokenValidationError::ConfigurationError(
                "revocation checking is enabled but no OCSP transport is configured".to_string(),
            )
        })?;

        let service = self.ocsp_service_provider.service_for(certificate)?;
        let request =
            build_ocsp_request(certificate, issuer, service.nonce_enabled(), &self.rng)?;

        let http_request = ocsp_http_request(service.access_url(), request.as_der().to_vec())?;
        let http_response = transport.send(http_request)?;
        debug!(url = %service.access_url(), "OCSP response received");

        OcspResponseValidator::new(&self.trust_verifier).validate(
            http_response.body(),
            &request,
            &service,
        )
    }
}
