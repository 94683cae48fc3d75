use std::collections::HashSet;
use std::time::Duration;

use const_oid::ObjectIdentifier;
use url::Url;
use x509_cert::name::Name;
use x509_cert::Certificate;

use crate::error::AuthTokenValidationError;

pub const DEFAULT_OCSP_REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// A pre-configured OCSP responder used instead of the AIA responder
/// for certificates issued by one of its supported issuers. The
/// responder certificate is pinned: the response must be signed by
/// exactly this certificate.
#[derive(Debug, Clone)]
pub struct DesignatedOcspServiceConfiguration {
    pub(crate) access_url: Url,
    pub(crate) responder_certificate: Certificate,
    pub(crate) supported_issuers: Vec<Name>,
    pub(crate) supports_nonce: bool,
}

impl DesignatedOcspServiceConfiguration {
    /// # Arguments
    ///
    /// * `access_url` - The responder's HTTP access location.
    /// * `responder_certificate` - The pinned responder certificate.
    /// * `supported_certificate_issuers` - Issuer CA certificates whose
    ///   subjects this responder can answer for.
    /// * `supports_nonce` - Whether the responder echoes the nonce
    ///   extension.
    pub fn new(
        access_url: Url,
        responder_certificate: Certificate,
        supported_certificate_issuers: &[Certificate],
        supports_nonce: bool,
    ) -> Self {
        let supported_issuers = supported_certificate_issuers
            .iter()
            .map(|ca| ca.tbs_certificate.subject.clone())
            .collect();

        DesignatedOcspServiceConfiguration {
            access_url,
            responder_certificate,
            supported_issuers,
            supports_nonce,
        }
    }

    /// Whether the issuer DN of `certificate` is one the designated
    /// responder answers for.
    pub(crate) fn supports_issuer_of(&self, certificate: &Certificate) -> bool {
        self.supported_issuers
            .contains(&certificate.tbs_certificate.issuer)
    }
}

/// Immutable validation settings, shared read-only across requests.
///
/// Constructed through [`AuthTokenValidationConfigurationBuilder`],
/// which runs all invariant checks once at build time so reads never
/// need locking.
#[derive(Debug, Clone)]
pub struct AuthTokenValidationConfiguration {
    pub(crate) origin: String,
    pub(crate) trusted_ca_certificates: Vec<Certificate>,
    pub(crate) disallowed_policy_oids: Vec<ObjectIdentifier>,
    pub(crate) ocsp_request_timeout: Duration,
    pub(crate) nonce_disabled_ocsp_urls: HashSet<Url>,
    pub(crate) designated_ocsp_service: Option<DesignatedOcspServiceConfiguration>,
    pub(crate) ocsp_enabled: bool,
}

impl AuthTokenValidationConfiguration {
    pub fn builder() -> AuthTokenValidationConfigurationBuilder {
        AuthTokenValidationConfigurationBuilder::default()
    }

    /// The exact origin string hashed into the signed payload:
    /// `scheme://host[:port]` with default ports elided and no trailing
    /// slash.
    pub fn origin(&self) -> &str {
        &self.origin
    }
}

/// Fluent builder for [`AuthTokenValidationConfiguration`].
#[derive(Debug, Default)]
pub struct AuthTokenValidationConfigurationBuilder {
    site_origin: Option<Url>,
    trusted_ca_certificates: Vec<Certificate>,
    disallowed_policy_oids: Vec<ObjectIdentifier>,
    ocsp_request_timeout: Option<Duration>,
    nonce_disabled_ocsp_urls: HashSet<Url>,
    designated_ocsp_service: Option<DesignatedOcspServiceConfiguration>,
    ocsp_disabled: bool,
}

impl AuthTokenValidationConfigurationBuilder {
    /// The origin URL of the relying web application. Required.
    pub fn with_site_origin(mut self, origin: Url) -> Self {
        self.site_origin = Some(origin);
        self
    }

    /// Adds intermediate-CA trust anchors that may issue user and OCSP
    /// responder certificates. At least one is required.
    pub fn with_trusted_certificate_authorities(mut self, certificates: Vec<Certificate>) -> Self {
        self.trusted_ca_certificates.extend(certificates);
        self
    }

    /// Certificate policy OIDs that disqualify a user certificate.
    pub fn with_disallowed_certificate_policies(mut self, policies: Vec<ObjectIdentifier>) -> Self {
        self.disallowed_policy_oids.extend(policies);
        self
    }

    /// Connect and total-response timeout of the OCSP request.
    /// Defaults to 5 seconds.
    pub fn with_ocsp_request_timeout(mut self, timeout: Duration) -> Self {
        self.ocsp_request_timeout = Some(timeout);
        self
    }

    /// Responder URLs that do not support the nonce extension; requests
    /// to them are sent without a nonce and responses are not required
    /// to echo one.
    pub fn with_nonce_disabled_ocsp_urls(mut self, urls: Vec<Url>) -> Self {
        self.nonce_disabled_ocsp_urls.extend(urls);
        self
    }

    /// Pins a designated OCSP responder for the issuers it supports.
    pub fn with_designated_ocsp_service(mut self, service: DesignatedOcspServiceConfiguration) -> Self {
        self.designated_ocsp_service = Some(service);
        self
    }

    /// Disables revocation checking entirely; no network I/O will be
    /// performed during validation.
    pub fn without_ocsp_revocation_check(mut self) -> Self {
        self.ocsp_disabled = true;
        self
    }

    /// Validates the invariants and freezes the configuration.
    ///
    /// # Errors
    ///
    /// `ConfigurationError` when the origin is missing or lacks
    /// scheme/host, or when no trusted CA is configured.
    pub fn build(self) -> Result<AuthTokenValidationConfiguration, AuthTokenValidationError> {
        let site_origin = self.site_origin.ok_or_else(|| {
            AuthTokenValidationError::ConfigurationError("site origin is required".to_string())
        })?;

        if !site_origin.has_host() {
            return Err(AuthTokenValidationError::ConfigurationError(
                "site origin must contain a host".to_string(),
            ));
        }
        let origin_serialization = site_origin.origin();
        if !matches!(origin_serialization, url::Origin::Tuple(..)) {
            return Err(AuthTokenValidationError::ConfigurationError(
                "site origin must be a scheme://host[:port] URL".to_string(),
            ));
        }
        let origin = origin_serialization.ascii_serialization();

        if self.trusted_ca_certificates.is_empty() {
            return Err(AuthTokenValidationError::ConfigurationError(
                "at least one trusted certificate authority is required".to_string(),
            ));
        }

        Ok(AuthTokenValidationConfiguration {
            origin,
            trusted_ca_certificates: self.trusted_ca_certificates,
            disallowed_policy_oids: self.disallowed_policy_oids,
            ocsp_request_timeout: self.ocsp_request_timeout.unwrap_or(DEFAULT_OCSP_REQUEST_TIMEOUT),
            nonce_disabled_ocsp_urls: self.nonce_disabled_ocsp_urls,
            designated_ocsp_service: self.designated_ocsp_service,
            ocsp_enabled: !self.ocsp_disabled,
        })
    }
}
