use std::collections::HashSet;

use tracing::debug;
use url::Url;
use x509_cert::ext::pkix::name::GeneralName;
use x509_cert::ext::pkix::AuthorityInfoAccessSyntax;
use x509_cert::Certificate;

use crate::config::{AuthTokenValidationConfiguration, DesignatedOcspServiceConfiguration};
use crate::error::AuthTokenValidationError;
use crate::x509::{decode_extension, oids};

/// The responder selected for a particular subject certificate: either
/// the configured designated service or the certificate's own AIA
/// responder.
#[derive(Debug, Clone)]
pub struct OcspService {
    pub(crate) access_url: Url,
    pub(crate) nonce_enabled: bool,
    /// Pinned responder certificate when the designated service is in
    /// use; `None` selects the AIA trust rules.
    pub(crate) designated_responder: Option<Certificate>,
}

impl OcspService {
    pub fn access_url(&self) -> &Url {
        &self.access_url
    }

    pub fn is_designated(&self) -> bool {
        self.designated_responder.is_some()
    }

    /// Whether the nonce extension is sent and required back.
    pub fn nonce_enabled(&self) -> bool {
        self.nonce_enabled
    }
}

/// Chooses between the designated responder and the AIA responder of
/// the subject certificate.
#[derive(Debug, Clone)]
pub struct OcspServiceProvider {
    designated_service: Option<DesignatedOcspServiceConfiguration>,
    nonce_disabled_urls: HashSet<Url>,
}

impl OcspServiceProvider {
    pub fn new(configuration: &AuthTokenValidationConfiguration) -> Self {
        OcspServiceProvider {
            designated_service: configuration.designated_ocsp_service.clone(),
            nonce_disabled_urls: configuration.nonce_disabled_ocsp_urls.clone(),
        }
    }

    /// Selects the OCSP service for `subject`.
    ///
    /// The designated service wins when it is configured and supports
    /// the subject's issuer; otherwise the first `id-ad-ocsp` entry of
    /// the AuthorityInfoAccess extension is used, with nonce support
    /// controlled by the configured nonce-disabled URL set.
    ///
    /// # Errors
    ///
    /// `OcspUrlMissing` when no designated service applies and the
    /// certificate has no usable AIA OCSP URL.
    pub fn service_for(
        &self,
        subject: &Certificate,
    ) -> Result<OcspService, AuthTokenValidationError> {
        if let Some(designated) = &self.designated_service {
            if designated.supports_issuer_of(subject) {
                debug!(url = %designated.access_url, "using designated OCSP service");
                return Ok(OcspService {
                    access_url: designated.access_url.clone(),
                    nonce_enabled: designated.supports_nonce,
                    designated_responder: Some(designated.responder_certificate.clone()),
                });
            }
        }

        let access_url =
            aia_ocsp_url(subject)?.ok_or(AuthTokenValidationError::OcspUrlMissing)?;
        let nonce_enabled = !self.nonce_disabled_urls.contains(&access_url);
        debug!(url = %access_url, nonce_enabled, "using AIA OCSP service");
        Ok(OcspService {
            access_url,
            nonce_enabled,
            designated_responder: None,
        })
    }
}

/// The first parseable OCSP URI of the certificate's
/// AuthorityInfoAccess extension; entries that are not URIs or do not
/// parse as URLs are skipped.
fn aia_ocsp_url(certificate: &Certificate) -> Result<Option<Url>, AuthTokenValidationError> {
    let Some(aia) =
        decode_extension::<AuthorityInfoAccessSyntax>(certificate, oids::AUTHORITY_INFO_ACCESS)?
    else {
        return Ok(None);
    };

    for access in aia.0.iter() {
        if access.access_method != oids::AD_OCSP {
            continue;
        }
        if let GeneralName::UniformResourceIdentifier(uri) = &access.access_location {
            if let Ok(url) = Url::parse(&uri.to_string()) {
                return Ok(Some(url));
            }
        }
    }
    Ok(None)
}
