#![allow(dead_code)]


use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use der::asn1::{BitString, GeneralizedTime, OctetString};
use der::{Decode, Encode};
use rcgen::{
    BasicConstraints, CertificateParams, CustomExtension, DistinguishedName, DnType,
    ExtendedKeyUsagePurpose, IsCa, KeyPair, KeyUsagePurpose, SerialNumber,
    PKCS_ECDSA_P256_SHA256, PKCS_ECDSA_P384_SHA384, PKCS_RSA_SHA256,
};
use ring::digest;
use ring::rand::SystemRandom;
use ring::signature::{EcdsaKeyPair, RsaKeyPair};
use spki::AlgorithmIdentifierOwned;
use x509_cert::Certificate;
use x509_ocsp::{
    BasicOcspResponse, CertStatus, OcspRequest, OcspResponse, OcspResponseStatus, ResponderId,
    ResponseBytes, ResponseData, SingleResponse, Version,
};

use web_eid_authtoken_validation::auth_token::WebEidAuthToken;

pub const ORIGIN: &str = "https://ria.ee";
pub const NONCE: &str = "12345678123456781234567812345678";
pub const AIA_URL: &str = "http://aia.demo.sk.ee/esteid2018";
pub const DESIGNATED_URL: &str = "http://demo.sk.ee/ocsp";

const ID_PE_AUTHORITY_INFO_ACCESS: &[u64] = &[1, 3, 6, 1, 5, 5, 7, 1, 1];
const ID_CE_CERTIFICATE_POLICIES: &[u64] = &[2, 5, 29, 32];
const ID_PKIX_OCSP_NONCE: &str = "1.3.6.1.5.5.7.48.1.2";
const ECDSA_WITH_SHA256: &str = "1.2.840.10045.4.3.2";

const RSA_TEST_KEY_PEM: &str = include_str!("../resources/rsa_test_key.pem");

/// A generated certificate with its signing key, in every form the
/// tests need it in.
pub struct TestIdentity {
    pub cert: Certificate,
    pub cert_der: Vec<u8>,
    pub key_pkcs8: Vec<u8>,
    pub rcgen_cert: rcgen::Certificate,
    pub rcgen_key: KeyPair,
}

impl TestIdentity {
    fn from_rcgen(cert: rcgen::Certificate, key: KeyPair) -> Self {
        let cert_der = cert.der().to_vec();
        let parsed = Certificate::from_der(&cert_der).expect("generated certificate must parse");
        let key_pkcs8 = key.serialize_der();
        TestIdentity {
            cert: parsed,
            cert_der,
            key_pkcs8,
            rcgen_cert: cert,
            rcgen_key: key,
        }
    }

    pub fn cert_base64(&self) -> String {
        STANDARD.encode(&self.cert_der)
    }

    /// The clonable subset a mock responder closure needs to sign
    /// responses with this identity.
    pub fn ocsp_signer(&self) -> OcspSigner {
        OcspSigner {
            cert: self.cert.clone(),
            key_pkcs8: self.key_pkcs8.clone(),
        }
    }
}

/// Certificate and key of a mock OCSP responder.
#[derive(Clone)]
pub struct OcspSigner {
    pub cert: Certificate,
    pub key_pkcs8: Vec<u8>,
}

fn dn(common_name: &str) -> DistinguishedName {
    let mut dn = DistinguishedName::new();
    dn.push(DnType::CountryName, "EE");
    dn.push(DnType::OrganizationName, "test");
    dn.push(DnType::CommonName, common_name);
    dn
}

fn base_params(common_name: &str) -> CertificateParams {
    let mut params = CertificateParams::new(Vec::<String>::new()).expect("params");
    params.distinguished_name = dn(common_name);
    params.not_before = time::OffsetDateTime::now_utc() - time::Duration::days(1);
    params.not_after = time::OffsetDateTime::now_utc() + time::Duration::days(365);
    params
}

/// A self-signed intermediate CA usable as a trust anchor.
pub fn test_ca(common_name: &str) -> TestIdentity {
    let key = KeyPair::generate_for(&PKCS_ECDSA_P256_SHA256).expect("CA key");
    let mut params = base_params(common_name);
    params.is_ca = IsCa::Ca(BasicConstraints::Unconstrained);
    params.key_usages = vec![KeyUsagePurpose::KeyCertSign, KeyUsagePurpose::DigitalSignature];
    params.not_after = time::OffsetDateTime::now_utc() + time::Duration::days(3650);
    params.serial_number = Some(SerialNumber::from(vec![0x01]));
    let cert = params.self_signed(&key).expect("CA certificate");
    TestIdentity::from_rcgen(cert, key)
}

/// An intermediate CA signed by `parent`, for chain-depth tests.
pub fn issue_intermediate(parent: &TestIdentity, common_name: &str) -> TestIdentity {
    let key = KeyPair::generate_for(&PKCS_ECDSA_P256_SHA256).expect("intermediate key");
    let mut params = base_params(common_name);
    params.is_ca = IsCa::Ca(BasicConstraints::Unconstrained);
    params.key_usages = vec![KeyUsagePurpose::KeyCertSign, KeyUsagePurpose::DigitalSignature];
    params.not_after = time::OffsetDateTime::now_utc() + time::Duration::days(3650);
    params.serial_number = Some(SerialNumber::from(vec![0x02]));
    let cert = params
        .signed_by(&key, &parent.rcgen_cert, &parent.rcgen_key)
        .expect("intermediate certificate");
    TestIdentity::from_rcgen(cert, key)
}

/// Knobs for issuing a user certificate; the default is a well-formed
/// authentication certificate with an AIA OCSP URL.
pub struct SubjectParams {
    pub common_name: String,
    pub aia_url: Option<String>,
    pub policies: Vec<String>,
    pub digital_signature: bool,
    pub client_auth: bool,
    pub use_p256_key: bool,
    pub not_before: time::OffsetDateTime,
    pub not_after: time::OffsetDateTime,
    pub serial: Vec<u8>,
}

impl Default for SubjectParams {
    fn default() -> Self {
        SubjectParams {
            common_name: "JÕEORG,JAAK-KRISTJAN,38001085718".to_string(),
            aia_url: Some(AIA_URL.to_string()),
            policies: Vec::new(),
            digital_signature: true,
            client_auth: true,
            use_p256_key: false,
            not_before: time::OffsetDateTime::now_utc() - time::Duration::days(1),
            not_after: time::OffsetDateTime::now_utc() + time::Duration::days(365),
            serial: vec![0x51, 0x02],
        }
    }
}

/// Issues a user authentication certificate signed by `ca`.
pub fn issue_subject(ca: &TestIdentity, subject: SubjectParams) -> TestIdentity {
    let algorithm = if subject.use_p256_key {
        &PKCS_ECDSA_P256_SHA256
    } else {
        &PKCS_ECDSA_P384_SHA384
    };
    let key = KeyPair::generate_for(algorithm).expect("subject key");
    issue_subject_with_key(ca, subject, key)
}

/// Issues an RSA user certificate from the fixed test key.
pub fn issue_rsa_subject(ca: &TestIdentity, subject: SubjectParams) -> TestIdentity {
    let key = KeyPair::from_pem_and_sign_algo(RSA_TEST_KEY_PEM, &PKCS_RSA_SHA256)
        .expect("RSA subject key");
    issue_subject_with_key(ca, subject, key)
}

fn issue_subject_with_key(ca: &TestIdentity, subject: SubjectParams, key: KeyPair) -> TestIdentity {
    let mut params = base_params(&subject.common_name);
    params.not_before = subject.not_before;
    params.not_after = subject.not_after;
    params.serial_number = Some(SerialNumber::from(subject.serial.clone()));
    if subject.digital_signature {
        params.key_usages = vec![KeyUsagePurpose::DigitalSignature];
    } else {
        params.key_usages = vec![KeyUsagePurpose::KeyEncipherment];
    }
    if subject.client_auth {
        params.extended_key_usages = vec![ExtendedKeyUsagePurpose::ClientAuth];
    }
    if let Some(url) = &subject.aia_url {
        params
            .custom_extensions
            .push(CustomExtension::from_oid_content(
                ID_PE_AUTHORITY_INFO_ACCESS,
                aia_extension_content(url),
            ));
    }
    if !subject.policies.is_empty() {
        params
            .custom_extensions
            .push(CustomExtension::from_oid_content(
                ID_CE_CERTIFICATE_POLICIES,
                policies_extension_content(&subject.policies),
            ));
    }

    let cert = params
        .signed_by(&key, &ca.rcgen_cert, &ca.rcgen_key)
        .expect("subject certificate");
    TestIdentity::from_rcgen(cert, key)
}

/// Issues an OCSP responder certificate signed by `ca`.
pub fn issue_responder(ca: &TestIdentity, common_name: &str, ocsp_signing: bool) -> TestIdentity {
    let key = KeyPair::generate_for(&PKCS_ECDSA_P256_SHA256).expect("responder key");
    let mut params = base_params(common_name);
    params.serial_number = Some(SerialNumber::from(vec![0x0c, 0x0f]));
    params.key_usages = vec![KeyUsagePurpose::DigitalSignature];
    if ocsp_signing {
        params.extended_key_usages = vec![ExtendedKeyUsagePurpose::OcspSigning];
    }
    let cert = params
        .signed_by(&key, &ca.rcgen_cert, &ca.rcgen_key)
        .expect("responder certificate");
    TestIdentity::from_rcgen(cert, key)
}

fn aia_extension_content(url: &str) -> Vec<u8> {
    use x509_cert::ext::pkix::name::GeneralName;
    use x509_cert::ext::pkix::{AccessDescription, AuthorityInfoAccessSyntax};

    let aia = AuthorityInfoAccessSyntax(vec![AccessDescription {
        access_method: const_oid::ObjectIdentifier::new_unwrap("1.3.6.1.5.5.7.48.1"),
        access_location: GeneralName::UniformResourceIdentifier(
            der::asn1::Ia5String::new(url).expect("IA5 URL"),
        ),
    }]);
    aia.to_der().expect("AIA DER")
}

fn policies_extension_content(policies: &[String]) -> Vec<u8> {
    use x509_cert::ext::pkix::certpolicy::PolicyInformation;
    use x509_cert::ext::pkix::CertificatePolicies;

    let infos = policies
        .iter()
        .map(|oid| PolicyInformation {
            policy_identifier: oid.parse().expect("policy OID"),
            policy_qualifiers: None,
        })
        .collect();
    CertificatePolicies(infos).to_der().expect("policies DER")
}

/// `H(origin) ‖ H(nonce)`, the blob the token signature covers.
pub fn signed_payload(hash: &'static digest::Algorithm, origin: &str, nonce: &str) -> Vec<u8> {
    let mut payload = Vec::new();
    payload.extend_from_slice(digest::digest(hash, origin.as_bytes()).as_ref());
    payload.extend_from_slice(digest::digest(hash, nonce.as_bytes()).as_ref());
    payload
}

/// Signs the payload the way the eID card does for ES384: a raw
/// fixed-width `R ‖ S` pair, then base64.
pub fn sign_token_es384(subject: &TestIdentity, origin: &str, nonce: &str) -> String {
    let rng = SystemRandom::new();
    let key = EcdsaKeyPair::from_pkcs8(
        &ring::signature::ECDSA_P384_SHA384_FIXED_SIGNING,
        &subject.key_pkcs8,
        &rng,
    )
    .expect("P-384 signing key");
    let payload = signed_payload(&digest::SHA384, origin, nonce);
    let signature = key.sign(&rng, &payload).expect("signature");
    STANDARD.encode(signature.as_ref())
}

/// ES256 variant for P-256 subject keys.
pub fn sign_token_es256(subject: &TestIdentity, origin: &str, nonce: &str) -> String {
    let rng = SystemRandom::new();
    let key = EcdsaKeyPair::from_pkcs8(
        &ring::signature::ECDSA_P256_SHA256_FIXED_SIGNING,
        &subject.key_pkcs8,
        &rng,
    )
    .expect("P-256 signing key");
    let payload = signed_payload(&digest::SHA256, origin, nonce);
    let signature = key.sign(&rng, &payload).expect("signature");
    STANDARD.encode(signature.as_ref())
}

pub fn sign_token_rs256(subject: &TestIdentity, origin: &str, nonce: &str) -> String {
    rsa_sign(
        &ring::signature::RSA_PKCS1_SHA256,
        subject,
        &signed_payload(&digest::SHA256, origin, nonce),
    )
}

pub fn sign_token_ps256(subject: &TestIdentity, origin: &str, nonce: &str) -> String {
    rsa_sign(
        &ring::signature::RSA_PSS_SHA256,
        subject,
        &signed_payload(&digest::SHA256, origin, nonce),
    )
}

fn rsa_sign(
    padding: &'static dyn ring::signature::RsaEncoding,
    subject: &TestIdentity,
    payload: &[u8],
) -> String {
    let rng = SystemRandom::new();
    let key = RsaKeyPair::from_pkcs8(&subject.key_pkcs8).expect("RSA signing key");
    let mut signature = vec![0u8; key.public().modulus_len()];
    key.sign(padding, &rng, payload, &mut signature)
        .expect("RSA signature");
    STANDARD.encode(&signature)
}

pub fn auth_token(subject: &TestIdentity, algorithm: &str, signature: String) -> WebEidAuthToken {
    WebEidAuthToken {
        unverified_certificate: subject.cert_base64(),
        algorithm: algorithm.to_string(),
        signature,
        format: "web-eid:1.0".to_string(),
    }
}

/// How the mock responder treats the request nonce.
pub enum NonceEcho {
    /// Copy the request's nonce extension into the response.
    Echo,
    /// Send no nonce extension at all.
    Omit,
    /// Send this value instead of the request's.
    Fixed(Vec<u8>),
}

/// Knobs for the canned OCSP response; defaults describe a fresh
/// `good` answer signed by the responder it names.
pub struct OcspResponseParams {
    pub cert_status: CertStatus,
    pub produced_at_offset: i64,
    pub this_update_offset: i64,
    pub next_update_offset: Option<i64>,
    pub nonce: NonceEcho,
    pub include_certs: bool,
    /// Answer about a different serial than the one asked about.
    pub wrong_serial: bool,
}

impl Default for OcspResponseParams {
    fn default() -> Self {
        OcspResponseParams {
            cert_status: CertStatus::Good(der::asn1::Null),
            produced_at_offset: 0,
            this_update_offset: -60,
            next_update_offset: None,
            nonce: NonceEcho::Echo,
            include_certs: true,
            wrong_serial: false,
        }
    }
}

pub fn request_nonce(request: &OcspRequest) -> Option<Vec<u8>> {
    let nonce_oid: const_oid::ObjectIdentifier = ID_PKIX_OCSP_NONCE.parse().ok()?;
    request
        .tbs_request
        .request_extensions
        .as_ref()?
        .iter()
        .find(|ext| ext.extn_id == nonce_oid)
        .and_then(|ext| OctetString::from_der(ext.extn_value.as_bytes()).ok())
        .map(|octets| octets.as_bytes().to_vec())
}

fn unix_now() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .expect("clock")
        .as_secs() as i64
}

fn generalized_time(unix: i64) -> GeneralizedTime {
    GeneralizedTime::from_unix_duration(std::time::Duration::from_secs(unix as u64))
        .expect("GeneralizedTime")
}

/// Builds a complete DER OCSPResponse answering `request`, signed by
/// `responder` with ecdsa-with-SHA256.
pub fn ocsp_response_for(
    request: &OcspRequest,
    responder: &OcspSigner,
    params: OcspResponseParams,
) -> Vec<u8> {
    let now = unix_now();
    let mut cert_id = request.tbs_request.request_list[0].req_cert.clone();
    if params.wrong_serial {
        cert_id.serial_number =
            x509_cert::serial_number::SerialNumber::new(&[0x63]).expect("serial");
    }

    let single = SingleResponse {
        cert_id,
        cert_status: params.cert_status,
        this_update: x509_ocsp::OcspGeneralizedTime(generalized_time(now + params.this_update_offset)),
        next_update: params
            .next_update_offset
            .map(|offset| x509_ocsp::OcspGeneralizedTime(generalized_time(now + offset))),
        single_extensions: None,
    };

    let nonce_value = match params.nonce {
        NonceEcho::Echo => request_nonce(request),
        NonceEcho::Omit => None,
        NonceEcho::Fixed(value) => Some(value),
    };
    let response_extensions = nonce_value.map(|nonce| {
        let inner = OctetString::new(nonce).expect("nonce").to_der().expect("nonce DER");
        vec![x509_cert::ext::Extension {
            extn_id: ID_PKIX_OCSP_NONCE.parse().expect("nonce OID"),
            critical: false,
            extn_value: OctetString::new(inner).expect("nonce extension"),
        }]
    });

    let tbs_response_data = ResponseData {
        version: Version::V1,
        responder_id: ResponderId::ByName(responder.cert.tbs_certificate.subject.clone()),
        produced_at: x509_ocsp::OcspGeneralizedTime(generalized_time(now + params.produced_at_offset)),
        responses: vec![single],
        response_extensions,
    };

    let tbs_der = tbs_response_data.to_der().expect("tbsResponseData DER");
    let rng = SystemRandom::new();
    let signing_key = EcdsaKeyPair::from_pkcs8(
        &ring::signature::ECDSA_P256_SHA256_ASN1_SIGNING,
        &responder.key_pkcs8,
        &rng,
    )
    .expect("responder signing key");
    let signature = signing_key.sign(&rng, &tbs_der).expect("response signature");

    let basic = BasicOcspResponse {
        tbs_response_data,
        signature_algorithm: AlgorithmIdentifierOwned {
            oid: ECDSA_WITH_SHA256.parse().expect("sig alg OID"),
            parameters: None,
        },
        signature: BitString::from_bytes(signature.as_ref()).expect("signature bits"),
        certs: params.include_certs.then(|| vec![responder.cert.clone()]),
    };

    let response = OcspResponse {
        response_status: OcspResponseStatus::Successful,
        response_bytes: Some(ResponseBytes {
            response_type: "1.3.6.1.5.5.7.48.1.1".parse().expect("basic OID"),
            response: OctetString::new(basic.to_der().expect("basic DER"))
                .expect("response bytes"),
        }),
    };
    response.to_der().expect("OCSPResponse DER")
}

/// An OCSPResponse with a non-successful status and no body.
pub fn ocsp_error_response(status: OcspResponseStatus) -> Vec<u8> {
    OcspResponse {
        response_status: status,
        response_bytes: None,
    }
    .to_der()
    .expect("OCSPResponse DER")
}
