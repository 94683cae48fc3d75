//! Accessors for the subject fields of an authenticated certificate.
//!
//! After validation succeeds the relying application typically needs
//! the holder's name and national ID code from the certificate subject;
//! these helpers decode the relevant RDN attribute values.

use const_oid::ObjectIdentifier;
use der::asn1::{PrintableStringRef, Utf8StringRef};
use der::Tag;
use der::Tagged;
use x509_cert::Certificate;

use crate::x509::oids;

/// Subject common name, e.g. `JÕEORG,JAAK-KRISTJAN,38001085718`.
pub fn subject_common_name(cert: &Certificate) -> Option<String> {
    subject_field(cert, oids::AT_COMMON_NAME)
}

/// Subject given name.
pub fn subject_given_name(cert: &Certificate) -> Option<String> {
    subject_field(cert, oids::AT_GIVEN_NAME)
}

/// Subject surname.
pub fn subject_surname(cert: &Certificate) -> Option<String> {
    subject_field(cert, oids::AT_SURNAME)
}

/// Subject serial number; for eID certificates the national ID code,
/// e.g. `PNOEE-38001085718`.
pub fn subject_id_code(cert: &Certificate) -> Option<String> {
    subject_field(cert, oids::AT_SERIAL_NUMBER)
}

/// Subject country code.
pub fn subject_country(cert: &Certificate) -> Option<String> {
    subject_field(cert, oids::AT_COUNTRY)
}

/// Finds the first attribute of the subject DN with the given type OID
/// and decodes its PrintableString or UTF8String value.
fn subject_field(cert: &Certificate, attribute: ObjectIdentifier) -> Option<String> {
    for rdn in cert.tbs_certificate.subject.0.iter() {
        for atv in rdn.0.iter() {
            if atv.oid != attribute {
                continue;
            }
            let decoded = match atv.value.tag() {
                Tag::PrintableString => atv
                    .value
                    .decode_as::<PrintableStringRef<'_>>()
                    .ok()
                    .map(|s| s.to_string()),
                Tag::Utf8String => atv
                    .value
                    .decode_as::<Utf8StringRef<'_>>()
                    .ok()
                    .map(|s| s.to_string()),
                _ => None,
            };
            if decoded.is_some() {
                return decoded;
            }
        }
    }
    None
}
