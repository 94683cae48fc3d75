//! OCSP revocation checking: responder selection, request building,
//! transport and response validation per RFC 6960.

pub mod request_builder;
pub mod response_validator;
pub mod service;
pub mod transport;

pub use request_builder::{build_ocsp_request, BuiltOcspRequest};
pub use response_validator::OcspResponseValidator;
pub use service::{OcspService, OcspServiceProvider};
pub use transport::{OcspTransport, ReqwestTransport, TransportError};
