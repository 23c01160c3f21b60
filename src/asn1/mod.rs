//! DER/BER codec for the ASN.1 subset used by OCSP and X.509.
//!
//! The reader is tolerant on input (BER long-form and indefinite lengths are
//! accepted where a constructed value permits them); the writer emits strict
//! DER only.

pub mod reader;
pub mod writer;

/// ASN.1 decoding/encoding error
#[derive(thiserror::Error, Debug, PartialEq)]
pub enum Asn1Error {
    #[error("Truncated: [{0}]")]
    Truncated(String),

    #[error("TagMismatch: [expected {expected}, found tag 0x{found:02x}]")]
    TagMismatch { expected: &'static str, found: u8 },

    #[error("UnsupportedTag: [{0}]")]
    UnsupportedTag(String),

    #[error("OverlongLength: [{0}]")]
    OverlongLength(String),

    #[error("IntegerOverflow: [{0}]")]
    IntegerOverflow(String),

    #[error("Utf8Invalid: [{0}]")]
    Utf8Invalid(String),
}
