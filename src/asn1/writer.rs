//! Canonical DER emission: definite minimal-length encodings only.
//!
//! Builders return owned byte vectors and compose by concatenation, so a
//! structure is assembled leaves-first and wrapped with [`sequence`] /
//! [`explicit`] at the end.

use chrono::{DateTime, Datelike, Timelike, Utc};
use num_bigint::BigUint;

use super::reader::{
    TAG_BIT_STRING, TAG_BOOLEAN, TAG_ENUMERATED, TAG_GENERALIZED_TIME, TAG_IA5_STRING,
    TAG_INTEGER, TAG_NULL, TAG_OCTET_STRING, TAG_OID, TAG_PRINTABLE_STRING, TAG_SEQUENCE,
    TAG_SET, TAG_UTF8_STRING,
};
use super::Asn1Error;
use crate::oid::Oid;

/// One TLV with minimal definite length
pub fn tlv(tag: u8, content: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(content.len() + 4);
    out.push(tag);
    encode_length(&mut out, content.len());
    out.extend_from_slice(content);
    out
}

fn encode_length(out: &mut Vec<u8>, length: usize) {
    if length < 0x80 {
        out.push(length as u8);
        return;
    }
    let bytes = length.to_be_bytes();
    let skip = bytes.iter().take_while(|b| **b == 0).count();
    out.push(0x80 | (bytes.len() - skip) as u8);
    out.extend_from_slice(&bytes[skip..]);
}

pub fn sequence(content: &[u8]) -> Vec<u8> {
    tlv(TAG_SEQUENCE, content)
}

/// SET OF with the DER element ordering applied
pub fn set_of(mut elements: Vec<Vec<u8>>) -> Vec<u8> {
    elements.sort();
    tlv(TAG_SET, &elements.concat())
}

/// EXPLICIT context wrapper `[n]`
pub fn explicit(number: u8, inner: &[u8]) -> Vec<u8> {
    tlv(0xA0 | number, inner)
}

/// IMPLICIT context-specific primitive `[n]`
pub fn context_primitive(number: u8, content: &[u8]) -> Vec<u8> {
    tlv(0x80 | number, content)
}

/// INTEGER from unsigned big-endian magnitude, minimal two's complement
pub fn integer_from_unsigned_bytes(bytes: &[u8]) -> Vec<u8> {
    let significant: &[u8] = {
        let skip = bytes.iter().take_while(|b| **b == 0).count();
        &bytes[skip..]
    };
    let mut content = Vec::with_capacity(significant.len() + 1);
    if significant.first().map_or(true, |b| b & 0x80 != 0) {
        content.push(0x00);
    }
    content.extend_from_slice(significant);
    tlv(TAG_INTEGER, &content)
}

pub fn uint(value: u64) -> Vec<u8> {
    integer_from_unsigned_bytes(&value.to_be_bytes())
}

pub fn big_uint(value: &BigUint) -> Vec<u8> {
    integer_from_unsigned_bytes(&value.to_bytes_be())
}

pub fn enumerated(value: u64) -> Vec<u8> {
    let mut encoded = uint(value);
    encoded[0] = TAG_ENUMERATED;
    encoded
}

pub fn boolean(value: bool) -> Vec<u8> {
    tlv(TAG_BOOLEAN, &[if value { 0xFF } else { 0x00 }])
}

pub fn null() -> Vec<u8> {
    tlv(TAG_NULL, &[])
}

pub fn octet_string(bytes: &[u8]) -> Vec<u8> {
    tlv(TAG_OCTET_STRING, bytes)
}

/// BIT STRING; the unused-bits octet is prepended to the value
pub fn bit_string(unused_bits: u8, bytes: &[u8]) -> Vec<u8> {
    let mut content = Vec::with_capacity(bytes.len() + 1);
    content.push(unused_bits);
    content.extend_from_slice(bytes);
    tlv(TAG_BIT_STRING, &content)
}

pub fn oid(value: &Oid) -> Result<Vec<u8>, Asn1Error> {
    Ok(tlv(TAG_OID, &value.to_der_content()?))
}

pub fn utf8_string(value: &str) -> Vec<u8> {
    tlv(TAG_UTF8_STRING, value.as_bytes())
}

pub fn printable_string(value: &str) -> Vec<u8> {
    tlv(TAG_PRINTABLE_STRING, value.as_bytes())
}

pub fn ia5_string(value: &str) -> Vec<u8> {
    tlv(TAG_IA5_STRING, value.as_bytes())
}

/// GeneralizedTime in the DER `YYYYMMDDHHMMSSZ` form
pub fn generalized_time(value: &DateTime<Utc>) -> Vec<u8> {
    let text = format!(
        "{:04}{:02}{:02}{:02}{:02}{:02}Z",
        value.year(),
        value.month(),
        value.day(),
        value.hour(),
        value.minute(),
        value.second()
    );
    tlv(TAG_GENERALIZED_TIME, text.as_bytes())
}
