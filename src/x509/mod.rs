//! X.509 certificate access: parsing, field extraction and ring-backed
//! signature verification.

mod certificate;
mod public_key;

pub use certificate::{AccessDescription, Certificate};
pub use public_key::{KeyKind, PublicKey};

use crate::asn1::reader::{Element, TAG_BOOLEAN, TAG_OCTET_STRING, TAG_OID};
use crate::asn1::writer;
use crate::asn1::Asn1Error;
use crate::oid::{self, Oid};

#[derive(thiserror::Error, Debug)]
pub enum CertificateError {
    #[error("NotReadable: [{0}]")]
    NotReadable(String),

    #[error("ParseFailed: [{0}]")]
    ParseFailed(String),

    #[error("MissingSerial")]
    MissingSerial,

    #[error("MissingIssuerName")]
    MissingIssuerName,

    #[error("MissingIssuerKey")]
    MissingIssuerKey,

    #[error("Signature algorithm {0} not implemented")]
    UnsupportedAlgorithm(String),

    #[error("SignatureInvalid: [{0}]")]
    SignatureInvalid(String),
}

impl From<Asn1Error> for CertificateError {
    fn from(err: Asn1Error) -> Self {
        CertificateError::ParseFailed(err.to_string())
    }
}

/// `AlgorithmIdentifier ::= SEQUENCE { algorithm OID, parameters ANY OPTIONAL }`
///
/// Parameters are carried as their raw DER TLV; the common NULL is two bytes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AlgorithmIdentifier {
    pub algorithm: Oid,
    pub parameters: Option<Vec<u8>>,
}

impl AlgorithmIdentifier {
    pub fn with_null_params(algorithm: Oid) -> Self {
        AlgorithmIdentifier {
            algorithm,
            parameters: Some(writer::null()),
        }
    }

    pub fn from_element(element: Element<'_>) -> Result<Self, Asn1Error> {
        let mut fields = element.sequence()?;
        let algorithm = fields.read_expected(TAG_OID, "OBJECT IDENTIFIER")?.oid()?;
        let parameters = if fields.is_empty() {
            None
        } else {
            Some(fields.read()?.raw.to_vec())
        };
        Ok(AlgorithmIdentifier {
            algorithm,
            parameters,
        })
    }

    pub fn to_der(&self) -> Result<Vec<u8>, Asn1Error> {
        let mut content = writer::oid(&self.algorithm)?;
        if let Some(parameters) = &self.parameters {
            content.extend_from_slice(parameters);
        }
        Ok(writer::sequence(&content))
    }

    pub fn name(&self) -> &str {
        self.algorithm.name()
    }
}

/// `Extension ::= SEQUENCE { extnID OID, critical BOOLEAN DEFAULT FALSE,
/// extnValue OCTET STRING }`
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Extension {
    pub extn_id: Oid,
    pub critical: bool,
    /// Content of the extnValue OCTET STRING: the DER of the extension value
    pub extn_value: Vec<u8>,
}

impl Extension {
    pub fn from_element(element: Element<'_>) -> Result<Self, Asn1Error> {
        let mut fields = element.sequence()?;
        let extn_id = fields.read_expected(TAG_OID, "OBJECT IDENTIFIER")?.oid()?;
        let critical = match fields.read_optional(TAG_BOOLEAN)? {
            Some(flag) => flag.boolean()?,
            None => false,
        };
        let extn_value = fields
            .read_expected(TAG_OCTET_STRING, "OCTET STRING")?
            .octet_string()?
            .to_vec();
        Ok(Extension {
            extn_id,
            critical,
            extn_value,
        })
    }

    pub fn to_der(&self) -> Result<Vec<u8>, Asn1Error> {
        let mut content = writer::oid(&self.extn_id)?;
        // DEFAULT FALSE is omitted in DER
        if self.critical {
            content.extend_from_slice(&writer::boolean(true));
        }
        content.extend_from_slice(&writer::octet_string(&self.extn_value));
        Ok(writer::sequence(&content))
    }

    /// The extension value unwrapped from its inner OCTET STRING, or the raw
    /// value bytes when no such wrapper is present (nonce extensions carry a
    /// doubly-wrapped OCTET STRING)
    pub fn inner_octet_string(&self) -> Vec<u8> {
        Element::parse(&self.extn_value)
            .and_then(|el| el.octet_string().map(|b| b.to_vec()))
            .unwrap_or_else(|_| self.extn_value.clone())
    }

    /// Parses an `Extensions ::= SEQUENCE OF Extension` element
    pub fn parse_extensions(element: Element<'_>) -> Result<Vec<Extension>, Asn1Error> {
        let mut list = Vec::new();
        let mut entries = element.sequence()?;
        while !entries.is_empty() {
            list.push(Extension::from_element(entries.read()?)?);
        }
        Ok(list)
    }
}

/// Derives the digest name implied by a signature-algorithm OID from its
/// symbolic name, e.g. `sha256WithRSAEncryption` and `ecdsa-with-SHA256`
/// both map to `sha256`. Ed25519 carries no digest in its name and maps to
/// the pseudo-name `ed25519`, which ring verifies as a unit.
pub fn hash_name_for_signature_algorithm(algorithm: &Oid) -> Result<&'static str, CertificateError> {
    const CANDIDATES: &[&str] = &[
        "sha3-256", "sha3-384", "sha3-512", "sha256", "sha384", "sha512", "sha1",
    ];

    if algorithm.dotted() == oid::ID_ED25519 {
        return Ok("ed25519");
    }

    let name = algorithm.name().to_ascii_lowercase();
    for candidate in CANDIDATES.iter().copied() {
        if name.contains(candidate) {
            return Ok(candidate);
        }
    }
    Err(CertificateError::UnsupportedAlgorithm(
        algorithm.name().to_string(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oid;

    #[test]
    fn test_algorithm_identifier_round_trip() {
        let alg = AlgorithmIdentifier::with_null_params(Oid::new(oid::ID_SHA256));
        let encoded = alg.to_der().unwrap();
        let decoded = AlgorithmIdentifier::from_element(Element::parse(&encoded).unwrap()).unwrap();
        assert_eq!(decoded, alg);
    }

    #[test]
    fn test_algorithm_identifier_absent_params() {
        let alg = AlgorithmIdentifier {
            algorithm: Oid::new(oid::ECDSA_WITH_SHA256),
            parameters: None,
        };
        let encoded = alg.to_der().unwrap();
        let decoded = AlgorithmIdentifier::from_element(Element::parse(&encoded).unwrap()).unwrap();
        assert_eq!(decoded.parameters, None);
    }

    #[test]
    fn test_extension_round_trip_omits_default_critical() {
        let ext = Extension {
            extn_id: Oid::new(oid::ID_PKIX_OCSP_NONCE),
            critical: false,
            extn_value: crate::asn1::writer::octet_string(b"nonce"),
        };
        let encoded = ext.to_der().unwrap();
        // No BOOLEAN inside: OID then OCTET STRING
        let mut fields = Element::parse(&encoded).unwrap().sequence().unwrap();
        fields.read().unwrap().oid().unwrap();
        assert_eq!(
            fields.read().unwrap().tag,
            crate::asn1::reader::TAG_OCTET_STRING
        );

        let decoded = Extension::from_element(Element::parse(&encoded).unwrap()).unwrap();
        assert_eq!(decoded, ext);
        assert_eq!(decoded.inner_octet_string(), b"nonce");
    }

    #[test]
    fn test_extension_critical_round_trip() {
        let ext = Extension {
            extn_id: Oid::new("2.5.29.15"),
            critical: true,
            extn_value: vec![0x03, 0x02, 0x05, 0xA0],
        };
        let decoded =
            Extension::from_element(Element::parse(&ext.to_der().unwrap()).unwrap()).unwrap();
        assert!(decoded.critical);
    }

    #[test]
    fn test_hash_name_derivation() {
        assert_eq!(
            hash_name_for_signature_algorithm(&Oid::new(oid::SHA256_WITH_RSA_ENCRYPTION)).unwrap(),
            "sha256"
        );
        assert_eq!(
            hash_name_for_signature_algorithm(&Oid::new(oid::ECDSA_WITH_SHA256)).unwrap(),
            "sha256"
        );
        assert_eq!(
            hash_name_for_signature_algorithm(&Oid::new("1.2.840.113549.1.1.5")).unwrap(),
            "sha1"
        );
        assert_eq!(
            hash_name_for_signature_algorithm(&Oid::new("2.16.840.1.101.3.4.3.10")).unwrap(),
            "sha3-256"
        );
        assert_eq!(
            hash_name_for_signature_algorithm(&Oid::new(oid::ID_ED25519)).unwrap(),
            "ed25519"
        );
    }

    #[test]
    fn test_hash_name_unsupported() {
        // rsassa-pss names no digest; the hash lives in its parameters
        let err =
            hash_name_for_signature_algorithm(&Oid::new("1.2.840.113549.1.1.10")).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Signature algorithm rsassa-pss not implemented"
        );
    }
}
