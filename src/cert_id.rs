//! CertID construction per RFC 6960 §4.1.1: the 4-tuple identifying a
//! certificate within an OCSP exchange.

use num_bigint::BigUint;
use ring::digest;

use crate::asn1::reader::{Element, TAG_INTEGER, TAG_OCTET_STRING};
use crate::asn1::{writer, Asn1Error};
use crate::oid::{self, Oid};
use crate::x509::{AlgorithmIdentifier, Certificate, CertificateError};

/// Digest used for the issuer-name and issuer-key hashes
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum HashAlgorithm {
    Sha1,
    #[default]
    Sha256,
    Sha384,
    Sha512,
}

impl HashAlgorithm {
    fn digest_algorithm(&self) -> &'static digest::Algorithm {
        match self {
            HashAlgorithm::Sha1 => &digest::SHA1_FOR_LEGACY_USE_ONLY,
            HashAlgorithm::Sha256 => &digest::SHA256,
            HashAlgorithm::Sha384 => &digest::SHA384,
            HashAlgorithm::Sha512 => &digest::SHA512,
        }
    }

    pub fn oid(&self) -> Oid {
        Oid::new(match self {
            HashAlgorithm::Sha1 => oid::ID_SHA1,
            HashAlgorithm::Sha256 => oid::ID_SHA256,
            HashAlgorithm::Sha384 => oid::ID_SHA384,
            HashAlgorithm::Sha512 => oid::ID_SHA512,
        })
    }
}

/// `CertID ::= SEQUENCE { hashAlgorithm, issuerNameHash, issuerKeyHash,
/// serialNumber }`
///
/// Two values are equal iff the hash-algorithm OID, both hashes and the
/// serial number all match; the serial is compared numerically.
#[derive(Clone, Debug)]
pub struct CertId {
    pub hash_algorithm: AlgorithmIdentifier,
    pub issuer_name_hash: Vec<u8>,
    pub issuer_key_hash: Vec<u8>,
    pub serial_number: BigUint,
}

impl PartialEq for CertId {
    fn eq(&self, other: &Self) -> bool {
        self.hash_algorithm.algorithm == other.hash_algorithm.algorithm
            && self.issuer_name_hash == other.issuer_name_hash
            && self.issuer_key_hash == other.issuer_key_hash
            && self.serial_number == other.serial_number
    }
}

impl Eq for CertId {}

impl CertId {
    /// Builds the CertID for `subject`, issued by `issuer`.
    ///
    /// The issuer-name hash is computed over this library's canonical DER
    /// re-encoding of the issuer's subject Name; the key hash over the
    /// subject-public-key content with the unused-bits octet stripped.
    pub fn generate(
        subject: &Certificate,
        issuer: &Certificate,
        algorithm: HashAlgorithm,
    ) -> Result<CertId, CertificateError> {
        if subject.serial_raw().is_empty() {
            return Err(CertificateError::MissingSerial);
        }
        let serial_number = subject.serial_number().clone();

        let issuer_name = issuer.subject_name_der();
        if Element::parse(issuer_name)?.content.is_empty() {
            return Err(CertificateError::MissingIssuerName);
        }
        let issuer_name_hash = digest::digest(algorithm.digest_algorithm(), issuer_name)
            .as_ref()
            .to_vec();

        let issuer_key = issuer.subject_public_key_bits();
        if issuer_key.is_empty() {
            return Err(CertificateError::MissingIssuerKey);
        }
        let issuer_key_hash = digest::digest(algorithm.digest_algorithm(), issuer_key)
            .as_ref()
            .to_vec();

        Ok(CertId {
            hash_algorithm: AlgorithmIdentifier::with_null_params(algorithm.oid()),
            issuer_name_hash,
            issuer_key_hash,
            serial_number,
        })
    }

    pub fn to_der(&self) -> Result<Vec<u8>, Asn1Error> {
        let mut content = self.hash_algorithm.to_der()?;
        content.extend_from_slice(&writer::octet_string(&self.issuer_name_hash));
        content.extend_from_slice(&writer::octet_string(&self.issuer_key_hash));
        content.extend_from_slice(&writer::big_uint(&self.serial_number));
        Ok(writer::sequence(&content))
    }

    pub fn from_element(element: Element<'_>) -> Result<CertId, Asn1Error> {
        let mut fields = element.sequence()?;
        let hash_algorithm = AlgorithmIdentifier::from_element(fields.read()?)?;
        let issuer_name_hash = fields
            .read_expected(TAG_OCTET_STRING, "OCTET STRING")?
            .octet_string()?
            .to_vec();
        let issuer_key_hash = fields
            .read_expected(TAG_OCTET_STRING, "OCTET STRING")?
            .octet_string()?
            .to_vec();
        let serial_number = fields
            .read_expected(TAG_INTEGER, "INTEGER")?
            .big_uint()?;
        Ok(CertId {
            hash_algorithm,
            issuer_name_hash,
            issuer_key_hash,
            serial_number,
        })
    }
}
