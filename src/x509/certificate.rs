use std::path::Path;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::{DateTime, Utc};
use num_bigint::BigUint;

use super::{AlgorithmIdentifier, CertificateError, Extension, PublicKey};
use crate::asn1::reader::{
    context, context_constructed, Element, TAG_INTEGER, TAG_OID, TAG_SEQUENCE,
};
use crate::asn1::Asn1Error;
use crate::oid::{self, Oid};

/// One Authority Information Access entry with a URI location
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AccessDescription {
    pub access_method: Oid,
    pub access_location_uri: String,
}

/// A parsed X.509 certificate.
///
/// Exposes the fields OCSP needs: serial number, the re-encoded subject and
/// issuer names, the subject public key, the AIA extension entries and a
/// verifier over the embedded public key. Name DER is this library's
/// canonical re-encoding of the decoded structure, not the wire subslice, so
/// hashes over it converge regardless of the source certificate's encoder.
#[derive(Clone, Debug)]
pub struct Certificate {
    raw: Vec<u8>,
    tbs_raw: Vec<u8>,
    serial: BigUint,
    serial_raw: Vec<u8>,
    issuer_name_der: Vec<u8>,
    subject_name_der: Vec<u8>,
    not_before: DateTime<Utc>,
    not_after: DateTime<Utc>,
    spki_der: Vec<u8>,
    key_algorithm: AlgorithmIdentifier,
    public_key_bits: Vec<u8>,
    signature_algorithm: AlgorithmIdentifier,
    signature: Vec<u8>,
    extensions: Vec<Extension>,
    aia: Vec<AccessDescription>,
}

impl Certificate {
    /// Loads a certificate from a file containing DER, PEM or bare base64.
    ///
    /// # Errors
    ///
    /// `NotReadable` if the file is absent or unreadable, `ParseFailed` on
    /// any decode error.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, CertificateError> {
        let bytes = std::fs::read(path.as_ref())
            .map_err(|e| CertificateError::NotReadable(format!("{}: {}", path.as_ref().display(), e)))?;
        Self::from_bytes(&bytes)
    }

    /// Parses a certificate from raw DER, PEM with
    /// `-----BEGIN CERTIFICATE-----` framing, or a bare base64 body.
    pub fn from_bytes(input: &[u8]) -> Result<Self, CertificateError> {
        let der = decode_input(input)?;
        Self::parse_der(der)
    }

    fn parse_der(der: Vec<u8>) -> Result<Self, CertificateError> {
        let root = Element::parse(&der)?;
        let mut certificate = root.sequence()?;

        let tbs_element = certificate.read_expected(TAG_SEQUENCE, "SEQUENCE")?;
        let tbs_raw = tbs_element.raw.to_vec();
        let mut tbs = tbs_element.sequence()?;

        // version [0] EXPLICIT INTEGER DEFAULT v1
        if let Some(version) = tbs.read_optional(context_constructed(0))? {
            version.explicit_inner()?.uint()?;
        }

        let serial_element = tbs.read_expected(TAG_INTEGER, "INTEGER")?;
        let serial_raw = serial_element.integer_bytes()?.to_vec();
        // Tolerate the negative serials some legacy CAs emitted by taking
        // the content octets as an unsigned magnitude.
        let serial = BigUint::from_bytes_be(&serial_raw);

        // signature AlgorithmIdentifier inside the TBS; the outer one is
        // authoritative for verification
        AlgorithmIdentifier::from_element(tbs.read()?)?;

        let issuer_name_der = tbs.read_expected(TAG_SEQUENCE, "Name")?.reencode_der()?;

        let mut validity = tbs.read_expected(TAG_SEQUENCE, "Validity")?.sequence()?;
        let not_before = validity.read()?.time()?;
        let not_after = validity.read()?.time()?;

        let subject_name_der = tbs.read_expected(TAG_SEQUENCE, "Name")?.reencode_der()?;

        let spki_element = tbs.read_expected(TAG_SEQUENCE, "SubjectPublicKeyInfo")?;
        let spki_der = spki_element.raw.to_vec();
        let mut spki = spki_element.sequence()?;
        let key_algorithm = AlgorithmIdentifier::from_element(spki.read()?)?;
        let (_, key_bits) = spki.read()?.bit_string()?;
        let public_key_bits = key_bits.to_vec();

        // issuerUniqueID [1] / subjectUniqueID [2] are skipped; extensions
        // arrive under the EXPLICIT [3] wrapper
        let mut extensions = Vec::new();
        while !tbs.is_empty() {
            let element = tbs.read()?;
            if element.tag == context_constructed(3) {
                extensions = Extension::parse_extensions(element.explicit_inner()?)?;
            }
        }

        let mut aia = Vec::new();
        for extension in &extensions {
            if extension.extn_id.dotted() == oid::ID_PE_AUTHORITY_INFO_ACCESS {
                aia = parse_access_descriptions(&extension.extn_value)?;
            }
        }

        let signature_algorithm = AlgorithmIdentifier::from_element(certificate.read()?)?;
        let (_, signature_bits) = certificate.read()?.bit_string()?;
        let signature = signature_bits.to_vec();

        Ok(Certificate {
            raw: der,
            tbs_raw,
            serial,
            serial_raw,
            issuer_name_der,
            subject_name_der,
            not_before,
            not_after,
            spki_der,
            key_algorithm,
            public_key_bits,
            signature_algorithm,
            signature,
            extensions,
            aia,
        })
    }

    pub fn serial_number(&self) -> &BigUint {
        &self.serial
    }

    pub(crate) fn serial_raw(&self) -> &[u8] {
        &self.serial_raw
    }

    /// Canonical DER re-encoding of the subject Name
    pub fn subject_name_der(&self) -> &[u8] {
        &self.subject_name_der
    }

    /// Canonical DER re-encoding of the issuer Name
    pub fn issuer_name_der(&self) -> &[u8] {
        &self.issuer_name_der
    }

    /// Subject public key content with the BIT STRING unused-bits octet
    /// stripped
    pub fn subject_public_key_bits(&self) -> &[u8] {
        &self.public_key_bits
    }

    /// The SubjectPublicKeyInfo structure as it appeared on the wire
    pub fn subject_public_key_info_der(&self) -> &[u8] {
        &self.spki_der
    }

    /// A verifier bound to the algorithm the certificate declares for its key
    pub fn signature_public_key(&self) -> Result<PublicKey, CertificateError> {
        PublicKey::from_spki_parts(&self.key_algorithm, &self.public_key_bits)
    }

    pub fn signature_algorithm(&self) -> &AlgorithmIdentifier {
        &self.signature_algorithm
    }

    pub fn signature(&self) -> &[u8] {
        &self.signature
    }

    pub fn extensions(&self) -> &[Extension] {
        &self.extensions
    }

    /// Authority Information Access entries carrying a URI, in certificate
    /// order; empty when the extension is absent
    pub fn aia_entries(&self) -> &[AccessDescription] {
        &self.aia
    }

    /// URI of the first `id-ad-caIssuers` AIA entry, or empty
    pub fn issuer_certificate_url(&self) -> String {
        self.first_aia_uri(oid::ID_AD_CA_ISSUERS)
    }

    /// URI of the first `id-ad-ocsp` AIA entry, or empty
    pub fn ocsp_responder_url(&self) -> String {
        self.first_aia_uri(oid::ID_AD_OCSP)
    }

    fn first_aia_uri(&self, method: &str) -> String {
        self.aia
            .iter()
            .find(|entry| entry.access_method.dotted() == method)
            .map(|entry| entry.access_location_uri.clone())
            .unwrap_or_default()
    }

    pub fn not_before(&self) -> DateTime<Utc> {
        self.not_before
    }

    pub fn not_after(&self) -> DateTime<Utc> {
        self.not_after
    }

    pub fn raw_der(&self) -> &[u8] {
        &self.raw
    }

    pub fn tbs_der(&self) -> &[u8] {
        &self.tbs_raw
    }

    /// Verifies this certificate's own signature against the issuer's key
    pub fn verify_signed_by(&self, issuer: &Certificate) -> Result<(), CertificateError> {
        let hash = super::hash_name_for_signature_algorithm(&self.signature_algorithm.algorithm)?;
        issuer
            .signature_public_key()?
            .verify(hash, &self.tbs_raw, &self.signature)
    }
}

fn decode_input(input: &[u8]) -> Result<Vec<u8>, CertificateError> {
    // Raw DER leads with the Certificate SEQUENCE tag
    if input.first() == Some(&0x30) {
        return Ok(input.to_vec());
    }

    let text = std::str::from_utf8(input)
        .map_err(|_| CertificateError::ParseFailed("input is neither DER nor text".to_string()))?;
    let trimmed = text.trim();

    if trimmed.starts_with("-----BEGIN") {
        let mut buf = vec![0u8; trimmed.len()];
        let (_, der) = pem_rfc7468::decode(trimmed.as_bytes(), &mut buf)
            .map_err(|e| CertificateError::ParseFailed(format!("PEM: {}", e)))?;
        return Ok(der.to_vec());
    }

    let compact: String = trimmed.split_whitespace().collect();
    STANDARD
        .decode(compact.as_bytes())
        .map_err(|e| CertificateError::ParseFailed(format!("base64: {}", e)))
}

fn parse_access_descriptions(extn_value: &[u8]) -> Result<Vec<AccessDescription>, Asn1Error> {
    let mut list = Vec::new();
    let mut entries = Element::parse(extn_value)?.sequence()?;
    while !entries.is_empty() {
        let mut fields = entries.read()?.sequence()?;
        let access_method = fields.read_expected(TAG_OID, "OBJECT IDENTIFIER")?.oid()?;
        let location = fields.read()?;
        // Only uniformResourceIdentifier [6] locations are surfaced
        if location.tag == context(6) {
            let uri = std::str::from_utf8(location.content)
                .map_err(|e| Asn1Error::Utf8Invalid(e.to_string()))?;
            list.push(AccessDescription {
                access_method,
                access_location_uri: uri.to_string(),
            });
        }
    }
    Ok(list)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asn1::writer;
    use chrono::TimeZone;

    const OID_COMMON_NAME: &str = "2.5.4.3";

    fn name(common_name: &str) -> Vec<u8> {
        let attribute = writer::sequence(
            &[
                writer::oid(&Oid::new(OID_COMMON_NAME)).unwrap(),
                writer::utf8_string(common_name),
            ]
            .concat(),
        );
        writer::sequence(&writer::set_of(vec![attribute]))
    }

    fn aia_extension() -> Vec<u8> {
        let ocsp_entry = writer::sequence(
            &[
                writer::oid(&Oid::new(oid::ID_AD_OCSP)).unwrap(),
                writer::tlv(context(6), b"http://ocsp.example.test"),
            ]
            .concat(),
        );
        let ca_issuers_entry = writer::sequence(
            &[
                writer::oid(&Oid::new(oid::ID_AD_CA_ISSUERS)).unwrap(),
                writer::tlv(context(6), b"http://cert.example.test/ca.der"),
            ]
            .concat(),
        );
        let value = writer::sequence(&[ocsp_entry, ca_issuers_entry].concat());

        writer::sequence(
            &[
                writer::oid(&Oid::new(oid::ID_PE_AUTHORITY_INFO_ACCESS)).unwrap(),
                writer::octet_string(&value),
            ]
            .concat(),
        )
    }

    /// A syntactically complete certificate with a throwaway signature;
    /// parsing does not verify.
    fn test_certificate_der() -> Vec<u8> {
        let spki = {
            let algorithm = writer::sequence(
                &[
                    writer::oid(&Oid::new(oid::ID_EC_PUBLIC_KEY)).unwrap(),
                    writer::oid(&Oid::new(oid::PRIME256V1)).unwrap(),
                ]
                .concat(),
            );
            let mut point = vec![0x04];
            point.extend_from_slice(&[0x11; 64]);
            writer::sequence(&[algorithm, writer::bit_string(0, &point)].concat())
        };

        let sig_alg = writer::sequence(&writer::oid(&Oid::new(oid::ECDSA_WITH_SHA256)).unwrap());
        let validity = writer::sequence(
            &[
                writer::generalized_time(&Utc.with_ymd_and_hms(2021, 1, 1, 0, 0, 0).unwrap()),
                writer::generalized_time(&Utc.with_ymd_and_hms(2031, 1, 1, 0, 0, 0).unwrap()),
            ]
            .concat(),
        );

        let tbs = writer::sequence(
            &[
                writer::explicit(0, &writer::uint(2)),
                writer::uint(500),
                sig_alg.clone(),
                name("Example Issuing CA"),
                validity,
                name("leaf.example.test"),
                spki,
                writer::explicit(3, &writer::sequence(&aia_extension())),
            ]
            .concat(),
        );

        writer::sequence(&[tbs, sig_alg, writer::bit_string(0, &[0x22; 70])].concat())
    }

    #[test]
    fn test_parse_der_fields() {
        let cert = Certificate::from_bytes(&test_certificate_der()).unwrap();
        assert_eq!(cert.serial_number(), &BigUint::from(500u32));
        assert_eq!(cert.subject_public_key_bits().len(), 65);
        assert_eq!(cert.subject_public_key_bits()[0], 0x04);
        assert_eq!(
            cert.not_before(),
            Utc.with_ymd_and_hms(2021, 1, 1, 0, 0, 0).unwrap()
        );
        assert_eq!(cert.signature_algorithm().name(), "ecdsa-with-SHA256");
    }

    #[test]
    fn test_subject_name_reencoded() {
        let cert = Certificate::from_bytes(&test_certificate_der()).unwrap();
        assert_eq!(cert.subject_name_der(), name("leaf.example.test"));
        assert_eq!(cert.issuer_name_der(), name("Example Issuing CA"));
    }

    #[test]
    fn test_aia_urls() {
        let cert = Certificate::from_bytes(&test_certificate_der()).unwrap();
        assert_eq!(cert.aia_entries().len(), 2);
        assert_eq!(cert.ocsp_responder_url(), "http://ocsp.example.test");
        assert_eq!(
            cert.issuer_certificate_url(),
            "http://cert.example.test/ca.der"
        );
    }

    #[test]
    fn test_aia_absent_yields_empty() {
        // Rebuild without the extensions wrapper
        let der = test_certificate_der();
        let cert = Certificate::from_bytes(&der).unwrap();
        assert!(!cert.aia_entries().is_empty());

        let stripped = {
            let root = Element::parse(&der).unwrap();
            let mut fields = root.sequence().unwrap();
            let tbs = fields.read().unwrap();
            let mut tbs_fields = tbs.sequence().unwrap();
            let mut rebuilt = Vec::new();
            while !tbs_fields.is_empty() {
                let element = tbs_fields.read().unwrap();
                if element.tag != context_constructed(3) {
                    rebuilt.extend_from_slice(element.raw);
                }
            }
            let sig_alg = fields.read().unwrap().raw.to_vec();
            let signature = fields.read().unwrap().raw.to_vec();
            writer::sequence(&[writer::sequence(&rebuilt), sig_alg, signature].concat())
        };
        let cert = Certificate::from_bytes(&stripped).unwrap();
        assert!(cert.aia_entries().is_empty());
        assert_eq!(cert.ocsp_responder_url(), "");
        assert_eq!(cert.issuer_certificate_url(), "");
    }

    #[test]
    fn test_pem_input() {
        let der = test_certificate_der();
        let body = STANDARD.encode(&der);
        let lines: Vec<String> = body
            .as_bytes()
            .chunks(64)
            .map(|chunk| String::from_utf8(chunk.to_vec()).unwrap())
            .collect();
        let pem = format!(
            "-----BEGIN CERTIFICATE-----\n{}\n-----END CERTIFICATE-----\n",
            lines.join("\n")
        );

        let cert = Certificate::from_bytes(pem.as_bytes()).unwrap();
        assert_eq!(cert.raw_der(), der.as_slice());
    }

    #[test]
    fn test_bare_base64_input() {
        let der = test_certificate_der();
        let body = STANDARD.encode(&der);
        let cert = Certificate::from_bytes(body.as_bytes()).unwrap();
        assert_eq!(cert.raw_der(), der.as_slice());
    }

    #[test]
    fn test_garbage_input_fails() {
        assert!(matches!(
            Certificate::from_bytes(b"not a certificate"),
            Err(CertificateError::ParseFailed(_))
        ));
        assert!(matches!(
            Certificate::from_bytes(&[0x30, 0x03, 0x02, 0x01]),
            Err(CertificateError::ParseFailed(_))
        ));
    }

    #[test]
    fn test_missing_file_not_readable() {
        assert!(matches!(
            Certificate::from_file("/nonexistent/path/cert.der"),
            Err(CertificateError::NotReadable(_))
        ));
    }
}
