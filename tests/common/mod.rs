//! In-process fixtures: a P-256 certificate authority and OCSP responses
//! assembled from DER primitives and signed with the authority key.

use chrono::{DateTime, TimeZone, Utc};
use ring::rand::SystemRandom;
use ring::signature::{EcdsaKeyPair, KeyPair, ECDSA_P256_SHA256_ASN1_SIGNING};

use ocsp_client::asn1::reader::context;
use ocsp_client::asn1::writer;
use ocsp_client::cert_id::{CertId, HashAlgorithm};
use ocsp_client::oid::{self, Oid};
use ocsp_client::x509::Certificate;

pub const OCSP_URL: &str = "http://ocsp.example.test";
pub const CA_ISSUERS_URL: &str = "http://cert.example.test/ca.der";
pub const NONCE: [u8; 8] = [0x47, 0xFF, 0xAF, 0xC9, 0x18, 0x11, 0x77, 0x0E];
pub const LEAF_SERIAL: u64 = 0x0A1B2C3D4E5F;

pub fn produced_at() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2021, 9, 17, 18, 25, 24).unwrap()
}

pub fn revocation_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2021, 6, 1, 12, 0, 0).unwrap()
}

pub enum FixtureStatus {
    Good,
    Revoked { reason: Option<u64> },
    Unknown,
}

/// Knobs for deliberately malformed fixtures
pub struct ResponseOptions {
    pub status: FixtureStatus,
    pub nonce: Option<Vec<u8>>,
    pub response_count: usize,
    pub include_certs: bool,
    pub next_update: Option<DateTime<Utc>>,
    pub response_type: String,
    pub tamper_signature: bool,
}

impl Default for ResponseOptions {
    fn default() -> Self {
        ResponseOptions {
            status: FixtureStatus::Good,
            nonce: Some(NONCE.to_vec()),
            response_count: 1,
            include_certs: true,
            next_update: None,
            response_type: oid::ID_PKIX_OCSP_BASIC.to_string(),
            tamper_signature: false,
        }
    }
}

pub struct TestAuthority {
    key: EcdsaKeyPair,
    rng: SystemRandom,
    pub ca_cert_der: Vec<u8>,
    pub leaf_cert_der: Vec<u8>,
}

pub fn authority() -> TestAuthority {
    let rng = SystemRandom::new();
    let pkcs8 = EcdsaKeyPair::generate_pkcs8(&ECDSA_P256_SHA256_ASN1_SIGNING, &rng)
        .expect("Expect key generation");
    let key = EcdsaKeyPair::from_pkcs8(&ECDSA_P256_SHA256_ASN1_SIGNING, pkcs8.as_ref(), &rng)
        .expect("Expect key pair");

    // Both certificates carry the CA public key; the leaf exists to be the
    // subject of status checks, so sharing the key keeps the fixture small.
    let public_point = key.public_key().as_ref().to_vec();
    let ca_cert_der = build_certificate(
        &public_point,
        "OCSP Test Root",
        "OCSP Test Root",
        1,
        None,
        &key,
        &rng,
    );
    let leaf_cert_der = build_certificate(
        &public_point,
        "leaf.example.test",
        "OCSP Test Root",
        LEAF_SERIAL,
        Some((OCSP_URL, CA_ISSUERS_URL)),
        &key,
        &rng,
    );

    TestAuthority {
        key,
        rng,
        ca_cert_der,
        leaf_cert_der,
    }
}

impl TestAuthority {
    pub fn ca(&self) -> Certificate {
        Certificate::from_bytes(&self.ca_cert_der).expect("Expect CA certificate")
    }

    pub fn leaf(&self) -> Certificate {
        Certificate::from_bytes(&self.leaf_cert_der).expect("Expect leaf certificate")
    }

    pub fn cert_id(&self, algorithm: HashAlgorithm) -> CertId {
        CertId::generate(&self.leaf(), &self.ca(), algorithm).expect("Expect CertID")
    }

    pub fn sign(&self, message: &[u8]) -> Vec<u8> {
        self.key
            .sign(&self.rng, message)
            .expect("Expect signature")
            .as_ref()
            .to_vec()
    }

    /// A complete DER `OCSPResponse` with status `successful`
    pub fn build_response(&self, options: ResponseOptions) -> Vec<u8> {
        let cert_id_der = self
            .cert_id(HashAlgorithm::Sha256)
            .to_der()
            .expect("Expect CertID DER");

        let status_der = match &options.status {
            FixtureStatus::Good => writer::tlv(0x80, &[]),
            FixtureStatus::Revoked { reason } => {
                let mut revoked = writer::generalized_time(&revocation_time());
                if let Some(code) = reason {
                    revoked.extend_from_slice(&writer::explicit(0, &writer::enumerated(*code)));
                }
                writer::tlv(0xA1, &revoked)
            }
            FixtureStatus::Unknown => writer::tlv(0x82, &[]),
        };

        let mut single = cert_id_der;
        single.extend_from_slice(&status_der);
        single.extend_from_slice(&writer::generalized_time(&produced_at()));
        if let Some(next_update) = &options.next_update {
            single.extend_from_slice(&writer::explicit(
                0,
                &writer::generalized_time(next_update),
            ));
        }
        let single = writer::sequence(&single);

        let mut responses = Vec::new();
        for _ in 0..options.response_count {
            responses.extend_from_slice(&single);
        }

        let mut tbs_content = writer::explicit(1, &subject_name("OCSP Test Root"));
        tbs_content.extend_from_slice(&writer::generalized_time(&produced_at()));
        tbs_content.extend_from_slice(&writer::sequence(&responses));
        if let Some(nonce) = &options.nonce {
            let extension = writer::sequence(
                &[
                    writer::oid(&Oid::new(oid::ID_PKIX_OCSP_NONCE)).unwrap(),
                    writer::octet_string(&writer::octet_string(nonce)),
                ]
                .concat(),
            );
            tbs_content.extend_from_slice(&writer::explicit(1, &writer::sequence(&extension)));
        }
        let tbs_response_data = writer::sequence(&tbs_content);

        let signed_bytes = if options.tamper_signature {
            let mut altered = tbs_response_data.clone();
            altered.push(0x00);
            altered
        } else {
            tbs_response_data.clone()
        };
        let signature = self.sign(&signed_bytes);

        let mut basic = tbs_response_data;
        basic.extend_from_slice(&writer::sequence(
            &writer::oid(&Oid::new(oid::ECDSA_WITH_SHA256)).unwrap(),
        ));
        basic.extend_from_slice(&writer::bit_string(0, &signature));
        if options.include_certs {
            basic.extend_from_slice(&writer::explicit(
                0,
                &writer::sequence(&self.ca_cert_der),
            ));
        }
        let basic = writer::sequence(&basic);

        let response_bytes = writer::sequence(
            &[
                writer::oid(&Oid::new(options.response_type.as_str())).unwrap(),
                writer::octet_string(&basic),
            ]
            .concat(),
        );

        let mut response = writer::enumerated(0);
        response.extend_from_slice(&writer::explicit(0, &response_bytes));
        writer::sequence(&response)
    }
}

/// A DER `OCSPResponse` carrying only a non-successful status
pub fn error_response(status_code: u64) -> Vec<u8> {
    writer::sequence(&writer::enumerated(status_code))
}

fn subject_name(common_name: &str) -> Vec<u8> {
    let attribute = writer::sequence(
        &[
            writer::oid(&Oid::new("2.5.4.3")).unwrap(),
            writer::utf8_string(common_name),
        ]
        .concat(),
    );
    writer::sequence(&writer::set_of(vec![attribute]))
}

fn build_certificate(
    public_point: &[u8],
    subject_cn: &str,
    issuer_cn: &str,
    serial: u64,
    aia: Option<(&str, &str)>,
    signer: &EcdsaKeyPair,
    rng: &SystemRandom,
) -> Vec<u8> {
    let signature_algorithm =
        writer::sequence(&writer::oid(&Oid::new(oid::ECDSA_WITH_SHA256)).unwrap());

    let spki = {
        let algorithm = writer::sequence(
            &[
                writer::oid(&Oid::new(oid::ID_EC_PUBLIC_KEY)).unwrap(),
                writer::oid(&Oid::new(oid::PRIME256V1)).unwrap(),
            ]
            .concat(),
        );
        writer::sequence(&[algorithm, writer::bit_string(0, public_point)].concat())
    };

    let validity = writer::sequence(
        &[
            writer::generalized_time(&Utc.with_ymd_and_hms(2021, 1, 1, 0, 0, 0).unwrap()),
            writer::generalized_time(&Utc.with_ymd_and_hms(2031, 1, 1, 0, 0, 0).unwrap()),
        ]
        .concat(),
    );

    let mut tbs_content = writer::explicit(0, &writer::uint(2));
    tbs_content.extend_from_slice(&writer::uint(serial));
    tbs_content.extend_from_slice(&signature_algorithm);
    tbs_content.extend_from_slice(&subject_name(issuer_cn));
    tbs_content.extend_from_slice(&validity);
    tbs_content.extend_from_slice(&subject_name(subject_cn));
    tbs_content.extend_from_slice(&spki);

    if let Some((ocsp_url, ca_issuers_url)) = aia {
        let ocsp_entry = writer::sequence(
            &[
                writer::oid(&Oid::new(oid::ID_AD_OCSP)).unwrap(),
                writer::tlv(context(6), ocsp_url.as_bytes()),
            ]
            .concat(),
        );
        let ca_issuers_entry = writer::sequence(
            &[
                writer::oid(&Oid::new(oid::ID_AD_CA_ISSUERS)).unwrap(),
                writer::tlv(context(6), ca_issuers_url.as_bytes()),
            ]
            .concat(),
        );
        let aia_value = writer::sequence(&[ocsp_entry, ca_issuers_entry].concat());
        let extension = writer::sequence(
            &[
                writer::oid(&Oid::new(oid::ID_PE_AUTHORITY_INFO_ACCESS)).unwrap(),
                writer::octet_string(&aia_value),
            ]
            .concat(),
        );
        tbs_content.extend_from_slice(&writer::explicit(3, &writer::sequence(&extension)));
    }

    let tbs = writer::sequence(&tbs_content);
    let signature = signer
        .sign(rng, &tbs)
        .expect("Expect certificate signature");

    writer::sequence(
        &[
            tbs,
            signature_algorithm,
            writer::bit_string(0, signature.as_ref()),
        ]
        .concat(),
    )
}
