//! Object-identifier registry: process-wide, populated once on first use,
//! immutable afterwards. Unknown OIDs pass through as dotted-decimal text.

use std::collections::HashMap;
use std::fmt;
use std::sync::OnceLock;

use crate::asn1::Asn1Error;

pub const ID_PKIX_OCSP: &str = "1.3.6.1.5.5.7.48.1";
pub const ID_PKIX_OCSP_BASIC: &str = "1.3.6.1.5.5.7.48.1.1";
pub const ID_PKIX_OCSP_NONCE: &str = "1.3.6.1.5.5.7.48.1.2";
pub const ID_AD_OCSP: &str = "1.3.6.1.5.5.7.48.1";
pub const ID_AD_CA_ISSUERS: &str = "1.3.6.1.5.5.7.48.2";
pub const ID_PE_AUTHORITY_INFO_ACCESS: &str = "1.3.6.1.5.5.7.1.1";

pub const ID_SHA1: &str = "1.3.14.3.2.26";
pub const ID_SHA256: &str = "2.16.840.1.101.3.4.2.1";
pub const ID_SHA384: &str = "2.16.840.1.101.3.4.2.2";
pub const ID_SHA512: &str = "2.16.840.1.101.3.4.2.3";

pub const RSA_ENCRYPTION: &str = "1.2.840.113549.1.1.1";
pub const ID_EC_PUBLIC_KEY: &str = "1.2.840.10045.2.1";
pub const PRIME256V1: &str = "1.2.840.10045.3.1.7";
pub const SECP384R1: &str = "1.3.132.0.34";
pub const ID_ED25519: &str = "1.3.101.112";

pub const ECDSA_WITH_SHA256: &str = "1.2.840.10045.4.3.2";
pub const SHA256_WITH_RSA_ENCRYPTION: &str = "1.2.840.113549.1.1.11";

/// Known assignments, dotted-decimal to symbolic name. Aliases share a
/// dotted value; the first entry wins for name lookups.
const OID_TABLE: &[(&str, &str)] = &[
    // PKIX / OCSP
    ("1.3.6.1.5.5.7.48.1", "id-pkix-ocsp"),
    ("1.3.6.1.5.5.7.48.1", "id-ad-ocsp"),
    ("1.3.6.1.5.5.7.48.1.1", "id-pkix-ocsp-basic"),
    ("1.3.6.1.5.5.7.48.1.2", "id-pkix-ocsp-nonce"),
    ("1.3.6.1.5.5.7.48.2", "id-ad-caIssuers"),
    ("1.3.6.1.5.5.7.1.1", "id-pe-authorityInfoAccess"),
    ("1.3.6.1.5.5.7.1.1", "id-ce-authorityInfoAccess"),
    // Digests
    ("1.3.14.3.2.26", "id-sha1"),
    ("2.16.840.1.101.3.4.2.1", "id-sha256"),
    ("2.16.840.1.101.3.4.2.2", "id-sha384"),
    ("2.16.840.1.101.3.4.2.3", "id-sha512"),
    ("2.16.840.1.101.3.4.2.8", "id-sha3-256"),
    ("2.16.840.1.101.3.4.2.9", "id-sha3-384"),
    ("2.16.840.1.101.3.4.2.10", "id-sha3-512"),
    // Key algorithms
    ("1.2.840.113549.1.1.1", "rsaEncryption"),
    ("1.2.840.10045.2.1", "id-ecPublicKey"),
    ("1.2.840.10045.3.1.7", "prime256v1"),
    ("1.3.132.0.34", "secp384r1"),
    ("1.3.132.0.35", "secp521r1"),
    ("1.3.101.112", "id-Ed25519"),
    // RSA signatures
    ("1.2.840.113549.1.1.5", "sha1WithRSAEncryption"),
    ("1.2.840.113549.1.1.11", "sha256WithRSAEncryption"),
    ("1.2.840.113549.1.1.12", "sha384WithRSAEncryption"),
    ("1.2.840.113549.1.1.13", "sha512WithRSAEncryption"),
    ("1.2.840.113549.1.1.10", "rsassa-pss"),
    ("2.16.840.1.101.3.4.3.14", "id-rsassa-pkcs1-v1_5-with-sha3-256"),
    ("2.16.840.1.101.3.4.3.15", "id-rsassa-pkcs1-v1_5-with-sha3-384"),
    ("2.16.840.1.101.3.4.3.16", "id-rsassa-pkcs1-v1_5-with-sha3-512"),
    // ECDSA signatures
    ("1.2.840.10045.4.1", "ecdsa-with-SHA1"),
    ("1.2.840.10045.4.3.2", "ecdsa-with-SHA256"),
    ("1.2.840.10045.4.3.3", "ecdsa-with-SHA384"),
    ("1.2.840.10045.4.3.4", "ecdsa-with-SHA512"),
    ("2.16.840.1.101.3.4.3.10", "id-ecdsa-with-sha3-256"),
    ("2.16.840.1.101.3.4.3.11", "id-ecdsa-with-sha3-384"),
    ("2.16.840.1.101.3.4.3.12", "id-ecdsa-with-sha3-512"),
];

struct Registry {
    names: HashMap<&'static str, &'static str>,
    dotted: HashMap<&'static str, &'static str>,
}

fn registry() -> &'static Registry {
    static REGISTRY: OnceLock<Registry> = OnceLock::new();
    REGISTRY.get_or_init(|| {
        let mut names = HashMap::new();
        let mut dotted = HashMap::new();
        for (dot, name) in OID_TABLE {
            names.entry(*dot).or_insert(*name);
            dotted.entry(*name).or_insert(*dot);
        }
        Registry { names, dotted }
    })
}

/// Symbolic name for a dotted-decimal OID, if registered
pub fn name_for(dotted: &str) -> Option<&'static str> {
    registry().names.get(dotted).copied()
}

/// Dotted-decimal value for a symbolic name, if registered
pub fn dotted_for(name: &str) -> Option<&'static str> {
    registry().dotted.get(name).copied()
}

/// An OBJECT IDENTIFIER held in dotted-decimal form
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Oid(String);

impl Oid {
    pub fn new(dotted: impl Into<String>) -> Self {
        Oid(dotted.into())
    }

    /// Looks a symbolic name up in the registry
    pub fn from_name(name: &str) -> Option<Self> {
        dotted_for(name).map(Oid::new)
    }

    pub fn dotted(&self) -> &str {
        &self.0
    }

    /// Registered symbolic name, or the dotted form for unknown OIDs
    pub fn name(&self) -> &str {
        name_for(&self.0).unwrap_or(&self.0)
    }

    /// Decodes the content octets of a DER OBJECT IDENTIFIER
    pub fn from_der_content(content: &[u8]) -> Result<Self, Asn1Error> {
        if content.is_empty() {
            return Err(Asn1Error::Truncated("empty OBJECT IDENTIFIER".to_string()));
        }

        let mut arcs: Vec<u64> = Vec::new();
        let mut value: u64 = 0;
        let mut in_subidentifier = false;
        for byte in content {
            if value > u64::MAX >> 7 {
                return Err(Asn1Error::IntegerOverflow(
                    "OBJECT IDENTIFIER arc exceeds u64".to_string(),
                ));
            }
            value = (value << 7) | (byte & 0x7F) as u64;
            in_subidentifier = byte & 0x80 != 0;
            if !in_subidentifier {
                if arcs.is_empty() {
                    // First subidentifier folds the first two arcs together
                    let (first, second) = match value {
                        v if v < 40 => (0, v),
                        v if v < 80 => (1, v - 40),
                        v => (2, v - 80),
                    };
                    arcs.push(first);
                    arcs.push(second);
                } else {
                    arcs.push(value);
                }
                value = 0;
            }
        }
        if in_subidentifier {
            return Err(Asn1Error::Truncated(
                "OBJECT IDENTIFIER ends mid-subidentifier".to_string(),
            ));
        }

        let dotted = arcs
            .iter()
            .map(|a| a.to_string())
            .collect::<Vec<_>>()
            .join(".");
        Ok(Oid(dotted))
    }

    /// Encodes to the content octets of a DER OBJECT IDENTIFIER
    pub fn to_der_content(&self) -> Result<Vec<u8>, Asn1Error> {
        let arcs: Vec<u64> = self
            .0
            .split('.')
            .map(|part| {
                part.parse::<u64>().map_err(|_| {
                    Asn1Error::Utf8Invalid(format!("invalid OID string \"{}\"", self.0))
                })
            })
            .collect::<Result<_, _>>()?;

        if arcs.len() < 2 || arcs[0] > 2 || (arcs[0] < 2 && arcs[1] > 39) {
            return Err(Asn1Error::Utf8Invalid(format!(
                "invalid OID string \"{}\"",
                self.0
            )));
        }

        let mut out = Vec::new();
        let mut write_subidentifier = |mut value: u64| {
            let mut chunk = [0u8; 10];
            let mut i = chunk.len();
            loop {
                i -= 1;
                chunk[i] = (value & 0x7F) as u8;
                value >>= 7;
                if value == 0 {
                    break;
                }
            }
            let last = chunk.len() - 1;
            for (pos, byte) in chunk[i..].iter().enumerate() {
                let continues = i + pos < last;
                out.push(if continues { byte | 0x80 } else { *byte });
            }
        };

        write_subidentifier(arcs[0] * 40 + arcs[1]);
        for arc in &arcs[2..] {
            write_subidentifier(*arc);
        }
        Ok(out)
    }
}

impl fmt::Display for Oid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
