use ring::signature::{self, UnparsedPublicKey};

use super::{AlgorithmIdentifier, CertificateError};
use crate::asn1::reader::Element;
use crate::oid;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KeyKind {
    Rsa,
    EcP256,
    EcP384,
    Ed25519,
}

/// A verifier over the subject public key of a certificate, bound to the key
/// algorithm the certificate declares.
///
/// ring expects the BIT STRING value octets for every supported key type:
/// the `RSAPublicKey` DER for RSA keys and the uncompressed point for EC keys.
#[derive(Clone, Debug)]
pub struct PublicKey {
    kind: KeyKind,
    key_bits: Vec<u8>,
}

impl PublicKey {
    pub(crate) fn from_spki_parts(
        algorithm: &AlgorithmIdentifier,
        key_bits: &[u8],
    ) -> Result<Self, CertificateError> {
        let kind = match algorithm.algorithm.dotted() {
            oid::RSA_ENCRYPTION => KeyKind::Rsa,
            oid::ID_EC_PUBLIC_KEY => {
                let parameters = algorithm.parameters.as_deref().ok_or_else(|| {
                    CertificateError::UnsupportedAlgorithm(
                        "id-ecPublicKey without named curve".to_string(),
                    )
                })?;
                let curve = Element::parse(parameters)
                    .and_then(|el| el.oid())
                    .map_err(CertificateError::from)?;
                match curve.dotted() {
                    oid::PRIME256V1 => KeyKind::EcP256,
                    oid::SECP384R1 => KeyKind::EcP384,
                    _ => {
                        return Err(CertificateError::UnsupportedAlgorithm(
                            curve.name().to_string(),
                        ))
                    }
                }
            }
            oid::ID_ED25519 => KeyKind::Ed25519,
            _ => {
                return Err(CertificateError::UnsupportedAlgorithm(
                    algorithm.name().to_string(),
                ))
            }
        };

        Ok(PublicKey {
            kind,
            key_bits: key_bits.to_vec(),
        })
    }

    pub fn kind(&self) -> KeyKind {
        self.kind
    }

    pub fn key_bits(&self) -> &[u8] {
        &self.key_bits
    }

    /// Verifies `signature_bytes` over `message` with the digest named by
    /// `hash` (`sha1`, `sha256`, `sha384`, `sha512`, or the pseudo-name
    /// `ed25519` for keys that sign without a separate digest).
    pub fn verify(
        &self,
        hash: &str,
        message: &[u8],
        signature_bytes: &[u8],
    ) -> Result<(), CertificateError> {
        let algorithm: &'static dyn signature::VerificationAlgorithm = match (self.kind, hash) {
            (KeyKind::Rsa, "sha1") => &signature::RSA_PKCS1_1024_8192_SHA1_FOR_LEGACY_USE_ONLY,
            (KeyKind::Rsa, "sha256") => &signature::RSA_PKCS1_2048_8192_SHA256,
            (KeyKind::Rsa, "sha384") => &signature::RSA_PKCS1_2048_8192_SHA384,
            (KeyKind::Rsa, "sha512") => &signature::RSA_PKCS1_2048_8192_SHA512,
            (KeyKind::EcP256, "sha256") => &signature::ECDSA_P256_SHA256_ASN1,
            (KeyKind::EcP256, "sha384") => &signature::ECDSA_P256_SHA384_ASN1,
            (KeyKind::EcP384, "sha256") => &signature::ECDSA_P384_SHA256_ASN1,
            (KeyKind::EcP384, "sha384") => &signature::ECDSA_P384_SHA384_ASN1,
            (KeyKind::Ed25519, "ed25519") => &signature::ED25519,
            (kind, hash) => {
                return Err(CertificateError::UnsupportedAlgorithm(format!(
                    "{} with {:?} key",
                    hash, kind
                )))
            }
        };

        UnparsedPublicKey::new(algorithm, &self.key_bits)
            .verify(message, signature_bytes)
            .map_err(|_| {
                CertificateError::SignatureInvalid(format!(
                    "{} signature verification failed",
                    hash
                ))
            })
    }
}
