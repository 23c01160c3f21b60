//! OCSP response decoding and validation per RFC 6960 §4.2.
//!
//! Decoding runs in two passes: the outer `OCSPResponse` envelope first, then
//! the `BasicOCSPResponse` carried inside the `responseBytes` OCTET STRING.
//! The byte span of `tbsResponseData` is preserved exactly as received, since
//! the responder's signature covers those bytes and not a re-encoding.

use chrono::{DateTime, Utc};

use crate::asn1::reader::{
    context_constructed, Element, Reader, TAG_OCTET_STRING, TAG_OID, TAG_SEQUENCE,
};
use crate::cert_id::CertId;
use crate::oid::{self, Oid};
use crate::x509::{
    hash_name_for_signature_algorithm, AlgorithmIdentifier, Certificate, CertificateError,
    Extension,
};

#[derive(thiserror::Error, Debug)]
pub enum OcspError {
    #[error("ResponseDecodeError: [{0}]")]
    ResponseDecodeError(String),

    #[error("VerifyFailed: [{0}]")]
    VerifyFailed(String),

    #[error("UnexpectedValue: [{0}]")]
    UnexpectedValue(String),

    #[error("CertificateError: [{0}]")]
    CertificateError(#[from] CertificateError),
}

const COULD_NOT_DECODE_RESPONSE: &str = "Could not decode OCSP response";
const COULD_NOT_DECODE_RESPONSE_BYTES: &str =
    "Could not decode OcspResponse->responseBytes->response";

/// `OCSPResponseStatus` values; 4 and everything from 7 up are reserved
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OcspResponseStatus {
    Successful,
    MalformedRequest,
    InternalError,
    TryLater,
    SigRequired,
    Unauthorized,
}

impl OcspResponseStatus {
    fn from_code(code: u64) -> Option<Self> {
        match code {
            0 => Some(OcspResponseStatus::Successful),
            1 => Some(OcspResponseStatus::MalformedRequest),
            2 => Some(OcspResponseStatus::InternalError),
            3 => Some(OcspResponseStatus::TryLater),
            5 => Some(OcspResponseStatus::SigRequired),
            6 => Some(OcspResponseStatus::Unauthorized),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            OcspResponseStatus::Successful => "successful",
            OcspResponseStatus::MalformedRequest => "malformedRequest",
            OcspResponseStatus::InternalError => "internalError",
            OcspResponseStatus::TryLater => "tryLater",
            OcspResponseStatus::SigRequired => "sigRequired",
            OcspResponseStatus::Unauthorized => "unauthorized",
        }
    }
}

/// RFC 5280 CRL reason codes; values outside the assigned table surface as
/// the raw integer
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RevocationReason {
    Unspecified,
    KeyCompromise,
    CaCompromise,
    AffiliationChanged,
    Superseded,
    CessationOfOperation,
    CertificateHold,
    RemoveFromCrl,
    PrivilegeWithdrawn,
    AaCompromise,
    Other(u64),
}

impl RevocationReason {
    fn from_code(code: u64) -> Self {
        match code {
            0 => RevocationReason::Unspecified,
            1 => RevocationReason::KeyCompromise,
            2 => RevocationReason::CaCompromise,
            3 => RevocationReason::AffiliationChanged,
            4 => RevocationReason::Superseded,
            5 => RevocationReason::CessationOfOperation,
            6 => RevocationReason::CertificateHold,
            8 => RevocationReason::RemoveFromCrl,
            9 => RevocationReason::PrivilegeWithdrawn,
            10 => RevocationReason::AaCompromise,
            other => RevocationReason::Other(other),
        }
    }

    pub fn name(&self) -> String {
        match self {
            RevocationReason::Unspecified => "unspecified".to_string(),
            RevocationReason::KeyCompromise => "keyCompromise".to_string(),
            RevocationReason::CaCompromise => "cACompromise".to_string(),
            RevocationReason::AffiliationChanged => "affiliationChanged".to_string(),
            RevocationReason::Superseded => "superseded".to_string(),
            RevocationReason::CessationOfOperation => "cessationOfOperation".to_string(),
            RevocationReason::CertificateHold => "certificateHold".to_string(),
            RevocationReason::RemoveFromCrl => "removeFromCRL".to_string(),
            RevocationReason::PrivilegeWithdrawn => "privilegeWithdrawn".to_string(),
            RevocationReason::AaCompromise => "aACompromise".to_string(),
            RevocationReason::Other(code) => code.to_string(),
        }
    }
}

/// Per-certificate status carried by a `SingleResponse`
#[derive(Clone, Debug, PartialEq)]
pub enum CertStatus {
    Good,
    Revoked {
        revocation_time: DateTime<Utc>,
        revocation_reason: Option<RevocationReason>,
    },
    Unknown,
}

#[derive(Clone, Debug, PartialEq)]
pub enum ResponderId {
    /// Raw DER of the responder Name
    ByName(Vec<u8>),
    /// SHA-1 hash of the responder public key
    ByKey(Vec<u8>),
}

#[derive(Clone, Debug)]
pub struct SingleResponse {
    pub cert_id: CertId,
    pub cert_status: CertStatus,
    pub this_update: DateTime<Utc>,
    pub next_update: Option<DateTime<Utc>>,
    pub single_extensions: Vec<Extension>,
}

impl SingleResponse {
    fn from_element(element: Element<'_>) -> Result<Self, OcspError> {
        let mut fields = element.sequence().map_err(decode_failure)?;

        let cert_id = CertId::from_element(fields.read().map_err(decode_failure)?)
            .map_err(decode_failure)?;

        let status_element = fields.read().map_err(decode_failure)?;
        let cert_status = match status_element.tag {
            // good [0] IMPLICIT NULL
            0x80 => CertStatus::Good,
            // revoked [1] IMPLICIT RevokedInfo
            0xA1 => {
                let mut revoked = Reader::new(status_element.content);
                let revocation_time = revoked
                    .read()
                    .and_then(|el| el.time())
                    .map_err(decode_failure)?;
                let revocation_reason = match revoked
                    .read_optional(context_constructed(0))
                    .map_err(decode_failure)?
                {
                    Some(wrapper) => Some(RevocationReason::from_code(
                        wrapper
                            .explicit_inner()
                            .and_then(|el| el.enumerated())
                            .map_err(decode_failure)?,
                    )),
                    None => None,
                };
                CertStatus::Revoked {
                    revocation_time,
                    revocation_reason,
                }
            }
            // unknown [2] IMPLICIT UnknownInfo
            0x82 => CertStatus::Unknown,
            other => {
                return Err(OcspError::ResponseDecodeError(format!(
                    "unexpected certStatus tag 0x{:02x}",
                    other
                )))
            }
        };

        let this_update = fields
            .read()
            .and_then(|el| el.time())
            .map_err(decode_failure)?;

        let next_update = match fields
            .read_optional(context_constructed(0))
            .map_err(decode_failure)?
        {
            Some(wrapper) => Some(
                wrapper
                    .explicit_inner()
                    .and_then(|el| el.time())
                    .map_err(decode_failure)?,
            ),
            None => None,
        };

        let single_extensions = match fields
            .read_optional(context_constructed(1))
            .map_err(decode_failure)?
        {
            Some(wrapper) => Extension::parse_extensions(
                wrapper.explicit_inner().map_err(decode_failure)?,
            )
            .map_err(decode_failure)?,
            None => Vec::new(),
        };

        Ok(SingleResponse {
            cert_id,
            cert_status,
            this_update,
            next_update,
            single_extensions,
        })
    }
}

fn decode_failure(err: crate::asn1::Asn1Error) -> OcspError {
    OcspError::ResponseDecodeError(err.to_string())
}

/// The signed inner payload of a successful OCSP response
#[derive(Clone, Debug)]
pub struct BasicOcspResponse {
    responder_id: ResponderId,
    produced_at: DateTime<Utc>,
    responses: Vec<SingleResponse>,
    response_extensions: Vec<Extension>,
    signature_algorithm: AlgorithmIdentifier,
    signature: Vec<u8>,
    certs: Vec<Certificate>,
    encoded_tbs_response_data: Vec<u8>,
}

impl BasicOcspResponse {
    /// Decodes a DER/BER `BasicOCSPResponse`, retaining the verbatim
    /// `tbsResponseData` bytes for signature verification.
    pub fn from_der(bytes: &[u8]) -> Result<Self, OcspError> {
        let mut outer = Element::parse(bytes)
            .and_then(Element::sequence)
            .map_err(decode_failure)?;

        let tbs_element = outer
            .read_expected(TAG_SEQUENCE, "ResponseData")
            .map_err(decode_failure)?;
        let encoded_tbs_response_data = tbs_element.raw.to_vec();
        let mut tbs = tbs_element.sequence().map_err(decode_failure)?;

        // version [0] EXPLICIT DEFAULT v1
        if let Some(version) = tbs.read_optional(context_constructed(0)).map_err(decode_failure)? {
            version
                .explicit_inner()
                .and_then(|el| el.uint())
                .map_err(decode_failure)?;
        }

        let responder_element = tbs.read().map_err(decode_failure)?;
        let responder_id = match responder_element.tag {
            // byName [1] EXPLICIT Name
            0xA1 => ResponderId::ByName(
                responder_element
                    .explicit_inner()
                    .map_err(decode_failure)?
                    .raw
                    .to_vec(),
            ),
            // byKey [2] EXPLICIT KeyHash
            0xA2 => ResponderId::ByKey(
                responder_element
                    .explicit_inner()
                    .and_then(|el| el.octet_string().map(|b| b.to_vec()))
                    .map_err(decode_failure)?,
            ),
            other => {
                return Err(OcspError::ResponseDecodeError(format!(
                    "unexpected responderID tag 0x{:02x}",
                    other
                )))
            }
        };

        let produced_at = tbs
            .read()
            .and_then(|el| el.time())
            .map_err(decode_failure)?;

        let mut responses = Vec::new();
        let mut response_list = tbs
            .read_expected(TAG_SEQUENCE, "responses")
            .and_then(Element::sequence)
            .map_err(decode_failure)?;
        while !response_list.is_empty() {
            let element = response_list.read().map_err(decode_failure)?;
            responses.push(SingleResponse::from_element(element)?);
        }

        let response_extensions = match tbs
            .read_optional(context_constructed(1))
            .map_err(decode_failure)?
        {
            Some(wrapper) => Extension::parse_extensions(
                wrapper.explicit_inner().map_err(decode_failure)?,
            )
            .map_err(decode_failure)?,
            None => Vec::new(),
        };

        let signature_algorithm =
            AlgorithmIdentifier::from_element(outer.read().map_err(decode_failure)?)
                .map_err(decode_failure)?;

        let (_, signature_bits) = outer
            .read()
            .and_then(|el| el.bit_string())
            .map_err(decode_failure)?;
        let signature = signature_bits.to_vec();

        let mut certs = Vec::new();
        if let Some(wrapper) = outer
            .read_optional(context_constructed(0))
            .map_err(decode_failure)?
        {
            let mut list = wrapper
                .explicit_inner()
                .and_then(Element::sequence)
                .map_err(decode_failure)?;
            while !list.is_empty() {
                let element = list.read().map_err(decode_failure)?;
                certs.push(Certificate::from_bytes(element.raw)?);
            }
        }

        Ok(BasicOcspResponse {
            responder_id,
            produced_at,
            responses,
            response_extensions,
            signature_algorithm,
            signature,
            certs,
            encoded_tbs_response_data,
        })
    }

    pub fn get_responses(&self) -> &[SingleResponse] {
        &self.responses
    }

    /// Certificates the responder embedded; the first one signs the response
    pub fn get_certificates(&self) -> &[Certificate] {
        &self.certs
    }

    pub fn get_responder_id(&self) -> &ResponderId {
        &self.responder_id
    }

    pub fn get_produced_at(&self) -> DateTime<Utc> {
        self.produced_at
    }

    pub fn get_this_update(&self) -> Result<DateTime<Utc>, OcspError> {
        Ok(self.first_response()?.this_update)
    }

    pub fn get_next_update(&self) -> Result<Option<DateTime<Utc>>, OcspError> {
        Ok(self.first_response()?.next_update)
    }

    pub fn get_signature(&self) -> &[u8] {
        &self.signature
    }

    /// Symbolic name of the signature algorithm, e.g. `ecdsa-with-SHA256`
    pub fn get_signature_algorithm(&self) -> String {
        self.signature_algorithm.name().to_string()
    }

    pub fn get_response_extensions(&self) -> &[Extension] {
        &self.response_extensions
    }

    /// Nonce bytes echoed by the responder, if the nonce extension is present
    pub fn get_nonce_extension(&self) -> Option<Vec<u8>> {
        self.response_extensions
            .iter()
            .find(|ext| ext.extn_id.dotted() == oid::ID_PKIX_OCSP_NONCE)
            .map(Extension::inner_octet_string)
    }

    /// CertID of the first single response
    pub fn get_cert_id(&self) -> Result<&CertId, OcspError> {
        Ok(&self.first_response()?.cert_id)
    }

    /// Verbatim wire bytes of `tbsResponseData`
    pub fn get_encoded_response_data(&self) -> &[u8] {
        &self.encoded_tbs_response_data
    }

    fn first_response(&self) -> Result<&SingleResponse, OcspError> {
        self.responses.first().ok_or_else(|| {
            OcspError::VerifyFailed(
                "OCSP response must contain one response, received 0 responses instead"
                    .to_string(),
            )
        })
    }
}

/// A decoded OCSP response.
///
/// Construction decodes the outer envelope and, for a successful basic
/// response, the nested `BasicOCSPResponse`; the validation methods then
/// check the response against the request it answers.
#[derive(Clone, Debug)]
pub struct OcspResponse {
    response_status: OcspResponseStatus,
    response_type: Option<Oid>,
    basic_response: Option<BasicOcspResponse>,
}

impl OcspResponse {
    /// Decodes a DER/BER `OCSPResponse`.
    ///
    /// # Errors
    ///
    /// `ResponseDecodeError` when the outer envelope is malformed,
    /// `UnexpectedValue` when the envelope is sound but the nested basic
    /// response cannot be decoded.
    pub fn from_der(bytes: &[u8]) -> Result<Self, OcspError> {
        let mut outer = Element::parse(bytes)
            .and_then(Element::sequence)
            .map_err(|_| OcspError::ResponseDecodeError(COULD_NOT_DECODE_RESPONSE.to_string()))?;

        let status_code = outer
            .read()
            .and_then(|el| el.enumerated())
            .map_err(|_| OcspError::ResponseDecodeError(COULD_NOT_DECODE_RESPONSE.to_string()))?;
        let response_status = OcspResponseStatus::from_code(status_code).ok_or_else(|| {
            OcspError::ResponseDecodeError(format!(
                "reserved response status value {}",
                status_code
            ))
        })?;

        let mut response_type = None;
        let mut basic_response = None;

        if let Some(wrapper) = outer
            .read_optional(context_constructed(0))
            .map_err(|_| OcspError::ResponseDecodeError(COULD_NOT_DECODE_RESPONSE.to_string()))?
        {
            let mut response_bytes = wrapper
                .explicit_inner()
                .and_then(Element::sequence)
                .map_err(|_| {
                    OcspError::ResponseDecodeError(COULD_NOT_DECODE_RESPONSE.to_string())
                })?;
            let oid = response_bytes
                .read_expected(TAG_OID, "responseType")
                .and_then(|el| el.oid())
                .map_err(|_| {
                    OcspError::ResponseDecodeError(COULD_NOT_DECODE_RESPONSE.to_string())
                })?;
            let response = response_bytes
                .read_expected(TAG_OCTET_STRING, "response")
                .and_then(|el| el.octet_string())
                .map_err(|_| {
                    OcspError::ResponseDecodeError(COULD_NOT_DECODE_RESPONSE.to_string())
                })?;

            if response_status == OcspResponseStatus::Successful
                && oid.dotted() == oid::ID_PKIX_OCSP_BASIC
            {
                basic_response = Some(BasicOcspResponse::from_der(response).map_err(|_| {
                    OcspError::UnexpectedValue(COULD_NOT_DECODE_RESPONSE_BYTES.to_string())
                })?);
            }
            response_type = Some(oid);
        }

        Ok(OcspResponse {
            response_status,
            response_type,
            basic_response,
        })
    }

    pub fn status(&self) -> OcspResponseStatus {
        self.response_status
    }

    /// Textual response status, e.g. `successful`
    pub fn get_status(&self) -> &'static str {
        self.response_status.name()
    }

    /// The decoded basic response.
    ///
    /// # Errors
    ///
    /// `UnexpectedValue` when the response type is not
    /// `id-pkix-ocsp-basic` or no basic response is available.
    pub fn get_basic_response(&self) -> Result<&BasicOcspResponse, OcspError> {
        match &self.response_type {
            Some(response_type) if response_type.dotted() != oid::ID_PKIX_OCSP_BASIC => {
                Err(OcspError::UnexpectedValue(format!(
                    "responseType is not \"id-pkix-ocsp-basic\" but is \"{}\"",
                    response_type.name()
                )))
            }
            _ => self.basic_response.as_ref().ok_or_else(|| {
                OcspError::UnexpectedValue(COULD_NOT_DECODE_RESPONSE_BYTES.to_string())
            }),
        }
    }

    /// Checks the library's integrity rules: exactly one single response and
    /// at least one embedded responder certificate.
    pub fn validate_response_shape(&self) -> Result<(), OcspError> {
        let basic = self.get_basic_response()?;
        if basic.responses.len() != 1 {
            return Err(OcspError::VerifyFailed(format!(
                "OCSP response must contain one response, received {} responses instead",
                basic.responses.len()
            )));
        }
        if basic.certs.is_empty() {
            return Err(OcspError::VerifyFailed(
                "OCSP response must contain the responder certificate, but none was provided"
                    .to_string(),
            ));
        }
        Ok(())
    }

    /// Confirms the responder answered for the certificate that was asked
    /// about.
    pub fn validate_certificate_id(&self, expected: &CertId) -> Result<(), OcspError> {
        let basic = self.get_basic_response()?;
        let returned = &basic.first_response()?.cert_id;
        if expected != returned {
            return Err(OcspError::VerifyFailed(
                "OCSP responded with certificate ID that differs from the requested ID"
                    .to_string(),
            ));
        }
        Ok(())
    }

    /// Verifies the responder signature over the verbatim `tbsResponseData`
    /// bytes, using the first embedded certificate and the hash implied by
    /// the declared signature algorithm.
    pub fn validate_signature(&self) -> Result<(), OcspError> {
        self.validate_response_shape()?;
        let basic = self.get_basic_response()?;
        let responder = &basic.certs[0];

        let hash = hash_name_for_signature_algorithm(&basic.signature_algorithm.algorithm)?;
        responder
            .signature_public_key()?
            .verify(hash, &basic.encoded_tbs_response_data, &basic.signature)
            .map_err(|err| match err {
                CertificateError::UnsupportedAlgorithm(_) => OcspError::CertificateError(err),
                _ => OcspError::VerifyFailed("OCSP response signature is not valid".to_string()),
            })
    }

    /// Revocation verdict for the single response: `Some(false)` for good,
    /// `Some(true)` for revoked, `None` for unknown.
    pub fn is_revoked(&self) -> Result<Option<bool>, OcspError> {
        self.validate_response_shape()?;
        let basic = self.get_basic_response()?;
        Ok(match basic.first_response()?.cert_status {
            CertStatus::Good => Some(false),
            CertStatus::Revoked { .. } => Some(true),
            CertStatus::Unknown => None,
        })
    }

    /// Symbolic revocation reason, or empty while the certificate is not
    /// revoked or no reason was supplied
    pub fn get_revoke_reason(&self) -> String {
        let Ok(basic) = self.get_basic_response() else {
            return String::new();
        };
        match basic.responses.first().map(|r| &r.cert_status) {
            Some(CertStatus::Revoked {
                revocation_reason: Some(reason),
                ..
            }) => reason.name(),
            _ => String::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_names() {
        assert_eq!(OcspResponseStatus::Successful.name(), "successful");
        assert_eq!(OcspResponseStatus::TryLater.name(), "tryLater");
        assert_eq!(OcspResponseStatus::Unauthorized.name(), "unauthorized");
    }

    #[test]
    fn test_status_reserved_values() {
        assert_eq!(OcspResponseStatus::from_code(4), None);
        assert_eq!(OcspResponseStatus::from_code(7), None);
        assert_eq!(
            OcspResponseStatus::from_code(5),
            Some(OcspResponseStatus::SigRequired)
        );
    }

    #[test]
    fn test_revocation_reason_table() {
        assert_eq!(RevocationReason::from_code(0).name(), "unspecified");
        assert_eq!(RevocationReason::from_code(2).name(), "cACompromise");
        assert_eq!(RevocationReason::from_code(8).name(), "removeFromCRL");
        assert_eq!(RevocationReason::from_code(10).name(), "aACompromise");
        // 7 is unassigned in RFC 5280, surfaced as the raw value
        assert_eq!(RevocationReason::from_code(7).name(), "7");
        assert_eq!(RevocationReason::from_code(11).name(), "11");
    }

    #[test]
    fn test_garbage_input_fails_decode() {
        let err = OcspResponse::from_der(b"1").unwrap_err();
        assert_eq!(
            err.to_string(),
            "ResponseDecodeError: [Could not decode OCSP response]"
        );
    }

    #[test]
    fn test_empty_input_fails_decode() {
        assert!(matches!(
            OcspResponse::from_der(&[]),
            Err(OcspError::ResponseDecodeError(_))
        ));
    }
}
