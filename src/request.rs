//! OCSP request construction per RFC 6960 §4.1.1.

use crate::asn1::reader::{context_constructed, Element, TAG_SEQUENCE};
use crate::asn1::{writer, Asn1Error};
use crate::cert_id::CertId;
use crate::oid::{self, Oid};
use crate::x509::Extension;

/// An OCSP request under construction.
///
/// Accumulates one or more certificate IDs plus optional request extensions
/// and serializes to DER. Encoding does not consume the request; later
/// mutations simply alter the next encoding. The default v1 version is
/// omitted on the wire and `optionalSignature` is never emitted.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct OcspRequest {
    request_list: Vec<CertId>,
    request_extensions: Vec<Extension>,
}

impl OcspRequest {
    pub fn new() -> Self {
        OcspRequest::default()
    }

    /// Appends a certificate to the request list
    pub fn add_certificate_id(&mut self, cert_id: CertId) {
        self.request_list.push(cert_id);
    }

    /// Appends a non-critical nonce extension wrapping the caller-supplied
    /// bytes. The caller is responsible for the randomness of the nonce.
    pub fn add_nonce_extension(&mut self, nonce: &[u8]) {
        self.request_extensions.push(Extension {
            extn_id: Oid::new(oid::ID_PKIX_OCSP_NONCE),
            critical: false,
            extn_value: writer::octet_string(nonce),
        });
    }

    /// The nonce bytes from the first nonce extension, unwrapped from their
    /// OCTET STRING
    pub fn get_nonce_extension(&self) -> Option<Vec<u8>> {
        self.request_extensions
            .iter()
            .find(|ext| ext.extn_id.dotted() == oid::ID_PKIX_OCSP_NONCE)
            .map(Extension::inner_octet_string)
    }

    pub fn certificate_ids(&self) -> &[CertId] {
        &self.request_list
    }

    pub fn extensions(&self) -> &[Extension] {
        &self.request_extensions
    }

    /// Serializes the request to DER.
    ///
    /// Repeated calls on an unmutated request return identical bytes.
    pub fn encode_der(&self) -> Result<Vec<u8>, Asn1Error> {
        let mut requests = Vec::new();
        for cert_id in &self.request_list {
            // Request ::= SEQUENCE { reqCert CertID }
            requests.extend_from_slice(&writer::sequence(&cert_id.to_der()?));
        }

        let mut tbs_content = writer::sequence(&requests);
        if !self.request_extensions.is_empty() {
            let mut extensions = Vec::new();
            for extension in &self.request_extensions {
                extensions.extend_from_slice(&extension.to_der()?);
            }
            tbs_content.extend_from_slice(&writer::explicit(
                2,
                &writer::sequence(&extensions),
            ));
        }

        Ok(writer::sequence(&writer::sequence(&tbs_content)))
    }

    /// Decodes a DER request; the explicit `[0] INTEGER 0` version form and
    /// the omitted default are both accepted.
    pub fn from_der(bytes: &[u8]) -> Result<Self, Asn1Error> {
        let mut outer = Element::parse(bytes)?.sequence()?;
        let mut tbs = outer
            .read_expected(TAG_SEQUENCE, "TBSRequest")?
            .sequence()?;

        if let Some(version) = tbs.read_optional(context_constructed(0))? {
            version.explicit_inner()?.uint()?;
        }
        // requestorName [1] is ignored
        tbs.read_optional(context_constructed(1))?;

        let mut request_list = Vec::new();
        let mut requests = tbs
            .read_expected(TAG_SEQUENCE, "requestList")?
            .sequence()?;
        while !requests.is_empty() {
            let mut request = requests.read()?.sequence()?;
            request_list.push(CertId::from_element(request.read()?)?);
        }

        let request_extensions = match tbs.read_optional(context_constructed(2))? {
            Some(wrapper) => Extension::parse_extensions(wrapper.explicit_inner()?)?,
            None => Vec::new(),
        };

        Ok(OcspRequest {
            request_list,
            request_extensions,
        })
    }
}
