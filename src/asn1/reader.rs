use chrono::{DateTime, TimeZone, Utc};
use num_bigint::BigUint;

use super::writer;
use super::Asn1Error;
use crate::oid::Oid;

// ASN.1 universal tags
pub const TAG_BOOLEAN: u8 = 0x01;
pub const TAG_INTEGER: u8 = 0x02;
pub const TAG_BIT_STRING: u8 = 0x03;
pub const TAG_OCTET_STRING: u8 = 0x04;
pub const TAG_NULL: u8 = 0x05;
pub const TAG_OID: u8 = 0x06;
pub const TAG_ENUMERATED: u8 = 0x0A;
pub const TAG_UTF8_STRING: u8 = 0x0C;
pub const TAG_PRINTABLE_STRING: u8 = 0x13;
pub const TAG_IA5_STRING: u8 = 0x16;
pub const TAG_UTC_TIME: u8 = 0x17;
pub const TAG_GENERALIZED_TIME: u8 = 0x18;
pub const TAG_BMP_STRING: u8 = 0x1E;
pub const TAG_SEQUENCE: u8 = 0x30;
pub const TAG_SET: u8 = 0x31;

/// Context-specific primitive tag `[n]`
pub const fn context(number: u8) -> u8 {
    0x80 | number
}

/// Context-specific constructed tag `[n]`, the form EXPLICIT wrappers take
pub const fn context_constructed(number: u8) -> u8 {
    0xA0 | number
}

/// A decoded TLV node borrowing the input buffer.
///
/// `content` is the value octets; `raw` spans the complete TLV so that
/// structures verified by signature (`tbsResponseData`) can be exposed
/// verbatim as they appeared on the wire.
#[derive(Debug, Clone, Copy)]
pub struct Element<'a> {
    pub tag: u8,
    pub content: &'a [u8],
    pub raw: &'a [u8],
}

/// Reads the identifier and length octets.
///
/// Returns: (tag, content length, header length); a `None` length means
/// BER indefinite form.
fn read_header(data: &[u8]) -> Result<(u8, Option<usize>, usize), Asn1Error> {
    if data.is_empty() {
        return Err(Asn1Error::Truncated("unexpected end of input".to_string()));
    }

    let tag = data[0];
    if tag & 0x1F == 0x1F {
        return Err(Asn1Error::UnsupportedTag(format!(
            "multi-byte tag starting 0x{:02x}",
            tag
        )));
    }

    if data.len() < 2 {
        return Err(Asn1Error::Truncated("missing length octet".to_string()));
    }

    let first_length_byte = data[1];
    if first_length_byte == 0x80 {
        return Ok((tag, None, 2));
    }

    if first_length_byte & 0x80 == 0 {
        return Ok((tag, Some(first_length_byte as usize), 2));
    }

    let num_octets = (first_length_byte & 0x7F) as usize;
    if num_octets > std::mem::size_of::<usize>() {
        return Err(Asn1Error::OverlongLength(format!(
            "{} length octets",
            num_octets
        )));
    }
    if 2 + num_octets > data.len() {
        return Err(Asn1Error::Truncated("length octets past end of input".to_string()));
    }

    let mut length = 0usize;
    for octet in &data[2..2 + num_octets] {
        length = (length << 8) | (*octet as usize);
    }

    Ok((tag, Some(length), 2 + num_octets))
}

/// Parses one element from the front of `data`.
///
/// Returns the element and the total number of bytes it occupies.
pub fn parse_element(data: &[u8]) -> Result<(Element<'_>, usize), Asn1Error> {
    let (tag, length, header_len) = read_header(data)?;

    match length {
        Some(length) => {
            let end = header_len
                .checked_add(length)
                .ok_or_else(|| Asn1Error::OverlongLength(format!("length {} overflows", length)))?;
            if end > data.len() {
                return Err(Asn1Error::Truncated(format!(
                    "length {} exceeds remaining {} bytes",
                    length,
                    data.len() - header_len
                )));
            }
            Ok((
                Element {
                    tag,
                    content: &data[header_len..end],
                    raw: &data[..end],
                },
                end,
            ))
        }
        None => {
            if tag & 0x20 == 0 {
                return Err(Asn1Error::OverlongLength(
                    "indefinite length on a primitive element".to_string(),
                ));
            }
            let content_end = find_end_of_contents(data, header_len)?;
            Ok((
                Element {
                    tag,
                    content: &data[header_len..content_end],
                    raw: &data[..content_end + 2],
                },
                content_end + 2,
            ))
        }
    }
}

/// Finds the end-of-contents marker terminating an indefinite-length value.
///
/// Returns the offset of the 0x00 0x00 marker itself.
fn find_end_of_contents(data: &[u8], start_offset: usize) -> Result<usize, Asn1Error> {
    let mut offset = start_offset;
    loop {
        if offset + 2 <= data.len() && data[offset] == 0x00 && data[offset + 1] == 0x00 {
            return Ok(offset);
        }
        if offset >= data.len() {
            return Err(Asn1Error::Truncated(
                "missing end-of-contents octets".to_string(),
            ));
        }
        let (_, consumed) = parse_element(&data[offset..])?;
        offset += consumed;
    }
}

impl<'a> Element<'a> {
    /// Parses the element at the front of `data`; trailing bytes are ignored.
    pub fn parse(data: &'a [u8]) -> Result<Element<'a>, Asn1Error> {
        let (element, _) = parse_element(data)?;
        Ok(element)
    }

    pub fn is_constructed(&self) -> bool {
        self.tag & 0x20 != 0
    }

    fn expect(self, tag: u8, what: &'static str) -> Result<Element<'a>, Asn1Error> {
        if self.tag != tag {
            return Err(Asn1Error::TagMismatch {
                expected: what,
                found: self.tag,
            });
        }
        Ok(self)
    }

    /// Content reader over a SEQUENCE
    pub fn sequence(self) -> Result<Reader<'a>, Asn1Error> {
        Ok(Reader::new(self.expect(TAG_SEQUENCE, "SEQUENCE")?.content))
    }

    /// Content reader over a SET
    pub fn set(self) -> Result<Reader<'a>, Asn1Error> {
        Ok(Reader::new(self.expect(TAG_SET, "SET")?.content))
    }

    /// Content reader over any constructed element
    pub fn children(self) -> Result<Reader<'a>, Asn1Error> {
        if !self.is_constructed() {
            return Err(Asn1Error::TagMismatch {
                expected: "constructed element",
                found: self.tag,
            });
        }
        Ok(Reader::new(self.content))
    }

    /// The single element wrapped by an EXPLICIT tag
    pub fn explicit_inner(self) -> Result<Element<'a>, Asn1Error> {
        let mut children = self.children()?;
        children.read()
    }

    /// INTEGER value octets (two's complement, as encoded)
    pub fn integer_bytes(self) -> Result<&'a [u8], Asn1Error> {
        Ok(self.expect(TAG_INTEGER, "INTEGER")?.content)
    }

    /// Non-negative INTEGER as u64
    pub fn uint(self) -> Result<u64, Asn1Error> {
        uint_from_content(self.integer_bytes()?)
    }

    /// ENUMERATED as u64
    pub fn enumerated(self) -> Result<u64, Asn1Error> {
        uint_from_content(self.expect(TAG_ENUMERATED, "ENUMERATED")?.content)
    }

    /// Non-negative INTEGER of arbitrary precision
    pub fn big_uint(self) -> Result<BigUint, Asn1Error> {
        let content = self.integer_bytes()?;
        if content.first().is_some_and(|b| b & 0x80 != 0) {
            return Err(Asn1Error::IntegerOverflow(
                "negative INTEGER where a non-negative value is required".to_string(),
            ));
        }
        Ok(BigUint::from_bytes_be(content))
    }

    pub fn oid(self) -> Result<Oid, Asn1Error> {
        Oid::from_der_content(self.expect(TAG_OID, "OBJECT IDENTIFIER")?.content)
    }

    pub fn octet_string(self) -> Result<&'a [u8], Asn1Error> {
        Ok(self.expect(TAG_OCTET_STRING, "OCTET STRING")?.content)
    }

    /// BIT STRING as (unused-bit count, value octets)
    pub fn bit_string(self) -> Result<(u8, &'a [u8]), Asn1Error> {
        let content = self.expect(TAG_BIT_STRING, "BIT STRING")?.content;
        let Some((&unused, bits)) = content.split_first() else {
            return Err(Asn1Error::Truncated(
                "BIT STRING missing unused-bits octet".to_string(),
            ));
        };
        if unused > 7 {
            return Err(Asn1Error::OverlongLength(format!(
                "BIT STRING declares {} unused bits",
                unused
            )));
        }
        Ok((unused, bits))
    }

    pub fn boolean(self) -> Result<bool, Asn1Error> {
        let content = self.expect(TAG_BOOLEAN, "BOOLEAN")?.content;
        match content {
            [value] => Ok(*value != 0),
            _ => Err(Asn1Error::Truncated(format!(
                "BOOLEAN of length {}",
                content.len()
            ))),
        }
    }

    pub fn null(self) -> Result<(), Asn1Error> {
        let content = self.expect(TAG_NULL, "NULL")?.content;
        if !content.is_empty() {
            return Err(Asn1Error::OverlongLength(format!(
                "NULL of length {}",
                content.len()
            )));
        }
        Ok(())
    }

    /// Character-string content as text (UTF8String, PrintableString,
    /// IA5String, BMPString)
    pub fn text(self) -> Result<String, Asn1Error> {
        match self.tag {
            TAG_UTF8_STRING | TAG_PRINTABLE_STRING | TAG_IA5_STRING => {
                std::str::from_utf8(self.content)
                    .map(|s| s.to_string())
                    .map_err(|e| Asn1Error::Utf8Invalid(e.to_string()))
            }
            TAG_BMP_STRING => {
                if self.content.len() % 2 != 0 {
                    return Err(Asn1Error::Utf8Invalid(
                        "BMPString with odd length".to_string(),
                    ));
                }
                let units: Vec<u16> = self
                    .content
                    .chunks_exact(2)
                    .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
                    .collect();
                String::from_utf16(&units).map_err(|e| Asn1Error::Utf8Invalid(e.to_string()))
            }
            other => Err(Asn1Error::TagMismatch {
                expected: "character string",
                found: other,
            }),
        }
    }

    /// GeneralizedTime or UTCTime as a UTC timestamp
    pub fn time(self) -> Result<DateTime<Utc>, Asn1Error> {
        match self.tag {
            TAG_GENERALIZED_TIME => parse_time(self.content, 4),
            TAG_UTC_TIME => parse_time(self.content, 2),
            other => Err(Asn1Error::TagMismatch {
                expected: "GeneralizedTime or UTCTime",
                found: other,
            }),
        }
    }

    /// Canonical DER re-encoding of this element.
    ///
    /// Definite minimal lengths throughout, SET children ordered by their
    /// encoding. This is the normalization CertID hashes are computed over.
    pub fn reencode_der(&self) -> Result<Vec<u8>, Asn1Error> {
        if !self.is_constructed() {
            return Ok(writer::tlv(self.tag, self.content));
        }

        let mut children = Vec::new();
        let mut reader = Reader::new(self.content);
        while !reader.is_empty() {
            children.push(reader.read()?.reencode_der()?);
        }
        if self.tag == TAG_SET {
            children.sort();
        }
        Ok(writer::tlv(self.tag, &children.concat()))
    }
}

fn uint_from_content(content: &[u8]) -> Result<u64, Asn1Error> {
    if content.first().is_some_and(|b| b & 0x80 != 0) {
        return Err(Asn1Error::IntegerOverflow(
            "negative value where a non-negative value is required".to_string(),
        ));
    }

    let significant: Vec<u8> = content.iter().copied().skip_while(|b| *b == 0).collect();
    if significant.len() > 8 {
        return Err(Asn1Error::IntegerOverflow(format!(
            "{} value octets exceed u64",
            significant.len()
        )));
    }

    let mut value = 0u64;
    for byte in significant {
        value = (value << 8) | byte as u64;
    }
    Ok(value)
}

fn parse_time(content: &[u8], year_digits: usize) -> Result<DateTime<Utc>, Asn1Error> {
    let text = std::str::from_utf8(content).map_err(|e| Asn1Error::Utf8Invalid(e.to_string()))?;

    let Some(body) = text.strip_suffix('Z') else {
        return Err(Asn1Error::Utf8Invalid(format!(
            "time value \"{}\" without Z suffix",
            text
        )));
    };
    // Fractional seconds are permitted in BER GeneralizedTime; ignored here.
    let body = body.split('.').next().unwrap_or(body);

    if body.len() < year_digits + 8 || !body.bytes().all(|b| b.is_ascii_digit()) {
        return Err(Asn1Error::Utf8Invalid(format!("time value \"{}\"", text)));
    }

    let digits = |range: std::ops::Range<usize>| -> u32 {
        body[range].parse().unwrap_or(0)
    };

    let year = if year_digits == 4 {
        digits(0..4) as i32
    } else {
        // UTCTime: 00-49 map to 20xx, 50-99 to 19xx
        let yy = digits(0..2) as i32;
        if yy < 50 {
            2000 + yy
        } else {
            1900 + yy
        }
    };
    let month = digits(year_digits..year_digits + 2);
    let day = digits(year_digits + 2..year_digits + 4);
    let hour = digits(year_digits + 4..year_digits + 6);
    let minute = digits(year_digits + 6..year_digits + 8);
    let second = if body.len() >= year_digits + 10 {
        digits(year_digits + 8..year_digits + 10)
    } else {
        0
    };

    Utc.with_ymd_and_hms(year, month, day, hour, minute, second)
        .single()
        .ok_or_else(|| Asn1Error::Utf8Invalid(format!("time value \"{}\" out of range", text)))
}

/// Cursor over a run of sibling elements
pub struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Reader { data, pos: 0 }
    }

    pub fn is_empty(&self) -> bool {
        self.pos >= self.data.len()
    }

    pub fn peek_tag(&self) -> Option<u8> {
        self.data.get(self.pos).copied()
    }

    /// Reads the next element of any tag
    pub fn read(&mut self) -> Result<Element<'a>, Asn1Error> {
        let (element, consumed) = parse_element(&self.data[self.pos..])?;
        self.pos += consumed;
        Ok(element)
    }

    /// Reads the next element, requiring `tag`; a mismatch does not consume
    pub fn read_expected(&mut self, tag: u8, what: &'static str) -> Result<Element<'a>, Asn1Error> {
        match self.peek_tag() {
            Some(found) if found == tag => self.read(),
            Some(found) => Err(Asn1Error::TagMismatch {
                expected: what,
                found,
            }),
            None => Err(Asn1Error::Truncated(format!("expected {}", what))),
        }
    }

    /// Reads the next element only if it carries `tag`
    pub fn read_optional(&mut self, tag: u8) -> Result<Option<Element<'a>>, Asn1Error> {
        match self.peek_tag() {
            Some(found) if found == tag => Ok(Some(self.read()?)),
            _ => Ok(None),
        }
    }
}
