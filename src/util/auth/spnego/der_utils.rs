use nom::bytes::complete::take;
use nom::Err::Error;
use nom::error::ErrorKind;
use nom::IResult;
use nom::multi::fold_many_m_n;
use nom::number::complete::le_u8;

use smb_core::error::SMBError;
use smb_core::SMBResult;

pub const NEG_TOKEN_INIT_TAG: u8 = 0xA0;
pub const NEG_TOKEN_RESP_TAG: u8 = 0xA1;

pub const MECH_TYPE_LIST_TAG: u8 = 0xA0;
pub const REQUIRED_FLAGS_TAG: u8 = 0xA1;
pub const MECH_TOKEN_TAG: u8 = 0xA2;
/// `mechListMIC` in RFC 4178, `negHints` in the negTokenInit2 extension.
pub const MECH_LIST_MIC_TAG: u8 = 0xA3;
pub const NEG_HINTS_TAG: u8 = 0xA3;
pub const NEG_TOKEN_INIT2_MIC_TAG: u8 = 0xA4;
pub const HINT_NAME_TAG: u8 = 0xA0;

pub const NEG_STATE_TAG: u8 = 0xA0;
pub const SUPPORTED_MECH_TAG: u8 = 0xA1;
pub const RESPONSE_TOKEN_TAG: u8 = 0xA2;

pub const APPLICATION_TAG: u8 = 0x60;

pub const DER_ENCODING_BYTE_ARRAY_TAG: u8 = 0x04;
pub const DER_ENCODING_OID_TAG: u8 = 0x06;
pub const DER_ENCODING_ENUM_TAG: u8 = 0x0A;
pub const DER_ENCODING_GENERAL_STRING_TAG: u8 = 0x1B;
pub const DER_ENCODING_SEQUENCE_TAG: u8 = 0x30;

/// 1.3.6.1.5.5.2
pub const SPNEGO_ID: [u8; 6] = [0x2b, 0x06, 0x01, 0x05, 0x05, 0x02];

pub trait AsDerBytes {
    fn der_bytes(&self, item_tag: u8) -> Vec<u8>;
}

impl AsDerBytes for [u8] {
    fn der_bytes(&self, _: u8) -> Vec<u8> {
        self.to_vec()
    }
}

impl AsDerBytes for Vec<u8> {
    fn der_bytes(&self, _: u8) -> Vec<u8> {
        self.clone()
    }
}

impl AsDerBytes for Vec<Vec<u8>> {
    fn der_bytes(&self, item_tag: u8) -> Vec<u8> {
        self.iter()
            .flat_map(|inner_arr| encode_tlv(item_tag, inner_arr))
            .collect::<Vec<u8>>()
    }
}

/// Builds `type_tag { encoding_tag { items } }`, the shape of every
/// context-tagged SPNEGO field.
pub fn encode_der_bytes<T: AsDerBytes + ?Sized>(bytes: &T, type_tag: u8, encoding_tag: u8, item_tag: u8) -> Vec<u8> {
    encode_tlv(type_tag, &encode_tlv(encoding_tag, &bytes.der_bytes(item_tag)))
}

pub fn encode_tlv(tag: u8, contents: &[u8]) -> Vec<u8> {
    [
        &[tag][0..],
        &get_length(contents.len()),
        contents,
    ].concat()
}

/// Parses a definite DER length. Long forms that a shorter encoding could
/// carry (leading zero octets, values below 0x80) are rejected.
pub fn parse_length(buffer: &[u8]) -> IResult<&[u8], usize> {
    let (remaining, len) = le_u8(buffer)?;
    if len < 0x80 { return Ok((remaining, len as usize)); }
    let field_size = (len & 0x7f) as usize;
    // Indefinite lengths are BER only; more octets than a usize holds cannot fit the buffer.
    if field_size == 0 || field_size > size_of::<usize>() {
        return Err(Error(nom::error::Error::new(remaining, ErrorKind::LengthValue)));
    }
    if remaining.first() == Some(&0) {
        return Err(Error(nom::error::Error::new(remaining, ErrorKind::LengthValue)));
    }
    let (rest, length) = fold_many_m_n(field_size, field_size, le_u8, || 0_usize, |len, item| (len << 8) | item as usize)(remaining)?;
    if length < 0x80 {
        return Err(Error(nom::error::Error::new(remaining, ErrorKind::LengthValue)));
    }
    Ok((rest, length))
}

pub fn parse_field_with_len(buffer: &[u8]) -> IResult<&[u8], &[u8]> {
    parse_length(buffer).and_then(|(remaining, len)| {
        smb_core::logging::trace!(len, available = remaining.len(), "DER field");
        take(len)(remaining)
    })
}

/// Matches `tag` and returns the field contents.
pub fn parse_tagged(buffer: &[u8], tag: u8) -> IResult<&[u8], &[u8]> {
    let (remaining, b_tag) = le_u8(buffer)?;
    if b_tag != tag { return Err(Error(nom::error::Error::new(buffer, ErrorKind::Tag))); }
    parse_field_with_len(remaining)
}

/// Parses `length { 0x06 length oid }` following a context tag.
pub fn parse_der_oid(buffer: &[u8]) -> IResult<&[u8], Vec<u8>> {
    let (remaining, _) = parse_length(buffer)?;
    parse_der_multibyte(remaining, DER_ENCODING_OID_TAG)
}

pub fn parse_der_byte_array(buffer: &[u8]) -> IResult<&[u8], Vec<u8>> {
    let (remaining, _) = parse_length(buffer)?;
    parse_der_multibyte(remaining, DER_ENCODING_BYTE_ARRAY_TAG)
}

pub fn parse_der_enum(buffer: &[u8]) -> IResult<&[u8], u8> {
    let (remaining, _) = parse_length(buffer)?;
    let (remaining, value) = parse_tagged(remaining, DER_ENCODING_ENUM_TAG)?;
    match value {
        [byte] => Ok((remaining, *byte)),
        _ => Err(Error(nom::error::Error::new(remaining, ErrorKind::LengthValue))),
    }
}

pub fn parse_der_general_string(buffer: &[u8]) -> IResult<&[u8], String> {
    let (remaining, value) = parse_tagged(buffer, DER_ENCODING_GENERAL_STRING_TAG)?;
    match decode_general_string(value) {
        Ok(string) => Ok((remaining, string)),
        Err(_) => Err(Error(nom::error::Error::new(buffer, ErrorKind::Char))),
    }
}

pub fn parse_der_multibyte(buffer: &[u8], tag: u8) -> IResult<&[u8], Vec<u8>> {
    let (remaining, value) = parse_tagged(buffer, tag)?;
    Ok((remaining, value.to_vec()))
}

/// Decodes a DER length, returning it with the number of octets it took.
pub fn read_length(buffer: &[u8]) -> SMBResult<(usize, usize)> {
    let (remaining, length) = parse_length(buffer)?;
    Ok((length, buffer.len() - remaining.len()))
}

/// Size of the length field [`get_length`] emits for `len`.
pub fn get_field_size(len: usize) -> usize {
    if len < 0x80 {
        return 1;
    }
    let mut adder = 1;
    let mut len = len;
    while len > 0 {
        len >>= 8;
        adder += 1;
    }
    adder
}

/// Minimal DER length encoding.
pub fn get_length(length: usize) -> Vec<u8> {
    if length < 0x80 {
        return vec![length as u8];
    }
    let len_bytes = length.to_be_bytes();
    let first_significant = len_bytes.iter().position(|b| *b != 0).unwrap_or(len_bytes.len() - 1);
    let len_bytes = &len_bytes[first_significant..];
    [&[(0x80 | len_bytes.len()) as u8][0..], len_bytes].concat()
}

/// GeneralString with one byte per character. Only ASCII is representable.
pub fn encode_general_string(value: &str) -> SMBResult<Vec<u8>> {
    if !value.is_ascii() {
        return Err(SMBError::parse_error("GeneralString only supports ASCII"));
    }
    Ok(value.as_bytes().to_vec())
}

pub fn decode_general_string(bytes: &[u8]) -> SMBResult<String> {
    if !bytes.is_ascii() {
        return Err(SMBError::parse_error("GeneralString only supports ASCII"));
    }
    Ok(bytes.iter().map(|b| *b as char).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_LENGTHS: [usize; 14] = [
        0, 1, 0x7F, 0x80, 0xFF, 0x100, 0x1234, 0xFFFF, 0x10000, 0xFF_FFFF, 0x100_0000, 0x7FFF_FFFF, 0x8000_0000, 0xFFFF_FFFF,
    ];

    #[test]
    fn length_round_trip() {
        for length in SAMPLE_LENGTHS {
            let encoded = get_length(length);
            assert_eq!(read_length(&encoded).unwrap(), (length, encoded.len()), "length {length:#x}");
        }
    }

    #[test]
    fn length_encoding_is_minimal() {
        for length in SAMPLE_LENGTHS {
            let encoded = get_length(length);
            assert_eq!(encoded.len(), get_field_size(length));
            if length < 0x80 {
                assert_eq!(encoded, [length as u8]);
            } else {
                assert_eq!(encoded[0] & 0x80, 0x80);
                assert_eq!(encoded[0] as usize & 0x7F, encoded.len() - 1);
                assert_ne!(encoded[1], 0, "leading zero octet for {length:#x}");
            }
        }
        assert_eq!(get_length(0x80), [0x81, 0x80]);
        assert_eq!(get_length(0x100), [0x82, 0x01, 0x00]);
        assert_eq!(get_length(0xFFFF_FFFF), [0x84, 0xFF, 0xFF, 0xFF, 0xFF]);
    }

    #[test]
    fn read_length_reports_consumed_octets() {
        assert_eq!(read_length(&[0x05, 0xAA]).unwrap(), (5, 1));
        assert_eq!(read_length(&[0x82, 0x01, 0x00, 0xAA]).unwrap(), (256, 3));
    }

    #[test]
    fn malformed_lengths_fail() {
        // Indefinite form.
        assert!(read_length(&[0x80]).is_err());
        // Truncated long form.
        assert!(read_length(&[0x82, 0x01]).is_err());
        assert!(read_length(&[0x89, 1, 2, 3, 4, 5, 6, 7, 8, 9]).is_err());
        assert!(read_length(&[]).is_err());
    }

    #[test]
    fn non_minimal_lengths_fail() {
        assert!(read_length(&[0x81, 0x05]).is_err());
        assert!(read_length(&[0x82, 0x00, 0x80]).is_err());
        assert!(read_length(&[0x81, 0x7F]).is_err());
        assert_eq!(read_length(&[0x81, 0x80]).unwrap(), (0x80, 2));
    }

    #[test]
    fn declared_length_past_buffer_fails() {
        assert!(parse_field_with_len(&[0x05, 0x01, 0x02]).is_err());
        assert!(parse_tagged(&[0x04, 0x03, 0x01], DER_ENCODING_BYTE_ARRAY_TAG).is_err());
    }

    #[test]
    fn tagged_fields() {
        let encoded = encode_der_bytes(&vec![1_u8, 2, 3], MECH_TOKEN_TAG, DER_ENCODING_BYTE_ARRAY_TAG, 0);
        assert_eq!(encoded, [0xA2, 0x05, 0x04, 0x03, 0x01, 0x02, 0x03]);
        let (remaining, token) = parse_der_byte_array(&encoded[1..]).unwrap();
        assert!(remaining.is_empty());
        assert_eq!(token, [1, 2, 3]);

        assert!(parse_tagged(&[0x04, 0x00], DER_ENCODING_OID_TAG).is_err());
    }

    #[test]
    fn oid_list_encoding() {
        let list = vec![vec![0x2a, 0x03], vec![0x2b]];
        let encoded = encode_der_bytes(&list, MECH_TYPE_LIST_TAG, DER_ENCODING_SEQUENCE_TAG, DER_ENCODING_OID_TAG);
        assert_eq!(encoded, [0xA0, 0x09, 0x30, 0x07, 0x06, 0x02, 0x2a, 0x03, 0x06, 0x01, 0x2b]);
    }

    #[test]
    fn enum_field() {
        let (_, value) = parse_der_enum(&[0x03, 0x0A, 0x01, 0x02]).unwrap();
        assert_eq!(value, 2);
        assert!(parse_der_enum(&[0x04, 0x0A, 0x02, 0x00, 0x01]).is_err());
    }

    #[test]
    fn general_string_is_single_byte() {
        assert_eq!(encode_general_string("abc").unwrap(), b"abc");
        assert!(encode_general_string("é").is_err());
        assert_eq!(decode_general_string(b"host@REALM").unwrap(), "host@REALM");
        assert!(decode_general_string(&[0xC3, 0xA9]).is_err());

        let (_, value) = parse_der_general_string(&[0x1B, 0x02, b'h', b'i']).unwrap();
        assert_eq!(value, "hi");
    }
}
