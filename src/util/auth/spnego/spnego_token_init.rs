use nom::Err::Error;
use nom::error::ErrorKind;
use nom::IResult;
use nom::multi::many0;
use nom::number::complete::le_u8;

use crate::util::auth::spnego::der_utils::{DER_ENCODING_BYTE_ARRAY_TAG, DER_ENCODING_OID_TAG, DER_ENCODING_SEQUENCE_TAG, encode_der_bytes, encode_tlv, MECH_LIST_MIC_TAG, MECH_TOKEN_TAG, MECH_TYPE_LIST_TAG, NEG_TOKEN_INIT2_MIC_TAG, NEG_TOKEN_INIT_TAG, parse_der_byte_array, parse_der_multibyte, parse_field_with_len, parse_tagged, REQUIRED_FLAGS_TAG};

/// `negTokenInit`: the initiator's ordered mechanism preference, optionally
/// carrying the first token of the preferred mechanism.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SPNEGOTokenInitBody {
    pub mech_type_list: Vec<Vec<u8>>,
    pub mech_token: Option<Vec<u8>>,
    pub mech_list_mic: Option<Vec<u8>>,
}

impl SPNEGOTokenInitBody {
    pub fn new(mech_type_list: Vec<Vec<u8>>, mech_token: Option<Vec<u8>>) -> Self {
        Self {
            mech_type_list,
            mech_token,
            mech_list_mic: None,
        }
    }

    /// Parses the body following the `[0]` choice tag.
    pub fn parse(bytes: &[u8]) -> IResult<&[u8], Self> {
        let (remaining, construction) = parse_field_with_len(bytes)?;
        let (_, mut sequence) = parse_tagged(construction, DER_ENCODING_SEQUENCE_TAG)?;
        let mut mech_type_list = Vec::new();
        let mut mech_token = None;
        let mut mech_list_mic = None;
        while !sequence.is_empty() {
            let (s, tag) = le_u8(sequence)?;
            sequence = s;
            match tag {
                MECH_TYPE_LIST_TAG => {
                    let (s, list) = Self::parse_mech_type_list(sequence)?;
                    sequence = s;
                    mech_type_list = list;
                },
                REQUIRED_FLAGS_TAG => {
                    let (s, _) = parse_field_with_len(sequence)?;
                    sequence = s;
                },
                MECH_TOKEN_TAG => {
                    let (s, token) = parse_der_byte_array(sequence)?;
                    sequence = s;
                    mech_token = Some(token);
                },
                // [3] is the MIC in RFC 4178 but negHints in negTokenInit2.
                MECH_LIST_MIC_TAG => {
                    let (s, field) = parse_field_with_len(sequence)?;
                    sequence = s;
                    if field.first() == Some(&DER_ENCODING_BYTE_ARRAY_TAG) {
                        let (_, mic) = parse_der_multibyte(field, DER_ENCODING_BYTE_ARRAY_TAG)?;
                        mech_list_mic = Some(mic);
                    }
                },
                NEG_TOKEN_INIT2_MIC_TAG => {
                    let (s, mic) = parse_der_byte_array(sequence)?;
                    sequence = s;
                    mech_list_mic = Some(mic);
                },
                _ => return Err(Error(nom::error::Error::new(sequence, ErrorKind::Tag))),
            }
        }
        smb_core::logging::trace!(mechanisms = mech_type_list.len(), has_token = mech_token.is_some(), "parsed negTokenInit");
        Ok((remaining, SPNEGOTokenInitBody { mech_type_list, mech_token, mech_list_mic }))
    }

    pub fn as_bytes(&self) -> Vec<u8> {
        let mut fields = encode_der_bytes(&self.mech_type_list, MECH_TYPE_LIST_TAG, DER_ENCODING_SEQUENCE_TAG, DER_ENCODING_OID_TAG);
        if let Some(mech_token) = &self.mech_token {
            fields.append(&mut encode_der_bytes(mech_token, MECH_TOKEN_TAG, DER_ENCODING_BYTE_ARRAY_TAG, 0));
        }
        if let Some(mech_list_mic) = &self.mech_list_mic {
            fields.append(&mut encode_der_bytes(mech_list_mic, MECH_LIST_MIC_TAG, DER_ENCODING_BYTE_ARRAY_TAG, 0));
        }
        encode_tlv(NEG_TOKEN_INIT_TAG, &encode_tlv(DER_ENCODING_SEQUENCE_TAG, &fields))
    }
}

impl SPNEGOTokenInitBody {
    pub(crate) fn parse_mech_type_list(buffer: &[u8]) -> IResult<&[u8], Vec<Vec<u8>>> {
        let (remaining, construction) = parse_field_with_len(buffer)?;
        let (_, sequence) = parse_tagged(construction, DER_ENCODING_SEQUENCE_TAG)?;
        let (_, list) = many0(|buf| parse_der_multibyte(buf, DER_ENCODING_OID_TAG))(sequence)?;
        Ok((remaining, list))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NTLM_OID: [u8; 10] = [0x2b, 0x06, 0x01, 0x04, 0x01, 0x82, 0x37, 0x02, 0x02, 0x0a];

    #[test]
    fn encode_then_parse() {
        let body = SPNEGOTokenInitBody::new(vec![NTLM_OID.to_vec()], Some(b"NTLMSSP\0".to_vec()));
        let bytes = body.as_bytes();
        assert_eq!(bytes[0], NEG_TOKEN_INIT_TAG);
        let (remaining, parsed) = SPNEGOTokenInitBody::parse(&bytes[1..]).unwrap();
        assert!(remaining.is_empty());
        assert_eq!(parsed, body);
    }

    #[test]
    fn absent_fields_are_not_encoded() {
        let body = SPNEGOTokenInitBody::new(vec![vec![0x2a]], None);
        assert_eq!(body.as_bytes(), [0xA0, 0x09, 0x30, 0x07, 0xA0, 0x05, 0x30, 0x03, 0x06, 0x01, 0x2a]);
    }

    #[test]
    fn skips_req_flags_and_neg_hints() {
        let bytes = [
            0x1A, 0x30, 0x18,
            0xA0, 0x05, 0x30, 0x03, 0x06, 0x01, 0x2a,
            0xA1, 0x04, 0x03, 0x02, 0x00, 0x00,
            0xA3, 0x09, 0x30, 0x07, 0xA0, 0x05, 0x1B, 0x03, b'a', b'b', b'c',
        ];
        let (_, parsed) = SPNEGOTokenInitBody::parse(&bytes).unwrap();
        assert_eq!(parsed.mech_type_list, vec![vec![0x2a]]);
        assert_eq!(parsed.mech_token, None);
        assert_eq!(parsed.mech_list_mic, None);
    }

    #[test]
    fn unknown_field_fails() {
        let bytes = [0x06, 0x30, 0x04, 0xA7, 0x02, 0x04, 0x00];
        assert!(SPNEGOTokenInitBody::parse(&bytes).is_err());
    }

    #[test]
    fn truncated_body_fails() {
        let body = SPNEGOTokenInitBody::new(vec![NTLM_OID.to_vec()], Some(vec![1, 2, 3]));
        let bytes = body.as_bytes();
        assert!(SPNEGOTokenInitBody::parse(&bytes[1..bytes.len() - 2]).is_err());
    }
}
