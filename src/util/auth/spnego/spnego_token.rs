use nom::Err::Error;
use nom::error::ErrorKind;
use nom::IResult;
use nom::number::complete::le_u8;

use smb_core::{SMBParseResult, SMBResult};
use smb_core::error::SMBError;

use crate::util::auth::spnego::{SPNEGOTokenInit2Body, SPNEGOTokenInitBody, SPNEGOTokenResponseBody};
use crate::util::auth::spnego::der_utils::{APPLICATION_TAG, DER_ENCODING_OID_TAG, encode_tlv, NEG_TOKEN_INIT_TAG, NEG_TOKEN_RESP_TAG, parse_field_with_len, parse_tagged, SPNEGO_ID};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SPNEGOToken {
    Init(SPNEGOTokenInitBody),
    Init2(SPNEGOTokenInit2Body),
    Response(SPNEGOTokenResponseBody),
}

impl SPNEGOToken {
    /// Parses a GSS-wrapped `negTokenInit` or a bare `negTokenResp`.
    ///
    /// An acceptor never receives `negTokenInit2`; its extra fields are read
    /// as part of [`SPNEGOToken::Init`].
    pub fn parse(bytes: &[u8]) -> SMBParseResult<&[u8], Self> {
        Self::parse_inner(bytes).map_err(SMBError::from)
    }

    fn parse_inner(bytes: &[u8]) -> IResult<&[u8], Self> {
        smb_core::logging::trace!(buf_len = bytes.len(), "parsing SPNEGO token");
        let (remaining, tag) = le_u8(bytes)?;
        match tag {
            APPLICATION_TAG => {
                let (remaining, token) = parse_field_with_len(remaining)?;
                let (token, oid) = parse_tagged(token, DER_ENCODING_OID_TAG)?;
                if oid != SPNEGO_ID {
                    return Err(Error(nom::error::Error::new(token, ErrorKind::Verify)));
                }
                let (token, tag) = le_u8(token)?;
                smb_core::logging::trace!(tag, "SPNEGO inner tag");
                match tag {
                    NEG_TOKEN_INIT_TAG => {
                        let (_, body) = SPNEGOTokenInitBody::parse(token)?;
                        Ok((remaining, SPNEGOToken::Init(body)))
                    },
                    NEG_TOKEN_RESP_TAG => {
                        let (_, body) = SPNEGOTokenResponseBody::parse(token)?;
                        Ok((remaining, SPNEGOToken::Response(body)))
                    },
                    _ => Err(Error(nom::error::Error::new(token, ErrorKind::Tag)))
                }
            },
            NEG_TOKEN_RESP_TAG => {
                let (remaining, body) = SPNEGOTokenResponseBody::parse(remaining)?;
                Ok((remaining, SPNEGOToken::Response(body)))
            },
            _ => Err(Error(nom::error::Error::new(bytes, ErrorKind::Tag)))
        }
    }

    /// Encodes the token; with `header` the body is wrapped in the GSS-API
    /// `[APPLICATION 0]` framing carrying the SPNEGO OID.
    pub fn as_bytes(&self, header: bool) -> SMBResult<Vec<u8>> {
        let bytes = match self {
            SPNEGOToken::Init(x) => x.as_bytes(),
            SPNEGOToken::Init2(x) => x.as_bytes()?,
            SPNEGOToken::Response(x) => x.as_bytes(),
        };
        if header {
            let token = [encode_tlv(DER_ENCODING_OID_TAG, &SPNEGO_ID), bytes].concat();
            Ok(encode_tlv(APPLICATION_TAG, &token))
        } else {
            Ok(bytes)
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::util::auth::spnego::NegotiateState;

    use super::*;

    const NTLM_OID: [u8; 10] = [0x2b, 0x06, 0x01, 0x04, 0x01, 0x82, 0x37, 0x02, 0x02, 0x0a];

    #[test]
    fn wrapped_init_round_trip() {
        let token = SPNEGOToken::Init(SPNEGOTokenInitBody::new(vec![NTLM_OID.to_vec()], Some(vec![1, 2, 3])));
        let bytes = token.as_bytes(true).unwrap();
        assert_eq!(&bytes[..4], &[APPLICATION_TAG, (bytes.len() - 2) as u8, DER_ENCODING_OID_TAG, 0x06]);
        let (remaining, parsed) = SPNEGOToken::parse(&bytes).unwrap();
        assert!(remaining.is_empty());
        assert_eq!(parsed, token);
    }

    #[test]
    fn bare_response_round_trip() {
        let token = SPNEGOToken::Response(SPNEGOTokenResponseBody::new(NegotiateState::AcceptIncomplete, None, Some(vec![9; 4])));
        let bytes = token.as_bytes(false).unwrap();
        assert_eq!(bytes[0], NEG_TOKEN_RESP_TAG);
        let (_, parsed) = SPNEGOToken::parse(&bytes).unwrap();
        assert_eq!(parsed, token);
    }

    #[test]
    fn init2_parses_as_init() {
        let bytes = SPNEGOToken::Init2(SPNEGOTokenInit2Body::new(vec![NTLM_OID.to_vec()])).as_bytes(true).unwrap();
        match SPNEGOToken::parse(&bytes).unwrap().1 {
            SPNEGOToken::Init(body) => assert_eq!(body.mech_type_list, vec![NTLM_OID.to_vec()]),
            other => panic!("unexpected token {other:?}"),
        }
    }

    #[test]
    fn rejects_other_oids_and_raw_ntlm() {
        let mut bytes = SPNEGOToken::Init(SPNEGOTokenInitBody::new(vec![NTLM_OID.to_vec()], None)).as_bytes(true).unwrap();
        bytes[4] = 0x2a;
        assert!(SPNEGOToken::parse(&bytes).is_err());
        assert!(SPNEGOToken::parse(b"NTLMSSP\0\x01\x00\x00\x00").is_err());
        assert!(SPNEGOToken::parse(&[]).is_err());
    }
}
