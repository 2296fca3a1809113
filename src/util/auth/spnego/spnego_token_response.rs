use nom::Err::Error;
use nom::error::ErrorKind;
use nom::IResult;
use nom::number::complete::le_u8;
use num_enum::TryFromPrimitive;
use serde::{Deserialize, Serialize};

use smb_core::nt_status::NTStatus;

use crate::util::auth::spnego::der_utils::{DER_ENCODING_BYTE_ARRAY_TAG, DER_ENCODING_ENUM_TAG, DER_ENCODING_OID_TAG, DER_ENCODING_SEQUENCE_TAG, encode_der_bytes, encode_tlv, MECH_LIST_MIC_TAG, NEG_STATE_TAG, NEG_TOKEN_RESP_TAG, parse_der_byte_array, parse_der_enum, parse_der_oid, parse_field_with_len, parse_tagged, RESPONSE_TOKEN_TAG, SUPPORTED_MECH_TAG};

#[repr(u8)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, TryFromPrimitive, Deserialize, Serialize)]
pub enum NegotiateState {
    AcceptCompleted = 0x0,
    AcceptIncomplete,
    Reject,
    RequestMic,
}

impl From<NTStatus> for NegotiateState {
    fn from(status: NTStatus) -> Self {
        match status {
            NTStatus::StatusSuccess => Self::AcceptCompleted,
            NTStatus::SecIContinueNeeded => Self::AcceptIncomplete,
            _ => Self::Reject,
        }
    }
}

/// `negTokenResp`, sent by the acceptor on every leg after the first.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SPNEGOTokenResponseBody {
    pub neg_state: Option<NegotiateState>,
    pub supported_mech: Option<Vec<u8>>,
    pub response_token: Option<Vec<u8>>,
    pub mech_list_mic: Option<Vec<u8>>,
}

impl SPNEGOTokenResponseBody {
    pub fn new(neg_state: NegotiateState, supported_mech: Option<Vec<u8>>, response_token: Option<Vec<u8>>) -> Self {
        Self {
            neg_state: Some(neg_state),
            supported_mech,
            response_token,
            mech_list_mic: None,
        }
    }

    /// Parses the body following the `[1]` choice tag.
    pub fn parse(bytes: &[u8]) -> IResult<&[u8], Self> {
        let (remaining, construction) = parse_field_with_len(bytes)?;
        let (_, mut sequence) = parse_tagged(construction, DER_ENCODING_SEQUENCE_TAG)?;

        let mut body = Self::default();
        while !sequence.is_empty() {
            let (s, tag) = le_u8(sequence)?;
            sequence = s;
            match tag {
                NEG_STATE_TAG => {
                    let (s, state) = parse_der_enum(sequence)?;
                    sequence = s;
                    let state = NegotiateState::try_from_primitive(state)
                        .map_err(|_| Error(nom::error::Error::new(sequence, ErrorKind::Verify)))?;
                    body.neg_state = Some(state);
                },
                SUPPORTED_MECH_TAG => {
                    let (s, mech) = parse_der_oid(sequence)?;
                    sequence = s;
                    body.supported_mech = Some(mech);
                },
                RESPONSE_TOKEN_TAG => {
                    let (s, token) = parse_der_byte_array(sequence)?;
                    sequence = s;
                    body.response_token = Some(token);
                },
                MECH_LIST_MIC_TAG => {
                    let (s, mic) = parse_der_byte_array(sequence)?;
                    sequence = s;
                    body.mech_list_mic = Some(mic);
                },
                _ => return Err(Error(nom::error::Error::new(sequence, ErrorKind::Tag))),
            }
        }
        smb_core::logging::trace!(?body.neg_state, has_token = body.response_token.is_some(), "parsed negTokenResp");
        Ok((remaining, body))
    }

    pub fn as_bytes(&self) -> Vec<u8> {
        let mut fields = Vec::new();
        if let Some(state) = self.neg_state {
            fields.append(&mut encode_tlv(NEG_STATE_TAG, &encode_tlv(DER_ENCODING_ENUM_TAG, &[state as u8])));
        }
        if let Some(supported_mech) = &self.supported_mech {
            fields.append(&mut encode_der_bytes(supported_mech, SUPPORTED_MECH_TAG, DER_ENCODING_OID_TAG, 0));
        }
        if let Some(response_token) = &self.response_token {
            fields.append(&mut encode_der_bytes(response_token, RESPONSE_TOKEN_TAG, DER_ENCODING_BYTE_ARRAY_TAG, 0));
        }
        if let Some(mech_list_mic) = &self.mech_list_mic {
            fields.append(&mut encode_der_bytes(mech_list_mic, MECH_LIST_MIC_TAG, DER_ENCODING_BYTE_ARRAY_TAG, 0));
        }
        encode_tlv(NEG_TOKEN_RESP_TAG, &encode_tlv(DER_ENCODING_SEQUENCE_TAG, &fields))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_maps_to_neg_state() {
        assert_eq!(NegotiateState::from(NTStatus::StatusSuccess), NegotiateState::AcceptCompleted);
        assert_eq!(NegotiateState::from(NTStatus::SecIContinueNeeded), NegotiateState::AcceptIncomplete);
        assert_eq!(NegotiateState::from(NTStatus::StatusLogonFailure), NegotiateState::Reject);
        assert_eq!(NegotiateState::from(NTStatus::SecEInvalidToken), NegotiateState::Reject);
    }

    #[test]
    fn accept_completed_without_token() {
        let body = SPNEGOTokenResponseBody::new(NegotiateState::AcceptCompleted, None, None);
        assert_eq!(body.as_bytes(), [0xA1, 0x07, 0x30, 0x05, 0xA0, 0x03, 0x0A, 0x01, 0x00]);
    }

    #[test]
    fn encode_then_parse() {
        let body = SPNEGOTokenResponseBody::new(
            NegotiateState::AcceptIncomplete,
            Some(vec![0x2b, 0x06, 0x01, 0x04, 0x01, 0x82, 0x37, 0x02, 0x02, 0x0a]),
            Some(vec![0xAB; 300]),
        );
        let bytes = body.as_bytes();
        let (remaining, parsed) = SPNEGOTokenResponseBody::parse(&bytes[1..]).unwrap();
        assert!(remaining.is_empty());
        assert_eq!(parsed, body);
    }

    #[test]
    fn invalid_neg_state_fails() {
        let bytes = [0x07, 0x30, 0x05, 0xA0, 0x03, 0x0A, 0x01, 0x09];
        assert!(SPNEGOTokenResponseBody::parse(&bytes).is_err());
    }
}
