use bitflags::bitflags;
use nom::bytes::complete::take;
use nom::Err::Error;
use nom::error::ErrorKind;
use nom::IResult;
use nom::number::complete::{le_u16, le_u32};
use num_enum::TryFromPrimitive;
use serde::{Deserialize, Serialize};

use smb_core::{SMBParseResult, SMBResult};
use smb_core::error::SMBError;

use crate::byte_helper::{bytes_to_u32, u16_to_bytes, u32_to_bytes, utf16_bytes, utf16_string};
use crate::util::auth::ntlm::{NTLMAuthenticateMessageBody, NTLMChallengeMessageBody, NTLMNegotiateMessageBody};
use crate::util::crypto::oem::{oem_bytes, oem_string};

pub const NTLMSSP_SIGNATURE: &[u8; 8] = b"NTLMSSP\0";
/// Signature plus message type.
pub const NTLM_MESSAGE_PREFIX_LEN: usize = 12;

#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, TryFromPrimitive, Serialize, Deserialize)]
pub enum NTLMMessageType {
    Negotiate = 0x01,
    Challenge = 0x02,
    Authenticate = 0x03,
}

#[derive(Debug, PartialEq, Eq, Clone)]
pub enum NTLMMessage {
    Negotiate(NTLMNegotiateMessageBody),
    Challenge(NTLMChallengeMessageBody),
    Authenticate(NTLMAuthenticateMessageBody),
}

impl NTLMMessage {
    pub fn parse(bytes: &[u8]) -> SMBParseResult<&[u8], Self> {
        let message_type = get_message_type(bytes)
            .ok_or_else(|| SMBError::parse_error("Not an NTLM message"))?;
        let result = match message_type {
            NTLMMessageType::Negotiate => NTLMNegotiateMessageBody::parse(bytes)
                .map(|(remaining, body)| (remaining, NTLMMessage::Negotiate(body))),
            NTLMMessageType::Challenge => NTLMChallengeMessageBody::parse(bytes)
                .map(|(remaining, body)| (remaining, NTLMMessage::Challenge(body))),
            NTLMMessageType::Authenticate => NTLMAuthenticateMessageBody::parse(bytes)
                .map(|(remaining, body)| (remaining, NTLMMessage::Authenticate(body))),
        };
        result.map_err(SMBError::from)
    }

    pub fn as_bytes(&self) -> SMBResult<Vec<u8>> {
        match self {
            NTLMMessage::Negotiate(msg) => msg.as_bytes(),
            NTLMMessage::Challenge(msg) => msg.as_bytes(),
            NTLMMessage::Authenticate(msg) => msg.as_bytes(),
        }
    }

    pub fn message_type(&self) -> NTLMMessageType {
        match self {
            NTLMMessage::Negotiate(_) => NTLMMessageType::Negotiate,
            NTLMMessage::Challenge(_) => NTLMMessageType::Challenge,
            NTLMMessage::Authenticate(_) => NTLMMessageType::Authenticate,
        }
    }
}

/// True when `bytes` starts with the `NTLMSSP\0` signature and has room for
/// the message type.
pub fn is_signature_valid(bytes: &[u8]) -> bool {
    bytes.len() >= NTLM_MESSAGE_PREFIX_LEN && bytes.starts_with(NTLMSSP_SIGNATURE)
}

pub fn get_message_type(bytes: &[u8]) -> Option<NTLMMessageType> {
    if !is_signature_valid(bytes) {
        return None;
    }
    NTLMMessageType::try_from_primitive(bytes_to_u32(&bytes[8..12])).ok()
}

bitflags! {
    #[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize, Serialize)]
    pub struct NTLMNegotiateFlags: u32 {
        const UNICODE_ENCODING = 0x01;
        const OEM_ENCODING = 0x02;
        const TARGET_NAME_SUPPLIED = 0x04;
        const SIGN = 0x10;
        const SEAL = 0x20;
        const DATAGRAM = 0x40;
        const LAN_MANAGER_SESSION_KEY = 0x80;
        const NTLM_SESSION_SECURITY = 0x200;
        const ANONYMOUS = 0x800;
        const DOMAIN_NAME_SUPPLIED = 0x1000;
        const WORKSTATION_NAME_SUPPLIED = 0x2000;
        const ALWAYS_SIGN = 0x8000;
        const TARGET_TYPE_DOMAIN = 0x10000;
        const TARGET_TYPE_SERVER = 0x20000;
        const EXTENDED_SESSION_SECURITY = 0x80000;
        const IDENTIFY = 0x100000;
        const REQUEST_LM_SESSION_KEY = 0x400000;
        const TARGET_INFO = 0x800000;
        const VERSION = 0x2000000;
        const USE_128_BIT_ENCRYPTION = 0x20000000;
        const KEY_EXCHANGE = 0x40000000;
        const USE_56_BIT_ENCRYPTION = 0x80000000;
    }
}

/// A `(length, max length, offset)` reference into the message payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(crate) struct NTLMBufferPointer {
    length: u16,
    max_length: u16,
    offset: u32,
}

impl NTLMBufferPointer {
    pub(crate) fn parse(bytes: &[u8]) -> IResult<&[u8], Self> {
        let (remaining, length) = le_u16(bytes)?;
        let (remaining, max_length) = le_u16(remaining)?;
        let (remaining, offset) = le_u32(remaining)?;
        Ok((remaining, Self { length, max_length, offset }))
    }

    /// Slices the referenced bytes out of the whole message.
    pub(crate) fn read<'a>(&self, message: &'a [u8]) -> IResult<&'a [u8], &'a [u8]> {
        if self.length == 0 {
            return Ok((message, &message[..0]));
        }
        take(self.offset as usize)(message)
            .and_then(|(remaining, _)| take(self.length as usize)(remaining))
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.length == 0
    }

    pub(crate) fn offset(&self) -> u32 {
        self.offset
    }

    pub(crate) fn as_bytes(&self) -> Vec<u8> {
        [
            &u16_to_bytes(self.length)[0..],
            &u16_to_bytes(self.max_length),
            &u32_to_bytes(self.offset),
        ].concat()
    }
}

/// Lays out payload fields after a fixed header, handing back their pointers.
pub(crate) struct NTLMPayloadWriter {
    header_len: usize,
    payload: Vec<u8>,
}

impl NTLMPayloadWriter {
    pub(crate) fn new(header_len: usize) -> Self {
        Self { header_len, payload: Vec::new() }
    }

    /// Appends `data`, failing when its length does not fit the 16-bit
    /// length fields.
    pub(crate) fn add(&mut self, data: &[u8]) -> SMBResult<NTLMBufferPointer> {
        let length = field_length(data)?;
        let offset = u32::try_from(self.header_len + self.payload.len())
            .map_err(|_| SMBError::precondition_failed("NTLM payload offset exceeds 32 bits"))?;
        self.payload.extend_from_slice(data);
        Ok(NTLMBufferPointer { length, max_length: length, offset })
    }

    pub(crate) fn into_payload(self) -> Vec<u8> {
        self.payload
    }
}

/// Length of a variable NTLM field as carried on the wire.
pub(crate) fn field_length(data: &[u8]) -> SMBResult<u16> {
    u16::try_from(data.len())
        .map_err(|_| SMBError::precondition_failed(format!("NTLM field of {} bytes exceeds 65535", data.len())))
}

pub(crate) fn parse_message_prefix(bytes: &[u8], expected: NTLMMessageType) -> IResult<&[u8], ()> {
    let (remaining, signature) = take(NTLMSSP_SIGNATURE.len())(bytes)?;
    if signature != NTLMSSP_SIGNATURE {
        return Err(Error(nom::error::Error::new(bytes, ErrorKind::Tag)));
    }
    let (remaining, message_type) = le_u32(remaining)?;
    if message_type != expected as u32 {
        return Err(Error(nom::error::Error::new(bytes, ErrorKind::Verify)));
    }
    Ok((remaining, ()))
}

pub(crate) fn message_prefix(message_type: NTLMMessageType) -> Vec<u8> {
    [&NTLMSSP_SIGNATURE[0..], &u32_to_bytes(message_type as u32)].concat()
}

/// Payload strings are UTF-16LE when Unicode was negotiated, OEM otherwise.
pub(crate) fn encode_string(value: &str, flags: NTLMNegotiateFlags) -> Vec<u8> {
    if flags.contains(NTLMNegotiateFlags::UNICODE_ENCODING) {
        utf16_bytes(value)
    } else {
        oem_bytes(value)
    }
}

pub(crate) fn decode_string(bytes: &[u8], flags: NTLMNegotiateFlags) -> SMBResult<String> {
    if flags.contains(NTLMNegotiateFlags::UNICODE_ENCODING) {
        utf16_string(bytes)
    } else {
        Ok(oem_string(bytes))
    }
}
