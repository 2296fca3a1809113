use nom::bytes::complete::take;
use nom::IResult;
use nom::number::complete::le_u32;
use rand::RngCore;
use rand::rngs::ThreadRng;
use serde::{Deserialize, Serialize};

use smb_core::SMBResult;

use crate::byte_helper::u32_to_bytes;
use crate::util::auth::ntlm::av_pair::AvPairSequence;
use crate::util::auth::ntlm::ntlm_message::{decode_string, encode_string, message_prefix, NTLMBufferPointer, NTLMMessageType, NTLMNegotiateFlags, NTLMPayloadWriter, parse_message_prefix};
use crate::util::auth::ntlm::ntlm_version::NTLMVersion;

const CHALLENGE_HEADER_LEN: usize = 48;
const CHALLENGE_HEADER_WITH_VERSION_LEN: usize = 56;

/// CHALLENGE_MESSAGE (type 2). The target name is kept as raw payload bytes
/// since its encoding depends on the negotiated flags.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NTLMChallengeMessageBody {
    target_name: Vec<u8>,
    pub negotiate_flags: NTLMNegotiateFlags,
    pub server_challenge: [u8; 8],
    pub target_info: AvPairSequence,
    pub version: Option<NTLMVersion>,
}

impl NTLMChallengeMessageBody {
    /// A challenge with a fresh random server challenge.
    pub fn new(target_name: &str, negotiate_flags: NTLMNegotiateFlags, target_info: AvPairSequence, version: Option<NTLMVersion>) -> Self {
        let mut server_challenge = [0_u8; 8];
        ThreadRng::default().fill_bytes(&mut server_challenge);
        Self::with_challenge(target_name, negotiate_flags, server_challenge, target_info, version)
    }

    pub fn with_challenge(target_name: &str, negotiate_flags: NTLMNegotiateFlags, server_challenge: [u8; 8], target_info: AvPairSequence, version: Option<NTLMVersion>) -> Self {
        Self {
            target_name: encode_string(target_name, negotiate_flags),
            negotiate_flags,
            server_challenge,
            target_info,
            version,
        }
    }

    pub fn target_name(&self) -> SMBResult<String> {
        decode_string(&self.target_name, self.negotiate_flags)
    }

    pub fn parse(bytes: &[u8]) -> IResult<&[u8], Self> {
        let (remaining, _) = parse_message_prefix(bytes, NTLMMessageType::Challenge)?;
        let (remaining, target_name_pointer) = NTLMBufferPointer::parse(remaining)?;
        let (remaining, flags) = le_u32(remaining)?;
        let negotiate_flags = NTLMNegotiateFlags::from_bits_retain(flags);
        let (remaining, challenge) = take(8_usize)(remaining)?;
        let (remaining, _reserved) = take(8_usize)(remaining)?;
        let (remaining, target_info_pointer) = NTLMBufferPointer::parse(remaining)?;
        let (remaining, version) = if negotiate_flags.contains(NTLMNegotiateFlags::VERSION) {
            let (remaining, version) = NTLMVersion::parse(remaining)?;
            (remaining, Some(version))
        } else {
            (remaining, None)
        };

        let (_, target_name) = target_name_pointer.read(bytes)?;
        let (_, target_info_bytes) = target_info_pointer.read(bytes)?;
        let target_info = if target_info_bytes.is_empty() {
            AvPairSequence::new()
        } else {
            AvPairSequence::parse(target_info_bytes)?.1
        };

        let mut server_challenge = [0_u8; 8];
        server_challenge.copy_from_slice(challenge);
        Ok((remaining, Self {
            target_name: target_name.to_vec(),
            negotiate_flags,
            server_challenge,
            target_info,
            version,
        }))
    }

    pub fn as_bytes(&self) -> SMBResult<Vec<u8>> {
        let target_name = if self.negotiate_flags.contains(NTLMNegotiateFlags::TARGET_NAME_SUPPLIED) {
            self.target_name.clone()
        } else {
            Vec::new()
        };
        let target_info = if self.negotiate_flags.contains(NTLMNegotiateFlags::TARGET_INFO) {
            self.target_info.as_bytes()?
        } else {
            Vec::new()
        };
        let version = self.negotiate_flags.contains(NTLMNegotiateFlags::VERSION)
            .then(|| self.version.unwrap_or_default());
        self.encode(&target_name, &target_info, version)
    }

    fn encode(&self, target_name: &[u8], target_info: &[u8], version: Option<NTLMVersion>) -> SMBResult<Vec<u8>> {
        let header_len = match version {
            Some(_) => CHALLENGE_HEADER_WITH_VERSION_LEN,
            None => CHALLENGE_HEADER_LEN,
        };
        let mut payload = NTLMPayloadWriter::new(header_len);
        let target_name_pointer = payload.add(target_name)?;
        let target_info_pointer = payload.add(target_info)?;
        let version = version.map(|v| v.as_bytes().to_vec()).unwrap_or_default();

        Ok([
            &message_prefix(NTLMMessageType::Challenge)[0..],
            &target_name_pointer.as_bytes(),
            &u32_to_bytes(self.negotiate_flags.bits()),
            &self.server_challenge,
            &[0; 8],
            &target_info_pointer.as_bytes(),
            &version,
            &payload.into_payload(),
        ].concat())
    }
}
