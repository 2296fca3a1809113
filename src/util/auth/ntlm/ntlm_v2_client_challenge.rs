use nom::bytes::complete::take;
use nom::Err::Error;
use nom::error::ErrorKind;
use nom::IResult;
use nom::number::complete::{le_u64, le_u8};

use smb_core::SMBResult;

use crate::byte_helper::u64_to_bytes;
use crate::util::auth::ntlm::av_pair::AvPairSequence;
use crate::util::filetime::FileTime;

pub const NTLMV2_CLIENT_CHALLENGE_VERSION: u8 = 0x01;
/// Fixed fields plus an empty AV-pair list.
pub const NTLMV2_CLIENT_CHALLENGE_MIN_LENGTH: usize = 32;

/// NTLMv2_CLIENT_CHALLENGE: everything in an NTLMv2 NT response after the
/// 16-byte NTProofStr.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NTLMv2ClientChallenge {
    pub timestamp: FileTime,
    pub client_challenge: [u8; 8],
    pub av_pairs: AvPairSequence,
}

impl NTLMv2ClientChallenge {
    pub fn new(timestamp: FileTime, client_challenge: [u8; 8], av_pairs: AvPairSequence) -> Self {
        Self { timestamp, client_challenge, av_pairs }
    }

    pub fn parse(bytes: &[u8]) -> IResult<&[u8], Self> {
        let (remaining, resp_type) = le_u8(bytes)?;
        let (remaining, hi_resp_type) = le_u8(remaining)?;
        if resp_type != NTLMV2_CLIENT_CHALLENGE_VERSION || hi_resp_type != NTLMV2_CLIENT_CHALLENGE_VERSION {
            return Err(Error(nom::error::Error::new(bytes, ErrorKind::Verify)));
        }
        let (remaining, _) = take(6_usize)(remaining)?;
        let (remaining, timestamp) = le_u64(remaining)?;
        let (remaining, client_challenge) = take(8_usize)(remaining)?;
        let (remaining, _) = take(4_usize)(remaining)?;
        let (remaining, av_pairs) = AvPairSequence::parse(remaining)?;

        let mut challenge = [0_u8; 8];
        challenge.copy_from_slice(client_challenge);
        Ok((remaining, Self {
            timestamp: FileTime::from_intervals(timestamp),
            client_challenge: challenge,
            av_pairs,
        }))
    }

    /// The bytes hashed into NTProofStr, including the 4 zero bytes that
    /// follow the AV-pairs.
    pub fn as_bytes(&self) -> SMBResult<Vec<u8>> {
        Ok([
            &[NTLMV2_CLIENT_CHALLENGE_VERSION, NTLMV2_CLIENT_CHALLENGE_VERSION][0..],
            &[0; 6],
            &u64_to_bytes(self.timestamp.intervals()),
            &self.client_challenge,
            &[0; 4],
            &self.av_pairs.as_bytes()?,
            &[0; 4],
        ].concat())
    }
}
