use std::fmt::{Display, Formatter};

use nom::bytes::complete::take;
use nom::IResult;
use nom::number::complete::{le_u16, le_u8};
use serde::{Deserialize, Serialize};

use crate::byte_helper::u16_to_bytes;

pub const NTLMSSP_REVISION_W2K3: u8 = 0x0F;

/// The VERSION structure: the sender's OS version, for debugging only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NTLMVersion {
    pub major: u8,
    pub minor: u8,
    pub build: u16,
    pub revision: u8,
}

impl NTLMVersion {
    pub fn new(major: u8, minor: u8, build: u16) -> Self {
        Self { major, minor, build, revision: NTLMSSP_REVISION_W2K3 }
    }

    pub fn parse(bytes: &[u8]) -> IResult<&[u8], Self> {
        let (remaining, major) = le_u8(bytes)?;
        let (remaining, minor) = le_u8(remaining)?;
        let (remaining, build) = le_u16(remaining)?;
        let (remaining, _) = take(3_usize)(remaining)?;
        let (remaining, revision) = le_u8(remaining)?;
        Ok((remaining, Self { major, minor, build, revision }))
    }

    pub fn as_bytes(&self) -> [u8; 8] {
        let build = u16_to_bytes(self.build);
        [self.major, self.minor, build[0], build[1], 0, 0, 0, self.revision]
    }
}

/// Windows 7 / Server 2008 R2.
impl Default for NTLMVersion {
    fn default() -> Self {
        Self::new(6, 1, 7600)
    }
}

impl Display for NTLMVersion {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.build)
    }
}
