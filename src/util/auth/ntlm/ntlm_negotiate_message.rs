use nom::IResult;
use nom::number::complete::le_u32;
use serde::{Deserialize, Serialize};

use smb_core::SMBResult;

use crate::byte_helper::u32_to_bytes;
use crate::util::auth::ntlm::ntlm_message::{message_prefix, NTLMBufferPointer, NTLMMessageType, NTLMNegotiateFlags, NTLMPayloadWriter, parse_message_prefix};
use crate::util::auth::ntlm::ntlm_version::NTLMVersion;
use crate::util::crypto::oem::{oem_bytes, oem_string};

const NEGOTIATE_HEADER_LEN: usize = 32;
const NEGOTIATE_HEADER_WITH_VERSION_LEN: usize = 40;

/// NEGOTIATE_MESSAGE (type 1). Domain and workstation are always OEM.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct NTLMNegotiateMessageBody {
    pub negotiate_flags: NTLMNegotiateFlags,
    pub domain_name: String,
    pub workstation: String,
    pub version: Option<NTLMVersion>,
}

impl NTLMNegotiateMessageBody {
    pub fn new(negotiate_flags: NTLMNegotiateFlags) -> Self {
        Self {
            negotiate_flags,
            ..Default::default()
        }
    }

    pub fn parse(bytes: &[u8]) -> IResult<&[u8], Self> {
        let (remaining, _) = parse_message_prefix(bytes, NTLMMessageType::Negotiate)?;
        let (remaining, flags) = le_u32(remaining)?;
        let negotiate_flags = NTLMNegotiateFlags::from_bits_retain(flags);
        let (remaining, domain_pointer) = NTLMBufferPointer::parse(remaining)?;
        let (remaining, workstation_pointer) = NTLMBufferPointer::parse(remaining)?;
        let (remaining, version) = if negotiate_flags.contains(NTLMNegotiateFlags::VERSION) {
            let (remaining, version) = NTLMVersion::parse(remaining)?;
            (remaining, Some(version))
        } else {
            (remaining, None)
        };

        let (_, domain_name) = domain_pointer.read(bytes)?;
        let (_, workstation) = workstation_pointer.read(bytes)?;

        Ok((remaining, Self {
            negotiate_flags,
            domain_name: oem_string(domain_name),
            workstation: oem_string(workstation),
            version,
        }))
    }

    pub fn as_bytes(&self) -> SMBResult<Vec<u8>> {
        let header_len = match self.version {
            Some(_) => NEGOTIATE_HEADER_WITH_VERSION_LEN,
            None => NEGOTIATE_HEADER_LEN,
        };
        let mut flags = self.negotiate_flags;
        flags.set(NTLMNegotiateFlags::DOMAIN_NAME_SUPPLIED, !self.domain_name.is_empty());
        flags.set(NTLMNegotiateFlags::WORKSTATION_NAME_SUPPLIED, !self.workstation.is_empty());
        flags.set(NTLMNegotiateFlags::VERSION, self.version.is_some());

        let mut payload = NTLMPayloadWriter::new(header_len);
        let domain_pointer = payload.add(&oem_bytes(&self.domain_name))?;
        let workstation_pointer = payload.add(&oem_bytes(&self.workstation))?;
        let version = self.version.map(|v| v.as_bytes().to_vec()).unwrap_or_default();

        Ok([
            &message_prefix(NTLMMessageType::Negotiate)[0..],
            &u32_to_bytes(flags.bits()),
            &domain_pointer.as_bytes(),
            &workstation_pointer.as_bytes(),
            &version,
            &payload.into_payload(),
        ].concat())
    }

    /// The flags a server answers this request with in its CHALLENGE.
    pub fn challenge_flags(&self) -> NTLMNegotiateFlags {
        fn add_if_present(flags: &mut NTLMNegotiateFlags, original: &NTLMNegotiateFlags, to_add: NTLMNegotiateFlags) {
            if original.contains(to_add) {
                flags.insert(to_add);
            }
        }

        fn add_if_else_present(flags: &mut NTLMNegotiateFlags, original: &NTLMNegotiateFlags, to_add: NTLMNegotiateFlags, fallback: NTLMNegotiateFlags) {
            if original.contains(to_add) {
                flags.insert(to_add);
            } else if original.contains(fallback) {
                flags.insert(fallback);
            }
        }

        let requested = &self.negotiate_flags;
        let mut negotiate_flags = NTLMNegotiateFlags::TARGET_TYPE_SERVER
            | NTLMNegotiateFlags::TARGET_INFO | NTLMNegotiateFlags::TARGET_NAME_SUPPLIED
            | NTLMNegotiateFlags::VERSION | NTLMNegotiateFlags::NTLM_SESSION_SECURITY;

        add_if_else_present(&mut negotiate_flags, requested, NTLMNegotiateFlags::UNICODE_ENCODING, NTLMNegotiateFlags::OEM_ENCODING);
        add_if_else_present(&mut negotiate_flags, requested, NTLMNegotiateFlags::EXTENDED_SESSION_SECURITY, NTLMNegotiateFlags::LAN_MANAGER_SESSION_KEY);

        add_if_present(&mut negotiate_flags, requested, NTLMNegotiateFlags::SIGN);
        add_if_present(&mut negotiate_flags, requested, NTLMNegotiateFlags::SEAL);
        add_if_present(&mut negotiate_flags, requested, NTLMNegotiateFlags::ALWAYS_SIGN);
        if requested.intersects(NTLMNegotiateFlags::SIGN | NTLMNegotiateFlags::SEAL) {
            add_if_present(&mut negotiate_flags, requested, NTLMNegotiateFlags::USE_56_BIT_ENCRYPTION);
            add_if_present(&mut negotiate_flags, requested, NTLMNegotiateFlags::USE_128_BIT_ENCRYPTION);
        }
        add_if_present(&mut negotiate_flags, requested, NTLMNegotiateFlags::KEY_EXCHANGE);

        negotiate_flags
    }
}
