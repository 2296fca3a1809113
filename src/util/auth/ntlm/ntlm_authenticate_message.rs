use nom::bytes::complete::take;
use nom::Err::Error;
use nom::error::ErrorKind;
use nom::IResult;
use nom::number::complete::le_u32;
use serde::{Deserialize, Serialize};

use smb_core::logging::{debug, warn};
use smb_core::nt_status::NTStatus;
use smb_core::SMBResult;

use crate::byte_helper::u32_to_bytes;
use crate::util::auth::ntlm::ntlm_auth_provider::NTLMAuthContext;
use crate::util::auth::ntlm::ntlm_message::{decode_string, encode_string, message_prefix, NTLMBufferPointer, NTLMMessageType, NTLMNegotiateFlags, NTLMPayloadWriter, parse_message_prefix};
use crate::util::auth::ntlm::ntlm_v2_client_challenge::{NTLMV2_CLIENT_CHALLENGE_MIN_LENGTH, NTLMv2ClientChallenge};
use crate::util::auth::ntlm::ntlm_version::NTLMVersion;
use crate::util::auth::User;
use crate::util::crypto::key_exchange::{exported_session_key, kx_key};
use crate::util::crypto::ntlm_v1::{authenticate_v1, authenticate_v1_extended, lm_hash_v1};
use crate::util::crypto::ntlm_v2::authenticate_v2;

const AUTHENTICATE_HEADER_LEN: usize = 64;
const VERSION_LEN: usize = 8;
const MIC_LEN: usize = 16;

/// AUTHENTICATE_MESSAGE (type 3).
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct NTLMAuthenticateMessageBody {
    pub negotiate_flags: NTLMNegotiateFlags,
    pub lm_challenge_response: Vec<u8>,
    pub nt_challenge_response: Vec<u8>,
    pub domain_name: String,
    pub user_name: String,
    pub workstation: String,
    pub encrypted_random_session_key: Vec<u8>,
    pub version: Option<NTLMVersion>,
    pub mic: Option<[u8; 16]>,
}

impl NTLMAuthenticateMessageBody {
    pub fn parse(bytes: &[u8]) -> IResult<&[u8], Self> {
        let (remaining, _) = parse_message_prefix(bytes, NTLMMessageType::Authenticate)?;
        let (remaining, lm_pointer) = NTLMBufferPointer::parse(remaining)?;
        let (remaining, nt_pointer) = NTLMBufferPointer::parse(remaining)?;
        let (remaining, domain_pointer) = NTLMBufferPointer::parse(remaining)?;
        let (remaining, user_pointer) = NTLMBufferPointer::parse(remaining)?;
        let (remaining, workstation_pointer) = NTLMBufferPointer::parse(remaining)?;
        let (remaining, session_key_pointer) = NTLMBufferPointer::parse(remaining)?;
        let (mut remaining, flags) = le_u32(remaining)?;
        let negotiate_flags = NTLMNegotiateFlags::from_bits_retain(flags);

        // The version and MIC fields are only present when the payload starts
        // after them.
        let payload_start = [lm_pointer, nt_pointer, domain_pointer, user_pointer, workstation_pointer, session_key_pointer]
            .iter()
            .filter(|pointer| !pointer.is_empty())
            .map(|pointer| pointer.offset() as usize)
            .min()
            .unwrap_or(AUTHENTICATE_HEADER_LEN);

        let mut version = None;
        if negotiate_flags.contains(NTLMNegotiateFlags::VERSION) && payload_start >= AUTHENTICATE_HEADER_LEN + VERSION_LEN {
            let (rest, parsed) = NTLMVersion::parse(remaining)?;
            remaining = rest;
            version = Some(parsed);
        }
        let mut mic = None;
        if version.is_some() && payload_start >= AUTHENTICATE_HEADER_LEN + VERSION_LEN + MIC_LEN {
            let (rest, parsed) = take(MIC_LEN)(remaining)?;
            remaining = rest;
            let mut value = [0_u8; MIC_LEN];
            value.copy_from_slice(parsed);
            mic = Some(value);
        }

        let domain_name = read_string(bytes, domain_pointer, negotiate_flags)?;
        let user_name = read_string(bytes, user_pointer, negotiate_flags)?;
        let workstation = read_string(bytes, workstation_pointer, negotiate_flags)?;

        Ok((remaining, Self {
            negotiate_flags,
            lm_challenge_response: lm_pointer.read(bytes)?.1.to_vec(),
            nt_challenge_response: nt_pointer.read(bytes)?.1.to_vec(),
            domain_name,
            user_name,
            workstation,
            encrypted_random_session_key: session_key_pointer.read(bytes)?.1.to_vec(),
            version,
            mic,
        }))
    }

    pub fn as_bytes(&self) -> SMBResult<Vec<u8>> {
        // A MIC cannot be placed without the version field in front of it.
        let version = match (self.version, self.mic) {
            (Some(version), _) => Some(version),
            (None, Some(_)) => Some(NTLMVersion::default()),
            (None, None) => None,
        };
        let mut header_len = AUTHENTICATE_HEADER_LEN;
        if version.is_some() {
            header_len += VERSION_LEN;
        }
        if self.mic.is_some() {
            header_len += MIC_LEN;
        }
        let mut flags = self.negotiate_flags;
        flags.set(NTLMNegotiateFlags::VERSION, version.is_some());

        let domain_name = encode_string(&self.domain_name, flags);
        let user_name = encode_string(&self.user_name, flags);
        let workstation = encode_string(&self.workstation, flags);

        let mut payload = NTLMPayloadWriter::new(header_len);
        let domain_pointer = payload.add(&domain_name)?;
        let user_pointer = payload.add(&user_name)?;
        let workstation_pointer = payload.add(&workstation)?;
        let lm_pointer = payload.add(&self.lm_challenge_response)?;
        let nt_pointer = payload.add(&self.nt_challenge_response)?;
        let session_key_pointer = payload.add(&self.encrypted_random_session_key)?;

        Ok([
            &message_prefix(NTLMMessageType::Authenticate)[0..],
            &lm_pointer.as_bytes(),
            &nt_pointer.as_bytes(),
            &domain_pointer.as_bytes(),
            &user_pointer.as_bytes(),
            &workstation_pointer.as_bytes(),
            &session_key_pointer.as_bytes(),
            &u32_to_bytes(flags.bits()),
            &version.map(|v| v.as_bytes().to_vec()).unwrap_or_default(),
            &self.mic.map(|mic| mic.to_vec()).unwrap_or_default(),
            &payload.into_payload(),
        ].concat())
    }

    /// Anonymous when flagged as such, or when no credentials at all are sent.
    pub fn is_anonymous(&self) -> bool {
        if self.negotiate_flags.contains(NTLMNegotiateFlags::ANONYMOUS) {
            return true;
        }
        self.user_name.is_empty()
            && self.nt_challenge_response.is_empty()
            && (self.lm_challenge_response.is_empty() || self.lm_challenge_response == [0])
    }

    /// Validates the responses against the accepted users and records the
    /// outcome in `context`.
    pub fn authenticate(&self, context: &mut NTLMAuthContext, accepted_users: &[User], guest_supported: bool) -> NTStatus {
        context.domain_name = Some(self.domain_name.clone());
        context.user_name = Some(self.user_name.clone());
        context.workstation = Some(self.workstation.clone());
        context.version = self.version;

        if self.is_anonymous() {
            if guest_supported {
                debug!("Anonymous NTLM logon accepted as guest");
                context.anonymous = true;
                context.guest = true;
                return NTStatus::StatusSuccess;
            }
            warn!("Anonymous NTLM logon rejected");
            return NTStatus::StatusLogonFailure;
        }

        let Some(user) = accepted_users.iter().find(|user| user.matches(&self.user_name)) else {
            if guest_supported {
                debug!(user = %self.user_name, "Unknown NTLM user logged on as guest");
                context.guest = true;
                return NTStatus::StatusSuccess;
            }
            warn!(user = %self.user_name, domain = %self.domain_name, "NTLM logon failed, unknown user");
            return NTStatus::StatusLogonFailure;
        };

        match self.session_key(user, &context.server_challenge) {
            Ok(Some(session_key)) => {
                debug!(user = %self.user_name, "NTLM logon succeeded");
                context.session_key = Some(session_key);
                NTStatus::StatusSuccess
            },
            Ok(None) => {
                warn!(user = %self.user_name, domain = %self.domain_name, "NTLM logon failed, wrong password");
                NTStatus::StatusLogonFailure
            },
            Err(_err) => {
                warn!(user = %self.user_name, error = %_err, "NTLM logon failed, malformed response");
                NTStatus::StatusLogonFailure
            },
        }
    }

    /// Checks the challenge responses for `user` and derives the exported
    /// session key. `None` means the responses did not match.
    fn session_key(&self, user: &User, server_challenge: &[u8; 8]) -> SMBResult<Option<Vec<u8>>> {
        let lm_response = &self.lm_challenge_response;
        let nt_response = &self.nt_challenge_response;

        let key_exchange_key = if is_ntlm_v1_extended_session_security(lm_response) {
            debug!("Validating NTLMv1 with extended session security");
            let Some(session_base_key) = authenticate_v1_extended(&user.password, server_challenge, lm_response, nt_response)? else {
                return Ok(None);
            };
            kx_key(&session_base_key, self.negotiate_flags, lm_response, server_challenge, &lm_hash_v1(&user.password)?)?
        } else if is_ntlm_v2_nt_response(nt_response) {
            debug!("Validating NTLMv2");
            let Some(session_base_key) = authenticate_v2(&self.domain_name, &self.user_name, &user.password, server_challenge, lm_response, nt_response)? else {
                return Ok(None);
            };
            session_base_key
        } else {
            debug!("Validating NTLMv1");
            let Some(session_base_key) = authenticate_v1(&user.password, server_challenge, lm_response, nt_response)? else {
                return Ok(None);
            };
            // A client without an LM response keys the LM session key off its NT response.
            let key_response = if lm_response.is_empty() { nt_response } else { lm_response };
            kx_key(&session_base_key, self.negotiate_flags, key_response, server_challenge, &lm_hash_v1(&user.password)?)?
        };

        Ok(Some(exported_session_key(&key_exchange_key, self.negotiate_flags, &self.encrypted_random_session_key)))
    }
}

fn read_string(message: &[u8], pointer: NTLMBufferPointer, flags: NTLMNegotiateFlags) -> Result<String, nom::Err<nom::error::Error<&[u8]>>> {
    let (_, raw) = pointer.read(message)?;
    decode_string(raw, flags)
        .map_err(|_| Error(nom::error::Error::new(raw, ErrorKind::Verify)))
}

/// With NTLMv1 extended session security the LM response carries the 8-byte
/// client challenge followed by 16 zero bytes.
pub fn is_ntlm_v1_extended_session_security(lm_response: &[u8]) -> bool {
    lm_response.len() == 24
        && lm_response[0..8] != [0; 8]
        && lm_response[8..24] == [0; 16]
}

/// NTLMv1 NT responses are exactly 24 bytes; NTLMv2 ones carry the
/// NTProofStr followed by a well-formed NTLMv2_CLIENT_CHALLENGE.
pub fn is_ntlm_v2_nt_response(nt_response: &[u8]) -> bool {
    nt_response.len() >= 16 + NTLMV2_CLIENT_CHALLENGE_MIN_LENGTH
        && NTLMv2ClientChallenge::parse(&nt_response[16..]).is_ok()
}
