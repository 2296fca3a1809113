use derive_builder::Builder;
use serde::{Deserialize, Serialize};

use smb_core::logging::{debug, trace};
use smb_core::nt_status::NTStatus;

use crate::util::auth::{AuthProvider, GssAttributeName, GssAttributeValue, MechanismContext, User};
use crate::util::auth::ntlm::av_pair::AvPairSequence;
use crate::util::auth::ntlm::{NTLMChallengeMessageBody, NTLMMessage, NTLMNegotiateMessageBody};
use crate::util::auth::ntlm::ntlm_message::NTLMNegotiateFlags;
use crate::util::auth::ntlm::ntlm_version::NTLMVersion;
use crate::util::filetime::FileTime;

/// 1.3.6.1.4.1.311.2.2.10
pub const NTLM_OID: [u8; 10] = [0x2b, 0x06, 0x01, 0x04, 0x01, 0x82, 0x37, 0x02, 0x02, 0x0a];

pub const DEFAULT_SERVER_NAME: &str = "SMBSERVER";
pub const DEFAULT_DOMAIN_NAME: &str = "WORKGROUP";

/// Server side NTLM. Holds configuration only; each exchange keeps its own
/// [`NTLMAuthContext`].
#[derive(Debug, Clone, Builder, Serialize, Deserialize)]
#[builder(pattern = "owned")]
pub struct NTLMAuthProvider {
    #[builder(default)]
    accepted_users: Vec<User>,
    #[builder(default)]
    guest_supported: bool,
    /// NetBIOS computer name, also sent as the target name.
    #[builder(default = "String::from(DEFAULT_SERVER_NAME)", setter(into))]
    server_name: String,
    #[builder(default = "String::from(DEFAULT_DOMAIN_NAME)", setter(into))]
    domain_name: String,
    #[builder(default, setter(into, strip_option))]
    dns_server_name: Option<String>,
    #[builder(default, setter(into, strip_option))]
    dns_domain_name: Option<String>,
    #[builder(default)]
    version: NTLMVersion,
}

impl NTLMAuthProvider {
    pub fn new(accepted_users: Vec<User>, guest_supported: bool) -> Self {
        Self {
            accepted_users,
            guest_supported,
            server_name: DEFAULT_SERVER_NAME.into(),
            domain_name: DEFAULT_DOMAIN_NAME.into(),
            dns_server_name: None,
            dns_domain_name: None,
            version: NTLMVersion::default(),
        }
    }

    pub fn accepted_users(&self) -> &[User] {
        &self.accepted_users
    }

    pub fn guest_supported(&self) -> bool {
        self.guest_supported
    }

    fn target_info(&self, timestamp: Option<FileTime>) -> AvPairSequence {
        let dns_server_name = self.dns_server_name.clone()
            .unwrap_or_else(|| self.server_name.to_lowercase());
        let dns_domain_name = self.dns_domain_name.clone()
            .unwrap_or_else(|| self.domain_name.to_lowercase());
        AvPairSequence::server_target_info(&self.domain_name, &self.server_name, &dns_domain_name, &dns_server_name, timestamp)
    }

    fn accept_negotiate(&self, context: &mut Option<MechanismContext>, negotiate: NTLMNegotiateMessageBody) -> (NTStatus, Option<Vec<u8>>) {
        let awaiting_negotiate = match context {
            None => true,
            Some(MechanismContext::Ntlm(ctx)) => ctx.state == NTLMAuthState::AwaitingNegotiate,
        };
        if !awaiting_negotiate {
            debug!("NTLM negotiate received out of sequence");
            return (NTStatus::SecEInvalidToken, None);
        }

        let negotiate_flags = negotiate.challenge_flags();
        let timestamp = negotiate_flags.contains(NTLMNegotiateFlags::EXTENDED_SESSION_SECURITY)
            .then(FileTime::now);
        let challenge = NTLMChallengeMessageBody::new(&self.server_name, negotiate_flags, self.target_info(timestamp), Some(self.version));
        trace!(flags = ?negotiate_flags, "Sending NTLM challenge");

        let ntlm_context = NTLMAuthContext {
            state: NTLMAuthState::AwaitingAuthenticate,
            negotiate_flags,
            server_challenge: challenge.server_challenge,
            ..Default::default()
        };
        match NTLMMessage::Challenge(challenge).as_bytes() {
            Ok(token) => {
                *context = Some(MechanismContext::Ntlm(ntlm_context));
                (NTStatus::SecIContinueNeeded, Some(token))
            },
            Err(_) => (NTStatus::SecEInvalidToken, None),
        }
    }
}

impl AuthProvider for NTLMAuthProvider {
    fn get_oid(&self) -> &[u8] {
        &NTLM_OID
    }

    fn accept_security_context(&self, context: &mut Option<MechanismContext>, input_token: &[u8]) -> (NTStatus, Option<Vec<u8>>) {
        let message = match NTLMMessage::parse(input_token) {
            Ok((_, message)) => message,
            Err(_err) => {
                debug!(error = %_err, "Unparsable NTLM token");
                return (NTStatus::SecEInvalidToken, None);
            }
        };

        match message {
            NTLMMessage::Negotiate(negotiate) => self.accept_negotiate(context, negotiate),
            NTLMMessage::Authenticate(authenticate) => {
                let Some(MechanismContext::Ntlm(ctx)) = context.as_mut() else {
                    debug!("NTLM authenticate received without a challenge");
                    return (NTStatus::SecEInvalidToken, None);
                };
                if ctx.state != NTLMAuthState::AwaitingAuthenticate {
                    debug!(state = ?ctx.state, "NTLM authenticate received out of sequence");
                    return (NTStatus::SecEInvalidToken, None);
                }
                let status = authenticate.authenticate(ctx, &self.accepted_users, self.guest_supported);
                ctx.state = if status == NTStatus::StatusSuccess {
                    NTLMAuthState::Completed
                } else {
                    NTLMAuthState::Failed
                };
                (status, None)
            },
            NTLMMessage::Challenge(_) => {
                debug!("NTLM challenge sent to a server");
                (NTStatus::SecEInvalidToken, None)
            },
        }
    }

    fn get_context_attribute(&self, context: &MechanismContext, name: GssAttributeName) -> Option<GssAttributeValue> {
        let MechanismContext::Ntlm(ctx) = context;
        match name {
            GssAttributeName::DomainName => ctx.domain_name.clone().map(GssAttributeValue::String),
            GssAttributeName::UserName => ctx.user_name.clone().map(GssAttributeValue::String),
            GssAttributeName::MachineName => ctx.workstation.clone().map(GssAttributeValue::String),
            GssAttributeName::OsVersion => ctx.version.map(|version| GssAttributeValue::String(version.to_string())),
            GssAttributeName::IsGuest => Some(GssAttributeValue::Bool(ctx.guest)),
            GssAttributeName::IsAnonymous => Some(GssAttributeValue::Bool(ctx.anonymous)),
            GssAttributeName::SessionKey => ctx.session_key.clone().map(GssAttributeValue::Bytes),
        }
    }

    fn delete_security_context(&self, context: &mut Option<MechanismContext>) -> bool {
        context.take().is_some()
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum NTLMAuthState {
    #[default]
    AwaitingNegotiate,
    AwaitingAuthenticate,
    Completed,
    Failed,
}

/// Per-exchange NTLM state.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct NTLMAuthContext {
    pub(crate) state: NTLMAuthState,
    pub(crate) negotiate_flags: NTLMNegotiateFlags,
    pub(crate) server_challenge: [u8; 8],
    pub(crate) domain_name: Option<String>,
    pub(crate) user_name: Option<String>,
    pub(crate) workstation: Option<String>,
    pub(crate) version: Option<NTLMVersion>,
    pub(crate) guest: bool,
    pub(crate) anonymous: bool,
    pub(crate) session_key: Option<Vec<u8>>,
}

impl NTLMAuthContext {
    pub fn state(&self) -> NTLMAuthState {
        self.state
    }

    pub fn negotiate_flags(&self) -> NTLMNegotiateFlags {
        self.negotiate_flags
    }

    pub fn server_challenge(&self) -> &[u8; 8] {
        &self.server_challenge
    }

    pub fn user_name(&self) -> Option<&str> {
        self.user_name.as_deref()
    }

    pub fn is_guest(&self) -> bool {
        self.guest
    }

    pub fn session_key(&self) -> Option<&[u8]> {
        self.session_key.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use crate::util::auth::ntlm::av_pair::AvPairKey;
    use crate::util::auth::ntlm::NTLMAuthenticateMessageBody;
    use crate::util::crypto::ntlm_v1::compute_ntlmv1_response;

    use super::*;

    fn provider() -> NTLMAuthProvider {
        NTLMAuthProviderBuilder::default()
            .accepted_users(vec![User::new("User".into(), "Password".into())])
            .server_name("FILESRV")
            .domain_name("CORP")
            .dns_domain_name("corp.example.com")
            .build()
            .unwrap()
    }

    fn negotiate_token() -> Vec<u8> {
        NTLMNegotiateMessageBody::new(NTLMNegotiateFlags::UNICODE_ENCODING | NTLMNegotiateFlags::EXTENDED_SESSION_SECURITY).as_bytes().unwrap()
    }

    fn challenge_for(context: &Option<MechanismContext>) -> [u8; 8] {
        match context {
            Some(MechanismContext::Ntlm(ctx)) => ctx.server_challenge,
            None => panic!("no context"),
        }
    }

    #[test]
    fn builder_defaults() {
        let provider = NTLMAuthProviderBuilder::default().build().unwrap();
        assert_eq!(provider.server_name, DEFAULT_SERVER_NAME);
        assert_eq!(provider.domain_name, DEFAULT_DOMAIN_NAME);
        assert!(!provider.guest_supported());
        assert_eq!(provider.version, NTLMVersion::default());
        assert_eq!(provider.get_oid(), NTLM_OID);
    }

    #[test]
    fn negotiate_yields_challenge() {
        let provider = provider();
        let mut context = None;
        let (status, token) = provider.accept_security_context(&mut context, &negotiate_token());
        assert_eq!(status, NTStatus::SecIContinueNeeded);

        let (_, message) = NTLMMessage::parse(&token.unwrap()).unwrap();
        let NTLMMessage::Challenge(challenge) = message else {
            panic!("expected a challenge");
        };
        assert_eq!(challenge.target_name().unwrap(), "FILESRV");
        assert_eq!(challenge.server_challenge, challenge_for(&context));
        assert!(challenge.target_info.contains(AvPairKey::Timestamp));
        assert_eq!(challenge.target_info.get(AvPairKey::DnsComputerName), Some(&crate::byte_helper::utf16_bytes("filesrv")[..]));
        assert_eq!(challenge.target_info.get(AvPairKey::DnsDomainName), Some(&crate::byte_helper::utf16_bytes("corp.example.com")[..]));
    }

    #[test]
    fn full_v1_exchange() {
        let provider = provider();
        let mut context = None;
        provider.accept_security_context(&mut context, &negotiate_token());
        let server_challenge = challenge_for(&context);

        let authenticate = NTLMAuthenticateMessageBody {
            negotiate_flags: NTLMNegotiateFlags::UNICODE_ENCODING,
            nt_challenge_response: compute_ntlmv1_response(&server_challenge, "Password").unwrap().to_vec(),
            domain_name: "CORP".into(),
            user_name: "User".into(),
            workstation: "DESKTOP".into(),
            ..Default::default()
        };
        let (status, token) = provider.accept_security_context(&mut context, &authenticate.as_bytes().unwrap());
        assert_eq!(status, NTStatus::StatusSuccess);
        assert!(token.is_none());

        let ctx = context.as_ref().unwrap();
        let attribute = |name| provider.get_context_attribute(ctx, name);
        assert_eq!(attribute(GssAttributeName::UserName), Some(GssAttributeValue::String("User".into())));
        assert_eq!(attribute(GssAttributeName::MachineName), Some(GssAttributeValue::String("DESKTOP".into())));
        assert_eq!(attribute(GssAttributeName::IsGuest), Some(GssAttributeValue::Bool(false)));
        assert_eq!(attribute(GssAttributeName::SessionKey).and_then(|key| key.as_bytes().map(<[u8]>::len)), Some(16));

        // A completed exchange accepts nothing further.
        let (status, _) = provider.accept_security_context(&mut context, &authenticate.as_bytes().unwrap());
        assert_eq!(status, NTStatus::SecEInvalidToken);
    }

    #[test]
    fn failed_logon_is_terminal() {
        let provider = provider();
        let mut context = None;
        provider.accept_security_context(&mut context, &negotiate_token());
        let authenticate = NTLMAuthenticateMessageBody {
            nt_challenge_response: vec![0x55; 24],
            user_name: "User".into(),
            ..Default::default()
        };
        let (status, _) = provider.accept_security_context(&mut context, &authenticate.as_bytes().unwrap());
        assert_eq!(status, NTStatus::StatusLogonFailure);
        let Some(MechanismContext::Ntlm(ctx)) = &context else { panic!("no context") };
        assert_eq!(ctx.state(), NTLMAuthState::Failed);

        let (status, _) = provider.accept_security_context(&mut context, &negotiate_token());
        assert_eq!(status, NTStatus::SecEInvalidToken);
    }

    #[test]
    fn out_of_order_and_garbage_are_invalid() {
        let provider = provider();
        let mut context = None;
        let authenticate = NTLMAuthenticateMessageBody::default().as_bytes().unwrap();
        assert_eq!(provider.accept_security_context(&mut context, &authenticate).0, NTStatus::SecEInvalidToken);
        assert_eq!(provider.accept_security_context(&mut context, b"NTLMSSP\0\x09\x00\x00\x00").0, NTStatus::SecEInvalidToken);
        assert!(context.is_none());

        provider.accept_security_context(&mut context, &negotiate_token());
        assert_eq!(provider.accept_security_context(&mut context, &negotiate_token()).0, NTStatus::SecEInvalidToken);
    }

    #[test]
    fn delete_is_idempotent() {
        let provider = provider();
        let mut context = None;
        provider.accept_security_context(&mut context, &negotiate_token());
        assert!(provider.delete_security_context(&mut context));
        assert!(!provider.delete_security_context(&mut context));
    }
}
