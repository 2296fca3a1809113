mod ntlm_auth_provider;
mod ntlm_authenticate_message;
mod ntlm_challenge_message;
mod ntlm_message;
mod ntlm_negotiate_message;

pub mod av_pair;
pub mod ntlm_v2_client_challenge;
pub mod ntlm_version;

pub use ntlm_auth_provider::{DEFAULT_DOMAIN_NAME, DEFAULT_SERVER_NAME, NTLM_OID, NTLMAuthProviderBuilder, NTLMAuthProviderBuilderError, NTLMAuthState};
pub use ntlm_authenticate_message::{is_ntlm_v1_extended_session_security, is_ntlm_v2_nt_response};
pub use ntlm_message::{get_message_type, is_signature_valid, NTLM_MESSAGE_PREFIX_LEN, NTLMMessageType, NTLMSSP_SIGNATURE};

pub type NTLMAuthProvider = ntlm_auth_provider::NTLMAuthProvider;
pub type NTLMAuthContext = ntlm_auth_provider::NTLMAuthContext;
pub type NTLMMessage = ntlm_message::NTLMMessage;
pub type NTLMNegotiateFlags = ntlm_message::NTLMNegotiateFlags;
pub type NTLMNegotiateMessageBody = ntlm_negotiate_message::NTLMNegotiateMessageBody;
pub type NTLMChallengeMessageBody = ntlm_challenge_message::NTLMChallengeMessageBody;
pub type NTLMAuthenticateMessageBody = ntlm_authenticate_message::NTLMAuthenticateMessageBody;
