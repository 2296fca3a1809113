use smb_core::nt_status::NTStatus;
pub use user::*;

use crate::util::auth::ntlm::NTLMAuthContext;

pub mod gss;
pub mod ntlm;
pub mod spnego;
mod user;

/// A pluggable authentication mechanism, as driven by the GSS engine.
///
/// Providers are shared read-only across every connection, so all per-exchange
/// state lives in the [`MechanismContext`] the engine hands back on each call.
pub trait AuthProvider: Send + Sync {
    /// The DER encoded object identifier (without tag and length) advertised
    /// in SPNEGO mechanism lists.
    fn get_oid(&self) -> &[u8];

    /// Consumes one token from the peer, advancing `context` (created when
    /// `None`), and returns the status with an optional token to send back.
    fn accept_security_context(&self, context: &mut Option<MechanismContext>, input_token: &[u8]) -> (NTStatus, Option<Vec<u8>>);

    fn get_context_attribute(&self, context: &MechanismContext, name: GssAttributeName) -> Option<GssAttributeValue>;

    /// Drops the mechanism state. Returns `false` when there was none.
    fn delete_security_context(&self, context: &mut Option<MechanismContext>) -> bool;
}

/// Mechanism-owned state of one authentication exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum MechanismContext {
    Ntlm(NTLMAuthContext),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GssAttributeName {
    DomainName,
    UserName,
    MachineName,
    OsVersion,
    IsGuest,
    IsAnonymous,
    SessionKey,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GssAttributeValue {
    String(String),
    Bool(bool),
    Bytes(Vec<u8>),
}

impl GssAttributeValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Self::Bytes(value) => Some(value),
            _ => None,
        }
    }
}
