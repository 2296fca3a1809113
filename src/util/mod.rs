/// GSS negotiation, SPNEGO and NTLM.
pub mod auth;
/// NTLM and SMB2/3 cryptographic primitives.
pub mod crypto;
/// Windows FILETIME timestamps.
pub mod filetime;
