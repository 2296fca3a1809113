//! # SMB Auth
//!
//! The authentication core of an SMB server: a GSS-API style negotiation
//! engine speaking SPNEGO ([RFC 4178](https://www.rfc-editor.org/rfc/rfc4178)),
//! and the NTLM mechanism ([\[MS-NLMP\]](https://learn.microsoft.com/en-us/openspecs/windows_protocols/ms-nlmp/b38c36ed-2804-4868-a9ff-8dd3182128e4))
//! that plugs into it.
//!
//! This crate provides:
//! - **GSS engine** ([`util::auth::gss`]): mechanism registry, SPNEGO token
//!   interpretation, raw NTLM fallback and per-connection security contexts.
//! - **SPNEGO codec** ([`util::auth::spnego`]): DER primitives and the
//!   `negTokenInit`, `negTokenInit2` and `negTokenResp` structures.
//! - **NTLM** ([`util::auth::ntlm`]): wire messages, AV-pairs and the server
//!   side state machine.
//! - **Cryptography** ([`util::crypto`]): LM/NT hashes, DESL, NTLMv1/v2
//!   responses, key exchange, the SP800-108 KDF and SMB2/3 key derivation.
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use smb_auth::util::auth::User;
//! use smb_auth::util::auth::gss::GssProvider;
//! use smb_auth::util::auth::ntlm::NTLMAuthProvider;
//!
//! let provider = GssProvider::new(vec![
//!     Arc::new(NTLMAuthProvider::new(vec![User::new("user".into(), "pass".into())], false)),
//! ]);
//! // Sent to the client in the SMB2 NEGOTIATE response.
//! let _init = provider.negotiate_init2_token();
//!
//! let mut context = None;
//! let security_blob: &[u8] = &[];
//! let result = provider.accept_security_context(context.take(), security_blob);
//! context = result.context;
//! ```

/// Authentication and cryptography.
pub mod util;
mod byte_helper;
