//! The GSS-API style acceptor an SMB server drives from SESSION_SETUP.

mod gss_context;
mod gss_provider;
mod mechanism_registry;

pub use gss_context::GssContext;
pub use gss_provider::{GssAcceptResult, GssProvider};
pub use mechanism_registry::MechanismRegistry;
