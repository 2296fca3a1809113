//! Shared building blocks for the SMB authentication crates: the error type,
//! the NT status codes surfaced at the security-blob boundary, and the
//! feature-gated logging macros.

use error::SMBError;

pub mod error;
pub mod logging;
pub mod nt_status;

pub type SMBResult<T> = Result<T, SMBError>;

/// Result of a parser: the unconsumed input alongside the parsed value.
pub type SMBParseResult<I, O> = Result<(I, O), SMBError>;
