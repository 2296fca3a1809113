use num_enum::TryFromPrimitive;
use serde::{Deserialize, Serialize};

use crate::SMBResult;
use crate::error::SMBError;

/// Status codes produced by the authentication engine and its mechanisms.
///
/// The `Sec*` values are the SSPI codes Windows reports from
/// `AcceptSecurityContext`; the `Status*` values are the NTSTATUS codes an SMB
/// server places in its SESSION_SETUP response.
#[repr(u32)]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TryFromPrimitive, Copy)]
pub enum NTStatus {
    StatusSuccess = 0x0,
    SecIContinueNeeded = 0x00090312,
    SecESecpkgNotFound = 0x80090305,
    SecEInvalidToken = 0x80090308,
    InvalidParameter = 0xC000000D,
    MoreProcessingRequired = 0xC0000016,
    AccessDenied = 0xC0000022,
    StatusLogonFailure = 0xC000006D,
    StatusNotSupported = 0xC00000BB,
    UnknownError = 0xFFFFFFFF,
}

impl NTStatus {
    pub fn from_u32(value: u32) -> SMBResult<Self> {
        Self::try_from_primitive(value)
            .map_err(|_| SMBError::parse_error(format!("Unknown status code {:#010x}", value)))
    }

    pub fn as_bytes(&self) -> [u8; 4] {
        (*self as u32).to_le_bytes()
    }

    /// The status an SMB SESSION_SETUP response carries for this outcome.
    pub fn session_setup_status(&self) -> NTStatus {
        match self {
            Self::SecIContinueNeeded => Self::MoreProcessingRequired,
            Self::SecEInvalidToken | Self::SecESecpkgNotFound => Self::StatusLogonFailure,
            other => *other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sspi_codes() {
        assert_eq!(NTStatus::SecIContinueNeeded as u32, 0x00090312);
        assert_eq!(NTStatus::SecEInvalidToken as u32, 0x80090308);
        assert_eq!(NTStatus::SecESecpkgNotFound as u32, 0x80090305);
    }

    #[test]
    fn from_u32_round_trip() {
        let status = NTStatus::from_u32(0xC000006D).unwrap();
        assert_eq!(status, NTStatus::StatusLogonFailure);
        assert_eq!(status.as_bytes(), [0x6D, 0x00, 0x00, 0xC0]);
        assert!(NTStatus::from_u32(0x1234).is_err());
    }

    #[test]
    fn session_setup_mapping() {
        assert_eq!(NTStatus::SecIContinueNeeded.session_setup_status(), NTStatus::MoreProcessingRequired);
        assert_eq!(NTStatus::SecEInvalidToken.session_setup_status(), NTStatus::StatusLogonFailure);
        assert_eq!(NTStatus::StatusSuccess.session_setup_status(), NTStatus::StatusSuccess);
    }
}
