use aes::Aes128;
use cmac::Cmac;
use hmac::{Hmac, Mac};
use num_enum::TryFromPrimitive;
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use smb_core::error::SMBError;
use smb_core::SMBResult;

use crate::util::crypto::sp800_108;

/// The SMB2 dialect a session was negotiated with. It decides how the session
/// key exported by authentication turns into signing and sealing keys.
#[repr(u16)]
#[derive(Debug, Eq, PartialEq, TryFromPrimitive, Serialize, Deserialize, Copy, Clone, Ord, PartialOrd)]
#[allow(non_camel_case_types)]
pub enum SMBDialect {
    V2_0_2 = 0x202,
    V2_1_0 = 0x210,
    V3_0_0 = 0x300,
    V3_0_2 = 0x302,
    V3_1_1 = 0x311,
}

impl SMBDialect {
    pub fn is_smb3(&self) -> bool {
        *self as u16 >= 0x300
    }
}

const KEY_LEN_BITS: u32 = 128;

pub fn calculate_signature(signing_key: &[u8], dialect: SMBDialect, buffer: &[u8], offset: usize, padded_len: usize) -> SMBResult<Vec<u8>> {
    let end = offset.checked_add(padded_len)
        .filter(|end| *end <= buffer.len())
        .ok_or_else(|| SMBError::payload_too_small(offset.saturating_add(padded_len), buffer.len()))?;
    let buffer = &buffer[offset..end];
    let output = if dialect.is_smb3() {
        <Cmac<Aes128>>::new_from_slice(signing_key)
            .map_err(|_| SMBError::crypto_error("Invalid Key Length"))?
            .chain_update(buffer)
            .finalize()
            .into_bytes()
            .to_vec()
    } else {
        new_sha256_from_slice(signing_key)?
            .chain_update(buffer)
            .finalize()
            .into_bytes()
            .to_vec()
    };
    Ok(output)
}

pub fn generate_signing_key(session_key: &[u8], dialect: SMBDialect, preauth_integrity_hash_value: &[u8]) -> SMBResult<Vec<u8>> {
    if !dialect.is_smb3() {
        return Ok(session_key.into());
    }

    let (label, context): (&[u8], &[u8]) = if dialect == SMBDialect::V3_1_1 {
        (b"SMBSigningKey\0", require_preauth_hash(preauth_integrity_hash_value)?)
    } else {
        (b"SMB2AESCMAC\0", b"SmbSign\0")
    };

    derive(session_key, label, context)
}

/// The key a server encrypts its messages with (the client's decryption key).
pub fn generate_encryption_key(session_key: &[u8], dialect: SMBDialect, preauth_integrity_hash_value: &[u8]) -> SMBResult<Vec<u8>> {
    let (label, context): (&[u8], &[u8]) = match dialect {
        SMBDialect::V3_1_1 => (b"SMBS2CCipherKey\0", require_preauth_hash(preauth_integrity_hash_value)?),
        SMBDialect::V3_0_0 | SMBDialect::V3_0_2 => (b"SMB2AESCCM\0", b"ServerOut\0"),
        _ => return Err(SMBError::precondition_failed("Encryption requires SMB 3.x")),
    };

    derive(session_key, label, context)
}

/// The key a server decrypts client messages with.
pub fn generate_decryption_key(session_key: &[u8], dialect: SMBDialect, preauth_integrity_hash_value: &[u8]) -> SMBResult<Vec<u8>> {
    let (label, context): (&[u8], &[u8]) = match dialect {
        SMBDialect::V3_1_1 => (b"SMBC2SCipherKey\0", require_preauth_hash(preauth_integrity_hash_value)?),
        SMBDialect::V3_0_0 | SMBDialect::V3_0_2 => (b"SMB2AESCCM\0", b"ServerIn \0"),
        _ => return Err(SMBError::precondition_failed("Encryption requires SMB 3.x")),
    };

    derive(session_key, label, context)
}

fn require_preauth_hash(preauth_integrity_hash_value: &[u8]) -> SMBResult<&[u8]> {
    if preauth_integrity_hash_value.is_empty() {
        return Err(SMBError::precondition_failed("No preauth_integrity_hash_value with SMB 3.1.1"));
    }
    Ok(preauth_integrity_hash_value)
}

fn derive(session_key: &[u8], label: &[u8], context: &[u8]) -> SMBResult<Vec<u8>> {
    let hmac = new_sha256_from_slice(session_key)?;
    Ok(sp800_108::derive_key(hmac, label, context, KEY_LEN_BITS))
}

fn new_sha256_from_slice(slice: &[u8]) -> SMBResult<Hmac<Sha256>> {
    <Hmac<Sha256>>::new_from_slice(slice)
        .map_err(|_| SMBError::crypto_error("Invalid Key Length"))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SESSION_KEY: [u8; 16] = [0x42; 16];

    #[test]
    fn is_smb3_classification() {
        assert!(!SMBDialect::V2_0_2.is_smb3());
        assert!(!SMBDialect::V2_1_0.is_smb3());
        assert!(SMBDialect::V3_0_0.is_smb3());
        assert!(SMBDialect::V3_1_1.is_smb3());
        assert_eq!(SMBDialect::try_from_primitive(0x302).unwrap(), SMBDialect::V3_0_2);
    }

    #[test]
    fn smb2_signing_key_is_session_key() {
        assert_eq!(generate_signing_key(&SESSION_KEY, SMBDialect::V2_1_0, &[]).unwrap(), SESSION_KEY);
    }

    #[test]
    fn smb3_signing_key_uses_kdf() {
        let expected = sp800_108::derive_key(new_sha256_from_slice(&SESSION_KEY).unwrap(), b"SMB2AESCMAC\0", b"SmbSign\0", 128);
        let key = generate_signing_key(&SESSION_KEY, SMBDialect::V3_0_0, &[]).unwrap();
        assert_eq!(key, expected);
        assert_eq!(key.len(), 16);
    }

    #[test]
    fn smb311_requires_preauth_hash() {
        assert!(matches!(generate_signing_key(&SESSION_KEY, SMBDialect::V3_1_1, &[]), Err(SMBError::PreconditionFailed(_))));
        assert!(generate_encryption_key(&SESSION_KEY, SMBDialect::V3_1_1, &[]).is_err());
        let signing = generate_signing_key(&SESSION_KEY, SMBDialect::V3_1_1, &[0x11; 64]).unwrap();
        let other_hash = generate_signing_key(&SESSION_KEY, SMBDialect::V3_1_1, &[0x12; 64]).unwrap();
        assert_ne!(signing, other_hash);
    }

    #[test]
    fn cipher_keys_differ_by_direction() {
        let encryption = generate_encryption_key(&SESSION_KEY, SMBDialect::V3_0_2, &[]).unwrap();
        let decryption = generate_decryption_key(&SESSION_KEY, SMBDialect::V3_0_2, &[]).unwrap();
        assert_ne!(encryption, decryption);
        assert!(generate_encryption_key(&SESSION_KEY, SMBDialect::V2_0_2, &[]).is_err());
    }

    #[test]
    fn signature_lengths() {
        let message = [0xAB_u8; 96];
        assert_eq!(calculate_signature(&SESSION_KEY, SMBDialect::V2_1_0, &message, 0, 96).unwrap().len(), 32);
        assert_eq!(calculate_signature(&SESSION_KEY, SMBDialect::V3_0_0, &message, 0, 96).unwrap().len(), 16);
        assert!(calculate_signature(&SESSION_KEY, SMBDialect::V3_0_0, &message, 64, 64).is_err());
    }
}
