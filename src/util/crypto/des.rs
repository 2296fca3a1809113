use des::Des;
use des::cipher::{BlockEncrypt, KeyInit};
use des::cipher::generic_array::GenericArray;

use smb_core::SMBResult;
use smb_core::error::SMBError;

/// DESL(): the 16-byte key is zero padded to 21 bytes, split into three
/// 7-byte DES keys and each one encrypts the same 8-byte block.
pub fn des_long_encrypt(key: &[u8], plaintext: &[u8]) -> SMBResult<[u8; 24]> {
    if key.len() != 16 { return Err(SMBError::crypto_error("Invalid key length")); }
    if plaintext.len() != 8 { return Err(SMBError::crypto_error("Invalid plain-text length")); }
    let mut padded = [0_u8; 21];
    padded[..16].copy_from_slice(key);

    let mut result = [0_u8; 24];
    for (chunk, output) in padded.chunks_exact(7).zip(result.chunks_exact_mut(8)) {
        let block = des_encrypt(&extend_des_key(chunk)?, plaintext)?;
        output.copy_from_slice(&block);
    }
    Ok(result)
}

/// Spreads 56 key bits over 8 bytes, leaving the low (parity) bit of each
/// byte clear. DES ignores the parity bits.
pub fn extend_des_key(key: &[u8]) -> SMBResult<[u8; 8]> {
    if key.len() != 7 { return Err(SMBError::crypto_error("DES key chunks must be 7 bytes")); }
    let mut result = [0_u8; 8];

    result[0] = key[0] >> 1;
    result[1] = ((key[0] & 0x01) << 6) | (key[1] >> 2);
    result[2] = ((key[1] & 0x03) << 5) | (key[2] >> 3);
    result[3] = ((key[2] & 0x07) << 4) | (key[3] >> 4);
    result[4] = ((key[3] & 0x0F) << 3) | (key[4] >> 5);
    result[5] = ((key[4] & 0x1F) << 2) | (key[5] >> 6);
    result[6] = ((key[5] & 0x3F) << 1) | (key[6] >> 7);
    result[7] = key[6] & 0x7F;

    for byte in result.iter_mut() {
        *byte <<= 1;
    }

    Ok(result)
}

/// Single block DES-ECB.
pub fn des_encrypt(key: &[u8], plaintext: &[u8]) -> SMBResult<[u8; 8]> {
    if plaintext.len() != 8 { return Err(SMBError::crypto_error("Invalid plain-text length")); }
    let des = Des::new_from_slice(key)
        .map_err(|_| SMBError::crypto_error("Invalid key length"))?;
    let mut block = GenericArray::clone_from_slice(plaintext);
    des.encrypt_block(&mut block);
    let mut result = [0_u8; 8];
    result.copy_from_slice(&block);
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn desl_output_is_24_bytes() {
        let output = des_long_encrypt(&[0xAB; 16], &[0x01, 0x23, 0x45, 0x67, 0x89, 0xab, 0xcd, 0xef]).unwrap();
        assert_eq!(output.len(), 24);
        // Third chunk of the key is 2 key bytes and 5 bytes of zero padding.
        assert_ne!(output[0..8], output[16..24]);
        assert_eq!(output[0..8], output[8..16]);
    }

    #[test]
    fn desl_rejects_bad_lengths() {
        assert!(matches!(des_long_encrypt(&[0; 15], &[0; 8]), Err(SMBError::CryptoError(_))));
        assert!(matches!(des_long_encrypt(&[0; 16], &[0; 7]), Err(SMBError::CryptoError(_))));
    }

    #[test]
    fn extended_key_has_clear_parity_bits() {
        for key in [[0xFF_u8; 7], [0x00; 7], [0x12, 0x34, 0x56, 0x78, 0x9a, 0xbc, 0xde]] {
            let extended = extend_des_key(&key).unwrap();
            assert_eq!(extended.len(), 8);
            assert!(extended.iter().all(|byte| byte & 0x01 == 0));
        }
        assert_eq!(extend_des_key(&[0xFF; 7]).unwrap(), [0xFE; 8]);
    }

    #[test]
    fn extend_rejects_wrong_chunk() {
        assert!(extend_des_key(&[0; 8]).is_err());
    }

    #[test]
    fn des_known_answer() {
        // FIPS 81 / "Now is t" test with key 0123456789abcdef
        let key = [0x01, 0x23, 0x45, 0x67, 0x89, 0xab, 0xcd, 0xef];
        let output = des_encrypt(&key, b"Now is t").unwrap();
        assert_eq!(output, [0x3f, 0xa4, 0x0e, 0x8a, 0x98, 0x4d, 0x48, 0x15]);
    }
}
