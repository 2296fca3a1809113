use digest::Digest;
use md4::Md4;
use md5::Md5;

use smb_core::SMBResult;

use crate::byte_helper::utf16_bytes;
use crate::util::crypto::des::{des_encrypt, des_long_encrypt, extend_des_key};
use crate::util::crypto::oem::oem_bytes;

const LM_HASH_PLAINTEXT: &[u8; 8] = b"KGS!@#$%";

/// LMOWFv1, the LM hash.
pub fn lm_hash_v1(password: &str) -> SMBResult<[u8; 16]> {
    let password = oem_bytes(&password.to_uppercase());
    let mut key = [0_u8; 14];
    let len = password.len().min(key.len());
    key[..len].copy_from_slice(&password[..len]);

    let part1 = des_encrypt(&extend_des_key(&key[0..7])?, LM_HASH_PLAINTEXT)?;
    let part2 = des_encrypt(&extend_des_key(&key[7..14])?, LM_HASH_PLAINTEXT)?;

    let mut hash = [0_u8; 16];
    hash[..8].copy_from_slice(&part1);
    hash[8..].copy_from_slice(&part2);
    Ok(hash)
}

/// NTOWFv1, the NT hash: MD4 over the UTF-16LE password.
pub fn nt_hash_v1(password: &str) -> [u8; 16] {
    Md4::digest(utf16_bytes(password)).into()
}

pub fn compute_lmv1_response(server_challenge: &[u8], password: &str) -> SMBResult<[u8; 24]> {
    des_long_encrypt(&lm_hash_v1(password)?, server_challenge)
}

pub fn compute_ntlmv1_response(server_challenge: &[u8], password: &str) -> SMBResult<[u8; 24]> {
    des_long_encrypt(&nt_hash_v1(password), server_challenge)
}

pub fn compute_ntlmv1_extended_response(server_challenge: &[u8], client_challenge: &[u8], password: &str) -> SMBResult<[u8; 24]> {
    let challenge_hash = Md5::new()
        .chain_update(server_challenge)
        .chain_update(client_challenge)
        .finalize();

    des_long_encrypt(&nt_hash_v1(password), &challenge_hash[0..8])
}

/// SessionBaseKey for NTLMv1, with or without extended session security.
pub fn session_base_key_v1(password: &str) -> [u8; 16] {
    Md4::digest(nt_hash_v1(password)).into()
}

/// Validates a legacy NTLMv1 exchange. Either a matching NT response or a
/// matching LM response is accepted. Returns the session base key on success.
pub fn authenticate_v1(password: &str, server_challenge: &[u8], lm_response: &[u8], nt_response: &[u8]) -> SMBResult<Option<[u8; 16]>> {
    let nt_valid = nt_response.len() == 24
        && compute_ntlmv1_response(server_challenge, password)? == nt_response;
    let lm_valid = !nt_valid && lm_response.len() == 24
        && compute_lmv1_response(server_challenge, password)? == lm_response;

    if nt_valid || lm_valid {
        Ok(Some(session_base_key_v1(password)))
    } else {
        Ok(None)
    }
}

/// Validates NTLMv1 with extended session security, where the LM response
/// field carries the 8-byte client challenge.
pub fn authenticate_v1_extended(password: &str, server_challenge: &[u8], lm_response: &[u8], nt_response: &[u8]) -> SMBResult<Option<[u8; 16]>> {
    let client_challenge = &lm_response[0..8.min(lm_response.len())];
    let expected_response = compute_ntlmv1_extended_response(server_challenge, client_challenge, password)?;

    if nt_response == expected_response {
        Ok(Some(session_base_key_v1(password)))
    } else {
        Ok(None)
    }
}
