use hmac::{Hmac, Mac};
use md5::Md5;

use smb_core::error::SMBError;
use smb_core::SMBResult;

use crate::byte_helper::utf16_bytes;
use crate::util::crypto::ntlm_v1::nt_hash_v1;

/// NTOWFv2: HMAC-MD5 keyed with the NT hash over `UPPER(user) + domain`.
pub fn ntowf_v2(password: &str, user: &str, domain: &str) -> SMBResult<[u8; 16]> {
    let text = user.to_uppercase() + domain;
    hmac_md5(&nt_hash_v1(password), &[utf16_bytes(&text).as_slice()])
}

pub fn lmowf_v2(password: &str, user: &str, domain: &str) -> SMBResult<[u8; 16]> {
    ntowf_v2(password, user, domain)
}

/// LMv2 response: the HMAC over both challenges followed by the client challenge.
pub fn compute_lmv2_response(server_challenge: &[u8], client_challenge: &[u8], password: &str, user: &str, domain: &str) -> SMBResult<Vec<u8>> {
    let key = lmowf_v2(password, user, domain)?;
    let proof = hmac_md5(&key, &[server_challenge, client_challenge])?;
    Ok([&proof[..], client_challenge].concat())
}

/// NTProofStr over the server challenge and the client challenge structure
/// (which already carries its 4 trailing zero bytes).
pub fn compute_ntlmv2_proof(server_challenge: &[u8], client_challenge_structure: &[u8], password: &str, user: &str, domain: &str) -> SMBResult<[u8; 16]> {
    let key = ntowf_v2(password, user, domain)?;
    hmac_md5(&key, &[server_challenge, client_challenge_structure])
}

pub fn session_base_key_v2(password: &str, user: &str, domain: &str, nt_proof: &[u8]) -> SMBResult<[u8; 16]> {
    let key = ntowf_v2(password, user, domain)?;
    hmac_md5(&key, &[nt_proof])
}

/// Validates an NTLMv2 exchange against the stored password. The NT response
/// is checked first, then the LMv2 response. Returns the session base key on
/// success.
pub fn authenticate_v2(domain: &str, account: &str, password: &str, server_challenge: &[u8], lm_response: &[u8], nt_response: &[u8]) -> SMBResult<Option<[u8; 16]>> {
    if nt_response.len() < 16 {
        return Err(SMBError::payload_too_small(16_usize, nt_response.len()));
    }
    let (client_proof, client_structure) = nt_response.split_at(16);

    let expected_proof = compute_ntlmv2_proof(server_challenge, client_structure, password, account, domain)?;
    let nt_valid = expected_proof == client_proof;
    let lm_valid = !nt_valid && lm_response.len() == 24 && {
        let expected_lm = compute_lmv2_response(server_challenge, &lm_response[16..], password, account, domain)?;
        expected_lm == lm_response
    };

    if nt_valid || lm_valid {
        Ok(Some(session_base_key_v2(password, account, domain, client_proof)?))
    } else {
        Ok(None)
    }
}

pub(crate) fn hmac_md5(key: &[u8], parts: &[&[u8]]) -> SMBResult<[u8; 16]> {
    let mut mac = new_hmac_from_slice(key)?;
    for part in parts {
        mac.update(part);
    }
    Ok(mac.finalize().into_bytes().into())
}

fn new_hmac_from_slice(slice: &[u8]) -> SMBResult<Hmac<Md5>> {
    <Hmac<Md5>>::new_from_slice(slice).map_err(|_| SMBError::crypto_error("Invalid length for key"))
}
