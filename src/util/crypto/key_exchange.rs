use des::cipher::KeyInit;
use rc4::{Key, Rc4, StreamCipher};
use rc4::consts::U16;

use smb_core::error::SMBError;
use smb_core::SMBResult;

use crate::util::auth::ntlm::NTLMNegotiateFlags;
use crate::util::crypto::des::{des_encrypt, extend_des_key};
use crate::util::crypto::ntlm_v2::hmac_md5;

/// KXKEY: the key-exchange key derived from the session base key.
///
/// `lm_hash` is only consulted for the LAN Manager branches without extended
/// session security.
pub fn kx_key(session_base_key: &[u8], negotiate_flags: NTLMNegotiateFlags, lm_challenge_response: &[u8], server_challenge: &[u8], lm_hash: &[u8]) -> SMBResult<[u8; 16]> {
    if negotiate_flags.contains(NTLMNegotiateFlags::EXTENDED_SESSION_SECURITY) {
        if lm_challenge_response.len() < 8 {
            return Err(SMBError::payload_too_small(8_usize, lm_challenge_response.len()));
        }
        return hmac_md5(session_base_key, &[server_challenge, &lm_challenge_response[0..8]]);
    }

    if negotiate_flags.contains(NTLMNegotiateFlags::LAN_MANAGER_SESSION_KEY) {
        if lm_hash.len() != 16 || lm_challenge_response.len() < 8 {
            return Err(SMBError::crypto_error("LM session key requires the LM hash and response"));
        }
        let plaintext = &lm_challenge_response[0..8];
        let second_key = [lm_hash[7], 0xBD, 0xBD, 0xBD, 0xBD, 0xBD, 0xBD];
        let part1 = des_encrypt(&extend_des_key(&lm_hash[0..7])?, plaintext)?;
        let part2 = des_encrypt(&extend_des_key(&second_key)?, plaintext)?;

        let mut key = [0_u8; 16];
        key[..8].copy_from_slice(&part1);
        key[8..].copy_from_slice(&part2);
        return Ok(key);
    }

    if negotiate_flags.contains(NTLMNegotiateFlags::REQUEST_LM_SESSION_KEY) {
        if lm_hash.len() < 8 {
            return Err(SMBError::crypto_error("LM session key requires the LM hash"));
        }
        let mut key = [0_u8; 16];
        key[..8].copy_from_slice(&lm_hash[..8]);
        return Ok(key);
    }

    session_base_key.try_into()
        .map_err(|_| SMBError::crypto_error("Session base key must be 16 bytes"))
}

/// The session key both sides end up with. With key exchange the client sends
/// a random key encrypted under KXKEY; otherwise KXKEY itself is exported.
pub fn exported_session_key(key_exchange_key: &[u8; 16], negotiate_flags: NTLMNegotiateFlags, encrypted_random_session_key: &[u8]) -> Vec<u8> {
    if negotiate_flags.contains(NTLMNegotiateFlags::KEY_EXCHANGE) && encrypted_random_session_key.len() == 16 {
        rc4_k(key_exchange_key, encrypted_random_session_key)
    } else {
        key_exchange_key.to_vec()
    }
}

pub fn rc4_k(key: &[u8; 16], data: &[u8]) -> Vec<u8> {
    let mut rc4 = Rc4::new(Key::<U16>::from_slice(key));
    let mut output = data.to_vec();
    rc4.apply_keystream(&mut output);
    output
}
