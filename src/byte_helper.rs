use smb_core::SMBResult;
use smb_core::error::SMBError;

pub(crate) fn bytes_to_u16(bytes: &[u8]) -> u16 {
    (bytes[0] as u16) | ((bytes[1] as u16) << 8)
}

pub(crate) fn u16_to_bytes(num: u16) -> [u8; 2] {
    [(num & 0xFF) as u8, ((num >> 8) & 0xFF) as u8]
}

pub(crate) fn bytes_to_u32(bytes: &[u8]) -> u32 {
    (bytes[0] as u32) |
    ((bytes[1] as u32) << 8) |
    ((bytes[2] as u32) << 16) |
    ((bytes[3] as u32) << 24)
}

pub(crate) fn u32_to_bytes(num: u32) -> [u8; 4] {
    [
        (num & 0xFF) as u8,
        ((num >> 8) & 0xFF) as u8,
        ((num >> 16) & 0xFF) as u8,
        ((num >> 24) & 0xFF) as u8,
    ]
}

pub(crate) fn u64_to_bytes(num: u64) -> [u8; 8] {
    num.to_le_bytes()
}

/// UTF-16LE encoding, the "Unicode" of every NTLM payload string.
pub(crate) fn utf16_bytes(text: &str) -> Vec<u8> {
    text.encode_utf16().map(u16_to_bytes).collect::<Vec<[u8; 2]>>().concat()
}

pub(crate) fn utf16_string(bytes: &[u8]) -> SMBResult<String> {
    if bytes.len() % 2 != 0 {
        return Err(SMBError::parse_error("Odd length UTF-16 buffer"));
    }
    let units = bytes.chunks_exact(2).map(bytes_to_u16).collect::<Vec<u16>>();
    String::from_utf16(&units).map_err(SMBError::parse_error)
}
