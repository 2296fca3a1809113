pub mod des;
pub mod key_exchange;
pub mod ntlm_v1;
pub mod ntlm_v2;
pub mod oem;
pub mod smb2;
pub mod sp800_108;
