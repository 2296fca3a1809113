use nom::bytes::complete::take;
use nom::Err::Error;
use nom::error::ErrorKind;
use nom::IResult;
use nom::number::complete::le_u16;
use serde::{Deserialize, Serialize};

use smb_core::SMBResult;

use crate::byte_helper::{u16_to_bytes, utf16_bytes, utf16_string};
use crate::util::auth::ntlm::ntlm_message::field_length;
use crate::util::filetime::FileTime;

/// AV_PAIR identifiers (MsvAv*).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AvPairKey {
    EOL,
    NbComputerName,
    NbDomainName,
    DnsComputerName,
    DnsDomainName,
    DnsTreeName,
    Flags,
    Timestamp,
    SingleHost,
    TargetName,
    ChannelBindings,
    Unknown(u16),
}

impl From<u16> for AvPairKey {
    fn from(value: u16) -> Self {
        match value {
            0x00 => Self::EOL,
            0x01 => Self::NbComputerName,
            0x02 => Self::NbDomainName,
            0x03 => Self::DnsComputerName,
            0x04 => Self::DnsDomainName,
            0x05 => Self::DnsTreeName,
            0x06 => Self::Flags,
            0x07 => Self::Timestamp,
            0x08 => Self::SingleHost,
            0x09 => Self::TargetName,
            0x0A => Self::ChannelBindings,
            other => Self::Unknown(other),
        }
    }
}

impl From<AvPairKey> for u16 {
    fn from(value: AvPairKey) -> Self {
        match value {
            AvPairKey::EOL => 0x00,
            AvPairKey::NbComputerName => 0x01,
            AvPairKey::NbDomainName => 0x02,
            AvPairKey::DnsComputerName => 0x03,
            AvPairKey::DnsDomainName => 0x04,
            AvPairKey::DnsTreeName => 0x05,
            AvPairKey::Flags => 0x06,
            AvPairKey::Timestamp => 0x07,
            AvPairKey::SingleHost => 0x08,
            AvPairKey::TargetName => 0x09,
            AvPairKey::ChannelBindings => 0x0A,
            AvPairKey::Unknown(other) => other,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvPair {
    pub key: AvPairKey,
    pub value: Vec<u8>,
}

impl AvPair {
    pub fn new(key: AvPairKey, value: Vec<u8>) -> Self {
        Self { key, value }
    }

    pub fn from_string(key: AvPairKey, value: &str) -> Self {
        Self::new(key, utf16_bytes(value))
    }

    pub fn value_string(&self) -> SMBResult<String> {
        utf16_string(&self.value)
    }
}

/// Target information: AV-pairs in wire order. Duplicate keys are kept; the
/// terminating EOL is implied and never stored.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AvPairSequence {
    pairs: Vec<AvPair>,
}

impl AvPairSequence {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, key: AvPairKey, value: Vec<u8>) {
        self.pairs.push(AvPair::new(key, value));
    }

    /// First value stored under `key`.
    pub fn get(&self, key: AvPairKey) -> Option<&[u8]> {
        self.pairs.iter()
            .find(|pair| pair.key == key)
            .map(|pair| pair.value.as_slice())
    }

    pub fn contains(&self, key: AvPairKey) -> bool {
        self.get(key).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = &AvPair> {
        self.pairs.iter()
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Parses pairs up to and including the EOL marker; a missing marker fails.
    pub fn parse(bytes: &[u8]) -> IResult<&[u8], Self> {
        let mut pairs = Vec::new();
        let mut remaining = bytes;
        loop {
            let (rest, key) = le_u16(remaining)?;
            let (rest, length) = le_u16(rest)?;
            let (rest, value) = take(length as usize)(rest)?;
            remaining = rest;
            match AvPairKey::from(key) {
                AvPairKey::EOL if length == 0 => break,
                AvPairKey::EOL => return Err(Error(nom::error::Error::new(remaining, ErrorKind::Verify))),
                key => pairs.push(AvPair::new(key, value.to_vec())),
            }
        }
        Ok((remaining, Self { pairs }))
    }

    /// Encodes the pairs followed by EOL. Fails when a value is longer than
    /// its 16-bit length field allows.
    pub fn as_bytes(&self) -> SMBResult<Vec<u8>> {
        let mut bytes = Vec::new();
        for pair in &self.pairs {
            bytes.extend_from_slice(&u16_to_bytes(pair.key.into()));
            bytes.extend_from_slice(&u16_to_bytes(field_length(&pair.value)?));
            bytes.extend_from_slice(&pair.value);
        }
        bytes.extend_from_slice(&[0; 4]);
        Ok(bytes)
    }

    /// The target information a server puts in its CHALLENGE message.
    pub fn server_target_info(nb_domain: &str, nb_computer: &str, dns_domain: &str, dns_computer: &str, timestamp: Option<FileTime>) -> Self {
        let mut sequence = Self::new();
        sequence.pairs.push(AvPair::from_string(AvPairKey::NbDomainName, nb_domain));
        sequence.pairs.push(AvPair::from_string(AvPairKey::NbComputerName, nb_computer));
        sequence.pairs.push(AvPair::from_string(AvPairKey::DnsDomainName, dns_domain));
        sequence.pairs.push(AvPair::from_string(AvPairKey::DnsComputerName, dns_computer));
        if let Some(timestamp) = timestamp {
            sequence.push(AvPairKey::Timestamp, timestamp.as_bytes().to_vec());
        }
        sequence
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip_keeps_order_and_duplicates() {
        let mut sequence = AvPairSequence::new();
        sequence.push(AvPairKey::NbDomainName, utf16_bytes("Domain"));
        sequence.push(AvPairKey::NbComputerName, utf16_bytes("Server"));
        sequence.push(AvPairKey::NbDomainName, utf16_bytes("Other"));
        sequence.push(AvPairKey::Unknown(0x42), vec![1, 2]);

        let bytes = sequence.as_bytes().unwrap();
        let (remaining, parsed) = AvPairSequence::parse(&bytes).unwrap();
        assert!(remaining.is_empty());
        assert_eq!(parsed, sequence);
        let keys = parsed.iter().map(|pair| pair.key).collect::<Vec<AvPairKey>>();
        assert_eq!(keys, [AvPairKey::NbDomainName, AvPairKey::NbComputerName, AvPairKey::NbDomainName, AvPairKey::Unknown(0x42)]);
        assert_eq!(parsed.get(AvPairKey::NbDomainName), Some(&utf16_bytes("Domain")[..]));
    }

    #[test]
    fn wire_layout() {
        let mut sequence = AvPairSequence::new();
        sequence.push(AvPairKey::NbDomainName, utf16_bytes("Domain"));
        sequence.push(AvPairKey::NbComputerName, utf16_bytes("Server"));
        assert_eq!(sequence.as_bytes().unwrap(), [
            0x02, 0x00, 0x0c, 0x00, 0x44, 0x00, 0x6f, 0x00, 0x6d, 0x00, 0x61, 0x00, 0x69, 0x00, 0x6e, 0x00,
            0x01, 0x00, 0x0c, 0x00, 0x53, 0x00, 0x65, 0x00, 0x72, 0x00, 0x76, 0x00, 0x65, 0x00, 0x72, 0x00,
            0x00, 0x00, 0x00, 0x00,
        ]);
    }

    #[test]
    fn oversized_value_is_rejected() {
        let mut sequence = AvPairSequence::new();
        sequence.push(AvPairKey::ChannelBindings, vec![0; 70000]);
        assert!(sequence.as_bytes().is_err());
    }

    #[test]
    fn parse_stops_at_eol() {
        let bytes = [0x07, 0x00, 0x02, 0x00, 0xAA, 0xBB, 0x00, 0x00, 0x00, 0x00, 0xFF, 0xFF];
        let (remaining, parsed) = AvPairSequence::parse(&bytes).unwrap();
        assert_eq!(remaining, [0xFF, 0xFF]);
        assert_eq!(parsed.get(AvPairKey::Timestamp), Some(&[0xAA, 0xBB][..]));
    }

    #[test]
    fn missing_eol_fails() {
        assert!(AvPairSequence::parse(&[0x01, 0x00, 0x02, 0x00, 0x41, 0x00]).is_err());
        assert!(AvPairSequence::parse(&[0x01, 0x00, 0x08, 0x00, 0x41]).is_err());
    }

    #[test]
    fn server_target_info_layout() {
        let info = AvPairSequence::server_target_info("WORKGROUP", "SMBSERVER", "workgroup", "smbserver", Some(FileTime::from_unix(0)));
        let keys = info.iter().map(|pair| pair.key).collect::<Vec<AvPairKey>>();
        assert_eq!(keys, [AvPairKey::NbDomainName, AvPairKey::NbComputerName, AvPairKey::DnsDomainName, AvPairKey::DnsComputerName, AvPairKey::Timestamp]);
        assert_eq!(info.iter().next().unwrap().value_string().unwrap(), "WORKGROUP");
    }
}
