use smb_core::SMBResult;

use crate::util::auth::spnego::der_utils::{DER_ENCODING_GENERAL_STRING_TAG, DER_ENCODING_OID_TAG, DER_ENCODING_SEQUENCE_TAG, encode_der_bytes, encode_general_string, encode_tlv, HINT_NAME_TAG, MECH_TYPE_LIST_TAG, NEG_HINTS_TAG, NEG_TOKEN_INIT_TAG};

/// The placeholder principal Windows servers advertise in `negHints`.
pub const NEG_HINT_NAME: &str = "not_defined_in_RFC4178@please_ignore";

/// `negTokenInit2` ([MS-SPNG] 2.2.1): the acceptor's unsolicited mechanism
/// list, sent in the SMB2 NEGOTIATE response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SPNEGOTokenInit2Body {
    pub mech_type_list: Vec<Vec<u8>>,
    pub hint_name: String,
}

impl SPNEGOTokenInit2Body {
    pub fn new(mech_type_list: Vec<Vec<u8>>) -> Self {
        Self {
            mech_type_list,
            hint_name: NEG_HINT_NAME.into(),
        }
    }

    pub fn as_bytes(&self) -> SMBResult<Vec<u8>> {
        let hint_name = encode_tlv(DER_ENCODING_GENERAL_STRING_TAG, &encode_general_string(&self.hint_name)?);
        let neg_hints = encode_tlv(DER_ENCODING_SEQUENCE_TAG, &encode_tlv(HINT_NAME_TAG, &hint_name));

        let fields = [
            encode_der_bytes(&self.mech_type_list, MECH_TYPE_LIST_TAG, DER_ENCODING_SEQUENCE_TAG, DER_ENCODING_OID_TAG),
            encode_tlv(NEG_HINTS_TAG, &neg_hints),
        ].concat();
        Ok(encode_tlv(NEG_TOKEN_INIT_TAG, &encode_tlv(DER_ENCODING_SEQUENCE_TAG, &fields)))
    }
}
