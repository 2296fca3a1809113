mod spnego_token;
mod spnego_token_init;
mod spnego_token_init_2;
mod spnego_token_response;

pub mod der_utils;

pub use spnego_token_init_2::NEG_HINT_NAME;
pub use spnego_token_response::NegotiateState;

pub type SPNEGOToken = spnego_token::SPNEGOToken;
pub type SPNEGOTokenInitBody = spnego_token_init::SPNEGOTokenInitBody;
pub type SPNEGOTokenInit2Body = spnego_token_init_2::SPNEGOTokenInit2Body;
pub type SPNEGOTokenResponseBody = spnego_token_response::SPNEGOTokenResponseBody;
