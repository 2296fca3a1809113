use std::sync::Arc;

use smb_core::logging::{debug, trace};
use smb_core::nt_status::NTStatus;
use smb_core::SMBResult;

use crate::util::auth::{AuthProvider, GssAttributeName, GssAttributeValue};
use crate::util::auth::gss::{GssContext, MechanismRegistry};
use crate::util::auth::ntlm::{get_message_type, is_signature_valid, NTLM_OID, NTLMMessageType};
use crate::util::auth::spnego::{SPNEGOToken, SPNEGOTokenInit2Body, SPNEGOTokenInitBody, SPNEGOTokenResponseBody};

/// Outcome of one [`GssProvider::accept_security_context`] call. `context`
/// is what the caller keeps for the next leg of the exchange.
#[derive(Debug)]
pub struct GssAcceptResult {
    pub status: NTStatus,
    pub context: Option<GssContext>,
    pub output_token: Option<Vec<u8>>,
}

impl GssAcceptResult {
    fn new(status: NTStatus, context: Option<GssContext>, output_token: Option<Vec<u8>>) -> Self {
        Self { status, context, output_token }
    }
}

/// Server side GSS-API acceptor. Interprets SPNEGO and raw NTLM security
/// blobs and routes them to the registered mechanisms.
#[derive(Debug, Clone, Default)]
pub struct GssProvider {
    registry: MechanismRegistry,
}

impl GssProvider {
    pub fn new(mechanisms: Vec<Arc<dyn AuthProvider>>) -> Self {
        Self {
            registry: MechanismRegistry::new(mechanisms),
        }
    }

    pub fn registry(&self) -> &MechanismRegistry {
        &self.registry
    }

    /// A GSS-wrapped `negTokenInit` listing every mechanism in registration
    /// order.
    pub fn negotiate_init_token(&self) -> SMBResult<Vec<u8>> {
        SPNEGOToken::Init(SPNEGOTokenInitBody::new(self.registry.oids(), None)).as_bytes(true)
    }

    /// The `negTokenInit2` variant carrying `negHints`, as Windows sends in
    /// its SMB2 NEGOTIATE response.
    pub fn negotiate_init2_token(&self) -> SMBResult<Vec<u8>> {
        SPNEGOToken::Init2(SPNEGOTokenInit2Body::new(self.registry.oids())).as_bytes(true)
    }

    /// Consumes one security blob from the client.
    ///
    /// SPNEGO tokens are tried first. Clients may also send NTLM messages
    /// without SPNEGO framing, which go straight to the NTLM mechanism.
    pub fn accept_security_context(&self, context: Option<GssContext>, input_token: &[u8]) -> GssAcceptResult {
        match SPNEGOToken::parse(input_token) {
            Ok((_, SPNEGOToken::Init(init))) => return self.accept_init(context, init),
            Ok((_, SPNEGOToken::Response(response))) => return self.accept_response(context, response),
            Ok((_, SPNEGOToken::Init2(init2))) => return self.accept_init(context, SPNEGOTokenInitBody::new(init2.mech_type_list, None)),
            Err(_err) => trace!(error = %_err, "Security blob is not SPNEGO"),
        }

        if is_signature_valid(input_token) {
            return self.accept_raw_ntlm(context, input_token);
        }

        debug!("Unrecognised security blob");
        GssAcceptResult::new(NTStatus::SecEInvalidToken, context, None)
    }

    fn accept_init(&self, context: Option<GssContext>, init: SPNEGOTokenInitBody) -> GssAcceptResult {
        let Some(preferred) = init.mech_type_list.first() else {
            debug!("negTokenInit without mechanisms");
            return GssAcceptResult::new(NTStatus::SecEInvalidToken, context, None);
        };

        // The optimistic token only belongs to the client's first choice.
        if let Some(mechanism) = self.registry.find_mechanism(preferred) {
            debug!(oid = ?preferred, "Selected the client's preferred mechanism");
            let mut new_context = GssContext::new(Arc::clone(mechanism));
            let input = init.mech_token.as_deref().unwrap_or_default();
            let (status, output) = mechanism.accept_security_context(&mut new_context.mechanism_context, input);
            new_context.complete = status == NTStatus::StatusSuccess;
            debug!(?status, "Mechanism accepted the initial token");

            let token = SPNEGOTokenResponseBody::new(status.into(), Some(preferred.clone()), output).as_bytes();
            return GssAcceptResult::new(status, Some(new_context), Some(token));
        }

        match self.registry.find_first_mechanism(&init.mech_type_list[1..]) {
            Some(mechanism) => {
                debug!(oid = ?mechanism.get_oid(), "Selected a fallback mechanism");
                let status = NTStatus::SecIContinueNeeded;
                let token = SPNEGOTokenResponseBody::new(status.into(), Some(mechanism.get_oid().to_vec()), None).as_bytes();
                GssAcceptResult::new(status, Some(GssContext::new(Arc::clone(mechanism))), Some(token))
            },
            None => {
                debug!("No offered mechanism is registered");
                GssAcceptResult::new(NTStatus::SecESecpkgNotFound, context, None)
            },
        }
    }

    fn accept_response(&self, context: Option<GssContext>, response: SPNEGOTokenResponseBody) -> GssAcceptResult {
        let Some(mut context) = context else {
            debug!("negTokenResp without a security context");
            return GssAcceptResult::new(NTStatus::SecEInvalidToken, None, None);
        };

        let input = response.response_token.as_deref().unwrap_or_default();
        let (status, output) = context.mechanism.accept_security_context(&mut context.mechanism_context, input);
        context.complete = status == NTStatus::StatusSuccess;
        debug!(?status, "Mechanism accepted a continuation token");

        let token = SPNEGOTokenResponseBody::new(status.into(), None, output).as_bytes();
        GssAcceptResult::new(status, Some(context), Some(token))
    }

    fn accept_raw_ntlm(&self, context: Option<GssContext>, input_token: &[u8]) -> GssAcceptResult {
        let Some(ntlm) = self.registry.find_mechanism(&NTLM_OID) else {
            debug!("Raw NTLM token but NTLM is not registered");
            return GssAcceptResult::new(NTStatus::SecESecpkgNotFound, context, None);
        };

        // A NEGOTIATE always starts over, whatever was bound before.
        let mut context = if get_message_type(input_token) == Some(NTLMMessageType::Negotiate) {
            debug!("Raw NTLM negotiate, binding a new context");
            GssContext::new(Arc::clone(ntlm))
        } else {
            match context {
                Some(context) if context.mechanism_oid() == NTLM_OID => context,
                other => {
                    debug!("Raw NTLM token without an NTLM context");
                    return GssAcceptResult::new(NTStatus::SecEInvalidToken, other, None);
                },
            }
        };

        let (status, output) = context.mechanism.accept_security_context(&mut context.mechanism_context, input_token);
        context.complete = status == NTStatus::StatusSuccess;
        GssAcceptResult::new(status, Some(context), output)
    }

    pub fn get_context_attribute(&self, context: Option<&GssContext>, name: GssAttributeName) -> Option<GssAttributeValue> {
        let context = context?;
        let mechanism_context = context.mechanism_context.as_ref()?;
        context.mechanism.get_context_attribute(mechanism_context, name)
    }

    /// Releases the context, leaving `None` behind. Returns `false` when
    /// there was nothing to release.
    pub fn delete_security_context(&self, context: &mut Option<GssContext>) -> bool {
        match context.take() {
            Some(mut context) => {
                context.mechanism.delete_security_context(&mut context.mechanism_context);
                true
            },
            None => false,
        }
    }
}
