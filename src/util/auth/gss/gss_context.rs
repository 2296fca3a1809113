use std::fmt::{Debug, Formatter};
use std::sync::Arc;

use crate::util::auth::{AuthProvider, MechanismContext};

/// One connection's security context: the mechanism chosen during negotiation
/// and whatever state that mechanism keeps. The binding never changes; a new
/// negotiation produces a new context.
pub struct GssContext {
    pub(crate) mechanism: Arc<dyn AuthProvider>,
    pub(crate) mechanism_context: Option<MechanismContext>,
    pub(crate) complete: bool,
}

impl GssContext {
    pub(crate) fn new(mechanism: Arc<dyn AuthProvider>) -> Self {
        Self {
            mechanism,
            mechanism_context: None,
            complete: false,
        }
    }

    pub fn mechanism(&self) -> &Arc<dyn AuthProvider> {
        &self.mechanism
    }

    pub fn mechanism_oid(&self) -> &[u8] {
        self.mechanism.get_oid()
    }

    pub fn mechanism_context(&self) -> Option<&MechanismContext> {
        self.mechanism_context.as_ref()
    }

    /// True once the bound mechanism reported success.
    pub fn is_complete(&self) -> bool {
        self.complete
    }
}

impl Debug for GssContext {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GssContext")
            .field("mechanism", &self.mechanism_oid())
            .field("mechanism_context", &self.mechanism_context)
            .field("complete", &self.complete)
            .finish()
    }
}
