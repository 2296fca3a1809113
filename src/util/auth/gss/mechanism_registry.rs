use std::fmt::{Debug, Formatter};
use std::sync::Arc;

use crate::util::auth::AuthProvider;

/// The mechanisms a server offers, in preference order. Read-only once built
/// and shared by every connection.
#[derive(Clone, Default)]
pub struct MechanismRegistry {
    mechanisms: Vec<Arc<dyn AuthProvider>>,
}

impl MechanismRegistry {
    pub fn new(mechanisms: Vec<Arc<dyn AuthProvider>>) -> Self {
        Self { mechanisms }
    }

    /// The mechanism registered under exactly `oid`.
    pub fn find_mechanism(&self, oid: &[u8]) -> Option<&Arc<dyn AuthProvider>> {
        self.mechanisms.iter().find(|mechanism| mechanism.get_oid() == oid)
    }

    /// The first identifier in `oids` that has a registered mechanism; the
    /// client's order wins over ours.
    pub fn find_first_mechanism(&self, oids: &[Vec<u8>]) -> Option<&Arc<dyn AuthProvider>> {
        oids.iter().find_map(|oid| self.find_mechanism(oid))
    }

    pub fn oids(&self) -> Vec<Vec<u8>> {
        self.mechanisms.iter()
            .map(|mechanism| mechanism.get_oid().to_vec())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.mechanisms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mechanisms.is_empty()
    }
}

impl Debug for MechanismRegistry {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MechanismRegistry")
            .field("oids", &self.oids())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use smb_core::nt_status::NTStatus;

    use crate::util::auth::{GssAttributeName, GssAttributeValue, MechanismContext};
    use crate::util::auth::ntlm::{NTLM_OID, NTLMAuthProvider};

    use super::*;

    const KERBEROS_OID: [u8; 9] = [0x2a, 0x86, 0x48, 0x86, 0xf7, 0x12, 0x01, 0x02, 0x02];

    struct NamedMechanism(Vec<u8>);

    impl AuthProvider for NamedMechanism {
        fn get_oid(&self) -> &[u8] {
            &self.0
        }

        fn accept_security_context(&self, _context: &mut Option<MechanismContext>, _input_token: &[u8]) -> (NTStatus, Option<Vec<u8>>) {
            (NTStatus::StatusNotSupported, None)
        }

        fn get_context_attribute(&self, _context: &MechanismContext, _name: GssAttributeName) -> Option<GssAttributeValue> {
            None
        }

        fn delete_security_context(&self, context: &mut Option<MechanismContext>) -> bool {
            context.take().is_some()
        }
    }

    fn registry() -> MechanismRegistry {
        MechanismRegistry::new(vec![
            Arc::new(NamedMechanism(KERBEROS_OID.to_vec())),
            Arc::new(NTLMAuthProvider::new(vec![], false)),
        ])
    }

    #[test]
    fn lookup_does_not_depend_on_position() {
        let registry = registry();
        assert_eq!(registry.find_mechanism(&NTLM_OID).map(|m| m.get_oid()), Some(&NTLM_OID[..]));
        assert_eq!(registry.find_mechanism(&KERBEROS_OID).map(|m| m.get_oid()), Some(&KERBEROS_OID[..]));

        let reversed = MechanismRegistry::new(vec![
            Arc::new(NTLMAuthProvider::new(vec![], false)),
            Arc::new(NamedMechanism(KERBEROS_OID.to_vec())),
        ]);
        assert!(reversed.find_mechanism(&KERBEROS_OID).is_some());
        assert!(reversed.find_mechanism(&NTLM_OID[..9]).is_none());
    }

    #[test]
    fn first_match_follows_client_order() {
        let registry = registry();
        let unknown = vec![0x2a, 0x03];
        let found = registry.find_first_mechanism(&[unknown.clone(), NTLM_OID.to_vec(), KERBEROS_OID.to_vec()]);
        assert_eq!(found.map(|m| m.get_oid()), Some(&NTLM_OID[..]));
        assert!(registry.find_first_mechanism(&[unknown]).is_none());
        assert!(registry.find_first_mechanism(&[]).is_none());
    }

    #[test]
    fn oids_in_registration_order() {
        assert_eq!(registry().oids(), vec![KERBEROS_OID.to_vec(), NTLM_OID.to_vec()]);
        assert_eq!(registry().len(), 2);
        assert!(MechanismRegistry::default().is_empty());
    }
}
