//! Matchers select which entities a system is bound to.

use crate::capability::{Capability, CapabilityId, CapabilitySet};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Matcher {
    /// The entity exposes this capability.
    Has(CapabilityId),
    /// The inner matcher rejects the entity.
    Not(Box<Matcher>),
    /// Every inner matcher accepts the entity. Empty accepts everything.
    All(Vec<Matcher>),
}

impl Matcher {
    #[must_use]
    pub fn has<C: Capability>() -> Self {
        Matcher::Has(C::capability_id())
    }

    /// Shorthand for `not(has::<C>())`.
    #[must_use]
    pub fn lacks<C: Capability>() -> Self {
        Self::has::<C>().negate()
    }

    #[must_use]
    pub fn negate(self) -> Self {
        Matcher::Not(Box::new(self))
    }

    #[must_use]
    pub fn all(matchers: impl IntoIterator<Item = Matcher>) -> Self {
        Matcher::All(matchers.into_iter().collect())
    }

    #[must_use]
    pub fn matches(&self, capabilities: &CapabilitySet) -> bool {
        match self {
            Matcher::Has(id) => capabilities.has(*id),
            Matcher::Not(inner) => !inner.matches(capabilities),
            Matcher::All(inner) => inner.iter().all(|m| m.matches(capabilities)),
        }
    }
}
