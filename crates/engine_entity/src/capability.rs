//! Capabilities: the typed data an entity exposes to systems.
//!
//! [`CapabilityId`] is derived from the capability's **string name** with the
//! FNV-1a 64-bit hash, so the same name always yields the same id.

use std::any::Any;
use std::fmt;

/// A unique identifier for a capability type, derived from its name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CapabilityId(pub u64);

impl CapabilityId {
    /// FNV-1a 64-bit offset basis.
    const FNV_OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;

    /// FNV-1a 64-bit prime.
    const FNV_PRIME: u64 = 0x0100_0000_01b3;

    /// Hash `name` with FNV-1a 64-bit.
    ///
    /// ```text
    /// hash = 0xcbf29ce484222325
    /// for each byte in name.as_bytes():
    ///     hash = (hash XOR byte) * 0x00000100000001b3
    /// ```
    #[must_use]
    pub const fn from_name(name: &str) -> Self {
        let bytes = name.as_bytes();
        let mut hash = Self::FNV_OFFSET_BASIS;
        let mut i = 0;
        while i < bytes.len() {
            hash ^= bytes[i] as u64;
            hash = hash.wrapping_mul(Self::FNV_PRIME);
            i += 1;
        }
        Self(hash)
    }

    #[must_use]
    pub fn of<C: Capability>() -> Self {
        C::capability_id()
    }
}

/// Data an entity can carry and systems can ask for.
///
/// ```rust
/// use engine_entity::Capability;
///
/// struct Nameable {
///     name: String,
/// }
///
/// impl Capability for Nameable {
///     fn capability_name() -> &'static str { "Nameable" }
/// }
/// ```
pub trait Capability: 'static {
    fn capability_name() -> &'static str;

    fn capability_id() -> CapabilityId {
        CapabilityId::from_name(Self::capability_name())
    }
}

struct Entry {
    id: CapabilityId,
    name: &'static str,
    value: Box<dyn Any>,
}

/// The capabilities of one entity, at most one value per capability.
#[derive(Default)]
pub struct CapabilitySet {
    entries: Vec<Entry>,
}

impl CapabilitySet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`CapabilitySet::insert`].
    #[must_use]
    pub fn with<C: Capability>(mut self, capability: C) -> Self {
        self.insert(capability);
        self
    }

    /// Add `capability`, returning the value it replaced.
    pub fn insert<C: Capability>(&mut self, capability: C) -> Option<C> {
        let id = C::capability_id();
        let value: Box<dyn Any> = Box::new(capability);
        match self.entries.iter_mut().find(|e| e.id == id) {
            Some(entry) => {
                let old = std::mem::replace(&mut entry.value, value);
                old.downcast::<C>().ok().map(|b| *b)
            }
            None => {
                self.entries.push(Entry {
                    id,
                    name: C::capability_name(),
                    value,
                });
                None
            }
        }
    }

    pub fn remove<C: Capability>(&mut self) -> Option<C> {
        let id = C::capability_id();
        let index = self.entries.iter().position(|e| e.id == id)?;
        let entry = self.entries.remove(index);
        entry.value.downcast::<C>().ok().map(|b| *b)
    }

    #[must_use]
    pub fn has(&self, id: CapabilityId) -> bool {
        self.entries.iter().any(|e| e.id == id)
    }

    #[must_use]
    pub fn contains<C: Capability>(&self) -> bool {
        self.has(C::capability_id())
    }

    #[must_use]
    pub fn get<C: Capability>(&self) -> Option<&C> {
        let id = C::capability_id();
        self.entries
            .iter()
            .find(|e| e.id == id)
            .and_then(|e| e.value.downcast_ref::<C>())
    }

    pub fn get_mut<C: Capability>(&mut self) -> Option<&mut C> {
        let id = C::capability_id();
        self.entries
            .iter_mut()
            .find(|e| e.id == id)
            .and_then(|e| e.value.downcast_mut::<C>())
    }

    /// Mutable access to two different capabilities at once. `None` when
    /// either is missing or `A` and `B` are the same capability.
    pub fn get_pair_mut<A: Capability, B: Capability>(&mut self) -> Option<(&mut A, &mut B)> {
        let (id_a, id_b) = (A::capability_id(), B::capability_id());
        if id_a == id_b {
            return None;
        }

        let mut a = None;
        let mut b = None;
        for entry in &mut self.entries {
            if entry.id == id_a {
                a = entry.value.downcast_mut::<A>();
            } else if entry.id == id_b {
                b = entry.value.downcast_mut::<B>();
            }
        }
        a.zip(b)
    }

    /// Capability names in insertion order.
    #[must_use]
    pub fn names(&self) -> Vec<&'static str> {
        self.entries.iter().map(|e| e.name).collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Debug for CapabilitySet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.names()).finish()
    }
}
