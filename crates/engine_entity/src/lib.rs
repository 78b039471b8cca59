//! # engine_entity
//!
//! Entities, their capabilities, and the systems that run over them.
//!
//! This crate provides:
//!
//! - [`Capability`] and [`CapabilitySet`]: typed per-entity data, identified
//!   by an FNV-1a hash of the capability name.
//! - [`Entity`] and [`EntityAllocator`]: opaque `u64` references.
//! - [`Matcher`]: has / not / all predicates over capability sets.
//! - [`System`] and [`SystemBuilder`]: hooked functions with matchers.
//! - [`Container`]: binds entities to systems and ticks them.
//!
//! ```rust
//! use engine_entity::{Capability, CapabilitySet, Container, Invocation, System};
//!
//! struct Countable(u32);
//! impl Capability for Countable {
//!     fn capability_name() -> &'static str { "Countable" }
//! }
//!
//! let mut container = Container::new();
//! container.add_system(System::builder("count").run(|_: Invocation, c: &mut Countable| c.0 += 1));
//! let e = container.add_entity(CapabilitySet::new().with(Countable(0)));
//! container.tick();
//! assert_eq!(container.get::<Countable>(e).unwrap().0, 1);
//! ```

pub mod capability;
pub mod container;
pub mod entity;
pub mod matcher;
pub mod system;

pub use capability::{Capability, CapabilityId, CapabilitySet};
pub use container::{Container, ContainerError, SystemId};
pub use entity::{Entity, EntityAllocator};
pub use matcher::Matcher;
pub use system::{Hook, Invocation, System, SystemBuilder, SystemFn};
