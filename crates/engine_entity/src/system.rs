//! Systems: a function run per bound entity, plus the matchers and hooks
//! that decide when.
//!
//! A system function takes an [`Invocation`] followed by zero, one, or two
//! `&mut C` capability parameters. Each capability parameter adds a
//! [`Matcher::Has`] so the function only ever sees entities that carry it.
//!
//! ```rust
//! use engine_entity::{Capability, Hook, Invocation, System};
//!
//! struct Health(u32);
//! impl Capability for Health {
//!     fn capability_name() -> &'static str { "Health" }
//! }
//!
//! let regen = System::builder("regen")
//!     .on(Hook::Tick)
//!     .run(|_: Invocation, health: &mut Health| health.0 += 1);
//! assert_eq!(regen.matchers().len(), 1);
//! ```

use std::fmt;

use crate::capability::{Capability, CapabilityId, CapabilitySet};
use crate::entity::Entity;
use crate::matcher::Matcher;

/// When a system's function is called.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Hook {
    /// When an entity is bound during add (or when the system is added).
    Add,
    /// Once per bound entity on every tick.
    Tick,
    /// When an entity is unbound during remove.
    Remove,
}

/// The entity a system is being run on, and why.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Invocation {
    pub entity: Entity,
    pub hook: Hook,
}

/// A function usable as a system body. `Marker` tells the impls apart.
pub trait SystemFn<Marker>: 'static {
    /// Capabilities the function's parameters need.
    fn required() -> Vec<CapabilityId>;

    /// Run on one entity. Skipped when a required capability is missing.
    fn call(&mut self, invocation: Invocation, capabilities: &mut CapabilitySet);
}

impl<F> SystemFn<()> for F
where
    F: FnMut(Invocation) + 'static,
{
    fn required() -> Vec<CapabilityId> {
        Vec::new()
    }

    fn call(&mut self, invocation: Invocation, _capabilities: &mut CapabilitySet) {
        self(invocation);
    }
}

impl<F, A> SystemFn<(A,)> for F
where
    F: FnMut(Invocation, &mut A) + 'static,
    A: Capability,
{
    fn required() -> Vec<CapabilityId> {
        vec![A::capability_id()]
    }

    fn call(&mut self, invocation: Invocation, capabilities: &mut CapabilitySet) {
        if let Some(a) = capabilities.get_mut::<A>() {
            self(invocation, a);
        }
    }
}

impl<F, A, B> SystemFn<(A, B)> for F
where
    F: FnMut(Invocation, &mut A, &mut B) + 'static,
    A: Capability,
    B: Capability,
{
    fn required() -> Vec<CapabilityId> {
        vec![A::capability_id(), B::capability_id()]
    }

    fn call(&mut self, invocation: Invocation, capabilities: &mut CapabilitySet) {
        if let Some((a, b)) = capabilities.get_pair_mut::<A, B>() {
            self(invocation, a, b);
        }
    }
}

type BoxedRun = Box<dyn FnMut(Invocation, &mut CapabilitySet)>;

pub struct System {
    name: String,
    hooks: Vec<Hook>,
    matchers: Vec<Matcher>,
    run: BoxedRun,
}

impl System {
    #[must_use]
    pub fn builder(name: impl Into<String>) -> SystemBuilder {
        SystemBuilder {
            name: name.into(),
            hooks: Vec::new(),
            matchers: Vec::new(),
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn hooks(&self) -> &[Hook] {
        &self.hooks
    }

    #[must_use]
    pub fn matchers(&self) -> &[Matcher] {
        &self.matchers
    }

    #[must_use]
    pub fn subscribes(&self, hook: Hook) -> bool {
        self.hooks.contains(&hook)
    }

    /// Whether every matcher accepts `capabilities`.
    #[must_use]
    pub fn matches(&self, capabilities: &CapabilitySet) -> bool {
        self.matchers.iter().all(|m| m.matches(capabilities))
    }

    pub(crate) fn run(&mut self, invocation: Invocation, capabilities: &mut CapabilitySet) {
        (self.run)(invocation, capabilities);
    }
}

impl fmt::Debug for System {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("System")
            .field("name", &self.name)
            .field("hooks", &self.hooks)
            .field("matchers", &self.matchers)
            .finish_non_exhaustive()
    }
}

/// Builder for [`System`]. Without any [`on`](SystemBuilder::on) call the
/// system runs on [`Hook::Tick`].
#[derive(Debug, Clone)]
pub struct SystemBuilder {
    name: String,
    hooks: Vec<Hook>,
    matchers: Vec<Matcher>,
}

impl SystemBuilder {
    #[must_use]
    pub fn on(mut self, hook: Hook) -> Self {
        if !self.hooks.contains(&hook) {
            self.hooks.push(hook);
        }
        self
    }

    /// Add a matcher; all matchers must accept an entity for it to bind.
    #[must_use]
    pub fn matching(mut self, matcher: Matcher) -> Self {
        self.matchers.push(matcher);
        self
    }

    /// Finish the system with its function.
    #[must_use]
    pub fn run<Marker, F: SystemFn<Marker>>(mut self, mut f: F) -> System {
        self.matchers
            .extend(F::required().into_iter().map(Matcher::Has));
        if self.hooks.is_empty() {
            self.hooks.push(Hook::Tick);
        }
        System {
            name: self.name,
            hooks: self.hooks,
            matchers: self.matchers,
            run: Box::new(move |invocation: Invocation, capabilities: &mut CapabilitySet| {
                f.call(invocation, capabilities);
            }),
        }
    }
}
