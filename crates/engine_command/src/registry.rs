//! Command registry: a prefix tree of literal tokens and typed slots.
//!
//! Nodes live in an arena and refer to their children by index. A node owns a
//! map of lowercase literal tokens, an ordered list of typed slots, and at most
//! one handler. Typed slots are tried in registration order before literals;
//! the first slot whose subtree resolves wins.

use std::cell::Cell;
use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::rc::Rc;

use tracing::debug;

use crate::argument::{Argument, Arguments};
use crate::error::{CommandError, RegistrationError};
use crate::tokenizer::tokenize;
use crate::types::{ArgumentType, SpecData, TypeHandler, TypeRegistry};

type NodeId = usize;

const ROOT: NodeId = 0;

type HandlerFn = dyn Fn(&Arguments) -> anyhow::Result<()>;

thread_local! {
    static IN_HANDLER: Cell<bool> = const { Cell::new(false) };
}

/// Install a panic hook that keeps quiet about panics raised inside command
/// handlers, which dispatch already reports as [`CommandError::Handler`].
/// Panics anywhere else go to the hook that was installed before.
pub fn install_panic_hook() {
    let previous = panic::take_hook();
    panic::set_hook(Box::new(move |info| {
        if in_handler() {
            debug!(%info, "command handler panicked");
        } else {
            previous(info);
        }
    }));
}

/// Whether the current thread is running a command handler.
pub(crate) fn in_handler() -> bool {
    IN_HANDLER.get()
}

/// A command handler together with the type keys of its parameters.
///
/// The first `extra_parameters` entries describe the caller-supplied context
/// values and are never resolved; the rest name the [`TypeRegistry`] key for
/// each `%` slot in the description, in order.
pub struct CommandHandler {
    params: Vec<String>,
    func: Box<HandlerFn>,
}

impl CommandHandler {
    pub fn new<I, S, F>(params: I, func: F) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
        F: Fn(&Arguments) -> anyhow::Result<()> + 'static,
    {
        Self {
            params: params.into_iter().map(Into::into).collect(),
            func: Box::new(func),
        }
    }

    /// Number of parameters the handler takes, extras included.
    #[must_use]
    pub fn arity(&self) -> usize {
        self.params.len()
    }

    fn invoke(&self, args: &Arguments) -> Result<(), CommandError> {
        let outer = IN_HANDLER.replace(true);
        let result = panic::catch_unwind(AssertUnwindSafe(|| (self.func)(args)));
        IN_HANDLER.set(outer);
        match result {
            Ok(Ok(())) => Ok(()),
            Ok(Err(err)) => Err(CommandError::Handler(err.to_string())),
            Err(payload) => Err(CommandError::Handler(panic_message(payload.as_ref()))),
        }
    }
}

impl std::fmt::Debug for CommandHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandHandler")
            .field("params", &self.params)
            .finish_non_exhaustive()
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "handler panicked".to_string()
    }
}

struct TypedSlot {
    handler: Rc<dyn TypeHandler>,
    spec: SpecData,
    child: NodeId,
}

#[derive(Default)]
struct Node {
    literals: HashMap<String, NodeId>,
    slots: Vec<TypedSlot>,
    handler: Option<CommandHandler>,
}

/// One `%` slot of a description, resolved before the tree is touched.
struct ResolvedSlot {
    handler: Rc<dyn TypeHandler>,
    spec: SpecData,
}

enum Step<'a> {
    Literal(&'a str),
    Slot(ResolvedSlot),
}

/// Registry of console commands.
///
/// Every handler receives `extra_parameters` caller-supplied values ahead of
/// the values parsed from the command line.
pub struct CommandRegistry {
    extra_parameters: usize,
    types: TypeRegistry,
    nodes: Vec<Node>,
    patterns: Vec<String>,
}

impl CommandRegistry {
    /// Create an empty registry whose handlers take `extra_parameters`
    /// leading context values.
    #[must_use]
    pub fn new(extra_parameters: usize) -> Self {
        Self::with_types(extra_parameters, TypeRegistry::new())
    }

    /// Create an empty registry that resolves slot types from `types`.
    #[must_use]
    pub fn with_types(extra_parameters: usize, types: TypeRegistry) -> Self {
        Self {
            extra_parameters,
            types,
            nodes: vec![Node::default()],
            patterns: Vec::new(),
        }
    }

    #[must_use]
    pub fn extra_parameters(&self) -> usize {
        self.extra_parameters
    }

    /// Register an additional argument type.
    ///
    /// # Errors
    ///
    /// Returns [`RegistrationError::DuplicateType`] if the key is taken.
    pub fn register_type<T: ArgumentType>(
        &mut self,
        key: impl Into<String>,
        handler: T,
    ) -> Result<(), RegistrationError> {
        self.types.register(key, handler)
    }

    /// Attach `handler` at the path described by `description`.
    ///
    /// Tokens are literals (matched case-insensitively) or `%` followed by an
    /// optional spec for the next typed parameter. Slots with the same type
    /// handler and equal spec data share a node.
    ///
    /// # Errors
    ///
    /// Fails on an empty description, a parameter count that does not match
    /// the slots plus extras, an unknown type key, a spec the type rejects, or
    /// a path that already has a handler. A failed registration leaves the
    /// tree unchanged.
    pub fn register(
        &mut self,
        description: &str,
        handler: CommandHandler,
    ) -> Result<(), RegistrationError> {
        let tokens: Vec<&str> = description.split_whitespace().collect();
        if tokens.is_empty() {
            return Err(RegistrationError::EmptyDescription);
        }

        let slot_count = tokens.iter().filter(|t| t.starts_with('%')).count();
        let expected = self.extra_parameters + slot_count;
        if handler.arity() != expected {
            return Err(RegistrationError::ArityMismatch {
                description: description.to_string(),
                expected,
                found: handler.arity(),
            });
        }

        let mut steps = Vec::with_capacity(tokens.len());
        let mut pattern = Vec::with_capacity(tokens.len());
        let mut param = self.extra_parameters;
        for token in &tokens {
            match token.strip_prefix('%') {
                Some(spec) => {
                    let key = &handler.params[param];
                    param += 1;
                    let ty = self.types.lookup(key)?;
                    let spec = ty.compile_spec(spec).map_err(|reason| {
                        RegistrationError::InvalidSpec {
                            type_key: key.clone(),
                            spec: spec.to_string(),
                            reason,
                        }
                    })?;
                    pattern.push(format!("<{}>", ty.describe_spec(&spec)));
                    steps.push(Step::Slot(ResolvedSlot { handler: ty, spec }));
                }
                None => {
                    pattern.push(token.to_ascii_lowercase());
                    steps.push(Step::Literal(*token));
                }
            }
        }

        if let Some(node) = self.find(&steps)
            && self.nodes[node].handler.is_some()
        {
            return Err(RegistrationError::DuplicateCommand(description.to_string()));
        }

        let mut node = ROOT;
        for step in steps {
            node = match step {
                Step::Literal(token) => self.descend_literal(node, token),
                Step::Slot(slot) => self.descend_slot(node, slot),
            };
        }
        self.nodes[node].handler = Some(handler);

        let pattern = pattern.join(" ");
        debug!(command = %pattern, node, "registered command");
        self.patterns.push(pattern);
        Ok(())
    }

    /// Registered command paths in registration order, e.g.
    /// `teleport <int:-100,100> <string:16>`.
    #[must_use]
    pub fn describe(&self) -> &[String] {
        &self.patterns
    }

    /// Tokenise `line`, walk the tree, and invoke the matched handler with
    /// `extras` followed by the parsed slot values.
    ///
    /// # Errors
    ///
    /// Returns [`CommandError::NotFound`] when no path matches,
    /// [`CommandError::Parse`] when a typed slot rejected a token and nothing
    /// else matched, and [`CommandError::Handler`] when the handler failed or
    /// panicked.
    ///
    /// # Panics
    ///
    /// Panics if `extras.len()` differs from the registry's extra parameter
    /// count; that is a bug in the caller, not in the input.
    pub fn execute(&self, extras: &[Argument], line: &str) -> Result<(), CommandError> {
        assert_eq!(
            extras.len(),
            self.extra_parameters,
            "command registry expects {} extra parameters",
            self.extra_parameters
        );

        let tokens = tokenize(line);
        self.resolve(ROOT, &tokens, extras.to_vec(), line)
    }

    /// Walk from `node` over `tokens`, invoking the handler found at the end.
    /// A failed handler counts as a failed branch, so siblings still get a
    /// turn; its message is kept as the last error.
    fn resolve(
        &self,
        node: NodeId,
        tokens: &[&str],
        args: Vec<Argument>,
        line: &str,
    ) -> Result<(), CommandError> {
        let Some((token, rest)) = tokens.split_first() else {
            let handler = self.nodes[node]
                .handler
                .as_ref()
                .ok_or(CommandError::NotFound)?;
            debug!(line, node, "dispatching command");
            return handler.invoke(&Arguments::new(args));
        };

        let mut last_error = None;
        for slot in &self.nodes[node].slots {
            match slot.handler.parse_token(token, &slot.spec) {
                Ok(value) => {
                    let mut next = args.clone();
                    next.push(value);
                    match self.resolve(slot.child, rest, next, line) {
                        Ok(()) => return Ok(()),
                        Err(CommandError::NotFound) => {}
                        Err(err) => last_error = Some(err),
                    }
                }
                Err(reason) => last_error = Some(CommandError::Parse(reason)),
            }
        }

        if let Some(&child) = self.nodes[node].literals.get(&token.to_ascii_lowercase()) {
            return match self.resolve(child, rest, args, line) {
                Err(CommandError::NotFound) => Err(last_error.unwrap_or(CommandError::NotFound)),
                result => result,
            };
        }

        Err(last_error.unwrap_or(CommandError::NotFound))
    }

    /// Follow `steps` without creating nodes.
    fn find(&self, steps: &[Step<'_>]) -> Option<NodeId> {
        let mut node = ROOT;
        for step in steps {
            node = match step {
                Step::Literal(token) => *self.nodes[node]
                    .literals
                    .get(&token.to_ascii_lowercase())?,
                Step::Slot(slot) => self.matching_slot(node, slot)?,
            };
        }
        Some(node)
    }

    fn matching_slot(&self, node: NodeId, slot: &ResolvedSlot) -> Option<NodeId> {
        self.nodes[node]
            .slots
            .iter()
            .find(|existing| {
                std::ptr::addr_eq(Rc::as_ptr(&existing.handler), Rc::as_ptr(&slot.handler))
                    && existing.handler.spec_eq(&existing.spec, &slot.spec)
            })
            .map(|existing| existing.child)
    }

    fn descend_literal(&mut self, node: NodeId, token: &str) -> NodeId {
        let key = token.to_ascii_lowercase();
        if let Some(&child) = self.nodes[node].literals.get(&key) {
            return child;
        }
        let child = self.alloc();
        self.nodes[node].literals.insert(key, child);
        child
    }

    fn descend_slot(&mut self, node: NodeId, slot: ResolvedSlot) -> NodeId {
        if let Some(child) = self.matching_slot(node, &slot) {
            return child;
        }
        let child = self.alloc();
        self.nodes[node].slots.push(TypedSlot {
            handler: slot.handler,
            spec: slot.spec,
            child,
        });
        child
    }

    fn alloc(&mut self) -> NodeId {
        self.nodes.push(Node::default());
        self.nodes.len() - 1
    }
}

impl std::fmt::Debug for CommandRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandRegistry")
            .field("extra_parameters", &self.extra_parameters)
            .field("types", &self.types)
            .field("nodes", &self.nodes.len())
            .field("commands", &self.patterns)
            .finish()
    }
}
