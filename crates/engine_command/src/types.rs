//! Argument types and the registry that resolves them by key.
//!
//! A type handler has three jobs: compile the text after a `%` into spec data
//! once at registration, parse a token against that spec data at dispatch,
//! and decide whether two spec datas are equal so identical slots can share a
//! tree node. Implement [`ArgumentType`] for a typed handler; the registry
//! stores it behind the object-safe [`TypeHandler`].

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use crate::argument::Argument;
use crate::error::RegistrationError;

/// Key of the built-in string type.
pub const STRING: &str = "string";

/// Key of the built-in integer type.
pub const INT: &str = "int";

/// A parser for one kind of command argument.
pub trait ArgumentType: 'static {
    /// Per-slot configuration compiled from the `%` spec.
    type Spec: PartialEq + fmt::Debug + 'static;

    /// Short name shown in command listings.
    fn name(&self) -> &'static str;

    /// Compile the text following `%` into spec data.
    ///
    /// # Errors
    ///
    /// Returns a human-readable reason when the spec is malformed.
    fn compile(&self, spec: &str) -> Result<Self::Spec, String>;

    /// Parse one command token.
    ///
    /// # Errors
    ///
    /// Returns the reason the token was rejected.
    fn parse(&self, token: &str, spec: &Self::Spec) -> Result<Argument, String>;

    /// Render the slot for listings, e.g. `string:16`.
    fn describe(&self, spec: &Self::Spec) -> String {
        let _ = spec;
        ArgumentType::name(self).to_string()
    }
}

/// Opaque spec data produced by [`TypeHandler::compile_spec`].
#[derive(Debug)]
pub struct SpecData(Box<dyn Any>);

/// Object-safe view of an [`ArgumentType`], implemented for every one.
pub trait TypeHandler {
    fn name(&self) -> &'static str;
    fn compile_spec(&self, spec: &str) -> Result<SpecData, String>;
    fn parse_token(&self, token: &str, spec: &SpecData) -> Result<Argument, String>;
    fn spec_eq(&self, a: &SpecData, b: &SpecData) -> bool;
    fn describe_spec(&self, spec: &SpecData) -> String;
}

impl<T: ArgumentType> TypeHandler for T {
    fn name(&self) -> &'static str {
        ArgumentType::name(self)
    }

    fn compile_spec(&self, spec: &str) -> Result<SpecData, String> {
        ArgumentType::compile(self, spec).map(|data| SpecData(Box::new(data)))
    }

    fn parse_token(&self, token: &str, spec: &SpecData) -> Result<Argument, String> {
        match spec.0.downcast_ref::<T::Spec>() {
            Some(spec) => ArgumentType::parse(self, token, spec),
            None => Err(format!(
                "spec data does not belong to type '{}'",
                ArgumentType::name(self)
            )),
        }
    }

    fn spec_eq(&self, a: &SpecData, b: &SpecData) -> bool {
        match (a.0.downcast_ref::<T::Spec>(), b.0.downcast_ref::<T::Spec>()) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        }
    }

    fn describe_spec(&self, spec: &SpecData) -> String {
        match spec.0.downcast_ref::<T::Spec>() {
            Some(spec) => ArgumentType::describe(self, spec),
            None => ArgumentType::name(self).to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Built-in types
// ---------------------------------------------------------------------------

/// Strings with an optional maximum length in bytes.
///
/// An empty spec means unbounded (`None`); otherwise the spec is the decimal
/// limit.
#[derive(Debug, Clone, Copy, Default)]
pub struct StringType;

impl ArgumentType for StringType {
    type Spec = Option<usize>;

    fn name(&self) -> &'static str {
        STRING
    }

    fn compile(&self, spec: &str) -> Result<Self::Spec, String> {
        if spec.is_empty() {
            return Ok(None);
        }
        spec.parse::<usize>()
            .map(Some)
            .map_err(|_| format!("invalid string length: {spec}"))
    }

    fn parse(&self, token: &str, spec: &Self::Spec) -> Result<Argument, String> {
        if let Some(limit) = *spec
            && token.len() > limit
        {
            return Err(format!("string too long (got {} > {limit})", token.len()));
        }
        Ok(Argument::String(token.to_string()))
    }

    fn describe(&self, spec: &Self::Spec) -> String {
        match spec {
            Some(limit) => format!("{STRING}:{limit}"),
            None => STRING.to_string(),
        }
    }
}

/// Inclusive bounds for [`IntType`] slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntRange {
    pub min: i32,
    pub max: i32,
}

impl Default for IntRange {
    fn default() -> Self {
        Self {
            min: 0,
            max: i32::MAX,
        }
    }
}

/// Signed 32-bit integers within an inclusive `min,max` range.
///
/// An empty spec defaults to `0,2147483647`.
#[derive(Debug, Clone, Copy, Default)]
pub struct IntType;

impl ArgumentType for IntType {
    type Spec = IntRange;

    fn name(&self) -> &'static str {
        INT
    }

    fn compile(&self, spec: &str) -> Result<Self::Spec, String> {
        if spec.is_empty() {
            return Ok(IntRange::default());
        }
        let (min, max) = spec
            .split_once(',')
            .ok_or_else(|| format!("expected 'min,max', got '{spec}'"))?;
        let min = min
            .parse::<i32>()
            .map_err(|_| format!("invalid int bound: {min}"))?;
        let max = max
            .parse::<i32>()
            .map_err(|_| format!("invalid int bound: {max}"))?;
        if min > max {
            return Err(format!("empty int range ({min} > {max})"));
        }
        Ok(IntRange { min, max })
    }

    fn parse(&self, token: &str, spec: &Self::Spec) -> Result<Argument, String> {
        let value = token
            .parse::<i32>()
            .map_err(|_| format!("invalid int: {token}"))?;
        if value < spec.min {
            return Err(format!("int too small ({value} < {})", spec.min));
        }
        if value > spec.max {
            return Err(format!("int too big ({value} > {})", spec.max));
        }
        Ok(Argument::Int(value))
    }

    fn describe(&self, spec: &Self::Spec) -> String {
        if *spec == IntRange::default() {
            INT.to_string()
        } else {
            format!("{INT}:{},{}", spec.min, spec.max)
        }
    }
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// Type handlers keyed by the names handlers use for their parameters.
///
/// Populated with [`STRING`] and [`INT`] on construction.
pub struct TypeRegistry {
    handlers: HashMap<String, Rc<dyn TypeHandler>>,
}

impl TypeRegistry {
    #[must_use]
    pub fn new() -> Self {
        let mut handlers: HashMap<String, Rc<dyn TypeHandler>> = HashMap::new();
        handlers.insert(STRING.to_string(), Rc::new(StringType));
        handlers.insert(INT.to_string(), Rc::new(IntType));
        Self { handlers }
    }

    /// Bind a type key to a handler.
    ///
    /// # Errors
    ///
    /// Returns [`RegistrationError::DuplicateType`] if the key is taken.
    pub fn register<T: ArgumentType>(
        &mut self,
        key: impl Into<String>,
        handler: T,
    ) -> Result<(), RegistrationError> {
        let key = key.into();
        if self.handlers.contains_key(&key) {
            return Err(RegistrationError::DuplicateType(key));
        }
        tracing::debug!(key = %key, "registered argument type");
        self.handlers.insert(key, Rc::new(handler));
        Ok(())
    }

    /// Resolve a type key.
    ///
    /// # Errors
    ///
    /// Returns [`RegistrationError::MissingTypeHandler`] for unknown keys.
    pub fn lookup(&self, key: &str) -> Result<Rc<dyn TypeHandler>, RegistrationError> {
        self.handlers
            .get(key)
            .cloned()
            .ok_or_else(|| RegistrationError::MissingTypeHandler(key.to_string()))
    }
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for TypeRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut keys: Vec<&str> = self.handlers.keys().map(String::as_str).collect();
        keys.sort_unstable();
        f.debug_struct("TypeRegistry").field("types", &keys).finish()
    }
}
