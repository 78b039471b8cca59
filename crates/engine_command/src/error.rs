//! Command-layer error types.

/// Faults raised while building the command tree.
///
/// These are programmer errors: they happen during initialisation and the
/// caller is expected to abort startup with `?`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistrationError {
    /// The description contained no tokens.
    #[error("empty command description")]
    EmptyDescription,

    /// The handler's parameter count does not match the description.
    #[error("command '{description}' expects {expected} parameters, handler takes {found}")]
    ArityMismatch {
        description: String,
        expected: usize,
        found: usize,
    },

    /// A `%` slot names a parameter type with no registered handler.
    #[error("no handler for type '{0}'")]
    MissingTypeHandler(String),

    /// The text after `%` was rejected by the slot's type handler.
    #[error("invalid spec '{spec}' for type '{type_key}': {reason}")]
    InvalidSpec {
        type_key: String,
        spec: String,
        reason: String,
    },

    /// A handler is already attached at this path.
    #[error("duplicate command: {0}")]
    DuplicateCommand(String),

    /// A type key was registered twice.
    #[error("type '{0}' is already registered")]
    DuplicateType(String),
}

/// Errors returned from dispatching a command line.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CommandError {
    /// No path in the tree matches the tokens, or the path ends on a node
    /// without a handler.
    #[error("command not found")]
    NotFound,

    /// A typed slot rejected its token and no literal picked up the branch.
    #[error("{0}")]
    Parse(String),

    /// The handler returned an error or panicked.
    #[error("{0}")]
    Handler(String),
}

/// Errors from reading typed values out of [`crate::Arguments`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ArgumentError {
    #[error("missing argument {0}")]
    Missing(usize),

    #[error("argument {index} is not a {expected}")]
    WrongType { index: usize, expected: &'static str },
}
