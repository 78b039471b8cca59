//! # engine_command
//!
//! The in-game console's command layer.
//!
//! This crate provides:
//!
//! - [`TypeRegistry`]: named argument types (`string`, `int`, and custom
//!   [`ArgumentType`]s) that compile `%` specs and parse tokens.
//! - [`CommandRegistry`]: a prefix tree of literals and typed slots that
//!   dispatches command lines to [`CommandHandler`]s.
//! - [`tokenize`]: the quote-aware line splitter.
//! - [`run_script`]: config-line script execution.
//! - [`Console`] and [`ConsoleLog`]: dispatch with a bounded, shared log.
//!
//! ## Usage
//!
//! ```rust
//! use engine_command::{CommandHandler, CommandRegistry, types::INT};
//!
//! let mut registry = CommandRegistry::new(0);
//! registry
//!     .register(
//!         "time set %0,24000",
//!         CommandHandler::new([INT], |args| {
//!             let ticks = args.int(0)?;
//!             assert_eq!(ticks, 6000);
//!             Ok(())
//!         }),
//!     )
//!     .unwrap();
//! registry.execute(&[], "time set 6000").unwrap();
//! ```

pub mod argument;
pub mod console;
pub mod error;
pub mod registry;
pub mod script;
pub mod tokenizer;
pub mod types;

pub use argument::{Argument, Arguments};
pub use console::{Console, ConsoleLog};
pub use error::{ArgumentError, CommandError, RegistrationError};
pub use registry::{CommandHandler, CommandRegistry, install_panic_hook};
pub use script::{ScriptFailure, ScriptReport, run_script};
pub use tokenizer::tokenize;
pub use types::{ArgumentType, IntRange, IntType, StringType, TypeHandler, TypeRegistry};
