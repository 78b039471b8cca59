//! Parsed argument values handed to command handlers.

use std::any::Any;
use std::rc::Rc;

use crate::error::ArgumentError;

/// A single parsed value.
///
/// The built-in types produce [`Argument::String`] and [`Argument::Int`].
/// Custom type handlers wrap whatever they parse in [`Argument::Custom`].
#[derive(Debug, Clone)]
pub enum Argument {
    String(String),
    Int(i32),
    Custom(Rc<dyn Any>),
}

impl Argument {
    /// Wrap a custom value.
    pub fn custom<T: Any>(value: T) -> Self {
        Self::Custom(Rc::new(value))
    }
}

impl From<&str> for Argument {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for Argument {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<i32> for Argument {
    fn from(value: i32) -> Self {
        Self::Int(value)
    }
}

/// The ordered argument list for one handler invocation: the caller's extra
/// parameters first, then one value per typed slot on the matched path.
#[derive(Debug, Clone, Default)]
pub struct Arguments {
    values: Vec<Argument>,
}

impl Arguments {
    #[must_use]
    pub fn new(values: Vec<Argument>) -> Self {
        Self { values }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Argument> {
        self.values.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Argument> {
        self.values.iter()
    }

    /// Read the string at `index`.
    ///
    /// # Errors
    ///
    /// Fails when the index is out of range or holds another type.
    pub fn string(&self, index: usize) -> Result<&str, ArgumentError> {
        match self.values.get(index) {
            Some(Argument::String(s)) => Ok(s.as_str()),
            Some(_) => Err(ArgumentError::WrongType {
                index,
                expected: "string",
            }),
            None => Err(ArgumentError::Missing(index)),
        }
    }

    /// Read the integer at `index`.
    ///
    /// # Errors
    ///
    /// Fails when the index is out of range or holds another type.
    pub fn int(&self, index: usize) -> Result<i32, ArgumentError> {
        match self.values.get(index) {
            Some(Argument::Int(v)) => Ok(*v),
            Some(_) => Err(ArgumentError::WrongType {
                index,
                expected: "int",
            }),
            None => Err(ArgumentError::Missing(index)),
        }
    }

    /// Read a value produced by a custom type handler.
    ///
    /// # Errors
    ///
    /// Fails when the index is out of range or the value is not a `T`.
    pub fn get_custom<T: Any>(&self, index: usize) -> Result<&T, ArgumentError> {
        match self.values.get(index) {
            Some(Argument::Custom(value)) => {
                value
                    .downcast_ref::<T>()
                    .ok_or(ArgumentError::WrongType {
                        index,
                        expected: std::any::type_name::<T>(),
                    })
            }
            Some(_) => Err(ArgumentError::WrongType {
                index,
                expected: std::any::type_name::<T>(),
            }),
            None => Err(ArgumentError::Missing(index)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_typed_accessors() {
        let args = Arguments::new(vec![
            Argument::from("console"),
            Argument::from(7),
            Argument::custom(2.5f64),
        ]);
        assert_eq!(args.len(), 3);
        assert_eq!(args.string(0).unwrap(), "console");
        assert_eq!(args.int(1).unwrap(), 7);
        assert_eq!(*args.get_custom::<f64>(2).unwrap(), 2.5);
    }

    #[test]
    fn test_accessor_errors() {
        let args = Arguments::new(vec![Argument::from(1)]);
        assert_eq!(
            args.string(0),
            Err(ArgumentError::WrongType {
                index: 0,
                expected: "string"
            })
        );
        assert_eq!(args.int(3), Err(ArgumentError::Missing(3)));
        assert!(args.get_custom::<u8>(0).is_err());
    }
}
