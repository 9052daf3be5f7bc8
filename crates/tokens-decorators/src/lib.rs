//! Decorators for tokens templates.
//!
//! A decorator is a named, optionally parameterized operation attached to a
//! template token, e.g. `{ Person.Age : IsNumeric }` or
//! `{ Person.Name : ToUpper, Substring(0, 3) }`. Every decorator resolves to
//! one of two kinds:
//!
//! - a [`Transformer`], which rewrites the captured value;
//! - a [`Validator`], which decides whether the captured value may be bound to
//!   the token at all. A leading `!` on the name negates the predicate.
//!
//! Decorators are stateless. The [`DecoratorRegistry`] maps names to
//! factories once at startup and a fresh instance is created per invocation.
//!
//! # Example
//!
//! ```
//! use tokens_decorators::{DecoratorFactory, DecoratorRegistry, Value};
//!
//! let registry = DecoratorRegistry::default();
//! let Some(DecoratorFactory::Transformer(make)) = registry.resolve("toupper") else {
//!     panic!("ToUpper is built in");
//! };
//! let upper = make().transform(&Value::from("alice"), &[]).unwrap();
//! assert_eq!(upper, Some(Value::from("ALICE")));
//! ```

mod datetime;
mod registry;
pub mod transformers;
pub mod validators;

use std::fmt;
use thiserror::Error;

pub use datetime::{parse_date_time, parse_loose_date_time, DateTime};
pub use registry::{DecoratorFactory, DecoratorRegistry, TransformerFactory, ValidatorFactory};

// ============ Value Types ============

/// A value flowing through a token's decorator chain.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    String(String),
    Number(f64),
    Bool(bool),
    Array(Vec<Value>),
    Null,
}

impl Value {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(a) => Some(a),
            _ => None,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::String(_) => "string",
            Value::Number(_) => "number",
            Value::Bool(_) => "bool",
            Value::Array(_) => "array",
            Value::Null => "null",
        }
    }

    /// `Null`, the empty string and the empty array are empty.
    pub fn is_empty(&self) -> bool {
        match self {
            Value::String(s) => s.is_empty(),
            Value::Array(a) => a.is_empty(),
            Value::Null => true,
            Value::Number(_) | Value::Bool(_) => false,
        }
    }

    /// Text form of the value; `Null` is the empty string.
    pub fn to_text(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::String(s) => write!(f, "{}", s),
            Value::Number(n) => write!(f, "{}", n),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Array(items) => {
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                Ok(())
            }
            Value::Null => Ok(()),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

// ============ Errors ============

/// Raised when a decorator is invoked with missing or malformed arguments.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DecoratorError {
    #[error("{decorator}: missing required argument '{argument}'")]
    MissingArgument {
        decorator: &'static str,
        argument: &'static str,
    },
    #[error("{decorator}: invalid argument '{value}' (expected {expected})")]
    InvalidArgument {
        decorator: &'static str,
        value: String,
        expected: &'static str,
    },
}

// ============ Decorator Traits ============

/// Rewrites a captured value.
///
/// Returning `Ok(None)` means the transformer did not apply: the value is
/// left unchanged and the bind carries on.
pub trait Transformer: Send + Sync {
    fn transform(&self, value: &Value, args: &[String]) -> Result<Option<Value>, DecoratorError>;
}

/// Decides whether a captured value may be bound to a token.
pub trait Validator: Send + Sync {
    fn validate(&self, value: &Value, args: &[String]) -> Result<bool, DecoratorError>;
}

// ============ Argument Helpers ============

pub(crate) fn required_arg<'a>(
    decorator: &'static str,
    args: &'a [String],
    index: usize,
    argument: &'static str,
) -> Result<&'a str, DecoratorError> {
    args.get(index)
        .map(String::as_str)
        .ok_or(DecoratorError::MissingArgument {
            decorator,
            argument,
        })
}

pub(crate) fn number_arg(
    decorator: &'static str,
    args: &[String],
    index: usize,
    argument: &'static str,
) -> Result<usize, DecoratorError> {
    let raw = required_arg(decorator, args, index, argument)?;
    raw.trim()
        .parse()
        .map_err(|_| DecoratorError::InvalidArgument {
            decorator,
            value: raw.to_string(),
            expected: "a non-negative integer",
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_display() {
        assert_eq!(Value::from("a").to_text(), "a");
        assert_eq!(Value::Number(42.0).to_text(), "42");
        assert_eq!(Value::Null.to_text(), "");
        assert_eq!(
            Value::Array(vec![Value::from("a"), Value::from("b")]).to_text(),
            "a, b"
        );
    }

    #[test]
    fn test_value_is_empty() {
        assert!(Value::Null.is_empty());
        assert!(Value::from("").is_empty());
        assert!(Value::Array(vec![]).is_empty());
        assert!(!Value::Bool(false).is_empty());
    }

    #[test]
    fn test_number_arg_errors() {
        let args = vec!["abc".to_string()];
        assert!(matches!(
            number_arg("MaxLength", &args, 0, "length"),
            Err(DecoratorError::InvalidArgument { .. })
        ));
        assert_eq!(
            number_arg("MaxLength", &[], 0, "length"),
            Err(DecoratorError::MissingArgument {
                decorator: "MaxLength",
                argument: "length"
            })
        );
    }
}
