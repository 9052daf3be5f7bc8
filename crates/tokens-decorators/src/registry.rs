//! Name → decorator factory registry.

use crate::transformers::*;
use crate::validators::*;
use crate::{Transformer, Validator};
use std::collections::HashMap;

pub type TransformerFactory = fn() -> Box<dyn Transformer>;
pub type ValidatorFactory = fn() -> Box<dyn Validator>;

/// What a decorator name resolves to.
#[derive(Debug, Clone, Copy)]
pub enum DecoratorFactory {
    Transformer(TransformerFactory),
    Validator(ValidatorFactory),
}

fn make_transformer<T: Transformer + Default + 'static>() -> Box<dyn Transformer> {
    Box::new(T::default())
}

fn make_validator<T: Validator + Default + 'static>() -> Box<dyn Validator> {
    Box::new(T::default())
}

/// Registry of decorators, keyed by case-insensitive name.
///
/// Populate it once at startup and share it read-only afterwards.
/// [`DecoratorRegistry::default`] holds the built-in library; custom
/// decorators are added with explicit registration calls:
///
/// ```
/// use tokens_decorators::{DecoratorError, DecoratorRegistry, Transformer, Value};
///
/// #[derive(Default)]
/// struct Reverse;
///
/// impl Transformer for Reverse {
///     fn transform(&self, value: &Value, _args: &[String]) -> Result<Option<Value>, DecoratorError> {
///         Ok(Some(Value::String(value.to_text().chars().rev().collect())))
///     }
/// }
///
/// let mut registry = DecoratorRegistry::default();
/// registry.add_transformer::<Reverse>("Reverse");
/// assert!(registry.resolve("reverse").is_some());
/// ```
#[derive(Debug, Clone)]
pub struct DecoratorRegistry {
    entries: HashMap<String, (String, DecoratorFactory)>,
}

impl DecoratorRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// A registry holding the built-in transformers and validators.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry
            .add_transformer::<ToUpper>("ToUpper")
            .add_transformer::<ToLower>("ToLower")
            .add_transformer::<Trim>("Trim")
            .add_transformer::<Substring>("Substring")
            .add_transformer::<SubstringAfter>("SubstringAfter")
            .add_transformer::<SubstringAfterLast>("SubstringAfterLast")
            .add_transformer::<SubstringBefore>("SubstringBefore")
            .add_transformer::<SubstringBeforeLast>("SubstringBeforeLast")
            .add_transformer::<Replace>("Replace")
            .add_transformer::<RemoveStart>("RemoveStart")
            .add_transformer::<RemoveEnd>("RemoveEnd")
            .add_transformer::<Append>("Append")
            .add_transformer::<Prepend>("Prepend")
            .add_transformer::<Split>("Split")
            .add_transformer::<Set>("Set")
            .add_transformer::<ToDateTime>("ToDateTime");
        registry
            .add_validator::<IsNumeric>("IsNumeric")
            .add_validator::<IsNotEmpty>("IsNotEmpty")
            .add_validator::<IsNot>("IsNot")
            .add_validator::<IsDomainName>("IsDomainName")
            .add_validator::<IsEmail>("IsEmail")
            .add_validator::<IsUrl>("IsUrl")
            .add_validator::<IsLooseAbsoluteUrl>("IsLooseAbsoluteUrl")
            .add_validator::<IsPhoneNumber>("IsPhoneNumber")
            .add_validator::<IsDateTime>("IsDateTime")
            .add_validator::<IsLooseDateTime>("IsLooseDateTime")
            .add_validator::<MinLength>("MinLength")
            .add_validator::<MaxLength>("MaxLength")
            .add_validator::<Contains>("Contains")
            .add_validator::<StartsWith>("StartsWith")
            .add_validator::<EndsWith>("EndsWith")
            .add_validator::<Matches>("Matches");
        registry
    }

    /// Registers (or replaces) a decorator under `name`.
    pub fn add(&mut self, name: &str, factory: DecoratorFactory) -> &mut Self {
        if let Some((previous, _)) = self.entries.get(&name.to_lowercase()) {
            log::debug!("decorator '{}' replaced by '{}'", previous, name);
        }
        self.entries
            .insert(name.to_lowercase(), (name.to_string(), factory));
        self
    }

    pub fn add_transformer<T: Transformer + Default + 'static>(&mut self, name: &str) -> &mut Self {
        self.add(name, DecoratorFactory::Transformer(make_transformer::<T>))
    }

    pub fn add_validator<T: Validator + Default + 'static>(&mut self, name: &str) -> &mut Self {
        self.add(name, DecoratorFactory::Validator(make_validator::<T>))
    }

    pub fn resolve(&self, name: &str) -> Option<DecoratorFactory> {
        self.entries
            .get(&name.to_lowercase())
            .map(|(_, factory)| *factory)
    }

    /// Registered names, as spelled at registration, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.entries.values().map(|(n, _)| n.as_str()).collect();
        names.sort_unstable();
        names
    }
}

impl Default for DecoratorRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}
