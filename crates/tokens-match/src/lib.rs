//! Extracts structured values from text with compiled tokens templates.
//!
//! A [`Template`] is scanned against the input once. Every token whose
//! preamble is found captures the text that follows it; validators decide
//! whether the capture is accepted, transformers rewrite it, and the binder
//! stores it at the token's dotted path in the target object.
//!
//! # Example
//!
//! ```
//! use serde_json::json;
//! use tokens_match::Tokenizer;
//!
//! let tokenizer = Tokenizer::new();
//! let template = tokenizer
//!     .compile("Name: { Person.Name : ToUpper }, Age: { Person.Age : IsNumeric }")
//!     .unwrap();
//!
//! let extraction = tokenizer.tokenize(&template, "Name: Alice, Age: 42").unwrap();
//! assert!(extraction.result.success);
//! assert_eq!(
//!     extraction.value,
//!     json!({"Person": {"Name": "ALICE", "Age": "42"}})
//! );
//! ```
//!
//! Typed targets go through serde:
//!
//! ```
//! use serde::{Deserialize, Serialize};
//! use tokens_match::tokenize_into;
//! use tokens_template::Template;
//!
//! #[derive(Serialize, Deserialize, Default)]
//! struct Host {
//!     name: String,
//!     port: u16,
//! }
//!
//! let template = Template::compile("host {name} port {port}").unwrap();
//! let (host, _) = tokenize_into::<Host>(&template, "host example.org port 8080").unwrap();
//! assert_eq!(host.name, "example.org");
//! assert_eq!(host.port, 8080);
//! ```

mod binder;
mod engine;
mod location;
mod matcher;
mod result;

pub use binder::{to_json, Bind, BindError, BindMode, Binding, JsonTarget};
pub use engine::tokenize;
pub use location::FileLocation;
pub use matcher::{MatchReport, MatcherError, TemplateMatcher, TemplateResult};
pub use result::{HintResults, Match, MatchException, Miss, TokenizeResult};

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::Path;
use thiserror::Error;
use tokens_decorators::DecoratorRegistry;
use tokens_template::{CompileError, Template, TokenizerOptions};

#[derive(Error, Debug)]
pub enum TokenizeError {
    /// A bind failure with `ThrowOnMissingBindTarget` set.
    #[error("cannot bind token '{token}': {source}")]
    Bind {
        token: String,
        #[source]
        source: BindError,
    },
    #[error("cannot convert the extracted values: {0}")]
    Convert(#[from] serde_json::Error),
}

/// The bound object together with the scan report.
#[derive(Debug, Clone)]
pub struct Extraction {
    pub value: serde_json::Value,
    pub result: TokenizeResult,
}

/// Compiles and runs templates with a shared decorator registry and default
/// options.
#[derive(Debug, Clone, Default)]
pub struct Tokenizer {
    registry: DecoratorRegistry,
    options: TokenizerOptions,
}

impl Tokenizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Defaults for templates compiled from now on. Front matter still
    /// overrides them.
    pub fn with_options(mut self, options: TokenizerOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_registry(mut self, registry: DecoratorRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn registry_mut(&mut self) -> &mut DecoratorRegistry {
        &mut self.registry
    }

    pub fn options(&self) -> &TokenizerOptions {
        &self.options
    }

    pub fn compile(&self, content: &str) -> Result<Template, CompileError> {
        tokens_template::compile(content, &self.registry, &self.options)
    }

    pub fn compile_file(&self, path: &Path) -> Result<Template, CompileError> {
        tokens_template::compile_file(path, &self.registry, &self.options)
    }

    /// Scans `input` into a fresh JSON object.
    ///
    /// The registry and options were fixed into `template` when it was
    /// compiled, so any compiled template can be passed here.
    pub fn tokenize(&self, template: &Template, input: &str) -> Result<Extraction, TokenizeError> {
        let mut target = JsonTarget::new();
        let result = self.tokenize_into(template, input, &mut target)?;
        Ok(Extraction {
            value: target.into_value(),
            result,
        })
    }

    /// Scans `input` onto a caller-supplied target.
    pub fn tokenize_into(
        &self,
        template: &Template,
        input: &str,
        target: &mut dyn Bind,
    ) -> Result<TokenizeResult, TokenizeError> {
        engine::tokenize(template, input, target)
    }

    /// Compiles `content` with this tokenizer's registry and options, then
    /// scans `input` with it.
    pub fn extract(&self, content: &str, input: &str) -> Result<Extraction, ExtractError> {
        let template = self.compile(content)?;
        Ok(self.tokenize(&template, input)?)
    }
}

/// Failure of [`Tokenizer::extract`].
#[derive(Error, Debug)]
pub enum ExtractError {
    #[error(transparent)]
    Compile(#[from] CompileError),
    #[error(transparent)]
    Tokenize(#[from] TokenizeError),
}

/// Scans `input` into a fresh JSON object.
pub fn tokenize_json(template: &Template, input: &str) -> Result<Extraction, TokenizeError> {
    Tokenizer::new().tokenize(template, input)
}

/// Scans `input` into a `T`. Only members present in `T::default()` can be
/// bound; numbers and booleans are converted from the captured text.
pub fn tokenize_into<T>(template: &Template, input: &str) -> Result<(T, TokenizeResult), TokenizeError>
where
    T: Serialize + DeserializeOwned + Default,
{
    let mut target = JsonTarget::from_skeleton(&T::default())?;
    let result = engine::tokenize(template, input, &mut target)?;
    let value = serde_json::from_value(target.into_value())?;
    Ok((value, result))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;
    use tokens_decorators::{DecoratorError, Transformer, Value};

    #[derive(Debug, Default, Serialize, Deserialize, PartialEq)]
    #[serde(rename_all = "PascalCase")]
    struct Person {
        name: String,
        age: u32,
        tags: Vec<String>,
    }

    #[test]
    fn test_typed_extraction() {
        let template = Template::compile("Name: {Name}\nAge: {Age}\nTag: {Tags*}").unwrap();
        let (person, result) =
            tokenize_into::<Person>(&template, "Name: Ann\nAge: 42\nTag: a\nTag: b").unwrap();
        assert!(result.success);
        assert_eq!(
            person,
            Person {
                name: "Ann".to_string(),
                age: 42,
                tags: vec!["a".to_string(), "b".to_string()],
            }
        );
    }

    #[test]
    fn test_typed_extraction_records_unknown_members() {
        let template = Template::compile("Name: {Name}\nNick: {Nickname}").unwrap();
        let (person, result) = tokenize_into::<Person>(&template, "Name: Ann\nNick: A").unwrap();
        assert_eq!(person.name, "Ann");
        assert!(matches!(
            result.exceptions[0],
            MatchException::Bind {
                source: BindError::MissingMember { .. },
                ..
            }
        ));
        assert_eq!(result.misses[0].name, "Nickname");
    }

    #[test]
    fn test_typed_conversion_failure() {
        let template =
            Template::compile("---\nIgnoreMissingProperties: false\n---\nAge: {Age}").unwrap();
        let err = tokenize_into::<Person>(&template, "Age: old").unwrap_err();
        assert!(matches!(
            err,
            TokenizeError::Bind {
                source: BindError::Conversion { .. },
                ..
            }
        ));
    }

    #[test]
    fn test_caller_defaults_and_front_matter() {
        let tokenizer = Tokenizer::new().with_options(TokenizerOptions {
            case_sensitive: false,
            ..TokenizerOptions::default()
        });
        let template = tokenizer.compile("name: {Name}").unwrap();
        let extraction = tokenizer.tokenize(&template, "NAME: Bob").unwrap();
        assert_eq!(extraction.value, json!({"Name": "Bob"}));

        let template = tokenizer
            .compile("---\nCaseSensitive: true\n---\nname: {Name}")
            .unwrap();
        let extraction = tokenizer.tokenize(&template, "NAME: Bob").unwrap();
        assert!(!extraction.result.success);
    }

    #[derive(Default)]
    struct Reverse;

    impl Transformer for Reverse {
        fn transform(&self, value: &Value, _args: &[String]) -> Result<Option<Value>, DecoratorError> {
            Ok(Some(Value::String(value.to_text().chars().rev().collect())))
        }
    }

    #[test]
    fn test_custom_decorator() {
        let mut tokenizer = Tokenizer::new();
        tokenizer.registry_mut().add_transformer::<Reverse>("Reverse");
        let template = tokenizer.compile("Code: { Code : Reverse }").unwrap();
        let extraction = tokenizer.tokenize(&template, "Code: abc").unwrap();
        assert_eq!(extraction.value, json!({"Code": "cba"}));

        assert!(matches!(
            Tokenizer::new().compile("Code: { Code : Reverse }"),
            Err(CompileError::UnknownDecorator { .. })
        ));
    }

    #[test]
    fn test_extract_compiles_with_tokenizer_settings() {
        let mut tokenizer = Tokenizer::new().with_options(TokenizerOptions {
            terminate_on_newline: true,
            ..TokenizerOptions::default()
        });
        tokenizer.registry_mut().add_transformer::<Reverse>("Reverse");

        let extraction = tokenizer
            .extract("Code: { Code : Reverse }", "Code: abc\nmore")
            .unwrap();
        assert_eq!(extraction.value, json!({"Code": "cba"}));
        assert!(extraction.result.success);

        assert!(matches!(
            Tokenizer::new().extract("Code: { Code : Reverse }", "Code: abc"),
            Err(ExtractError::Compile(CompileError::UnknownDecorator { .. }))
        ));
    }

    #[test]
    fn test_shared_template_across_threads() {
        let template = Template::compile("Domains:\n{ Domain* }\n\nOwner: {Owner}").unwrap();
        let input = "Domains:\na.com\nb.com\n\nOwner: Ann";
        let expected = tokenize_json(&template, input).unwrap();

        std::thread::scope(|scope| {
            let handles: Vec<_> = (0..4)
                .map(|_| scope.spawn(|| tokenize_json(&template, input).unwrap()))
                .collect();
            for handle in handles {
                let extraction = handle.join().unwrap();
                assert_eq!(extraction.value, expected.value);
                assert_eq!(extraction.result, expected.result);
            }
        });
        assert_eq!(
            expected.value,
            json!({"Domain": ["a.com", "b.com"], "Owner": "Ann"})
        );
    }
}
