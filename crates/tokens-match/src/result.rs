use crate::binder::BindError;
use crate::location::FileLocation;
use thiserror::Error;
use tokens_decorators::{DecoratorError, Value};
use tokens_template::Hint;

/// One bound token occurrence.
#[derive(Debug, Clone, PartialEq)]
pub struct Match {
    pub token_id: usize,
    pub name: String,
    /// The value after transformers ran.
    pub value: Value,
    pub location: FileLocation,
}

/// A named token that was never bound.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Miss {
    pub token_id: usize,
    pub name: String,
    pub required: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HintResults {
    pub matches: Vec<Hint>,
    pub misses: Vec<Hint>,
}

/// A recovered error raised while binding a capture.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MatchException {
    #[error("token '{token}': decorator '{decorator}': {source}")]
    Decorator {
        token: String,
        decorator: String,
        #[source]
        source: DecoratorError,
    },
    #[error("token '{token}': {source}")]
    Bind {
        token: String,
        #[source]
        source: BindError,
    },
}

/// Outcome of one scan.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TokenizeResult {
    pub matches: Vec<Match>,
    pub misses: Vec<Miss>,
    pub hints: HintResults,
    pub exceptions: Vec<MatchException>,
    /// At least one match, no missed required token and no missed required
    /// hint.
    pub success: bool,
}

impl TokenizeResult {
    pub fn matches_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Match> + 'a {
        self.matches.iter().filter(move |m| m.name == name)
    }

    pub fn first_value(&self, name: &str) -> Option<&Value> {
        self.matches.iter().find(|m| m.name == name).map(|m| &m.value)
    }

    pub(crate) fn compute_success(&mut self) {
        self.success = !self.matches.is_empty()
            && !self.misses.iter().any(|miss| miss.required)
            && !self.hints.misses.iter().any(|hint| !hint.optional);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn found(token_id: usize, name: &str, value: &str) -> Match {
        Match {
            token_id,
            name: name.to_string(),
            value: Value::from(value),
            location: FileLocation::start(),
        }
    }

    #[test]
    fn test_first_value() {
        let result = TokenizeResult {
            matches: vec![found(0, "Ns", "a.com"), found(1, "Ns", "b.com")],
            ..TokenizeResult::default()
        };
        let name = String::from("Ns");
        assert_eq!(result.first_value(&name), Some(&Value::from("a.com")));
        assert_eq!(result.first_value("Missing"), None);
        assert_eq!(result.matches_named("Ns").count(), 2);
    }

    #[test]
    fn test_success_needs_a_match_and_no_required_miss() {
        let mut result = TokenizeResult::default();
        result.compute_success();
        assert!(!result.success);

        result.matches.push(found(0, "Name", "Bob"));
        result.compute_success();
        assert!(result.success);

        result.misses.push(Miss {
            token_id: 1,
            name: "Age".to_string(),
            required: true,
        });
        result.compute_success();
        assert!(!result.success);
    }
}
