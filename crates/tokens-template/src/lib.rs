//! Compiler for the tokens template language.
//!
//! A template is literal text interleaved with `{ ... }` tokens. The text in
//! front of each token is its *preamble*: the scanner looks for the preamble in
//! the input and captures what follows it as the token's value.
//!
//! # Template Format
//!
//! ```text
//! ---
//! # front matter is optional
//! name: whois
//! hint: Registrar
//! tag: domain
//! CaseSensitive: false
//! set: Source = whois
//! ---
//! Domain Name: { Domain.Name : ToLower }
//! Name Server: { Domain.NameServers* : IsDomainName }
//! Created: { Domain.Created! : ToDateTime('yyyy-MM-dd') }
//! ```
//!
//! Token flags follow the name: `?` optional, `!` required, `*` repeating
//! (implies optional) and `$` terminate on newline. Decorators follow a `:`
//! and a literal value follows an `=`. `{{` and `}}` are literal braces.
//!
//! # Example
//!
//! ```
//! use tokens_template::Template;
//!
//! let template = Template::compile("This {{is}} the preamble{TokenName}").unwrap();
//! assert_eq!(template.tokens.len(), 1);
//! assert_eq!(template.tokens[0].preamble, "This {is} the preamble");
//! assert_eq!(template.tokens[0].name, "TokenName");
//! ```

mod compile;
mod front_matter;
mod parser;

use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokens_decorators::{DecoratorFactory, DecoratorRegistry};

// ============ Options ============

/// Options controlling compilation and matching of a template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenizerOptions {
    pub case_sensitive: bool,
    pub out_of_order_tokens: bool,
    pub terminate_on_newline: bool,
    pub trim_leading_whitespace_in_preamble: bool,
    pub trim_trailing_whitespace: bool,
    pub trim_preamble_before_newline: bool,
    pub throw_on_missing_bind_target: bool,
}

impl Default for TokenizerOptions {
    fn default() -> Self {
        Self {
            case_sensitive: true,
            out_of_order_tokens: false,
            terminate_on_newline: false,
            trim_leading_whitespace_in_preamble: true,
            trim_trailing_whitespace: true,
            trim_preamble_before_newline: false,
            throw_on_missing_bind_target: false,
        }
    }
}

// ============ Data Types ============

/// 1-based position in a template.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Location {
    pub line: usize,
    pub column: usize,
}

impl Location {
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}, column {}", self.line, self.column)
    }
}

/// A decorator resolved against the registry.
#[derive(Debug, Clone)]
pub struct Decorator {
    pub name: String,
    pub args: Vec<String>,
    /// Set by a leading `!`; only validators can be negated.
    pub negated: bool,
    pub factory: DecoratorFactory,
    pub location: Location,
}

impl Decorator {
    pub fn is_validator(&self) -> bool {
        matches!(self.factory, DecoratorFactory::Validator(_))
    }

    pub fn is_transformer(&self) -> bool {
        matches!(self.factory, DecoratorFactory::Transformer(_))
    }
}

#[derive(Debug, Clone)]
pub struct Token {
    /// Position in [`Template::tokens`].
    pub id: usize,
    /// For a repeat continuation, the id of the token it continues.
    pub depends_on: Option<usize>,
    /// Dotted binding path; empty for the trailing sink token.
    pub name: String,
    pub preamble: String,
    pub optional: bool,
    pub required: bool,
    pub repeating: bool,
    pub terminate_on_newline: bool,
    pub concatenate: bool,
    pub concatenation_separator: String,
    pub decorators: Vec<Decorator>,
    /// Literal value bound instead of the captured text.
    pub value: Option<String>,
    /// Bound once per run from front matter instead of being scanned.
    pub is_front_matter: bool,
    pub location: Location,
}

impl Token {
    /// A sink captures trailing text and is never bound.
    pub fn is_sink(&self) -> bool {
        self.name.is_empty()
    }

    pub fn has_validators(&self) -> bool {
        self.decorators.iter().any(Decorator::is_validator)
    }

    /// Tokens that may be offered the same preamble again after a rejected
    /// capture instead of being marked as missed.
    pub fn considered_more_than_once(&self) -> bool {
        self.repeating || self.has_validators()
    }
}

/// Literal text that scores a template without being bound.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hint {
    pub text: String,
    pub optional: bool,
}

/// A compiled template. Immutable once built and safe to share between
/// threads.
#[derive(Debug, Clone)]
pub struct Template {
    pub name: Option<String>,
    /// Template source with line endings normalized to `\n`.
    pub content: String,
    pub tokens: Vec<Token>,
    pub hints: Vec<Hint>,
    pub tags: Vec<String>,
    pub options: TokenizerOptions,
}

impl Template {
    /// Compiles `content` with the built-in decorators and default options.
    pub fn compile(content: &str) -> Result<Template, CompileError> {
        compile(content, &DecoratorRegistry::default(), &TokenizerOptions::default())
    }

    /// Whether the template carries every tag in `tags`, ignoring case.
    pub fn has_tags<S: AsRef<str>>(&self, tags: &[S]) -> bool {
        tags.iter().all(|wanted| {
            self.tags
                .iter()
                .any(|tag| tag.eq_ignore_ascii_case(wanted.as_ref()))
        })
    }
}

// ============ Errors ============

/// Malformed template text.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("parse error at {location}: {message}")]
pub struct ParseError {
    pub location: Location,
    pub message: String,
}

impl ParseError {
    pub(crate) fn new(location: Location, message: impl Into<String>) -> Self {
        Self {
            location,
            message: message.into(),
        }
    }
}

#[derive(Error, Debug)]
pub enum CompileError {
    #[error("cannot read template {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error("unknown decorator '{name}' at {location}")]
    UnknownDecorator { name: String, location: Location },
}

impl CompileError {
    /// Template position of the error, if it has one.
    pub fn location(&self) -> Option<Location> {
        match self {
            CompileError::Io { .. } => None,
            CompileError::Parse(e) => Some(e.location),
            CompileError::UnknownDecorator { location, .. } => Some(*location),
        }
    }
}

// ============ Public API ============

/// Compiles a template.
///
/// `defaults` are the caller's options; front matter in the template
/// overrides them.
pub fn compile(
    content: &str,
    registry: &DecoratorRegistry,
    defaults: &TokenizerOptions,
) -> Result<Template, CompileError> {
    let content = content.replace("\r\n", "\n");
    let (block, body, body_line) = front_matter::split(&content)?;

    let mut options = defaults.clone();
    let header = match block {
        Some(lines) => front_matter::parse(&lines, &mut options)?,
        None => front_matter::FrontMatter::default(),
    };
    let raw = parser::parse_body(body, body_line)?;

    compile::build(content, header, raw, registry, options)
}

/// Compiles a template file. Templates without a `name` in their front
/// matter are named after the file stem.
pub fn compile_file(
    path: &Path,
    registry: &DecoratorRegistry,
    defaults: &TokenizerOptions,
) -> Result<Template, CompileError> {
    let content = std::fs::read_to_string(path).map_err(|source| CompileError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let mut template = compile(&content, registry, defaults)?;
    if template.name.is_none() {
        template.name = path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned());
    }
    Ok(template)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn error_location(template: &str) -> Location {
        Template::compile(template)
            .unwrap_err()
            .location()
            .expect("error should carry a location")
    }

    #[test]
    fn test_escaped_braces() {
        let template = Template::compile("This {{is}} the preamble{TokenName}").unwrap();
        assert_eq!(template.tokens.len(), 1);
        assert_eq!(template.tokens[0].preamble, "This {is} the preamble");
    }

    #[test]
    fn test_defaults() {
        let template = Template::compile("Name: { Person.Name }").unwrap();
        assert_eq!(template.options, TokenizerOptions::default());
        let token = &template.tokens[0];
        assert_eq!(token.id, 0);
        assert_eq!(token.name, "Person.Name");
        assert_eq!(token.preamble, "Name: ");
        assert_eq!(token.concatenation_separator, " ");
        assert_eq!(token.location, Location::new(1, 7));
        assert!(!token.optional && !token.required && !token.repeating);
    }

    #[test]
    fn test_flags() {
        let template = Template::compile("{A?}{B!}{C*}{D $ ?}").unwrap();
        let flags: Vec<_> = template
            .tokens
            .iter()
            .map(|t| (t.optional, t.required, t.repeating, t.terminate_on_newline))
            .collect();
        assert_eq!(
            flags,
            vec![
                (true, false, false, false),
                (false, true, false, false),
                (true, false, true, false),
                (true, false, false, true),
            ]
        );
    }

    #[test]
    fn test_flag_aliases() {
        let template =
            Template::compile("{A : Required, EOL}{B : Repeating}{C : Concat('<CR>')}").unwrap();
        let tokens = &template.tokens;
        assert!(tokens[0].required && tokens[0].terminate_on_newline);
        assert!(tokens[0].decorators.is_empty());
        assert!(tokens[1].repeating && tokens[1].optional);
        assert!(tokens[2].concatenate);
        assert_eq!(
            tokens[2].concatenation_separator,
            if cfg!(windows) { "\r\n" } else { "\n" }
        );
    }

    #[test]
    fn test_decorators_and_arguments() {
        let template = Template::compile(
            "{ A : ToUpper, Substring(0, 3), !IsNot('a, }b', \"c\"), Replace( x ,y) }",
        )
        .unwrap();
        let decorators = &template.tokens[0].decorators;
        let summary: Vec<_> = decorators
            .iter()
            .map(|d| (d.name.as_str(), d.args.clone(), d.negated))
            .collect();
        assert_eq!(
            summary,
            vec![
                ("ToUpper", vec![], false),
                ("Substring", vec!["0".to_string(), "3".to_string()], false),
                ("IsNot", vec!["a, }b".to_string(), "c".to_string()], true),
                ("Replace", vec!["x".to_string(), "y".to_string()], false),
            ]
        );
        assert!(decorators[0].is_transformer());
        assert!(decorators[2].is_validator());
        assert!(template.tokens[0].considered_more_than_once());
    }

    #[test]
    fn test_literal_values() {
        let template = Template::compile("{ A = some value }{ B = ' padded ' }").unwrap();
        assert_eq!(template.tokens[0].value.as_deref(), Some("some value"));
        assert_eq!(template.tokens[1].value.as_deref(), Some(" padded "));
    }

    #[test]
    fn test_trailing_text_becomes_sink() {
        let template = Template::compile("Name: {Name} (end)").unwrap();
        assert_eq!(template.tokens.len(), 2);
        assert!(template.tokens[1].is_sink());
        assert_eq!(template.tokens[1].preamble, "(end)");
    }

    #[test]
    fn test_repeating_token_is_split_at_newline() {
        let template =
            Template::compile("Domains:\n{ DomainName : Repeating }\n\n{ SecondaryDomain }")
                .unwrap();
        let tokens = &template.tokens;
        assert_eq!(tokens.len(), 3);

        assert_eq!(tokens[0].name, "DomainName");
        assert_eq!(tokens[0].preamble, "Domains:\n");
        assert!(!tokens[0].repeating && tokens[0].terminate_on_newline);

        assert_eq!(tokens[1].name, "DomainName");
        assert_eq!(tokens[1].preamble, "");
        assert_eq!(tokens[1].depends_on, Some(0));
        assert!(tokens[1].repeating && tokens[1].terminate_on_newline);

        assert_eq!(tokens[2].id, 2);
        assert_eq!(tokens[2].preamble, "\n\n");
    }

    #[test]
    fn test_preamble_trimming() {
        let template = Template::compile("  Name: {A}\n  \n{B}").unwrap();
        assert_eq!(template.tokens[0].preamble, "Name: ");
        assert_eq!(template.tokens[1].preamble, "\n  \n");

        let options = TokenizerOptions {
            trim_preamble_before_newline: true,
            ..TokenizerOptions::default()
        };
        let template =
            compile("Header\n  Name: {A}", &DecoratorRegistry::default(), &options).unwrap();
        assert_eq!(template.tokens[0].preamble, "Name: ");
    }

    #[test]
    fn test_terminate_on_newline_option() {
        let options = TokenizerOptions {
            terminate_on_newline: true,
            ..TokenizerOptions::default()
        };
        let template = compile("{A} {B}", &DecoratorRegistry::default(), &options).unwrap();
        assert!(template.tokens.iter().all(|t| t.terminate_on_newline));
    }

    #[test]
    fn test_crlf_is_normalized() {
        let err = Template::compile("A:\r\n{A}\r\n{B?!}").unwrap_err();
        assert_eq!(err.location(), Some(Location::new(3, 4)));
    }

    #[test]
    fn test_front_matter() {
        let template = Template::compile(
            "---\n# comment\nname: whois\nCaseSensitive: false\nhint: Registrar\nHint?: Domain\ntag: a\ntag: b\nset: Source : ToUpper = whois\n---\nName: {Name}",
        )
        .unwrap();
        assert_eq!(template.name.as_deref(), Some("whois"));
        assert!(!template.options.case_sensitive);
        assert_eq!(
            template.hints,
            vec![
                Hint {
                    text: "Registrar".to_string(),
                    optional: false
                },
                Hint {
                    text: "Domain".to_string(),
                    optional: true
                },
            ]
        );
        assert!(template.has_tags(&["A", "b"]));
        assert!(!template.has_tags(&["c"]));

        assert_eq!(template.tokens.len(), 2);
        assert_eq!(template.tokens[0].name, "Name");
        assert_eq!(template.tokens[0].location, Location::new(11, 7));
        let set = &template.tokens[1];
        assert!(set.is_front_matter);
        assert_eq!(set.name, "Source");
        assert_eq!(set.value.as_deref(), Some("whois"));
        assert_eq!(set.decorators[0].name, "ToUpper");
    }

    #[test]
    fn test_ignore_missing_properties() {
        let template =
            Template::compile("---\nIgnoreMissingProperties: false\n---\n{A}").unwrap();
        assert!(template.options.throw_on_missing_bind_target);
    }

    #[test]
    fn test_front_matter_errors() {
        assert_eq!(error_location("---\nname: x\n{A}"), Location::new(1, 1));
        assert_eq!(error_location("---\n  Colour: red\n---\n{A}"), Location::new(2, 3));
        assert_eq!(
            error_location("---\nCaseSensitive: maybe\n---\n{A}"),
            Location::new(2, 16)
        );
        assert_eq!(error_location("---\njust text\n---\n{A}"), Location::new(2, 1));
    }

    #[test]
    fn test_parse_errors_point_at_offending_character() {
        // unescaped closing brace
        assert_eq!(error_location("abc } {A}"), Location::new(1, 5));
        // optional and required
        assert_eq!(error_location("x\n{ Name?! }"), Location::new(2, 8));
        // name character after a flag
        assert_eq!(error_location("{ Na me }"), Location::new(1, 6));
        // empty name reported at the closing brace
        assert_eq!(error_location("ab{  }"), Location::new(1, 6));
        // unclosed token, quote and argument list report their opening character
        assert_eq!(error_location("ab\n {Name"), Location::new(2, 2));
        assert_eq!(error_location("{A : IsNot('x)}"), Location::new(1, 12));
        assert_eq!(error_location("{A : IsNot(x}"), Location::new(1, 11));
        // negated flag alias and negated transformer
        assert_eq!(error_location("{A : !Required}"), Location::new(1, 6));
        assert_eq!(error_location("{A : !ToUpper}"), Location::new(1, 6));
    }

    #[test]
    fn test_unknown_decorator() {
        let err = Template::compile("{A : IsNumeric, Frobnicate}").unwrap_err();
        assert!(matches!(
            err,
            CompileError::UnknownDecorator { ref name, location }
                if name == "Frobnicate" && location == Location::new(1, 17)
        ));
    }

    #[test]
    fn test_compile_file_names_template_after_stem() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("invoice.tokens");
        let mut file = std::fs::File::create(&path).unwrap();
        write!(file, "Total: {{ Total }}").unwrap();

        let template =
            compile_file(&path, &DecoratorRegistry::default(), &TokenizerOptions::default())
                .unwrap();
        assert_eq!(template.name.as_deref(), Some("invoice"));
        assert_eq!(template.tokens[0].preamble, "Total: ");

        let missing = compile_file(
            &dir.path().join("missing.tokens"),
            &DecoratorRegistry::default(),
            &TokenizerOptions::default(),
        );
        assert!(matches!(missing, Err(CompileError::Io { .. })));
    }
}
