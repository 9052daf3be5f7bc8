//! Character state machine for template bodies and `set:` directives.

use crate::{Location, ParseError};
use std::mem;

const LINE_SEPARATOR: &str = if cfg!(windows) { "\r\n" } else { "\n" };

#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct RawDecorator {
    pub name: String,
    pub args: Vec<String>,
    pub negated: bool,
    pub location: Location,
}

/// A token as written, before decorator resolution.
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct RawToken {
    pub preamble: String,
    pub name: String,
    pub optional: bool,
    pub required: bool,
    pub repeating: bool,
    pub terminate_on_newline: bool,
    pub concatenate: bool,
    pub concatenation_separator: Option<String>,
    pub decorators: Vec<RawDecorator>,
    pub value: Option<String>,
    pub location: Location,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Preamble,
    TokenName,
    TokenFlags,
    Decorator,
    DecoratorArgument,
    QuotedDecoratorArgument(char),
    AfterQuotedArgument,
    AfterDecorator,
    TokenValue,
    QuotedTokenValue(char),
    AfterTokenValue,
}

#[derive(Debug, Default)]
struct DecoratorBuilder {
    name: String,
    name_closed: bool,
    negated: bool,
    start: Option<Location>,
    args: Vec<String>,
    argument: String,
    argument_quoted: bool,
    open_paren: Location,
    open_quote: Location,
}

impl DecoratorBuilder {
    fn push_argument(&mut self) {
        let argument = mem::take(&mut self.argument);
        let argument = if self.argument_quoted {
            argument
        } else {
            argument.trim().to_string()
        };
        self.args.push(argument);
        self.argument_quoted = false;
    }

    fn close_arguments(&mut self) {
        if !self.args.is_empty() || self.argument_quoted || !self.argument.trim().is_empty() {
            self.push_argument();
        }
    }
}

/// The token under construction.
#[derive(Debug, Default)]
struct TokenBuilder {
    token: RawToken,
    decorator: Option<DecoratorBuilder>,
    value: Option<String>,
    value_quoted: bool,
    open_quote: Location,
}

struct Parser {
    chars: Vec<char>,
    pos: usize,
    line: usize,
    column: usize,
    state: State,
    preamble: String,
    preamble_start: Location,
    builder: TokenBuilder,
    tokens: Vec<RawToken>,
    /// Parsing the body of a `set:` directive, which has no braces.
    embedded: bool,
}

/// Parses a template body. `first_line` is the template line the body
/// starts on.
pub(crate) fn parse_body(body: &str, first_line: usize) -> Result<Vec<RawToken>, ParseError> {
    Parser::new(body, Location::new(first_line, 1), State::Preamble, false).run()
}

/// Parses the body of a `set:` front-matter directive, e.g.
/// `Source : ToUpper = whois`.
pub(crate) fn parse_set(body: &str, start: Location) -> Result<RawToken, ParseError> {
    let mut parser = Parser::new(body, start, State::TokenName, true);
    parser.builder.token.location = start;
    let mut tokens = parser.run()?;
    match tokens.pop() {
        Some(token) if tokens.is_empty() => Ok(token),
        _ => Err(ParseError::new(start, "expected a single token in 'set'")),
    }
}

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '.'
}

impl Parser {
    fn new(text: &str, start: Location, state: State, embedded: bool) -> Self {
        Self {
            chars: text.chars().collect(),
            pos: 0,
            line: start.line,
            column: start.column,
            state,
            preamble: String::new(),
            preamble_start: start,
            builder: TokenBuilder::default(),
            tokens: Vec::new(),
            embedded,
        }
    }

    fn location(&self) -> Location {
        Location::new(self.line, self.column)
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += 1;
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    fn run(mut self) -> Result<Vec<RawToken>, ParseError> {
        loop {
            let here = self.location();
            let Some(c) = self.bump() else {
                break;
            };
            if self.embedded && c == '}' && !self.in_quotes() {
                return Err(ParseError::new(here, "unexpected '}' in 'set'"));
            }
            match self.state {
                State::Preamble => self.preamble_char(c, here)?,
                State::TokenName | State::TokenFlags => self.name_char(c, here)?,
                State::Decorator => self.decorator_char(c, here)?,
                State::DecoratorArgument => self.argument_char(c, here)?,
                State::QuotedDecoratorArgument(quote) => {
                    let decorator = self.decorator();
                    if c == quote {
                        decorator.argument_quoted = true;
                        self.state = State::AfterQuotedArgument;
                    } else {
                        decorator.argument.push(c);
                    }
                }
                State::AfterQuotedArgument => match c {
                    ',' => {
                        self.decorator().push_argument();
                        self.state = State::DecoratorArgument;
                    }
                    ')' => {
                        self.decorator().close_arguments();
                        self.state = State::AfterDecorator;
                    }
                    c if c.is_whitespace() => {}
                    c => {
                        return Err(ParseError::new(
                            here,
                            format!("expected ',' or ')' after quoted argument, found '{}'", c),
                        ))
                    }
                },
                State::AfterDecorator => match c {
                    ',' => {
                        self.finish_decorator(here)?;
                        self.start_decorator();
                    }
                    '=' => {
                        self.finish_decorator(here)?;
                        self.start_value();
                    }
                    '}' => {
                        self.finish_decorator(here)?;
                        self.finish_token(here)?;
                    }
                    c if c.is_whitespace() => {}
                    c => {
                        return Err(ParseError::new(
                            here,
                            format!("expected ',', '=' or '}}' after decorator, found '{}'", c),
                        ))
                    }
                },
                State::TokenValue => self.value_char(c, here)?,
                State::QuotedTokenValue(quote) => {
                    if c == quote {
                        self.builder.value_quoted = true;
                        self.state = State::AfterTokenValue;
                    } else if let Some(value) = self.builder.value.as_mut() {
                        value.push(c);
                    }
                }
                State::AfterTokenValue => match c {
                    '}' => self.finish_token(here)?,
                    c if c.is_whitespace() => {}
                    c => {
                        return Err(ParseError::new(
                            here,
                            format!("expected '}}' after quoted value, found '{}'", c),
                        ))
                    }
                },
            }
        }
        self.finish()
    }

    fn in_quotes(&self) -> bool {
        matches!(
            self.state,
            State::QuotedDecoratorArgument(_) | State::QuotedTokenValue(_)
        )
    }

    // ============ Per-State Handlers ============

    fn preamble_char(&mut self, c: char, here: Location) -> Result<(), ParseError> {
        match c {
            '{' if self.peek() == Some('{') => {
                self.bump();
                self.push_preamble('{', here);
            }
            '{' => {
                self.builder = TokenBuilder::default();
                self.builder.token.preamble = mem::take(&mut self.preamble);
                self.builder.token.location = here;
                self.state = State::TokenName;
            }
            '}' if self.peek() == Some('}') => {
                self.bump();
                self.push_preamble('}', here);
            }
            '}' => {
                return Err(ParseError::new(
                    here,
                    "unescaped '}' outside a token (write '}}' for a literal brace)",
                ))
            }
            c => self.push_preamble(c, here),
        }
        Ok(())
    }

    fn push_preamble(&mut self, c: char, here: Location) {
        if self.preamble.is_empty() {
            self.preamble_start = here;
        }
        self.preamble.push(c);
    }

    fn name_char(&mut self, c: char, here: Location) -> Result<(), ParseError> {
        match c {
            c if is_name_char(c) => {
                if self.state == State::TokenFlags {
                    return Err(ParseError::new(
                        here,
                        format!("unexpected '{}' after the token name", c),
                    ));
                }
                self.builder.token.name.push(c);
            }
            c if c.is_whitespace() => {
                if !self.builder.token.name.is_empty() {
                    self.state = State::TokenFlags;
                }
            }
            '$' | '?' | '*' | '!' => {
                self.require_name(c, here)?;
                self.apply_flag(c, here)?;
                self.state = State::TokenFlags;
            }
            ':' => {
                self.require_name(c, here)?;
                self.start_decorator();
            }
            '=' => {
                self.require_name(c, here)?;
                self.start_value();
            }
            '}' => self.finish_token(here)?,
            c => {
                return Err(ParseError::new(
                    here,
                    format!("unexpected '{}' in token", c),
                ))
            }
        }
        Ok(())
    }

    fn decorator_char(&mut self, c: char, here: Location) -> Result<(), ParseError> {
        let decorator = self.decorator();
        match c {
            c if c.is_whitespace() => {
                if !decorator.name.is_empty() {
                    decorator.name_closed = true;
                }
            }
            '!' if decorator.start.is_none() => {
                decorator.negated = true;
                decorator.start = Some(here);
            }
            c if c.is_ascii_alphanumeric() || c == '_' => {
                if decorator.name_closed {
                    return Err(ParseError::new(
                        here,
                        format!("unexpected '{}' after decorator name", c),
                    ));
                }
                decorator.start.get_or_insert(here);
                decorator.name.push(c);
            }
            '(' => {
                if decorator.name.is_empty() {
                    return Err(ParseError::new(here, "expected a decorator name before '('"));
                }
                decorator.open_paren = here;
                self.state = State::DecoratorArgument;
            }
            ',' => {
                self.finish_decorator(here)?;
                self.start_decorator();
            }
            '=' => {
                self.finish_decorator(here)?;
                self.start_value();
            }
            '}' => {
                self.finish_decorator(here)?;
                self.finish_token(here)?;
            }
            c => {
                return Err(ParseError::new(
                    here,
                    format!("unexpected '{}' in decorator", c),
                ))
            }
        }
        Ok(())
    }

    fn argument_char(&mut self, c: char, here: Location) -> Result<(), ParseError> {
        let decorator = self.decorator();
        match c {
            '\'' | '"' if !decorator.argument_quoted && decorator.argument.trim().is_empty() => {
                decorator.argument.clear();
                decorator.open_quote = here;
                self.state = State::QuotedDecoratorArgument(c);
            }
            ',' => decorator.push_argument(),
            ')' => {
                decorator.close_arguments();
                self.state = State::AfterDecorator;
            }
            '}' => {
                return Err(ParseError::new(
                    decorator.open_paren,
                    "unclosed decorator argument list",
                ))
            }
            c => decorator.argument.push(c),
        }
        Ok(())
    }

    fn value_char(&mut self, c: char, here: Location) -> Result<(), ParseError> {
        let value = self.builder.value.get_or_insert_with(String::new);
        match c {
            '\'' | '"' if value.trim().is_empty() => {
                value.clear();
                self.builder.open_quote = here;
                self.state = State::QuotedTokenValue(c);
            }
            '}' => self.finish_token(here)?,
            c => value.push(c),
        }
        Ok(())
    }

    // ============ Builder Operations ============

    fn require_name(&self, c: char, here: Location) -> Result<(), ParseError> {
        if self.builder.token.name.is_empty() {
            Err(ParseError::new(
                here,
                format!("expected a token name before '{}'", c),
            ))
        } else {
            Ok(())
        }
    }

    fn apply_flag(&mut self, flag: char, here: Location) -> Result<(), ParseError> {
        match flag {
            '?' => self.set_optional(here),
            '!' => self.set_required(here),
            '*' => {
                self.builder.token.repeating = true;
                self.set_optional(here)
            }
            _ => {
                self.builder.token.terminate_on_newline = true;
                Ok(())
            }
        }
    }

    fn set_optional(&mut self, here: Location) -> Result<(), ParseError> {
        if self.builder.token.required {
            return Err(ParseError::new(
                here,
                "a token cannot be both optional and required",
            ));
        }
        self.builder.token.optional = true;
        Ok(())
    }

    fn set_required(&mut self, here: Location) -> Result<(), ParseError> {
        if self.builder.token.optional {
            return Err(ParseError::new(
                here,
                "a token cannot be both optional and required",
            ));
        }
        self.builder.token.required = true;
        Ok(())
    }

    fn decorator(&mut self) -> &mut DecoratorBuilder {
        self.builder
            .decorator
            .get_or_insert_with(DecoratorBuilder::default)
    }

    fn start_decorator(&mut self) {
        self.builder.decorator = Some(DecoratorBuilder::default());
        self.state = State::Decorator;
    }

    fn start_value(&mut self) {
        self.builder.value = Some(String::new());
        self.state = State::TokenValue;
    }

    /// Closes the current decorator. Flag aliases set flags instead of
    /// being kept as decorators.
    fn finish_decorator(&mut self, here: Location) -> Result<(), ParseError> {
        let Some(decorator) = self.builder.decorator.take() else {
            return Ok(());
        };
        if decorator.name.is_empty() {
            return Err(ParseError::new(here, "expected a decorator name"));
        }
        let location = decorator.start.unwrap_or(here);
        let alias = decorator.name.to_ascii_lowercase();
        let is_alias = matches!(
            alias.as_str(),
            "required" | "optional" | "repeating" | "eol" | "concat"
        );
        if is_alias && decorator.negated {
            return Err(ParseError::new(
                location,
                format!("'{}' is a flag and cannot be negated", decorator.name),
            ));
        }

        match alias.as_str() {
            "required" => self.set_required(location)?,
            "optional" => self.set_optional(location)?,
            "repeating" => self.apply_flag('*', location)?,
            "eol" => self.builder.token.terminate_on_newline = true,
            "concat" => {
                self.builder.token.concatenate = true;
                if let Some(separator) = decorator.args.first() {
                    self.builder.token.concatenation_separator =
                        Some(separator.replace("<CR>", LINE_SEPARATOR));
                }
            }
            _ => self.builder.token.decorators.push(RawDecorator {
                name: decorator.name,
                args: decorator.args,
                negated: decorator.negated,
                location,
            }),
        }
        Ok(())
    }

    fn finish_token(&mut self, here: Location) -> Result<(), ParseError> {
        if self.builder.token.name.is_empty() {
            return Err(ParseError::new(here, "empty token name"));
        }
        let builder = mem::take(&mut self.builder);
        let quoted = builder.value_quoted;
        let mut token = builder.token;
        token.value = builder.value.map(|value| {
            if quoted {
                value
            } else {
                value.trim().to_string()
            }
        });
        self.tokens.push(token);
        self.state = State::Preamble;
        Ok(())
    }

    fn finish(mut self) -> Result<Vec<RawToken>, ParseError> {
        let end = self.location();
        match self.state {
            State::Preamble => {
                if !self.preamble.is_empty() {
                    self.tokens.push(RawToken {
                        preamble: mem::take(&mut self.preamble),
                        location: self.preamble_start,
                        ..RawToken::default()
                    });
                }
            }
            State::QuotedDecoratorArgument(_) => {
                return Err(ParseError::new(self.decorator().open_quote, "unclosed quote"));
            }
            State::QuotedTokenValue(_) => {
                return Err(ParseError::new(self.builder.open_quote, "unclosed quote"));
            }
            State::DecoratorArgument | State::AfterQuotedArgument => {
                return Err(ParseError::new(
                    self.decorator().open_paren,
                    "unclosed decorator argument list",
                ));
            }
            _ if self.embedded => {
                self.finish_decorator(end)?;
                self.finish_token(end)?;
            }
            _ => {
                return Err(ParseError::new(self.builder.token.location, "unclosed token"));
            }
        }
        Ok(self.tokens)
    }
}
