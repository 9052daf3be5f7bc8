//! Front matter: the optional `---` block at the top of a template.

use crate::parser::{self, RawToken};
use crate::{Hint, Location, ParseError, TokenizerOptions};
use winnow::ascii::{line_ending, space0};
use winnow::combinator::{alt, eof, terminated};
use winnow::prelude::*;
use winnow::token::{rest, take_till, take_while};

#[derive(Debug, Default)]
pub(crate) struct FrontMatter {
    pub name: Option<String>,
    pub hints: Vec<Hint>,
    pub tags: Vec<String>,
    pub set_tokens: Vec<RawToken>,
}

/// A front-matter line with its 1-based line number.
pub(crate) type Line<'a> = (usize, &'a str);

// ============ Winnow Parsers ============

fn delimiter(input: &mut &str) -> ModalResult<()> {
    ("---", space0, alt((line_ending, eof)))
        .void()
        .parse_next(input)
}

fn line<'a>(input: &mut &'a str) -> ModalResult<&'a str> {
    terminated(take_till(0.., '\n'), alt(("\n", eof))).parse_next(input)
}

fn key<'a>(input: &mut &'a str) -> ModalResult<&'a str> {
    take_while(1.., |c: char| c.is_ascii_alphanumeric() || c == '_' || c == '?').parse_next(input)
}

fn entry<'a>(input: &mut &'a str) -> ModalResult<(&'a str, &'a str)> {
    (space0, key, space0, ':', rest)
        .map(|(_, key, _, _, value)| (key, value))
        .parse_next(input)
}

// ============ Public API ============

/// Splits `content` into its front-matter lines (if any), the template body
/// and the line the body starts on.
pub(crate) fn split(content: &str) -> Result<(Option<Vec<Line<'_>>>, &str, usize), ParseError> {
    let mut input = content;
    if delimiter.parse_next(&mut input).is_err() {
        return Ok((None, content, 1));
    }

    let mut lines = Vec::new();
    let mut number = 2;
    loop {
        let mut probe = input;
        if delimiter.parse_next(&mut probe).is_ok() {
            return Ok((Some(lines), probe, number + 1));
        }
        if input.is_empty() {
            return Err(ParseError::new(
                Location::new(1, 1),
                "front matter is not closed (expected a '---' line)",
            ));
        }
        let text = line
            .parse_next(&mut input)
            .map_err(|_| ParseError::new(Location::new(number, 1), "malformed line"))?;
        lines.push((number, text));
        number += 1;
    }
}

fn column(text: &str, byte_offset: usize) -> usize {
    text[..byte_offset].chars().count() + 1
}

fn flag(key: &str, value: &str, at: Location) -> Result<bool, ParseError> {
    if value.eq_ignore_ascii_case("true") {
        Ok(true)
    } else if value.eq_ignore_ascii_case("false") {
        Ok(false)
    } else {
        Err(ParseError::new(
            at,
            format!("expected 'true' or 'false' for '{}', found '{}'", key, value),
        ))
    }
}

/// Applies front-matter lines to `options` and collects the template-level
/// settings.
pub(crate) fn parse(
    lines: &[Line<'_>],
    options: &mut TokenizerOptions,
) -> Result<FrontMatter, ParseError> {
    let mut header = FrontMatter::default();

    for &(number, text) in lines {
        let trimmed = text.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let indent = text.len() - text.trim_start().len();

        let mut input = text;
        let Ok((key, raw_value)) = entry.parse_next(&mut input) else {
            return Err(ParseError::new(
                Location::new(number, column(text, indent)),
                format!("expected 'Key: value', found '{}'", trimmed),
            ));
        };
        let key_at = Location::new(number, column(text, indent));
        let value = raw_value.trim();
        let value_offset = text.len() - raw_value.trim_start().len();
        let value_at = Location::new(number, column(text, value_offset));

        let required_value = || {
            if value.is_empty() {
                Err(ParseError::new(
                    value_at,
                    format!("missing value for '{}'", key),
                ))
            } else {
                Ok(value.to_string())
            }
        };

        match key.to_ascii_lowercase().as_str() {
            "name" => header.name = Some(required_value()?),
            "hint" => header.hints.push(Hint {
                text: required_value()?,
                optional: false,
            }),
            "hint?" => header.hints.push(Hint {
                text: required_value()?,
                optional: true,
            }),
            "tag" => header.tags.push(required_value()?),
            "set" => header.set_tokens.push(parser::parse_set(value, value_at)?),
            "casesensitive" => options.case_sensitive = flag(key, value, value_at)?,
            "outoforder" => options.out_of_order_tokens = flag(key, value, value_at)?,
            "terminateonnewline" => options.terminate_on_newline = flag(key, value, value_at)?,
            "trimleadingwhitespace" => {
                options.trim_leading_whitespace_in_preamble = flag(key, value, value_at)?
            }
            "trimtrailingwhitespace" => {
                options.trim_trailing_whitespace = flag(key, value, value_at)?
            }
            "trimpreamblebeforenewline" => {
                options.trim_preamble_before_newline = flag(key, value, value_at)?
            }
            "ignoremissingproperties" => {
                options.throw_on_missing_bind_target = !flag(key, value, value_at)?
            }
            _ => {
                return Err(ParseError::new(
                    key_at,
                    format!("unknown front matter key '{}'", key),
                ))
            }
        }
    }

    log::trace!(
        "front matter: {} hint(s), {} tag(s), {} set token(s)",
        header.hints.len(),
        header.tags.len(),
        header.set_tokens.len()
    );
    Ok(header)
}
