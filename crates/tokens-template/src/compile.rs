//! Turns parsed tokens into a [`Template`]: decorator resolution, preamble
//! trimming, repeat splitting and id assignment.

use crate::front_matter::FrontMatter;
use crate::parser::{RawDecorator, RawToken};
use crate::{CompileError, Decorator, ParseError, Template, Token, TokenizerOptions};
use tokens_decorators::{DecoratorFactory, DecoratorRegistry};

const DEFAULT_SEPARATOR: &str = " ";

pub(crate) fn build(
    content: String,
    header: FrontMatter,
    body: Vec<RawToken>,
    registry: &DecoratorRegistry,
    options: TokenizerOptions,
) -> Result<Template, CompileError> {
    let mut tokens: Vec<Token> = Vec::with_capacity(body.len() + header.set_tokens.len());

    for raw in body {
        let mut token = resolve(raw, registry, false)?;
        if options.terminate_on_newline {
            token.terminate_on_newline = true;
        }

        if token.repeating && !token.is_sink() && token.preamble.contains('\n') {
            let (origin, continuation) = split_repeating(token, tokens.len(), &options);
            tokens.push(origin);
            tokens.push(continuation);
            continue;
        }

        token.preamble = trim_preamble(&token.preamble, &options);
        if token.is_sink() && token.preamble.is_empty() {
            continue;
        }
        token.id = tokens.len();
        tokens.push(token);
    }

    for raw in header.set_tokens {
        let mut token = resolve(raw, registry, true)?;
        token.id = tokens.len();
        tokens.push(token);
    }

    log::debug!(
        "compiled template {}: {} token(s), {} hint(s)",
        header.name.as_deref().unwrap_or("<unnamed>"),
        tokens.len(),
        header.hints.len()
    );

    Ok(Template {
        name: header.name,
        content,
        tokens,
        hints: header.hints,
        tags: header.tags,
        options,
    })
}

/// Splits a repeating token whose preamble spans lines into its first
/// occurrence and a continuation matching one value per line.
fn split_repeating(token: Token, id: usize, options: &TokenizerOptions) -> (Token, Token) {
    let fragment = token
        .preamble
        .rsplit_once('\n')
        .map(|(_, after)| after.to_string())
        .unwrap_or_default();

    let mut origin = token;
    origin.id = id;
    origin.repeating = false;
    origin.terminate_on_newline = true;

    let mut continuation = origin.clone();
    continuation.id = id + 1;
    continuation.depends_on = Some(id);
    continuation.repeating = true;
    continuation.preamble = trim_preamble(&fragment, options);

    origin.preamble = trim_preamble(&origin.preamble, options);
    log::trace!(
        "split repeating token '{}' into {} and continuation {}",
        origin.name,
        origin.id,
        continuation.id
    );
    (origin, continuation)
}

fn trim_preamble(preamble: &str, options: &TokenizerOptions) -> String {
    let mut preamble = preamble;
    if options.trim_preamble_before_newline {
        if let Some((_, after)) = preamble.rsplit_once('\n') {
            preamble = after;
        }
    }
    // whitespace-only preambles are significant
    if options.trim_leading_whitespace_in_preamble && !preamble.trim().is_empty() {
        preamble = preamble.trim_start();
    }
    preamble.to_string()
}

fn resolve(
    raw: RawToken,
    registry: &DecoratorRegistry,
    is_front_matter: bool,
) -> Result<Token, CompileError> {
    let decorators = raw
        .decorators
        .into_iter()
        .map(|decorator| resolve_decorator(decorator, registry))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Token {
        id: 0,
        depends_on: None,
        name: raw.name,
        preamble: raw.preamble,
        optional: raw.optional,
        required: raw.required,
        repeating: raw.repeating,
        terminate_on_newline: raw.terminate_on_newline,
        concatenate: raw.concatenate,
        concatenation_separator: raw
            .concatenation_separator
            .unwrap_or_else(|| DEFAULT_SEPARATOR.to_string()),
        decorators,
        value: raw.value,
        is_front_matter,
        location: raw.location,
    })
}

fn resolve_decorator(
    raw: RawDecorator,
    registry: &DecoratorRegistry,
) -> Result<Decorator, CompileError> {
    let Some(factory) = registry.resolve(&raw.name) else {
        return Err(CompileError::UnknownDecorator {
            name: raw.name,
            location: raw.location,
        });
    };
    if raw.negated && matches!(factory, DecoratorFactory::Transformer(_)) {
        return Err(ParseError::new(
            raw.location,
            format!("transformer '{}' cannot be negated", raw.name),
        )
        .into());
    }
    Ok(Decorator {
        name: raw.name,
        args: raw.args,
        negated: raw.negated,
        factory,
        location: raw.location,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options() -> TokenizerOptions {
        TokenizerOptions::default()
    }

    #[test]
    fn test_trim_preamble_keeps_whitespace_only_text() {
        assert_eq!(trim_preamble("\n\n", &options()), "\n\n");
        assert_eq!(trim_preamble(" \n Name:", &options()), "Name:");
    }

    #[test]
    fn test_trim_preamble_respects_options() {
        let keep = TokenizerOptions {
            trim_leading_whitespace_in_preamble: false,
            ..options()
        };
        assert_eq!(trim_preamble("  Name:", &keep), "  Name:");

        let last_line = TokenizerOptions {
            trim_preamble_before_newline: true,
            ..options()
        };
        assert_eq!(trim_preamble("a\nb\n  c: ", &last_line), "c: ");
        assert_eq!(trim_preamble("a\n", &last_line), "");
    }

    #[test]
    fn test_split_keeps_decorators_on_both_halves() {
        let raw = RawToken {
            preamble: "Servers:\n  ".to_string(),
            name: "Server".to_string(),
            repeating: true,
            optional: true,
            decorators: vec![RawDecorator {
                name: "IsDomainName".to_string(),
                ..RawDecorator::default()
            }],
            ..RawToken::default()
        };
        let registry = DecoratorRegistry::default();
        let template = build(String::new(), FrontMatter::default(), vec![raw], &registry, options())
            .unwrap();

        let [origin, continuation] = &template.tokens[..] else {
            panic!("expected two tokens");
        };
        assert_eq!(origin.preamble, "Servers:\n  ");
        assert_eq!(continuation.preamble, "  ");
        assert_eq!(continuation.depends_on, Some(origin.id));
        assert!(origin.has_validators() && continuation.has_validators());
    }

    #[test]
    fn test_empty_sink_is_dropped() {
        let tokens = vec![
            RawToken {
                name: "A".to_string(),
                ..RawToken::default()
            },
            RawToken {
                preamble: "\n".to_string(),
                ..RawToken::default()
            },
        ];
        let last_line = TokenizerOptions {
            trim_preamble_before_newline: true,
            ..options()
        };
        let template = build(
            String::new(),
            FrontMatter::default(),
            tokens,
            &DecoratorRegistry::default(),
            last_line,
        )
        .unwrap();
        assert_eq!(template.tokens.len(), 1);
    }
}
