//! The streaming scanner.
//!
//! The input is read once, left to right. At every position the scanner asks
//! whether an eligible token's preamble starts here. If so, the text captured
//! since the previous preamble is bound to the active candidate set and the
//! tokens sharing the new preamble become the candidate set. Everything else
//! is appended to the capture buffer.

use crate::binder::{Bind, BindError, BindMode, Binding};
use crate::location::{chars_equal, Cursor, FileLocation};
use crate::result::{Match, MatchException, Miss, TokenizeResult};
use crate::TokenizeError;
use std::mem;
use tokens_decorators::{DecoratorFactory, Value};
use tokens_template::{Template, Token, TokenizerOptions};

#[derive(Debug, Clone, Copy, Default)]
struct TokenState {
    matches: usize,
    missed: bool,
    disabled: bool,
    last_paragraph: usize,
}

struct Engine<'t, 'b> {
    template: &'t Template,
    options: &'t TokenizerOptions,
    target: &'b mut dyn Bind,
    preambles: Vec<Vec<char>>,
    /// Tokens with a repeat continuation bind as lists.
    continued: Vec<bool>,
    states: Vec<TokenState>,
    candidates: Vec<usize>,
    buffer: String,
    /// Whether `buffer` holds anything besides whitespace.
    buffer_has_text: bool,
    capture_start: FileLocation,
    cursor: Cursor,
    last_matched: Option<usize>,
    max_matched: Option<usize>,
    result: TokenizeResult,
}

/// Scans `input` with `template`, binding values onto `target`.
///
/// Per-token failures are recorded in [`TokenizeResult::exceptions`]. The
/// only error returned is a bind failure when the template sets
/// `throw_on_missing_bind_target`.
pub fn tokenize(
    template: &Template,
    input: &str,
    target: &mut dyn Bind,
) -> Result<TokenizeResult, TokenizeError> {
    let input = input.replace("\r\n", "\n");
    let mut engine = Engine::new(template, &input, target);

    if !engine.check_hints(&input) {
        engine.result.compute_success();
        return Ok(engine.result);
    }
    engine.scan()?;
    engine.bind_front_matter()?;
    Ok(engine.finish())
}

impl<'t, 'b> Engine<'t, 'b> {
    fn new(template: &'t Template, input: &str, target: &'b mut dyn Bind) -> Self {
        let count = template.tokens.len();
        let mut continued = vec![false; count];
        for token in &template.tokens {
            if let Some(origin) = token.depends_on {
                if let Some(flag) = continued.get_mut(origin) {
                    *flag = true;
                }
            }
        }
        Self {
            template,
            options: &template.options,
            target,
            preambles: template
                .tokens
                .iter()
                .map(|t| t.preamble.chars().collect())
                .collect(),
            continued,
            states: vec![TokenState::default(); count],
            candidates: Vec::new(),
            buffer: String::new(),
            buffer_has_text: false,
            capture_start: FileLocation::start(),
            cursor: Cursor::new(input),
            last_matched: None,
            max_matched: None,
            result: TokenizeResult::default(),
        }
    }

    // ============ Hints ============

    /// Records which hints occur in the input. Returns false when a
    /// required hint is absent.
    fn check_hints(&mut self, input: &str) -> bool {
        if self.template.hints.is_empty() {
            return true;
        }
        let haystack = if self.options.case_sensitive {
            input.to_string()
        } else {
            input.to_lowercase()
        };
        for hint in &self.template.hints {
            let needle = if self.options.case_sensitive {
                hint.text.clone()
            } else {
                hint.text.to_lowercase()
            };
            if haystack.contains(&needle) {
                self.result.hints.matches.push(hint.clone());
            } else {
                self.result.hints.misses.push(hint.clone());
            }
        }
        let missing_required = self.result.hints.misses.iter().any(|h| !h.optional);
        if missing_required {
            log::debug!(
                "required hint missing from input, skipping {}",
                self.template_name()
            );
        }
        !missing_required
    }

    fn template_name(&self) -> &str {
        self.template.name.as_deref().unwrap_or("<unnamed>")
    }

    // ============ Scanning ============

    fn scan(&mut self) -> Result<(), TokenizeError> {
        while let Some(c) = self.cursor.peek() {
            if self.candidates.is_empty() || !self.buffer_has_text {
                self.disable_stale_repeats();
            }

            if c == '\n' && self.candidates_terminate_on_newline() {
                let waiting = !self.buffer_has_text && self.candidates_have_no_preamble();
                if !waiting {
                    self.flush()?;
                    continue;
                }
            }

            if self.try_adopt()? {
                continue;
            }

            if !self.candidates.is_empty() {
                self.buffer.push(c);
                self.buffer_has_text |= !c.is_whitespace();
            }
            self.cursor.advance();
        }

        let template = self.template;
        let bindable = self.candidates.iter().any(|&id| {
            let token = &template.tokens[id];
            !token.is_sink() && (token.value.is_some() || !self.buffer.is_empty())
        });
        if bindable {
            self.flush()?;
        }
        Ok(())
    }

    fn eligible(&self, id: usize) -> bool {
        let token = &self.template.tokens[id];
        let state = &self.states[id];
        if token.is_front_matter || state.disabled || state.missed {
            return false;
        }
        if state.matches > 0 && !token.repeating {
            return false;
        }
        if let Some(origin) = token.depends_on {
            if self.states[origin].matches == 0 {
                return false;
            }
        }
        // in-order matching retires tokens declared before the latest match
        if !self.options.out_of_order_tokens && !token.repeating {
            if let Some(latest) = self.max_matched {
                if latest > id {
                    return false;
                }
            }
        }
        true
    }

    fn candidates_terminate_on_newline(&self) -> bool {
        self.candidates
            .iter()
            .any(|&id| self.template.tokens[id].terminate_on_newline)
    }

    fn candidates_have_no_preamble(&self) -> bool {
        self.candidates
            .iter()
            .all(|&id| self.preambles[id].is_empty())
    }

    /// Whether `token` or the origin it continues has bound a value.
    fn has_matched(&self, token: &Token) -> bool {
        self.states[token.id].matches > 0
            || token
                .depends_on
                .is_some_and(|origin| self.states[origin].matches > 0)
    }

    /// Disables empty-preamble repeating tokens once a blank line has been
    /// crossed since their last match. The origin's match counts as the
    /// continuation's first.
    fn disable_stale_repeats(&mut self) {
        let paragraph = self.cursor.paragraph();
        let template = self.template;
        for token in &template.tokens {
            let id = token.id;
            if token.repeating
                && token.preamble.is_empty()
                && !self.states[id].disabled
                && self.has_matched(token)
                && paragraph > self.states[id].last_paragraph
            {
                log::debug!(
                    "'{}' ({}) disabled after a paragraph break at {}",
                    token.name,
                    id,
                    self.cursor.location()
                );
                self.states[id].disabled = true;
            }
        }
        let states = &self.states;
        let before = self.candidates.len();
        self.candidates.retain(|&id| !states[id].disabled);
        if before > 0 && self.candidates.is_empty() {
            self.clear_buffer();
        }
    }

    fn clear_buffer(&mut self) {
        self.buffer.clear();
        self.buffer_has_text = false;
    }

    fn same_preamble(&self, a: usize, b: usize) -> bool {
        let (a, b) = (&self.preambles[a], &self.preambles[b]);
        a.len() == b.len()
            && a
                .iter()
                .zip(b)
                .all(|(&x, &y)| chars_equal(x, y, self.options.case_sensitive))
    }

    /// Adopts the tokens whose preamble starts at the cursor. Returns true
    /// when the scan state changed without consuming the current character.
    fn try_adopt(&mut self) -> Result<bool, TokenizeError> {
        let count = self.template.tokens.len();
        let active = !self.candidates.is_empty();
        let case_sensitive = self.options.case_sensitive;

        let winner = (0..count)
            .filter(|&id| self.eligible(id) && !self.preambles[id].is_empty())
            .find(|&id| self.cursor.looking_at(&self.preambles[id], case_sensitive));
        let winner = match winner {
            Some(id) => Some(id),
            None if !active => {
                (0..count).find(|&id| self.eligible(id) && self.preambles[id].is_empty())
            }
            None => None,
        };
        let Some(winner) = winner else {
            return Ok(false);
        };

        if active {
            // binding may retire the winner, so pick again afterwards
            self.flush()?;
            return Ok(true);
        }

        self.candidates = (0..count)
            .filter(|&id| self.eligible(id) && self.same_preamble(id, winner))
            .collect();
        self.clear_buffer();
        log::trace!(
            "adopted {:?} at {}",
            self.candidates,
            self.cursor.location()
        );
        self.cursor.advance_by(self.preambles[winner].len());
        self.capture_start = self.cursor.location();
        Ok(true)
    }

    // ============ Binding ============

    /// Binds the capture buffer to the first candidate that accepts it.
    fn flush(&mut self) -> Result<(), TokenizeError> {
        let candidates = mem::take(&mut self.candidates);
        let buffer = mem::take(&mut self.buffer);
        let whitespace_only = !mem::take(&mut self.buffer_has_text);
        let template = self.template;

        let mut accepted = false;
        for &id in &candidates {
            let token = &template.tokens[id];
            if token.is_sink() || (whitespace_only && token.value.is_none()) {
                continue;
            }
            if self.try_bind(token, &buffer)? {
                accepted = true;
                break;
            }
        }

        if !accepted {
            self.reject(&candidates, whitespace_only);
        }
        Ok(())
    }

    fn reject(&mut self, candidates: &[usize], whitespace_only: bool) {
        let template = self.template;
        for &id in candidates {
            let token = &template.tokens[id];
            if token.is_sink() {
                continue;
            }
            let ended_here = self.last_matched == Some(id)
                || (token.depends_on.is_some() && self.last_matched == token.depends_on);
            if token.repeating && token.preamble.is_empty() && ended_here && whitespace_only {
                log::debug!("'{}' ({}) disabled, repeat ended", token.name, id);
                self.states[id].disabled = true;
            } else if !token.considered_more_than_once() {
                log::debug!(
                    "'{}' ({}) missed at {}",
                    token.name,
                    id,
                    self.cursor.location()
                );
                self.states[id].missed = true;
            } else {
                log::trace!("'{}' ({}) did not accept the capture", token.name, id);
            }
        }
    }

    fn clean(&self, token: &Token, buffer: &str) -> String {
        let mut text = buffer.trim_start();
        if token.terminate_on_newline {
            if let Some((line, _)) = text.split_once('\n') {
                text = line;
            }
        }
        if self.options.trim_trailing_whitespace {
            text = text.trim_end();
        }
        text.to_string()
    }

    /// Validates, transforms and binds one capture. Returns whether the
    /// token accepted it.
    fn try_bind(&mut self, token: &'t Token, buffer: &str) -> Result<bool, TokenizeError> {
        let text = match &token.value {
            Some(value) => value.clone(),
            None => self.clean(token, buffer),
        };
        let mut value = Value::String(text);

        for decorator in &token.decorators {
            let DecoratorFactory::Validator(make) = decorator.factory else {
                continue;
            };
            match make().validate(&value, &decorator.args) {
                Ok(valid) if valid != decorator.negated => {}
                Ok(_) => {
                    log::trace!(
                        "'{}' rejected '{}': {}{} failed",
                        token.name,
                        value,
                        if decorator.negated { "!" } else { "" },
                        decorator.name
                    );
                    return Ok(false);
                }
                Err(source) => {
                    self.record_decorator_error(token, &decorator.name, source);
                    return Ok(false);
                }
            }
        }

        for decorator in &token.decorators {
            let DecoratorFactory::Transformer(make) = decorator.factory else {
                continue;
            };
            match make().transform(&value, &decorator.args) {
                Ok(Some(transformed)) => value = transformed,
                Ok(None) => {}
                Err(source) => {
                    self.record_decorator_error(token, &decorator.name, source);
                    return Ok(false);
                }
            }
        }

        self.commit(token, value)
    }

    fn record_decorator_error(
        &mut self,
        token: &Token,
        decorator: &str,
        source: tokens_decorators::DecoratorError,
    ) {
        log::warn!("token '{}': decorator '{}': {}", token.name, decorator, source);
        self.result.exceptions.push(MatchException::Decorator {
            token: token.name.clone(),
            decorator: decorator.to_string(),
            source,
        });
    }

    fn bind(&mut self, token: &Token, value: &Value, mode: BindMode) -> Result<bool, TokenizeError> {
        let binding = Binding {
            path: &token.name,
            value,
            mode,
            case_sensitive: self.options.case_sensitive,
        };
        match self.target.set(&binding) {
            Ok(()) => Ok(true),
            Err(source) => self.bind_failed(token, source).map(|_| false),
        }
    }

    fn bind_failed(&mut self, token: &Token, source: BindError) -> Result<(), TokenizeError> {
        if self.options.throw_on_missing_bind_target {
            return Err(TokenizeError::Bind {
                token: token.name.clone(),
                source,
            });
        }
        log::warn!("token '{}': {}", token.name, source);
        self.result.exceptions.push(MatchException::Bind {
            token: token.name.clone(),
            source,
        });
        Ok(())
    }

    fn commit(&mut self, token: &Token, value: Value) -> Result<bool, TokenizeError> {
        let template = self.template;

        if token.concatenate {
            let prior = self.result.matches.iter().rposition(|m| {
                m.name == token.name && template.tokens[m.token_id].concatenate
            });
            if let Some(index) = prior {
                let merged = Value::String(format!(
                    "{}{}{}",
                    self.result.matches[index].value,
                    token.concatenation_separator,
                    value
                ));
                if !self.bind(token, &merged, BindMode::Replace)? {
                    return Ok(false);
                }
                log::trace!("'{}' concatenated '{}'", token.name, value);
                self.result.matches[index].value = merged;
                self.record_match(token);
                return Ok(true);
            }
        }

        let listed = token.repeating || token.depends_on.is_some() || self.continued[token.id];
        let mode = if listed && !token.concatenate {
            BindMode::Append
        } else {
            BindMode::Assign
        };
        if !self.bind(token, &value, mode)? {
            return Ok(false);
        }

        let location = if token.is_front_matter {
            FileLocation::default()
        } else {
            self.capture_start
        };
        log::debug!("'{}' ({}) = '{}' at {}", token.name, token.id, value, location);
        self.result.matches.push(Match {
            token_id: token.id,
            name: token.name.clone(),
            value,
            location,
        });
        self.record_match(token);
        Ok(true)
    }

    fn record_match(&mut self, token: &Token) {
        let state = &mut self.states[token.id];
        state.matches += 1;
        state.last_paragraph = self.cursor.paragraph();
        if self.continued[token.id] {
            let paragraph = state.last_paragraph;
            let template = self.template;
            for continuation in template
                .tokens
                .iter()
                .filter(|t| t.depends_on == Some(token.id))
            {
                self.states[continuation.id].last_paragraph = paragraph;
            }
        }
        if !token.is_front_matter {
            self.last_matched = Some(token.id);
            self.max_matched = self.max_matched.max(Some(token.id));
        }
    }

    // ============ Completion ============

    /// Binds front-matter tokens once per scan. A template whose only named
    /// tokens come from front matter has nothing to trigger them.
    fn bind_front_matter(&mut self) -> Result<(), TokenizeError> {
        let template = self.template;
        let scans_for_values = template
            .tokens
            .iter()
            .any(|t| !t.is_front_matter && !t.is_sink());
        if !scans_for_values {
            log::debug!(
                "{}: only front-matter tokens, nothing bound",
                self.template_name()
            );
            return Ok(());
        }
        for token in template.tokens.iter().filter(|t| t.is_front_matter) {
            self.try_bind(token, "")?;
        }
        Ok(())
    }

    fn finish(mut self) -> TokenizeResult {
        let template = self.template;
        for token in &template.tokens {
            if token.is_sink() || self.states[token.id].matches > 0 {
                continue;
            }
            // an unused continuation is not a miss once its origin matched
            if let Some(origin) = token.depends_on {
                if self.states[origin].matches > 0 {
                    continue;
                }
            }
            self.result.misses.push(Miss {
                token_id: token.id,
                name: token.name.clone(),
                required: token.required,
            });
        }
        self.result.compute_success();
        log::debug!(
            "{}: {} match(es), {} miss(es), success={}",
            self.template_name(),
            self.result.matches.len(),
            self.result.misses.len(),
            self.result.success
        );
        self.result
    }
}
