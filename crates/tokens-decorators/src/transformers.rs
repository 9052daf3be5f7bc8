//! Built-in transformers.
//!
//! String transformers apply element-wise to arrays and treat `Null` as the
//! empty string, so `ToUpper` on `Null` yields `""` rather than failing.

use crate::datetime::{parse_date_time, parse_loose_date_time};
use crate::{number_arg, required_arg, DecoratorError, Transformer, Value};

/// Applies `f` to the text of a value. Arrays are mapped element-wise and
/// count as transformed when at least one element changed.
fn map_text<F>(value: &Value, f: F) -> Option<Value>
where
    F: Fn(&str) -> Option<String>,
{
    map_text_dyn(value, &f)
}

fn map_text_dyn(value: &Value, f: &dyn Fn(&str) -> Option<String>) -> Option<Value> {
    match value {
        Value::Array(items) => {
            let mut changed = false;
            let mapped = items
                .iter()
                .map(|item| match map_text_dyn(item, f) {
                    Some(v) => {
                        changed = true;
                        v
                    }
                    None => item.clone(),
                })
                .collect();
            changed.then_some(Value::Array(mapped))
        }
        other => f(&other.to_text()).map(Value::String),
    }
}

#[derive(Debug, Default)]
pub struct ToUpper;

impl Transformer for ToUpper {
    fn transform(&self, value: &Value, _args: &[String]) -> Result<Option<Value>, DecoratorError> {
        Ok(map_text(value, |s| Some(s.to_uppercase())))
    }
}

#[derive(Debug, Default)]
pub struct ToLower;

impl Transformer for ToLower {
    fn transform(&self, value: &Value, _args: &[String]) -> Result<Option<Value>, DecoratorError> {
        Ok(map_text(value, |s| Some(s.to_lowercase())))
    }
}

/// Trims whitespace, or the characters of the first argument when given.
#[derive(Debug, Default)]
pub struct Trim;

impl Transformer for Trim {
    fn transform(&self, value: &Value, args: &[String]) -> Result<Option<Value>, DecoratorError> {
        match args.first().filter(|a| !a.is_empty()) {
            Some(chars) => Ok(map_text(value, |s| {
                Some(s.trim_matches(|c| chars.contains(c)).to_string())
            })),
            None => Ok(map_text(value, |s| Some(s.trim().to_string()))),
        }
    }
}

/// `Substring(start[, length])`, counted in characters. A start past the
/// end yields the empty string.
#[derive(Debug, Default)]
pub struct Substring;

impl Transformer for Substring {
    fn transform(&self, value: &Value, args: &[String]) -> Result<Option<Value>, DecoratorError> {
        let start = number_arg("Substring", args, 0, "start")?;
        let length = match args.get(1) {
            Some(_) => Some(number_arg("Substring", args, 1, "length")?),
            None => None,
        };
        Ok(map_text(value, |s| {
            let rest = s.chars().skip(start);
            Some(match length {
                Some(n) => rest.take(n).collect(),
                None => rest.collect(),
            })
        }))
    }
}

#[derive(Debug, Default)]
pub struct SubstringAfter;

impl Transformer for SubstringAfter {
    fn transform(&self, value: &Value, args: &[String]) -> Result<Option<Value>, DecoratorError> {
        let needle = required_arg("SubstringAfter", args, 0, "value")?;
        Ok(map_text(value, |s| {
            s.find(needle).map(|i| s[i + needle.len()..].to_string())
        }))
    }
}

#[derive(Debug, Default)]
pub struct SubstringAfterLast;

impl Transformer for SubstringAfterLast {
    fn transform(&self, value: &Value, args: &[String]) -> Result<Option<Value>, DecoratorError> {
        let needle = required_arg("SubstringAfterLast", args, 0, "value")?;
        Ok(map_text(value, |s| {
            s.rfind(needle).map(|i| s[i + needle.len()..].to_string())
        }))
    }
}

#[derive(Debug, Default)]
pub struct SubstringBefore;

impl Transformer for SubstringBefore {
    fn transform(&self, value: &Value, args: &[String]) -> Result<Option<Value>, DecoratorError> {
        let needle = required_arg("SubstringBefore", args, 0, "value")?;
        Ok(map_text(value, |s| s.find(needle).map(|i| s[..i].to_string())))
    }
}

#[derive(Debug, Default)]
pub struct SubstringBeforeLast;

impl Transformer for SubstringBeforeLast {
    fn transform(&self, value: &Value, args: &[String]) -> Result<Option<Value>, DecoratorError> {
        let needle = required_arg("SubstringBeforeLast", args, 0, "value")?;
        Ok(map_text(value, |s| s.rfind(needle).map(|i| s[..i].to_string())))
    }
}

/// `Replace(old[, new])`; a missing `new` deletes every `old`.
#[derive(Debug, Default)]
pub struct Replace;

impl Transformer for Replace {
    fn transform(&self, value: &Value, args: &[String]) -> Result<Option<Value>, DecoratorError> {
        let old = required_arg("Replace", args, 0, "old")?;
        if old.is_empty() {
            return Err(DecoratorError::InvalidArgument {
                decorator: "Replace",
                value: String::new(),
                expected: "a non-empty search string",
            });
        }
        let new = args.get(1).map(String::as_str).unwrap_or("");
        Ok(map_text(value, |s| Some(s.replace(old, new))))
    }
}

#[derive(Debug, Default)]
pub struct RemoveStart;

impl Transformer for RemoveStart {
    fn transform(&self, value: &Value, args: &[String]) -> Result<Option<Value>, DecoratorError> {
        let prefix = required_arg("RemoveStart", args, 0, "value")?;
        Ok(map_text(value, |s| s.strip_prefix(prefix).map(str::to_string)))
    }
}

#[derive(Debug, Default)]
pub struct RemoveEnd;

impl Transformer for RemoveEnd {
    fn transform(&self, value: &Value, args: &[String]) -> Result<Option<Value>, DecoratorError> {
        let suffix = required_arg("RemoveEnd", args, 0, "value")?;
        Ok(map_text(value, |s| s.strip_suffix(suffix).map(str::to_string)))
    }
}

#[derive(Debug, Default)]
pub struct Append;

impl Transformer for Append {
    fn transform(&self, value: &Value, args: &[String]) -> Result<Option<Value>, DecoratorError> {
        let suffix = required_arg("Append", args, 0, "value")?;
        Ok(map_text(value, |s| Some(format!("{}{}", s, suffix))))
    }
}

#[derive(Debug, Default)]
pub struct Prepend;

impl Transformer for Prepend {
    fn transform(&self, value: &Value, args: &[String]) -> Result<Option<Value>, DecoratorError> {
        let prefix = required_arg("Prepend", args, 0, "value")?;
        Ok(map_text(value, |s| Some(format!("{}{}", prefix, s))))
    }
}

/// `Split(separator)` into an array of trimmed, non-empty parts. Only
/// applies to scalar values.
#[derive(Debug, Default)]
pub struct Split;

impl Transformer for Split {
    fn transform(&self, value: &Value, args: &[String]) -> Result<Option<Value>, DecoratorError> {
        let separator = required_arg("Split", args, 0, "separator")?;
        if separator.is_empty() {
            return Err(DecoratorError::InvalidArgument {
                decorator: "Split",
                value: String::new(),
                expected: "a non-empty separator",
            });
        }
        if matches!(value, Value::Array(_)) {
            return Ok(None);
        }
        let parts = value
            .to_text()
            .split(separator)
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .map(Value::from)
            .collect();
        Ok(Some(Value::Array(parts)))
    }
}

/// Replaces the value with the first argument.
#[derive(Debug, Default)]
pub struct Set;

impl Transformer for Set {
    fn transform(&self, _value: &Value, args: &[String]) -> Result<Option<Value>, DecoratorError> {
        let replacement = required_arg("Set", args, 0, "value")?;
        Ok(Some(Value::from(replacement)))
    }
}

/// `ToDateTime([format, ...])` normalizes a date to `yyyy-MM-ddTHH:mm:ss`.
/// Without formats a list of common layouts is tried. A value that does not
/// parse is left unchanged.
#[derive(Debug, Default)]
pub struct ToDateTime;

impl Transformer for ToDateTime {
    fn transform(&self, value: &Value, args: &[String]) -> Result<Option<Value>, DecoratorError> {
        Ok(map_text(value, |s| {
            let parsed = if args.is_empty() {
                parse_loose_date_time(s)
            } else {
                parse_date_time(s, args)
            };
            parsed.map(|dt| dt.to_iso())
        }))
    }
}
