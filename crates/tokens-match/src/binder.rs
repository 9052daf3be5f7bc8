//! Binding extracted values onto a target object graph.
//!
//! The scanner talks to its target through [`Bind`]. [`JsonTarget`] binds
//! onto a `serde_json::Value`, which lets any serde type be a target:
//! build a strict target from a default instance, bind, then deserialize.

use serde::Serialize;
use serde_json::{Map, Number, Value as Json};
use std::mem;
use thiserror::Error;
use tokens_decorators::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindMode {
    /// Overwrite, or append when the property is a list.
    Assign,
    /// Create or extend a list.
    Append,
    /// Overwrite; for a list, overwrite its last element.
    Replace,
}

/// One value to set at a dotted path, e.g. `Person.Address.City`.
#[derive(Debug, Clone, Copy)]
pub struct Binding<'a> {
    pub path: &'a str,
    pub value: &'a Value,
    pub mode: BindMode,
    /// When false, path segments match existing members ignoring case.
    pub case_sensitive: bool,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum BindError {
    #[error("invalid property path '{0}'")]
    InvalidPath(String),
    #[error("'{path}': no member named '{member}'")]
    MissingMember { path: String, member: String },
    #[error("'{path}': '{member}' is not an object")]
    NotAnObject { path: String, member: String },
    #[error("'{path}': cannot convert '{value}' to {expected}")]
    Conversion {
        path: String,
        value: String,
        expected: &'static str,
    },
}

pub trait Bind {
    fn set(&mut self, binding: &Binding<'_>) -> Result<(), BindError>;
}

/// A JSON object graph as bind target.
#[derive(Debug, Clone)]
pub struct JsonTarget {
    root: Json,
    strict: bool,
}

impl Default for JsonTarget {
    fn default() -> Self {
        Self::new()
    }
}

impl JsonTarget {
    /// An empty object that grows members on demand.
    pub fn new() -> Self {
        Self {
            root: Json::Object(Map::new()),
            strict: false,
        }
    }

    /// A target that only accepts paths already present in `skeleton`.
    /// Existing numbers and booleans keep their type on assignment.
    pub fn strict(skeleton: Json) -> Self {
        Self {
            root: skeleton,
            strict: true,
        }
    }

    /// A strict target shaped like `value`.
    pub fn from_skeleton<T: Serialize>(value: &T) -> Result<Self, serde_json::Error> {
        Ok(Self::strict(serde_json::to_value(value)?))
    }

    pub fn value(&self) -> &Json {
        &self.root
    }

    pub fn into_value(self) -> Json {
        self.root
    }
}

impl Bind for JsonTarget {
    fn set(&mut self, binding: &Binding<'_>) -> Result<(), BindError> {
        let path = binding.path;
        let segments: Vec<&str> = path.split('.').collect();
        if segments.iter().any(|segment| segment.is_empty()) {
            return Err(BindError::InvalidPath(path.to_string()));
        }
        let Some((last, parents)) = segments.split_last() else {
            return Err(BindError::InvalidPath(path.to_string()));
        };

        let mut node = &mut self.root;
        for segment in parents {
            let map = as_object(node, path, segment)?;
            let key = member_key(map, segment, binding.case_sensitive, self.strict, path)?;
            node = map
                .entry(key)
                .or_insert_with(|| Json::Object(Map::new()));
        }

        let map = as_object(node, path, last)?;
        let key = member_key(map, last, binding.case_sensitive, self.strict, path)?;
        let new = to_json(binding.value);
        match map.get_mut(&key) {
            Some(existing) => apply(existing, new, binding.mode, self.strict, path),
            None => {
                let value = match binding.mode {
                    BindMode::Append => Json::Array(vec![new]),
                    BindMode::Assign | BindMode::Replace => new,
                };
                map.insert(key, value);
                Ok(())
            }
        }
    }
}

fn as_object<'a>(
    node: &'a mut Json,
    path: &str,
    member: &str,
) -> Result<&'a mut Map<String, Json>, BindError> {
    if node.is_null() {
        *node = Json::Object(Map::new());
    }
    match node {
        Json::Object(map) => Ok(map),
        _ => Err(BindError::NotAnObject {
            path: path.to_string(),
            member: member.to_string(),
        }),
    }
}

/// The key under which `segment` lives (or will live) in `map`.
fn member_key(
    map: &Map<String, Json>,
    segment: &str,
    case_sensitive: bool,
    strict: bool,
    path: &str,
) -> Result<String, BindError> {
    if map.contains_key(segment) {
        return Ok(segment.to_string());
    }
    if !case_sensitive {
        if let Some(key) = map.keys().find(|key| key.eq_ignore_ascii_case(segment)) {
            return Ok(key.clone());
        }
    }
    if strict {
        return Err(BindError::MissingMember {
            path: path.to_string(),
            member: segment.to_string(),
        });
    }
    Ok(segment.to_string())
}

fn apply(
    existing: &mut Json,
    new: Json,
    mode: BindMode,
    strict: bool,
    path: &str,
) -> Result<(), BindError> {
    match (mode, existing) {
        (BindMode::Replace, Json::Array(items)) => match items.last_mut() {
            Some(last) => *last = convert_like(last, new, path)?,
            None => items.push(new),
        },
        (BindMode::Assign | BindMode::Append, Json::Array(items)) => {
            let item = match items.first() {
                Some(first) => convert_like(first, new, path)?,
                None => new,
            };
            items.push(item);
        }
        (BindMode::Append, existing) if existing.is_null() => *existing = Json::Array(vec![new]),
        // a strict target keeps the declared shape
        (BindMode::Append, existing) if !strict => {
            let previous = mem::take(existing);
            *existing = Json::Array(vec![previous, new]);
        }
        (_, existing) => *existing = convert_like(existing, new, path)?,
    }
    Ok(())
}

/// Converts a text value to the type of the property it replaces.
fn convert_like(existing: &Json, new: Json, path: &str) -> Result<Json, BindError> {
    if !matches!(existing, Json::Number(_) | Json::Bool(_)) {
        return Ok(new);
    }
    let Some(text) = new.as_str().map(str::to_string) else {
        return Ok(new);
    };
    let trimmed = text.trim();
    let conversion_error = |expected| BindError::Conversion {
        path: path.to_string(),
        value: text.clone(),
        expected,
    };

    match existing {
        Json::Number(n) if n.is_f64() => trimmed
            .parse::<f64>()
            .ok()
            .and_then(Number::from_f64)
            .map(Json::Number)
            .ok_or_else(|| conversion_error("a number")),
        Json::Number(_) => trimmed
            .parse::<i64>()
            .map(|n| Json::Number(n.into()))
            .map_err(|_| conversion_error("an integer")),
        Json::Bool(_) => {
            if trimmed.eq_ignore_ascii_case("true") {
                Ok(Json::Bool(true))
            } else if trimmed.eq_ignore_ascii_case("false") {
                Ok(Json::Bool(false))
            } else {
                Err(conversion_error("a boolean"))
            }
        }
        _ => Ok(new),
    }
}

/// JSON form of a decorator value.
pub fn to_json(value: &Value) -> Json {
    match value {
        Value::String(s) => Json::String(s.clone()),
        Value::Number(n) if n.fract() == 0.0 && n.abs() < i64::MAX as f64 => {
            Json::Number((*n as i64).into())
        }
        Value::Number(n) => Number::from_f64(*n).map(Json::Number).unwrap_or(Json::Null),
        Value::Bool(b) => Json::Bool(*b),
        Value::Array(items) => Json::Array(items.iter().map(to_json).collect()),
        Value::Null => Json::Null,
    }
}
