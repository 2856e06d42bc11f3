//! Typed access to `tools/call` arguments.
//!
//! Every helper returns the message the caller should send back as an error
//! result when the argument is missing or has the wrong shape.

use serde_json::{Map, Value};

/// Result of reading one argument.
pub type ArgResult<T> = Result<T, String>;

fn missing(key: &str) -> String {
    format!("Missing required parameter: {key}")
}

/// A required string.
pub fn required_str<'a>(args: &'a Value, key: &str) -> ArgResult<&'a str> {
    match args.get(key) {
        Some(Value::String(s)) if !s.is_empty() => Ok(s),
        Some(Value::String(_)) => Err(format!("Parameter '{key}' must not be empty")),
        Some(Value::Null) | None => Err(missing(key)),
        Some(_) => Err(format!("Parameter '{key}' must be a string")),
    }
}

/// An optional string; `null` and the empty string count as absent.
pub fn optional_str<'a>(args: &'a Value, key: &str) -> ArgResult<Option<&'a str>> {
    match args.get(key) {
        Some(Value::String(s)) if s.is_empty() => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(Value::Null) | None => Ok(None),
        Some(_) => Err(format!("Parameter '{key}' must be a string")),
    }
}

/// A required finite number.
pub fn required_f64(args: &Value, key: &str) -> ArgResult<f64> {
    optional_f64(args, key)?.ok_or_else(|| missing(key))
}

/// A required number that must be greater than zero.
pub fn positive_f64(args: &Value, key: &str) -> ArgResult<f64> {
    let value = required_f64(args, key)?;
    if value > 0.0 {
        Ok(value)
    } else {
        Err(format!("Parameter '{key}' must be positive, got {value}"))
    }
}

/// An optional finite number.
pub fn optional_f64(args: &Value, key: &str) -> ArgResult<Option<f64>> {
    match args.get(key) {
        Some(Value::Null) | None => Ok(None),
        Some(value) => number(value)
            .map(Some)
            .ok_or_else(|| format!("Parameter '{key}' must be a finite number")),
    }
}

fn number(value: &Value) -> Option<f64> {
    value.as_f64().filter(|v| v.is_finite())
}

/// An optional boolean.
pub fn optional_bool(args: &Value, key: &str) -> ArgResult<Option<bool>> {
    match args.get(key) {
        Some(Value::Bool(b)) => Ok(Some(*b)),
        Some(Value::Null) | None => Ok(None),
        Some(_) => Err(format!("Parameter '{key}' must be a boolean")),
    }
}

/// A required non-negative integer.
pub fn required_u32(args: &Value, key: &str) -> ArgResult<u32> {
    let value = args.get(key).ok_or_else(|| missing(key))?;
    value
        .as_u64()
        .and_then(|v| u32::try_from(v).ok())
        .ok_or_else(|| format!("Parameter '{key}' must be a non-negative integer"))
}

/// A property object; absent or `null` yields an empty map unless `required`.
pub fn properties(args: &Value, key: &str, required: bool) -> ArgResult<Map<String, Value>> {
    match args.get(key) {
        Some(Value::Object(map)) => Ok(map.clone()),
        Some(Value::Null) | None if !required => Ok(Map::new()),
        Some(Value::Null) | None => Err(missing(key)),
        Some(_) => Err(format!("Parameter '{key}' must be an object")),
    }
}

/// A list of integer indices; absent yields an empty list unless `required`.
pub fn indices(args: &Value, key: &str, required: bool) -> ArgResult<Vec<i64>> {
    match args.get(key) {
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| {
                item.as_i64()
                    .ok_or_else(|| format!("Parameter '{key}' must contain only integers"))
            })
            .collect(),
        Some(Value::Null) | None if !required => Ok(Vec::new()),
        Some(Value::Null) | None => Err(missing(key)),
        Some(_) => Err(format!("Parameter '{key}' must be an array of integers")),
    }
}

/// A list of `{x, y}` points.
pub fn points(args: &Value, key: &str) -> ArgResult<Vec<(f64, f64)>> {
    let Some(items) = args.get(key) else {
        return Err(missing(key));
    };
    let Some(items) = items.as_array() else {
        return Err(format!("Parameter '{key}' must be an array of points"));
    };

    items
        .iter()
        .enumerate()
        .map(|(i, point)| {
            let x = point.get("x").and_then(number);
            let y = point.get("y").and_then(number);
            x.zip(y)
                .ok_or_else(|| format!("Point {i} in '{key}' needs numeric 'x' and 'y'"))
        })
        .collect()
}
