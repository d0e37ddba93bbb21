//! Flattening of facility match responses into tabular rows.
//!
//! The create/match endpoint returns the submitted item plus a `matches`
//! list of GeoJSON-like candidates, each carrying several levels of
//! per-contributor audit history. [`flatten_facilities`] collapses that into
//! one row per candidate:
//!
//! - top-level response keys form the base of every row,
//! - candidate keys are prefixed with `match_`,
//! - lists of objects become `key:value|key:value` lines joined by `\n`,
//! - `match_extended_fields_*` columns are shortened to `match_ef_*`.
//!
//! Non-string values inside those lines use Python's `repr` spelling
//! (`True`, `None`, `['Unspecified']`).
//!
//! Any shape the rules below do not cover is a [`ClientError::SchemaViolation`]:
//! the whole response is rejected rather than partially emitted.

use serde_json::{Map, Value};

use crate::error::ClientError;
use crate::types::FlatRecord;

const EXTENDED_FIELDS_PREFIX: &str = "match_extended_fields_";
const EXTENDED_FIELDS_SHORT: &str = "match_ef_";

/// Flattens a raw create/match response into rows.
///
/// Returns exactly one row (the base record, without `match_no`) when
/// `matches` is empty, otherwise one row per candidate with `match_no`
/// counting from 1 in input order.
///
/// # Errors
///
/// Returns [`ClientError::SchemaViolation`] if `raw` is not an object, has no
/// `matches` list, or a candidate contains a shape outside the known layout.
pub fn flatten_facilities(raw: &Value) -> Result<Vec<FlatRecord>, ClientError> {
    let Value::Object(raw) = raw else {
        return Err(ClientError::schema("response is not a JSON object"));
    };
    let Some(Value::Array(matches)) = raw.get("matches") else {
        return Err(ClientError::schema("response has no `matches` list"));
    };

    let base = base_record(raw);
    if matches.is_empty() {
        return Ok(vec![shorten_keys(base)]);
    }

    matches
        .iter()
        .enumerate()
        .map(|(index, candidate)| candidate_row(index + 1, &base, candidate))
        .collect()
}

/// Every top-level key except `matches`, with `geocoded_geometry` expanded
/// into `lon`/`lat` (`-1` each when the coordinates are unusable).
fn base_record(raw: &Map<String, Value>) -> FlatRecord {
    let mut base = FlatRecord::new();
    for (key, value) in raw {
        match key.as_str() {
            "matches" => {}
            "geocoded_geometry" => {
                let (lon, lat) =
                    coordinates(value).unwrap_or((Value::from(-1), Value::from(-1)));
                base.insert("lon".to_owned(), lon);
                base.insert("lat".to_owned(), lat);
            }
            _ => {
                base.insert(key.clone(), null_to_empty(value));
            }
        }
    }
    base
}

fn candidate_row(
    match_no: usize,
    base: &FlatRecord,
    candidate: &Value,
) -> Result<FlatRecord, ClientError> {
    let Value::Object(candidate) = candidate else {
        return Err(ClientError::schema(format!(
            "match {match_no} is not an object"
        )));
    };

    let mut row = FlatRecord::new();
    row.insert("match_no".to_owned(), Value::from(match_no));
    row.extend(base.iter().map(|(k, v)| (k.clone(), v.clone())));

    for (key, value) in candidate {
        match (key.as_str(), value) {
            (_, Value::Array(_)) => {
                return Err(ClientError::schema(format!(
                    "match {match_no} has a list under top-level key `{key}`"
                )));
            }
            ("Feature" | "type", _) => {}
            ("geometry", geometry) => {
                let (lon, lat) = coordinates(geometry).ok_or_else(|| {
                    ClientError::schema(format!("match {match_no} geometry has no coordinates"))
                })?;
                row.insert("match_lon".to_owned(), lon);
                row.insert("match_lat".to_owned(), lat);
            }
            (_, Value::Object(properties)) => flatten_properties(&mut row, properties)?,
            (_, scalar) => {
                row.insert(format!("match_{key}"), null_to_empty(scalar));
            }
        }
    }

    Ok(shorten_keys(row))
}

/// What to do with a list element that is neither an object nor a string.
#[derive(Debug, Clone, Copy)]
enum OddElements {
    Skip,
    Reject,
}

/// One level below the candidate: lists are joined, nested objects become
/// `match_{key}_{sub}` columns, `ppe_*` scalars are dropped.
fn flatten_properties(
    row: &mut FlatRecord,
    properties: &Map<String, Value>,
) -> Result<(), ClientError> {
    for (key, value) in properties {
        match value {
            Value::Array(items) => {
                let joined = join_lines(key, items, OddElements::Skip)?;
                row.insert(format!("match_{key}"), Value::String(joined));
            }
            Value::Object(nested) => {
                for (sub, entries) in nested {
                    let column = format!("match_{key}_{sub}");
                    let rendered = match entries {
                        Value::Array(items) => join_lines(&column, items, OddElements::Reject)?,
                        scalar => render_scalar(scalar),
                    };
                    row.insert(column, Value::String(rendered));
                }
            }
            _ if key.starts_with("ppe_") => {}
            scalar => {
                row.insert(format!("match_{key}"), null_to_empty(scalar));
            }
        }
    }
    Ok(())
}

/// Renders list elements as lines. Objects become `key:value` pairs joined by
/// `|`, strings pass through, and `lng:` is rewritten to `lon:`.
fn join_lines(column: &str, items: &[Value], odd: OddElements) -> Result<String, ClientError> {
    let mut lines = Vec::with_capacity(items.len());
    for item in items {
        match item {
            Value::Object(fields) => lines.push(
                fields
                    .iter()
                    .map(|(k, v)| format!("{k}:{}", render_scalar(v)))
                    .collect::<Vec<_>>()
                    .join("|"),
            ),
            Value::String(s) => lines.push(s.clone()),
            other => match odd {
                OddElements::Skip => {}
                OddElements::Reject => {
                    return Err(ClientError::schema(format!(
                        "`{column}` contains a list element that is neither an object nor a \
                         string: {other}"
                    )));
                }
            },
        }
    }

    Ok(lines.join("\n").replace("lng:", "lon:"))
}

fn coordinates(geometry: &Value) -> Option<(Value, Value)> {
    let coords = geometry.get("coordinates")?.as_array()?;
    Some((coords.first()?.clone(), coords.get(1)?.clone()))
}

fn null_to_empty(value: &Value) -> Value {
    match value {
        Value::Null => Value::String(String::new()),
        other => other.clone(),
    }
}

/// Text form of a value embedded in a joined line. Strings are unquoted;
/// anything else uses Python's `repr` spelling.
fn render_scalar(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => python_repr(other),
    }
}

fn python_repr(value: &Value) -> String {
    match value {
        Value::Null => "None".to_owned(),
        Value::Bool(true) => "True".to_owned(),
        Value::Bool(false) => "False".to_owned(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => quote(s),
        Value::Array(items) => {
            let inner: Vec<String> = items.iter().map(python_repr).collect();
            format!("[{}]", inner.join(", "))
        }
        Value::Object(fields) => {
            let inner: Vec<String> = fields
                .iter()
                .map(|(k, v)| format!("{}: {}", quote(k), python_repr(v)))
                .collect();
            format!("{{{}}}", inner.join(", "))
        }
    }
}

/// Single quotes unless the text contains one and no double quote.
fn quote(text: &str) -> String {
    let delimiter = if text.contains('\'') && !text.contains('"') {
        '"'
    } else {
        '\''
    };
    let mut quoted = String::with_capacity(text.len() + 2);
    quoted.push(delimiter);
    for c in text.chars() {
        match c {
            '\\' => quoted.push_str("\\\\"),
            '\n' => quoted.push_str("\\n"),
            '\r' => quoted.push_str("\\r"),
            '\t' => quoted.push_str("\\t"),
            c if c == delimiter => {
                quoted.push('\\');
                quoted.push(c);
            }
            c => quoted.push(c),
        }
    }
    quoted.push(delimiter);
    quoted
}

fn shorten_keys(row: FlatRecord) -> FlatRecord {
    row.into_iter()
        .map(|(key, value)| {
            (
                key.replace(EXTENDED_FIELDS_PREFIX, EXTENDED_FIELDS_SHORT),
                value,
            )
        })
        .collect()
}

#[cfg(test)]
#[path = "flatten_test.rs"]
mod tests;
