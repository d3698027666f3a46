//! Packing several script variables into one delimited output line, and
//! decoding that line back into a typed record.
//!
//! The encoded form is an AppleScript concatenation expression. Evaluated
//! by the runtime it yields `alias:value|alias:value|...`.

use crate::traits::{ScriptError, ScriptResult};
use serde::de::value::{Error as ValueError, MapDeserializer};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::BTreeMap;

pub const RECORD_SEPARATOR: char = '|';
pub const FIELD_SEPARATOR: char = ':';

/// Ordered `(script variable, output alias)` pairs.
///
/// Names are hard-coded by callers and must not contain either separator.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryFieldMap {
    fields: Vec<(String, String)>,
}

impl QueryFieldMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn field(mut self, variable: &str, alias: &str) -> Self {
        self.fields.push((variable.to_string(), alias.to_string()));
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(v, a)| (v.as_str(), a.as_str()))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Build the concatenation expression for `fields`.
pub fn create_query_string(fields: &QueryFieldMap) -> String {
    let clauses: Vec<String> = fields
        .iter()
        .map(|(variable, alias)| format!("\"{}{}\" & {}", alias, FIELD_SEPARATOR, variable))
        .collect();
    clauses.join(&format!(" & \"{}\" & ", RECORD_SEPARATOR))
}

/// Decoded `alias -> value` pairs, all values still strings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct QueryRecord(BTreeMap<String, String>);

impl QueryRecord {
    pub fn get(&self, alias: &str) -> Option<&str> {
        self.0.get(alias).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_inner(self) -> BTreeMap<String, String> {
        self.0
    }
}

/// Split a runtime output line into its `alias -> value` pairs.
///
/// Values keep everything after the first field separator, so a track
/// called `Act 1: Overture` survives intact.
pub fn parse_query_record(raw: &str) -> ScriptResult<QueryRecord> {
    let line = raw.trim();
    if line.is_empty() {
        return Err(ScriptError::parse("empty query output", raw));
    }
    if !line.contains(FIELD_SEPARATOR) {
        return Err(ScriptError::parse("query output has no field separator", raw));
    }

    let body = line.strip_suffix(RECORD_SEPARATOR).unwrap_or(line);
    let mut fields = BTreeMap::new();
    for chunk in body.split(RECORD_SEPARATOR) {
        let (alias, value) = chunk.split_once(FIELD_SEPARATOR).ok_or_else(|| {
            ScriptError::parse(format!("malformed query field {:?}", chunk), raw)
        })?;
        if alias.is_empty() {
            return Err(ScriptError::parse(format!("empty alias in field {:?}", chunk), raw));
        }
        if fields.insert(alias.to_string(), value.to_string()).is_some() {
            return Err(ScriptError::parse(format!("duplicate alias {:?}", alias), raw));
        }
    }
    Ok(QueryRecord(fields))
}

/// Decode a runtime output line into `T`, whose fields are the aliases.
///
/// Only string values are produced; numeric conversion belongs to the
/// caller. A missing alias is a parse failure.
pub fn parse_query_string<T: DeserializeOwned>(raw: &str) -> ScriptResult<T> {
    let record = parse_query_record(raw)?;
    let de = MapDeserializer::<_, ValueError>::new(record.into_inner().into_iter());
    T::deserialize(de).map_err(|e| ScriptError::parse(e.to_string(), raw))
}
