//! Filter Conditions
//!
//! Raw WHERE conditions for one table, with `$Name` placeholders. From the
//! conditions and the current parameter bindings this derives, lazily:
//! - the WHERE fragment: each condition parenthesised, joined with ` AND `,
//!   placeholders replaced by `?` (one per value for lists inside `IN`)
//! - the bound column of every `?`
//! - the value of every `?`
//!
//! Conditions are parsed once. The WHERE text depends only on the length of
//! each IN list, so it is cached per length signature; values are rebuilt
//! whenever the bindings change.

use std::fmt;
use std::num::NonZeroUsize;

use lru::LruCache;

use crate::core::scanner::{is_whitespace, Scanner};
use crate::error::{DbmsError, Result};
use crate::filter::params::{ParamValue, Parameters};
use crate::map::{Column, Table};
use crate::value::Value;

/// Distinct IN-list length signatures kept per condition set
const WHERE_CACHE_SIZE: NonZeroUsize = NonZeroUsize::MIN.saturating_add(15);

#[derive(Debug, Clone)]
enum Segment {
    Text(String),
    /// Index into the placeholder list
    Param(usize),
}

#[derive(Debug, Clone)]
struct Placeholder {
    name: String,
    column: Column,
    in_list: bool,
}

#[derive(Debug, Clone)]
struct Parsed {
    conditions: Vec<Vec<Segment>>,
    placeholders: Vec<Placeholder>,
}

#[derive(Debug, Clone)]
struct Derived {
    where_text: String,
    columns: Vec<Column>,
    values: Vec<Value>,
}

/// Parts of a filter ready to go into a query
#[derive(Debug, Clone, Copy)]
pub struct ResolvedConditions<'a> {
    /// None when there are no conditions
    pub where_clause: Option<&'a str>,
    /// None when no condition has a placeholder
    pub columns: Option<&'a [Column]>,
    pub values: Option<&'a [Value]>,
}

/// WHERE conditions on one table
pub struct FilterConditions {
    table: Table,
    conditions: Vec<String>,
    parameters: Parameters,
    parsed: Option<Parsed>,
    derived: Option<Derived>,
    where_cache: LruCache<Vec<usize>, String>,
}

impl FilterConditions {
    pub fn new(table: Table) -> Self {
        FilterConditions {
            table,
            conditions: Vec::new(),
            parameters: Parameters::new(),
            parsed: None,
            derived: None,
            where_cache: LruCache::new(WHERE_CACHE_SIZE),
        }
    }

    pub fn with_condition(mut self, condition: impl Into<String>) -> Self {
        self.add_condition(condition);
        self
    }

    /// Add a condition; everything derived so far is discarded
    pub fn add_condition(&mut self, condition: impl Into<String>) {
        self.conditions.push(condition.into());
        self.parsed = None;
        self.derived = None;
        self.where_cache.clear();
    }

    pub fn table(&self) -> &Table {
        &self.table
    }

    pub fn conditions(&self) -> &[String] {
        &self.conditions
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    /// Replace the parameter bindings
    pub fn set_parameters(&mut self, parameters: &Parameters) {
        self.parameters = parameters.clone();
        self.derived = None;
    }

    /// WHERE fragment, empty when there are no conditions
    pub fn where_condition(&mut self) -> Result<&str> {
        Ok(&self.derive()?.where_text)
    }

    /// Bound column of each placeholder, in placeholder order
    pub fn columns(&mut self) -> Result<Option<&[Column]>> {
        let derived = self.derive()?;
        Ok(non_empty(&derived.columns))
    }

    /// Value of each placeholder, index-aligned with [`columns`](Self::columns)
    pub fn parameter_values(&mut self) -> Result<Option<&[Value]>> {
        let derived = self.derive()?;
        Ok(non_empty(&derived.values))
    }

    /// Everything a query needs at once
    pub fn resolve(&mut self) -> Result<ResolvedConditions<'_>> {
        let derived = self.derive()?;
        Ok(ResolvedConditions {
            where_clause: if derived.where_text.is_empty() {
                None
            } else {
                Some(&derived.where_text)
            },
            columns: non_empty(&derived.columns),
            values: non_empty(&derived.values),
        })
    }

    fn derive(&mut self) -> Result<&Derived> {
        let parsed = match self.parsed.take() {
            Some(parsed) => parsed,
            None => parse_conditions(&self.table, &self.conditions)?,
        };
        let parsed = self.parsed.insert(parsed);
        let derived = match self.derived.take() {
            Some(derived) => derived,
            None => derive_parts(parsed, &self.parameters, &mut self.where_cache, &self.table)?,
        };
        Ok(self.derived.insert(derived))
    }
}

/// Values and columns for the current bindings, WHERE text from the cache
fn derive_parts(
    parsed: &Parsed,
    parameters: &Parameters,
    where_cache: &mut LruCache<Vec<usize>, String>,
    table: &Table,
) -> Result<Derived> {
    let mut signature = Vec::with_capacity(parsed.placeholders.len());
    let mut columns = Vec::with_capacity(parsed.placeholders.len());
    let mut values = Vec::with_capacity(parsed.placeholders.len());

    for placeholder in &parsed.placeholders {
        let value = parameters
            .get(&placeholder.name)
            .ok_or_else(|| DbmsError::MissingParameter(placeholder.name.clone()))?;
        match value {
            ParamValue::Scalar(v) => {
                signature.push(1);
                columns.push(placeholder.column.clone());
                values.push(v.clone());
            }
            ParamValue::List(_) if !placeholder.in_list => {
                return Err(DbmsError::InvalidParameter {
                    name: placeholder.name.clone(),
                    reason: "list values are only allowed inside IN (...)".to_string(),
                });
            }
            ParamValue::List(list) if list.is_empty() => {
                return Err(DbmsError::InvalidParameter {
                    name: placeholder.name.clone(),
                    reason: "IN list is empty".to_string(),
                });
            }
            ParamValue::List(list) => {
                signature.push(list.len());
                columns.extend(std::iter::repeat(placeholder.column.clone()).take(list.len()));
                values.extend(list.iter().cloned());
            }
        }
    }

    let where_text = match where_cache.get(&signature) {
        Some(text) => text.clone(),
        None => {
            let text = render(parsed, &signature);
            log::debug!("WHERE for {}: {}", table.name, text);
            where_cache.put(signature, text.clone());
            text
        }
    };
    Ok(Derived {
        where_text,
        columns,
        values,
    })
}

impl fmt::Debug for FilterConditions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FilterConditions")
            .field("table", &self.table.name)
            .field("conditions", &self.conditions)
            .field("parameters", &self.parameters)
            .finish()
    }
}

fn non_empty<T>(items: &[T]) -> Option<&[T]> {
    if items.is_empty() {
        None
    } else {
        Some(items)
    }
}

fn render(parsed: &Parsed, signature: &[usize]) -> String {
    let mut out = String::new();
    for (i, segments) in parsed.conditions.iter().enumerate() {
        if i > 0 {
            out.push_str(" AND ");
        }
        out.push('(');
        for segment in segments {
            match segment {
                Segment::Text(text) => out.push_str(text),
                Segment::Param(index) => {
                    let count = signature.get(*index).copied().unwrap_or(1);
                    for n in 0..count {
                        if n > 0 {
                            out.push(',');
                        }
                        out.push('?');
                    }
                }
            }
        }
        out.push(')');
    }
    out
}

fn parse_conditions(table: &Table, conditions: &[String]) -> Result<Parsed> {
    let mut placeholders = Vec::new();
    let conditions = conditions
        .iter()
        .map(|c| parse_condition(table, c, &mut placeholders))
        .collect::<Result<Vec<_>>>()?;
    Ok(Parsed {
        conditions,
        placeholders,
    })
}

struct Found<'a> {
    start: usize,
    end: usize,
    name: &'a str,
    in_list: bool,
}

/// Split one condition into text and placeholders
///
/// Quoted literals are skipped. A placeholder is inside an IN list when the
/// innermost open parenthesis follows the keyword `IN` and does not open a
/// subquery (its first word is not `SELECT`). Its column is the
/// nearest identifier to the left naming a column of the table, or failing
/// that the nearest one to the right.
fn parse_condition(table: &Table, condition: &str, placeholders: &mut Vec<Placeholder>) -> Result<Vec<Segment>> {
    let mut scanner = Scanner::new(condition);
    let mut identifiers: Vec<(usize, &str)> = Vec::new();
    let mut found: Vec<Found<'_>> = Vec::new();
    let mut parens: Vec<bool> = Vec::new();
    let mut last_word: Option<&str> = None;
    let mut after_open = false;

    while let Some(b) = scanner.peek() {
        match b {
            b'\'' => {
                scanner.advance(1);
                match scanner.find_byte(b'\'') {
                    Some(end) => scanner.set_position(end + 1),
                    None => scanner.set_position(condition.len()),
                }
                last_word = None;
            }
            b'(' => {
                parens.push(last_word.map(|w| w.eq_ignore_ascii_case("IN")).unwrap_or(false));
                scanner.advance(1);
                last_word = None;
                after_open = true;
                continue;
            }
            b')' => {
                parens.pop();
                scanner.advance(1);
                last_word = None;
            }
            b'$' => {
                let start = scanner.position();
                scanner.advance(1);
                let Some(name) = scanner.read_identifier() else {
                    return Err(DbmsError::InvalidParameter {
                        name: "$".to_string(),
                        reason: format!("placeholder without a name in \"{}\"", condition),
                    });
                };
                found.push(Found {
                    start,
                    end: scanner.position(),
                    name,
                    in_list: parens.last() == Some(&true),
                });
                last_word = None;
            }
            b if is_whitespace(b) => {
                scanner.advance(1);
                continue;
            }
            _ => {
                let start = scanner.position();
                match scanner.read_identifier() {
                    Some(word) => {
                        if after_open && word.eq_ignore_ascii_case("SELECT") {
                            if let Some(in_list) = parens.last_mut() {
                                *in_list = false;
                            }
                        }
                        identifiers.push((start, word));
                        last_word = Some(word);
                    }
                    None => {
                        if scanner.position() == start {
                            scanner.advance(1);
                        }
                        last_word = None;
                    }
                }
            }
        }
        after_open = false;
    }

    let mut segments = Vec::with_capacity(found.len() * 2 + 1);
    let mut copied = 0;
    for placeholder in found {
        let column = identifiers
            .iter()
            .rev()
            .filter(|(pos, _)| *pos < placeholder.start)
            .find_map(|(_, word)| column_for(table, word))
            .or_else(|| {
                identifiers
                    .iter()
                    .filter(|(pos, _)| *pos > placeholder.start)
                    .find_map(|(_, word)| column_for(table, word))
            })
            .ok_or_else(|| DbmsError::UnboundParameter {
                param: format!("${}", placeholder.name),
                condition: condition.to_string(),
            })?;

        if placeholder.start > copied {
            segments.push(Segment::Text(condition[copied..placeholder.start].to_string()));
        }
        segments.push(Segment::Param(placeholders.len()));
        placeholders.push(Placeholder {
            name: format!("${}", placeholder.name),
            column,
            in_list: placeholder.in_list,
        });
        copied = placeholder.end;
    }
    if copied < condition.len() {
        segments.push(Segment::Text(condition[copied..].to_string()));
    }
    Ok(segments)
}

/// Column of `table` named by an identifier, ignoring any qualifier
fn column_for(table: &Table, word: &str) -> Option<Column> {
    let name = word.rsplit_once('.').map(|(_, c)| c).unwrap_or(word);
    table.column_ignore_case(name).cloned()
}
