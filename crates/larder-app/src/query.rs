// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use serde::{Deserialize, Serialize};

use crate::model::SortDirection;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operator {
    Equals,
    Like,
    Regex,
}

impl Operator {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Equals => "=",
            Self::Like => "LIKE",
            Self::Regex => "REGEXP",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FilterValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl FilterValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(value) => Some(value),
            _ => None,
        }
    }

    pub fn display(&self) -> String {
        match self {
            Self::Null => String::new(),
            Self::Bool(value) => value.to_string(),
            Self::Int(value) => value.to_string(),
            Self::Float(value) => value.to_string(),
            Self::Text(value) => value.clone(),
        }
    }
}

impl From<&str> for FilterValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_owned())
    }
}

impl From<String> for FilterValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<bool> for FilterValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for FilterValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<f64> for FilterValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl<T: Into<FilterValue>> From<Option<T>> for FilterValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Filter<C> {
    pub column: C,
    pub operator: Operator,
    pub value: FilterValue,
}

impl<C> Filter<C> {
    pub fn equals(column: C, value: impl Into<FilterValue>) -> Self {
        Self {
            column,
            operator: Operator::Equals,
            value: value.into(),
        }
    }

    /// Substring match on `query`; the stored value follows the LIKE
    /// dialect of [`like_search`].
    pub fn contains(column: C, query: &str) -> Self {
        Self {
            column,
            operator: Operator::Like,
            value: FilterValue::Text(like_search(query)),
        }
    }

    pub fn regex(column: C, query: &str) -> Self {
        Self {
            column,
            operator: Operator::Regex,
            value: FilterValue::Text(regex_search(query)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SortKey<C> {
    pub column: C,
    pub direction: SortDirection,
}

impl<C> SortKey<C> {
    pub const fn asc(column: C) -> Self {
        Self {
            column,
            direction: SortDirection::Asc,
        }
    }

    pub const fn desc(column: C) -> Self {
        Self {
            column,
            direction: SortDirection::Desc,
        }
    }
}

/// Immutable description of one backing query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewDescriptor<C> {
    filters: Vec<Filter<C>>,
    sort_by: Vec<SortKey<C>>,
}

impl<C> ViewDescriptor<C> {
    pub fn new(filters: Vec<Filter<C>>, sort_by: Vec<SortKey<C>>) -> Self {
        Self { filters, sort_by }
    }

    pub fn filters(&self) -> &[Filter<C>] {
        &self.filters
    }

    pub fn sort_by(&self) -> &[SortKey<C>] {
        &self.sort_by
    }
}

impl<C> Default for ViewDescriptor<C> {
    fn default() -> Self {
        Self {
            filters: Vec::new(),
            sort_by: Vec::new(),
        }
    }
}

/// Builds the LIKE value for a substring search: every literal `%` is
/// doubled, then the whole query is wrapped in `%...%`.
pub fn like_search(query: &str) -> String {
    format!("%{}%", query.replace('%', "%%"))
}

/// Builds the REGEXP value for a search; `a or b` is shorthand for `a|b`.
pub fn regex_search(query: &str) -> String {
    query.replace(" or ", "|")
}

/// Decoded LIKE value.
///
/// Only the outer `%` pair is a wildcard. Inside it `%%` stands for one
/// literal percent, and every other character (`_` included) is literal.
/// Matching is ASCII case-insensitive, like SQLite's LIKE.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LikePattern {
    Contains(String),
    Exact(String),
}

impl LikePattern {
    pub fn parse(raw: &str) -> Self {
        if raw.len() >= 2
            && let Some(inner) = raw.strip_prefix('%').and_then(|rest| rest.strip_suffix('%'))
        {
            return Self::Contains(inner.replace("%%", "%"));
        }
        Self::Exact(raw.replace("%%", "%"))
    }

    pub fn needle(&self) -> &str {
        match self {
            Self::Contains(needle) | Self::Exact(needle) => needle,
        }
    }

    pub fn matches(&self, text: &str) -> bool {
        let text = text.to_ascii_lowercase();
        match self {
            Self::Contains(needle) => text.contains(&needle.to_ascii_lowercase()),
            Self::Exact(needle) => text == needle.to_ascii_lowercase(),
        }
    }

    /// SQLite pattern for use with `LIKE ? ESCAPE '\'`.
    pub fn to_sql(&self) -> String {
        let escaped = escape_sql_like(self.needle());
        match self {
            Self::Contains(_) => format!("%{escaped}%"),
            Self::Exact(_) => escaped,
        }
    }
}

fn escape_sql_like(value: &str) -> String {
    let mut output = String::with_capacity(value.len());
    for ch in value.chars() {
        if matches!(ch, '\\' | '%' | '_') {
            output.push('\\');
        }
        output.push(ch);
    }
    output
}
