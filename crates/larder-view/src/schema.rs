// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use std::collections::BTreeSet;
use std::fmt;
use std::rc::Rc;

use crate::error::{ViewError, ViewResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Bool,
    Int,
    Float,
    Text,
}

impl FieldKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Bool => "bool",
            Self::Int => "int",
            Self::Float => "float",
            Self::Text => "text",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl Value {
    pub const fn kind(&self) -> Option<FieldKind> {
        match self {
            Self::Null => None,
            Self::Bool(_) => Some(FieldKind::Bool),
            Self::Int(_) => Some(FieldKind::Int),
            Self::Float(_) => Some(FieldKind::Float),
            Self::Text(_) => Some(FieldKind::Text),
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(value) => Some(value),
            _ => None,
        }
    }

    pub const fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(value) => Some(*value),
            _ => None,
        }
    }

    pub const fn as_float(&self) -> Option<f64> {
        match self {
            Self::Float(value) => Some(*value),
            _ => None,
        }
    }

    pub const fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(value) => Some(*value),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => Ok(()),
            Self::Bool(value) => write!(f, "{value}"),
            Self::Int(value) => write!(f, "{value}"),
            Self::Float(value) => write!(f, "{value}"),
            Self::Text(value) => f.write_str(value),
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::Text(value.to_owned())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<usize> for Value {
    fn from(value: usize) -> Self {
        Self::Int(i64::try_from(value).unwrap_or(i64::MAX))
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

/// Ordered `(name, kind)` pairs every row of a view carries.
#[derive(Debug, Clone, PartialEq)]
pub struct RowSchema {
    fields: Rc<[(&'static str, FieldKind)]>,
}

impl RowSchema {
    pub fn new(fields: &[(&'static str, FieldKind)]) -> ViewResult<Self> {
        if fields.is_empty() {
            return Err(ViewError::InvalidSpec(
                "row schema needs at least one field".to_owned(),
            ));
        }
        let mut seen = BTreeSet::new();
        for (name, _) in fields {
            if !seen.insert(*name) {
                return Err(ViewError::InvalidSpec(format!(
                    "row schema declares field {name:?} twice"
                )));
            }
        }
        Ok(Self {
            fields: fields.into(),
        })
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.fields.iter().map(|(name, _)| *name)
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|(field, _)| *field == name)
    }

    /// Builds a row, checking arity and that every non-null value matches
    /// its field's kind.
    pub fn row(&self, values: Vec<Value>) -> ViewResult<Row> {
        if values.len() != self.fields.len() {
            return Err(ViewError::InvalidValue(format!(
                "row has {} values but the schema declares {} fields",
                values.len(),
                self.fields.len()
            )));
        }
        for ((name, kind), value) in self.fields.iter().zip(&values) {
            if let Some(actual) = value.kind()
                && actual != *kind
            {
                return Err(ViewError::InvalidValue(format!(
                    "field {name} expects {} but got {}",
                    kind.as_str(),
                    actual.as_str()
                )));
            }
        }
        Ok(Row {
            schema: self.clone(),
            values,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    schema: RowSchema,
    values: Vec<Value>,
}

impl Row {
    pub fn schema(&self) -> &RowSchema {
        &self.schema
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.schema
            .position(name)
            .and_then(|index| self.values.get(index))
    }

    /// Text of `name`; empty for null, missing or non-text fields.
    pub fn text(&self, name: &str) -> &str {
        self.get(name).and_then(Value::as_text).unwrap_or("")
    }

    pub fn int(&self, name: &str) -> Option<i64> {
        self.get(name).and_then(Value::as_int)
    }

    pub fn float(&self, name: &str) -> Option<f64> {
        self.get(name).and_then(Value::as_float)
    }

    pub fn flag(&self, name: &str) -> bool {
        self.get(name).and_then(Value::as_bool).unwrap_or(false)
    }
}
