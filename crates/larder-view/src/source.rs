// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use crate::error::ViewResult;
use crate::schema::{Row, RowSchema};

/// Ordered, index-addressable result of one backing query.
pub trait ViewSource {
    fn schema(&self) -> &RowSchema;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Projects the record at `index` into a row. Callers only ask for
    /// indices inside the visible window.
    fn row(&self, index: usize) -> ViewResult<Row>;

    /// Stable identity of the record at `index`, used to reuse projected
    /// rows across refined queries.
    fn row_key(&self, _index: usize) -> Option<i64> {
        None
    }

    /// Re-reads the record at `index` from the store. Returns false when
    /// the source has nothing newer to show.
    fn reload(&mut self, _index: usize) -> ViewResult<bool> {
        Ok(false)
    }
}

/// A source whose rows are the roots of a lazily expanded tree.
pub trait TreeSource: ViewSource {
    /// Children of the last node in `lineage`, which runs root first.
    fn children(&self, lineage: &[Row]) -> ViewResult<Vec<Row>>;

    fn is_expandable(&self, row: &Row) -> bool;

    /// Value that names `row` among its siblings.
    fn identity(&self, row: &Row) -> String;
}
