// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

//! Paged, lazily materialised views over a recipe store: a flat recipe
//! list and an ingredient-key tree, with incremental search, multi-column
//! sort and synchronous change events.

pub mod error;
pub mod events;
pub mod keys;
pub mod paged;
pub mod recipes;
pub mod schema;
pub mod search;
pub mod sort;
pub mod source;
pub mod sqlite;
pub mod store;
pub mod tree;
pub mod window;

#[cfg(test)]
mod testing;

pub use error::{ViewError, ViewResult};
pub use events::{Notifier, ViewEvent, WindowSnapshot};
pub use keys::{EditScope, KeyIndex, KeyLevel, KeySource, RenameReport};
pub use paged::{PagedView, ViewChange};
pub use recipes::{RecipeIndex, RecipeSource};
pub use schema::{FieldKind, Row, RowSchema, Value};
pub use search::{
    FilterChip, SearchController, SearchDecision, SearchGate, SearchGuard, SearchOutcome,
    SearchState,
};
pub use sort::{SortController, parse_sort_key};
pub use source::{TreeSource, ViewSource};
pub use store::{IngredientStore, RecipeStore};
pub use tree::{PagedTree, RefreshReport, TreePath, VisibleNode};
pub use window::PageWindow;

use larder_app::SortKey;

pub const DEFAULT_PER_PAGE: usize = 12;

/// Construction-time settings for a view.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewConfig<C> {
    pub per_page: usize,
    pub default_sort: Vec<SortKey<C>>,
}

impl<C> Default for ViewConfig<C> {
    fn default() -> Self {
        Self {
            per_page: DEFAULT_PER_PAGE,
            default_sort: Vec::new(),
        }
    }
}
