// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use std::cell::Cell;
use std::rc::Rc;

use larder_app::{Column, Filter, ViewDescriptor};

use crate::error::{ViewError, ViewResult};
use crate::paged::ViewChange;
use crate::sort::SortController;

/// The last accepted search request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchState<C> {
    pub last_query_text: String,
    pub last_query_column: Option<C>,
    pub use_regex: bool,
}

impl<C> Default for SearchState<C> {
    fn default() -> Self {
        Self {
            last_query_text: String::new(),
            last_query_column: None,
            use_regex: false,
        }
    }
}

/// A filter made permanent by `limit`.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterChip<C> {
    pub filter: Filter<C>,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SearchDecision<C> {
    NoOp,
    Apply {
        mode: ViewChange,
        descriptor: ViewDescriptor<C>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchOutcome {
    Applied,
    NoOp,
    /// Another search was still running.
    Busy,
}

/// Turns search requests into view descriptors and decides whether the
/// new result may reuse the old one.
#[derive(Debug, Clone)]
pub struct SearchController<C> {
    base: Vec<Filter<C>>,
    chips: Vec<FilterChip<C>>,
    current: Option<FilterChip<C>>,
    state: SearchState<C>,
    sort: SortController<C>,
}

impl<C: Column> SearchController<C> {
    /// `base` filters apply to every query, typically `deleted = false`.
    pub fn new(base: Vec<Filter<C>>, sort: SortController<C>) -> Self {
        Self {
            base,
            chips: Vec::new(),
            current: None,
            state: SearchState::default(),
            sort,
        }
    }

    pub fn state(&self) -> &SearchState<C> {
        &self.state
    }

    pub fn sort(&self) -> &SortController<C> {
        &self.sort
    }

    pub fn sort_mut(&mut self) -> &mut SortController<C> {
        &mut self.sort
    }

    pub fn chips(&self) -> &[FilterChip<C>] {
        &self.chips
    }

    /// Refines only when the column and substring mode are unchanged and
    /// the text extends the previous text; anything else resets.
    pub fn request(
        &mut self,
        query: &str,
        search_by: C,
        use_regex: bool,
    ) -> ViewResult<SearchDecision<C>> {
        if !search_by.is_searchable() {
            return Err(ViewError::InvalidSpec(format!(
                "cannot search by {}",
                search_by.name()
            )));
        }

        let state = &self.state;
        if state.last_query_column == Some(search_by)
            && state.last_query_text == query
            && state.use_regex == use_regex
        {
            return Ok(SearchDecision::NoOp);
        }

        let refine = state.last_query_column == Some(search_by)
            && !use_regex
            && !state.use_regex
            && query.starts_with(&state.last_query_text);

        self.current = if query.is_empty() {
            None
        } else {
            let filter = if use_regex {
                Filter::regex(search_by, query)
            } else {
                Filter::contains(search_by, query)
            };
            Some(FilterChip {
                filter,
                label: chip_label(query, search_by),
            })
        };
        self.state = SearchState {
            last_query_text: query.to_owned(),
            last_query_column: Some(search_by),
            use_regex,
        };

        let mode = if refine {
            ViewChange::Refine
        } else {
            ViewChange::Reset
        };
        Ok(SearchDecision::Apply {
            mode,
            descriptor: self.descriptor(),
        })
    }

    /// Pins the active search as a chip. Returns false when no search is
    /// active.
    pub fn limit(&mut self) -> bool {
        let Some(chip) = self.current.take() else {
            return false;
        };
        self.chips.push(chip);
        self.state = SearchState::default();
        true
    }

    pub fn limit_label(&self) -> String {
        self.chips
            .iter()
            .map(|chip| chip.label.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Drops chips and the active search, keeping the base filters and
    /// sort.
    pub fn reset(&mut self) {
        self.chips.clear();
        self.current = None;
        self.state = SearchState::default();
    }

    pub fn descriptor(&self) -> ViewDescriptor<C> {
        let filters = self
            .base
            .iter()
            .cloned()
            .chain(self.chips.iter().map(|chip| chip.filter.clone()))
            .chain(self.current.iter().map(|chip| chip.filter.clone()))
            .collect();
        ViewDescriptor::new(filters, self.sort.keys().to_vec())
    }
}

fn chip_label<C: Column>(query: &str, column: C) -> String {
    if column.is_anywhere() {
        query.to_owned()
    } else {
        format!("{query} in {}", column.label())
    }
}

/// In-flight flag for search-as-you-type. Clones share the flag.
#[derive(Debug, Clone, Default)]
pub struct SearchGate {
    busy: Rc<Cell<bool>>,
}

impl SearchGate {
    pub fn is_busy(&self) -> bool {
        self.busy.get()
    }

    /// Marks a search as running until the guard drops; `None` if one
    /// already is.
    pub fn enter(&self) -> Option<SearchGuard> {
        if self.busy.replace(true) {
            return None;
        }
        Some(SearchGuard {
            busy: self.busy.clone(),
        })
    }
}

#[derive(Debug)]
pub struct SearchGuard {
    busy: Rc<Cell<bool>>,
}

impl Drop for SearchGuard {
    fn drop(&mut self) {
        self.busy.set(false);
    }
}
