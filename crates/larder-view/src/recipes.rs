// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use std::rc::Rc;
use std::sync::mpsc::Receiver;

use larder_app::{Column, Filter, Recipe, RecipeColumn, RecipeId, SortKey, ViewDescriptor};
use tracing::{debug, info};

use crate::ViewConfig;
use crate::error::{ViewError, ViewResult, query_failed};
use crate::events::ViewEvent;
use crate::paged::{PagedView, ViewChange};
use crate::schema::{FieldKind, Row, RowSchema, Value};
use crate::search::{SearchController, SearchDecision, SearchGate, SearchOutcome, SearchState};
use crate::sort::SortController;
use crate::source::ViewSource;
use crate::store::RecipeStore;

const RECIPE_FIELDS: &[(&str, FieldKind)] = &[
    ("id", FieldKind::Int),
    ("title", FieldKind::Text),
    ("category", FieldKind::Text),
    ("cuisine", FieldKind::Text),
    ("rating", FieldKind::Int),
    ("source", FieldKind::Text),
    ("preptime", FieldKind::Int),
    ("cooktime", FieldKind::Int),
    ("yields", FieldKind::Text),
    ("link", FieldKind::Text),
    ("last_modified", FieldKind::Text),
];

/// Result of one recipe search. Rows are projected on demand; the
/// category lookup is the per-row store cost.
pub struct RecipeSource<St> {
    store: Rc<St>,
    recipes: Vec<Recipe>,
    schema: RowSchema,
}

impl<St: RecipeStore> RecipeSource<St> {
    pub fn query(store: Rc<St>, descriptor: &ViewDescriptor<RecipeColumn>) -> ViewResult<Self> {
        let recipes = store
            .search(descriptor)
            .map_err(query_failed("search recipes"))?;
        debug!(
            filters = descriptor.filters().len(),
            matches = recipes.len(),
            "searched recipes"
        );
        Ok(Self {
            store,
            recipes,
            schema: RowSchema::new(RECIPE_FIELDS)?,
        })
    }

    pub fn recipe(&self, index: usize) -> Option<&Recipe> {
        self.recipes.get(index)
    }

    pub fn position(&self, id: RecipeId) -> Option<usize> {
        self.recipes.iter().position(|recipe| recipe.id == id)
    }
}

impl<St: RecipeStore> ViewSource for RecipeSource<St> {
    fn schema(&self) -> &RowSchema {
        &self.schema
    }

    fn len(&self) -> usize {
        self.recipes.len()
    }

    fn row(&self, index: usize) -> ViewResult<Row> {
        let recipe = self
            .recipes
            .get(index)
            .ok_or_else(|| ViewError::InvalidValue(format!("no recipe at index {index}")))?;
        let categories = self
            .store
            .categories(recipe.id)
            .map_err(query_failed(format!(
                "load categories for recipe {}",
                recipe.id.get()
            )))?;
        self.schema.row(vec![
            Value::Int(recipe.id.get()),
            recipe.title.as_str().into(),
            categories.join(", ").into(),
            recipe.cuisine.as_str().into(),
            recipe.rating.into(),
            recipe.source.as_str().into(),
            recipe.preptime.into(),
            recipe.cooktime.into(),
            recipe.yields_label().into(),
            recipe.link.as_str().into(),
            recipe.last_modified.date().to_string().into(),
        ])
    }

    fn row_key(&self, index: usize) -> Option<i64> {
        self.recipes.get(index).map(|recipe| recipe.id.get())
    }

    fn reload(&mut self, index: usize) -> ViewResult<bool> {
        let Some(id) = self.recipes.get(index).map(|recipe| recipe.id) else {
            return Ok(false);
        };
        let fresh = self
            .store
            .fetch_one(id)
            .map_err(query_failed(format!("reload recipe {}", id.get())))?;
        match fresh {
            Some(recipe) => {
                self.recipes[index] = recipe;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

/// The paged recipe list: search, limit, sort and page navigation over a
/// [`RecipeStore`].
pub struct RecipeIndex<St> {
    store: Rc<St>,
    view: PagedView<RecipeSource<St>>,
    search: SearchController<RecipeColumn>,
    shown: ViewDescriptor<RecipeColumn>,
    gate: SearchGate,
}

impl<St: RecipeStore> RecipeIndex<St> {
    pub fn new(store: Rc<St>, config: &ViewConfig<RecipeColumn>) -> ViewResult<Self> {
        let sort = SortController::new(config.default_sort.clone())?;
        let search = SearchController::new(vec![not_deleted()], sort);
        let shown = search.descriptor();
        let source = RecipeSource::query(Rc::clone(&store), &shown)?;
        let view = PagedView::new(source, config.per_page)?;
        Ok(Self {
            store,
            view,
            search,
            shown,
            gate: SearchGate::default(),
        })
    }

    pub fn view(&self) -> &PagedView<RecipeSource<St>> {
        &self.view
    }

    /// Page navigation and row access.
    pub fn view_mut(&mut self) -> &mut PagedView<RecipeSource<St>> {
        &mut self.view
    }

    pub fn subscribe(&mut self) -> Receiver<ViewEvent> {
        self.view.subscribe()
    }

    pub fn search_state(&self) -> &SearchState<RecipeColumn> {
        self.search.state()
    }

    pub fn descriptor(&self) -> &ViewDescriptor<RecipeColumn> {
        &self.shown
    }

    pub fn search(
        &mut self,
        query: &str,
        search_by: RecipeColumn,
        use_regex: bool,
    ) -> ViewResult<SearchOutcome> {
        let before = self.search.clone();
        match self.search.request(query, search_by, use_regex)? {
            SearchDecision::NoOp => Ok(SearchOutcome::NoOp),
            SearchDecision::Apply { mode, descriptor } => {
                let applied = self.apply(descriptor, mode, false);
                if self.committed(before, applied)? {
                    Ok(SearchOutcome::Applied)
                } else {
                    Ok(SearchOutcome::NoOp)
                }
            }
        }
    }

    pub fn search_by_name(
        &mut self,
        query: &str,
        search_by: &str,
        use_regex: bool,
    ) -> ViewResult<SearchOutcome> {
        let column = RecipeColumn::from_name(search_by).ok_or_else(|| {
            ViewError::InvalidSpec(format!("unknown search column {search_by:?}"))
        })?;
        self.search(query, column, use_regex)
    }

    /// Like [`search`](Self::search), but declines while another search
    /// holds the gate.
    pub fn search_as_you_type(
        &mut self,
        query: &str,
        search_by: RecipeColumn,
        use_regex: bool,
    ) -> ViewResult<SearchOutcome> {
        let Some(_guard) = self.gate.enter() else {
            debug!(query, "search already running; dropping keystroke");
            return Ok(SearchOutcome::Busy);
        };
        self.search(query, search_by, use_regex)
    }

    pub fn gate(&self) -> &SearchGate {
        &self.gate
    }

    /// Pins the active search. The shown rows do not change.
    pub fn limit(&mut self) -> bool {
        self.search.limit()
    }

    pub fn limit_label(&self) -> String {
        self.search.limit_label()
    }

    pub fn reset(&mut self) -> ViewResult<()> {
        let before = self.search.clone();
        self.search.reset();
        let applied = self.apply(self.search.descriptor(), ViewChange::Reset, false);
        self.committed(before, applied)?;
        Ok(())
    }

    pub fn sort_keys(&self) -> &[SortKey<RecipeColumn>] {
        self.search.sort().keys()
    }

    pub fn toggle_sort(&mut self, column: RecipeColumn) -> ViewResult<()> {
        let before = self.search.clone();
        self.search.sort_mut().toggle(column)?;
        let resorted = self.resort();
        self.committed(before, resorted)
    }

    pub fn set_sort(&mut self, keys: Vec<SortKey<RecipeColumn>>) -> ViewResult<bool> {
        let before = self.search.clone();
        if !self.search.sort_mut().set(keys)? {
            return Ok(false);
        }
        let resorted = self.resort();
        self.committed(before, resorted)?;
        Ok(true)
    }

    /// Re-reads one recipe in place when it is on the current page.
    pub fn update_recipe(&mut self, id: RecipeId) -> ViewResult<bool> {
        let Some(position) = self.view.source().position(id) else {
            return Ok(false);
        };
        let (bottom, top) = self.view.window().bounds();
        if !(bottom..top).contains(&position) {
            return Ok(false);
        }
        self.view.update_row(position - bottom)
    }

    /// Soft-deletes `ids`, then re-runs the shown query on the same page.
    pub fn delete_recipes(&mut self, ids: &[RecipeId]) -> ViewResult<usize> {
        for id in ids {
            self.store
                .soft_delete(*id)
                .map_err(query_failed(format!("delete recipe {}", id.get())))?;
        }
        info!(count = ids.len(), "deleted recipes");
        self.refresh()?;
        Ok(ids.len())
    }

    /// Re-runs the shown query, keeping the page where possible.
    pub fn refresh(&mut self) -> ViewResult<()> {
        self.apply(self.shown.clone(), ViewChange::Reload, true)?;
        Ok(())
    }

    pub fn unique_values(&self, column: RecipeColumn) -> ViewResult<Vec<String>> {
        self.store
            .unique_values(column)
            .map_err(query_failed(format!("list {} values", column.as_str())))
    }

    /// Number of recipes that are not deleted, whatever the search.
    pub fn total(&self) -> ViewResult<usize> {
        self.store
            .count(&[not_deleted()])
            .map_err(query_failed("count recipes"))
    }

    pub fn matching_records(&self) -> ViewResult<Vec<Recipe>> {
        self.store
            .fetch_all(self.shown.filters())
            .map_err(query_failed("fetch matching recipes"))
    }

    pub fn status_text(&self) -> String {
        self.view.status_text("recipes")
    }

    /// Puts the search controller back to `before` when its new
    /// descriptor could not be shown, so chips, search state and sort keys
    /// keep describing the rows on screen.
    fn committed<T>(
        &mut self,
        before: SearchController<RecipeColumn>,
        result: ViewResult<T>,
    ) -> ViewResult<T> {
        if result.is_err() {
            self.search = before;
        }
        result
    }

    fn resort(&mut self) -> ViewResult<()> {
        self.apply(self.search.descriptor(), ViewChange::Reset, true)?;
        let spec = self.search.sort().spec();
        self.view.emit(ViewEvent::ViewSort(spec));
        Ok(())
    }

    /// Swaps in `descriptor`'s result. Returns false when it is already
    /// shown and `force` is not set.
    fn apply(
        &mut self,
        descriptor: ViewDescriptor<RecipeColumn>,
        mode: ViewChange,
        force: bool,
    ) -> ViewResult<bool> {
        if !force && descriptor == self.shown {
            debug!("recipe query unchanged");
            return Ok(false);
        }
        let source = RecipeSource::query(Rc::clone(&self.store), &descriptor)?;
        self.view.change_view(source, mode)?;
        self.shown = descriptor;
        Ok(true)
    }
}

fn not_deleted() -> Filter<RecipeColumn> {
    Filter::equals(RecipeColumn::Deleted, false)
}
