// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

//! The ingredient-key tree: keys at the root, then the items, units and
//! amounts recorded under each key.

use std::rc::Rc;
use std::sync::mpsc::Receiver;

use larder_app::{
    Column, Filter, FilterValue, IngredientColumn, KeyCount, SortKey, ViewDescriptor,
    format_amount, parse_amount,
};
use tracing::{debug, info};

use crate::ViewConfig;
use crate::error::{ViewError, ViewResult, query_failed};
use crate::events::ViewEvent;
use crate::paged::ViewChange;
use crate::schema::{FieldKind, Row, RowSchema, Value};
use crate::search::{SearchController, SearchDecision, SearchGate, SearchOutcome, SearchState};
use crate::sort::SortController;
use crate::source::{TreeSource, ViewSource};
use crate::store::IngredientStore;
use crate::tree::{PagedTree, RefreshReport, TreePath};

const KEY_FIELDS: &[(&str, FieldKind)] = &[
    ("kind", FieldKind::Text),
    ("value", FieldKind::Text),
    ("count", FieldKind::Int),
    ("recipes", FieldKind::Text),
    ("amount", FieldKind::Float),
    ("rangeamount", FieldKind::Float),
    ("placeholder", FieldKind::Bool),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyLevel {
    Key,
    Item,
    Unit,
    Amount,
}

impl KeyLevel {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Key => "key",
            Self::Item => "item",
            Self::Unit => "unit",
            Self::Amount => "amount",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "key" => Some(Self::Key),
            "item" => Some(Self::Item),
            "unit" => Some(Self::Unit),
            "amount" => Some(Self::Amount),
            _ => None,
        }
    }

    /// The level below this one; `None` for amounts.
    pub const fn child(self) -> Option<Self> {
        match self {
            Self::Key => Some(Self::Item),
            Self::Item => Some(Self::Unit),
            Self::Unit => Some(Self::Amount),
            Self::Amount => None,
        }
    }

    pub const fn column(self) -> IngredientColumn {
        match self {
            Self::Key => IngredientColumn::IngKey,
            Self::Item => IngredientColumn::Item,
            Self::Unit => IngredientColumn::Unit,
            Self::Amount => IngredientColumn::Amount,
        }
    }
}

/// How far a unit or amount edit reaches. Key and item renames always
/// apply to the whole lineage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EditScope {
    /// Every ingredient line with the same value.
    Everywhere,
    /// Lines under the same key.
    WithinKey,
    /// Lines under the same key and item.
    #[default]
    WithinItem,
}

#[derive(Debug, Default)]
pub struct RenameReport {
    pub updated: usize,
    pub refresh: RefreshReport,
}

/// Root rows are the keys of one query; children are computed on demand.
pub struct KeySource<St> {
    store: Rc<St>,
    filters: Vec<Filter<IngredientColumn>>,
    keys: Vec<KeyCount>,
    schema: RowSchema,
}

impl<St: IngredientStore> KeySource<St> {
    pub fn query(
        store: Rc<St>,
        descriptor: &ViewDescriptor<IngredientColumn>,
    ) -> ViewResult<Self> {
        let keys = store
            .ingkeys_with_count(descriptor.filters(), descriptor.sort_by())
            .map_err(query_failed("list ingredient keys"))?;
        debug!(keys = keys.len(), "listed ingredient keys");
        Ok(Self {
            store,
            filters: descriptor.filters().to_vec(),
            keys,
            schema: RowSchema::new(KEY_FIELDS)?,
        })
    }

    pub fn keys(&self) -> &[KeyCount] {
        &self.keys
    }

    pub(crate) fn set_key(&mut self, index: usize, ingkey: &str) {
        if let Some(key) = self.keys.get_mut(index) {
            key.ingkey = ingkey.to_owned();
        }
    }

    fn node(&self, level: KeyLevel, value: &str, count: usize, recipes: Value) -> ViewResult<Row> {
        self.schema.row(vec![
            level.as_str().into(),
            value.into(),
            count.into(),
            recipes,
            Value::Null,
            Value::Null,
            false.into(),
        ])
    }

    fn count(&self, criteria: &[Filter<IngredientColumn>]) -> ViewResult<usize> {
        self.store
            .fetch_len(criteria)
            .map_err(query_failed("count ingredient lines"))
    }

    fn texts(
        &self,
        column: IngredientColumn,
        criteria: &[Filter<IngredientColumn>],
    ) -> ViewResult<Vec<String>> {
        self.store
            .unique_values(column, criteria)
            .map_err(query_failed(format!("list distinct {}", column.as_str())))
    }

    fn amount_rows(&self, criteria: &[Filter<IngredientColumn>]) -> ViewResult<Vec<Row>> {
        let pairs = self
            .store
            .amounts(criteria)
            .map_err(query_failed("list ingredient amounts"))?;
        let mut seen = Vec::<String>::new();
        let mut rows = Vec::new();
        for (amount, rangeamount) in pairs {
            if amount.is_none() && rangeamount.is_none() {
                continue;
            }
            let text = format_amount(amount, rangeamount);
            if seen.contains(&text) {
                continue;
            }
            let mut narrowed = criteria.to_vec();
            narrowed.extend(amount_criteria(amount, rangeamount));
            let count = self.count(&narrowed)?;
            rows.push(self.schema.row(vec![
                KeyLevel::Amount.as_str().into(),
                text.as_str().into(),
                count.into(),
                Value::Null,
                amount.into(),
                rangeamount.into(),
                false.into(),
            ])?);
            seen.push(text);
        }
        Ok(rows)
    }

    fn placeholder(&self, level: KeyLevel, count: i64) -> ViewResult<Row> {
        self.schema.row(vec![
            level.as_str().into(),
            "".into(),
            count.into(),
            Value::Null,
            Value::Null,
            Value::Null,
            true.into(),
        ])
    }
}

impl<St: IngredientStore> ViewSource for KeySource<St> {
    fn schema(&self) -> &RowSchema {
        &self.schema
    }

    fn len(&self) -> usize {
        self.keys.len()
    }

    fn row(&self, index: usize) -> ViewResult<Row> {
        let key = self
            .keys
            .get(index)
            .ok_or_else(|| ViewError::InvalidValue(format!("no ingredient key at index {index}")))?;
        self.node(KeyLevel::Key, &key.ingkey, key.count, Value::Null)
    }

    /// Recounts the key under the query's own filters.
    fn reload(&mut self, index: usize) -> ViewResult<bool> {
        let Some(ingkey) = self.keys.get(index).map(|key| key.ingkey.clone()) else {
            return Ok(false);
        };
        let mut criteria = self.filters.clone();
        criteria.push(Filter::equals(IngredientColumn::IngKey, ingkey.as_str()));
        let count = self.count(&criteria)?;
        self.keys[index].count = count;
        Ok(true)
    }
}

impl<St: IngredientStore> TreeSource for KeySource<St> {
    fn children(&self, lineage: &[Row]) -> ViewResult<Vec<Row>> {
        let Some(parent) = lineage.last() else {
            return Ok(Vec::new());
        };
        let Some(level) = level_of(parent)?.child() else {
            return Ok(Vec::new());
        };
        let criteria = lineage_criteria(lineage)?;
        let mut rows = Vec::new();
        match level {
            KeyLevel::Item => {
                let ingkey = lineage[0].text("value");
                for item in self.texts(IngredientColumn::Item, &criteria)? {
                    let mut narrowed = criteria.clone();
                    narrowed.push(Filter::equals(IngredientColumn::Item, item.as_str()));
                    let count = self.count(&narrowed)?;
                    let titles = self
                        .store
                        .recipe_titles(ingkey, &item)
                        .map_err(query_failed(format!("list recipes using {ingkey}")))?;
                    rows.push(self.node(level, &item, count, titles.join(", ").into())?);
                }
            }
            KeyLevel::Unit => {
                for unit in self.texts(IngredientColumn::Unit, &criteria)? {
                    let mut narrowed = criteria.clone();
                    narrowed.push(Filter::equals(IngredientColumn::Unit, unit.as_str()));
                    let count = self.count(&narrowed)?;
                    rows.push(self.node(level, &unit, count, Value::Null)?);
                }
            }
            KeyLevel::Amount => rows = self.amount_rows(&criteria)?,
            KeyLevel::Key => {}
        }
        if rows.is_empty() {
            rows.push(self.placeholder(level, parent.int("count").unwrap_or(0))?);
        }
        Ok(rows)
    }

    /// Amounts are leaves. A missing unit still expands, to the amounts
    /// of the lines without one; other placeholders are leaves.
    fn is_expandable(&self, row: &Row) -> bool {
        match KeyLevel::parse(row.text("kind")) {
            Some(KeyLevel::Unit) => true,
            Some(KeyLevel::Key | KeyLevel::Item) => !row.flag("placeholder"),
            Some(KeyLevel::Amount) | None => false,
        }
    }

    fn identity(&self, row: &Row) -> String {
        row.text("value").to_owned()
    }
}

fn level_of(row: &Row) -> ViewResult<KeyLevel> {
    KeyLevel::parse(row.text("kind")).ok_or_else(|| {
        ViewError::InvalidValue(format!("unknown key tree level {:?}", row.text("kind")))
    })
}

fn not_deleted() -> Filter<IngredientColumn> {
    Filter::equals(IngredientColumn::Deleted, false)
}

fn amount_criteria(amount: Option<f64>, rangeamount: Option<f64>) -> [Filter<IngredientColumn>; 2] {
    [
        Filter::equals(IngredientColumn::Amount, amount),
        Filter::equals(IngredientColumn::RangeAmount, rangeamount),
    ]
}

/// Criteria naming one node on its own. Placeholders name a missing value.
fn node_criteria(row: &Row) -> ViewResult<Vec<Filter<IngredientColumn>>> {
    let level = level_of(row)?;
    if level == KeyLevel::Amount {
        return Ok(amount_criteria(row.float("amount"), row.float("rangeamount")).to_vec());
    }
    let value = if row.flag("placeholder") {
        FilterValue::Null
    } else {
        FilterValue::from(row.text("value"))
    };
    Ok(vec![Filter::equals(level.column(), value)])
}

fn lineage_criteria(lineage: &[Row]) -> ViewResult<Vec<Filter<IngredientColumn>>> {
    let mut criteria = vec![not_deleted()];
    for row in lineage {
        criteria.extend(node_criteria(row)?);
    }
    Ok(criteria)
}

/// The ingredient-key editor: a paged key tree with search, sort and
/// edits that write through to the store and redraw what they touched.
pub struct KeyIndex<St> {
    store: Rc<St>,
    tree: PagedTree<KeySource<St>>,
    search: SearchController<IngredientColumn>,
    shown: ViewDescriptor<IngredientColumn>,
    gate: SearchGate,
}

impl<St: IngredientStore> KeyIndex<St> {
    pub fn new(store: Rc<St>, config: &ViewConfig<IngredientColumn>) -> ViewResult<Self> {
        let sort = SortController::new(config.default_sort.clone())?;
        let search = SearchController::new(vec![not_deleted()], sort);
        let shown = search.descriptor();
        let source = KeySource::query(Rc::clone(&store), &shown)?;
        let tree = PagedTree::new(source, config.per_page)?;
        Ok(Self {
            store,
            tree,
            search,
            shown,
            gate: SearchGate::default(),
        })
    }

    pub fn tree(&self) -> &PagedTree<KeySource<St>> {
        &self.tree
    }

    /// Page navigation, expansion and collapse.
    pub fn tree_mut(&mut self) -> &mut PagedTree<KeySource<St>> {
        &mut self.tree
    }

    pub fn subscribe(&mut self) -> Receiver<ViewEvent> {
        self.tree.subscribe()
    }

    pub fn search_state(&self) -> &SearchState<IngredientColumn> {
        self.search.state()
    }

    pub fn search(
        &mut self,
        query: &str,
        search_by: IngredientColumn,
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
        let column = IngredientColumn::from_name(search_by).ok_or_else(|| {
            ViewError::InvalidSpec(format!("unknown search column {search_by:?}"))
        })?;
        self.search(query, column, use_regex)
    }

    pub fn search_as_you_type(
        &mut self,
        query: &str,
        search_by: IngredientColumn,
        use_regex: bool,
    ) -> ViewResult<SearchOutcome> {
        let Some(_guard) = self.gate.enter() else {
            return Ok(SearchOutcome::Busy);
        };
        self.search(query, search_by, use_regex)
    }

    pub fn gate(&self) -> &SearchGate {
        &self.gate
    }

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

    pub fn toggle_sort(&mut self, column: IngredientColumn) -> ViewResult<()> {
        let before = self.search.clone();
        self.search.sort_mut().toggle(column)?;
        let resorted = self.resort();
        self.committed(before, resorted)
    }

    pub fn set_sort(&mut self, keys: Vec<SortKey<IngredientColumn>>) -> ViewResult<bool> {
        let before = self.search.clone();
        if !self.search.sort_mut().set(keys)? {
            return Ok(false);
        }
        let resorted = self.resort();
        self.committed(before, resorted)?;
        Ok(true)
    }

    /// Criteria selecting the ingredient lines under the node at `path`.
    pub fn describe(&self, path: &TreePath) -> ViewResult<Vec<Filter<IngredientColumn>>> {
        lineage_criteria(&self.tree.lineage(path)?)
    }

    /// Writes `text` as the new value of the node at `path`, then redraws
    /// the renamed node and every expanded level.
    pub fn rename(
        &mut self,
        path: &TreePath,
        text: &str,
        scope: EditScope,
    ) -> ViewResult<RenameReport> {
        let lineage = self.tree.lineage(path)?;
        let Some(node) = lineage.last() else {
            return Err(ViewError::StaleNode {
                path: path.to_string(),
            });
        };
        if node.flag("placeholder") {
            return Err(ViewError::InvalidValue(
                "placeholder rows cannot be edited".to_owned(),
            ));
        }
        let level = level_of(node)?;
        let text = text.trim();
        let (changes, identity) = edit_for(level, text)?;
        if identity == node.text("value") {
            return Ok(RenameReport::default());
        }

        let criteria = scoped_criteria(&lineage, level, scope)?;
        let updated = self
            .store
            .update_by_criteria(&criteria, &changes)
            .map_err(query_failed(format!("rename {} {:?}", level.as_str(), node.text("value"))))?;
        info!(
            level = level.as_str(),
            from = node.text("value"),
            to = identity.as_str(),
            updated,
            "renamed key tree node"
        );

        let old_ids = self.tree.identities(&lineage);
        let mut new_ids = old_ids.clone();
        if let Some(last) = new_ids.last_mut() {
            last.clone_from(&identity);
        }
        if let [root] = path.indices() {
            if self.tree.source().keys().iter().any(|key| key.ingkey == identity) {
                debug!(key = identity.as_str(), "key merged into an existing key");
                self.apply(self.shown.clone(), ViewChange::Reload, true)?;
                return Ok(RenameReport {
                    updated,
                    refresh: RefreshReport::default(),
                });
            }
            let (bottom, _) = self.tree.view().window().bounds();
            self.tree.source_mut().set_key(bottom + root, &identity);
            self.tree.update_root(*root)?;
        }
        self.tree.rekey(&old_ids, &new_ids);
        let refresh = self.tree.refresh_expanded()?;
        Ok(RenameReport { updated, refresh })
    }

    /// Applies `changes` to the lines under each selected node, once per
    /// subtree, then re-runs the key query on the same page.
    pub fn apply_to_selection(
        &mut self,
        paths: &[TreePath],
        changes: &[(IngredientColumn, FilterValue)],
    ) -> ViewResult<usize> {
        let mut paths = paths.to_vec();
        paths.sort();
        paths.dedup();

        let mut targets: Vec<(TreePath, Vec<Filter<IngredientColumn>>)> = Vec::new();
        for path in paths {
            if targets.iter().any(|(done, _)| done.is_ancestor_of(&path)) {
                continue;
            }
            let lineage = self.tree.lineage(&path)?;
            if lineage.last().is_some_and(|row| row.flag("placeholder")) {
                continue;
            }
            targets.push((path, lineage_criteria(&lineage)?));
        }

        let mut updated = 0;
        for (path, criteria) in &targets {
            updated += self
                .store
                .update_by_criteria(criteria, changes)
                .map_err(query_failed(format!("update ingredients under {path}")))?;
        }
        if !targets.is_empty() {
            info!(nodes = targets.len(), updated, "updated selected key tree nodes");
            self.apply(self.shown.clone(), ViewChange::Reload, true)?;
        }
        Ok(updated)
    }

    pub fn status_text(&self) -> String {
        self.tree.view().status_text("keys")
    }

    /// Puts the search controller back to `before` when its new
    /// descriptor could not be shown, so chips, search state and sort keys
    /// keep describing the rows on screen.
    fn committed<T>(
        &mut self,
        before: SearchController<IngredientColumn>,
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
        self.tree.emit(ViewEvent::ViewSort(spec));
        Ok(())
    }

    fn apply(
        &mut self,
        descriptor: ViewDescriptor<IngredientColumn>,
        mode: ViewChange,
        force: bool,
    ) -> ViewResult<bool> {
        if !force && descriptor == self.shown {
            debug!("key query unchanged");
            return Ok(false);
        }
        let source = KeySource::query(Rc::clone(&self.store), &descriptor)?;
        self.tree.change_view(source, mode)?;
        self.shown = descriptor;
        Ok(true)
    }
}

/// Store changes and new display value for setting a `level` node to
/// `text`.
fn edit_for(
    level: KeyLevel,
    text: &str,
) -> ViewResult<(Vec<(IngredientColumn, FilterValue)>, String)> {
    match level {
        KeyLevel::Key | KeyLevel::Item => {
            if text.is_empty() {
                return Err(ViewError::InvalidValue(format!(
                    "{} cannot be blank",
                    level.as_str()
                )));
            }
            Ok((vec![(level.column(), text.into())], text.to_owned()))
        }
        KeyLevel::Unit => {
            let value = if text.is_empty() {
                FilterValue::Null
            } else {
                text.into()
            };
            Ok((vec![(IngredientColumn::Unit, value)], text.to_owned()))
        }
        KeyLevel::Amount => {
            let (amount, rangeamount) = if text.is_empty() {
                (None, None)
            } else {
                let (amount, rangeamount) = parse_amount(text)
                    .map_err(|error| ViewError::InvalidValue(format!("{text:?}: {error}")))?;
                (Some(amount), rangeamount)
            };
            Ok((
                vec![
                    (IngredientColumn::Amount, amount.into()),
                    (IngredientColumn::RangeAmount, rangeamount.into()),
                ],
                format_amount(amount, rangeamount),
            ))
        }
    }
}

fn scoped_criteria(
    lineage: &[Row],
    level: KeyLevel,
    scope: EditScope,
) -> ViewResult<Vec<Filter<IngredientColumn>>> {
    let Some(node) = lineage.last() else {
        return Ok(vec![not_deleted()]);
    };
    match (level, scope) {
        (KeyLevel::Key | KeyLevel::Item, _) | (_, EditScope::WithinItem) => {
            lineage_criteria(lineage)
        }
        (_, EditScope::WithinKey) => {
            let mut criteria = lineage_criteria(&lineage[..1])?;
            criteria.extend(node_criteria(node)?);
            Ok(criteria)
        }
        (_, EditScope::Everywhere) => {
            let mut criteria = vec![not_deleted()];
            criteria.extend(node_criteria(node)?);
            Ok(criteria)
        }
    }
}
