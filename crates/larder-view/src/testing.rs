// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use std::cell::{Cell, RefCell};
use std::cmp::Ordering;
use std::collections::BTreeMap;

use anyhow::{Result, anyhow, bail};
use larder_app::{
    Filter, FilterValue, Ingredient, IngredientColumn, IngredientId, KeyCount, LikePattern,
    Operator, Recipe, RecipeColumn, RecipeId, SortDirection, SortKey, ViewDescriptor,
};
use regex::RegexBuilder;
use time::OffsetDateTime;

use crate::store::{IngredientStore, RecipeStore};

/// In-memory store with call accounting, mirroring the SQLite store's
/// matching rules.
#[derive(Default)]
pub(crate) struct MemoryStore {
    recipes: RefCell<Vec<(Recipe, Vec<String>)>>,
    lines: RefCell<Vec<Ingredient>>,
    calls: RefCell<Vec<&'static str>>,
    failing: Cell<bool>,
}

impl MemoryStore {
    pub(crate) fn add_recipe(&self, title: &str, categories: &[&str]) -> RecipeId {
        let mut recipes = self.recipes.borrow_mut();
        let id = RecipeId::new(recipes.len() as i64 + 1);
        recipes.push((
            Recipe {
                id,
                title: title.to_owned(),
                instructions: String::new(),
                modifications: String::new(),
                cuisine: String::new(),
                rating: None,
                description: String::new(),
                source: String::new(),
                link: String::new(),
                preptime: None,
                cooktime: None,
                yields: None,
                yield_unit: String::new(),
                recipe_hash: String::new(),
                deleted: false,
                last_modified: OffsetDateTime::UNIX_EPOCH,
            },
            categories.iter().map(|c| (*c).to_owned()).collect(),
        ));
        id
    }

    pub(crate) fn edit_recipe(&self, id: RecipeId, edit: impl FnOnce(&mut Recipe)) {
        if let Some((recipe, _)) = self
            .recipes
            .borrow_mut()
            .iter_mut()
            .find(|(recipe, _)| recipe.id == id)
        {
            edit(recipe);
        }
    }

    pub(crate) fn add_line(
        &self,
        recipe_id: RecipeId,
        ingkey: &str,
        item: &str,
        unit: Option<&str>,
        amount: Option<f64>,
        rangeamount: Option<f64>,
    ) {
        let mut lines = self.lines.borrow_mut();
        let id = IngredientId::new(lines.len() as i64 + 1);
        lines.push(Ingredient {
            id,
            recipe_id,
            refid: None,
            unit: unit.map(str::to_owned),
            amount,
            rangeamount,
            item: item.to_owned(),
            ingkey: ingkey.to_owned(),
            optional: false,
            inggroup: None,
            position: id.get(),
            deleted: false,
        });
    }

    /// Deletes lines behind the views' back.
    pub(crate) fn purge_lines(&self, ingkey: &str, item: &str) {
        self.lines
            .borrow_mut()
            .retain(|line| !(line.ingkey == ingkey && line.item == item));
    }

    pub(crate) fn set_failing(&self, failing: bool) {
        self.failing.set(failing);
    }

    pub(crate) fn calls(&self, name: &str) -> usize {
        self.calls
            .borrow()
            .iter()
            .filter(|call| **call == name)
            .count()
    }

    pub(crate) fn total_calls(&self) -> usize {
        self.calls.borrow().len()
    }

    fn record(&self, name: &'static str) -> Result<()> {
        self.calls.borrow_mut().push(name);
        if self.failing.get() {
            bail!("database is locked");
        }
        Ok(())
    }

    fn recipe_matches(&self, recipe: &Recipe, categories: &[String], filter: &Filter<RecipeColumn>) -> Result<bool> {
        let lines = self.lines.borrow();
        let live = lines
            .iter()
            .filter(|line| line.recipe_id == recipe.id && !line.deleted)
            .collect::<Vec<_>>();
        let texts: Vec<String> = match filter.column {
            RecipeColumn::Deleted => {
                return Ok(filter.value == FilterValue::Bool(recipe.deleted));
            }
            RecipeColumn::Title => vec![recipe.title.clone()],
            RecipeColumn::Cuisine => vec![recipe.cuisine.clone()],
            RecipeColumn::Source => vec![recipe.source.clone()],
            RecipeColumn::Link => vec![recipe.link.clone()],
            RecipeColumn::Description => vec![recipe.description.clone()],
            RecipeColumn::Instructions => vec![recipe.instructions.clone()],
            RecipeColumn::Notes => vec![recipe.modifications.clone()],
            RecipeColumn::Rating => recipe.rating.map(|r| r.to_string()).into_iter().collect(),
            RecipeColumn::Category => categories.to_vec(),
            RecipeColumn::IngKey => live.iter().map(|line| line.ingkey.clone()).collect(),
            RecipeColumn::Item => live.iter().map(|line| line.item.clone()).collect(),
            RecipeColumn::Ingredient => live
                .iter()
                .flat_map(|line| [line.ingkey.clone(), line.item.clone()])
                .collect(),
            RecipeColumn::Anywhere => {
                let mut texts = vec![
                    recipe.title.clone(),
                    recipe.cuisine.clone(),
                    recipe.instructions.clone(),
                    recipe.modifications.clone(),
                    recipe.source.clone(),
                    recipe.link.clone(),
                ];
                texts.extend(categories.iter().cloned());
                texts.extend(
                    live.iter().flat_map(|line| [line.ingkey.clone(), line.item.clone()]),
                );
                texts
            }
            other => bail!("memory store cannot filter recipes by {}", other.as_str()),
        };
        for text in &texts {
            if text_matches(filter.operator, &filter.value, Some(text))? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    fn matching_lines(&self, criteria: &[Filter<IngredientColumn>]) -> Result<Vec<Ingredient>> {
        let mut matched = Vec::new();
        for line in self.lines.borrow().iter() {
            let mut keep = true;
            for filter in criteria {
                if !line_matches(line, filter)? {
                    keep = false;
                    break;
                }
            }
            if keep {
                matched.push(line.clone());
            }
        }
        Ok(matched)
    }
}

fn text_matches(operator: Operator, value: &FilterValue, text: Option<&str>) -> Result<bool> {
    match operator {
        Operator::Equals => Ok(match value {
            FilterValue::Null => text.is_none(),
            FilterValue::Text(expected) => text == Some(expected.as_str()),
            _ => false,
        }),
        Operator::Like => {
            let raw = value.as_text().ok_or_else(|| anyhow!("LIKE needs text"))?;
            Ok(text.is_some_and(|text| LikePattern::parse(raw).matches(text)))
        }
        Operator::Regex => {
            let raw = value.as_text().ok_or_else(|| anyhow!("REGEXP needs text"))?;
            let pattern = RegexBuilder::new(raw).case_insensitive(true).build()?;
            Ok(text.is_some_and(|text| pattern.is_match(text)))
        }
    }
}

fn number_matches(value: &FilterValue, number: Option<f64>) -> bool {
    match value {
        FilterValue::Null => number.is_none(),
        FilterValue::Float(expected) => number == Some(*expected),
        FilterValue::Int(expected) => number == Some(*expected as f64),
        _ => false,
    }
}

fn line_matches(line: &Ingredient, filter: &Filter<IngredientColumn>) -> Result<bool> {
    match filter.column {
        IngredientColumn::IngKey => text_matches(filter.operator, &filter.value, Some(&line.ingkey)),
        IngredientColumn::Item => text_matches(filter.operator, &filter.value, Some(&line.item)),
        IngredientColumn::Unit => {
            text_matches(filter.operator, &filter.value, line.unit.as_deref())
        }
        IngredientColumn::Amount => Ok(number_matches(&filter.value, line.amount)),
        IngredientColumn::RangeAmount => Ok(number_matches(&filter.value, line.rangeamount)),
        IngredientColumn::RecipeId => Ok(filter.value == FilterValue::Int(line.recipe_id.get())),
        IngredientColumn::Deleted => Ok(filter.value == FilterValue::Bool(line.deleted)),
        IngredientColumn::Count => bail!("count is an aggregate, not an ingredient column"),
    }
}

fn text_order(left: &str, right: &str, direction: SortDirection) -> Ordering {
    match (left.is_empty(), right.is_empty()) {
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        _ => {
            let ordering = left.to_lowercase().cmp(&right.to_lowercase());
            match direction {
                SortDirection::Asc => ordering,
                SortDirection::Desc => ordering.reverse(),
            }
        }
    }
}

impl RecipeStore for MemoryStore {
    fn search(&self, descriptor: &ViewDescriptor<RecipeColumn>) -> Result<Vec<Recipe>> {
        self.record("search")?;
        let mut found = Vec::new();
        for (recipe, categories) in self.recipes.borrow().iter() {
            let mut keep = true;
            for filter in descriptor.filters() {
                if !self.recipe_matches(recipe, categories, filter)? {
                    keep = false;
                    break;
                }
            }
            if keep {
                found.push(recipe.clone());
            }
        }
        for key in descriptor.sort_by() {
            if !matches!(key.column, RecipeColumn::Title | RecipeColumn::Cuisine | RecipeColumn::Rating) {
                bail!("memory store cannot sort by {}", key.column.as_str());
            }
        }
        found.sort_by(|left, right| {
            descriptor
                .sort_by()
                .iter()
                .map(|key| match key.column {
                    RecipeColumn::Cuisine => text_order(&left.cuisine, &right.cuisine, key.direction),
                    RecipeColumn::Rating => match (left.rating, right.rating) {
                        (None, Some(_)) => Ordering::Greater,
                        (Some(_), None) => Ordering::Less,
                        (l, r) if key.direction == SortDirection::Desc => r.cmp(&l),
                        (l, r) => l.cmp(&r),
                    },
                    _ => text_order(&left.title, &right.title, key.direction),
                })
                .find(|ordering| ordering.is_ne())
                .unwrap_or(Ordering::Equal)
                .then(left.id.cmp(&right.id))
        });
        Ok(found)
    }

    fn count(&self, filters: &[Filter<RecipeColumn>]) -> Result<usize> {
        Ok(self
            .search(&ViewDescriptor::new(filters.to_vec(), Vec::new()))?
            .len())
    }

    fn fetch_one(&self, id: RecipeId) -> Result<Option<Recipe>> {
        self.record("fetch_one")?;
        Ok(self
            .recipes
            .borrow()
            .iter()
            .find(|(recipe, _)| recipe.id == id)
            .map(|(recipe, _)| recipe.clone()))
    }

    fn fetch_all(&self, filters: &[Filter<RecipeColumn>]) -> Result<Vec<Recipe>> {
        self.search(&ViewDescriptor::new(filters.to_vec(), Vec::new()))
    }

    fn categories(&self, id: RecipeId) -> Result<Vec<String>> {
        self.record("categories")?;
        Ok(self
            .recipes
            .borrow()
            .iter()
            .find(|(recipe, _)| recipe.id == id)
            .map(|(_, categories)| categories.clone())
            .unwrap_or_default())
    }

    fn unique_values(&self, column: RecipeColumn) -> Result<Vec<String>> {
        self.record("recipe_unique_values")?;
        let recipes = self.recipes.borrow();
        let mut values = recipes
            .iter()
            .filter(|(recipe, _)| !recipe.deleted)
            .flat_map(|(recipe, categories)| match column {
                RecipeColumn::Category => categories.clone(),
                RecipeColumn::Cuisine => vec![recipe.cuisine.clone()],
                _ => vec![recipe.title.clone()],
            })
            .filter(|value| !value.is_empty())
            .collect::<Vec<_>>();
        values.sort_by_key(|value| value.to_lowercase());
        values.dedup();
        Ok(values)
    }

    fn soft_delete(&self, id: RecipeId) -> Result<()> {
        self.record("soft_delete")?;
        let mut found = false;
        self.edit_recipe(id, |recipe| {
            recipe.deleted = true;
            found = true;
        });
        if !found {
            bail!("recipe {} no longer exists", id.get());
        }
        Ok(())
    }
}

impl IngredientStore for MemoryStore {
    fn ingkeys_with_count(
        &self,
        filters: &[Filter<IngredientColumn>],
        sort_by: &[SortKey<IngredientColumn>],
    ) -> Result<Vec<KeyCount>> {
        self.record("ingkeys_with_count")?;
        let mut counts = BTreeMap::<String, usize>::new();
        for line in self.matching_lines(filters)? {
            if !line.ingkey.is_empty() {
                *counts.entry(line.ingkey).or_default() += 1;
            }
        }
        let mut keys = counts
            .into_iter()
            .map(|(ingkey, count)| KeyCount { ingkey, count })
            .collect::<Vec<_>>();
        keys.sort_by(|left, right| {
            let by_key = left.ingkey.to_lowercase().cmp(&right.ingkey.to_lowercase());
            sort_by
                .iter()
                .map(|key| {
                    let ordering = match key.column {
                        IngredientColumn::Count => left.count.cmp(&right.count),
                        _ => by_key,
                    };
                    match key.direction {
                        SortDirection::Asc => ordering,
                        SortDirection::Desc => ordering.reverse(),
                    }
                })
                .find(|ordering| ordering.is_ne())
                .unwrap_or(by_key)
                .then(left.ingkey.cmp(&right.ingkey))
        });
        Ok(keys)
    }

    fn unique_values(
        &self,
        column: IngredientColumn,
        criteria: &[Filter<IngredientColumn>],
    ) -> Result<Vec<String>> {
        self.record("unique_values")?;
        let mut values = self
            .matching_lines(criteria)?
            .into_iter()
            .filter_map(|line| match column {
                IngredientColumn::IngKey => Some(line.ingkey),
                IngredientColumn::Item => Some(line.item),
                IngredientColumn::Unit => line.unit,
                _ => None,
            })
            .filter(|value| !value.is_empty())
            .collect::<Vec<_>>();
        values.sort_by_key(|value| value.to_lowercase());
        values.dedup();
        Ok(values)
    }

    fn fetch_len(&self, criteria: &[Filter<IngredientColumn>]) -> Result<usize> {
        self.record("fetch_len")?;
        Ok(self.matching_lines(criteria)?.len())
    }

    fn amounts(
        &self,
        criteria: &[Filter<IngredientColumn>],
    ) -> Result<Vec<(Option<f64>, Option<f64>)>> {
        self.record("amounts")?;
        let mut amounts = self
            .matching_lines(criteria)?
            .into_iter()
            .map(|line| (line.amount, line.rangeamount))
            .collect::<Vec<_>>();
        amounts.sort_by(|left, right| left.partial_cmp(right).unwrap_or(Ordering::Equal));
        Ok(amounts)
    }

    fn recipe_titles(&self, ingkey: &str, item: &str) -> Result<Vec<String>> {
        self.record("recipe_titles")?;
        let ids = self
            .lines
            .borrow()
            .iter()
            .filter(|line| line.ingkey == ingkey && line.item == item && !line.deleted)
            .map(|line| line.recipe_id)
            .collect::<Vec<_>>();
        Ok(self
            .recipes
            .borrow()
            .iter()
            .filter(|(recipe, _)| ids.contains(&recipe.id) && !recipe.deleted)
            .map(|(recipe, _)| recipe.title.clone())
            .collect())
    }

    fn update_by_criteria(
        &self,
        criteria: &[Filter<IngredientColumn>],
        changes: &[(IngredientColumn, FilterValue)],
    ) -> Result<usize> {
        self.record("update_by_criteria")?;
        if criteria.is_empty() {
            bail!("refusing to update every ingredient line");
        }
        let ids = self
            .matching_lines(criteria)?
            .into_iter()
            .map(|line| line.id)
            .collect::<Vec<_>>();
        let mut lines = self.lines.borrow_mut();
        for line in lines.iter_mut().filter(|line| ids.contains(&line.id)) {
            for (column, value) in changes {
                match (column, value) {
                    (IngredientColumn::IngKey, FilterValue::Text(text)) => line.ingkey = text.clone(),
                    (IngredientColumn::Item, FilterValue::Text(text)) => line.item = text.clone(),
                    (IngredientColumn::Unit, FilterValue::Text(text)) => line.unit = Some(text.clone()),
                    (IngredientColumn::Unit, FilterValue::Null) => line.unit = None,
                    (IngredientColumn::Amount, FilterValue::Float(value)) => line.amount = Some(*value),
                    (IngredientColumn::Amount, FilterValue::Null) => line.amount = None,
                    (IngredientColumn::RangeAmount, FilterValue::Float(value)) => {
                        line.rangeamount = Some(*value);
                    }
                    (IngredientColumn::RangeAmount, FilterValue::Null) => line.rangeamount = None,
                    (IngredientColumn::Deleted, FilterValue::Bool(flag)) => line.deleted = *flag,
                    (column, value) => {
                        bail!("cannot set {} to {value:?}", column.as_str())
                    }
                }
            }
        }
        Ok(ids.len())
    }
}
