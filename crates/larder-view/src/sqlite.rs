// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

//! The SQLite store behind the view traits.

use anyhow::Result;
use larder_app::{
    Filter, FilterValue, IngredientColumn, KeyCount, Recipe, RecipeColumn, RecipeId, SortKey,
    ViewDescriptor,
};
use larder_db::Store;

use crate::store::{IngredientStore, RecipeStore};

impl RecipeStore for Store {
    fn search(&self, descriptor: &ViewDescriptor<RecipeColumn>) -> Result<Vec<Recipe>> {
        self.search_recipes(descriptor)
    }

    fn count(&self, filters: &[Filter<RecipeColumn>]) -> Result<usize> {
        self.count_recipes(filters)
    }

    fn fetch_one(&self, id: RecipeId) -> Result<Option<Recipe>> {
        self.get_recipe(id)
    }

    fn fetch_all(&self, filters: &[Filter<RecipeColumn>]) -> Result<Vec<Recipe>> {
        self.fetch_recipes(filters)
    }

    fn categories(&self, id: RecipeId) -> Result<Vec<String>> {
        self.recipe_categories(id)
    }

    fn unique_values(&self, column: RecipeColumn) -> Result<Vec<String>> {
        self.recipe_unique_values(column)
    }

    fn soft_delete(&self, id: RecipeId) -> Result<()> {
        self.soft_delete_recipe(id)
    }
}

impl IngredientStore for Store {
    fn ingkeys_with_count(
        &self,
        filters: &[Filter<IngredientColumn>],
        sort_by: &[SortKey<IngredientColumn>],
    ) -> Result<Vec<KeyCount>> {
        Store::ingkeys_with_count(self, filters, sort_by)
    }

    fn unique_values(
        &self,
        column: IngredientColumn,
        criteria: &[Filter<IngredientColumn>],
    ) -> Result<Vec<String>> {
        self.ingredient_unique_values(column, criteria)
    }

    fn fetch_len(&self, criteria: &[Filter<IngredientColumn>]) -> Result<usize> {
        self.ingredient_count(criteria)
    }

    fn amounts(
        &self,
        criteria: &[Filter<IngredientColumn>],
    ) -> Result<Vec<(Option<f64>, Option<f64>)>> {
        self.ingredient_amounts(criteria)
    }

    fn recipe_titles(&self, ingkey: &str, item: &str) -> Result<Vec<String>> {
        self.recipe_titles_for(ingkey, item)
    }

    fn update_by_criteria(
        &self,
        criteria: &[Filter<IngredientColumn>],
        changes: &[(IngredientColumn, FilterValue)],
    ) -> Result<usize> {
        self.update_ingredients(criteria, changes)
    }
}
