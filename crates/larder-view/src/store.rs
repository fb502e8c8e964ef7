// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::Result;
use larder_app::{
    Filter, FilterValue, IngredientColumn, KeyCount, Recipe, RecipeColumn, RecipeId, SortKey,
    ViewDescriptor,
};

/// Recipe queries the views need. Implementations may block on I/O.
pub trait RecipeStore {
    fn search(&self, descriptor: &ViewDescriptor<RecipeColumn>) -> Result<Vec<Recipe>>;
    fn count(&self, filters: &[Filter<RecipeColumn>]) -> Result<usize>;
    fn fetch_one(&self, id: RecipeId) -> Result<Option<Recipe>>;
    fn fetch_all(&self, filters: &[Filter<RecipeColumn>]) -> Result<Vec<Recipe>>;
    fn categories(&self, id: RecipeId) -> Result<Vec<String>>;
    fn unique_values(&self, column: RecipeColumn) -> Result<Vec<String>>;
    fn soft_delete(&self, id: RecipeId) -> Result<()>;
}

/// Ingredient-line queries behind the key tree.
///
/// Every method takes equality or pattern criteria over ingredient lines;
/// a `Null` equality value matches a missing field.
pub trait IngredientStore {
    fn ingkeys_with_count(
        &self,
        filters: &[Filter<IngredientColumn>],
        sort_by: &[SortKey<IngredientColumn>],
    ) -> Result<Vec<KeyCount>>;
    fn unique_values(
        &self,
        column: IngredientColumn,
        criteria: &[Filter<IngredientColumn>],
    ) -> Result<Vec<String>>;
    fn fetch_len(&self, criteria: &[Filter<IngredientColumn>]) -> Result<usize>;
    fn amounts(
        &self,
        criteria: &[Filter<IngredientColumn>],
    ) -> Result<Vec<(Option<f64>, Option<f64>)>>;
    fn recipe_titles(&self, ingkey: &str, item: &str) -> Result<Vec<String>>;
    fn update_by_criteria(
        &self,
        criteria: &[Filter<IngredientColumn>],
        changes: &[(IngredientColumn, FilterValue)],
    ) -> Result<usize>;
}
