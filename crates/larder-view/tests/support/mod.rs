// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::Result;
use larder_app::{IngredientDraft, RecipeDraft};
use larder_db::Store;

pub fn empty_store() -> Result<Store> {
    let store = Store::open_memory()?;
    store.bootstrap()?;
    Ok(store)
}

pub fn recipe(title: &str, categories: &[&str], lines: Vec<IngredientDraft>) -> RecipeDraft {
    let mut draft = RecipeDraft::new(title);
    draft.categories = categories.iter().map(|c| (*c).to_owned()).collect();
    draft.ingredients = lines;
    draft
}
