// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Result, bail};

pub const MAX_RATING: i64 = 10;

/// A recipe to be written to the store, with its categories and
/// ingredient lines.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecipeDraft {
    pub title: String,
    pub instructions: String,
    pub modifications: String,
    pub cuisine: String,
    pub rating: Option<i64>,
    pub description: String,
    pub source: String,
    pub link: String,
    pub preptime: Option<i64>,
    pub cooktime: Option<i64>,
    pub yields: Option<f64>,
    pub yield_unit: String,
    pub categories: Vec<String>,
    pub ingredients: Vec<IngredientDraft>,
}

impl RecipeDraft {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.title.trim().is_empty() {
            bail!("recipe title is required -- enter a title and retry");
        }
        if let Some(rating) = self.rating
            && !(0..=MAX_RATING).contains(&rating)
        {
            bail!("recipe rating must be between 0 and {MAX_RATING}, got {rating}");
        }
        for (label, seconds) in [("prep time", self.preptime), ("cook time", self.cooktime)] {
            if let Some(seconds) = seconds
                && seconds < 0
            {
                bail!("recipe {label} cannot be negative");
            }
        }
        if let Some(yields) = self.yields
            && yields <= 0.0
        {
            bail!("recipe yield must be positive");
        }
        for category in &self.categories {
            if category.trim().is_empty() {
                bail!("recipe categories cannot be blank");
            }
        }
        for ingredient in &self.ingredients {
            ingredient.validate()?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct IngredientDraft {
    pub item: String,
    pub ingkey: String,
    pub unit: Option<String>,
    pub amount: Option<f64>,
    pub rangeamount: Option<f64>,
    pub optional: bool,
    pub inggroup: Option<String>,
}

impl IngredientDraft {
    pub fn new(ingkey: impl Into<String>, item: impl Into<String>) -> Self {
        Self {
            ingkey: ingkey.into(),
            item: item.into(),
            ..Self::default()
        }
    }

    pub fn amount(mut self, amount: f64) -> Self {
        self.amount = Some(amount);
        self
    }

    pub fn range(mut self, low: f64, high: f64) -> Self {
        self.amount = Some(low);
        self.rangeamount = Some(high);
        self
    }

    pub fn unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = Some(unit.into());
        self
    }

    /// The key a line is grouped under; falls back to the lower-cased item.
    pub fn key(&self) -> String {
        let key = self.ingkey.trim();
        if key.is_empty() {
            self.item.trim().to_lowercase()
        } else {
            key.to_owned()
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.item.trim().is_empty() && self.ingkey.trim().is_empty() {
            bail!("ingredient needs an item or a key -- enter one and retry");
        }
        if let Some(amount) = self.amount
            && amount < 0.0
        {
            bail!("ingredient amount cannot be negative");
        }
        if let (Some(low), Some(high)) = (self.amount, self.rangeamount)
            && high < low
        {
            bail!("ingredient range must go from low to high");
        }
        Ok(())
    }
}
