// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use std::hash::Hash;
use time::OffsetDateTime;

use crate::ids::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "asc" => Some(Self::Asc),
            "desc" => Some(Self::Desc),
            _ => None,
        }
    }
}

/// A named column a view can filter or sort on.
///
/// Parsing is the only way user-supplied column names enter the system, so
/// views can reject unknown names before any query is issued.
pub trait Column: Copy + Eq + Hash + Debug + 'static {
    fn name(self) -> &'static str;
    fn from_name(value: &str) -> Option<Self>;
    /// Human-facing label, used in filter chips.
    fn label(self) -> &'static str;
    fn is_searchable(self) -> bool;
    fn is_sortable(self) -> bool;
    /// Pseudo-column matching any searchable field.
    fn is_anywhere(self) -> bool {
        false
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RecipeColumn {
    Anywhere,
    Title,
    Ingredient,
    IngKey,
    Item,
    Instructions,
    Notes,
    Category,
    Cuisine,
    Source,
    Link,
    Description,
    Rating,
    PrepTime,
    CookTime,
    Yields,
    LastModified,
    Deleted,
}

impl RecipeColumn {
    /// Search targets in the order a search-by picker lists them.
    pub const SEARCH_BY: [Self; 9] = [
        Self::Anywhere,
        Self::Title,
        Self::Ingredient,
        Self::Instructions,
        Self::Notes,
        Self::Category,
        Self::Cuisine,
        Self::Source,
        Self::Rating,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Anywhere => "anywhere",
            Self::Title => "title",
            Self::Ingredient => "ingredient",
            Self::IngKey => "ingkey",
            Self::Item => "item",
            Self::Instructions => "instructions",
            Self::Notes => "modifications",
            Self::Category => "category",
            Self::Cuisine => "cuisine",
            Self::Source => "source",
            Self::Link => "link",
            Self::Description => "description",
            Self::Rating => "rating",
            Self::PrepTime => "preptime",
            Self::CookTime => "cooktime",
            Self::Yields => "yields",
            Self::LastModified => "last_modified",
            Self::Deleted => "deleted",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "anywhere" => Some(Self::Anywhere),
            "title" => Some(Self::Title),
            "ingredient" => Some(Self::Ingredient),
            "ingkey" => Some(Self::IngKey),
            "item" => Some(Self::Item),
            "instructions" => Some(Self::Instructions),
            "modifications" | "notes" => Some(Self::Notes),
            "category" => Some(Self::Category),
            "cuisine" => Some(Self::Cuisine),
            "source" => Some(Self::Source),
            "link" => Some(Self::Link),
            "description" => Some(Self::Description),
            "rating" => Some(Self::Rating),
            "preptime" => Some(Self::PrepTime),
            "cooktime" => Some(Self::CookTime),
            "yields" => Some(Self::Yields),
            "last_modified" => Some(Self::LastModified),
            "deleted" => Some(Self::Deleted),
            _ => None,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Notes => "notes",
            Self::IngKey => "key",
            Self::PrepTime => "prep time",
            Self::CookTime => "cook time",
            Self::LastModified => "last modified",
            other => other.as_str(),
        }
    }
}

impl Column for RecipeColumn {
    fn name(self) -> &'static str {
        self.as_str()
    }

    fn from_name(value: &str) -> Option<Self> {
        Self::parse(value)
    }

    fn label(self) -> &'static str {
        RecipeColumn::label(self)
    }

    fn is_searchable(self) -> bool {
        !matches!(
            self,
            Self::PrepTime | Self::CookTime | Self::Yields | Self::LastModified | Self::Deleted
        )
    }

    fn is_sortable(self) -> bool {
        !matches!(
            self,
            Self::Anywhere
                | Self::Ingredient
                | Self::IngKey
                | Self::Item
                | Self::Instructions
                | Self::Notes
                | Self::Deleted
        )
    }

    fn is_anywhere(self) -> bool {
        self == Self::Anywhere
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IngredientColumn {
    IngKey,
    Item,
    Unit,
    Amount,
    RangeAmount,
    RecipeId,
    Deleted,
    Count,
}

impl IngredientColumn {
    pub const SEARCH_BY: [Self; 3] = [Self::IngKey, Self::Item, Self::Unit];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::IngKey => "ingkey",
            Self::Item => "item",
            Self::Unit => "unit",
            Self::Amount => "amount",
            Self::RangeAmount => "rangeamount",
            Self::RecipeId => "recipe_id",
            Self::Deleted => "deleted",
            Self::Count => "count",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "ingkey" | "key" => Some(Self::IngKey),
            "item" => Some(Self::Item),
            "unit" => Some(Self::Unit),
            "amount" => Some(Self::Amount),
            "rangeamount" => Some(Self::RangeAmount),
            "recipe_id" => Some(Self::RecipeId),
            "deleted" => Some(Self::Deleted),
            "count" => Some(Self::Count),
            _ => None,
        }
    }
}

impl Column for IngredientColumn {
    fn name(self) -> &'static str {
        self.as_str()
    }

    fn from_name(value: &str) -> Option<Self> {
        Self::parse(value)
    }

    fn label(self) -> &'static str {
        match self {
            Self::IngKey => "key",
            other => other.as_str(),
        }
    }

    fn is_searchable(self) -> bool {
        matches!(self, Self::IngKey | Self::Item | Self::Unit)
    }

    fn is_sortable(self) -> bool {
        matches!(self, Self::IngKey | Self::Count)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recipe {
    pub id: RecipeId,
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
    pub recipe_hash: String,
    pub deleted: bool,
    pub last_modified: OffsetDateTime,
}

impl Recipe {
    pub fn yields_label(&self) -> String {
        match self.yields {
            Some(yields) if self.yield_unit.is_empty() => crate::format_quantity(yields),
            Some(yields) => format!("{} {}", crate::format_quantity(yields), self.yield_unit),
            None => String::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ingredient {
    pub id: IngredientId,
    pub recipe_id: RecipeId,
    pub refid: Option<RecipeId>,
    pub unit: Option<String>,
    pub amount: Option<f64>,
    pub rangeamount: Option<f64>,
    pub item: String,
    pub ingkey: String,
    pub optional: bool,
    pub inggroup: Option<String>,
    pub position: i64,
    pub deleted: bool,
}

/// One root row of the key editor: an ingredient key and how many
/// ingredient lines use it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyCount {
    pub ingkey: String,
    pub count: usize,
}
