// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result};
use larder_app::{IngredientDraft, MAX_RATING, RecipeDraft};
use std::path::PathBuf;

const CUISINES: [&str; 10] = [
    "Italian",
    "Mexican",
    "Indian",
    "Thai",
    "French",
    "Japanese",
    "Greek",
    "Moroccan",
    "American",
    "Korean",
];

const CATEGORIES: [&str; 9] = [
    "Breakfast",
    "Soup",
    "Salad",
    "Main",
    "Side",
    "Dessert",
    "Bread",
    "Snack",
    "Drink",
];

const DISH_STYLES: [&str; 12] = [
    "Roasted",
    "Braised",
    "Grilled",
    "Spicy",
    "Creamy",
    "Smoky",
    "Lemony",
    "Crispy",
    "Slow-Cooked",
    "Herbed",
    "Garlicky",
    "Stuffed",
];

const DISH_FORMS: [&str; 10] = [
    "Soup", "Stew", "Salad", "Tart", "Curry", "Pasta", "Tacos", "Bowl", "Bake", "Skillet",
];

const SOURCES: [&str; 6] = [
    "Grandma's card box",
    "Sunday paper",
    "Family cookbook",
    "Cooking class",
    "Neighbor",
    "",
];

/// Pantry entries: key, item spellings, units.
const PANTRY: [(&str, &[&str], &[&str]); 16] = [
    ("flour", &["all-purpose flour", "flour"], &["cup", "g"]),
    ("sugar", &["sugar", "brown sugar"], &["cup", "tbsp"]),
    ("salt", &["salt", "kosher salt"], &["tsp", "pinch"]),
    ("butter", &["butter", "unsalted butter"], &["tbsp", "cup"]),
    ("egg", &["egg", "large egg"], &[""]),
    ("onion", &["onion", "yellow onion", "red onion"], &["", "cup"]),
    ("garlic", &["garlic", "garlic clove"], &["clove", "tsp"]),
    ("tomato", &["tomato", "cherry tomatoes"], &["", "cup", "can"]),
    ("basil", &["basil", "fresh basil"], &["tbsp", "cup"]),
    ("olive oil", &["olive oil", "extra-virgin olive oil"], &["tbsp", "cup"]),
    ("milk", &["milk", "whole milk"], &["cup", "ml"]),
    ("rice", &["rice", "jasmine rice"], &["cup"]),
    ("chicken", &["chicken thighs", "chicken breast"], &["lb", "g"]),
    ("lemon", &["lemon", "lemon juice"], &["", "tbsp"]),
    ("pepper", &["black pepper", "pepper"], &["tsp", "pinch"]),
    ("cumin", &["cumin", "ground cumin"], &["tsp"]),
];

const AMOUNTS: [f64; 9] = [0.25, 0.5, 1.0, 1.5, 2.0, 3.0, 0.75, 1.0 / 3.0, 4.0];

#[derive(Debug, Clone)]
struct DeterministicRng {
    state: u64,
}

impl DeterministicRng {
    fn new(seed: u64) -> Self {
        let mut state = seed ^ 0x9E37_79B9_7F4A_7C15;
        if state == 0 {
            state = 0xA409_3822_299F_31D0;
        }
        Self { state }
    }

    fn next_u64(&mut self) -> u64 {
        self.state = self
            .state
            .wrapping_mul(6_364_136_223_846_793_005)
            .wrapping_add(1_442_695_040_888_963_407);

        let mut x = self.state;
        x ^= x >> 13;
        x ^= x << 7;
        x ^= x >> 17;
        x
    }

    fn int_n(&mut self, n: usize) -> usize {
        if n <= 1 {
            return 0;
        }
        (self.next_u64() % (n as u64)) as usize
    }

    fn bool(&mut self) -> bool {
        (self.next_u64() & 1) == 1
    }
}

/// Seeded generator of plausible recipes. The same seed always yields the
/// same sequence.
#[derive(Debug, Clone)]
pub struct RecipeFaker {
    rng: DeterministicRng,
    seed: u64,
}

impl RecipeFaker {
    pub fn new(seed: u64) -> Self {
        let normalized = if seed == 0 { 1 } else { seed };
        Self {
            rng: DeterministicRng::new(normalized),
            seed: normalized,
        }
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn int_n(&mut self, n: usize) -> usize {
        self.rng.int_n(n)
    }

    pub fn recipe(&mut self) -> RecipeDraft {
        let form = self.pick(&DISH_FORMS);
        let mut draft = RecipeDraft::new(format!("{} {form}", self.pick(&DISH_STYLES)));
        draft.cuisine = self.pick(&CUISINES).to_owned();
        draft.source = self.pick(&SOURCES).to_owned();
        draft.description = self.sentence(4, 9);
        draft.instructions = (0..self.int_range(2, 4))
            .map(|_| self.sentence(5, 12))
            .collect::<Vec<_>>()
            .join("\n");
        if self.rng.bool() {
            draft.rating = Some(self.int_range(1, MAX_RATING));
        }
        draft.preptime = Some(self.int_range(1, 6) * 300);
        if self.rng.bool() {
            draft.cooktime = Some(self.int_range(1, 12) * 600);
        }
        draft.yields = Some(self.int_range(2, 8) as f64);
        draft.yield_unit = "servings".to_owned();

        let category = if form == "Soup" || form == "Stew" {
            "Soup"
        } else {
            self.pick(&CATEGORIES)
        };
        draft.categories.push(category.to_owned());
        if self.int_n(4) == 0 {
            let extra = self.pick(&CATEGORIES);
            if extra != category {
                draft.categories.push(extra.to_owned());
            }
        }

        let count = self.int_range(3, 7) as usize;
        let mut used = Vec::with_capacity(count);
        while draft.ingredients.len() < count {
            let index = self.int_n(PANTRY.len());
            if used.contains(&index) {
                continue;
            }
            used.push(index);
            draft.ingredients.push(self.ingredient_from(index));
        }
        draft
    }

    pub fn ingredient(&mut self) -> IngredientDraft {
        let index = self.int_n(PANTRY.len());
        self.ingredient_from(index)
    }

    pub fn recipes(&mut self, count: usize) -> Vec<RecipeDraft> {
        (0..count).map(|_| self.recipe()).collect()
    }

    fn ingredient_from(&mut self, index: usize) -> IngredientDraft {
        let (key, items, units) = PANTRY[index];
        let mut line = IngredientDraft::new(key, self.pick(items));
        let unit = self.pick(units);
        if !unit.is_empty() {
            line = line.unit(unit);
        }
        let amount = AMOUNTS[self.rng.int_n(AMOUNTS.len())];
        if self.int_n(6) == 0 {
            line = line.range(amount, amount + 1.0);
        } else {
            line = line.amount(amount);
        }
        line.optional = self.int_n(10) == 0;
        line
    }

    fn pick<'a>(&mut self, items: &'a [&'a str]) -> &'a str {
        items[self.rng.int_n(items.len())]
    }

    fn int_range(&mut self, min: i64, max: i64) -> i64 {
        if max <= min {
            return min;
        }
        let span = max - min + 1;
        min + (self.rng.next_u64() % (span as u64)) as i64
    }

    fn sentence(&mut self, min_words: usize, max_words: usize) -> String {
        const WORDS: [&str; 24] = [
            "stir", "simmer", "whisk", "fold", "season", "taste", "chop", "dice", "toast", "bake",
            "roast", "rest", "slice", "serve", "warm", "gently", "until", "golden", "tender",
            "fragrant", "covered", "minutes", "pan", "bowl",
        ];

        let count = self.int_range(min_words as i64, max_words as i64) as usize;
        let mut parts = Vec::with_capacity(count);
        for _ in 0..count {
            parts.push(self.pick(&WORDS).to_owned());
        }
        let mut sentence = parts.join(" ");
        if let Some(first) = sentence.get_mut(0..1) {
            first.make_ascii_uppercase();
        }
        sentence.push('.');
        sentence
    }
}

pub fn temp_db_path() -> Result<(tempfile::TempDir, PathBuf)> {
    let dir = tempfile::tempdir().context("create temp dir")?;
    let db_path = dir.path().join("larder.db");
    Ok((dir, db_path))
}

pub fn cuisines() -> &'static [&'static str] {
    &CUISINES
}

pub fn categories() -> &'static [&'static str] {
    &CATEGORIES
}

pub fn pantry_keys() -> Vec<&'static str> {
    PANTRY.iter().map(|(key, _, _)| *key).collect()
}
