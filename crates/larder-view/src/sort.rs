// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use larder_app::{Column, SortDirection, SortKey};

use crate::error::{ViewError, ViewResult};

/// Ordered sort keys, primary first.
#[derive(Debug, Clone, PartialEq)]
pub struct SortController<C> {
    keys: Vec<SortKey<C>>,
}

impl<C: Column> SortController<C> {
    pub fn new(keys: Vec<SortKey<C>>) -> ViewResult<Self> {
        validate(&keys)?;
        Ok(Self { keys })
    }

    pub fn keys(&self) -> &[SortKey<C>] {
        &self.keys
    }

    /// Cycles `column` through ascending, descending and unsorted. The
    /// other keys keep their priority.
    pub fn toggle(&mut self, column: C) -> ViewResult<bool> {
        validate(&[SortKey::asc(column)])?;
        if let Some(index) = self.keys.iter().position(|key| key.column == column) {
            match self.keys[index].direction {
                SortDirection::Asc => self.keys[index].direction = SortDirection::Desc,
                SortDirection::Desc => {
                    self.keys.remove(index);
                }
            }
        } else {
            self.keys.push(SortKey::asc(column));
        }
        Ok(true)
    }

    pub fn set(&mut self, keys: Vec<SortKey<C>>) -> ViewResult<bool> {
        validate(&keys)?;
        if keys == self.keys {
            return Ok(false);
        }
        self.keys = keys;
        Ok(true)
    }

    pub fn clear(&mut self) -> bool {
        let changed = !self.keys.is_empty();
        self.keys.clear();
        changed
    }

    /// The keys by column name, as carried by sort events.
    pub fn spec(&self) -> Vec<SortKey<String>> {
        self.keys
            .iter()
            .map(|key| SortKey {
                column: key.column.name().to_owned(),
                direction: key.direction,
            })
            .collect()
    }
}

fn validate<C: Column>(keys: &[SortKey<C>]) -> ViewResult<()> {
    for (index, key) in keys.iter().enumerate() {
        if !key.column.is_sortable() {
            return Err(ViewError::InvalidSpec(format!(
                "cannot sort by {}",
                key.column.name()
            )));
        }
        if keys[..index].iter().any(|prior| prior.column == key.column) {
            return Err(ViewError::InvalidSpec(format!(
                "sort lists {} twice",
                key.column.name()
            )));
        }
    }
    Ok(())
}

/// Parses `"column"` (ascending) or `"-column"` (descending).
pub fn parse_sort_key<C: Column>(spec: &str) -> ViewResult<SortKey<C>> {
    let (name, direction) = match spec.trim().strip_prefix('-') {
        Some(name) => (name, SortDirection::Desc),
        None => (spec.trim(), SortDirection::Asc),
    };
    let column = C::from_name(name)
        .ok_or_else(|| ViewError::InvalidSpec(format!("unknown sort column {name:?}")))?;
    validate(&[SortKey::asc(column)])?;
    Ok(SortKey { column, direction })
}

#[cfg(test)]
mod tests {
    use super::{SortController, parse_sort_key};
    use crate::error::ViewError;
    use larder_app::{IngredientColumn, RecipeColumn, SortDirection, SortKey};

    #[test]
    fn toggle_cycles_and_keeps_priority() {
        let mut sort = SortController::new(vec![SortKey::asc(RecipeColumn::Title)])
            .expect("valid sort");
        sort.toggle(RecipeColumn::Rating).expect("sortable");
        assert_eq!(
            sort.keys(),
            &[
                SortKey::asc(RecipeColumn::Title),
                SortKey::asc(RecipeColumn::Rating)
            ]
        );

        sort.toggle(RecipeColumn::Title).expect("sortable");
        assert_eq!(sort.keys()[0], SortKey::desc(RecipeColumn::Title));

        sort.toggle(RecipeColumn::Title).expect("sortable");
        assert_eq!(sort.keys(), &[SortKey::asc(RecipeColumn::Rating)]);
    }

    #[test]
    fn search_only_columns_are_rejected() {
        let mut sort = SortController::new(Vec::new()).expect("empty sort");
        assert!(matches!(
            sort.toggle(RecipeColumn::Anywhere),
            Err(ViewError::InvalidSpec(_))
        ));
        assert!(
            SortController::new(vec![SortKey::asc(IngredientColumn::Unit)]).is_err()
        );
        assert!(
            SortController::new(vec![
                SortKey::asc(RecipeColumn::Title),
                SortKey::desc(RecipeColumn::Title)
            ])
            .is_err()
        );
    }

    #[test]
    fn set_and_clear_report_changes() {
        let mut sort = SortController::new(Vec::new()).expect("empty sort");
        assert!(!sort.clear());
        assert!(sort.set(vec![SortKey::desc(IngredientColumn::Count)]).expect("valid"));
        assert!(!sort.set(vec![SortKey::desc(IngredientColumn::Count)]).expect("valid"));
        assert_eq!(sort.spec()[0].column, "count");
        assert!(sort.clear());
    }

    #[test]
    fn parse_sort_key_reads_direction_prefix() {
        let key = parse_sort_key::<RecipeColumn>("-rating").expect("valid key");
        assert_eq!(key.column, RecipeColumn::Rating);
        assert_eq!(key.direction, SortDirection::Desc);
        assert_eq!(
            parse_sort_key::<RecipeColumn>("title").expect("valid key"),
            SortKey::asc(RecipeColumn::Title)
        );
        assert!(parse_sort_key::<RecipeColumn>("colour").is_err());
        assert!(parse_sort_key::<RecipeColumn>("-anywhere").is_err());
    }
}
