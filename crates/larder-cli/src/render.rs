// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use std::fmt::{self, Write as _};

use larder_view::{IngredientStore, KeyIndex, RecipeIndex, RecipeStore, Row, TreeSource};

const TITLE_WIDTH: usize = 32;

/// One line per recipe on the current page, then the status line.
pub fn recipe_page<St: RecipeStore>(index: &RecipeIndex<St>) -> Result<String, fmt::Error> {
    let mut out = String::new();
    write_recipe_page(&mut out, index)?;
    Ok(out)
}

/// The key page as an indented outline of every expanded node.
pub fn key_page<St: IngredientStore>(index: &KeyIndex<St>) -> Result<String, fmt::Error> {
    let mut out = String::new();
    write_key_page(&mut out, index)?;
    Ok(out)
}

fn write_recipe_page<St: RecipeStore>(
    out: &mut impl fmt::Write,
    index: &RecipeIndex<St>,
) -> fmt::Result {
    for row in index.view().rows() {
        writeln!(
            out,
            "{:>5}  {:<width$}  {:<16}  {}",
            row.int("id").unwrap_or_default(),
            clip(row.text("title"), TITLE_WIDTH),
            row.text("category"),
            rating(row),
            width = TITLE_WIDTH,
        )?;
    }
    write!(out, "{}", index.status_text())?;
    let filters = index.limit_label();
    if !filters.is_empty() {
        write!(out, " [{filters}]")?;
    }
    writeln!(out)
}

fn write_key_page<St: IngredientStore>(
    out: &mut impl fmt::Write,
    index: &KeyIndex<St>,
) -> fmt::Result {
    for node in index.tree().visible_rows() {
        let indent = "  ".repeat(node.path.depth().saturating_sub(1));
        let marker = if node.expanded {
            '-'
        } else if index.tree().source().is_expandable(&node.row) {
            '+'
        } else {
            ' '
        };
        let value = if node.row.flag("placeholder") {
            "(none)"
        } else {
            node.row.text("value")
        };
        write!(
            out,
            "{indent}{marker} {value} ({})",
            node.row.int("count").unwrap_or_default()
        )?;
        let recipes = node.row.text("recipes");
        if !recipes.is_empty() {
            write!(out, "  {recipes}")?;
        }
        writeln!(out)?;
    }
    writeln!(out, "{}", index.status_text())
}

fn rating(row: &Row) -> String {
    row.int("rating")
        .map(|rating| format!("{rating}/10"))
        .unwrap_or_default()
}

fn clip(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        return text.to_owned();
    }
    let mut clipped = text.chars().take(width - 1).collect::<String>();
    clipped.push('~');
    clipped
}

#[cfg(test)]
mod tests {
    use super::{clip, key_page, recipe_page};
    use anyhow::Result;
    use larder_app::{IngredientDraft, RecipeColumn, RecipeDraft};
    use larder_db::Store;
    use larder_view::{KeyIndex, RecipeIndex, TreePath, ViewConfig};
    use std::rc::Rc;

    fn store() -> Result<Store> {
        let store = Store::open_memory()?;
        store.bootstrap()?;
        let mut bread = RecipeDraft::new("Country Loaf");
        bread.categories = vec!["Bread".to_owned()];
        bread.rating = Some(9);
        bread.ingredients = vec![
            IngredientDraft::new("flour", "all-purpose").amount(3.0).unit("cup"),
            IngredientDraft::new("flour", "whole wheat"),
        ];
        store.create_recipe(&bread)?;
        store.create_recipe(&RecipeDraft::new("Plain Rice"))?;
        Ok(store)
    }

    #[test]
    fn recipe_page_lists_rows_and_filters() -> Result<()> {
        let mut index = RecipeIndex::new(Rc::new(store()?), &ViewConfig::default())?;
        let page = recipe_page(&index)?;
        assert!(page.contains("Country Loaf"));
        assert!(page.contains("9/10"));
        assert!(page.ends_with("2 recipes\n"));

        index.search("loaf", RecipeColumn::Title, false)?;
        index.limit();
        let page = recipe_page(&index)?;
        assert!(page.ends_with("1 recipes [loaf in title]\n"), "got {page}");
        Ok(())
    }

    #[test]
    fn key_page_indents_expanded_levels() -> Result<()> {
        let mut index = KeyIndex::new(Rc::new(store()?), &ViewConfig::default())?;
        let flour = TreePath::root(0);
        index.tree_mut().expand(&flour)?;
        index.tree_mut().expand(&flour.child(1))?;
        let page = key_page(&index)?;
        let lines = page.lines().collect::<Vec<_>>();
        assert_eq!(lines[0], "- flour (2)");
        assert_eq!(lines[1], "  + all-purpose (1)  Country Loaf");
        assert_eq!(lines[2], "  - whole wheat (1)  Country Loaf");
        assert_eq!(lines[3], "    + (none) (1)");
        assert_eq!(lines[4], "1 keys");
        Ok(())
    }

    #[test]
    fn long_titles_are_clipped() {
        assert_eq!(clip("Soup", 8), "Soup");
        assert_eq!(clip("Slow-Cooked Stew", 8), "Slow-Co~");
    }
}
