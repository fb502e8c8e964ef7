// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

mod sql;

use anyhow::{Context, Result, anyhow, bail};
use larder_app::{
    Filter, FilterValue, Ingredient, IngredientColumn, IngredientDraft, IngredientId, KeyCount,
    Recipe, RecipeColumn, RecipeDraft, RecipeId, SortKey, ViewDescriptor,
};
use regex::Regex;
use rusqlite::functions::FunctionFlags;
use rusqlite::types::ValueRef;
use rusqlite::{Connection, OptionalExtension, params, params_from_iter};
use sha2::{Digest, Sha256};
use sql::WhereClause;
use std::collections::BTreeSet;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::{OffsetDateTime, PrimitiveDateTime};
use tracing::{debug, info};

pub const APP_NAME: &str = "larder";

type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

const REQUIRED_SCHEMA: &[(&str, &[&str])] = &[
    (
        "recipes",
        &[
            "id",
            "title",
            "instructions",
            "modifications",
            "cuisine",
            "rating",
            "description",
            "source",
            "link",
            "preptime",
            "cooktime",
            "yields",
            "yield_unit",
            "recipe_hash",
            "deleted",
            "last_modified",
        ],
    ),
    ("categories", &["id", "recipe_id", "category"]),
    (
        "ingredients",
        &[
            "id",
            "recipe_id",
            "refid",
            "unit",
            "amount",
            "rangeamount",
            "item",
            "ingkey",
            "optional",
            "inggroup",
            "position",
            "deleted",
        ],
    ),
];

struct RequiredIndex {
    name: &'static str,
    create_sql: &'static str,
}

const REQUIRED_INDEXES: &[RequiredIndex] = &[
    RequiredIndex {
        name: "idx_recipes_deleted",
        create_sql: "CREATE INDEX IF NOT EXISTS idx_recipes_deleted ON recipes (deleted);",
    },
    RequiredIndex {
        name: "idx_categories_recipe_id",
        create_sql: "CREATE INDEX IF NOT EXISTS idx_categories_recipe_id ON categories (recipe_id);",
    },
    RequiredIndex {
        name: "idx_ingredients_recipe_id",
        create_sql: "CREATE INDEX IF NOT EXISTS idx_ingredients_recipe_id ON ingredients (recipe_id);",
    },
    RequiredIndex {
        name: "idx_ingredients_ingkey_item",
        create_sql: "CREATE INDEX IF NOT EXISTS idx_ingredients_ingkey_item ON ingredients (ingkey, item);",
    },
];

const RECIPE_SELECT: &str = "
    SELECT
      r.id, r.title, r.instructions, r.modifications, r.cuisine,
      r.rating, r.description, r.source, r.link, r.preptime,
      r.cooktime, r.yields, r.yield_unit, r.recipe_hash, r.deleted,
      r.last_modified
    FROM recipes r
";

/// Ingredient columns an edit may rewrite.
const WRITABLE_INGREDIENT_COLUMNS: [IngredientColumn; 6] = [
    IngredientColumn::IngKey,
    IngredientColumn::Item,
    IngredientColumn::Unit,
    IngredientColumn::Amount,
    IngredientColumn::RangeAmount,
    IngredientColumn::Deleted,
];

pub struct Store {
    conn: Connection,
}

impl Store {
    pub fn open(path: &Path) -> Result<Self> {
        let printable = path.to_string_lossy().to_string();
        validate_db_path(&printable)?;
        let conn = Connection::open(path)
            .with_context(|| format!("open database at {}", path.display()))?;
        configure_connection(&conn)?;
        Ok(Self { conn })
    }

    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("open in-memory database")?;
        configure_connection(&conn)?;
        Ok(Self { conn })
    }

    pub fn raw_connection(&self) -> &Connection {
        &self.conn
    }

    pub fn bootstrap(&self) -> Result<()> {
        if has_user_tables(&self.conn)? {
            validate_schema(&self.conn)?;
        } else {
            self.conn
                .execute_batch(include_str!("sql/schema.sql"))
                .context("create schema")?;
        }

        ensure_required_indexes(&self.conn)
    }

    pub fn create_recipe(&self, draft: &RecipeDraft) -> Result<RecipeId> {
        draft.validate()?;
        let now = now_rfc3339()?;
        let tx = self
            .conn
            .unchecked_transaction()
            .context("begin recipe insert")?;
        tx.execute(
            "
            INSERT INTO recipes (
              title, instructions, modifications, cuisine, rating,
              description, source, link, preptime, cooktime,
              yields, yield_unit, recipe_hash, deleted, last_modified
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, 0, ?)
            ",
            params![
                draft.title.trim(),
                draft.instructions,
                draft.modifications,
                draft.cuisine,
                draft.rating,
                draft.description,
                draft.source,
                draft.link,
                draft.preptime,
                draft.cooktime,
                draft.yields,
                draft.yield_unit,
                recipe_hash(draft),
                now,
            ],
        )
        .context("insert recipe")?;
        let recipe_id = RecipeId::new(tx.last_insert_rowid());

        insert_categories(&tx, recipe_id, &draft.categories)?;
        insert_ingredients(&tx, recipe_id, &draft.ingredients)?;
        tx.commit().context("commit recipe insert")?;

        info!(recipe_id = recipe_id.get(), "created recipe");
        Ok(recipe_id)
    }

    /// Rewrites a recipe and replaces its categories and ingredient lines.
    pub fn update_recipe(&self, recipe_id: RecipeId, draft: &RecipeDraft) -> Result<()> {
        draft.validate()?;
        let now = now_rfc3339()?;
        let tx = self
            .conn
            .unchecked_transaction()
            .context("begin recipe update")?;
        let rows_affected = tx
            .execute(
                "
                UPDATE recipes
                SET
                  title = ?,
                  instructions = ?,
                  modifications = ?,
                  cuisine = ?,
                  rating = ?,
                  description = ?,
                  source = ?,
                  link = ?,
                  preptime = ?,
                  cooktime = ?,
                  yields = ?,
                  yield_unit = ?,
                  recipe_hash = ?,
                  last_modified = ?
                WHERE id = ? AND deleted = 0
                ",
                params![
                    draft.title.trim(),
                    draft.instructions,
                    draft.modifications,
                    draft.cuisine,
                    draft.rating,
                    draft.description,
                    draft.source,
                    draft.link,
                    draft.preptime,
                    draft.cooktime,
                    draft.yields,
                    draft.yield_unit,
                    recipe_hash(draft),
                    now,
                    recipe_id.get(),
                ],
            )
            .context("update recipe")?;
        if rows_affected == 0 {
            bail!(
                "recipe {} not found or deleted -- choose an existing recipe and retry",
                recipe_id.get()
            );
        }

        tx.execute(
            "DELETE FROM categories WHERE recipe_id = ?",
            params![recipe_id.get()],
        )
        .context("clear recipe categories")?;
        tx.execute(
            "DELETE FROM ingredients WHERE recipe_id = ?",
            params![recipe_id.get()],
        )
        .context("clear recipe ingredients")?;
        insert_categories(&tx, recipe_id, &draft.categories)?;
        insert_ingredients(&tx, recipe_id, &draft.ingredients)?;
        tx.commit().context("commit recipe update")?;

        info!(recipe_id = recipe_id.get(), "updated recipe");
        Ok(())
    }

    pub fn get_recipe(&self, recipe_id: RecipeId) -> Result<Option<Recipe>> {
        self.conn
            .query_row(
                &format!("{RECIPE_SELECT} WHERE r.id = ?"),
                params![recipe_id.get()],
                recipe_from_row,
            )
            .optional()
            .with_context(|| format!("load recipe {}", recipe_id.get()))
    }

    pub fn search_recipes(&self, descriptor: &ViewDescriptor<RecipeColumn>) -> Result<Vec<Recipe>> {
        let mut filter = WhereClause::default();
        for criterion in descriptor.filters() {
            filter.push_recipe_filter(criterion)?;
        }
        let order_by = sql::recipe_order_by(descriptor.sort_by())?;
        debug!(
            filters = descriptor.filters().len(),
            sort_keys = descriptor.sort_by().len(),
            "search recipes"
        );

        let query = format!("{RECIPE_SELECT} {} {order_by}", filter.sql());
        let mut stmt = self
            .conn
            .prepare(&query)
            .context("prepare recipe search")?;
        let rows = stmt
            .query_map(params_from_iter(filter.params()), recipe_from_row)
            .context("query recipes")?;
        rows.collect::<rusqlite::Result<Vec<_>>>()
            .context("collect recipes")
    }

    pub fn fetch_recipes(&self, filters: &[Filter<RecipeColumn>]) -> Result<Vec<Recipe>> {
        self.search_recipes(&ViewDescriptor::new(filters.to_vec(), Vec::new()))
    }

    pub fn count_recipes(&self, filters: &[Filter<RecipeColumn>]) -> Result<usize> {
        let mut filter = WhereClause::default();
        for criterion in filters {
            filter.push_recipe_filter(criterion)?;
        }
        let count: i64 = self
            .conn
            .query_row(
                &format!("SELECT COUNT(*) FROM recipes r {}", filter.sql()),
                params_from_iter(filter.params()),
                |row| row.get(0),
            )
            .context("count recipes")?;
        usize::try_from(count).context("recipe count out of range")
    }

    pub fn recipe_categories(&self, recipe_id: RecipeId) -> Result<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT category FROM categories WHERE recipe_id = ? ORDER BY id ASC")
            .context("prepare categories query")?;
        let rows = stmt
            .query_map(params![recipe_id.get()], |row| row.get::<_, String>(0))
            .context("query categories")?;
        rows.collect::<rusqlite::Result<Vec<_>>>()
            .context("collect categories")
    }

    /// Distinct, non-empty values of a text column across live recipes.
    pub fn recipe_unique_values(&self, column: RecipeColumn) -> Result<Vec<String>> {
        let query = match column {
            RecipeColumn::Category => "
                SELECT DISTINCT c.category
                FROM categories c
                JOIN recipes r ON r.id = c.recipe_id
                WHERE r.deleted = 0
                ORDER BY lower(c.category) ASC
                "
            .to_owned(),
            RecipeColumn::Title
            | RecipeColumn::Cuisine
            | RecipeColumn::Source
            | RecipeColumn::Link
            | RecipeColumn::Description => {
                let name = column.as_str();
                format!(
                    "
                    SELECT DISTINCT r.{name}
                    FROM recipes r
                    WHERE r.deleted = 0 AND r.{name} IS NOT NULL AND r.{name} <> ''
                    ORDER BY lower(r.{name}) ASC
                    "
                )
            }
            other => bail!(
                "{} has no distinct text values; use a text column",
                other.as_str()
            ),
        };
        let mut stmt = self
            .conn
            .prepare(&query)
            .context("prepare unique values query")?;
        let rows = stmt
            .query_map([], |row| row.get::<_, String>(0))
            .context("query unique values")?;
        rows.collect::<rusqlite::Result<Vec<_>>>()
            .context("collect unique values")
    }

    pub fn soft_delete_recipe(&self, recipe_id: RecipeId) -> Result<()> {
        self.set_recipe_deleted(recipe_id, true)
    }

    pub fn restore_recipe(&self, recipe_id: RecipeId) -> Result<()> {
        self.set_recipe_deleted(recipe_id, false)
    }

    fn set_recipe_deleted(&self, recipe_id: RecipeId, deleted: bool) -> Result<()> {
        let now = now_rfc3339()?;
        let rows_affected = self
            .conn
            .execute(
                "UPDATE recipes SET deleted = ?, last_modified = ? WHERE id = ?",
                params![deleted, now, recipe_id.get()],
            )
            .with_context(|| format!("mark recipe {} deleted={deleted}", recipe_id.get()))?;
        if rows_affected == 0 {
            bail!("recipe {} no longer exists", recipe_id.get());
        }
        info!(recipe_id = recipe_id.get(), deleted, "changed recipe lifecycle");
        Ok(())
    }

    pub fn list_ingredients(&self, recipe_id: RecipeId) -> Result<Vec<Ingredient>> {
        let mut stmt = self
            .conn
            .prepare(
                "
                SELECT
                  id, recipe_id, refid, unit, amount, rangeamount, item,
                  ingkey, optional, inggroup, position, deleted
                FROM ingredients
                WHERE recipe_id = ? AND deleted = 0
                ORDER BY position ASC, id ASC
                ",
            )
            .context("prepare ingredients query")?;
        let rows = stmt
            .query_map(params![recipe_id.get()], |row| {
                Ok(Ingredient {
                    id: IngredientId::new(row.get(0)?),
                    recipe_id: RecipeId::new(row.get(1)?),
                    refid: row.get::<_, Option<i64>>(2)?.map(RecipeId::new),
                    unit: row.get(3)?,
                    amount: row.get(4)?,
                    rangeamount: row.get(5)?,
                    item: text_column(row, 6)?,
                    ingkey: text_column(row, 7)?,
                    optional: row.get(8)?,
                    inggroup: row.get(9)?,
                    position: row.get(10)?,
                    deleted: row.get(11)?,
                })
            })
            .context("query ingredients")?;
        rows.collect::<rusqlite::Result<Vec<_>>>()
            .context("collect ingredients")
    }

    /// Ingredient keys matching `filters`, each with the number of matching
    /// ingredient lines.
    pub fn ingkeys_with_count(
        &self,
        filters: &[Filter<IngredientColumn>],
        sort_by: &[SortKey<IngredientColumn>],
    ) -> Result<Vec<KeyCount>> {
        let mut filter = WhereClause::default();
        filter.push_ingredient_filters(filters)?;
        filter.push_raw("i.ingkey IS NOT NULL AND i.ingkey <> ''");
        let order_by = sql::key_order_by(sort_by)?;

        let query = format!(
            "SELECT i.ingkey, COUNT(*) FROM ingredients i {} GROUP BY i.ingkey {order_by}",
            filter.sql()
        );
        let mut stmt = self
            .conn
            .prepare(&query)
            .context("prepare ingredient key query")?;
        let rows = stmt
            .query_map(params_from_iter(filter.params()), |row| {
                let count: i64 = row.get(1)?;
                Ok(KeyCount {
                    ingkey: row.get(0)?,
                    count: usize::try_from(count).unwrap_or_default(),
                })
            })
            .context("query ingredient keys")?;
        rows.collect::<rusqlite::Result<Vec<_>>>()
            .context("collect ingredient keys")
    }

    /// Distinct, non-empty values of `column` among ingredient lines
    /// matching `criteria`.
    pub fn ingredient_unique_values(
        &self,
        column: IngredientColumn,
        criteria: &[Filter<IngredientColumn>],
    ) -> Result<Vec<String>> {
        if !matches!(
            column,
            IngredientColumn::IngKey | IngredientColumn::Item | IngredientColumn::Unit
        ) {
            bail!(
                "{} has no distinct text values; use ingkey, item or unit",
                column.as_str()
            );
        }
        let name = column.as_str();
        let mut filter = WhereClause::default();
        filter.push_ingredient_filters(criteria)?;
        filter.push_raw(&format!("i.{name} IS NOT NULL AND i.{name} <> ''"));

        let query = format!(
            "SELECT DISTINCT i.{name} FROM ingredients i {} ORDER BY lower(i.{name}) ASC",
            filter.sql()
        );
        let mut stmt = self
            .conn
            .prepare(&query)
            .context("prepare ingredient values query")?;
        let rows = stmt
            .query_map(params_from_iter(filter.params()), |row| {
                row.get::<_, String>(0)
            })
            .with_context(|| format!("query distinct ingredient {name}"))?;
        rows.collect::<rusqlite::Result<Vec<_>>>()
            .with_context(|| format!("collect distinct ingredient {name}"))
    }

    pub fn ingredient_count(&self, criteria: &[Filter<IngredientColumn>]) -> Result<usize> {
        let mut filter = WhereClause::default();
        filter.push_ingredient_filters(criteria)?;
        let count: i64 = self
            .conn
            .query_row(
                &format!("SELECT COUNT(*) FROM ingredients i {}", filter.sql()),
                params_from_iter(filter.params()),
                |row| row.get(0),
            )
            .context("count ingredients")?;
        usize::try_from(count).context("ingredient count out of range")
    }

    pub fn ingredient_amounts(
        &self,
        criteria: &[Filter<IngredientColumn>],
    ) -> Result<Vec<(Option<f64>, Option<f64>)>> {
        let mut filter = WhereClause::default();
        filter.push_ingredient_filters(criteria)?;
        let query = format!(
            "
            SELECT i.amount, i.rangeamount
            FROM ingredients i
            {}
            ORDER BY i.amount IS NULL, i.amount ASC, i.rangeamount ASC
            ",
            filter.sql()
        );
        let mut stmt = self
            .conn
            .prepare(&query)
            .context("prepare ingredient amounts query")?;
        let rows = stmt
            .query_map(params_from_iter(filter.params()), |row| {
                Ok((row.get(0)?, row.get(1)?))
            })
            .context("query ingredient amounts")?;
        rows.collect::<rusqlite::Result<Vec<_>>>()
            .context("collect ingredient amounts")
    }

    /// Titles of live recipes using `ingkey` as `item`.
    pub fn recipe_titles_for(&self, ingkey: &str, item: &str) -> Result<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare(
                "
                SELECT DISTINCT r.title
                FROM recipes r
                JOIN ingredients i ON i.recipe_id = r.id
                WHERE i.ingkey = ? AND i.item = ? AND i.deleted = 0 AND r.deleted = 0
                ORDER BY lower(r.title) ASC
                ",
            )
            .context("prepare recipe titles query")?;
        let rows = stmt
            .query_map(params![ingkey, item], |row| row.get::<_, String>(0))
            .context("query recipe titles")?;
        rows.collect::<rusqlite::Result<Vec<_>>>()
            .context("collect recipe titles")
    }

    /// Applies `changes` to every ingredient line matching `criteria` and
    /// returns how many lines changed.
    pub fn update_ingredients(
        &self,
        criteria: &[Filter<IngredientColumn>],
        changes: &[(IngredientColumn, FilterValue)],
    ) -> Result<usize> {
        if changes.is_empty() {
            return Ok(0);
        }
        let mut filter = WhereClause::default();
        filter.push_ingredient_filters(criteria)?;
        if filter.is_empty() {
            bail!("refusing to update every ingredient line; narrow the criteria");
        }

        let mut assignments = Vec::with_capacity(changes.len());
        let mut values = Vec::with_capacity(changes.len() + filter.params().len());
        for (column, value) in changes {
            if !WRITABLE_INGREDIENT_COLUMNS.contains(column) {
                bail!("ingredient column {} cannot be edited", column.as_str());
            }
            assignments.push(format!("{} = ?", column.as_str()));
            values.push(sql::sql_value(value));
        }
        values.extend(filter.params().iter().cloned());

        let statement = format!(
            "UPDATE ingredients AS i SET {} {}",
            assignments.join(", "),
            filter.sql()
        );
        let rows_affected = self
            .conn
            .execute(&statement, params_from_iter(values.iter()))
            .context("update ingredients")?;
        info!(rows = rows_affected, "updated ingredient lines");
        Ok(rows_affected)
    }
}

pub fn default_db_path() -> Result<PathBuf> {
    if let Some(override_path) = env::var_os("LARDER_DB_PATH") {
        return Ok(PathBuf::from(override_path));
    }

    let data_root = dirs::data_local_dir().ok_or_else(|| {
        anyhow!("cannot resolve data directory; set LARDER_DB_PATH to a writable database path")
    })?;

    let app_dir = data_root.join(APP_NAME);
    fs::create_dir_all(&app_dir)
        .with_context(|| format!("create data directory {}", app_dir.display()))?;
    Ok(app_dir.join("larder.db"))
}

pub fn validate_db_path(path: &str) -> Result<()> {
    if path.is_empty() {
        bail!("database path must not be empty");
    }
    if path == ":memory:" {
        return Ok(());
    }

    if let Some(index) = path.find("://")
        && index > 0
    {
        let scheme = &path[..index];
        if scheme.chars().all(char::is_alphabetic) {
            bail!(
                "database path {path:?} looks like a URI ({scheme}://); pass a filesystem path instead"
            );
        }
    }

    if path.starts_with("file:") {
        bail!("database path {path:?} uses file: URI syntax; pass a plain filesystem path");
    }

    if path.contains('?') {
        bail!(
            "database path {path:?} contains '?'; remove query parameters and use a plain file path"
        );
    }

    Ok(())
}

fn insert_categories(conn: &Connection, recipe_id: RecipeId, categories: &[String]) -> Result<()> {
    for category in categories {
        conn.execute(
            "INSERT INTO categories (recipe_id, category) VALUES (?, ?)",
            params![recipe_id.get(), category.trim()],
        )
        .with_context(|| format!("insert category {category}"))?;
    }
    Ok(())
}

fn insert_ingredients(
    conn: &Connection,
    recipe_id: RecipeId,
    ingredients: &[IngredientDraft],
) -> Result<()> {
    for (position, line) in ingredients.iter().enumerate() {
        conn.execute(
            "
            INSERT INTO ingredients (
              recipe_id, unit, amount, rangeamount, item, ingkey,
              optional, inggroup, position, deleted
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, 0)
            ",
            params![
                recipe_id.get(),
                line.unit,
                line.amount,
                line.rangeamount,
                line.item.trim(),
                line.key(),
                line.optional,
                line.inggroup,
                i64::try_from(position).unwrap_or(i64::MAX),
            ],
        )
        .with_context(|| format!("insert ingredient {}", line.item))?;
    }
    Ok(())
}

fn recipe_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Recipe> {
    let last_modified_raw: String = row.get(15)?;
    Ok(Recipe {
        id: RecipeId::new(row.get(0)?),
        title: row.get(1)?,
        instructions: text_column(row, 2)?,
        modifications: text_column(row, 3)?,
        cuisine: text_column(row, 4)?,
        rating: row.get(5)?,
        description: text_column(row, 6)?,
        source: text_column(row, 7)?,
        link: text_column(row, 8)?,
        preptime: row.get(9)?,
        cooktime: row.get(10)?,
        yields: row.get(11)?,
        yield_unit: text_column(row, 12)?,
        recipe_hash: text_column(row, 13)?,
        deleted: row.get(14)?,
        last_modified: parse_datetime(&last_modified_raw).map_err(to_sql_error)?,
    })
}

fn text_column(row: &rusqlite::Row<'_>, index: usize) -> rusqlite::Result<String> {
    Ok(row.get::<_, Option<String>>(index)?.unwrap_or_default())
}

fn recipe_hash(draft: &RecipeDraft) -> String {
    let mut hasher = Sha256::new();
    for part in [
        draft.title.trim(),
        draft.instructions.as_str(),
        draft.modifications.as_str(),
    ] {
        hasher.update(part.as_bytes());
        hasher.update(b"\n");
    }
    for line in &draft.ingredients {
        let entry = format!(
            "{}|{}|{}|{}\n",
            larder_app::format_amount(line.amount, line.rangeamount),
            line.unit.as_deref().unwrap_or(""),
            line.item.trim(),
            line.key()
        );
        hasher.update(entry.as_bytes());
    }
    hasher
        .finalize()
        .iter()
        .map(|byte| format!("{byte:02x}"))
        .collect()
}

fn has_user_tables(conn: &Connection) -> Result<bool> {
    let count: i64 = conn
        .query_row(
            "
            SELECT COUNT(*)
            FROM sqlite_master
            WHERE type = 'table'
              AND name NOT LIKE 'sqlite_%'
            ",
            [],
            |row| row.get(0),
        )
        .context("count user tables")?;
    Ok(count > 0)
}

fn validate_schema(conn: &Connection) -> Result<()> {
    for (table, required_columns) in REQUIRED_SCHEMA {
        if !table_exists(conn, table)? {
            bail!(
                "database is missing required table `{table}`; use a larder-compatible database or migrate first"
            );
        }

        let columns = table_columns(conn, table)?;
        let missing: Vec<&str> = required_columns
            .iter()
            .copied()
            .filter(|column| !columns.contains(*column))
            .collect();

        if !missing.is_empty() {
            bail!(
                "table `{table}` is missing required columns: {}; run migration before launching",
                missing.join(", ")
            );
        }
    }

    Ok(())
}

fn ensure_required_indexes(conn: &Connection) -> Result<()> {
    for index in REQUIRED_INDEXES {
        conn.execute_batch(index.create_sql)
            .with_context(|| format!("ensure required index `{}`", index.name))?;
    }

    let existing_indexes = index_names(conn)?;
    let missing = REQUIRED_INDEXES
        .iter()
        .filter(|index| !existing_indexes.contains(index.name))
        .map(|index| index.name)
        .collect::<Vec<_>>();
    if !missing.is_empty() {
        bail!(
            "database is missing required indexes: {}; run migration before launching",
            missing.join(", ")
        );
    }

    Ok(())
}

fn table_exists(conn: &Connection, table: &str) -> Result<bool> {
    let exists = conn
        .query_row(
            "
            SELECT EXISTS(
              SELECT 1
              FROM sqlite_master
              WHERE type = 'table' AND name = ?
            )
            ",
            params![table],
            |row| row.get::<_, i64>(0),
        )
        .with_context(|| format!("check table existence for {table}"))?;
    Ok(exists == 1)
}

fn table_columns(conn: &Connection, table: &str) -> Result<BTreeSet<String>> {
    let mut stmt = conn
        .prepare(&format!("PRAGMA table_info({table})"))
        .with_context(|| format!("inspect columns for {table}"))?;
    let rows = stmt
        .query_map([], |row| row.get::<_, String>(1))
        .with_context(|| format!("query column info for {table}"))?;

    rows.collect::<rusqlite::Result<BTreeSet<_>>>()
        .with_context(|| format!("collect columns for {table}"))
}

fn index_names(conn: &Connection) -> Result<BTreeSet<String>> {
    let mut stmt = conn
        .prepare(
            "
            SELECT name
            FROM sqlite_master
            WHERE type = 'index'
              AND name NOT LIKE 'sqlite_%'
            ORDER BY name ASC
            ",
        )
        .context("prepare index names query")?;
    let rows = stmt
        .query_map([], |row| row.get::<_, String>(0))
        .context("query index names")?;
    rows.collect::<rusqlite::Result<BTreeSet<_>>>()
        .context("collect index names")
}

fn configure_connection(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        PRAGMA foreign_keys = ON;
        PRAGMA journal_mode = WAL;
        PRAGMA synchronous = NORMAL;
        PRAGMA busy_timeout = 5000;
        ",
    )
    .context("configure sqlite pragmas")?;
    register_regexp(conn)
}

// `x REGEXP y` calls regexp(y, x): the pattern comes first. Matching is
// case-insensitive and NULL never matches.
fn register_regexp(conn: &Connection) -> Result<()> {
    conn.create_scalar_function(
        "regexp",
        2,
        FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
        |ctx| {
            let pattern: Arc<Regex> = ctx.get_or_create_aux(0, |raw| -> Result<_, BoxError> {
                Ok(sql::compile_regex(raw.as_str()?)?)
            })?;
            let matched = match ctx.get_raw(1) {
                ValueRef::Text(text) => pattern.is_match(&String::from_utf8_lossy(text)),
                _ => false,
            };
            Ok(matched)
        },
    )
    .context("register regexp function")
}

fn now_rfc3339() -> Result<String> {
    OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .context("format current timestamp")
}

fn parse_datetime(raw: &str) -> Result<OffsetDateTime> {
    if let Ok(value) = OffsetDateTime::parse(raw, &Rfc3339) {
        return Ok(value);
    }

    if let Ok(value) = PrimitiveDateTime::parse(
        raw,
        &format_description!("[year]-[month]-[day] [hour]:[minute]:[second]"),
    ) {
        return Ok(value.assume_utc());
    }

    bail!("unsupported datetime format {raw:?}")
}

fn to_sql_error(error: anyhow::Error) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(
        0,
        rusqlite::types::Type::Text,
        Box::new(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            error.to_string(),
        )),
    )
}
