// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, bail};
use larder_app::{
    Filter, FilterValue, IngredientColumn, LikePattern, Operator, RecipeColumn, SortDirection,
    SortKey,
};
use regex::{Regex, RegexBuilder};
use rusqlite::types::Value;

/// Columns an `anywhere` search spans.
const ANYWHERE_COLUMNS: [RecipeColumn; 9] = [
    RecipeColumn::IngKey,
    RecipeColumn::Item,
    RecipeColumn::Category,
    RecipeColumn::Cuisine,
    RecipeColumn::Title,
    RecipeColumn::Instructions,
    RecipeColumn::Notes,
    RecipeColumn::Source,
    RecipeColumn::Link,
];

const INGREDIENT_COLUMNS: [RecipeColumn; 2] = [RecipeColumn::IngKey, RecipeColumn::Item];

const FIRST_CATEGORY_SQL: &str =
    "(SELECT MIN(c.category) FROM categories c WHERE c.recipe_id = r.id)";

#[derive(Debug, Default)]
pub(crate) struct WhereClause {
    clauses: Vec<String>,
    params: Vec<Value>,
}

impl WhereClause {
    pub(crate) fn push_recipe_filter(&mut self, filter: &Filter<RecipeColumn>) -> Result<()> {
        let clause = recipe_predicate(
            filter.column,
            filter.operator,
            &filter.value,
            &mut self.params,
        )?;
        self.clauses.push(clause);
        Ok(())
    }

    pub(crate) fn push_ingredient_filter(
        &mut self,
        filter: &Filter<IngredientColumn>,
    ) -> Result<()> {
        let column = ingredient_column_sql(filter.column)?;
        let clause = predicate(
            &format!("i.{column}"),
            filter.operator,
            &filter.value,
            &mut self.params,
        )?;
        self.clauses.push(clause);
        Ok(())
    }

    pub(crate) fn push_ingredient_filters(
        &mut self,
        filters: &[Filter<IngredientColumn>],
    ) -> Result<()> {
        for filter in filters {
            self.push_ingredient_filter(filter)?;
        }
        Ok(())
    }

    pub(crate) fn push_raw(&mut self, clause: &str) {
        self.clauses.push(clause.to_owned());
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    pub(crate) fn sql(&self) -> String {
        if self.clauses.is_empty() {
            return String::new();
        }
        format!("WHERE {}", self.clauses.join(" AND "))
    }

    pub(crate) fn params(&self) -> &[Value] {
        &self.params
    }
}

fn recipe_predicate(
    column: RecipeColumn,
    operator: Operator,
    value: &FilterValue,
    params: &mut Vec<Value>,
) -> Result<String> {
    match column {
        RecipeColumn::Anywhere => any_of(&ANYWHERE_COLUMNS, operator, value, params),
        RecipeColumn::Ingredient => any_of(&INGREDIENT_COLUMNS, operator, value, params),
        RecipeColumn::Category => Ok(format!(
            "r.id IN (SELECT c.recipe_id FROM categories c WHERE {})",
            predicate("c.category", operator, value, params)?
        )),
        RecipeColumn::IngKey | RecipeColumn::Item => Ok(format!(
            "r.id IN (SELECT i.recipe_id FROM ingredients i WHERE i.deleted = 0 AND {})",
            predicate(&format!("i.{}", column.as_str()), operator, value, params)?
        )),
        other => predicate(&format!("r.{}", other.as_str()), operator, value, params),
    }
}

fn any_of(
    columns: &[RecipeColumn],
    operator: Operator,
    value: &FilterValue,
    params: &mut Vec<Value>,
) -> Result<String> {
    let mut parts = Vec::with_capacity(columns.len());
    for column in columns {
        parts.push(recipe_predicate(*column, operator, value, params)?);
    }
    Ok(format!("({})", parts.join(" OR ")))
}

fn predicate(
    column: &str,
    operator: Operator,
    value: &FilterValue,
    params: &mut Vec<Value>,
) -> Result<String> {
    match operator {
        Operator::Equals => {
            if matches!(value, FilterValue::Null) {
                return Ok(format!("{column} IS NULL"));
            }
            params.push(sql_value(value));
            Ok(format!("{column} = ?"))
        }
        Operator::Like => {
            let Some(raw) = value.as_text() else {
                bail!("LIKE filter on {column} needs a text value");
            };
            params.push(Value::Text(LikePattern::parse(raw).to_sql()));
            Ok(format!("{column} LIKE ? ESCAPE '\\'"))
        }
        Operator::Regex => {
            let Some(raw) = value.as_text() else {
                bail!("REGEXP filter on {column} needs a text value");
            };
            compile_regex(raw)?;
            params.push(Value::Text(raw.to_owned()));
            Ok(format!("{column} REGEXP ?"))
        }
    }
}

pub(crate) fn compile_regex(pattern: &str) -> Result<Regex> {
    RegexBuilder::new(pattern)
        .case_insensitive(true)
        .build()
        .with_context(|| format!("invalid regular expression {pattern:?}"))
}

pub(crate) fn sql_value(value: &FilterValue) -> Value {
    match value {
        FilterValue::Null => Value::Null,
        FilterValue::Bool(value) => Value::Integer(i64::from(*value)),
        FilterValue::Int(value) => Value::Integer(*value),
        FilterValue::Float(value) => Value::Real(*value),
        FilterValue::Text(value) => Value::Text(value.clone()),
    }
}

pub(crate) fn ingredient_column_sql(column: IngredientColumn) -> Result<&'static str> {
    if column == IngredientColumn::Count {
        bail!("count is an aggregate, not an ingredient column");
    }
    Ok(column.as_str())
}

pub(crate) fn recipe_order_by(sort_by: &[SortKey<RecipeColumn>]) -> Result<String> {
    let mut terms = Vec::with_capacity(sort_by.len() + 1);
    for key in sort_by {
        let direction = direction_sql(key.direction);
        match key.column {
            RecipeColumn::Title
            | RecipeColumn::Cuisine
            | RecipeColumn::Source
            | RecipeColumn::Link
            | RecipeColumn::Description => {
                terms.push(text_order(
                    &format!("r.{}", key.column.as_str()),
                    direction,
                ));
            }
            RecipeColumn::Category => terms.push(text_order(FIRST_CATEGORY_SQL, direction)),
            RecipeColumn::Rating
            | RecipeColumn::PrepTime
            | RecipeColumn::CookTime
            | RecipeColumn::Yields => {
                let expr = format!("r.{}", key.column.as_str());
                terms.push(format!("{expr} IS NULL, {expr} {direction}"));
            }
            RecipeColumn::LastModified => terms.push(format!("r.last_modified {direction}")),
            other => bail!(
                "cannot sort recipes by {}; choose a sortable column",
                other.as_str()
            ),
        }
    }
    terms.push("r.id ASC".to_owned());
    Ok(format!("ORDER BY {}", terms.join(", ")))
}

pub(crate) fn key_order_by(sort_by: &[SortKey<IngredientColumn>]) -> Result<String> {
    let mut terms = Vec::with_capacity(sort_by.len() + 1);
    for key in sort_by {
        let direction = direction_sql(key.direction);
        match key.column {
            IngredientColumn::IngKey => terms.push(format!("lower(i.ingkey) {direction}")),
            IngredientColumn::Count => terms.push(format!("COUNT(*) {direction}")),
            other => bail!(
                "cannot sort ingredient keys by {}; use ingkey or count",
                other.as_str()
            ),
        }
    }
    if terms.is_empty() {
        terms.push("lower(i.ingkey) ASC".to_owned());
    }
    terms.push("i.ingkey ASC".to_owned());
    Ok(format!("ORDER BY {}", terms.join(", ")))
}

// Empty and NULL text sorts last in both directions.
fn text_order(expr: &str, direction: &str) -> String {
    format!("({expr} IS NULL OR {expr} = '') ASC, lower({expr}) {direction}")
}

const fn direction_sql(direction: SortDirection) -> &'static str {
    match direction {
        SortDirection::Asc => "ASC",
        SortDirection::Desc => "DESC",
    }
}
