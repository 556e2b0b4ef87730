use crate::{
    error::Error,
    filters::IngredientFilter,
    jwt::SessionData,
    permissions::ActionType,
    schema::{Id, Ingredient, IngredientAmount, IngredientEntry, NewIngredient, RecipeIngredient},
    validation::validate_new_ingredient,
};

use serde_json::Value;
use sqlx::{PgConnection, Pool, Postgres};

pub async fn create_ingredient(
    session: &SessionData,
    new_ingredient: NewIngredient,
    pool: &Pool<Postgres>,
) -> Result<Ingredient, Error> {
    session.authenticate(ActionType::ManageReferenceData)?;
    let new_ingredient = validate_new_ingredient(new_ingredient)?;

    let ingredient: Ingredient = sqlx::query_as(
        "
        INSERT INTO ingredients (name, measurement_unit, author_id, last_editor_id)
        VALUES ($1, $2, $3, $3)
        RETURNING *
    ",
    )
    .bind(&new_ingredient.name)
    .bind(&new_ingredient.measurement_unit)
    .bind(session.user_id)
    .fetch_one(pool)
    .await?;

    log::info!(
        "Created ingredient {} ({}) with id {}",
        ingredient.name,
        ingredient.measurement_unit,
        ingredient.id
    );
    Ok(ingredient)
}

/// Bulk load of `[{"name": .., "measurement_unit": ..}, ..]`. Pairs that
/// already exist are skipped; returns how many rows were inserted.
pub async fn import_ingredients(
    session: &SessionData,
    data: Value,
    pool: &Pool<Postgres>,
) -> Result<u64, Error> {
    session.authenticate(ActionType::ManageReferenceData)?;

    let entries: Vec<NewIngredient> = serde_json::from_value(data)
        .map_err(|e| Error::validation("non_field_errors", e.to_string()))?;
    let entries = entries
        .into_iter()
        .map(validate_new_ingredient)
        .collect::<Result<Vec<NewIngredient>, Error>>()?;

    let (names, units): (Vec<String>, Vec<String>) = entries
        .into_iter()
        .map(|entry| (entry.name, entry.measurement_unit))
        .unzip();

    let result = sqlx::query(
        "
        INSERT INTO ingredients (name, measurement_unit, author_id, last_editor_id)
        SELECT name, unit, $3, $3 FROM UNNEST($1::VARCHAR[], $2::VARCHAR[]) AS t(name, unit)
        ON CONFLICT DO NOTHING
    ",
    )
    .bind(&names)
    .bind(&units)
    .bind(session.user_id)
    .execute(pool)
    .await?;

    log::info!(
        "Imported {} of {} ingredients",
        result.rows_affected(),
        names.len()
    );
    Ok(result.rows_affected())
}

pub async fn get_ingredient(id: Id, pool: &Pool<Postgres>) -> Result<Option<Ingredient>, Error> {
    let ingredient: Option<Ingredient> = sqlx::query_as("SELECT * FROM ingredients WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?;

    Ok(ingredient)
}

/// Case-sensitive prefix search on the name.
pub async fn search_ingredients(
    filter: &IngredientFilter,
    pool: &Pool<Postgres>,
) -> Result<Vec<Ingredient>, Error> {
    let list: Vec<Ingredient> = sqlx::query_as(
        "
        SELECT * FROM ingredients
        WHERE $1::VARCHAR IS NULL OR STARTS_WITH(name, $1)
        ORDER BY name, measurement_unit
    ",
    )
    .bind(filter.name.as_deref())
    .fetch_all(pool)
    .await?;

    Ok(list)
}

pub async fn list_recipe_ingredients(
    recipe_ids: &[Id],
    pool: &Pool<Postgres>,
) -> Result<Vec<RecipeIngredient>, Error> {
    let list: Vec<RecipeIngredient> = sqlx::query_as(
        "
        SELECT ia.recipe_id, i.id, i.name, i.measurement_unit, ia.amount
        FROM ingredient_amounts ia
        INNER JOIN ingredients i ON i.id = ia.ingredient_id
        WHERE ia.recipe_id = ANY($1)
        ORDER BY i.name, i.measurement_unit
    ",
    )
    .bind(recipe_ids)
    .fetch_all(pool)
    .await?;

    Ok(list)
}

/// Swaps the whole ingredient list of a recipe. Runs inside the caller's
/// transaction.
pub async fn replace_recipe_ingredients(
    conn: &mut PgConnection,
    recipe_id: Id,
    entries: &[IngredientEntry],
) -> Result<Vec<IngredientAmount>, Error> {
    sqlx::query("DELETE FROM ingredient_amounts WHERE recipe_id = $1")
        .bind(recipe_id)
        .execute(&mut *conn)
        .await?;

    let (ids, amounts): (Vec<Id>, Vec<i32>) =
        entries.iter().map(|entry| (entry.id, entry.amount)).unzip();

    let rows: Vec<IngredientAmount> = sqlx::query_as(
        "
        INSERT INTO ingredient_amounts (recipe_id, ingredient_id, amount)
        SELECT $1, ingredient_id, amount
        FROM UNNEST($2::INTEGER[], $3::INTEGER[]) AS t(ingredient_id, amount)
        RETURNING *
    ",
    )
    .bind(recipe_id)
    .bind(&ids)
    .bind(&amounts)
    .fetch_all(&mut *conn)
    .await?;

    log::trace!("Recipe {recipe_id} now has {} ingredients", rows.len());
    Ok(rows)
}
