use crate::{
    error::Error,
    jwt::SessionData,
    permissions::ActionType,
    schema::{Id, LinkedRecipeTag, NewTag, Tag},
    validation::validate_new_tag,
};

use sqlx::{PgConnection, Pool, Postgres};

pub async fn create_tag(
    session: &SessionData,
    new_tag: NewTag,
    pool: &Pool<Postgres>,
) -> Result<Tag, Error> {
    session.authenticate(ActionType::ManageReferenceData)?;
    let new_tag = validate_new_tag(new_tag)?;

    let tag: Tag = sqlx::query_as(
        "
        INSERT INTO tags (name, color, slug, author_id, last_editor_id)
        VALUES ($1, $2, $3, $4, $4)
        RETURNING *
    ",
    )
    .bind(&new_tag.name)
    .bind(&new_tag.color)
    .bind(&new_tag.slug)
    .bind(session.user_id)
    .fetch_one(pool)
    .await?;

    log::info!("Created tag {} ({})", tag.slug, tag.id);
    Ok(tag)
}

pub async fn update_tag(
    session: &SessionData,
    tag_id: Id,
    new_tag: NewTag,
    pool: &Pool<Postgres>,
) -> Result<Tag, Error> {
    session.authenticate(ActionType::ManageReferenceData)?;
    let new_tag = validate_new_tag(new_tag)?;

    let tag: Option<Tag> = sqlx::query_as(
        "
        UPDATE tags
        SET name = $1, color = $2, slug = $3, last_editor_id = $4, date_modified = NOW()
        WHERE id = $5
        RETURNING *
    ",
    )
    .bind(&new_tag.name)
    .bind(&new_tag.color)
    .bind(&new_tag.slug)
    .bind(session.user_id)
    .bind(tag_id)
    .fetch_optional(pool)
    .await?;

    tag.ok_or(Error::NotFound("tag"))
}

pub async fn get_tag(id: Id, pool: &Pool<Postgres>) -> Result<Option<Tag>, Error> {
    let tag: Option<Tag> = sqlx::query_as("SELECT * FROM tags WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?;

    Ok(tag)
}

pub async fn find_tag_by_slug(slug: &str, pool: &Pool<Postgres>) -> Result<Option<Tag>, Error> {
    let tag: Option<Tag> = sqlx::query_as("SELECT * FROM tags WHERE slug = $1")
        .bind(slug)
        .fetch_optional(pool)
        .await?;

    Ok(tag)
}

pub async fn list_tags(pool: &Pool<Postgres>) -> Result<Vec<Tag>, Error> {
    let list: Vec<Tag> = sqlx::query_as("SELECT * FROM tags ORDER BY name")
        .fetch_all(pool)
        .await?;

    Ok(list)
}

pub async fn list_recipe_tags(
    recipe_ids: &[Id],
    pool: &Pool<Postgres>,
) -> Result<Vec<LinkedRecipeTag>, Error> {
    let list: Vec<LinkedRecipeTag> = sqlx::query_as(
        "
        SELECT rt.recipe_id, t.*
        FROM recipe_tags rt
        INNER JOIN tags t ON t.id = rt.tag_id
        WHERE rt.recipe_id = ANY($1)
        ORDER BY t.name
    ",
    )
    .bind(recipe_ids)
    .fetch_all(pool)
    .await?;

    Ok(list)
}

/// Swaps the whole tag set of a recipe. Runs inside the caller's transaction.
pub async fn replace_recipe_tags(
    conn: &mut PgConnection,
    recipe_id: Id,
    tag_ids: &[Id],
) -> Result<(), Error> {
    sqlx::query("DELETE FROM recipe_tags WHERE recipe_id = $1")
        .bind(recipe_id)
        .execute(&mut *conn)
        .await?;

    sqlx::query("INSERT INTO recipe_tags (recipe_id, tag_id) SELECT $1, UNNEST($2::INTEGER[])")
        .bind(recipe_id)
        .bind(tag_ids)
        .execute(&mut *conn)
        .await?;

    Ok(())
}
