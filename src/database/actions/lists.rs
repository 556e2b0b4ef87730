use std::collections::HashSet;

use crate::{
    error::Error,
    images::MediaStore,
    jwt::SessionData,
    pagination::{PageContext, PageRequest},
    permissions::ActionType,
    schema::{Id, ListKind, RecipeShort, RecipeShortRow},
};

use sqlx::{Pool, Postgres};

use super::{
    page_total,
    recipes::{get_recipe, short_recipe},
};

/// Which of a batch of recipes the viewer keeps in which list.
#[derive(Debug, Clone, Default)]
pub struct ListFlags {
    entries: HashSet<(ListKind, Id)>,
}

impl ListFlags {
    pub fn contains(&self, kind: ListKind, recipe_id: Id) -> bool {
        self.entries.contains(&(kind, recipe_id))
    }
}

/// Anonymous viewers have no lists, so every flag is false for them.
pub async fn list_flags(
    viewer: Option<&SessionData>,
    recipe_ids: &[Id],
    pool: &Pool<Postgres>,
) -> Result<ListFlags, Error> {
    let Some(viewer) = viewer else {
        return Ok(ListFlags::default());
    };

    let rows: Vec<(ListKind, Id)> = sqlx::query_as(
        "SELECT kind, recipe_id FROM recipe_lists WHERE user_id = $1 AND recipe_id = ANY($2)",
    )
    .bind(viewer.user_id)
    .bind(recipe_ids)
    .fetch_all(pool)
    .await?;

    Ok(ListFlags {
        entries: rows.into_iter().collect(),
    })
}

pub async fn is_in_list(
    kind: ListKind,
    user_id: Id,
    recipe_id: Id,
    pool: &Pool<Postgres>,
) -> Result<bool, Error> {
    let found: (bool,) = sqlx::query_as(
        "SELECT EXISTS (SELECT 1 FROM recipe_lists WHERE user_id = $1 AND recipe_id = $2 AND kind = $3)",
    )
    .bind(user_id)
    .bind(recipe_id)
    .bind(kind)
    .fetch_one(pool)
    .await?;

    Ok(found.0)
}

/// Fails with a conflict when the recipe is already in the list. The
/// unique constraint decides, so concurrent adds cannot both succeed.
pub async fn add_to_list(
    kind: ListKind,
    session: &SessionData,
    recipe_id: Id,
    media: &MediaStore,
    pool: &Pool<Postgres>,
) -> Result<RecipeShort, Error> {
    session.authenticate(ActionType::ManageOwnLists)?;
    let recipe = get_recipe(recipe_id, pool)
        .await?
        .ok_or(Error::NotFound("recipe"))?;

    let result = sqlx::query(
        "INSERT INTO recipe_lists (user_id, recipe_id, kind) VALUES ($1, $2, $3) ON CONFLICT DO NOTHING",
    )
    .bind(session.user_id)
    .bind(recipe.id)
    .bind(kind)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(Error::Conflict(format!(
            "recipe is already in {}",
            kind.label()
        )));
    }

    log::debug!(
        "User {} added recipe {} to {}",
        session.user_id,
        recipe.id,
        kind.label()
    );
    Ok(short_recipe(&recipe, media))
}

pub async fn remove_from_list(
    kind: ListKind,
    session: &SessionData,
    recipe_id: Id,
    pool: &Pool<Postgres>,
) -> Result<(), Error> {
    session.authenticate(ActionType::ManageOwnLists)?;
    if get_recipe(recipe_id, pool).await?.is_none() {
        return Err(Error::NotFound("recipe"));
    }

    let result =
        sqlx::query("DELETE FROM recipe_lists WHERE user_id = $1 AND recipe_id = $2 AND kind = $3")
            .bind(session.user_id)
            .bind(recipe_id)
            .bind(kind)
            .execute(pool)
            .await?;

    if result.rows_affected() == 0 {
        return Err(Error::Absent(format!("recipe is not in {}", kind.label())));
    }

    Ok(())
}

async fn count_list(kind: ListKind, user_id: Id, pool: &Pool<Postgres>) -> Result<i64, Error> {
    let count: (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM recipe_lists WHERE user_id = $1 AND kind = $2")
            .bind(user_id)
            .bind(kind)
            .fetch_one(pool)
            .await?;

    Ok(count.0)
}

/// Most recently added first.
pub async fn fetch_list(
    kind: ListKind,
    session: &SessionData,
    page: PageRequest,
    media: &MediaStore,
    pool: &Pool<Postgres>,
) -> Result<PageContext<RecipeShort>, Error> {
    session.authenticate(ActionType::ManageOwnLists)?;

    let rows: Vec<RecipeShortRow> = sqlx::query_as(
        "
        SELECT r.id, r.name, r.image, r.cooking_time, COUNT(*) OVER() AS count
        FROM recipe_lists l
        INNER JOIN recipes r ON r.id = l.recipe_id
        WHERE l.user_id = $1 AND l.kind = $2
        ORDER BY l.date_created DESC, l.id DESC
        LIMIT $3 OFFSET $4
    ",
    )
    .bind(session.user_id)
    .bind(kind)
    .bind(page.limit)
    .bind(page.offset())
    .fetch_all(pool)
    .await?;

    let window_count = rows.first().map(|row| row.count);
    let total_count = page_total(window_count, page, count_list(kind, session.user_id, pool)).await?;
    let rows = rows
        .into_iter()
        .map(|row| RecipeShort {
            image: media.url(&row.recipe.image),
            ..row.recipe
        })
        .collect();

    Ok(PageContext::from_rows(rows, total_count, page))
}
