use std::collections::HashMap;

use crate::{
    error::Error,
    images::MediaStore,
    jwt::SessionData,
    pagination::{PageContext, PageRequest},
    permissions::ActionType,
    schema::{Id, RecipeShort, SubscriptionRow, SubscriptionView},
};

use sqlx::{Pool, Postgres};

use super::{page_total, users::get_user_by_id};

#[derive(sqlx::FromRow)]
struct AuthorRecipe {
    author_id: Id,
    #[sqlx(flatten)]
    recipe: RecipeShort,
}

/// `recipes_limit` must be a positive integer; anything else means no limit.
pub fn parse_recipes_limit(value: Option<&str>) -> Option<i64> {
    value
        .and_then(|value| value.trim().parse::<i64>().ok())
        .filter(|limit| *limit > 0)
}

pub async fn is_subscribed(
    user_id: Id,
    author_id: Id,
    pool: &Pool<Postgres>,
) -> Result<bool, Error> {
    let found: (bool,) = sqlx::query_as(
        "SELECT EXISTS (SELECT 1 FROM subscriptions WHERE user_id = $1 AND author_id = $2)",
    )
    .bind(user_id)
    .bind(author_id)
    .fetch_one(pool)
    .await?;

    Ok(found.0)
}

/// Newest recipes of each author, at most `limit` per author.
async fn author_recipes(
    author_ids: &[Id],
    limit: Option<i64>,
    media: &MediaStore,
    pool: &Pool<Postgres>,
) -> Result<HashMap<Id, Vec<RecipeShort>>, Error> {
    let rows: Vec<AuthorRecipe> = sqlx::query_as(
        "
        SELECT author_id, id, name, image, cooking_time
        FROM (
            SELECT r.*, ROW_NUMBER() OVER (
                PARTITION BY r.author_id ORDER BY r.date_created DESC, r.id DESC
            ) AS position
            FROM recipes r
            WHERE r.author_id = ANY($1)
        ) ranked
        WHERE $2::BIGINT IS NULL OR position <= $2
        ORDER BY author_id, position
    ",
    )
    .bind(author_ids)
    .bind(limit)
    .fetch_all(pool)
    .await?;

    let mut recipes: HashMap<Id, Vec<RecipeShort>> = HashMap::new();
    for row in rows {
        recipes.entry(row.author_id).or_default().push(RecipeShort {
            image: media.url(&row.recipe.image),
            ..row.recipe
        });
    }

    Ok(recipes)
}

async fn recipe_counts(author_ids: &[Id], pool: &Pool<Postgres>) -> Result<HashMap<Id, i64>, Error> {
    let rows: Vec<(Id, i64)> = sqlx::query_as(
        "SELECT author_id, COUNT(*) FROM recipes WHERE author_id = ANY($1) GROUP BY author_id",
    )
    .bind(author_ids)
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().collect())
}

async fn build_views(
    rows: Vec<SubscriptionRow>,
    recipes_limit: Option<i64>,
    media: &MediaStore,
    pool: &Pool<Postgres>,
) -> Result<Vec<SubscriptionView>, Error> {
    let author_ids: Vec<Id> = rows.iter().map(|row| row.author_id).collect();
    let mut recipes = author_recipes(&author_ids, recipes_limit, media, pool).await?;
    let counts = recipe_counts(&author_ids, pool).await?;

    Ok(rows
        .into_iter()
        .map(|row| SubscriptionView {
            id: row.author_id,
            email: row.email,
            username: row.username,
            first_name: row.first_name,
            last_name: row.last_name,
            is_subscribed: row.is_subscribed,
            recipes: recipes.remove(&row.author_id).unwrap_or_default(),
            recipes_count: counts.get(&row.author_id).copied().unwrap_or(0),
        })
        .collect())
}

const SUBSCRIPTION_SELECT: &str = "
    SELECT s.id, s.user_id, s.author_id, u.email, u.username, u.first_name, u.last_name,
        EXISTS (
            SELECT 1 FROM subscriptions f WHERE f.user_id = s.user_id AND f.author_id = s.author_id
        ) AS is_subscribed,
        COUNT(*) OVER() AS count
    FROM subscriptions s
    INNER JOIN users u ON u.id = s.author_id
";

pub async fn subscribe(
    session: &SessionData,
    author_id: Id,
    recipes_limit: Option<i64>,
    media: &MediaStore,
    pool: &Pool<Postgres>,
) -> Result<SubscriptionView, Error> {
    session.authenticate(ActionType::ManageSubscriptions)?;
    if get_user_by_id(pool, author_id).await?.is_none() {
        return Err(Error::NotFound("user"));
    }
    if author_id == session.user_id {
        return Err(Error::Conflict("cannot subscribe to yourself".to_string()));
    }

    let id: Option<(Id,)> = sqlx::query_as(
        "INSERT INTO subscriptions (user_id, author_id) VALUES ($1, $2) ON CONFLICT DO NOTHING RETURNING id",
    )
    .bind(session.user_id)
    .bind(author_id)
    .fetch_optional(pool)
    .await?;

    let Some((id,)) = id else {
        return Err(Error::Conflict(
            "already subscribed to this author".to_string(),
        ));
    };
    log::debug!("User {} subscribed to {}", session.user_id, author_id);

    let row: SubscriptionRow = sqlx::query_as(&format!("{SUBSCRIPTION_SELECT} WHERE s.id = $1"))
        .bind(id)
        .fetch_one(pool)
        .await?;

    build_views(vec![row], recipes_limit, media, pool)
        .await?
        .pop()
        .ok_or(Error::NotFound("user"))
}

pub async fn unsubscribe(
    session: &SessionData,
    author_id: Id,
    pool: &Pool<Postgres>,
) -> Result<(), Error> {
    session.authenticate(ActionType::ManageSubscriptions)?;
    if get_user_by_id(pool, author_id).await?.is_none() {
        return Err(Error::NotFound("user"));
    }

    let result = sqlx::query("DELETE FROM subscriptions WHERE user_id = $1 AND author_id = $2")
        .bind(session.user_id)
        .bind(author_id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(Error::Absent("not subscribed to this author".to_string()));
    }

    Ok(())
}

async fn count_subscriptions(user_id: Id, pool: &Pool<Postgres>) -> Result<i64, Error> {
    let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM subscriptions WHERE user_id = $1")
        .bind(user_id)
        .fetch_one(pool)
        .await?;

    Ok(count.0)
}

/// The session's subscriptions, newest first, each with the author's
/// recipes cut to `recipes_limit`.
pub async fn fetch_subscriptions(
    session: &SessionData,
    page: PageRequest,
    recipes_limit: Option<i64>,
    media: &MediaStore,
    pool: &Pool<Postgres>,
) -> Result<PageContext<SubscriptionView>, Error> {
    session.authenticate(ActionType::ManageSubscriptions)?;

    let rows: Vec<SubscriptionRow> = sqlx::query_as(&format!(
        "{SUBSCRIPTION_SELECT} WHERE s.user_id = $1 \
         ORDER BY s.date_created DESC, s.id DESC LIMIT $2 OFFSET $3"
    ))
    .bind(session.user_id)
    .bind(page.limit)
    .bind(page.offset())
    .fetch_all(pool)
    .await?;

    let window_count = rows.first().map(|row| row.count);
    let total_count =
        page_total(window_count, page, count_subscriptions(session.user_id, pool)).await?;
    let views = build_views(rows, recipes_limit, media, pool).await?;

    Ok(PageContext::from_rows(views, total_count, page))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recipes_limit_must_be_positive() {
        assert_eq!(parse_recipes_limit(Some("3")), Some(3));
        assert_eq!(parse_recipes_limit(Some(" 10 ")), Some(10));
        assert_eq!(parse_recipes_limit(Some("0")), None);
        assert_eq!(parse_recipes_limit(Some("-2")), None);
        assert_eq!(parse_recipes_limit(Some("many")), None);
        assert_eq!(parse_recipes_limit(None), None);
    }
}
