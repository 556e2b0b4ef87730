use std::collections::HashMap;

use crate::{
    error::Error,
    filters::RecipeFilter,
    form::{DraftMode, NewRecipe, RecipeDraft},
    images::{ImageInput, MediaStore},
    jwt::SessionData,
    pagination::{PageContext, PageRequest},
    permissions::ActionType,
    schema::{Id, ListKind, Recipe, RecipeIngredient, RecipeRow, RecipeShort, RecipeView, Tag},
};

use sqlx::{PgConnection, Pool, Postgres, QueryBuilder};

use super::{
    find_unknown_ids,
    page_total,
    ingredients::{list_recipe_ingredients, replace_recipe_ingredients},
    lists::list_flags,
    tags::{list_recipe_tags, replace_recipe_tags},
    users::list_profiles,
    viewer_id,
};

pub async fn get_recipe(id: Id, pool: &Pool<Postgres>) -> Result<Option<Recipe>, Error> {
    let recipe: Option<Recipe> = sqlx::query_as("SELECT * FROM recipes WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?;

    Ok(recipe)
}

/// Fetches a recipe the session is allowed to change.
pub async fn get_recipe_mut(
    id: Id,
    session: &SessionData,
    pool: &Pool<Postgres>,
) -> Result<Recipe, Error> {
    let recipe = get_recipe(id, pool).await?.ok_or(Error::NotFound("recipe"))?;
    session.authenticate_owner(
        recipe.author_id,
        ActionType::ManageOwnRecipes,
        ActionType::ManageAllRecipes,
    )?;

    Ok(recipe)
}

pub fn short_recipe(recipe: &Recipe, media: &MediaStore) -> RecipeShort {
    RecipeShort {
        id: recipe.id,
        name: recipe.name.to_owned(),
        image: media.url(&recipe.image),
        cooking_time: recipe.cooking_time,
    }
}

/// Joins tags, ingredients, authors and the viewer's list flags onto a
/// batch of recipes, keeping the batch order.
async fn build_views(
    recipes: Vec<Recipe>,
    viewer: Option<&SessionData>,
    media: &MediaStore,
    pool: &Pool<Postgres>,
) -> Result<Vec<RecipeView>, Error> {
    if recipes.is_empty() {
        return Ok(vec![]);
    }

    let recipe_ids: Vec<Id> = recipes.iter().map(|recipe| recipe.id).collect();
    let mut author_ids: Vec<Id> = recipes.iter().map(|recipe| recipe.author_id).collect();
    author_ids.sort_unstable();
    author_ids.dedup();

    let mut tags: HashMap<Id, Vec<Tag>> = HashMap::new();
    for linked in list_recipe_tags(&recipe_ids, pool).await? {
        tags.entry(linked.recipe_id).or_default().push(linked.tag);
    }

    let mut ingredients: HashMap<Id, Vec<RecipeIngredient>> = HashMap::new();
    for ingredient in list_recipe_ingredients(&recipe_ids, pool).await? {
        ingredients
            .entry(ingredient.recipe_id)
            .or_default()
            .push(ingredient);
    }

    let authors = list_profiles(&author_ids, viewer, pool).await?;
    let flags = list_flags(viewer, &recipe_ids, pool).await?;

    recipes
        .into_iter()
        .map(|recipe| {
            let author = authors
                .get(&recipe.author_id)
                .cloned()
                .ok_or(Error::NotFound("user"))?;

            Ok(RecipeView {
                id: recipe.id,
                tags: tags.remove(&recipe.id).unwrap_or_default(),
                author,
                ingredients: ingredients.remove(&recipe.id).unwrap_or_default(),
                is_favorited: flags.contains(ListKind::Favourite, recipe.id),
                is_in_shopping_cart: flags.contains(ListKind::Shopping, recipe.id),
                name: recipe.name,
                image: media.url(&recipe.image),
                text: recipe.text,
                cooking_time: recipe.cooking_time,
            })
        })
        .collect()
}

pub async fn recipe_view(
    id: Id,
    viewer: Option<&SessionData>,
    media: &MediaStore,
    pool: &Pool<Postgres>,
) -> Result<RecipeView, Error> {
    let recipe = get_recipe(id, pool).await?.ok_or(Error::NotFound("recipe"))?;

    build_views(vec![recipe], viewer, media, pool)
        .await?
        .pop()
        .ok_or(Error::NotFound("recipe"))
}

fn push_recipe_filter(
    query: &mut QueryBuilder<'_, Postgres>,
    filter: &RecipeFilter,
    viewer: Option<&SessionData>,
) {
    if !filter.tags.is_empty() {
        query.push(
            " AND EXISTS (SELECT 1 FROM recipe_tags rt INNER JOIN tags t ON t.id = rt.tag_id \
             WHERE rt.recipe_id = r.id AND t.slug = ANY(",
        );
        query.push_bind(filter.tags.clone());
        query.push("))");
    }

    if let Some(author) = filter.author {
        query.push(" AND r.author_id = ");
        query.push_bind(author);
    }

    if let Some(user_id) = viewer_id(viewer) {
        let kinds = [
            (filter.is_favorited, ListKind::Favourite),
            (filter.is_in_shopping_cart, ListKind::Shopping),
        ];
        for (_, kind) in kinds.into_iter().filter(|(enabled, _)| *enabled) {
            query.push(
                " AND EXISTS (SELECT 1 FROM recipe_lists l WHERE l.recipe_id = r.id AND l.user_id = ",
            );
            query.push_bind(user_id);
            query.push(" AND l.kind = ");
            query.push_bind(kind);
            query.push(")");
        }
    }
}

async fn count_recipes(
    filter: &RecipeFilter,
    viewer: Option<&SessionData>,
    pool: &Pool<Postgres>,
) -> Result<i64, Error> {
    let mut query: QueryBuilder<Postgres> =
        QueryBuilder::new("SELECT COUNT(*) FROM recipes r WHERE TRUE");
    push_recipe_filter(&mut query, filter, viewer);

    let count: (i64,) = query.build_query_as::<(i64,)>().fetch_one(pool).await?;
    Ok(count.0)
}

/// Newest modification first. The list flags only filter for a logged in
/// viewer; anonymous viewers get them ignored.
pub async fn fetch_recipes(
    filter: &RecipeFilter,
    page: PageRequest,
    viewer: Option<&SessionData>,
    media: &MediaStore,
    pool: &Pool<Postgres>,
) -> Result<PageContext<RecipeView>, Error> {
    let mut query: QueryBuilder<Postgres> =
        QueryBuilder::new("SELECT r.*, COUNT(*) OVER() AS count FROM recipes r WHERE TRUE");
    push_recipe_filter(&mut query, filter, viewer);

    query.push(" ORDER BY r.date_modified DESC, r.id DESC LIMIT ");
    query.push_bind(page.limit);
    query.push(" OFFSET ");
    query.push_bind(page.offset());

    let rows: Vec<RecipeRow> = query.build_query_as::<RecipeRow>().fetch_all(pool).await?;

    let window_count = rows.first().map(|row| row.count);
    let total_count = page_total(window_count, page, count_recipes(filter, viewer, pool)).await?;
    let recipes = rows.into_iter().map(|row| row.recipe).collect();
    let views = build_views(recipes, viewer, media, pool).await?;

    Ok(PageContext::from_rows(views, total_count, page))
}

/// Every referenced tag and ingredient must exist before anything is written.
async fn check_references(
    tags: Option<&[Id]>,
    ingredients: Option<Vec<Id>>,
    pool: &Pool<Postgres>,
) -> Result<(), Error> {
    if let Some(tags) = tags {
        let unknown = find_unknown_ids("tags", tags, pool).await?;
        if let Some(id) = unknown.first() {
            return Err(Error::validation("tags", format!("unknown tag id {id}")));
        }
    }

    if let Some(ingredients) = ingredients {
        let unknown = find_unknown_ids("ingredients", &ingredients, pool).await?;
        if let Some(id) = unknown.first() {
            return Err(Error::validation(
                "ingredients",
                format!("unknown ingredient id {id}"),
            ));
        }
    }

    Ok(())
}

async fn insert_recipe(
    conn: &mut PgConnection,
    session: &SessionData,
    recipe: &NewRecipe,
    image: &str,
) -> Result<Id, Error> {
    let id: (Id,) = sqlx::query_as(
        "
        INSERT INTO recipes (name, text, image, cooking_time, author_id, last_editor_id)
        VALUES ($1, $2, $3, $4, $5, $5)
        RETURNING id
    ",
    )
    .bind(&recipe.name)
    .bind(&recipe.text)
    .bind(image)
    .bind(recipe.cooking_time)
    .bind(session.user_id)
    .fetch_one(&mut *conn)
    .await?;

    replace_recipe_tags(conn, id.0, &recipe.tags).await?;
    replace_recipe_ingredients(conn, id.0, &recipe.ingredients).await?;

    Ok(id.0)
}

/// Creates the recipe with its tags and ingredients in one transaction.
/// The stored image is removed again if the transaction fails.
pub async fn create_recipe(
    session: &SessionData,
    draft: RecipeDraft,
    media: &MediaStore,
    pool: &Pool<Postgres>,
) -> Result<RecipeView, Error> {
    session.authenticate(ActionType::CreateRecipes)?;
    let recipe = draft.into_new()?;

    let ingredient_ids: Vec<Id> = recipe.ingredients.iter().map(|entry| entry.id).collect();
    check_references(Some(recipe.tags.as_slice()), Some(ingredient_ids), pool).await?;

    let image = match &recipe.image {
        ImageInput::Inline(image) => media.save(image).await?,
        ImageInput::Stored(_) => {
            return Err(Error::validation(
                "image",
                "upload a valid base64 encoded image",
            ))
        }
    };

    let mut tr = pool.begin().await?;
    let inserted = insert_recipe(&mut *tr, session, &recipe, &image).await;
    let result = match inserted {
        Ok(id) => tr.commit().await.map(|_| id).map_err(Error::from),
        Err(e) => Err(e),
    };

    let id = match result {
        Ok(id) => id,
        Err(e) => {
            media.remove(&image).await;
            return Err(e);
        }
    };

    log::info!("User {} created recipe {}", session.user_id, id);
    recipe_view(id, Some(session), media, pool).await
}

async fn apply_update(
    conn: &mut PgConnection,
    session: &SessionData,
    recipe_id: Id,
    draft: &RecipeDraft,
    image: Option<&str>,
) -> Result<(), Error> {
    if let Some(tags) = &draft.tags {
        replace_recipe_tags(conn, recipe_id, tags).await?;
    }
    if let Some(ingredients) = &draft.ingredients {
        replace_recipe_ingredients(conn, recipe_id, ingredients).await?;
    }

    sqlx::query(
        "
        UPDATE recipes SET
            name = COALESCE($1, name),
            text = COALESCE($2, text),
            cooking_time = COALESCE($3, cooking_time),
            image = COALESCE($4, image),
            last_editor_id = $5,
            date_modified = NOW()
        WHERE id = $6
    ",
    )
    .bind(draft.name.as_deref())
    .bind(draft.text.as_deref())
    .bind(draft.cooking_time)
    .bind(image)
    .bind(session.user_id)
    .bind(recipe_id)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Partial update: absent fields keep their stored values, present tag or
/// ingredient lists replace the old sets entirely.
pub async fn update_recipe(
    session: &SessionData,
    id: Id,
    draft: RecipeDraft,
    media: &MediaStore,
    pool: &Pool<Postgres>,
) -> Result<RecipeView, Error> {
    let recipe = get_recipe_mut(id, session, pool).await?;
    let draft = draft.validate(DraftMode::Update)?;

    let ingredient_ids = draft
        .ingredients
        .as_ref()
        .map(|entries| entries.iter().map(|entry| entry.id).collect());
    check_references(draft.tags.as_deref(), ingredient_ids, pool).await?;

    let new_image = match &draft.image {
        Some(ImageInput::Inline(image)) => Some(media.save(image).await?),
        Some(ImageInput::Stored(value)) => {
            if media.reference_from(value) != recipe.image {
                return Err(Error::validation(
                    "image",
                    "upload a valid base64 encoded image",
                ));
            }
            None
        }
        None => None,
    };

    let mut tr = pool.begin().await?;
    let applied = apply_update(&mut *tr, session, id, &draft, new_image.as_deref()).await;
    let result = match applied {
        Ok(_) => tr.commit().await.map_err(Error::from),
        Err(e) => Err(e),
    };

    match (result, new_image) {
        (Err(e), Some(image)) => {
            media.remove(&image).await;
            return Err(e);
        }
        (Err(e), None) => return Err(e),
        (Ok(_), Some(_)) => media.remove(&recipe.image).await,
        (Ok(_), None) => {}
    }

    log::info!("User {} updated recipe {}", session.user_id, id);
    recipe_view(id, Some(session), media, pool).await
}

/// Tags, ingredient amounts and list entries go with the recipe.
pub async fn delete_recipe(
    session: &SessionData,
    id: Id,
    media: &MediaStore,
    pool: &Pool<Postgres>,
) -> Result<(), Error> {
    let recipe = get_recipe_mut(id, session, pool).await?;

    sqlx::query("DELETE FROM recipes WHERE id = $1")
        .bind(recipe.id)
        .execute(pool)
        .await?;
    media.remove(&recipe.image).await;

    log::info!("User {} deleted recipe {}", session.user_id, id);
    Ok(())
}
