use crate::{
    constants::SHOPPING_LIST_FILENAME,
    error::Error,
    jwt::SessionData,
    permissions::ActionType,
    schema::{Id, ListKind, ShoppingRow},
    shopping_list::{aggregate, render, ShoppingListDocument},
};

use sqlx::{Pool, Postgres};

/// Every ingredient amount of every recipe in the user's shopping cart,
/// unaggregated.
pub async fn shopping_rows(user_id: Id, pool: &Pool<Postgres>) -> Result<Vec<ShoppingRow>, Error> {
    let rows: Vec<ShoppingRow> = sqlx::query_as(
        "
        SELECT i.name, i.measurement_unit, ia.amount
        FROM recipe_lists l
        INNER JOIN ingredient_amounts ia ON ia.recipe_id = l.recipe_id
        INNER JOIN ingredients i ON i.id = ia.ingredient_id
        WHERE l.user_id = $1 AND l.kind = $2
    ",
    )
    .bind(user_id)
    .bind(ListKind::Shopping)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

pub async fn download_shopping_list(
    session: &SessionData,
    pool: &Pool<Postgres>,
) -> Result<ShoppingListDocument, Error> {
    session.authenticate(ActionType::ManageOwnLists)?;

    let items = aggregate(shopping_rows(session.user_id, pool).await?);
    let content = render(&session.username, &items)?;

    log::debug!(
        "Built shopping list of {} items for user {}",
        items.len(),
        session.user_id
    );
    Ok(ShoppingListDocument {
        filename: SHOPPING_LIST_FILENAME,
        content,
    })
}
