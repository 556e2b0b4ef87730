pub mod ingredients;
pub mod lists;
pub mod recipes;
pub mod shopping;
pub mod subscriptions;
pub mod tags;
pub mod users;

pub use ingredients::*;
pub use lists::*;
pub use recipes::*;
pub use shopping::*;
pub use subscriptions::*;
pub use tags::*;
pub use users::*;

use std::{collections::HashSet, future::Future};

use sqlx::{Pool, Postgres};

use crate::jwt::SessionData;

use super::{error::Error, pagination::PageRequest, schema::Id};

pub(crate) fn viewer_id(viewer: Option<&SessionData>) -> Option<Id> {
    viewer.map(|session| session.user_id)
}

/// Returns the ids from `ids` that have no row in `table`.
pub(crate) async fn find_unknown_ids(
    table: &'static str,
    ids: &[Id],
    pool: &Pool<Postgres>,
) -> Result<Vec<Id>, Error> {
    if ids.is_empty() {
        return Ok(vec![]);
    }

    let found: Vec<(Id,)> = sqlx::query_as(&format!("SELECT id FROM {table} WHERE id = ANY($1)"))
        .bind(ids)
        .fetch_all(pool)
        .await?;
    let found: HashSet<Id> = found.into_iter().map(|row| row.0).collect();

    Ok(ids
        .iter()
        .filter(|id| !found.contains(id))
        .copied()
        .collect())
}

/// `COUNT(*) OVER()` yields nothing on a page past the end, so such pages
/// fall back to `count`.
pub(crate) async fn page_total<F>(
    window_count: Option<i64>,
    page: PageRequest,
    count: F,
) -> Result<i64, Error>
where
    F: Future<Output = Result<i64, Error>>,
{
    match window_count {
        Some(total) => Ok(total),
        None if page.page > 1 => count.await,
        None => Ok(0),
    }
}

#[cfg(test)]
mod tests {
    use std::future::ready;

    use super::*;

    #[tokio::test]
    async fn page_total_counts_only_past_the_end() {
        let unused = async { Err(Error::NotFound("count")) };
        assert_eq!(page_total(Some(7), PageRequest::new(1, 5), unused).await.unwrap(), 7);
        assert_eq!(page_total(None, PageRequest::new(1, 5), ready(Ok(9))).await.unwrap(), 0);
        assert_eq!(page_total(None, PageRequest::new(3, 5), ready(Ok(9))).await.unwrap(), 9);
    }
}
