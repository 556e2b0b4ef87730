use std::{convert::Infallible, sync::Arc};

use sqlx::{Pool, Postgres};
use warp::{reject::Rejection, Filter};

use crate::error::Error;

use super::jwt::{verify_jwt_session, SessionData, SessionKeys};

/// Accepts `Authorization: Token <jwt>` as well as `Bearer <jwt>`.
fn token_from_header(header: &str) -> Option<&str> {
    header
        .strip_prefix("Token ")
        .or_else(|| header.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

pub fn with_session(
    keys: Arc<SessionKeys>,
) -> impl Filter<Extract = (SessionData,), Error = Rejection> + Clone {
    warp::header::optional::<String>("authorization").and_then(move |header: Option<String>| {
        let keys = keys.clone();
        async move {
            let token = header.as_deref().and_then(token_from_header).ok_or_else(|| {
                Error::Unauthorized("Authentication credentials were not provided".to_string())
            })?;

            verify_jwt_session(token, &keys)
                .map(SessionData::from)
                .map_err(Rejection::from)
        }
    })
}

/// Anonymous viewers get `None`; a broken token is treated as no token.
pub fn with_possible_session(
    keys: Arc<SessionKeys>,
) -> impl Filter<Extract = (Option<SessionData>,), Error = Rejection> + Clone {
    warp::header::optional::<String>("authorization").map(move |header: Option<String>| {
        let token = header.as_deref().and_then(token_from_header)?;
        match verify_jwt_session(token, &keys) {
            Ok(data) => Some(data.into()),
            Err(e) => {
                log::debug!("Ignoring session: {e}");
                None
            }
        }
    })
}

pub fn with_pool(
    pool: Pool<Postgres>,
) -> impl Filter<Extract = (Pool<Postgres>,), Error = Infallible> + Clone {
    warp::any().map(move || pool.clone())
}
