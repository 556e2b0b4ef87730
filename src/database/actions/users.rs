use std::collections::HashMap;

use crate::{
    authentication::{
        cryptography::{hash_password, verify_password},
        jwt::{generate_jwt_session, SessionData, SessionKeys},
    },
    error::Error,
    pagination::{PageContext, PageRequest},
    schema::{Id, NewUser, User, UserProfile, UserProfileRow},
    validation::{check_password, validate_new_user},
};

use sqlx::{Pool, Postgres};

use super::{page_total, viewer_id};

pub async fn get_user_by_email(
    pool: &Pool<Postgres>,
    email: &str,
) -> Result<Option<User>, Error> {
    let row: Option<User> = sqlx::query_as("SELECT * FROM users WHERE LOWER(email) = LOWER($1)")
        .bind(email.trim())
        .fetch_optional(pool)
        .await?;

    Ok(row)
}

pub async fn get_user_by_id(pool: &Pool<Postgres>, user_id: Id) -> Result<Option<User>, Error> {
    let row: Option<User> = sqlx::query_as("SELECT * FROM users WHERE id = $1")
        .bind(user_id)
        .fetch_optional(pool)
        .await?;

    Ok(row)
}

/// Creates a user whose stored password is the argon2 hash of the given one.
pub async fn register_user(new_user: NewUser, pool: &Pool<Postgres>) -> Result<UserProfile, Error> {
    let new_user = validate_new_user(new_user)?;
    let password = hash_password(&new_user.password)?;

    let profile: Option<UserProfile> = sqlx::query_as(
        "
        INSERT INTO users (email, username, first_name, last_name, password)
        VALUES ($1, $2, $3, $4, $5)
        ON CONFLICT DO NOTHING
        RETURNING email, id, username, first_name, last_name, FALSE AS is_subscribed
    ",
    )
    .bind(&new_user.email)
    .bind(&new_user.username)
    .bind(&new_user.first_name)
    .bind(&new_user.last_name)
    .bind(password)
    .fetch_optional(pool)
    .await?;

    match profile {
        Some(profile) => {
            log::info!("Registered user {} ({})", profile.username, profile.id);
            Ok(profile)
        }
        None => Err(Error::Conflict(
            "user with this email or username already exists".to_string(),
        )),
    }
}

/// Users log in with their email address.
pub async fn login_user(
    email: &str,
    password: &str,
    keys: &SessionKeys,
    pool: &Pool<Postgres>,
) -> Result<String, Error> {
    let user = get_user_by_email(pool, email)
        .await?
        .ok_or_else(|| Error::Unauthorized("Invalid credentials".to_string()))?;

    if !verify_password(password, &user.password) {
        return Err(Error::Unauthorized("Invalid credentials".to_string()));
    }

    log::debug!("User {} logged in", user.id);
    generate_jwt_session(&user, keys)
}

pub async fn change_password(
    session: &SessionData,
    current_password: &str,
    new_password: &str,
    pool: &Pool<Postgres>,
) -> Result<(), Error> {
    check_password(new_password)?;

    let user = get_user_by_id(pool, session.user_id)
        .await?
        .ok_or(Error::NotFound("user"))?;
    if !verify_password(current_password, &user.password) {
        return Err(Error::validation(
            "current_password",
            "invalid password",
        ));
    }

    sqlx::query("UPDATE users SET password = $1 WHERE id = $2")
        .bind(hash_password(new_password)?)
        .bind(user.id)
        .execute(pool)
        .await?;

    log::info!("User {} changed their password", user.id);
    Ok(())
}

/// `is_subscribed` tells whether the viewer follows the user; always false
/// for anonymous viewers.
pub async fn user_profile(
    user_id: Id,
    viewer: Option<&SessionData>,
    pool: &Pool<Postgres>,
) -> Result<UserProfile, Error> {
    list_profiles(&[user_id], viewer, pool)
        .await?
        .remove(&user_id)
        .ok_or(Error::NotFound("user"))
}

pub async fn list_profiles(
    user_ids: &[Id],
    viewer: Option<&SessionData>,
    pool: &Pool<Postgres>,
) -> Result<HashMap<Id, UserProfile>, Error> {
    let rows: Vec<UserProfile> = sqlx::query_as(
        "
        SELECT u.email, u.id, u.username, u.first_name, u.last_name,
            EXISTS (
                SELECT 1 FROM subscriptions s WHERE s.user_id = $2 AND s.author_id = u.id
            ) AS is_subscribed
        FROM users u
        WHERE u.id = ANY($1)
    ",
    )
    .bind(user_ids)
    .bind(viewer_id(viewer))
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(|row| (row.id, row)).collect())
}

async fn count_users(pool: &Pool<Postgres>) -> Result<i64, Error> {
    let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users")
        .fetch_one(pool)
        .await?;

    Ok(count.0)
}

pub async fn fetch_users(
    page: PageRequest,
    viewer: Option<&SessionData>,
    pool: &Pool<Postgres>,
) -> Result<PageContext<UserProfile>, Error> {
    let rows: Vec<UserProfileRow> = sqlx::query_as(
        "
        SELECT u.email, u.id, u.username, u.first_name, u.last_name,
            EXISTS (
                SELECT 1 FROM subscriptions s WHERE s.user_id = $1 AND s.author_id = u.id
            ) AS is_subscribed,
            COUNT(*) OVER() AS count
        FROM users u
        ORDER BY u.id
        LIMIT $2 OFFSET $3
    ",
    )
    .bind(viewer_id(viewer))
    .bind(page.limit)
    .bind(page.offset())
    .fetch_all(pool)
    .await?;

    let window_count = rows.first().map(|row| row.count);
    let total_count = page_total(window_count, page, count_users(pool)).await?;
    let rows = rows.into_iter().map(|row| row.profile).collect();

    Ok(PageContext::from_rows(rows, total_count, page))
}
