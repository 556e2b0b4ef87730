use std::fmt::{self, Display};

use serde_json::{json, Map, Value};
use warp::http::StatusCode;

#[derive(Debug)]
pub struct QueryError {
    info: String,
}

impl QueryError {
    pub fn new(info: String) -> Self {
        Self { info }
    }
}

impl Display for QueryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({})", self.info)
    }
}

impl std::error::Error for QueryError {}

impl From<sqlx::Error> for QueryError {
    fn from(value: sqlx::Error) -> Self {
        Self::new(value.to_string())
    }
}

impl From<sqlx::migrate::MigrateError> for QueryError {
    fn from(value: sqlx::migrate::MigrateError) -> Self {
        Self::new(format!("{value}"))
    }
}

/// Every failure an action can report. All of them are local to one request.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("{field}: {message}")]
    Validation { field: String, message: String },
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    Absent(String),
    #[error("shopping list is empty")]
    EmptyShoppingList,
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("{0}")]
    Unauthorized(String),
    #[error("{0}")]
    Forbidden(String),
    #[error("query failed {0}")]
    Query(#[from] QueryError),
    #[error("image store: {0}")]
    Image(String),
    #[error("configuration: {0}")]
    Config(String),
    #[error("internal: {0}")]
    Internal(String),
}

impl Error {
    pub fn validation(field: &str, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.to_string(),
            message: message.into(),
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::Validation { .. }
            | Error::Conflict(_)
            | Error::Absent(_)
            | Error::EmptyShoppingList => StatusCode::BAD_REQUEST,
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            Error::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Error::Forbidden(_) => StatusCode::FORBIDDEN,
            Error::Query(_) | Error::Image(_) | Error::Config(_) | Error::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// JSON body sent to the client. Internal details are not exposed.
    pub fn body(&self) -> Value {
        match self {
            Error::Validation { field, message } => {
                let mut body = Map::new();
                body.insert(field.to_owned(), json!([message]));
                Value::Object(body)
            }
            Error::Query(_) | Error::Image(_) | Error::Config(_) | Error::Internal(_) => {
                json!({ "errors": "internal server error" })
            }
            e => json!({ "errors": e.to_string() }),
        }
    }
}

/// Maps a violated constraint from the migrations onto the error a caller should see.
fn describe_constraint(constraint: &str) -> Option<Error> {
    let error = match constraint {
        "unique_user_email" | "unique_user_email_lower" => {
            Error::Conflict("user with this email already exists".into())
        }
        "unique_user_username" => {
            Error::Conflict("user with this username already exists".into())
        }
        "unique_tag_name" => Error::Conflict("tag with this name already exists".into()),
        "unique_tag_color" => Error::Conflict("tag with this color already exists".into()),
        "unique_tag_slug" => Error::Conflict("tag with this slug already exists".into()),
        "valid_tag_color" => Error::validation("color", "invalid hex color code"),
        "unique_ingredient_unit" => Error::Conflict(
            "ingredient with this name and measurement unit already exists".into(),
        ),
        "unique_recipe_name" => Error::Conflict("recipe with this name already exists".into()),
        "positive_cooking_time" => {
            Error::validation("cooking_time", "cooking time must be at least 1 minute")
        }
        "unique_recipe_ingredient" => {
            Error::validation("ingredients", "ingredients must not repeat")
        }
        "positive_amount" => Error::validation("ingredients", "amount must be at least 1"),
        "unique_recipe_list_entry" => Error::Conflict("recipe is already in the list".into()),
        "unique_following" => Error::Conflict("already subscribed to this author".into()),
        "no_self_following" => Error::Conflict("cannot subscribe to yourself".into()),
        _ => return None,
    };
    Some(error)
}

impl From<sqlx::Error> for Error {
    fn from(value: sqlx::Error) -> Self {
        if let sqlx::Error::Database(e) = &value {
            if let Some(error) = e.constraint().and_then(describe_constraint) {
                return error;
            }
            if e.is_unique_violation() {
                return Error::Conflict("object already exists".into());
            }
            if e.is_foreign_key_violation() {
                return Error::validation("non_field_errors", "referenced object does not exist");
            }
        }
        log::error!("Query failed: {value}");
        Error::Query(QueryError::from(value))
    }
}

impl From<sqlx::migrate::MigrateError> for Error {
    fn from(value: sqlx::migrate::MigrateError) -> Self {
        Error::Query(QueryError::from(value))
    }
}

impl warp::reject::Reject for Error {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conflicts_and_absences_are_bad_requests() {
        assert_eq!(
            Error::Conflict("dup".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            Error::Absent("missing".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            Error::EmptyShoppingList.status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(Error::NotFound("recipe").status_code(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn validation_body_is_keyed_by_field() {
        let body = Error::validation("tags", "at least one tag required").body();
        assert_eq!(body, json!({ "tags": ["at least one tag required"] }));
    }

    #[test]
    fn internal_errors_hide_details() {
        let error = Error::Query(QueryError::new("relation does not exist".into()));
        assert_eq!(error.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(error.body(), json!({ "errors": "internal server error" }));
    }

    #[test]
    fn errors_travel_inside_rejections() {
        let rejection: warp::reject::Rejection = Error::NotFound("recipe").into();
        assert!(matches!(
            rejection.find::<Error>(),
            Some(Error::NotFound("recipe"))
        ));
    }

    #[test]
    fn query_errors_keep_the_driver_message() {
        let error = Error::from(sqlx::Error::RowNotFound);
        assert!(matches!(error, Error::Query(_)));
        assert!(error.to_string().contains("no rows returned"));
    }

    #[test]
    fn known_constraints_are_described() {
        assert!(matches!(
            describe_constraint("unique_user_email_lower"),
            Some(Error::Conflict(_))
        ));
        assert!(matches!(
            describe_constraint("no_self_following"),
            Some(Error::Conflict(_))
        ));
        assert!(matches!(
            describe_constraint("unique_recipe_ingredient"),
            Some(Error::Validation { ref field, .. }) if field == "ingredients"
        ));
        assert!(describe_constraint("something_else").is_none());
    }
}
