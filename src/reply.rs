use std::convert::Infallible;

use serde::Serialize;
use serde_json::json;
use warp::{
    http::StatusCode,
    reject::Rejection,
    reply::{self, Reply},
};

use crate::{error::Error, shopping_list::ShoppingListDocument};

pub fn json_reply<T: Serialize>(value: &T, status: StatusCode) -> impl Reply {
    reply::with_status(reply::json(value), status)
}

/// Plain text download named after the document.
pub fn shopping_list_attachment(document: ShoppingListDocument) -> impl Reply {
    reply::with_header(
        reply::with_header(
            document.content,
            "content-type",
            "text/plain; charset=utf-8",
        ),
        "content-disposition",
        format!("attachment; filename=\"{}\"", document.filename),
    )
}

/// Turns rejections into the JSON error bodies clients expect.
pub async fn recover(rejection: Rejection) -> Result<impl Reply, Infallible> {
    let (status, body) = if let Some(e) = rejection.find::<Error>() {
        (e.status_code(), e.body())
    } else if rejection.is_not_found() {
        (StatusCode::NOT_FOUND, json!({ "errors": "not found" }))
    } else if let Some(e) = rejection.find::<warp::filters::body::BodyDeserializeError>() {
        (StatusCode::BAD_REQUEST, json!({ "errors": e.to_string() }))
    } else if rejection.find::<warp::reject::MethodNotAllowed>().is_some() {
        (
            StatusCode::METHOD_NOT_ALLOWED,
            json!({ "errors": "method not allowed" }),
        )
    } else {
        log::error!("Unhandled rejection: {rejection:?}");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            json!({ "errors": "internal server error" }),
        )
    };

    Ok(json_reply(&body, status))
}

#[cfg(test)]
mod tests {
    use serde_json::Value;
    use warp::Filter;

    use crate::constants::SHOPPING_LIST_FILENAME;

    use super::*;

    fn failing(error: fn() -> Error) -> impl Filter<Extract = (String,), Error = Rejection> + Clone {
        warp::any().and_then(move || async move { Err::<String, Rejection>(error().into()) })
    }

    #[tokio::test]
    async fn errors_become_status_and_body() {
        let filter = failing(|| Error::EmptyShoppingList).recover(recover);
        let response = warp::test::request().reply(&filter).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body: Value = serde_json::from_slice(response.body()).unwrap();
        assert_eq!(body, json!({ "errors": "shopping list is empty" }));

        let filter = failing(|| Error::validation("tags", "at least one tag required"))
            .recover(recover);
        let response = warp::test::request().reply(&filter).await;
        let body: Value = serde_json::from_slice(response.body()).unwrap();
        assert_eq!(body, json!({ "tags": ["at least one tag required"] }));

        let filter = failing(|| Error::NotFound("recipe")).recover(recover);
        let response = warp::test::request().reply(&filter).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn shopping_list_is_an_attachment() {
        let document = ShoppingListDocument {
            filename: SHOPPING_LIST_FILENAME,
            content: "Shopping list for user cook\n\n1. Salt (g) - 15\n".to_string(),
        };
        let response = shopping_list_attachment(document).into_response();

        assert_eq!(
            response.headers()["content-disposition"],
            "attachment; filename=\"shopping_list.txt\""
        );
        assert_eq!(
            response.headers()["content-type"],
            "text/plain; charset=utf-8"
        );
    }
}
