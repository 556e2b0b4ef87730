use crate::constants::BOOLEAN_VALUES;

use super::{error::Error, schema::Id};

fn parse_bool(key: &str, value: &str) -> Result<bool, Error> {
    BOOLEAN_VALUES
        .iter()
        .find_map(|(spelling, flag)| (*spelling == value.trim()).then_some(*flag))
        .ok_or_else(|| Error::validation(key, "enter a valid boolean"))
}

fn last<'a>(pairs: &'a [(String, String)], key: &str) -> Option<&'a str> {
    pairs
        .iter()
        .rev()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.as_str())
}

/// Narrowing of the recipe list. The two membership flags only restrict
/// the result when set to true for an authenticated viewer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecipeFilter {
    pub tags: Vec<String>,
    pub author: Option<Id>,
    pub is_favorited: bool,
    pub is_in_shopping_cart: bool,
}

impl RecipeFilter {
    pub fn from_query(pairs: &[(String, String)]) -> Result<Self, Error> {
        let tags = pairs
            .iter()
            .filter(|(k, v)| k == "tags" && !v.is_empty())
            .map(|(_, v)| v.to_owned())
            .collect();

        let author = last(pairs, "author")
            .filter(|v| !v.is_empty())
            .map(|v| {
                v.trim()
                    .parse::<Id>()
                    .map_err(|_| Error::validation("author", "a valid integer is required"))
            })
            .transpose()?;

        let flag = |key: &str| -> Result<bool, Error> {
            match last(pairs, key).filter(|v| !v.is_empty()) {
                Some(value) => parse_bool(key, value),
                None => Ok(false),
            }
        };

        Ok(Self {
            tags,
            author,
            is_favorited: flag("is_favorited")?,
            is_in_shopping_cart: flag("is_in_shopping_cart")?,
        })
    }
}

/// Case-sensitive name prefix for the ingredient search.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngredientFilter {
    pub name: Option<String>,
}

impl IngredientFilter {
    pub fn from_query(pairs: &[(String, String)]) -> Self {
        Self {
            name: last(pairs, "name")
                .filter(|v| !v.is_empty())
                .map(str::to_owned),
        }
    }
}
